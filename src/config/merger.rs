//! Default-config merging and reserved property checks

use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use tracing::debug;

use super::JobConf;
use crate::error::{Result, SubmitError};

/// Date, size and counter names computed at materialization time
const RESERVED_USER_PROPERTIES: &[&str] = &[
    "YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "DAYS", "HOURS", "MINUTES", "KB", "MB", "GB", "TB",
    "PB", "RECORDS", "MAP_IN", "MAP_OUT", "REDUCE_IN", "REDUCE_OUT", "GROUPS",
];

/// Identity and credential keys a default file may never set
const RESERVED_IDENTITY_PROPERTIES: &[&str] = &[
    "user.name",
    "hadoop.job.ugi",
    "mapreduce.jobtracker.kerberos.principal",
    "dfs.namenode.kerberos.principal",
];

/// Keys rejected in user configuration and in default-config files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRules {
    disallowed_user: BTreeSet<String>,
    disallowed_default: BTreeSet<String>,
}

static STANDARD_RULES: Lazy<PropertyRules> = Lazy::new(|| {
    let disallowed_user: BTreeSet<String> = RESERVED_USER_PROPERTIES
        .iter()
        .map(|k| k.to_string())
        .collect();
    let disallowed_default = disallowed_user
        .iter()
        .cloned()
        .chain(RESERVED_IDENTITY_PROPERTIES.iter().map(|k| k.to_string()))
        .collect();
    PropertyRules {
        disallowed_user,
        disallowed_default,
    }
});

impl PropertyRules {
    pub fn new<U, D>(disallowed_user: U, disallowed_default: D) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            disallowed_user: disallowed_user.into_iter().map(Into::into).collect(),
            disallowed_default: disallowed_default.into_iter().map(Into::into).collect(),
        }
    }

    /// The process-wide rule set
    pub fn standard() -> &'static PropertyRules {
        &STANDARD_RULES
    }

    pub fn is_disallowed_for_user(&self, key: &str) -> bool {
        self.disallowed_user.contains(key)
    }

    pub fn is_disallowed_in_defaults(&self, key: &str) -> bool {
        self.disallowed_default.contains(key)
    }
}

fn check_disallowed(conf: &JobConf, disallowed: &BTreeSet<String>) -> Result<()> {
    match conf.keys().find(|key| disallowed.contains(*key)) {
        Some(key) => Err(SubmitError::disallowed_property(key)),
        None => Ok(()),
    }
}

/// Path of the default-config file that sits next to `app_path`
pub fn default_config_path(app_path: &str, file_name: &str) -> String {
    let trimmed = app_path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => format!("{}/{}", &trimmed[..idx], file_name),
        None => file_name.to_string(),
    }
}

/// Layers default properties under user configuration
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    rules: PropertyRules,
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new(PropertyRules::standard().clone())
    }
}

impl ConfigMerger {
    pub fn new(rules: PropertyRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PropertyRules {
        &self.rules
    }

    /// Merge `defaults` into `conf`.
    ///
    /// User keys always win. `conf` is only modified when every check
    /// passes.
    pub fn merge(&self, conf: &mut JobConf, defaults: Option<&JobConf>) -> Result<()> {
        let mut merged = conf.clone();
        if let Some(defaults) = defaults {
            check_disallowed(defaults, &self.rules.disallowed_default)
                .map_err(|e| e.with_context("default configuration"))?;
            merged.inject_defaults(defaults);
        }
        check_disallowed(&merged, &self.rules.disallowed_user)?;

        debug!(properties = merged.len(), "merged configuration");
        *conf = merged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn conf(pairs: &[(&str, &str)]) -> JobConf {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_user_value_wins() {
        let merger = ConfigMerger::default();
        let mut user = conf(&[("K", "v1")]);
        merger
            .merge(&mut user, Some(&conf(&[("K", "v2"), ("queue", "default")])))
            .unwrap();
        assert_eq!(user.get("K"), Some("v1"));
        assert_eq!(user.get("queue"), Some("default"));
    }

    #[test]
    fn test_reserved_user_key_leaves_conf_untouched() {
        let merger = ConfigMerger::default();
        let mut user = conf(&[("YEAR", "2024")]);
        let err = merger
            .merge(&mut user, Some(&conf(&[("extra", "1")])))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_DISALLOWED_PROPERTY);
        assert!(err.to_string().contains("YEAR"));
        assert!(!user.contains_key("extra"));
    }

    #[test]
    fn test_defaults_may_not_set_identity() {
        let merger = ConfigMerger::default();
        let mut user = conf(&[("user.name", "alice")]);
        let err = merger
            .merge(&mut user, Some(&conf(&[("user.name", "mallory")])))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_DISALLOWED_PROPERTY);
        assert_eq!(user.get("user.name"), Some("alice"));

        // identity keys are fine when the user supplies them
        merger.merge(&mut user, None).unwrap();
    }

    #[test]
    fn test_custom_rules() {
        let merger = ConfigMerger::new(PropertyRules::new(["secret"], ["secret", "token"]));
        let mut user = conf(&[("YEAR", "ok here")]);
        merger.merge(&mut user, None).unwrap();
        assert!(merger
            .merge(&mut user, Some(&conf(&[("token", "x")])))
            .is_err());
        assert!(PropertyRules::standard().is_disallowed_in_defaults("hadoop.job.ugi"));
        assert!(!PropertyRules::standard().is_disallowed_for_user("hadoop.job.ugi"));
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(
            default_config_path("hdfs://nn/apps/coord/coordinator.xml", "coord-config-default.xml"),
            "hdfs://nn/apps/coord/coord-config-default.xml"
        );
        assert_eq!(default_config_path("bundle.xml", "b.xml"), "b.xml");
    }
}

//! Job configuration handling
//!
//! A [`JobConf`] is the user-supplied property map that drives one
//! submission. It reads and writes the Hadoop-style configuration XML used
//! both for submissions and for the default-config files placed next to an
//! application definition.

pub mod merger;
pub mod settings;

pub use merger::{default_config_path, ConfigMerger, PropertyRules};
pub use settings::SubmitSettings;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ErrorCode, Result, SubmitError};
use crate::xml::Element;

pub const COORD_APP_PATH: &str = "coord.application.path";
pub const BUNDLE_APP_PATH: &str = "bundle.application.path";
pub const USER_NAME: &str = "user.name";
pub const GROUP_NAME: &str = "group.name";
pub const LOG_TOKEN: &str = "log.token";
pub const AUTH_TOKEN: &str = "auth.token";

/// Ordered string property map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobConf {
    properties: BTreeMap<String, String>,
}

impl JobConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Value of a property that must be present and non-blank
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(SubmitError::missing_property(key)),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Copy every property of `defaults` that this configuration lacks
    pub fn inject_defaults(&mut self, defaults: &JobConf) {
        for (key, value) in defaults.iter() {
            self.properties
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    /// Parse `<configuration><property><name/><value/></property>...`
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root = Element::parse(xml).map_err(|e| {
            SubmitError::config_with_code(
                ErrorCode::CONFIG_PARSE_ERROR,
                "configuration is not well-formed XML",
            )
            .with_source(e)
        })?;
        Self::from_element(&root)
    }

    pub fn from_element(root: &Element) -> Result<Self> {
        if root.local_name() != "configuration" {
            return Err(SubmitError::config_with_code(
                ErrorCode::CONFIG_PARSE_ERROR,
                format!(
                    "expected <configuration> root element, found <{}>",
                    root.local_name()
                ),
            ));
        }

        let mut conf = JobConf::new();
        for property in root.children_named("property") {
            let name = property
                .child("name")
                .map(|n| n.text().trim().to_string())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    SubmitError::config_with_code(
                        ErrorCode::CONFIG_PARSE_ERROR,
                        "configuration property without a <name>",
                    )
                })?;
            let value = property
                .child("value")
                .map(|v| v.text())
                .unwrap_or_default();
            conf.set(name, value);
        }
        Ok(conf)
    }

    pub fn to_element(&self) -> Element {
        let mut root = Element::new("configuration", None);
        for (key, value) in self.iter() {
            root.push_child(
                Element::new("property", None)
                    .with_child(Element::new("name", None).with_text(key))
                    .with_child(Element::new("value", None).with_text(value)),
            );
        }
        root
    }

    pub fn to_xml(&self) -> String {
        self.to_element().to_xml_string()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobConf {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_round_trip_keeps_values() {
        let xml = r#"<configuration>
            <property><name>nameNode</name><value>hdfs://nn:8020</value></property>
            <property><name>queue</name><value>a&amp;b</value></property>
        </configuration>"#;
        let conf = JobConf::from_xml(xml).unwrap();
        assert_eq!(conf.get("nameNode"), Some("hdfs://nn:8020"));
        assert_eq!(conf.get("queue"), Some("a&b"));

        let again = JobConf::from_xml(&conf.to_xml()).unwrap();
        assert_eq!(again, conf);
    }

    #[test]
    fn test_inject_defaults_keeps_user_values() {
        let mut conf: JobConf = [("K", "v1")].into_iter().collect();
        let defaults: JobConf = [("K", "v2"), ("other", "x")].into_iter().collect();
        conf.inject_defaults(&defaults);
        assert_eq!(conf.get("K"), Some("v1"));
        assert_eq!(conf.get("other"), Some("x"));
    }

    #[test]
    fn test_require_and_bad_root() {
        let conf: JobConf = [(USER_NAME, " ")].into_iter().collect();
        let err = conf.require(USER_NAME).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_MISSING_REQUIRED);

        let err = JobConf::from_xml("<props/>").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
        assert!(JobConf::from_xml("<configuration><property><value>1</value></property></configuration>").is_err());

        let err = JobConf::from_xml("<configuration><property>").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
        assert_eq!(err.category(), "config");
    }
}

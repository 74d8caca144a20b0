//! Job records produced by a successful submission

pub mod builder;

pub use builder::JobRecordBuilder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{JobConf, BUNDLE_APP_PATH, COORD_APP_PATH};
use crate::error::{Result, SubmitError};
use crate::time::TimeUnit;
use crate::xml::Element;

/// Which kind of application a submission handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Coordinator,
    Bundle,
}

impl JobKind {
    pub fn id_suffix(&self) -> &'static str {
        match self {
            JobKind::Coordinator => "C",
            JobKind::Bundle => "B",
        }
    }

    /// Configuration key holding the application path
    pub fn app_path_key(&self) -> &'static str {
        match self {
            JobKind::Coordinator => COORD_APP_PATH,
            JobKind::Bundle => BUNDLE_APP_PATH,
        }
    }

    /// File name of the default configuration next to the application
    pub fn default_config_file(&self) -> &'static str {
        match self {
            JobKind::Coordinator => "coord-config-default.xml",
            JobKind::Bundle => "bundle-config-default.xml",
        }
    }

    /// Definition file looked up when the application path is a directory
    pub fn definition_file(&self) -> &'static str {
        match self {
            JobKind::Coordinator => "coordinator.xml",
            JobKind::Bundle => "bundle.xml",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Coordinator => f.write_str("coordinator"),
            JobKind::Bundle => f.write_str("bundle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Prep,
    Premater,
    Running,
    Suspended,
    Succeeded,
    Killed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Prep => "PREP",
            JobStatus::Premater => "PREMATER",
            JobStatus::Running => "RUNNING",
            JobStatus::Suspended => "SUSPENDED",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Killed => "KILLED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Order in which ready actions are started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionOrder {
    #[default]
    Fifo,
    Lifo,
    LastOnly,
}

impl ExecutionOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionOrder::Fifo => "FIFO",
            ExecutionOrder::Lifo => "LIFO",
            ExecutionOrder::LastOnly => "LAST_ONLY",
        }
    }
}

impl FromStr for ExecutionOrder {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FIFO" => Ok(ExecutionOrder::Fifo),
            "LIFO" => Ok(ExecutionOrder::Lifo),
            "LAST_ONLY" => Ok(ExecutionOrder::LastOnly),
            other => Err(SubmitError::invalid_attribute(
                "execution",
                format!("'{}' is not one of FIFO, LIFO, LAST_ONLY", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSettings {
    /// Minutes an action may wait for its inputs; -1 waits forever
    pub timeout: i64,
    /// Actions allowed to run at once; -1 is unbounded
    pub concurrency: i64,
    pub execution: ExecutionOrder,
}

fn int_tag(controls: Option<&Element>, tag: &str) -> Result<Option<i64>> {
    let text = match controls.and_then(|c| c.child(tag)) {
        Some(element) => element.text(),
        None => return Ok(None),
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| SubmitError::invalid_attribute(tag, format!("'{}' is not an integer", text)))
}

impl ControlSettings {
    /// Read a resolved `<controls>` element, filling in defaults
    pub fn from_element(controls: Option<&Element>, default_timeout: i64) -> Result<Self> {
        let timeout = int_tag(controls, "timeout")?.unwrap_or(default_timeout);
        let concurrency = int_tag(controls, "concurrency")?.unwrap_or(-1);
        if concurrency < -1 {
            return Err(SubmitError::invalid_attribute(
                "concurrency",
                format!("{} is below -1", concurrency),
            ));
        }
        let execution = match controls.and_then(|c| c.child("execution")) {
            Some(element) if !element.text().trim().is_empty() => {
                element.text().trim().parse()?
            }
            _ => ExecutionOrder::Fifo,
        };
        Ok(Self {
            timeout,
            concurrency,
            execution,
        })
    }
}

/// A persisted coordinator job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorJob {
    /// Empty until the record is persisted
    pub id: String,
    pub app_name: String,
    pub app_path: String,
    pub user: String,
    pub group: Option<String>,
    pub auth_token: Option<String>,
    pub bundle_id: Option<String>,
    pub status: JobStatus,
    pub created_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
    pub frequency: i64,
    pub time_unit: TimeUnit,
    pub end_of_duration: TimeUnit,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub timezone: String,
    pub controls: Option<ControlSettings>,
    pub last_action_number: u32,
    /// Definition as submitted
    pub orig_xml: String,
    /// Resolved definition
    pub job_xml: String,
    /// Merged configuration as configuration XML
    pub conf: String,
    pub sla_xml: Option<String>,
}

impl CoordinatorJob {
    /// Skeleton record for a submission in flight
    pub fn draft(app_path: impl Into<String>, user: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            app_name: String::new(),
            app_path: app_path.into(),
            user: user.into(),
            group: None,
            auth_token: None,
            bundle_id: None,
            status: JobStatus::Prep,
            created_time: now,
            last_modified_time: now,
            frequency: 0,
            time_unit: TimeUnit::Minute,
            end_of_duration: TimeUnit::None,
            start_time: None,
            end_time: None,
            timezone: String::new(),
            controls: None,
            last_action_number: 0,
            orig_xml: String::new(),
            job_xml: String::new(),
            conf: String::new(),
            sla_xml: None,
        }
    }

    pub fn merged_conf(&self) -> Result<JobConf> {
        JobConf::from_xml(&self.conf)
    }
}

/// A coordinator declared by a bundle, activated later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleCoordinator {
    pub name: String,
    pub app_path: String,
    pub conf: JobConf,
}

/// A persisted bundle job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleJob {
    pub id: String,
    pub app_name: String,
    pub app_path: String,
    pub user: String,
    pub group: Option<String>,
    pub auth_token: Option<String>,
    pub status: JobStatus,
    pub created_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
    pub kickoff_time: Option<DateTime<Utc>>,
    pub coordinators: Vec<BundleCoordinator>,
    pub orig_xml: String,
    pub job_xml: String,
    pub conf: String,
}

impl BundleJob {
    pub fn draft(app_path: impl Into<String>, user: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            app_name: String::new(),
            app_path: app_path.into(),
            user: user.into(),
            group: None,
            auth_token: None,
            status: JobStatus::Prep,
            created_time: now,
            last_modified_time: now,
            kickoff_time: None,
            coordinators: Vec::new(),
            orig_xml: String::new(),
            job_xml: String::new(),
            conf: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls(xml: &str) -> Element {
        Element::parse(xml).unwrap()
    }

    #[test]
    fn test_control_defaults() {
        let settings = ControlSettings::from_element(None, 120).unwrap();
        assert_eq!(
            settings,
            ControlSettings {
                timeout: 120,
                concurrency: -1,
                execution: ExecutionOrder::Fifo
            }
        );

        let element = controls("<controls><timeout></timeout></controls>");
        assert_eq!(
            ControlSettings::from_element(Some(&element), 30).unwrap().timeout,
            30
        );
    }

    #[test]
    fn test_control_values_and_errors() {
        let element = controls(
            "<controls><timeout>10</timeout><concurrency>2</concurrency><execution>LAST_ONLY</execution></controls>",
        );
        let settings = ControlSettings::from_element(Some(&element), 120).unwrap();
        assert_eq!(settings.timeout, 10);
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.execution, ExecutionOrder::LastOnly);

        let bad = controls("<controls><concurrency>-2</concurrency></controls>");
        assert!(ControlSettings::from_element(Some(&bad), 120).is_err());
        let bad = controls("<controls><execution>RANDOM</execution></controls>");
        assert!(ControlSettings::from_element(Some(&bad), 120).is_err());
        let bad = controls("<controls><timeout>soon</timeout></controls>");
        assert!(ControlSettings::from_element(Some(&bad), 120).is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Premater).unwrap(), "\"PREMATER\"");
        assert_eq!(
            serde_json::to_string(&ExecutionOrder::LastOnly).unwrap(),
            "\"LAST_ONLY\""
        );
        assert_eq!(JobKind::Bundle.default_config_file(), "bundle-config-default.xml");
    }
}

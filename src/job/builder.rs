//! Projection of resolved definitions into job records

use chrono::{DateTime, Utc};

use super::{BundleCoordinator, BundleJob, ControlSettings, CoordinatorJob};
use crate::config::{JobConf, GROUP_NAME};
use crate::error::{Result, SubmitError};
use crate::time::{parse_utc, TimeUnit};
use crate::xml::{Element, SLA_NAMESPACE_PREFIX};

fn required_attr<'a>(element: &'a Element, name: &str) -> Result<&'a str> {
    element
        .attr(name)
        .ok_or_else(|| SubmitError::invalid_attribute(name, "attribute is missing"))
}

fn unit_attr(element: &Element, name: &str, default: TimeUnit) -> Result<TimeUnit> {
    element.attr(name).map_or(Ok(default), |s| s.parse::<TimeUnit>())
}

/// Fills draft job records from a resolved definition
pub struct JobRecordBuilder<'a> {
    conf: &'a JobConf,
    default_timeout: i64,
    now: DateTime<Utc>,
}

impl<'a> JobRecordBuilder<'a> {
    pub fn new(conf: &'a JobConf, default_timeout: i64) -> Self {
        Self {
            conf,
            default_timeout,
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Copy schedule, controls and documents of `resolved` into `job`.
    ///
    /// A name already on the draft (given by a parent bundle) is kept.
    pub fn fill_coordinator(
        &self,
        job: &mut CoordinatorJob,
        resolved: &Element,
        orig_xml: &str,
    ) -> Result<()> {
        if job.app_name.is_empty() {
            job.app_name = required_attr(resolved, "name")?.to_string();
        }

        let frequency = required_attr(resolved, "frequency")?;
        job.frequency = frequency.trim().parse().map_err(|_| {
            SubmitError::invalid_attribute("frequency", format!("'{}' is not an integer", frequency))
        })?;
        job.time_unit = unit_attr(resolved, "freq_timeunit", TimeUnit::Minute)?;
        job.end_of_duration = unit_attr(resolved, "end_of_duration", TimeUnit::None)?;
        job.start_time = Some(parse_utc(required_attr(resolved, "start")?, "start")?);
        job.end_time = Some(parse_utc(required_attr(resolved, "end")?, "end")?);
        job.timezone = required_attr(resolved, "timezone")?.to_string();
        job.controls = Some(ControlSettings::from_element(
            resolved.child("controls"),
            self.default_timeout,
        )?);

        job.group = self.conf.get(GROUP_NAME).map(str::to_string);
        job.last_action_number = 0;
        job.orig_xml = orig_xml.to_string();
        job.job_xml = resolved.to_xml_string();
        job.conf = self.conf.to_xml();
        job.sla_xml = resolved
            .child("action")
            .and_then(|action| action.child_in_namespace("info", SLA_NAMESPACE_PREFIX))
            .map(|sla| sla.detached().to_xml_string());
        job.last_modified_time = self.now;
        Ok(())
    }

    pub fn fill_bundle(
        &self,
        job: &mut BundleJob,
        resolved: &Element,
        orig_xml: &str,
        kickoff_time: Option<DateTime<Utc>>,
        coordinators: Vec<BundleCoordinator>,
    ) -> Result<()> {
        job.app_name = required_attr(resolved, "name")?.to_string();
        job.group = self.conf.get(GROUP_NAME).map(str::to_string);
        job.kickoff_time = kickoff_time;
        job.coordinators = coordinators;
        job.orig_xml = orig_xml.to_string();
        job.job_xml = resolved.to_xml_string();
        job.conf = self.conf.to_xml();
        job.last_modified_time = self.now;
        Ok(())
    }
}

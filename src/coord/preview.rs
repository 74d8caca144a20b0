//! Dry-run materialization preview
//!
//! A dry run lists the actions the materializer would create in the first
//! window of the coordinator's life, with the input URIs each action would
//! wait for. Only `current(n)` instances can be computed at submission time;
//! anything else is reported as written.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::dataset::{DatasetCatalog, DatasetDefinition};
use super::events::{EventDirection, InstanceSpec};
use super::resolver::ResolvedCoordinator;
use crate::time::{advance, format_utc};
use crate::xml::Element;

/// Separator between the resolved definition and the action list
pub const ACTIONS_MARKER: &str = "***actions for instance***";

static CURRENT_INSTANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\{(?:coord:)?current\(\s*(-?\d+)\s*\)\}$").expect("valid current() regex")
});

/// End of the preview window: `start + window`, but never past `end`
pub fn dry_run_window_end(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window: Duration,
) -> DateTime<Utc> {
    start
        .checked_add_signed(window)
        .map_or(end, |candidate| candidate.min(end))
}

/// One action that would be materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPreview {
    pub number: u32,
    pub nominal_time: DateTime<Utc>,
    /// Input event name and the URIs it resolves to
    pub inputs: Vec<(String, Vec<String>)>,
}

impl ActionPreview {
    pub fn to_element(&self, namespace: Option<&str>) -> Element {
        let ns = namespace.map(str::to_string);
        let mut action = Element::new("action", ns.clone())
            .with_attr("number", self.number.to_string())
            .with_attr("nominal-time", format_utc(&self.nominal_time));
        for (name, uris) in &self.inputs {
            action.push_child(
                Element::new(EventDirection::In.element_name(), ns.clone())
                    .with_attr("name", name.as_str())
                    .with_text(uris.join("#")),
            );
        }
        action
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializationPreview {
    pub window_end: DateTime<Utc>,
    pub actions: Vec<ActionPreview>,
}

impl MaterializationPreview {
    /// Actions with nominal times in `[start, window_end)`
    pub fn compute(resolved: &ResolvedCoordinator, window: Duration) -> Self {
        let schedule = &resolved.schedule;
        let window_end = dry_run_window_end(schedule.start, schedule.end, window);

        let mut actions = Vec::new();
        let mut step: i64 = 0;
        while let Some(nominal_time) =
            advance(schedule.start, schedule.frequency, schedule.time_unit, step)
        {
            if nominal_time >= window_end {
                break;
            }
            step += 1;
            let Some(number) = action_number(step) else {
                break;
            };
            let inputs = resolved
                .events
                .iter()
                .filter(|binding| binding.direction == EventDirection::In)
                .map(|binding| {
                    let uris = match resolved.catalog.get(&binding.dataset) {
                        Some(dataset) => instance_uris(dataset, &binding.instances, nominal_time),
                        None => Vec::new(),
                    };
                    (binding.name.clone(), uris)
                })
                .collect();
            actions.push(ActionPreview {
                number,
                nominal_time,
                inputs,
            });
        }

        Self {
            window_end,
            actions,
        }
    }

    /// Action elements, one per line group
    pub fn render(&self, namespace: Option<&str>) -> String {
        self.actions
            .iter()
            .map(|action| action.to_element(namespace).to_xml_string())
            .collect()
    }

    /// Resolved definition followed by the action list
    pub fn dry_run_text(&self, job_xml: &str, namespace: Option<&str>) -> String {
        format!("{}\n{}\n{}", job_xml, ACTIONS_MARKER, self.render(namespace))
    }
}

/// One-based action number, if it still fits the record field
fn action_number(step: i64) -> Option<u32> {
    u32::try_from(step).ok().filter(|n| *n > 0)
}

fn current_offset(instance: &str) -> Option<i64> {
    CURRENT_INSTANCE
        .captures(instance.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Index of the latest dataset instance at or before `at`
fn instance_index(dataset: &DatasetDefinition, at: DateTime<Utc>) -> Option<i64> {
    if at < dataset.initial_instance || dataset.frequency <= 0 {
        return None;
    }
    let initial = dataset.initial_instance;
    let mut index = match dataset.time_unit.minutes() {
        Some(unit) => {
            let width = dataset.frequency.checked_mul(unit)?;
            (at - initial).num_minutes().checked_div(width)?
        }
        None => {
            let months = (i64::from(at.year()) - i64::from(initial.year())) * 12
                + i64::from(at.month())
                - i64::from(initial.month());
            months.checked_div(dataset.frequency)?
        }
    };
    while index > 0 && advance(initial, dataset.frequency, dataset.time_unit, index)? > at {
        index -= 1;
    }
    Some(index)
}

fn instance_time(
    dataset: &DatasetDefinition,
    nominal_time: DateTime<Utc>,
    offset: i64,
) -> Option<DateTime<Utc>> {
    let index = instance_index(dataset, nominal_time)?.checked_add(offset)?;
    if index < 0 {
        return None;
    }
    advance(dataset.initial_instance, dataset.frequency, dataset.time_unit, index)
}

/// `uri-template` with the date variables filled in from `at`
pub fn expand_uri_template(template: &str, at: DateTime<Utc>) -> String {
    template
        .replace("${YEAR}", &format!("{:04}", at.year()))
        .replace("${MONTH}", &format!("{:02}", at.month()))
        .replace("${DAY}", &format!("{:02}", at.day()))
        .replace("${HOUR}", &format!("{:02}", at.hour()))
        .replace("${MINUTE}", &format!("{:02}", at.minute()))
}

fn instance_uris(
    dataset: &DatasetDefinition,
    instances: &InstanceSpec,
    nominal_time: DateTime<Utc>,
) -> Vec<String> {
    let resolve = |expr: &str| -> Option<String> {
        let offset = current_offset(expr)?;
        instance_time(dataset, nominal_time, offset)
            .map(|at| expand_uri_template(&dataset.uri_template, at))
    };

    match instances {
        InstanceSpec::List(list) => list
            .iter()
            .map(|expr| resolve(expr).unwrap_or_else(|| expr.clone()))
            .collect(),
        InstanceSpec::Range { start, end } => match (current_offset(start), current_offset(end)) {
            (Some(first), Some(last)) if first <= last => (first..=last)
                .rev()
                .filter_map(|offset| instance_time(dataset, nominal_time, offset))
                .map(|at| expand_uri_template(&dataset.uri_template, at))
                .collect(),
            _ => vec![start.clone(), end.clone()],
        },
    }
}

/// Dataset lookup used by callers that only hold a catalog
pub fn dataset_instance_uri(
    catalog: &DatasetCatalog,
    dataset: &str,
    nominal_time: DateTime<Utc>,
    offset: i64,
) -> Option<String> {
    let definition = catalog.get(dataset)?;
    instance_time(definition, nominal_time, offset)
        .map(|at| expand_uri_template(&definition.uri_template, at))
}

//! Coordinator definition resolution
//!
//! Resolution runs the phases in a fixed order: frequency, time window and
//! controls, datasets, events, workflow configuration and SLA. Each phase
//! evaluates expressions with its own [`Evaluator`] from the
//! [`ExpressionEnvironment`] and rewrites the definition tree in place.

pub mod assemble;
pub mod dataset;
pub mod events;
pub mod preview;
pub mod resolver;

pub use assemble::AppAssembler;
pub use dataset::{DatasetCatalog, DatasetCatalogBuilder, DatasetDefinition};
pub use events::{DataNameMap, EventBinder, EventBinding, EventDirection, InstanceSpec};
pub use preview::{dry_run_window_end, ActionPreview, MaterializationPreview, ACTIONS_MARKER};
pub use resolver::{CoordResolver, ResolvedCoordinator, Schedule};

use crate::config::JobConf;
use crate::el::{Evaluator, Phase};
use crate::error::Result;
use crate::xml::Element;

/// One evaluator per resolution phase, created once per submission
pub struct ExpressionEnvironment {
    pub frequency: Evaluator,
    pub nofuncs: Evaluator,
    pub instances: Evaluator,
    pub sla: Evaluator,
    conf: JobConf,
}

impl ExpressionEnvironment {
    pub fn new(conf: &JobConf) -> Self {
        Self {
            frequency: Evaluator::new(Phase::Frequency, conf),
            nofuncs: Evaluator::new(Phase::NoFunctions, conf),
            instances: Evaluator::new(Phase::Instances, conf),
            sla: Evaluator::new(Phase::Sla, conf),
            conf: conf.clone(),
        }
    }

    /// Evaluator for workflow configuration, aware of the declared events
    pub fn data_echo(&self, names: DataNameMap) -> Evaluator {
        Evaluator::new(Phase::DataEcho, &self.conf).with_data_names(names)
    }
}

/// Evaluate attribute `name` of `element` in place; `None` if absent
pub fn resolve_attribute(
    element: &mut Element,
    name: &str,
    evaluator: &mut Evaluator,
) -> Result<Option<String>> {
    let Some(raw) = element.attr(name) else {
        return Ok(None);
    };
    let resolved = evaluator.evaluate(raw.trim())?;
    element.set_attr(name, resolved.clone());
    Ok(Some(resolved))
}

/// Evaluate every `<tag>` child of `element` in place.
///
/// Returns the concatenated resolved contents, empty when no such tag
/// exists.
pub fn resolve_tag_contents(
    element: &mut Element,
    tag: &str,
    evaluator: &mut Evaluator,
) -> Result<String> {
    let mut joined = String::new();
    for child in element.children_named_mut(tag) {
        let resolved = evaluator.evaluate(child.text().trim())?;
        child.set_text(resolved.clone());
        joined.push_str(&resolved);
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_attribute_and_tags() {
        let conf: JobConf = [("base", "/data"), ("tz", "UTC")].into_iter().collect();
        let mut env = ExpressionEnvironment::new(&conf);
        let mut element = Element::parse(
            "<dataset timezone='${tz}'><uri-template>${base}/${YEAR}</uri-template></dataset>",
        )
        .unwrap();

        let tz = resolve_attribute(&mut element, "timezone", &mut env.nofuncs).unwrap();
        assert_eq!(tz.as_deref(), Some("UTC"));
        assert_eq!(element.attr("timezone"), Some("UTC"));
        assert!(resolve_attribute(&mut element, "absent", &mut env.nofuncs)
            .unwrap()
            .is_none());

        let uri = resolve_tag_contents(&mut element, "uri-template", &mut env.nofuncs).unwrap();
        assert_eq!(uri, "/data/${YEAR}");
        assert_eq!(resolve_tag_contents(&mut element, "done-flag", &mut env.nofuncs).unwrap(), "");
    }
}

//! Bundle definition resolution
//!
//! A bundle only needs configuration variables: every attribute value and
//! text node of the definition is evaluated with the bundle phase, then the
//! declared coordinators are checked and projected into
//! [`BundleCoordinator`] entries.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use crate::config::JobConf;
use crate::el::{Evaluator, Phase};
use crate::error::{ErrorCode, NameKind, Result, SubmitError};
use crate::job::BundleCoordinator;
use crate::time::parse_utc;
use crate::xml::{Element, Node};

/// A bundle definition after variable substitution
#[derive(Debug, Clone)]
pub struct ResolvedBundle {
    pub app: Element,
    pub name: String,
    pub kickoff_time: Option<DateTime<Utc>>,
    pub coordinators: Vec<BundleCoordinator>,
}

fn resolve_tree(element: &mut Element, evaluator: &mut Evaluator) -> Result<()> {
    for value in element.attributes_mut() {
        *value = evaluator.evaluate(value)?;
    }
    for node in element.nodes_mut() {
        match node {
            Node::Text(text) => *text = evaluator.evaluate(text)?,
            Node::Element(child) => resolve_tree(child, evaluator)?,
        }
    }
    Ok(())
}

fn coordinator_entry(element: &Element, name: &str) -> Result<BundleCoordinator> {
    let app_path = element
        .child("app-path")
        .map(|e| e.text().trim().to_string())
        .filter(|path| !path.is_empty())
        .ok_or_else(|| {
            SubmitError::validation_with_code(
                ErrorCode::VALIDATION_MISSING_ELEMENT,
                format!("coordinator '{}' has no <app-path>", name),
                Some("app-path".to_string()),
            )
        })?;
    let conf = match element.child("configuration") {
        Some(configuration) => JobConf::from_element(configuration)
            .map_err(|e| e.with_context(format!("coordinator '{}'", name)))?,
        None => JobConf::new(),
    };
    Ok(BundleCoordinator {
        name: name.to_string(),
        app_path,
        conf,
    })
}

/// Resolves bundle definitions against a job configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleResolver;

impl BundleResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, xml: &str, conf: &JobConf) -> Result<ResolvedBundle> {
        let mut app = Element::parse(xml)?;
        let mut evaluator = Evaluator::new(Phase::Bundle, conf);
        resolve_tree(&mut app, &mut evaluator)?;

        let name = app
            .attr("name")
            .map(str::to_string)
            .ok_or_else(|| SubmitError::invalid_attribute("name", "bundle has no name"))?;

        let mut seen = HashSet::new();
        let mut coordinators = Vec::new();
        for element in app.children_named("coordinator") {
            let coord_name = element.attr("name").ok_or_else(|| {
                SubmitError::validation_with_code(
                    ErrorCode::VALIDATION_INVALID_ATTRIBUTE,
                    "bundle coordinator without a name",
                    Some("name".to_string()),
                )
            })?;
            if !seen.insert(coord_name.to_string()) {
                return Err(SubmitError::duplicate_name(NameKind::Coordinator, coord_name));
            }
            coordinators.push(coordinator_entry(element, coord_name)?);
        }

        let kickoff_time = match app.child("controls").and_then(|c| c.child("kick-off-time")) {
            Some(kickoff) if !kickoff.text().trim().is_empty() => {
                Some(parse_utc(&kickoff.text(), "kick-off-time")?)
            }
            _ => None,
        };

        debug!(bundle = %name, coordinators = coordinators.len(), "bundle definition resolved");
        Ok(ResolvedBundle {
            app,
            name,
            kickoff_time,
            coordinators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"<bundle-app name="${bundleName}" xmlns="uri:oozie:bundle:0.1">
      <controls><kick-off-time>${kickoff}</kick-off-time></controls>
      <coordinator name="C1">
        <app-path>${appBase}/c1.xml</app-path>
        <configuration><property><name>queue</name><value>${queue}</value></property></configuration>
      </coordinator>
      <coordinator name="C2"><app-path>${appBase}/c2.xml</app-path></coordinator>
    </bundle-app>"#;

    fn conf() -> JobConf {
        [
            ("bundleName", "nightly"),
            ("kickoff", "2024-01-01T00:00Z"),
            ("appBase", "hdfs://nn/apps"),
            ("queue", "etl"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolves_coordinators_and_kickoff() {
        let bundle = BundleResolver::new().resolve(BUNDLE, &conf()).unwrap();

        assert_eq!(bundle.name, "nightly");
        assert_eq!(bundle.kickoff_time, Some(parse_utc("2024-01-01T00:00Z", "t").unwrap()));
        assert_eq!(bundle.coordinators.len(), 2);
        assert_eq!(bundle.coordinators[0].app_path, "hdfs://nn/apps/c1.xml");
        assert_eq!(bundle.coordinators[0].conf.get("queue"), Some("etl"));
        assert!(bundle.coordinators[1].conf.is_empty());
        assert!(bundle.app.to_xml_string().contains("hdfs://nn/apps/c2.xml"));
    }

    #[test]
    fn test_duplicate_coordinator_name() {
        let xml = BUNDLE.replace("name=\"C2\"", "name=\"C1\"");
        let err = BundleResolver::new().resolve(&xml, &conf()).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::DuplicateName {
                kind: NameKind::Coordinator,
                ref name,
                ..
            } if name == "C1"
        ));
    }

    #[test]
    fn test_missing_coordinator_name_and_variables() {
        let xml = BUNDLE.replace("<coordinator name=\"C2\">", "<coordinator>");
        let err = BundleResolver::new().resolve(&xml, &conf()).unwrap_err();
        assert_eq!(err.category(), "validation");

        let mut partial = conf();
        partial.remove("queue");
        let err = BundleResolver::new().resolve(BUNDLE, &partial).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EXPRESSION_UNDEFINED_VARIABLE);
    }

    #[test]
    fn test_no_kickoff() {
        let xml = BUNDLE.replace("<controls><kick-off-time>${kickoff}</kick-off-time></controls>", "");
        let bundle = BundleResolver::new().resolve(&xml, &conf()).unwrap();
        assert!(bundle.kickoff_time.is_none());
    }
}

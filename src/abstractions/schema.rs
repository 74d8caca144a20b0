//! Schema validation abstraction

use std::fmt;

use crate::error::{ErrorCode, Result, SubmitError};
use crate::xml::{Element, SLA_NAMESPACE_PREFIX};

pub const COORDINATOR_NAMESPACE_PREFIX: &str = "uri:oozie:coordinator:";
pub const BUNDLE_NAMESPACE_PREFIX: &str = "uri:oozie:bundle:";

/// Document kinds that can be validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaName {
    Coordinator,
    Bundle,
    Sla,
    Datasets,
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaName::Coordinator => "coordinator",
            SchemaName::Bundle => "bundle",
            SchemaName::Sla => "sla",
            SchemaName::Datasets => "datasets",
        };
        f.write_str(name)
    }
}

/// Validates raw XML text against a named schema
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, schema: SchemaName, xml: &str) -> Result<()>;
}

/// Structural checks standing in for full XSD validation: well-formedness,
/// root element, namespace family and mandatory attributes and children.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSchemaValidator;

fn schema_error(schema: SchemaName, message: impl fmt::Display) -> SubmitError {
    SubmitError::validation_with_code(
        ErrorCode::VALIDATION_SCHEMA,
        format!("{} schema: {}", schema, message),
        None,
    )
}

fn expect_root(schema: SchemaName, root: &Element, local: &str, ns_prefix: &str) -> Result<()> {
    if root.local_name() != local {
        return Err(schema_error(
            schema,
            format!("expected root <{}>, found <{}>", local, root.local_name()),
        ));
    }
    match root.namespace() {
        Some(ns) if ns.starts_with(ns_prefix) => Ok(()),
        Some(ns) => Err(schema_error(schema, format!("unsupported namespace '{}'", ns))),
        None => Err(schema_error(schema, format!("<{}> has no namespace", local))),
    }
}

fn require_attrs(schema: SchemaName, element: &Element, names: &[&str]) -> Result<()> {
    for name in names {
        if element.attr(name).is_none() {
            return Err(schema_error(
                schema,
                format!("<{}> is missing attribute '{}'", element.local_name(), name),
            ));
        }
    }
    Ok(())
}

fn require_child<'a>(schema: SchemaName, element: &'a Element, local: &str) -> Result<&'a Element> {
    element.child(local).ok_or_else(|| {
        schema_error(
            schema,
            format!("<{}> is missing <{}>", element.local_name(), local),
        )
    })
}

fn check_datasets(schema: SchemaName, datasets: &Element) -> Result<()> {
    for dataset in datasets.children_named("dataset") {
        require_attrs(schema, dataset, &["name", "frequency", "initial-instance", "timezone"])?;
        require_child(schema, dataset, "uri-template")?;
    }
    for include in datasets.children_named("include") {
        if include.text().trim().is_empty() {
            return Err(schema_error(schema, "<include> must name a file"));
        }
    }
    Ok(())
}

fn check_events(schema: SchemaName, app: &Element, group: &str, event: &str) -> Result<()> {
    if let Some(events) = app.child(group) {
        for binding in events.children_named(event) {
            require_attrs(schema, binding, &["name", "dataset"])?;
            let single = binding.child("instance").is_some();
            let ranged =
                binding.child("start-instance").is_some() && binding.child("end-instance").is_some();
            if !single && !ranged {
                return Err(schema_error(
                    schema,
                    format!("<{}> needs <instance> or a start/end instance pair", event),
                ));
            }
        }
    }
    Ok(())
}

impl SchemaValidator for StructuralSchemaValidator {
    fn validate(&self, schema: SchemaName, xml: &str) -> Result<()> {
        let root = Element::parse(xml)?;
        match schema {
            SchemaName::Coordinator => {
                expect_root(schema, &root, "coordinator-app", COORDINATOR_NAMESPACE_PREFIX)?;
                require_attrs(schema, &root, &["name", "frequency", "start", "end", "timezone"])?;
                if let Some(datasets) = root.child("datasets") {
                    check_datasets(schema, datasets)?;
                }
                check_events(schema, &root, "input-events", "data-in")?;
                check_events(schema, &root, "output-events", "data-out")?;
                let action = require_child(schema, &root, "action")?;
                let workflow = require_child(schema, action, "workflow")?;
                require_child(schema, workflow, "app-path")?;
                Ok(())
            }
            SchemaName::Bundle => {
                expect_root(schema, &root, "bundle-app", BUNDLE_NAMESPACE_PREFIX)?;
                require_attrs(schema, &root, &["name"])?;
                if root.children_named("coordinator").next().is_none() {
                    return Err(schema_error(schema, "bundle declares no <coordinator>"));
                }
                for coordinator in root.children_named("coordinator") {
                    require_child(schema, coordinator, "app-path")?;
                }
                Ok(())
            }
            SchemaName::Sla => expect_root(schema, &root, "info", SLA_NAMESPACE_PREFIX),
            SchemaName::Datasets => {
                // included files may omit the namespace; it is inherited on merge
                if root.namespace().is_some() {
                    expect_root(schema, &root, "datasets", COORDINATOR_NAMESPACE_PREFIX)?;
                } else if root.local_name() != "datasets" {
                    return Err(schema_error(
                        schema,
                        format!("expected root <datasets>, found <{}>", root.local_name()),
                    ));
                }
                check_datasets(schema, &root)
            }
        }
    }
}

//! Input and output event binding

use std::collections::BTreeSet;

use super::dataset::DatasetCatalog;
use super::resolve_tag_contents;
use crate::el::Evaluator;
use crate::error::{NameKind, Result, SubmitError};
use crate::xml::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventDirection {
    In,
    Out,
}

impl EventDirection {
    /// Element name of one binding
    pub fn element_name(&self) -> &'static str {
        match self {
            EventDirection::In => "data-in",
            EventDirection::Out => "data-out",
        }
    }

    /// Element name of the enclosing group
    pub fn group_name(&self) -> &'static str {
        match self {
            EventDirection::In => "input-events",
            EventDirection::Out => "output-events",
        }
    }

    pub fn name_kind(&self) -> NameKind {
        match self {
            EventDirection::In => NameKind::DataIn,
            EventDirection::Out => NameKind::DataOut,
        }
    }
}

/// Declared event names per direction, consulted by `dataIn`/`dataOut`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataNameMap {
    names: BTreeSet<(EventDirection, String)>,
}

impl DataNameMap {
    /// Record a name; false if it was already declared in that direction
    pub fn insert(&mut self, name: impl Into<String>, direction: EventDirection) -> bool {
        self.names.insert((direction, name.into()))
    }

    pub fn contains(&self, name: &str, direction: EventDirection) -> bool {
        self.names.contains(&(direction, name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Instance selection of one binding, after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSpec {
    /// One or more `<instance>` expressions
    List(Vec<String>),
    /// `<start-instance>` to `<end-instance>`, inclusive
    Range { start: String, end: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub name: String,
    pub direction: EventDirection,
    pub dataset: String,
    pub instances: InstanceSpec,
}

/// Validates `data-in`/`data-out` bindings against the dataset catalog
pub struct EventBinder<'a> {
    catalog: &'a DatasetCatalog,
}

impl<'a> EventBinder<'a> {
    pub fn new(catalog: &'a DatasetCatalog) -> Self {
        Self { catalog }
    }

    /// Resolve every binding of `app` with the instance evaluator.
    ///
    /// Instance expressions are resolved on a copy: the definition keeps
    /// them exactly as written for the materializer.
    pub fn bind(
        &self,
        app: &Element,
        instances: &mut Evaluator,
    ) -> Result<(Vec<EventBinding>, DataNameMap)> {
        let mut bindings = Vec::new();
        let mut names = DataNameMap::default();

        for direction in [EventDirection::In, EventDirection::Out] {
            let Some(group) = app.child(direction.group_name()) else {
                continue;
            };
            for element in group.children_named(direction.element_name()) {
                let binding = self.bind_one(element.clone(), direction, instances)?;
                if !names.insert(binding.name.clone(), direction) {
                    return Err(SubmitError::duplicate_name(direction.name_kind(), binding.name));
                }
                bindings.push(binding);
            }
        }
        Ok((bindings, names))
    }

    fn bind_one(
        &self,
        mut element: Element,
        direction: EventDirection,
        instances: &mut Evaluator,
    ) -> Result<EventBinding> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                SubmitError::invalid_attribute(direction.element_name(), "missing 'name' attribute")
            })?
            .to_string();
        let dataset = element
            .attr("dataset")
            .ok_or_else(|| {
                SubmitError::invalid_attribute(
                    direction.element_name(),
                    format!("binding '{}' has no 'dataset' attribute", name),
                )
            })?
            .to_string();

        resolve_tag_contents(&mut element, "instance", instances)?;
        let spec = if direction == EventDirection::In && element.child("start-instance").is_some() {
            let start = resolve_tag_contents(&mut element, "start-instance", instances)?;
            let end = resolve_tag_contents(&mut element, "end-instance", instances)?;
            InstanceSpec::Range { start, end }
        } else {
            InstanceSpec::List(
                element
                    .children_named("instance")
                    .map(|i| i.text().trim().to_string())
                    .collect(),
            )
        };

        self.catalog.find(&dataset)?;

        Ok(EventBinding {
            name,
            direction,
            dataset,
            instances: spec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobConf;
    use crate::coord::dataset::DatasetDefinition;
    use crate::el::Phase;
    use crate::error::ErrorCode;

    fn catalog() -> DatasetCatalog {
        let element = Element::parse(
            r#"<dataset name="logs" frequency="60" freq_timeunit="MINUTE" end_of_duration="NONE"
                initial-instance="2024-01-01T00:00Z" timezone="UTC"><uri-template>/logs</uri-template></dataset>"#,
        )
        .unwrap();
        let mut catalog = DatasetCatalog::default();
        catalog.push(DatasetDefinition::from_element(&element).unwrap());
        catalog
    }

    fn app(events: &str) -> Element {
        Element::parse(&format!("<coordinator-app>{}</coordinator-app>", events)).unwrap()
    }

    fn bind(events: &str) -> Result<(Vec<EventBinding>, DataNameMap)> {
        let catalog = catalog();
        let mut ev = Evaluator::new(Phase::Instances, &JobConf::new());
        EventBinder::new(&catalog).bind(&app(events), &mut ev)
    }

    #[test]
    fn test_same_name_in_both_directions_is_allowed() {
        let (bindings, names) = bind(
            r#"<input-events><data-in name="X" dataset="logs"><instance>${coord:current(0)}</instance></data-in></input-events>
               <output-events><data-out name="X" dataset="logs"><instance>${coord:current(0)}</instance></data-out></output-events>"#,
        )
        .unwrap();
        assert_eq!(bindings.len(), 2);
        assert!(names.contains("X", EventDirection::In));
        assert!(names.contains("X", EventDirection::Out));
    }

    #[test]
    fn test_duplicate_data_in() {
        let err = bind(
            r#"<input-events>
                 <data-in name="X" dataset="logs"><instance>${coord:current(0)}</instance></data-in>
                 <data-in name="X" dataset="logs"><instance>${coord:current(-1)}</instance></data-in>
               </input-events>"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::DuplicateName {
                kind: NameKind::DataIn,
                ..
            }
        ));
    }

    #[test]
    fn test_undefined_dataset() {
        let err = bind(
            r#"<input-events><data-in name="i" dataset="missing"><instance>${coord:current(0)}</instance></data-in></input-events>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NAMING_UNDEFINED_REFERENCE);
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_range_and_bad_instance() {
        let (bindings, _) = bind(
            r#"<input-events><data-in name="i" dataset="logs">
                 <start-instance>${coord:current(-2)}</start-instance><end-instance>${coord:current(0)}</end-instance>
               </data-in></input-events>"#,
        )
        .unwrap();
        assert_eq!(
            bindings[0].instances,
            InstanceSpec::Range {
                start: "${coord:current(-2)}".into(),
                end: "${coord:current(0)}".into()
            }
        );

        let err = bind(
            r#"<input-events><data-in name="i" dataset="logs"><instance>${coord:latest(2)}</instance></data-in></input-events>"#,
        )
        .unwrap_err();
        assert_eq!(err.category(), "expression");
    }
}

//! Final assembly of a resolved coordinator tree

use super::dataset::DatasetCatalog;
use super::events::EventDirection;
use crate::error::{Result, SubmitError};
use crate::xml::Element;

/// Splices catalog datasets into the event bindings that use them
pub struct AppAssembler<'a> {
    catalog: &'a DatasetCatalog,
}

impl<'a> AppAssembler<'a> {
    pub fn new(catalog: &'a DatasetCatalog) -> Self {
        Self { catalog }
    }

    /// Insert a copy of the referenced dataset as the first child of every
    /// `data-in` and `data-out`, then drop the `<datasets>` section.
    pub fn assemble(&self, app: &mut Element) -> Result<()> {
        for direction in [EventDirection::In, EventDirection::Out] {
            let Some(group) = app.child_mut(direction.group_name()) else {
                continue;
            };
            for binding in group.children_named_mut(direction.element_name()) {
                let dataset = binding.attr("dataset").ok_or_else(|| {
                    SubmitError::invalid_attribute(
                        direction.element_name(),
                        "binding has no 'dataset' attribute",
                    )
                })?;
                let definition = self.catalog.find(dataset)?;
                binding.insert_child(0, definition.element.clone());
            }
        }
        app.remove_children("datasets");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::dataset::DatasetDefinition;
    use crate::error::ErrorCode;

    const APP: &str = r#"<coordinator-app xmlns="uri:oozie:coordinator:0.2">
      <datasets><dataset name="d" frequency="60" initial-instance="2024-01-01T00:00Z" timezone="UTC">
        <uri-template>/d</uri-template></dataset></datasets>
      <input-events><data-in name="i" dataset="d"><instance>${coord:current(0)}</instance></data-in></input-events>
      <output-events><data-out name="o" dataset="d"><instance>${coord:current(0)}</instance></data-out></output-events>
    </coordinator-app>"#;

    fn catalog(app: &Element) -> DatasetCatalog {
        let mut catalog = DatasetCatalog::default();
        for element in app.child("datasets").unwrap().children_named("dataset") {
            catalog.push(DatasetDefinition::from_element(element).unwrap());
        }
        catalog
    }

    #[test]
    fn test_dataset_becomes_first_child() {
        let mut app = Element::parse(APP).unwrap();
        let catalog = catalog(&app);
        AppAssembler::new(&catalog).assemble(&mut app).unwrap();

        assert!(app.child("datasets").is_none());
        for (group, event) in [("input-events", "data-in"), ("output-events", "data-out")] {
            let binding = app.child(group).and_then(|g| g.child(event)).unwrap();
            let first = binding.elements().next().unwrap();
            assert_eq!(first.local_name(), "dataset");
            assert_eq!(first.namespace(), Some("uri:oozie:coordinator:0.2"));
            assert!(binding.child("instance").is_some());
        }
    }

    #[test]
    fn test_unknown_dataset() {
        let mut app = Element::parse(&APP.replace("dataset=\"d\"><instance>${coord:current(0)}</instance></data-out>", "dataset=\"x\"><instance>${coord:current(0)}</instance></data-out>")).unwrap();
        let catalog = catalog(&app);
        let err = AppAssembler::new(&catalog).assemble(&mut app).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NAMING_UNDEFINED_REFERENCE);
    }
}

//! Dataset resolution and the dataset catalog
//!
//! Datasets come from two places: `<dataset>` elements written inline under
//! `<datasets>` and dataset files pulled in with `<include>`. Both are
//! resolved the same way and collected into one [`DatasetCatalog`], where an
//! inline dataset replaces an included one with the same name.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::{resolve_attribute, resolve_tag_contents, ExpressionEnvironment};
use crate::abstractions::{DefinitionLoader, SchemaName, SchemaValidator};
use crate::error::{ErrorCode, NameKind, Result, SubmitError};
use crate::time::{check_timezone, parse_frequency, parse_utc, TimeUnit};
use crate::xml::Element;

/// Attribute stamped with the unit chosen by the frequency function
pub const FREQ_TIMEUNIT_ATTR: &str = "freq_timeunit";
pub const END_OF_DURATION_ATTR: &str = "end_of_duration";

/// A fully resolved dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDefinition {
    pub name: String,
    pub frequency: i64,
    pub time_unit: TimeUnit,
    pub end_of_duration: TimeUnit,
    pub initial_instance: DateTime<Utc>,
    pub timezone: String,
    pub uri_template: String,
    pub done_flag: Option<String>,
    /// The resolved element, spliced into each event binding
    pub element: Element,
}

fn dataset_attr<'a>(element: &'a Element, name: &str) -> Result<&'a str> {
    element.attr(name).ok_or_else(|| {
        SubmitError::invalid_attribute(
            name,
            format!(
                "dataset '{}' has no '{}' attribute",
                element.attr("name").unwrap_or("?"),
                name
            ),
        )
    })
}

impl DatasetDefinition {
    /// Read a dataset whose attributes have already been resolved
    pub fn from_element(element: &Element) -> Result<Self> {
        let name = dataset_attr(element, "name")?.to_string();
        let frequency_text = dataset_attr(element, "frequency")?;
        let frequency = frequency_text.trim().parse::<i64>().map_err(|_| {
            SubmitError::invalid_attribute(
                "frequency",
                format!("dataset '{}' frequency '{}' is not an integer", name, frequency_text),
            )
        })?;
        let time_unit = match element.attr(FREQ_TIMEUNIT_ATTR) {
            Some(unit) => unit.parse()?,
            None => TimeUnit::Minute,
        };
        let end_of_duration = match element.attr(END_OF_DURATION_ATTR) {
            Some(unit) => unit.parse()?,
            None => TimeUnit::None,
        };
        let initial_instance = parse_utc(
            dataset_attr(element, "initial-instance")?,
            "initial-instance",
        )?;
        let timezone = dataset_attr(element, "timezone")?.to_string();
        let uri_template = element
            .child("uri-template")
            .map(|e| e.text().trim().to_string())
            .unwrap_or_default();
        let done_flag = element.child("done-flag").map(|e| e.text().trim().to_string());

        Ok(Self {
            name,
            frequency,
            time_unit,
            end_of_duration,
            initial_instance,
            timezone,
            uri_template,
            done_flag,
            element: element.clone(),
        })
    }
}

/// Resolve one `<dataset>` element in place
pub fn resolve_dataset(
    element: &mut Element,
    env: &mut ExpressionEnvironment,
) -> Result<DatasetDefinition> {
    let name = dataset_attr(element, "name")?.to_string();

    env.frequency.reset_frequency();
    let frequency = resolve_attribute(element, "frequency", &mut env.frequency)?
        .ok_or_else(|| {
            SubmitError::invalid_attribute("frequency", format!("dataset '{}' has no frequency", name))
        })?;
    parse_frequency(&frequency, "frequency")
        .map_err(|e| e.with_context(format!("dataset '{}'", name)))?;
    element.set_attr(FREQ_TIMEUNIT_ATTR, env.frequency.time_unit().as_str());
    element.set_attr(END_OF_DURATION_ATTR, env.frequency.end_of_duration().as_str());

    if let Some(initial) = resolve_attribute(element, "initial-instance", &mut env.nofuncs)? {
        parse_utc(&initial, "initial-instance")?;
    }
    if let Some(timezone) = resolve_attribute(element, "timezone", &mut env.nofuncs)? {
        check_timezone(&timezone, "timezone")?;
    }
    resolve_tag_contents(element, "uri-template", &mut env.nofuncs)?;
    resolve_tag_contents(element, "done-flag", &mut env.nofuncs)?;

    DatasetDefinition::from_element(element)
}

/// Resolved datasets in definition order
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    entries: Vec<DatasetDefinition>,
}

impl DatasetCatalog {
    pub fn push(&mut self, dataset: DatasetDefinition) {
        self.entries.push(dataset);
    }

    pub fn get(&self, name: &str) -> Option<&DatasetDefinition> {
        self.entries.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up a dataset that a binding refers to
    pub fn find(&self, name: &str) -> Result<&DatasetDefinition> {
        self.get(name)
            .ok_or_else(|| SubmitError::undefined_reference(NameKind::Dataset, name))
    }

    /// Remove and return the dataset called `name`
    pub fn remove(&mut self, name: &str) -> Result<DatasetDefinition> {
        let index = self
            .entries
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| SubmitError::undefined_reference(NameKind::Dataset, name))?;
        Ok(self.entries.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetDefinition> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directory part of a definition path, with trailing slash
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// Absolute paths and URIs are kept; anything else is taken relative to
/// the including document
fn include_location(base: &str, include: &str) -> String {
    if include.starts_with('/') || include.contains("://") {
        include.to_string()
    } else {
        format!("{}{}", parent_dir(base), include)
    }
}

/// Builds the catalog for one coordinator from its `<datasets>` section
pub struct DatasetCatalogBuilder<'a> {
    loader: &'a dyn DefinitionLoader,
    validator: Option<&'a dyn SchemaValidator>,
    max_depth: usize,
}

impl<'a> DatasetCatalogBuilder<'a> {
    pub fn new(loader: &'a dyn DefinitionLoader, max_depth: usize) -> Self {
        Self {
            loader,
            validator: None,
            max_depth,
        }
    }

    /// Validate each included file before resolving it
    pub fn with_validator(mut self, validator: &'a dyn SchemaValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Resolve inline datasets in place, then pull in every include.
    ///
    /// `app_path` anchors relative include paths. Included datasets take
    /// on `target_namespace` so they serialize as part of the coordinator.
    pub async fn build(
        &self,
        datasets: Option<&mut Element>,
        app_path: &str,
        target_namespace: Option<&str>,
        env: &mut ExpressionEnvironment,
    ) -> Result<DatasetCatalog> {
        let mut catalog = DatasetCatalog::default();
        let Some(datasets) = datasets else {
            return Ok(catalog);
        };

        let mut includes = Vec::new();
        for include in datasets.children_named_mut("include") {
            let resolved = env.nofuncs.evaluate(include.text().trim())?;
            include.set_text(resolved.clone());
            includes.push(include_location(app_path, resolved.trim()));
        }

        let mut inline = Vec::new();
        for element in datasets.children_named_mut("dataset") {
            inline.push(resolve_dataset(element, env)?);
        }

        self.include_files(includes, target_namespace, env, &mut catalog)
            .await?;

        let mut inline_names = HashSet::new();
        for dataset in inline {
            if !inline_names.insert(dataset.name.clone()) {
                return Err(SubmitError::duplicate_name(NameKind::Dataset, dataset.name));
            }
            if catalog.contains(&dataset.name) {
                debug!(dataset = %dataset.name, "inline dataset overrides included definition");
                catalog.remove(&dataset.name)?;
            }
            catalog.push(dataset);
        }

        debug!(datasets = catalog.len(), "dataset catalog built");
        Ok(catalog)
    }

    /// Depth-first walk over include files. Every file may be visited once.
    async fn include_files(
        &self,
        roots: Vec<String>,
        target_namespace: Option<&str>,
        env: &mut ExpressionEnvironment,
        catalog: &mut DatasetCatalog,
    ) -> Result<()> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut pending: Vec<(String, usize)> = roots.into_iter().rev().map(|p| (p, 1)).collect();

        while let Some((path, depth)) = pending.pop() {
            if depth > self.max_depth {
                return Err(SubmitError::definition_read(
                    ErrorCode::DEFINITION_INCLUDE_TOO_DEEP,
                    format!("dataset includes nest deeper than {}", self.max_depth),
                    path,
                ));
            }
            if !visited.insert(path.clone()) {
                return Err(SubmitError::definition_read(
                    ErrorCode::DEFINITION_INCLUDE_CYCLE,
                    "dataset file is included more than once",
                    path,
                ));
            }

            let xml = self.loader.read(&path).await?;
            if let Some(validator) = self.validator {
                validator
                    .validate(SchemaName::Datasets, &xml)
                    .map_err(|e| e.with_context(format!("included file {}", path)))?;
            }
            let mut file = Element::parse(&xml).map_err(|e| {
                warn!(include = %path, error = %e, "included dataset file is not valid XML");
                e.with_context(format!("included file {}", path))
            })?;

            for element in file.children_named_mut("dataset") {
                let mut resolved = resolve_dataset(element, env)?;
                if catalog.contains(&resolved.name) {
                    return Err(SubmitError::duplicate_name(NameKind::Dataset, resolved.name));
                }
                resolved.element.normalize_namespace(target_namespace);
                catalog.push(resolved);
            }

            let nested: Vec<String> = file
                .children_named("include")
                .map(|inc| include_location(&path, inc.text().trim()))
                .collect();
            for include in nested.into_iter().rev() {
                pending.push((include, depth + 1));
            }
            debug!(include = %path, depth, "included dataset file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::StructuralSchemaValidator;
    use crate::config::JobConf;
    use crate::testing::MemoryDefinitionLoader;

    const NS: &str = "uri:oozie:coordinator:0.2";

    fn env() -> ExpressionEnvironment {
        let conf: JobConf = [("base", "hdfs://nn/data"), ("user.name", "alice")]
            .into_iter()
            .collect();
        ExpressionEnvironment::new(&conf)
    }

    fn dataset(name: &str, frequency: &str) -> String {
        format!(
            r#"<dataset name="{}" frequency="{}" initial-instance="2024-01-01T00:00Z" timezone="UTC"><uri-template>${{base}}/{}/${{YEAR}}</uri-template></dataset>"#,
            name, frequency, name
        )
    }

    fn datasets(body: &str) -> Element {
        Element::parse(&format!(r#"<datasets xmlns="{}">{}</datasets>"#, NS, body)).unwrap()
    }

    #[test]
    fn test_resolve_dataset_stamps_unit() {
        let mut element = Element::parse(&dataset("logs", "${coord:endOfDays(1)}")).unwrap();
        let resolved = resolve_dataset(&mut element, &mut env()).unwrap();

        assert_eq!(resolved.frequency, 1);
        assert_eq!(resolved.time_unit, TimeUnit::Day);
        assert_eq!(resolved.end_of_duration, TimeUnit::EndOfDay);
        assert_eq!(resolved.uri_template, "hdfs://nn/data/logs/${YEAR}");
        assert_eq!(element.attr(FREQ_TIMEUNIT_ATTR), Some("DAY"));
        assert_eq!(element.attr(END_OF_DURATION_ATTR), Some("END_OF_DAY"));
        assert!(resolved.done_flag.is_none());
    }

    #[test]
    fn test_resolve_dataset_rejects_bad_values() {
        let mut zero = Element::parse(&dataset("d", "0")).unwrap();
        assert!(resolve_dataset(&mut zero, &mut env()).is_err());

        let mut bad_tz = Element::parse(&dataset("d", "60").replace("UTC", "not a zone")).unwrap();
        assert!(resolve_dataset(&mut bad_tz, &mut env()).is_err());
    }

    #[test]
    fn test_catalog_lookup() {
        let mut element = Element::parse(&dataset("a", "60")).unwrap();
        let mut catalog = DatasetCatalog::default();
        catalog.push(resolve_dataset(&mut element, &mut env()).unwrap());

        assert!(catalog.find("a").is_ok());
        let err = catalog.find("b").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NAMING_UNDEFINED_REFERENCE);
        assert!(catalog.remove("b").is_err());
        assert_eq!(catalog.remove("a").unwrap().name, "a");
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_inline_overrides_include() {
        let loader = MemoryDefinitionLoader::new().with_document(
            "hdfs://nn/apps/shared.xml",
            format!("<datasets>{}{}</datasets>", dataset("A", "60"), dataset("B", "60")),
        );
        let mut section = datasets(&format!(
            "<include>shared.xml</include>{}",
            dataset("A", "${coord:days(1)}")
        ));

        let catalog = DatasetCatalogBuilder::new(&loader, 8)
            .with_validator(&StructuralSchemaValidator)
            .build(Some(&mut section), "hdfs://nn/apps/coord.xml", Some(NS), &mut env())
            .await
            .unwrap();

        assert_eq!(catalog.names(), vec!["B", "A"]);
        assert_eq!(catalog.find("A").unwrap().time_unit, TimeUnit::Day);
        assert_eq!(catalog.find("B").unwrap().element.namespace(), Some(NS));
    }

    #[tokio::test]
    async fn test_duplicate_across_includes() {
        let loader = MemoryDefinitionLoader::new()
            .with_document("/inc/one.xml", format!("<datasets>{}</datasets>", dataset("A", "60")))
            .with_document("/inc/two.xml", format!("<datasets>{}</datasets>", dataset("A", "30")));
        let mut section = datasets("<include>/inc/one.xml</include><include>/inc/two.xml</include>");

        let err = DatasetCatalogBuilder::new(&loader, 8)
            .build(Some(&mut section), "/apps/coord.xml", Some(NS), &mut env())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::DuplicateName {
                kind: NameKind::Dataset,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_inline() {
        let loader = MemoryDefinitionLoader::new();
        let mut section = datasets(&format!("{}{}", dataset("A", "60"), dataset("A", "30")));
        let err = DatasetCatalogBuilder::new(&loader, 8)
            .build(Some(&mut section), "/apps/coord.xml", Some(NS), &mut env())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NAMING_DUPLICATE);
    }

    #[tokio::test]
    async fn test_include_cycle_and_depth() {
        let loader = MemoryDefinitionLoader::new()
            .with_document("/inc/a.xml", "<datasets><include>/inc/b.xml</include></datasets>")
            .with_document("/inc/b.xml", "<datasets><include>a.xml</include></datasets>");
        let mut section = datasets("<include>/inc/a.xml</include>");
        let err = DatasetCatalogBuilder::new(&loader, 8)
            .build(Some(&mut section), "/apps/coord.xml", Some(NS), &mut env())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DEFINITION_INCLUDE_CYCLE);

        let mut section = datasets("<include>/inc/a.xml</include>");
        let err = DatasetCatalogBuilder::new(&loader, 1)
            .build(Some(&mut section), "/apps/coord.xml", Some(NS), &mut env())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DEFINITION_INCLUDE_TOO_DEEP);
    }

    #[tokio::test]
    async fn test_missing_include_and_no_section() {
        let loader = MemoryDefinitionLoader::new();
        let mut section = datasets("<include>/inc/absent.xml</include>");
        let err = DatasetCatalogBuilder::new(&loader, 8)
            .build(Some(&mut section), "/apps/coord.xml", Some(NS), &mut env())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "definition-read");

        let catalog = DatasetCatalogBuilder::new(&loader, 8)
            .build(None, "/apps/coord.xml", Some(NS), &mut env())
            .await
            .unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_include_location() {
        assert_eq!(include_location("hdfs://nn/apps/c.xml", "ds.xml"), "hdfs://nn/apps/ds.xml");
        assert_eq!(include_location("hdfs://nn/apps/c.xml", "/abs/ds.xml"), "/abs/ds.xml");
        assert_eq!(include_location("c.xml", "ds.xml"), "ds.xml");
    }
}

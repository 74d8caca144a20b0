//! Phase-ordered resolution of a coordinator definition

use chrono::{DateTime, Utc};
use tracing::debug;

use super::assemble::AppAssembler;
use super::dataset::{
    DatasetCatalog, DatasetCatalogBuilder, END_OF_DURATION_ATTR, FREQ_TIMEUNIT_ATTR,
};
use super::events::{DataNameMap, EventBinder, EventBinding};
use super::{resolve_attribute, resolve_tag_contents, ExpressionEnvironment};
use crate::abstractions::{DefinitionLoader, SchemaName, SchemaValidator};
use crate::config::JobConf;
use crate::error::{ErrorCode, Result, SubmitError};
use crate::job::ControlSettings;
use crate::time::{check_timezone, parse_frequency, parse_utc, TimeUnit};
use crate::xml::{Element, SLA_NAMESPACE_PREFIX};

/// Timing attributes of a resolved coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub frequency: i64,
    pub time_unit: TimeUnit,
    pub end_of_duration: TimeUnit,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
}

/// Everything resolution learned about one coordinator
#[derive(Debug, Clone)]
pub struct ResolvedCoordinator {
    /// Assembled definition: datasets spliced into bindings, no `<datasets>`
    pub app: Element,
    pub catalog: DatasetCatalog,
    pub events: Vec<EventBinding>,
    pub data_names: DataNameMap,
    pub schedule: Schedule,
    pub controls: ControlSettings,
}

fn missing_element(parent: &str, child: &str) -> SubmitError {
    SubmitError::validation_with_code(
        ErrorCode::VALIDATION_MISSING_ELEMENT,
        format!("<{}> has no <{}> element", parent, child),
        Some(child.to_string()),
    )
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| SubmitError::invalid_attribute(field, "attribute is missing"))
}

/// Resolves coordinator definitions
pub struct CoordResolver<'a> {
    loader: &'a dyn DefinitionLoader,
    validator: Option<&'a dyn SchemaValidator>,
    default_timeout: i64,
    max_include_depth: usize,
}

impl<'a> CoordResolver<'a> {
    pub fn new(
        loader: &'a dyn DefinitionLoader,
        default_timeout: i64,
        max_include_depth: usize,
    ) -> Self {
        Self {
            loader,
            validator: None,
            default_timeout,
            max_include_depth,
        }
    }

    /// Validator for included dataset files and the SLA block
    pub fn with_validator(mut self, validator: &'a dyn SchemaValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Resolve `xml`, read from `app_path`, against `conf`
    pub async fn resolve(
        &self,
        xml: &str,
        app_path: &str,
        conf: &JobConf,
    ) -> Result<ResolvedCoordinator> {
        let mut app = Element::parse(xml)?;
        let mut env = ExpressionEnvironment::new(conf);

        let schedule = self.resolve_schedule(&mut app, &mut env)?;
        let controls = self.resolve_controls(&mut app, &mut env)?;

        let namespace = app.namespace().map(str::to_string);
        let mut builder = DatasetCatalogBuilder::new(self.loader, self.max_include_depth);
        if let Some(validator) = self.validator {
            builder = builder.with_validator(validator);
        }
        let catalog = builder
            .build(app.child_mut("datasets"), app_path, namespace.as_deref(), &mut env)
            .await?;

        let (events, data_names) = EventBinder::new(&catalog).bind(&app, &mut env.instances)?;

        self.resolve_action(&mut app, &mut env, &data_names)?;

        AppAssembler::new(&catalog).assemble(&mut app)?;
        debug!(
            datasets = catalog.len(),
            events = events.len(),
            "coordinator definition resolved"
        );

        Ok(ResolvedCoordinator {
            app,
            catalog,
            events,
            data_names,
            schedule,
            controls,
        })
    }

    fn resolve_schedule(
        &self,
        app: &mut Element,
        env: &mut ExpressionEnvironment,
    ) -> Result<Schedule> {
        resolve_attribute(app, "name", &mut env.nofuncs)?;

        env.frequency.reset_frequency();
        let frequency_text = required(
            resolve_attribute(app, "frequency", &mut env.frequency)?,
            "frequency",
        )?;
        let frequency = parse_frequency(&frequency_text, "frequency")?;
        let time_unit = env.frequency.time_unit();
        let end_of_duration = env.frequency.end_of_duration();
        app.set_attr(FREQ_TIMEUNIT_ATTR, time_unit.as_str());
        app.set_attr(END_OF_DURATION_ATTR, end_of_duration.as_str());

        let start = required(resolve_attribute(app, "start", &mut env.nofuncs)?, "start")?;
        let start = parse_utc(&start, "start")?;
        let end = required(resolve_attribute(app, "end", &mut env.nofuncs)?, "end")?;
        let end = parse_utc(&end, "end")?;
        if start > end {
            return Err(SubmitError::invalid_attribute(
                "end",
                "coordinator end time is before its start time",
            ));
        }

        let timezone = required(
            resolve_attribute(app, "timezone", &mut env.nofuncs)?,
            "timezone",
        )?;
        check_timezone(&timezone, "timezone")?;

        Ok(Schedule {
            frequency,
            time_unit,
            end_of_duration,
            start,
            end,
            timezone,
        })
    }

    fn resolve_controls(
        &self,
        app: &mut Element,
        env: &mut ExpressionEnvironment,
    ) -> Result<ControlSettings> {
        if let Some(controls) = app.child_mut("controls") {
            for tag in ["timeout", "concurrency", "execution"] {
                resolve_tag_contents(controls, tag, &mut env.nofuncs)?;
            }
        }
        ControlSettings::from_element(app.child("controls"), self.default_timeout)
    }

    fn resolve_action(
        &self,
        app: &mut Element,
        env: &mut ExpressionEnvironment,
        data_names: &DataNameMap,
    ) -> Result<()> {
        let root = app.local_name().to_string();
        let action = app
            .child_mut("action")
            .ok_or_else(|| missing_element(&root, "action"))?;
        let workflow = action
            .child_mut("workflow")
            .ok_or_else(|| missing_element("action", "workflow"))?;
        resolve_tag_contents(workflow, "app-path", &mut env.nofuncs)?;

        if let Some(configuration) = workflow.child_mut("configuration") {
            let mut data = env.data_echo(data_names.clone());
            for property in configuration.children_named_mut("property") {
                resolve_tag_contents(property, "name", &mut data)?;
                // values are checked only; the materializer evaluates them per action
                let mut scratch = property.clone();
                resolve_tag_contents(&mut scratch, "value", &mut data)?;
            }
        }

        if let Some(sla) = action.child_in_namespace("info", SLA_NAMESPACE_PREFIX) {
            let text = env.sla.evaluate(&sla.detached().to_xml_string())?;
            if let Some(validator) = self.validator {
                validator.validate(SchemaName::Sla, &text).map_err(|e| {
                    SubmitError::validation_with_code(
                        ErrorCode::VALIDATION_SLA,
                        format!("SLA block rejected: {}", e),
                        Some("info".to_string()),
                    )
                    .with_source(e)
                })?;
            }
        }
        Ok(())
    }
}

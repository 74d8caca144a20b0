//! The submission orchestrator
//!
//! Every submission walks the same phases: precondition (real submissions
//! only), loading, validating, merging configuration, resolving, assembling
//! and persisting. A failure in any phase marks the in-memory record FAILED,
//! tells a parent bundle about it, and surfaces as a [`SubmissionError`]
//! naming the phase. Nothing is written before the persisting phase, and
//! persistence is never retried.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::phase::{PhaseResultExt, SubmissionError, SubmissionPhase, SubmissionResult};
use crate::abstractions::{
    BundleStatusNotifier, BundleStatusUpdate, DefinitionLoader, IdGenerator,
    MaterializationQueue, MaterializationRequest, SchemaName, SchemaValidator,
};
use crate::bundle::BundleResolver;
use crate::config::{
    default_config_path, ConfigMerger, JobConf, SubmitSettings, AUTH_TOKEN, LOG_TOKEN, USER_NAME,
};
use crate::coord::{CoordResolver, MaterializationPreview};
use crate::error::{ErrorCode, Result, SubmitError};
use crate::job::{BundleJob, CoordinatorJob, JobKind, JobRecordBuilder, JobStatus};
use crate::storage::JobStore;

/// Result of a dry run: nothing was stored or scheduled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunPreview {
    /// Throwaway identifier, never persisted
    pub job_id: String,
    pub status: JobStatus,
    pub text: String,
    /// End of the materialization preview window (coordinators only)
    pub window_end: Option<DateTime<Utc>>,
    pub action_count: usize,
}

/// Bundle on whose behalf a coordinator is submitted
#[derive(Debug, Clone, Copy)]
struct ParentBundle<'a> {
    bundle_id: &'a str,
    coord_name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Submit,
    DryRun,
}

/// Definition location for an application path: a path naming an `.xml`
/// file is used as is, anything else is treated as a directory holding the
/// kind's default definition file.
pub fn definition_uri(app_path: &str, kind: JobKind) -> String {
    let trimmed = app_path.trim();
    if trimmed.ends_with(".xml") {
        trimmed.to_string()
    } else {
        format!("{}/{}", trimmed.trim_end_matches('/'), kind.definition_file())
    }
}

fn dry_run_id(kind: JobKind) -> String {
    format!("dryrun-{}-{}", Uuid::new_v4(), kind.id_suffix())
}

fn submission_span(kind: JobKind, conf: &JobConf) -> Span {
    info_span!(
        "submit",
        kind = %kind,
        user = conf.get(USER_NAME).unwrap_or("-"),
        app_path = conf.get(kind.app_path_key()).unwrap_or("-"),
        token = conf.get(LOG_TOKEN).unwrap_or("-"),
    )
}

/// Turns coordinator and bundle definitions into persisted job records
pub struct SubmissionService {
    pub(super) loader: Arc<dyn DefinitionLoader>,
    pub(super) validator: Arc<dyn SchemaValidator>,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub(super) store: Option<Arc<dyn JobStore>>,
    pub(super) queue: Option<Arc<dyn MaterializationQueue>>,
    pub(super) notifier: Arc<dyn BundleStatusNotifier>,
    pub(super) merger: ConfigMerger,
    pub(super) settings: SubmitSettings,
}

impl SubmissionService {
    pub fn settings(&self) -> &SubmitSettings {
        &self.settings
    }

    /// Submit a coordinator and schedule its first materialization
    pub async fn submit_coordinator(&self, conf: JobConf) -> SubmissionResult<String> {
        let span = submission_span(JobKind::Coordinator, &conf);
        async move {
            info!("STARTED coordinator submit");
            let (job, _) = self.run_coordinator(conf, Mode::Submit, None).await?;
            info!(job_id = %job.id, "ENDED coordinator submit");
            Ok(job.id)
        }
        .instrument(span)
        .await
    }

    /// Resolve a coordinator and preview its first actions without storing it
    pub async fn dry_run_coordinator(&self, conf: JobConf) -> SubmissionResult<DryRunPreview> {
        let span = submission_span(JobKind::Coordinator, &conf);
        async move {
            info!("STARTED coordinator dry run");
            let (job, preview) = self.run_coordinator(conf, Mode::DryRun, None).await?;
            let namespace = namespace_of(&job.job_xml);
            let (text, window_end, action_count) = match preview {
                Some(preview) => (
                    preview.dry_run_text(&job.job_xml, namespace.as_deref()),
                    Some(preview.window_end),
                    preview.actions.len(),
                ),
                None => (job.job_xml.clone(), None, 0),
            };
            info!(job_id = %job.id, actions = action_count, "ENDED coordinator dry run");
            Ok(DryRunPreview {
                job_id: job.id,
                status: job.status,
                text,
                window_end,
                action_count,
            })
        }
        .instrument(span)
        .await
    }

    /// Submit a coordinator as the child `coord_name` of `bundle_id`.
    ///
    /// The bundle is notified of the outcome exactly once, success or not,
    /// before this returns.
    pub async fn submit_bundle_coordinator(
        &self,
        conf: JobConf,
        bundle_id: &str,
        coord_name: &str,
    ) -> SubmissionResult<String> {
        let span = submission_span(JobKind::Coordinator, &conf);
        async move {
            info!(bundle_id, coord_name, "STARTED bundle coordinator submit");
            let parent = ParentBundle {
                bundle_id,
                coord_name,
            };
            let (job, _) = self.run_coordinator(conf, Mode::Submit, Some(parent)).await?;
            info!(job_id = %job.id, bundle_id, "ENDED bundle coordinator submit");
            Ok(job.id)
        }
        .instrument(span)
        .await
    }

    /// Submit a bundle; its coordinators are recorded, not started
    pub async fn submit_bundle(&self, conf: JobConf) -> SubmissionResult<String> {
        let span = submission_span(JobKind::Bundle, &conf);
        async move {
            info!("STARTED bundle submit");
            let job = self.run_bundle(conf, Mode::Submit).await?;
            info!(job_id = %job.id, coordinators = job.coordinators.len(), "ENDED bundle submit");
            Ok(job.id)
        }
        .instrument(span)
        .await
    }

    /// Resolve a bundle and return its resolved definition
    pub async fn dry_run_bundle(&self, conf: JobConf) -> SubmissionResult<DryRunPreview> {
        let span = submission_span(JobKind::Bundle, &conf);
        async move {
            info!("STARTED bundle dry run");
            let job = self.run_bundle(conf, Mode::DryRun).await?;
            info!(job_id = %job.id, "ENDED bundle dry run");
            Ok(DryRunPreview {
                text: format!("{}\n", job.job_xml),
                job_id: job.id,
                status: job.status,
                window_end: None,
                action_count: 0,
            })
        }
        .instrument(span)
        .await
    }

    async fn run_coordinator(
        &self,
        conf: JobConf,
        mode: Mode,
        parent: Option<ParentBundle<'_>>,
    ) -> SubmissionResult<(CoordinatorJob, Option<MaterializationPreview>)> {
        let mut job = CoordinatorJob::draft(
            conf.get(JobKind::Coordinator.app_path_key()).unwrap_or_default(),
            conf.get(USER_NAME).unwrap_or_default(),
            Utc::now(),
        );
        if let Some(parent) = parent {
            job.bundle_id = Some(parent.bundle_id.to_string());
            job.app_name = parent.coord_name.to_string();
        }

        let result = self.coordinator_phases(conf, &mut job, mode).await;
        if let Err(err) = &result {
            job.status = JobStatus::Failed;
            job.last_modified_time = Utc::now();
            debug!(phase = %err.phase, "coordinator marked {}", job.status);
        }
        if let Some(parent) = parent {
            self.notify_parent(parent, &job).await;
        }
        result.map(|preview| (job, preview))
    }

    async fn coordinator_phases(
        &self,
        mut conf: JobConf,
        job: &mut CoordinatorJob,
        mode: Mode,
    ) -> SubmissionResult<Option<MaterializationPreview>> {
        if mode == Mode::Submit {
            self.check_store().await.in_phase(SubmissionPhase::Precondition)?;
        }

        let (uri, xml) = self
            .load_definition(&conf, JobKind::Coordinator)
            .await
            .in_phase(SubmissionPhase::Loading)?;

        self.validator
            .validate(SchemaName::Coordinator, &xml)
            .in_phase(SubmissionPhase::Validating)?;

        self.merge_defaults(&mut conf, &uri, JobKind::Coordinator)
            .await
            .in_phase(SubmissionPhase::MergingConfig)?;

        let resolved = CoordResolver::new(
            self.loader.as_ref(),
            self.settings.default_timeout_minutes,
            self.settings.max_include_depth,
        )
        .with_validator(self.validator.as_ref())
        .resolve(&xml, &uri, &conf)
        .await
        .in_phase(SubmissionPhase::Resolving)?;
        debug!(xml = %resolved.app.to_xml_string(), "resolved coordinator definition");

        JobRecordBuilder::new(&conf, self.settings.default_timeout_minutes)
            .at(Utc::now())
            .fill_coordinator(job, &resolved.app, &xml)
            .in_phase(SubmissionPhase::Assembling)?;
        job.user = conf.get(USER_NAME).unwrap_or_default().to_string();
        job.auth_token = conf.get(AUTH_TOKEN).map(str::to_string);

        if mode == Mode::DryRun {
            job.id = dry_run_id(JobKind::Coordinator);
            job.status = JobStatus::Premater;
            let preview = MaterializationPreview::compute(&resolved, self.settings.dry_run_window());
            return Ok(Some(preview));
        }

        job.id = self.ids.generate(JobKind::Coordinator);
        job.status = JobStatus::Prep;
        let store = self.store().in_phase(SubmissionPhase::Persisting)?;
        store
            .insert_coordinator(job)
            .await
            .map_err(SubmitError::from)
            .in_phase(SubmissionPhase::Persisting)?;

        self.schedule_materialization(job).await;
        Ok(None)
    }

    async fn run_bundle(&self, conf: JobConf, mode: Mode) -> SubmissionResult<BundleJob> {
        let mut job = BundleJob::draft(
            conf.get(JobKind::Bundle.app_path_key()).unwrap_or_default(),
            conf.get(USER_NAME).unwrap_or_default(),
            Utc::now(),
        );
        let result = self.bundle_phases(conf, &mut job, mode).await;
        if let Err(err) = &result {
            job.status = JobStatus::Failed;
            job.last_modified_time = Utc::now();
            debug!(phase = %err.phase, "bundle marked {}", job.status);
        }
        result.map(|()| job)
    }

    async fn bundle_phases(
        &self,
        mut conf: JobConf,
        job: &mut BundleJob,
        mode: Mode,
    ) -> SubmissionResult<()> {
        if mode == Mode::Submit {
            self.check_store().await.in_phase(SubmissionPhase::Precondition)?;
        }

        let (uri, xml) = self
            .load_definition(&conf, JobKind::Bundle)
            .await
            .in_phase(SubmissionPhase::Loading)?;

        self.validator
            .validate(SchemaName::Bundle, &xml)
            .in_phase(SubmissionPhase::Validating)?;

        self.merge_defaults(&mut conf, &uri, JobKind::Bundle)
            .await
            .in_phase(SubmissionPhase::MergingConfig)?;

        let resolved = BundleResolver::new()
            .resolve(&xml, &conf)
            .in_phase(SubmissionPhase::Resolving)?;
        debug!(xml = %resolved.app.to_xml_string(), "resolved bundle definition");

        JobRecordBuilder::new(&conf, self.settings.default_timeout_minutes)
            .at(Utc::now())
            .fill_bundle(
                job,
                &resolved.app,
                &xml,
                resolved.kickoff_time,
                resolved.coordinators,
            )
            .in_phase(SubmissionPhase::Assembling)?;
        job.user = conf.get(USER_NAME).unwrap_or_default().to_string();
        job.auth_token = conf.get(AUTH_TOKEN).map(str::to_string);

        if mode == Mode::DryRun {
            job.id = dry_run_id(JobKind::Bundle);
            return Ok(());
        }

        job.id = self.ids.generate(JobKind::Bundle);
        job.status = JobStatus::Prep;
        let store = self.store().in_phase(SubmissionPhase::Persisting)?;
        store
            .insert_bundle(job)
            .await
            .map_err(SubmitError::from)
            .in_phase(SubmissionPhase::Persisting)
    }

    fn store(&self) -> Result<&Arc<dyn JobStore>> {
        self.store.as_ref().ok_or_else(|| {
            SubmitError::precondition("no job store is configured; only dry runs are possible")
        })
    }

    async fn check_store(&self) -> Result<()> {
        let store = self.store()?;
        let unavailable = |message: String| SubmitError::Precondition {
            code: ErrorCode::PRECONDITION_STORE_UNAVAILABLE,
            message,
        };
        let health = store
            .health_check()
            .await
            .map_err(|e| unavailable(format!("job store health check failed: {}", e)))?;
        if !health.healthy {
            return Err(unavailable(format!(
                "{} job store is unavailable: {}",
                health.backend_type,
                health.message.as_deref().unwrap_or("no detail")
            )));
        }
        Ok(())
    }

    async fn load_definition(&self, conf: &JobConf, kind: JobKind) -> Result<(String, String)> {
        let app_path = conf.require(kind.app_path_key())?;
        let uri = definition_uri(app_path, kind);
        let xml = self.loader.read(&uri).await?;
        debug!(uri = %uri, bytes = xml.len(), "loaded {} definition", kind);
        Ok((uri, xml))
    }

    async fn merge_defaults(&self, conf: &mut JobConf, uri: &str, kind: JobKind) -> Result<()> {
        let path = default_config_path(uri, kind.default_config_file());
        let read_failed = |e: SubmitError| {
            SubmitError::config_with_code(
                ErrorCode::CONFIG_READ_FAILED,
                format!("cannot read default configuration {}", path),
            )
            .with_source(e)
        };

        let defaults = if self.loader.exists(&path).await.map_err(read_failed)? {
            let text = self.loader.read(&path).await.map_err(read_failed)?;
            let defaults = JobConf::from_xml(&text)
                .map_err(|e| e.with_context(format!("default configuration {}", path)))?;
            Some(defaults)
        } else {
            None
        };
        self.merger.merge(conf, defaults.as_ref())?;
        conf.require(USER_NAME)?;
        debug!(
            defaults = defaults.as_ref().map_or(0, JobConf::len),
            properties = conf.len(),
            "merged {} configuration",
            kind
        );
        Ok(())
    }

    async fn schedule_materialization(&self, job: &CoordinatorJob) {
        let Some(queue) = &self.queue else {
            debug!(job_id = %job.id, "no materialization queue configured");
            return;
        };
        let lookahead = self.settings.materialization_lookahead();
        let horizon_end = match (job.start_time, job.end_time) {
            (Some(start), Some(end)) => chrono::Duration::from_std(lookahead)
                .ok()
                .and_then(|d| start.checked_add_signed(d))
                .map_or(end, |candidate| candidate.min(end)),
            _ => Utc::now(),
        };
        let request = MaterializationRequest {
            job_id: job.id.clone(),
            horizon_end,
            lookahead_secs: self.settings.materialization_lookahead_secs,
            delay: self.settings.materialization_delay(),
        };
        if let Err(e) = queue.enqueue(request).await {
            warn!(job_id = %job.id, "materialization request not queued: {}", e);
        }
    }

    async fn notify_parent(&self, parent: ParentBundle<'_>, job: &CoordinatorJob) {
        let update = BundleStatusUpdate {
            bundle_id: parent.bundle_id.to_string(),
            coord_job_id: (!job.id.is_empty()).then(|| job.id.clone()),
            coord_name: parent.coord_name.to_string(),
            previous_status: JobStatus::Prep,
            status: job.status,
        };
        if let Err(e) = self.notifier.notify(update).await {
            warn!(bundle_id = parent.bundle_id, "bundle notification failed: {}", e);
        }
    }
}

fn namespace_of(xml: &str) -> Option<String> {
    crate::xml::Element::parse(xml)
        .ok()
        .and_then(|root| root.namespace().map(str::to_string))
}

impl std::fmt::Debug for SubmissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionService")
            .field("store", &self.store.is_some())
            .field("queue", &self.queue.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl From<SubmissionError> for SubmitError {
    fn from(err: SubmissionError) -> Self {
        err.cause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_uri() {
        assert_eq!(
            definition_uri("hdfs://nn/apps/coord", JobKind::Coordinator),
            "hdfs://nn/apps/coord/coordinator.xml"
        );
        assert_eq!(
            definition_uri("hdfs://nn/apps/b/", JobKind::Bundle),
            "hdfs://nn/apps/b/bundle.xml"
        );
        assert_eq!(
            definition_uri("/apps/coord/hourly.xml", JobKind::Coordinator),
            "/apps/coord/hourly.xml"
        );
    }

    #[test]
    fn test_dry_run_ids_are_marked() {
        let id = dry_run_id(JobKind::Coordinator);
        assert!(id.starts_with("dryrun-"));
        assert!(id.ends_with("-C"));
    }
}

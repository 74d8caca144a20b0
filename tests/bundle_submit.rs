use std::sync::Arc;

use coord_submit::config::JobConf;
use coord_submit::error::{ErrorCode, NameKind, SubmitError};
use coord_submit::job::JobStatus;
use coord_submit::storage::{InMemoryJobStore, JobStore};
use coord_submit::submit::{SubmissionPhase, SubmissionService};
use coord_submit::testing::fixtures::{
    bundle_conf, coordinator_conf, HOURLY_COORDINATOR, NIGHTLY_BUNDLE,
};
use coord_submit::testing::{MemoryDefinitionLoader, RecordingNotifier, RecordingQueue};
use coord_submit::time::parse_utc;

const BUNDLE_DIR: &str = "hdfs://nn/apps/bundle";
const BUNDLE_PATH: &str = "hdfs://nn/apps/bundle/bundle.xml";
const COORD_PATH: &str = "hdfs://nn/apps/coord/coordinator.xml";

struct Harness {
    service: SubmissionService,
    store: InMemoryJobStore,
    notifier: RecordingNotifier,
}

fn harness(bundle_xml: &str) -> Harness {
    let loader = MemoryDefinitionLoader::new()
        .with_document(BUNDLE_PATH, bundle_xml)
        .with_document(COORD_PATH, HOURLY_COORDINATOR);
    let store = InMemoryJobStore::new();
    let notifier = RecordingNotifier::new();
    let service = SubmissionService::builder(Arc::new(loader))
        .with_store(Arc::new(store.clone()))
        .with_queue(Arc::new(RecordingQueue::new()))
        .with_notifier(Arc::new(notifier.clone()))
        .build();
    Harness {
        service,
        store,
        notifier,
    }
}

/// Configuration for a child: the bundle's coordinator properties on top
/// of a standard submission configuration
fn child_conf(app_path: &str, overrides: &JobConf) -> JobConf {
    let mut conf = coordinator_conf(app_path);
    for (key, value) in overrides.iter() {
        conf.set(key, value);
    }
    conf
}

#[tokio::test]
async fn test_submit_bundle_records_coordinators() {
    let h = harness(NIGHTLY_BUNDLE);

    let bundle_id = h.service.submit_bundle(bundle_conf(BUNDLE_DIR)).await.unwrap();

    let bundle = h.store.get_bundle(&bundle_id).await.unwrap().unwrap();
    assert!(bundle_id.ends_with("-B"));
    assert_eq!(bundle.app_name, "nightly");
    assert_eq!(bundle.status, JobStatus::Prep);
    assert_eq!(
        bundle.kickoff_time,
        Some(parse_utc("2024-01-01T00:00Z", "test").unwrap())
    );
    let names: Vec<&str> = bundle.coordinators.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["C1", "C2"]);
    assert_eq!(bundle.coordinators[0].app_path, COORD_PATH);
    assert_eq!(bundle.coordinators[0].conf.get("prefix"), Some("c1"));
    assert!(bundle.job_xml.contains(COORD_PATH));

    // children are created by activation, not by the bundle submission
    assert_eq!(h.store.coordinator_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_coordinator_names_fail_before_children() {
    let xml = NIGHTLY_BUNDLE.replace("name=\"C2\"", "name=\"C1\"");
    let h = harness(&xml);

    let err = h
        .service
        .submit_bundle(bundle_conf(BUNDLE_DIR))
        .await
        .unwrap_err();
    assert_eq!(err.phase, SubmissionPhase::Resolving);
    assert!(matches!(
        err.cause,
        SubmitError::DuplicateName {
            kind: NameKind::Coordinator,
            ref name,
            ..
        } if name == "C1"
    ));
    assert_eq!(h.store.bundle_count().await, 0);
    assert_eq!(h.store.coordinator_count().await, 0);
}

#[tokio::test]
async fn test_children_are_linked_and_parent_notified() {
    let h = harness(NIGHTLY_BUNDLE);
    let bundle_id = h.service.submit_bundle(bundle_conf(BUNDLE_DIR)).await.unwrap();
    let bundle = h.store.get_bundle(&bundle_id).await.unwrap().unwrap();

    for child in &bundle.coordinators {
        h.service
            .submit_bundle_coordinator(
                child_conf(&child.app_path, &child.conf),
                &bundle_id,
                &child.name,
            )
            .await
            .unwrap();
    }

    let children = h.store.coordinators_for_bundle(&bundle_id).await.unwrap();
    assert_eq!(children.len(), 2);
    let mut names: Vec<&str> = children.iter().map(|c| c.app_name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["C1", "C2"]);
    assert!(children
        .iter()
        .all(|c| c.bundle_id.as_deref() == Some(bundle_id.as_str())));

    let updates = h.notifier.updates().await;
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().all(|u| u.bundle_id == bundle_id
        && u.previous_status == JobStatus::Prep
        && u.status == JobStatus::Prep
        && u.coord_job_id.is_some()));
}

#[tokio::test]
async fn test_failed_child_notifies_parent_once() {
    let h = harness(NIGHTLY_BUNDLE);
    let mut conf = coordinator_conf("hdfs://nn/apps/missing/coordinator.xml");
    conf.set("prefix", "c3");

    let err = h
        .service
        .submit_bundle_coordinator(conf, "0000001-B", "C3")
        .await
        .unwrap_err();
    assert_eq!(err.phase, SubmissionPhase::Loading);

    let updates = h.notifier.updates().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].coord_name, "C3");
    assert_eq!(updates[0].status, JobStatus::Failed);
    assert!(updates[0].coord_job_id.is_none());
    assert_eq!(h.store.coordinator_count().await, 0);
}

#[tokio::test]
async fn test_notifier_failure_does_not_mask_outcome() {
    let loader = MemoryDefinitionLoader::new().with_document(COORD_PATH, HOURLY_COORDINATOR);
    let store = InMemoryJobStore::new();
    let notifier = RecordingNotifier::failing();
    let service = SubmissionService::builder(Arc::new(loader))
        .with_store(Arc::new(store.clone()))
        .with_notifier(Arc::new(notifier.clone()))
        .build();

    let job_id = service
        .submit_bundle_coordinator(coordinator_conf(COORD_PATH), "0000001-B", "C1")
        .await
        .unwrap();
    assert!(store.get_coordinator(&job_id).await.unwrap().is_some());
    assert_eq!(notifier.updates().await.len(), 1);
}

#[tokio::test]
async fn test_undefined_bundle_variable() {
    let xml = NIGHTLY_BUNDLE.replace("${appBase}/coord", "${missingBase}/coord");
    let h = harness(&xml);

    let err = h
        .service
        .submit_bundle(bundle_conf(BUNDLE_DIR))
        .await
        .unwrap_err();
    assert_eq!(err.phase, SubmissionPhase::Resolving);
    assert_eq!(err.cause_code(), ErrorCode::EXPRESSION_UNDEFINED_VARIABLE);
}

#[tokio::test]
async fn test_bundle_dry_run() {
    let h = harness(NIGHTLY_BUNDLE);

    let preview = h
        .service
        .dry_run_bundle(bundle_conf(BUNDLE_DIR))
        .await
        .unwrap();

    assert!(preview.job_id.starts_with("dryrun-"));
    assert!(preview.text.ends_with('\n'));
    assert!(preview.text.contains(COORD_PATH));
    assert!(preview.window_end.is_none());
    assert_eq!(h.store.bundle_count().await, 0);
}

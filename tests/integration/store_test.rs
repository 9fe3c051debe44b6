//! Persistence layer integration tests: typed repositories over the object
//! store engine, index queries, bounded recency reads, and schema behavior.

mod common;

use atelier_jobs::{Job, JobStatus};
use atelier_store::{StoreEngine, StoreError};
use common::{artifact, job, scratch_repos};
use uuid::Uuid;

#[tokio::test]
async fn test_job_save_get_round_trip() {
    let (_dir, jobs, _artifacts) = scratch_repos().await;

    let mut submitted = job("an island observatory");
    submitted.negative_prompt = Some("blurry, low quality".to_string());
    submitted.model = Some("gpt-image-1".to_string());

    jobs.save(&submitted).await.unwrap();
    let loaded = jobs.find(submitted.id).await.unwrap();
    assert_eq!(loaded, Some(submitted));
}

#[tokio::test]
async fn test_artifact_save_get_round_trip_preserves_bytes() {
    let (_dir, _jobs, artifacts) = scratch_repos().await;

    let payload: Vec<u8> = (0..=255).collect();
    let stored = artifact(Uuid::new_v4(), payload.clone(), 1);
    artifacts.save(&stored).await.unwrap();

    let loaded = artifacts.find(stored.id).await.unwrap().unwrap();
    assert_eq!(loaded.data, payload);
    assert_eq!(loaded, stored);
}

#[tokio::test]
async fn test_list_jobs_by_status_is_exact_for_every_status() {
    let (_dir, jobs, _artifacts) = scratch_repos().await;

    let queued = job("queued prompt");

    let mut processing = job("processing prompt");
    processing.start().unwrap();

    let mut completed = job("completed prompt");
    completed.start().unwrap();
    completed.complete().unwrap();

    let mut failed = job("failed prompt");
    failed.start().unwrap();
    failed.fail("provider unavailable").unwrap();

    let mut cancelled = job("cancelled prompt");
    cancelled.cancel().unwrap();

    let all = [&queued, &processing, &completed, &failed, &cancelled];
    for j in all {
        jobs.save(j).await.unwrap();
    }

    for status in JobStatus::all() {
        let listed = jobs.list_by_status(status).await.unwrap();
        let expected: Vec<&Job> = all
            .iter()
            .copied()
            .filter(|j| j.status == status)
            .collect();
        assert_eq!(listed.len(), expected.len(), "status {status}");
        for j in expected {
            assert!(listed.contains(j), "status {status} missing job");
        }
    }
}

#[tokio::test]
async fn test_recent_artifacts_bounded_and_non_increasing() {
    let (_dir, _jobs, artifacts) = scratch_repos().await;
    let job_id = Uuid::new_v4();

    for stamp in 0..10i64 {
        artifacts
            .save(&artifact(job_id, vec![stamp as u8], 1000 + stamp))
            .await
            .unwrap();
    }

    let recent = artifacts.list_recent(Some(4)).await.unwrap();
    assert_eq!(recent.len(), 4);
    for window in recent.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }

    // Never more records than exist, regardless of the cap.
    let everything = artifacts.list_recent(Some(1000)).await.unwrap();
    assert_eq!(everything.len(), 10);
}

#[tokio::test]
async fn test_reopen_existing_database_preserves_data_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atelier.db");

    let engine = StoreEngine::open(&path).await.unwrap();
    let jobs = atelier_jobs::JobRepository::new(engine.clone());
    let submitted = job("survives reopen");
    jobs.save(&submitted).await.unwrap();
    let info_before = engine.database_info().await.unwrap();
    drop(jobs);
    drop(engine);

    // Second open at the same version: nothing is created, nothing removed.
    let engine = StoreEngine::open(&path).await.unwrap();
    let info_after = engine.database_info().await.unwrap();
    assert_eq!(info_before, info_after);

    let jobs = atelier_jobs::JobRepository::new(engine);
    assert_eq!(jobs.find(submitted.id).await.unwrap(), Some(submitted));
}

#[tokio::test]
async fn test_usage_estimate_is_advisory_and_consistent() {
    let (_dir, engine) = common::scratch_engine().await;
    let jobs = atelier_jobs::JobRepository::new(engine.clone());
    jobs.save(&job("occupy some pages")).await.unwrap();

    let estimate = engine.estimate_usage().await;
    assert!(estimate.used > 0);
    assert!(estimate.used <= estimate.capacity);
    assert!((0.0..=1.0).contains(&estimate.ratio));
}

#[tokio::test]
async fn test_unknown_store_errors_surface_unchanged() {
    let (_dir, engine) = common::scratch_engine().await;
    let result = engine.get::<serde_json::Value>("no_such_store", "key").await;
    assert!(matches!(result, Err(StoreError::UnknownStore(_))));
}

//! End-to-end workflow tests: submit a prompt, call the (stubbed) provider,
//! persist artifacts, and carry the whole dataset through a snapshot.

mod common;

use std::sync::Arc;

use atelier_app::{GenerationRequest, GenerationService};
use atelier_jobs::JobStatus;
use atelier_openai::{ImageSize, OpenAiConfig, OpenAiService};
use atelier_snapshot::{export_all, import_all};
use common::{images_response, scratch_engine, scratch_repos};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMAGES_PATH: &str = "/v1/images/generations";

async fn service_against(server: &MockServer) -> (tempfile::TempDir, GenerationService) {
    let (dir, engine) = scratch_engine().await;
    let provider = OpenAiService::new(OpenAiConfig {
        api_key: Some("sk-test".to_string()),
        base_url: Some(server.uri()),
        model: "gpt-image-1".to_string(),
    });
    (dir, GenerationService::new(engine, Arc::new(provider)))
}

#[tokio::test]
async fn test_generate_persists_decoded_artifacts_and_completes_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(images_response(&[b"first image", b"second image"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, service) = service_against(&server).await;

    let mut request = GenerationRequest::new("a tidal pool at noon");
    request.count = Some(2);
    request.size = Some(ImageSize::Square1024);

    let job = service.generate(request).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());

    let artifacts = service.artifacts().list_by_job(job.id).await.unwrap();
    assert_eq!(artifacts.len(), 2);
    let mut payloads: Vec<&[u8]> = artifacts.iter().map(|a| a.data.as_slice()).collect();
    payloads.sort();
    assert_eq!(payloads, vec![b"first image".as_slice(), b"second image"]);
    for artifact in &artifacts {
        assert_eq!((artifact.width, artifact.height), (1024, 1024));
        assert_eq!(artifact.mime_type, "image/png");
    }
}

#[tokio::test]
async fn test_provider_rejection_lands_on_the_job_as_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "bad prompt", "code": "invalid_prompt" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, service) = service_against(&server).await;
    let job = service
        .generate(GenerationRequest::new("rejected by provider"))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error.as_deref().unwrap();
    assert!(message.contains("bad prompt"));
    assert!(message.contains("invalid_prompt"));

    // The stored record matches what the call returned.
    let stored = service.jobs().find(job.id).await.unwrap().unwrap();
    assert_eq!(stored, job);
    assert!(service
        .artifacts()
        .list_by_job(job.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_generated_dataset_survives_snapshot_transfer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(images_response(&[&[7u8, 0, 255, 13]])),
        )
        .mount(&server)
        .await;

    let (_dir, service) = service_against(&server).await;
    let job = service
        .generate(GenerationRequest::new("worth keeping"))
        .await
        .unwrap();

    let document = export_all(service.jobs(), service.artifacts()).await.unwrap();

    let (_dir2, fresh_jobs, fresh_artifacts) = scratch_repos().await;
    let summary = import_all(&fresh_jobs, &fresh_artifacts, document).await;
    assert_eq!(summary.imported_jobs, 1);
    assert_eq!(summary.imported_images, 1);

    let restored = fresh_artifacts.list_by_job(job.id).await.unwrap();
    assert_eq!(restored[0].data, vec![7u8, 0, 255, 13]);
}

#[tokio::test]
async fn test_recent_gallery_reflects_new_generations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_response(&[b"img"])))
        .mount(&server)
        .await;

    let (_dir, service) = service_against(&server).await;
    for i in 0..3 {
        service
            .generate(GenerationRequest::new(format!("piece {i}")))
            .await
            .unwrap();
    }

    let recent = service.artifacts().list_recent(Some(2)).await.unwrap();
    assert_eq!(recent.len(), 2);
    for window in recent.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }
}

//! Request executor integration tests against a stubbed provider.
//!
//! Timing-sensitive tests are serialized because the admission gate is
//! process-wide: a concurrently running test holding slots would inflate
//! the measured latencies.

mod common;

use std::time::{Duration, Instant};

use atelier_openai::{
    GenerateImagesRequest, ImageService, ImageSize, OpenAiConfig, OpenAiError, OpenAiService,
    MAX_CONCURRENT_REQUESTS,
};
use common::images_response;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMAGES_PATH: &str = "/v1/images/generations";

fn service_for(server: &MockServer, api_key: Option<&str>) -> OpenAiService {
    OpenAiService::new(OpenAiConfig {
        api_key: api_key.map(String::from),
        base_url: Some(server.uri()),
        model: "gpt-image-1".to_string(),
    })
}

#[tokio::test]
async fn test_success_sends_contract_body_and_decodes_payloads() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-image-1",
            "prompt": "a quiet harbor",
            "size": "512x512",
            "n": 2,
            "response_format": "b64_json",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(images_response(&[b"hello", b"world"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server, Some("sk-test"));
    let mut request = GenerateImagesRequest::new("  a quiet harbor  ");
    request.size = Some(ImageSize::Square512);
    request.n = Some(2);

    let result = service.generate_images(request).await.unwrap();
    assert_eq!(result.images, vec![b"hello".to_vec(), b"world".to_vec()]);
    assert_eq!(result.created, 1_700_000_000);
    assert_eq!(result.model, "gpt-image-1");
}

#[tokio::test]
#[serial]
async fn test_server_errors_are_retried_on_the_backoff_schedule() {
    let server = MockServer::start().await;

    // Two 500s, then success. Mount order decides which active stub answers.
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_response(&[b"ok"])))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server, Some("sk-test"));
    let started = Instant::now();
    let result = service
        .generate_images(GenerateImagesRequest::new("retry me"))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.images, vec![b"ok".to_vec()]);
    // Two retries sleep 500 ms then 1000 ms.
    assert!(
        elapsed >= Duration::from_millis(1500),
        "elapsed {elapsed:?} shorter than the 500+1000 ms backoff"
    );
    assert!(
        elapsed < Duration::from_millis(3500),
        "elapsed {elapsed:?} suggests an extra retry was taken"
    );
}

#[tokio::test]
#[serial]
async fn test_exhausted_retries_surface_as_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(4) // initial attempt + 3 retries
        .mount(&server)
        .await;

    let service = service_for(&server, Some("sk-test"));
    let result = service
        .generate_images(GenerateImagesRequest::new("doomed"))
        .await;

    assert!(matches!(result, Err(OpenAiError::Transient(_))));
}

#[tokio::test]
async fn test_client_error_fails_immediately_with_message_and_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "bad prompt", "code": "invalid_prompt" }
        })))
        .expect(1) // no retry on 4xx
        .mount(&server)
        .await;

    let service = service_for(&server, Some("sk-test"));
    let started = Instant::now();
    let result = service
        .generate_images(GenerateImagesRequest::new("rejected"))
        .await;

    assert!(started.elapsed() < Duration::from_millis(400), "4xx must not back off");
    match result {
        Err(OpenAiError::Permanent {
            message,
            code,
            status,
        }) => {
            assert_eq!(message, "bad prompt");
            assert_eq!(code.as_deref(), Some("invalid_prompt"));
            assert_eq!(status, 400);
        }
        other => panic!("expected permanent error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_error_without_body_gets_a_status_coded_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server, Some("sk-test"));
    let result = service
        .generate_images(GenerateImagesRequest::new("nowhere"))
        .await;

    match result {
        Err(OpenAiError::Permanent {
            message,
            code,
            status,
        }) => {
            assert!(message.contains("404"), "generic message carries the status");
            assert_eq!(code, None);
            assert_eq!(status, 404);
        }
        other => panic!("expected permanent error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_success_with_zero_payloads_is_a_data_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "created": 1_700_000_000,
            "data": [ {}, { "b64_json": "" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server, Some("sk-test"));
    let result = service
        .generate_images(GenerateImagesRequest::new("empty handed"))
        .await;
    assert!(matches!(result, Err(OpenAiError::Data(_))));
}

#[tokio::test]
async fn test_missing_credential_makes_zero_network_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_response(&[b"x"])))
        .expect(0)
        .mount(&server)
        .await;

    let service = service_for(&server, None);
    let result = service
        .generate_images(GenerateImagesRequest::new("no key"))
        .await;

    assert!(matches!(result, Err(OpenAiError::Configuration(_))));
    // MockServer::verify on drop asserts the expect(0).
}

#[tokio::test]
#[serial]
async fn test_concurrency_ceiling_bounds_in_flight_requests() {
    let server = MockServer::start().await;
    let delay = Duration::from_millis(100);

    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(images_response(&[b"slow"]))
                .set_delay(delay),
        )
        .expect(5)
        .mount(&server)
        .await;

    let service = std::sync::Arc::new(service_for(&server, Some("sk-test")));

    let started = Instant::now();
    let mut handles = Vec::new();
    for i in 0..5 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .generate_images(GenerateImagesRequest::new(format!("request {i}")))
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_ok(), "every queued request eventually completes");
    }
    let elapsed = started.elapsed();

    // Five 100 ms requests through a ceiling of 2 need at least three waves.
    let waves = 5usize.div_ceil(MAX_CONCURRENT_REQUESTS) as u32;
    assert!(
        elapsed >= delay * waves,
        "elapsed {elapsed:?} implies more than {MAX_CONCURRENT_REQUESTS} requests ran at once"
    );
}

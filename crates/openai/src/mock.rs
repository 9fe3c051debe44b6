//! Mock Image Service Implementation
//!
//! Used by `ImageServiceFactory` when the provider is `"mock"` and by tests
//! that need a programmable generation backend without network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::{GenerateImagesRequest, GeneratedImages, ImageService, OpenAiError};

/// A valid 1x1 transparent PNG, base64-encoded.
pub const SAMPLE_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub const MOCK_MODEL: &str = "mock-image-model";

/// What the next mock call should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockOutcome {
    /// Return the requested number of sample images
    #[default]
    Complete,
    /// Fail with a permanent provider error
    Fail,
    /// Report success with zero usable payloads
    Empty,
}

/// Shared, programmable behavior for [`MockImageService`]
#[derive(Clone, Default)]
pub struct MockImageBehavior {
    outcome: Arc<RwLock<MockOutcome>>,
    delay_ms: Arc<RwLock<u64>>,
    calls: Arc<AtomicUsize>,
}

impl MockImageBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_outcome(&self, outcome: MockOutcome) {
        if let Ok(mut guard) = self.outcome.write() {
            *guard = outcome;
        }
    }

    pub fn get_outcome(&self) -> MockOutcome {
        self.outcome.read().map(|guard| *guard).unwrap_or_default()
    }

    pub fn set_delay_ms(&self, delay_ms: u64) {
        if let Ok(mut guard) = self.delay_ms.write() {
            *guard = delay_ms;
        }
    }

    pub fn get_delay_ms(&self) -> u64 {
        self.delay_ms.read().map(|guard| *guard).unwrap_or(0)
    }

    /// Number of generation calls observed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Restore defaults and reset the call counter
    pub fn reset(&self) {
        self.set_outcome(MockOutcome::Complete);
        self.set_delay_ms(0);
        self.calls.store(0, Ordering::SeqCst);
    }
}

/// Mock image service for testing
#[derive(Clone, Default)]
pub struct MockImageService {
    behavior: MockImageBehavior,
}

impl MockImageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockImageBehavior) -> Self {
        Self { behavior }
    }

    pub fn behavior(&self) -> &MockImageBehavior {
        &self.behavior
    }
}

#[async_trait::async_trait]
impl ImageService for MockImageService {
    async fn generate_images(
        &self,
        request: GenerateImagesRequest,
    ) -> Result<GeneratedImages, OpenAiError> {
        self.behavior.calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Mock image service processing generation request");

        let delay = self.behavior.get_delay_ms();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let norm = request.normalize();

        match self.behavior.get_outcome() {
            MockOutcome::Complete => {
                let png = BASE64
                    .decode(SAMPLE_PNG_BASE64)
                    .map_err(|e| OpenAiError::Data(format!("Sample image is corrupt: {}", e)))?;
                Ok(GeneratedImages {
                    images: vec![png; usize::from(norm.n)],
                    created: chrono::Utc::now().timestamp(),
                    model: MOCK_MODEL.to_string(),
                })
            }
            MockOutcome::Fail => Err(OpenAiError::Permanent {
                message: "mock generation failure".to_string(),
                code: Some("mock_error".to_string()),
                status: 400,
            }),
            MockOutcome::Empty => Err(OpenAiError::Data(
                "No image data returned by the API".to_string(),
            )),
        }
    }
}

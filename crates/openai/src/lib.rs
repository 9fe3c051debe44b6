//! Atelier Image Generation Service
//!
//! Issues image generation requests to the OpenAI images endpoint under
//! bounded concurrency with automatic retry, and normalizes the provider's
//! response into a stable in-process result shape:
//! - OpenAI HTTP client for production
//! - Mock image service for testing and offline development
//! - Configurable base URL and programmable mock behavior

pub mod client;
pub mod limiter;
pub mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{OpenAiService, DEFAULT_MODEL};
pub use limiter::MAX_CONCURRENT_REQUESTS;

/// Service key under which the provider credential is stored.
pub const CREDENTIAL_SERVICE: &str = "openai";

/// Inclusive bounds on the per-request image count.
pub const MIN_IMAGES: u8 = 1;
pub const MAX_IMAGES: u8 = 4;

#[derive(Error, Debug)]
pub enum OpenAiError {
    /// Missing or unusable credential; detected before any network attempt.
    #[error("OpenAI configuration error: {0}")]
    Configuration(String),

    /// Transport failure or server-side error that survived every retry.
    #[error("OpenAI transient error: {0}")]
    Transient(String),

    /// Client-side rejection (4xx). Never retried; carries the provider's
    /// reported message and code when the error body was parseable.
    #[error("OpenAI request failed with status {status}: {message}")]
    Permanent {
        message: String,
        code: Option<String>,
        status: u16,
    },

    /// Well-formed success response with no usable payload, or a payload
    /// that fails to decode.
    #[error("OpenAI response error: {0}")]
    Data(String),
}

/// Supported output dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImageSize {
    #[serde(rename = "512x512")]
    Square512,
    #[default]
    #[serde(rename = "1024x1024")]
    Square1024,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square512 => "512x512",
            ImageSize::Square1024 => "1024x1024",
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageSize::Square512 => (512, 512),
            ImageSize::Square1024 => (1024, 1024),
        }
    }

    /// Map a size alias onto the nearest supported canonical size.
    pub fn from_alias(alias: &str) -> Self {
        match alias.trim() {
            "512" | "512x512" => ImageSize::Square512,
            _ => ImageSize::Square1024,
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested output quality. The images endpoint has no quality parameter;
/// the option is accepted and deliberately not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageQuality {
    #[default]
    Standard,
    High,
}

/// Caller-facing request shape. Unset options take provider defaults.
#[derive(Debug, Clone)]
pub struct GenerateImagesRequest {
    pub prompt: String,
    pub size: Option<ImageSize>,
    pub quality: Option<ImageQuality>,
    pub n: Option<u8>,
}

impl GenerateImagesRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: None,
            quality: None,
            n: None,
        }
    }

    /// Apply input normalization: trim the prompt, default the size to the
    /// largest supported dimension, clamp the count into [1, 4].
    pub fn normalize(&self) -> NormalizedRequest {
        NormalizedRequest {
            prompt: self.prompt.trim().to_string(),
            size: self.size.unwrap_or_default(),
            quality: self.quality.unwrap_or_default(),
            n: self.n.unwrap_or(MIN_IMAGES).clamp(MIN_IMAGES, MAX_IMAGES),
        }
    }
}

/// A request after input normalization; what actually goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub prompt: String,
    pub size: ImageSize,
    pub quality: ImageQuality,
    pub n: u8,
}

/// Normalized result of one logical generation call: the decoded image
/// payloads plus provider-reported metadata. This shape is exactly what the
/// artifact store persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImages {
    pub images: Vec<Vec<u8>>,
    /// Provider-reported creation timestamp, epoch seconds
    pub created: i64,
    pub model: String,
}

/// Image service configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token; absence fails fast on first call, not at construction
    pub api_key: Option<String>,
    /// Override for tests and self-hosted gateways
    pub base_url: Option<String>,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Image service trait for different generation backends
#[async_trait::async_trait]
pub trait ImageService: Send + Sync {
    /// Run one logical generation call. Retries happen inside the call; the
    /// caller sees a single success or a single normalized error.
    async fn generate_images(
        &self,
        request: GenerateImagesRequest,
    ) -> Result<GeneratedImages, OpenAiError>;
}

/// Factory for creating ImageService implementations
pub struct ImageServiceFactory;

impl ImageServiceFactory {
    pub fn create(
        provider: &str,
        config: OpenAiConfig,
    ) -> Result<Box<dyn ImageService>, OpenAiError> {
        match provider {
            "openai" => {
                tracing::info!("Creating OpenAI image service");
                Ok(Box::new(OpenAiService::new(config)))
            }
            "mock" => {
                tracing::info!("Creating mock image service");
                Ok(Box::new(mock::MockImageService::new()))
            }
            provider => Err(OpenAiError::Configuration(format!(
                "Unknown image provider: {}. Supported providers: openai, mock",
                provider
            ))),
        }
    }
}

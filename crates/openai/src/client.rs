//! OpenAI Images API Implementation
//!
//! Calls the OpenAI image generation endpoint
//! (https://api.openai.com/v1/images/generations) using reqwest, behind the
//! process-wide admission gate, with bounded exponential-backoff retry.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::limiter;
use crate::{
    GenerateImagesRequest, GeneratedImages, ImageQuality, ImageService, OpenAiConfig, OpenAiError,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const IMAGES_PATH: &str = "/v1/images/generations";

pub const DEFAULT_MODEL: &str = "gpt-image-1";

/// Additional attempts after the first; transport failures and 5xx statuses
/// are retried with the delay doubling from 500 ms.
const MAX_RETRIES: u32 = 3;
const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Images API request body
#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u8,
    response_format: &'static str,
}

/// Images API response body
#[derive(Debug, Deserialize)]
struct ImagesResponse {
    created: Option<i64>,
    model: Option<String>,
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    // The provider reports codes as strings or numbers depending on the error
    code: Option<serde_json::Value>,
}

/// OpenAI image service implementation
pub struct OpenAiService {
    client: reqwest::Client,
    config: OpenAiConfig,
    images_url: String,
}

impl OpenAiService {
    /// Create a new OpenAI image service
    pub fn new(config: OpenAiConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let images_url = format!("{}{}", base_url.trim_end_matches('/'), IMAGES_PATH);

        Self {
            client: reqwest::Client::new(),
            config,
            images_url,
        }
    }

    async fn send_with_retry(
        &self,
        api_key: &str,
        body: &ImagesRequest<'_>,
    ) -> Result<reqwest::Response, OpenAiError> {
        let mut attempt = 0u32;
        let mut delay = BASE_RETRY_DELAY;

        loop {
            let sent = self
                .client
                .post(&self.images_url)
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await;

            match sent {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < MAX_RETRIES {
                        attempt += 1;
                        tracing::warn!(
                            %status,
                            attempt,
                            max_retries = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            "OpenAI returned a server error; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    return Err(normalize_failure(response).await);
                }
                Err(e) => {
                    if attempt < MAX_RETRIES {
                        attempt += 1;
                        tracing::warn!(
                            error = %e,
                            attempt,
                            max_retries = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            "OpenAI request transport failure; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    return Err(OpenAiError::Transient(format!(
                        "HTTP request failed after {} attempts: {}",
                        MAX_RETRIES + 1,
                        e
                    )));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl ImageService for OpenAiService {
    async fn generate_images(
        &self,
        request: GenerateImagesRequest,
    ) -> Result<GeneratedImages, OpenAiError> {
        // Fail fast before touching the network or taking an admission slot.
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                OpenAiError::Configuration(
                    "Missing OpenAI API key. Please add it in Settings.".to_string(),
                )
            })?;

        let norm = request.normalize();
        if norm.quality != ImageQuality::Standard {
            // The images endpoint has no quality parameter; the option is
            // accepted for surface compatibility and dropped here.
            tracing::debug!("Ignoring unsupported quality option");
        }

        let model = if self.config.model.is_empty() {
            DEFAULT_MODEL
        } else {
            self.config.model.as_str()
        };

        let body = ImagesRequest {
            model,
            prompt: &norm.prompt,
            size: norm.size.as_str(),
            n: norm.n,
            response_format: "b64_json",
        };

        tracing::debug!(model = %model, size = %norm.size, n = norm.n, "Sending OpenAI images request");

        let response = {
            let _permit = limiter::admit().await;
            self.send_with_retry(api_key, &body).await?
        };

        let payload: ImagesResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::Data(format!("Failed to parse response: {}", e)))?;

        let encoded: Vec<String> = payload
            .data
            .into_iter()
            .filter_map(|datum| datum.b64_json)
            .filter(|text| !text.is_empty())
            .collect();

        if encoded.is_empty() {
            return Err(OpenAiError::Data(
                "No image data returned by the API".to_string(),
            ));
        }

        let images = encoded
            .iter()
            .map(|text| BASE64.decode(text))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OpenAiError::Data(format!("Image payload is not valid base64: {}", e)))?;

        Ok(GeneratedImages {
            images,
            created: payload
                .created
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
            model: payload.model.unwrap_or_else(|| model.to_string()),
        })
    }
}

/// Translate a non-success response into the error taxonomy: 4xx becomes a
/// permanent failure carrying the provider's message and code when present,
/// anything else surfaces as transient.
async fn normalize_failure(response: reqwest::Response) -> OpenAiError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());

    let parsed: Option<ErrorResponse> = serde_json::from_str(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(|p| p.error.message.clone())
        .unwrap_or_else(|| format!("OpenAI request failed with status {}", status));
    let code = parsed.and_then(|p| p.error.code).map(|code| match code {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });

    if status.is_client_error() {
        OpenAiError::Permanent {
            message,
            code,
            status: status.as_u16(),
        }
    } else {
        OpenAiError::Transient(message)
    }
}

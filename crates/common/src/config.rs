//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the local SQLite database file
    pub database_path: String,

    /// Image generation provider ("openai" or "mock")
    pub image_provider: String,

    /// OpenAI image generation API
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: String,

    /// Runtime configuration
    pub log_level: String,
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_path: env::var("ATELIER_DATABASE_PATH")
                .unwrap_or_else(|_| "atelier.db".to_string()),

            image_provider: env::var("ATELIER_IMAGE_PROVIDER")
                .unwrap_or_else(|_| "openai".to_string()),

            // The API key is optional here: a missing key is reported as a
            // configuration error on first provider call, not at startup.
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            openai_model: env::var("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|_| "gpt-image-1".to_string()),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "atelier=debug".to_string()),
        };

        Ok(config)
    }
}

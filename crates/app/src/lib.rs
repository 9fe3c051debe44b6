//! Atelier application composition root
//!
//! Wires the store engine, domain repositories, credential boundary, and
//! image provider into one [`GenerationService`].

pub mod service;

use std::sync::Arc;

use atelier_common::{Config, CredentialStore};
use atelier_openai::{ImageServiceFactory, OpenAiConfig, CREDENTIAL_SERVICE};
use atelier_store::StoreEngine;

pub use service::{AppError, GenerationRequest, GenerationService};

/// Create the application service from configuration and the credential
/// store. The provider credential comes from the credential store first and
/// falls back to the environment.
pub async fn create_app(
    config: &Config,
    credentials: &dyn CredentialStore,
) -> Result<GenerationService, anyhow::Error> {
    let engine = StoreEngine::open(&config.database_path).await?;

    let api_key = credentials
        .get(CREDENTIAL_SERVICE)
        .or_else(|| config.openai_api_key.clone());

    let provider_config = OpenAiConfig {
        api_key,
        base_url: config.openai_base_url.clone(),
        model: config.openai_model.clone(),
    };
    let images = ImageServiceFactory::create(&config.image_provider, provider_config)?;

    Ok(GenerationService::new(engine, Arc::from(images)))
}

//! Generation workflow
//!
//! Drives a prompt job through its lifecycle: persist it queued, call the
//! image provider, store one artifact per returned image, and record the
//! terminal status. The provider never writes storage itself; all writes go
//! through the repositories here.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use atelier_artifacts::{Artifact, ArtifactRepository};
use atelier_jobs::{Job, JobError, JobRepository};
use atelier_openai::{
    GenerateImagesRequest, ImageQuality, ImageService, ImageSize, OpenAiError,
};
use atelier_store::{StoreEngine, StoreError};

/// MIME type of images returned by the provider's b64_json format.
const GENERATED_MIME: &str = "image/png";

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),
}

/// One generation ask: what to draw and how many.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub model: Option<String>,
    pub size: Option<ImageSize>,
    pub count: Option<u8>,
    pub quality: Option<ImageQuality>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Application service owning the repositories and the image provider.
#[derive(Clone)]
pub struct GenerationService {
    jobs: JobRepository,
    artifacts: ArtifactRepository,
    images: Arc<dyn ImageService>,
}

impl GenerationService {
    pub fn new(engine: StoreEngine, images: Arc<dyn ImageService>) -> Self {
        Self {
            jobs: JobRepository::new(engine.clone()),
            artifacts: ArtifactRepository::new(engine),
            images,
        }
    }

    pub fn jobs(&self) -> &JobRepository {
        &self.jobs
    }

    pub fn artifacts(&self) -> &ArtifactRepository {
        &self.artifacts
    }

    /// Validate and persist a new queued job.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<Job, AppError> {
        let job = Job::new(
            Uuid::new_v4(),
            request.prompt.as_str(),
            request.negative_prompt.clone(),
            request.model.clone(),
        )?;
        self.jobs.save(&job).await?;
        tracing::debug!(job_id = %job.id, "Submitted prompt job");
        Ok(job)
    }

    /// Submit a job and drive it to a terminal state in one call.
    ///
    /// Provider failures do not surface as errors here: they land on the job
    /// as a `failed` status with a human-readable message.
    pub async fn generate(&self, request: GenerationRequest) -> Result<Job, AppError> {
        let job = self.submit(&request).await?;
        self.run_job(job.id, &request).await
    }

    /// Run a queued job against the provider and persist the outcome.
    pub async fn run_job(
        &self,
        job_id: Uuid,
        request: &GenerationRequest,
    ) -> Result<Job, AppError> {
        let mut job = self
            .jobs
            .find(job_id)
            .await?
            .ok_or(AppError::JobNotFound(job_id))?;

        job.start()?;
        self.jobs.save(&job).await?;

        let provider_request = GenerateImagesRequest {
            prompt: job.prompt.clone(),
            size: request.size,
            quality: request.quality,
            n: request.count,
        };

        match self.images.generate_images(provider_request).await {
            Ok(generated) => {
                let (width, height) = request.size.unwrap_or_default().dimensions();
                match self
                    .store_artifacts(&job, generated.images, width, height)
                    .await
                {
                    Ok(stored) => {
                        job.complete()?;
                        self.jobs.save(&job).await?;
                        tracing::info!(
                            job_id = %job.id,
                            images = stored,
                            model = %generated.model,
                            "Generation completed"
                        );
                    }
                    Err(e) => {
                        job.fail(format!("Failed to store generated image: {e}"))?;
                        self.jobs.save(&job).await?;
                        tracing::error!(job_id = %job.id, error = %e, "Generation output could not be stored");
                    }
                }
            }
            Err(e) => {
                job.fail(failure_message(&e))?;
                self.jobs.save(&job).await?;
                tracing::error!(job_id = %job.id, error = %e, "Generation failed");
            }
        }

        Ok(job)
    }

    /// Cancel a non-terminal job.
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<Job, AppError> {
        let mut job = self
            .jobs
            .find(job_id)
            .await?
            .ok_or(AppError::JobNotFound(job_id))?;
        job.cancel()?;
        self.jobs.save(&job).await?;
        Ok(job)
    }

    async fn store_artifacts(
        &self,
        job: &Job,
        images: Vec<Vec<u8>>,
        width: u32,
        height: u32,
    ) -> Result<usize, StoreError> {
        let mut stored = 0usize;
        for data in images {
            let artifact = Artifact::new(job.id, data, GENERATED_MIME, width, height, None);
            self.artifacts.save(&artifact).await?;
            stored += 1;
        }
        Ok(stored)
    }
}

fn failure_message(error: &OpenAiError) -> String {
    match error {
        OpenAiError::Permanent { message, code, .. } => match code {
            Some(code) => format!("{message} ({code})"),
            None => message.clone(),
        },
        other => other.to_string(),
    }
}

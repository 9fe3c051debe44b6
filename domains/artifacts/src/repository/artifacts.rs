//! Artifact repository

use atelier_store::{Result, StoreEngine, INDEX_CREATED_AT, INDEX_JOB_ID, STORE_GENERATED_IMAGES};
use uuid::Uuid;

use crate::domain::entities::Artifact;

/// How many artifacts a recency query returns when the caller does not say.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

#[derive(Clone)]
pub struct ArtifactRepository {
    engine: StoreEngine,
}

impl ArtifactRepository {
    pub fn new(engine: StoreEngine) -> Self {
        Self { engine }
    }

    /// Upsert an artifact. Returns the storage key.
    pub async fn save(&self, artifact: &Artifact) -> Result<String> {
        self.engine.put(STORE_GENERATED_IMAGES, artifact).await
    }

    /// Find an artifact by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Artifact>> {
        self.engine
            .get(STORE_GENERATED_IMAGES, &id.to_string())
            .await
    }

    /// Delete an artifact by ID. Independent of job deletion; no cascade.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.engine
            .delete(STORE_GENERATED_IMAGES, &id.to_string())
            .await
    }

    /// All artifacts belonging to one job, via the job_id index
    pub async fn list_by_job(&self, job_id: Uuid) -> Result<Vec<Artifact>> {
        self.engine
            .scan_by_index(STORE_GENERATED_IMAGES, INDEX_JOB_ID, job_id.to_string())
            .await
    }

    /// The most recent artifacts, newest first, bounded by `limit`
    /// (or [`DEFAULT_RECENT_LIMIT`] when unspecified).
    pub async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Artifact>> {
        self.engine
            .iterate_recent(
                STORE_GENERATED_IMAGES,
                INDEX_CREATED_AT,
                limit.unwrap_or(DEFAULT_RECENT_LIMIT),
            )
            .await
    }

    /// Unordered list of every stored artifact
    pub async fn list_all(&self) -> Result<Vec<Artifact>> {
        self.engine.scan_all(STORE_GENERATED_IMAGES).await
    }
}

//! Job repository
//!
//! Thin typed layer over the object store engine. No business validation
//! happens here; callers persist entities the domain layer already vetted.

use atelier_store::{Result, StoreEngine, INDEX_STATUS, STORE_PROMPT_JOBS};
use uuid::Uuid;

use crate::domain::entities::{Job, JobStatus};

#[derive(Clone)]
pub struct JobRepository {
    engine: StoreEngine,
}

impl JobRepository {
    pub fn new(engine: StoreEngine) -> Self {
        Self { engine }
    }

    /// Upsert a job. Returns the storage key.
    pub async fn save(&self, job: &Job) -> Result<String> {
        self.engine.put(STORE_PROMPT_JOBS, job).await
    }

    /// Find a job by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Job>> {
        self.engine.get(STORE_PROMPT_JOBS, &id.to_string()).await
    }

    /// Delete a job by ID
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.engine
            .delete(STORE_PROMPT_JOBS, &id.to_string())
            .await
    }

    /// List jobs whose status equals `status`, via the status index
    pub async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        self.engine
            .scan_by_index(STORE_PROMPT_JOBS, INDEX_STATUS, status.to_string())
            .await
    }

    /// Unordered list of every stored job
    pub async fn list_all(&self) -> Result<Vec<Job>> {
        self.engine.scan_all(STORE_PROMPT_JOBS).await
    }
}

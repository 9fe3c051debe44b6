//! Artifact domain entities
//!
//! An [`Artifact`] is one generated image belonging to exactly one job. It is
//! immutable after creation, and its lifetime is independent of the owning
//! job: deleting a job does not cascade to its artifacts.
//!
//! The `job_id` reference must point at a job that exists when the artifact
//! is created. The store offers no foreign-key enforcement, so this is a
//! caller invariant rather than an engine guarantee.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Artifact entity: one generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub job_id: Uuid,
    /// Raw image bytes; persisted as base64 text inside the record document
    #[serde(with = "atelier_common::codec::base64_bytes")]
    pub data: Vec<u8>,
    /// e.g. "image/png"
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Epoch milliseconds
    pub created_at: i64,
}

impl Artifact {
    /// Create a new artifact stamped with the current time.
    pub fn new(
        job_id: Uuid,
        data: Vec<u8>,
        mime_type: impl Into<String>,
        width: u32,
        height: u32,
        seed: Option<i64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            data,
            mime_type: mime_type.into(),
            width,
            height,
            seed,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Size of the binary payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

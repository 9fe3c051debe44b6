//! Whole-store export and import
//!
//! Export reads every job and artifact through the domain repositories and
//! produces one portable JSON document with all binary payloads text-encoded.
//! Import is the reverse, and deliberately best-effort: a record that fails
//! to decode or store is counted and skipped, never fatal, so one corrupt
//! entry cannot abort a restore.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_artifacts::{Artifact, ArtifactRepository};
use atelier_common::codec::{self, CodecError};
use atelier_jobs::{Job, JobRepository};
use atelier_store::Result;

/// Portable document containing the full persisted dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(rename = "promptJobs", default)]
    pub prompt_jobs: Vec<Job>,
    #[serde(rename = "generatedImages", default)]
    pub generated_images: Vec<ArtifactSnapshot>,
}

/// An artifact with its binary payload replaced by a text encoding. All
/// other fields travel unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub id: Uuid,
    pub job_id: Uuid,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub created_at: i64,
    #[serde(rename = "binaryText")]
    pub binary_text: String,
}

impl From<Artifact> for ArtifactSnapshot {
    fn from(artifact: Artifact) -> Self {
        let binary_text = codec::encode_blob(&artifact.data, &artifact.mime_type);
        Self {
            id: artifact.id,
            job_id: artifact.job_id,
            mime_type: artifact.mime_type,
            width: artifact.width,
            height: artifact.height,
            seed: artifact.seed,
            created_at: artifact.created_at,
            binary_text,
        }
    }
}

impl ArtifactSnapshot {
    /// Decode the text payload back into a full artifact record.
    fn reconstitute(self) -> std::result::Result<Artifact, CodecError> {
        let (data, _) = codec::decode_blob(&self.binary_text)?;
        Ok(Artifact {
            id: self.id,
            job_id: self.job_id,
            data,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            seed: self.seed,
            created_at: self.created_at,
        })
    }
}

/// Counts reported by [`import_all`]. Records that failed to decode or store
/// are simply absent from the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported_jobs: usize,
    pub imported_images: usize,
}

/// Export every job and artifact into one portable document.
pub async fn export_all(
    jobs: &JobRepository,
    artifacts: &ArtifactRepository,
) -> Result<SnapshotDocument> {
    let prompt_jobs = jobs.list_all().await?;
    let generated_images = artifacts
        .list_all()
        .await?
        .into_iter()
        .map(ArtifactSnapshot::from)
        .collect();

    Ok(SnapshotDocument {
        prompt_jobs,
        generated_images,
    })
}

/// Restore a database from a snapshot document, upserting record by record.
pub async fn import_all(
    jobs: &JobRepository,
    artifacts: &ArtifactRepository,
    document: SnapshotDocument,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for job in document.prompt_jobs {
        match jobs.save(&job).await {
            Ok(_) => summary.imported_jobs += 1,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Skipping job during import");
            }
        }
    }

    for snapshot in document.generated_images {
        let id = snapshot.id;
        let artifact = match snapshot.reconstitute() {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(artifact_id = %id, error = %e, "Skipping undecodable artifact during import");
                continue;
            }
        };
        match artifacts.save(&artifact).await {
            Ok(_) => summary.imported_images += 1,
            Err(e) => {
                tracing::warn!(artifact_id = %id, error = %e, "Skipping artifact during import");
            }
        }
    }

    summary
}

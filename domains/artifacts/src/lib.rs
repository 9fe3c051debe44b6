//! Artifacts domain: generated images belonging to prompt jobs

pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::Artifact;

// Re-export repository types
pub use repository::{ArtifactRepository, DEFAULT_RECENT_LIMIT};

//! Repository layer for the Artifacts domain

pub mod artifacts;

pub use artifacts::{ArtifactRepository, DEFAULT_RECENT_LIMIT};

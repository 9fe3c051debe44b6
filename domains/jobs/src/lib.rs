//! Jobs domain: prompt jobs and their status lifecycle

pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{Job, JobError, JobStatus, MAX_PROMPT_CHARS};
pub use domain::state::{JobEvent, JobState, JobStateMachine, StateError};

// Re-export repository types
pub use repository::JobRepository;

//! Job domain entities
//!
//! A [`Job`] is one unit of image generation work. It is created `queued`,
//! moves to `processing` when the executor picks it up, and ends in exactly
//! one of `completed`, `failed`, or `cancelled`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::state::{JobEvent, JobState, JobStateMachine, StateError};

/// Maximum accepted prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 4000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Check if status is terminal (the job has finished)
    pub fn is_terminal(&self) -> bool {
        self.to_state().is_terminal()
    }

    /// Convert to state machine state
    pub fn to_state(&self) -> JobState {
        match self {
            JobStatus::Queued => JobState::Queued,
            JobStatus::Processing => JobState::Processing,
            JobStatus::Completed => JobState::Completed,
            JobStatus::Failed => JobState::Failed,
            JobStatus::Cancelled => JobState::Cancelled,
        }
    }

    /// Create from state machine state
    pub fn from_state(state: JobState) -> Self {
        match state {
            JobState::Queued => JobStatus::Queued,
            JobState::Processing => JobStatus::Processing,
            JobState::Completed => JobStatus::Completed,
            JobState::Failed => JobStatus::Failed,
            JobState::Cancelled => JobStatus::Cancelled,
        }
    }

    /// All statuses, for exhaustive queries and tests.
    pub fn all() -> [JobStatus; 5] {
        [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ]
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_state())
    }
}

/// Job entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: JobStatus,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds; never earlier than `created_at`
    pub updated_at: i64,
    /// Human-readable failure message, present only when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl Job {
    /// Create a new queued job with validation
    pub fn new(
        id: Uuid,
        prompt: impl Into<String>,
        negative_prompt: Option<String>,
        model: Option<String>,
    ) -> Result<Self, JobError> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err(JobError::Validation("Prompt is required".to_string()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(JobError::Validation(format!(
                "Prompt exceeds {MAX_PROMPT_CHARS} characters"
            )));
        }

        let now = now_ms();
        Ok(Job {
            id,
            prompt,
            negative_prompt,
            model,
            status: JobStatus::default(),
            created_at: now,
            updated_at: now,
            error: None,
        })
    }

    /// Check if the job is terminal
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark the job as picked up by the executor
    pub fn start(&mut self) -> Result<(), JobError> {
        let next = self.apply_transition(JobEvent::Start)?;
        self.status = JobStatus::from_state(next);
        self.touch();
        Ok(())
    }

    /// Mark the job as completed
    pub fn complete(&mut self) -> Result<(), JobError> {
        let next = self.apply_transition(JobEvent::Success)?;
        self.status = JobStatus::from_state(next);
        self.error = None;
        self.touch();
        Ok(())
    }

    /// Mark the job as failed, storing the human-readable message
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        let next = self.apply_transition(JobEvent::Failure)?;
        self.status = JobStatus::from_state(next);
        self.error = Some(message.into());
        self.touch();
        Ok(())
    }

    /// Cancel the job
    pub fn cancel(&mut self) -> Result<(), JobError> {
        let next = self.apply_transition(JobEvent::Cancel)?;
        self.status = JobStatus::from_state(next);
        self.touch();
        Ok(())
    }

    /// Check if a transition is valid without applying it
    pub fn can_transition(&self, event: &JobEvent) -> bool {
        JobStateMachine::can_transition(self.status.to_state(), event)
    }

    fn apply_transition(&self, event: JobEvent) -> Result<JobState, JobError> {
        Ok(JobStateMachine::transition(self.status.to_state(), event)?)
    }

    // updated_at is monotonic even if the wall clock steps backwards.
    fn touch(&mut self) {
        self.updated_at = now_ms().max(self.updated_at);
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<(), JobError> {
        if self.prompt.trim().is_empty() {
            return Err(JobError::Validation("Prompt is required".to_string()));
        }
        if self.prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(JobError::Validation(format!(
                "Prompt exceeds {MAX_PROMPT_CHARS} characters"
            )));
        }
        if self.updated_at < self.created_at {
            return Err(JobError::Validation(
                "updated_at must not precede created_at".to_string(),
            ));
        }
        match (&self.status, &self.error) {
            (JobStatus::Failed, None) => {
                return Err(JobError::Validation(
                    "Failed jobs must carry an error message".to_string(),
                ));
            }
            (status, Some(_)) if *status != JobStatus::Failed => {
                return Err(JobError::Validation(
                    "Only failed jobs may carry an error message".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

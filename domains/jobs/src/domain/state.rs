//! State machine for the prompt job lifecycle
//!
//! Transitions are forward-only: a job moves from `queued` through
//! `processing` into exactly one terminal state and no state is ever
//! re-entered.

use thiserror::Error;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot apply '{event}' from '{from}'")]
    InvalidTransition { from: String, event: String },

    #[error("Terminal state: {0} is a terminal state and cannot transition")]
    TerminalState(String),
}

/// Job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Get all valid next states from the current state
    pub fn valid_transitions(&self) -> &'static [JobState] {
        match self {
            Self::Queued => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed => &[],
            Self::Failed => &[],
            Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events that trigger job state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The executor picks the job up for processing
    Start,
    /// Generation completed and artifacts were persisted
    Success,
    /// Generation failed with an error
    Failure,
    /// The job was cancelled by the user
    Cancel,
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// Job state machine
pub struct JobStateMachine;

impl JobStateMachine {
    /// Attempt a state transition
    ///
    /// Returns the new state if the transition is valid, or an error otherwise.
    pub fn transition(current: JobState, event: JobEvent) -> Result<JobState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (&current, &event) {
            (JobState::Queued, JobEvent::Start) => JobState::Processing,
            (JobState::Queued, JobEvent::Cancel) => JobState::Cancelled,

            (JobState::Processing, JobEvent::Success) => JobState::Completed,
            (JobState::Processing, JobEvent::Failure) => JobState::Failed,
            (JobState::Processing, JobEvent::Cancel) => JobState::Cancelled,

            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: JobState, event: &JobEvent) -> bool {
        Self::transition(current, event.clone()).is_ok()
    }
}

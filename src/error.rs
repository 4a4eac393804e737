//! Error types for the ticket-runner CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Only setup failures travel as errors; once the agent has been spawned,
//! failures are folded into the execution outcome instead.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for ticket-runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Invocation cannot proceed as given (argument-parser style, exit 2).
    #[error("{0}")]
    UsageError(String),

    /// Invalid configuration or local state.
    #[error("{0}")]
    UserError(String),

    /// The backlog has nothing to pick up.
    #[error("{0}")]
    NoWork(String),

    /// A tracker query or mutation failed.
    #[error("Tracker request failed: {0}")]
    TrackerError(String),

    /// The run log could not be written.
    #[error("Log write failed: {0}")]
    LogError(String),
}

impl RunnerError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::UsageError(_) => exit_codes::USAGE_ERROR,
            RunnerError::UserError(_)
            | RunnerError::NoWork(_)
            | RunnerError::TrackerError(_)
            | RunnerError::LogError(_) => exit_codes::FAILURE,
        }
    }
}

/// Result type alias for ticket-runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

//! Error types for nudge with a fail-open philosophy.
//!
//! Nothing in the check-in loop should bring the app down. A stale trigger
//! signal, a failed save or a corrupt goals file is logged and the in-memory
//! state stays authoritative. Errors are returned where a caller can act on
//! them (bad input, illegal transitions) and swallowed with a warning where
//! it cannot.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// The main error type for nudge operations.
#[derive(Error, Debug)]
pub enum NudgeError {
    /// I/O errors from the goals file or config file.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// An operation referenced a goal that is not in the collection.
    #[error("goal not found: {goal_id}")]
    GoalNotFound { goal_id: Uuid },

    /// Rejected user input (empty title, unknown interval, bad session index).
    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// Scheduling state machine violations.
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// The external trigger scheduler rejected a request.
    #[error("scheduler error: {message}")]
    Scheduler { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for nudge operations.
pub type Result<T> = std::result::Result<T, NudgeError>;

impl NudgeError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a goal not found error.
    pub fn goal_not_found(goal_id: Uuid) -> Self {
        Self::GoalNotFound { goal_id }
    }

    /// Create an invalid input error for the named field.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a scheduler error.
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than by
    /// infrastructure. Input errors are shown to the user; everything else
    /// is logged and the app carries on.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::InvalidState { .. } | Self::GoalNotFound { .. }
        )
    }
}

impl From<io::Error> for NudgeError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for NudgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and carry on with a safe value.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the nudge binary.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command rejected (bad input, unknown goal, illegal transition).
    pub const ERROR: i32 = 1;

    /// Panic.
    pub const CRASH: i32 = 3;
}

//! Unified error types for Pythagore.
//!
//! Errors in the decision engine always propagate to the caller. A failed
//! action selection or training step is never replaced by a placeholder
//! action. The only degraded path is the optional empty-prerequisite
//! fallback in [`crate::graph::FallbackGraphStore`], which is keyed off
//! [`TutorError::is_store_failure`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Pythagore operations.
#[derive(Error, Debug)]
pub enum TutorError {
    /// The backing graph service could not be reached or rejected the request.
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// A graph call did not complete within its deadline.
    #[error("store timed out after {timeout_ms}ms")]
    StoreTimeout { timeout_ms: u64 },

    /// I/O errors from graph or checkpoint files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Missing or invalid credentials for an external service.
    #[error("missing credentials: {message}")]
    Credentials { message: String },

    /// The learner state has no mastery entry for a concept that needs one.
    #[error("no mastery recorded for concept '{concept}'")]
    MissingMastery { concept: String },

    /// An encoded vector does not match the network input size.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Adding the edge would close a prerequisite cycle.
    #[error("prerequisite cycle: {from} -> {to}")]
    CyclicPrerequisite { from: String, to: String },

    /// The model produced a non-finite value.
    #[error("numeric error: {message}")]
    Numeric { message: String },

    /// Caller-supplied values outside their domain.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// A specialized Result type for Pythagore operations.
pub type Result<T> = std::result::Result<T, TutorError>;

impl TutorError {
    /// Create a store unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a store timeout error.
    pub fn store_timeout(timeout_ms: u64) -> Self {
        Self::StoreTimeout { timeout_ms }
    }

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

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a credentials error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Create a missing mastery error.
    pub fn missing_mastery(concept: impl Into<String>) -> Self {
        Self::MissingMastery {
            concept: concept.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a prerequisite cycle error.
    pub fn cyclic_prerequisite(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::CyclicPrerequisite {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a numeric error.
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::Numeric {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether this error comes from the graph service transport.
    ///
    /// True for unavailability and timeouts, false for input-consistency
    /// errors such as [`TutorError::MissingMastery`].
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::StoreTimeout { .. }
        )
    }
}

impl From<io::Error> for TutorError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Exit codes for the Pythagore CLI.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command failed (bad input, store failure, ...).
    pub const ERROR: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

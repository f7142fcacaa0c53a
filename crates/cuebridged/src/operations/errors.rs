//! Domain failures reported by bridge operations.

use thiserror::Error;

use crate::host::HostError;

/// Errors raised by operation handlers.
///
/// The `Display` text of each variant is what the client sees in the
/// `message` field of an error response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    /// A required parameter was absent.
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    /// A parameter was present but could not be used.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// An index referred to an element that does not exist.
    #[error("{what} index {index} out of range")]
    OutOfRange { what: &'static str, index: usize },

    /// Another instance of a single-flight operation is still running.
    #[error("{operation} is already running")]
    Busy { operation: &'static str },

    /// The host rejected the mutation.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The handler panicked or hit an unexpected condition.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl OperationError {
    /// Creates a missing parameter error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Creates an invalid parameter error.
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(what: &'static str, index: usize) -> Self {
        Self::OutOfRange { what, index }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

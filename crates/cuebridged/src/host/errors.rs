//! Errors reported by host object-graph operations.

use thiserror::Error;

/// Failures raised by the host when an operation cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// An index does not address an existing object.
    #[error("{what} index {index} out of range")]
    OutOfRange {
        /// Kind of object addressed.
        what: &'static str,
        /// Offending index.
        index: usize,
    },
    /// A value lies outside what the host accepts.
    #[error("invalid {what}: {message}")]
    InvalidValue {
        /// Property being set.
        what: &'static str,
        /// Human-readable constraint.
        message: String,
    },
    /// The host refused the operation in its current state.
    #[error("{0}")]
    Rejected(String),
}

impl HostError {
    /// Creates an out-of-range error.
    pub fn out_of_range(what: &'static str, index: usize) -> Self {
        Self::OutOfRange { what, index }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(what: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            what,
            message: message.into(),
        }
    }
}

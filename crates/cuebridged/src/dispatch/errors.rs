//! Error types for request dispatch failures.
//!
//! Every failure between receiving a document and producing a response is a
//! [`DispatchError`]. Its `Display` text becomes the `message` of the error
//! response, so the wording here is part of the wire contract.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::operations::OperationError;

/// Errors surfaced during request parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command type is not known to any routing table.
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    /// The document parsed but does not have the shape of a command.
    #[error("invalid request structure: {message}")]
    InvalidStructure { message: String },

    /// The owner thread did not answer before the deadline.
    #[error("Timeout waiting for {what}")]
    Timeout {
        what: &'static str,
        waited: Duration,
    },

    /// The handler reported a domain failure.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// The owner thread dropped the work without answering.
    #[error("owner thread stopped before responding")]
    OwnerUnavailable,

    /// Buffered request bytes exceed the per-session ceiling.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialization failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),

    /// A panic escaped routing.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Creates an unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(what: &'static str, waited: Duration) -> Self {
        Self::Timeout { what, waited }
    }

    /// Creates a request too large error.
    pub fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DispatchError::unknown_command("bogus_xyz"), "Unknown command: bogus_xyz")]
    #[case(
        DispatchError::timeout("locator creation", Duration::from_secs(10)),
        "Timeout waiting for locator creation"
    )]
    #[case(
        DispatchError::request_too_large(2048, 1024),
        "request too large: 2048 bytes exceeds 1024 byte limit"
    )]
    #[case(
        DispatchError::from(OperationError::missing("tempo")),
        "missing required parameter 'tempo'"
    )]
    fn messages_match_the_wire_contract(#[case] error: DispatchError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}

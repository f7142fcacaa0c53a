//! Submission failures reported by owner-thread schedulers.

use std::fmt;

use thiserror::Error;

use super::Callback;

/// Reasons a callback could not be queued.
///
/// Both variants carry the rejected callback; dropping the error drops it.
#[derive(Error)]
pub enum ScheduleError {
    /// The scheduler refused the submission from the current context.
    #[error("owner thread rejected the submission")]
    Rejected(Callback),
    /// The owner thread has shut down.
    #[error("owner thread is no longer running")]
    Closed(Callback),
}

impl fmt::Debug for ScheduleError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(_) => formatter.write_str("Rejected(..)"),
            Self::Closed(_) => formatter.write_str("Closed(..)"),
        }
    }
}

//! Signals that end a bridge run.
//!
//! The daemon blocks its main thread on a [`ShutdownSignal`] once the owner
//! loop is ticking and the acceptor is live. When the wait returns, the
//! acceptor stops taking clients, live sessions get the shutdown budget to
//! drain, and the owner loop is stopped last so in-flight tasks still settle.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use signal_hook::low_level::signal_name;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Signals that stop the bridge.
const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Source of the stop request that tears the bridge down.
///
/// `wait` is called once, from the thread that started the bridge, after the
/// acceptor reported ready. Returning `Ok` starts the teardown; returning an
/// error still tears down but makes the run fail.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the bridge should stop.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Failure to arm the stop request.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("failed to install signal handlers: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
}

/// Waits for one of SIGTERM, SIGINT, SIGQUIT or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals =
            Signals::new(TERMINATION_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal = signal_name(signal).unwrap_or("unknown"),
                "stopping bridge"
            );
        }
        Ok(())
    }
}

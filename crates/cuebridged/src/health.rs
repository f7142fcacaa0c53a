//! Structured health reporting for bridge lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use cuebridge_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener accepts connections.
    fn listener_ready(&self, address: SocketAddr);

    /// Invoked when a client session starts.
    fn session_opened(&self, peer: SocketAddr);

    /// Invoked when a client session ends.
    fn session_closed(&self, peer: SocketAddr);

    /// Invoked after the acceptor stops; `lingering` sessions were still
    /// running when the shutdown budget ran out.
    fn shutdown_completed(&self, lingering: usize);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, address: SocketAddr) {
        (**self).listener_ready(address);
    }

    fn session_opened(&self, peer: SocketAddr) {
        (**self).session_opened(peer);
    }

    fn session_closed(&self, peer: SocketAddr) {
        (**self).session_closed(peer);
    }

    fn shutdown_completed(&self, lingering: usize) {
        (**self).shutdown_completed(lingering);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            endpoint = %config.listen_endpoint(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            response_timeout_ms = config.response_timeout_ms,
            serialise_reads = config.serialise_reads(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn listener_ready(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            %address,
            "bridge accepting connections"
        );
    }

    fn session_opened(&self, peer: SocketAddr) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "session_opened",
            %peer,
            "client session opened"
        );
    }

    fn session_closed(&self, peer: SocketAddr) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "session_closed",
            %peer,
            "client session closed"
        );
    }

    fn shutdown_completed(&self, lingering: usize) {
        if lingering > 0 {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "shutdown_completed",
                lingering,
                "bridge stopped with sessions still running"
            );
        } else {
            tracing::info!(
                target: HEALTH_TARGET,
                event = "shutdown_completed",
                "bridge stopped"
            );
        }
    }
}

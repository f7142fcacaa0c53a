//! Bridge bootstrap and lifecycle.
//!
//! [`bootstrap_with`] resolves configuration and telemetry. The resulting
//! [`Bridge`] is then attached to a host and its owner-thread scheduler with
//! [`Bridge::serve`], which binds the listener and returns a
//! [`RunningBridge`] that owns the accept loop until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::OrthoError;
use thiserror::Error;

use cuebridge_config::Config;

use crate::dispatch::{BridgeConnectionHandler, CommandRouter, RouterOptions};
use crate::health::HealthReporter;
use crate::host::Host;
use crate::scheduler::OwnerScheduler;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the bridge configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that always returns the same configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// A configured bridge that is not yet listening.
pub struct Bridge {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Bridge {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Binds the configured endpoint and starts accepting clients.
    ///
    /// Mutations run through `scheduler`, which must execute callbacks on the
    /// only thread allowed to touch `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the endpoint cannot be resolved or bound,
    /// or the accept thread cannot be started.
    pub fn serve(
        &self,
        host: Arc<dyn Host>,
        scheduler: Arc<dyn OwnerScheduler>,
    ) -> Result<RunningBridge, ListenerError> {
        let router = Arc::new(CommandRouter::new(
            host,
            scheduler,
            RouterOptions::from_config(&self.config),
        ));
        let handler = Arc::new(BridgeConnectionHandler::new(
            Arc::clone(&router),
            self.config.max_request_bytes(),
        ));
        let listener = SocketListener::bind(&self.config.listen_endpoint())?;
        let listener = listener.start(handler, Arc::clone(&self.reporter))?;
        Ok(RunningBridge {
            router,
            listener,
            shutdown_timeout: self.config.shutdown_timeout(),
        })
    }
}

/// A bridge accepting connections.
pub struct RunningBridge {
    router: Arc<CommandRouter>,
    listener: ListenerHandle,
    shutdown_timeout: Duration,
}

impl RunningBridge {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Router shared by every session, including its dynamic registry.
    #[must_use]
    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    /// Number of sessions currently connected.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.listener.live_sessions()
    }

    /// Stops accepting, waits for the accept loop within the configured
    /// budget, and returns the number of sessions left running.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] if the accept loop panicked or did not stop
    /// in time.
    pub fn shutdown(self) -> Result<usize, ListenerError> {
        self.listener
            .join(self.shutdown_timeout)
            .map(|report| report.lingering)
    }
}

/// Bootstraps the bridge using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration loading or telemetry setup
/// fails. Each failure is also reported to `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Bridge, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Bridge {
        config,
        telemetry,
        reporter,
    })
}

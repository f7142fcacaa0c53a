//! Layered configuration for the cuebridge daemon.
//!
//! Values resolve in the order: built-in defaults, configuration file,
//! `CUEBRIDGE_*` environment variables, then command-line flags. Every field
//! has a default so an empty environment yields a loopback listener on the
//! well-known port.

mod defaults;
mod endpoint;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_PORT,
    DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_TICK_INTERVAL_MS,
    default_host, default_log_filter, default_log_filter_string, default_log_format,
    default_max_request_bytes, default_port, default_response_timeout_ms,
    default_shutdown_timeout_ms, default_tick_interval_ms,
};
pub use endpoint::{EndpointParseError, ListenEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CUEBRIDGE")]
pub struct Config {
    /// Interface the listener binds to.
    #[serde(default = "defaults::default_host")]
    pub host: String,
    /// Port the listener binds to.
    #[serde(default = "defaults::default_port")]
    pub port: u16,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Deadline for owner-thread results, in milliseconds.
    #[serde(default = "defaults::default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Ceiling on buffered bytes for one incomplete request.
    #[serde(default = "defaults::default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Route read-only commands through the owner thread as well.
    #[serde(default)]
    pub serialise_reads: bool,
    /// Tick period of the bundled owner-thread loop, in milliseconds.
    #[serde(default = "defaults::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Bounded wait when joining the accept loop, in milliseconds.
    #[serde(default = "defaults::default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            serialise_reads: false,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Resolves configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Fails when any layer holds a value that cannot be parsed.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Resolves configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name.
    ///
    /// # Errors
    ///
    /// Fails when any layer holds a value that cannot be parsed.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Address the listener binds to.
    #[must_use]
    pub fn listen_endpoint(&self) -> ListenEndpoint {
        ListenEndpoint::new(self.host.clone(), self.port)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Deadline for owner-thread task and workflow results.
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Per-session ceiling on pending request bytes.
    #[must_use]
    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Whether read-only commands are serialised through the owner thread.
    #[must_use]
    pub fn serialise_reads(&self) -> bool {
        self.serialise_reads
    }

    /// Period of the bundled owner-thread loop.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Budget for joining the accept loop during shutdown.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

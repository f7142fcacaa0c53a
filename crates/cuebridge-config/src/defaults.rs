use crate::logging::LogFormat;

/// Well-known port the bridge listens on.
pub const DEFAULT_PORT: u16 = 9877;

/// Loopback host used unless configured otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Deadline applied to owner-thread results, in milliseconds.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 10_000;

/// Ceiling on bytes buffered for a single incomplete request.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Period of the bundled owner-thread loop, in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Bounded wait when joining the accept loop, in milliseconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 1_000;

/// Owned default host value used where allocation is required (e.g. serde).
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default listen port.
pub fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default owner-thread result deadline in milliseconds.
pub fn default_response_timeout_ms() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_MS
}

/// Default per-session request size ceiling.
pub fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

/// Default owner-loop tick period in milliseconds.
pub fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

/// Default accept-loop join budget in milliseconds.
pub fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

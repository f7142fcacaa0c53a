//! Cross-thread command bridge between socket clients and a host application
//! that only allows mutation from one cooperative owner thread.
//!
//! Clients connect over TCP and send JSON commands. Each connection is served
//! by its own session thread, which classifies every command and then either:
//!
//! - runs a read-only operation directly on the session thread;
//! - hands a mutating operation to the owner thread through the
//!   [`handoff`] primitive and blocks, with a deadline, for its result; or
//! - starts a multi-tick [`workflow`] that advances itself through several
//!   owner-thread ticks before producing a result.
//!
//! The owner thread is abstracted by [`scheduler::OwnerScheduler`]. Hosts that
//! embed the bridge implement it over their native scheduling primitive; the
//! `cuebridged` binary uses the bundled [`scheduler::TickLoop`] driving an
//! in-memory [`host::MemoryHost`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cuebridge_config::Config;
//! use cuebridged::host::MemoryHost;
//! use cuebridged::scheduler::TickLoop;
//! use cuebridged::{StaticConfigLoader, StructuredHealthReporter, bootstrap_with};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = StaticConfigLoader::new(Config::default());
//! let bridge = bootstrap_with(&loader, Arc::new(StructuredHealthReporter::new()))?;
//! let owner = Arc::new(TickLoop::spawn(Duration::from_millis(100))?);
//! let running = bridge.serve(Arc::new(MemoryHost::new()), owner.clone())?;
//! // ... serve clients ...
//! running.shutdown()?;
//! owner.shutdown();
//! # Ok(())
//! # }
//! ```

mod bootstrap;
pub mod dispatch;
pub mod handoff;
mod health;
pub mod host;
pub mod operations;
mod process;
pub mod scheduler;
pub mod telemetry;
mod transport;
pub mod workflow;

pub use bootstrap::{
    Bridge, BootstrapError, ConfigLoader, RunningBridge, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_bridge};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;

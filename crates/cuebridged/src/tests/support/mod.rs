//! Test harness utilities shared by the behavioural suites.

mod client;
mod config_loader;
mod reporter;
mod shutdown;

pub use client::BridgeClient;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::TestShutdownSignal;

pub type StepResult = Result<(), String>;

//! Supervises bridge launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::host::MemoryHost;
use crate::scheduler::{OwnerScheduler, TickLoop};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the bridge runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) host: Arc<MemoryHost>,
}

/// Runs the bridge against the offline in-memory host until a termination
/// signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] if bootstrap, the owner loop, the listener or
/// signal handling fails.
pub fn run_bridge() -> Result<(), LaunchError> {
    run_bridge_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        host: Arc::new(MemoryHost::new()),
    })
}

/// Runs the bridge with injected collaborators.
pub(crate) fn run_bridge_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        host,
    } = plan;

    let bridge = bootstrap_with(&loader, reporter)?;
    let config = bridge.config();
    info!(
        target: PROCESS_TARGET,
        endpoint = %config.listen_endpoint(),
        tick_interval_ms = config.tick_interval_ms,
        "starting bridge runtime"
    );

    let tick_host = Arc::clone(&host);
    let owner = Arc::new(
        TickLoop::spawn_with_hook(
            config.tick_interval(),
            Box::new(move |elapsed| tick_host.advance(elapsed)),
        )
        .map_err(|source| LaunchError::OwnerThread { source })?,
    );

    let scheduler = Arc::clone(&owner) as Arc<dyn OwnerScheduler>;
    let running = match bridge.serve(host, scheduler) {
        Ok(running) => running,
        Err(error) => {
            owner.shutdown();
            return Err(error.into());
        }
    };

    let waited = shutdown.wait();
    let stopped = running.shutdown();
    owner.shutdown();
    waited?;
    let lingering = stopped?;
    info!(
        target: PROCESS_TARGET,
        lingering,
        "shutdown sequence completed"
    );
    Ok(())
}

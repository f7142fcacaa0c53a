//! Owner-thread scheduling.
//!
//! The host permits mutation from exactly one execution context, which only
//! runs short callbacks handed to it ahead of time. [`OwnerScheduler`] models
//! that contract: `schedule(delay_ticks, callback)` queues a callback to run on
//! the owner thread some number of ticks from now, one at a time and never
//! concurrently with another callback.
//!
//! [`TickLoop`] is the bundled owner thread used by the offline daemon. Hosts
//! that embed the bridge supply their own implementation wrapping the host's
//! native scheduling primitive.

mod errors;
#[cfg(any(test, feature = "test-support"))]
mod manual;
mod queue;
mod tick_loop;

use std::panic::{self, AssertUnwindSafe};

use tracing::error;

pub use self::errors::ScheduleError;
#[cfg(any(test, feature = "test-support"))]
pub use self::manual::ManualScheduler;
pub use self::tick_loop::{TickHook, TickLoop};

pub(crate) const SCHEDULER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scheduler");

/// Zero-argument procedure executed on the owner thread.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Cooperative single-threaded callback queue owned by the host.
pub trait OwnerScheduler: Send + Sync {
    /// Queues `callback` to run `delay_ticks` ticks from now.
    ///
    /// A delay of zero means the next tick. On rejection the callback is handed
    /// back inside the error so the caller may decide how to run it.
    fn schedule(&self, delay_ticks: u32, callback: Callback) -> Result<(), ScheduleError>;
}

/// Runs one callback, containing any panic so the owner thread survives.
pub(crate) fn run_callback(callback: Callback) {
    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        error!(
            target: SCHEDULER_TARGET,
            "owner-thread callback panicked"
        );
    }
}

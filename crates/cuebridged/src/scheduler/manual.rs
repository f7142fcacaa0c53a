//! Deterministic scheduler for tests.
//!
//! Nothing runs until the test calls [`ManualScheduler::tick`], which makes
//! owner-thread starvation and multi-tick workflows reproducible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::queue::TickQueue;
use super::{Callback, OwnerScheduler, ScheduleError, run_callback};

/// Owner scheduler advanced explicitly by the caller.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<TickQueue>,
    closed: AtomicBool,
}

impl ManualScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a single tick on the calling thread and returns how many
    /// callbacks it executed.
    pub fn tick(&self) -> usize {
        let due = self.queue().begin_tick();
        let ran = due.len();
        for callback in due {
            run_callback(callback);
        }
        ran
    }

    /// Ticks until nothing is pending or `max_ticks` is reached.
    ///
    /// Returns the number of ticks performed.
    pub fn run_until_idle(&self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.pending() > 0 {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Number of callbacks not yet run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    /// Refuses further submissions with [`ScheduleError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn queue(&self) -> MutexGuard<'_, TickQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OwnerScheduler for ManualScheduler {
    fn schedule(&self, delay_ticks: u32, callback: Callback) -> Result<(), ScheduleError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScheduleError::Closed(callback));
        }
        self.queue().push(delay_ticks, callback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn nothing_runs_without_a_tick() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let callback: Callback = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.schedule(0, callback).expect("schedule");

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.tick(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_until_idle_follows_rescheduled_chains() {
        let scheduler = Arc::new(ManualScheduler::new());
        let count = Arc::new(AtomicUsize::new(0));
        let (inner_scheduler, inner_count) = (Arc::clone(&scheduler), Arc::clone(&count));
        let first: Callback = Box::new(move || {
            inner_count.fetch_add(1, Ordering::SeqCst);
            let last = Arc::clone(&inner_count);
            let second: Callback = Box::new(move || {
                last.fetch_add(1, Ordering::SeqCst);
            });
            inner_scheduler.schedule(2, second).expect("reschedule");
        });
        scheduler.schedule(1, first).expect("schedule");

        assert_eq!(scheduler.run_until_idle(10), 3);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn closed_scheduler_refuses_work() {
        let scheduler = ManualScheduler::new();
        scheduler.close();
        let error = scheduler.schedule(0, Box::new(|| {})).expect_err("closed");
        assert!(matches!(error, ScheduleError::Closed(_)));
    }
}

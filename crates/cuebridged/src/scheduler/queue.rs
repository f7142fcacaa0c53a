//! Tick-indexed callback queue shared by the scheduler implementations.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::Callback;

struct Entry {
    due: u64,
    seq: u64,
    callback: Callback,
}

impl Entry {
    fn key(&self) -> (u64, u64) {
        (self.due, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Callbacks keyed by the tick they become due on.
///
/// Entries due on the same tick keep submission order.
#[derive(Default)]
pub(crate) struct TickQueue {
    current_tick: u64,
    next_seq: u64,
    pending: BinaryHeap<Reverse<Entry>>,
}

impl TickQueue {
    pub(crate) fn push(&mut self, delay_ticks: u32, callback: Callback) {
        let due = self.current_tick + u64::from(delay_ticks.max(1));
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Reverse(Entry { due, seq, callback }));
    }

    /// Advances to the next tick and removes every callback now due.
    pub(crate) fn begin_tick(&mut self) -> Vec<Callback> {
        self.current_tick += 1;
        let mut due = Vec::new();
        while self
            .pending
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= self.current_tick)
        {
            if let Some(Reverse(entry)) = self.pending.pop() {
                due.push(entry.callback);
            }
        }
        due
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

//! Termination budget shared by every fault-injection worker

use std::sync::atomic::{AtomicUsize, Ordering};

/// Maximum number of processes that may be permanently killed while a
/// majority of the `processes` keeps running.
pub fn termination_limit(processes: usize) -> usize {
    if processes % 2 == 1 {
        processes / 2
    } else {
        processes.saturating_sub(1) / 2
    }
}

/// Budget of reservations that saturates at `limit`.
///
/// Reservations are never released.
#[derive(Debug)]
pub struct SaturatingCounter {
    limit: usize,
    value: AtomicUsize,
}

impl SaturatingCounter {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            value: AtomicUsize::new(0),
        }
    }

    /// Counter sized for a run of `processes` processes
    pub fn for_processes(processes: usize) -> Self {
        Self::new(termination_limit(processes))
    }

    /// Take one unit of budget. Returns `false`, with no side effect, once the budget is exhausted.
    pub fn reserve(&self) -> bool {
        self.value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                (value < self.limit).then_some(value + 1)
            })
            .is_ok()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Reservations granted so far
    pub fn granted(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.granted()
    }
}

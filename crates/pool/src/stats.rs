//! Pool statistics

use serde::Serialize;

/// Point-in-time snapshot of a pool, taken under the pool lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Configured number of slots.
    pub capacity: usize,
    /// Handles currently idle in the pool.
    pub idle: usize,
    /// Handles currently checked out.
    pub outstanding: usize,
    /// Slots whose replacement handle could not be created yet.
    pub pending: usize,
    /// Callers currently blocked in `acquire`.
    pub waiters: usize,
    /// Total successful acquisitions.
    pub total_acquisitions: u64,
    /// Total handles checked back in.
    pub total_releases: u64,
    /// Total handles ever created, including the initial set.
    pub created: u64,
    /// Total handles ever closed.
    pub destroyed: u64,
    /// Handles replaced after failing validation.
    pub recreated: u64,
    /// Acquire calls that gave up at their deadline.
    pub exhausted: u64,
    /// Factory calls that failed after initialization.
    pub create_failures: u64,
}

impl PoolStats {
    /// Slots accounted for: idle, checked out, or awaiting recreation.
    ///
    /// Equals `capacity` at every quiescent point while the pool is running.
    #[must_use]
    pub fn accounted(&self) -> usize {
        self.idle + self.outstanding + self.pending
    }
}

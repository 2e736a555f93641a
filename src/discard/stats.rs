//! Drop and loopback counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a discard layer
#[derive(Debug, Default)]
pub struct DiscardStats {
    pub dropped_up: AtomicU64,
    pub dropped_down: AtomicU64,
    pub loopbacks_delivered: AtomicU64,
    pub loopback_failures: AtomicU64,
}

impl DiscardStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped_up(&self) -> u64 {
        self.dropped_up.load(Ordering::Relaxed)
    }

    pub fn dropped_down(&self) -> u64 {
        self.dropped_down.load(Ordering::Relaxed)
    }

    pub fn loopbacks_delivered(&self) -> u64 {
        self.loopbacks_delivered.load(Ordering::Relaxed)
    }

    pub fn loopback_failures(&self) -> u64 {
        self.loopback_failures.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.dropped_up.store(0, Ordering::Relaxed);
        self.dropped_down.store(0, Ordering::Relaxed);
        self.loopbacks_delivered.store(0, Ordering::Relaxed);
        self.loopback_failures.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dropped_up: self.dropped_up(),
            dropped_down: self.dropped_down(),
            loopbacks_delivered: self.loopbacks_delivered(),
            loopback_failures: self.loopback_failures(),
            taken_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Dropped up: {}, Dropped down: {}, Loopbacks: {} ({} failed)",
            self.dropped_up(),
            self.dropped_down(),
            self.loopbacks_delivered(),
            self.loopback_failures()
        )
    }
}

/// Point-in-time copy of [`DiscardStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub dropped_up: u64,
    pub dropped_down: u64,
    pub loopbacks_delivered: u64,
    pub loopback_failures: u64,
    /// UNIX timestamp in seconds
    pub taken_at: i64,
}

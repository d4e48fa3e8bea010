//! Atomic counters for arena observability.
//!
//! All counters use relaxed ordering; they are diagnostic, not
//! synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-arena operation counters.
#[derive(Debug, Default)]
pub struct ArenaMetrics {
    /// Successful allocations, including relocation targets.
    pub allocations: AtomicU64,
    /// Allocations refused for lack of a large enough gap.
    pub allocation_failures: AtomicU64,
    /// Blocks unlinked, including relocation sources.
    pub releases: AtomicU64,
    /// Resizes served by shrinking in place.
    pub shrinks: AtomicU64,
    /// Resizes served by growing into the following gap.
    pub in_place_grows: AtomicU64,
    /// Resizes that moved the block.
    pub relocations: AtomicU64,
    /// Operations refused because a header failed validation.
    pub corruption_detected: AtomicU64,
    /// Introspection passes over the block list.
    pub stats_walks: AtomicU64,
}

impl ArenaMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            shrinks: AtomicU64::new(0),
            in_place_grows: AtomicU64::new(0),
            relocations: AtomicU64::new(0),
            corruption_detected: AtomicU64::new(0),
            stats_walks: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            allocations: Self::get(&self.allocations),
            allocation_failures: Self::get(&self.allocation_failures),
            releases: Self::get(&self.releases),
            shrinks: Self::get(&self.shrinks),
            in_place_grows: Self::get(&self.in_place_grows),
            relocations: Self::get(&self.relocations),
            corruption_detected: Self::get(&self.corruption_detected),
            stats_walks: Self::get(&self.stats_walks),
        }
    }
}

/// Point-in-time copy of [`ArenaMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub allocations: u64,
    pub allocation_failures: u64,
    pub releases: u64,
    pub shrinks: u64,
    pub in_place_grows: u64,
    pub relocations: u64,
    pub corruption_detected: u64,
    pub stats_walks: u64,
}

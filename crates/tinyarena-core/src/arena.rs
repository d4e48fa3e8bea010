//! Public arena handle.
//!
//! [`Arena`] borrows a host byte region for its whole lifetime and serves
//! variable-size blocks out of it. Each operation:
//!
//! 1. acquires the arena lock (released on every exit path),
//! 2. runs the engine,
//! 3. bumps the matching [`ArenaMetrics`] counter,
//! 4. appends an [`ArenaLogRecord`] describing the path taken or the failure.

use std::fmt;

use parking_lot::Mutex;

use crate::config::ArenaConfig;
use crate::engine::{ArenaState, Placement, ResizeOutcome};
use crate::error::ArenaError;
use crate::header::BlockPtr;
use crate::lifecycle::{ArenaLogLevel, ArenaLogRecord, LifecycleLog, LogEvent};
use crate::lock::{ArenaLock, NoLock};
use crate::metrics::{ArenaMetrics, MetricsSnapshot};
use crate::stats::{ArenaStats, BlockInfo};

/// First-fit allocator over a borrowed byte region.
pub struct Arena<'r, L: ArenaLock = NoLock> {
    state: ArenaState<'r>,
    config: ArenaConfig,
    lock: L,
    log: Mutex<LifecycleLog>,
    metrics: ArenaMetrics,
}

impl<'r> Arena<'r, NoLock> {
    /// Arena over `region` with process-wide settings from the environment.
    pub fn new(region: &'r mut [u8]) -> Self {
        Self::with_config(region, ArenaConfig::global())
    }

    pub fn with_config(region: &'r mut [u8], config: ArenaConfig) -> Self {
        Self::with_lock(region, config, NoLock)
    }
}

impl<'r, L: ArenaLock> Arena<'r, L> {
    /// Arena whose operations run under `lock`.
    pub fn with_lock(region: &'r mut [u8], config: ArenaConfig, lock: L) -> Self {
        let arena = Self {
            state: ArenaState::new(region, config.check_level),
            config,
            lock,
            log: Mutex::new(LifecycleLog::new(config.lifecycle_log)),
            metrics: ArenaMetrics::new(),
        };
        arena.record(
            LogEvent::new(ArenaLogLevel::Info, "init", "arena_init", "success").with_details(
                format!(
                    "region_size={} check_level={}",
                    arena.state.region.len(),
                    config.check_level.as_str()
                ),
            ),
        );
        arena
    }

    #[must_use]
    pub fn config(&self) -> ArenaConfig {
        self.config
    }

    #[must_use]
    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Capacity of the borrowed region (0 after [`destroy`](Self::destroy)).
    #[must_use]
    pub fn region_size(&self) -> usize {
        self.state.region.len()
    }

    #[must_use]
    pub fn live_blocks(&self) -> usize {
        self.state.live_blocks
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.head.is_none()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Copy of the retained lifecycle records, oldest first.
    #[must_use]
    pub fn lifecycle_logs(&self) -> Vec<ArenaLogRecord> {
        self.log.lock().snapshot()
    }

    /// Take the retained lifecycle records, leaving the log empty.
    pub fn drain_lifecycle_logs(&self) -> Vec<ArenaLogRecord> {
        self.log.lock().drain()
    }

    /// Records evicted from the lifecycle ring so far.
    #[must_use]
    pub fn dropped_lifecycle_logs(&self) -> u64 {
        self.log.lock().dropped()
    }

    /// Reserve at least `size` bytes in the first gap that fits.
    ///
    /// The block gets `size` rounded up to a whole word. A zero-byte request
    /// still consumes a header and yields a distinct handle.
    pub fn allocate(&mut self, size: usize) -> Result<BlockPtr, ArenaError> {
        let _guard = self.lock.acquire();
        match self.state.allocate(size) {
            Ok(placement) => {
                self.note_placement("allocate", size, &placement);
                Ok(placement.ptr)
            }
            Err(err) => {
                self.note_failure("allocate", None, Some(size), &err);
                Err(err)
            }
        }
    }

    /// Reserve `count * size` bytes and zero the block's whole data area.
    pub fn allocate_zeroed(&mut self, count: usize, size: usize) -> Result<BlockPtr, ArenaError> {
        let _guard = self.lock.acquire();
        match self.state.allocate_zeroed(count, size) {
            Ok(placement) => {
                self.note_placement("allocate_zeroed", count.saturating_mul(size), &placement);
                Ok(placement.ptr)
            }
            Err(err) => {
                self.note_failure("allocate_zeroed", None, Some(size), &err);
                Err(err)
            }
        }
    }

    /// Change the size of a block.
    ///
    /// - `None` behaves like [`allocate`](Self::allocate).
    /// - Shrinking (including to zero) keeps the address; the vacated tail
    ///   joins the following gap.
    /// - Growing stays in place when the following gap is large enough,
    ///   otherwise the contents move to a fresh block and the old block is
    ///   released. On failure the original block is untouched.
    pub fn resize(&mut self, ptr: Option<BlockPtr>, new_size: usize) -> Result<BlockPtr, ArenaError> {
        let _guard = self.lock.acquire();
        match self.state.resize(ptr, new_size) {
            Ok(outcome) => {
                self.note_resize(new_size, &outcome);
                Ok(outcome.ptr())
            }
            Err(err) => {
                self.note_failure("resize", ptr, Some(new_size), &err);
                Err(err)
            }
        }
    }

    /// Unlink a block. `None` is a no-op.
    ///
    /// Released space becomes part of the surrounding gap immediately;
    /// nothing is coalesced because gaps are implicit.
    pub fn release(&mut self, ptr: Option<BlockPtr>) -> Result<(), ArenaError> {
        let _guard = self.lock.acquire();
        let Some(ptr) = ptr else {
            self.record(LogEvent::new(
                ArenaLogLevel::Trace,
                "release",
                "release_none",
                "noop",
            ));
            return Ok(());
        };
        match self.state.release(ptr) {
            Ok(released) => {
                ArenaMetrics::inc(&self.metrics.releases);
                self.record(
                    LogEvent::new(ArenaLogLevel::Trace, "release", "release", "success")
                        .with_ptr(Some(released.ptr.offset()))
                        .with_size(Some(released.size)),
                );
                Ok(())
            }
            Err(err) => {
                self.note_failure("release", Some(ptr), None, &err);
                Err(err)
            }
        }
    }

    /// Walk the list and summarize occupancy.
    pub fn stats(&self) -> Result<ArenaStats, ArenaError> {
        let _guard = self.lock.acquire();
        ArenaMetrics::inc(&self.metrics.stats_walks);
        match self.state.collect_stats() {
            Ok(stats) => {
                self.record(
                    LogEvent::new(ArenaLogLevel::Debug, "stats", "arena_stats", "snapshot")
                        .with_details(format!(
                            "used_size={} fragmentation_bytes={}",
                            stats.used_size, stats.fragmentation_bytes
                        )),
                );
                Ok(stats)
            }
            Err(err) => {
                self.note_failure("stats", None, None, &err);
                Err(err)
            }
        }
    }

    /// Live blocks in address order.
    pub fn blocks(&self) -> Result<Vec<BlockInfo>, ArenaError> {
        let _guard = self.lock.acquire();
        ArenaMetrics::inc(&self.metrics.stats_walks);
        self.state.collect_blocks().inspect_err(|err| {
            self.note_failure("blocks", None, None, err);
        })
    }

    /// Check every header and link, validating canaries even when the
    /// configured check level is off.
    pub fn verify(&self) -> Result<(), ArenaError> {
        let _guard = self.lock.acquire();
        ArenaMetrics::inc(&self.metrics.stats_walks);
        self.state.verify().inspect_err(|err| {
            self.note_failure("verify", None, None, err);
        })
    }

    /// Padded data size of a live block.
    pub fn block_size(&self, ptr: BlockPtr) -> Result<usize, ArenaError> {
        let _guard = self.lock.acquire();
        self.state
            .data_range(ptr)
            .map(|(_, len)| len)
            .inspect_err(|err| self.note_failure("block_size", Some(ptr), None, err))
    }

    /// Data bytes of a live block.
    pub fn data(&self, ptr: BlockPtr) -> Result<&[u8], ArenaError> {
        let _guard = self.lock.acquire();
        self.state
            .data(ptr)
            .inspect_err(|err| self.note_failure("data", Some(ptr), None, err))
    }

    /// Mutable data bytes of a live block.
    pub fn data_mut(&mut self, ptr: BlockPtr) -> Result<&mut [u8], ArenaError> {
        let _guard = self.lock.acquire();
        let (start, len) = match self.state.data_range(ptr) {
            Ok(range) => range,
            Err(err) => {
                self.note_failure("data_mut", Some(ptr), None, &err);
                return Err(err);
            }
        };
        self.state
            .region
            .bytes_mut(start, len)
            .ok_or(ArenaError::InvalidPointer { ptr: start })
    }

    /// Forget every block and hand the region back.
    ///
    /// Outstanding handles become invalid; the region bytes are left as
    /// they are. The arena stays usable but has zero capacity.
    pub fn destroy(&mut self) -> &'r mut [u8] {
        let _guard = self.lock.acquire();
        let abandoned = self.state.live_blocks;
        let region = self.state.destroy();
        self.record(
            LogEvent::new(ArenaLogLevel::Info, "destroy", "arena_destroy", "success").with_details(
                format!("region_size={} abandoned_blocks={abandoned}", region.len()),
            ),
        );
        region
    }

    fn record(&self, event: LogEvent) {
        if !self.config.lifecycle_log {
            return;
        }
        self.log
            .lock()
            .record(event, self.state.live_blocks, self.state.allocated_size);
    }

    fn note_placement(&self, symbol: &'static str, requested: usize, placement: &Placement) {
        ArenaMetrics::inc(&self.metrics.allocations);
        self.record(
            LogEvent::new(ArenaLogLevel::Trace, symbol, "alloc", "success")
                .with_ptr(Some(placement.ptr.offset()))
                .with_size(Some(placement.size))
                .with_details(format!(
                    "path={} requested={requested}",
                    placement.site.as_str()
                )),
        );
    }

    fn note_resize(&self, new_size: usize, outcome: &ResizeOutcome) {
        let event = match *outcome {
            ResizeOutcome::Allocated(placement) => {
                ArenaMetrics::inc(&self.metrics.allocations);
                LogEvent::new(ArenaLogLevel::Trace, "resize", "resize_none_as_alloc", "success")
                    .with_ptr(Some(placement.ptr.offset()))
                    .with_size(Some(placement.size))
                    .with_details(format!("path={}", placement.site.as_str()))
            }
            ResizeOutcome::Shrunk {
                ptr,
                old_size,
                new_size: padded,
            } => {
                ArenaMetrics::inc(&self.metrics.shrinks);
                LogEvent::new(ArenaLogLevel::Trace, "resize", "shrink", "success")
                    .with_ptr(Some(ptr.offset()))
                    .with_size(Some(padded))
                    .with_details(format!("old_size={old_size} requested={new_size}"))
            }
            ResizeOutcome::GrewInPlace {
                ptr,
                old_size,
                new_size: padded,
            } => {
                ArenaMetrics::inc(&self.metrics.in_place_grows);
                LogEvent::new(ArenaLogLevel::Trace, "resize", "grow_in_place", "success")
                    .with_ptr(Some(ptr.offset()))
                    .with_size(Some(padded))
                    .with_details(format!("old_size={old_size} requested={new_size}"))
            }
            ResizeOutcome::Relocated {
                from,
                to,
                old_size,
                copied,
            } => {
                ArenaMetrics::inc(&self.metrics.relocations);
                ArenaMetrics::inc(&self.metrics.allocations);
                ArenaMetrics::inc(&self.metrics.releases);
                LogEvent::new(ArenaLogLevel::Trace, "resize", "relocate", "success")
                    .with_ptr(Some(to.ptr.offset()))
                    .with_size(Some(to.size))
                    .with_details(format!(
                        "from={from} old_size={old_size} copied={copied} path={}",
                        to.site.as_str()
                    ))
            }
        };
        self.record(event);
    }

    fn note_failure(
        &self,
        symbol: &'static str,
        ptr: Option<BlockPtr>,
        size: Option<usize>,
        err: &ArenaError,
    ) {
        let (level, event) = match err {
            ArenaError::OutOfMemory { .. } | ArenaError::SizeOverflow { .. } => {
                ArenaMetrics::inc(&self.metrics.allocation_failures);
                (ArenaLogLevel::Warn, "alloc_failed")
            }
            ArenaError::InvalidPointer { .. } => (ArenaLogLevel::Warn, "invalid_pointer"),
            ArenaError::NotLive { .. } => (ArenaLogLevel::Warn, "not_live_pointer"),
            ArenaError::Corruption { .. } => {
                ArenaMetrics::inc(&self.metrics.corruption_detected);
                (ArenaLogLevel::Error, "corruption_detected")
            }
        };
        self.record(
            LogEvent::new(level, symbol, event, err.label())
                .with_ptr(ptr.map(BlockPtr::offset))
                .with_size(size)
                .with_details(err.to_string()),
        );
    }
}

impl<L: ArenaLock> fmt::Debug for Arena<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("region_size", &self.state.region.len())
            .field("head", &self.state.head)
            .field("tail", &self.state.tail)
            .field("live_blocks", &self.state.live_blocks)
            .field("allocated_size", &self.state.allocated_size)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

//! Structured arena lifecycle records.
//!
//! Each public operation appends one record describing the path it took
//! (`leading_gap`, `grow_in_place`, ...) or why it failed. Records are kept
//! in a bounded ring; the oldest are dropped first.

use std::collections::VecDeque;

use serde::Serialize;

/// Maximum number of records retained per arena.
pub const LIFECYCLE_LOG_CAPACITY: usize = 4096;

/// Lifecycle log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArenaLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArenaLogRecord {
    /// Monotonic event id, starting at 1.
    pub decision_id: u64,
    /// Correlation id: `core::arena::<symbol>::<decision_id as hex>`.
    pub trace_id: String,
    pub level: ArenaLogLevel,
    /// API symbol (`allocate`, `resize`, `release`, `stats`, ...).
    pub symbol: &'static str,
    /// Event kind (`alloc`, `shrink`, `relocate`, `double_release`, ...).
    pub event: &'static str,
    /// Data offset involved in the event.
    pub ptr: Option<usize>,
    /// Size involved in the event.
    pub size: Option<usize>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Free-form `key=value` details.
    pub details: String,
    /// Snapshot: live blocks after the event.
    pub live_blocks: usize,
    /// Snapshot: bytes held by live blocks, headers included.
    pub allocated_size: usize,
}

/// Fields describing one event; the log fills in ids and snapshots.
pub(crate) struct LogEvent {
    pub(crate) level: ArenaLogLevel,
    pub(crate) symbol: &'static str,
    pub(crate) event: &'static str,
    pub(crate) ptr: Option<usize>,
    pub(crate) size: Option<usize>,
    pub(crate) outcome: &'static str,
    pub(crate) details: String,
}

impl LogEvent {
    pub(crate) fn new(
        level: ArenaLogLevel,
        symbol: &'static str,
        event: &'static str,
        outcome: &'static str,
    ) -> Self {
        Self {
            level,
            symbol,
            event,
            ptr: None,
            size: None,
            outcome,
            details: String::new(),
        }
    }

    pub(crate) fn with_ptr(mut self, ptr: Option<usize>) -> Self {
        self.ptr = ptr;
        self
    }

    pub(crate) fn with_size(mut self, size: Option<usize>) -> Self {
        self.size = size;
        self
    }

    pub(crate) fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

pub(crate) struct LifecycleLog {
    enabled: bool,
    next_decision_id: u64,
    records: VecDeque<ArenaLogRecord>,
    dropped: u64,
}

impl LifecycleLog {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            next_decision_id: 1,
            records: VecDeque::new(),
            dropped: 0,
        }
    }

    pub(crate) fn record(&mut self, event: LogEvent, live_blocks: usize, allocated_size: usize) {
        if !self.enabled {
            return;
        }
        let decision_id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        if self.records.len() == LIFECYCLE_LOG_CAPACITY {
            self.records.pop_front();
            self.dropped += 1;
        }
        self.records.push_back(ArenaLogRecord {
            decision_id,
            trace_id: format!("core::arena::{}::{:016x}", event.symbol, decision_id),
            level: event.level,
            symbol: event.symbol,
            event: event.event,
            ptr: event.ptr,
            size: event.size,
            outcome: event.outcome,
            details: event.details,
            live_blocks,
            allocated_size,
        });
    }

    pub(crate) fn snapshot(&self) -> Vec<ArenaLogRecord> {
        self.records.iter().cloned().collect()
    }

    pub(crate) fn drain(&mut self) -> Vec<ArenaLogRecord> {
        self.records.drain(..).collect()
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(symbol: &'static str) -> LogEvent {
        LogEvent::new(ArenaLogLevel::Trace, symbol, "alloc", "success")
            .with_ptr(Some(32))
            .with_size(Some(16))
            .with_details("path=empty_arena")
    }

    #[test]
    fn records_carry_ids_and_snapshots() {
        let mut log = LifecycleLog::new(true);
        log.record(event("allocate"), 1, 48);
        log.record(event("allocate"), 2, 96);

        let records = log.drain();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].decision_id, 1);
        assert_eq!(records[1].decision_id, 2);
        assert_eq!(records[1].trace_id, "core::arena::allocate::0000000000000002");
        assert_eq!(records[1].live_blocks, 2);
        assert_eq!(records[1].allocated_size, 96);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn disabled_log_keeps_nothing() {
        let mut log = LifecycleLog::new(false);
        log.record(event("release"), 0, 0);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn ring_drops_oldest() {
        let mut log = LifecycleLog::new(true);
        for _ in 0..(LIFECYCLE_LOG_CAPACITY + 3) {
            log.record(event("allocate"), 0, 0);
        }
        let records = log.snapshot();
        assert_eq!(records.len(), LIFECYCLE_LOG_CAPACITY);
        assert_eq!(records[0].decision_id, 4);
        assert_eq!(log.dropped(), 3);
    }

    #[test]
    fn records_serialize_as_json() {
        let mut log = LifecycleLog::new(true);
        log.record(event("allocate"), 1, 48);
        let record = &log.snapshot()[0];
        let json = serde_json::to_value(record).expect("serialize record");
        assert_eq!(json["level"], "trace");
        assert_eq!(json["symbol"], "allocate");
        assert_eq!(json["ptr"], 32);
    }
}

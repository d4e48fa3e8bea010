//! Verification harness for tinyarena.
//!
//! This crate provides:
//! - Fixtures: JSON scripts of arena operations with expected outcomes
//! - Runner: replays fixtures on fresh arenas, checking list invariants after every step
//! - Workload storms: seeded allocation churn reporting occupancy and fragmentation
//! - Structured logs: JSONL records of harness runs
//! - Reports: markdown and JSON summaries of fixture verification

#![forbid(unsafe_code)]

pub mod error;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;
pub mod workload;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet, FixtureStep};
pub use report::ArenaReport;
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
pub use workload::{StormConfig, StormKind, StormReport, run_storm};

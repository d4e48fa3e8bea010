//! Fixture replay engine.

use std::collections::BTreeMap;

use serde::Serialize;
use tinyarena_core::{
    Arena, ArenaConfig, ArenaError, ArenaLogRecord, ArenaStats, BlockInfo, BlockPtr, CheckLevel,
    MetricsSnapshot, WORD_SIZE,
};

use crate::fixtures::{Expect, FixtureCase, FixtureSet, FixtureStep};
use crate::verify::VerificationResult;

/// Final state of a replayed case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseRun {
    pub case_name: String,
    pub steps_run: usize,
    pub failure: Option<String>,
    pub stats: Option<ArenaStats>,
    pub blocks: Vec<BlockInfo>,
    pub metrics: MetricsSnapshot,
    pub lifecycle: Vec<ArenaLogRecord>,
}

/// Replays fixture sets under one check level.
pub struct TestRunner {
    /// Name of the verification campaign.
    pub campaign: String,
    pub check_level: CheckLevel,
    /// Keep arena lifecycle records in [`CaseRun::lifecycle`].
    pub lifecycle_log: bool,
}

impl TestRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>, check_level: CheckLevel) -> Self {
        Self {
            campaign: campaign.into(),
            check_level,
            lifecycle_log: false,
        }
    }

    #[must_use]
    pub fn with_lifecycle_log(mut self, enabled: bool) -> Self {
        self.lifecycle_log = enabled;
        self
    }

    /// Run every case of the set that applies to this runner's check level.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        let mode = self.check_level.as_str();
        fixture_set
            .cases
            .iter()
            .filter(|case| mode_matches(mode, &case.mode))
            .map(|case| {
                let case_name = if case.mode.eq_ignore_ascii_case("both") {
                    format!("{} [{mode}]", case.name)
                } else {
                    case.name.clone()
                };
                let mut result = VerificationResult {
                    case_name,
                    family: fixture_set.family.clone(),
                    mode: mode.to_string(),
                    passed: false,
                    skipped: false,
                    steps_run: 0,
                    failure: None,
                };
                if case.word_size.is_some_and(|size| size != WORD_SIZE) {
                    result.skipped = true;
                    return result;
                }
                let run = self.replay(case);
                result.passed = run.failure.is_none();
                result.steps_run = run.steps_run;
                result.failure = run.failure;
                result
            })
            .collect()
    }

    /// Replay one case on a fresh region, stopping at the first failed step.
    #[must_use]
    pub fn replay(&self, case: &FixtureCase) -> CaseRun {
        let mut region = vec![0u8; case.region_size];
        let config = ArenaConfig::default()
            .with_check_level(self.check_level)
            .with_lifecycle_log(self.lifecycle_log);
        let mut arena = Arena::with_config(&mut region, config);
        let mut slots = BTreeMap::new();

        let mut steps_run = 0;
        let mut failure = None;
        for (index, step) in case.steps.iter().enumerate() {
            steps_run = index + 1;
            let checked = run_step(&mut arena, &mut slots, step).and_then(|()| {
                arena
                    .verify()
                    .map_err(|err| format!("list invariant broken: {err}"))
            });
            if let Err(msg) = checked {
                failure = Some(format!("step {index} ({}): {msg}", step.op_name()));
                break;
            }
        }

        CaseRun {
            case_name: case.name.clone(),
            steps_run,
            failure,
            stats: arena.stats().ok(),
            blocks: arena.blocks().unwrap_or_default(),
            metrics: arena.metrics(),
            lifecycle: arena.drain_lifecycle_logs(),
        }
    }
}

fn mode_matches(active_mode: &str, case_mode: &str) -> bool {
    let case = case_mode.to_ascii_lowercase();
    case == active_mode || case == "both"
}

fn lookup(slots: &BTreeMap<String, BlockPtr>, slot: &str) -> Result<BlockPtr, String> {
    slots
        .get(slot)
        .copied()
        .ok_or_else(|| format!("slot `{slot}` was never bound"))
}

fn run_step(
    arena: &mut Arena<'_>,
    slots: &mut BTreeMap<String, BlockPtr>,
    step: &FixtureStep,
) -> Result<(), String> {
    match step {
        FixtureStep::Allocate { slot, size, expect } => {
            if let Some(ptr) = check_handle(arena.allocate(*size), *expect, None)? {
                slots.insert(slot.clone(), ptr);
            }
        }
        FixtureStep::AllocateZeroed {
            slot,
            count,
            size,
            expect,
        } => {
            if let Some(ptr) = check_handle(arena.allocate_zeroed(*count, *size), *expect, None)? {
                slots.insert(slot.clone(), ptr);
            }
        }
        FixtureStep::Resize { slot, size, expect } => {
            let previous = slots.get(slot).copied();
            if let Some(ptr) = check_handle(arena.resize(previous, *size), *expect, previous)? {
                slots.insert(slot.clone(), ptr);
            }
        }
        FixtureStep::Release { slot, expect } => {
            let ptr = slot.as_deref().map(|slot| lookup(slots, slot)).transpose()?;
            check_unit(arena.release(ptr), *expect)?;
        }
        FixtureStep::Fill { slot, byte } => {
            let ptr = lookup(slots, slot)?;
            arena.data_mut(ptr).map_err(|err| err.to_string())?.fill(*byte);
        }
        FixtureStep::CheckData { slot, byte, len } => {
            let ptr = lookup(slots, slot)?;
            let data = arena.data(ptr).map_err(|err| err.to_string())?;
            let Some(prefix) = data.get(..*len) else {
                return Err(format!("block holds {} bytes, wanted {len}", data.len()));
            };
            if let Some(pos) = prefix.iter().position(|b| b != byte) {
                return Err(format!(
                    "byte {pos} is {:#04x}, expected {byte:#04x}",
                    prefix[pos]
                ));
            }
        }
        FixtureStep::CheckOffset {
            slot,
            header_offset,
        } => {
            let ptr = lookup(slots, slot)?;
            if ptr.header_offset() != Some(*header_offset) {
                return Err(format!(
                    "header of `{slot}` is at {:?}, expected {header_offset}",
                    ptr.header_offset()
                ));
            }
        }
        FixtureStep::Stats { expect } => {
            let stats = arena.stats().map_err(|err| err.to_string())?;
            let mismatches = expect.mismatches(&stats);
            if !mismatches.is_empty() {
                return Err(mismatches.join("; "));
            }
        }
    }
    Ok(())
}

/// Compare a handle-returning call against its expectation. Returns the
/// handle to bind on success, `None` for an expected failure.
fn check_handle(
    outcome: Result<BlockPtr, ArenaError>,
    expect: Expect,
    previous: Option<BlockPtr>,
) -> Result<Option<BlockPtr>, String> {
    match (outcome, expect) {
        (Ok(ptr), Expect::Ok) => Ok(Some(ptr)),
        (Ok(ptr), Expect::SameAddress) if previous == Some(ptr) => Ok(Some(ptr)),
        (Ok(ptr), Expect::NewAddress) if previous.is_some_and(|old| old != ptr) => Ok(Some(ptr)),
        (Ok(ptr), expect) => Err(format!("expected {}, got handle {ptr}", expect.as_str())),
        (Err(err), expect) if expect.matches_error(&err) => Ok(None),
        (Err(err), expect) => Err(format!("expected {}, got error: {err}", expect.as_str())),
    }
}

fn check_unit(outcome: Result<(), ArenaError>, expect: Expect) -> Result<(), String> {
    match (outcome, expect) {
        (Ok(()), Expect::Ok) => Ok(()),
        (Ok(()), expect) => Err(format!("expected {}, got ok", expect.as_str())),
        (Err(err), expect) if expect.matches_error(&err) => Ok(()),
        (Err(err), expect) => Err(format!("expected {}, got error: {err}", expect.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(json: &str) -> FixtureSet {
        FixtureSet::from_json(json).expect("valid fixture json")
    }

    #[test]
    fn strict_runner_executes_matching_cases() {
        let set = fixture(
            r#"{
                "version":"v1",
                "family":"arena/release",
                "cases":[
                    {"name":"strict_double","region_size":512,"mode":"strict","steps":[
                        {"op":"allocate","slot":"a","size":8},
                        {"op":"release","slot":"a"},
                        {"op":"release","slot":"a","expect":"not_live"}
                    ]},
                    {"name":"off_only","region_size":512,"mode":"off","steps":[
                        {"op":"allocate","slot":"a","size":8}
                    ]}
                ]
            }"#,
        );

        let strict = TestRunner::new("smoke", CheckLevel::Strict).run(&set);
        assert_eq!(strict.len(), 1);
        assert!(strict[0].passed, "{:?}", strict[0].failure);
        assert_eq!(strict[0].steps_run, 3);
        assert_eq!(strict[0].case_name, "strict_double");
    }

    #[test]
    fn both_mode_case_runs_under_each_level() {
        let set = fixture(
            r#"{
                "version":"v1",
                "family":"arena/basic",
                "cases":[
                    {"name":"alloc","region_size":256,"steps":[
                        {"op":"allocate","slot":"a","size":10},
                        {"op":"stats","expect":{"allocated_blocks":1}}
                    ]}
                ]
            }"#,
        );
        let strict = TestRunner::new("both", CheckLevel::Strict).run(&set);
        let off = TestRunner::new("both", CheckLevel::Off).run(&set);
        assert_eq!(strict[0].case_name, "alloc [strict]");
        assert_eq!(off[0].case_name, "alloc [off]");
        assert!(strict[0].passed && off[0].passed);
    }

    #[test]
    fn failing_step_is_reported_with_index() {
        let set = fixture(
            r#"{
                "version":"v1",
                "family":"arena/basic",
                "cases":[
                    {"name":"wrong","region_size":128,"steps":[
                        {"op":"allocate","slot":"a","size":8},
                        {"op":"allocate","slot":"b","size":4096}
                    ]}
                ]
            }"#,
        );
        let results = TestRunner::new("neg", CheckLevel::Strict).run(&set);
        assert!(!results[0].passed);
        let failure = results[0].failure.as_deref().expect("failure");
        assert!(failure.starts_with("step 1 (allocate): expected ok, got error: out of memory"));
    }

    #[test]
    fn foreign_word_size_is_skipped() {
        let set = fixture(&format!(
            r#"{{
                "version":"v1",
                "family":"arena/geometry",
                "cases":[
                    {{"name":"other","region_size":128,"word_size":{},"steps":[]}}
                ]
            }}"#,
            WORD_SIZE * 2
        ));
        let results = TestRunner::new("geom", CheckLevel::Strict).run(&set);
        assert!(results[0].skipped);
    }

    #[test]
    fn replay_keeps_lifecycle_when_asked() {
        let set = fixture(
            r#"{
                "version":"v1",
                "family":"arena/basic",
                "cases":[
                    {"name":"grow","region_size":512,"steps":[
                        {"op":"allocate","slot":"a","size":8},
                        {"op":"resize","slot":"a","size":64,"expect":"same_address"},
                        {"op":"resize","slot":"fresh","size":8}
                    ]}
                ]
            }"#,
        );
        let run = TestRunner::new("replay", CheckLevel::Strict)
            .with_lifecycle_log(true)
            .replay(&set.cases[0]);
        assert_eq!(run.failure, None);
        assert_eq!(run.blocks.len(), 2);
        assert_eq!(run.metrics.in_place_grows, 1);
        let events: Vec<_> = run.lifecycle.iter().map(|r| r.event).collect();
        assert!(events.contains(&"grow_in_place"));
        assert!(events.contains(&"resize_none_as_alloc"));
    }
}

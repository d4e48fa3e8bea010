//! Seeded allocation storms.
//!
//! Each storm drives one arena through a deterministic operation pattern
//! and samples occupancy after every step. The report is stable for a given
//! configuration, so storms double as regression fixtures.

use serde::Serialize;
use tinyarena_core::{
    Arena, ArenaConfig, ArenaError, ArenaStats, BlockPtr, CheckLevel, MetricsSnapshot,
};

/// xorshift64* generator; deterministic across platforms.
#[derive(Clone, Copy, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        // A zero state would stay zero forever.
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    pub fn gen_range(&mut self, low: usize, high_inclusive: usize) -> usize {
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StormKind {
    /// Ascending sizes until every slot is full, then release in order.
    Sawtooth,
    /// Descending sizes, released newest first.
    InverseSawtooth,
    /// Random allocate/release on random slots.
    RandomChurn,
    /// Alternating tiny and maximal blocks with every slot recycled in turn.
    SizeThrash,
    /// Maximal blocks until the region is full, then random releases.
    Exhaustion,
    /// Random resizes of live blocks, mixed with occasional releases.
    ResizeChurn,
}

impl StormKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sawtooth => "sawtooth",
            Self::InverseSawtooth => "inverse_sawtooth",
            Self::RandomChurn => "random_churn",
            Self::SizeThrash => "size_thrash",
            Self::Exhaustion => "exhaustion",
            Self::ResizeChurn => "resize_churn",
        }
    }

    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Sawtooth,
            Self::InverseSawtooth,
            Self::RandomChurn,
            Self::SizeThrash,
            Self::Exhaustion,
            Self::ResizeChurn,
        ]
    }

    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all().into_iter().find(|kind| kind.as_str() == wanted)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StormConfig {
    pub kind: StormKind,
    pub seed: u64,
    pub region_size: usize,
    pub ops: usize,
    /// Handles tracked at once.
    pub slots: usize,
    /// Largest request size.
    pub max_size: usize,
    pub check_level: CheckLevel,
}

impl StormConfig {
    #[must_use]
    pub fn new(kind: StormKind, seed: u64) -> Self {
        Self {
            kind,
            seed,
            region_size: 64 * 1024,
            ops: 10_000,
            slots: 256,
            max_size: 512,
            check_level: CheckLevel::Strict,
        }
    }
}

/// Outcome of one storm.
#[derive(Debug, Clone, Serialize)]
pub struct StormReport {
    pub storm: &'static str,
    pub seed: u64,
    pub ops: usize,
    pub region_size: usize,
    pub allocations: u64,
    pub allocation_failures: u64,
    pub releases: u64,
    pub resizes: u64,
    pub peak_live_blocks: usize,
    pub peak_used_size: usize,
    pub max_fragmentation_bytes: usize,
    /// Mean of `fragmentation_bytes / used_size` over all samples.
    pub mean_fragmentation_ratio: f64,
    pub final_stats: ArenaStats,
    pub metrics: MetricsSnapshot,
    pub integrity_check_passed: bool,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Allocate { slot: usize, size: usize },
    Release { slot: usize },
    Resize { slot: usize, size: usize },
}

#[derive(Debug, Default)]
struct Tally {
    allocations: u64,
    allocation_failures: u64,
    releases: u64,
    resizes: u64,
    peak_live_blocks: usize,
    peak_used_size: usize,
    max_fragmentation_bytes: usize,
    ratio_sum: f64,
    samples: usize,
    exhausted: bool,
}

impl Tally {
    fn sample(&mut self, stats: &ArenaStats) {
        self.peak_live_blocks = self.peak_live_blocks.max(stats.allocated_blocks);
        self.peak_used_size = self.peak_used_size.max(stats.used_size);
        self.max_fragmentation_bytes = self.max_fragmentation_bytes.max(stats.fragmentation_bytes);
        if stats.used_size > 0 {
            self.ratio_sum += stats.fragmentation_bytes as f64 / stats.used_size as f64;
        }
        self.samples += 1;
    }
}

fn plan(
    kind: StormKind,
    step: usize,
    rng: &mut XorShift64,
    slots: &[Option<BlockPtr>],
    max_size: usize,
    exhausted: bool,
) -> Action {
    let n = slots.len();
    match kind {
        StormKind::Sawtooth => {
            let phase = step % (2 * n);
            if phase < n {
                Action::Allocate {
                    slot: phase,
                    size: 1 + phase * max_size / n,
                }
            } else {
                Action::Release { slot: phase - n }
            }
        }
        StormKind::InverseSawtooth => {
            let phase = step % (2 * n);
            if phase < n {
                Action::Allocate {
                    slot: phase,
                    size: max_size - phase * max_size / n,
                }
            } else {
                Action::Release {
                    slot: 2 * n - 1 - phase,
                }
            }
        }
        StormKind::RandomChurn => {
            let slot = rng.gen_range(0, n - 1);
            if slots[slot].is_some() {
                Action::Release { slot }
            } else {
                Action::Allocate {
                    slot,
                    size: rng.gen_range(0, max_size),
                }
            }
        }
        StormKind::SizeThrash => {
            let slot = step % n;
            if slots[slot].is_some() {
                Action::Release { slot }
            } else if step % 2 == 0 {
                Action::Allocate {
                    slot,
                    size: rng.gen_range(0, 16),
                }
            } else {
                Action::Allocate {
                    slot,
                    size: max_size,
                }
            }
        }
        StormKind::Exhaustion => match slots.iter().position(Option::is_none) {
            Some(slot) if !exhausted => Action::Allocate {
                slot,
                size: rng.gen_range(max_size / 2, max_size),
            },
            _ => Action::Release {
                slot: rng.gen_range(0, n - 1),
            },
        },
        StormKind::ResizeChurn => {
            let slot = rng.gen_range(0, n - 1);
            if slots[slot].is_some() && rng.next_u64() % 8 == 0 {
                Action::Release { slot }
            } else {
                Action::Resize {
                    slot,
                    size: rng.gen_range(0, max_size),
                }
            }
        }
    }
}

fn apply(
    arena: &mut Arena<'_>,
    slots: &mut [Option<BlockPtr>],
    action: Action,
    tally: &mut Tally,
) -> Result<(), ArenaError> {
    match action {
        Action::Allocate { slot, size } => {
            if let Some(old) = slots[slot].take() {
                arena.release(Some(old))?;
                tally.releases += 1;
            }
            match arena.allocate(size) {
                Ok(ptr) => {
                    slots[slot] = Some(ptr);
                    tally.allocations += 1;
                    tally.exhausted = false;
                }
                Err(ArenaError::OutOfMemory { .. }) => {
                    tally.allocation_failures += 1;
                    tally.exhausted = true;
                }
                Err(err) => return Err(err),
            }
        }
        Action::Release { slot } => {
            let ptr = slots[slot].take();
            arena.release(ptr)?;
            if ptr.is_some() {
                tally.releases += 1;
                tally.exhausted = false;
            }
        }
        Action::Resize { slot, size } => match arena.resize(slots[slot], size) {
            Ok(ptr) => {
                slots[slot] = Some(ptr);
                tally.resizes += 1;
            }
            Err(ArenaError::OutOfMemory { .. }) => {
                tally.allocation_failures += 1;
                tally.exhausted = true;
            }
            Err(err) => return Err(err),
        },
    }
    Ok(())
}

/// Run one storm on a fresh, zeroed region.
///
/// Allocation failures are part of every storm and are only counted. Any
/// other arena error aborts the storm.
pub fn run_storm(config: &StormConfig) -> Result<StormReport, ArenaError> {
    let mut region = vec![0u8; config.region_size];
    let arena_config = ArenaConfig::default()
        .with_check_level(config.check_level)
        .with_lifecycle_log(false);
    let mut arena = Arena::with_config(&mut region, arena_config);
    let mut rng = XorShift64::new(config.seed);
    let mut slots: Vec<Option<BlockPtr>> = vec![None; config.slots.max(1)];
    let mut tally = Tally::default();

    for step in 0..config.ops {
        let action = plan(
            config.kind,
            step,
            &mut rng,
            &slots,
            config.max_size,
            tally.exhausted,
        );
        apply(&mut arena, &mut slots, action, &mut tally)?;
        tally.sample(&arena.stats()?);
    }

    let integrity_check_passed = arena.verify().is_ok();
    let final_stats = arena.stats()?;
    Ok(StormReport {
        storm: config.kind.as_str(),
        seed: config.seed,
        ops: config.ops,
        region_size: config.region_size,
        allocations: tally.allocations,
        allocation_failures: tally.allocation_failures,
        releases: tally.releases,
        resizes: tally.resizes,
        peak_live_blocks: tally.peak_live_blocks,
        peak_used_size: tally.peak_used_size,
        max_fragmentation_bytes: tally.max_fragmentation_bytes,
        mean_fragmentation_ratio: if tally.samples == 0 {
            0.0
        } else {
            tally.ratio_sum / tally.samples as f64
        },
        final_stats,
        metrics: arena.metrics(),
        integrity_check_passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(kind: StormKind) -> StormConfig {
        StormConfig {
            region_size: 8 * 1024,
            ops: 600,
            slots: 32,
            max_size: 256,
            ..StormConfig::new(kind, 0xDEAD_BEEF)
        }
    }

    #[test]
    fn every_storm_keeps_the_list_intact() {
        for kind in StormKind::all() {
            let report = run_storm(&small(kind)).expect("storm completes");
            assert!(report.integrity_check_passed, "{}", kind.as_str());
            assert_eq!(report.storm, kind.as_str());
            assert!(report.final_stats.used_size <= report.region_size);
            assert_eq!(report.metrics.allocation_failures, report.allocation_failures);
            assert!(report.metrics.releases >= report.releases);
        }
    }

    #[test]
    fn storms_are_deterministic() {
        let first = run_storm(&small(StormKind::RandomChurn)).expect("first");
        let second = run_storm(&small(StormKind::RandomChurn)).expect("second");
        assert_eq!(first.final_stats, second.final_stats);
        assert_eq!(first.allocations, second.allocations);
        assert_eq!(first.max_fragmentation_bytes, second.max_fragmentation_bytes);
    }

    #[test]
    fn exhaustion_hits_the_wall() {
        let config = StormConfig {
            slots: 64,
            ..small(StormKind::Exhaustion)
        };
        let report = run_storm(&config).expect("storm");
        assert!(report.allocation_failures > 0);
        assert!(report.releases > 0);
    }

    #[test]
    fn storm_names_parse_loosely() {
        assert_eq!(
            StormKind::from_str_loose("Inverse-Sawtooth"),
            Some(StormKind::InverseSawtooth)
        );
        assert_eq!(StormKind::from_str_loose("nope"), None);
    }
}

//! Fixture loading and management.
//!
//! A fixture case is a script of arena operations run against a fresh
//! region. Handles are bound to named slots; a released slot keeps its
//! (now stale) handle so later steps can probe it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tinyarena_core::{ArenaError, ArenaStats};

use crate::error::HarnessError;

/// Expected result of a handle-producing or releasing step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    #[default]
    Ok,
    /// Success, returning the slot's previous handle.
    SameAddress,
    /// Success, returning a handle different from the slot's previous one.
    NewAddress,
    OutOfMemory,
    SizeOverflow,
    InvalidPointer,
    NotLive,
    Corruption,
}

impl Expect {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::SameAddress => "same_address",
            Self::NewAddress => "new_address",
            Self::OutOfMemory => "out_of_memory",
            Self::SizeOverflow => "size_overflow",
            Self::InvalidPointer => "invalid_pointer",
            Self::NotLive => "not_live",
            Self::Corruption => "corruption",
        }
    }

    /// True if `err` is the failure this expectation names.
    #[must_use]
    pub const fn matches_error(self, err: &ArenaError) -> bool {
        matches!(
            (self, err),
            (Self::OutOfMemory, ArenaError::OutOfMemory { .. })
                | (Self::SizeOverflow, ArenaError::SizeOverflow { .. })
                | (Self::InvalidPointer, ArenaError::InvalidPointer { .. })
                | (Self::NotLive, ArenaError::NotLive { .. })
                | (Self::Corruption, ArenaError::Corruption { .. })
        )
    }
}

/// Partial expectation on [`ArenaStats`]; absent fields are not checked.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsExpect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragmentation_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_blocks: Option<usize>,
}

impl StatsExpect {
    /// Human-readable mismatches between this expectation and `stats`.
    #[must_use]
    pub fn mismatches(&self, stats: &ArenaStats) -> Vec<String> {
        [
            ("total_size", self.total_size, stats.total_size),
            ("used_size", self.used_size, stats.used_size),
            ("allocated_size", self.allocated_size, stats.allocated_size),
            (
                "fragmentation_bytes",
                self.fragmentation_bytes,
                stats.fragmentation_bytes,
            ),
            ("allocated_blocks", self.allocated_blocks, stats.allocated_blocks),
        ]
        .into_iter()
        .filter_map(|(field, expected, actual)| {
            expected
                .filter(|&expected| expected != actual)
                .map(|expected| format!("{field}: expected {expected}, got {actual}"))
        })
        .collect()
    }
}

/// One scripted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FixtureStep {
    Allocate {
        slot: String,
        size: usize,
        #[serde(default)]
        expect: Expect,
    },
    AllocateZeroed {
        slot: String,
        count: usize,
        size: usize,
        #[serde(default)]
        expect: Expect,
    },
    /// Resize the slot's handle; an unbound slot resizes a null handle.
    Resize {
        slot: String,
        size: usize,
        #[serde(default)]
        expect: Expect,
    },
    /// Release the slot's handle; no slot releases a null handle.
    Release {
        #[serde(default)]
        slot: Option<String>,
        #[serde(default)]
        expect: Expect,
    },
    /// Overwrite the slot's whole data area with `byte`.
    Fill { slot: String, byte: u8 },
    /// Check that the first `len` data bytes equal `byte`.
    CheckData { slot: String, byte: u8, len: usize },
    /// Check where the slot's header sits in the region.
    CheckOffset { slot: String, header_offset: usize },
    Stats { expect: StatsExpect },
}

impl FixtureStep {
    #[must_use]
    pub const fn op_name(&self) -> &'static str {
        match self {
            Self::Allocate { .. } => "allocate",
            Self::AllocateZeroed { .. } => "allocate_zeroed",
            Self::Resize { .. } => "resize",
            Self::Release { .. } => "release",
            Self::Fill { .. } => "fill",
            Self::CheckData { .. } => "check_data",
            Self::CheckOffset { .. } => "check_offset",
            Self::Stats { .. } => "stats",
        }
    }
}

/// A single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Size of the fresh region the case runs in.
    pub region_size: usize,
    /// Word size the expected offsets assume; cases written for another
    /// target are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_size: Option<usize>,
    /// Check level the case applies to: `strict`, `off` or `both`.
    #[serde(default = "default_mode")]
    pub mode: String,
    pub steps: Vec<FixtureStep>,
}

fn default_mode() -> String {
    String::from("both")
}

/// A collection of fixture cases for one behavior family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Behavior family name.
    pub family: String,
    #[serde(default)]
    pub description: String,
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Load every `*.json` set in `dir`, sorted by file name. A path to a
    /// single file loads just that set.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>, HarnessError> {
        if dir.is_file() {
            return Ok(vec![Self::from_file(dir)?]);
        }
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(HarnessError::NoFixtures(dir.display().to_string()));
        }
        paths.iter().map(|path| Self::from_file(path)).collect()
    }

    #[must_use]
    pub fn case(&self, name: &str) -> Option<&FixtureCase> {
        self.cases.iter().find(|case| case.name == name)
    }
}

//! Arena error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// What kind of structural damage a corrupted header showed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionKind {
    /// Stored canary does not match the header fields.
    CanaryMismatch,
    /// A header or block extends past the region.
    OutOfBounds,
    /// Headers are not in strictly increasing address order.
    Misordered,
    /// `next`/`prev` links disagree between neighbors.
    LinkMismatch,
    /// A block's bytes run into the next header.
    Overlap,
    /// The list does not end at the recorded tail.
    TailMismatch,
}

impl CorruptionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CanaryMismatch => "canary_mismatch",
            Self::OutOfBounds => "out_of_bounds",
            Self::Misordered => "misordered",
            Self::LinkMismatch => "link_mismatch",
            Self::Overlap => "overlap",
            Self::TailMismatch => "tail_mismatch",
        }
    }
}

impl fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an arena operation.
///
/// Every failing operation leaves the arena exactly as it found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("out of memory: {requested} bytes requested, no free gap of {footprint} bytes")]
    OutOfMemory { requested: usize, footprint: usize },
    #[error("size overflow: {count} x {size} bytes")]
    SizeOverflow { count: usize, size: usize },
    #[error("pointer {ptr:#x} does not address a block inside the region")]
    InvalidPointer { ptr: usize },
    #[error("pointer {ptr:#x} is not a live block")]
    NotLive { ptr: usize },
    #[error("heap corruption at offset {offset:#x}: {kind}")]
    Corruption { offset: usize, kind: CorruptionKind },
}

impl ArenaError {
    pub(crate) const fn corruption(offset: usize, kind: CorruptionKind) -> Self {
        Self::Corruption { offset, kind }
    }

    /// True for the heap-corruption failure class.
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }

    /// Machine-readable label used in lifecycle records.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OutOfMemory { .. } => "oom",
            Self::SizeOverflow { .. } => "size_overflow",
            Self::InvalidPointer { .. } => "invalid_pointer",
            Self::NotLive { .. } => "not_live",
            Self::Corruption { .. } => "corruption",
        }
    }
}

//! Read-only walks over the block list: statistics, block listings and
//! structural verification.

use serde::{Deserialize, Serialize};

use crate::align::HEADER_LEN;
use crate::engine::{ArenaState, data_ptr};
use crate::error::{ArenaError, CorruptionKind};
use crate::header::BlockPtr;

/// Occupancy summary of one arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaStats {
    /// Capacity of the region in bytes.
    pub total_size: usize,
    /// Offset one past the last byte of the last live block (0 when empty).
    pub used_size: usize,
    /// Σ (data size + header) over live blocks.
    pub allocated_size: usize,
    /// Free bytes strictly between two live blocks. Space before the first
    /// block or after the last one is not fragmentation.
    pub fragmentation_bytes: usize,
    /// Number of live blocks.
    pub allocated_blocks: usize,
}

impl ArenaStats {
    /// Bytes not held by any live block, trailing space included.
    #[must_use]
    pub const fn free_size(&self) -> usize {
        self.total_size.saturating_sub(self.allocated_size)
    }
}

/// Placement of one live block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Region offset of the header.
    pub header_offset: usize,
    pub ptr: BlockPtr,
    /// Padded data size.
    pub size: usize,
    /// Free bytes up to the next header, or to the region end for the
    /// last block.
    pub gap_after: usize,
}

impl BlockInfo {
    /// One past the last data byte.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.header_offset + HEADER_LEN + self.size
    }
}

impl ArenaState<'_> {
    /// Visit every live block in address order, checking the list shape on
    /// the way: ascending offsets, reciprocal links, no overlap, in-bounds
    /// blocks, and a last block that matches the recorded tail.
    pub(crate) fn walk(
        &self,
        validate_canary: bool,
        mut visit: impl FnMut(BlockInfo),
    ) -> Result<(), ArenaError> {
        let mut previous: Option<usize> = None;
        let mut cursor = self.head;
        while let Some(offset) = cursor {
            let header = self.load_with(offset, validate_canary)?;
            if header.prev() != previous {
                return Err(ArenaError::corruption(offset, CorruptionKind::LinkMismatch));
            }
            let (end, limit) = self.extent(offset, header)?;
            visit(BlockInfo {
                header_offset: offset,
                ptr: data_ptr(offset)?,
                size: header.size(),
                gap_after: limit - end,
            });
            previous = Some(offset);
            cursor = header.next();
        }

        if previous != self.tail {
            let offset = previous.or(self.tail).unwrap_or_default();
            return Err(ArenaError::corruption(offset, CorruptionKind::TailMismatch));
        }
        Ok(())
    }

    pub(crate) fn collect_stats(&self) -> Result<ArenaStats, ArenaError> {
        let mut stats = ArenaStats {
            total_size: self.region.len(),
            ..ArenaStats::default()
        };
        let mut pending_gap = 0;
        self.walk(self.check_level.validates_canaries(), |block| {
            stats.fragmentation_bytes += pending_gap;
            pending_gap = block.gap_after;
            stats.allocated_blocks += 1;
            stats.allocated_size += block.size + HEADER_LEN;
            stats.used_size = block.end();
        })?;
        Ok(stats)
    }

    pub(crate) fn collect_blocks(&self) -> Result<Vec<BlockInfo>, ArenaError> {
        let mut blocks = Vec::with_capacity(self.live_blocks);
        self.walk(self.check_level.validates_canaries(), |block| {
            blocks.push(block);
        })?;
        Ok(blocks)
    }

    /// Full structural check; canaries are validated regardless of the
    /// configured check level.
    pub(crate) fn verify(&self) -> Result<(), ArenaError> {
        self.walk(true, |_| {})
    }
}

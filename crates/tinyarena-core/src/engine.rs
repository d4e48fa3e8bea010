//! Allocation engine: first-fit placement, resize policy and unlinking.
//!
//! The engine owns the block list threaded through the region and performs
//! every structural change. It never logs or counts; [`Arena`](crate::Arena)
//! wraps each call with locking, metrics and lifecycle records.
//!
//! Every mutating path loads and validates all headers it needs before it
//! writes anything, so a failed operation leaves the region untouched.

use crate::align::{HEADER_LEN, footprint, is_word_aligned, padded_size};
use crate::config::CheckLevel;
use crate::error::{ArenaError, CorruptionKind};
use crate::header::{BlockHeader, BlockPtr};
use crate::region::Region;

/// Which free gap a new block was carved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementSite {
    /// The list was empty; the block starts the region.
    EmptyArena,
    /// Space before the first live block.
    LeadingGap,
    /// Space between two live blocks.
    InteriorGap,
    /// Space after the last live block.
    TrailingGap,
}

impl PlacementSite {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyArena => "empty_arena",
            Self::LeadingGap => "leading_gap",
            Self::InteriorGap => "interior_gap",
            Self::TrailingGap => "trailing_gap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub(crate) ptr: BlockPtr,
    /// Padded data size of the new block.
    pub(crate) size: usize,
    pub(crate) site: PlacementSite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResizeOutcome {
    /// No source block: served as a plain allocation.
    Allocated(Placement),
    Shrunk {
        ptr: BlockPtr,
        old_size: usize,
        new_size: usize,
    },
    GrewInPlace {
        ptr: BlockPtr,
        old_size: usize,
        new_size: usize,
    },
    Relocated {
        from: BlockPtr,
        to: Placement,
        old_size: usize,
        copied: usize,
    },
}

impl ResizeOutcome {
    pub(crate) fn ptr(&self) -> BlockPtr {
        match *self {
            Self::Allocated(placement) => placement.ptr,
            Self::Shrunk { ptr, .. } | Self::GrewInPlace { ptr, .. } => ptr,
            Self::Relocated { to, .. } => to.ptr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Released {
    pub(crate) ptr: BlockPtr,
    pub(crate) size: usize,
}

/// A validated live block together with its validated neighbors.
struct LiveBlock {
    offset: usize,
    header: BlockHeader,
    prev: Option<(usize, BlockHeader)>,
    next: Option<(usize, BlockHeader)>,
}

enum GapSite {
    /// Before the first block (or the whole region when empty).
    Front,
    /// After the block at this offset.
    After(usize, BlockHeader),
}

/// Region plus the head/tail of its address-ordered header list.
pub(crate) struct ArenaState<'r> {
    pub(crate) region: Region<'r>,
    pub(crate) head: Option<usize>,
    pub(crate) tail: Option<usize>,
    pub(crate) check_level: CheckLevel,
    /// Number of headers in the list.
    pub(crate) live_blocks: usize,
    /// Σ (size + HEADER_LEN) over the list.
    pub(crate) allocated_size: usize,
}

impl<'r> ArenaState<'r> {
    pub(crate) fn new(bytes: &'r mut [u8], check_level: CheckLevel) -> Self {
        Self {
            region: Region::new(bytes),
            head: None,
            tail: None,
            check_level,
            live_blocks: 0,
            allocated_size: 0,
        }
    }

    /// Read the header at `offset`, validating its canary per the check level.
    pub(crate) fn load(&self, offset: usize) -> Result<BlockHeader, ArenaError> {
        self.load_with(offset, self.check_level.validates_canaries())
    }

    pub(crate) fn load_with(
        &self,
        offset: usize,
        validate_canary: bool,
    ) -> Result<BlockHeader, ArenaError> {
        let out_of_bounds = ArenaError::corruption(offset, CorruptionKind::OutOfBounds);
        if !is_word_aligned(offset) {
            return Err(out_of_bounds);
        }
        let header = self.region.read_header(offset).ok_or(out_of_bounds)?;
        if validate_canary && !header.is_intact() {
            return Err(ArenaError::corruption(
                offset,
                CorruptionKind::CanaryMismatch,
            ));
        }
        Ok(header)
    }

    fn store(&mut self, offset: usize, header: &BlockHeader) -> Result<(), ArenaError> {
        self.region
            .write_header(offset, header)
            .ok_or(ArenaError::corruption(offset, CorruptionKind::OutOfBounds))
    }

    /// One past the last data byte of the block at `offset`.
    pub(crate) fn block_end(&self, offset: usize, header: BlockHeader) -> Result<usize, ArenaError> {
        offset
            .checked_add(HEADER_LEN)
            .and_then(|data| data.checked_add(header.size()))
            .filter(|&end| end <= self.region.len())
            .ok_or(ArenaError::corruption(offset, CorruptionKind::OutOfBounds))
    }

    /// End of the block at `offset` and the start of whatever follows it
    /// (the next header, or the region end for the tail).
    pub(crate) fn extent(
        &self,
        offset: usize,
        header: BlockHeader,
    ) -> Result<(usize, usize), ArenaError> {
        let end = self.block_end(offset, header)?;
        let limit = match header.next() {
            Some(next) if next <= offset => {
                return Err(ArenaError::corruption(offset, CorruptionKind::Misordered));
            }
            Some(next) if next > self.region.len() => {
                return Err(ArenaError::corruption(offset, CorruptionKind::OutOfBounds));
            }
            Some(next) if next < end => {
                return Err(ArenaError::corruption(offset, CorruptionKind::Overlap));
            }
            Some(next) => next,
            None => self.region.len(),
        };
        Ok((end, limit))
    }

    /// Free bytes between the block at `offset` and what follows it.
    pub(crate) fn gap_after(&self, offset: usize, header: BlockHeader) -> Result<usize, ArenaError> {
        let (end, limit) = self.extent(offset, header)?;
        Ok(limit - end)
    }

    /// First gap in address order that can hold `needed` bytes.
    fn find_gap(&self, needed: usize) -> Result<Option<GapSite>, ArenaError> {
        let front = self.head.unwrap_or(self.region.len());
        if front >= needed {
            return Ok(Some(GapSite::Front));
        }

        let mut cursor = self.head;
        while let Some(offset) = cursor {
            let header = self.load(offset)?;
            let (end, limit) = self.extent(offset, header)?;
            if limit - end >= needed {
                return Ok(Some(GapSite::After(offset, header)));
            }
            cursor = header.next();
        }
        Ok(None)
    }

    pub(crate) fn allocate(&mut self, size: usize) -> Result<Placement, ArenaError> {
        let overflow = ArenaError::SizeOverflow { count: 1, size };
        let padded = padded_size(size).ok_or(overflow)?;
        let needed = footprint(padded).ok_or(overflow)?;

        let site = self
            .find_gap(needed)?
            .ok_or(ArenaError::OutOfMemory {
                requested: size,
                footprint: needed,
            })?;
        let placement = match site {
            GapSite::Front => self.link_front(padded)?,
            GapSite::After(offset, header) => self.link_after(offset, header, padded)?,
        };

        self.live_blocks += 1;
        self.allocated_size += needed;
        Ok(placement)
    }

    /// Allocate `count * size` bytes and zero the whole padded data area.
    pub(crate) fn allocate_zeroed(
        &mut self,
        count: usize,
        size: usize,
    ) -> Result<Placement, ArenaError> {
        let total = count
            .checked_mul(size)
            .ok_or(ArenaError::SizeOverflow { count, size })?;
        let placement = self.allocate(total)?;
        if let Some(bytes) = self.region.bytes_mut(placement.ptr.offset(), placement.size) {
            bytes.fill(0);
        }
        Ok(placement)
    }

    /// New header at offset 0, in front of the current head.
    fn link_front(&mut self, padded: usize) -> Result<Placement, ArenaError> {
        const FRONT: usize = 0;
        let old_head = match self.head {
            Some(offset) => Some((offset, self.load(offset)?)),
            None => None,
        };

        let site = match old_head {
            Some((offset, mut header)) => {
                header.set_prev(Some(FRONT));
                self.store(offset, &header)?;
                PlacementSite::LeadingGap
            }
            None => {
                self.tail = Some(FRONT);
                PlacementSite::EmptyArena
            }
        };
        self.store(FRONT, &BlockHeader::new(padded, None, self.head))?;
        self.head = Some(FRONT);

        Ok(Placement {
            ptr: data_ptr(FRONT)?,
            size: padded,
            site,
        })
    }

    /// New header right after the block at `offset`.
    fn link_after(
        &mut self,
        offset: usize,
        mut header: BlockHeader,
        padded: usize,
    ) -> Result<Placement, ArenaError> {
        let new_offset = self.block_end(offset, header)?;
        let successor = match header.next() {
            Some(next) => Some((next, self.load(next)?)),
            None => None,
        };

        let site = match successor {
            Some((next_offset, mut next)) => {
                next.set_prev(Some(new_offset));
                self.store(next_offset, &next)?;
                PlacementSite::InteriorGap
            }
            None => {
                self.tail = Some(new_offset);
                PlacementSite::TrailingGap
            }
        };
        header.set_next(Some(new_offset));
        self.store(offset, &header)?;
        self.store(
            new_offset,
            &BlockHeader::new(padded, Some(offset), successor.map(|(next, _)| next)),
        )?;

        Ok(Placement {
            ptr: data_ptr(new_offset)?,
            size: padded,
            site,
        })
    }

    /// Resolve `ptr` to its header and prove it is linked into the list.
    ///
    /// A header is live only if its neighbors (or head/tail) point back at
    /// it. Released headers keep their stale links, so a second release of
    /// the same pointer fails here instead of relinking the list.
    fn locate(&self, ptr: BlockPtr) -> Result<LiveBlock, ArenaError> {
        let invalid = ArenaError::InvalidPointer { ptr: ptr.offset() };
        let not_live = ArenaError::NotLive { ptr: ptr.offset() };

        let offset = ptr
            .header_offset()
            .filter(|&offset| is_word_aligned(offset))
            .ok_or(invalid)?;
        let header = self.region.read_header(offset).ok_or(invalid)?;
        if self.check_level.validates_canaries() && !header.is_intact() {
            return Err(ArenaError::corruption(
                offset,
                CorruptionKind::CanaryMismatch,
            ));
        }
        self.block_end(offset, header)?;

        let prev = match header.prev() {
            None if self.head == Some(offset) => None,
            Some(prev) if prev < offset => {
                let prev_header = self.load(prev)?;
                if prev_header.next() != Some(offset) {
                    return Err(not_live);
                }
                Some((prev, prev_header))
            }
            _ => return Err(not_live),
        };
        let next = match header.next() {
            None if self.tail == Some(offset) => None,
            Some(next) if next > offset => {
                let next_header = self.load(next)?;
                if next_header.prev() != Some(offset) {
                    return Err(not_live);
                }
                Some((next, next_header))
            }
            _ => return Err(not_live),
        };

        Ok(LiveBlock {
            offset,
            header,
            prev,
            next,
        })
    }

    pub(crate) fn release(&mut self, ptr: BlockPtr) -> Result<Released, ArenaError> {
        let block = self.locate(ptr)?;
        let prev_link = block.header.prev();
        let next_link = block.header.next();

        match block.prev {
            Some((offset, mut header)) => {
                header.set_next(next_link);
                self.store(offset, &header)?;
            }
            None => self.head = next_link,
        }
        match block.next {
            Some((offset, mut header)) => {
                header.set_prev(prev_link);
                self.store(offset, &header)?;
            }
            None => self.tail = prev_link,
        }

        let size = block.header.size();
        self.live_blocks = self.live_blocks.saturating_sub(1);
        self.allocated_size = self.allocated_size.saturating_sub(size + HEADER_LEN);
        Ok(Released { ptr, size })
    }

    pub(crate) fn resize(
        &mut self,
        ptr: Option<BlockPtr>,
        new_size: usize,
    ) -> Result<ResizeOutcome, ArenaError> {
        let Some(ptr) = ptr else {
            return self.allocate(new_size).map(ResizeOutcome::Allocated);
        };

        let block = self.locate(ptr)?;
        let old_size = block.header.size();
        let padded = padded_size(new_size).ok_or(ArenaError::SizeOverflow {
            count: 1,
            size: new_size,
        })?;

        if padded <= old_size {
            let mut header = block.header;
            header.set_size(padded);
            self.store(block.offset, &header)?;
            self.allocated_size = self.allocated_size.saturating_sub(old_size - padded);
            return Ok(ResizeOutcome::Shrunk {
                ptr,
                old_size,
                new_size: padded,
            });
        }

        let extra = padded - old_size;
        if self.gap_after(block.offset, block.header)? >= extra {
            let mut header = block.header;
            header.set_size(padded);
            self.store(block.offset, &header)?;
            self.allocated_size += extra;
            return Ok(ResizeOutcome::GrewInPlace {
                ptr,
                old_size,
                new_size: padded,
            });
        }

        // The old block stays linked until the copy is done, so the new
        // block can never overlap it.
        let target = self.allocate(new_size)?;
        let copied = old_size.min(target.size);
        self.region
            .copy_within(ptr.offset(), target.ptr.offset(), copied)
            .ok_or(ArenaError::corruption(
                block.offset,
                CorruptionKind::OutOfBounds,
            ))?;
        self.release(ptr)?;

        Ok(ResizeOutcome::Relocated {
            from: ptr,
            to: target,
            old_size,
            copied,
        })
    }

    /// Data offset and padded size of a live block.
    pub(crate) fn data_range(&self, ptr: BlockPtr) -> Result<(usize, usize), ArenaError> {
        let block = self.locate(ptr)?;
        Ok((ptr.offset(), block.header.size()))
    }

    pub(crate) fn data(&self, ptr: BlockPtr) -> Result<&[u8], ArenaError> {
        let (start, len) = self.data_range(ptr)?;
        self.region
            .bytes(start, len)
            .ok_or(ArenaError::InvalidPointer { ptr: start })
    }

    /// Drop every link and hand the region back untouched.
    pub(crate) fn destroy(&mut self) -> &'r mut [u8] {
        self.head = None;
        self.tail = None;
        self.live_blocks = 0;
        self.allocated_size = 0;
        self.region.take()
    }
}

pub(crate) fn data_ptr(header_offset: usize) -> Result<BlockPtr, ArenaError> {
    BlockPtr::for_header(header_offset).ok_or(ArenaError::corruption(
        header_offset,
        CorruptionKind::OutOfBounds,
    ))
}

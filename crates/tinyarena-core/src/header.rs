//! Intrusive block headers and their canaries.
//!
//! Every live allocation is preceded by a four-word header:
//! `[canary | size | prev | next]`, each a native-endian `usize`.
//!
//! - `size` is the padded data size (header excluded).
//! - `prev`/`next` are region offsets of the neighboring headers in
//!   address order. A missing neighbor is stored as [`NIL_LINK`].
//! - `canary` is a checksum over `size`, `prev` and `next`. It is resealed
//!   whenever one of them changes and verified before a header's links are
//!   trusted.

use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::align::{HEADER_LEN, WORD_SIZE};

/// Encoded value of an absent link.
pub const NIL_LINK: usize = usize::MAX;

/// Mixed into every canary so that an all-zero header never validates.
pub const CANARY_SEED: usize = 0xA5C3_5A3C_96E1_69E1_u64 as usize;

/// Fixed-size block header record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BlockHeader {
    canary: usize,
    size: usize,
    prev: usize,
    next: usize,
}

const _: () = assert!(std::mem::size_of::<BlockHeader>() == HEADER_LEN);

impl BlockHeader {
    /// Build a sealed header.
    #[must_use]
    pub fn new(size: usize, prev: Option<usize>, next: Option<usize>) -> Self {
        let mut header = Self {
            canary: 0,
            size,
            prev: encode_link(prev),
            next: encode_link(next),
        };
        header.seal();
        header
    }

    /// Padded data size.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Offset of the previous header, if any.
    #[must_use]
    pub const fn prev(&self) -> Option<usize> {
        decode_link(self.prev)
    }

    /// Offset of the next header, if any.
    #[must_use]
    pub const fn next(&self) -> Option<usize> {
        decode_link(self.next)
    }

    /// Stored checksum.
    #[must_use]
    pub const fn canary(&self) -> usize {
        self.canary
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
        self.seal();
    }

    pub fn set_prev(&mut self, prev: Option<usize>) {
        self.prev = encode_link(prev);
        self.seal();
    }

    pub fn set_next(&mut self, next: Option<usize>) {
        self.next = encode_link(next);
        self.seal();
    }

    /// Checksum of the current `size`/`prev`/`next` fields.
    #[must_use]
    pub const fn expected_canary(&self) -> usize {
        self.size ^ self.prev ^ self.next ^ CANARY_SEED
    }

    /// Recompute and store the canary.
    pub fn seal(&mut self) {
        self.canary = self.expected_canary();
    }

    /// True if the stored canary matches the fields.
    #[must_use]
    pub const fn is_intact(&self) -> bool {
        self.canary == self.expected_canary()
    }

    /// Serialize to the in-region byte layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let words = [self.canary, self.size, self.prev, self.next];
        for (chunk, word) in buf.chunks_exact_mut(WORD_SIZE).zip(words) {
            chunk.copy_from_slice(&word.to_ne_bytes());
        }
        buf
    }

    /// Deserialize from the in-region byte layout. No validation is done.
    #[must_use]
    pub fn from_bytes(buf: &[u8; HEADER_LEN]) -> Self {
        Self {
            canary: word_at(buf, 0),
            size: word_at(buf, 1),
            prev: word_at(buf, 2),
            next: word_at(buf, 3),
        }
    }
}

fn word_at(buf: &[u8; HEADER_LEN], index: usize) -> usize {
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(&buf[index * WORD_SIZE..(index + 1) * WORD_SIZE]);
    usize::from_ne_bytes(word)
}

const fn encode_link(link: Option<usize>) -> usize {
    match link {
        Some(offset) => offset,
        None => NIL_LINK,
    }
}

const fn decode_link(raw: usize) -> Option<usize> {
    if raw == NIL_LINK { None } else { Some(raw) }
}

/// Handle to a live allocation: the region offset of its first data byte.
///
/// Data always starts after a header, so a handle is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockPtr(NonZeroUsize);

impl BlockPtr {
    /// Handle for the block whose header sits at `header_offset`.
    #[must_use]
    pub fn for_header(header_offset: usize) -> Option<Self> {
        header_offset
            .checked_add(HEADER_LEN)
            .and_then(NonZeroUsize::new)
            .map(Self)
    }

    /// Rebuild a handle from a previously observed data offset.
    #[must_use]
    pub fn from_offset(offset: usize) -> Option<Self> {
        NonZeroUsize::new(offset).map(Self)
    }

    /// Region offset of the first data byte.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0.get()
    }

    /// Region offset of the header preceding the data, if the handle can
    /// have one.
    #[must_use]
    pub const fn header_offset(self) -> Option<usize> {
        self.0.get().checked_sub(HEADER_LEN)
    }
}

impl fmt::Display for BlockPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

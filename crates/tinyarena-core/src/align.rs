//! Word alignment and block geometry.
//!
//! Every requested size is rounded up to the machine word so that headers
//! placed directly after a block's data stay word-aligned relative to the
//! start of the region.

/// Machine word size in bytes.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Length of a block header: four machine words (32 bytes on 64-bit targets).
pub const HEADER_LEN: usize = 4 * WORD_SIZE;

/// Rounds `size` up to the next multiple of [`WORD_SIZE`].
///
/// Returns `None` if the rounded value does not fit in `usize`.
#[must_use]
pub const fn padded_size(size: usize) -> Option<usize> {
    match size.checked_add(WORD_SIZE - 1) {
        Some(value) => Some(value & !(WORD_SIZE - 1)),
        None => None,
    }
}

/// Bytes a block with `padded` data bytes occupies, header included.
#[must_use]
pub const fn footprint(padded: usize) -> Option<usize> {
    padded.checked_add(HEADER_LEN)
}

/// Returns true if `offset` sits on a word boundary.
#[must_use]
pub const fn is_word_aligned(offset: usize) -> bool {
    offset % WORD_SIZE == 0
}

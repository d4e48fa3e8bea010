//! Bounds-checked view over the caller's byte region.
//!
//! All header and data accesses go through here; nothing outside the slice
//! handed in by the host is ever touched.

use crate::align::HEADER_LEN;
use crate::header::BlockHeader;

pub(crate) struct Region<'r> {
    bytes: &'r mut [u8],
}

impl<'r> Region<'r> {
    pub(crate) fn new(bytes: &'r mut [u8]) -> Self {
        Self { bytes }
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Decode the header at `offset`, or `None` if it does not fit.
    pub(crate) fn read_header(&self, offset: usize) -> Option<BlockHeader> {
        let end = offset.checked_add(HEADER_LEN)?;
        let raw: &[u8; HEADER_LEN] = self.bytes.get(offset..end)?.try_into().ok()?;
        Some(BlockHeader::from_bytes(raw))
    }

    /// Encode `header` at `offset`. Returns `None` if it does not fit.
    pub(crate) fn write_header(&mut self, offset: usize, header: &BlockHeader) -> Option<()> {
        let end = offset.checked_add(HEADER_LEN)?;
        self.bytes
            .get_mut(offset..end)?
            .copy_from_slice(&header.to_bytes());
        Some(())
    }

    pub(crate) fn bytes(&self, start: usize, len: usize) -> Option<&[u8]> {
        self.bytes.get(start..start.checked_add(len)?)
    }

    pub(crate) fn bytes_mut(&mut self, start: usize, len: usize) -> Option<&mut [u8]> {
        let end = start.checked_add(len)?;
        self.bytes.get_mut(start..end)
    }

    /// Copy `len` bytes from `src` to `dst` inside the region.
    pub(crate) fn copy_within(&mut self, src: usize, dst: usize, len: usize) -> Option<()> {
        let src_end = src.checked_add(len)?;
        let dst_end = dst.checked_add(len)?;
        if src_end > self.bytes.len() || dst_end > self.bytes.len() {
            return None;
        }
        self.bytes.copy_within(src..src_end, dst);
        Some(())
    }

    /// Hand the slice back, leaving an empty region behind.
    pub(crate) fn take(&mut self) -> &'r mut [u8] {
        std::mem::take(&mut self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_io_respects_bounds() {
        let mut buf = vec![0u8; HEADER_LEN * 2];
        let mut region = Region::new(&mut buf);
        let header = BlockHeader::new(8, None, None);

        assert_eq!(region.write_header(HEADER_LEN, &header), Some(()));
        assert_eq!(region.read_header(HEADER_LEN), Some(header));
        assert_eq!(region.write_header(HEADER_LEN + 1, &header), None);
        assert_eq!(region.read_header(HEADER_LEN + 1), None);
        assert_eq!(region.read_header(usize::MAX), None);
    }

    #[test]
    fn copy_within_rejects_out_of_range() {
        let mut buf: Vec<u8> = (0..16).collect();
        let mut region = Region::new(&mut buf);
        assert_eq!(region.copy_within(0, 8, 8), Some(()));
        assert_eq!(region.bytes(8, 8), Some(&[0u8, 1, 2, 3, 4, 5, 6, 7][..]));
        assert_eq!(region.copy_within(0, 9, 8), None);
    }

    #[test]
    fn take_empties_region() {
        let mut buf = vec![7u8; 32];
        let mut region = Region::new(&mut buf);
        let handed_back = region.take();
        assert_eq!(handed_back.len(), 32);
        assert_eq!(region.len(), 0);
    }
}

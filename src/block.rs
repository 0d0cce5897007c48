use std::num::NonZeroUsize;

use crate::HEADER_SIZE;

/// Header bits that a size value can never occupy. Sizes are always a
/// multiple of the header word, so bit 0 carries the status and the rest
/// must stay clear.
const TAG_MASK: usize = HEADER_SIZE - 1;

const ALLOCATED: usize = 0b1;

/// One machine word stored in front of every block: payload size in the
/// high bits, status in bit 0 (clear = free, set = allocated).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Header(usize);

impl Header {
  pub const fn new(
    size: usize,
    is_free: bool,
  ) -> Self {
    debug_assert!(size & TAG_MASK == 0);
    Self(size | if is_free { 0 } else { ALLOCATED })
  }

  pub const fn from_bits(bits: usize) -> Self {
    Self(bits)
  }

  pub const fn bits(self) -> usize {
    self.0
  }

  pub const fn size(self) -> usize {
    self.0 & !TAG_MASK
  }

  pub const fn is_free(self) -> bool {
    self.0 & ALLOCATED == 0
  }

  /// Raw value of the low tag bits. Anything above 1 means the word was
  /// not written by this allocator.
  pub const fn tag(self) -> usize {
    self.0 & TAG_MASK
  }

  /// Same status, different size.
  pub const fn with_size(
    self,
    size: usize,
  ) -> Self {
    Self::new(size, self.is_free())
  }

  pub const fn freed(self) -> Self {
    Self::new(self.size(), true)
  }

  pub const fn allocated(self) -> Self {
    Self::new(self.size(), false)
  }
}

/// Snapshot of one block, as reported by [`crate::ExplicitAllocator::blocks`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockInfo {
  /// Offset of the block header from the start of the segment.
  pub offset: usize,
  /// Payload size in bytes.
  pub size: usize,
  pub is_free: bool,
}

/// Handle to an allocated payload: its byte offset from the start of the
/// segment. A payload always sits behind a header, so the offset is never
/// zero and `Option<HeapPtr>` plays the role of a nullable pointer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct HeapPtr(NonZeroUsize);

impl HeapPtr {
  pub(crate) fn from_block(block: usize) -> Self {
    match NonZeroUsize::new(block + HEADER_SIZE) {
      Some(offset) => Self(offset),
      None => unreachable!("payload offset includes the header"),
    }
  }

  /// Byte offset of the payload from the start of the segment.
  pub fn offset(self) -> usize {
    self.0.get()
  }

  /// Offset of the header that precedes this payload.
  pub(crate) fn block(self) -> usize {
    self.0.get() - HEADER_SIZE
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_encodes_size_and_status() {
    let free = Header::new(208, true);
    assert_eq!(free.size(), 208);
    assert!(free.is_free());
    assert_eq!(free.bits(), 208);

    let used = Header::new(32, false);
    assert_eq!(used.size(), 32);
    assert!(!used.is_free());
    assert_eq!(used.bits(), 33);
  }

  #[test]
  fn status_changes_keep_size() {
    let header = Header::new(48, true);

    let used = header.allocated();
    assert_eq!(used.size(), 48);
    assert!(!used.is_free());

    let resized = used.with_size(96);
    assert_eq!(resized.size(), 96);
    assert!(!resized.is_free());

    assert_eq!(resized.freed(), Header::new(96, true));
  }

  #[test]
  fn foreign_tag_bits_are_visible() {
    let header = Header::from_bits(64 | 0b10);
    assert_eq!(header.size(), 64);
    assert!(header.tag() > 1);
  }

  #[test]
  fn heap_ptr_skips_header() {
    let ptr = HeapPtr::from_block(40);
    assert_eq!(ptr.offset(), 40 + HEADER_SIZE);
    assert_eq!(ptr.block(), 40);

    let first = HeapPtr::from_block(0);
    assert_eq!(first.offset(), HEADER_SIZE);
  }
}

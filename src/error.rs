use thiserror::Error;

/// Why a region could not host a heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
  #[error("region of {size} bytes is smaller than the minimum heap of {min} bytes")]
  TooSmall { size: usize, min: usize },
  #[error("region start {addr:#x} is not aligned to {align} bytes")]
  Misaligned { addr: usize, align: usize },
}

/// Why an allocation or resize request produced no pointer. The heap is
/// left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("zero-sized request")]
  ZeroSize,
  #[error("request of {size} bytes exceeds the {max} byte ceiling")]
  TooLarge { size: usize, max: usize },
  #[error("no free block holds {needed} bytes")]
  OutOfMemory { needed: usize },
}

impl AllocError {
  /// True for malformed requests, false for genuine exhaustion.
  pub fn is_invalid_request(&self) -> bool {
    matches!(self, Self::ZeroSize | Self::TooLarge { .. })
  }
}

/// Inconsistency found by [`crate::ExplicitAllocator::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Corruption {
  #[error("header at {offset} has invalid status bits {tag:#b}")]
  BadStatusBits { offset: usize, tag: usize },
  #[error("block at {offset} has a size beyond any address")]
  BlockOverrun { offset: usize },
  #[error("free blocks at {offset} and its left neighbour are adjacent")]
  AdjacentFree { offset: usize },
  #[error("free list link {link} points outside the segment")]
  DanglingLink { link: usize },
  #[error("free list revisits block {offset}")]
  FreeListCycle { offset: usize },
  #[error("free list holds allocated block {offset}")]
  ListedBlockNotFree { offset: usize },
  #[error("free list walk found {list} free blocks, counter says {counter}")]
  FreeCountMismatch { list: usize, counter: usize },
  #[error("sequential walk found {sequential} free blocks, counter says {counter}")]
  SequentialCountMismatch { sequential: usize, counter: usize },
  #[error("block total {total} is not a multiple of the alignment")]
  Misaligned { total: usize },
  #[error("blocks cover {total} bytes, segment holds {expected}")]
  SizeMismatch { total: usize, expected: usize },
}

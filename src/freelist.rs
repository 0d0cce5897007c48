//! Explicit free list threaded through the payloads of free blocks.
//!
//! While a block is free its first two payload words hold the offsets of
//! the previous and next free blocks:
//!
//! ```text
//!   ┌────────┬──────────┬──────────┬──────────────────┐
//!   │ header │ prev ofs │ next ofs │      unused      │
//!   └────────┴──────────┴──────────┴──────────────────┘
//! ```
//!
//! Once the block is allocated those words belong to the client, so they
//! are only ever read for blocks whose header says free.

use crate::{
  HEADER_SIZE,
  segment::{Segment, WORD},
};

/// Link value marking either end of the list.
const NIL: usize = usize::MAX;

const PREV: usize = HEADER_SIZE;
const NEXT: usize = HEADER_SIZE + WORD;

/// Bytes a free block needs to hold its header and both links.
pub(crate) const NODE_SIZE: usize = HEADER_SIZE + 2 * WORD;

pub struct FreeList {
  head: Option<usize>,
  len: usize,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None, len: 0 }
  }

  pub fn head(&self) -> Option<usize> {
    self.head
  }

  /// Number of blocks currently linked, maintained on every push and
  /// remove.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn push_front(
    &mut self,
    segment: &mut Segment<'_>,
    block: usize,
  ) {
    set_link(segment, block + PREV, None);
    set_link(segment, block + NEXT, self.head);

    if let Some(head) = self.head {
      set_link(segment, head + PREV, Some(block));
    }

    self.head = Some(block);
    self.len += 1;
  }

  /// Unlinks `block`, which must currently be in this list.
  pub fn remove(
    &mut self,
    segment: &mut Segment<'_>,
    block: usize,
  ) {
    let prev = prev(segment, block);
    let next = next(segment, block);

    if let Some(prev) = prev {
      set_link(segment, prev + NEXT, next);
    }

    if let Some(next) = next {
      set_link(segment, next + PREV, prev);
    }

    if self.head == Some(block) {
      self.head = next;
    }

    self.len -= 1;
  }

  /// First linked block whose payload holds at least `min_size` bytes.
  pub fn first_fit(
    &self,
    segment: &Segment<'_>,
    min_size: usize,
  ) -> Option<usize> {
    self
      .iter(segment)
      .find(|&block| segment.header(block).size() >= min_size)
  }

  pub fn iter<'s, 'a>(
    &self,
    segment: &'s Segment<'a>,
  ) -> Iter<'s, 'a> {
    Iter {
      segment,
      cursor: self.head,
    }
  }
}

pub struct Iter<'s, 'a> {
  segment: &'s Segment<'a>,
  cursor: Option<usize>,
}

impl Iterator for Iter<'_, '_> {
  type Item = usize;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.cursor?;
    self.cursor = next(self.segment, block);
    Some(block)
  }
}

pub(crate) fn prev(
  segment: &Segment<'_>,
  block: usize,
) -> Option<usize> {
  link(segment, block + PREV)
}

pub(crate) fn next(
  segment: &Segment<'_>,
  block: usize,
) -> Option<usize> {
  link(segment, block + NEXT)
}

fn link(
  segment: &Segment<'_>,
  offset: usize,
) -> Option<usize> {
  match segment.read_word(offset) {
    NIL => None,
    block => Some(block),
  }
}

fn set_link(
  segment: &mut Segment<'_>,
  offset: usize,
  block: Option<usize>,
) {
  segment.write_word(offset, block.unwrap_or(NIL));
}

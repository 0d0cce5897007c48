use std::mem;

use crate::{
  HEADER_SIZE,
  block::{BlockInfo, Header},
};

pub(crate) const WORD: usize = mem::size_of::<usize>();

/// The byte range under management. Blocks are addressed by the offset of
/// their header from the first byte of the range.
///
/// ```text
///   offset 0                                                  len()
///   ┌────────┬───────────────┬────────┬──────────────────────────┐
///   │ header │    payload    │ header │         payload          │
///   └────────┴───────────────┴────────┴──────────────────────────┘
///   ◄─ HEADER_SIZE ─► size ──►
/// ```
pub struct Segment<'a> {
  bytes: &'a mut [u8],
}

impl<'a> Segment<'a> {
  pub fn new(bytes: &'a mut [u8]) -> Self {
    Self { bytes }
  }

  /// Address of the first byte.
  pub fn begin(&self) -> usize {
    self.bytes.as_ptr() as usize
  }

  /// Address one past the last byte.
  pub fn end(&self) -> usize {
    self.begin() + self.bytes.len()
  }

  /// Total length including every header.
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  /// Usable size: the payload of the single block created at init.
  pub fn size(&self) -> usize {
    self.bytes.len() - HEADER_SIZE
  }

  pub fn read_word(
    &self,
    offset: usize,
  ) -> usize {
    let mut word = [0u8; WORD];
    word.copy_from_slice(&self.bytes[offset..offset + WORD]);
    usize::from_ne_bytes(word)
  }

  pub fn write_word(
    &mut self,
    offset: usize,
    value: usize,
  ) {
    self.bytes[offset..offset + WORD].copy_from_slice(&value.to_ne_bytes());
  }

  pub fn header(
    &self,
    block: usize,
  ) -> Header {
    Header::from_bits(self.read_word(block))
  }

  pub fn set_header(
    &mut self,
    block: usize,
    header: Header,
  ) {
    self.write_word(block, header.bits());
  }

  /// Block that physically follows `block`, or `None` at the end of the
  /// segment.
  pub fn next_block(
    &self,
    block: usize,
  ) -> Option<usize> {
    let next = block + HEADER_SIZE + self.header(block).size();
    (next < self.bytes.len()).then_some(next)
  }

  pub fn payload(
    &self,
    block: usize,
  ) -> &[u8] {
    let start = block + HEADER_SIZE;
    &self.bytes[start..start + self.header(block).size()]
  }

  pub fn payload_mut(
    &mut self,
    block: usize,
  ) -> &mut [u8] {
    let start = block + HEADER_SIZE;
    let size = self.header(block).size();
    &mut self.bytes[start..start + size]
  }

  /// Copies `len` payload bytes from one block to another.
  pub fn copy_payload(
    &mut self,
    from: usize,
    to: usize,
    len: usize,
  ) {
    let src = from + HEADER_SIZE;
    self.bytes.copy_within(src..src + len, to + HEADER_SIZE);
  }

  /// Walks blocks in address order. Stops early instead of reading past the
  /// end if a header claims more bytes than remain.
  pub fn blocks(&self) -> Blocks<'_, 'a> {
    Blocks {
      segment: self,
      cursor: 0,
    }
  }
}

pub struct Blocks<'s, 'a> {
  segment: &'s Segment<'a>,
  cursor: usize,
}

impl Iterator for Blocks<'_, '_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let len = self.segment.len();
    if self.cursor.checked_add(HEADER_SIZE)? > len {
      return None;
    }

    let header = self.segment.header(self.cursor);
    let info = BlockInfo {
      offset: self.cursor,
      size: header.size(),
      is_free: header.is_free(),
    };

    self.cursor = self
      .cursor
      .checked_add(HEADER_SIZE + header.size())
      .unwrap_or(usize::MAX);

    Some(info)
  }
}

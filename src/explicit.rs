use std::{fmt, io};

use log::{debug, error, trace, warn};

use crate::{
  ALIGNMENT, HEADER_SIZE, MAX_REQUEST_SIZE, MIN_HEAP_SIZE, MIN_PAYLOAD, MIN_SPLIT,
  align,
  align::align_down,
  block::{BlockInfo, Header, HeapPtr},
  error::{AllocError, Corruption, InitError},
  freelist::{self, FreeList, NODE_SIZE},
  segment::Segment,
};

/// Totals gathered from one sequential walk of the heap.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct HeapStats {
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub allocated_blocks: usize,
  pub allocated_bytes: usize,
}

/// First-fit allocator over a caller-supplied byte range, with an explicit
/// doubly linked list of free blocks.
///
/// Every block starts with a one word header. Free blocks additionally carry
/// their list links in the first payload words. Freed blocks are merged
/// with free neighbours on both sides, so no two free blocks ever touch.
pub struct ExplicitAllocator<'a> {
  segment: Segment<'a>,
  free: FreeList,
}

impl<'a> ExplicitAllocator<'a> {
  /// Takes over `region` as a single free block.
  ///
  /// The start of `region` must be aligned to [`ALIGNMENT`]. A length that
  /// is not a multiple of [`ALIGNMENT`] is truncated; the trailing bytes
  /// are never handed out.
  pub fn init(region: &'a mut [u8]) -> Result<Self, InitError> {
    let addr = region.as_ptr() as usize;
    if addr % ALIGNMENT != 0 {
      return Err(InitError::Misaligned {
        addr,
        align: ALIGNMENT,
      });
    }

    let heap_size = align_down(region.len(), ALIGNMENT);
    if heap_size < MIN_HEAP_SIZE {
      return Err(InitError::TooSmall {
        size: region.len(),
        min: MIN_HEAP_SIZE,
      });
    }

    let mut segment = Segment::new(&mut region[..heap_size]);
    segment.set_header(0, Header::new(segment.size(), true));

    let mut free = FreeList::new();
    free.push_front(&mut segment, 0);

    debug!(
      "heap initialized at {:#x}..{:#x}, {} usable bytes",
      segment.begin(),
      segment.end(),
      segment.size()
    );

    Ok(Self { segment, free })
  }

  /// Hands out a block of at least `size` bytes.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<HeapPtr, AllocError> {
    let needed = Self::needed(size)?;

    let Some(block) = self.free.first_fit(&self.segment, needed) else {
      warn!("out of memory: no free block of {needed} bytes");
      return Err(AllocError::OutOfMemory { needed });
    };

    self.free.remove(&mut self.segment, block);
    let header = self.segment.header(block).allocated();
    self.segment.set_header(block, header);
    self.split(block, needed);

    trace!("allocate({size}) -> block {block}, {needed} bytes");
    self.debug_check();

    Ok(HeapPtr::from_block(block))
  }

  /// Returns a block to the heap. `None` is ignored.
  ///
  /// `ptr` must come from this allocator and must not have been released
  /// already.
  pub fn release(
    &mut self,
    ptr: Option<HeapPtr>,
  ) {
    let Some(ptr) = ptr else {
      return;
    };

    let block = ptr.block();
    let header = self.segment.header(block).freed();
    self.segment.set_header(block, header);
    self.free.push_front(&mut self.segment, block);

    while self.absorb_next(block) {}
    let survivor = self.merge_into_left(block).unwrap_or(block);

    trace!(
      "release(block {block}) -> free block {survivor}, {} bytes",
      self.segment.header(survivor).size()
    );
    self.debug_check();
  }

  /// Changes the size of an allocation, in place when the block or its free
  /// right-hand neighbours have room, otherwise by moving it.
  ///
  /// `None` allocates; a `new_size` of zero releases and yields `Ok(None)`.
  /// On failure the original block is untouched and still owned by the
  /// caller.
  pub fn resize(
    &mut self,
    ptr: Option<HeapPtr>,
    new_size: usize,
  ) -> Result<Option<HeapPtr>, AllocError> {
    let Some(ptr) = ptr else {
      return self.allocate(new_size).map(Some);
    };

    if new_size == 0 {
      self.release(Some(ptr));
      return Ok(None);
    }

    let needed = Self::needed(new_size)?;
    let block = ptr.block();
    let old_size = self.segment.header(block).size();

    if old_size >= needed {
      self.split(block, needed);
      trace!("resize(block {block}, {new_size}) in place, shrink");
      self.debug_check();
      return Ok(Some(ptr));
    }

    while self.segment.header(block).size() < needed && self.absorb_next(block) {}

    if self.segment.header(block).size() >= needed {
      self.split(block, needed);
      trace!("resize(block {block}, {new_size}) in place, grown");
      self.debug_check();
      return Ok(Some(ptr));
    }

    // Give back whatever was absorbed before trying elsewhere, so a failed
    // move leaves the heap as it was.
    self.split(block, old_size);

    let fresh = self.allocate(new_size)?;
    self
      .segment
      .copy_payload(block, fresh.block(), old_size.min(new_size));
    self.release(Some(ptr));

    trace!(
      "resize(block {block}, {new_size}) moved to block {}",
      fresh.block()
    );

    Ok(Some(fresh))
  }

  /// Checks every structural invariant of the heap.
  ///
  /// Walks the blocks in address order, then the free list, and compares
  /// both free counts with the maintained counter. The first problem found
  /// is logged and returned.
  pub fn validate(&self) -> Result<(), Corruption> {
    self.check().inspect_err(|corruption| {
      error!("heap corruption: {corruption}");
    })
  }

  /// Writes one line per block, in address order.
  pub fn dump<W: io::Write>(
    &self,
    out: &mut W,
  ) -> io::Result<()> {
    writeln!(
      out,
      "Heap segment starts at {:#x}, ends at {:#x} ({} bytes).",
      self.segment.begin(),
      self.segment.end(),
      self.segment.len()
    )?;

    for block in self.segment.blocks() {
      writeln!(
        out,
        "  [{:>8}] {:<9} size {}",
        block.offset,
        if block.is_free { "free" } else { "allocated" },
        block.size
      )?;
    }

    Ok(())
  }

  /// Blocks in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.segment.blocks()
  }

  pub fn stats(&self) -> HeapStats {
    self
      .blocks()
      .fold(HeapStats::default(), |mut stats, block| {
        if block.is_free {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
        } else {
          stats.allocated_blocks += 1;
          stats.allocated_bytes += block.size;
        }
        stats
      })
  }

  /// The maintained free block counter.
  pub fn free_blocks(&self) -> usize {
    self.free.len()
  }

  /// Usable bytes of the single block created at init.
  pub fn segment_size(&self) -> usize {
    self.segment.size()
  }

  /// Address of the first byte of the segment.
  pub fn segment_begin(&self) -> usize {
    self.segment.begin()
  }

  /// Payload bytes behind `ptr`, which may exceed the size requested.
  pub fn usable_size(
    &self,
    ptr: HeapPtr,
  ) -> usize {
    self.segment.header(ptr.block()).size()
  }

  pub fn payload(
    &self,
    ptr: HeapPtr,
  ) -> &[u8] {
    self.segment.payload(ptr.block())
  }

  pub fn payload_mut(
    &mut self,
    ptr: HeapPtr,
  ) -> &mut [u8] {
    self.segment.payload_mut(ptr.block())
  }

  /// Rounded payload size for a request of `size` bytes.
  fn needed(size: usize) -> Result<usize, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    if size > MAX_REQUEST_SIZE {
      return Err(AllocError::TooLarge {
        size,
        max: MAX_REQUEST_SIZE,
      });
    }

    Ok(align!(size).max(MIN_PAYLOAD))
  }

  /// Shrinks `block` to `needed` bytes when the excess can stand alone as a
  /// free block, and links that excess into the free list.
  fn split(
    &mut self,
    block: usize,
    needed: usize,
  ) {
    let header = self.segment.header(block);
    let size = header.size();
    if size - needed < MIN_SPLIT {
      return;
    }

    self.segment.set_header(block, header.with_size(needed));

    let rest = block + HEADER_SIZE + needed;
    self
      .segment
      .set_header(rest, Header::new(size - needed - HEADER_SIZE, true));
    self.free.push_front(&mut self.segment, rest);

    // The excess may now sit against a free block that used to border the
    // allocated tail.
    while self.absorb_next(rest) {}

    trace!("split block {block}: {needed} bytes kept, remainder at {rest}");
  }

  /// Folds the right-hand neighbour of `block` into it if that neighbour is
  /// free. The status of `block` is kept.
  fn absorb_next(
    &mut self,
    block: usize,
  ) -> bool {
    let Some(next) = self.segment.next_block(block) else {
      return false;
    };

    let neighbour = self.segment.header(next);
    if !neighbour.is_free() {
      return false;
    }

    self.free.remove(&mut self.segment, next);

    let header = self.segment.header(block);
    let merged = header.size() + HEADER_SIZE + neighbour.size();
    self.segment.set_header(block, header.with_size(merged));

    trace!("coalesced block {next} into {block}");
    true
  }

  /// Folds the free `block` into a free left-hand neighbour, if there is
  /// one, and returns the neighbour. Headers carry no back pointer, so the
  /// neighbour is found among the free blocks.
  fn merge_into_left(
    &mut self,
    block: usize,
  ) -> Option<usize> {
    let left = self.free.iter(&self.segment).find(|&candidate| {
      candidate != block && self.segment.next_block(candidate) == Some(block)
    })?;

    self.free.remove(&mut self.segment, block);
    let merged = self.absorb_next_unlinked(left, block);

    trace!("coalesced block {block} into {left}, {merged} bytes");
    Some(left)
  }

  /// Grows `block` over its already unlinked neighbour `next`.
  fn absorb_next_unlinked(
    &mut self,
    block: usize,
    next: usize,
  ) -> usize {
    let header = self.segment.header(block);
    let merged = header.size() + HEADER_SIZE + self.segment.header(next).size();
    self.segment.set_header(block, header.with_size(merged));
    merged
  }

  fn check(&self) -> Result<(), Corruption> {
    let len = self.segment.len();

    // Sequential walk.
    let mut total = 0usize;
    let mut block_count = 0usize;
    let mut sequential_free = 0usize;
    let mut previous_free = false;

    while total < len {
      let offset = total;
      if offset + HEADER_SIZE > len {
        return Err(Corruption::BlockOverrun { offset });
      }

      let header = self.segment.header(offset);
      if header.tag() > 1 {
        return Err(Corruption::BadStatusBits {
          offset,
          tag: header.tag(),
        });
      }

      if header.is_free() {
        if previous_free {
          return Err(Corruption::AdjacentFree { offset });
        }
        sequential_free += 1;
      }
      previous_free = header.is_free();

      // A block reaching past the end stops the walk; the totals below
      // report it.
      total = total
        .checked_add(HEADER_SIZE)
        .and_then(|end| end.checked_add(header.size()))
        .ok_or(Corruption::BlockOverrun { offset })?;
      block_count += 1;
    }

    // Free list walk.
    let mut listed = 0usize;
    let mut cursor = self.free.head();

    while let Some(node) = cursor {
      if node.checked_add(NODE_SIZE).is_none_or(|end| end > len) {
        return Err(Corruption::DanglingLink { link: node });
      }

      if !self.segment.header(node).is_free() {
        return Err(Corruption::ListedBlockNotFree { offset: node });
      }

      let next = freelist::next(&self.segment, node);
      listed += 1;
      if next == Some(node) || listed > block_count {
        return Err(Corruption::FreeListCycle { offset: node });
      }

      cursor = next;
    }

    let counter = self.free.len();
    if listed != counter {
      return Err(Corruption::FreeCountMismatch {
        list: listed,
        counter,
      });
    }

    if sequential_free != counter {
      return Err(Corruption::SequentialCountMismatch {
        sequential: sequential_free,
        counter,
      });
    }

    if total % ALIGNMENT != 0 {
      return Err(Corruption::Misaligned { total });
    }

    let expected = self.segment.size() + HEADER_SIZE;
    if total != expected {
      return Err(Corruption::SizeMismatch { total, expected });
    }

    Ok(())
  }

  /// With `memdbg`, validates after every mutation and panics on the first
  /// inconsistency.
  fn debug_check(&self) {
    if cfg!(feature = "memdbg") {
      if let Err(corruption) = self.validate() {
        panic!("heap corruption: {corruption}");
      }
    }
  }

  #[cfg(test)]
  pub(crate) fn segment_mut(&mut self) -> &mut Segment<'a> {
    &mut self.segment
  }
}

impl fmt::Debug for ExplicitAllocator<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("ExplicitAllocator")
      .field("begin", &format_args!("{:#x}", self.segment.begin()))
      .field("size", &self.segment.size())
      .field("free_blocks", &self.free.len())
      .finish()
  }
}

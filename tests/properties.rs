//! Property-based tests for the explicit allocator.
//!
//! Uses proptest to drive random allocate / release / resize sequences and
//! checks the heap after every call.

use proptest::prelude::*;
use rallocator::{ExplicitAllocator, HEADER_SIZE, HeapPtr};

const HEAP_SIZE: usize = 4096;

#[repr(C, align(64))]
struct Arena([u8; HEAP_SIZE]);

#[derive(Clone, Debug)]
enum Op {
  Allocate(usize),
  Release(usize),
  Resize(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    (1usize..400).prop_map(Op::Allocate),
    any::<usize>().prop_map(Op::Release),
    (any::<usize>(), 0usize..600).prop_map(|(slot, size)| Op::Resize(slot, size)),
  ]
}

/// A live allocation and the byte every one of its requested bytes holds.
struct Live {
  ptr: HeapPtr,
  len: usize,
  fill: u8,
}

fn fill(
  heap: &mut ExplicitAllocator<'_>,
  live: &Live,
) {
  heap.payload_mut(live.ptr)[..live.len].fill(live.fill);
}

fn assert_intact(
  heap: &ExplicitAllocator<'_>,
  live: &[Live],
) {
  for entry in live {
    assert!(
      heap.payload(entry.ptr)[..entry.len]
        .iter()
        .all(|&byte| byte == entry.fill),
      "payload at {} was clobbered",
      entry.ptr.offset()
    );
  }
}

proptest! {
  /// Every call leaves a consistent heap, and live payloads keep their
  /// contents.
  #[test]
  fn random_sequences_stay_consistent(ops in prop::collection::vec(op(), 1..200)) {
    let mut arena = Arena([0; HEAP_SIZE]);
    let mut heap = ExplicitAllocator::init(&mut arena.0).unwrap();
    let mut live: Vec<Live> = Vec::new();
    let mut next_fill = 1u8;

    for op in ops {
      match op {
        Op::Allocate(size) => {
          if let Ok(ptr) = heap.allocate(size) {
            prop_assert!(heap.usable_size(ptr) >= size);
            let entry = Live { ptr, len: size, fill: next_fill };
            next_fill = next_fill.wrapping_add(1).max(1);
            fill(&mut heap, &entry);
            live.push(entry);
          }
        }
        Op::Release(slot) => {
          if !live.is_empty() {
            let entry = live.swap_remove(slot % live.len());
            heap.release(Some(entry.ptr));
          }
        }
        Op::Resize(slot, size) => {
          if live.is_empty() {
            continue;
          }
          let index = slot % live.len();
          let old = &live[index];
          let (old_ptr, old_len, old_fill) = (old.ptr, old.len, old.fill);

          match heap.resize(Some(old_ptr), size) {
            Ok(Some(ptr)) => {
              let kept = old_len.min(size);
              prop_assert!(heap.payload(ptr)[..kept].iter().all(|&byte| byte == old_fill));
              let entry = Live { ptr, len: size, fill: old_fill };
              fill(&mut heap, &entry);
              live[index] = entry;
            }
            Ok(None) => {
              prop_assert_eq!(size, 0);
              live.swap_remove(index);
            }
            Err(_) => {
              prop_assert!(heap.payload(old_ptr)[..old_len].iter().all(|&byte| byte == old_fill));
            }
          }
        }
      }

      prop_assert!(heap.validate().is_ok());
      prop_assert_eq!(heap.stats().free_blocks, heap.free_blocks());
      assert_intact(&heap, &live);
    }

    for entry in live.drain(..) {
      heap.release(Some(entry.ptr));
    }
    prop_assert!(heap.validate().is_ok());
    prop_assert_eq!(heap.free_blocks(), 1);
    prop_assert_eq!(heap.stats().free_bytes, HEAP_SIZE - HEADER_SIZE);
  }

  /// No two free blocks are ever adjacent, whatever the release order.
  #[test]
  fn release_order_never_leaves_adjacent_free_blocks(
    sizes in prop::collection::vec(1usize..100, 1..30),
    order in any::<prop::sample::Index>(),
  ) {
    let mut arena = Arena([0; HEAP_SIZE]);
    let mut heap = ExplicitAllocator::init(&mut arena.0).unwrap();

    let mut ptrs: Vec<_> = sizes.iter().filter_map(|&size| heap.allocate(size).ok()).collect();
    let rotate = order.index(ptrs.len().max(1));
    let len = ptrs.len();
    ptrs.rotate_left(rotate.min(len));

    for ptr in ptrs {
      heap.release(Some(ptr));
      let blocks: Vec<_> = heap.blocks().collect();
      prop_assert!(blocks.windows(2).all(|pair| !(pair[0].is_free && pair[1].is_free)));
      prop_assert!(heap.validate().is_ok());
    }

    prop_assert_eq!(heap.free_blocks(), 1);
  }
}

use std::io;

use rallocator::{ExplicitAllocator, MappedRegion};

/// Prints a heading followed by every block of the heap.
fn show(
  heap: &ExplicitAllocator<'_>,
  label: &str,
) {
  println!("\n{label}");
  heap
    .dump(&mut io::stdout().lock())
    .expect("write heap dump to stdout");

  match heap.validate() {
    Ok(()) => println!("  -> heap is consistent, {} free block(s)", heap.free_blocks()),
    Err(corruption) => println!("  -> heap is CORRUPT: {corruption}"),
  }
}

fn main() {
  simple_logger::SimpleLogger::new()
    .with_level(log::LevelFilter::Debug)
    .init()
    .expect("install logger");

  // One page straight from the kernel; the allocator never asks for more.
  let mut region = MappedRegion::new(4096).expect("map a page");
  let mut heap = ExplicitAllocator::init(region.as_mut_slice()).expect("initialize heap");

  show(&heap, "[0] Fresh heap: one free block spanning the segment");

  // --------------------------------------------------------------------
  // 1) Small request: rounded up to the minimum payload and split off
  //    the front of the free block.
  // --------------------------------------------------------------------
  let first = heap.allocate(10).expect("allocate 10 bytes");
  heap.payload_mut(first)[..4].copy_from_slice(&0xDEADBEEFu32.to_ne_bytes());
  show(&heap, "[1] allocate(10)");

  // --------------------------------------------------------------------
  // 2) Three neighbours, released out of order. Each release merges
  //    with whatever free space touches it.
  // --------------------------------------------------------------------
  let a = heap.allocate(64).expect("allocate A");
  let b = heap.allocate(64).expect("allocate B");
  let c = heap.allocate(64).expect("allocate C");
  let _pin = heap.allocate(16).expect("allocate tail pin");
  show(&heap, "[2] A, B, C and a pin after them");

  heap.release(Some(a));
  heap.release(Some(c));
  show(&heap, "[2] released A and C");

  heap.release(Some(b));
  show(&heap, "[2] released B: A, B and C are one block again");

  // --------------------------------------------------------------------
  // 3) Grow the first block. Its right neighbour is free, so the pointer
  //    stays put.
  // --------------------------------------------------------------------
  let grown = heap
    .resize(Some(first), 100)
    .expect("grow first block")
    .expect("non-zero size keeps a block");
  println!(
    "\n[3] resize(first, 100): {} (value 0x{:X})",
    if grown == first { "in place" } else { "moved" },
    u32::from_ne_bytes(heap.payload(grown)[..4].try_into().expect("four bytes"))
  );
  show(&heap, "[3] after in-place growth");

  // --------------------------------------------------------------------
  // 4) Grow past everything next to it: the data moves.
  // --------------------------------------------------------------------
  let moved = heap
    .resize(Some(grown), 1024)
    .expect("grow first block again")
    .expect("non-zero size keeps a block");
  println!(
    "\n[4] resize(first, 1024): {} (value 0x{:X})",
    if moved == grown { "in place" } else { "moved" },
    u32::from_ne_bytes(heap.payload(moved)[..4].try_into().expect("four bytes"))
  );
  show(&heap, "[4] after growth");

  // --------------------------------------------------------------------
  // 5) Requests the heap refuses.
  // --------------------------------------------------------------------
  println!("\n[5] allocate(0)      -> {:?}", heap.allocate(0));
  println!("[5] allocate(1 MiB)  -> {:?}", heap.allocate(1 << 20));

  heap.release(Some(moved));
  show(&heap, "[6] released the moved block");

  println!("\n[7] End of example. Dropping the region unmaps the page.");
}

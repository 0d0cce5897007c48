//! # rallocator - A Custom Memory Allocator Library
//!
//! This crate provides an **explicit free list allocator**: it manages one
//! contiguous memory segment handed to it by the caller and serves
//! allocate, release and resize requests from it, without touching any
//! other allocator.
//!
//! ## Overview
//!
//! Every block in the segment starts with a one word header. Free blocks
//! are additionally threaded into a doubly linked list through their own
//! payload:
//!
//! ```text
//!   Segment Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                            SEGMENT                                   │
//!   │                                                                      │
//!   │   ┌───┬──────┬───┬──────────┬───┬──────┬───┬──────────────────────┐  │
//!   │   │ H │  A1  │ H │   free   │ H │  A2  │ H │         free         │  │
//!   │   └───┴──────┴───┴──────────┴───┴──────┴───┴──────────────────────┘  │
//!   │                  ▲    │                    ▲                         │
//!   │                  │    └──── next ─────────►│                         │
//!   │                  │◄──────── prev ──────────┘                         │
//!   │              first free                                              │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocated blocks are never linked.
//!   Allocation: first fit over the free list.
//!   Release: O(1) push to the front, then merge with free neighbours.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - Header word encoding, block and pointer types
//!   ├── segment    - Byte range under management (internal)
//!   ├── freelist   - Doubly linked list of free blocks (internal)
//!   ├── explicit   - ExplicitAllocator implementation
//!   ├── error      - Init, allocation and corruption errors
//!   └── region     - mmap backed regions to hand to the allocator
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rallocator::{ExplicitAllocator, MappedRegion};
//!
//! let mut region = MappedRegion::new(4096).unwrap();
//! let mut heap = ExplicitAllocator::init(region.as_mut_slice()).unwrap();
//!
//! // Allocate 10 bytes and use them
//! let ptr = heap.allocate(10).unwrap();
//! heap.payload_mut(ptr)[..10].copy_from_slice(b"0123456789");
//!
//! // Grow it; the contents follow the block
//! let ptr = heap.resize(Some(ptr), 100).unwrap().unwrap();
//! assert_eq!(&heap.payload(ptr)[..10], b"0123456789");
//!
//! // Free the memory
//! heap.release(Some(ptr));
//! assert!(heap.validate().is_ok());
//! ```
//!
//! ## How It Works
//!
//! Each block carries its metadata in a single word:
//!
//! ```text
//!   Block Header:
//!   ┌───────────────────────────────────────────────┬───┐
//!   │          payload size (multiple of 8)         │ A │
//!   └───────────────────────────────────────────────┴───┘
//!                                                     └── 1 = allocated
//!
//!   Free Block:
//!   ┌──────────┬──────────┬──────────┬────────────────────┐
//!   │  header  │   prev   │   next   │       unused       │
//!   └──────────┴──────────┴──────────┴────────────────────┘
//!              ▲
//!              └── Pointer returned to user once allocated
//! ```
//!
//! Requests are rounded up to [`ALIGNMENT`] with a floor of
//! [`MIN_PAYLOAD`], which always leaves room for the two link words. A
//! block that fits with at least [`MIN_SPLIT`] bytes to spare is split and
//! the tail goes back on the free list.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Fixed size**: The segment never grows
//! - **Trusting**: Headers are not checked on the hot path; use
//!   [`ExplicitAllocator::validate`] or the `memdbg` feature to catch
//!   corruption
//!
//! ## Pointers
//!
//! Blocks are addressed by offset into the segment rather than by raw
//! address, so the whole crate outside [`region`] is safe code. A
//! [`HeapPtr`] is the offset of a payload; `Option<HeapPtr>` stands in for
//! a nullable pointer.

use std::mem;

pub mod align;
mod block;
mod error;
mod explicit;
mod freelist;
#[cfg(unix)]
pub mod region;
mod segment;

pub use block::{BlockInfo, HeapPtr};
pub use error::{AllocError, Corruption, InitError};
pub use explicit::{ExplicitAllocator, HeapStats};
#[cfg(unix)]
pub use region::MappedRegion;

/// Every block size and the segment start are multiples of this.
pub const ALIGNMENT: usize = 16;

/// Size of the word stored in front of every block.
pub const HEADER_SIZE: usize = mem::size_of::<usize>();

/// Smallest payload ever handed out or left free; holds the two link words
/// a free block needs.
pub const MIN_PAYLOAD: usize = 2 * ALIGNMENT;

/// Spare bytes a block needs before it is split: room for a header and a
/// minimum payload.
pub const MIN_SPLIT: usize = HEADER_SIZE + MIN_PAYLOAD;

/// Smallest segment [`ExplicitAllocator::init`] accepts.
pub const MIN_HEAP_SIZE: usize = HEADER_SIZE + MIN_PAYLOAD;

/// Largest single request; keeps rounding far from overflow.
pub const MAX_REQUEST_SIZE: usize = 1 << 30;

const _: () = assert!(ALIGNMENT.is_power_of_two());
const _: () = assert!(MIN_PAYLOAD >= 2 * mem::size_of::<usize>());

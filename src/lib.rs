//! # blockalloc
//!
//! A small dynamic memory allocator that manages one growable heap on top of
//! a program break. The heap is a list of variable size blocks, each one a
//! header followed by its payload, linked in address order:
//!
//! ```text
//!  start                                                              break
//!   +--------+-----------+--------+-------+--------+-----------------+
//!   | header |  payload  | header | free  | header |     payload     |
//!   +--------+-----------+--------+-------+--------+-----------------+
//! ```
//!
//! Requests are served by reusing a free block (picked with a [`Fit`]
//! policy and split when it is big enough) or by growing the break one block
//! at a time. Released blocks are immediately fused with free neighbours, and
//! a free block at the end of the heap is given back by moving the break.
//!
//! Blocks are linked by offsets into the heap memory rather than by
//! addresses, and pointers handed out are offsets too ([`Ptr`]), so the
//! whole layout can be inspected and checked at any time.
//!
//! ```rust
//! use blockalloc::{Heap, HeapConfig};
//!
//! let mut heap = Heap::from_config(&HeapConfig::default());
//!
//! let a = heap.allocate(16).unwrap();
//! heap.payload_mut(a).unwrap().copy_from_slice(b"sixteen bytes!!!");
//!
//! let a = heap.resize(Some(a), 64).unwrap();
//! assert_eq!(&heap.payload(a).unwrap()[..16], b"sixteen bytes!!!");
//!
//! heap.release(a);
//! assert_eq!(heap.end(), heap.start());
//! ```
//!
//! The allocator is single threaded and keeps no global state; every heap
//! is an independent value.

mod block;
mod brk;
mod coalesce;
mod config;
mod error;
mod fit;
mod heap;
mod kernel;
mod list;
pub mod utils;

pub use block::{HEADER_SIZE, Ptr};
pub use brk::{Arena, ProgramBreak};
pub use config::{HeapConfig, Validation};
pub use error::AllocError;
pub use fit::Fit;
pub use heap::{BlockInfo, Heap, HeapStats};
pub use kernel::MappedBreak;

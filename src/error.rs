use std::fmt;

use crate::block::Ptr;

/// Everything that can go wrong while serving a request.
///
/// Only [`crate::Heap::resize`] reports [`AllocError::InvalidPointer`]; releasing
/// an invalid pointer is silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The program break refused to grow, or the heap would outgrow the
    /// 32-bit offsets stored in block headers.
    OutOfMemory,
    /// `count * element_size` does not fit in a `usize`.
    SizeOverflow,
    /// The pointer was not produced by this heap or is no longer allocated.
    InvalidPointer(Ptr),
    /// A block header lies outside the heap memory or disagrees with its
    /// neighbours. `offset` is where the offending header is.
    Corrupt { offset: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory => write!(f, "out of memory"),
            AllocError::SizeOverflow => write!(f, "requested size overflows usize"),
            AllocError::InvalidPointer(ptr) => {
                write!(f, "pointer {ptr} was not allocated by this heap")
            }
            AllocError::Corrupt { offset } => {
                write!(f, "heap corrupted at offset {offset:#x}")
            }
        }
    }
}

impl std::error::Error for AllocError {}

//! This file contains all the helper functions for the allocator.
//! This are functions that don't particularly belong to any concrete module of the program.

/// Granularity of every payload size handed out by the allocator. Block headers
/// are made of 4-byte words, so rounding payloads to this keeps every header and
/// payload offset aligned to it as well.
pub const ALIGNMENT: usize = 4;

/// It aligns `to_be_aligned` using `aligment`, which must be a power of two.
///
/// This method is used to round payload sizes to [`ALIGNMENT`] and mapped region
/// sizes to the computer's page size. Returns `None` if the rounded value does not
/// fit in a `usize`.
pub fn align(to_be_aligned: usize, aligment: usize) -> Option<usize> {
    debug_assert!(aligment.is_power_of_two());
    Some(to_be_aligned.checked_add(aligment - 1)? & !(aligment - 1))
}

/// Payload size the allocator really reserves for a request of `size` bytes.
///
/// Zero-byte requests still get the smallest payload so that every block owns
/// at least one word and its payload offset lies strictly inside the heap.
pub fn payload_size(size: usize) -> Option<usize> {
    align(size.max(ALIGNMENT), ALIGNMENT)
}

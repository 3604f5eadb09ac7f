//! Block mutations: carving a free remainder out of an oversized block and
//! fusing a block with the free block that follows it.

use crate::{
    block::{self, BlockRef, HEADER_SIZE, Header, MIN_PAYLOAD},
    error::AllocError,
    list,
};

/// Whether a block of `size` payload bytes holding `needed` bytes leaves
/// enough room behind for another header and its smallest payload.
pub(crate) fn can_split(size: usize, needed: usize) -> bool {
    size >= needed && size - needed >= HEADER_SIZE + MIN_PAYLOAD
}

/// Shrinks `at` to `size` payload bytes and turns the rest into a new free
/// block right after it.
///
/// ```text
/// +--------+----------------------------+      +--------+------+--------+-------------+
/// | header |          payload           |  ->  | header | size | header |  remainder  |
/// +--------+----------------------------+      +--------+------+--------+-------------+
/// ```
///
/// Nothing happens if the leftover is too small to hold a block; the caller
/// then keeps the slack. Returns the remainder when one was created.
pub(crate) fn split(
    memory: &mut [u8],
    at: BlockRef,
    size: usize,
) -> Result<Option<BlockRef>, AllocError> {
    let mut header = Header::load(memory, at)?;

    if !can_split(header.size, size) {
        return Ok(None);
    }

    let remainder = BlockRef(header.payload + size);
    let remainder_size = header.size - size - HEADER_SIZE;

    header.size = size;
    header.store(memory, at)?;

    list::insert_after(
        memory,
        Some(at),
        remainder,
        Header::new(remainder, remainder_size, true),
    )?;

    log::trace!(
        "split block {:#x} at {size} bytes, remainder {:#x} holds {remainder_size}",
        at.0,
        remainder.0
    );

    Ok(Some(remainder))
}

/// Absorbs the block following `at` into it when that block is free.
///
/// The absorbed header stops existing: its payload word is cleared so that a
/// stale pointer to it is rejected from then on. Payload bytes never move.
/// Returns whether a fusion happened.
pub(crate) fn fuse(memory: &mut [u8], at: BlockRef) -> Result<bool, AllocError> {
    let mut header = Header::load(memory, at)?;

    let Some(next) = header.next else {
        return Ok(false);
    };

    let next_header = Header::load(memory, next)?;
    if !next_header.free {
        return Ok(false);
    }

    header.size += HEADER_SIZE + next_header.size;
    header.next = next_header.next;
    header.store(memory, at)?;
    list::set_prev(memory, next_header.next, Some(at))?;
    block::retire(memory, next)?;

    log::trace!("fused block {:#x} into {:#x}, now {} bytes", next.0, at.0, header.size);

    Ok(true)
}

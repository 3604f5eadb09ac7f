use std::fmt;

use crate::error::AllocError;

/// Header size of a block in bytes. The header is made of five little-endian
/// `u32` words, so it keeps payloads aligned to [`crate::utils::ALIGNMENT`].
pub const HEADER_SIZE: usize = 20;

/// Smallest payload a block created by splitting may have.
pub(crate) const MIN_PAYLOAD: usize = 4;

/// Stored in a link word when there is no neighbour.
const NIL: u32 = u32::MAX;

/// Largest heap offset a header word can hold. `NIL` is reserved.
pub(crate) const MAX_OFFSET: usize = (NIL - 1) as usize;

const FREE: usize = 0;
const NEXT: usize = 4;
const PREV: usize = 8;
const SIZE: usize = 12;
const PAYLOAD: usize = 16;

/// Pointer handed out by the allocator. It is the offset of a payload inside
/// the heap memory, so it stays meaningful even if the backing storage moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ptr(usize);

impl Ptr {
    /// Builds a pointer from a raw heap offset. Nothing is checked here; any
    /// heap operation receiving it validates it first.
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    pub const fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Offset of a block header inside the heap memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct BlockRef(pub usize);

impl BlockRef {
    /// Block whose payload starts at `ptr`.
    pub fn of(ptr: Ptr) -> Option<Self> {
        ptr.0.checked_sub(HEADER_SIZE).map(Self)
    }

    /// First payload byte of this block.
    pub fn payload(self) -> usize {
        self.0 + HEADER_SIZE
    }
}

/// This is the structure of a block header. The header is stored in the heap
/// memory itself, right before the content it describes.
///
/// ```text
/// +---------------------+ <------+
/// |     free  (u32)     |        |
/// +---------------------+        |
/// |     next  (u32)     |        |
/// +---------------------+        |
/// |     prev  (u32)     |        | -> Header (20 bytes)
/// +---------------------+        |
/// |     size  (u32)     |        |
/// +---------------------+        |
/// |    payload (u32)    |        |
/// +---------------------+ <------+ <- payload offset handed to the user
/// |       Content       |        |
/// |         ...         |        | -> `size` addressable bytes
/// |                     |        |
/// +---------------------+ <------+ <- header of the next block
/// ```
///
/// Links are header offsets, not addresses, and every access is bounds checked
/// against the heap memory. See [`Header::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    /// Flag to tell whether the block is free or not.
    pub free: bool,
    /// Next block in address order.
    pub next: Option<BlockRef>,
    /// Previous block in address order.
    pub prev: Option<BlockRef>,
    /// Size of the payload, header excluded.
    pub size: usize,
    /// Payload offset recorded at creation. Used to validate pointers.
    pub payload: usize,
}

impl Header {
    /// Header of a block created at `at`.
    pub fn new(at: BlockRef, size: usize, free: bool) -> Self {
        Self {
            free,
            next: None,
            prev: None,
            size,
            payload: at.payload(),
        }
    }

    /// Offset of the header that follows this block's payload.
    pub fn end(&self) -> usize {
        self.payload + self.size
    }

    /// Reads the header stored at `at`.
    pub fn load(memory: &[u8], at: BlockRef) -> Result<Self, AllocError> {
        let words = header_bytes(memory, at)?;

        Ok(Self {
            free: word(words, FREE) != 0,
            next: link(word(words, NEXT)),
            prev: link(word(words, PREV)),
            size: word(words, SIZE) as usize,
            payload: word(words, PAYLOAD) as usize,
        })
    }

    /// Writes this header at `at`.
    pub fn store(&self, memory: &mut [u8], at: BlockRef) -> Result<(), AllocError> {
        let end = at.0.checked_add(HEADER_SIZE).ok_or(AllocError::Corrupt { offset: at.0 })?;
        let words = memory
            .get_mut(at.0..end)
            .ok_or(AllocError::Corrupt { offset: at.0 })?;

        put(words, FREE, self.free as u32);
        put(words, NEXT, unlink(self.next));
        put(words, PREV, unlink(self.prev));
        put(words, SIZE, self.size as u32);
        put(words, PAYLOAD, self.payload as u32);

        Ok(())
    }
}

/// Reads only the recorded payload word of the header at `at`.
pub(crate) fn recorded_payload(memory: &[u8], at: BlockRef) -> Result<usize, AllocError> {
    Ok(word(header_bytes(memory, at)?, PAYLOAD) as usize)
}

/// Clears the payload word of a header that no longer describes a block, so
/// pointers to it stop validating.
pub(crate) fn retire(memory: &mut [u8], at: BlockRef) -> Result<(), AllocError> {
    let start = at.0 + PAYLOAD;
    let bytes = memory
        .get_mut(start..start + 4)
        .ok_or(AllocError::Corrupt { offset: at.0 })?;
    bytes.copy_from_slice(&0u32.to_le_bytes());

    Ok(())
}

fn header_bytes(memory: &[u8], at: BlockRef) -> Result<&[u8], AllocError> {
    let end = at.0.checked_add(HEADER_SIZE).ok_or(AllocError::Corrupt { offset: at.0 })?;
    memory.get(at.0..end).ok_or(AllocError::Corrupt { offset: at.0 })
}

fn word(words: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([words[at], words[at + 1], words[at + 2], words[at + 3]])
}

fn put(words: &mut [u8], at: usize, value: u32) {
    words[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn link(value: u32) -> Option<BlockRef> {
    (value != NIL).then_some(BlockRef(value as usize))
}

fn unlink(block: Option<BlockRef>) -> u32 {
    block.map_or(NIL, |b| b.0 as u32)
}

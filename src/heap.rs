use std::fmt;

use crate::{
    block::{BlockRef, HEADER_SIZE, Header, MAX_OFFSET, Ptr},
    brk::{Arena, ProgramBreak},
    coalesce,
    config::{HeapConfig, Validation},
    error::AllocError,
    fit::Fit,
    list::{self, Blocks},
    utils::{ALIGNMENT, payload_size},
};

/// A heap made of one contiguous run of blocks on top of a [`ProgramBreak`].
///
/// ```text
///  start                                                              end
///   +--------+---------+--------+------+--------+------------------+
///   | header | payload | header | free | header |     payload      |
///   +--------+---------+--------+------+--------+------------------+
///        |                 ^  |               ^
///        +-----------------+  +---------------+   next / prev links
/// ```
///
/// Blocks follow each other without gaps and are linked in address order.
/// The list does not exist until the first allocation, new blocks are always
/// appended at the break, and the break only moves back when the last block
/// becomes free.
///
/// The heap is strictly single threaded: every operation takes `&mut self`
/// and runs to completion.
pub struct Heap<B: ProgramBreak = Arena> {
    brk: B,
    /// Where the break was when the heap was created. First header goes here.
    start: usize,
    head: Option<BlockRef>,
    fit: Fit,
    validation: Validation,
}

/// Public view of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block header.
    pub offset: usize,
    /// Pointer to the payload.
    pub ptr: Ptr,
    /// Payload size in bytes.
    pub size: usize,
    pub free: bool,
}

/// Occupancy summary of a heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub blocks: usize,
    pub free_blocks: usize,
    /// Payload bytes of allocated blocks.
    pub used_bytes: usize,
    /// Payload bytes of free blocks.
    pub free_bytes: usize,
    /// Payload of the biggest free block, the largest request that can be
    /// served without growing.
    pub largest_free: usize,
    /// Bytes between the start of the heap and the break, headers included.
    pub heap_bytes: usize,
}

impl Heap<Arena> {
    /// Heap over a fresh [`Arena`] built from `config`.
    pub fn from_config(config: &HeapConfig) -> Self {
        Self::with_config(config.arena(), config)
    }
}

impl<B: ProgramBreak> Heap<B> {
    /// Heap with the default configuration on top of `brk`.
    pub fn new(brk: B) -> Self {
        Self::with_config(brk, &HeapConfig::default())
    }

    /// Heap on top of `brk`. Everything below the current break is left
    /// alone; the heap starts where the break is now.
    pub fn with_config(brk: B, config: &HeapConfig) -> Self {
        Self {
            start: brk.current(),
            brk,
            head: None,
            fit: config.fit,
            validation: config.validation,
        }
    }

    pub fn fit(&self) -> Fit {
        self.fit
    }

    /// Changes the block selection policy for the following requests.
    pub fn set_fit(&mut self, fit: Fit) {
        self.fit = fit;
    }

    /// Offset of the first block header.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Current position of the program break.
    pub fn end(&self) -> usize {
        self.brk.current()
    }

    pub fn program_break(&self) -> &B {
        &self.brk
    }

    /// Allocates at least `size` bytes and returns a pointer to them.
    ///
    /// The size is rounded up to [`ALIGNMENT`]. A free block chosen by the
    /// current [`Fit`] is reused (and split if it is big enough to leave a
    /// usable remainder); otherwise the heap grows by one block.
    pub fn allocate(&mut self, size: usize) -> Result<Ptr, AllocError> {
        let size = payload_size(size).ok_or(AllocError::OutOfMemory)?;

        let block = match self.head {
            None => {
                let block = self.grow(None, size)?;
                self.head = Some(block);
                block
            }
            Some(head) => {
                let mut last = head;
                match self.fit.locate(self.brk.memory(), head, size, &mut last)? {
                    Some(block) => {
                        self.claim(block, size)?;
                        block
                    }
                    None => self.grow(Some(last), size)?,
                }
            }
        };

        Ok(Ptr::from_offset(block.payload()))
    }

    /// Allocates room for `count` elements of `element_size` bytes each, all
    /// set to zero whatever the reused memory held before.
    pub fn allocate_zeroed(&mut self, count: usize, element_size: usize) -> Result<Ptr, AllocError> {
        let size = count
            .checked_mul(element_size)
            .ok_or(AllocError::SizeOverflow)?;
        let ptr = self.allocate(size)?;

        let len = payload_size(size).ok_or(AllocError::OutOfMemory)?;
        self.brk
            .memory_mut()
            .get_mut(ptr.offset()..ptr.offset() + len)
            .ok_or(AllocError::Corrupt { offset: ptr.offset() })?
            .fill(0);

        Ok(ptr)
    }

    /// Gives the block behind `ptr` back to the heap.
    ///
    /// The block is fused with free neighbours on both sides; if it ends up
    /// last, the break moves back to its header. Pointers that fail
    /// [`Heap::is_valid`], including ones already released, are ignored.
    pub fn release(&mut self, ptr: Ptr) {
        let Some(block) = self.block_of(ptr) else {
            log::debug!("ignoring release of invalid pointer {ptr}");
            return;
        };

        if let Err(err) = self.free_block(block) {
            log::error!("release of {ptr} failed: {err}");
        }
    }

    /// Changes the size of the allocation behind `ptr` to `size` bytes.
    ///
    /// Shrinking and growing into a free successor happen in place and
    /// return `ptr` itself. Otherwise the content is moved to a new block,
    /// the old one is released and the new pointer is returned; if no new
    /// block can be found the old one is left as it was. `None` behaves like
    /// [`Heap::allocate`].
    pub fn resize(&mut self, ptr: Option<Ptr>, size: usize) -> Result<Ptr, AllocError> {
        let Some(ptr) = ptr else {
            return self.allocate(size);
        };

        let block = self.block_of(ptr).ok_or(AllocError::InvalidPointer(ptr))?;
        let size = payload_size(size).ok_or(AllocError::OutOfMemory)?;
        let header = Header::load(self.brk.memory(), block)?;

        if header.size >= size {
            self.trim(block, size)?;
            return Ok(ptr);
        }

        if let Some(next) = header.next {
            let next_header = Header::load(self.brk.memory(), next)?;
            if next_header.free && header.size + HEADER_SIZE + next_header.size >= size {
                coalesce::fuse(self.brk.memory_mut(), block)?;
                self.trim(block, size)?;
                return Ok(ptr);
            }
        }

        let new = self.allocate(size)?;
        let new_block = BlockRef::of(new).ok_or(AllocError::Corrupt { offset: new.offset() })?;
        let memory = self.brk.memory_mut();
        let len = header.size.min(Header::load(memory, new_block)?.size);
        memory.copy_within(ptr.offset()..ptr.offset() + len, new.offset());

        log::trace!("moved {len} bytes from {ptr} to {new}");

        self.free_block(block)?;

        Ok(new)
    }

    /// Whether `ptr` points at the payload of a block currently allocated
    /// from this heap.
    pub fn is_valid(&self, ptr: Ptr) -> bool {
        self.block_of(ptr).is_some()
    }

    /// Payload bytes of the allocation behind `ptr`.
    pub fn payload(&self, ptr: Ptr) -> Option<&[u8]> {
        let block = self.block_of(ptr)?;
        let memory = self.brk.memory();
        let size = Header::load(memory, block).ok()?.size;

        memory.get(ptr.offset()..ptr.offset() + size)
    }

    /// Payload bytes of the allocation behind `ptr`.
    pub fn payload_mut(&mut self, ptr: Ptr) -> Option<&mut [u8]> {
        let block = self.block_of(ptr)?;
        let memory = self.brk.memory_mut();
        let size = Header::load(memory, block).ok()?.size;

        memory.get_mut(ptr.offset()..ptr.offset() + size)
    }

    /// Blocks in address order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        Blocks::new(self.brk.memory(), self.head)
            .map_while(Result::ok)
            .map(|(at, header)| BlockInfo {
                offset: at.0,
                ptr: Ptr::from_offset(header.payload),
                size: header.size,
                free: header.free,
            })
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            heap_bytes: self.end() - self.start,
            ..HeapStats::default()
        };

        for block in self.blocks() {
            stats.blocks += 1;
            if block.free {
                stats.free_blocks += 1;
                stats.free_bytes += block.size;
                stats.largest_free = stats.largest_free.max(block.size);
            } else {
                stats.used_bytes += block.size;
            }
        }

        stats
    }

    /// Verifies the layout of the whole heap: blocks abut each other from
    /// `start` to the break, links agree in both directions, every payload
    /// word is right, no two neighbours are both free and the last block is
    /// in use. Returns the offset of the first offending block.
    pub fn check(&self) -> Result<(), AllocError> {
        let mut expected = self.start;
        let mut prev: Option<(BlockRef, Header)> = None;

        for item in Blocks::new(self.brk.memory(), self.head) {
            let (at, header) = item?;
            let corrupt = Err(AllocError::Corrupt { offset: at.0 });

            if at.0 != expected || header.payload != at.payload() {
                return corrupt;
            }
            if header.prev != prev.map(|(b, _)| b) {
                return corrupt;
            }
            if header.free && prev.is_some_and(|(_, p)| p.free) {
                return corrupt;
            }

            expected = header.end();
            prev = Some((at, header));
        }

        if prev.is_some_and(|(_, tail)| tail.free || tail.next.is_some()) {
            return Err(AllocError::Corrupt { offset: expected });
        }
        if expected != self.end() {
            return Err(AllocError::Corrupt { offset: expected });
        }

        Ok(())
    }

    /// Block whose payload is `ptr`, when `ptr` is a live allocation.
    fn block_of(&self, ptr: Ptr) -> Option<BlockRef> {
        let head = self.head?;
        let offset = ptr.offset();

        if offset < self.start + HEADER_SIZE || offset >= self.end() {
            return None;
        }
        if (offset - self.start) % ALIGNMENT != 0 {
            return None;
        }

        let block = BlockRef::of(ptr)?;
        let memory = self.brk.memory();
        let header = Header::load(memory, block).ok()?;

        if header.payload != offset || header.free {
            return None;
        }

        match self.validation {
            Validation::Header => Some(block),
            Validation::Walk => Blocks::new(memory, Some(head))
                .map_while(Result::ok)
                .any(|(at, _)| at == block)
                .then_some(block),
        }
    }

    /// Extends the break and formats the new memory as an allocated block
    /// of `size` bytes linked after `last`.
    fn grow(&mut self, last: Option<BlockRef>, size: usize) -> Result<BlockRef, AllocError> {
        let increment = size.checked_add(HEADER_SIZE).ok_or(AllocError::OutOfMemory)?;
        let at = self.brk.current();

        if at.checked_add(increment).is_none_or(|end| end > MAX_OFFSET) {
            return Err(AllocError::OutOfMemory);
        }

        let Some(old) = self.brk.extend(increment) else {
            log::debug!("program break refused to grow by {increment} bytes");
            return Err(AllocError::OutOfMemory);
        };

        let block = BlockRef(old);
        list::insert_after(self.brk.memory_mut(), last, block, Header::new(block, size, false))?;

        log::debug!("grew heap by {increment} bytes, break now at {:#x}", self.end());

        Ok(block)
    }

    /// Takes the free `block` for a request of `size` bytes.
    fn claim(&mut self, block: BlockRef, size: usize) -> Result<(), AllocError> {
        let memory = self.brk.memory_mut();
        coalesce::split(memory, block, size)?;

        let mut header = Header::load(memory, block)?;
        header.free = false;
        header.store(memory, block)
    }

    /// Gives the tail of `block` beyond `size` bytes back as a free block.
    fn trim(&mut self, block: BlockRef, size: usize) -> Result<(), AllocError> {
        if let Some(remainder) = coalesce::split(self.brk.memory_mut(), block, size)? {
            self.settle(remainder)?;
        }

        Ok(())
    }

    fn free_block(&mut self, mut block: BlockRef) -> Result<(), AllocError> {
        let memory = self.brk.memory_mut();
        let mut header = Header::load(memory, block)?;
        header.free = true;
        header.store(memory, block)?;

        if let Some(prev) = header.prev {
            if Header::load(memory, prev)?.free {
                coalesce::fuse(memory, prev)?;
                block = prev;
            }
        }

        self.settle(block)
    }

    /// Fuses the free `block` with a free successor, then returns it to the
    /// program break if nothing follows it.
    fn settle(&mut self, block: BlockRef) -> Result<(), AllocError> {
        let memory = self.brk.memory_mut();
        coalesce::fuse(memory, block)?;

        let header = Header::load(memory, block)?;
        if header.next.is_some() {
            return Ok(());
        }

        list::set_next(memory, header.prev, None)?;
        if header.prev.is_none() {
            self.head = None;
        }
        self.brk.shrink_to(block.0);

        log::debug!("returned {} bytes, break now at {:#x}", HEADER_SIZE + header.size, block.0);

        Ok(())
    }
}

impl<B: ProgramBreak> fmt::Display for Heap<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        writeln!(
            f,
            "heap [{:#x}, {:#x}) {} blocks, {} used, {} free",
            self.start,
            self.end(),
            stats.blocks,
            stats.used_bytes,
            stats.free_bytes
        )?;

        for block in self.blocks() {
            writeln!(
                f,
                "  {:#08x} {} {:>8} bytes at {}",
                block.offset,
                if block.free { "free" } else { "used" },
                block.size,
                block.ptr
            )?;
        }

        Ok(())
    }
}

use crate::{
    block::{BlockRef, Header},
    error::AllocError,
};

/// Iterator over the block list stored in the heap memory, in address order.
///
/// Each item is the header offset together with the decoded header. A link
/// pointing outside the memory yields one `Err` and ends the walk.
pub(crate) struct Blocks<'a> {
    memory: &'a [u8],
    current: Option<BlockRef>,
}

impl<'a> Blocks<'a> {
    pub fn new(memory: &'a [u8], head: Option<BlockRef>) -> Self {
        Self { memory, current: head }
    }
}

impl Iterator for Blocks<'_> {
    type Item = Result<(BlockRef, Header), AllocError>;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.current?;

        match Header::load(self.memory, at) {
            Ok(header) => {
                // Links only ever point forward. Anything else would loop.
                self.current = header.next.filter(|next| *next > at);
                Some(Ok((at, header)))
            }
            Err(err) => {
                self.current = None;
                Some(Err(err))
            }
        }
    }
}

/// Links `block` right after `prev` and before whatever followed `prev`.
///
/// The header of `block` is rewritten with the new links, so only its `free`,
/// `size` and `payload` fields are taken from `header`.
pub(crate) fn insert_after(
    memory: &mut [u8],
    prev: Option<BlockRef>,
    block: BlockRef,
    mut header: Header,
) -> Result<(), AllocError> {
    header.prev = prev;
    header.next = None;

    if let Some(prev) = prev {
        let mut prev_header = Header::load(memory, prev)?;
        header.next = prev_header.next;
        prev_header.next = Some(block);
        prev_header.store(memory, prev)?;
    }

    if let Some(next) = header.next {
        let mut next_header = Header::load(memory, next)?;
        next_header.prev = Some(block);
        next_header.store(memory, next)?;
    }

    header.store(memory, block)
}

/// Points the `prev` link of `block` (if any) at `prev`.
pub(crate) fn set_prev(
    memory: &mut [u8],
    block: Option<BlockRef>,
    prev: Option<BlockRef>,
) -> Result<(), AllocError> {
    if let Some(block) = block {
        let mut header = Header::load(memory, block)?;
        header.prev = prev;
        header.store(memory, block)?;
    }

    Ok(())
}

/// Points the `next` link of `block` (if any) at `next`.
pub(crate) fn set_next(
    memory: &mut [u8],
    block: Option<BlockRef>,
    next: Option<BlockRef>,
) -> Result<(), AllocError> {
    if let Some(block) = block {
        let mut header = Header::load(memory, block)?;
        header.next = next;
        header.store(memory, block)?;
    }

    Ok(())
}

use crate::{
    block::{BlockRef, Header},
    error::AllocError,
};

/// Policy used to pick a free block for a request.
///
/// Every policy walks the block list from the head. Ties go to the block
/// closest to the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// The first free block big enough. Shortest searches, more fragmentation
    /// over time.
    #[default]
    First,
    /// The free block leaving the least unused space. Stops early on an exact
    /// match, otherwise visits every block.
    Best,
    /// The biggest free block, so the leftover stays as large as possible.
    Worst,
}

impl Fit {
    /// Returns a free block of at least `size` payload bytes, if any.
    ///
    /// `last` is advanced over every block visited, so when nothing is found it
    /// ends up at the tail of the list, which is where the heap has to grow.
    pub(crate) fn locate(
        self,
        memory: &[u8],
        head: BlockRef,
        size: usize,
        last: &mut BlockRef,
    ) -> Result<Option<BlockRef>, AllocError> {
        let mut current = Some(head);
        let mut chosen: Option<(BlockRef, usize)> = None;

        while let Some(at) = current {
            let header = Header::load(memory, at)?;

            if header.free && header.size >= size {
                match self {
                    Fit::First => return Ok(Some(at)),
                    Fit::Best => {
                        let waste = header.size - size;
                        if chosen.is_none_or(|(_, best)| waste < best) {
                            chosen = Some((at, waste));
                        }
                        if waste == 0 {
                            break;
                        }
                    }
                    Fit::Worst => {
                        if chosen.is_none_or(|(_, worst)| header.size > worst) {
                            chosen = Some((at, header.size));
                        }
                    }
                }
            }

            *last = at;
            current = header.next;
        }

        if let Some((at, _)) = chosen {
            log::trace!("{:?} fit for {size} bytes picked block {:#x}", self, at.0);
        }

        Ok(chosen.map(|(at, _)| at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{block::HEADER_SIZE, list::insert_after};

    /// Lays out blocks with the given `(size, free)` pairs back to back.
    fn layout(blocks: &[(usize, bool)]) -> (Vec<u8>, Vec<BlockRef>) {
        let total: usize = blocks.iter().map(|(size, _)| size + HEADER_SIZE).sum();
        let mut memory = vec![0u8; total];
        let mut refs = Vec::new();
        let mut offset = 0;

        for &(size, free) in blocks {
            let at = BlockRef(offset);
            insert_after(&mut memory, refs.last().copied(), at, Header::new(at, size, free)).unwrap();
            refs.push(at);
            offset += size + HEADER_SIZE;
        }

        (memory, refs)
    }

    fn locate(fit: Fit, blocks: &[(usize, bool)], size: usize) -> (Option<usize>, usize) {
        let (memory, refs) = layout(blocks);
        let mut last = refs[0];
        let found = fit.locate(&memory, refs[0], size, &mut last).unwrap();
        let index = |b: BlockRef| refs.iter().position(|r| *r == b).unwrap();

        (found.map(index), index(last))
    }

    const BLOCKS: &[(usize, bool)] = &[
        (8, false),
        (32, true),
        (16, true),
        (4, false),
        (64, true),
        (16, true),
        (8, false),
    ];

    #[test]
    fn first_fit_takes_first_suitable_block() {
        assert_eq!(locate(Fit::First, BLOCKS, 12).0, Some(1));
        assert_eq!(locate(Fit::First, BLOCKS, 40).0, Some(4));
    }

    #[test]
    fn first_fit_cursor_stops_before_found_block() {
        assert_eq!(locate(Fit::First, BLOCKS, 40), (Some(4), 3));
    }

    #[test]
    fn best_fit_minimises_waste() {
        assert_eq!(locate(Fit::Best, BLOCKS, 12).0, Some(2));
        assert_eq!(locate(Fit::Best, BLOCKS, 20).0, Some(1));
    }

    #[test]
    fn best_fit_stops_on_exact_match() {
        // Block 2 is an exact match; the equally exact block 5 is never reached.
        assert_eq!(locate(Fit::Best, BLOCKS, 16), (Some(2), 1));
    }

    #[test]
    fn best_fit_prefers_earliest_on_ties() {
        let blocks = &[(24, true), (4, false), (24, true), (4, false)];

        assert_eq!(locate(Fit::Best, blocks, 12).0, Some(0));
    }

    #[test]
    fn worst_fit_takes_largest_block() {
        assert_eq!(locate(Fit::Worst, BLOCKS, 4), (Some(4), 6));
    }

    #[test]
    fn worst_fit_prefers_earliest_on_ties() {
        let blocks = &[(4, false), (16, true), (4, false), (16, true), (4, false)];

        assert_eq!(locate(Fit::Worst, blocks, 8).0, Some(1));
    }

    #[test]
    fn nothing_found_leaves_cursor_on_tail() {
        for fit in [Fit::First, Fit::Best, Fit::Worst] {
            assert_eq!(locate(fit, BLOCKS, 128), (None, 6));
        }
    }

    #[test]
    fn allocated_blocks_are_never_chosen() {
        let blocks = &[(64, false), (64, false)];

        for fit in [Fit::First, Fit::Best, Fit::Worst] {
            assert_eq!(locate(fit, blocks, 4).0, None);
        }
    }
}

/// This trait provides an abstraction over a "program break": one contiguous
/// region of memory that can be extended or retracted at its end only. The
/// allocator builds its whole heap on top of it and never needs to know where
/// the bytes really come from.
///
/// Offsets handed out by the break start at zero and are all relative to the
/// slice returned by [`ProgramBreak::memory`].
pub trait ProgramBreak {
    /// Current end of the region, that is the number of usable bytes.
    fn current(&self) -> usize;

    /// Extends the region by exactly `increment` bytes and returns the old
    /// end, or `None` without changing anything if it cannot grow.
    fn extend(&mut self, increment: usize) -> Option<usize>;

    /// Moves the end of the region back to `end`. Values beyond the current
    /// end are ignored.
    fn shrink_to(&mut self, end: usize);

    /// Bytes in `[0, current)`.
    fn memory(&self) -> &[u8];

    /// Bytes in `[0, current)`.
    fn memory_mut(&mut self) -> &mut [u8];
}

/// A program break backed by a plain `Vec<u8>` with an upper `limit`.
///
/// Memory given back with [`ProgramBreak::shrink_to`] keeps its bytes, so a
/// later extension may hand out stale content exactly like a real break.
#[derive(Debug, Clone)]
pub struct Arena {
    bytes: Vec<u8>,
    end: usize,
    limit: usize,
}

impl Arena {
    /// Arena able to grow up to `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            end: 0,
            limit,
        }
    }

    /// Maximum number of bytes this arena will ever hand out.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl ProgramBreak for Arena {
    fn current(&self) -> usize {
        self.end
    }

    fn extend(&mut self, increment: usize) -> Option<usize> {
        let old = self.end;
        let new = old.checked_add(increment).filter(|new| *new <= self.limit)?;

        if new > self.bytes.len() {
            self.bytes.resize(new, 0);
        }
        self.end = new;

        Some(old)
    }

    fn shrink_to(&mut self, end: usize) {
        self.end = self.end.min(end);
    }

    fn memory(&self) -> &[u8] {
        &self.bytes[..self.end]
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.end]
    }
}

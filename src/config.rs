use crate::{brk::Arena, fit::Fit};

/// How thoroughly a pointer is checked before it is released or resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Bounds, alignment and the header in front of the pointer must agree:
    /// it records the pointer as its payload and is not free. Constant time.
    #[default]
    Header,
    /// Everything [`Validation::Header`] checks, and the header must also be
    /// reachable from the head of the block list. Linear in the number of
    /// blocks, but immune to payload bytes that happen to look like a header.
    Walk,
}

/// Settings for a [`crate::Heap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Block selection policy.
    pub fit: Fit,
    /// Pointer validation mode.
    pub validation: Validation,
    /// Limit in bytes of the arena built by [`HeapConfig::arena`].
    pub limit: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            fit: Fit::First,
            validation: Validation::Header,
            limit: 1 << 20,
        }
    }
}

impl HeapConfig {
    pub fn with_fit(mut self, fit: Fit) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// A fresh [`Arena`] honouring [`HeapConfig::limit`].
    pub fn arena(&self) -> Arena {
        Arena::new(self.limit)
    }
}

//! # Handles
//!
//! Handles are lightweight identifiers consisting of:
//! - A slot index into a pool's storage
//! - A generation counter for safe reuse

use bytemuck::{Pod, Zeroable};

/// Identifier for a pooled object.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Slot index into the pool
/// - Upper 32 bits: Generation counter for detecting stale references
///
/// The pool bumps a slot's generation every time the slot is released, so a
/// handle captured before a recycle never matches the next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Creates a new handle from slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the slot index portion of the handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Null/invalid handle.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this handle is null.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NULL
    }
}

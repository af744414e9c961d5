//! # Kaleido Core
//!
//! Pooling and identity for the Kaleido world-state manager.
//!
//! ## Architecture Rules
//!
//! 1. **Recycle, never drop** - released objects keep their buffers
//! 2. **Generational handles** - a handle is (slot index, generation), never a pointer
//! 3. **Explicit staleness** - every dereference checks the generation
//!
//! ## Example
//!
//! ```rust,ignore
//! use kaleido_core::{Pool, Poolable};
//!
//! let mut pool: Pool<Shape> = Pool::new();
//! let handle = pool.acquire_with(kind, Shape::default);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;

pub use memory::{Handle, Pool, Poolable, SharedPool};

//! # Memory Management
//!
//! Recycling pools and generational handles.
//!
//! ## Design Philosophy
//!
//! Objects are recycled, not dropped. During steady-state play:
//! - No heap allocations once every free list has warmed up
//! - Every handle carries a generation, so stale handles are detected
//! - Pools grow on demand; running out of slots is not an error

mod handle;
mod pool;
mod shared;

pub use handle::Handle;
pub use pool::{Pool, Poolable};
pub use shared::SharedPool;

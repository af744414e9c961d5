//! # Shared Pool
//!
//! Mutex-guarded pool for the rare case a pool must be reachable from more
//! than one thread. The simulation thread should own a plain [`Pool`].

use parking_lot::{Mutex, MutexGuard};

use super::handle::Handle;
use super::pool::{Pool, Poolable};

/// A [`Pool`] behind a `parking_lot` mutex.
///
/// Every operation takes the lock for its own duration only; use
/// [`lock`](Self::lock) to batch several operations under one acquisition.
#[derive(Debug)]
pub struct SharedPool<T> {
    inner: Mutex<Pool<T>>,
}

impl<T: Poolable> SharedPool<T> {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool<T>) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// Locks the pool.
    pub fn lock(&self) -> MutexGuard<'_, Pool<T>> {
        self.inner.lock()
    }

    /// Acquires an object of `kind`, see [`Pool::acquire_with`].
    pub fn acquire_with(&self, kind: usize, create: impl FnOnce() -> T) -> Handle {
        self.inner.lock().acquire_with(kind, create)
    }

    /// Releases an object, see [`Pool::release`].
    pub fn release(&self, handle: Handle) -> bool {
        self.inner.lock().release(handle)
    }

    /// Checks whether `handle` is still live.
    #[must_use]
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.inner.lock().is_valid(handle)
    }

    /// Unwraps the pool.
    pub fn into_inner(self) -> Pool<T> {
        self.inner.into_inner()
    }
}

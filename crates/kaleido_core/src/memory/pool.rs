//! # Recycling Pool
//!
//! Free-list allocator for objects that are frequently acquired and released.
//!
//! Released objects are not dropped: they are reset in place and parked on the
//! free list of their kind, so any heap buffers they own are reused by the next
//! occupant. Once warmed up, acquire/release cycles do not allocate.

use super::handle::Handle;

/// An object that can live in a [`Pool`].
pub trait Poolable {
    /// Resets every persisted field to its default.
    ///
    /// Called by [`Pool::release`] before the slot goes back on a free list.
    /// Must be safe to call on an object that was never fully initialized.
    fn recycle(&mut self);
}

/// One storage slot.
#[derive(Debug)]
struct Slot<T> {
    /// Bumped on every release.
    generation: u32,
    /// Free-list key the slot belongs to.
    kind: u32,
    /// Whether a live handle currently owns this slot.
    live: bool,
    /// `None` while the object is checked out.
    value: Option<T>,
}

/// A pool keyed by kind.
///
/// Each kind has its own free list; a slot acquired as kind `k` only ever
/// returns to the free list of `k`. Acquisition never fails: when the free
/// list is empty the pool grows by one slot.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use [`SharedPool`](super::SharedPool) when it
/// has to be reachable from more than one thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: Pool<Particle> = Pool::new();
/// let handle = pool.acquire_with(0, Particle::default);
/// pool.release(handle);
/// assert!(pool.get(handle).is_none()); // stale
/// ```
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free_lists: Vec<Vec<u32>>,
    live_count: usize,
}

impl<T: Poolable> Pool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_lists: Vec::new(),
            live_count: 0,
        }
    }

    /// Creates a pool with room for `capacity` slots before it reallocates.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_lists: Vec::new(),
            live_count: 0,
        }
    }

    /// Returns the number of live objects.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns the total number of slots ever created.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of parked objects of `kind`.
    #[must_use]
    pub fn free_count(&self, kind: usize) -> usize {
        self.free_lists.get(kind).map_or(0, Vec::len)
    }

    /// Acquires an object of `kind`.
    ///
    /// Pops the kind's free list when possible, reusing the slot and its
    /// recycled object. Otherwise a new slot is created with `create`.
    pub fn acquire_with(&mut self, kind: usize, create: impl FnOnce() -> T) -> Handle {
        if self.free_lists.len() <= kind {
            self.free_lists.resize_with(kind + 1, Vec::new);
        }
        self.live_count += 1;

        if let Some(index) = self.free_lists[kind].pop() {
            let slot = &mut self.slots[index as usize];
            slot.live = true;
            return Handle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            kind: kind as u32,
            live: true,
            value: Some(create()),
        });
        Handle::new(index, 0)
    }

    /// Releases a live object back to its kind's free list.
    ///
    /// The object is recycled and the slot generation bumped, which makes
    /// `handle` and every copy of it stale.
    ///
    /// # Returns
    ///
    /// `false` if the handle was stale, null, or currently checked out.
    pub fn release(&mut self, handle: Handle) -> bool {
        let Some(slot) = self.live_slot_mut(handle) else {
            return false;
        };
        let Some(value) = slot.value.as_mut() else {
            return false;
        };

        value.recycle();
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        let kind = slot.kind as usize;

        self.free_lists[kind].push(handle.index());
        self.live_count -= 1;
        true
    }

    /// Checks whether `handle` still refers to its original occupant.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Returns the kind `handle` was acquired as.
    #[must_use]
    pub fn kind_of(&self, handle: Handle) -> Option<usize> {
        self.live_slot(handle).map(|slot| slot.kind as usize)
    }

    /// Gets a reference to a live object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.live_slot(handle)?.value.as_ref()
    }

    /// Gets a mutable reference to a live object.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.live_slot_mut(handle)?.value.as_mut()
    }

    /// Moves a live object out of its slot without releasing the slot.
    ///
    /// The handle stays valid but [`get`](Self::get) returns `None` until the
    /// object is returned with [`checkin`](Self::checkin). This lets a caller
    /// mutate one object while reading its neighbours.
    pub fn checkout(&mut self, handle: Handle) -> Option<T> {
        self.live_slot_mut(handle)?.value.take()
    }

    /// Returns an object taken with [`checkout`](Self::checkout).
    ///
    /// Hands the value back if the handle went stale or the slot is occupied.
    pub fn checkin(&mut self, handle: Handle, value: T) -> Result<(), T> {
        match self.live_slot_mut(handle) {
            Some(slot) if slot.value.is_none() => {
                slot.value = Some(value);
                Ok(())
            }
            _ => Err(value),
        }
    }

    /// Iterates over all live objects.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let value = slot.value.as_ref().filter(|_| slot.live)?;
            Some((Handle::new(index as u32, slot.generation), value))
        })
    }

    fn live_slot(&self, handle: Handle) -> Option<&Slot<T>> {
        if handle.is_null() {
            return None;
        }
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.live && slot.generation == handle.generation())
    }

    fn live_slot_mut(&mut self, handle: Handle) -> Option<&mut Slot<T>> {
        if handle.is_null() {
            return None;
        }
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.live && slot.generation == handle.generation())
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! # Shape References
//!
//! Shapes never point at each other. A behavior that follows another shape
//! holds a [`ShapeInstance`]: before the resolve pass it is the target's save
//! index, afterwards a generational [`ShapeRef`] that is checked on every use.

use kaleido_core::Handle;
use kaleido_shared::Vec3;

use crate::factory::ShapeFactory;
use crate::shape::Shape;

/// A live shape: originating factory plus pool handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeRef {
    /// Factory id the shape was acquired from.
    pub factory: u32,
    /// Handle into that factory's pool.
    pub handle: Handle,
}

/// Reference from a behavior to another shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShapeInstance {
    /// No target.
    #[default]
    None,
    /// Loaded but not yet resolved: position of the target in the save.
    Unresolved(usize),
    /// Resolved; valid while the handle's generation matches.
    Resolved(ShapeRef),
}

impl ShapeInstance {
    /// Target save index read from a stream; negative means none.
    #[must_use]
    pub fn from_save_index(index: i32) -> Self {
        usize::try_from(index).map_or(Self::None, Self::Unresolved)
    }

    /// Turns a save index into a live reference.
    ///
    /// Indices with no live shape behind them resolve to [`ShapeInstance::None`].
    pub fn resolve(&mut self, shapes: &ShapeLookup<'_>) {
        if let Self::Unresolved(index) = *self {
            *self = shapes
                .by_save_index(index)
                .map_or(Self::None, Self::Resolved);
        }
    }

    /// The target, if it is still the shape this reference was made for.
    #[must_use]
    pub fn get<'a>(&self, shapes: &ShapeLookup<'a>) -> Option<&'a Shape> {
        match *self {
            Self::Resolved(target) => shapes.get(target),
            _ => None,
        }
    }

    /// Save index of the target, or -1 if the target is gone.
    #[must_use]
    pub fn save_index(&self, shapes: &ShapeLookup<'_>) -> i32 {
        match *self {
            Self::Resolved(target) => shapes.save_index_of(target).map_or(-1, |index| index as i32),
            Self::Unresolved(index) => index as i32,
            Self::None => -1,
        }
    }
}

/// Read-only view over every live shape.
#[derive(Clone, Copy)]
pub struct ShapeLookup<'a> {
    factories: &'a [ShapeFactory],
    live: &'a [ShapeRef],
}

impl<'a> ShapeLookup<'a> {
    /// Creates a view over the factories and the live collection.
    #[must_use]
    pub const fn new(factories: &'a [ShapeFactory], live: &'a [ShapeRef]) -> Self {
        Self { factories, live }
    }

    /// Gets a shape if `target` is still live.
    #[must_use]
    pub fn get(&self, target: ShapeRef) -> Option<&'a Shape> {
        self.factories.get(target.factory as usize)?.shape(target.handle)
    }

    /// Local position of a live shape.
    #[must_use]
    pub fn position_of(&self, target: ShapeRef) -> Option<Vec3> {
        self.get(target).map(|shape| shape.transform.position)
    }

    /// Position of `target` in the live collection.
    #[must_use]
    pub fn save_index_of(&self, target: ShapeRef) -> Option<usize> {
        let index = self.get(target)?.save_index();
        (self.live.get(index) == Some(&target)).then_some(index)
    }

    /// The live shape at `index`.
    #[must_use]
    pub fn by_save_index(&self, index: usize) -> Option<ShapeRef> {
        self.live
            .get(index)
            .copied()
            .filter(|&target| self.get(target).is_some())
    }

    /// Number of live shapes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live.len()
    }

    /// True when no shape is live.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

//! # Shape Factories
//!
//! A factory owns the pool its shapes are recycled through. Each shape kind
//! has its own free list, so a recycled shape keeps a color buffer sized for
//! its kind.

use kaleido_core::{Handle, Pool};

use crate::config::{FactoryConfig, ShapeDefinition};
use crate::error::{WorldError, WorldResult};
use crate::shape::Shape;

/// Produces and reclaims shapes of one catalog.
#[derive(Debug)]
pub struct ShapeFactory {
    id: u32,
    shapes: Vec<ShapeDefinition>,
    material_count: u32,
    pool: Pool<Shape>,
}

impl ShapeFactory {
    /// Creates a factory with the given id from its configuration.
    #[must_use]
    pub fn new(id: u32, config: &FactoryConfig) -> Self {
        Self {
            id,
            shapes: config.shapes.clone(),
            material_count: config.materials,
            pool: Pool::new(),
        }
    }

    /// Factory id, as stored in saves.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Number of shape kinds.
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of materials.
    #[must_use]
    pub const fn material_count(&self) -> u32 {
        self.material_count
    }

    /// Catalog entry for a shape id.
    #[must_use]
    pub fn definition(&self, shape_id: u32) -> Option<&ShapeDefinition> {
        self.shapes.get(shape_id as usize)
    }

    /// Live shapes produced by this factory.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Recycled shapes of `shape_id` waiting for reuse.
    #[must_use]
    pub fn free_count(&self, shape_id: u32) -> usize {
        self.pool.free_count(shape_id as usize)
    }

    /// Acquires a shape of the given kind and material.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownShape`] or [`WorldError::UnknownMaterial`] when the
    /// ids fall outside the catalog.
    pub fn get(&mut self, shape_id: i32, material_id: i32) -> WorldResult<Handle> {
        let parts = usize::try_from(shape_id)
            .ok()
            .and_then(|index| self.shapes.get(index))
            .map(|definition| definition.parts)
            .ok_or(WorldError::UnknownShape {
                factory: self.id as i32,
                shape: shape_id,
            })?;
        let material = u32::try_from(material_id)
            .ok()
            .filter(|&material| material < self.material_count)
            .ok_or(WorldError::UnknownMaterial {
                factory: self.id as i32,
                material: material_id,
            })?;

        let (factory_id, kind) = (self.id, shape_id as u32);
        let handle = self
            .pool
            .acquire_with(kind as usize, || Shape::new(factory_id, kind, parts));
        if let Some(shape) = self.pool.get_mut(handle) {
            shape.set_material(material);
        }
        Ok(handle)
    }

    /// Returns a shape to its free list. Its behaviors must already be released.
    pub fn reclaim(&mut self, handle: Handle) -> bool {
        debug_assert!(
            self.pool.get(handle).map_or(true, |shape| shape.behaviors().is_empty()),
            "shape reclaimed with behaviors attached"
        );
        self.pool.release(handle)
    }

    /// Gets a live shape.
    #[inline]
    #[must_use]
    pub fn shape(&self, handle: Handle) -> Option<&Shape> {
        self.pool.get(handle)
    }

    /// Gets a live shape mutably.
    #[inline]
    pub fn shape_mut(&mut self, handle: Handle) -> Option<&mut Shape> {
        self.pool.get_mut(handle)
    }

    /// Moves a shape out for one update, see [`Pool::checkout`].
    pub(crate) fn checkout(&mut self, handle: Handle) -> Option<Shape> {
        self.pool.checkout(handle)
    }

    /// Puts a checked-out shape back.
    pub(crate) fn checkin(&mut self, handle: Handle, shape: Shape) -> Result<(), Shape> {
        self.pool.checkin(handle, shape)
    }
}

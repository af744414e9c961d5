//! # Shapes
//!
//! The pooled entity. A shape owns its transform, one color per part, its
//! age and the handles of its behaviors; the behaviors themselves live in
//! the [`BehaviorPool`].
//!
//! ## Persisted payload
//!
//! ```text
//! Transform                          all versions
//! i32 count, count × Color           v >= 5
//! Color                              v 1..=4, applied to every part
//! f32 age, i32 count, (tag, payload)* v >= 6
//! Vec3 angular velocity, Vec3 velocity   v 4..=5
//! ```

use kaleido_core::{Handle, Poolable};
use kaleido_shared::{Color, GameDataReader, GameDataWriter, Transform, Vec3};

use crate::behavior::{
    Behavior, BehaviorKind, BehaviorPool, BehaviorStatus, MovementBehavior, RotationBehavior,
    TickContext,
};
use crate::error::{WorldError, WorldResult};
use crate::reference::ShapeLookup;

/// A shape entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    factory_id: u32,
    shape_id: u32,
    material_id: u32,
    /// Local transform.
    pub transform: Transform,
    colors: Vec<Color>,
    age: f32,
    save_index: usize,
    behaviors: Vec<Handle>,
}

impl Shape {
    /// Creates a white shape with `parts` colors.
    #[must_use]
    pub fn new(factory_id: u32, shape_id: u32, parts: usize) -> Self {
        Self {
            factory_id,
            shape_id,
            material_id: 0,
            transform: Transform::IDENTITY,
            colors: vec![Color::WHITE; parts],
            age: 0.0,
            save_index: 0,
            behaviors: Vec::new(),
        }
    }

    /// Factory the shape came from.
    #[inline]
    #[must_use]
    pub const fn factory_id(&self) -> u32 {
        self.factory_id
    }

    /// Shape kind within the factory.
    #[inline]
    #[must_use]
    pub const fn shape_id(&self) -> u32 {
        self.shape_id
    }

    /// Material index within the factory.
    #[inline]
    #[must_use]
    pub const fn material_id(&self) -> u32 {
        self.material_id
    }

    /// Seconds since the shape was spawned.
    #[inline]
    #[must_use]
    pub const fn age(&self) -> f32 {
        self.age
    }

    /// Position in the live collection.
    #[inline]
    #[must_use]
    pub const fn save_index(&self) -> usize {
        self.save_index
    }

    /// Part colors.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Attached behavior handles, in update order.
    #[must_use]
    pub fn behaviors(&self) -> &[Handle] {
        &self.behaviors
    }

    pub(crate) fn set_material(&mut self, material_id: u32) {
        self.material_id = material_id;
    }

    pub(crate) fn set_save_index(&mut self, index: usize) {
        self.save_index = index;
    }

    #[cfg(test)]
    pub(crate) fn set_age(&mut self, age: f32) {
        self.age = age;
    }

    /// Sets every part to `color`.
    pub fn set_color(&mut self, color: Color) {
        self.colors.fill(color);
    }

    /// Sets one part. Out-of-range parts are ignored.
    pub fn set_color_at(&mut self, index: usize, color: Color) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
    }

    /// Attaches an initialized behavior.
    pub fn attach(&mut self, pool: &mut BehaviorPool, behavior: Behavior) -> Handle {
        let handle = pool.insert(behavior);
        self.behaviors.push(handle);
        handle
    }

    /// Attaches a zero-initialized behavior of `kind`; fill it in through the pool.
    pub fn attach_behavior(&mut self, pool: &mut BehaviorPool, kind: BehaviorKind) -> Handle {
        let handle = pool.acquire(kind);
        self.behaviors.push(handle);
        handle
    }

    /// Ages the shape and runs its behaviors in order.
    ///
    /// Expired behaviors are removed in place without disturbing the order of
    /// the rest. A satellite whose focal shape is gone is replaced by a
    /// movement carrying its last velocity, appended to the list and run in
    /// the same update.
    pub fn tick(&mut self, pool: &mut BehaviorPool, ctx: &TickContext<'_>) {
        self.age += ctx.delta_time;
        let mut behaviors = std::mem::take(&mut self.behaviors);
        let mut i = 0;
        while i < behaviors.len() {
            let status = match pool.get_mut(behaviors[i]) {
                Some(behavior) => behavior.update(self, ctx),
                None => BehaviorStatus::Expire,
            };
            match status {
                BehaviorStatus::Continue => i += 1,
                BehaviorStatus::Expire => {
                    pool.release(behaviors.remove(i));
                }
                BehaviorStatus::Escape { velocity } => {
                    pool.release(behaviors.remove(i));
                    tracing::debug!(save_index = self.save_index, "satellite lost its focal shape");
                    behaviors.push(pool.insert(MovementBehavior::new(velocity).into()));
                }
            }
        }
        self.behaviors = behaviors;
    }

    /// Writes the shape payload (ids are written by the caller).
    pub fn save(&self, writer: &mut GameDataWriter, pool: &BehaviorPool, shapes: &ShapeLookup<'_>) {
        writer.write_transform(&self.transform);
        writer.write_count(self.colors.len());
        for &color in &self.colors {
            writer.write_color(color);
        }
        writer.write_float(self.age);

        let attached = || self.behaviors.iter().filter_map(move |&handle| pool.get(handle));
        writer.write_count(attached().count());
        for behavior in attached() {
            writer.write_int(behavior.kind().tag());
            behavior.save(writer, shapes);
        }
    }

    /// Reads the shape payload at the reader's version.
    ///
    /// Behaviors are attached as they are read, so on error the caller must
    /// still [`release_behaviors`](Self::release_behaviors).
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownBehavior`] for an unknown tag, otherwise
    /// truncation errors.
    pub fn load(&mut self, reader: &mut GameDataReader<'_>, pool: &mut BehaviorPool) -> WorldResult<()> {
        let version = reader.version();
        self.transform = reader.read_transform()?;
        self.load_colors(reader)?;

        if version >= 6 {
            self.age = reader.read_float()?;
            let count = reader.read_count()?;
            for _ in 0..count {
                let tag = reader.read_int()?;
                let kind = BehaviorKind::from_tag(tag).ok_or(WorldError::UnknownBehavior(tag))?;
                let handle = self.attach_behavior(pool, kind);
                if let Some(behavior) = pool.get_mut(handle) {
                    behavior.load(reader)?;
                }
            }
        } else if version >= 4 {
            let angular_velocity = reader.read_vector3()?;
            let velocity = reader.read_vector3()?;
            self.attach(pool, RotationBehavior::new(angular_velocity).into());
            self.attach(pool, MovementBehavior::new(velocity).into());
        }
        Ok(())
    }

    /// Reads colors, surplus stored colors are consumed and dropped, missing
    /// parts become white.
    fn load_colors(&mut self, reader: &mut GameDataReader<'_>) -> WorldResult<()> {
        let version = reader.version();
        if version >= 5 {
            let count = reader.read_count()?;
            for index in 0..count {
                let color = reader.read_color()?;
                self.set_color_at(index, color);
            }
            if let Some(missing) = self.colors.get_mut(count..) {
                missing.fill(Color::WHITE);
            }
        } else if version > 0 {
            let color = reader.read_color()?;
            self.set_color(color);
        } else {
            self.set_color(Color::WHITE);
        }
        Ok(())
    }

    /// Returns every attached behavior to the pool.
    pub fn release_behaviors(&mut self, pool: &mut BehaviorPool) {
        for handle in self.behaviors.drain(..) {
            pool.release(handle);
        }
    }

    /// Second load pass: behaviors holding save indices link to live shapes.
    pub fn resolve_references(&self, pool: &mut BehaviorPool, shapes: &ShapeLookup<'_>) {
        for &handle in &self.behaviors {
            if let Some(behavior) = pool.get_mut(handle) {
                behavior.resolve_references(shapes);
            }
        }
    }

    /// Current velocity contributed by movement behaviors.
    #[must_use]
    pub fn velocity(&self, pool: &BehaviorPool) -> Vec3 {
        self.behaviors
            .iter()
            .filter_map(|&handle| match pool.get(handle) {
                Some(Behavior::Movement(movement)) => Some(movement.velocity),
                _ => None,
            })
            .fold(Vec3::ZERO, |sum, velocity| sum + velocity)
    }
}

impl Poolable for Shape {
    fn recycle(&mut self) {
        self.material_id = 0;
        self.transform = Transform::IDENTITY;
        self.colors.fill(Color::WHITE);
        self.age = 0.0;
        self.save_index = 0;
        self.behaviors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{OscillationBehavior, SatelliteBehavior};
    use crate::reference::ShapeInstance;
    use kaleido_shared::Quaternion;

    const SENTINEL: i32 = 0x5EED;

    fn lookup() -> ShapeLookup<'static> {
        ShapeLookup::new(&[], &[])
    }

    fn red(shade: f32) -> Color {
        Color::new(shade, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_surplus_colors_are_discarded() {
        let mut writer = GameDataWriter::headerless();
        writer.write_transform(&Transform::IDENTITY);
        writer.write_count(5);
        for i in 0..5 {
            writer.write_color(red(i as f32 / 10.0));
        }
        writer.write_float(0.0);
        writer.write_count(0);
        writer.write_int(SENTINEL);
        let bytes = writer.into_bytes();

        let mut reader = GameDataReader::with_version(&bytes, 6);
        let mut pool = BehaviorPool::new();
        let mut shape = Shape::new(0, 0, 3);
        shape.load(&mut reader, &mut pool).unwrap();

        assert_eq!(shape.colors(), &[red(0.0), red(0.1), red(0.2)]);
        assert_eq!(reader.read_int().unwrap(), SENTINEL);
    }

    #[test]
    fn test_missing_colors_default_to_white() {
        let mut writer = GameDataWriter::headerless();
        writer.write_transform(&Transform::IDENTITY);
        writer.write_count(1);
        writer.write_color(Color::BLACK);
        writer.write_float(0.0);
        writer.write_count(0);
        let bytes = writer.into_bytes();

        let mut shape = Shape::new(0, 0, 3);
        shape.set_color(red(0.5));
        shape
            .load(&mut GameDataReader::with_version(&bytes, 6), &mut BehaviorPool::new())
            .unwrap();
        assert_eq!(shape.colors(), &[Color::BLACK, Color::WHITE, Color::WHITE]);
    }

    #[test]
    fn test_version_four_synthesizes_rotation_then_movement() {
        let spin = Vec3::new(0.0, 30.0, 0.0);
        let velocity = Vec3::new(1.0, 0.0, 0.0);
        let mut writer = GameDataWriter::headerless();
        writer.write_transform(&Transform::IDENTITY);
        writer.write_color(red(1.0));
        writer.write_vector3(spin);
        writer.write_vector3(velocity);
        writer.write_int(SENTINEL);
        let bytes = writer.into_bytes();

        let mut reader = GameDataReader::with_version(&bytes, 4);
        let mut pool = BehaviorPool::new();
        let mut shape = Shape::new(0, 0, 2);
        shape.load(&mut reader, &mut pool).unwrap();

        assert_eq!(shape.colors(), &[red(1.0), red(1.0)]);
        assert_eq!(shape.age(), 0.0);
        let kinds: Vec<_> = shape
            .behaviors()
            .iter()
            .map(|&handle| pool.get(handle).unwrap().kind())
            .collect();
        assert_eq!(kinds, vec![BehaviorKind::Rotation, BehaviorKind::Movement]);
        assert_eq!(shape.velocity(&pool), velocity);
        assert_eq!(reader.read_int().unwrap(), SENTINEL);
    }

    #[test]
    fn test_version_zero_reads_transform_only() {
        let mut writer = GameDataWriter::headerless();
        writer.write_transform(&Transform::new(Vec3::X, Quaternion::IDENTITY, Vec3::ONE));
        writer.write_int(SENTINEL);
        let bytes = writer.into_bytes();

        let mut reader = GameDataReader::with_version(&bytes, 0);
        let mut shape = Shape::new(0, 0, 1);
        shape.load(&mut reader, &mut BehaviorPool::new()).unwrap();
        assert_eq!(shape.transform.position, Vec3::X);
        assert_eq!(shape.colors(), &[Color::WHITE]);
        assert_eq!(reader.read_int().unwrap(), SENTINEL);
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let mut writer = GameDataWriter::headerless();
        writer.write_transform(&Transform::IDENTITY);
        writer.write_count(1);
        writer.write_color(Color::WHITE);
        writer.write_float(1.0);
        writer.write_count(2);
        writer.write_int(BehaviorKind::Movement.tag());
        writer.write_vector3(Vec3::X);
        writer.write_int(42);
        let bytes = writer.into_bytes();

        let mut pool = BehaviorPool::new();
        let mut shape = Shape::new(0, 0, 1);
        let result = shape.load(&mut GameDataReader::with_version(&bytes, 6), &mut pool);
        assert!(matches!(result, Err(WorldError::UnknownBehavior(42))));

        shape.release_behaviors(&mut pool);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_save_load_preserves_behaviors() {
        let mut pool = BehaviorPool::new();
        let mut shape = Shape::new(0, 1, 2);
        shape.transform.position = Vec3::new(1.0, 2.0, 3.0);
        shape.set_color_at(1, Color::BLACK);
        shape.attach(&mut pool, RotationBehavior::new(Vec3::Y).into());
        shape.attach(&mut pool, OscillationBehavior::new(Vec3::Z, 2.0, 5.0).into());

        let mut writer = GameDataWriter::headerless();
        shape.save(&mut writer, &pool, &lookup());
        let bytes = writer.into_bytes();

        let mut loaded = Shape::new(0, 1, 2);
        loaded
            .load(&mut GameDataReader::with_version(&bytes, 6), &mut pool)
            .unwrap();
        assert_eq!(loaded.transform, shape.transform);
        assert_eq!(loaded.colors(), shape.colors());
        for (a, b) in shape.behaviors().iter().zip(loaded.behaviors()) {
            assert_eq!(pool.get(*a), pool.get(*b));
        }
    }

    #[test]
    fn test_expiry_keeps_remaining_order() {
        let mut pool = BehaviorPool::new();
        let mut shape = Shape::new(0, 0, 1);
        shape.attach(&mut pool, MovementBehavior::new(Vec3::X).into());
        let expiring = shape.attach(&mut pool, OscillationBehavior::new(Vec3::Y, 1.0, 0.5).into());
        shape.attach(&mut pool, MovementBehavior::new(Vec3::Z).into());

        let ctx = TickContext {
            delta_time: 1.0,
            shapes: lookup(),
        };
        shape.tick(&mut pool, &ctx);

        assert_eq!(shape.behaviors().len(), 2);
        assert!(pool.get(expiring).is_none());
        assert_eq!(shape.transform.position, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(shape.age(), 1.0);
    }

    fn orphaned_satellite(previous_position: Vec3) -> Behavior {
        SatelliteBehavior {
            previous_position,
            ..SatelliteBehavior::new(ShapeInstance::None, Vec3::Z, 1.0, 1.0)
        }
        .into()
    }

    #[test]
    fn test_every_escape_moves_in_the_same_update() {
        let mut pool = BehaviorPool::new();
        let mut shape = Shape::new(0, 0, 1);
        shape.transform.position = Vec3::X;
        shape.attach(&mut pool, orphaned_satellite(Vec3::new(0.5, 0.0, 0.0)));
        shape.attach(&mut pool, orphaned_satellite(Vec3::new(1.0, -1.0, 0.0)));

        let ctx = TickContext {
            delta_time: 0.5,
            shapes: lookup(),
        };
        shape.tick(&mut pool, &ctx);

        let behaviors: Vec<_> = shape
            .behaviors()
            .iter()
            .filter_map(|&handle| pool.get(handle).copied())
            .collect();
        assert_eq!(
            behaviors,
            vec![
                Behavior::Movement(MovementBehavior::new(Vec3::X)),
                Behavior::Movement(MovementBehavior::new(Vec3::new(0.0, 2.0, 0.0))),
            ]
        );
        assert_eq!(pool.live_count(), 2);
        assert_eq!(shape.transform.position, Vec3::new(1.5, 1.0, 0.0));
    }

    #[test]
    fn test_recycle_resets_state() {
        let mut shape = Shape::new(0, 2, 3);
        shape.set_material(2);
        shape.set_color(Color::BLACK);
        shape.transform.position = Vec3::ONE;
        shape.recycle();
        assert_eq!(shape, Shape::new(0, 2, 3));
    }
}

use std::f32::consts::TAU;

use kaleido_shared::{GameDataReader, GameDataWriter, ProtocolResult, Vec3};

use super::{BehaviorStatus, TickContext};
use crate::reference::{ShapeInstance, ShapeLookup};
use crate::shape::Shape;

/// Orbits the subject around a focal shape.
///
/// The orbit is the ellipse `focal + cos_offset * cos(t) + sin_offset * sin(t)`.
/// When the focal shape goes away the satellite escapes along its last
/// displacement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SatelliteBehavior {
    /// Shape being orbited.
    pub focal: ShapeInstance,
    /// Orbits per second.
    pub frequency: f32,
    /// Orbit axis sampled by the cosine.
    pub cos_offset: Vec3,
    /// Orbit axis sampled by the sine.
    pub sin_offset: Vec3,
    /// Position before the last update, used for the escape velocity.
    pub previous_position: Vec3,
}

impl SatelliteBehavior {
    /// Creates a satellite of `focal`.
    ///
    /// `orbit_axis` is normalized; the orbit plane spans the two directions
    /// perpendicular to it, scaled by `radius`.
    #[must_use]
    pub fn new(focal: ShapeInstance, orbit_axis: Vec3, radius: f32, frequency: f32) -> Self {
        let axis = orbit_axis.normalized();
        let mut cos_offset = Vec3::Y.cross(axis);
        if cos_offset.length_squared() < 1e-6 {
            cos_offset = Vec3::X.cross(axis);
        }
        let cos_offset = cos_offset.normalized();
        let sin_offset = cos_offset.cross(axis);
        Self {
            focal,
            frequency,
            cos_offset: cos_offset * radius,
            sin_offset: sin_offset * radius,
            previous_position: Vec3::ZERO,
        }
    }

    /// Orbit position around `center` at `age`.
    #[must_use]
    pub fn orbit_position(&self, center: Vec3, age: f32) -> Vec3 {
        let t = TAU * self.frequency * age;
        center + self.cos_offset * t.cos() + self.sin_offset * t.sin()
    }

    pub(super) fn update(&mut self, subject: &mut Shape, ctx: &TickContext<'_>) -> BehaviorStatus {
        let Some(center) = self.focal.get(&ctx.shapes).map(|focal| focal.transform.position) else {
            let velocity = if ctx.delta_time > 0.0 {
                (subject.transform.position - self.previous_position) * (1.0 / ctx.delta_time)
            } else {
                Vec3::ZERO
            };
            return BehaviorStatus::Escape { velocity };
        };
        self.previous_position = subject.transform.position;
        subject.transform.position = self.orbit_position(center, subject.age());
        BehaviorStatus::Continue
    }

    pub(super) fn save(&self, writer: &mut GameDataWriter, shapes: &ShapeLookup<'_>) {
        writer.write_int(self.focal.save_index(shapes));
        writer.write_float(self.frequency);
        writer.write_vector3(self.cos_offset);
        writer.write_vector3(self.sin_offset);
        writer.write_vector3(self.previous_position);
    }

    pub(super) fn load(&mut self, reader: &mut GameDataReader<'_>) -> ProtocolResult<()> {
        self.focal = ShapeInstance::from_save_index(reader.read_int()?);
        self.frequency = reader.read_float()?;
        self.cos_offset = reader.read_vector3()?;
        self.sin_offset = reader.read_vector3()?;
        self.previous_position = reader.read_vector3()?;
        Ok(())
    }

    pub(super) fn resolve_references(&mut self, shapes: &ShapeLookup<'_>) {
        self.focal.resolve(shapes);
    }
}

use kaleido_shared::{GameDataReader, GameDataWriter, ProtocolResult, Vec3};

use super::{BehaviorStatus, TickContext};
use crate::shape::Shape;

/// Spins the subject at a constant angular velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationBehavior {
    /// Euler degrees per second.
    pub angular_velocity: Vec3,
}

impl RotationBehavior {
    /// Creates a rotation with the given angular velocity.
    #[must_use]
    pub const fn new(angular_velocity: Vec3) -> Self {
        Self { angular_velocity }
    }

    pub(super) fn update(&mut self, subject: &mut Shape, ctx: &TickContext<'_>) -> BehaviorStatus {
        subject.transform.rotate(self.angular_velocity * ctx.delta_time);
        BehaviorStatus::Continue
    }

    pub(super) fn save(&self, writer: &mut GameDataWriter) {
        writer.write_vector3(self.angular_velocity);
    }

    pub(super) fn load(&mut self, reader: &mut GameDataReader<'_>) -> ProtocolResult<()> {
        self.angular_velocity = reader.read_vector3()?;
        Ok(())
    }
}

use kaleido_shared::{GameDataReader, GameDataWriter, ProtocolResult, Vec3};

use super::{BehaviorStatus, TickContext};
use crate::shape::Shape;

/// Moves the subject at a constant velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementBehavior {
    /// Units per second.
    pub velocity: Vec3,
}

impl MovementBehavior {
    /// Creates a movement with the given velocity.
    #[must_use]
    pub const fn new(velocity: Vec3) -> Self {
        Self { velocity }
    }

    pub(super) fn update(&mut self, subject: &mut Shape, ctx: &TickContext<'_>) -> BehaviorStatus {
        subject.transform.position += self.velocity * ctx.delta_time;
        BehaviorStatus::Continue
    }

    pub(super) fn save(&self, writer: &mut GameDataWriter) {
        writer.write_vector3(self.velocity);
    }

    pub(super) fn load(&mut self, reader: &mut GameDataReader<'_>) -> ProtocolResult<()> {
        self.velocity = reader.read_vector3()?;
        Ok(())
    }
}

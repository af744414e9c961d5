use std::f32::consts::TAU;

use kaleido_shared::{GameDataReader, GameDataWriter, ProtocolResult, Vec3};

use super::BehaviorStatus;
use crate::shape::Shape;

/// Sinusoidal displacement along `offset`, driven by the subject's age.
///
/// Only the change since the previous tick is applied, so oscillation
/// composes with any other behavior that moves the shape.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OscillationBehavior {
    /// Peak displacement.
    pub offset: Vec3,
    /// Cycles per second.
    pub frequency: f32,
    /// Sine value applied by the last tick.
    pub previous: f32,
    /// Seconds of age after which the oscillation ends; 0 runs forever.
    pub duration: f32,
}

impl OscillationBehavior {
    /// Creates an oscillation starting at rest.
    #[must_use]
    pub const fn new(offset: Vec3, frequency: f32, duration: f32) -> Self {
        Self {
            offset,
            frequency,
            previous: 0.0,
            duration,
        }
    }

    pub(super) fn update(&mut self, subject: &mut Shape) -> BehaviorStatus {
        if self.duration > 0.0 && subject.age() >= self.duration {
            // settle back onto the rest position before going away
            subject.transform.position += self.offset * -self.previous;
            self.previous = 0.0;
            return BehaviorStatus::Expire;
        }
        let oscillation = (TAU * self.frequency * subject.age()).sin();
        subject.transform.position += self.offset * (oscillation - self.previous);
        self.previous = oscillation;
        BehaviorStatus::Continue
    }

    pub(super) fn save(&self, writer: &mut GameDataWriter) {
        writer.write_vector3(self.offset);
        writer.write_float(self.frequency);
        writer.write_float(self.previous);
        writer.write_float(self.duration);
    }

    pub(super) fn load(&mut self, reader: &mut GameDataReader<'_>) -> ProtocolResult<()> {
        self.offset = reader.read_vector3()?;
        self.frequency = reader.read_float()?;
        self.previous = reader.read_float()?;
        self.duration = reader.read_float()?;
        Ok(())
    }
}

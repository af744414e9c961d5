use std::f32::consts::TAU;

use kaleido_shared::{Color, GameDataReader, GameDataWriter, ProtocolResult};

use super::BehaviorStatus;
use crate::shape::Shape;

/// Blends every part of the subject between two colors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorCycleBehavior {
    /// Color at the start of each cycle.
    pub from: Color,
    /// Color halfway through each cycle.
    pub to: Color,
    /// Seconds per cycle.
    pub period: f32,
}

impl ColorCycleBehavior {
    /// Creates a color cycle.
    #[must_use]
    pub const fn new(from: Color, to: Color, period: f32) -> Self {
        Self { from, to, period }
    }

    pub(super) fn update(&mut self, subject: &mut Shape) -> BehaviorStatus {
        if self.period > 0.0 {
            let t = 0.5 - 0.5 * (TAU * subject.age() / self.period).cos();
            subject.set_color(self.from.lerp(self.to, t));
        }
        BehaviorStatus::Continue
    }

    pub(super) fn save(&self, writer: &mut GameDataWriter) {
        writer.write_color(self.from);
        writer.write_color(self.to);
        writer.write_float(self.period);
    }

    pub(super) fn load(&mut self, reader: &mut GameDataReader<'_>) -> ProtocolResult<()> {
        self.from = reader.read_color()?;
        self.to = reader.read_color()?;
        self.period = reader.read_float()?;
        Ok(())
    }
}

//! # Spawn Settings
//!
//! What a level spawns and where. A spawn
//! zone only answers "give me a point". Everything else (kind, colors,
//! behaviors) is drawn from the ranges below with the world random stream.

use std::f32::consts::TAU;

use kaleido_shared::{Quaternion, Vec3};
use rand::Rng;
use serde::Deserialize;

/// Produces spawn positions.
pub trait SpawnZone {
    /// Picks a point inside the zone.
    fn spawn_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3;
}

/// Built-in zone shapes.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneShape {
    /// Always the same point.
    Point {
        /// The spawn point.
        position: Vec3,
    },
    /// Uniform inside an axis-aligned box.
    Cube {
        /// Box center.
        center: Vec3,
        /// Half the box size along each axis.
        half_extent: Vec3,
    },
}

impl Default for ZoneShape {
    fn default() -> Self {
        Self::Point {
            position: Vec3::ZERO,
        }
    }
}

impl SpawnZone for ZoneShape {
    fn spawn_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        match *self {
            Self::Point { position } => position,
            Self::Cube {
                center,
                half_extent,
            } => {
                center
                    + Vec3::new(
                        half_extent.x * rng.gen_range(-1.0..=1.0),
                        half_extent.y * rng.gen_range(-1.0..=1.0),
                        half_extent.z * rng.gen_range(-1.0..=1.0),
                    )
            }
        }
    }
}

/// Inclusive float range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct FloatRange {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl FloatRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A range holding one value.
    #[must_use]
    pub const fn fixed(value: f32) -> Self {
        Self::new(value, value)
    }

    /// Draws a value. Degenerate ranges return `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

/// Optional oscillation added to spawned shapes.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OscillationSettings {
    /// Chance in `0..=1` that a shape oscillates.
    pub chance: f32,
    /// Offset magnitude.
    pub amplitude: FloatRange,
    /// Cycles per second.
    pub frequency: FloatRange,
    /// Seconds before the oscillation stops; 0 never stops.
    pub duration: FloatRange,
}

impl Default for OscillationSettings {
    fn default() -> Self {
        Self {
            chance: 0.0,
            amplitude: FloatRange::new(0.5, 2.0),
            frequency: FloatRange::new(0.5, 1.0),
            duration: FloatRange::fixed(0.0),
        }
    }
}

/// Satellites orbiting freshly spawned shapes.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SatelliteSettings {
    /// Minimum satellites per spawn.
    pub min_count: u32,
    /// Maximum satellites per spawn.
    pub max_count: u32,
    /// Orbit radius, relative to the focal shape's scale.
    pub orbit_radius: FloatRange,
    /// Orbits per second.
    pub orbit_frequency: FloatRange,
    /// Satellite scale relative to the focal shape.
    pub relative_scale: FloatRange,
}

impl Default for SatelliteSettings {
    fn default() -> Self {
        Self {
            min_count: 0,
            max_count: 0,
            orbit_radius: FloatRange::new(1.0, 2.0),
            orbit_frequency: FloatRange::new(0.1, 0.5),
            relative_scale: FloatRange::new(0.1, 0.3),
        }
    }
}

/// Optional color cycling.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColorCycleSettings {
    /// Chance in `0..=1` that a shape cycles colors.
    pub chance: f32,
    /// Seconds per full cycle.
    pub period: FloatRange,
}

impl Default for ColorCycleSettings {
    fn default() -> Self {
        Self {
            chance: 0.0,
            period: FloatRange::new(1.0, 4.0),
        }
    }
}

/// Everything a level needs to spawn shapes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    /// Where shapes appear.
    pub zone: ZoneShape,
    /// Restrict spawning to these factory ids. Empty means any factory.
    pub factories: Vec<u32>,
    /// One color for all parts instead of one per part.
    pub uniform_color: bool,
    /// Uniform scale.
    pub scale: FloatRange,
    /// Degrees per second around a random axis.
    pub angular_speed: FloatRange,
    /// Units per second in a random direction.
    pub speed: FloatRange,
    /// Oscillation behavior.
    pub oscillation: OscillationSettings,
    /// Satellites per spawn.
    pub satellites: SatelliteSettings,
    /// Color cycling behavior.
    pub color_cycle: ColorCycleSettings,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            zone: ZoneShape::default(),
            factories: Vec::new(),
            uniform_color: false,
            scale: FloatRange::new(0.5, 1.5),
            angular_speed: FloatRange::new(0.0, 90.0),
            speed: FloatRange::new(0.0, 2.0),
            oscillation: OscillationSettings::default(),
            satellites: SatelliteSettings::default(),
            color_cycle: ColorCycleSettings::default(),
        }
    }
}

/// Uniformly distributed unit vector.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(ring * theta.cos(), ring * theta.sin(), z)
}

/// Uniformly distributed rotation (Shoemake).
pub fn random_rotation<R: Rng + ?Sized>(rng: &mut R) -> Quaternion {
    let u1: f32 = rng.gen();
    let u2: f32 = rng.gen_range(0.0..TAU);
    let u3: f32 = rng.gen_range(0.0..TAU);
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    Quaternion::new(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos())
}

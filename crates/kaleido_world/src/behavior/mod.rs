//! # Shape Behaviors
//!
//! Per-tick logic attached to shapes. The set of kinds is closed: every
//! kind has a persisted tag, and the dispatch below is the only place that
//! maps tags to payloads, so an unknown tag is always a checkable error.
//!
//! | tag | kind        | payload                                              |
//! |-----|-------------|------------------------------------------------------|
//! | 0   | Movement    | velocity                                             |
//! | 1   | Rotation    | angular velocity                                     |
//! | 2   | Oscillation | offset, frequency, previous oscillation, duration    |
//! | 3   | Satellite   | target save index, frequency, cos/sin offsets, previous position |
//! | 4   | ColorCycle  | from color, to color, period                         |

mod color_cycle;
mod movement;
mod oscillation;
mod rotation;
mod satellite;

pub use color_cycle::ColorCycleBehavior;
pub use movement::MovementBehavior;
pub use oscillation::OscillationBehavior;
pub use rotation::RotationBehavior;
pub use satellite::SatelliteBehavior;

use kaleido_core::{Handle, Pool, Poolable};
use kaleido_shared::{GameDataReader, GameDataWriter, ProtocolResult, Vec3};

use crate::reference::ShapeLookup;
use crate::shape::Shape;

/// Behavior kinds, with their persisted tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BehaviorKind {
    /// Constant linear velocity.
    Movement = 0,
    /// Constant angular velocity.
    Rotation = 1,
    /// Sinusoidal offset.
    Oscillation = 2,
    /// Orbit around another shape.
    Satellite = 3,
    /// Periodic color blend.
    ColorCycle = 4,
}

impl BehaviorKind {
    /// Every kind in tag order.
    pub const ALL: [Self; 5] = [
        Self::Movement,
        Self::Rotation,
        Self::Oscillation,
        Self::Satellite,
        Self::ColorCycle,
    ];

    /// Decodes a persisted tag.
    #[must_use]
    pub fn from_tag(tag: i32) -> Option<Self> {
        usize::try_from(tag).ok().and_then(|index| Self::ALL.get(index).copied())
    }

    /// Persisted tag.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// Free-list key in the behavior pool.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Outcome of one behavior update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BehaviorStatus {
    /// Keep running.
    Continue,
    /// Remove and recycle this behavior.
    Expire,
    /// Remove this behavior and keep the subject moving at `velocity`.
    Escape {
        /// Velocity handed to a new movement behavior.
        velocity: Vec3,
    },
}

/// Everything a behavior can see during a tick besides its subject.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    /// Seconds since the previous tick.
    pub delta_time: f32,
    /// Every other live shape. The subject itself is not visible here.
    pub shapes: ShapeLookup<'a>,
}

/// A pooled behavior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Behavior {
    /// See [`MovementBehavior`].
    Movement(MovementBehavior),
    /// See [`RotationBehavior`].
    Rotation(RotationBehavior),
    /// See [`OscillationBehavior`].
    Oscillation(OscillationBehavior),
    /// See [`SatelliteBehavior`].
    Satellite(SatelliteBehavior),
    /// See [`ColorCycleBehavior`].
    ColorCycle(ColorCycleBehavior),
}

impl Behavior {
    /// A zero-initialized behavior of `kind`.
    #[must_use]
    pub fn new(kind: BehaviorKind) -> Self {
        match kind {
            BehaviorKind::Movement => Self::Movement(MovementBehavior::default()),
            BehaviorKind::Rotation => Self::Rotation(RotationBehavior::default()),
            BehaviorKind::Oscillation => Self::Oscillation(OscillationBehavior::default()),
            BehaviorKind::Satellite => Self::Satellite(SatelliteBehavior::default()),
            BehaviorKind::ColorCycle => Self::ColorCycle(ColorCycleBehavior::default()),
        }
    }

    /// Kind of this behavior.
    #[must_use]
    pub const fn kind(&self) -> BehaviorKind {
        match self {
            Self::Movement(_) => BehaviorKind::Movement,
            Self::Rotation(_) => BehaviorKind::Rotation,
            Self::Oscillation(_) => BehaviorKind::Oscillation,
            Self::Satellite(_) => BehaviorKind::Satellite,
            Self::ColorCycle(_) => BehaviorKind::ColorCycle,
        }
    }

    /// Advances the behavior by one tick.
    pub fn update(&mut self, subject: &mut Shape, ctx: &TickContext<'_>) -> BehaviorStatus {
        match self {
            Self::Movement(b) => b.update(subject, ctx),
            Self::Rotation(b) => b.update(subject, ctx),
            Self::Oscillation(b) => b.update(subject),
            Self::Satellite(b) => b.update(subject, ctx),
            Self::ColorCycle(b) => b.update(subject),
        }
    }

    /// Writes the payload (not the tag).
    pub fn save(&self, writer: &mut GameDataWriter, shapes: &ShapeLookup<'_>) {
        match self {
            Self::Movement(b) => b.save(writer),
            Self::Rotation(b) => b.save(writer),
            Self::Oscillation(b) => b.save(writer),
            Self::Satellite(b) => b.save(writer, shapes),
            Self::ColorCycle(b) => b.save(writer),
        }
    }

    /// Reads the payload (the tag was consumed by the caller).
    ///
    /// # Errors
    ///
    /// Propagates truncation errors.
    pub fn load(&mut self, reader: &mut GameDataReader<'_>) -> ProtocolResult<()> {
        match self {
            Self::Movement(b) => b.load(reader),
            Self::Rotation(b) => b.load(reader),
            Self::Oscillation(b) => b.load(reader),
            Self::Satellite(b) => b.load(reader),
            Self::ColorCycle(b) => b.load(reader),
        }
    }

    /// Links references to other shapes once every shape exists.
    pub fn resolve_references(&mut self, shapes: &ShapeLookup<'_>) {
        if let Self::Satellite(b) = self {
            b.resolve_references(shapes);
        }
    }
}

impl Poolable for Behavior {
    fn recycle(&mut self) {
        *self = Self::new(self.kind());
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for Behavior {
            fn from(behavior: $ty) -> Self {
                Self::$variant(behavior)
            }
        })*
    };
}

impl_from_variant! {
    Movement => MovementBehavior,
    Rotation => RotationBehavior,
    Oscillation => OscillationBehavior,
    Satellite => SatelliteBehavior,
    ColorCycle => ColorCycleBehavior,
}

/// One free list per behavior kind.
#[derive(Debug, Default)]
pub struct BehaviorPool {
    pool: Pool<Behavior>,
}

impl BehaviorPool {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self { pool: Pool::new() }
    }

    /// Acquires a zero-initialized behavior of `kind`.
    pub fn acquire(&mut self, kind: BehaviorKind) -> Handle {
        self.pool.acquire_with(kind.index(), || Behavior::new(kind))
    }

    /// Acquires a behavior and initializes it with `behavior`.
    pub fn insert(&mut self, behavior: Behavior) -> Handle {
        let handle = self.acquire(behavior.kind());
        if let Some(slot) = self.pool.get_mut(handle) {
            *slot = behavior;
        }
        handle
    }

    /// Recycles a behavior and returns it to its kind's free list.
    pub fn release(&mut self, handle: Handle) -> bool {
        self.pool.release(handle)
    }

    /// Gets a live behavior.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&Behavior> {
        self.pool.get(handle)
    }

    /// Gets a live behavior mutably.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Behavior> {
        self.pool.get_mut(handle)
    }

    /// Number of live behaviors.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Recycled behaviors of `kind` waiting for reuse.
    #[must_use]
    pub fn free_count(&self, kind: BehaviorKind) -> usize {
        self.pool.free_count(kind.index())
    }
}

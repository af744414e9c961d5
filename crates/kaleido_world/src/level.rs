//! # Levels
//!
//! The active [`Level`] carries the population ceiling, the spawn settings
//! and a list of persistent regions. Loading and unloading levels is an
//! external concern modeled by [`LevelLoader`]; the game drives it through
//! the [`LevelTransition`] state machine and only ticks the world while a
//! level is active.

use kaleido_shared::{GameDataReader, GameDataWriter, ProtocolResult, Transform, Vec3};

use crate::config::{LevelConfig, RegionConfig, WorldConfig};
use crate::spawn::SpawnSettings;

/// Level-owned scenery whose transform is saved with the game.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PersistentRegion {
    /// Current transform.
    pub transform: Transform,
    /// Euler degrees per second.
    pub angular_velocity: Vec3,
}

impl From<&RegionConfig> for PersistentRegion {
    fn from(config: &RegionConfig) -> Self {
        Self {
            transform: config.transform,
            angular_velocity: config.angular_velocity,
        }
    }
}

/// The level the world is currently running.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    id: u32,
    population_limit: usize,
    spawn: SpawnSettings,
    regions: Vec<PersistentRegion>,
}

impl Level {
    /// Instantiates a level in its configured state.
    #[must_use]
    pub fn from_config(config: &LevelConfig) -> Self {
        Self {
            id: config.id,
            population_limit: config.population_limit,
            spawn: config.spawn.clone(),
            regions: config.regions.iter().map(PersistentRegion::from).collect(),
        }
    }

    /// Level id as stored in saves.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Live shape ceiling; 0 is unlimited.
    #[inline]
    #[must_use]
    pub const fn population_limit(&self) -> usize {
        self.population_limit
    }

    /// Spawn settings.
    #[must_use]
    pub const fn spawn(&self) -> &SpawnSettings {
        &self.spawn
    }

    /// Persistent regions in save order.
    #[must_use]
    pub fn regions(&self) -> &[PersistentRegion] {
        &self.regions
    }

    /// Rotates regions that have an angular velocity.
    pub fn tick(&mut self, delta_time: f32) {
        for region in &mut self.regions {
            if region.angular_velocity != Vec3::ZERO {
                region.transform.rotate(region.angular_velocity * delta_time);
            }
        }
    }

    /// Writes the region count and every region transform.
    pub fn save(&self, writer: &mut GameDataWriter) {
        writer.write_count(self.regions.len());
        for region in &self.regions {
            writer.write_transform(&region.transform);
        }
    }

    /// Applies stored transforms in order. Stored regions the level does not
    /// have are ignored; regions without a stored transform keep theirs.
    pub fn apply_regions(&mut self, stored: &[Transform]) {
        for (region, transform) in self.regions.iter_mut().zip(stored) {
            region.transform = *transform;
        }
    }
}

/// Reads a level sub-stream without needing the level itself.
///
/// # Errors
///
/// Truncation or a negative count.
pub fn decode_regions(reader: &mut GameDataReader<'_>) -> ProtocolResult<Vec<Transform>> {
    let count = reader.read_count()?;
    let mut regions = Vec::with_capacity(count.min(reader.remaining() / 40));
    for _ in 0..count {
        regions.push(reader.read_transform()?);
    }
    Ok(regions)
}

/// Progress of a level change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LevelTransition {
    /// No level loaded yet.
    #[default]
    Idle,
    /// Waiting for `from` to unload before loading `next`.
    Unloading {
        /// Level being unloaded.
        from: u32,
        /// Level to load afterwards.
        next: u32,
    },
    /// Waiting for `level` to finish loading.
    Loading {
        /// Level being loaded.
        level: u32,
    },
    /// `level` is loaded and the world ticks.
    Active {
        /// Running level.
        level: u32,
    },
}

impl LevelTransition {
    /// True while the world may tick.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// True while a load or unload is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Unloading { .. } | Self::Loading { .. })
    }

    /// The running level, if any.
    #[must_use]
    pub const fn active_level(&self) -> Option<u32> {
        match *self {
            Self::Active { level } => Some(level),
            _ => None,
        }
    }
}

/// Loads and unloads level content on behalf of the game.
///
/// Requests are asynchronous: after `start_*` the game calls [`poll`](Self::poll)
/// once per update until it reports completion.
pub trait LevelLoader {
    /// Begins unloading `level`.
    fn start_unload(&mut self, level: u32);

    /// Begins loading `level`.
    fn start_load(&mut self, level: u32);

    /// True once the most recent request has finished.
    fn poll(&mut self) -> bool;

    /// Configuration of `level`, or `None` if no such level exists.
    fn describe(&self, level: u32) -> Option<LevelConfig>;
}

/// Serves levels straight from configuration.
///
/// A load finishes after the level's `load_delay` polls; unloads finish on
/// the next poll.
#[derive(Clone, Debug, Default)]
pub struct ConfigLevelLoader {
    levels: Vec<LevelConfig>,
    remaining: Option<u32>,
}

impl ConfigLevelLoader {
    /// Creates a loader for the given levels.
    #[must_use]
    pub fn new(levels: Vec<LevelConfig>) -> Self {
        Self {
            levels,
            remaining: None,
        }
    }

    /// Creates a loader for every level in `config`.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.levels.clone())
    }
}

impl LevelLoader for ConfigLevelLoader {
    fn start_unload(&mut self, _level: u32) {
        self.remaining = Some(0);
    }

    fn start_load(&mut self, level: u32) {
        let delay = self
            .levels
            .iter()
            .find(|config| config.id == level)
            .map_or(0, |config| config.load_delay);
        self.remaining = Some(delay);
    }

    fn poll(&mut self) -> bool {
        match self.remaining {
            Some(0) | None => {
                self.remaining = None;
                true
            }
            Some(n) => {
                self.remaining = Some(n - 1);
                false
            }
        }
    }

    fn describe(&self, level: u32) -> Option<LevelConfig> {
        self.levels.iter().find(|config| config.id == level).cloned()
    }
}

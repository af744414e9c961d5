//! # World Configuration
//!
//! Factories, levels and seeding policy, loaded once from TOML at startup.
//!
//! ```toml
//! seed = 42
//! reseed_on_load = false
//! default_level = 1
//!
//! [[factories]]
//! materials = 3
//! shapes = [{ name = "cube", parts = 1 }, { name = "composite", parts = 3 }]
//!
//! [[levels]]
//! id = 1
//! population_limit = 100
//! [levels.spawn.zone]
//! kind = "cube"
//! center = { x = 0.0, y = 0.0, z = 0.0 }
//! half_extent = { x = 5.0, y = 5.0, z = 5.0 }
//! ```

use std::collections::HashSet;
use std::path::Path;

use kaleido_shared::{Transform, Vec3};
use serde::Deserialize;

use crate::error::{WorldError, WorldResult};
use crate::spawn::SpawnSettings;

/// Level loaded when a save predates level ids.
pub const DEFAULT_LEVEL: u32 = 1;

/// A shape kind a factory can produce.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ShapeDefinition {
    /// Human readable name.
    pub name: String,
    /// Renderable parts, one color each.
    pub parts: usize,
}

/// One shape factory. Its id is its position in [`WorldConfig::factories`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FactoryConfig {
    /// Shape catalog, indexed by shape id.
    pub shapes: Vec<ShapeDefinition>,
    /// Number of materials, indexed by material id.
    #[serde(default = "default_materials")]
    pub materials: u32,
}

const fn default_materials() -> u32 {
    1
}

/// Persistent scenery owned by a level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Initial transform.
    pub transform: Transform,
    /// Degrees per second; zero keeps the region still.
    pub angular_velocity: Vec3,
}

/// One level.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LevelConfig {
    /// Level id as stored in saves.
    pub id: u32,
    /// Soft cap on live shapes; 0 is unlimited.
    #[serde(default)]
    pub population_limit: usize,
    /// Polls the loader needs before the level counts as loaded.
    #[serde(default)]
    pub load_delay: u32,
    /// Spawn configuration.
    #[serde(default)]
    pub spawn: SpawnSettings,
    /// Persistent regions, in save order.
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
}

impl LevelConfig {
    /// A level with default spawning and no regions.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            population_limit: 0,
            load_delay: 0,
            spawn: SpawnSettings::default(),
            regions: Vec::new(),
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed of the main random state.
    pub seed: u64,
    /// Discard the stored random state when loading.
    pub reseed_on_load: bool,
    /// Level started by a new game.
    pub default_level: u32,
    /// Shape factories.
    pub factories: Vec<FactoryConfig>,
    /// Levels.
    pub levels: Vec<LevelConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            reseed_on_load: false,
            default_level: DEFAULT_LEVEL,
            factories: vec![FactoryConfig {
                shapes: vec![
                    ShapeDefinition {
                        name: "cube".into(),
                        parts: 1,
                    },
                    ShapeDefinition {
                        name: "sphere".into(),
                        parts: 1,
                    },
                    ShapeDefinition {
                        name: "composite".into(),
                        parts: 3,
                    },
                ],
                materials: 3,
            }],
            levels: vec![LevelConfig::new(DEFAULT_LEVEL)],
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] on syntax or validation failure.
    pub fn from_toml_str(source: &str) -> WorldResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| WorldError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`WorldError::Storage`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> WorldResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| WorldError::Storage {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> WorldResult<()> {
        if self.factories.is_empty() {
            return Err(WorldError::InvalidConfig("at least one factory is required".into()));
        }
        for (id, factory) in self.factories.iter().enumerate() {
            if factory.shapes.is_empty() {
                return Err(WorldError::InvalidConfig(format!("factory {id} has no shapes")));
            }
            if factory.materials == 0 {
                return Err(WorldError::InvalidConfig(format!("factory {id} has no materials")));
            }
            if let Some(shape) = factory.shapes.iter().find(|shape| shape.parts == 0) {
                return Err(WorldError::InvalidConfig(format!(
                    "shape {} of factory {id} has no parts",
                    shape.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for level in &self.levels {
            if !seen.insert(level.id) {
                return Err(WorldError::InvalidConfig(format!("duplicate level {}", level.id)));
            }
            if let Some(&factory) = level
                .spawn
                .factories
                .iter()
                .find(|&&factory| factory as usize >= self.factories.len())
            {
                return Err(WorldError::InvalidConfig(format!(
                    "level {} spawns from unknown factory {factory}",
                    level.id
                )));
            }
        }
        if !seen.contains(&self.default_level) {
            return Err(WorldError::InvalidConfig(format!(
                "default level {} is not configured",
                self.default_level
            )));
        }
        Ok(())
    }

    /// Looks up a level by id.
    #[must_use]
    pub fn level(&self, id: u32) -> Option<&LevelConfig> {
        self.levels.iter().find(|level| level.id == id)
    }
}

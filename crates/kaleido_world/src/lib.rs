//! # Kaleido World
//!
//! World-state manager for a population of pooled shapes.
//!
//! - Shapes and their behaviors are recycled through per-kind pools and
//!   referenced only by generational handles.
//! - Creation and destruction pressure drive the population, drained
//!   against the active level's ceiling.
//! - Saves are versioned (format 0 through 6) and load in two phases:
//!   every shape is rebuilt first, then references between shapes are
//!   resolved.
//!
//! ## Architecture Rules
//!
//! 1. **No allocation on the tick path** once the pools are warm
//! 2. **All-or-nothing loads** - a rejected save never touches the live world
//! 3. **Deterministic** - the same seed produces the same population
//!
//! ## Example
//!
//! ```rust,ignore
//! use kaleido_world::{ConfigLevelLoader, Game, MemoryStorage, WorldConfig};
//!
//! let config = WorldConfig::default();
//! let mut game = Game::new(&config, ConfigLevelLoader::from_config(&config), MemoryStorage::new())?;
//! game.update(1.0 / 60.0);
//! game.save()?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod behavior;
pub mod config;
pub mod error;
pub mod factory;
pub mod game;
pub mod level;
pub mod reference;
pub mod rng;
pub mod shape;
pub mod spawn;
pub mod storage;
pub mod world;

pub use behavior::{Behavior, BehaviorKind, BehaviorPool, BehaviorStatus, TickContext};
pub use config::{FactoryConfig, LevelConfig, ShapeDefinition, WorldConfig, DEFAULT_LEVEL};
pub use error::{WorldError, WorldResult};
pub use factory::ShapeFactory;
pub use game::{Command, Game};
pub use level::{ConfigLevelLoader, Level, LevelLoader, LevelTransition, PersistentRegion};
pub use reference::{ShapeInstance, ShapeLookup, ShapeRef};
pub use shape::Shape;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use world::{Rates, Snapshot, World};

//! # Game Orchestration
//!
//! [`Game`] owns the world and sequences everything that must not overlap
//! with a tick: level transitions, saving and loading.
//!
//! A load runs in three steps:
//!
//! 1. The save is decoded into a staged snapshot. Nothing live changes, so
//!    a future version or a corrupt stream is reported and forgotten.
//! 2. The snapshot's level is requested. The world stops ticking while the
//!    loader works (one poll per [`Game::update`]).
//! 3. On activation the snapshot replaces the live population, then
//!    references between shapes are resolved.

use kaleido_shared::GameDataWriter;

use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use crate::level::{Level, LevelLoader, LevelTransition};
use crate::storage::Storage;
use crate::world::{Snapshot, World};

/// A discrete request from input or UI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Start over on the current level.
    NewGame,
    /// Persist the world.
    Save,
    /// Replace the world with the persisted one.
    Load,
    /// Spawn from the active level.
    Spawn,
    /// Destroy one random shape.
    Destroy,
    /// Start over on another level.
    SelectLevel(u32),
    /// Spawns per second.
    SetCreationRate(f32),
    /// Removals per second.
    SetDestructionRate(f32),
}

/// The world plus its level loader and save storage.
pub struct Game<L, S> {
    world: World,
    loader: L,
    storage: S,
    transition: LevelTransition,
    pending: Option<Snapshot>,
    writer: GameDataWriter,
    default_level: u32,
}

impl<L: LevelLoader, S: Storage> Game<L, S> {
    /// Validates `config`, starts a new game and requests the default level.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] or [`WorldError::UnknownLevel`] if the
    /// loader does not know the default level.
    pub fn new(config: &WorldConfig, loader: L, storage: S) -> WorldResult<Self> {
        config.validate()?;
        let mut game = Self {
            world: World::new(config),
            loader,
            storage,
            transition: LevelTransition::Idle,
            pending: None,
            writer: GameDataWriter::new(),
            default_level: config.default_level,
        };
        game.world.begin_new_game();
        game.request_level(config.default_level)?;
        Ok(game)
    }

    /// Advances the level transition, or ticks the world once a level is active.
    pub fn update(&mut self, delta_time: f32) {
        if self.transition.is_active() {
            self.world.tick(delta_time);
        } else {
            self.advance_transition();
        }
    }

    fn advance_transition(&mut self) {
        match self.transition {
            LevelTransition::Unloading { from, next } => {
                if self.loader.poll() {
                    tracing::info!(level = from, "level unloaded");
                    self.loader.start_load(next);
                    self.transition = LevelTransition::Loading { level: next };
                }
            }
            LevelTransition::Loading { level } => {
                if self.loader.poll() {
                    self.activate(level);
                }
            }
            LevelTransition::Idle | LevelTransition::Active { .. } => {}
        }
    }

    fn activate(&mut self, id: u32) {
        let Some(config) = self.loader.describe(id) else {
            tracing::error!(level = id, "loaded level has no configuration");
            self.transition = LevelTransition::Idle;
            if let Some(snapshot) = self.pending.take() {
                self.world.discard(snapshot);
            }
            return;
        };
        self.world.activate_level(Level::from_config(&config));
        self.transition = LevelTransition::Active { level: id };
        tracing::info!(level = id, "level active");

        if let Some(snapshot) = self.pending.take() {
            self.world.commit(snapshot);
        }
    }

    fn ensure_idle(&self) -> WorldResult<()> {
        if self.transition.is_busy() || self.pending.is_some() {
            return Err(WorldError::LoadInProgress);
        }
        Ok(())
    }

    fn ensure_level(&self, id: u32) -> WorldResult<()> {
        match self.loader.describe(id) {
            Some(_) => Ok(()),
            None => Err(WorldError::UnknownLevel(i64::from(id))),
        }
    }

    fn request_level(&mut self, id: u32) -> WorldResult<()> {
        if self.transition.is_busy() {
            return Err(WorldError::LoadInProgress);
        }
        self.ensure_level(id)?;
        self.transition = match self.transition {
            LevelTransition::Active { level } => {
                self.loader.start_unload(level);
                LevelTransition::Unloading {
                    from: level,
                    next: id,
                }
            }
            _ => {
                self.loader.start_load(id);
                LevelTransition::Loading { level: id }
            }
        };
        tracing::info!(level = id, "level requested");
        Ok(())
    }

    /// Starts over and reloads the current level.
    ///
    /// # Errors
    ///
    /// [`WorldError::LoadInProgress`] while a transition is running.
    pub fn new_game(&mut self) -> WorldResult<()> {
        self.ensure_idle()?;
        let level = self.transition.active_level().unwrap_or(self.default_level);
        self.world.begin_new_game();
        self.request_level(level)
    }

    /// Starts over on level `id`.
    ///
    /// # Errors
    ///
    /// [`WorldError::LoadInProgress`] while a transition is running,
    /// [`WorldError::UnknownLevel`] without touching the world.
    pub fn select_level(&mut self, id: u32) -> WorldResult<()> {
        self.ensure_idle()?;
        self.ensure_level(id)?;
        self.world.begin_new_game();
        self.request_level(id)
    }

    /// Writes the world to storage and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`WorldError::LoadInProgress`] while a transition is running, or the
    /// storage error.
    pub fn save(&mut self) -> WorldResult<usize> {
        self.ensure_idle()?;
        self.writer.reset();
        self.world.save(&mut self.writer);
        self.storage.persist(self.writer.as_slice())?;
        tracing::info!(
            bytes = self.writer.len(),
            shapes = self.world.shape_count(),
            "game saved"
        );
        Ok(self.writer.len())
    }

    /// Loads the save held by storage.
    ///
    /// # Errors
    ///
    /// As [`load_bytes`](Self::load_bytes), plus storage errors.
    pub fn load(&mut self) -> WorldResult<()> {
        self.ensure_idle()?;
        let bytes = self.storage.retrieve()?;
        self.load_bytes(&bytes)
    }

    /// Decodes `bytes` and schedules it to replace the world once its level
    /// is active.
    ///
    /// # Errors
    ///
    /// [`WorldError::LoadInProgress`] while a transition is running. A
    /// format error (future version), corrupt stream or unknown level
    /// leaves the running world exactly as it was.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> WorldResult<()> {
        self.ensure_idle()?;
        let snapshot = self.world.decode(bytes).map_err(|err| {
            if err.is_format() {
                tracing::error!(error = %err, "load aborted");
            } else {
                tracing::warn!(error = %err, "save rejected");
            }
            err
        })?;

        let level = snapshot.level();
        if let Err(err) = self.ensure_level(level) {
            tracing::warn!(level, "save refers to an unknown level");
            self.world.discard(snapshot);
            return Err(err);
        }
        tracing::info!(
            version = snapshot.version(),
            shapes = snapshot.shape_count(),
            level,
            "save decoded"
        );
        self.pending = Some(snapshot);
        if let Err(err) = self.request_level(level) {
            if let Some(snapshot) = self.pending.take() {
                self.world.discard(snapshot);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Whatever the underlying operation returns.
    pub fn execute(&mut self, command: Command) -> WorldResult<()> {
        match command {
            Command::NewGame => self.new_game(),
            Command::Save => self.save().map(|_| ()),
            Command::Load => self.load(),
            Command::SelectLevel(id) => self.select_level(id),
            Command::Spawn => {
                if self.transition.is_active() {
                    self.world.spawn_shapes();
                }
                Ok(())
            }
            Command::Destroy => {
                if self.transition.is_active() {
                    self.world.destroy_shape();
                }
                Ok(())
            }
            Command::SetCreationRate(rate) => {
                self.world.set_creation_rate(rate);
                Ok(())
            }
            Command::SetDestructionRate(rate) => {
                self.world.set_destruction_rate(rate);
                Ok(())
            }
        }
    }

    /// Runs updates until the level transition settles.
    ///
    /// Returns false if it did not settle within `max_polls`.
    pub fn settle(&mut self, max_polls: usize) -> bool {
        for _ in 0..max_polls {
            if !self.transition.is_busy() {
                return true;
            }
            self.advance_transition();
        }
        !self.transition.is_busy()
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Level transition state.
    #[must_use]
    pub const fn transition(&self) -> LevelTransition {
        self.transition
    }

    /// True while a decoded save waits for its level.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// The save storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// The level loader.
    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }
}

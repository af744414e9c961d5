//! # World State
//!
//! The live shape collection plus everything that drives it: factories, the
//! behavior pool, the random stream, creation and destruction pressure and
//! the active level.
//!
//! ## Tick order
//!
//! 1. Level regions rotate.
//! 2. Every live shape ages and runs its behaviors, in collection order.
//! 3. Creation progress is drained, one spawn per whole unit.
//! 4. Destruction progress is drained, one random removal per whole unit.
//! 5. The collection is drained down to the level's population ceiling.
//!
//! Removal is swap-with-last, so the collection order (and with it every
//! shape's save index) is not stable across destruction.

mod load;
mod spawning;

pub use load::Snapshot;

use kaleido_core::Handle;
use kaleido_shared::{GameDataWriter, RandomState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::behavior::{Behavior, BehaviorPool, TickContext};
use crate::config::{WorldConfig, DEFAULT_LEVEL};
use crate::error::{WorldError, WorldResult};
use crate::factory::ShapeFactory;
use crate::level::Level;
use crate::reference::{ShapeLookup, ShapeRef};
use crate::rng;
use crate::shape::Shape;

/// Creation and destruction pressure.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rates {
    /// Spawns per second.
    pub creation_rate: f32,
    /// Fractional spawns carried to the next tick.
    pub creation_progress: f32,
    /// Removals per second.
    pub destruction_rate: f32,
    /// Fractional removals carried to the next tick.
    pub destruction_progress: f32,
}

/// Non-finite or negative rates mean "stopped".
fn sanitize_rate(rate: f32) -> f32 {
    if rate.is_finite() {
        rate.max(0.0)
    } else {
        0.0
    }
}

/// Rounding slack for progress accumulated from many small time steps.
const PROGRESS_EPSILON: f32 = 1e-4;

/// Consumes one whole unit of progress if one is due.
///
/// A unit within [`PROGRESS_EPSILON`] of complete counts as complete and
/// the leftover never goes negative.
fn take_unit(progress: &mut f32) -> bool {
    if *progress < 1.0 - PROGRESS_EPSILON {
        return false;
    }
    *progress = (*progress - 1.0).max(0.0);
    true
}

/// Borrows only the factories, so the rest of the world stays usable.
fn shape_in(factories: &mut [ShapeFactory], target: ShapeRef) -> Option<&mut Shape> {
    factories.get_mut(target.factory as usize)?.shape_mut(target.handle)
}

/// The simulated world.
#[derive(Debug)]
pub struct World {
    reseed_on_load: bool,
    factories: Vec<ShapeFactory>,
    behaviors: BehaviorPool,
    live: Vec<ShapeRef>,
    rng: ChaCha8Rng,
    main_random_state: RandomState,
    rates: Rates,
    level: Option<Level>,
}

impl World {
    /// Creates an empty world with no active level.
    #[must_use]
    pub fn new(config: &WorldConfig) -> Self {
        let main = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            reseed_on_load: config.reseed_on_load,
            factories: config
                .factories
                .iter()
                .enumerate()
                .map(|(id, factory)| ShapeFactory::new(id as u32, factory))
                .collect(),
            behaviors: BehaviorPool::new(),
            live: Vec::new(),
            rng: main.clone(),
            main_random_state: rng::capture(&main),
            rates: Rates::default(),
            level: None,
        }
    }

    /// Advances the world by `delta_time` seconds.
    pub fn tick(&mut self, delta_time: f32) {
        if let Some(level) = &mut self.level {
            level.tick(delta_time);
        }

        for index in 0..self.live.len() {
            let target = self.live[index];
            let Some(mut shape) = self
                .factories
                .get_mut(target.factory as usize)
                .and_then(|factory| factory.checkout(target.handle))
            else {
                continue;
            };
            let ctx = TickContext {
                delta_time,
                shapes: ShapeLookup::new(&self.factories, &self.live),
            };
            shape.tick(&mut self.behaviors, &ctx);
            if let Some(factory) = self.factories.get_mut(target.factory as usize) {
                let restored = factory.checkin(target.handle, shape);
                debug_assert!(restored.is_ok(), "shape slot changed during its own update");
            }
        }

        self.rates.creation_progress += delta_time * self.rates.creation_rate;
        while take_unit(&mut self.rates.creation_progress) {
            self.spawn_shapes();
        }

        self.rates.destruction_progress += delta_time * self.rates.destruction_rate;
        while take_unit(&mut self.rates.destruction_progress) {
            self.destroy_shape();
        }

        let limit = self.population_limit();
        if limit > 0 && self.live.len() > limit {
            tracing::debug!(live = self.live.len(), limit, "draining to population ceiling");
            while self.live.len() > limit {
                self.destroy_shape();
            }
        }
    }

    /// Removes one uniformly chosen live shape. Returns false if none is live.
    pub fn destroy_shape(&mut self) -> bool {
        if self.live.is_empty() {
            return false;
        }
        let index = self.rng.gen_range(0..self.live.len());
        self.remove_at(index);
        true
    }

    /// Removes the shape at `index` by swapping the last one into its place.
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) {
        let removed = self.live.swap_remove(index);
        if let Some(&moved) = self.live.get(index) {
            if let Some(shape) = self.shape_mut(moved) {
                shape.set_save_index(index);
            }
        }
        self.recycle_shape(removed);
    }

    /// Releases a shape's behaviors, then the shape. The caller must already
    /// have taken it out of the live collection.
    fn recycle_shape(&mut self, target: ShapeRef) {
        let Some(factory) = self.factories.get_mut(target.factory as usize) else {
            return;
        };
        if let Some(shape) = factory.shape_mut(target.handle) {
            shape.release_behaviors(&mut self.behaviors);
        }
        factory.reclaim(target.handle);
    }

    /// Recycles every live shape.
    pub fn clear(&mut self) {
        let live = std::mem::take(&mut self.live);
        for &target in &live {
            self.recycle_shape(target);
        }
        self.live = live;
        self.live.clear();
    }

    /// Starts over: fresh random stream, rates stopped, no shapes.
    ///
    /// The new seed is drawn from the main random state, so a sequence of
    /// new games is reproducible from the configured seed.
    pub fn begin_new_game(&mut self) {
        let seed = self.reseed();
        self.rates = Rates::default();
        self.clear();
        tracing::info!(seed, "new game");
    }

    /// Reseeds the world stream from the main random state and returns the seed.
    fn reseed(&mut self) -> u64 {
        let mut main = rng::restore(&self.main_random_state);
        let seed: u64 = main.gen();
        self.main_random_state = rng::capture(&main);
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        seed
    }

    /// Writes the world after the header `writer` already holds.
    pub fn save(&self, writer: &mut GameDataWriter) {
        writer.write_count(self.live.len());
        writer.write_random_state(&rng::capture(&self.rng));
        writer.write_float(self.rates.creation_rate);
        writer.write_float(self.rates.creation_progress);
        writer.write_float(self.rates.destruction_rate);
        writer.write_float(self.rates.destruction_progress);

        match &self.level {
            Some(level) => {
                writer.write_int(level.id() as i32);
                level.save(writer);
            }
            None => {
                writer.write_int(DEFAULT_LEVEL as i32);
                writer.write_count(0);
            }
        }

        let lookup = self.lookup();
        for &target in &self.live {
            let Some(shape) = lookup.get(target) else {
                debug_assert!(false, "live collection holds a stale shape");
                continue;
            };
            writer.write_int(target.factory as i32);
            writer.write_int(shape.shape_id() as i32);
            writer.write_int(shape.material_id() as i32);
            shape.save(writer, &self.behaviors, &lookup);
        }
    }

    /// Acquires a shape with the given ids and makes it live.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownFactory`], [`WorldError::UnknownShape`] or
    /// [`WorldError::UnknownMaterial`].
    pub fn spawn(&mut self, factory: u32, shape_id: i32, material_id: i32) -> WorldResult<ShapeRef> {
        let handle = self
            .factories
            .get_mut(factory as usize)
            .ok_or(WorldError::UnknownFactory(factory as i32))?
            .get(shape_id, material_id)?;
        let target = ShapeRef { factory, handle };
        self.push_live(target);
        Ok(target)
    }

    fn push_live(&mut self, target: ShapeRef) {
        let index = self.live.len();
        if let Some(shape) = self.shape_mut(target) {
            shape.set_save_index(index);
        }
        self.live.push(target);
    }

    /// Attaches a behavior to a live shape.
    pub fn attach_behavior(&mut self, target: ShapeRef, behavior: Behavior) -> Option<Handle> {
        let shape = shape_in(&mut self.factories, target)?;
        Some(shape.attach(&mut self.behaviors, behavior))
    }

    /// Makes `level` the running level.
    pub fn activate_level(&mut self, level: Level) {
        self.level = Some(level);
    }

    /// Read-only view over the live shapes.
    #[must_use]
    pub fn lookup(&self) -> ShapeLookup<'_> {
        ShapeLookup::new(&self.factories, &self.live)
    }

    /// A live shape.
    #[must_use]
    pub fn shape(&self, target: ShapeRef) -> Option<&Shape> {
        self.factories.get(target.factory as usize)?.shape(target.handle)
    }

    /// A live shape, mutably.
    pub fn shape_mut(&mut self, target: ShapeRef) -> Option<&mut Shape> {
        shape_in(&mut self.factories, target)
    }

    /// Live shapes in collection order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> + '_ {
        let lookup = self.lookup();
        self.live.iter().filter_map(move |&target| lookup.get(target))
    }

    /// Live shape references in collection order.
    #[must_use]
    pub fn live(&self) -> &[ShapeRef] {
        &self.live
    }

    /// Number of live shapes.
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.live.len()
    }

    /// Shape factories, indexed by id.
    #[must_use]
    pub fn factories(&self) -> &[ShapeFactory] {
        &self.factories
    }

    /// The behavior pool.
    #[must_use]
    pub const fn behaviors(&self) -> &BehaviorPool {
        &self.behaviors
    }

    /// The running level.
    #[must_use]
    pub const fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    fn population_limit(&self) -> usize {
        self.level.as_ref().map_or(0, Level::population_limit)
    }

    /// Current rates and progress.
    #[must_use]
    pub const fn rates(&self) -> Rates {
        self.rates
    }

    /// Sets spawns per second.
    pub fn set_creation_rate(&mut self, rate: f32) {
        self.rates.creation_rate = sanitize_rate(rate);
    }

    /// Sets removals per second.
    pub fn set_destruction_rate(&mut self, rate: f32) {
        self.rates.destruction_rate = sanitize_rate(rate);
    }

    /// Captured state of the world random stream.
    #[must_use]
    pub fn random_state(&self) -> RandomState {
        rng::capture(&self.rng)
    }

    /// State new games draw their seeds from.
    #[must_use]
    pub const fn main_random_state(&self) -> RandomState {
        self.main_random_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::MovementBehavior;
    use crate::config::LevelConfig;
    use kaleido_shared::Vec3;

    fn world() -> World {
        let config = WorldConfig::default();
        let mut world = World::new(&config);
        world.activate_level(Level::from_config(&LevelConfig::new(DEFAULT_LEVEL)));
        world
    }

    #[test]
    fn test_destroy_fixes_moved_save_index() {
        let mut world = world();
        for shape_id in 0..3 {
            world.spawn(0, shape_id, 0).unwrap();
        }
        let last = world.live()[2];
        world.remove_at(0);

        assert_eq!(world.shape_count(), 2);
        assert_eq!(world.live()[0], last);
        assert_eq!(world.shape(last).unwrap().save_index(), 0);
        for (index, shape) in world.shapes().enumerate() {
            assert_eq!(shape.save_index(), index);
        }
    }

    #[test]
    fn test_destroy_releases_behaviors() {
        let mut world = world();
        let target = world.spawn(0, 0, 0).unwrap();
        world.attach_behavior(target, MovementBehavior::new(Vec3::X).into());
        assert_eq!(world.behaviors().live_count(), 1);

        assert!(world.destroy_shape());
        assert_eq!(world.behaviors().live_count(), 0);
        assert!(world.shape(target).is_none());
        assert!(!world.destroy_shape());
    }

    #[test]
    fn test_large_gap_spawns_every_unit() {
        let mut world = world();
        world.set_creation_rate(10.0);
        world.tick(0.55);
        assert_eq!(world.shape_count(), 5);
        assert!((world.rates().creation_progress - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_take_unit_absorbs_rounding() {
        let mut progress = 0.99999;
        assert!(take_unit(&mut progress));
        assert_eq!(progress, 0.0);
        assert!(!take_unit(&mut progress));

        let mut progress = 2.25;
        assert!(take_unit(&mut progress));
        assert!(take_unit(&mut progress));
        assert!(!take_unit(&mut progress));
        assert!((progress - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_ceiling_drains_at_end_of_tick() {
        let mut config = LevelConfig::new(DEFAULT_LEVEL);
        config.population_limit = 4;
        let mut world = World::new(&WorldConfig::default());
        world.activate_level(Level::from_config(&config));
        for _ in 0..10 {
            world.spawn(0, 0, 0).unwrap();
        }
        world.tick(0.0);
        assert_eq!(world.shape_count(), 4);
    }

    #[test]
    fn test_rates_are_sanitized() {
        let mut world = world();
        world.set_creation_rate(f32::NAN);
        world.set_destruction_rate(-3.0);
        assert_eq!(world.rates().creation_rate, 0.0);
        assert_eq!(world.rates().destruction_rate, 0.0);
    }

    #[test]
    fn test_new_games_are_reproducible() {
        let mut a = world();
        let mut b = world();
        a.begin_new_game();
        b.begin_new_game();
        assert_eq!(a.random_state(), b.random_state());

        a.begin_new_game();
        assert_ne!(a.random_state(), b.random_state());
    }

    #[test]
    fn test_new_game_clears_population() {
        let mut world = world();
        world.set_creation_rate(3.0);
        world.spawn(0, 1, 2).unwrap();
        world.begin_new_game();
        assert_eq!(world.shape_count(), 0);
        assert_eq!(world.rates(), Rates::default());
        assert_eq!(world.factories()[0].free_count(1), 1);
    }
}

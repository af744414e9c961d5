//! Two-phase loading.
//!
//! [`World::decode`] reads a whole save into a [`Snapshot`]. Shapes are
//! acquired from their factories while decoding but stay out of the live
//! collection, so a failure anywhere in the stream returns them to their
//! pools and the running world never notices. [`World::commit`] swaps the
//! snapshot in and then links cross-shape references, at which point every
//! shape the save mentions exists.

use kaleido_shared::{GameDataReader, RandomState, Transform};

use super::{sanitize_rate, Rates, World};
use crate::config::DEFAULT_LEVEL;
use crate::error::{WorldError, WorldResult};
use crate::level::decode_regions;
use crate::reference::{ShapeLookup, ShapeRef};
use crate::rng;

/// A decoded save waiting for its level.
#[derive(Debug)]
#[must_use = "a snapshot holds pooled shapes; commit or discard it"]
pub struct Snapshot {
    version: i32,
    random_state: Option<RandomState>,
    rates: Option<Rates>,
    level: u32,
    regions: Vec<Transform>,
    shapes: Vec<ShapeRef>,
}

impl Snapshot {
    fn empty(version: i32) -> Self {
        Self {
            version,
            random_state: None,
            rates: None,
            level: DEFAULT_LEVEL,
            regions: Vec::new(),
            shapes: Vec::new(),
        }
    }

    /// Format version the save was written with.
    #[must_use]
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// Level the save was taken on.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Number of staged shapes.
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

impl World {
    /// Phase one: reconstructs every shape of a save without touching the
    /// running world.
    ///
    /// # Errors
    ///
    /// [`WorldError::Protocol`] for a future version or a truncated stream,
    /// [`WorldError::UnknownBehavior`] and the unknown-id errors for content
    /// this world cannot represent. Staged shapes are released before the
    /// error is returned.
    pub fn decode(&mut self, bytes: &[u8]) -> WorldResult<Snapshot> {
        let mut reader = GameDataReader::open(bytes)?;
        let mut snapshot = Snapshot::empty(reader.version());
        match self.decode_into(&mut reader, &mut snapshot) {
            Ok(()) => Ok(snapshot),
            Err(err) => {
                tracing::debug!(staged = snapshot.shapes.len(), "releasing staged shapes");
                self.discard(snapshot);
                Err(err)
            }
        }
    }

    fn decode_into(
        &mut self,
        reader: &mut GameDataReader<'_>,
        snapshot: &mut Snapshot,
    ) -> WorldResult<()> {
        let version = reader.version();
        let count = match reader.legacy_count() {
            Some(count) => count,
            None => reader.read_count()?,
        };

        if version >= 3 {
            snapshot.random_state = Some(reader.read_random_state()?);
            snapshot.rates = Some(Rates {
                creation_rate: reader.read_float()?,
                creation_progress: reader.read_float()?,
                destruction_rate: reader.read_float()?,
                destruction_progress: reader.read_float()?,
            });
        }
        if version >= 2 {
            let id = reader.read_int()?;
            snapshot.level = u32::try_from(id).map_err(|_| WorldError::UnknownLevel(i64::from(id)))?;
        }
        if version >= 3 {
            snapshot.regions = decode_regions(reader)?;
        }

        // the smallest possible entity is a bare transform
        snapshot.shapes.reserve(count.min(reader.remaining() / 40));
        for index in 0..count {
            let factory_id = if version >= 5 { reader.read_int()? } else { 0 };
            let (shape_id, material_id) = if version > 0 {
                (reader.read_int()?, reader.read_int()?)
            } else {
                (0, 0)
            };

            let factory = usize::try_from(factory_id)
                .ok()
                .and_then(|id| self.factories.get_mut(id))
                .ok_or(WorldError::UnknownFactory(factory_id))?;
            let handle = factory.get(shape_id, material_id)?;
            let target = ShapeRef {
                factory: factory.id(),
                handle,
            };
            snapshot.shapes.push(target);

            if let Some(shape) = factory.shape_mut(handle) {
                shape.set_save_index(index);
                shape.load(reader, &mut self.behaviors)?;
            }
        }
        Ok(())
    }

    /// Returns every staged shape of an uncommitted snapshot to its pool.
    pub fn discard(&mut self, snapshot: Snapshot) {
        for target in snapshot.shapes {
            self.recycle_shape(target);
        }
    }

    /// Replaces the running population with a decoded snapshot, then
    /// resolves references. The snapshot's level must already be active.
    pub fn commit(&mut self, snapshot: Snapshot) {
        self.clear();

        match snapshot.random_state {
            Some(state) if !self.reseed_on_load => self.rng = rng::restore(&state),
            _ => {
                self.reseed();
            }
        }
        self.rates = snapshot.rates.map_or_else(Rates::default, |rates| Rates {
            creation_rate: sanitize_rate(rates.creation_rate),
            destruction_rate: sanitize_rate(rates.destruction_rate),
            ..rates
        });
        if let Some(level) = &mut self.level {
            debug_assert_eq!(level.id(), snapshot.level, "snapshot committed on the wrong level");
            level.apply_regions(&snapshot.regions);
        }

        self.live = snapshot.shapes;
        self.resolve_references();
        tracing::info!(
            version = snapshot.version,
            shapes = self.live.len(),
            level = snapshot.level,
            "save loaded"
        );
    }

    /// Phase two: every live shape links its references to other shapes.
    pub fn resolve_references(&mut self) {
        let lookup = ShapeLookup::new(&self.factories, &self.live);
        for &target in &self.live {
            if let Some(shape) = lookup.get(target) {
                shape.resolve_references(&mut self.behaviors, &lookup);
            }
        }
    }
}

//! Spawning from the active level's settings.

use kaleido_shared::{Color, Vec3};
use rand::Rng;

use super::{shape_in, World};
use crate::behavior::{
    ColorCycleBehavior, MovementBehavior, OscillationBehavior, RotationBehavior, SatelliteBehavior,
};
use crate::reference::{ShapeInstance, ShapeRef};
use crate::spawn::{random_rotation, random_unit_vector, SpawnSettings, SpawnZone};

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    Color::from_hsv(rng.gen(), rng.gen_range(0.5..=1.0), rng.gen_range(0.25..=1.0))
}

impl World {
    /// Spawns one shape from the active level, plus its satellites.
    ///
    /// Does nothing while no level is active.
    pub fn spawn_shapes(&mut self) -> Option<ShapeRef> {
        let level = self.level.take()?;
        let spawned = self.spawn_from(level.spawn());
        self.level = Some(level);
        spawned
    }

    fn spawn_from(&mut self, settings: &SpawnSettings) -> Option<ShapeRef> {
        let focal = self.spawn_random(settings)?;
        let scale = {
            let shape = shape_in(&mut self.factories, focal)?;
            shape.transform.position = settings.zone.spawn_point(&mut self.rng);
            let scale = settings.scale.sample(&mut self.rng);
            shape.transform.scale = Vec3::ONE * scale;

            let angular_velocity =
                random_unit_vector(&mut self.rng) * settings.angular_speed.sample(&mut self.rng);
            if angular_velocity != Vec3::ZERO {
                shape.attach(&mut self.behaviors, RotationBehavior::new(angular_velocity).into());
            }
            let speed = settings.speed.sample(&mut self.rng);
            if speed > 0.0 {
                let velocity = random_unit_vector(&mut self.rng) * speed;
                shape.attach(&mut self.behaviors, MovementBehavior::new(velocity).into());
            }

            let oscillation = &settings.oscillation;
            if self.rng.gen::<f32>() < oscillation.chance {
                let offset =
                    random_unit_vector(&mut self.rng) * oscillation.amplitude.sample(&mut self.rng);
                let behavior = OscillationBehavior::new(
                    offset,
                    oscillation.frequency.sample(&mut self.rng),
                    oscillation.duration.sample(&mut self.rng),
                );
                shape.attach(&mut self.behaviors, behavior.into());
            }
            scale
        };

        let satellites = &settings.satellites;
        let count = if satellites.max_count > satellites.min_count {
            self.rng.gen_range(satellites.min_count..=satellites.max_count)
        } else {
            satellites.min_count
        };
        for _ in 0..count {
            self.spawn_satellite(settings, focal, scale);
        }
        Some(focal)
    }

    fn spawn_satellite(&mut self, settings: &SpawnSettings, focal: ShapeRef, focal_scale: f32) {
        let Some(center) = self.shape(focal).map(|shape| shape.transform.position) else {
            return;
        };
        let Some(target) = self.spawn_random(settings) else {
            return;
        };
        let satellites = &settings.satellites;
        let satellite = SatelliteBehavior::new(
            ShapeInstance::Resolved(focal),
            random_unit_vector(&mut self.rng),
            satellites.orbit_radius.sample(&mut self.rng) * focal_scale,
            satellites.orbit_frequency.sample(&mut self.rng),
        );
        let scale = satellites.relative_scale.sample(&mut self.rng) * focal_scale;

        let Some(shape) = shape_in(&mut self.factories, target) else {
            return;
        };
        let position = satellite.orbit_position(center, 0.0);
        shape.transform.position = position;
        shape.transform.scale = Vec3::ONE * scale;
        shape.attach(
            &mut self.behaviors,
            SatelliteBehavior {
                previous_position: position,
                ..satellite
            }
            .into(),
        );
    }

    /// Acquires a shape of random kind, material, rotation and colors and
    /// makes it live. Placement is left to the caller.
    fn spawn_random(&mut self, settings: &SpawnSettings) -> Option<ShapeRef> {
        let factory_id = match settings.factories.len() {
            0 if self.factories.is_empty() => return None,
            0 => self.rng.gen_range(0..self.factories.len()) as u32,
            n => settings.factories[self.rng.gen_range(0..n)],
        };
        let factory = self.factories.get(factory_id as usize)?;
        if factory.shape_count() == 0 || factory.material_count() == 0 {
            return None;
        }
        let shape_id = self.rng.gen_range(0..factory.shape_count()) as i32;
        let material_id = self.rng.gen_range(0..factory.material_count()) as i32;
        let target = self.spawn(factory_id, shape_id, material_id).ok()?;

        let rotation = random_rotation(&mut self.rng);
        let uniform = settings.uniform_color.then(|| random_color(&mut self.rng));
        let cycle = (self.rng.gen::<f32>() < settings.color_cycle.chance)
            .then(|| (random_color(&mut self.rng), settings.color_cycle.period.sample(&mut self.rng)));

        let shape = shape_in(&mut self.factories, target)?;
        shape.transform.rotation = rotation;
        match uniform {
            Some(color) => shape.set_color(color),
            None => {
                for index in 0..shape.colors().len() {
                    shape.set_color_at(index, random_color(&mut self.rng));
                }
            }
        }
        if let Some((to, period)) = cycle {
            let from = shape.colors().first().copied().unwrap_or_default();
            shape.attach(&mut self.behaviors, ColorCycleBehavior::new(from, to, period).into());
        }
        Some(target)
    }
}

//! Integration tests for saving and loading worlds.

use kaleido_shared::{
    Color, GameDataReader, GameDataWriter, ProtocolError, Quaternion, RandomState, Transform,
    Vec3, SAVE_VERSION,
};
use kaleido_world::behavior::{
    ColorCycleBehavior, MovementBehavior, OscillationBehavior, RotationBehavior, SatelliteBehavior,
};
use kaleido_world::{
    Behavior, BehaviorKind, ConfigLevelLoader, FileStorage, Game, LevelTransition, MemoryStorage,
    ShapeInstance, ShapeRef, Storage, World, WorldConfig, WorldError,
};

type TestGame = Game<ConfigLevelLoader, MemoryStorage>;

/// Everything observable about a shape, with references flattened to save indices.
#[derive(Debug, PartialEq)]
struct ShapePrint {
    factory: u32,
    shape: u32,
    material: u32,
    transform: Transform,
    colors: Vec<Color>,
    age: f32,
    behaviors: Vec<Behavior>,
}

fn fingerprint(world: &World) -> Vec<ShapePrint> {
    let lookup = world.lookup();
    world
        .shapes()
        .map(|shape| ShapePrint {
            factory: shape.factory_id(),
            shape: shape.shape_id(),
            material: shape.material_id(),
            transform: shape.transform,
            colors: shape.colors().to_vec(),
            age: shape.age(),
            behaviors: shape
                .behaviors()
                .iter()
                .filter_map(|&handle| world.behaviors().get(handle).copied())
                .map(|behavior| match behavior {
                    Behavior::Satellite(satellite) => Behavior::Satellite(SatelliteBehavior {
                        focal: ShapeInstance::from_save_index(satellite.focal.save_index(&lookup)),
                        ..satellite
                    }),
                    other => other,
                })
                .collect(),
        })
        .collect()
}

fn game(config: &WorldConfig) -> TestGame {
    let mut game =
        Game::new(config, ConfigLevelLoader::from_config(config), MemoryStorage::new()).unwrap();
    assert!(game.settle(8));
    game
}

fn load_into(game: &mut TestGame, bytes: &[u8]) {
    game.load_bytes(bytes).unwrap();
    assert!(game.settle(8));
    assert!(!game.is_loading());
}

fn satellite_of(world: &World, target: ShapeRef) -> SatelliteBehavior {
    let shape = world.shape(target).unwrap();
    shape
        .behaviors()
        .iter()
        .find_map(|&handle| match world.behaviors().get(handle) {
            Some(Behavior::Satellite(satellite)) => Some(*satellite),
            _ => None,
        })
        .unwrap()
}

fn legacy_header(writer: &mut GameDataWriter, count: usize, level: i32) {
    writer.write_count(count);
    writer.write_random_state(&RandomState::default());
    writer.write_float(0.5);
    writer.write_float(0.25);
    writer.write_float(0.0);
    writer.write_float(0.0);
    writer.write_int(level);
    writer.write_count(0);
}

fn versioned(version: i32) -> GameDataWriter {
    let mut writer = GameDataWriter::headerless();
    writer.write_int(-version);
    writer
}

fn populated_game() -> TestGame {
    let mut game = game(&WorldConfig::default());
    game.world_mut().set_creation_rate(0.75);
    game.world_mut().set_destruction_rate(0.125);

    let world = game.world_mut();
    let focal = world.spawn(0, 2, 1).unwrap();
    let orbiting = world.spawn(0, 0, 2).unwrap();
    world.attach_behavior(focal, RotationBehavior::new(Vec3::new(0.0, 45.0, 0.0)).into());
    world.attach_behavior(focal, MovementBehavior::new(Vec3::new(0.5, 0.0, 0.0)).into());
    world.attach_behavior(
        focal,
        OscillationBehavior::new(Vec3::new(0.0, 1.0, 0.0), 0.5, 0.0).into(),
    );
    world.attach_behavior(
        orbiting,
        SatelliteBehavior::new(ShapeInstance::Resolved(focal), Vec3::Z, 2.0, 0.25).into(),
    );
    world.attach_behavior(
        orbiting,
        ColorCycleBehavior::new(Color::BLACK, Color::new(0.0, 0.5, 1.0, 1.0), 3.0).into(),
    );
    world.shape_mut(focal).unwrap().set_color_at(2, Color::BLACK);

    for _ in 0..10 {
        game.update(0.1);
    }
    game
}

#[test]
fn test_round_trip_reproduces_world() {
    let mut source = populated_game();
    let written = source.save().unwrap();
    let bytes = source.storage().bytes().unwrap().to_vec();
    assert_eq!(written, bytes.len());

    let mut target = game(&WorldConfig::default());
    load_into(&mut target, &bytes);

    assert_eq!(fingerprint(target.world()), fingerprint(source.world()));
    assert_eq!(target.world().rates(), source.world().rates());
    assert_eq!(target.world().random_state(), source.world().random_state());
    assert_eq!(target.transition(), LevelTransition::Active { level: 1 });
}

#[test]
fn test_loaded_world_evolves_like_the_original() {
    let mut source = populated_game();
    source.save().unwrap();
    let bytes = source.storage().bytes().unwrap().to_vec();

    let mut target = game(&WorldConfig::default());
    load_into(&mut target, &bytes);
    for _ in 0..40 {
        source.update(0.05);
        target.update(0.05);
    }
    assert_eq!(fingerprint(target.world()), fingerprint(source.world()));
}

#[test]
fn test_future_version_leaves_world_untouched() {
    let mut game = populated_game();
    let before = fingerprint(game.world());
    let state = game.world().random_state();

    let mut writer = versioned(SAVE_VERSION + 1);
    legacy_header(&mut writer, 0, 1);
    let err = game.load_bytes(writer.as_slice()).unwrap_err();

    assert!(err.is_format());
    assert!(matches!(
        err,
        WorldError::Protocol(ProtocolError::UnsupportedVersion { found: 7, max: 6 })
    ));
    assert!(!game.is_loading());
    assert!(game.transition().is_active());
    assert_eq!(fingerprint(game.world()), before);
    assert_eq!(game.world().random_state(), state);
}

#[test]
fn test_corrupt_save_leaves_world_untouched() {
    let mut game = populated_game();
    let before = fingerprint(game.world());
    let live_behaviors = game.world().behaviors().live_count();

    game.save().unwrap();
    let mut bytes = game.storage().bytes().unwrap().to_vec();
    bytes.truncate(bytes.len() - 3);
    assert!(game.load_bytes(&bytes).unwrap_err().is_corrupt());

    assert_eq!(fingerprint(game.world()), before);
    assert_eq!(game.world().behaviors().live_count(), live_behaviors);
}

#[test]
fn test_unknown_level_leaves_world_untouched() {
    let mut game = populated_game();
    let before = fingerprint(game.world());

    let mut writer = versioned(3);
    legacy_header(&mut writer, 1, 42);
    writer.write_int(0);
    writer.write_int(0);
    writer.write_transform(&Transform::IDENTITY);
    writer.write_color(Color::BLACK);

    assert!(matches!(
        game.load_bytes(writer.as_slice()),
        Err(WorldError::UnknownLevel(42))
    ));
    assert_eq!(fingerprint(game.world()), before);
}

#[test]
fn test_reseed_on_load_replaces_saved_stream() {
    let mut source = populated_game();
    source.save().unwrap();
    let bytes = source.storage().bytes().unwrap().to_vec();
    let saved = source.world().random_state();

    let mut kept = game(&WorldConfig::default());
    load_into(&mut kept, &bytes);
    assert_eq!(kept.world().random_state(), saved);

    let mut config = WorldConfig::default();
    config.reseed_on_load = true;
    let mut reseeded = game(&config);
    let main_before = reseeded.world().main_random_state();
    load_into(&mut reseeded, &bytes);
    assert_ne!(reseeded.world().random_state(), saved);
    assert_ne!(reseeded.world().main_random_state(), main_before);
    assert_eq!(fingerprint(reseeded.world()), fingerprint(source.world()));
}

fn checked_out(world: &World) -> usize {
    world.factories().iter().map(|factory| factory.live_count()).sum()
}

#[test]
fn test_second_load_rejected_while_pending() {
    let mut source = populated_game();
    source.save().unwrap();
    let bytes = source.storage().bytes().unwrap().to_vec();

    let mut config = WorldConfig::default();
    config.levels[0].load_delay = 3;
    let mut target = game(&config);
    target.world_mut().spawn(0, 0, 0).unwrap();

    target.load_bytes(&bytes).unwrap();
    assert!(target.is_loading());
    let staged = checked_out(target.world());
    assert_eq!(staged, 1 + source.world().shape_count());

    assert!(matches!(target.load_bytes(&bytes), Err(WorldError::LoadInProgress)));
    assert!(target.is_loading());
    assert_eq!(checked_out(target.world()), staged);

    assert!(target.settle(8));
    assert!(!target.is_loading());
    assert_eq!(target.world().shape_count(), source.world().shape_count());
    assert_eq!(checked_out(target.world()), source.world().shape_count());
    assert_eq!(fingerprint(target.world()), fingerprint(source.world()));
}

#[test]
fn test_reader_max_version_gates_streams() {
    let mut source = populated_game();
    source.save().unwrap();
    let bytes = source.storage().bytes().unwrap();

    assert_eq!(GameDataReader::open_with_max(bytes, SAVE_VERSION).unwrap().version(), 6);
    assert_eq!(GameDataReader::open_with_max(bytes, 9).unwrap().version(), 6);
    assert!(matches!(
        GameDataReader::open_with_max(bytes, 5),
        Err(ProtocolError::UnsupportedVersion { found: 6, max: 5 })
    ));
}

#[test]
fn test_version_three_stream() {
    let mut writer = versioned(3);
    legacy_header(&mut writer, 2, 1);
    for (shape, color) in [(0, Color::BLACK), (2, Color::new(1.0, 0.0, 0.0, 1.0))] {
        writer.write_int(shape);
        writer.write_int(1);
        writer.write_transform(&Transform::new(Vec3::X, Quaternion::IDENTITY, Vec3::ONE));
        writer.write_color(color);
    }

    let mut game = game(&WorldConfig::default());
    load_into(&mut game, writer.as_slice());

    let prints = fingerprint(game.world());
    assert_eq!(prints.len(), 2);
    assert_eq!(prints[1].shape, 2);
    assert_eq!(prints[1].colors, vec![Color::new(1.0, 0.0, 0.0, 1.0); 3]);
    assert!(prints.iter().all(|print| print.behaviors.is_empty() && print.age == 0.0));
    assert_eq!(game.world().rates().creation_rate, 0.5);
    assert_eq!(game.world().rates().creation_progress, 0.25);
}

#[test]
fn test_version_four_synthesizes_legacy_behaviors() {
    let spin = Vec3::new(10.0, 0.0, 0.0);
    let velocity = Vec3::new(0.0, 0.0, -1.0);
    let mut writer = versioned(4);
    legacy_header(&mut writer, 1, 1);
    writer.write_int(1);
    writer.write_int(0);
    writer.write_transform(&Transform::IDENTITY);
    writer.write_color(Color::WHITE);
    writer.write_vector3(spin);
    writer.write_vector3(velocity);

    let mut game = game(&WorldConfig::default());
    load_into(&mut game, writer.as_slice());

    let prints = fingerprint(game.world());
    assert_eq!(prints.len(), 1);
    assert_eq!(
        prints[0].behaviors,
        vec![
            Behavior::Rotation(RotationBehavior::new(spin)),
            Behavior::Movement(MovementBehavior::new(velocity)),
        ]
    );
    assert!(prints[0]
        .behaviors
        .iter()
        .map(Behavior::kind)
        .eq([BehaviorKind::Rotation, BehaviorKind::Movement]));
}

#[test]
fn test_legacy_count_only_stream() {
    let mut writer = GameDataWriter::headerless();
    writer.write_count(2);
    writer.write_transform(&Transform::IDENTITY);
    writer.write_transform(&Transform::new(Vec3::Y, Quaternion::IDENTITY, Vec3::ONE));

    let mut game = game(&WorldConfig::default());
    game.world_mut().set_creation_rate(4.0);
    load_into(&mut game, writer.as_slice());

    let prints = fingerprint(game.world());
    assert_eq!(prints.len(), 2);
    assert_eq!(prints[1].transform.position, Vec3::Y);
    assert!(prints.iter().all(|print| print.shape == 0 && print.colors == [Color::WHITE]));
    assert_eq!(game.world().rates().creation_rate, 0.0);
}

#[test]
fn test_surplus_colors_keep_stream_aligned() {
    let stored: Vec<Color> = (0..5).map(|i| Color::new(i as f32 * 0.2, 0.0, 0.0, 1.0)).collect();
    let mut writer = GameDataWriter::new();
    legacy_header(&mut writer, 2, 1);

    writer.write_int(0);
    writer.write_int(2);
    writer.write_int(0);
    writer.write_transform(&Transform::IDENTITY);
    writer.write_count(stored.len());
    for &color in &stored {
        writer.write_color(color);
    }
    writer.write_float(0.0);
    writer.write_count(0);

    writer.write_int(0);
    writer.write_int(0);
    writer.write_int(1);
    writer.write_transform(&Transform::new(Vec3::Z, Quaternion::IDENTITY, Vec3::ONE));
    writer.write_count(1);
    writer.write_color(Color::BLACK);
    writer.write_float(2.5);
    writer.write_count(1);
    writer.write_int(BehaviorKind::Movement.tag());
    writer.write_vector3(Vec3::X);

    let mut game = game(&WorldConfig::default());
    load_into(&mut game, writer.as_slice());

    let prints = fingerprint(game.world());
    assert_eq!(prints[0].colors, stored[..3].to_vec());
    assert_eq!(prints[1].transform.position, Vec3::Z);
    assert_eq!(prints[1].colors, vec![Color::BLACK]);
    assert_eq!(prints[1].age, 2.5);
    assert_eq!(
        prints[1].behaviors,
        vec![Behavior::Movement(MovementBehavior::new(Vec3::X))]
    );
}

#[test]
fn test_unknown_behavior_tag_rejected() {
    let mut writer = GameDataWriter::new();
    legacy_header(&mut writer, 1, 1);
    writer.write_int(0);
    writer.write_int(0);
    writer.write_int(0);
    writer.write_transform(&Transform::IDENTITY);
    writer.write_count(1);
    writer.write_color(Color::WHITE);
    writer.write_float(0.0);
    writer.write_count(1);
    writer.write_int(99);

    let mut game = game(&WorldConfig::default());
    assert!(matches!(
        game.load_bytes(writer.as_slice()),
        Err(WorldError::UnknownBehavior(99))
    ));
    assert_eq!(game.world().shape_count(), 0);
}

fn satellite_round_trip(focal_first: bool) {
    let mut source = game(&WorldConfig::default());
    let world = source.world_mut();
    let (focal, satellite) = if focal_first {
        let focal = world.spawn(0, 2, 0).unwrap();
        (focal, world.spawn(0, 1, 0).unwrap())
    } else {
        let satellite = world.spawn(0, 1, 0).unwrap();
        (world.spawn(0, 2, 0).unwrap(), satellite)
    };
    world.shape_mut(focal).unwrap().transform.position = Vec3::new(10.0, 0.0, 0.0);
    world.attach_behavior(
        satellite,
        SatelliteBehavior::new(ShapeInstance::Resolved(focal), Vec3::Y, 1.0, 0.5).into(),
    );
    source.save().unwrap();
    let bytes = source.storage().bytes().unwrap().to_vec();

    let mut target = game(&WorldConfig::default());
    load_into(&mut target, &bytes);
    let world = target.world();
    let (focal_index, satellite_index) = if focal_first { (0, 1) } else { (1, 0) };
    let loaded_focal = world.live()[focal_index];
    let loaded_satellite = world.live()[satellite_index];

    let behavior = satellite_of(world, loaded_satellite);
    assert_eq!(behavior.focal, ShapeInstance::Resolved(loaded_focal));
    assert_eq!(behavior.focal.get(&world.lookup()).unwrap().shape_id(), 2);

    target.update(0.25);
    let world = target.world();
    let center = world.shape(loaded_focal).unwrap().transform.position;
    let orbiting = world.shape(loaded_satellite).unwrap().transform.position;
    assert!((orbiting.distance(center) - 1.0).abs() < 1e-4);
}

#[test]
fn test_satellite_resolves_when_focal_saved_first() {
    satellite_round_trip(true);
}

#[test]
fn test_satellite_resolves_when_focal_saved_last() {
    satellite_round_trip(false);
}

#[test]
fn test_satellite_escapes_when_focal_destroyed() {
    let mut game = game(&WorldConfig::default());
    let world = game.world_mut();
    let focal = world.spawn(0, 0, 0).unwrap();
    let satellite = world.spawn(0, 0, 0).unwrap();
    world.attach_behavior(
        satellite,
        SatelliteBehavior::new(ShapeInstance::Resolved(focal), Vec3::Y, 1.0, 0.25).into(),
    );
    game.update(0.5);
    game.update(0.5);

    game.world_mut().remove_at(0);
    game.update(0.5);
    let world = game.world();
    let escaped = world.live()[0];
    assert_eq!(escaped, satellite);
    let kinds: Vec<_> = world
        .shape(escaped)
        .unwrap()
        .behaviors()
        .iter()
        .filter_map(|&handle| world.behaviors().get(handle).map(Behavior::kind))
        .collect();
    assert_eq!(kinds, vec![BehaviorKind::Movement]);
}

#[test]
fn test_file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("save.bin");
    let mut storage = FileStorage::new(&path);
    assert!(matches!(storage.retrieve(), Err(WorldError::NoSaveFound)));

    storage.persist(&[1, 2, 3, 4]).unwrap();
    storage.persist(&[9, 8]).unwrap();
    assert_eq!(storage.retrieve().unwrap(), vec![9, 8]);
    let mut temp = path.clone().into_os_string();
    temp.push(".tmp");
    assert!(!std::path::Path::new(&temp).exists());

    let config = WorldConfig::default();
    let mut source = Game::new(&config, ConfigLevelLoader::from_config(&config), storage).unwrap();
    assert!(source.settle(4));
    source.world_mut().spawn(0, 1, 1).unwrap();
    source.save().unwrap();

    let mut target =
        Game::new(&config, ConfigLevelLoader::from_config(&config), FileStorage::new(&path)).unwrap();
    assert!(target.settle(4));
    target.load().unwrap();
    assert!(target.settle(8));
    assert_eq!(fingerprint(target.world()), fingerprint(source.world()));
}

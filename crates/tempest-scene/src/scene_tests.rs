//! Scene-level tests driven by a manual clock.

use tempest_config::{ConfigError, SimulationMode, SpawnRegionConfig};
use tempest_particles::DrawList;
use tempest_physics::CollisionKind;

use super::*;
use crate::clock::{Clock, ManualClock};

fn small_config() -> Config {
    let mut config = Config::default();
    config.rain.capacity = 2_000;
    config.rain.seed = Some(1);
    config.snow.capacity = 500;
    config.snow.seed = Some(2);
    config
}

fn run_frames(scene: &mut WeatherScene, clock: &ManualClock, frames: usize) -> Vec<SceneFrame> {
    let mut list = DrawList::new();
    (0..frames)
        .map(|_| {
            list.clear();
            scene.frame(clock.advance(0.016), &mut list).unwrap()
        })
        .collect()
}

#[test]
fn test_new_scene_has_terrain_only() {
    let scene = WeatherScene::new(&small_config(), 0.0).unwrap();
    assert_eq!(scene.physics().body_count(), 1);

    let terrain = scene.terrain();
    assert_eq!(scene.physics().record(terrain).unwrap().kind, CollisionKind::Terrain);
    let t = scene.physics().transform(terrain).unwrap();
    assert_eq!(t.position, Vec3::new(0.0, -30.0, 0.0));
    assert_eq!(scene.weather().current(), None);
}

#[test]
fn test_clear_weather_draws_nothing() {
    let mut scene = WeatherScene::new(&small_config(), 0.0).unwrap();
    let mut list = DrawList::new();
    let frame = scene.frame(0.1, &mut list).unwrap();
    assert_eq!(frame.rain, None);
    assert_eq!(frame.snow, None);
    assert_eq!(frame.shader, ShaderSelection::Normal);
    assert!(list.batches().is_empty());
    assert!((5..=6).contains(&frame.physics_steps));
}

#[test]
fn test_rain_frame_draws_one_rain_batch() {
    let mut scene = WeatherScene::new(&small_config(), 0.0).unwrap();
    scene.toggle_rain();
    let mut list = DrawList::new();
    let frame = scene.frame(0.01, &mut list).unwrap();

    let stats = frame.rain.unwrap();
    assert_eq!(stats.spawned, 100);
    assert_eq!(stats.drawn, 100);
    assert_eq!(frame.snow, None);
    assert_eq!(frame.shader, ShaderSelection::Wet);

    assert_eq!(list.batches().len(), 1);
    assert_eq!(list.batches()[0].color, scene.rain().settings().appearance.color);
    assert_eq!(list.instance_count(), 100);
}

#[test]
fn test_snow_replaces_rain() {
    let mut scene = WeatherScene::new(&small_config(), 0.0).unwrap();
    let clock = ManualClock::new(0.0);
    scene.toggle_rain();
    run_frames(&mut scene, &clock, 3);
    scene.toggle_snow();
    let frames = run_frames(&mut scene, &clock, 3);

    assert!(frames.iter().all(|f| f.rain.is_none() && f.snow.is_some()));
    assert_eq!(frames[2].shader, ShaderSelection::Snow);
    assert!(frames[2].shader_level.unwrap() < -0.2);
}

#[test]
fn test_wet_level_rises_over_frames() {
    let mut scene = WeatherScene::new(&small_config(), 0.0).unwrap();
    let clock = ManualClock::new(0.0);
    scene.toggle_rain();
    scene.toggle_fog();
    let frames = run_frames(&mut scene, &clock, 10);

    let first = frames[0].shader_level.unwrap();
    let last = frames[9].shader_level.unwrap();
    assert!(last > first);
    assert!((last - (-0.2 + 0.16 / 10.0)).abs() < 1e-4);
    assert!(frames.iter().all(|f| f.fog));
}

#[test]
fn test_physics_advances_on_fixed_steps() {
    let mut scene = WeatherScene::new(&small_config(), 0.0).unwrap();
    let clock = ManualClock::new(0.0);
    let frames = run_frames(&mut scene, &clock, 60);
    let steps: u32 = frames.iter().map(|f| f.physics_steps).sum();
    // 0.96 s at 60 Hz.
    assert!((56..=58).contains(&steps), "steps={steps}");
    assert_eq!(scene.frame_count(), 60);
}

fn dynamic_config() -> Config {
    let mut config = small_config();
    config.rain.mode = SimulationMode::Dynamic;
    config.rain.capacity = 400;
    config.rain.spawn_rate = 100.0;
    config.weather.rain = true;
    config
}

#[test]
fn test_dynamic_rain_binds_bodies_once() {
    let mut scene = WeatherScene::new(&dynamic_config(), 0.0).unwrap();
    let clock = ManualClock::new(0.0);
    run_frames(&mut scene, &clock, 50);

    let created = scene.rain().bodies_created();
    assert!(created > 0);
    assert!(created <= 400);
    assert_eq!(scene.physics().body_count(), created + 1);

    // Bodies are released with the scene.
    let removed = scene.shutdown();
    assert_eq!(removed, created + 1);
    assert_eq!(scene.physics().body_count(), 0);
}

#[test]
fn test_dynamic_rain_hits_terrain() {
    let mut scene = WeatherScene::new(&dynamic_config(), 0.0).unwrap();
    let clock = ManualClock::new(0.0);
    let frames = run_frames(&mut scene, &clock, 220);

    let hits: usize = frames.iter().filter_map(|f| f.rain).map(|s| s.hits).sum();
    assert!(hits > 0, "drops falling 50 m for 3.5 s must reach the terrain");
    assert!(scene.physics().hits_flagged() > 0);
    assert!(clock.now() > 3.0);
}

#[test]
fn test_inverted_region_is_rejected() {
    let mut config = small_config();
    config.weather.spawn_region = SpawnRegionConfig {
        min: [10.0, 0.0],
        max: [-10.0, 5.0],
        height: 20.0,
    };
    let err = WeatherScene::new(&config, 0.0).err().unwrap();
    assert!(matches!(err, SceneError::Region(_)));
}

#[test]
fn test_empty_pool_is_rejected() {
    let mut config = small_config();
    config.snow.capacity = 0;
    let err = WeatherScene::new(&config, 0.0).err().unwrap();
    assert!(matches!(err, SceneError::Particles(_)));
}

#[test]
fn test_zero_physics_timestep_is_rejected() {
    let mut config = small_config();
    config.physics.timestep = 0.0;
    let err = WeatherScene::new(&config, 0.0).err().unwrap();
    assert!(matches!(
        err,
        SceneError::Config(ConfigError::Invalid { ref field, .. }) if field == "physics.timestep"
    ));
}

#[test]
fn test_frame_clamp_shorter_than_timestep_is_rejected() {
    let mut config = small_config();
    config.physics.max_frame_time = config.physics.timestep / 2.0;
    let err = WeatherScene::new(&config, 0.0).err().unwrap();
    assert!(matches!(
        err,
        SceneError::Config(ConfigError::Invalid { ref field, .. }) if field == "physics.max_frame_time"
    ));
}

#[test]
fn test_scene_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::load_or_create(dir.path()).unwrap();
    config.rain.capacity = 100;
    config.snow.capacity = 100;
    config.weather.snow = true;
    config.save(dir.path()).unwrap();

    let loaded = Config::load_or_create(dir.path()).unwrap();
    let scene = WeatherScene::new(&loaded, 0.0).unwrap();
    assert!(scene.weather().is_snowing());
    assert_eq!(scene.snow().pool().len(), 100);
}

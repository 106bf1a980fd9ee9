//! Headless weather scene.
//!
//! Loads `config.ron`, applies command-line overrides, then runs the scene
//! for a fixed number of frames, recording draw calls instead of rendering.
//!
//! Run with: `cargo run -p tempest-scene -- --rain --frames 300`

use std::process::ExitCode;

use clap::Parser;
use tempest_config::{CliArgs, Config, default_config_dir};
use tempest_particles::DrawList;
use tempest_physics::DynamicsWorld;
use tempest_scene::{Clock, SceneError, SystemClock, WeatherScene};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("falling back to default config: {err}");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    tempest_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!("Tempest - weather particle scene");
    info!(
        "Config: {} | Frames: {} | Rain: {} | Snow: {} | Fog: {}",
        config_dir.display(),
        config.debug.frames,
        config.weather.rain,
        config.weather.snow,
        config.weather.fog,
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "scene failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), SceneError> {
    let clock = SystemClock::new();
    let mut scene = WeatherScene::new(config, clock.now())?;
    let mut draw_list = DrawList::new();
    let interval = u64::from(config.debug.stats_interval);

    let mut instances = 0usize;
    for _ in 0..config.debug.frames {
        draw_list.clear();
        let frame = scene.frame(clock.now(), &mut draw_list)?;
        instances += draw_list.instance_count();

        if interval > 0 && scene.frame_count() % interval == 0 {
            info!(
                frame = scene.frame_count(),
                rain_live = frame.rain.map(|s| s.live),
                snow_live = frame.snow.map(|s| s.live),
                hits = frame.rain.map_or(0, |s| s.hits) + frame.snow.map_or(0, |s| s.hits),
                bodies = scene.physics().body_count(),
                shader = ?frame.shader,
                level = frame.shader_level,
                "stats"
            );
        }
    }

    let elapsed = clock.now();
    info!(
        frames = scene.frame_count(),
        instances,
        seconds = elapsed,
        fps = scene.frame_count() as f64 / elapsed.max(f64::EPSILON),
        "run complete"
    );
    scene.shutdown();
    Ok(())
}

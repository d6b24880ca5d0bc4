//! Headless world server binary.
//!
//! Opens (or creates) the world named in `config.ron`, generates the chunks
//! around spawn, then runs a bounded number of world ticks (time, sapling
//! growth, idle chunk eviction, periodic saving) and saves on exit.
//! Run with `cargo run -p quarry-server -- --ticks 200` for a bounded run.

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use quarry_config::{CliArgs, Config};
use quarry_world::{FlatGenerator, NullSink, World};
use tracing::{error, info, warn};

/// Target wall-clock length of one world tick.
const TICK: Duration = Duration::from_millis(50);

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .map(|dir| dir.join("quarry"))
            .unwrap_or_else(|| ".".into())
    });

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    quarry_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let world = match World::open(
        &config,
        Box::new(FlatGenerator::default()),
        Arc::new(NullSink),
    ) {
        Ok(world) => world,
        Err(e) => {
            error!("failed to open world {}: {e}", config.storage.world_dir);
            return ExitCode::FAILURE;
        }
    };

    pregenerate(&world, config.server.pregen_radius);
    run(&world, &config);

    match world.shutdown() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("shutdown failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Loads or generates every chunk within `radius` of the spawn chunk.
fn pregenerate(world: &World, radius: u32) {
    let start = Instant::now();
    let spawn = world.spawn().chunk();
    let radius = radius as i32;
    let mut ready = 0;
    for dx in -radius..=radius {
        for dz in -radius..=radius {
            let pos = spawn.offset(dx, dz);
            let (x, z) = pos.origin();
            match world.get_block(x, 0, z, true) {
                Ok(_) => ready += 1,
                Err(e) => warn!("chunk ({}, {}) unavailable: {e}", pos.x, pos.z),
            }
        }
    }
    let spawn = world.spawn();
    info!(
        "{ready} chunk(s) ready around spawn ({}, {}, {}) in {:.1?}",
        spawn.x,
        spawn.y,
        spawn.z,
        start.elapsed()
    );
}

/// Runs `tick_limit` world ticks. A limit of zero skips the loop, so the
/// server only pregenerates and saves.
fn run(world: &World, config: &Config) {
    let idle = Duration::from_secs(config.storage.chunk_idle_secs);
    let save_every = config.storage.save_interval_ticks;
    let limit = config.server.tick_limit;

    let mut tick: u64 = 0;
    while tick < limit {
        let started = Instant::now();
        tick += 1;

        world.advance_time(1);
        let grown = world.tick_growth();
        if grown > 0 {
            info!("{grown} tree(s) grew on tick {tick}");
        }

        if maintenance_due(tick, save_every) {
            let evicted = world.store().evict_idle(idle);
            if evicted > 0 {
                info!("evicted {evicted} idle chunk(s)");
            }
            if let Err(e) = world.save_all() {
                warn!("periodic save failed: {e}");
            }
        }

        if let Some(rest) = TICK.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }
    info!("stopping after {tick} tick(s)");
}

/// Whether `tick` is a periodic save and eviction tick. An interval of zero
/// disables both.
fn maintenance_due(tick: u64, interval: u64) -> bool {
    interval != 0 && tick % interval == 0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_never_saves() {
        assert!((1..=5000).all(|tick| !maintenance_due(tick, 0)));
    }

    #[test]
    fn test_interval_saves_on_multiples() {
        assert!(!maintenance_due(1, 1200));
        assert!(!maintenance_due(1199, 1200));
        assert!(maintenance_due(1200, 1200));
        assert!(maintenance_due(2400, 1200));
        assert!(maintenance_due(7, 1));
    }
}

//! Command-line argument parsing for the server binary.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Quarry server command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "quarry", about = "Chunked voxel world server")]
pub struct CliArgs {
    /// Directory holding level.dat and the chunk files.
    #[arg(long)]
    pub world_dir: Option<String>,

    /// Chunks around spawn to generate at startup.
    #[arg(long)]
    pub pregen_radius: Option<u32>,

    /// Ticks to run before saving and exiting.
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref dir) = args.world_dir {
            self.storage.world_dir = dir.clone();
        }
        if let Some(radius) = args.pregen_radius {
            self.server.pregen_radius = radius;
        }
        if let Some(ticks) = args.ticks {
            self.server.tick_limit = ticks;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            world_dir: Some("/srv/quarry/world".to_string()),
            ticks: Some(600),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.storage.world_dir, "/srv/quarry/world");
        assert_eq!(config.server.tick_limit, 600);
        // Non-overridden fields retain defaults
        assert_eq!(config.server.pregen_radius, 2);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "quarry",
            "--world-dir",
            "w",
            "--pregen-radius",
            "4",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.world_dir.as_deref(), Some("w"));
        assert_eq!(args.pregen_radius, Some(4));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.ticks.is_none());
    }
}

//! Server settings with defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const FILE_NAME: &str = "config.ron";

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where and how often the world is written to disk.
    pub storage: StorageConfig,
    /// World-creation and gameplay tuning.
    pub world: WorldConfig,
    /// Binary run-loop settings.
    pub server: ServerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `level.dat` and the chunk file tree.
    pub world_dir: String,
    /// Ticks between automatic `save_all` calls (0 disables).
    pub save_interval_ticks: u64,
    /// Seconds a chunk may go unaccessed before it is evicted.
    pub chunk_idle_secs: u64,
}

/// A block coordinate in the config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpawnPoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Spawn point written into a freshly created world.
    pub default_spawn: SpawnPoint,
    /// Each growth tick, a sapling matures with probability `1 / sapling_growth_odds`.
    pub sapling_growth_odds: u32,
    /// Lowest y (exclusive) searched when moving spawn onto solid ground.
    pub spawn_search_floor: i32,
    /// Whether a chest or furnace placed by a player starts out locked to them.
    pub chests_locked_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Radius in chunks around spawn generated at startup.
    pub pregen_radius: u32,
    /// Ticks to run before a clean shutdown (0 = pregenerate, save, exit).
    pub tick_limit: u64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            world_dir: "world".to_string(),
            save_interval_ticks: 1200,
            chunk_idle_secs: 300,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            default_spawn: SpawnPoint { x: 0, y: 120, z: 0 },
            sapling_growth_odds: 50,
            spawn_search_floor: 30,
            chests_locked_by_default: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            pregen_radius: 2,
            tick_limit: 0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(FILE_NAME);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(FILE_NAME), serialized).map_err(ConfigError::WriteError)
    }

    /// Re-reads the file: returns `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(FILE_NAME))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Rejects settings the world cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.world_dir.is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.world_dir",
                reason: "must not be empty",
            });
        }
        if self.world.sapling_growth_odds == 0 {
            return Err(ConfigError::Invalid {
                field: "world.sapling_growth_odds",
                reason: "must be at least 1",
            });
        }
        if !(0..128).contains(&self.world.default_spawn.y) {
            return Err(ConfigError::Invalid {
                field: "world.default_spawn.y",
                reason: "must be within 0..=127",
            });
        }
        if !(0..128).contains(&self.world.spawn_search_floor) {
            return Err(ConfigError::Invalid {
                field: "world.spawn_search_floor",
                reason: "must be within 0..=127",
            });
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }
}

//! Configuration for the quarry world server.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line via clap. Unknown fields are ignored and missing ones fall
//! back to defaults, so older and newer files both load.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, ServerConfig, SpawnPoint, StorageConfig, WorldConfig};
pub use error::ConfigError;

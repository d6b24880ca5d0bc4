//! Logging setup for the quarry server.
//!
//! Installs a `tracing` subscriber with a human-readable console layer and,
//! in debug builds, a JSON file layer for post-mortem analysis. The level
//! comes from `RUST_LOG` when set, otherwise from the config file.

use std::path::Path;

use quarry_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE: &str = "quarry.log";

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - whether to also write the JSON file
/// * `config` - source of the fallback log level
///
/// ```no_run
/// use quarry_config::Config;
/// use quarry_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_level(true)
                .with_timer(fmt::time::uptime()),
        );

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// The filter `init_logging` would install: `RUST_LOG` if set, else the
/// configured level, else [`DEFAULT_FILTER`].
pub fn env_filter(config: Option<&Config>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter(config)))
}

fn fallback_filter(config: Option<&Config>) -> &str {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.as_str(),
        _ => DEFAULT_FILTER,
    }
}

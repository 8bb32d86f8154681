//! Logging utilities and structured logging support
//!
//! The library only talks to the `log` facade. Binaries pick the backend; the
//! helpers here wire up `env_logger` the same way everywhere.

pub use log::{debug, error, info, trace, warn};

use log::LevelFilter;

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize the logging system with an explicit filter such as `"info"` or
/// `"scene_core=debug"`
///
/// `RUST_LOG` still wins when it is set. Calling this twice is harmless, the
/// second logger is simply not installed.
pub fn init_with_level(filter: &str) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filter);
    if let Ok(env) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env);
    }
    builder.try_init()
}

/// Parse a level name as used in configuration files
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    level.trim().parse().ok()
}

//! Logging utilities

pub use log::{debug, error, info, trace, warn};

use crate::config::LoggingConfig;

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    if env_logger::try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

/// Initialize the logging system, falling back to the configured filter
/// when `RUST_LOG` is unset
pub fn init_with_config(config: &LoggingConfig) {
    let env = env_logger::Env::default().default_filter_or(config.filter.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if config.timestamps {
        builder.format_timestamp_millis();
    } else {
        builder.format_timestamp(None);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

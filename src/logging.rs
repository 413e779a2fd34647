//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::{ReflError, ReflResult};
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Calling this a second time
/// in the same process returns an error.
pub fn init_tracing(config: &LoggingConfig) -> ReflResult<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| {
        ReflError::Configuration(format!("failed to install tracing subscriber: {}", e))
    })
}

fn build_filter(config: &LoggingConfig) -> ReflResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            ReflError::Configuration(format!("invalid log level '{}': {}", config.level, e))
        }),
    }
}

//! Configuration loading using Figment.
//!
//! Configuration is merged from, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (`refl.toml` unless a path is given; a missing file is skipped)
//! 3. environment variables prefixed with `REFL_`, `__` separating sections
//!
//! ```text
//! REFL_INSTRUMENT__BEAMLINE_OVERRIDE=POLREF
//! REFL_INSTRUMENT__DRY_RUN=true
//! REFL_INSTRUMENT__POLARIZATION_MODE=PNR
//! REFL_FRAMES__UP_FRAMES=4
//! REFL_LOGGING__LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```no_run
//! use refl_control::config::ReflConfig;
//!
//! fn main() -> refl_control::error::ReflResult<()> {
//!     let config = ReflConfig::load()?;
//!     println!("dry run: {}", config.instrument.dry_run);
//!     Ok(())
//! }
//! ```

use crate::error::{ReflError, ReflResult};
use crate::instrument::{FlipperOverrides, FlipperSettings, InstrumentSettings, PolarizationFrames};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File read by [`ReflConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "refl.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "REFL_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflConfig {
    /// Beamline selection, dry run and measurement mode.
    pub instrument: InstrumentSettings,
    /// Partial overrides of the flipper defaults.
    pub flipper: FlipperOverrides,
    /// Frame counts for polarized sessions.
    pub frames: PolarizationFrames,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ReflConfig {
    /// Loads `refl.toml` from the working directory plus environment overrides.
    pub fn load() -> ReflResult<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Loads from a specific file plus environment overrides, then validates.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ReflResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack, exposed so callers can merge further sources.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(ReflConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - A beamline override, when present, is not blank
    /// - Frame counts are positive
    /// - Log level is one of trace, debug, info, warn, error
    pub fn validate(&self) -> ReflResult<()> {
        if let Some(name) = &self.instrument.beamline_override {
            if name.trim().is_empty() {
                return Err(ReflError::Configuration(
                    "instrument.beamline_override cannot be empty".to_string(),
                ));
            }
        }

        self.frames.validate()?;

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ReflError::Configuration(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Flipper defaults with the configured overrides applied.
    pub fn flipper_settings(&self) -> FlipperSettings {
        FlipperSettings::default().merged(&self.flipper)
    }

    /// Renders the effective configuration as TOML.
    pub fn to_toml(&self) -> ReflResult<String> {
        toml::to_string_pretty(self).map_err(|e| ReflError::Configuration(e.to_string()))
    }
}

//! Polarization capability: spin flipper and hardware frame periods.
//!
//! Only polarized beamlines carry a [`Polarizer`]. The flipper is configured from
//! a complete set of defaults ([`FlipperSettings`]); a caller can override any
//! subset of fields with [`FlipperOverrides`], and fields left unset keep their
//! default value.

use crate::error::{ReflError, ReflResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Control point for the polariser flipper drive amplitude.
pub const POLARISER_AMP: &str = "POLARISER_AMP";
/// Control point for the flipper state.
pub const FLIPPER_STATE: &str = "FLIPPER_STATE";
/// Control point for the frame count with the flipper off.
pub const UP_FRAMES: &str = "PNR_UP_FRAMES";
/// Control point for the frame count with the flipper on.
pub const DOWN_FRAMES: &str = "PNR_DOWN_FRAMES";

/// Flipper state, polariser then analyser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipperState {
    /// Both flippers off.
    Uu,
    /// Analyser flipper on.
    Ud,
    /// Polariser flipper on.
    Du,
    /// Both flippers on.
    Dd,
}

impl FlipperState {
    /// Numeric code written to the state control point.
    pub fn code(self) -> f64 {
        match self {
            FlipperState::Uu => 0.0,
            FlipperState::Ud => 1.0,
            FlipperState::Du => 2.0,
            FlipperState::Dd => 3.0,
        }
    }
}

impl fmt::Display for FlipperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlipperState::Uu => "uu",
            FlipperState::Ud => "ud",
            FlipperState::Du => "du",
            FlipperState::Dd => "dd",
        };
        f.write_str(name)
    }
}

impl FromStr for FlipperState {
    type Err = ReflError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uu" => Ok(FlipperState::Uu),
            "ud" => Ok(FlipperState::Ud),
            "du" => Ok(FlipperState::Du),
            "dd" => Ok(FlipperState::Dd),
            other => Err(ReflError::Configuration(format!(
                "unknown flipper state '{}' (expected uu, ud, du or dd)",
                other
            ))),
        }
    }
}

/// Complete flipper parameter set, `_p` for the polariser and `_a` for the analyser.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipperSettings {
    pub amp_p: f64,
    pub comp_p: f64,
    pub const_p: f64,
    pub dt_p: f64,
    pub file_p: Option<String>,
    pub amp_a: f64,
    pub comp_a: f64,
    pub const_a: f64,
    pub dt_a: f64,
    pub file_a: Option<String>,
}

impl Default for FlipperSettings {
    fn default() -> Self {
        Self {
            amp_p: 3.5,
            comp_p: 1.023,
            const_p: 0.0298,
            dt_p: -3250.0,
            file_p: None,
            amp_a: 3.5,
            comp_a: 1.234,
            const_a: 0.042,
            dt_a: -3250.0,
            file_a: None,
        }
    }
}

impl FlipperSettings {
    /// Copy of these settings with every field set in `overrides` replaced.
    pub fn merged(&self, overrides: &FlipperOverrides) -> FlipperSettings {
        FlipperSettings {
            amp_p: overrides.amp_p.unwrap_or(self.amp_p),
            comp_p: overrides.comp_p.unwrap_or(self.comp_p),
            const_p: overrides.const_p.unwrap_or(self.const_p),
            dt_p: overrides.dt_p.unwrap_or(self.dt_p),
            file_p: overrides.file_p.clone().or_else(|| self.file_p.clone()),
            amp_a: overrides.amp_a.unwrap_or(self.amp_a),
            comp_a: overrides.comp_a.unwrap_or(self.comp_a),
            const_a: overrides.const_a.unwrap_or(self.const_a),
            dt_a: overrides.dt_a.unwrap_or(self.dt_a),
            file_a: overrides.file_a.clone().or_else(|| self.file_a.clone()),
        }
    }
}

/// Fields the caller explicitly set; `None` keeps the default.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipperOverrides {
    pub amp_p: Option<f64>,
    pub comp_p: Option<f64>,
    pub const_p: Option<f64>,
    pub dt_p: Option<f64>,
    pub file_p: Option<String>,
    pub amp_a: Option<f64>,
    pub comp_a: Option<f64>,
    pub const_a: Option<f64>,
    pub dt_a: Option<f64>,
    pub file_a: Option<String>,
}

impl FlipperOverrides {
    /// Override of the polariser amplitude only.
    pub fn polariser_amplitude(amp_p: f64) -> Self {
        Self {
            amp_p: Some(amp_p),
            ..Self::default()
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Hardware frame counts for the two flipper states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarizationFrames {
    /// Frames with the polariser flipper off.
    pub up_frames: u32,
    /// Frames with the polariser flipper on.
    pub down_frames: u32,
}

impl Default for PolarizationFrames {
    fn default() -> Self {
        Self {
            up_frames: 1,
            down_frames: 1,
        }
    }
}

impl PolarizationFrames {
    /// Frame counts for up and down periods.
    pub fn new(up_frames: u32, down_frames: u32) -> Self {
        Self {
            up_frames,
            down_frames,
        }
    }

    /// Rejects zero frame counts.
    pub fn validate(&self) -> ReflResult<()> {
        if self.up_frames == 0 || self.down_frames == 0 {
            return Err(ReflError::Configuration(format!(
                "frame counts must be positive (up = {}, down = {})",
                self.up_frames, self.down_frames
            )));
        }
        Ok(())
    }
}

/// Polarization hardware held by polarized beamlines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polarizer {
    defaults: FlipperSettings,
}

impl Polarizer {
    /// Polarizer with the given flipper defaults.
    pub fn new(defaults: FlipperSettings) -> Self {
        Self { defaults }
    }

    /// Flipper defaults used when no override is given.
    pub fn defaults(&self) -> &FlipperSettings {
        &self.defaults
    }

    /// Writes that set the flipper to `state`, amplitude first.
    pub fn flipper_commands(
        &self,
        state: FlipperState,
        overrides: Option<&FlipperOverrides>,
    ) -> Vec<(String, f64)> {
        let settings = match overrides {
            Some(overrides) => self.defaults.merged(overrides),
            None => self.defaults.clone(),
        };
        vec![
            (POLARISER_AMP.to_string(), settings.amp_p),
            (FLIPPER_STATE.to_string(), state.code()),
        ]
    }

    /// Writes that configure the up/down frame counts.
    pub fn period_commands(&self, frames: PolarizationFrames) -> ReflResult<Vec<(String, f64)>> {
        frames.validate()?;
        Ok(vec![
            (UP_FRAMES.to_string(), f64::from(frames.up_frames)),
            (DOWN_FRAMES.to_string(), f64::from(frames.down_frames)),
        ])
    }
}

//! Per-slit opening limits.
//!
//! Maximum openings depend only on the polarization mode (the polarizing and
//! analysing optics downstream restrict the usable beam). Minimum openings depend
//! only on the sample orientation: a vertical sample tolerates a fully closed
//! slit, a horizontal one needs a small gap to keep the blades apart.

use crate::error::{ReflError, ReflResult};
use crate::slit::SlitId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sample orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Sample surface is vertical; collimation happens on the horizontal axis.
    Vertical,
    /// Sample surface is horizontal.
    #[default]
    Horizontal,
}

/// Measurement mode that selects the maximum-opening table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolarizationMode {
    /// Unpolarized reflectometry.
    #[default]
    Nr,
    /// Polarized reflectometry.
    Pnr,
    /// Polarized reflectometry with polarization analysis.
    Pa,
    /// Polarization analysis in off-specular geometry.
    PaOffspec,
}

impl PolarizationMode {
    /// All modes with a limit table.
    pub const ALL: [PolarizationMode; 4] = [
        PolarizationMode::Nr,
        PolarizationMode::Pnr,
        PolarizationMode::Pa,
        PolarizationMode::PaOffspec,
    ];

    /// True for every mode that needs a polarizer.
    pub fn is_polarized(self) -> bool {
        !matches!(self, PolarizationMode::Nr)
    }

    /// Canonical name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            PolarizationMode::Nr => "NR",
            PolarizationMode::Pnr => "PNR",
            PolarizationMode::Pa => "PA",
            PolarizationMode::PaOffspec => "PA_OFFSPEC",
        }
    }
}

impl fmt::Display for PolarizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolarizationMode {
    type Err = ReflError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NR" => Ok(PolarizationMode::Nr),
            "PNR" => Ok(PolarizationMode::Pnr),
            "PA" => Ok(PolarizationMode::Pa),
            "PA_OFFSPEC" => Ok(PolarizationMode::PaOffspec),
            _ => Err(ReflError::UnknownPolarizationMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for PolarizationMode {
    type Error = ReflError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PolarizationMode> for String {
    fn from(mode: PolarizationMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Inclusive opening range for one slit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlitBounds {
    /// Smallest permitted opening.
    pub min: f64,
    /// Largest permitted opening.
    pub max: f64,
}

impl SlitBounds {
    /// Creates a bound pair.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bounds for a single blade: a blade travels half of the full gap.
    pub fn blade(self) -> Self {
        Self {
            min: self.min / 2.0,
            max: self.max / 2.0,
        }
    }

    /// True when `value` lies inside the range.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Nearest value inside the range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Maximum openings (mm) per polarization mode, for S1..S4.
fn max_gap_row(mode: PolarizationMode) -> [f64; 4] {
    match mode {
        PolarizationMode::Nr => [10.0, 6.0, 10.0, 10.0],
        PolarizationMode::Pnr => [8.0, 5.0, 8.0, 10.0],
        PolarizationMode::Pa => [6.0, 4.0, 6.0, 10.0],
        PolarizationMode::PaOffspec => [4.0, 2.0, 4.0, 10.0],
    }
}

/// Minimum openings (mm) for a horizontal sample, for S1..S4.
const HORIZONTAL_MIN_GAPS: [f64; 4] = [0.5, 0.1, 0.5, 0.5];

const TABLE_SLITS: [&str; 4] = ["S1", "S2", "S3", "S4"];

/// Selected opening limits for every slit of the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlitLimits {
    /// Upper bound per slit.
    pub max_gaps: BTreeMap<SlitId, f64>,
    /// Lower bound per slit.
    pub min_gaps: BTreeMap<SlitId, f64>,
}

impl SlitLimits {
    /// Builds limits from explicit tables.
    pub fn new(max_gaps: BTreeMap<SlitId, f64>, min_gaps: BTreeMap<SlitId, f64>) -> Self {
        Self { max_gaps, min_gaps }
    }

    /// Gap bounds for `slit`, if both tables know it.
    pub fn bounds(&self, slit: &SlitId) -> Option<SlitBounds> {
        let max = self.max_gaps.get(slit)?;
        let min = self.min_gaps.get(slit)?;
        Some(SlitBounds::new(*min, *max))
    }

    /// Keeps only the entries for `slits`.
    pub fn restricted_to<'a>(&self, slits: impl IntoIterator<Item = &'a SlitId>) -> Self {
        let mut limits = Self::new(BTreeMap::new(), BTreeMap::new());
        for slit in slits {
            if let Some(max) = self.max_gaps.get(slit) {
                limits.max_gaps.insert(slit.clone(), *max);
            }
            if let Some(min) = self.min_gaps.get(slit) {
                limits.min_gaps.insert(slit.clone(), *min);
            }
        }
        limits
    }
}

/// Selects the opening limits for a sample orientation and polarization mode.
pub fn select_limits(orientation: Orientation, mode: PolarizationMode) -> SlitLimits {
    let max_row = max_gap_row(mode);
    let min_row = match orientation {
        Orientation::Vertical => [0.0; 4],
        Orientation::Horizontal => HORIZONTAL_MIN_GAPS,
    };

    let max_gaps = TABLE_SLITS
        .iter()
        .zip(max_row)
        .map(|(name, max)| (SlitId::new(name), max))
        .collect();
    let min_gaps = TABLE_SLITS
        .iter()
        .zip(min_row)
        .map(|(name, min)| (SlitId::new(name), min))
        .collect();

    SlitLimits::new(max_gaps, min_gaps)
}

/// Parses `mode` and selects the limits, failing on an unknown mode.
pub fn select_limits_by_name(orientation: Orientation, mode: &str) -> ReflResult<SlitLimits> {
    let mode: PolarizationMode = mode.parse()?;
    Ok(select_limits(orientation, mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn s(name: &str) -> SlitId {
        SlitId::new(name)
    }

    #[test]
    fn min_depends_only_on_orientation() {
        for mode in PolarizationMode::ALL {
            let vertical = select_limits(Orientation::Vertical, mode);
            let horizontal = select_limits(Orientation::Horizontal, mode);
            assert!(vertical.min_gaps.values().all(|v| *v == 0.0));
            assert!(horizontal.min_gaps.values().all(|v| *v > 0.0));
            assert_eq!(
                horizontal.min_gaps,
                select_limits(Orientation::Horizontal, PolarizationMode::Nr).min_gaps
            );
        }
    }

    #[test]
    fn max_depends_only_on_mode() {
        let pnr = select_limits(Orientation::Horizontal, PolarizationMode::Pnr);
        let nr = select_limits(Orientation::Horizontal, PolarizationMode::Nr);
        assert_eq!(
            pnr.max_gaps,
            select_limits(Orientation::Vertical, PolarizationMode::Pnr).max_gaps
        );
        assert_eq!(nr.max_gaps[&s("S1")], 10.0);
        assert_eq!(pnr.max_gaps[&s("S1")], 8.0);
        assert_ne!(pnr.max_gaps, nr.max_gaps);
    }

    #[test]
    fn s1_bounds_horizontal_nr() {
        let limits = select_limits(Orientation::Horizontal, PolarizationMode::Nr);
        assert_eq!(limits.bounds(&s("S1")), Some(SlitBounds::new(0.5, 10.0)));
        assert_eq!(limits.bounds(&s("S9")), None);
    }

    #[test]
    fn blade_bounds_are_halved() {
        let blade = SlitBounds::new(0.5, 10.0).blade();
        assert_eq!(blade, SlitBounds::new(0.25, 5.0));
    }

    #[test]
    fn unknown_mode_is_configuration_error() {
        let err = select_limits_by_name(Orientation::Horizontal, "SANS").unwrap_err();
        assert!(matches!(err, ReflError::UnknownPolarizationMode(ref m) if m == "SANS"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn mode_names_parse_case_insensitively() {
        assert_eq!("pa-offspec".parse::<PolarizationMode>().unwrap(), PolarizationMode::PaOffspec);
        assert_eq!(" pnr ".parse::<PolarizationMode>().unwrap(), PolarizationMode::Pnr);
        for mode in PolarizationMode::ALL {
            assert_eq!(mode.as_str().parse::<PolarizationMode>().unwrap(), mode);
        }
    }

    #[test]
    fn restriction_keeps_requested_slits() {
        let limits = select_limits(Orientation::Horizontal, PolarizationMode::Nr);
        let three = limits.restricted_to(&[s("S1"), s("S2"), s("S3")]);
        assert_eq!(three.max_gaps.len(), 3);
        assert!(three.bounds(&s("S4")).is_none());
    }
}

//! Slit identifiers, slit values and the control-point naming scheme.
//!
//! A slit opening is either a single symmetric gap or a pair of independently
//! driven blades. The shape is carried by [`SlitValue`] so every consumer
//! handles both forms explicitly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a physical slit position, e.g. `S1`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlitId(String);

impl SlitId {
    /// Creates a slit identifier. Names are normalised to upper case.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_uppercase())
    }

    /// The identifier as written in control-point names.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlitId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opening of one slit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlitValue {
    /// Full symmetric opening.
    Gap(f64),
    /// Independent blade positions, lower/first blade then upper/second blade.
    Blades(f64, f64),
}

impl SlitValue {
    /// Applies `f` to every number carried by the value, keeping its shape.
    pub fn map(self, mut f: impl FnMut(f64) -> f64) -> Self {
        match self {
            SlitValue::Gap(gap) => SlitValue::Gap(f(gap)),
            SlitValue::Blades(a, b) => SlitValue::Blades(f(a), f(b)),
        }
    }

    /// Total opening represented by the value.
    pub fn total_opening(&self) -> f64 {
        match *self {
            SlitValue::Gap(gap) => gap,
            SlitValue::Blades(a, b) => a + b,
        }
    }
}

impl From<f64> for SlitValue {
    fn from(value: f64) -> Self {
        SlitValue::Gap(value)
    }
}

impl From<(f64, f64)> for SlitValue {
    fn from((a, b): (f64, f64)) -> Self {
        SlitValue::Blades(a, b)
    }
}

/// Ordered mapping of slit to opening.
pub type SlitSettings = BTreeMap<SlitId, SlitValue>;

/// Builds [`SlitSettings`] from `(name, value)` pairs.
///
/// ```
/// use refl_control::slit::{settings, SlitValue};
///
/// let col = settings([("S1", SlitValue::Gap(0.5)), ("S2", SlitValue::Gap(0.25))]);
/// assert_eq!(col.len(), 2);
/// ```
pub fn settings<I, K, V>(pairs: I) -> SlitSettings
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<SlitValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (SlitId::new(k), v.into()))
        .collect()
}

/// Physical slit axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Blades move vertically (north/south).
    Vertical,
    /// Blades move horizontally (east/west).
    Horizontal,
}

impl Axis {
    /// The axis at right angles to this one.
    pub fn perpendicular(self) -> Self {
        match self {
            Axis::Vertical => Axis::Horizontal,
            Axis::Horizontal => Axis::Vertical,
        }
    }

    fn gap_suffix(self) -> &'static str {
        match self {
            Axis::Vertical => "VG",
            Axis::Horizontal => "HG",
        }
    }

    fn blade_suffixes(self) -> (&'static str, &'static str) {
        match self {
            Axis::Vertical => ("S", "N"),
            Axis::Horizontal => ("W", "E"),
        }
    }
}

/// One blade of a slit on a given axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blade {
    /// South or west blade.
    Lower,
    /// North or east blade.
    Upper,
}

/// Control point for the full gap of `slit` on `axis`, e.g. `S1VG`.
pub fn gap_control_point(slit: &SlitId, axis: Axis) -> String {
    format!("{}{}", slit, axis.gap_suffix())
}

/// Control point for one blade of `slit` on `axis`, e.g. `S3S`.
pub fn blade_control_point(slit: &SlitId, axis: Axis, blade: Blade) -> String {
    let (lower, upper) = axis.blade_suffixes();
    let suffix = match blade {
        Blade::Lower => lower,
        Blade::Upper => upper,
    };
    format!("{}{}", slit, suffix)
}

/// Expands a slit value into the `(control_point, value)` writes that realise it.
pub fn control_writes(slit: &SlitId, value: SlitValue, axis: Axis) -> Vec<(String, f64)> {
    match value {
        SlitValue::Gap(gap) => vec![(gap_control_point(slit, axis), gap)],
        SlitValue::Blades(lower, upper) => vec![
            (blade_control_point(slit, axis, Blade::Lower), lower),
            (blade_control_point(slit, axis, Blade::Upper), upper),
        ],
    }
}

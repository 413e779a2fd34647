//! Angle scaling of slit openings.
//!
//! Slit openings are defined at a reference ("lowest") angle. For any other angle
//! every scalable opening is multiplied by `angle / lowest_angle`, which keeps the
//! angular resolution constant, and the result is clamped to the slit limits.
//! Clamped values are still usable: the clamp is reported as a [`RangeWarning`]
//! and the run goes on.

use crate::error::{ReflError, ReflResult};
use crate::limits::{SlitBounds, SlitLimits};
use crate::slit::{SlitId, SlitSettings, SlitValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A scaled opening that had to be clamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeWarning {
    /// Slit that was clamped.
    pub slit: SlitId,
    /// Value before clamping.
    pub computed: f64,
    /// Bound that was applied.
    pub applied: f64,
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: computed opening {} is out of range, clamped to {}",
            self.slit, self.computed, self.applied
        )
    }
}

/// Result of [`scale_slits`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledSlits {
    /// Openings to apply.
    pub settings: SlitSettings,
    /// Clamps applied on the way.
    pub warnings: Vec<RangeWarning>,
}

/// Scaling ratio for `angle` against the reference angle.
pub fn scale_ratio(angle: f64, lowest_angle: f64) -> ReflResult<f64> {
    if lowest_angle == 0.0 || !lowest_angle.is_finite() {
        return Err(ReflError::InvalidReferenceAngle(lowest_angle));
    }
    let ratio = angle / lowest_angle;
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(ReflError::InvalidAngle {
            angle,
            lowest_angle,
        });
    }
    Ok(ratio)
}

/// Scales `reference` from `lowest_angle` to `angle`.
///
/// Slits flagged in `disabled` keep their reference value. Every other slit must
/// have bounds in `limits`; single gaps are clamped to the gap bounds and each
/// blade of a blade pair is clamped to half of them.
pub fn scale_slits(
    angle: f64,
    lowest_angle: f64,
    reference: &SlitSettings,
    limits: &SlitLimits,
    disabled: &BTreeMap<SlitId, bool>,
) -> ReflResult<ScaledSlits> {
    let ratio = scale_ratio(angle, lowest_angle)?;

    let mut settings = SlitSettings::new();
    let mut warnings = Vec::new();

    for (slit, value) in reference {
        if disabled.get(slit).copied().unwrap_or(false) {
            settings.insert(slit.clone(), *value);
            continue;
        }

        let bounds = limits
            .bounds(slit)
            .ok_or_else(|| ReflError::MissingLimit(slit.clone()))?;
        let bounds = match value {
            SlitValue::Gap(_) => bounds,
            SlitValue::Blades(..) => bounds.blade(),
        };
        let scaled = value.map(|v| clamp_scalar(slit, v * ratio, bounds, &mut warnings));
        settings.insert(slit.clone(), scaled);
    }

    for warning in &warnings {
        warn!(
            slit = %warning.slit,
            computed = warning.computed,
            applied = warning.applied,
            "Slit opening out of range, clamped"
        );
    }

    Ok(ScaledSlits { settings, warnings })
}

/// Clamps one opening of `slit` to `bounds`, recording a warning when it moves.
pub(crate) fn clamp_scalar(
    slit: &SlitId,
    value: f64,
    bounds: SlitBounds,
    warnings: &mut Vec<RangeWarning>,
) -> f64 {
    if bounds.contains(value) {
        return value;
    }
    let applied = bounds.clamp(value);
    warnings.push(RangeWarning {
        slit: slit.clone(),
        computed: value,
        applied,
    });
    applied
}

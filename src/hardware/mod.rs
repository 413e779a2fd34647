//! Hardware boundary.
//!
//! The beamline control system is reached through three narrow seams:
//!
//! - [`HardwareSink`]: set a named control point to a numeric value. Every slit,
//!   flipper and frame-count command goes through this one operation.
//! - [`IdentityResolver`]: tells which beamline the script runs on.
//! - [`OrientationQuery`]: reports whether the sample stage is in vertical mode.
//!
//! Writes are blocking and ordered: an implementation must not return from
//! [`HardwareSink::write`] until the value has been accepted, so that the next
//! blade motion never overlaps the previous one. Aborting a motion in progress is
//! the sink's own business.

pub mod mock;

use crate::limits::Orientation;
use thiserror::Error;

/// Failure reported by the control system.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    #[error("Control point '{control_point}' rejected the write: {reason}")]
    WriteRejected {
        control_point: String,
        reason: String,
    },

    #[error("Control point '{0}' does not exist")]
    NoSuchControlPoint(String),

    #[error("Control system unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected value from control system: {0}")]
    UnexpectedValue(String),
}

/// Writes values to named control points.
pub trait HardwareSink: Send {
    /// Sets `control_point` to `value`, blocking until the write is accepted.
    fn write(&mut self, control_point: &str, value: f64) -> Result<(), HardwareError>;
}

impl<T: HardwareSink + ?Sized> HardwareSink for Box<T> {
    fn write(&mut self, control_point: &str, value: f64) -> Result<(), HardwareError> {
        (**self).write(control_point, value)
    }
}

/// Resolves the name of the beamline the script runs on.
pub trait IdentityResolver {
    /// Beamline name, e.g. `POLREF`.
    fn resolve_identity(&self) -> Result<String, HardwareError>;
}

/// Reports the current sample orientation.
pub trait OrientationQuery {
    /// Orientation of the sample stage.
    fn orientation(&self) -> Result<Orientation, HardwareError>;
}

/// Resolves the beamline from a facility PV prefix such as `IN:POLREF:`.
#[derive(Debug, Clone)]
pub struct PvPrefixIdentity {
    prefix: String,
}

impl PvPrefixIdentity {
    /// Wraps a PV prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl IdentityResolver for PvPrefixIdentity {
    fn resolve_identity(&self) -> Result<String, HardwareError> {
        self.prefix
            .split(':')
            .nth(1)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                HardwareError::UnexpectedValue(format!("malformed PV prefix '{}'", self.prefix))
            })
    }
}

/// Interprets the text of a mode control point, e.g. `Vertical`.
pub fn parse_orientation(mode: &str) -> Result<Orientation, HardwareError> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "vertical" => Ok(Orientation::Vertical),
        "horizontal" => Ok(Orientation::Horizontal),
        other => Err(HardwareError::UnexpectedValue(format!(
            "unknown sample mode '{}'",
            other
        ))),
    }
}

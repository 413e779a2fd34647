//! Custom error types for the beamline scripting layer.
//!
//! This module defines the primary error type, `ReflError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the different kinds of failures that can occur while turning a measurement request
//! into slit-gap commands.
//!
//! ## Error Hierarchy
//!
//! `ReflError` variants fall into four groups, reported by [`ReflError::kind`]:
//!
//! - **Configuration**: caller bugs such as an unknown slit, an unknown polarization
//!   mode, a beam-blocker operation on an ordinary slit, or a polarization operation
//!   on a generic instrument. These are fatal and never retried.
//! - **Domain**: a reference angle that cannot be used as a scaling divisor.
//! - **Hardware**: a write to a control point failed, or one of the facility lookups
//!   (beamline identity, sample orientation) failed. The underlying
//!   [`HardwareError`](crate::hardware::HardwareError) is kept as the error source.
//! - **State**: an operation was invoked out of order, e.g. a polarized run before
//!   the beamline was initialised for polarization.
//!
//! Out-of-range slit values are deliberately absent here: they are clamped and
//! surfaced as [`RangeWarning`](crate::scaler::RangeWarning) values instead.

use crate::hardware::HardwareError;
use crate::slit::SlitId;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ReflResult<T> = std::result::Result<T, ReflError>;

/// Coarse classification of a [`ReflError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid setup supplied by the caller.
    Configuration,
    /// Mathematically invalid input to the slit scaler.
    Domain,
    /// Failure reported by the hardware layer.
    Hardware,
    /// Operation invoked in the wrong order.
    State,
}

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum ReflError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("Slit '{slit}' is not defined on instrument {instrument}")]
    UnknownSlit { slit: SlitId, instrument: String },

    #[error("No opening limits defined for slit '{0}'")]
    MissingLimit(SlitId),

    #[error("Unknown polarization mode '{0}' (expected NR, PNR, PA or PA_OFFSPEC)")]
    UnknownPolarizationMode(String),

    #[error("Unknown beamline '{0}'")]
    UnknownBeamline(String),

    #[error("Slit '{0}' is not configured as a beam blocker")]
    NotBeamBlocker(SlitId),

    #[error("Instrument {instrument} does not support {operation}")]
    UnsupportedCapability {
        instrument: String,
        operation: String,
    },

    #[error("Reference angle {0} cannot be used to scale slits")]
    InvalidReferenceAngle(f64),

    #[error("Angle {angle} is not comparable to reference angle {lowest_angle}")]
    InvalidAngle { angle: f64, lowest_angle: f64 },

    #[error("Hardware write of {value} to '{control_point}' failed")]
    HardwareWrite {
        control_point: String,
        value: f64,
        #[source]
        source: HardwareError,
    },

    #[error("Failed to resolve beamline identity")]
    IdentityResolution(#[source] HardwareError),

    #[error("Failed to query sample orientation")]
    OrientationQuery(#[source] HardwareError),

    #[error("Polarized session not initialised: call refl_init() before run_angle()")]
    PolarizationNotInitialised,
}

impl ReflError {
    /// Maps the error onto the crate's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReflError::Config(_)
            | ReflError::Configuration(_)
            | ReflError::UnknownSlit { .. }
            | ReflError::MissingLimit(_)
            | ReflError::UnknownPolarizationMode(_)
            | ReflError::UnknownBeamline(_)
            | ReflError::NotBeamBlocker(_)
            | ReflError::UnsupportedCapability { .. } => ErrorKind::Configuration,
            ReflError::InvalidReferenceAngle(_) | ReflError::InvalidAngle { .. } => {
                ErrorKind::Domain
            }
            ReflError::HardwareWrite { .. }
            | ReflError::IdentityResolution(_)
            | ReflError::OrientationQuery(_) => ErrorKind::Hardware,
            ReflError::PolarizationNotInitialised => ErrorKind::State,
        }
    }

    pub(crate) fn unsupported(instrument: &str, operation: &str) -> Self {
        ReflError::UnsupportedCapability {
            instrument: instrument.to_string(),
            operation: operation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReflError::NotBeamBlocker(SlitId::new("S1"));
        assert_eq!(err.to_string(), "Slit 'S1' is not configured as a beam blocker");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ReflError::InvalidReferenceAngle(0.0).kind(),
            ErrorKind::Domain
        );
        assert_eq!(
            ReflError::unsupported("INTER", "set_flipper").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ReflError::PolarizationNotInitialised.kind(),
            ErrorKind::State
        );
    }

    #[test]
    fn test_hardware_error_keeps_source() {
        use std::error::Error as _;

        let err = ReflError::HardwareWrite {
            control_point: "S1VG".to_string(),
            value: 1.5,
            source: HardwareError::WriteRejected {
                control_point: "S1VG".to_string(),
                reason: "motor fault".to_string(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Hardware);
        assert!(err.source().is_some());
    }
}

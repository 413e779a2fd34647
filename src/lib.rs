//! Core library for scripting neutron reflectometry beamlines.
//!
//! The crate maps a logical measurement request (angle, slit configuration,
//! polarization mode, sample orientation) onto a validated, per-beamline list
//! of slit-gap commands, and sequences those commands into transmission and
//! angle runs.
//!
//! - [`profile`] and [`limits`] hold the static beamline data.
//! - [`scaler`] scales reference slit openings to a run angle.
//! - [`instrument`] turns slit settings into control-point writes through a
//!   [`hardware::HardwareSink`].
//! - [`sequencer`] drives an instrument through a measurement session.
//! - [`scripting`] runs measurement scripts against a session.
//!
//! # Example
//!
//! ```
//! use refl_control::hardware::mock::{FixedOrientation, RecordingSink, UnavailableIdentity};
//! use refl_control::instrument::{Instrument, InstrumentSettings};
//! use refl_control::limits::Orientation;
//! use refl_control::sample::Sample;
//! use refl_control::sequencer::{RunAngle, SlitConfiguration};
//! use refl_control::slit::settings;
//!
//! # fn main() -> refl_control::error::ReflResult<()> {
//! let sink = RecordingSink::new();
//! let instrument = Instrument::init(
//!     &InstrumentSettings::for_beamline("INTER"),
//!     Box::new(sink.clone()),
//!     &UnavailableIdentity,
//!     &FixedOrientation(Orientation::Horizontal),
//! )?;
//!
//! let slits = SlitConfiguration::scaled(settings([("S1", 0.5), ("S2", 0.25)]), 0.5);
//! let mut run = RunAngle::new(instrument, Sample::new("Block 1"), slits)?;
//! run.run_angle(1.0, 30.0)?;
//!
//! assert_eq!(sink.last_value("S1VG"), Some(1.0));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hardware;
pub mod instrument;
pub mod limits;
pub mod logging;
pub mod profile;
pub mod sample;
pub mod scaler;
pub mod scripting;
pub mod sequencer;
pub mod slit;

pub use error::{ErrorKind, ReflError, ReflResult};
pub use instrument::{Instrument, InstrumentKind, InstrumentSettings};
pub use sequencer::{RunAngle, SlitConfiguration};
pub use slit::{SlitId, SlitSettings, SlitValue};

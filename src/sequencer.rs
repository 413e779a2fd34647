//! Measurement sequencing.
//!
//! [`RunAngle`] is the object a measurement script talks to. It owns the
//! [`Instrument`] for the session, so no two sequencers can drive the same
//! beamline at once, and turns each `run_angle` / `transmission` call into
//! collimation and beam-width commands.
//!
//! Collimation comes from a [`SlitConfiguration`]:
//!
//! | `col_slits` | `lowest_angle` | behaviour |
//! |---|---|---|
//! | set | unset | used verbatim at every angle |
//! | set | set | scaled from `lowest_angle` to the run angle |
//! | unset | set | beamline default widths, scaled |
//! | unset | unset | beamline default widths, verbatim |
//!
//! A polarized sequence must be initialised with [`RunAngle::refl_init`] before
//! its first angle run.

use crate::error::{ReflError, ReflResult};
use crate::instrument::{Instrument, PolarizationFrames};
use crate::sample::Sample;
use crate::scaler::{scale_ratio, scale_slits, RangeWarning, ScaledSlits};
use crate::slit::SlitSettings;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

/// Slit setup of a measurement session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlitConfiguration {
    /// Collimation openings, fixed or defined at `lowest_angle`.
    pub col_slits: Option<SlitSettings>,
    /// Reference angle for scaling.
    pub lowest_angle: Option<f64>,
    /// Beam-width openings applied on every run.
    pub width_slits: Option<SlitSettings>,
}

impl SlitConfiguration {
    /// Fixed collimation, never scaled.
    pub fn fixed(col_slits: SlitSettings) -> Self {
        Self {
            col_slits: Some(col_slits),
            ..Self::default()
        }
    }

    /// Collimation defined at `lowest_angle` and scaled with angle.
    pub fn scaled(col_slits: SlitSettings, lowest_angle: f64) -> Self {
        Self {
            col_slits: Some(col_slits),
            lowest_angle: Some(lowest_angle),
            ..Self::default()
        }
    }

    /// Builder-style beam-width openings.
    pub fn with_width_slits(mut self, width_slits: SlitSettings) -> Self {
        self.width_slits = Some(width_slits);
        self
    }
}

/// Variant of the measurement sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SequenceKind {
    /// Unpolarized reflectometry.
    Standard,
    /// Polarized reflectometry with the given frame counts.
    Polarized(PolarizationFrames),
}

/// Where the sequencer is in its current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequencerState {
    /// Constructed, no run yet.
    Configured,
    /// Commands are being issued.
    Executing,
    /// The last run completed.
    Done,
}

/// Type of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// Direct-beam transmission run.
    Transmission,
    /// Reflectivity run at an angle.
    Reflection,
}

/// What one run applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Transmission or reflection.
    pub kind: RunKind,
    /// Sample label.
    pub sample: String,
    /// Angle of the run, if any.
    pub angle: Option<f64>,
    /// Requested measurement time.
    pub measurement_time: Option<f64>,
    /// Collimation openings applied.
    pub collimation: SlitSettings,
    /// Beam-width openings applied.
    pub beamwidth: Option<SlitSettings>,
    /// Clamps applied while scaling.
    pub warnings: Vec<RangeWarning>,
    /// True when no command reached the hardware.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum CollimationPlan {
    Fixed(SlitSettings),
    Scaled {
        reference: SlitSettings,
        lowest_angle: f64,
    },
}

/// Sequencer for one measurement session.
#[derive(Debug)]
pub struct RunAngle {
    instrument: Instrument,
    sample: Sample,
    plan: CollimationPlan,
    width_slits: Option<SlitSettings>,
    kind: SequenceKind,
    state: SequencerState,
    initialised: bool,
    history: Vec<RunRecord>,
}

impl RunAngle {
    /// Unpolarized sequence.
    pub fn new(
        instrument: Instrument,
        sample: Sample,
        slits: SlitConfiguration,
    ) -> ReflResult<Self> {
        Self::with_kind(instrument, sample, slits, SequenceKind::Standard)
    }

    /// Polarized sequence; the instrument must have polarization hardware.
    pub fn polarized(
        instrument: Instrument,
        sample: Sample,
        slits: SlitConfiguration,
        frames: PolarizationFrames,
    ) -> ReflResult<Self> {
        Self::with_kind(instrument, sample, slits, SequenceKind::Polarized(frames))
    }

    /// Sequence of the given kind.
    pub fn with_kind(
        instrument: Instrument,
        sample: Sample,
        slits: SlitConfiguration,
        kind: SequenceKind,
    ) -> ReflResult<Self> {
        if let SequenceKind::Polarized(frames) = kind {
            if !instrument.is_polarized() {
                return Err(ReflError::unsupported(instrument.name(), "polarized sequencing"));
            }
            frames.validate()?;
        }

        let profile = instrument.profile();
        if let Some(col) = &slits.col_slits {
            profile.check_slits(col.keys())?;
        }
        if let Some(width) = &slits.width_slits {
            profile.check_slits(width.keys())?;
        }
        if let Some(lowest_angle) = slits.lowest_angle {
            scale_ratio(lowest_angle, lowest_angle)?;
        }

        let reference = slits
            .col_slits
            .unwrap_or_else(|| profile.default_widths.clone());
        let plan = match slits.lowest_angle {
            Some(lowest_angle) => CollimationPlan::Scaled {
                reference,
                lowest_angle,
            },
            None => CollimationPlan::Fixed(reference),
        };

        Ok(Self {
            instrument,
            sample,
            plan,
            width_slits: slits.width_slits,
            kind,
            state: SequencerState::Configured,
            initialised: false,
            history: Vec::new(),
        })
    }

    /// Prepares the beamline for a polarized measurement.
    ///
    /// Sets the flipper to its initial state and then the frame counts.
    pub fn refl_init(&mut self) -> ReflResult<()> {
        let frames = match self.kind {
            SequenceKind::Polarized(frames) => frames,
            SequenceKind::Standard => {
                return Err(ReflError::unsupported(self.instrument.name(), "refl_init"));
            }
        };
        self.instrument.pnr_refl_init(frames)?;
        self.initialised = true;
        Ok(())
    }

    /// Measures reflectivity at `angle`.
    pub fn run_angle(&mut self, angle: f64, measurement_time: f64) -> ReflResult<RunRecord> {
        if matches!(self.kind, SequenceKind::Polarized(_)) && !self.initialised {
            return Err(ReflError::PolarizationNotInitialised);
        }
        self.execute(RunKind::Reflection, Some(angle), Some(measurement_time))
    }

    /// Measures a transmission, at the reference slits unless `angle` is given.
    pub fn transmission(
        &mut self,
        angle: Option<f64>,
        measurement_time: Option<f64>,
    ) -> ReflResult<RunRecord> {
        self.execute(RunKind::Transmission, angle, measurement_time)
    }

    /// Every completed run of the session.
    pub fn history(&self) -> &[RunRecord] {
        &self.history
    }

    /// The session history as pretty JSON, for checking a script before running it.
    pub fn history_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.history)
    }

    /// Current state.
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Sequence variant.
    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    /// The sample being measured.
    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    /// The instrument driven by this session.
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Mutable access for instrument operations outside the run sequence.
    pub fn instrument_mut(&mut self) -> &mut Instrument {
        &mut self.instrument
    }

    /// Ends the session and hands the instrument back.
    pub fn into_instrument(self) -> Instrument {
        self.instrument
    }

    fn collimation_for(&self, angle: Option<f64>) -> ReflResult<ScaledSlits> {
        match (&self.plan, angle) {
            (CollimationPlan::Fixed(settings), _)
            | (CollimationPlan::Scaled { reference: settings, .. }, None) => Ok(ScaledSlits {
                settings: settings.clone(),
                warnings: Vec::new(),
            }),
            (
                CollimationPlan::Scaled {
                    reference,
                    lowest_angle,
                },
                Some(angle),
            ) => scale_slits(
                angle,
                *lowest_angle,
                reference,
                self.instrument.limits(),
                &self.instrument.profile().scale_disabled,
            ),
        }
    }

    fn execute(
        &mut self,
        kind: RunKind,
        angle: Option<f64>,
        measurement_time: Option<f64>,
    ) -> ReflResult<RunRecord> {
        let span = info_span!("run", kind = ?kind, angle = ?angle, sample = %self.sample.title);
        let _enter = span.enter();

        if let Some(time) = measurement_time {
            if !time.is_finite() || time < 0.0 {
                return Err(ReflError::Configuration(format!(
                    "measurement time must be a non-negative number, got {}",
                    time
                )));
            }
        }

        let collimation = self.collimation_for(angle)?;

        self.state = SequencerState::Executing;
        let applied = self.apply(&collimation.settings);
        self.state = match applied {
            Ok(()) => SequencerState::Done,
            Err(_) => SequencerState::Configured,
        };
        applied?;

        let record = RunRecord {
            kind,
            sample: self.sample.label(),
            angle,
            measurement_time,
            collimation: collimation.settings,
            beamwidth: self.width_slits.clone(),
            warnings: collimation.warnings,
            dry_run: self.instrument.dry_run(),
        };
        info!(
            warnings = record.warnings.len(),
            measurement_time = ?measurement_time,
            "Run configured"
        );
        self.history.push(record.clone());
        Ok(record)
    }

    fn apply(&mut self, collimation: &SlitSettings) -> ReflResult<()> {
        self.instrument.set_collimation_gaps(collimation)?;
        if let Some(width) = &self.width_slits {
            self.instrument.set_beamwidth_gaps(width)?;
        }
        Ok(())
    }
}

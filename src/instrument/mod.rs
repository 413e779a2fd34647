//! Beamline instruments.
//!
//! An [`Instrument`] turns logical slit settings into writes on named control
//! points. Every beamline shares the same operation set; what differs is carried
//! as data ([`InstrumentProfile`], [`SlitLimits`], sample orientation) and as the
//! capability variant [`InstrumentKind`]: polarized beamlines hold a
//! [`Polarizer`], generic ones do not, and polarization operations on a generic
//! beamline fail with [`ReflError::UnsupportedCapability`].
//!
//! # Dry run
//!
//! With `dry_run` set, commands are computed, logged and recorded in the
//! [`CommandRecord`] journal (and sent to subscribers) but never reach the
//! [`HardwareSink`].
//!
//! # Atomicity
//!
//! Each operation validates its input and computes its complete command list
//! before the first write, so configuration errors never leave a half-applied
//! setting behind.

pub mod polarization;

pub use polarization::{
    FlipperOverrides, FlipperSettings, FlipperState, PolarizationFrames, Polarizer,
};

use crate::error::{ReflError, ReflResult};
use crate::hardware::{HardwareSink, IdentityResolver, OrientationQuery};
use crate::limits::{select_limits, Orientation, PolarizationMode, SlitLimits};
use crate::profile::InstrumentProfile;
use crate::scaler::{clamp_scalar, RangeWarning};
use crate::slit::{blade_control_point, control_writes, Axis, Blade, SlitId, SlitSettings};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How an instrument is selected and driven.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSettings {
    /// Beamline name that takes precedence over the facility lookup.
    pub beamline_override: Option<String>,
    /// Report commands instead of writing them.
    pub dry_run: bool,
    /// Measurement mode, selects the maximum slit openings.
    pub polarization_mode: PolarizationMode,
}

impl InstrumentSettings {
    /// Settings for a named beamline.
    pub fn for_beamline(name: impl Into<String>) -> Self {
        Self {
            beamline_override: Some(name.into()),
            ..Self::default()
        }
    }

    /// Builder-style dry-run switch.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builder-style polarization mode.
    pub fn with_mode(mut self, mode: PolarizationMode) -> Self {
        self.polarization_mode = mode;
        self
    }
}

/// One command as issued (or, in dry run, as it would have been issued).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRecord {
    /// Control point name.
    pub control_point: String,
    /// Value written.
    pub value: f64,
    /// True when the write was suppressed.
    pub dry_run: bool,
}

/// Capability variant of an instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentKind {
    /// Unpolarized reflectometer.
    Generic,
    /// Reflectometer with polarization hardware.
    Polarized(Polarizer),
}

/// A beamline instrument for one measurement session.
pub struct Instrument {
    profile: Arc<InstrumentProfile>,
    limits: SlitLimits,
    orientation: Orientation,
    mode: PolarizationMode,
    dry_run: bool,
    kind: InstrumentKind,
    sink: Box<dyn HardwareSink>,
    journal: Vec<CommandRecord>,
    subscribers: Vec<mpsc::Sender<CommandRecord>>,
}

impl std::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("name", &self.profile.name)
            .field("orientation", &self.orientation)
            .field("mode", &self.mode)
            .field("dry_run", &self.dry_run)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Instrument {
    /// Resolves the beamline and builds its instrument.
    ///
    /// The beamline name comes from `settings.beamline_override` when set,
    /// otherwise from `identity`. Unknown beamlines get the generic profile. The
    /// sample orientation is queried once, and only on beamlines that support a
    /// vertical sample.
    pub fn init(
        settings: &InstrumentSettings,
        sink: Box<dyn HardwareSink>,
        identity: &dyn IdentityResolver,
        orientation: &dyn OrientationQuery,
    ) -> ReflResult<Self> {
        let name = match &settings.beamline_override {
            Some(name) => name.clone(),
            None => identity
                .resolve_identity()
                .map_err(ReflError::IdentityResolution)?,
        };
        let profile = InstrumentProfile::lookup(&name);

        let orientation = if profile.supports_vertical_mode {
            orientation
                .orientation()
                .map_err(ReflError::OrientationQuery)?
        } else {
            Orientation::Horizontal
        };

        Self::from_profile(profile, settings, orientation, sink)
    }

    /// Builds an instrument from an already resolved profile and orientation.
    pub fn from_profile(
        profile: Arc<InstrumentProfile>,
        settings: &InstrumentSettings,
        orientation: Orientation,
        sink: Box<dyn HardwareSink>,
    ) -> ReflResult<Self> {
        let mode = settings.polarization_mode;
        if mode.is_polarized() && !profile.supports_polarization {
            return Err(ReflError::unsupported(
                &profile.name,
                &format!("polarization mode {}", mode),
            ));
        }
        if orientation == Orientation::Vertical && !profile.supports_vertical_mode {
            return Err(ReflError::unsupported(&profile.name, "vertical sample mode"));
        }

        let limits = select_limits(orientation, mode).restricted_to(&profile.slit_ids);
        let kind = if profile.supports_polarization {
            InstrumentKind::Polarized(Polarizer::default())
        } else {
            InstrumentKind::Generic
        };

        info!(
            beamline = %profile.name,
            ?orientation,
            mode = %mode,
            dry_run = settings.dry_run,
            "Instrument initialised"
        );

        Ok(Self {
            profile,
            limits,
            orientation,
            mode,
            dry_run: settings.dry_run,
            kind,
            sink,
            journal: Vec::new(),
            subscribers: Vec::new(),
        })
    }

    /// Replaces the flipper defaults of a polarized instrument.
    pub fn with_flipper_defaults(mut self, defaults: FlipperSettings) -> Self {
        if let InstrumentKind::Polarized(polarizer) = &mut self.kind {
            *polarizer = Polarizer::new(defaults);
        }
        self
    }

    /// Beamline name.
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Static beamline description.
    pub fn profile(&self) -> &InstrumentProfile {
        &self.profile
    }

    /// Opening limits selected at construction.
    pub fn limits(&self) -> &SlitLimits {
        &self.limits
    }

    /// Capability variant.
    pub fn kind(&self) -> &InstrumentKind {
        &self.kind
    }

    /// True for beamlines with polarization hardware.
    pub fn is_polarized(&self) -> bool {
        matches!(self.kind, InstrumentKind::Polarized(_))
    }

    /// Measurement mode selected at construction.
    pub fn polarization_mode(&self) -> PolarizationMode {
        self.mode
    }

    /// Sample orientation resolved at construction.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// True when the sample is mounted vertically.
    pub fn vertical_mode(&self) -> bool {
        self.orientation == Orientation::Vertical
    }

    /// True when writes are suppressed.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Every command issued so far, in order.
    pub fn journal(&self) -> &[CommandRecord] {
        &self.journal
    }

    /// Receives every command issued from now on.
    pub fn subscribe(&mut self) -> mpsc::Receiver<CommandRecord> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Axis that realises collimation: the horizontal blades for a vertical sample.
    pub fn collimation_axis(&self) -> Axis {
        match self.orientation {
            Orientation::Vertical => Axis::Horizontal,
            Orientation::Horizontal => Axis::Vertical,
        }
    }

    /// Sets the slit openings along the collimation axis (the Qz direction).
    pub fn set_collimation_gaps(&mut self, settings: &SlitSettings) -> ReflResult<()> {
        let commands = self.gap_commands(settings, self.collimation_axis())?;
        self.issue(commands)
    }

    /// Sets the slit openings perpendicular to the collimation axis.
    ///
    /// A horizontal sample gets `HG` writes and a vertical sample `VG` writes, so
    /// beam width never lands on the axis that carries collimation.
    pub fn set_beamwidth_gaps(&mut self, settings: &SlitSettings) -> ReflResult<()> {
        let commands = self.gap_commands(settings, self.collimation_axis().perpendicular())?;
        self.issue(commands)
    }

    /// Drives the lower blade of a beam-blocker slit, leaving the other blade alone.
    ///
    /// With `scale_blade` the position is read as a full opening and halved into
    /// a blade travel. The position is clamped to the blade limits.
    pub fn set_beam_blocker(
        &mut self,
        slit: &SlitId,
        position: f64,
        scale_blade: bool,
    ) -> ReflResult<Vec<RangeWarning>> {
        self.profile.check_slits([slit])?;
        if !self.profile.is_beam_blocker(slit) {
            return Err(ReflError::NotBeamBlocker(slit.clone()));
        }
        let bounds = self
            .limits
            .bounds(slit)
            .ok_or_else(|| ReflError::UnknownSlit {
                slit: slit.clone(),
                instrument: self.profile.name.clone(),
            })?
            .blade();

        let travel = if scale_blade { position / 2.0 } else { position };
        let mut warnings = Vec::new();
        let travel = clamp_scalar(slit, travel, bounds, &mut warnings);
        for warning in &warnings {
            warn!(
                slit = %warning.slit,
                computed = warning.computed,
                applied = warning.applied,
                "Beam blocker out of range, clamped"
            );
        }

        let control_point = blade_control_point(slit, self.collimation_axis(), Blade::Lower);
        self.issue(vec![(control_point, travel)])?;
        Ok(warnings)
    }

    /// Sets the spin flipper, merging `overrides` into the flipper defaults.
    pub fn set_flipper(
        &mut self,
        state: FlipperState,
        overrides: Option<&FlipperOverrides>,
    ) -> ReflResult<()> {
        let commands = self.polarizer("set_flipper")?.flipper_commands(state, overrides);
        debug!(state = %state, "Setting flipper");
        self.issue(commands)
    }

    /// Configures the hardware frame counts for flipper off/on periods.
    pub fn set_hardware_periods_pnr(
        &mut self,
        up_frames: u32,
        down_frames: u32,
    ) -> ReflResult<()> {
        let commands = self
            .polarizer("set_hardware_periods_pnr")?
            .period_commands(PolarizationFrames::new(up_frames, down_frames))?;
        self.issue(commands)
    }

    /// Prepares a polarized measurement: flipper to `dd`, then frame counts.
    pub fn pnr_refl_init(&mut self, frames: PolarizationFrames) -> ReflResult<()> {
        let polarizer = self.polarizer("refl_init")?;
        let mut commands = polarizer.flipper_commands(FlipperState::Dd, None);
        commands.extend(polarizer.period_commands(frames)?);
        self.issue(commands)
    }

    fn polarizer(&self, operation: &str) -> ReflResult<&Polarizer> {
        match &self.kind {
            InstrumentKind::Polarized(polarizer) => Ok(polarizer),
            InstrumentKind::Generic => {
                Err(ReflError::unsupported(&self.profile.name, operation))
            }
        }
    }

    fn gap_commands(
        &self,
        settings: &SlitSettings,
        axis: Axis,
    ) -> ReflResult<Vec<(String, f64)>> {
        self.profile.check_slits(settings.keys())?;
        Ok(self
            .profile
            .slit_ids
            .iter()
            .filter_map(|slit| settings.get(slit).map(|value| (slit, *value)))
            .flat_map(|(slit, value)| control_writes(slit, value, axis))
            .collect())
    }

    fn issue(&mut self, commands: Vec<(String, f64)>) -> ReflResult<()> {
        for (control_point, value) in commands {
            if self.dry_run {
                info!(
                    control_point = %control_point,
                    value,
                    dry_run = true,
                    "Dry run, command not sent"
                );
            } else {
                info!(control_point = %control_point, value, "Setting control point");
                self.sink
                    .write(&control_point, value)
                    .map_err(|source| ReflError::HardwareWrite {
                        control_point: control_point.clone(),
                        value,
                        source,
                    })?;
            }
            self.record(CommandRecord {
                control_point,
                value,
                dry_run: self.dry_run,
            });
        }
        Ok(())
    }

    fn record(&mut self, record: CommandRecord) {
        self.subscribers.retain(|tx| tx.send(record.clone()).is_ok());
        self.journal.push(record);
    }
}

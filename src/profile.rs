//! Static beamline profiles.
//!
//! A profile describes everything about a beamline type that does not change at
//! run time: which slits exist, their default openings, which slits keep a fixed
//! opening regardless of angle, which slits can act as beam blockers, and the
//! capabilities of the beamline. Profiles live in a process-wide registry keyed by
//! beamline name and are shared read-only by every instrument built from them.

use crate::error::{ReflError, ReflResult};
use crate::slit::{SlitId, SlitSettings, SlitValue};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the fallback profile used for unknown beamlines.
pub const GENERIC_BEAMLINE: &str = "GENERIC";

/// Immutable description of one beamline type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentProfile {
    /// Beamline name, e.g. `POLREF`.
    pub name: String,
    /// Slits in beam order.
    pub slit_ids: Vec<SlitId>,
    /// Openings used when a measurement supplies no collimation settings.
    pub default_widths: SlitSettings,
    /// Slits whose opening is never scaled with angle.
    pub scale_disabled: BTreeMap<SlitId, bool>,
    /// Slits that can be driven as a beam blocker.
    pub beam_blocker_slits: BTreeMap<SlitId, bool>,
    /// Beamline has a polarizer, flippers and an analyser.
    pub supports_polarization: bool,
    /// Beamline can mount the sample vertically.
    pub supports_vertical_mode: bool,
}

impl InstrumentProfile {
    /// Profile for `name`, falling back to the generic profile when unknown.
    pub fn lookup(name: &str) -> Arc<InstrumentProfile> {
        match Self::lookup_strict(name) {
            Ok(profile) => profile,
            Err(_) => {
                tracing::info!(
                    beamline = name,
                    "No dedicated profile, using generic reflectometer"
                );
                Self::generic()
            }
        }
    }

    /// Profile for `name`, or [`ReflError::UnknownBeamline`].
    pub fn lookup_strict(name: &str) -> ReflResult<Arc<InstrumentProfile>> {
        let key = name.trim().to_ascii_uppercase();
        REGISTRY
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| ReflError::UnknownBeamline(name.to_string()))
    }

    /// The generic unpolarized reflectometer.
    pub fn generic() -> Arc<InstrumentProfile> {
        Arc::clone(&GENERIC)
    }

    /// Names of all registered beamlines.
    pub fn registered() -> Vec<&'static str> {
        REGISTRY.keys().copied().collect()
    }

    /// True when `slit` belongs to this beamline.
    pub fn has_slit(&self, slit: &SlitId) -> bool {
        self.slit_ids.contains(slit)
    }

    /// Errors with [`ReflError::UnknownSlit`] for the first slit not on this beamline.
    pub fn check_slits<'a>(&self, slits: impl IntoIterator<Item = &'a SlitId>) -> ReflResult<()> {
        for slit in slits {
            if !self.has_slit(slit) {
                return Err(ReflError::UnknownSlit {
                    slit: slit.clone(),
                    instrument: self.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// True when `slit` keeps its reference opening at every angle.
    pub fn is_scale_disabled(&self, slit: &SlitId) -> bool {
        self.scale_disabled.get(slit).copied().unwrap_or(false)
    }

    /// True when `slit` may be used as a beam blocker.
    pub fn is_beam_blocker(&self, slit: &SlitId) -> bool {
        self.beam_blocker_slits.get(slit).copied().unwrap_or(false)
    }
}

struct ProfileEntry {
    name: &'static str,
    slits: &'static [(&'static str, f64)],
    scale_disabled: &'static [&'static str],
    beam_blockers: &'static [&'static str],
    polarization: bool,
    vertical: bool,
}

impl ProfileEntry {
    fn build(&self) -> InstrumentProfile {
        let slit_ids: Vec<SlitId> = self.slits.iter().map(|(id, _)| SlitId::new(id)).collect();
        let flags = |names: &[&str]| -> BTreeMap<SlitId, bool> {
            slit_ids
                .iter()
                .map(|id| (id.clone(), names.contains(&id.as_str())))
                .collect()
        };

        InstrumentProfile {
            name: self.name.to_string(),
            default_widths: self
                .slits
                .iter()
                .map(|(id, width)| (SlitId::new(id), SlitValue::Gap(*width)))
                .collect(),
            scale_disabled: flags(self.scale_disabled),
            beam_blocker_slits: flags(self.beam_blockers),
            supports_polarization: self.polarization,
            supports_vertical_mode: self.vertical,
            slit_ids,
        }
    }
}

const PROFILES: &[ProfileEntry] = &[
    ProfileEntry {
        name: GENERIC_BEAMLINE,
        slits: &[("S1", 1.0), ("S2", 0.5), ("S3", 5.0)],
        scale_disabled: &[],
        beam_blockers: &[],
        polarization: false,
        vertical: false,
    },
    ProfileEntry {
        name: "INTER",
        slits: &[("S1", 1.0), ("S2", 0.5), ("S3", 5.0), ("S4", 10.0)],
        scale_disabled: &["S4"],
        beam_blockers: &["S3"],
        polarization: false,
        vertical: false,
    },
    ProfileEntry {
        name: "SURF",
        slits: &[("S1", 1.0), ("S2", 0.5), ("S3", 5.0)],
        scale_disabled: &[],
        beam_blockers: &[],
        polarization: false,
        vertical: false,
    },
    ProfileEntry {
        name: "POLREF",
        slits: &[("S1", 1.0), ("S2", 0.5), ("S3", 5.0), ("S4", 10.0)],
        scale_disabled: &["S4"],
        beam_blockers: &["S3"],
        polarization: true,
        vertical: true,
    },
    ProfileEntry {
        name: "CRISP",
        slits: &[("S1", 1.0), ("S2", 0.5), ("S3", 5.0)],
        scale_disabled: &["S3"],
        beam_blockers: &[],
        polarization: true,
        vertical: false,
    },
    ProfileEntry {
        name: "OFFSPEC",
        slits: &[("S1", 1.0), ("S2", 0.5), ("S3", 5.0), ("S4", 10.0)],
        scale_disabled: &["S4"],
        beam_blockers: &["S3"],
        polarization: true,
        vertical: false,
    },
];

static REGISTRY: Lazy<BTreeMap<&'static str, Arc<InstrumentProfile>>> = Lazy::new(|| {
    PROFILES
        .iter()
        .map(|entry| (entry.name, Arc::new(entry.build())))
        .collect()
});

static GENERIC: Lazy<Arc<InstrumentProfile>> = Lazy::new(|| {
    REGISTRY
        .get(GENERIC_BEAMLINE)
        .cloned()
        .unwrap_or_else(|| Arc::new(PROFILES[0].build()))
});

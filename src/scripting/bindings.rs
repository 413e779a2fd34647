//! Rhai bindings for measurement sequencing.
//!
//! A script sees the session as a `RunAngle` value named `session`:
//!
//! ```rhai
//! session.refl_init();                 // polarized sessions only
//! session.transmission();              // reference slits
//! session.transmission(0.7, 20);
//! let run = session.run_angle(0.7, 30);
//! print(`clamped slits: ${run.warnings.len()}`);
//! ```
//!
//! Numeric arguments may be integers or floats. Each run returns its record as
//! a map (`kind`, `angle`, `measurement_time`, `collimation`, `warnings`, ...).

use crate::sequencer::RunAngle;
use rhai::{Dynamic, Engine, EvalAltResult};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the sequencer of a script session.
///
/// Clones refer to the same sequencer.
#[derive(Clone, Debug)]
pub struct RunAngleHandle {
    inner: Arc<Mutex<RunAngle>>,
}

impl RunAngleHandle {
    /// Wraps a sequencer for use from scripts.
    pub fn new(run: RunAngle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(run)),
        }
    }

    /// Locks the sequencer.
    pub fn lock(&self) -> Result<MutexGuard<'_, RunAngle>, Box<EvalAltResult>> {
        self.inner
            .lock()
            .map_err(|_| "RunAngle session lock poisoned".into())
    }

    /// Returns the sequencer if this is the last handle.
    pub fn try_into_inner(self) -> Result<RunAngle, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

fn number(value: &Dynamic, name: &str) -> ScriptResult<f64> {
    if let Ok(v) = value.as_float() {
        return Ok(v);
    }
    if let Ok(v) = value.as_int() {
        return Ok(v as f64);
    }
    Err(format!("{} must be a number, got {}", name, value.type_name()).into())
}

fn fail(e: impl std::fmt::Display) -> Box<EvalAltResult> {
    e.to_string().into()
}

/// Registers the `RunAngle` type and its methods.
pub fn register_sequencer(engine: &mut Engine) {
    engine.register_type_with_name::<RunAngleHandle>("RunAngle");

    engine.register_fn(
        "run_angle",
        |handle: &mut RunAngleHandle, angle: Dynamic, time: Dynamic| -> ScriptResult<Dynamic> {
            let angle = number(&angle, "angle")?;
            let time = number(&time, "measurement time")?;
            let record = handle.lock()?.run_angle(angle, time).map_err(fail)?;
            rhai::serde::to_dynamic(&record)
        },
    );

    engine.register_fn(
        "transmission",
        |handle: &mut RunAngleHandle| -> ScriptResult<Dynamic> {
            let record = handle.lock()?.transmission(None, None).map_err(fail)?;
            rhai::serde::to_dynamic(&record)
        },
    );

    engine.register_fn(
        "transmission",
        |handle: &mut RunAngleHandle, angle: Dynamic, time: Dynamic| -> ScriptResult<Dynamic> {
            let angle = number(&angle, "angle")?;
            let time = number(&time, "measurement time")?;
            let record = handle
                .lock()?
                .transmission(Some(angle), Some(time))
                .map_err(fail)?;
            rhai::serde::to_dynamic(&record)
        },
    );

    engine.register_fn(
        "refl_init",
        |handle: &mut RunAngleHandle| -> ScriptResult<()> {
            handle.lock()?.refl_init().map_err(fail)
        },
    );

    engine.register_fn(
        "history_json",
        |handle: &mut RunAngleHandle| -> ScriptResult<String> {
            handle.lock()?.history_json().map_err(fail)
        },
    );

    engine.register_get(
        "dry_run",
        |handle: &mut RunAngleHandle| -> ScriptResult<bool> {
            Ok(handle.lock()?.instrument().dry_run())
        },
    );

    engine.register_get(
        "instrument",
        |handle: &mut RunAngleHandle| -> ScriptResult<String> {
            Ok(handle.lock()?.instrument().name().to_string())
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_int_and_float() {
        assert_eq!(number(&Dynamic::from(2_i64), "x").unwrap(), 2.0);
        assert_eq!(number(&Dynamic::from(0.5_f64), "x").unwrap(), 0.5);
        assert!(number(&Dynamic::from("fast"), "x").is_err());
    }
}

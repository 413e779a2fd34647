//! Script host bound to one measurement session.

use anyhow::{anyhow, Context};
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use tracing::info;

use crate::scripting::bindings::{self, RunAngleHandle};
use crate::sequencer::RunAngle;

/// Operation budget of a script run.
pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

/// Name under which scripts see the session.
pub const SESSION_VARIABLE: &str = "session";

/// Runs measurement scripts against one sequencer.
pub struct ScriptHost {
    engine: Engine,
    session: RunAngleHandle,
}

impl ScriptHost {
    /// Host for `run` with the default operation budget.
    pub fn new(run: RunAngle) -> Self {
        Self::with_limit(run, DEFAULT_MAX_OPERATIONS)
    }

    /// Host for `run` with a custom operation budget.
    pub fn with_limit(run: RunAngle, max_operations: u64) -> Self {
        let mut engine = Engine::new();

        // Safety: Limit operations to prevent infinite loops
        engine.on_progress(move |count| {
            if count > max_operations {
                Some(format!("Safety limit exceeded: maximum {} operations", max_operations).into())
            } else {
                None
            }
        });
        engine.on_print(|text| info!(target: "refl_control::script", "{}", text));

        bindings::register_sequencer(&mut engine);

        Self {
            engine,
            session: RunAngleHandle::new(run),
        }
    }

    /// Runs `script` with the session bound to `session`.
    pub fn run_script(&self, script: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        let mut scope = Scope::new();
        scope.push(SESSION_VARIABLE, self.session.clone());
        self.engine.eval_with_scope(&mut scope, script)
    }

    /// Compiles `script` without running it.
    pub fn validate_script(&self, script: &str) -> Result<(), Box<EvalAltResult>> {
        self.engine.compile(script)?;
        Ok(())
    }

    /// Handle to the session sequencer.
    pub fn session(&self) -> RunAngleHandle {
        self.session.clone()
    }

    /// JSON report of every run so far.
    pub fn history_json(&self) -> anyhow::Result<String> {
        let run = self
            .session
            .lock()
            .map_err(|e| anyhow!("{}", e))?;
        run.history_json().context("failed to serialise run history")
    }

    /// Ends the host and returns the sequencer.
    pub fn into_run_angle(self) -> anyhow::Result<RunAngle> {
        self.session
            .try_into_inner()
            .map_err(|_| anyhow!("session is still referenced by a script value"))
    }

    /// Access to the underlying engine for extra registrations.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}

//! Scripting engine for measurement automation.
//!
//! Measurement scripts are plain [Rhai](https://rhai.rs) source passed in as a
//! string. [`ScriptHost`] wraps one [`RunAngle`](crate::sequencer::RunAngle)
//! session and exposes it to the script as `session`.
//!
//! # Checking a script
//!
//! Build the sequencer on a dry-run instrument, run the script, then read
//! [`ScriptHost::history_json`]: the report lists every run with the slit
//! settings it would apply and any clamps, without touching hardware.
//!
//! ```rust,ignore
//! let host = ScriptHost::new(run_angle);
//! host.run_script(r#"
//!     session.transmission();
//!     for angle in [0.7, 2.3] {
//!         session.run_angle(angle, 30);
//!     }
//! "#)?;
//! println!("{}", host.history_json()?);
//! ```

pub mod bindings;
pub mod engine;

pub use bindings::{register_sequencer, RunAngleHandle};
pub use engine::{ScriptHost, DEFAULT_MAX_OPERATIONS, SESSION_VARIABLE};

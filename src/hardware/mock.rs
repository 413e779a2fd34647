//! Mock Hardware Implementations
//!
//! Provides simulated beamline endpoints for testing and for dry rehearsal of
//! scripts without a control system.
//!
//! # Available Mocks
//!
//! - `RecordingSink` - Records every write; can be told to reject a control point
//! - `FixedIdentity` - Always reports the same beamline
//! - `FixedOrientation` - Always reports the same sample orientation

use std::sync::{Arc, Mutex, MutexGuard};

use super::{HardwareError, HardwareSink, IdentityResolver, OrientationQuery};
use crate::limits::Orientation;

// =============================================================================
// RecordingSink - Simulated Control Channel
// =============================================================================

#[derive(Debug, Default)]
struct SinkState {
    writes: Vec<(String, f64)>,
    failing: Option<String>,
}

/// Mock control channel that records every write.
///
/// Clones share the same record, so a test can keep one handle while the other
/// is moved into an instrument.
///
/// # Example
///
/// ```rust
/// use refl_control::hardware::HardwareSink;
/// use refl_control::hardware::mock::RecordingSink;
///
/// let sink = RecordingSink::new();
/// let mut handle = sink.clone();
/// handle.write("S1VG", 0.5).unwrap();
/// assert_eq!(sink.writes(), vec![("S1VG".to_string(), 0.5)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    /// Create new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that rejects every write to `control_point`.
    pub fn failing_on(control_point: impl Into<String>) -> Self {
        let sink = Self::new();
        sink.lock().failing = Some(control_point.into());
        sink
    }

    /// All writes in the order they were issued.
    pub fn writes(&self) -> Vec<(String, f64)> {
        self.lock().writes.clone()
    }

    /// Control point names in the order they were written.
    pub fn control_points(&self) -> Vec<String> {
        self.lock().writes.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Last value written to `control_point`.
    pub fn last_value(&self, control_point: &str) -> Option<f64> {
        self.lock()
            .writes
            .iter()
            .rev()
            .find(|(name, _)| name == control_point)
            .map(|(_, value)| *value)
    }

    /// Forget recorded writes.
    pub fn clear(&self) {
        self.lock().writes.clear();
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // A poisoned record is still a valid record.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HardwareSink for RecordingSink {
    fn write(&mut self, control_point: &str, value: f64) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if state.failing.as_deref() == Some(control_point) {
            return Err(HardwareError::WriteRejected {
                control_point: control_point.to_string(),
                reason: "simulated fault".to_string(),
            });
        }
        tracing::trace!(control_point, value, "RecordingSink write");
        state.writes.push((control_point.to_string(), value));
        Ok(())
    }
}

// =============================================================================
// Fixed facility lookups
// =============================================================================

/// Identity resolver that always returns the same beamline.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub String);

impl FixedIdentity {
    /// Resolver for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl IdentityResolver for FixedIdentity {
    fn resolve_identity(&self) -> Result<String, HardwareError> {
        Ok(self.0.clone())
    }
}

/// Identity resolver that is never expected to be consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableIdentity;

impl IdentityResolver for UnavailableIdentity {
    fn resolve_identity(&self) -> Result<String, HardwareError> {
        Err(HardwareError::Unavailable(
            "no facility identity service".to_string(),
        ))
    }
}

/// Orientation query with a fixed answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOrientation(pub Orientation);

impl OrientationQuery for FixedOrientation {
    fn orientation(&self) -> Result<Orientation, HardwareError> {
        Ok(self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

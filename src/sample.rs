//! Sample description.

use serde::{Deserialize, Serialize};

/// A sample on the beamline.
///
/// The record is owned by the script and only read by the sequencer; resolution
/// and footprint are carried as defaults for callers that derive slit settings
/// from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    /// Run title.
    pub title: String,
    /// Run subtitle.
    pub subtitle: String,
    /// Sample stage translation.
    pub translation: f64,
    /// Offset of the first height stage.
    pub height_offset: f64,
    /// Offset of the second height stage.
    pub height2_offset: f64,
    /// Phi tilt offset.
    pub phi_offset: f64,
    /// Psi tilt offset.
    pub psi_offset: f64,
    /// Requested dQ/Q resolution.
    pub resolution: f64,
    /// Beam footprint on the sample in mm.
    pub footprint: f64,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            translation: 0.0,
            height_offset: 0.0,
            height2_offset: 0.0,
            phi_offset: 0.0,
            psi_offset: 0.0,
            resolution: 0.03,
            footprint: 50.0,
        }
    }
}

impl Sample {
    /// Sample with a title and default geometry.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builder-style subtitle.
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    /// Builder-style resolution and footprint.
    pub fn with_geometry(mut self, resolution: f64, footprint: f64) -> Self {
        self.resolution = resolution;
        self.footprint = footprint;
        self
    }

    /// Title and subtitle joined for run labels.
    pub fn label(&self) -> String {
        if self.subtitle.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.subtitle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let sample: Sample = toml::from_str(
            r#"
            title = "Block 1"
            subtitle = "Sample 1"
            footprint = 40.0
            "#,
        )
        .unwrap();
        assert_eq!(sample.label(), "Block 1 Sample 1");
        assert_eq!(sample.footprint, 40.0);
        assert_eq!(sample.resolution, 0.03);
    }

    #[test]
    fn builder() {
        let sample = Sample::new("Block 2").with_geometry(0.05, 60.0);
        assert_eq!(sample.label(), "Block 2");
        assert_eq!(sample.resolution, 0.05);
    }
}

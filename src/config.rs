use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;
use crate::predictor::KalmanConfig;

/// Early removal of tracks that never established themselves: a track
/// younger than `age_threshold` frames whose visibility ratio is below
/// `min_visibility` is dropped in the prune step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct YoungTrackPolicy {
    pub age_threshold: u32,
    pub min_visibility: f32,
}

impl Default for YoungTrackPolicy {
    fn default() -> Self {
        Self {
            age_threshold: 8,
            min_visibility: 0.6,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Score threshold handed to the detector.
    pub detection_threshold: f32,
    /// Trackable labels, everything else is dropped before association.
    /// Empty means every label is tracked.
    pub classes: Vec<String>,
    /// Matched pairs costing more than this (`1 - IoU`) are split up.
    pub max_cost: f32,
    /// Tracks are pruned once they have been unmatched this many frames in a row.
    pub invisibility_threshold: u32,
    /// Visible tracks are emitted only after this many matched frames.
    pub min_visible_count: u32,
    pub young_track: Option<YoungTrackPolicy>,
    pub motion: KalmanConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.5,
            classes: vec!["car".into(), "truck".into(), "bus".into()],
            max_cost: 0.7,
            invisibility_threshold: 15,
            min_visible_count: 1,
            young_track: None,
            motion: KalmanConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json(src: &str) -> Result<Self, Error> {
        let config: TrackerConfig = serde_json::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let src = std::fs::read_to_string(path)?;

        Self::from_json(&src)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return Err(Error::ConfigError(format!(
                "detection_threshold must be within [0, 1], got {}",
                self.detection_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.max_cost) {
            return Err(Error::ConfigError(format!(
                "max_cost must be within [0, 1], got {}",
                self.max_cost
            )));
        }

        if self.invisibility_threshold == 0 {
            return Err(Error::ConfigError(
                "invisibility_threshold must be at least 1".into(),
            ));
        }

        if let Some(policy) = &self.young_track {
            if !(0.0..=1.0).contains(&policy.min_visibility) {
                return Err(Error::ConfigError(format!(
                    "young_track.min_visibility must be within [0, 1], got {}",
                    policy.min_visibility
                )));
            }
        }

        self.motion.validate()
    }
}

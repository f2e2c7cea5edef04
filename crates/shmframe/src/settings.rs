use serde::{Deserialize, Serialize};

use crate::detect::Roi;

/// Maximum number of `(sensitivity, threshold)` pairs.
pub const MAX_TUNING_PAIRS: usize = 10;
/// Maximum number of ROI grid nodes.
pub const MAX_GRID_NODES: usize = 10;
/// Maximum ROIs per grid node.
pub const MAX_ROIS_PER_NODE: usize = 10;

/// Analytics parameters supplied by the host.
///
/// The core only acts on the fact that settings arrived (it enables
/// detection); every field is opaque configuration forwarded to the
/// detection stage or, in the case of `event_endpoint`, to the host's
/// external event layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    #[serde(default)]
    pub version: String,
    /// Where the host posts analytics events. Not used by the core.
    #[serde(default)]
    pub event_endpoint: String,
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    #[serde(default)]
    pub jpg_quality: u32,
    #[serde(default)]
    pub tuning: Vec<TuningPair>,
    #[serde(default)]
    pub roi_grid: Vec<Vec<Roi>>,
}

/// One detection tuning pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningPair {
    pub sensitivity: i32,
    pub threshold: i32,
}

impl AnalyticsSettings {
    /// Check the collection bounds.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tuning.len() > MAX_TUNING_PAIRS {
            return Err(SettingsError::TooManyTuningPairs {
                count: self.tuning.len(),
                max: MAX_TUNING_PAIRS,
            });
        }
        if self.roi_grid.len() > MAX_GRID_NODES {
            return Err(SettingsError::TooManyGridNodes {
                count: self.roi_grid.len(),
                max: MAX_GRID_NODES,
            });
        }
        for (node, rois) in self.roi_grid.iter().enumerate() {
            if rois.len() > MAX_ROIS_PER_NODE {
                return Err(SettingsError::TooManyRoisInNode {
                    node,
                    count: rois.len(),
                    max: MAX_ROIS_PER_NODE,
                });
            }
        }
        Ok(())
    }
}

/// Errors raised by [`AnalyticsSettings::validate`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("too many tuning pairs ({count}, max {max})")]
    TooManyTuningPairs { count: usize, max: usize },

    #[error("too many ROI grid nodes ({count}, max {max})")]
    TooManyGridNodes { count: usize, max: usize },

    #[error("too many ROIs in node {node} ({count}, max {max})")]
    TooManyRoisInNode {
        node: usize,
        count: usize,
        max: usize,
    },
}

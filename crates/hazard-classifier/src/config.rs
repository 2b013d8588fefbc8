//! Classification thresholds

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hazard classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// At or below: sensor is touching an edge, treated as a drop (meters)
    pub drop_min_m: f64,
    /// Upper bound of the step band
    pub step_min_m: f64,
    /// Upper bound of the step-down band
    pub step_down_min_m: f64,
    /// Upper bound of the far drop band; beyond this nothing is reported
    pub drop_max_m: f64,

    /// Camera focal length (pixels)
    pub focal_length_px: f64,
    /// Real-world heights used for monocular distance (meters)
    pub person_height_m: f64,
    pub car_height_m: f64,
    /// Added to every vision distance estimate before flooring
    pub distance_bias_m: f64,
    /// Floor for vision distance estimates
    pub min_distance_m: f64,
    /// Distance reported for a degenerate (zero-height) bounding box
    pub fallback_distance_m: f64,

    /// Person closer than this is high severity
    pub person_near_m: f64,
    /// Car closer than this is critical
    pub car_approaching_m: f64,

    /// Detections below this confidence are discarded
    pub confidence_floor: f32,
    /// Detector class id -> label
    pub labels: BTreeMap<u32, String>,
}

impl Default for HazardConfig {
    fn default() -> Self {
        let labels = [(0, "background"), (1, "person"), (2, "car"), (3, "bike")]
            .into_iter()
            .map(|(id, label)| (id, label.to_string()))
            .collect();

        Self {
            drop_min_m: 0.05,
            step_min_m: 0.10,
            step_down_min_m: 0.20,
            drop_max_m: 0.40,
            focal_length_px: 200.0,
            person_height_m: 1.6,
            car_height_m: 1.5,
            distance_bias_m: 0.0,
            min_distance_m: 0.2,
            fallback_distance_m: 10.0,
            person_near_m: 2.5,
            car_approaching_m: 3.0,
            confidence_floor: 0.5,
            labels,
        }
    }
}

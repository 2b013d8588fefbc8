//! Obstacle events from camera detections
//!
//! Distance is estimated with the pinhole model from the bounding-box
//! height and a per-class real-world height.

use camera_capture::FrameGeometry;
use cane_events::{Direction, Event, EventSource, Severity};
use tracing::warn;

use crate::{DetectedObject, HazardConfig};

/// Maps detections to one event each
pub struct VisionClassifier {
    config: HazardConfig,
}

impl VisionClassifier {
    pub fn new(config: &HazardConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn classify(&self, geometry: &FrameGeometry, objects: &[DetectedObject]) -> Vec<Event> {
        objects
            .iter()
            .filter_map(|object| {
                let distance = self.estimate_distance(object);
                let result = Event::builder(
                    format!("vision.{}", object.label),
                    EventSource::Camera,
                    self.severity(&object.label, distance),
                )
                .distance_m(distance)
                .direction(self.direction(geometry, object))
                .object_label(object.label.clone())
                .extra("confidence", object.confidence as f64)
                .build();

                match result {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!("Dropping vision event for '{}': {}", object.label, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Monocular distance estimate in metres
    pub fn estimate_distance(&self, object: &DetectedObject) -> f64 {
        let height_px = object.bbox.height();
        if height_px <= 0 {
            return self.config.fallback_distance_m;
        }

        let known_height = match object.label.as_str() {
            "car" => self.config.car_height_m,
            _ => self.config.person_height_m,
        };
        let distance = known_height * self.config.focal_length_px / height_px as f64;
        (distance + self.config.distance_bias_m).max(self.config.min_distance_m)
    }

    fn direction(&self, geometry: &FrameGeometry, object: &DetectedObject) -> Direction {
        let ratio = object.bbox.center_x() / geometry.width.max(1) as f64;
        if ratio < 0.33 {
            Direction::Left
        } else if ratio > 0.66 {
            Direction::Right
        } else {
            Direction::Center
        }
    }

    fn severity(&self, label: &str, distance: f64) -> Severity {
        match label {
            "car" if distance <= self.config.car_approaching_m => Severity::Critical,
            "car" => Severity::Mid,
            "person" if distance <= self.config.person_near_m => Severity::High,
            _ => Severity::Low,
        }
    }
}

impl Default for VisionClassifier {
    fn default() -> Self {
        Self::new(&HazardConfig::default())
    }
}

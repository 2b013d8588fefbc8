//! Hazard Classification
//!
//! Pure, stateless mapping of raw readings to typed [`Event`]s:
//! - Ground drops and steps from a single downward ToF distance
//! - Obstacles (people, cars, bikes) from camera detections, with monocular
//!   distance, bearing and severity estimates

pub mod config;
pub mod detector;
pub mod distance;
pub mod vision;

pub use config::HazardConfig;
pub use detector::{decode_ssd_output, BoundingBox, DetectedObject, NullDetector, ObjectDetector};
pub use distance::DistanceClassifier;
pub use vision::VisionClassifier;

pub use cane_events::Event;

use thiserror::Error;

/// Detector error types
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid frame format")]
    InvalidFrame,
}

//! Object detector interface and SSD output decoding

use camera_capture::{FrameGeometry, VideoFrame};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DetectorError, HazardConfig};

/// Pixel-space bounding box, corners inclusive of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn center_x(&self) -> f64 {
        (self.x1 + self.x2) as f64 / 2.0
    }
}

/// Detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label, e.g. "person"
    pub label: String,

    /// Bounding box in pixels
    pub bbox: BoundingBox,

    /// Detection confidence
    pub confidence: f32,
}

/// Camera object detector collaborator
pub trait ObjectDetector: Send {
    /// Detect objects in a frame; results are already confidence-filtered
    fn detect_objects(&mut self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectorError>;
}

/// Stand-in used when no detection model is installed
#[derive(Debug, Default)]
pub struct NullDetector;

impl ObjectDetector for NullDetector {
    fn detect_objects(&mut self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectorError> {
        debug!("No detector installed, skipping frame #{}", frame.sequence);
        Ok(Vec::new())
    }
}

/// Decode SSD-style output rows `[image_id, class, conf, x1, y1, x2, y2]`
///
/// Coordinates are normalized to `[0, 1]`; they are scaled to the frame and
/// clamped to its bounds. A negative image id terminates the list.
pub fn decode_ssd_output(
    rows: &[[f32; 7]],
    geometry: FrameGeometry,
    config: &HazardConfig,
) -> Vec<DetectedObject> {
    let max_x = geometry.width.saturating_sub(1) as i32;
    let max_y = geometry.height.saturating_sub(1) as i32;
    let scale = |v: f32, size: u32, max: i32| ((v * size as f32) as i32).clamp(0, max);

    rows.iter()
        .take_while(|row| row[0] >= 0.0)
        .filter(|row| row[2] >= config.confidence_floor)
        .map(|row| {
            let class_id = row[1] as u32;
            let label = config
                .labels
                .get(&class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", class_id));

            DetectedObject {
                label,
                bbox: BoundingBox {
                    x1: scale(row[3], geometry.width, max_x),
                    y1: scale(row[4], geometry.height, max_y),
                    x2: scale(row[5], geometry.width, max_x),
                    y2: scale(row[6], geometry.height, max_y),
                },
                confidence: row[2],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> FrameGeometry {
        FrameGeometry {
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn test_decode_scales_and_labels() {
        let rows = [[0.0, 1.0, 0.9, 0.25, 0.5, 0.5, 1.0]];
        let objects = decode_ssd_output(&rows, geometry(), &HazardConfig::default());

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].label, "person");
        assert_eq!(
            objects[0].bbox,
            BoundingBox {
                x1: 160,
                y1: 240,
                x2: 320,
                y2: 479,
            }
        );
    }

    #[test]
    fn test_decode_filters_low_confidence() {
        let rows = [
            [0.0, 2.0, 0.49, 0.1, 0.1, 0.2, 0.2],
            [0.0, 2.0, 0.5, 0.1, 0.1, 0.2, 0.2],
        ];
        let objects = decode_ssd_output(&rows, geometry(), &HazardConfig::default());
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].label, "car");
    }

    #[test]
    fn test_decode_unknown_class_and_clamp() {
        let rows = [[0.0, 17.0, 0.8, -0.2, 0.0, 1.4, 0.5]];
        let objects = decode_ssd_output(&rows, geometry(), &HazardConfig::default());
        assert_eq!(objects[0].label, "class_17");
        assert_eq!(objects[0].bbox.x1, 0);
        assert_eq!(objects[0].bbox.x2, 639);
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        let rows = [
            [0.0, 3.0, 0.7, 0.1, 0.1, 0.3, 0.6],
            [-1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.9, 0.1, 0.1, 0.3, 0.6],
        ];
        let objects = decode_ssd_output(&rows, geometry(), &HazardConfig::default());
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].label, "bike");
    }

    #[test]
    fn test_null_detector_finds_nothing() {
        let frame = VideoFrame::solid(4, 4, 128);
        assert!(NullDetector.detect_objects(&frame).unwrap().is_empty());
    }
}

//! Camera Capture Library for the Smart Cane
//!
//! Provides the frame type and camera source interface used by the
//! event-triggered vision path:
//! - RGB [`VideoFrame`] with brightness statistics (blank-frame detection)
//! - [`FrameSource`] interface for concrete camera backends
//! - Still-image source for bench testing
//! - JPEG snapshot storage for analysis records

pub mod frame;
pub mod source;
pub mod storage;

pub use frame::{FrameGeometry, VideoFrame};
pub use source::{FrameSource, ImageFileSource, RecordingSource};
pub use storage::FrameStore;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Frame storage failed: {0}")]
    Storage(String),
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Still image used as the frame source (bench rigs without a camera)
    pub image_path: Option<PathBuf>,
    /// Mean brightness at or below which a frame is treated as unusable
    pub frame_black_threshold: f64,
    /// Persist every captured frame as a JPEG snapshot
    pub save_frames: bool,
    /// Snapshot directory
    pub image_dir: PathBuf,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            frame_black_threshold: 5.0,
            save_frames: false,
            image_dir: PathBuf::from("./data/img"),
        }
    }
}

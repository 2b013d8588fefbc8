//! Camera source interface and bench implementations

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::frame::VideoFrame;
use crate::storage::FrameStore;
use crate::CameraError;

/// Camera backend consulted by the safety loop after a proximity trigger
pub trait FrameSource: Send {
    /// Capture one frame
    fn get_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Name of the last persisted image, used to key analysis records
    fn latest_image_name(&self) -> Option<String>;
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Re-reads a still image on every capture (bench rigs, demos)
pub struct ImageFileSource {
    path: PathBuf,
    sequence: u32,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Using still image frame source: {}", path.display());
        Self { path, sequence: 0 }
    }
}

impl FrameSource for ImageFileSource {
    fn get_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let image = image::open(&self.path)
            .map_err(|e| CameraError::Capture(format!("{}: {}", self.path.display(), e)))?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(VideoFrame::from_rgb_image(image.to_rgb8(), now_ns(), self.sequence))
    }

    fn latest_image_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Wraps a source and snapshots every captured frame to disk
pub struct RecordingSource<S> {
    inner: S,
    store: FrameStore,
}

impl<S: FrameSource> RecordingSource<S> {
    pub fn new(inner: S, store: FrameStore) -> Self {
        Self { inner, store }
    }
}

impl<S: FrameSource> FrameSource for RecordingSource<S> {
    fn get_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let frame = self.inner.get_frame()?;
        // A failed snapshot never costs the caller its frame.
        if let Err(e) = self.store.save(&frame) {
            warn!("Frame snapshot failed: {}", e);
        }
        Ok(frame)
    }

    fn latest_image_name(&self) -> Option<String> {
        self.store
            .latest_name()
            .map(str::to_string)
            .or_else(|| self.inner.latest_image_name())
    }
}

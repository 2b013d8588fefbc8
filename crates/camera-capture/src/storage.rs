//! JPEG snapshot storage

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::ImageFormat;
use tracing::debug;

use crate::frame::VideoFrame;
use crate::CameraError;

/// Writes captured frames to disk and remembers the most recent file name
pub struct FrameStore {
    dir: PathBuf,
    latest: Option<String>,
}

impl FrameStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CameraError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| CameraError::Storage(e.to_string()))?;
        Ok(Self { dir, latest: None })
    }

    /// Save a frame as `img_<timestamp>.jpg` and return the file name
    pub fn save(&mut self, frame: &VideoFrame) -> Result<String, CameraError> {
        let image = frame.to_rgb_image().ok_or_else(|| {
            CameraError::Format(format!(
                "{} bytes do not fill a {}x{} RGB frame",
                frame.data.len(),
                frame.width,
                frame.height
            ))
        })?;

        let name = format!("img_{}.jpg", Local::now().format("%Y%m%d%H%M%S"));
        let target = self.dir.join(&name);
        image
            .save_with_format(&target, ImageFormat::Jpeg)
            .map_err(|e| CameraError::Storage(e.to_string()))?;

        debug!("Saved frame #{} to {}", frame.sequence, target.display());
        self.latest = Some(name.clone());
        Ok(name)
    }

    /// Name of the most recently saved snapshot
    pub fn latest_name(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("cane-frames-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_save_records_latest_name() {
        let dir = scratch_dir();
        let mut store = FrameStore::new(&dir).unwrap();
        assert!(store.latest_name().is_none());

        let name = store.save(&VideoFrame::solid(4, 4, 200)).unwrap();
        assert!(name.starts_with("img_") && name.ends_with(".jpg"));
        assert_eq!(store.latest_name(), Some(name.as_str()));
        assert!(dir.join(&name).exists());

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let dir = scratch_dir();
        let mut store = FrameStore::new(&dir).unwrap();
        let frame = VideoFrame::new(vec![0; 5], 4, 4, 0, 0);
        assert!(matches!(store.save(&frame), Err(CameraError::Format(_))));
        fs::remove_dir_all(dir).ok();
    }
}

//! Structured analysis records on disk

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::AnalysisError;

/// One analysis log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    /// Snapshot the record refers to, if any
    pub photo: Option<String>,
    pub description: String,
    pub response: Value,
    pub tags: Vec<String>,
}

impl AnalysisRecord {
    pub fn new(photo: Option<String>, description: &str, response: Value, tags: &[&str]) -> Self {
        Self {
            photo,
            description: description.to_string(),
            response,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Analysis log collaborator
pub trait AnalysisSink: Send + Sync {
    fn log_analysis(&self, record: &AnalysisRecord) -> Result<(), AnalysisError>;
}

/// Replace runs of characters outside `[0-9A-Za-z_.-]` with `_` and trim
/// leading/trailing `_`, `.` and `-`
pub fn sanitize_component(value: &str, default: &str) -> String {
    let mut cleaned = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            cleaned.push(c);
            in_run = false;
        } else if !in_run {
            cleaned.push('_');
            in_run = true;
        }
    }

    let trimmed = cleaned.trim_matches(|c| matches!(c, '_' | '.' | '-'));
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Serialize)]
struct StoredRecord<'a> {
    photo: Option<&'a str>,
    description: &'a str,
    response: &'a Value,
    ts: String,
    tags: Vec<String>,
}

/// Writes each record as a pretty-printed JSON text file
pub struct AnalysisWriter {
    dir: PathBuf,
}

impl AnalysisWriter {
    /// Create the writer, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AnalysisError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a record; returns the file written
    ///
    /// Named `{photo}_{description}{_tags}_{YYYYmmddHHMMSS}.txt`.
    pub fn write(&self, record: &AnalysisRecord) -> Result<PathBuf, AnalysisError> {
        let now = Local::now();
        let base = record.photo.as_deref().unwrap_or("img_unknown");
        let description: String = sanitize_component(&record.description, "analysis")
            .chars()
            .take(64)
            .collect();
        let tags: Vec<String> = record
            .tags
            .iter()
            .map(|t| sanitize_component(t, ""))
            .filter(|t| !t.is_empty())
            .collect();
        let tag_component = if tags.is_empty() {
            String::new()
        } else {
            format!("_{}", tags.join("_"))
        };

        let filename = format!(
            "{}_{}{}_{}.txt",
            base,
            description,
            tag_component,
            now.format("%Y%m%d%H%M%S")
        );
        let target = self.dir.join(filename);

        let stored = StoredRecord {
            photo: record.photo.as_deref(),
            description: &record.description,
            response: &record.response,
            ts: now.to_rfc3339(),
            tags,
        };
        fs::write(&target, serde_json::to_string_pretty(&stored)?)?;
        debug!("Analysis record written: {}", target.display());
        Ok(target)
    }
}

impl AnalysisSink for AnalysisWriter {
    fn log_analysis(&self, record: &AnalysisRecord) -> Result<(), AnalysisError> {
        self.write(record).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("cane-analysis-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("voice_distance_alert", "x"), "voice_distance_alert");
        assert_eq!(sanitize_component("前方有 行人!!", "analysis"), "analysis");
        assert_eq!(sanitize_component("a b  c", "x"), "a_b_c");
        assert_eq!(sanitize_component("..hello world--", "x"), "hello_world");
        assert_eq!(sanitize_component("", "fallback"), "fallback");
    }

    #[test]
    fn test_write_record() {
        let dir = temp_dir();
        let writer = AnalysisWriter::new(&dir).unwrap();
        let record = AnalysisRecord::new(
            Some("img_20240101120000.jpg".to_string()),
            "voice_distance_alert",
            json!({"voice_text": "前方有 台階，距離約 0.1 公尺，請注意"}),
            &["voice", "distance"],
        );

        let path = writer.write(&record).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("img_20240101120000.jpg_voice_distance_alert_voice_distance_"));
        assert!(name.ends_with(".txt"));

        let stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["photo"], "img_20240101120000.jpg");
        assert_eq!(stored["description"], "voice_distance_alert");
        assert_eq!(stored["tags"], json!(["voice", "distance"]));
        assert_eq!(stored["response"]["voice_text"], "前方有 台階，距離約 0.1 公尺，請注意");
        assert!(stored["ts"].is_string());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unknown_photo_and_long_description() {
        let dir = temp_dir();
        let writer = AnalysisWriter::new(&dir).unwrap();
        let record = AnalysisRecord::new(None, &"x".repeat(100), Value::Null, &["!!"]);

        let path = writer.write(&record).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("img_unknown_{}_", "x".repeat(64))));

        let stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(stored["photo"].is_null());
        assert_eq!(stored["tags"], json!([]));

        fs::remove_dir_all(&dir).unwrap();
    }
}

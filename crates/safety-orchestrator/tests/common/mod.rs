//! Fake collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use camera_capture::{CameraError, FrameSource, VideoFrame};
use cane_events::Event;
use caregiver_alert::{NotificationSink, NotificationWorker};
use hazard_classifier::{BoundingBox, DetectedObject, DetectorError, HazardConfig, ObjectDetector};
use safety_orchestrator::{
    AnalysisError, AnalysisRecord, AnalysisSink, Collaborators, Orchestrator, OrchestratorConfig,
};
use tof_receiver::{ProximitySource, TofError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use understanding::TextRewriter;
use voice_output::{SpeechError, SpeechSink, VoiceScheduler};

pub struct ScriptedProximity {
    readings: VecDeque<Option<f64>>,
    pub reads: Arc<AtomicUsize>,
}

impl ScriptedProximity {
    pub fn new(readings: Vec<Option<f64>>) -> Self {
        Self {
            readings: readings.into(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ProximitySource for ScriptedProximity {
    fn read_latest_distance(&mut self) -> Result<Option<f64>, TofError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.readings.pop_front().flatten())
    }
}

pub struct FakeCamera {
    level: u8,
    pub captures: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new(level: u8) -> Self {
        Self {
            level,
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FrameSource for FakeCamera {
    fn get_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(VideoFrame::solid(640, 480, self.level))
    }

    fn latest_image_name(&self) -> Option<String> {
        Some("img_test.jpg".to_string())
    }
}

pub enum FakeDetector {
    Finds(Vec<DetectedObject>),
    Fails,
}

impl ObjectDetector for FakeDetector {
    fn detect_objects(&mut self, _frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectorError> {
        match self {
            FakeDetector::Finds(objects) => Ok(objects.clone()),
            FakeDetector::Fails => Err(DetectorError::Inference("model crashed".to_string())),
        }
    }
}

pub fn object(label: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> DetectedObject {
    DetectedObject {
        label: label.to_string(),
        bbox: BoundingBox { x1, y1, x2, y2 },
        confidence: 0.9,
    }
}

/// Car at 6.0 m: mid severity
pub fn far_car() -> DetectedObject {
    object("car", 280, 100, 360, 150)
}

/// Person at 2.0 m: high severity
pub fn near_person() -> DetectedObject {
    object("person", 300, 100, 340, 260)
}

/// Records sentences; with a gate, each sentence waits for one permit
#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
    pub gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl SpeechSink for RecordingSpeech {
    async fn synthesize(&self, text: &str) -> Result<(), SpeechError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send(&self, message: &str) -> bool {
        self.sent.lock().unwrap().push(message.to_string());
        true
    }
}

#[derive(Default)]
pub struct MemoryAnalysis {
    pub records: Mutex<Vec<AnalysisRecord>>,
}

impl AnalysisSink for MemoryAnalysis {
    fn log_analysis(&self, record: &AnalysisRecord) -> Result<(), AnalysisError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Rewriter with a deterministic summary and unchanged wording
pub struct EchoRewriter;

#[async_trait]
impl TextRewriter for EchoRewriter {
    async fn rewrite(&self, _events: &[Event], original: &str) -> (String, bool) {
        (format!("{}。", original), true)
    }

    async fn summarize(&self, events: &[Event]) -> String {
        format!("{} danger events", events.len())
    }

    async fn rewrite_for_caregiver(&self, _events: &[Event], original: &str) -> String {
        format!("[report] {}", original)
    }
}

pub struct Rig {
    pub orchestrator: Orchestrator,
    pub reads: Arc<AtomicUsize>,
    pub captures: Arc<AtomicUsize>,
    pub speech: Arc<RecordingSpeech>,
    pub voice: Arc<VoiceScheduler>,
    pub notifier: Arc<RecordingNotifier>,
    pub analysis: Arc<MemoryAnalysis>,
    pub worker: JoinHandle<()>,
}

impl Rig {
    /// Drop the orchestrator and wait for queued notifications to be sent
    pub async fn sent_notifications(self) -> Vec<String> {
        let Rig {
            orchestrator,
            notifier,
            worker,
            ..
        } = self;
        drop(orchestrator);
        worker.await.unwrap();
        let sent = notifier.sent.lock().unwrap().clone();
        sent
    }

    pub fn spoken(&self) -> Vec<String> {
        self.speech.spoken.lock().unwrap().clone()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.analysis
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.description.clone())
            .collect()
    }
}

pub fn rig(
    readings: Vec<Option<f64>>,
    frame_level: u8,
    detector: FakeDetector,
    rewriter: Arc<dyn TextRewriter>,
) -> Rig {
    build(readings, frame_level, detector, rewriter, RecordingSpeech::default())
}

/// Rig whose speech blocks until `gate` hands out a permit per sentence
pub fn gated_rig(readings: Vec<Option<f64>>, gate: Arc<Semaphore>) -> Rig {
    let speech = RecordingSpeech {
        gate: Some(gate),
        ..RecordingSpeech::default()
    };
    build(
        readings,
        128,
        FakeDetector::Finds(Vec::new()),
        Arc::new(EchoRewriter),
        speech,
    )
}

fn build(
    readings: Vec<Option<f64>>,
    frame_level: u8,
    detector: FakeDetector,
    rewriter: Arc<dyn TextRewriter>,
    speech: RecordingSpeech,
) -> Rig {
    let proximity = ScriptedProximity::new(readings);
    let camera = FakeCamera::new(frame_level);
    let reads = proximity.reads.clone();
    let captures = camera.captures.clone();

    let speech = Arc::new(speech);
    let voice = Arc::new(VoiceScheduler::new(speech.clone()));
    let notifier = Arc::new(RecordingNotifier::default());
    let analysis = Arc::new(MemoryAnalysis::default());
    let (notifications, worker) = NotificationWorker::channel(16, notifier.clone(), rewriter.clone());

    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        &HazardConfig::default(),
        Collaborators {
            proximity: Box::new(proximity),
            camera: Box::new(camera),
            detector: Box::new(detector),
            voice: voice.clone(),
            rewriter,
            notifications,
            analysis: analysis.clone(),
        },
    );

    Rig {
        orchestrator,
        reads,
        captures,
        speech,
        voice,
        notifier,
        analysis,
        worker: worker.spawn(),
    }
}

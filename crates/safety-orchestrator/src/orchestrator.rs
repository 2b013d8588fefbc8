//! Event-triggered safety cycle

use std::sync::Arc;
use std::time::Duration;

use camera_capture::FrameSource;
use cane_events::{topics, Event, EventBus};
use caregiver_alert::{NotificationCooldown, NotificationJob, NotificationQueue};
use hazard_classifier::{DistanceClassifier, HazardConfig, ObjectDetector, VisionClassifier};
use metrics::counter;
use serde_json::json;
use tof_receiver::ProximitySource;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use understanding::TextRewriter;
use voice_output::{Priority, VoiceScheduler};

use crate::analysis::{AnalysisRecord, AnalysisSink};
use crate::phrases::alert_sentence;
use crate::window::SlidingWindow;
use crate::OrchestratorConfig;

async fn wait_for_voice_idle(voice: &VoiceScheduler, timeout: Duration) {
    if !voice.is_busy() {
        return;
    }
    info!("Voice output busy; pausing safety loop until idle");
    if voice.wait_until_idle(Some(timeout)).await {
        info!("Voice output idle; resuming safety loop");
    } else {
        warn!("Voice output still busy after {:?}; resuming anyway", timeout);
    }
}

/// Everything the safety cycle talks to
pub struct Collaborators {
    pub proximity: Box<dyn ProximitySource>,
    pub camera: Box<dyn FrameSource>,
    pub detector: Box<dyn ObjectDetector>,
    pub voice: Arc<VoiceScheduler>,
    pub rewriter: Arc<dyn TextRewriter>,
    pub notifications: NotificationQueue,
    pub analysis: Arc<dyn AnalysisSink>,
}

/// Safety orchestrator
///
/// Owns the recent-event windows and the notification cooldown; nothing
/// else writes to them.
pub struct Orchestrator {
    config: OrchestratorConfig,
    bus: Arc<EventBus>,
    distance: DistanceClassifier,
    vision: VisionClassifier,

    proximity: Box<dyn ProximitySource>,
    camera: Box<dyn FrameSource>,
    detector: Box<dyn ObjectDetector>,
    voice: Arc<VoiceScheduler>,
    rewriter: Arc<dyn TextRewriter>,
    notifications: NotificationQueue,
    analysis: Arc<dyn AnalysisSink>,

    camera_window: SlidingWindow<Event>,
    cane_window: SlidingWindow<Event>,
    danger_window: SlidingWindow<Event>,

    cooldown: NotificationCooldown,
    frame_black_threshold: f64,
    voice_idle_timeout: Duration,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, hazard: &HazardConfig, collaborators: Collaborators) -> Self {
        let capacity = config.window_capacity();
        info!(
            "Creating orchestrator: interval={}s, window={} events, understanding={}",
            config.loop_interval_secs, capacity, config.use_understanding
        );

        Self {
            config,
            bus: Arc::new(EventBus::new()),
            distance: DistanceClassifier::new(hazard),
            vision: VisionClassifier::new(hazard),
            proximity: collaborators.proximity,
            camera: collaborators.camera,
            detector: collaborators.detector,
            voice: collaborators.voice,
            rewriter: collaborators.rewriter,
            notifications: collaborators.notifications,
            analysis: collaborators.analysis,
            camera_window: SlidingWindow::new(capacity),
            cane_window: SlidingWindow::new(capacity),
            danger_window: SlidingWindow::new(capacity),
            cooldown: NotificationCooldown::new(Duration::from_secs(3)),
            frame_black_threshold: 5.0,
            voice_idle_timeout: Duration::from_secs(10),
        }
    }

    /// Mean brightness at or below which frames are skipped
    pub fn with_frame_black_threshold(mut self, threshold: f64) -> Self {
        self.frame_black_threshold = threshold;
        self
    }

    /// Minimum spacing between caregiver notifications
    pub fn with_notification_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = NotificationCooldown::new(cooldown);
        self
    }

    /// Upper bound on waiting for speech to finish
    pub fn with_voice_idle_timeout(mut self, timeout: Duration) -> Self {
        self.voice_idle_timeout = timeout;
        self
    }

    /// Bus the classified events are published on
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn recent_camera_events(&self) -> &SlidingWindow<Event> {
        &self.camera_window
    }

    pub fn recent_cane_events(&self) -> &SlidingWindow<Event> {
        &self.cane_window
    }

    pub fn recent_danger_events(&self) -> &SlidingWindow<Event> {
        &self.danger_window
    }

    /// Run one trigger-gated safety cycle
    pub async fn process_safety_once(&mut self) {
        counter!("cane_cycles_total").increment(1);
        wait_for_voice_idle(&self.voice, self.voice_idle_timeout).await;

        let distance = match self.proximity.read_latest_distance() {
            Ok(Some(distance)) => distance,
            Ok(None) => return,
            Err(e) => {
                error!("Proximity sensor read failed: {}", e);
                return;
            }
        };
        counter!("cane_triggers_total").increment(1);
        info!("Trigger received (dist={:.2}m). Processing vision...", distance);

        let frame = match self.camera.get_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Frame capture failed after trigger at {:.2}m: {}", distance, e);
                return;
            }
        };
        let brightness = frame.mean_brightness();
        if frame.is_blank(self.frame_black_threshold) {
            warn!(
                "Captured frame looks blank (mean {:.1} <= {:.1}); skipping vision processing",
                brightness, self.frame_black_threshold
            );
            counter!("cane_blank_frames_total").increment(1);
            return;
        }

        let camera_events = match self.detector.detect_objects(&frame) {
            Ok(objects) => self.vision.classify(&frame.geometry(), &objects),
            Err(e) => {
                warn!("Object detection failed (frame mean {:.1}): {}", brightness, e);
                Vec::new()
            }
        };
        self.publish(topics::CAMERA_EVENTS, &camera_events);
        self.camera_window.extend(camera_events.iter().cloned());

        let cane_events = self.distance.classify(Some(distance));
        self.publish(topics::CANE_EVENTS, &cane_events);
        self.cane_window.extend(cane_events.iter().cloned());

        for event in camera_events.iter().chain(cane_events.iter()) {
            self.alert(event).await;
        }
    }

    fn publish(&mut self, topic: &str, events: &[Event]) {
        for event in events {
            counter!("cane_events_total", "source" => event.source().as_str()).increment(1);
            self.bus.publish(topic, event);
            if event.severity().is_danger() {
                self.bus.publish(topics::DANGER_EVENTS, event);
                self.danger_window.push(event.clone());
            }
        }
    }

    /// Speak, log and (when severe enough) escalate one event
    async fn alert(&mut self, event: &Event) {
        if !event.severity().is_danger() {
            return;
        }
        let Some(voice_text) = alert_sentence(event) else {
            return;
        };

        let (spoken, rewritten) = if self.config.use_understanding {
            self.rewriter
                .rewrite(std::slice::from_ref(event), &voice_text)
                .await
        } else {
            (voice_text.clone(), false)
        };
        let source_tag = if rewritten { "Ollama" } else { "NAN" };

        self.voice.speak(&spoken, Priority::High, Some(source_tag)).await;
        wait_for_voice_idle(&self.voice, self.voice_idle_timeout).await;

        let record = AnalysisRecord::new(
            self.camera.latest_image_name(),
            "voice_distance_alert",
            json!({
                "voice_text": voice_text,
                "voice_source": source_tag,
                "rewritten_voice_text": spoken,
                "event": event.to_value(),
            }),
            &["voice", "distance"],
        );
        if let Err(e) = self.analysis.log_analysis(&record) {
            error!("Failed to write analysis record for {}: {}", event.kind(), e);
        }

        if event.severity().notifies_caregiver() && self.cooldown.try_acquire() {
            self.notifications.submit(NotificationJob {
                message: voice_text,
                events: vec![event.clone()],
            });
        }
    }

    /// Summarize and clear accumulated danger events
    pub async fn flush_danger_summary(&mut self) {
        if !self.config.use_understanding || self.danger_window.is_empty() {
            return;
        }

        let events = self.danger_window.snapshot();
        let summary = self.rewriter.summarize(&events).await;
        if !summary.is_empty() {
            let record = AnalysisRecord::new(
                self.camera.latest_image_name(),
                "understanding_summary",
                json!({
                    "summary": summary,
                    "events": events.iter().map(Event::to_value).collect::<Vec<_>>(),
                }),
                &["voice", "understanding"],
            );
            if let Err(e) = self.analysis.log_analysis(&record) {
                error!("Failed to write danger summary: {}", e);
            }
        }
        self.danger_window.clear();
    }

    /// One loop iteration: safety cycle, then danger summary
    pub async fn run_cycle(&mut self) {
        self.process_safety_once().await;
        self.flush_danger_summary().await;
    }

    /// Run cycles until `duration` elapses (the configured run length if `None`)
    ///
    /// A run length past the clock's range never expires.
    pub async fn main_loop(&mut self, duration: Option<Duration>) {
        let duration = duration.or_else(|| self.config.run_duration());
        let interval = self.config.loop_interval();
        let deadline = duration.and_then(|d| Instant::now().checked_add(d));
        match (duration, deadline) {
            (Some(duration), Some(_)) => info!("Orchestrator main loop start ({:?})", duration),
            _ => info!("Orchestrator main loop start (until stopped)"),
        }

        let mut cycle: u64 = 0;
        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            debug!("Main loop cycle {}", cycle);
            self.run_cycle().await;
            tokio::time::sleep(interval).await;
            cycle += 1;
        }
        info!("Orchestrator main loop end after {} cycles", cycle);
    }
}

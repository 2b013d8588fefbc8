//! Collaborator graph construction

use std::sync::Arc;
use std::time::Duration;

use camera_capture::{CameraConfig, CameraError, FrameSource, FrameStore, ImageFileSource, RecordingSource};
use caregiver_alert::{LineNotifier, NotificationSink, NotificationWorker};
use hazard_classifier::NullDetector;
use safety_orchestrator::{AnalysisWriter, Collaborators, Orchestrator, SafetyRunner, VoiceControlService};
use tof_receiver::{ProximitySource, SimulatedTof, TofConfig, TofReceiver};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use understanding::{DisabledRewriter, OllamaClient, TextRewriter};
use voice_command::{FeedbackSpeaker, ScriptedListener, SpeechListener, StdinListener};
use voice_output::{CommandSpeech, LogSpeech, SpeechSink, VoiceScheduler};

use crate::{ServiceError, Settings};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A fully wired cane: voice control, safety runner and background workers
pub struct CaneApp {
    service: VoiceControlService,
    voice: Arc<VoiceScheduler>,
    notification_worker: JoinHandle<()>,
    feedback_worker: JoinHandle<()>,
}

impl CaneApp {
    /// Build every collaborator from settings.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(settings: &Settings) -> Result<Self, ServiceError> {
        let proximity = build_proximity(&settings.tof)?;
        let camera = build_camera(&settings.camera)?;

        let speech: Arc<dyn SpeechSink> = match CommandSpeech::from_config(&settings.voice) {
            Some(speech) => Arc::new(speech),
            None => {
                info!("No speech program configured, logging sentences instead");
                Arc::new(LogSpeech)
            }
        };
        let voice = Arc::new(VoiceScheduler::new(speech));

        let rewriter: Arc<dyn TextRewriter> = if settings.understanding.enabled {
            Arc::new(OllamaClient::new(settings.understanding.clone())?)
        } else {
            info!("Understanding layer disabled");
            Arc::new(DisabledRewriter)
        };

        let notifier: Arc<dyn NotificationSink> =
            Arc::new(LineNotifier::new(settings.caregiver.line.clone())?);
        let (notifications, worker) = NotificationWorker::channel(
            settings.caregiver.queue_capacity,
            notifier.clone(),
            rewriter.clone(),
        );
        let notification_worker = worker.spawn();

        let analysis = Arc::new(AnalysisWriter::new(settings.orchestrator.analysis_dir.clone())?);

        let orchestrator = Orchestrator::new(
            settings.orchestrator.clone(),
            &settings.hazard,
            Collaborators {
                proximity,
                camera,
                detector: Box::new(NullDetector),
                voice: voice.clone(),
                rewriter,
                notifications,
                analysis,
            },
        )
        .with_frame_black_threshold(settings.camera.frame_black_threshold)
        .with_notification_cooldown(settings.caregiver.cooldown())
        .with_voice_idle_timeout(settings.voice.idle_wait());
        let runner = Arc::new(SafetyRunner::new(orchestrator));

        let (feedback, feedback_worker) = FeedbackSpeaker::spawn(voice.clone());
        let listener: Arc<dyn SpeechListener> = match &settings.command.simulated_inputs {
            Some(inputs) => {
                info!("Using scripted voice input ({} phrases)", inputs.len());
                Arc::new(ScriptedListener::phrases(inputs.clone()))
            }
            None => Arc::new(StdinListener::new()),
        };

        let service = VoiceControlService::new(
            runner,
            settings.command.clone(),
            listener,
            notifier,
            feedback,
        );

        Ok(Self {
            service,
            voice,
            notification_worker,
            feedback_worker,
        })
    }

    pub fn service(&self) -> &VoiceControlService {
        &self.service
    }

    /// Greet, then run the listener and the safety loop together
    pub async fn start_active(&self) {
        self.service.say_greeting();
        self.service.start().await;
    }

    /// Greet, then wait for the spoken start phrase
    pub fn start_standby(&self) {
        self.service.say_greeting();
        self.service.start_standby();
    }

    /// Stop everything and give queued speech and notifications a chance to finish
    pub async fn shutdown(self) {
        self.service.stop().await;
        drop(self.service);

        if tokio::time::timeout(SHUTDOWN_GRACE, self.feedback_worker).await.is_err() {
            warn!("Feedback speaker did not stop in time");
        }
        if !self.voice.wait_until_idle(Some(SHUTDOWN_GRACE)).await {
            warn!("Speech still playing at shutdown");
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, self.notification_worker).await.is_err() {
            warn!("Notification worker did not drain in time");
        }
        info!("Smart cane stopped");
    }
}

fn build_proximity(config: &TofConfig) -> Result<Box<dyn ProximitySource>, ServiceError> {
    match &config.simulate_samples {
        Some(samples) => Ok(Box::new(SimulatedTof::new(samples.clone()))),
        None => Ok(Box::new(TofReceiver::spawn(config)?)),
    }
}

fn build_camera(config: &CameraConfig) -> Result<Box<dyn FrameSource>, ServiceError> {
    let path = config
        .image_path
        .clone()
        .ok_or_else(|| CameraError::Open("no camera source configured (camera.image_path)".to_string()))?;
    let source = ImageFileSource::new(path);

    if config.save_frames {
        let store = FrameStore::new(&config.image_dir)?;
        Ok(Box::new(RecordingSource::new(source, store)))
    } else {
        Ok(Box::new(source))
    }
}

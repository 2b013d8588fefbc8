mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{rig, FakeDetector, RecordingNotifier};
use safety_orchestrator::{SafetyRunner, VoiceControlService};
use understanding::DisabledRewriter;
use voice_command::{CommandConfig, CommandMode, FeedbackSpeaker, ScriptedListener};
use voice_output::{LogSpeech, VoiceScheduler};

fn idle_runner() -> (Arc<SafetyRunner>, Arc<std::sync::atomic::AtomicUsize>) {
    let rig = rig(
        Vec::new(),
        128,
        FakeDetector::Finds(Vec::new()),
        Arc::new(DisabledRewriter),
    );
    let reads = rig.reads.clone();
    (Arc::new(SafetyRunner::new(rig.orchestrator)), reads)
}

#[tokio::test]
async fn test_runner_start_stop_idempotent() {
    let (runner, reads) = idle_runner();
    assert!(!runner.is_running());

    runner.start().await;
    runner.start().await;
    assert!(runner.is_running());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(reads.load(Ordering::SeqCst) > 0);

    runner.stop().await;
    assert!(!runner.is_running());
    runner.stop().await;

    let after_stop = reads.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(reads.load(Ordering::SeqCst), after_stop);

    runner.start().await;
    assert!(runner.is_running());
    runner.stop().await;
}

fn service(runner: Arc<SafetyRunner>, phrases: &[&str]) -> VoiceControlService {
    let scheduler = Arc::new(VoiceScheduler::new(Arc::new(LogSpeech)));
    let (feedback, _speaker) = FeedbackSpeaker::spawn(scheduler);
    VoiceControlService::new(
        runner,
        CommandConfig::default(),
        Arc::new(ScriptedListener::phrases(phrases.iter().copied())),
        Arc::new(RecordingNotifier::default()),
        feedback,
    )
}

#[tokio::test]
async fn test_spoken_start_runs_safety_loop() {
    let (runner, _) = idle_runner();
    let service = service(runner, &["嗨小A 啟動行人輔助"]);

    service.start_standby();
    assert!(service.join_listener(Some(Duration::from_secs(2))).await);

    assert!(service.is_safety_running());
    assert_eq!(service.handler().mode(), CommandMode::Active);

    service.stop().await;
    assert!(!service.is_safety_running());
}

#[tokio::test]
async fn test_spoken_stop_halts_safety_loop() {
    let (runner, _) = idle_runner();
    let service = service(runner, &["start safety", "stop safety"]);

    service.start_standby();
    assert!(service.join_listener(Some(Duration::from_secs(5))).await);

    assert!(!service.is_safety_running());
    assert_eq!(service.handler().mode(), CommandMode::Standby);
}

#[tokio::test]
async fn test_active_start_runs_both() {
    let (runner, _) = idle_runner();
    let service = service(runner, &[]);

    service.start().await;
    service.say_greeting();
    assert!(service.is_safety_running());

    service.stop().await;
    assert!(!service.is_safety_running());
}

//! Background safety loop

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use voice_command::SafetyControl;

use crate::Orchestrator;

const STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct LoopTask {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// Keeps the safety cycle running on a background task
///
/// `start` and `stop` are idempotent and serialized against each other.
pub struct SafetyRunner {
    orchestrator: Arc<tokio::sync::Mutex<Orchestrator>>,
    interval: Duration,
    task: Mutex<Option<LoopTask>>,
    transition: tokio::sync::Mutex<()>,
}

impl SafetyRunner {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let interval = orchestrator.config().loop_interval();
        Self {
            orchestrator: Arc::new(tokio::sync::Mutex::new(orchestrator)),
            interval,
            task: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Shared handle to the orchestrator (inspection between cycles)
    pub fn orchestrator(&self) -> &Arc<tokio::sync::Mutex<Orchestrator>> {
        &self.orchestrator
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Spawn the loop task unless it is already running
    pub async fn start(&self) {
        let _transition = self.transition.lock().await;
        if self.is_running() {
            debug!("Safety support already running");
            return;
        }

        let (stop, mut stop_rx) = watch::channel(false);
        let orchestrator = self.orchestrator.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            info!("Safety support loop running");
            while !*stop_rx.borrow() {
                orchestrator.lock().await.run_cycle().await;
                tokio::select! {
                    _ = stop_rx.changed() => {}
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            info!("Safety support loop exiting");
        });

        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(LoopTask { handle, stop });
        info!("Safety support task started");
    }

    /// Signal the loop to exit and wait (bounded) for the current cycle
    pub async fn stop(&self) {
        let _transition = self.transition.lock().await;
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(LoopTask { mut handle, stop }) = task else {
            debug!("Safety support already stopped");
            return;
        };

        stop.send_replace(true);
        if tokio::time::timeout(STOP_TIMEOUT, &mut handle).await.is_err() {
            warn!("Safety loop did not finish within {:?}; aborting", STOP_TIMEOUT);
            handle.abort();
        }
        info!("Safety support task stopped");
    }
}

#[async_trait]
impl SafetyControl for SafetyRunner {
    async fn start_safety(&self) {
        self.start().await;
    }

    async fn stop_safety(&self) {
        self.stop().await;
    }
}

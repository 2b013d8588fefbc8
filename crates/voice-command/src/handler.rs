//! Mode state machine and listen loop

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use caregiver_alert::NotificationSink;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::{match_command, Command};
use crate::{CommandConfig, FeedbackSpeaker, ListenError, SafetyControl, SpeechListener};

const GREETING: &str = "你好，我是您的智慧導盲犬助理。請說「啟動行人輔助」來開始。";
const DEPARTURE_MESSAGE: &str = "使用者已出發，行人輔助開啟中。";
const ARRIVAL_MESSAGE: &str = "使用者已安全抵達，行人輔助關閉。";

/// Command mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMode {
    Standby,
    Active,
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandMode::Standby => "standby",
            CommandMode::Active => "active",
        })
    }
}

struct ModeState {
    mode: CommandMode,
    failures: u32,
}

/// Outcome of one unrecognized input
enum Miss {
    Ignored,
    Retry,
    TimedOut,
}

struct ListenTask {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// Dispatches recognized phrases and tracks the standby/active mode
pub struct CommandHandler {
    state: Mutex<ModeState>,
    control: Arc<dyn SafetyControl>,
    notifier: Arc<dyn NotificationSink>,
    feedback: FeedbackSpeaker,
    listener: Arc<dyn SpeechListener>,
    config: CommandConfig,
    task: Mutex<Option<ListenTask>>,
}

impl CommandHandler {
    pub fn new(
        config: CommandConfig,
        listener: Arc<dyn SpeechListener>,
        control: Arc<dyn SafetyControl>,
        notifier: Arc<dyn NotificationSink>,
        feedback: FeedbackSpeaker,
    ) -> Self {
        Self {
            state: Mutex::new(ModeState {
                mode: CommandMode::Standby,
                failures: 0,
            }),
            control,
            notifier,
            feedback,
            listener,
            config,
            task: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> CommandMode {
        self.lock_state().mode
    }

    /// Consecutive unrecognized inputs while active
    pub fn failures(&self) -> u32 {
        self.lock_state().failures
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ModeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn say_greeting(&self) {
        self.feedback.say(GREETING);
    }

    /// Feed one listen result into the state machine
    ///
    /// `None` means nothing intelligible was heard.
    pub async fn handle_input(&self, text: Option<&str>) {
        match text.and_then(|t| match_command(t, &self.config.wake_words)) {
            Some(command) => {
                info!("Dispatching command [{}] from text: {:?}", command, text);
                self.dispatch(command).await;
            }
            None => self.handle_unrecognized(text.is_some()).await,
        }
    }

    async fn dispatch(&self, command: Command) {
        match command {
            Command::StartSafety => {
                if self.transition(CommandMode::Active) {
                    self.feedback.say("行人輔助已啟動");
                    self.control.start_safety().await;
                }
            }
            Command::StopSafety => {
                if self.transition(CommandMode::Standby) {
                    self.feedback.say("行人輔助已關閉");
                    self.control.stop_safety().await;
                }
            }
            Command::ReportDeparture => {
                self.reset_failures();
                self.feedback.say("收到，回報出發");
                self.notify(DEPARTURE_MESSAGE).await;
            }
            Command::ReportArrival => {
                self.reset_failures();
                self.feedback.say("收到，回報抵達");
                self.notify(ARRIVAL_MESSAGE).await;
            }
        }
    }

    /// Enter `mode`, resetting the failure counter; true if the mode changed
    fn transition(&self, mode: CommandMode) -> bool {
        let mut state = self.lock_state();
        state.failures = 0;
        let changed = state.mode != mode;
        state.mode = mode;
        if changed {
            info!("Command mode -> {}", mode);
        }
        changed
    }

    fn reset_failures(&self) {
        self.lock_state().failures = 0;
    }

    async fn handle_unrecognized(&self, heard_text: bool) {
        let miss = {
            let mut state = self.lock_state();
            if state.mode == CommandMode::Standby {
                Miss::Ignored
            } else {
                state.failures += 1;
                debug!("No command recognized ({}/{})", state.failures, self.config.max_failures);
                if state.failures >= self.config.max_failures {
                    state.mode = CommandMode::Standby;
                    state.failures = 0;
                    Miss::TimedOut
                } else {
                    Miss::Retry
                }
            }
        };

        match miss {
            Miss::Ignored => {}
            Miss::Retry if heard_text => self.feedback.say("抱歉，我不知道這個指令"),
            Miss::Retry => self.feedback.say("我沒聽清楚，請再說一次"),
            Miss::TimedOut => {
                info!("Command mode -> standby (no command recognized)");
                self.feedback.say("太久沒有收到指令，切換回待機模式");
                self.feedback.say("行人輔助已關閉");
                self.control.stop_safety().await;
            }
        }
    }

    async fn notify(&self, message: &str) {
        if !self.notifier.send(message).await {
            warn!("Caregiver message not sent: {}", message);
        }
    }

    /// Spawn the listen loop (no-op if already running)
    pub fn start_listening(self: &Arc<Self>) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Voice listener already running");
            return;
        }

        let (stop, stop_rx) = watch::channel(false);
        let handler = self.clone();
        let handle = tokio::spawn(async move { handler.listen_loop(stop_rx).await });
        *task = Some(ListenTask { handle, stop });
        info!("Voice listener started");
    }

    async fn listen_loop(&self, mut stop_rx: watch::Receiver<bool>) {
        let timeout = self.config.listen_timeout();

        loop {
            if *stop_rx.borrow() {
                break;
            }
            let heard = tokio::select! {
                _ = stop_rx.changed() => break,
                heard = self.listener.listen(timeout) => heard,
            };

            match heard {
                Ok(text) => self.handle_input(text.as_deref()).await,
                Err(ListenError::Closed) => {
                    info!("Voice input closed");
                    break;
                }
                Err(e) => {
                    warn!("Voice listening failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    self.handle_input(None).await;
                }
            }
        }
        info!("Voice listener loop exited");
    }

    /// Signal the listen loop to exit and wait briefly for it
    pub async fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(ListenTask { handle, stop }) = task {
            stop.send_replace(true);
            match tokio::time::timeout(Duration::from_secs(1), handle).await {
                Ok(_) => info!("Voice listener stopped"),
                Err(_) => warn!("Voice listener did not stop within 1s"),
            }
        }
    }

    /// Wait for the listen loop to finish on its own; false on timeout
    pub async fn join(&self, timeout: Option<Duration>) -> bool {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut task) = task else {
            return true;
        };

        let finished = match timeout {
            Some(limit) => tokio::time::timeout(limit, &mut task.handle).await.is_ok(),
            None => {
                let _ = (&mut task.handle).await;
                true
            }
        };
        if !finished {
            *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
        }
        finished
    }

    pub fn is_listening(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }
}

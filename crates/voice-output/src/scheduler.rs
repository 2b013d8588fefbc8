//! Priority queue of spoken sentences

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error};

use crate::SpeechSink;

/// Speech priority class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High = 0,
    Mid = 1,
    Low = 2,
}

impl Priority {
    /// Queue rank; lower is spoken first
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Mid => "mid",
            Priority::Low => "low",
        })
    }
}

/// One queued sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRequest {
    pub priority: Priority,
    /// Monotonic enqueue counter
    pub sequence: u64,
    pub text: String,
    /// Where the wording came from, e.g. "Ollama"
    pub source: Option<String>,
}

impl Ord for VoiceRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for the max-heap: lowest rank, then oldest, pops first
        other
            .priority
            .rank()
            .cmp(&self.priority.rank())
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for VoiceRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<VoiceRequest>,
    next_sequence: u64,
}

/// Serializes all speech through one sink, highest priority first
///
/// Whoever holds the drain lock speaks everything queued, including
/// requests pushed by other callers while it is speaking.
pub struct VoiceScheduler {
    sink: Arc<dyn SpeechSink>,
    queue: Mutex<Queue>,
    drain: tokio::sync::Mutex<()>,
    busy: watch::Sender<bool>,
}

/// Clears the busy flag even if the draining future is dropped
struct BusyGuard<'a>(&'a watch::Sender<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl VoiceScheduler {
    pub fn new(sink: Arc<dyn SpeechSink>) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            sink,
            queue: Mutex::new(Queue::default()),
            drain: tokio::sync::Mutex::new(()),
            busy,
        }
    }

    /// Queue a sentence and speak until the queue is empty
    ///
    /// Blank text is ignored.
    pub async fn speak(&self, text: &str, priority: Priority, source: Option<&str>) {
        if !self.enqueue(text, priority, source) {
            return;
        }
        self.drain().await;
    }

    /// Queue without speaking; returns false for blank text
    pub fn enqueue(&self, text: &str, priority: Priority, source: Option<&str>) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let sequence = queue.next_sequence;
        queue.next_sequence += 1;
        queue.heap.push(VoiceRequest {
            priority,
            sequence,
            text: text.to_string(),
            source: source.map(str::to_string),
        });
        debug!("Queued [{}] #{}: {}", priority, sequence, text);
        true
    }

    /// Speak every queued request in priority order
    pub async fn drain(&self) {
        let _lock = self.drain.lock().await;
        self.busy.send_replace(true);
        let _busy = BusyGuard(&self.busy);

        while let Some(request) = self.pop() {
            if let Err(e) = self.sink.synthesize(&request.text).await {
                error!(
                    "Speech synthesis failed for [{}] '{}': {}",
                    request.priority, request.text, e
                );
            }
        }
    }

    fn pop(&self) -> Option<VoiceRequest> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).heap.pop()
    }

    /// Number of requests waiting to be spoken
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).heap.len()
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Wait until nothing is being spoken; false if the timeout elapsed first
    pub async fn wait_until_idle(&self, timeout: Option<Duration>) -> bool {
        let mut rx = self.busy.subscribe();
        let idle = async move { rx.wait_for(|busy| !*busy).await.is_ok() };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, idle).await.unwrap_or(false),
            None => idle.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpeechError;
    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct RecordingSink {
        spoken: Mutex<Vec<String>>,
        gate: Option<Arc<Semaphore>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingSink {
        fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechSink for RecordingSink {
        async fn synthesize(&self, text: &str) -> Result<(), SpeechError> {
            self.spoken.lock().unwrap().push(text.to_string());
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail_on == Some(text) {
                return Err(SpeechError::Exit("exit status: 1".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_request_ordering() {
        let request = |priority, sequence| VoiceRequest {
            priority,
            sequence,
            text: String::new(),
            source: None,
        };
        let mut heap = BinaryHeap::new();
        heap.push(request(Priority::Low, 0));
        heap.push(request(Priority::High, 1));
        heap.push(request(Priority::Mid, 2));
        heap.push(request(Priority::High, 3));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|r| (r.priority, r.sequence))
            .collect();
        assert_eq!(
            order,
            vec![
                (Priority::High, 1),
                (Priority::High, 3),
                (Priority::Mid, 2),
                (Priority::Low, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_drain_speaks_by_priority() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = VoiceScheduler::new(sink.clone());

        scheduler.enqueue("low", Priority::Low, None);
        scheduler.enqueue("high", Priority::High, Some("Ollama"));
        scheduler.enqueue("mid", Priority::Mid, None);
        assert_eq!(scheduler.pending(), 3);

        scheduler.drain().await;
        assert_eq!(sink.spoken(), vec!["high", "mid", "low"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_blank_text_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = VoiceScheduler::new(sink.clone());

        scheduler.speak("   ", Priority::High, None).await;
        scheduler.speak("", Priority::Low, None).await;
        assert!(sink.spoken().is_empty());
        assert!(!scheduler.is_busy());
    }

    #[tokio::test]
    async fn test_requests_join_running_drain() {
        let gate = Arc::new(Semaphore::new(0));
        let sink = Arc::new(RecordingSink {
            gate: Some(gate.clone()),
            ..RecordingSink::default()
        });
        let scheduler = Arc::new(VoiceScheduler::new(sink.clone()));

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.speak("first", Priority::Low, None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(scheduler.is_busy());
        assert!(!scheduler.wait_until_idle(Some(Duration::from_millis(20))).await);

        let mut others = Vec::new();
        for (text, priority) in [("low", Priority::Low), ("high", Priority::High), ("mid", Priority::Mid)] {
            let scheduler = scheduler.clone();
            others.push(tokio::spawn(async move { scheduler.speak(text, priority, None).await }));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        gate.add_permits(4);
        first.await.unwrap();
        for handle in others {
            handle.await.unwrap();
        }

        assert_eq!(sink.spoken(), vec!["first", "high", "mid", "low"]);
        assert!(scheduler.wait_until_idle(Some(Duration::from_millis(50))).await);
        assert!(!scheduler.is_busy());
    }

    #[tokio::test]
    async fn test_failed_synthesis_does_not_stop_drain() {
        let sink = Arc::new(RecordingSink {
            fail_on: Some("broken"),
            ..RecordingSink::default()
        });
        let scheduler = VoiceScheduler::new(sink.clone());

        scheduler.enqueue("broken", Priority::High, None);
        scheduler.enqueue("after", Priority::Mid, None);
        scheduler.drain().await;

        assert_eq!(sink.spoken(), vec!["broken", "after"]);
        assert!(!scheduler.is_busy());
    }

    #[tokio::test]
    async fn test_idle_scheduler_returns_immediately() {
        let scheduler = VoiceScheduler::new(Arc::new(RecordingSink::default()));
        assert!(scheduler.wait_until_idle(None).await);
        assert!(scheduler.wait_until_idle(Some(Duration::ZERO)).await);
    }
}

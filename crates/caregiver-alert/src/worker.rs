//! Background notification delivery

use std::sync::Arc;

use cane_events::Event;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use understanding::TextRewriter;

use crate::NotificationSink;

/// One pending caregiver notification, owned by value
#[derive(Debug, Clone)]
pub struct NotificationJob {
    /// Spoken sentence the report is based on
    pub message: String,
    /// Events that triggered it
    pub events: Vec<Event>,
}

/// Producer half; submitting never waits
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationJob>,
}

impl NotificationQueue {
    /// Hand a job to the worker; false if it was dropped
    pub fn submit(&self, job: NotificationJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!("Notification queue full, dropping: {}", job.message);
                counter!("cane_notifications_total", "outcome" => "dropped").increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!("Notification worker gone, dropping: {}", job.message);
                counter!("cane_notifications_total", "outcome" => "dropped").increment(1);
                false
            }
        }
    }
}

/// Consumes jobs: caregiver wording first, then delivery
pub struct NotificationWorker {
    receiver: mpsc::Receiver<NotificationJob>,
    sink: Arc<dyn NotificationSink>,
    rewriter: Arc<dyn TextRewriter>,
}

impl NotificationWorker {
    /// Create a bounded queue and its worker
    pub fn channel(
        capacity: usize,
        sink: Arc<dyn NotificationSink>,
        rewriter: Arc<dyn TextRewriter>,
    ) -> (NotificationQueue, Self) {
        let (tx, receiver) = mpsc::channel(capacity.max(1));
        (
            NotificationQueue { tx },
            Self {
                receiver,
                sink,
                rewriter,
            },
        )
    }

    /// Run until every queue handle is dropped
    pub async fn run(mut self) {
        info!("Notification worker started");

        while let Some(job) = self.receiver.recv().await {
            let text = self
                .rewriter
                .rewrite_for_caregiver(&job.events, &job.message)
                .await;
            debug!("Sending caregiver notification: {}", text);

            if self.sink.send(&text).await {
                counter!("cane_notifications_total", "outcome" => "sent").increment(1);
            } else {
                warn!("Caregiver notification not delivered: {}", text);
                counter!("cane_notifications_total", "outcome" => "failed").increment(1);
            }
        }

        info!("Notification worker stopped");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cane_events::{EventSource, Severity};
    use std::sync::Mutex;
    use understanding::DisabledRewriter;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        accept: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, message: &str) -> bool {
            self.sent.lock().unwrap().push(message.to_string());
            self.accept
        }
    }

    fn job(message: &str) -> NotificationJob {
        NotificationJob {
            message: message.to_string(),
            events: vec![Event::builder("tof.drop", EventSource::Tof, Severity::Critical)
                .distance_m(0.03)
                .build()
                .unwrap()],
        }
    }

    #[tokio::test]
    async fn test_jobs_rewritten_and_sent_in_order() {
        let sink = Arc::new(RecordingSink {
            accept: true,
            ..RecordingSink::default()
        });
        let (queue, worker) = NotificationWorker::channel(4, sink.clone(), Arc::new(DisabledRewriter));
        let handle = worker.spawn();

        assert!(queue.submit(job("前方有 落差")));
        assert!(queue.submit(job("前方有 車輛")));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec![
                "[系統自動回報] 前方有 落差 (AI 未連線)",
                "[系統自動回報] 前方有 車輛 (AI 未連線)",
            ]
        );
    }

    #[tokio::test]
    async fn test_full_queue_drops_job() {
        let sink = Arc::new(RecordingSink::default());
        let (queue, _worker) = NotificationWorker::channel(1, sink, Arc::new(DisabledRewriter));

        assert!(queue.submit(job("first")));
        assert!(!queue.submit(job("second")));
    }

    #[tokio::test]
    async fn test_closed_worker_drops_job() {
        let sink = Arc::new(RecordingSink::default());
        let (queue, worker) = NotificationWorker::channel(1, sink, Arc::new(DisabledRewriter));
        drop(worker);
        assert!(!queue.submit(job("late")));
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_worker_running() {
        let sink = Arc::new(RecordingSink::default());
        let (queue, worker) = NotificationWorker::channel(4, sink.clone(), Arc::new(DisabledRewriter));
        let handle = worker.spawn();

        queue.submit(job("a"));
        queue.submit(job("b"));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(sink.sent.lock().unwrap().len(), 2);
    }
}

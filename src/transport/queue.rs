use tokio::sync::mpsc;
use uuid::Uuid;

use crate::transport::EmailTransport;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailJob {
    pub notification_id: Uuid,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Bounded submission side of the email worker.
#[derive(Clone)]
pub struct EmailQueue {
    sender: mpsc::Sender<EmailJob>,
}

impl EmailQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EmailJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Never waits. A full or closed queue drops the job and returns `false`.
    pub fn submit(&self, job: EmailJob) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(notification_id = %job.notification_id, "email queue full, dropping email");
                metrics::counter!("emails_dropped_total", "reason" => "queue_full").increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::error!(notification_id = %job.notification_id, "email worker stopped, dropping email");
                metrics::counter!("emails_dropped_total", "reason" => "worker_stopped").increment(1);
                false
            }
        }
    }
}

/// Drains the email queue until every [`EmailQueue`] handle is dropped.
pub struct EmailWorker<E: EmailTransport> {
    transport: E,
}

impl<E: EmailTransport> EmailWorker<E> {
    pub fn new(transport: E) -> Self {
        Self { transport }
    }

    pub async fn run(self, mut receiver: mpsc::Receiver<EmailJob>) {
        tracing::info!("email worker started");

        while let Some(job) = receiver.recv().await {
            match self.transport.send(&job.to, &job.subject, &job.html).await {
                Ok(()) => {
                    metrics::counter!("emails_sent_total").increment(1);
                    tracing::debug!(notification_id = %job.notification_id, "notification email delivered");
                }
                Err(e) => {
                    metrics::counter!("emails_failed_total").increment(1);
                    tracing::error!(
                        notification_id = %job.notification_id,
                        error = %e,
                        "failed to deliver notification email"
                    );
                }
            }
        }

        tracing::info!("email queue closed, email worker shutting down");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::transport::DeliveryError;

    /// Records every send; addresses in `failing` return an error.
    #[derive(Clone, Default)]
    struct RecordingEmailTransport {
        pub sent: Arc<Mutex<Vec<String>>>,
        pub failing: Vec<String>,
    }

    impl EmailTransport for RecordingEmailTransport {
        async fn send(&self, to: &str, _subject: &str, _html: &str) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(to.to_string());
            if self.failing.iter().any(|f| f == to) {
                return Err(DeliveryError::Email("mailbox unavailable".to_string()));
            }
            Ok(())
        }
    }

    fn job(to: &str) -> EmailJob {
        EmailJob {
            notification_id: Uuid::new_v4(),
            to: to.to_string(),
            subject: "Subject".to_string(),
            html: "<p>body</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_worker_keeps_going_after_failure() {
        let transport = RecordingEmailTransport {
            failing: vec!["broken@example.com".to_string()],
            ..Default::default()
        };
        let sent = transport.sent.clone();

        let (queue, receiver) = EmailQueue::new(8);
        assert!(queue.submit(job("broken@example.com")));
        assert!(queue.submit(job("host@example.com")));
        drop(queue);

        EmailWorker::new(transport).run(receiver).await;

        let sent = sent.lock().unwrap();
        assert_eq!(*sent, vec!["broken@example.com".to_string(), "host@example.com".to_string()]);
    }

    #[test]
    fn test_submit_drops_when_full() {
        let (queue, _receiver) = EmailQueue::new(1);

        assert!(queue.submit(job("a@example.com")));
        assert!(!queue.submit(job("b@example.com")));
    }

    #[test]
    fn test_submit_drops_when_worker_stopped() {
        let (queue, receiver) = EmailQueue::new(4);
        drop(receiver);

        assert!(!queue.submit(job("a@example.com")));
    }
}

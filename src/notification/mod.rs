//! Outgoing email
//!
//! Callers enqueue messages on a bounded channel and return immediately. A
//! background worker delivers them through an [`EmailTransport`], retrying
//! each message a bounded number of times. Delivery failures are logged and
//! never reach the request that produced the message.

mod mailer;
pub mod templates;

pub use mailer::{LogTransport, SmtpMailer};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delivery attempts per message
pub const MAX_ATTEMPTS: u32 = 3;

const QUEUE_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver one message
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Handle for queueing email
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<EmailMessage>,
}

impl Notifier {
    /// Spawn the delivery worker with the default queue size and backoff
    pub fn start(transport: Arc<dyn EmailTransport>) -> (Self, JoinHandle<()>) {
        Self::start_with(transport, QUEUE_CAPACITY, Duration::from_secs(2))
    }

    pub fn start_with(
        transport: Arc<dyn EmailTransport>,
        capacity: usize,
        backoff: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(receiver, transport, backoff));
        (Self { sender }, worker)
    }

    /// Queue a message without waiting. Returns false when it was dropped.
    pub fn enqueue(&self, message: EmailMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::warn!(to = %message.to, subject = %message.subject, "Email queue full, message dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                tracing::error!(to = %message.to, "Email worker stopped, message dropped");
                false
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<EmailMessage>,
    transport: Arc<dyn EmailTransport>,
    backoff: Duration,
) {
    tracing::info!("Email worker started");

    while let Some(message) = receiver.recv().await {
        deliver(transport.as_ref(), &message, backoff).await;
    }

    tracing::info!("Email worker stopped");
}

/// Try a message up to [`MAX_ATTEMPTS`] times with doubling backoff
async fn deliver(transport: &dyn EmailTransport, message: &EmailMessage, backoff: Duration) -> bool {
    let mut delay = backoff;

    for attempt in 1..=MAX_ATTEMPTS {
        match transport.send(message).await {
            Ok(()) => {
                tracing::info!(to = %message.to, subject = %message.subject, attempt, "Email sent");
                return true;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(to = %message.to, attempt, error = %e, "Email delivery failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                tracing::error!(to = %message.to, attempts = attempt, error = %e, "Email delivery gave up");
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails the first `failures` sends, then records messages
    struct FlakyTransport {
        failures: u32,
        calls: AtomicU32,
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl FlakyTransport {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmailTransport for FlakyTransport {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(NotifyError::Delivery("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "client@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_deliver_retries_until_success() {
        let transport = FlakyTransport::new(2);

        assert!(deliver(&transport, &message(), Duration::from_millis(1)).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deliver_gives_up_after_max_attempts() {
        let transport = FlakyTransport::new(10);

        assert!(!deliver(&transport, &message(), Duration::from_millis(1)).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let transport = Arc::new(FlakyTransport::new(0));
        let (notifier, worker) =
            Notifier::start_with(transport.clone(), 8, Duration::from_millis(1));

        assert!(notifier.enqueue(message()));
        assert!(notifier.enqueue(message()));
        drop(notifier);

        worker.await.unwrap();
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_stops_is_dropped() {
        let transport = Arc::new(FlakyTransport::new(0));
        let (notifier, worker) = Notifier::start_with(transport, 1, Duration::from_millis(1));
        worker.abort();
        let _ = worker.await;

        assert!(!notifier.enqueue(message()));
    }
}

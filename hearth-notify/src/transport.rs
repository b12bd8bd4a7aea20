use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::job::NotificationJob;

/// Delivery backend for notification jobs.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, job: &NotificationJob) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("smtp transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("message build error: {0}")]
    Build(String),

    #[error("transport refused: {0}")]
    Refused(String),
}

/// Development transport: writes the message to the log instead of sending.
pub struct LogMailer;

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, job: &NotificationJob) -> Result<(), TransportError> {
        info!(to = %job.to, subject = %job.subject, "mail (log transport):\n{}", job.body);
        Ok(())
    }
}

/// Test transport that records every job it delivers.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<NotificationJob>>,
    refuse_for: Mutex<Option<String>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to this recipient fail, exercising the dispatcher's
    /// skip-and-continue path.
    pub fn refuse_recipient(&self, to: &str) {
        *self.refuse_for.lock().unwrap() = Some(to.to_string());
    }

    pub fn sent(&self) -> Vec<NotificationJob> {
        self.sent.lock().unwrap().clone()
    }

    /// Poll until `count` jobs have been delivered. Delivery runs on the
    /// dispatcher task, so callers cannot observe it synchronously.
    pub async fn wait_for_sends(&self, count: usize) -> Vec<NotificationJob> {
        for _ in 0..200 {
            {
                let sent = self.sent.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {count} notification sends");
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, job: &NotificationJob) -> Result<(), TransportError> {
        if self.refuse_for.lock().unwrap().as_deref() == Some(job.to.as_str()) {
            return Err(TransportError::Refused(job.to.clone()));
        }
        self.sent.lock().unwrap().push(job.clone());
        Ok(())
    }
}

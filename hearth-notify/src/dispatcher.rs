use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::job::NotificationJob;
use crate::transport::MailTransport;

/// Cloneable handle the request path uses to queue mail without waiting on
/// delivery.
#[derive(Clone)]
pub struct Mailer {
    tx: mpsc::UnboundedSender<NotificationJob>,
}

impl Mailer {
    /// Queue a job for delivery. Panics when the dispatcher is gone: the
    /// queue must outlive everything that enqueues, so a send onto a closed
    /// queue is a lifecycle bug, not a runtime condition to absorb.
    pub fn enqueue(&self, job: NotificationJob) {
        if self.tx.send(job).is_err() {
            panic!("notification dispatcher shut down while the app was still enqueueing");
        }
    }
}

/// Owns the single consumer task behind a [`Mailer`].
pub struct Dispatcher;

impl Dispatcher {
    /// Spawn the consumer. Jobs are delivered one at a time in arrival
    /// order; a failed send is logged and skipped. The task exits once
    /// every `Mailer` clone is dropped and the queue is drained.
    pub fn spawn(transport: Arc<dyn MailTransport>) -> (Mailer, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<NotificationJob>();

        let handle = tokio::spawn(async move {
            info!("notification dispatcher started");
            while let Some(job) = rx.recv().await {
                if let Err(e) = transport.send(&job).await {
                    error!(to = %job.to, subject = %job.subject, "notification send failed: {e}");
                }
            }
            info!("notification dispatcher drained, stopping");
        });

        (Mailer { tx }, handle)
    }
}

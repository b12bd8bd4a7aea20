use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;

use crate::job::NotificationJob;
use crate::transport::{MailTransport, TransportError};

/// SMTP relay settings, deserialized from the config layer.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Production transport: STARTTLS relay through the configured host.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, job: &NotificationJob) -> Result<(), TransportError> {
        let message = Message::builder()
            .from(job.from.parse()?)
            .to(job.to.parse()?)
            .subject(job.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(job.body.clone())
            .map_err(|e| TransportError::Build(e.to_string()))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

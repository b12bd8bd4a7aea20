pub mod dispatcher;
pub mod job;
pub mod smtp;
pub mod transport;

pub use dispatcher::{Dispatcher, Mailer};
pub use job::NotificationJob;
pub use smtp::{SmtpConfig, SmtpMailer};
pub use transport::{LogMailer, MailTransport, RecordingMailer, TransportError};

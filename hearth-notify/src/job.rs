use serde::{Deserialize, Serialize};

/// One outbound notification, queued by the booking flow and delivered by
/// the dispatcher some time later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    /// Layout hint for transports that wrap the body in a template.
    /// Plain-text transports ignore it.
    pub template: Option<String>,
}

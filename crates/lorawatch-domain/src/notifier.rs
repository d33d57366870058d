use async_trait::async_trait;

use crate::error::DomainResult;

/// A fully-resolved outgoing alert mail: recipient decided, templates
/// named, context prepared. The reference id links repeated alerts for the
/// same entity into one mail thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MailRequest {
    pub to: String,
    pub subject: String,
    pub ref_id: String,
    pub html_template: String,
    pub text_template: String,
    pub context: serde_json::Value,
}

/// Outgoing mail transport. Infrastructure (lorawatch-notify) implements
/// this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, request: MailRequest) -> DomainResult<()>;
}

/// Outgoing SMS transport.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send a message to the given numbers. Returns the gateway batch id,
    /// or -1 on dry runs.
    async fn send(&self, to: &[String], message: &str, flash: bool) -> DomainResult<i64>;
}

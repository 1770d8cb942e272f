//! Outbound email
//!
//! Account flows build an [`EmailMessage`] with the helpers in [`messages`] and hand it to a
//! [`Mailer`]. The server is wired with [`LogMailer`], which writes each message to the log
//! instead of talking to an SMTP server; tests use the in-memory outbox from
//! `testing::outbox`.

pub mod messages;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Message has no recipients")]
    NoRecipients,

    #[error("Failed to deliver message: {0}")]
    Delivery(String),
}

/// Delivers email messages
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Mailer that logs messages instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        tracing::info!(
            "=== EMAIL (not sent) ===\n\
             From: {}\n\
             To: {}\n\
             Subject: {}\n\
             Body:\n{}\n\
             ========================",
            message.from,
            message.to.join(", "),
            message.subject,
            message.body
        );

        Ok(())
    }
}

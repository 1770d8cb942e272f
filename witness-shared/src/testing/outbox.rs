/// In-memory mail outbox
///
/// Collects every message sent through it so tests can assert on subjects, recipients and
/// bodies.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::mail::{EmailMessage, MailError, Mailer};

#[derive(Debug, Default)]
pub struct Outbox {
    messages: Mutex<Vec<EmailMessage>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<EmailMessage> {
        self.messages.lock().unwrap_or_else(|p| p.into_inner()).last().cloned()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        self.messages.lock().unwrap_or_else(|p| p.into_inner()).push(message);
        Ok(())
    }
}

/// Finds the first line of `body` that starts with `http`
///
/// Account emails put their link on a line of its own.
pub fn find_link(body: &str) -> Option<&str> {
    body.lines().map(str::trim).find(|line| line.starts_with("http"))
}

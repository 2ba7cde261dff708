//! Mock notification gateway.

use crate::error::{AuthError, Result};
use crate::providers::NotificationGateway;
use crate::state::OtpMethod;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One message captured by the mock gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipient address or number.
    pub to: String,
    /// Subject line, emails only.
    pub subject: Option<String>,
    /// Message body.
    pub body: String,
    /// Channel the message went over.
    pub method: OtpMethod,
}

/// In-memory gateway that records messages instead of sending them.
#[derive(Clone, Default)]
pub struct MockGateway {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<AtomicBool>,
}

impl MockGateway {
    /// Creates a gateway with no recorded messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches every send to fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All messages recorded so far.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock, lock cannot be poisoned in practice
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recently recorded message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<SentMessage> {
        self.sent().pop()
    }

    fn record(&self, message: SentMessage) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::SendFailed("mock gateway failure".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| AuthError::SendFailed("mock gateway lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

impl NotificationGateway for MockGateway {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        self.record(SentMessage {
            to: to.to_string(),
            subject: Some(subject.to_string()),
            body: html_body.to_string(),
            method: OtpMethod::Email,
        })
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        self.record(SentMessage {
            to: to.to_string(),
            subject: None,
            body: body.to_string(),
            method: OtpMethod::Sms,
        })
    }
}

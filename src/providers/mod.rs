//! Provider traits and data models for customer lookup and message delivery.
//!
//! Traits use native async methods and are injected generically into
//! [`crate::session::SessionManager`], so tests swap in the in-memory mocks
//! without any dynamic dispatch.

mod gateway;
mod postgres;
mod template;

pub use gateway::{LiveGateway, SmsConfig, SmtpConfig};
pub use postgres::PostgresCustomerDirectory;
pub use template::{TemplateSet, FALLBACK_OTP_EMAIL};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A customer as returned by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Stable customer identifier.
    pub customer_id: String,
    /// Display name, if the directory has one.
    pub name: Option<String>,
    /// Registered email address.
    pub email: Option<String>,
    /// Registered phone number.
    pub phone: Option<String>,
    /// Opaque directory payload carried through to the caller.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CustomerRecord {
    /// Name used when addressing the customer in messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Valued Customer")
    }
}

/// Lookup key for the customer directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactQuery {
    /// Lookup by normalized (lowercased) email address.
    Email(String),
    /// Lookup by formatted phone number.
    Phone(String),
}

/// Read-only directory of known customers.
pub trait CustomerDirectory: Send + Sync {
    /// Finds the customer registered under the given contact, if any.
    ///
    /// Infrastructure failures are technical errors; an unknown contact is
    /// `Ok(None)`, never an error.
    fn find_customer(
        &self,
        query: &ContactQuery,
    ) -> impl std::future::Future<Output = Result<Option<CustomerRecord>>> + Send;
}

/// Outbound delivery channel for verification messages.
pub trait NotificationGateway: Send + Sync {
    /// Sends an HTML email.
    fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Sends a plain-text SMS.
    fn send_sms(
        &self,
        to: &str,
        body: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

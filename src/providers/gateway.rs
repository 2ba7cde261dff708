//! Production notification gateway: SMTP email and HTTP SMS.

use crate::error::{AuthError, Result};
use crate::providers::NotificationGateway;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP delivery configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server address (e.g. "smtp.gmail.com").
    pub server: String,
    /// SMTP server port (usually 587 for STARTTLS).
    pub port: u16,
    /// SMTP authentication username.
    pub username: String,
    /// SMTP authentication password.
    pub password: String,
    /// Sender email address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
}

/// HTTP SMS gateway configuration (Twilio-compatible message API).
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Messages endpoint URL.
    pub api_url: String,
    /// Account identifier used for basic auth.
    pub account_sid: String,
    /// Auth token used for basic auth.
    pub auth_token: String,
    /// Sender phone number.
    pub from_number: String,
}

/// Notification gateway backed by real SMTP and SMS services.
#[derive(Clone)]
pub struct LiveGateway {
    smtp: SmtpConfig,
    credentials: Credentials,
    sms: SmsConfig,
    http: reqwest::Client,
}

impl LiveGateway {
    /// Creates a gateway from SMTP and SMS configuration.
    #[must_use]
    pub fn new(smtp: SmtpConfig, sms: SmsConfig) -> Self {
        let credentials = Credentials::new(smtp.username.clone(), smtp.password.clone());
        Self { smtp, credentials, sms, http: reqwest::Client::new() }
    }

    /// Builds a fresh SMTP transport per send to avoid connection pooling
    /// issues with providers that drop idle connections.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp.server)
            .map_err(|e| AuthError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(self.smtp.port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.smtp.from_name, self.smtp.from_email)
    }
}

impl NotificationGateway for LiveGateway {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| AuthError::SendFailed(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AuthError::SendFailed(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AuthError::SendFailed(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        // The SMTP transport is synchronous.
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AuthError::SendFailed(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| AuthError::SendFailed(format!("Email task failed: {e}")))?
        .map(|_| ())
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        let response = self
            .http
            .post(&self.sms.api_url)
            .basic_auth(&self.sms.account_sid, Some(&self.sms.auth_token))
            .form(&[("To", to), ("From", self.sms.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("SMS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::SendFailed(format!(
                "SMS gateway returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

//! One-time-passcode lifecycle: generate, send, verify, resend.

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::providers::{CustomerRecord, NotificationGateway, TemplateSet};
use crate::state::{AuthKey, OtpMethod, OtpRecord};
use crate::store::TieredStore;
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use rand::Rng;
use tracing::{debug, info};

/// Name of the email template rendered for OTP delivery.
const OTP_EMAIL_TEMPLATE: &str = "otp_email";

/// A freshly issued code and the handle to its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedOtp {
    /// Handle linking the caller's session to the record.
    pub auth_key: AuthKey,
    /// The code, also dispatched to the contact.
    pub code: String,
    /// Minutes until the code expires.
    pub expires_in_minutes: i64,
}

/// Snapshot returned on successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct OtpOutcome {
    /// Contact the code was sent to.
    pub contact: String,
    /// Channel the code was sent over.
    pub method: OtpMethod,
    /// Customer the code authenticated.
    pub customer: CustomerRecord,
}

/// Issues, verifies and resends one-time codes over a [`TieredStore`].
#[derive(Clone)]
pub struct OtpManager<G: NotificationGateway> {
    store: TieredStore,
    gateway: G,
    config: AuthConfig,
    templates: TemplateSet,
}

impl<G: NotificationGateway> OtpManager<G> {
    /// Creates a manager over the given store and gateway.
    #[must_use]
    pub fn new(store: TieredStore, gateway: G, config: AuthConfig, templates: TemplateSet) -> Self {
        Self { store, gateway, config, templates }
    }

    fn record_key(auth_key: AuthKey) -> String {
        format!("auth_otp:{auth_key}")
    }

    fn random_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.config.otp_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// Physical TTL for a record whose code expires at `expires_at`.
    ///
    /// The record outlives the code by one session-inactivity period so a
    /// late verify reports `OtpExpired` rather than a vanished session.
    fn record_ttl(&self, expires_at: chrono::DateTime<Utc>) -> chrono::Duration {
        (expires_at - Utc::now()) + self.config.session_timeout
    }

    /// Generates a fresh code under a fresh [`AuthKey`] and persists it.
    ///
    /// The record carries the contact, method and customer snapshot so
    /// verification needs no second directory lookup.
    pub async fn generate(
        &self,
        contact: &str,
        method: OtpMethod,
        customer: &CustomerRecord,
    ) -> Result<IssuedOtp> {
        let auth_key = AuthKey::new();
        let code = self.random_code();
        let now = Utc::now();

        let record = OtpRecord {
            code: code.clone(),
            contact: contact.to_string(),
            method,
            customer: customer.clone(),
            attempts: 0,
            created_at: now,
            expires_at: now + self.config.otp_ttl,
        };

        self.store
            .put_json(&Self::record_key(auth_key), &record, self.record_ttl(record.expires_at))
            .await?;

        debug!(%auth_key, %method, "issued one-time code");

        Ok(IssuedOtp {
            auth_key,
            code,
            expires_in_minutes: self.config.otp_ttl.num_minutes(),
        })
    }

    /// Dispatches a code to the contact over the chosen channel.
    pub async fn send(
        &self,
        contact: &str,
        code: &str,
        method: OtpMethod,
        customer_name: &str,
    ) -> Result<()> {
        let expiry_minutes = self.config.otp_ttl.num_minutes().to_string();
        match method {
            OtpMethod::Email => {
                let body = self.templates.render(
                    OTP_EMAIL_TEMPLATE,
                    &[
                        ("customer_name", customer_name),
                        ("otp", code),
                        ("expiry_minutes", &expiry_minutes),
                    ],
                );
                self.gateway
                    .send_email(contact, "Your Verification Code", &body)
                    .await
            }
            OtpMethod::Sms => {
                let body = format!(
                    "Your verification code is: {code}. This code expires in \
                     {expiry_minutes} minutes. Do not share this code with anyone."
                );
                self.gateway.send_sms(contact, &body).await
            }
        }
    }

    /// Verifies a provided code against the record under `auth_key`.
    ///
    /// A missing record (expired by TTL, already consumed, or never issued)
    /// is [`AuthError::InvalidSession`]. An expired or attempt-exhausted
    /// record is deleted before the error returns, so it can never verify
    /// later. A mismatch persists the incremented attempt count with the
    /// record's remaining TTL; a match consumes the record.
    pub async fn verify(&self, auth_key: AuthKey, provided: &str) -> Result<OtpOutcome> {
        let key = Self::record_key(auth_key);

        let Some(mut record) = self.store.get_json::<OtpRecord>(&key).await? else {
            return Err(AuthError::InvalidSession);
        };

        if Utc::now() >= record.expires_at {
            self.store.delete(&key).await;
            return Err(AuthError::OtpExpired);
        }

        if record.attempts >= self.config.max_otp_attempts {
            self.store.delete(&key).await;
            return Err(AuthError::MaxAttemptsExceeded { retry_after_minutes: None });
        }

        if !constant_time_eq(record.code.as_bytes(), provided.as_bytes()) {
            // The count may reach the maximum here; the record stays so the
            // next attempt, correct or not, hits the exhaustion check above.
            record.attempts += 1;
            let remaining_attempts =
                self.config.max_otp_attempts.saturating_sub(record.attempts);
            self.store
                .put_json(&key, &record, self.record_ttl(record.expires_at))
                .await?;
            return Err(AuthError::InvalidOtp { remaining_attempts });
        }

        // Consumed: a correct code verifies exactly once.
        self.store.delete(&key).await;
        info!(%auth_key, "one-time code verified");

        Ok(OtpOutcome {
            contact: record.contact,
            method: record.method,
            customer: record.customer,
        })
    }

    /// Replaces the code under `auth_key` and re-dispatches it.
    ///
    /// The new code gets a full fresh TTL and a reset attempt counter; the
    /// superseded code can never verify again.
    pub async fn resend(&self, auth_key: AuthKey) -> Result<IssuedOtp> {
        let key = Self::record_key(auth_key);

        let Some(mut record) = self.store.get_json::<OtpRecord>(&key).await? else {
            return Err(AuthError::InvalidSession);
        };

        let code = self.random_code();
        let now = Utc::now();
        record.code = code.clone();
        record.attempts = 0;
        record.created_at = now;
        record.expires_at = now + self.config.otp_ttl;

        self.store
            .put_json(&key, &record, self.record_ttl(record.expires_at))
            .await?;
        self.send(&record.contact, &code, record.method, record.customer.display_name())
            .await?;

        info!(%auth_key, "one-time code rotated and resent");

        Ok(IssuedOtp {
            auth_key,
            code,
            expires_in_minutes: self.config.otp_ttl.num_minutes(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::mocks::MockGateway;
    use crate::store::{MemoryTier, Tier, TieredStore};

    fn manager(config: AuthConfig) -> OtpManager<MockGateway> {
        let store =
            TieredStore::new(vec![Tier::Memory(MemoryTier::new())], RetryPolicy::none());
        OtpManager::new(store, MockGateway::new(), config, TemplateSet::new())
    }

    fn customer() -> CustomerRecord {
        CustomerRecord {
            customer_id: "cust-1".to_string(),
            name: Some("Anna Keller".to_string()),
            email: Some("anna@example.com".to_string()),
            phone: None,
            data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn generated_code_has_configured_length() {
        let otp = manager(AuthConfig::default().with_otp_length(8));
        let issued = otp
            .generate("anna@example.com", OtpMethod::Email, &customer())
            .await
            .unwrap();
        assert_eq!(issued.code.len(), 8);
        assert!(issued.code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn correct_code_verifies_exactly_once() {
        let otp = manager(AuthConfig::default());
        let issued = otp
            .generate("anna@example.com", OtpMethod::Email, &customer())
            .await
            .unwrap();

        let outcome = otp.verify(issued.auth_key, &issued.code).await.unwrap();
        assert_eq!(outcome.contact, "anna@example.com");
        assert_eq!(outcome.customer.customer_id, "cust-1");

        // Replay of the consumed code.
        assert_eq!(
            otp.verify(issued.auth_key, &issued.code).await,
            Err(AuthError::InvalidSession)
        );
    }

    #[tokio::test]
    async fn wrong_code_counts_down_then_invalidates() {
        let otp = manager(AuthConfig::default().with_max_otp_attempts(3));
        let issued = otp
            .generate("anna@example.com", OtpMethod::Email, &customer())
            .await
            .unwrap();
        let wrong = if issued.code == "000000" { "000001" } else { "000000" };

        assert_eq!(
            otp.verify(issued.auth_key, wrong).await,
            Err(AuthError::InvalidOtp { remaining_attempts: 2 })
        );
        assert_eq!(
            otp.verify(issued.auth_key, wrong).await,
            Err(AuthError::InvalidOtp { remaining_attempts: 1 })
        );
        assert_eq!(
            otp.verify(issued.auth_key, wrong).await,
            Err(AuthError::InvalidOtp { remaining_attempts: 0 })
        );

        // Attempts are exhausted; even the correct code is refused, and
        // the record is deleted in the process.
        assert_eq!(
            otp.verify(issued.auth_key, &issued.code).await,
            Err(AuthError::MaxAttemptsExceeded { retry_after_minutes: None })
        );
        assert_eq!(
            otp.verify(issued.auth_key, &issued.code).await,
            Err(AuthError::InvalidSession)
        );
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_removed() {
        let otp = manager(AuthConfig::default().with_otp_ttl(chrono::Duration::milliseconds(20)));
        let issued = otp
            .generate("anna@example.com", OtpMethod::Email, &customer())
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // The code is past expiry but the record is still readable, so the
        // failure is precise. The record is deleted with it.
        assert_eq!(
            otp.verify(issued.auth_key, &issued.code).await,
            Err(AuthError::OtpExpired)
        );
        assert_eq!(
            otp.verify(issued.auth_key, &issued.code).await,
            Err(AuthError::InvalidSession)
        );
    }

    #[tokio::test]
    async fn resend_rotates_the_code_and_resets_attempts() {
        let otp = manager(AuthConfig::default());
        let issued = otp
            .generate("anna@example.com", OtpMethod::Email, &customer())
            .await
            .unwrap();
        let wrong = if issued.code == "000000" { "000001" } else { "000000" };
        let _ = otp.verify(issued.auth_key, wrong).await;

        let reissued = otp.resend(issued.auth_key).await.unwrap();
        assert_eq!(reissued.auth_key, issued.auth_key);

        // Old code is dead once rotation happened.
        if reissued.code != issued.code {
            assert!(matches!(
                otp.verify(issued.auth_key, &issued.code).await,
                Err(AuthError::InvalidOtp { remaining_attempts: 2 })
            ));
        }

        let outcome = otp.verify(issued.auth_key, &reissued.code).await.unwrap();
        assert_eq!(outcome.method, OtpMethod::Email);
    }

    #[tokio::test]
    async fn sms_dispatch_includes_code_and_expiry() {
        let store =
            TieredStore::new(vec![Tier::Memory(MemoryTier::new())], RetryPolicy::none());
        let gateway = MockGateway::new();
        let otp = OtpManager::new(
            store,
            gateway.clone(),
            AuthConfig::default(),
            TemplateSet::new(),
        );

        otp.send("+15551234567", "123456", OtpMethod::Sms, "Anna Keller")
            .await
            .unwrap();

        let message = gateway.last_message().unwrap();
        assert_eq!(message.to, "+15551234567");
        assert!(message.body.contains("123456"));
        assert!(message.body.contains("3 minutes"));
        assert!(message.body.contains("Do not share"));
    }

    #[tokio::test]
    async fn email_dispatch_renders_the_fallback_template() {
        let store =
            TieredStore::new(vec![Tier::Memory(MemoryTier::new())], RetryPolicy::none());
        let gateway = MockGateway::new();
        let otp = OtpManager::new(
            store,
            gateway.clone(),
            AuthConfig::default(),
            TemplateSet::new(),
        );

        otp.send("anna@example.com", "654321", OtpMethod::Email, "Anna Keller")
            .await
            .unwrap();

        let message = gateway.last_message().unwrap();
        assert_eq!(message.subject.as_deref(), Some("Your Verification Code"));
        assert!(message.body.contains("654321"));
        assert!(message.body.contains("Dear Anna Keller"));
    }
}

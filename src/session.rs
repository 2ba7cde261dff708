//! The authentication session state machine.
//!
//! [`SessionManager`] is the crate's exposed contract. It owns the tiered
//! store, a [`ContactVerifier`] and an [`OtpManager`], and drives sessions
//! through `contact_verification → otp_verification → authenticated`,
//! with `locked` and `expired` as terminal detours. Providers are injected
//! generically so tests run entirely on the in-memory mocks.

use crate::config::AuthConfig;
use crate::contact::{
    format_phone, is_valid_email, is_valid_phone, mask_email, mask_phone, validate_input,
    ContactVerifier,
};
use crate::error::{AuthError, Result};
use crate::otp::OtpManager;
use crate::providers::{CustomerDirectory, NotificationGateway, TemplateSet};
use crate::response::{
    Authenticated, ContactVerified, OtpInitiated, OtpResent, SessionCreated, SessionStatus,
};
use crate::retry;
use crate::state::{AuthSession, OtpMethod, SessionId, SessionState};
use crate::store::TieredStore;
use chrono::Utc;
use tracing::info;

/// Drives authentication sessions end to end.
#[derive(Clone)]
pub struct SessionManager<D: CustomerDirectory, G: NotificationGateway> {
    config: AuthConfig,
    store: TieredStore,
    verifier: ContactVerifier<D>,
    otp: OtpManager<G>,
}

impl<D: CustomerDirectory, G: NotificationGateway> SessionManager<D, G> {
    /// Creates a manager with the built-in fallback email template.
    #[must_use]
    pub fn new(config: AuthConfig, store: TieredStore, directory: D, gateway: G) -> Self {
        Self::with_templates(config, store, directory, gateway, TemplateSet::new())
    }

    /// Creates a manager with a custom template set.
    #[must_use]
    pub fn with_templates(
        config: AuthConfig,
        store: TieredStore,
        directory: D,
        gateway: G,
        templates: TemplateSet,
    ) -> Self {
        let verifier = ContactVerifier::new(
            directory,
            config.retry,
            config.default_country_code.clone(),
        );
        let otp = OtpManager::new(store.clone(), gateway, config.clone(), templates);
        Self { config, store, verifier, otp }
    }

    fn session_key(session_id: SessionId) -> String {
        format!("auth_session:{session_id}")
    }

    async fn persist(&self, session: &AuthSession) -> Result<()> {
        // Locked sessions outlive the window by one inactivity period so a
        // caller returning after the lockout can be unlocked in place.
        let ttl = if session.state == SessionState::Locked {
            self.config.lockout_window + self.config.session_timeout
        } else {
            self.config.session_timeout
        };
        self.store
            .put_json(&Self::session_key(session.session_id), session, ttl)
            .await
    }

    /// Loads a session and lazily applies expiry and lockout-window rules.
    ///
    /// `missing` is the error for an absent record: `InvalidSession` for
    /// mutating operations, `SessionNotFound` for status lookups.
    async fn load(&self, session_id: SessionId, missing: AuthError) -> Result<AuthSession> {
        let key = Self::session_key(session_id);

        let Some(mut session) = self.store.get_json::<AuthSession>(&key).await? else {
            return Err(missing);
        };

        if session.state == SessionState::Locked {
            let locked_at = session.locked_at.unwrap_or(session.last_activity);
            if Utc::now() - locked_at >= self.config.lockout_window {
                // Lockout served; the caller starts contact verification over.
                session.state = SessionState::ContactVerification;
                session.contact_attempts = 0;
                session.locked_at = None;
                session.last_activity = Utc::now();
                self.persist(&session).await?;
                info!(%session_id, "lockout window elapsed, session unlocked");
            }
            return Ok(session);
        }

        if Utc::now() - session.last_activity >= self.config.session_timeout {
            self.store.delete(&key).await;
            return Err(AuthError::SessionExpired);
        }

        Ok(session)
    }

    fn ensure_not_locked(&self, session: &AuthSession) -> Result<()> {
        if session.state != SessionState::Locked {
            return Ok(());
        }
        let locked_at = session.locked_at.unwrap_or(session.last_activity);
        let remaining = self.config.lockout_window - (Utc::now() - locked_at);
        Err(AuthError::SessionLocked {
            retry_after_minutes: remaining.num_minutes().max(1),
        })
    }

    fn ensure_state(session: &AuthSession, expected: SessionState) -> Result<()> {
        if session.state == expected {
            Ok(())
        } else {
            Err(AuthError::InvalidState { expected, actual: session.state })
        }
    }

    /// Consumes one contact-verification attempt and persists the session,
    /// locking it when the limit is reached.
    ///
    /// Returns the error to surface: `make_error(remaining)` while attempts
    /// remain, `MaxAttemptsExceeded` with the lockout wait once they don't.
    async fn fail_contact_attempt(
        &self,
        session: &mut AuthSession,
        make_error: impl FnOnce(u32) -> AuthError,
    ) -> AuthError {
        session.contact_attempts += 1;
        session.last_activity = Utc::now();

        if session.contact_attempts >= self.config.max_contact_attempts {
            session.state = SessionState::Locked;
            session.locked_at = Some(Utc::now());
            info!(session_id = %session.session_id, "session locked after repeated failures");
            if let Err(e) = self.persist(session).await {
                return e;
            }
            return AuthError::MaxAttemptsExceeded {
                retry_after_minutes: Some(self.config.lockout_window.num_minutes()),
            };
        }

        let remaining = self.config.max_contact_attempts - session.contact_attempts;
        if let Err(e) = self.persist(session).await {
            return e;
        }
        make_error(remaining)
    }

    /// Creates a new session in the contact-verification state.
    pub async fn create_session(
        &self,
        ip_address: Option<std::net::IpAddr>,
        user_agent: Option<String>,
    ) -> Result<SessionCreated> {
        let session = AuthSession::new(ip_address, user_agent);
        self.persist(&session).await?;
        info!(session_id = %session.session_id, "session created");

        Ok(SessionCreated {
            session_id: session.session_id,
            state: session.state,
            message: "Session created. Please verify your contact details.".to_string(),
            max_attempts: self.config.max_contact_attempts,
            expires_in_minutes: self.config.session_timeout.num_minutes(),
        })
    }

    /// Verifies that the supplied contact belongs to a known customer.
    ///
    /// Input-shape problems (both or neither contact, method disagreement)
    /// consume no attempt. Format failures and unknown contacts each
    /// consume one; the session locks at the configured limit. Directory
    /// outages surface as retry-allowed service errors without touching
    /// the counter.
    pub async fn verify_contact(
        &self,
        session_id: SessionId,
        email: Option<&str>,
        phone: Option<&str>,
        preferred_method: Option<OtpMethod>,
    ) -> Result<ContactVerified> {
        let mut session = self.load(session_id, AuthError::InvalidSession).await?;
        self.ensure_not_locked(&session)?;
        Self::ensure_state(&session, SessionState::ContactVerification)?;

        let method = validate_input(email, phone, preferred_method)?;

        if let Some(email) = email {
            if !is_valid_email(email) {
                return Err(self
                    .fail_contact_attempt(&mut session, |remaining_attempts| {
                        AuthError::InvalidEmailFormat { remaining_attempts }
                    })
                    .await);
            }
        }
        if let Some(phone) = phone {
            if !is_valid_phone(phone) {
                return Err(self
                    .fail_contact_attempt(&mut session, |remaining_attempts| {
                        AuthError::InvalidPhoneFormat { remaining_attempts }
                    })
                    .await);
            }
        }

        let Some(customer) = self.verifier.find_customer(email, phone).await? else {
            return Err(self
                .fail_contact_attempt(&mut session, |remaining_attempts| {
                    AuthError::CustomerNotFound { remaining_attempts }
                })
                .await);
        };

        let now = Utc::now();
        session.contact_verified = true;
        session.contact_verified_at = Some(now);
        session.last_activity = now;
        session.state = SessionState::OtpVerification;
        session.otp_method = Some(method);
        session.contact_email = email.map(str::to_lowercase);
        session.contact_phone =
            phone.map(|p| format_phone(p, &self.config.default_country_code));
        session.customer = Some(customer.clone());
        self.persist(&session).await?;

        info!(%session_id, %method, "contact verified");

        Ok(ContactVerified {
            message: "Contact verified. Please request a verification code.".to_string(),
            state: session.state,
            customer_name: customer.display_name().to_string(),
            otp_method: method,
            masked_email: session.contact_email.as_deref().map(mask_email),
            masked_phone: session.contact_phone.as_deref().map(mask_phone),
        })
    }

    /// Issues a one-time code and dispatches it to the verified contact.
    ///
    /// Generation and dispatch run as one retried unit; each attempt issues
    /// a fresh key and code, so a half-delivered attempt leaves nothing
    /// verifiable behind. A repeated call supersedes the outstanding code.
    pub async fn initiate_otp(&self, session_id: SessionId) -> Result<OtpInitiated> {
        let mut session = self.load(session_id, AuthError::InvalidSession).await?;
        self.ensure_not_locked(&session)?;
        Self::ensure_state(&session, SessionState::OtpVerification)?;

        if !session.contact_verified {
            return Err(AuthError::ContactNotVerified);
        }
        let (Some(method), Some(customer)) = (session.otp_method, session.customer.clone())
        else {
            return Err(AuthError::ContactNotVerified);
        };

        let contact = match method {
            OtpMethod::Email => session.contact_email.clone(),
            OtpMethod::Sms => session.contact_phone.clone(),
        }
        .ok_or(AuthError::ContactNotVerified)?;

        let issued = retry::execute(&self.config.retry, || async {
            let issued = self.otp.generate(&contact, method, &customer).await?;
            self.otp
                .send(&contact, &issued.code, method, customer.display_name())
                .await?;
            Ok(issued)
        })
        .await?;

        let now = Utc::now();
        session.otp_auth_key = Some(issued.auth_key);
        session.otp_initiated_at = Some(now);
        session.last_activity = now;
        self.persist(&session).await?;

        let masked_contact = match method {
            OtpMethod::Email => mask_email(&contact),
            OtpMethod::Sms => mask_phone(&contact),
        };
        info!(%session_id, %method, "verification code dispatched");

        Ok(OtpInitiated {
            message: format!("Verification code sent to {masked_contact}."),
            state: session.state,
            masked_contact,
            otp_method: method,
            expires_in_minutes: issued.expires_in_minutes,
        })
    }

    /// Verifies a one-time code and completes authentication.
    ///
    /// Wrong codes count against the code's own attempt limit; a storage
    /// outage surfaces retry-allowed without consuming an attempt. Expired
    /// or exhausted codes leave the session in `otp_verification` so the
    /// caller can request a fresh code.
    pub async fn verify_otp(&self, session_id: SessionId, code: &str) -> Result<Authenticated> {
        let mut session = self.load(session_id, AuthError::InvalidSession).await?;
        self.ensure_not_locked(&session)?;
        Self::ensure_state(&session, SessionState::OtpVerification)?;

        let auth_key = session.otp_auth_key.ok_or(AuthError::OtpNotInitiated)?;

        match retry::execute(&self.config.retry, || self.otp.verify(auth_key, code)).await {
            Ok(outcome) => {
                let now = Utc::now();
                session.state = SessionState::Authenticated;
                session.authenticated = true;
                session.authenticated_at = Some(now);
                session.last_activity = now;
                session.otp_auth_key = None;
                self.persist(&session).await?;
                info!(%session_id, "session authenticated");

                Ok(Authenticated {
                    message: "Authentication successful.".to_string(),
                    state: session.state,
                    session_id,
                    customer: outcome.customer,
                })
            }
            Err(e) => {
                if !e.is_technical() && e != AuthError::ServiceUnavailable {
                    session.last_activity = Utc::now();
                    self.persist(&session).await?;
                }
                Err(e)
            }
        }
    }

    /// Replaces the outstanding code and re-dispatches it.
    pub async fn resend_otp(&self, session_id: SessionId) -> Result<OtpResent> {
        let mut session = self.load(session_id, AuthError::InvalidSession).await?;
        self.ensure_not_locked(&session)?;
        Self::ensure_state(&session, SessionState::OtpVerification)?;

        let auth_key = session.otp_auth_key.ok_or(AuthError::OtpNotInitiated)?;

        let reissued =
            retry::execute(&self.config.retry, || self.otp.resend(auth_key)).await?;

        let now = Utc::now();
        session.otp_initiated_at = Some(now);
        session.last_activity = now;
        self.persist(&session).await?;
        info!(%session_id, "verification code resent");

        Ok(OtpResent {
            message: "A new verification code has been sent.".to_string(),
            expires_in_minutes: reissued.expires_in_minutes,
        })
    }

    /// Returns a point-in-time snapshot of the session.
    ///
    /// Read-only apart from the lazy expiry and unlock rules; it does not
    /// refresh `last_activity`.
    pub async fn session_status(&self, session_id: SessionId) -> Result<SessionStatus> {
        let session = self.load(session_id, AuthError::SessionNotFound).await?;

        Ok(SessionStatus {
            session_id: session.session_id,
            state: session.state,
            contact_verified: session.contact_verified,
            authenticated: session.authenticated,
            contact_attempts: session.contact_attempts,
            max_contact_attempts: self.config.max_contact_attempts,
            remaining_contact_attempts: self
                .config
                .max_contact_attempts
                .saturating_sub(session.contact_attempts),
            otp_method: session.otp_method,
            created_at: session.created_at,
            last_activity: session.last_activity,
            customer: session.customer,
        })
    }
}

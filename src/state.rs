//! Session and OTP state types.

use crate::error::AuthError;
use crate::providers::CustomerRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle linking a session to its outstanding OTP record.
///
/// Rotated on every issue so a superseded code can never verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthKey(pub Uuid);

impl AuthKey {
    /// Generates a new random auth key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuthKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of an authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the caller to prove a known contact.
    ContactVerification,
    /// Contact verified; waiting for a correct one-time code.
    OtpVerification,
    /// Fully authenticated.
    Authenticated,
    /// Locked after too many failed contact attempts.
    Locked,
    /// Expired by inactivity.
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ContactVerification => "contact_verification",
            Self::OtpVerification => "otp_verification",
            Self::Authenticated => "authenticated",
            Self::Locked => "locked",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Delivery channel for one-time codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpMethod {
    /// Deliver via email.
    Email,
    /// Deliver via SMS.
    Sms,
}

impl OtpMethod {
    /// Lowercase wire name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for OtpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OtpMethod {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            _ => Err(AuthError::InvalidOtpMethod),
        }
    }
}

/// Persisted state of one authentication session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Session identifier.
    pub session_id: SessionId,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Failed contact-verification attempts so far.
    pub contact_attempts: u32,
    /// Client IP captured at creation, if known.
    pub ip_address: Option<std::net::IpAddr>,
    /// Client user agent captured at creation, if known.
    pub user_agent: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last successful operation on this session.
    pub last_activity: DateTime<Utc>,
    /// Whether contact verification has completed.
    pub contact_verified: bool,
    /// Whether the session reached full authentication.
    pub authenticated: bool,
    /// Matched customer record, set once contact is verified.
    pub customer: Option<CustomerRecord>,
    /// Verified email address, if verification used email.
    pub contact_email: Option<String>,
    /// Verified phone number, if verification used SMS.
    pub contact_phone: Option<String>,
    /// Chosen OTP delivery method, set once contact is verified.
    pub otp_method: Option<OtpMethod>,
    /// Handle to the outstanding OTP record, if one was issued.
    pub otp_auth_key: Option<AuthKey>,
    /// When the session was locked, while locked.
    pub locked_at: Option<DateTime<Utc>>,
    /// When contact verification completed.
    pub contact_verified_at: Option<DateTime<Utc>>,
    /// When full authentication completed.
    pub authenticated_at: Option<DateTime<Utc>>,
    /// When the outstanding OTP was issued.
    pub otp_initiated_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Creates a fresh session in the contact-verification state.
    #[must_use]
    pub fn new(ip_address: Option<std::net::IpAddr>, user_agent: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            state: SessionState::ContactVerification,
            contact_attempts: 0,
            ip_address,
            user_agent,
            created_at: now,
            last_activity: now,
            contact_verified: false,
            authenticated: false,
            customer: None,
            contact_email: None,
            contact_phone: None,
            otp_method: None,
            otp_auth_key: None,
            locked_at: None,
            contact_verified_at: None,
            authenticated_at: None,
            otp_initiated_at: None,
        }
    }
}

/// Persisted state of one issued one-time code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// The numeric code, stored as a string to preserve leading zeros.
    pub code: String,
    /// Contact the code was sent to.
    pub contact: String,
    /// Channel the code was sent over.
    pub method: OtpMethod,
    /// Customer the code authenticates.
    pub customer: CustomerRecord,
    /// Wrong-code attempts consumed so far.
    pub attempts: u32,
    /// Issue timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_at_contact_verification() {
        let session = AuthSession::new(None, Some("test-agent".to_string()));
        assert_eq!(session.state, SessionState::ContactVerification);
        assert_eq!(session.contact_attempts, 0);
        assert!(!session.contact_verified);
        assert!(!session.authenticated);
        assert!(session.customer.is_none());
        assert_eq!(session.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_ne!(AuthKey::new(), AuthKey::new());
    }

    #[test]
    fn otp_method_parses_case_insensitively() {
        assert_eq!("email".parse::<OtpMethod>(), Ok(OtpMethod::Email));
        assert_eq!("SMS".parse::<OtpMethod>(), Ok(OtpMethod::Sms));
        assert_eq!(
            "carrier_pigeon".parse::<OtpMethod>(),
            Err(AuthError::InvalidOtpMethod)
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn session_round_trips_through_json() {
        let session = AuthSession::new(None, None);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["state"], "contact_verification");
        let back: AuthSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn state_serializes_snake_case() {
        let json = serde_json::to_value(SessionState::OtpVerification).unwrap();
        assert_eq!(json, "otp_verification");
    }
}

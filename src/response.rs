//! Typed response payloads and the uniform error body.
//!
//! Success payloads are plain serializable structs; [`ErrorBody`] is the
//! single error shape, built from an [`AuthError`] so the error code set
//! stays closed. [`to_envelope`] renders either side as the JSON envelope
//! with a `success` flag for callers that speak JSON.

use crate::error::AuthError;
use crate::providers::CustomerRecord;
use crate::state::{OtpMethod, SessionId, SessionState};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Payload for a freshly created session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionCreated {
    /// The new session's identifier.
    pub session_id: SessionId,
    /// Initial state (`contact_verification`).
    pub state: SessionState,
    /// Human-readable summary.
    pub message: String,
    /// Contact-verification attempts allowed before lockout.
    pub max_attempts: u32,
    /// Minutes of inactivity before the session expires.
    pub expires_in_minutes: i64,
}

/// Payload for successful contact verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactVerified {
    /// Human-readable summary.
    pub message: String,
    /// New state (`otp_verification`).
    pub state: SessionState,
    /// Matched customer's display name.
    pub customer_name: String,
    /// Delivery method chosen for the upcoming code.
    pub otp_method: OtpMethod,
    /// Masked email hint, when verification used email.
    pub masked_email: Option<String>,
    /// Masked phone hint, when verification used SMS.
    pub masked_phone: Option<String>,
}

/// Payload for a dispatched one-time code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpInitiated {
    /// Human-readable summary.
    pub message: String,
    /// Current state (`otp_verification`).
    pub state: SessionState,
    /// Masked contact the code was sent to.
    pub masked_contact: String,
    /// Delivery method used.
    pub otp_method: OtpMethod,
    /// Minutes until the code expires.
    pub expires_in_minutes: i64,
}

/// Payload for completed authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authenticated {
    /// Human-readable summary.
    pub message: String,
    /// New state (`authenticated`).
    pub state: SessionState,
    /// The authenticated session's identifier.
    pub session_id: SessionId,
    /// The authenticated customer.
    pub customer: CustomerRecord,
}

/// Payload for a resent one-time code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpResent {
    /// Human-readable summary.
    pub message: String,
    /// Minutes until the fresh code expires.
    pub expires_in_minutes: i64,
}

/// Point-in-time session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    /// Session identifier.
    pub session_id: SessionId,
    /// Current state.
    pub state: SessionState,
    /// Whether contact verification has completed.
    pub contact_verified: bool,
    /// Whether the session reached full authentication.
    pub authenticated: bool,
    /// Failed contact-verification attempts so far.
    pub contact_attempts: u32,
    /// Configured contact-verification attempt limit.
    pub max_contact_attempts: u32,
    /// Contact-verification attempts left.
    pub remaining_contact_attempts: u32,
    /// Chosen OTP delivery method, once contact is verified.
    pub otp_method: Option<OtpMethod>,
    /// Session creation time.
    pub created_at: DateTime<Utc>,
    /// Last successful operation on the session.
    pub last_activity: DateTime<Utc>,
    /// Matched customer, once contact is verified.
    pub customer: Option<CustomerRecord>,
}

/// The single error shape exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message, safe to show the caller.
    pub message: String,
    /// Stable error code from the closed set.
    pub error_code: &'static str,
    /// Whether the caller may retry the same request.
    pub retry_allowed: bool,
    /// Present and `true` when the failure was infrastructure, not input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_error: Option<bool>,
    /// Attempts left, on recoverable user errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
    /// Minutes to wait, on lockout errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_minutes: Option<i64>,
    /// Set to `"restart"` when the caller must begin a new session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_required: Option<&'static str>,
}

impl From<&AuthError> for ErrorBody {
    fn from(error: &AuthError) -> Self {
        let action_required = matches!(
            error,
            AuthError::InvalidSession | AuthError::SessionExpired
        )
        .then_some("restart");

        Self {
            success: false,
            message: error.to_string(),
            error_code: error.code(),
            retry_allowed: error.retry_allowed(),
            technical_error: error.is_technical().then_some(true),
            remaining_attempts: error.remaining_attempts(),
            retry_after_minutes: error.retry_after_minutes(),
            action_required,
        }
    }
}

/// Renders a result as the uniform JSON envelope.
///
/// Success payloads gain `"success": true`; errors render their
/// [`ErrorBody`]. Serialization of the crate's own payload types cannot
/// fail, so a serializer error degrades to a service-unavailable body
/// rather than panicking.
#[must_use]
pub fn to_envelope<T: Serialize>(result: &Result<T, AuthError>) -> serde_json::Value {
    match result {
        Ok(payload) => match serde_json::to_value(payload) {
            Ok(mut value) => {
                if let Some(object) = value.as_object_mut() {
                    object.insert("success".to_string(), serde_json::Value::Bool(true));
                }
                value
            }
            Err(_) => envelope_for_error(&AuthError::ServiceUnavailable),
        },
        Err(error) => envelope_for_error(error),
    }
}

fn envelope_for_error(error: &AuthError) -> serde_json::Value {
    serde_json::to_value(ErrorBody::from(error))
        .unwrap_or_else(|_| serde_json::json!({"success": false}))
}

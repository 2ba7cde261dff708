//! Error types for the authentication subsystem.

use crate::state::SessionState;
use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the authentication subsystem.
///
/// Errors split into two families. *User errors* (bad input, wrong state,
/// wrong code, exhausted attempts, missing session) are returned immediately
/// and never retried. *Technical errors* (storage, network, timeout, send
/// failure) are retried by [`crate::retry::execute`] and, once attempts are
/// exhausted, surfaced as the uniform [`AuthError::ServiceUnavailable`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════

    /// Caller provided no contact, or both email and phone at once.
    #[error("{0}")]
    InvalidInput(String),

    /// Email did not pass format validation.
    #[error("Invalid email format. Please provide a valid email address.")]
    InvalidEmailFormat {
        /// Contact-verification attempts left before lockout.
        remaining_attempts: u32,
    },

    /// Phone number did not pass format validation.
    #[error("Invalid phone number format. Please provide a valid phone number.")]
    InvalidPhoneFormat {
        /// Contact-verification attempts left before lockout.
        remaining_attempts: u32,
    },

    /// Requested OTP delivery method is not one of `email`/`sms`.
    #[error("Invalid OTP method. Choose 'email' or 'sms'.")]
    InvalidOtpMethod,

    /// Email delivery requested without an email address.
    #[error("Email address required for email OTP.")]
    EmailRequired,

    /// SMS delivery requested without a phone number.
    #[error("Phone number required for SMS OTP.")]
    PhoneRequired,

    /// No customer record matched the provided contact details.
    #[error("No account found with the provided contact details. {remaining_attempts} attempts remaining.")]
    CustomerNotFound {
        /// Contact-verification attempts left before lockout.
        remaining_attempts: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════

    /// Session is missing from the store or no longer usable.
    #[error("Invalid or expired session. Please start again.")]
    InvalidSession,

    /// Session record was not found (status lookup).
    #[error("Session not found or expired.")]
    SessionNotFound,

    /// Session passed its inactivity timeout.
    #[error("Session expired.")]
    SessionExpired,

    /// Operation requires a different session state.
    #[error("Invalid session state: expected {expected}, got {actual}.")]
    InvalidState {
        /// State the operation requires.
        expected: SessionState,
        /// State the session is actually in.
        actual: SessionState,
    },

    /// Session is locked and the lockout window has not elapsed.
    #[error("Session locked due to too many failed attempts. Try again in {retry_after_minutes} minutes.")]
    SessionLocked {
        /// Minutes until the lockout window elapses.
        retry_after_minutes: i64,
    },

    /// Attempt counter reached the configured maximum.
    #[error("Maximum verification attempts exceeded.")]
    MaxAttemptsExceeded {
        /// Minutes until the session unlocks, when a lockout was applied.
        retry_after_minutes: Option<i64>,
    },

    /// OTP requested before contact verification completed.
    #[error("Contact verification required before OTP generation.")]
    ContactNotVerified,

    /// OTP verification or resend attempted before any OTP was issued.
    #[error("OTP not initiated. Please request OTP first.")]
    OtpNotInitiated,

    // ═══════════════════════════════════════════════════════════
    // OTP Errors
    // ═══════════════════════════════════════════════════════════

    /// The one-time code passed its expiry timestamp.
    #[error("Verification code has expired. Please request a new one.")]
    OtpExpired,

    /// Provided code did not match the stored one.
    #[error("Invalid verification code. {remaining_attempts} attempts remaining.")]
    InvalidOtp {
        /// Verification attempts left before the record is invalidated.
        remaining_attempts: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // Technical Errors
    // ═══════════════════════════════════════════════════════════

    /// A storage tier failed (connectivity, query, protocol).
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Every storage path failed and the caller had no fallback.
    #[error("Storage unavailable")]
    StorageUnavailable,

    /// An outbound network call failed.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// An operation exceeded its time budget.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The notification gateway could not deliver a message.
    #[error("Failed to send verification code: {0}")]
    SendFailed(String),

    /// A record could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Unexpected internal failure; detail is logged, never exposed.
    #[error("Internal error")]
    Internal(String),

    /// Uniform post-retry result: the service is temporarily unavailable
    /// and the caller may retry.
    #[error("Service temporarily unavailable. Please try again.")]
    ServiceUnavailable,
}

impl AuthError {
    /// Returns `true` if this error is attributable to infrastructure
    /// rather than caller input, making it eligible for automatic retry.
    pub const fn is_technical(&self) -> bool {
        matches!(
            self,
            Self::StorageError(_)
                | Self::StorageUnavailable
                | Self::NetworkError(_)
                | Self::Timeout(_)
                | Self::SendFailed(_)
                | Self::SerializationError(_)
                | Self::Internal(_)
        )
    }

    /// Returns `true` if the caller may retry the same request.
    ///
    /// Technical errors and the uniform [`Self::ServiceUnavailable`] are
    /// retryable; user errors are not (locked sessions must wait out the
    /// window instead).
    pub const fn retry_allowed(&self) -> bool {
        self.is_technical() || matches!(self, Self::ServiceUnavailable)
    }

    /// Closed-set error code carried on every error response.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidEmailFormat { .. } => "INVALID_EMAIL_FORMAT",
            Self::InvalidPhoneFormat { .. } => "INVALID_PHONE_FORMAT",
            Self::InvalidOtpMethod => "INVALID_OTP_METHOD",
            Self::EmailRequired => "EMAIL_REQUIRED",
            Self::PhoneRequired => "PHONE_REQUIRED",
            Self::CustomerNotFound { .. } => "CUSTOMER_NOT_FOUND",
            Self::InvalidSession => "INVALID_SESSION",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::SessionLocked { .. } => "SESSION_LOCKED",
            Self::MaxAttemptsExceeded { .. } => "MAX_ATTEMPTS_EXCEEDED",
            Self::ContactNotVerified => "CONTACT_NOT_VERIFIED",
            Self::OtpNotInitiated => "OTP_NOT_INITIATED",
            Self::OtpExpired => "OTP_EXPIRED",
            Self::InvalidOtp { .. } => "INVALID_OTP",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
            Self::NetworkError(_) => "NETWORK_ERROR",
            Self::Timeout(_) => "TIMEOUT_ERROR",
            Self::SendFailed(_) => "SEND_FAILED",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "SERVICE_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Remaining-attempt hint carried on recoverable user errors.
    pub const fn remaining_attempts(&self) -> Option<u32> {
        match self {
            Self::InvalidEmailFormat { remaining_attempts }
            | Self::InvalidPhoneFormat { remaining_attempts }
            | Self::CustomerNotFound { remaining_attempts }
            | Self::InvalidOtp { remaining_attempts } => Some(*remaining_attempts),
            _ => None,
        }
    }

    /// Concrete wait time carried on lockout responses, in minutes.
    pub const fn retry_after_minutes(&self) -> Option<i64> {
        match self {
            Self::SessionLocked { retry_after_minutes } => Some(*retry_after_minutes),
            Self::MaxAttemptsExceeded { retry_after_minutes } => *retry_after_minutes,
            _ => None,
        }
    }
}

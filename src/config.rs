//! Configuration for the authentication subsystem.

use chrono::Duration;

/// Retry behavior for operations that can fail on infrastructure.
///
/// Applied by [`crate::retry::execute`] to technical failures only; user
/// errors are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts (the first try counts as one).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: std::time::Duration,
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: std::time::Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// A policy that performs a single attempt with no delay.
    #[must_use]
    pub const fn none() -> Self {
        Self { max_attempts: 1, delay: std::time::Duration::ZERO }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: std::time::Duration::from_secs(1) }
    }
}

/// Configuration for sessions, OTP issuance and lockout policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Number of digits in a one-time code.
    pub otp_length: usize,
    /// Lifetime of an issued code.
    pub otp_ttl: Duration,
    /// Wrong-code attempts allowed per issued code.
    pub max_otp_attempts: u32,
    /// Failed contact-verification attempts allowed before lockout.
    pub max_contact_attempts: u32,
    /// Inactivity window after which a session expires.
    pub session_timeout: Duration,
    /// How long a locked session stays locked.
    pub lockout_window: Duration,
    /// Country code prepended to bare 10-digit phone numbers.
    pub default_country_code: String,
    /// Retry policy for storage and delivery operations.
    pub retry: RetryPolicy,
}

impl AuthConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OTP code length.
    #[must_use]
    pub const fn with_otp_length(mut self, length: usize) -> Self {
        self.otp_length = length;
        self
    }

    /// Sets the OTP lifetime.
    #[must_use]
    pub const fn with_otp_ttl(mut self, ttl: Duration) -> Self {
        self.otp_ttl = ttl;
        self
    }

    /// Sets the wrong-code attempt limit.
    #[must_use]
    pub const fn with_max_otp_attempts(mut self, attempts: u32) -> Self {
        self.max_otp_attempts = attempts;
        self
    }

    /// Sets the contact-verification attempt limit.
    #[must_use]
    pub const fn with_max_contact_attempts(mut self, attempts: u32) -> Self {
        self.max_contact_attempts = attempts;
        self
    }

    /// Sets the session inactivity timeout.
    #[must_use]
    pub const fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Sets the lockout window.
    #[must_use]
    pub const fn with_lockout_window(mut self, window: Duration) -> Self {
        self.lockout_window = window;
        self
    }

    /// Sets the default country code for bare phone numbers.
    #[must_use]
    pub fn with_default_country_code(mut self, code: impl Into<String>) -> Self {
        self.default_country_code = code.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            otp_length: 6,
            otp_ttl: Duration::minutes(3),
            max_otp_attempts: 3,
            max_contact_attempts: 3,
            session_timeout: Duration::minutes(15),
            lockout_window: Duration::minutes(300),
            default_country_code: "+1".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

//! Contact validation, formatting, masking, and customer lookup.
//!
//! Validation and masking are pure functions; the attempt counting and
//! lockout that follow a failed check live in the session layer.

use crate::config::RetryPolicy;
use crate::error::{AuthError, Result};
use crate::providers::{ContactQuery, CustomerDirectory, CustomerRecord};
use crate::retry;
use crate::state::OtpMethod;
use tracing::debug;

/// Validate email address format.
///
/// Basic RFC 5322 validation: exactly one `@`, non-empty local and domain
/// parts, a dot in the domain, and a restricted character set.
///
/// # Examples
///
/// ```
/// use otp_auth::contact::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@subdomain.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@nodot"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return false;
    }

    // Domain must contain at least one dot
    if !domain.contains('.') {
        return false;
    }

    let valid_local_chars =
        |c: char| c.is_alphanumeric() || c == '.' || c == '-' || c == '+' || c == '_';
    let valid_domain_chars = |c: char| c.is_alphanumeric() || c == '.' || c == '-';

    local.chars().all(valid_local_chars) && domain.chars().all(valid_domain_chars)
}

/// Validate phone number format.
///
/// Accepts 10 to 15 digits after stripping spaces, dashes, parentheses,
/// dots and a leading `+`.
///
/// # Examples
///
/// ```
/// use otp_auth::contact::is_valid_phone;
///
/// assert!(is_valid_phone("+41 79 123 45 67"));
/// assert!(is_valid_phone("(555) 123-4567"));
/// assert!(!is_valid_phone("12345"));
/// assert!(!is_valid_phone("not a number"));
/// ```
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let valid_chars = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.' | '+'));
    valid_chars && (10..=15).contains(&digits)
}

/// Normalize a phone number to a `+`-prefixed digit string.
///
/// Bare 10-digit numbers get the configured default country code.
///
/// # Examples
///
/// ```
/// use otp_auth::contact::format_phone;
///
/// assert_eq!(format_phone("(555) 123-4567", "+1"), "+15551234567");
/// assert_eq!(format_phone("+41791234567", "+1"), "+41791234567");
/// ```
#[must_use]
pub fn format_phone(phone: &str, default_country_code: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        format!("{default_country_code}{digits}")
    } else {
        format!("+{digits}")
    }
}

/// Mask an email address for display, keeping the domain.
///
/// # Examples
///
/// ```
/// use otp_auth::contact::mask_email;
///
/// assert_eq!(mask_email("anna.keller@example.com"), "an*********@example.com");
/// assert_eq!(mask_email("ab@example.com"), "a*@example.com");
/// ```
#[must_use]
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return "*".repeat(email.chars().count());
    };

    let chars: Vec<char> = local.chars().collect();
    let keep = if chars.len() <= 3 { 1 } else { 2 };
    let visible: String = chars.iter().take(keep).collect();
    let masked = "*".repeat(chars.len().saturating_sub(keep));
    format!("{visible}{masked}@{domain}")
}

/// Mask a phone number for display, keeping the last four digits.
///
/// # Examples
///
/// ```
/// use otp_auth::contact::mask_phone;
///
/// assert_eq!(mask_phone("+15551234567"), "***-***-4567");
/// ```
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let last_four = if digits.len() >= 4 { &digits[digits.len() - 4..] } else { digits.as_str() };
    format!("***-***-{last_four}")
}

/// Check that exactly one contact was supplied and that it agrees with the
/// requested delivery method, deriving the method when unset.
///
/// Pure input-shape validation; failures here consume no attempt.
pub fn validate_input(
    email: Option<&str>,
    phone: Option<&str>,
    preferred: Option<OtpMethod>,
) -> Result<OtpMethod> {
    match (email, phone) {
        (Some(_), Some(_)) => Err(AuthError::InvalidInput(
            "Provide either an email address or a phone number, not both.".to_string(),
        )),
        (None, None) => Err(AuthError::InvalidInput(
            "Provide an email address or a phone number.".to_string(),
        )),
        (Some(_), None) => match preferred {
            Some(OtpMethod::Sms) => Err(AuthError::PhoneRequired),
            _ => Ok(OtpMethod::Email),
        },
        (None, Some(_)) => match preferred {
            Some(OtpMethod::Email) => Err(AuthError::EmailRequired),
            _ => Ok(OtpMethod::Sms),
        },
    }
}

/// Customer lookup over a directory, with retry on technical failures.
#[derive(Clone)]
pub struct ContactVerifier<D: CustomerDirectory> {
    directory: D,
    retry: RetryPolicy,
    default_country_code: String,
}

impl<D: CustomerDirectory> ContactVerifier<D> {
    /// Creates a verifier over the given directory.
    #[must_use]
    pub fn new(directory: D, retry: RetryPolicy, default_country_code: String) -> Self {
        Self { directory, retry, default_country_code }
    }

    /// Looks up the customer registered under the given contact.
    ///
    /// The lookup is read-only, so a technical failure is safely retried;
    /// exhaustion surfaces as [`AuthError::ServiceUnavailable`]. An unknown
    /// contact is `Ok(None)` and the caller decides whether it consumes an
    /// attempt.
    pub async fn find_customer(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<CustomerRecord>> {
        let query = if let Some(email) = email {
            ContactQuery::Email(email.to_lowercase())
        } else if let Some(phone) = phone {
            ContactQuery::Phone(format_phone(phone, &self.default_country_code))
        } else {
            return Err(AuthError::InvalidInput(
                "Provide an email address or a phone number.".to_string(),
            ));
        };

        let found = retry::execute(&self.retry, || self.directory.find_customer(&query)).await?;
        debug!(found = found.is_some(), "customer directory lookup");
        Ok(found)
    }
}

//! # OTP Auth
//!
//! Authentication sessions for a customer-facing service: contact
//! verification with lockout protection, one-time-passcode issuance,
//! verification and resend, and a tiered key-value store that keeps the
//! flow working when the preferred fast store is unavailable.
//!
//! ## Components
//!
//! - [`store::TieredStore`]: volatile (Redis) → durable (PostgreSQL) →
//!   in-process memory fallback, behind a single put/get/delete facade.
//! - [`retry`]: bounded retry of technical failures with a fixed delay.
//! - [`otp::OtpManager`]: OTP generation, dispatch, verification, resend.
//! - [`contact::ContactVerifier`]: contact validation and customer lookup.
//! - [`session::SessionManager`]: the session state machine and the
//!   operations exposed to the rest of the application.
//!
//! ## Example
//!
//! ```rust,ignore
//! use otp_auth::{AuthConfig, SessionManager};
//! use otp_auth::store::{MemoryTier, Tier, TieredStore};
//!
//! let store = TieredStore::new(vec![Tier::Memory(MemoryTier::new())], RetryPolicy::default());
//! let manager = SessionManager::new(AuthConfig::default(), store, directory, gateway);
//!
//! let created = manager.create_session(None, None).await?;
//! manager.verify_contact(created.session_id, Some("user@example.com"), None, None).await?;
//! manager.initiate_otp(created.session_id).await?;
//! let authed = manager.verify_otp(created.session_id, "123456").await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod contact;
pub mod error;
pub mod otp;
pub mod providers;
pub mod response;
pub mod retry;
pub mod session;
pub mod state;
pub mod store;

// Mock providers for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use config::{AuthConfig, RetryPolicy};
pub use error::{AuthError, Result};
pub use session::SessionManager;
pub use state::{AuthKey, AuthSession, OtpMethod, OtpRecord, SessionId, SessionState};

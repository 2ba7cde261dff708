//! In-memory mock providers for testing.
//!
//! WARNING: test-only implementations. They hold everything in process
//! memory and expose failure-injection switches; never wire them into a
//! production build.

mod directory;
mod gateway;
mod tier;

pub use directory::MockCustomerDirectory;
pub use gateway::{MockGateway, SentMessage};
pub use tier::FlakyTier;

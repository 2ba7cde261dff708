//! Storage tier with switchable failure injection.

use crate::error::{AuthError, Result};
use crate::store::{MemoryTier, StorageRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A memory tier whose operations can be switched to fail, for exercising
/// the fallback chain.
#[derive(Clone, Default)]
pub struct FlakyTier {
    inner: MemoryTier,
    failing: Arc<AtomicBool>,
}

impl FlakyTier {
    /// Creates a healthy tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches every operation to fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::StorageError("injected tier failure".to_string()));
        }
        Ok(())
    }

    pub(crate) fn put(&self, record: &StorageRecord) -> Result<()> {
        self.check()?;
        self.inner.put(record)
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<StorageRecord>> {
        self.check()?;
        self.inner.get(key)
    }

    pub(crate) fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(key)
    }
}

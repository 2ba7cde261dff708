//! Best-effort in-process storage tier.

use crate::error::{AuthError, Result};
use crate::store::StorageRecord;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-process tier backed by a shared map.
///
/// Records are lost on restart and never shared across processes; this
/// tier exists so the flow keeps working when every external store is
/// down, and as the storage for unit tests. Expired records are purged
/// on access.
#[derive(Clone, Default)]
pub struct MemoryTier {
    records: Arc<RwLock<HashMap<String, StorageRecord>>>,
}

impl MemoryTier {
    /// Creates an empty tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&self, record: &StorageRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| AuthError::StorageError("memory tier lock poisoned".to_string()))?;
        records.retain(|_, r| !r.is_expired());
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<StorageRecord>> {
        let mut records = self
            .records
            .write()
            .map_err(|_| AuthError::StorageError("memory tier lock poisoned".to_string()))?;
        records.retain(|_, r| !r.is_expired());
        Ok(records.get(key).cloned())
    }

    pub(crate) fn delete(&self, key: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| AuthError::StorageError("memory tier lock poisoned".to_string()))?;
        records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(key: &str, ttl: Duration) -> StorageRecord {
        StorageRecord {
            key: key.to_string(),
            payload: serde_json::json!({"n": 1}),
            expires_at: Utc::now() + ttl,
        }
    }

    #[test]
    fn stores_and_retrieves() {
        let tier = MemoryTier::new();
        tier.put(&record("a", Duration::minutes(1))).unwrap();
        assert!(tier.get("a").unwrap().is_some());
        assert!(tier.get("b").unwrap().is_none());
    }

    #[test]
    fn expired_records_are_purged_on_access() {
        let tier = MemoryTier::new();
        tier.put(&record("stale", Duration::milliseconds(-1))).unwrap();
        assert!(tier.get("stale").unwrap().is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let tier = MemoryTier::new();
        tier.put(&record("a", Duration::minutes(1))).unwrap();
        tier.delete("a").unwrap();
        tier.delete("a").unwrap();
        assert!(tier.get("a").unwrap().is_none());
    }

    #[test]
    fn clones_share_state() {
        let tier = MemoryTier::new();
        let other = tier.clone();
        tier.put(&record("shared", Duration::minutes(1))).unwrap();
        assert!(other.get("shared").unwrap().is_some());
    }
}

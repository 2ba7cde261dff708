//! Tiered key-value storage with fallback.
//!
//! A [`TieredStore`] holds an explicit ordered list of tiers, fastest and
//! least durable first (typically Redis, then PostgreSQL, then in-process
//! memory). Callers see a single put/get/delete facade and never learn
//! which tier served a request; an unavailable tier degrades latency or
//! durability, never correctness of the authentication flow.

mod memory;
mod postgres;
mod redis;

pub use memory::MemoryTier;
pub use postgres::PostgresTier;
pub use redis::RedisTier;

use crate::config::RetryPolicy;
use crate::error::{AuthError, Result};
use crate::retry;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// One stored value with its logical expiry.
///
/// Tiers without native TTL enforce `expires_at` on read; a logically
/// expired record is never returned, whichever tier holds it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StorageRecord {
    /// Namespaced key, e.g. `auth_session:{uuid}`.
    pub key: String,
    /// JSON payload.
    pub payload: serde_json::Value,
    /// Logical expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

impl StorageRecord {
    /// Whether the record's logical expiry has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// One storage backend in the fallback chain.
///
/// A closed enum rather than a trait object so tier methods stay native
/// `async fn`; the chain is an explicit ordered list, not a registry.
#[derive(Clone)]
pub enum Tier {
    /// Redis with native TTL. Fast, volatile.
    Volatile(RedisTier),
    /// PostgreSQL with application-managed expiry. Durable.
    Durable(PostgresTier),
    /// In-process map. Best effort, lost on restart.
    Memory(MemoryTier),
    /// A memory tier with switchable failure injection.
    #[cfg(any(test, feature = "test-utils"))]
    Flaky(crate::mocks::FlakyTier),
}

impl Tier {
    /// Tier name for log lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Volatile(_) => "volatile",
            Self::Durable(_) => "durable",
            Self::Memory(_) => "memory",
            #[cfg(any(test, feature = "test-utils"))]
            Self::Flaky(_) => "flaky",
        }
    }

    async fn put(&self, record: &StorageRecord) -> Result<()> {
        match self {
            Self::Volatile(tier) => tier.put(record).await,
            Self::Durable(tier) => tier.put(record).await,
            Self::Memory(tier) => tier.put(record),
            #[cfg(any(test, feature = "test-utils"))]
            Self::Flaky(tier) => tier.put(record),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<StorageRecord>> {
        match self {
            Self::Volatile(tier) => tier.get(key).await,
            Self::Durable(tier) => tier.get(key).await,
            Self::Memory(tier) => tier.get(key),
            #[cfg(any(test, feature = "test-utils"))]
            Self::Flaky(tier) => tier.get(key),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::Volatile(tier) => tier.delete(key).await,
            Self::Durable(tier) => tier.delete(key).await,
            Self::Memory(tier) => tier.delete(key),
            #[cfg(any(test, feature = "test-utils"))]
            Self::Flaky(tier) => tier.delete(key),
        }
    }
}

/// Ordered fallback chain over the configured tiers.
#[derive(Clone)]
pub struct TieredStore {
    tiers: Vec<Tier>,
    retry: RetryPolicy,
}

impl TieredStore {
    /// Creates a store over the given tiers, fastest first.
    ///
    /// A trailing [`MemoryTier`] is appended unless one is already present,
    /// so writes always have a tier that cannot fail on infrastructure.
    #[must_use]
    pub fn new(mut tiers: Vec<Tier>, retry: RetryPolicy) -> Self {
        if !tiers.iter().any(|t| matches!(t, Tier::Memory(_))) {
            tiers.push(Tier::Memory(MemoryTier::new()));
        }
        Self { tiers, retry }
    }

    /// Serializes `value` and writes it to the first tier that accepts it.
    ///
    /// Tier failures (after per-tier retries) fall through to the next
    /// tier; a write landing in a lower tier is not back-propagated when a
    /// higher tier recovers.
    pub async fn put_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let payload = serde_json::to_value(value)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;
        let record = StorageRecord {
            key: key.to_string(),
            payload,
            expires_at: Utc::now() + ttl,
        };

        for tier in &self.tiers {
            match retry::execute(&self.retry, || tier.put(&record)).await {
                Ok(()) => {
                    debug!(key, tier = tier.name(), "stored record");
                    return Ok(());
                }
                Err(e) => {
                    warn!(key, tier = tier.name(), error = %e, "tier write failed, falling through");
                }
            }
        }

        // Unreachable with the guaranteed memory tier, kept for callers
        // constructing a store through other paths.
        Err(AuthError::StorageUnavailable)
    }

    /// Reads `key`, falling through tiers on failure or absence.
    ///
    /// Absence falls through too: a record stranded in a lower tier stays
    /// readable after a higher tier recovers empty.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        for tier in &self.tiers {
            match retry::execute(&self.retry, || tier.get(key)).await {
                Ok(Some(record)) => {
                    if record.is_expired() {
                        continue;
                    }
                    debug!(key, tier = tier.name(), "record found");
                    let value = serde_json::from_value(record.payload)
                        .map_err(|e| AuthError::SerializationError(e.to_string()))?;
                    return Ok(Some(value));
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(key, tier = tier.name(), error = %e, "tier read failed, falling through");
                }
            }
        }
        Ok(None)
    }

    /// Deletes `key` from every tier so no stale copy survives.
    ///
    /// Per-tier failures are logged and swallowed; the logical expiry on
    /// each record bounds how long an undeletable copy stays readable.
    pub async fn delete(&self, key: &str) {
        for tier in &self.tiers {
            if let Err(e) = retry::execute(&self.retry, || tier.delete(key)).await {
                warn!(key, tier = tier.name(), error = %e, "tier delete failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::FlakyTier;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        value: String,
    }

    fn memory_store() -> TieredStore {
        TieredStore::new(vec![Tier::Memory(MemoryTier::new())], RetryPolicy::none())
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = memory_store();
        let payload = Payload { value: "hello".to_string() };
        store.put_json("k:1", &payload, Duration::minutes(1)).await.unwrap();

        let back: Option<Payload> = store.get_json("k:1").await.unwrap();
        assert_eq!(back, Some(payload));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = memory_store();
        let back: Option<Payload> = store.get_json("k:absent").await.unwrap();
        assert!(back.is_none());
    }

    #[tokio::test]
    async fn expired_record_is_absent() {
        let store = memory_store();
        let payload = Payload { value: "ephemeral".to_string() };
        store
            .put_json("k:2", &payload, Duration::milliseconds(20))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let back: Option<Payload> = store.get_json("k:2").await.unwrap();
        assert!(back.is_none());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = memory_store();
        let payload = Payload { value: "gone".to_string() };
        store.put_json("k:3", &payload, Duration::minutes(1)).await.unwrap();

        store.delete("k:3").await;

        let back: Option<Payload> = store.get_json("k:3").await.unwrap();
        assert!(back.is_none());
    }

    #[tokio::test]
    async fn failing_leading_tier_falls_through_on_put_and_get() {
        let flaky = FlakyTier::new();
        flaky.set_failing(true);
        let store = TieredStore::new(
            vec![Tier::Flaky(flaky.clone()), Tier::Memory(MemoryTier::new())],
            RetryPolicy::none(),
        );

        let payload = Payload { value: "fallback".to_string() };
        store.put_json("k:4", &payload, Duration::minutes(1)).await.unwrap();

        let back: Option<Payload> = store.get_json("k:4").await.unwrap();
        assert_eq!(back, Some(payload));
    }

    #[tokio::test]
    async fn recovered_tier_absence_falls_through_to_lower_hit() {
        let flaky = FlakyTier::new();
        flaky.set_failing(true);
        let store = TieredStore::new(
            vec![Tier::Flaky(flaky.clone()), Tier::Memory(MemoryTier::new())],
            RetryPolicy::none(),
        );

        // Write lands in the memory tier while the leading tier is down.
        let payload = Payload { value: "stranded".to_string() };
        store.put_json("k:5", &payload, Duration::minutes(1)).await.unwrap();

        // Leading tier recovers but is empty; the read still finds the record.
        flaky.set_failing(false);
        let back: Option<Payload> = store.get_json("k:5").await.unwrap();
        assert_eq!(back, Some(payload));
    }

    #[tokio::test]
    async fn constructor_guarantees_a_memory_tier() {
        let flaky = FlakyTier::new();
        flaky.set_failing(true);
        // No memory tier supplied; the constructor must append one so the
        // write still succeeds.
        let store = TieredStore::new(vec![Tier::Flaky(flaky)], RetryPolicy::none());

        let payload = Payload { value: "saved".to_string() };
        store.put_json("k:6", &payload, Duration::minutes(1)).await.unwrap();

        let back: Option<Payload> = store.get_json("k:6").await.unwrap();
        assert_eq!(back, Some(payload));
    }

    #[tokio::test]
    async fn delete_reaches_every_tier() {
        let upper = MemoryTier::new();
        let lower = MemoryTier::new();
        let store = TieredStore::new(
            vec![Tier::Memory(upper.clone()), Tier::Memory(lower.clone())],
            RetryPolicy::none(),
        );

        let record = StorageRecord {
            key: "k:7".to_string(),
            payload: serde_json::json!({"value": "dup"}),
            expires_at: Utc::now() + Duration::minutes(1),
        };
        upper.put(&record).unwrap();
        lower.put(&record).unwrap();

        store.delete("k:7").await;

        assert!(upper.get("k:7").unwrap().is_none());
        assert!(lower.get("k:7").unwrap().is_none());
    }
}

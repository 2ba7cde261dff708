//! Redis-backed volatile storage tier.
//!
//! Records are stored as JSON strings under their own key with a native
//! Redis TTL, so expiry needs no sweeper. The logical `expires_at` on the
//! record is still double-checked on read.

use crate::error::{AuthError, Result};
use crate::store::StorageRecord;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::warn;

/// Volatile tier over a Redis connection manager.
pub struct RedisTier {
    conn_manager: ConnectionManager,
}

impl RedisTier {
    /// Connects to Redis and creates the tier.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::StorageError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::StorageError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    pub(crate) async fn put(&self, record: &StorageRecord) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let json = serde_json::to_string(record)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        let ttl_seconds = (record.expires_at - chrono::Utc::now()).num_seconds().max(1);
        #[allow(clippy::cast_sign_loss)]
        let ttl_seconds = ttl_seconds as u64;

        let _: () = conn
            .set_ex(&record.key, json, ttl_seconds)
            .await
            .map_err(|e| AuthError::StorageError(format!("Redis write failed: {e}")))?;

        Ok(())
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Option<StorageRecord>> {
        let mut conn = self.conn_manager.clone();

        let json: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| AuthError::StorageError(format!("Redis read failed: {e}")))?;

        let Some(json) = json else {
            return Ok(None);
        };

        let record: StorageRecord = serde_json::from_str(&json)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        // Double-check logical expiry; the native TTL should have fired.
        if record.is_expired() {
            warn!(key, "expired record survived its Redis TTL");
            self.delete(key).await?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| AuthError::StorageError(format!("Redis delete failed: {e}")))?;
        Ok(())
    }
}

impl Clone for RedisTier {
    fn clone(&self) -> Self {
        Self { conn_manager: self.conn_manager.clone() }
    }
}

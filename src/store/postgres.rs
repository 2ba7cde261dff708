//! PostgreSQL-backed durable storage tier.
//!
//! Postgres has no native TTL, so expiry is application-managed: the
//! `expires_at` column is checked on read and expired rows are purged
//! lazily. See `schema.sql` for the table definition.

use crate::error::{AuthError, Result};
use crate::store::StorageRecord;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

/// Durable tier over a Postgres connection pool.
#[derive(Clone)]
pub struct PostgresTier {
    pool: PgPool,
}

impl PostgresTier {
    /// Creates a tier over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and creates the tier.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| AuthError::StorageError(format!("Postgres connection failed: {e}")))?;
        Ok(Self::new(pool))
    }

    pub(crate) async fn put(&self, record: &StorageRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO auth_records (record_key, payload, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (record_key)
             DO UPDATE SET payload = $2, expires_at = $3",
        )
        .bind(&record.key)
        .bind(&record.payload)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::StorageError(format!("Postgres write failed: {e}")))?;

        Ok(())
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Option<StorageRecord>> {
        let row = sqlx::query(
            "SELECT payload, expires_at FROM auth_records WHERE record_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::StorageError(format!("Postgres read failed: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| AuthError::StorageError(format!("Bad record row: {e}")))?;

        // Lazy purge: an expired row is deleted on read and reported absent.
        if Utc::now() >= expires_at {
            self.delete(key).await?;
            return Ok(None);
        }

        let payload: serde_json::Value = row
            .try_get("payload")
            .map_err(|e| AuthError::StorageError(format!("Bad record row: {e}")))?;

        Ok(Some(StorageRecord { key: key.to_string(), payload, expires_at }))
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM auth_records WHERE record_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::StorageError(format!("Postgres delete failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    async fn round_trip_and_lazy_purge() {
        let tier = PostgresTier::connect("postgres://localhost/otp_auth_test")
            .await
            .expect("Failed to connect");

        let live = StorageRecord {
            key: "otp_auth_test:live".to_string(),
            payload: serde_json::json!({"probe": true}),
            expires_at: Utc::now() + Duration::minutes(1),
        };
        tier.put(&live).await.expect("Failed to write");
        // Timestamps lose sub-microsecond precision in TIMESTAMPTZ, so
        // compare the payload rather than the whole record.
        let back = tier.get(&live.key).await.expect("read").expect("present");
        assert_eq!(back.payload, live.payload);
        tier.delete(&live.key).await.expect("delete");

        let stale = StorageRecord {
            key: "otp_auth_test:stale".to_string(),
            payload: serde_json::json!({"probe": true}),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        tier.put(&stale).await.expect("Failed to write");
        assert!(tier.get(&stale.key).await.expect("read").is_none());
    }
}

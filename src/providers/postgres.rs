//! PostgreSQL-backed customer directory.

use crate::error::{AuthError, Result};
use crate::providers::{ContactQuery, CustomerDirectory, CustomerRecord};
use sqlx::postgres::PgPool;
use sqlx::Row;

/// Customer directory reading from a `customers` table.
///
/// Expected columns: `customer_id TEXT`, `name TEXT`, `email TEXT`,
/// `phone TEXT`, `data JSONB` (see `schema.sql`). Lookups are read-only.
#[derive(Clone)]
pub struct PostgresCustomerDirectory {
    pool: PgPool,
}

impl PostgresCustomerDirectory {
    /// Creates a directory over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and creates a directory.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| AuthError::StorageError(format!("Postgres connection failed: {e}")))?;
        Ok(Self::new(pool))
    }
}

impl CustomerDirectory for PostgresCustomerDirectory {
    async fn find_customer(&self, query: &ContactQuery) -> Result<Option<CustomerRecord>> {
        let (sql, value) = match query {
            ContactQuery::Email(email) => (
                "SELECT customer_id, name, email, phone, data FROM customers WHERE lower(email) = $1",
                email.as_str(),
            ),
            ContactQuery::Phone(phone) => (
                "SELECT customer_id, name, email, phone, data FROM customers WHERE phone = $1",
                phone.as_str(),
            ),
        };

        let row = sqlx::query(sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::StorageError(format!("Customer lookup failed: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(CustomerRecord {
            customer_id: row
                .try_get("customer_id")
                .map_err(|e| AuthError::StorageError(format!("Bad customer row: {e}")))?,
            name: row
                .try_get("name")
                .map_err(|e| AuthError::StorageError(format!("Bad customer row: {e}")))?,
            email: row
                .try_get("email")
                .map_err(|e| AuthError::StorageError(format!("Bad customer row: {e}")))?,
            phone: row
                .try_get("phone")
                .map_err(|e| AuthError::StorageError(format!("Bad customer row: {e}")))?,
            data: row
                .try_get("data")
                .map_err(|e| AuthError::StorageError(format!("Bad customer row: {e}")))?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a Postgres instance with the schema.sql tables applied.
    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    #[allow(clippy::unwrap_used)]
    async fn unknown_contact_returns_none() {
        let directory =
            PostgresCustomerDirectory::connect("postgres://localhost/otp_auth_test")
                .await
                .unwrap();
        let found = directory
            .find_customer(&ContactQuery::Email("nobody@example.com".to_string()))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}

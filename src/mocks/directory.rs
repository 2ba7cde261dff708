//! Mock customer directory.

use crate::error::{AuthError, Result};
use crate::providers::{ContactQuery, CustomerDirectory, CustomerRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory customer directory with failure injection.
#[derive(Clone, Default)]
pub struct MockCustomerDirectory {
    customers: Arc<Mutex<Vec<CustomerRecord>>>,
    failing: Arc<AtomicBool>,
}

impl MockCustomerDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a customer record.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock, lock cannot be poisoned in practice
    pub fn with_customer(self, customer: CustomerRecord) -> Self {
        self.customers.lock().unwrap().push(customer);
        self
    }

    /// Switches every lookup to fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl CustomerDirectory for MockCustomerDirectory {
    async fn find_customer(&self, query: &ContactQuery) -> Result<Option<CustomerRecord>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::StorageError("mock directory failure".to_string()));
        }

        let customers = self
            .customers
            .lock()
            .map_err(|_| AuthError::StorageError("mock directory lock poisoned".to_string()))?;

        let found = customers
            .iter()
            .find(|c| match query {
                ContactQuery::Email(email) => {
                    c.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
                }
                ContactQuery::Phone(phone) => c.phone.as_deref() == Some(phone.as_str()),
            })
            .cloned();

        Ok(found)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn customer() -> CustomerRecord {
        CustomerRecord {
            customer_id: "cust-1".to_string(),
            name: Some("Anna Keller".to_string()),
            email: Some("Anna@Example.com".to_string()),
            phone: Some("+15551234567".to_string()),
            data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn finds_by_email_case_insensitively() {
        let directory = MockCustomerDirectory::new().with_customer(customer());
        let found = directory
            .find_customer(&ContactQuery::Email("anna@example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(found.unwrap().customer_id, "cust-1");
    }

    #[tokio::test]
    async fn finds_by_formatted_phone() {
        let directory = MockCustomerDirectory::new().with_customer(customer());
        let found = directory
            .find_customer(&ContactQuery::Phone("+15551234567".to_string()))
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn failure_injection_is_a_technical_error() {
        let directory = MockCustomerDirectory::new();
        directory.set_failing(true);
        let result = directory
            .find_customer(&ContactQuery::Email("a@b.ch".to_string()))
            .await;
        assert!(matches!(result, Err(AuthError::StorageError(_))));

        directory.set_failing(false);
        let found = directory
            .find_customer(&ContactQuery::Email("a@b.ch".to_string()))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}

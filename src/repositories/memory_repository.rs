//! In-process signup store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use super::SignupRepository;
use crate::models::{RepositoryError, RepositoryResult, SignupRecord};

/// In-memory storage backend for local runs and tests.
///
/// Records are keyed by the value of the key attribute; a record without
/// that attribute is stored under the empty key. Data is lost when the
/// repository is dropped.
#[derive(Debug, Clone)]
pub struct InMemorySignupRepository {
    key_attribute: String,
    records: Arc<RwLock<HashMap<String, SignupRecord>>>,
}

impl InMemorySignupRepository {
    pub fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: key_attribute.into(),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Look up a stored record by key value
    pub async fn get(&self, key: &str) -> Option<SignupRecord> {
        self.records.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn key_of(&self, record: &SignupRecord) -> String {
        record
            .get(&self.key_attribute)
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl SignupRepository for InMemorySignupRepository {
    #[instrument(skip(self, record), fields(key_attribute = %self.key_attribute))]
    async fn put_if_absent(&self, record: &SignupRecord) -> RepositoryResult<()> {
        let key = self.key_of(record);

        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(RepositoryError::Conflict {
                attribute: self.key_attribute.clone(),
                value: key,
            });
        }
        records.insert(key, record.clone());

        info!("Signup record stored in memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_if_absent_stores_record() {
        let repo = InMemorySignupRepository::new("email");
        let record = SignupRecord::from_form(b"email=a%40example.com&feedback=hi");

        repo.put_if_absent(&record).await.unwrap();

        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.get("a@example.com").await, Some(record));
    }

    #[tokio::test]
    async fn test_duplicate_key_conflicts_without_overwrite() {
        let repo = InMemorySignupRepository::new("email");
        let original = SignupRecord::from_form(b"email=a%40example.com&feedback=first");
        let duplicate = SignupRecord::from_form(b"email=a%40example.com&feedback=second");

        repo.put_if_absent(&original).await.unwrap();
        let result = repo.put_if_absent(&duplicate).await;

        match result {
            Err(RepositoryError::Conflict { attribute, value }) => {
                assert_eq!(attribute, "email");
                assert_eq!(value, "a@example.com");
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        assert_eq!(repo.get("a@example.com").await, Some(original));
    }

    #[tokio::test]
    async fn test_record_without_key_uses_empty_key() {
        let repo = InMemorySignupRepository::new("email");

        repo.put_if_absent(&SignupRecord::new()).await.unwrap();
        let second = repo.put_if_absent(&SignupRecord::new()).await;

        assert!(matches!(second, Err(RepositoryError::Conflict { .. })));
        assert_eq!(repo.get("").await, Some(SignupRecord::new()));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_conflict() {
        let repo = InMemorySignupRepository::new("email");

        repo.put_if_absent(&SignupRecord::from_form(b"email=a%40example.com"))
            .await
            .unwrap();
        repo.put_if_absent(&SignupRecord::from_form(b"email=b%40example.com"))
            .await
            .unwrap();

        assert_eq!(repo.len().await, 2);
    }
}

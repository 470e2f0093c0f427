//! Storage-backed API key repository implementation

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

/// Storage-backed implementation of ApiKeyRepository
#[derive(Debug)]
pub struct StorageApiKeyRepository {
    storage: Arc<dyn Storage<ApiKey>>,
}

impl StorageApiKeyRepository {
    /// Create a new storage-backed repository
    pub fn new(storage: Arc<dyn Storage<ApiKey>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ApiKeyRepository for StorageApiKeyRepository {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.storage.get(id).await
    }

    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Vec<ApiKey>, DomainError> {
        self.storage.find_by("lookup_hash", lookup_hash).await
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        if !self
            .storage
            .find_by("display_key", api_key.display_key())
            .await?
            .is_empty()
        {
            return Err(DomainError::conflict(format!(
                "API key '{}' already exists",
                api_key.display_key()
            )));
        }

        self.storage.create(api_key).await
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        self.storage.update(api_key.clone()).await
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        self.storage.delete(id).await
    }

    async fn count(&self) -> Result<usize, DomainError> {
        self.storage.count().await
    }
}

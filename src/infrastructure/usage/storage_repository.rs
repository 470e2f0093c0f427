//! Storage-backed usage repository implementation

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::storage::Storage;
use crate::domain::usage::{Usage, UsageId, UsageRepository};
use crate::domain::DomainError;

/// Storage-backed implementation of UsageRepository
#[derive(Debug)]
pub struct StorageUsageRepository {
    storage: Arc<dyn Storage<Usage>>,
}

impl StorageUsageRepository {
    /// Create a new storage-backed repository
    pub fn new(storage: Arc<dyn Storage<Usage>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl UsageRepository for StorageUsageRepository {
    async fn get(&self, id: &UsageId) -> Result<Option<Usage>, DomainError> {
        self.storage.get(id).await
    }

    async fn create(&self, usage: Usage) -> Result<Usage, DomainError> {
        self.storage.create(usage).await
    }

    async fn update(&self, usage: &Usage) -> Result<Usage, DomainError> {
        self.storage.update(usage.clone()).await
    }

    async fn delete(&self, id: &UsageId) -> Result<bool, DomainError> {
        self.storage.delete(id).await
    }
}

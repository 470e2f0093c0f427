//! API Key repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyId};
use crate::domain::DomainError;

/// Repository trait for API key storage
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Get an API key by its ID
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// Get all keys carrying the given lookup digest (candidates for verification)
    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Vec<ApiKey>, DomainError>;

    /// Get the keys with the given IDs, in the order given. Missing IDs are skipped.
    async fn get_many(&self, ids: &[ApiKeyId]) -> Result<Vec<ApiKey>, DomainError> {
        let mut keys = Vec::with_capacity(ids.len());

        for id in ids {
            if let Some(key) = self.get(id).await? {
                keys.push(key);
            }
        }

        Ok(keys)
    }

    /// Create a new API key, rejecting a duplicate display key or digest
    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Update an existing API key
    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError>;

    /// Delete an API key
    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError>;

    /// Count all API keys
    async fn count(&self) -> Result<usize, DomainError>;
}

//! Usage repository trait

use async_trait::async_trait;

use super::entity::{Usage, UsageId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository for per-key usage records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Get a usage record by ID
    async fn get(&self, id: &UsageId) -> Result<Option<Usage>, DomainError>;

    /// Create a new usage record
    async fn create(&self, usage: Usage) -> Result<Usage, DomainError>;

    /// Replace an existing usage record
    async fn update(&self, usage: &Usage) -> Result<Usage, DomainError>;

    /// Delete a usage record
    async fn delete(&self, id: &UsageId) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_usage_repository() {
        let mut mock = MockUsageRepository::new();

        mock.expect_get().returning(|_| Ok(None));
        mock.expect_delete().returning(|_| Ok(false));

        let id = UsageId::new("usage-1").unwrap();
        assert!(mock.get(&id).await.unwrap().is_none());
        assert!(!mock.delete(&id).await.unwrap());
    }
}

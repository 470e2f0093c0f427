//! Storage-backed user repository implementation

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::storage::Storage;
use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;

/// Storage-backed implementation of UserRepository
#[derive(Debug)]
pub struct StorageUserRepository {
    storage: Arc<dyn Storage<User>>,
}

impl StorageUserRepository {
    /// Create a new storage-backed repository
    pub fn new(storage: Arc<dyn Storage<User>>) -> Self {
        Self { storage }
    }

    async fn find_one(&self, field: &str, value: &str) -> Result<Option<User>, DomainError> {
        Ok(self.storage.find_by(field, value).await?.into_iter().next())
    }
}

#[async_trait]
impl UserRepository for StorageUserRepository {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        self.storage.get(id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.find_one("email", email).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.find_one("username", username).await
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        if self.email_exists(user.email()).await? || self.username_exists(user.username()).await? {
            return Err(DomainError::conflict("User already exists"));
        }

        self.storage.create(user).await.map_err(|e| match e {
            // Unique index hit between the check above and the insert
            DomainError::Conflict { .. } => DomainError::conflict("User already exists"),
            other => other,
        })
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        self.storage.update(user.clone()).await
    }

    async fn count(&self) -> Result<usize, DomainError> {
        self.storage.count().await
    }
}

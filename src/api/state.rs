//! Application state for shared services

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::api_key::{ApiKey, ApiKeyId};
use crate::domain::usage::{ActivityEntry, CommitEvent, DayActivity, SuccessFailure, UsageSummary};
use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::api_key::{ApiKeyService, IssuedApiKey, VerifiedApiKey};
use crate::infrastructure::auth::{JwtGenerator, SecretHasher};
use crate::infrastructure::usage::UsageService;
use crate::infrastructure::user::{SignupRequest, UserService};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServiceTrait>,
    pub api_key_service: Arc<dyn ApiKeyServiceTrait>,
    pub usage_service: Arc<dyn UsageServiceTrait>,
    pub jwt_service: Arc<dyn JwtGenerator>,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
}

/// Account operations
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn signup(&self, request: SignupRequest) -> Result<User, DomainError>;
    async fn login(&self, email: &str, password: &str) -> Result<User, DomainError>;
    async fn get(&self, id: &UserId) -> Result<User, DomainError>;
    async fn count(&self) -> Result<usize, DomainError>;
}

/// API key lifecycle operations
#[async_trait]
pub trait ApiKeyServiceTrait: Send + Sync {
    async fn issue(
        &self,
        user_id: &UserId,
        limit: u32,
        display_key: &str,
    ) -> Result<IssuedApiKey, DomainError>;
    async fn verify(&self, secret: &str, ip: Option<String>)
        -> Result<VerifiedApiKey, DomainError>;
    async fn list(&self, user_id: &UserId) -> Result<Vec<ApiKey>, DomainError>;
    async fn delete(&self, user_id: &UserId, key_id: &ApiKeyId) -> Result<(), DomainError>;
}

/// Usage ingestion and analytics operations
#[async_trait]
pub trait UsageServiceTrait: Send + Sync {
    async fn ingest(
        &self,
        secret: &str,
        events: Vec<CommitEvent>,
        limit: Option<u32>,
    ) -> Result<(), DomainError>;
    async fn summary(&self, user_id: &UserId) -> Result<UsageSummary, DomainError>;
    async fn activity(&self, user_id: &UserId) -> Result<Vec<ActivityEntry>, DomainError>;
    async fn daywise(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DayActivity>, DomainError>;
    async fn success_failure(&self, user_id: &UserId) -> Result<SuccessFailure, DomainError>;
}

// Implement traits for the actual services

#[async_trait]
impl<R, H> UserServiceTrait for UserService<R, H>
where
    R: UserRepository + ?Sized + 'static,
    H: SecretHasher + ?Sized + 'static,
{
    async fn signup(&self, request: SignupRequest) -> Result<User, DomainError> {
        UserService::signup(self, request).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, DomainError> {
        UserService::login(self, email, password).await
    }

    async fn get(&self, id: &UserId) -> Result<User, DomainError> {
        UserService::get(self, id).await
    }

    async fn count(&self) -> Result<usize, DomainError> {
        UserService::count(self).await
    }
}

#[async_trait]
impl ApiKeyServiceTrait for ApiKeyService {
    async fn issue(
        &self,
        user_id: &UserId,
        limit: u32,
        display_key: &str,
    ) -> Result<IssuedApiKey, DomainError> {
        ApiKeyService::issue(self, user_id, limit, display_key).await
    }

    async fn verify(
        &self,
        secret: &str,
        ip: Option<String>,
    ) -> Result<VerifiedApiKey, DomainError> {
        ApiKeyService::verify(self, secret, ip).await
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<ApiKey>, DomainError> {
        ApiKeyService::list(self, user_id).await
    }

    async fn delete(&self, user_id: &UserId, key_id: &ApiKeyId) -> Result<(), DomainError> {
        ApiKeyService::delete(self, user_id, key_id).await
    }
}

#[async_trait]
impl UsageServiceTrait for UsageService {
    async fn ingest(
        &self,
        secret: &str,
        events: Vec<CommitEvent>,
        limit: Option<u32>,
    ) -> Result<(), DomainError> {
        UsageService::ingest(self, secret, events, limit).await
    }

    async fn summary(&self, user_id: &UserId) -> Result<UsageSummary, DomainError> {
        UsageService::summary(self, user_id).await
    }

    async fn activity(&self, user_id: &UserId) -> Result<Vec<ActivityEntry>, DomainError> {
        UsageService::activity(self, user_id).await
    }

    async fn daywise(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DayActivity>, DomainError> {
        UsageService::daywise(self, user_id, now).await
    }

    async fn success_failure(&self, user_id: &UserId) -> Result<SuccessFailure, DomainError> {
        UsageService::success_failure(self, user_id).await
    }
}

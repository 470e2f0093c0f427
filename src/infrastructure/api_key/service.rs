//! API Key service
//!
//! Issuance, verification, listing and deletion of a user's API keys.
//! Operations touching several records undo their earlier writes when a
//! later one fails.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::api_key::{validate_display_key, ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::usage::{Usage, UsageId, UsageRepository};
use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_key_verification;

use super::resolver::KeyResolver;

/// Result of issuing a new API key
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    /// The plaintext secret (only returned once)
    pub secret: String,
    /// Quota the key was issued with
    pub limit: u32,
    /// The stored key
    pub api_key: ApiKey,
}

/// Result of verifying a presented secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedApiKey {
    pub limit: u32,
    pub display_key: String,
    pub ip: Option<String>,
}

/// API Key service
pub struct ApiKeyService {
    users: Arc<dyn UserRepository>,
    keys: Arc<dyn ApiKeyRepository>,
    usages: Arc<dyn UsageRepository>,
    resolver: KeyResolver,
}

impl std::fmt::Debug for ApiKeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyService")
            .field("users", &self.users)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl ApiKeyService {
    /// Create a new API key service
    pub fn new(
        users: Arc<dyn UserRepository>,
        keys: Arc<dyn ApiKeyRepository>,
        usages: Arc<dyn UsageRepository>,
        resolver: KeyResolver,
    ) -> Self {
        Self {
            users,
            keys,
            usages,
            resolver,
        }
    }

    async fn owner(&self, user_id: &UserId) -> Result<User, DomainError> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))
    }

    /// Issue a new key for `user_id`
    pub async fn issue(
        &self,
        user_id: &UserId,
        limit: u32,
        display_key: &str,
    ) -> Result<IssuedApiKey, DomainError> {
        validate_display_key(display_key).map_err(|e| DomainError::validation(e.to_string()))?;

        let mut user = self.owner(user_id).await?;
        let generated = self.resolver.generator().generate()?;

        let usage = self.usages.create(Usage::new(UsageId::generate())).await?;

        let api_key = ApiKey::new(
            ApiKeyId::generate(),
            usage.id().clone(),
            &generated.lookup_hash,
            &generated.secret_hash,
            display_key,
            limit,
        );

        let api_key = match self.keys.create(api_key).await {
            Ok(key) => key,
            Err(e) => {
                self.discard_usage(usage.id()).await;
                return Err(match e {
                    DomainError::Conflict { .. } => {
                        DomainError::validation("API key already exists")
                    }
                    other => other,
                });
            }
        };

        user.add_api_key(api_key.id().clone());
        if let Err(e) = self.users.update(&user).await {
            if let Err(undo) = self.keys.delete(api_key.id()).await {
                error!(api_key_id = %api_key.id(), error = %undo, "Failed to remove key after user update failed");
            }
            self.discard_usage(usage.id()).await;
            return Err(e);
        }

        info!(user_id = %user_id, api_key_id = %api_key.id(), limit, "API key issued");

        Ok(IssuedApiKey {
            secret: generated.secret,
            limit,
            api_key,
        })
    }

    async fn discard_usage(&self, id: &UsageId) {
        if let Err(e) = self.usages.delete(id).await {
            error!(usage_id = %id, error = %e, "Failed to remove orphaned usage record");
        }
    }

    /// Verify a presented secret, pinning the client IP on first use
    pub async fn verify(
        &self,
        secret: &str,
        ip: Option<String>,
    ) -> Result<VerifiedApiKey, DomainError> {
        let Some(mut api_key) = self.resolver.resolve(secret).await? else {
            record_key_verification("not_found");
            return Err(DomainError::not_found("API key not found"));
        };

        if !api_key.ip_allowed(ip.as_deref()) {
            record_key_verification("ip_mismatch");
            warn!(
                api_key_id = %api_key.id(),
                pinned = ?api_key.ip(),
                presented = ?ip,
                "IP mismatch on API key verification"
            );
            return Err(DomainError::forbidden("IP mismatch detected"));
        }

        if let Some(client_ip) = ip.as_deref() {
            if api_key.pin_ip(client_ip) {
                self.keys.update(&api_key).await?;
                info!(api_key_id = %api_key.id(), ip = client_ip, "API key pinned to client IP");
            }
        }

        record_key_verification("verified");
        debug!(api_key_id = %api_key.id(), "API key verified");

        Ok(VerifiedApiKey {
            limit: api_key.limit(),
            display_key: api_key.display_key().to_string(),
            ip,
        })
    }

    /// List the keys owned by `user_id`, in issuance order
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<ApiKey>, DomainError> {
        let user = self.owner(user_id).await?;
        self.keys.get_many(user.api_key_ids()).await
    }

    /// Delete a key owned by `user_id` together with its usage record
    pub async fn delete(&self, user_id: &UserId, key_id: &ApiKeyId) -> Result<(), DomainError> {
        let mut user = self.owner(user_id).await?;

        if !user.owns_key(key_id) {
            return Err(DomainError::forbidden("API Key does not belong to the user"));
        }

        let api_key = self.keys.get(key_id).await?;

        let original = user.clone();
        user.remove_api_key(key_id);
        self.users.update(&user).await?;

        let Some(api_key) = api_key else {
            info!(user_id = %user_id, api_key_id = %key_id, "Pruned dangling key reference");
            return Ok(());
        };

        if let Err(e) = self.keys.delete(key_id).await {
            if let Err(undo) = self.users.update(&original).await {
                error!(user_id = %user_id, error = %undo, "Failed to restore key list after delete failed");
            }
            return Err(e);
        }

        if let Err(e) = self.usages.delete(api_key.usage_id()).await {
            error!(usage_id = %api_key.usage_id(), error = %e, "Failed to delete usage record of removed key");
            return Err(e);
        }

        info!(user_id = %user_id, api_key_id = %key_id, "API key deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::{ApiKeyLabel, MockApiKeyRepository};
    use crate::domain::user::MockUserRepository;
    use crate::infrastructure::api_key::ApiKeyGenerator;
    use crate::infrastructure::auth::Argon2Hasher;
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::usage::StorageUsageRepository;

    struct Fixture {
        service: ApiKeyService,
        users: Arc<MockUserRepository>,
        keys: Arc<MockApiKeyRepository>,
        usages: Arc<StorageUsageRepository>,
        user_id: UserId,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MockUserRepository::new());
        let keys = Arc::new(MockApiKeyRepository::new());
        let usages = Arc::new(StorageUsageRepository::new(Arc::new(
            InMemoryStorage::<Usage>::new(),
        )));

        let user = users
            .create(User::new(
                UserId::generate(),
                "Ada",
                "ada",
                "ada@example.com",
                "hash",
            ))
            .await
            .unwrap();

        let generator =
            ApiKeyGenerator::new(Arc::new(Argon2Hasher::with_cost(1024, 1).unwrap()));
        let resolver = KeyResolver::new(keys.clone(), generator);

        Fixture {
            service: ApiKeyService::new(users.clone(), keys.clone(), usages.clone(), resolver),
            users,
            keys,
            usages,
            user_id: user.id().clone(),
        }
    }

    #[tokio::test]
    async fn test_issue_links_key_usage_and_user() {
        let f = fixture().await;

        let issued = f.service.issue(&f.user_id, 10, "laptop").await.unwrap();
        assert_eq!(issued.secret.len(), 64);
        assert_eq!(issued.limit, 10);
        assert_eq!(issued.api_key.label(), ApiKeyLabel::Active);

        let user = f.users.get(&f.user_id).await.unwrap().unwrap();
        assert_eq!(user.api_key_ids(), &[issued.api_key.id().clone()]);

        let usage = f
            .usages
            .get(issued.api_key.usage_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_issue_with_zero_limit_starts_active() {
        let f = fixture().await;

        let issued = f.service.issue(&f.user_id, 0, "laptop").await.unwrap();
        assert_eq!(issued.limit, 0);
        assert_eq!(issued.api_key.label(), ApiKeyLabel::Active);

        let stored = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(stored.label(), ApiKeyLabel::Active);
    }

    #[tokio::test]
    async fn test_issue_never_repeats_secret() {
        let f = fixture().await;

        let first = f.service.issue(&f.user_id, 5, "one").await.unwrap();
        let second = f.service.issue(&f.user_id, 5, "two").await.unwrap();

        assert_ne!(first.secret, second.secret);
    }

    #[tokio::test]
    async fn test_issue_errors() {
        let f = fixture().await;

        let blank = f.service.issue(&f.user_id, 5, "  ").await;
        assert!(matches!(blank, Err(DomainError::Validation { .. })));

        let ghost = f
            .service
            .issue(&UserId::new("ghost").unwrap(), 5, "laptop")
            .await;
        assert!(matches!(ghost, Err(DomainError::NotFound { .. })));

        f.service.issue(&f.user_id, 5, "laptop").await.unwrap();
        let duplicate = f.service.issue(&f.user_id, 5, "laptop").await;
        assert!(matches!(duplicate, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_issue_rolls_back_when_key_create_fails() {
        let f = fixture().await;
        f.keys.set_fail_creates(true).await;

        assert!(f.service.issue(&f.user_id, 5, "laptop").await.is_err());

        let user = f.users.get(&f.user_id).await.unwrap().unwrap();
        assert!(user.api_key_ids().is_empty());
        assert_eq!(f.keys.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_issue_rolls_back_when_user_update_fails() {
        let f = fixture().await;
        f.users.set_fail_updates(true).await;

        assert!(f.service.issue(&f.user_id, 5, "laptop").await.is_err());
        assert_eq!(f.keys.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_verify_pins_first_ip() {
        let f = fixture().await;
        let issued = f.service.issue(&f.user_id, 7, "laptop").await.unwrap();

        let first = f
            .service
            .verify(&issued.secret, Some("10.0.0.1".to_string()))
            .await
            .unwrap();
        assert_eq!(first.limit, 7);
        assert_eq!(first.display_key, "laptop");
        assert_eq!(first.ip.as_deref(), Some("10.0.0.1"));

        let other = f
            .service
            .verify(&issued.secret, Some("10.0.0.2".to_string()))
            .await;
        assert!(matches!(other, Err(DomainError::Forbidden { .. })));

        let again = f
            .service
            .verify(&issued.secret, Some("10.0.0.1".to_string()))
            .await;
        assert!(again.is_ok());

        let stored = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(stored.ip(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_verify_without_ip_leaves_key_unpinned() {
        let f = fixture().await;
        let issued = f.service.issue(&f.user_id, 7, "laptop").await.unwrap();

        let verified = f.service.verify(&issued.secret, None).await.unwrap();
        assert_eq!(verified.ip, None);

        let stored = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(stored.ip(), None);
    }

    #[tokio::test]
    async fn test_verify_unknown_secret() {
        let f = fixture().await;
        f.service.issue(&f.user_id, 7, "laptop").await.unwrap();

        let result = f.service.verify("not-a-key", None).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_in_issuance_order() {
        let f = fixture().await;
        let a = f.service.issue(&f.user_id, 1, "a").await.unwrap();
        let b = f.service.issue(&f.user_id, 2, "b").await.unwrap();

        let keys = f.service.list(&f.user_id).await.unwrap();
        let ids: Vec<_> = keys.iter().map(|k| k.id().clone()).collect();
        assert_eq!(ids, vec![a.api_key.id().clone(), b.api_key.id().clone()]);
    }

    #[tokio::test]
    async fn test_delete_cascades_usage() {
        let f = fixture().await;
        let issued = f.service.issue(&f.user_id, 3, "laptop").await.unwrap();

        f.service
            .delete(&f.user_id, issued.api_key.id())
            .await
            .unwrap();

        assert!(f.keys.get(issued.api_key.id()).await.unwrap().is_none());
        assert!(f
            .usages
            .get(issued.api_key.usage_id())
            .await
            .unwrap()
            .is_none());
        let user = f.users.get(&f.user_id).await.unwrap().unwrap();
        assert!(user.api_key_ids().is_empty());

        let verify = f.service.verify(&issued.secret, None).await;
        assert!(matches!(verify, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_prunes_dangling_reference() {
        let f = fixture().await;
        let issued = f.service.issue(&f.user_id, 3, "laptop").await.unwrap();
        f.keys.delete(issued.api_key.id()).await.unwrap();

        f.service
            .delete(&f.user_id, issued.api_key.id())
            .await
            .unwrap();

        let user = f.users.get(&f.user_id).await.unwrap().unwrap();
        assert!(user.api_key_ids().is_empty());
    }

    #[tokio::test]
    async fn test_delete_foreign_key_is_forbidden() {
        let f = fixture().await;
        let issued = f.service.issue(&f.user_id, 3, "laptop").await.unwrap();

        let other = f
            .users
            .create(User::new(
                UserId::generate(),
                "Grace",
                "grace",
                "grace@example.com",
                "hash",
            ))
            .await
            .unwrap();

        let result = f.service.delete(other.id(), issued.api_key.id()).await;
        assert!(matches!(result, Err(DomainError::Forbidden { .. })));
        assert!(f.keys.get(issued.api_key.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_restores_user_when_key_delete_fails() {
        let f = fixture().await;
        let issued = f.service.issue(&f.user_id, 3, "laptop").await.unwrap();

        // Key lookup succeeds, the delete itself fails
        let failing_keys = Arc::new(MockApiKeyRepository::new());
        failing_keys.create(issued.api_key.clone()).await.unwrap();
        let resolver = KeyResolver::new(
            failing_keys.clone(),
            ApiKeyGenerator::new(Arc::new(Argon2Hasher::with_cost(1024, 1).unwrap())),
        );
        let service = ApiKeyService::new(
            f.users.clone(),
            Arc::new(FailingDelete(failing_keys)),
            f.usages.clone(),
            resolver,
        );

        assert!(service.delete(&f.user_id, issued.api_key.id()).await.is_err());

        let user = f.users.get(&f.user_id).await.unwrap().unwrap();
        assert!(user.owns_key(issued.api_key.id()));
    }

    #[derive(Debug)]
    struct FailingDelete(Arc<MockApiKeyRepository>);

    #[async_trait::async_trait]
    impl ApiKeyRepository for FailingDelete {
        async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
            self.0.get(id).await
        }

        async fn find_by_lookup_hash(&self, hash: &str) -> Result<Vec<ApiKey>, DomainError> {
            self.0.find_by_lookup_hash(hash).await
        }

        async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
            self.0.create(api_key).await
        }

        async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
            self.0.update(api_key).await
        }

        async fn delete(&self, _id: &ApiKeyId) -> Result<bool, DomainError> {
            Err(DomainError::storage("delete failed"))
        }

        async fn count(&self) -> Result<usize, DomainError> {
            self.0.count().await
        }
    }
}

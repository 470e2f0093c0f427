//! Usage ingestion and analytics services

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::domain::api_key::{ApiKey, ApiKeyRepository};
use crate::domain::usage::analytics::{
    self, ActivityEntry, DayActivity, SuccessFailure, UsageSummary, ACTIVITY_FEED_LIMIT,
};
use crate::domain::usage::{validate_commit_message, CommitEvent, Usage, UsageRepository};
use crate::domain::user::{UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::api_key::KeyResolver;
use crate::infrastructure::observability::record_usage_ingested;

/// Records commit events against API keys and rolls them up per user
pub struct UsageService {
    users: Arc<dyn UserRepository>,
    keys: Arc<dyn ApiKeyRepository>,
    usages: Arc<dyn UsageRepository>,
    resolver: KeyResolver,
}

impl std::fmt::Debug for UsageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageService")
            .field("users", &self.users)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl UsageService {
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

    /// Append a batch of events to the usage record of the key holding
    /// `secret`, overwriting its quota when `limit` is given.
    ///
    /// The batch is applied whole or not at all.
    pub async fn ingest(
        &self,
        secret: &str,
        events: Vec<CommitEvent>,
        limit: Option<u32>,
    ) -> Result<(), DomainError> {
        for event in &events {
            validate_commit_message(&event.commit_message)
                .map_err(|e| DomainError::validation(e.to_string()))?;
        }

        let original_key = self
            .resolver
            .resolve(secret)
            .await?
            .ok_or_else(|| DomainError::not_found("API key not found"))?;

        let mut usage = self
            .usages
            .get(original_key.usage_id())
            .await?
            .ok_or_else(|| DomainError::not_found("Usage record not found"))?;

        let mut api_key = original_key.clone();
        if let Some(limit) = limit {
            api_key.set_limit(limit);
            self.keys.update(&api_key).await?;
        }

        let batch = events.len();
        let successes = events.iter().filter(|e| e.is_success()).count();
        usage.record_batch(events);

        if let Err(e) = self.usages.update(&usage).await {
            if limit.is_some() {
                if let Err(undo) = self.keys.update(&original_key).await {
                    error!(api_key_id = %original_key.id(), error = %undo, "Failed to restore key after usage update failed");
                }
            }
            return Err(e);
        }

        record_usage_ingested(batch as u64, successes as u64);
        info!(
            api_key_id = %api_key.id(),
            events = batch,
            limit = api_key.limit(),
            label = api_key.label().as_str(),
            "Usage recorded"
        );

        Ok(())
    }

    async fn owned(&self, user_id: &UserId) -> Result<(Vec<ApiKey>, Vec<Usage>), DomainError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        let keys = self.keys.get_many(user.api_key_ids()).await?;

        let mut usages = Vec::with_capacity(keys.len());
        for key in &keys {
            match self.usages.get(key.usage_id()).await? {
                Some(usage) => usages.push(usage),
                None => debug!(api_key_id = %key.id(), "Key has no usage record"),
            }
        }

        Ok((keys, usages))
    }

    async fn owned_or_not_found(
        &self,
        user_id: &UserId,
    ) -> Result<(Vec<ApiKey>, Vec<Usage>), DomainError> {
        let (keys, usages) = self.owned(user_id).await?;
        if keys.is_empty() {
            return Err(DomainError::not_found("No API keys found"));
        }
        Ok((keys, usages))
    }

    /// Active and expired key counts with total request volume
    pub async fn summary(&self, user_id: &UserId) -> Result<UsageSummary, DomainError> {
        let (keys, usages) = self.owned(user_id).await?;
        Ok(analytics::summarize(&keys, &usages))
    }

    /// The most recent events across the user's keys
    pub async fn activity(&self, user_id: &UserId) -> Result<Vec<ActivityEntry>, DomainError> {
        let (_, usages) = self.owned_or_not_found(user_id).await?;
        Ok(analytics::activity_feed(&usages, ACTIVITY_FEED_LIMIT))
    }

    /// Weekday breakdown of the last seven days as seen from `now`
    pub async fn daywise(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DayActivity>, DomainError> {
        let (_, usages) = self.owned_or_not_found(user_id).await?;
        Ok(analytics::day_of_week_breakdown(&usages, now))
    }

    /// Success and failure totals across the user's keys
    pub async fn success_failure(&self, user_id: &UserId) -> Result<SuccessFailure, DomainError> {
        let (_, usages) = self.owned_or_not_found(user_id).await?;
        Ok(analytics::success_failure(&usages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::api_key::{ApiKeyId, ApiKeyLabel, MockApiKeyRepository};
    use crate::domain::usage::{CommitStatus, MockUsageRepository, UsageId};
    use crate::domain::user::{MockUserRepository, User};
    use crate::infrastructure::api_key::{ApiKeyGenerator, ApiKeyService};
    use crate::infrastructure::auth::Argon2Hasher;
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::usage::StorageUsageRepository;

    struct Fixture {
        usage_service: UsageService,
        key_service: ApiKeyService,
        keys: Arc<MockApiKeyRepository>,
        usages: Arc<StorageUsageRepository>,
        user_id: UserId,
    }

    fn resolver(keys: Arc<MockApiKeyRepository>) -> KeyResolver {
        KeyResolver::new(
            keys,
            ApiKeyGenerator::new(Arc::new(Argon2Hasher::with_cost(1024, 1).unwrap())),
        )
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

        Fixture {
            usage_service: UsageService::new(
                users.clone(),
                keys.clone(),
                usages.clone(),
                resolver(keys.clone()),
            ),
            key_service: ApiKeyService::new(
                users.clone(),
                keys.clone(),
                usages.clone(),
                resolver(keys.clone()),
            ),
            keys,
            usages,
            user_id: user.id().clone(),
        }
    }

    fn event(message: &str, status: CommitStatus, at: DateTime<Utc>) -> CommitEvent {
        CommitEvent::new(message, status).at(at)
    }

    #[tokio::test]
    async fn test_ingest_tallies_batch() {
        let f = fixture().await;
        let issued = f.key_service.issue(&f.user_id, 10, "laptop").await.unwrap();

        f.usage_service
            .ingest(
                &issued.secret,
                vec![
                    CommitEvent::new("feat: a", CommitStatus::Success),
                    CommitEvent::new("fix: b", CommitStatus::Failure),
                    CommitEvent::new("docs: c", CommitStatus::Success),
                ],
                Some(7),
            )
            .await
            .unwrap();

        let usage = f
            .usages
            .get(issued.api_key.usage_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.total_requests(), 3);
        assert_eq!(usage.success_count(), 2);
        assert_eq!(usage.failure_count(), 1);

        let key = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(key.limit(), 7);
        assert_eq!(key.label(), ApiKeyLabel::Active);
    }

    #[tokio::test]
    async fn test_ingest_zero_limit_expires_key() {
        let f = fixture().await;
        let issued = f.key_service.issue(&f.user_id, 1, "laptop").await.unwrap();

        f.usage_service
            .ingest(
                &issued.secret,
                vec![CommitEvent::new("feat: last", CommitStatus::Success)],
                Some(0),
            )
            .await
            .unwrap();

        let key = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(key.label(), ApiKeyLabel::Expired);

        let verified = f.key_service.verify(&issued.secret, None).await.unwrap();
        assert_eq!(verified.limit, 0);
    }

    #[tokio::test]
    async fn test_ingest_without_limit_keeps_quota() {
        let f = fixture().await;
        let issued = f.key_service.issue(&f.user_id, 4, "laptop").await.unwrap();

        f.usage_service
            .ingest(
                &issued.secret,
                vec![CommitEvent::new("feat: a", CommitStatus::Success)],
                None,
            )
            .await
            .unwrap();

        let key = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(key.limit(), 4);
    }

    #[tokio::test]
    async fn test_ingest_errors() {
        let f = fixture().await;
        let issued = f.key_service.issue(&f.user_id, 4, "laptop").await.unwrap();

        let unknown = f
            .usage_service
            .ingest(
                "unknown",
                vec![CommitEvent::new("x", CommitStatus::Success)],
                None,
            )
            .await;
        assert!(matches!(unknown, Err(DomainError::NotFound { .. })));

        let blank = f
            .usage_service
            .ingest(
                &issued.secret,
                vec![
                    CommitEvent::new("ok", CommitStatus::Success),
                    CommitEvent::new("", CommitStatus::Failure),
                ],
                Some(3),
            )
            .await;
        assert!(matches!(blank, Err(DomainError::Validation { .. })));

        // Nothing from the rejected batch was applied
        let key = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(key.limit(), 4);
        let usage = f
            .usages
            .get(issued.api_key.usage_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_ingest_after_delete_is_not_found() {
        let f = fixture().await;
        let issued = f.key_service.issue(&f.user_id, 4, "laptop").await.unwrap();
        f.key_service
            .delete(&f.user_id, issued.api_key.id())
            .await
            .unwrap();

        let result = f
            .usage_service
            .ingest(
                &issued.secret,
                vec![CommitEvent::new("x", CommitStatus::Success)],
                None,
            )
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_ingest_missing_usage_record() {
        let f = fixture().await;
        let issued = f.key_service.issue(&f.user_id, 4, "laptop").await.unwrap();
        f.usages.delete(issued.api_key.usage_id()).await.unwrap();

        let result = f
            .usage_service
            .ingest(
                &issued.secret,
                vec![CommitEvent::new("x", CommitStatus::Success)],
                Some(3),
            )
            .await;
        assert!(
            matches!(result, Err(DomainError::NotFound { ref message }) if message == "Usage record not found")
        );

        let key = f.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(key.limit(), 4);
    }

    #[tokio::test]
    async fn test_ingest_restores_key_when_usage_update_fails() {
        let users = Arc::new(MockUserRepository::new());
        let keys = Arc::new(MockApiKeyRepository::new());
        let generator =
            ApiKeyGenerator::new(Arc::new(Argon2Hasher::with_cost(1024, 1).unwrap()));
        let generated = generator.generate().unwrap();
        let usage_id = UsageId::generate();
        let key = ApiKey::new(
            ApiKeyId::generate(),
            usage_id.clone(),
            &generated.lookup_hash,
            &generated.secret_hash,
            "laptop",
            5,
        );
        keys.create(key.clone()).await.unwrap();

        let mut usages = MockUsageRepository::new();
        let stored = Usage::new(usage_id.clone());
        usages
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        usages
            .expect_update()
            .returning(|_| Err(DomainError::storage("write failed")));

        let service = UsageService::new(
            users,
            keys.clone(),
            Arc::new(usages),
            KeyResolver::new(keys.clone(), generator),
        );

        let result = service
            .ingest(
                &generated.secret,
                vec![CommitEvent::new("x", CommitStatus::Success)],
                Some(0),
            )
            .await;
        assert!(matches!(result, Err(DomainError::Storage { .. })));

        let restored = keys.get(key.id()).await.unwrap().unwrap();
        assert_eq!(restored.limit(), 5);
        assert_eq!(restored.label(), ApiKeyLabel::Active);
    }

    #[tokio::test]
    async fn test_analytics_views() {
        let f = fixture().await;
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();

        let a = f.key_service.issue(&f.user_id, 5, "a").await.unwrap();
        let b = f.key_service.issue(&f.user_id, 5, "b").await.unwrap();

        f.usage_service
            .ingest(
                &a.secret,
                vec![
                    // Sunday 2024-05-12
                    event("a1", CommitStatus::Success, now - chrono::Duration::days(3)),
                    // Wednesday, today
                    event("a2", CommitStatus::Failure, now),
                ],
                Some(3),
            )
            .await
            .unwrap();
        f.usage_service
            .ingest(
                &b.secret,
                vec![
                    // Outside the window
                    event("b1", CommitStatus::Success, now - chrono::Duration::days(10)),
                    event("b2", CommitStatus::Success, now - chrono::Duration::hours(1)),
                ],
                Some(0),
            )
            .await
            .unwrap();

        let summary = f.usage_service.summary(&f.user_id).await.unwrap();
        assert_eq!(summary.active_tokens, 1);
        assert_eq!(summary.expired_tokens, 1);
        assert_eq!(summary.total_requests, 4);

        let feed = f.usage_service.activity(&f.user_id).await.unwrap();
        let messages: Vec<_> = feed.iter().map(|e| e.commit_message.as_str()).collect();
        assert_eq!(messages, vec!["a2", "b2", "a1", "b1"]);

        let days = f.usage_service.daywise(&f.user_id, now).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!((days[0].day_index, days[0].day), (1, "Sun"));
        assert_eq!(days[0].total_requests, 1);
        assert_eq!((days[1].day_index, days[1].day), (4, "Wed"));
        assert_eq!(days[1].total_requests, 2);
        assert_eq!(days[1].success_count, 1);
        assert_eq!(days[1].failure_count, 1);

        let totals = f.usage_service.success_failure(&f.user_id).await.unwrap();
        assert_eq!(totals.total_success, 3);
        assert_eq!(totals.total_failure, 1);
    }

    #[tokio::test]
    async fn test_analytics_without_keys() {
        let f = fixture().await;

        let summary = f.usage_service.summary(&f.user_id).await.unwrap();
        assert_eq!(summary, UsageSummary::default());

        assert!(matches!(
            f.usage_service.activity(&f.user_id).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            f.usage_service.daywise(&f.user_id, Utc::now()).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            f.usage_service.success_failure(&f.user_id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_success_failure_zero_without_usage_records() {
        let f = fixture().await;
        let issued = f.key_service.issue(&f.user_id, 5, "a").await.unwrap();
        f.usages.delete(issued.api_key.usage_id()).await.unwrap();

        let totals = f.usage_service.success_failure(&f.user_id).await.unwrap();
        assert_eq!(totals, SuccessFailure::default());
    }
}

//! Commit Keys API
//!
//! Backend for a commit CLI and its dashboard:
//! - Accounts with cookie-based sessions
//! - API key issuance, verification and first-seen IP pinning
//! - Per-key usage ingestion and analytics rollups

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::{
    api_key::{ApiKeyGenerator, ApiKeyService, KeyResolver, StorageApiKeyRepository},
    auth::{Argon2Hasher, JwtConfig, JwtService, SecretHasher},
    storage::{EntityStores, StorageFactory},
    usage::{StorageUsageRepository, UsageService},
    user::{StorageUserRepository, UserService},
};
use tracing::info;

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_config = config.storage.storage_config()?;
    info!(backend = ?storage_config.storage_type(), "Initializing storage");

    let stores = StorageFactory::create(&storage_config).await?;

    Ok(build_app_state(
        stores,
        Arc::new(Argon2Hasher::new()),
        config.auth.jwt_config(),
        config.auth.cookie_secure,
    ))
}

/// Wire repositories and services over already-created stores
pub fn build_app_state(
    stores: EntityStores,
    hasher: Arc<dyn SecretHasher>,
    jwt_config: JwtConfig,
    cookie_secure: bool,
) -> AppState {
    let users = Arc::new(StorageUserRepository::new(stores.users));
    let keys = Arc::new(StorageApiKeyRepository::new(stores.api_keys));
    let usages = Arc::new(StorageUsageRepository::new(stores.usages));

    let resolver = KeyResolver::new(keys.clone(), ApiKeyGenerator::new(hasher.clone()));

    AppState {
        user_service: Arc::new(UserService::new(users.clone(), hasher)),
        api_key_service: Arc::new(ApiKeyService::new(
            users.clone(),
            keys.clone(),
            usages.clone(),
            resolver.clone(),
        )),
        usage_service: Arc::new(UsageService::new(users, keys, usages, resolver)),
        jwt_service: Arc::new(JwtService::new(jwt_config)),
        cookie_secure,
    }
}

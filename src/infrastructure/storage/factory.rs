//! Storage factory for runtime storage selection

use std::sync::Arc;

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::api_key::ApiKey;
use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::usage::Usage;
use crate::domain::user::User;
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::migrations::{run_storage_migrations, API_KEYS_TABLE, USAGES_TABLE, USERS_TABLE};
use super::postgres::{connect_pool, PostgresConfig, PostgresStorage};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// PostgreSQL storage configuration
    Postgres(PostgresConfig),
}

impl StorageConfig {
    /// Creates an in-memory storage configuration
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Creates a PostgreSQL storage configuration
    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    /// Creates a PostgreSQL configuration from a URL
    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Document stores for every entity the service persists
#[derive(Debug, Clone)]
pub struct EntityStores {
    pub users: Arc<dyn Storage<User>>,
    pub api_keys: Arc<dyn Storage<ApiKey>>,
    pub usages: Arc<dyn Storage<Usage>>,
}

/// Factory for creating storage instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the entity stores for the configured backend.
    ///
    /// For PostgreSQL a single pool is shared by all tables and pending
    /// migrations are applied before the stores are returned.
    pub async fn create(config: &StorageConfig) -> Result<EntityStores, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory storage");
                Ok(Self::create_in_memory_stores())
            }
            StorageConfig::Postgres(pg_config) => {
                info!(
                    max_connections = pg_config.max_connections,
                    "Using PostgreSQL storage"
                );
                let pool = connect_pool(pg_config).await?;
                run_storage_migrations(&pool).await?;
                Ok(Self::create_postgres_stores(pool))
            }
        }
    }

    /// Creates fresh in-memory stores for every entity
    pub fn create_in_memory_stores() -> EntityStores {
        EntityStores {
            users: Self::create_in_memory::<User>(),
            api_keys: Self::create_in_memory::<ApiKey>(),
            usages: Self::create_in_memory::<Usage>(),
        }
    }

    /// Creates PostgreSQL stores for every entity over one pool
    pub fn create_postgres_stores(pool: PgPool) -> EntityStores {
        EntityStores {
            users: Self::create_postgres_with_pool::<User>(pool.clone(), USERS_TABLE),
            api_keys: Self::create_postgres_with_pool::<ApiKey>(pool.clone(), API_KEYS_TABLE),
            usages: Self::create_postgres_with_pool::<Usage>(pool, USAGES_TABLE),
        }
    }

    /// Creates an in-memory storage
    pub fn create_in_memory<E>() -> Arc<InMemoryStorage<E>>
    where
        E: StorageEntity,
    {
        Arc::new(InMemoryStorage::new())
    }

    /// Creates a PostgreSQL storage over an existing pool
    pub fn create_postgres_with_pool<E>(pool: PgPool, table_name: &str) -> Arc<PostgresStorage<E>>
    where
        E: StorageEntity + 'static,
    {
        Arc::new(PostgresStorage::new(pool, table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!(
            StorageType::from_str("memory"),
            Some(StorageType::InMemory)
        );
        assert_eq!(
            StorageType::from_str("in-memory"),
            Some(StorageType::InMemory)
        );
        assert_eq!(
            StorageType::from_str("Postgres"),
            Some(StorageType::Postgres)
        );
        assert_eq!(StorageType::from_str("pg"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("mongodb"), None);
    }

    #[test]
    fn test_storage_config_types() {
        let in_memory = StorageConfig::in_memory();
        assert_eq!(in_memory.storage_type(), StorageType::InMemory);

        let postgres = StorageConfig::postgres_url("postgres://localhost/test");
        assert_eq!(postgres.storage_type(), StorageType::Postgres);
    }

    #[tokio::test]
    async fn test_create_in_memory_stores() {
        let stores = StorageFactory::create(&StorageConfig::in_memory())
            .await
            .unwrap();

        assert_eq!(stores.users.count().await.unwrap(), 0);
        assert_eq!(stores.api_keys.count().await.unwrap(), 0);
        assert_eq!(stores.usages.count().await.unwrap(), 0);
    }
}

//! PostgreSQL document storage
//!
//! Each entity type owns one table of `(key, data JSONB, created_at,
//! updated_at)` rows created by the storage migrations. Uniqueness of
//! document fields such as email or lookup digest comes from expression
//! indexes on `data`, so violating any of them surfaces as `Conflict`.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/commit_keys";

/// Connection settings for the shared pool
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long a request waits for a free connection
    pub acquire_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Opens the pool shared by the users, api_keys and usages tables
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))
}

/// Statements for one document table, rendered once when the store is built
#[derive(Debug, Clone)]
struct DocumentSql {
    select_one: String,
    select_all: String,
    select_by_field: String,
    insert: String,
    update: String,
    delete: String,
    clear: String,
    count: String,
    exists: String,
}

impl DocumentSql {
    fn for_table(table: &str) -> Self {
        Self {
            select_one: format!("SELECT data FROM {table} WHERE key = $1"),
            select_all: format!("SELECT data FROM {table} ORDER BY created_at"),
            select_by_field: format!(
                "SELECT data FROM {table} WHERE data->>$1 = $2 ORDER BY created_at"
            ),
            insert: format!("INSERT INTO {table} (key, data) VALUES ($1, $2)"),
            update: format!("UPDATE {table} SET data = $2, updated_at = NOW() WHERE key = $1"),
            delete: format!("DELETE FROM {table} WHERE key = $1"),
            clear: format!("DELETE FROM {table}"),
            count: format!("SELECT COUNT(*) FROM {table}"),
            exists: format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE key = $1)"),
        }
    }
}

fn read_error(action: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::storage(format!("Failed to {} document: {}", action, e))
}

/// Unique-index hits become `Conflict` so repositories can report duplicates
fn write_error(key: &str, action: &'static str, error: sqlx::Error) -> DomainError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::conflict(format!(
            "Document '{}' violates a unique constraint",
            key
        )),
        _ => DomainError::storage(format!("Failed to {} document '{}': {}", action, key, error)),
    }
}

fn decode<E: StorageEntity>(data: Value) -> Result<E, DomainError> {
    serde_json::from_value(data)
        .map_err(|e| DomainError::storage(format!("Failed to decode document: {}", e)))
}

fn encode<E: StorageEntity>(entity: &E) -> Result<Value, DomainError> {
    serde_json::to_value(entity)
        .map_err(|e| DomainError::storage(format!("Failed to encode document: {}", e)))
}

/// JSONB-backed store for one entity type
#[derive(Debug)]
pub struct PostgresStorage<E> {
    pool: PgPool,
    table: String,
    sql: DocumentSql,
    _entity: PhantomData<fn() -> E>,
}

impl<E> PostgresStorage<E>
where
    E: StorageEntity,
{
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        let table = table.into();

        Self {
            pool,
            sql: DocumentSql::for_table(&table),
            table,
            _entity: PhantomData,
        }
    }

    async fn fetch_documents(&self, sql: &str, binds: &[&str]) -> Result<Vec<E>, DomainError> {
        let mut query = sqlx::query_scalar::<_, Value>(sql);
        for value in binds {
            query = query.bind(*value);
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list"))?
            .into_iter()
            .map(decode)
            .collect()
    }
}

#[async_trait]
impl<E> Storage<E> for PostgresStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        sqlx::query_scalar::<_, Value>(&self.sql.select_one)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("get"))?
            .map(decode)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        self.fetch_documents(&self.sql.select_all, &[]).await
    }

    async fn find_by(&self, field: &str, value: &str) -> Result<Vec<E>, DomainError> {
        self.fetch_documents(&self.sql.select_by_field, &[field, value])
            .await
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str();

        sqlx::query(&self.sql.insert)
            .bind(key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(key, "create", e))?;

        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str();

        let result = sqlx::query(&self.sql.update)
            .bind(key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(key, "update", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Document '{}' not found in {}",
                key, self.table
            )));
        }

        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        let result = sqlx::query(&self.sql.delete)
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(read_error("delete"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(&self.sql.exists)
            .bind(key.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("look up"))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count = sqlx::query_scalar::<_, i64>(&self.sql.count)
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count"))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        sqlx::query(&self.sql.clear)
            .execute(&self.pool)
            .await
            .map_err(read_error("clear"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_builder() {
        let config = PostgresConfig::default();
        assert_eq!(config.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);

        let config = PostgresConfig::new("postgres://db/keys").with_max_connections(4);
        assert_eq!(config.url, "postgres://db/keys");
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_document_sql_targets_table() {
        let sql = DocumentSql::for_table("api_keys");

        assert_eq!(sql.select_one, "SELECT data FROM api_keys WHERE key = $1");
        assert!(sql.select_by_field.contains("WHERE data->>$1 = $2"));
        assert!(sql.insert.starts_with("INSERT INTO api_keys "));
        assert!(sql.update.contains("updated_at = NOW()"));
        assert_eq!(sql.clear, "DELETE FROM api_keys");
    }

    #[test]
    fn test_write_error_without_unique_violation_is_storage() {
        let error = write_error("user-1", "create", sqlx::Error::RowNotFound);

        assert!(matches!(error, DomainError::Storage { ref message } if message.contains("user-1")));
    }

    #[test]
    fn test_decode_rejects_foreign_document() {
        let result = decode::<crate::domain::usage::Usage>(serde_json::json!({"email": "x"}));
        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }
}

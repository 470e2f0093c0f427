use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::auth::JwtConfig;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Session token and cookie settings
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret; falls back to `JWT_SECRET`
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_expiration_hours")]
    pub token_expiration_hours: u64,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[hidden]"))
            .field("token_expiration_hours", &self.token_expiration_hours)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Falls back to `DATABASE_URL`
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_token_expiration_hours() -> u64 {
    24
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:8080".to_string(),
        "https://gitpusher-dashboard.vercel.app".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expiration_hours: default_token_expiration_hours(),
            cookie_secure: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl AuthConfig {
    /// Signing configuration, reading `JWT_SECRET` when no secret is configured
    pub fn jwt_config(&self) -> JwtConfig {
        self.jwt_config_with(std::env::var("JWT_SECRET").ok())
    }

    fn jwt_config_with(&self, env_secret: Option<String>) -> JwtConfig {
        let secret = self
            .jwt_secret
            .clone()
            .or(env_secret)
            .filter(|s| !s.trim().is_empty());

        match secret {
            Some(secret) => JwtConfig::new(secret, self.token_expiration_hours),
            None => {
                tracing::warn!(
                    "No JWT secret configured; using a random per-process secret. \
                     Sessions will not survive a restart."
                );
                JwtConfig::with_generated_secret(self.token_expiration_hours)
            }
        }
    }
}

impl StorageSettings {
    /// Backend configuration, reading `DATABASE_URL` when no URL is configured
    pub fn storage_config(&self) -> Result<StorageConfig, DomainError> {
        self.storage_config_with(std::env::var("DATABASE_URL").ok())
    }

    fn storage_config_with(&self, env_url: Option<String>) -> Result<StorageConfig, DomainError> {
        let storage_type = StorageType::from_str(&self.backend).ok_or_else(|| {
            DomainError::configuration(format!("Unknown storage backend '{}'", self.backend))
        })?;

        match storage_type {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => {
                let url = self.database_url.clone().or(env_url).ok_or_else(|| {
                    DomainError::configuration(
                        "PostgreSQL storage requires storage.database_url or DATABASE_URL",
                    )
                })?;

                Ok(StorageConfig::postgres(
                    PostgresConfig::new(url).with_max_connections(self.max_connections),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_expiration_hours, 24);
        assert!(!config.auth.cookie_secure);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.cors.allowed_origins.len(), 2);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "server": {"host": "127.0.0.1", "port": 9000},
                "logging": {"level": "debug", "format": "json"},
                "auth": {"cookie_secure": true}
            }"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(matches!(config.logging.format, LogFormat::Json));
        assert!(config.auth.cookie_secure);
        assert_eq!(config.auth.token_expiration_hours, 24);
        assert_eq!(config.storage.max_connections, 10);
    }

    #[test]
    fn test_jwt_secret_resolution() {
        let configured = AuthConfig {
            jwt_secret: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(
            configured.jwt_config_with(Some("from-env".to_string())).secret,
            "from-config"
        );

        let env_only = AuthConfig::default();
        assert_eq!(
            env_only.jwt_config_with(Some("from-env".to_string())).secret,
            "from-env"
        );

        let generated = env_only.jwt_config_with(None);
        assert_eq!(generated.secret.len(), 64);
        assert_eq!(generated.expiration_hours, 24);
    }

    #[test]
    fn test_storage_config_selection() {
        let memory = StorageSettings::default().storage_config_with(None).unwrap();
        assert_eq!(memory.storage_type(), StorageType::InMemory);

        let postgres = StorageSettings {
            backend: "postgres".to_string(),
            ..Default::default()
        };
        assert!(postgres.storage_config_with(None).is_err());

        match postgres
            .storage_config_with(Some("postgres://db/keys".to_string()))
            .unwrap()
        {
            StorageConfig::Postgres(pg) => {
                assert_eq!(pg.url, "postgres://db/keys");
                assert_eq!(pg.max_connections, 10);
            }
            other => panic!("unexpected storage config: {:?}", other),
        }

        let unknown = StorageSettings {
            backend: "redis".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            unknown.storage_config_with(None),
            Err(DomainError::Configuration { .. })
        ));
    }
}

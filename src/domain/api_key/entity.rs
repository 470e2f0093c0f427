//! API Key entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_api_key_id, ApiKeyValidationError};
use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::usage::UsageId;

/// API Key identifier - alphanumeric + hyphens, max 50 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Create a new ApiKeyId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let id = id.into();
        validate_api_key_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKeyId {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKeyId> for String {
    fn from(id: ApiKeyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for ApiKeyId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageEntity for ApiKey {
    type Key = ApiKeyId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Lifecycle label of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ApiKeyLabel {
    /// Quota remaining
    #[default]
    Active,
    /// Quota exhausted
    Expired,
}

impl ApiKeyLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Expired => "Expired",
        }
    }
}

/// Issued API key
///
/// Only hashes of the secret are stored. `lookup_hash` is a deterministic
/// SHA-256 digest used to find candidates; `secret_hash` is the salted
/// argon2 hash that confirms them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    id: ApiKeyId,
    usage_id: UsageId,
    lookup_hash: String,
    secret_hash: String,
    /// Client-supplied displayable form of the key
    display_key: String,
    label: ApiKeyLabel,
    limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new API key. Keys always start Active, whatever the limit.
    pub fn new(
        id: ApiKeyId,
        usage_id: UsageId,
        lookup_hash: impl Into<String>,
        secret_hash: impl Into<String>,
        display_key: impl Into<String>,
        limit: u32,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            usage_id,
            lookup_hash: lookup_hash.into(),
            secret_hash: secret_hash.into(),
            display_key: display_key.into(),
            label: ApiKeyLabel::Active,
            limit,
            ip: None,
            created_at: now,
            updated_at: now,
        }
    }

    // Getters

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn usage_id(&self) -> &UsageId {
        &self.usage_id
    }

    pub fn lookup_hash(&self) -> &str {
        &self.lookup_hash
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn display_key(&self) -> &str {
        &self.display_key
    }

    pub fn label(&self) -> ApiKeyLabel {
        self.label
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_expired(&self) -> bool {
        self.label == ApiKeyLabel::Expired
    }

    /// Whether a request from `ip` is allowed under the pinning policy.
    /// A pinned key rejects requests that carry no IP at all.
    pub fn ip_allowed(&self, ip: Option<&str>) -> bool {
        match self.ip.as_deref() {
            Some(pinned) => ip == Some(pinned),
            None => true,
        }
    }

    // Mutators

    /// Overwrite the remaining quota. Reaching zero expires the key; an
    /// expired key is never reactivated.
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit;

        if limit == 0 {
            self.label = ApiKeyLabel::Expired;
        }

        self.touch();
    }

    /// Pin the key to the first client IP seen. Returns true if the IP
    /// was stored by this call.
    pub fn pin_ip(&mut self, ip: impl Into<String>) -> bool {
        if self.ip.is_some() {
            return false;
        }

        self.ip = Some(ip.into());
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

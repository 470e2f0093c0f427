//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_user_id, UserValidationError};
use crate::domain::api_key::ApiKeyId;
use crate::domain::storage::{StorageEntity, StorageKey};

/// User identifier - alphanumeric + hyphens, max 50 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        validate_user_id(&id)?;
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

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for UserId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageEntity for User {
    type Key = UserId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Dashboard account that owns API keys
///
/// The password hash is persisted with the entity; API responses must go
/// through a dedicated view type so it never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    username: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    password_hash: String,
    /// Owned keys in issuance order
    #[serde(default)]
    api_key_ids: Vec<ApiKeyId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            name: name.into(),
            username: username.into(),
            email: email.into(),
            image_url: None,
            password_hash: password_hash.into(),
            api_key_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style setter for the avatar URL
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    // Getters

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn api_key_ids(&self) -> &[ApiKeyId] {
        &self.api_key_ids
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the key belongs to this user
    pub fn owns_key(&self, id: &ApiKeyId) -> bool {
        self.api_key_ids.contains(id)
    }

    // Mutators

    /// Append a newly issued key
    pub fn add_api_key(&mut self, id: ApiKeyId) {
        if !self.owns_key(&id) {
            self.api_key_ids.push(id);
            self.touch();
        }
    }

    /// Remove a key from the owned list, returns true if it was present
    pub fn remove_api_key(&mut self, id: &ApiKeyId) -> bool {
        let before = self.api_key_ids.len();
        self.api_key_ids.retain(|owned| owned != id);
        let removed = self.api_key_ids.len() != before;

        if removed {
            self.touch();
        }

        removed
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

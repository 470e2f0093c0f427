//! API Key domain
//!
//! This module provides domain types and traits for CLI API keys:
//! identifiers, quota labels, IP pinning, validation, and repository traits.

mod entity;
mod repository;
mod validation;

pub use entity::{ApiKey, ApiKeyId, ApiKeyLabel};
pub use repository::ApiKeyRepository;
pub use validation::{
    validate_api_key_id, validate_display_key, validate_limit, ApiKeyValidationError,
};

#[cfg(test)]
pub use repository::mock::MockApiKeyRepository;

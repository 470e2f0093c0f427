//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod error;
pub mod storage;
pub mod usage;
pub mod user;

pub use api_key::{
    ApiKey, ApiKeyId, ApiKeyLabel, ApiKeyRepository, ApiKeyValidationError,
};
pub use error::DomainError;
pub use storage::{Storage, StorageEntity, StorageKey};
pub use usage::{CommitEvent, CommitStatus, Usage, UsageId, UsageRepository};
pub use user::{User, UserId, UserRepository, UserValidationError};

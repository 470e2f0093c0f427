//! API Key infrastructure implementations
//!
//! Secret generation, storage-backed persistence, secret resolution and the
//! key lifecycle service.

mod generator;
mod resolver;
mod service;
mod storage_repository;

pub use generator::{ApiKeyGenerator, GeneratedApiKey};
pub use resolver::KeyResolver;
pub use service::{ApiKeyService, IssuedApiKey, VerifiedApiKey};
pub use storage_repository::StorageApiKeyRepository;

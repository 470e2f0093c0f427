//! Resolves a presented plaintext secret to its stored API key

use std::sync::Arc;

use tracing::debug;

use crate::domain::api_key::{ApiKey, ApiKeyRepository};
use crate::domain::DomainError;

use super::generator::ApiKeyGenerator;

/// Finds the stored key for a plaintext secret.
///
/// Candidates are narrowed by the SHA-256 lookup digest, then confirmed
/// against the salted hash. Plaintext secrets are never stored or compared
/// directly.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    repository: Arc<dyn ApiKeyRepository>,
    generator: ApiKeyGenerator,
}

impl KeyResolver {
    pub fn new(repository: Arc<dyn ApiKeyRepository>, generator: ApiKeyGenerator) -> Self {
        Self {
            repository,
            generator,
        }
    }

    /// The generator used to derive and confirm secrets
    pub fn generator(&self) -> &ApiKeyGenerator {
        &self.generator
    }

    /// Resolve a secret to its key, or `None` when nothing matches
    pub async fn resolve(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        if secret.is_empty() {
            return Ok(None);
        }

        let lookup_hash = ApiKeyGenerator::lookup_hash(secret);
        let candidates = self.repository.find_by_lookup_hash(&lookup_hash).await?;

        let found = candidates
            .into_iter()
            .find(|candidate| self.generator.verify(secret, candidate));

        if found.is_none() {
            debug!("No stored key matches the presented secret");
        }

        Ok(found)
    }
}

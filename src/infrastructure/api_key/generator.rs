//! API Key generation
//!
//! Generates 256-bit random secrets and derives the two values stored in
//! their place: a deterministic SHA-256 lookup digest and a salted Argon2
//! hash.

use std::sync::Arc;

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::api_key::ApiKey;
use crate::domain::DomainError;
use crate::infrastructure::auth::SecretHasher;

/// Number of random bytes in a secret; hex encoding doubles the length
const SECRET_BYTES: usize = 32;

/// Result of generating a new API key
#[derive(Clone)]
pub struct GeneratedApiKey {
    /// The plaintext secret (only shown once at creation)
    pub secret: String,
    /// Deterministic digest used to find the stored key
    pub lookup_hash: String,
    /// Salted hash confirming the match
    pub secret_hash: String,
}

impl std::fmt::Debug for GeneratedApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedApiKey")
            .field("secret", &"[hidden]")
            .field("lookup_hash", &self.lookup_hash)
            .finish()
    }
}

/// Generator and verifier for API key secrets
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    hasher: Arc<dyn SecretHasher>,
}

impl ApiKeyGenerator {
    /// Create a generator hashing secrets with `hasher`
    pub fn new(hasher: Arc<dyn SecretHasher>) -> Self {
        Self { hasher }
    }

    /// Generate a new secret and its stored forms
    pub fn generate(&self) -> Result<GeneratedApiKey, DomainError> {
        let mut random_bytes = [0u8; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        self.from_secret(&hex::encode(random_bytes))
    }

    /// Derive the stored forms of a known secret
    pub fn from_secret(&self, secret: &str) -> Result<GeneratedApiKey, DomainError> {
        Ok(GeneratedApiKey {
            secret: secret.to_string(),
            lookup_hash: Self::lookup_hash(secret),
            secret_hash: self.hasher.hash(secret)?,
        })
    }

    /// Deterministic digest of a presented secret
    pub fn lookup_hash(secret: &str) -> String {
        hex::encode(Sha256::digest(secret.as_bytes()))
    }

    /// Check a presented secret against a stored key
    pub fn verify(&self, secret: &str, key: &ApiKey) -> bool {
        constant_time_compare(&Self::lookup_hash(secret), key.lookup_hash())
            && self.hasher.verify(secret, key.secret_hash())
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

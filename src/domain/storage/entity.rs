//! Storage entity traits and types

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be used as storage keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for storage backends that require string keys
    fn as_str(&self) -> &str;
}

/// Trait for types that can be stored
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;
}

/// Returns true when the serialized form of `entity` has a top-level string
/// field `field` equal to `value`
pub fn field_matches<E: Serialize>(entity: &E, field: &str, value: &str) -> bool {
    serde_json::to_value(entity)
        .ok()
        .and_then(|json| {
            json.get(field)
                .and_then(|v| v.as_str())
                .map(|s| s == value)
        })
        .unwrap_or(false)
}

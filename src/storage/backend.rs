//! # Key-Value Store Trait

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::errors::StorageResult;

/// Matched entries from a read, keyed without namespace
pub type Entries = BTreeMap<String, Value>;

/// The wildcard character accepted by `read` and `delete`
pub const WILDCARD: char = '*';

/// Returns true if the key contains a wildcard
pub fn has_wildcard(key: &str) -> bool {
    key.contains(WILDCARD)
}

/// Synchronous CRUD contract consumed by the engine.
///
/// Implementations are shared behind an `Arc` and mutate through `&self`.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Store a new value. Fails if the key exists, contains `*`, or the value is null.
    fn create(&self, key: &str, value: &Value) -> StorageResult<()>;

    /// Exact lookup (0 or 1 entries) or wildcard lookup (all matches).
    fn read(&self, key: &str) -> StorageResult<Entries>;

    /// Replace an existing value. Fails if the key is missing or contains `*`.
    fn update(&self, key: &str, value: &Value) -> StorageResult<()>;

    /// Remove every match. Matching nothing is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

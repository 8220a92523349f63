//! # In-Memory Backend
//!
//! `MemoryMedium` is the physical medium: one flat map of full keys shared by
//! every store opened on it. `NamespacedStore` is the CRUD view of a single
//! namespace; every key it touches is stored as `<namespace>/<key>`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::backend::{has_wildcard, Entries, KeyValueStore, WILDCARD};
use super::errors::{StorageError, StorageResult};
use super::wildcard::WildcardPattern;
use crate::observability::{log_event_with_fields, Event};

/// Shared physical medium. Clones refer to the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_guard(&self) -> StorageResult<RwLockReadGuard<'_, BTreeMap<String, Value>>> {
        self.entries.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write_guard(&self) -> StorageResult<RwLockWriteGuard<'_, BTreeMap<String, Value>>> {
        self.entries.write().map_err(|_| StorageError::LockPoisoned)
    }

    /// Number of physical keys across all namespaces
    pub fn len(&self) -> usize {
        self.read_guard().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All physical keys, sorted
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.read_guard()?.keys().cloned().collect())
    }

    /// Opens a namespaced store on this medium
    pub fn namespace(&self, namespace: &str) -> StorageResult<NamespacedStore> {
        NamespacedStore::new(self.clone(), namespace)
    }

    /// Writes the whole medium to a JSON snapshot file
    pub fn save_to(&self, path: &Path) -> StorageResult<()> {
        let content = {
            let entries = self.read_guard()?;
            serde_json::to_string_pretty(&*entries)
                .map_err(|e| StorageError::Io(format!("failed to serialize medium: {}", e)))?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }
        fs::write(path, content).map_err(|e| StorageError::Io(e.to_string()))?;

        let keys = self.len().to_string();
        let location = path.display().to_string();
        log_event_with_fields(Event::StoreSaved, &[("keys", keys.as_str()), ("path", location.as_str())]);
        Ok(())
    }

    /// Loads a medium from a JSON snapshot file.
    ///
    /// A missing file yields an empty medium.
    pub fn load_from(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| StorageError::Io(e.to_string()))?;
        let entries: BTreeMap<String, Value> = serde_json::from_str(&content)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e)))?;

        let keys = entries.len().to_string();
        let location = path.display().to_string();
        log_event_with_fields(Event::StoreLoaded, &[("keys", keys.as_str()), ("path", location.as_str())]);

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
        })
    }
}

/// CRUD view over one namespace of a `MemoryMedium`
#[derive(Debug, Clone)]
pub struct NamespacedStore {
    namespace: String,
    medium: MemoryMedium,
}

impl NamespacedStore {
    /// Opens `namespace` on `medium`.
    ///
    /// The namespace must be non-empty and free of `*` and `/`.
    pub fn new(medium: MemoryMedium, namespace: &str) -> StorageResult<Self> {
        if namespace.is_empty() || has_wildcard(namespace) || namespace.contains('/') {
            return Err(StorageError::InvalidNamespace(namespace.to_string()));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            medium,
        })
    }

    /// Opens `namespace` on a fresh private medium
    pub fn in_memory(namespace: &str) -> StorageResult<Self> {
        Self::new(MemoryMedium::new(), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn medium(&self) -> &MemoryMedium {
        &self.medium
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }

    fn strip_namespace<'k>(&self, full_key: &'k str) -> Option<&'k str> {
        full_key
            .strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }

    fn check_key(key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        Ok(())
    }

    fn check_writable(key: &str, value: &Value) -> StorageResult<()> {
        Self::check_key(key)?;
        if key.contains(WILDCARD) {
            return Err(StorageError::WildcardNotAllowed(key.to_string()));
        }
        if value.is_null() {
            return Err(StorageError::MissingValue(key.to_string()));
        }
        Ok(())
    }

    fn matching_keys(&self, entries: &BTreeMap<String, Value>, key: &str) -> StorageResult<Vec<String>> {
        if has_wildcard(key) {
            let pattern = WildcardPattern::compile(&self.full_key(key))?;
            Ok(entries.keys().filter(|k| pattern.matches(k)).cloned().collect())
        } else {
            let full_key = self.full_key(key);
            Ok(entries.contains_key(&full_key).then_some(full_key).into_iter().collect())
        }
    }
}

impl KeyValueStore for NamespacedStore {
    fn create(&self, key: &str, value: &Value) -> StorageResult<()> {
        Self::check_writable(key, value)?;

        let full_key = self.full_key(key);
        let mut entries = self.medium.write_guard()?;
        if entries.contains_key(&full_key) {
            return Err(StorageError::KeyExists(key.to_string()));
        }
        entries.insert(full_key, value.clone());
        Ok(())
    }

    fn read(&self, key: &str) -> StorageResult<Entries> {
        Self::check_key(key)?;

        let entries = self.medium.read_guard()?;
        let results = self
            .matching_keys(&entries, key)?
            .into_iter()
            .filter_map(|full_key| {
                let value = entries.get(&full_key)?.clone();
                let short = self.strip_namespace(&full_key)?.to_string();
                Some((short, value))
            })
            .collect();
        Ok(results)
    }

    fn update(&self, key: &str, value: &Value) -> StorageResult<()> {
        Self::check_writable(key, value)?;

        let full_key = self.full_key(key);
        let mut entries = self.medium.write_guard()?;
        match entries.get_mut(&full_key) {
            Some(slot) => {
                *slot = value.clone();
                Ok(())
            }
            None => Err(StorageError::KeyNotFound(key.to_string())),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        Self::check_key(key)?;

        let mut entries = self.medium.write_guard()?;
        for full_key in self.matching_keys(&entries, key)? {
            entries.remove(&full_key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> NamespacedStore {
        NamespacedStore::in_memory("test").unwrap()
    }

    #[test]
    fn test_namespace_rules() {
        assert!(matches!(NamespacedStore::in_memory(""), Err(StorageError::InvalidNamespace(_))));
        assert!(matches!(NamespacedStore::in_memory("a*"), Err(StorageError::InvalidNamespace(_))));
        assert!(matches!(NamespacedStore::in_memory("a/b"), Err(StorageError::InvalidNamespace(_))));
        assert!(NamespacedStore::in_memory("ok").is_ok());
    }

    #[test]
    fn test_create_then_read() {
        let s = store();
        s.create("users/001", &json!({"name": "Bob"})).unwrap();

        let rows = s.read("users/001").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["users/001"], json!({"name": "Bob"}));
        assert_eq!(s.medium().keys().unwrap(), vec!["test/users/001".to_string()]);
    }

    #[test]
    fn test_create_rejections() {
        let s = store();
        s.create("k", &json!(1)).unwrap();

        assert_eq!(s.create("k", &json!(2)), Err(StorageError::KeyExists("k".into())));
        assert!(matches!(s.create("a*", &json!(1)), Err(StorageError::WildcardNotAllowed(_))));
        assert!(matches!(s.create("n", &Value::Null), Err(StorageError::MissingValue(_))));
        assert_eq!(s.create("", &json!(1)), Err(StorageError::EmptyKey));
        assert_eq!(s.read("k").unwrap()["k"], json!(1));
    }

    #[test]
    fn test_read_missing_is_empty() {
        let s = store();
        assert!(s.read("nothing/here").unwrap().is_empty());
    }

    #[test]
    fn test_wildcard_read_strips_namespace() {
        let s = store();
        s.create("users/001", &json!({"n": 1})).unwrap();
        s.create("users/002", &json!({"n": 2})).unwrap();
        s.create("projects/001", &json!({"n": 3})).unwrap();

        let users = s.read("users/*").unwrap();
        assert_eq!(users.keys().collect::<Vec<_>>(), vec!["users/001", "users/002"]);

        let ones = s.read("*/001").unwrap();
        assert_eq!(ones.keys().collect::<Vec<_>>(), vec!["projects/001", "users/001"]);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let medium = MemoryMedium::new();
        let a = medium.namespace("a").unwrap();
        let b = medium.namespace("b").unwrap();

        a.create("users/1", &json!("from a")).unwrap();
        b.create("users/1", &json!("from b")).unwrap();

        assert_eq!(a.read("*").unwrap().len(), 1);
        assert_eq!(b.read("users/1").unwrap()["users/1"], json!("from b"));

        a.delete("*").unwrap();
        assert!(a.read("*").unwrap().is_empty());
        assert_eq!(b.read("*").unwrap().len(), 1);
        assert_eq!(medium.len(), 1);
    }

    #[test]
    fn test_update() {
        let s = store();
        assert_eq!(s.update("k", &json!(1)), Err(StorageError::KeyNotFound("k".into())));

        s.create("k", &json!(1)).unwrap();
        s.update("k", &json!(2)).unwrap();
        assert_eq!(s.read("k").unwrap()["k"], json!(2));

        assert!(matches!(s.update("*", &json!(3)), Err(StorageError::WildcardNotAllowed(_))));
    }

    #[test]
    fn test_delete_exact_wildcard_and_missing() {
        let s = store();
        s.create("users/1", &json!(1)).unwrap();
        s.create("users/2", &json!(2)).unwrap();
        s.create("projects/1", &json!(3)).unwrap();

        s.delete("users/1").unwrap();
        s.delete("users/1").unwrap();
        assert_eq!(s.read("*").unwrap().len(), 2);

        s.delete("users/*").unwrap();
        assert_eq!(s.read("*").unwrap().keys().collect::<Vec<_>>(), vec!["projects/1"]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let s = store();
        s.create("users/1", &json!({"name": "Ann"})).unwrap();
        s.medium().save_to(&path).unwrap();

        let medium = MemoryMedium::load_from(&path).unwrap();
        let reopened = medium.namespace("test").unwrap();
        assert_eq!(reopened.read("users/1").unwrap()["users/1"], json!({"name": "Ann"}));
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("none.json");
        assert!(MemoryMedium::load_from(&missing).unwrap().is_empty());

        let corrupt = dir.path().join("bad.json");
        fs::write(&corrupt, "{not json").unwrap();
        assert!(matches!(MemoryMedium::load_from(&corrupt), Err(StorageError::Corrupt(_))));
    }
}

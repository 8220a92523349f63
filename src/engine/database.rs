//! The CRUD engine
//!
//! Every multi-row mutation is checked in full before the first write:
//! fixup and validation for every row, id uniqueness inside the batch, and
//! existence (or absence) of every target key. A rejected batch leaves the
//! store untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::keys::{is_valid_id, parse_row_key, parse_table_ref, parse_update_key, storage_key, UpdateKey};
use crate::errors::{ArgsError, ArgsErrorKind, CruddyError, CruddyResult};
use crate::observability::{log_event_with_fields, Event};
use crate::randoms::Randoms;
use crate::schema::{compile, Row, Schema, SchemaDecl, SchemaValidator, ID_FIELD};
use crate::storage::{has_wildcard, Entries, KeyValueStore, StorageError};

/// Result of an update, shaped like its input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Updated {
    /// `table/id`
    Row(Row),
    /// `table/*` with an array payload
    Rows(Vec<Row>),
    /// `table/*` with an object payload: label to row
    Keyed(BTreeMap<String, Row>),
}

impl Updated {
    pub fn len(&self) -> usize {
        match self {
            Updated::Row(_) => 1,
            Updated::Rows(rows) => rows.len(),
            Updated::Keyed(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_value(self) -> Value {
        match self {
            Updated::Row(row) => Value::Object(row),
            Updated::Rows(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
            Updated::Keyed(rows) => Value::Object(
                rows.into_iter()
                    .map(|(label, row)| (label, Value::Object(row)))
                    .collect(),
            ),
        }
    }
}

/// Schema-checked CRUD over a shared key-value store
#[derive(Debug, Clone)]
pub struct CruddyDb {
    validator: SchemaValidator,
    storage: Arc<dyn KeyValueStore>,
}

impl CruddyDb {
    /// Compiles `decl` and binds it to `storage`
    pub fn new(decl: &SchemaDecl, storage: Arc<dyn KeyValueStore>) -> Result<Self, ArgsError> {
        Self::with_randoms(decl, storage, Randoms::default())
    }

    /// Like `new`, generating ids from `randoms`
    pub fn with_randoms(
        decl: &SchemaDecl,
        storage: Arc<dyn KeyValueStore>,
        randoms: Randoms,
    ) -> Result<Self, ArgsError> {
        let schema = compile(decl)?;
        Ok(Self::from_schema(schema, storage, randoms))
    }

    pub fn from_schema(schema: Schema, storage: Arc<dyn KeyValueStore>, randoms: Randoms) -> Self {
        Self {
            validator: SchemaValidator::new(schema, storage.clone(), randoms),
            storage,
        }
    }

    pub fn schema(&self) -> &Schema {
        self.validator.schema()
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// Creates one row (`table`) or many (`table/*`, payload is an array).
    ///
    /// Returns the fixed-up rows in input order.
    ///
    /// # Errors
    ///
    /// - `ArgsError` for a malformed target, an invalid row, a row left
    ///   without id, or two rows sharing an id
    /// - `StorageError::KeyExists` if any target row already exists
    pub fn create(&self, table_ref: &str, payload: Value) -> CruddyResult<Vec<Row>> {
        let (table, bulk) = parse_table_ref(table_ref)?;
        self.validator.table(table)?;

        let rows = match payload {
            Value::Null => return Err(ArgsError::missing_value("rows").into()),
            Value::Array(items) if bulk => items,
            _ if bulk => {
                return Err(ArgsError::invalid_argument(format!(
                    "\"{}\" expects an array of rows",
                    table_ref
                ))
                .into())
            }
            row => vec![row],
        };

        let mut fixed = Vec::with_capacity(rows.len());
        for row in rows {
            let row = self
                .validator
                .fixup(table, row)
                .map_err(|e| rejected(table, e))?;
            fixed.push(row);
        }

        let mut seen = BTreeSet::new();
        let mut keys = Vec::with_capacity(fixed.len());
        for row in &fixed {
            let id = row_id(row).ok_or_else(|| {
                rejected(
                    table,
                    ArgsError::new(ArgsErrorKind::MissingValue, "row must have an \"id\"").into(),
                )
            })?;
            if !is_valid_id(id) {
                return Err(rejected(table, unaddressable_id(id).into()));
            }
            if !seen.insert(id) {
                return Err(rejected(table, ArgsError::duplicate_id(table, id).into()));
            }

            let key = storage_key(table, id);
            if !self.storage.read(&key)?.is_empty() {
                return Err(rejected(table, StorageError::KeyExists(key).into()));
            }
            keys.push(key);
        }

        for (key, row) in keys.iter().zip(&fixed) {
            self.storage.create(key, &Value::Object(row.clone()))?;
        }

        let count = fixed.len().to_string();
        log_event_with_fields(Event::RowsCreated, &[("table", table), ("rows", count.as_str())]);
        Ok(fixed)
    }

    /// Reads `table/id[,id]` or a wildcard key.
    ///
    /// Ids with no row are absent from the result.
    pub fn read(&self, key: &str) -> CruddyResult<Entries> {
        let entries = if has_wildcard(key) {
            self.storage.read(key)?
        } else {
            let row_key = parse_row_key(key)?;
            let mut entries = Entries::new();
            for storage_key in row_key.storage_keys() {
                entries.extend(self.storage.read(&storage_key)?);
            }
            entries
        };

        let count = entries.len().to_string();
        log_event_with_fields(Event::RowsRead, &[("key", key), ("rows", count.as_str())]);
        Ok(entries)
    }

    /// Updates `table/id` with a row, or `table/*` with an array or object of
    /// rows.
    ///
    /// A single row without `id` takes the id from the key. Ids never change.
    pub fn update(&self, key: &str, payload: Value) -> CruddyResult<Updated> {
        match parse_update_key(key)? {
            UpdateKey::Single { table, id } => self.update_one(&table, &id, payload).map(Updated::Row),
            UpdateKey::Bulk { table } => self.update_bulk(&table, payload),
        }
    }

    fn update_one(&self, table: &str, id: &str, mut payload: Value) -> CruddyResult<Row> {
        self.validator.table(table)?;

        if let Value::Object(obj) = &mut payload {
            let missing = match obj.get(ID_FIELD) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) if s == id => false,
                Some(Value::String(s)) => return Err(ArgsError::id_mismatch(id, s).into()),
                Some(other) => return Err(ArgsError::id_mismatch(id, &other.to_string()).into()),
            };
            if missing {
                obj.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            }
        }

        let row = self.validator.fixup(table, payload)?;
        let key = storage_key(table, id);
        self.storage.update(&key, &Value::Object(row.clone()))?;

        log_event_with_fields(Event::RowsUpdated, &[("table", table), ("rows", "1")]);
        Ok(row)
    }

    fn update_bulk(&self, table: &str, payload: Value) -> CruddyResult<Updated> {
        self.validator.table(table)?;

        let (labels, rows): (Option<Vec<String>>, Vec<Value>) = match payload {
            Value::Array(rows) => (None, rows),
            Value::Object(keyed) => {
                let (labels, rows) = keyed.into_iter().unzip();
                (Some(labels), rows)
            }
            Value::Null => return Err(ArgsError::missing_value("rows").into()),
            _ => {
                return Err(ArgsError::invalid_argument(format!(
                    "\"{}/*\" expects an array or object of rows",
                    table
                ))
                .into())
            }
        };

        for row in &rows {
            if !row.is_object() || !self.validator.test(table, row)? {
                return Err(rejected(table, ArgsError::rows_invalid().into()));
            }
        }

        let mut seen = BTreeSet::new();
        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = row
                .get(ID_FIELD)
                .and_then(Value::as_str)
                .filter(|id| is_valid_id(id))
                .ok_or_else(|| {
                    rejected(
                        table,
                        ArgsError::new(
                            ArgsErrorKind::MissingValue,
                            "every row of a bulk update must carry its \"id\"",
                        )
                        .into(),
                    )
                })?;
            if !seen.insert(id) {
                return Err(rejected(table, ArgsError::duplicate_id(table, id).into()));
            }

            let key = storage_key(table, id);
            if self.storage.read(&key)?.is_empty() {
                return Err(rejected(table, StorageError::KeyNotFound(key).into()));
            }
            ids.push(id.to_string());
        }

        let mut fixed = Vec::with_capacity(rows.len());
        for (row, id) in rows.into_iter().zip(&ids) {
            let row = self.validator.fixup(table, row)?;
            match row_id(&row) {
                Some(fixed_id) if fixed_id == id => fixed.push(row),
                other => return Err(ArgsError::id_mismatch(id, other.unwrap_or("")).into()),
            }
        }

        for (row, id) in fixed.iter().zip(&ids) {
            self.storage.update(&storage_key(table, id), &Value::Object(row.clone()))?;
        }

        let count = fixed.len().to_string();
        log_event_with_fields(Event::RowsUpdated, &[("table", table), ("rows", count.as_str())]);

        Ok(match labels {
            None => Updated::Rows(fixed),
            Some(labels) => Updated::Keyed(labels.into_iter().zip(fixed).collect()),
        })
    }

    /// Deletes `table/id[,id]` or every match of a wildcard key.
    ///
    /// Missing rows are skipped.
    pub fn delete(&self, key: &str) -> CruddyResult<()> {
        if has_wildcard(key) {
            self.storage.delete(key)?;
        } else {
            let row_key = parse_row_key(key)?;
            for storage_key in row_key.storage_keys() {
                self.storage.delete(&storage_key)?;
            }
        }

        log_event_with_fields(Event::RowsDeleted, &[("key", key)]);
        Ok(())
    }
}

/// Non-empty string id of a row
fn row_id(row: &Row) -> Option<&str> {
    row.get(ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

fn unaddressable_id(id: &str) -> ArgsError {
    ArgsError::new(
        ArgsErrorKind::MalformedKey,
        format!("id \"{}\" cannot be addressed by a row key", id),
    )
}

fn rejected(table: &str, err: CruddyError) -> CruddyError {
    let reason = err.to_string();
    log_event_with_fields(
        Event::BatchRejected,
        &[("table", table), ("code", err.code()), ("reason", reason.as_str())],
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::randoms::FixedSequence;
    use crate::storage::NamespacedStore;
    use serde_json::json;

    fn db_with(decl: SchemaDecl, randoms: Randoms) -> (Arc<NamespacedStore>, CruddyDb) {
        let store = Arc::new(NamespacedStore::in_memory("test_engine").unwrap());
        let db = CruddyDb::with_randoms(&decl, store.clone(), randoms).unwrap();
        (store, db)
    }

    fn users_db() -> (Arc<NamespacedStore>, CruddyDb) {
        db_with(
            SchemaDecl::new().table("users", [("name", "string")]),
            Randoms::seeded(7),
        )
    }

    #[test]
    fn test_create_single_returns_sequence() {
        let (_s, db) = users_db();
        let rows = db.create("users", json!({"name": "Bob"})).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Bob"));
        assert_eq!(rows[0]["id"].as_str().unwrap().len(), 5);
    }

    #[test]
    fn test_create_keeps_explicit_id() {
        let (store, db) = users_db();
        db.create("users", json!({"id": "bob01", "name": "Bob"})).unwrap();
        assert_eq!(store.read("users/bob01").unwrap().len(), 1);
    }

    #[test]
    fn test_create_bulk_requires_array() {
        let (_s, db) = users_db();
        let err = db.create("users/*", json!({"name": "Bob"})).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::InvalidArgument);

        let rows = db
            .create("users/*", json!([{"name": "Ann"}, {"name": "Bob"}]))
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_create_unknown_table_and_missing_value() {
        let (_s, db) = users_db();
        let err = db.create("ghosts", json!({})).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::UnknownTable);

        let err = db.create("users", Value::Null).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::MissingValue);
    }

    #[test]
    fn test_create_generated_id_collision_writes_nothing() {
        let (store, db) = db_with(
            SchemaDecl::new().table("users", [("name", "string")]),
            Randoms::new(FixedSequence::constant(0.0)),
        );
        let err = db
            .create("users/*", json!([{"name": "Ann"}, {"name": "Bob"}]))
            .unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::DuplicateId);
        assert!(store.medium().is_empty());
    }

    #[test]
    fn test_create_existing_key_writes_nothing() {
        let (store, db) = users_db();
        db.create("users", json!({"id": "a", "name": "Ann"})).unwrap();

        let err = db
            .create("users/*", json!([{"id": "b", "name": "Bob"}, {"id": "a", "name": "Ann"}]))
            .unwrap_err();
        assert!(matches!(err, CruddyError::Storage(StorageError::KeyExists(_))));
        assert!(store.read("users/b").unwrap().is_empty());
    }

    #[test]
    fn test_create_unaddressable_id_rejected() {
        let (store, db) = db_with(
            SchemaDecl::new().table("users", [("id", "string")]),
            Randoms::seeded(1),
        );
        let err = db.create("users", json!({"id": "a/b"})).unwrap_err();
        assert!(err.is_args());
        assert!(store.medium().is_empty());
    }

    #[test]
    fn test_read_merges_ids_and_skips_missing() {
        let (_s, db) = users_db();
        db.create("users/*", json!([{"id": "a", "name": "Ann"}, {"id": "b", "name": "Bob"}]))
            .unwrap();

        let rows = db.read("users/a, b, zzz").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows["users/b"]["name"], json!("Bob"));

        assert!(db.read("users").is_err());
    }

    #[test]
    fn test_update_single_defaults_id() {
        let (store, db) = users_db();
        db.create("users", json!({"id": "a", "name": "Ann"})).unwrap();

        let updated = db.update("users/a", json!({"name": "Anna"})).unwrap();
        assert_eq!(updated, Updated::Row(json!({"id": "a", "name": "Anna"}).as_object().unwrap().clone()));
        assert_eq!(store.read("users/a").unwrap()["users/a"]["name"], json!("Anna"));
    }

    #[test]
    fn test_update_id_mismatch() {
        let (store, db) = users_db();
        db.create("users", json!({"id": "5", "name": "Ann"})).unwrap();

        let err = db.update("users/5", json!({"id": "6", "name": "X"})).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::IdMismatch);
        assert_eq!(store.read("users/5").unwrap()["users/5"]["name"], json!("Ann"));

        let err = db.update("users/5", json!({"id": 5, "name": "X"})).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::IdMismatch);
    }

    #[test]
    fn test_update_empty_id_is_not_defaulted() {
        let (store, db) = users_db();
        db.create("users", json!({"id": "abc", "name": "Ann"})).unwrap();

        let err = db.update("users/abc", json!({"id": "", "name": "B"})).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::IdMismatch);
        assert_eq!(store.read("users/abc").unwrap()["users/abc"]["name"], json!("Ann"));

        let updated = db.update("users/abc", json!({"id": null, "name": "B"})).unwrap();
        assert!(matches!(updated, Updated::Row(ref row) if row["id"] == json!("abc")));
    }

    #[test]
    fn test_update_missing_row() {
        let (_s, db) = users_db();
        let err = db.update("users/nope", json!({"name": "X"})).unwrap_err();
        assert!(matches!(err, CruddyError::Storage(StorageError::KeyNotFound(_))));
    }

    #[test]
    fn test_update_bulk_all_or_nothing() {
        let (store, db) = users_db();
        db.create("users/*", json!([{"id": "a", "name": "Ann"}, {"id": "b", "name": "Bob"}]))
            .unwrap();

        let err = db
            .update("users/*", json!([{"id": "a", "name": "A2"}, {"id": "b", "name": 3}]))
            .unwrap_err();
        assert_eq!(err.as_args().unwrap().message(), "one or more rows are invalid");
        assert_eq!(store.read("users/a").unwrap()["users/a"]["name"], json!("Ann"));

        let err = db
            .update("users/*", json!([{"id": "a", "name": "A2"}, {"id": "c", "name": "C"}]))
            .unwrap_err();
        assert!(matches!(err, CruddyError::Storage(StorageError::KeyNotFound(_))));
        assert_eq!(store.read("users/a").unwrap()["users/a"]["name"], json!("Ann"));

        let err = db.update("users/*", json!([{"name": "no id"}])).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::MissingValue);

        for payload in [json!([{"id": "a", "name": "A2"}, null]), json!([7])] {
            let err = db.update("users/*", payload).unwrap_err();
            assert_eq!(err.as_args().unwrap().message(), "one or more rows are invalid");
        }
        assert_eq!(store.read("users/a").unwrap()["users/a"]["name"], json!("Ann"));
    }

    #[test]
    fn test_update_bulk_keeps_shape() {
        let (_s, db) = users_db();
        db.create("users/*", json!([{"id": "a", "name": "Ann"}, {"id": "b", "name": "Bob"}]))
            .unwrap();

        let updated = db
            .update("users/*", json!([{"id": "a", "name": "A2"}, {"id": "b", "name": "B2"}]))
            .unwrap();
        assert!(matches!(updated, Updated::Rows(ref rows) if rows.len() == 2));

        let updated = db
            .update("users/*", json!({"users/a": {"id": "a", "name": "A3"}}))
            .unwrap();
        assert_eq!(
            updated.into_value(),
            json!({"users/a": {"id": "a", "name": "A3"}})
        );
    }

    #[test]
    fn test_delete_ids_and_wildcards() {
        let (_s, db) = users_db();
        db.create(
            "users/*",
            json!([{"id": "a", "name": "A"}, {"id": "b", "name": "B"}, {"id": "c", "name": "C"}]),
        )
        .unwrap();

        db.delete("users/a,b,zzz").unwrap();
        assert_eq!(db.read("users/*").unwrap().len(), 1);

        db.delete("users/*").unwrap();
        assert!(db.read("users/*").unwrap().is_empty());
        assert!(db.delete("users").is_err());
    }
}

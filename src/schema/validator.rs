//! Row validation and fixup
//!
//! Validation semantics:
//! - The row must be a JSON object
//! - No undeclared fields exist (closed world)
//! - Every declared field passes its test, even when absent
//! - Auto-generated strings accept a missing, null or empty value
//! - References hold the id of a row the store holds right now
//!
//! Fixup validates first, then fills auto-generated strings (recursing into
//! arrays). Nothing else is changed.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::types::{FieldType, Schema, StringRules, Table};
use crate::errors::{ArgsError, CruddyResult, ValidationDetails};
use crate::randoms::Randoms;
use crate::storage::{has_wildcard, KeyValueStore};

/// One record: field name to value
pub type Row = Map<String, Value>;

/// Validates and fixes up rows against a compiled schema.
///
/// Holds the storage handle used for reference checks.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Arc<Schema>,
    storage: Arc<dyn KeyValueStore>,
    randoms: Randoms,
}

impl SchemaValidator {
    pub fn new(schema: Schema, storage: Arc<dyn KeyValueStore>, randoms: Randoms) -> Self {
        Self {
            schema: Arc::new(schema),
            storage,
            randoms,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Looks up a table, failing with `UnknownTable`
    pub fn table(&self, name: &str) -> Result<&Table, ArgsError> {
        self.schema
            .table(name)
            .ok_or_else(|| ArgsError::unknown_table(name))
    }

    /// Validates a row, reporting the first violation.
    ///
    /// # Errors
    ///
    /// - `UnknownTable` / `MissingValue` for unusable arguments
    /// - `ValidationFailed` with details when the row does not conform
    /// - `StorageError` if a reference lookup fails
    pub fn validate(&self, table_name: &str, row: &Value) -> CruddyResult<()> {
        let table = self.table(table_name)?;
        if row.is_null() {
            return Err(ArgsError::missing_value("value").into());
        }

        let obj = row.as_object().ok_or_else(|| {
            ArgsError::validation_failed(
                table_name,
                ValidationDetails::new("$row", "object", json_type_name(Some(row))),
            )
        })?;

        if let Some(extra) = obj.keys().find(|k| !table.fields.contains_key(*k)) {
            return Err(ArgsError::validation_failed(table_name, ValidationDetails::undeclared_field(extra)).into());
        }

        for (name, field_type) in &table.fields {
            self.check_value(table_name, name, field_type, obj.get(name))?;
        }
        Ok(())
    }

    /// Returns whether the row conforms.
    ///
    /// Unknown tables, missing rows and storage failures are still errors.
    pub fn test(&self, table_name: &str, row: &Value) -> CruddyResult<bool> {
        match self.validate(table_name, row) {
            Ok(()) => Ok(true),
            Err(e) if e.is_validation_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Validates the row, then fills auto-generated fields
    pub fn fixup(&self, table_name: &str, row: Value) -> CruddyResult<Row> {
        self.validate(table_name, &row)?;
        let table = self.table(table_name)?;

        let Value::Object(mut obj) = row else {
            return Err(ArgsError::missing_value("value").into());
        };

        for (name, field_type) in &table.fields {
            let current = obj.remove(name);
            if let Some(fixed) = self.fixup_value(field_type, current)? {
                obj.insert(name.clone(), fixed);
            }
        }
        Ok(obj)
    }

    fn check_value(
        &self,
        table_name: &str,
        path: &str,
        field_type: &FieldType,
        value: Option<&Value>,
    ) -> CruddyResult<()> {
        let fail = |expected: String, actual: String| -> CruddyResult<()> {
            Err(ArgsError::validation_failed(table_name, ValidationDetails::new(path, expected, actual)).into())
        };

        match field_type {
            FieldType::String(rules) => {
                if rules.auto_length.is_some() && is_blank(value) {
                    return Ok(());
                }
                let Some(s) = value.and_then(Value::as_str) else {
                    return fail("string".into(), json_type_name(value).into());
                };
                if let Some(problem) = string_violation(rules, s) {
                    return fail(problem, format!("\"{}\"", s));
                }
                Ok(())
            }
            FieldType::Reference { table } => {
                let id = value
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty() && !has_wildcard(id));
                let expected = format!("id of an existing \"{}\" row", table);

                match id {
                    Some(id) => {
                        if self.storage.read(&format!("{}/{}", table, id))?.is_empty() {
                            return fail(expected, format!("\"{}\"", id));
                        }
                        Ok(())
                    }
                    None => fail(expected, json_type_name(value).into()),
                }
            }
            FieldType::Array { element_type } => {
                let Some(items) = value.and_then(Value::as_array) else {
                    return fail("array".into(), json_type_name(value).into());
                };
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    self.check_value(table_name, &item_path, element_type, Some(item))?;
                }
                Ok(())
            }
        }
    }

    fn fixup_value(&self, field_type: &FieldType, value: Option<Value>) -> CruddyResult<Option<Value>> {
        match field_type {
            FieldType::String(StringRules {
                auto_length: Some(length),
                ..
            }) if is_blank(value.as_ref()) => Ok(Some(Value::String(self.randoms.random_id(*length)?))),
            FieldType::Array { element_type } => match value {
                Some(Value::Array(items)) => {
                    let fixed = items
                        .into_iter()
                        .map(|item| {
                            self.fixup_value(element_type, Some(item))
                                .map(|v| v.unwrap_or(Value::Null))
                        })
                        .collect::<CruddyResult<Vec<_>>>()?;
                    Ok(Some(Value::Array(fixed)))
                }
                other => Ok(other),
            },
            _ => Ok(value),
        }
    }
}

/// Absent, null or empty string
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Describes the first rule `s` breaks, if any
fn string_violation(rules: &StringRules, s: &str) -> Option<String> {
    if rules.alphanumeric && (s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric())) {
        return Some("alphanumeric string".into());
    }

    let length = s.chars().count();
    if let Some(min) = rules.min_length.filter(|min| length < *min) {
        return Some(format!("at least {} characters", min));
    }
    if let Some(max) = rules.max_length.filter(|max| length > *max) {
        return Some(format!("at most {} characters", max));
    }
    None
}

/// Returns the JSON type name for error messages
fn json_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ArgsErrorKind, CruddyError};
    use crate::randoms::FixedSequence;
    use crate::schema::{compile, SchemaDecl};
    use crate::storage::NamespacedStore;
    use serde_json::json;

    fn setup(decl: SchemaDecl) -> (Arc<NamespacedStore>, SchemaValidator) {
        let store = Arc::new(NamespacedStore::in_memory("test_schema").unwrap());
        let validator = SchemaValidator::new(
            compile(&decl).unwrap(),
            store.clone(),
            Randoms::new(FixedSequence::constant(0.0)),
        );
        (store, validator)
    }

    fn users_and_messages() -> SchemaDecl {
        SchemaDecl::new()
            .table("users", [("name", "string:min[3]:max[11]")])
            .table("messages", [("who", "ref=users"), ("cc", "array:ref=users")])
    }

    #[test]
    fn test_plain_string_rules() {
        let (_s, v) = setup(SchemaDecl::new().table("t", [("s", "string")]));
        assert!(v.test("t", &json!({"s": "this is a string"})).unwrap());
        assert!(!v.test("t", &json!({"s": 10})).unwrap());
        assert!(!v.test("t", &json!({})).unwrap());
        assert!(!v.test("t", &json!({"s": null})).unwrap());
    }

    #[test]
    fn test_length_bounds() {
        let (_s, v) = setup(users_and_messages());
        assert!(v.test("users", &json!({"name": "abc"})).unwrap());
        assert!(v.test("users", &json!({"name": "hello world"})).unwrap());
        assert!(!v.test("users", &json!({"name": "hi"})).unwrap());
        assert!(!v.test("users", &json!({"name": "hello world!"})).unwrap());
    }

    #[test]
    fn test_alphanumeric_and_auto() {
        let (_s, v) = setup(SchemaDecl::new().table("t", [("code", "string:an:auto[4]")]));
        for ok in [json!({"code": "ab12"}), json!({"code": ""}), json!({"code": null}), json!({})] {
            assert!(v.test("t", &ok).unwrap(), "{}", ok);
        }
        assert!(!v.test("t", &json!({"code": "non alphanumeric"})).unwrap());
        assert!(!v.test("t", &json!({"code": 10})).unwrap());
    }

    #[test]
    fn test_closed_field_set() {
        let (_s, v) = setup(users_and_messages());
        let err = v.validate("users", &json!({"name": "Bob", "age": "3"})).unwrap_err();
        let details = err.as_args().unwrap().details().unwrap();
        assert_eq!(details.field, "age");
    }

    #[test]
    fn test_non_object_row() {
        let (_s, v) = setup(users_and_messages());
        assert!(!v.test("users", &json!(["Bob"])).unwrap());

        let err = v.test("users", &Value::Null).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::MissingValue);
    }

    #[test]
    fn test_unknown_table() {
        let (_s, v) = setup(users_and_messages());
        let err = v.test("ghosts", &json!({})).unwrap_err();
        assert_eq!(err.as_args().unwrap().kind(), ArgsErrorKind::UnknownTable);
    }

    #[test]
    fn test_reference_requires_existing_row() {
        let (store, v) = setup(users_and_messages());
        store.create("users/001", &json!({"id": "001", "name": "Bob"})).unwrap();

        assert!(v.test("messages", &json!({"who": "001", "cc": []})).unwrap());
        assert!(!v.test("messages", &json!({"who": "002", "cc": []})).unwrap());
        assert!(!v.test("messages", &json!({"who": "*", "cc": []})).unwrap());
        assert!(!v.test("messages", &json!({"who": 1, "cc": []})).unwrap());
    }

    #[test]
    fn test_array_elements_checked() {
        let (store, v) = setup(users_and_messages());
        store.create("users/001", &json!({"id": "001", "name": "Bob"})).unwrap();

        assert!(v.test("messages", &json!({"who": "001", "cc": ["001", "001"]})).unwrap());

        let err = v.validate("messages", &json!({"who": "001", "cc": ["001", "009"]})).unwrap_err();
        assert_eq!(err.as_args().unwrap().details().unwrap().field, "cc[1]");

        assert!(!v.test("messages", &json!({"who": "001", "cc": "001"})).unwrap());
    }

    #[test]
    fn test_fixup_generates_id() {
        let (_s, v) = setup(users_and_messages());
        let row = v.fixup("users", json!({"name": "Bob"})).unwrap();
        assert_eq!(row["id"], json!("00000"));
        assert_eq!(row["name"], json!("Bob"));

        let row = v.fixup("users", json!({"name": "Bob", "id": ""})).unwrap();
        assert_eq!(row["id"], json!("00000"));

        let row = v.fixup("users", json!({"name": "Bob", "id": "keep1"})).unwrap();
        assert_eq!(row["id"], json!("keep1"));
    }

    #[test]
    fn test_fixup_recurses_into_arrays() {
        let (_s, v) = setup(SchemaDecl::new().table("t", [("codes", "array:array:string:an:auto[2]")]));
        let row = v.fixup("t", json!({"codes": [["", "ab"], [null]]})).unwrap();
        assert_eq!(row["codes"], json!([["00", "ab"], ["00"]]));
    }

    #[test]
    fn test_fixup_rejects_invalid() {
        let (_s, v) = setup(users_and_messages());
        let err = v.fixup("users", json!({"name": 5})).unwrap_err();
        assert!(matches!(err, CruddyError::Args(ref e) if e.is_validation_failure()));
    }
}

//! Schema Invariant Tests
//!
//! - Compilation is deterministic
//! - Undeclared reference targets fail compilation
//! - Every table carries an auto-generated `id`
//! - Field sets are closed
//! - References are checked against live storage

use std::sync::Arc;

use cruddydb::errors::ArgsErrorKind;
use cruddydb::randoms::Randoms;
use cruddydb::schema::{compile, FieldType, SchemaDecl, SchemaValidator, StringRules, ID_FIELD};
use cruddydb::storage::{KeyValueStore, NamespacedStore};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn project_decl() -> SchemaDecl {
    SchemaDecl::from_json_str(
        r#"{
            "users":         {"firstName": "string:min[1]:max[20]", "email": "string"},
            "messages":      {"msg": "string", "who": "ref=users"},
            "projects":      {"name": "string:min[1]", "team": "array:ref=users"},
            "conversations": {"messages": "array:ref=messages"}
        }"#,
    )
    .unwrap()
}

fn validator() -> (Arc<NamespacedStore>, SchemaValidator) {
    let store = Arc::new(NamespacedStore::in_memory("schema_tests").unwrap());
    let schema = compile(&project_decl()).unwrap();
    (store.clone(), SchemaValidator::new(schema, store, Randoms::seeded(5)))
}

// =============================================================================
// Compilation Tests
// =============================================================================

/// Compiling the same declaration twice yields equal descriptors.
#[test]
fn test_compilation_is_deterministic() {
    let decl = project_decl();
    for _ in 0..10 {
        assert_eq!(compile(&decl).unwrap(), compile(&decl).unwrap());
    }
}

/// A reference to an undeclared table always fails.
#[test]
fn test_undeclared_reference_fails() {
    for field in ["ref=ghosts", "array:ref=ghosts", "array:array:ref=ghosts"] {
        let decl = SchemaDecl::new().table("posts", [("author", field)]);
        let err = compile(&decl).unwrap_err();
        assert_eq!(err.kind(), ArgsErrorKind::MalformedSchema, "{}", field);
    }
}

/// The implicit id is a 5-symbol auto-generated alphanumeric string.
#[test]
fn test_every_table_has_id() {
    let schema = compile(&project_decl()).unwrap();
    for table in schema.tables() {
        assert_eq!(
            table.field(ID_FIELD),
            Some(&FieldType::String(StringRules::auto_id(5))),
            "{}",
            table.name
        );
    }
}

/// Malformed declarations are rejected with a location.
#[test]
fn test_malformed_declaration_names_field() {
    let decl = SchemaDecl::new().table("users", [("code", "string:auto[5]")]);
    let err = compile(&decl).unwrap_err();
    assert!(err.message().starts_with("users.code:"), "{}", err.message());
}

// =============================================================================
// Validation Tests
// =============================================================================

/// Unknown fields reject the whole row.
#[test]
fn test_closed_field_set() {
    let (_store, v) = validator();
    let row = json!({"firstName": "Ann", "email": "a@x", "nickname": "A"});
    assert!(!v.test("users", &row).unwrap());
}

/// Every declared non-auto field is required.
#[test]
fn test_declared_fields_required() {
    let (_store, v) = validator();
    assert!(!v.test("users", &json!({"firstName": "Ann"})).unwrap());
    assert!(v.test("users", &json!({"firstName": "Ann", "email": ""})).unwrap());
}

/// References resolve against what the store holds right now.
#[test]
fn test_references_follow_storage() {
    let (store, v) = validator();
    let message = json!({"msg": "hi", "who": "ann01"});
    assert!(!v.test("messages", &message).unwrap());

    store.create("users/ann01", &json!({"id": "ann01"})).unwrap();
    assert!(v.test("messages", &message).unwrap());

    store.delete("users/ann01").unwrap();
    assert!(!v.test("messages", &message).unwrap());
}

/// Array references check every element.
#[test]
fn test_array_of_references() {
    let (store, v) = validator();
    store.create("users/a", &json!({"id": "a"})).unwrap();
    store.create("users/b", &json!({"id": "b"})).unwrap();

    assert!(v.test("projects", &json!({"name": "p", "team": []})).unwrap());
    assert!(v.test("projects", &json!({"name": "p", "team": ["a", "b"]})).unwrap());
    assert!(!v.test("projects", &json!({"name": "p", "team": ["a", "c"]})).unwrap());
    assert!(!v.test("projects", &json!({"name": "p", "team": "a"})).unwrap());
}

/// Fixup fills the id and changes nothing else.
#[test]
fn test_fixup_fills_only_id() {
    let (_store, v) = validator();
    let row = v
        .fixup("users", json!({"firstName": "Ann", "email": "a@x"}))
        .unwrap();

    let id = row[ID_FIELD].as_str().unwrap();
    assert_eq!(id.len(), 5);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(row["firstName"], json!("Ann"));
    assert_eq!(row.len(), 3);
}

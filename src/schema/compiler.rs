//! Schema compilation
//!
//! Parses every field declaration, builds each table (adding the implicit
//! `id` field), then checks once that every referenced table is declared.

use std::collections::BTreeMap;

use super::declaration::SchemaDecl;
use super::parser::parse_field;
use super::types::{Schema, Table};
use crate::errors::ArgsError;
use crate::observability::{log_event_with_fields, Event};

/// Compiles a declaration into a `Schema`.
///
/// # Errors
///
/// Returns `ArgsError` (`MalformedSchema`) if a table name could not be
/// addressed by a key, a field declaration is malformed, or a `ref=` names a
/// table that is not declared.
pub fn compile(decl: &SchemaDecl) -> Result<Schema, ArgsError> {
    let mut tables = BTreeMap::new();
    let mut references: Vec<(String, String)> = Vec::new();

    for (table_name, field_decls) in decl.tables() {
        if table_name.is_empty() || table_name.contains(&['/', '*'][..]) {
            return Err(ArgsError::malformed_schema(format!(
                "table name \"{}\" must be non-empty and free of '/' and '*'",
                table_name
            )));
        }

        let mut fields = BTreeMap::new();
        for (field_name, field_decl) in field_decls {
            let field_type = parse_field(field_decl).map_err(|e| {
                ArgsError::malformed_schema(format!("{}.{}: {}", table_name, field_name, e.message()))
            })?;

            if let Some(target) = field_type.referenced_table() {
                references.push((format!("{}.{}", table_name, field_name), target.to_string()));
            }
            fields.insert(field_name.clone(), field_type);
        }
        tables.insert(table_name.to_string(), Table::new(table_name, fields));
    }

    for (field_path, target) in &references {
        if !tables.contains_key(target) {
            return Err(ArgsError::malformed_schema(format!(
                "table \"{}\" was referenced by {}, but not declared",
                target, field_path
            )));
        }
    }

    let schema = Schema::from_tables(tables);
    let count = schema.len().to_string();
    log_event_with_fields(Event::SchemaCompiled, &[("tables", count.as_str())]);
    Ok(schema)
}

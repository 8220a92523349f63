//! Schema declarations
//!
//! A declaration maps table name to field name to a declaration string:
//!
//! ```json
//! {
//!     "users":    { "firstName": "string:min[1]:max[20]", "email": "string" },
//!     "messages": { "msg": "string", "who": "ref=users" },
//!     "projects": { "team": "array:ref=users" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ArgsError;

/// Uncompiled schema: `table -> field -> declaration`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDecl {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl SchemaDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a table declaration
    pub fn table<I, F, D>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (F, D)>,
        F: Into<String>,
        D: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(field, decl)| (field.into(), decl.into()))
            .collect();
        self.tables.insert(name.into(), fields);
        self
    }

    /// Parses a declaration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ArgsError> {
        serde_json::from_str(json)
            .map_err(|e| ArgsError::malformed_schema(format!("invalid schema JSON: {}", e)))
    }

    /// Reads a declaration file
    pub fn load(path: &Path) -> Result<Self, ArgsError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ArgsError::malformed_schema(format!("failed to read schema '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, String>)> {
        self.tables.iter().map(|(name, fields)| (name.as_str(), fields))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

//! Compiled schema descriptors
//!
//! Descriptors are storage-agnostic: they say what a field must look like,
//! while `SchemaValidator` performs the checks that need a live store.
//!
//! Field types:
//! - string: optionally alphanumeric, length-bounded, auto-generated
//! - reference: id of a row in another table
//! - array: homogeneous list of any field type

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ArgsError;

/// Name of the implicit primary-key field
pub const ID_FIELD: &str = "id";

/// Length of implicitly generated ids
pub const DEFAULT_ID_LENGTH: usize = 5;

/// Constraints of a string field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRules {
    /// Only `[0-9a-zA-Z]` allowed
    pub alphanumeric: bool,
    /// Generate a value of this length when absent or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl StringRules {
    /// Builds checked rules.
    ///
    /// `auto_length` requires `alphanumeric` and must lie within the bounds.
    pub fn new(
        alphanumeric: bool,
        auto_length: Option<usize>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> Result<Self, ArgsError> {
        if let Some(auto) = auto_length {
            if !alphanumeric {
                return Err(ArgsError::malformed_schema(
                    "must be alphanumeric (:an) to use the auto feature",
                ));
            }
            if min_length.map_or(false, |min| auto < min) {
                return Err(ArgsError::malformed_schema(
                    "auto-generated length is less than the minimum length",
                ));
            }
            if max_length.map_or(false, |max| auto > max) {
                return Err(ArgsError::malformed_schema(
                    "auto-generated length is greater than the maximum length",
                ));
            }
        }

        Ok(Self {
            alphanumeric,
            auto_length,
            min_length,
            max_length,
        })
    }

    /// Any string
    pub fn plain() -> Self {
        Self::default()
    }

    /// Alphanumeric string generated with `length` symbols when absent
    pub fn auto_id(length: usize) -> Self {
        Self {
            alphanumeric: true,
            auto_length: Some(length),
            min_length: None,
            max_length: None,
        }
    }
}

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String(StringRules),
    /// Id of an existing row in `table`
    Reference { table: String },
    /// List whose elements all satisfy `element_type`
    Array { element_type: Box<FieldType> },
}

impl FieldType {
    pub fn array_of(element_type: FieldType) -> Self {
        FieldType::Array {
            element_type: Box::new(element_type),
        }
    }

    pub fn reference(table: impl Into<String>) -> Self {
        FieldType::Reference { table: table.into() }
    }

    /// Table referenced anywhere inside this type, if any
    pub fn referenced_table(&self) -> Option<&str> {
        match self {
            FieldType::String(_) => None,
            FieldType::Reference { table } => Some(table),
            FieldType::Array { element_type } => element_type.referenced_table(),
        }
    }
}

/// A named table and its closed set of fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub fields: BTreeMap<String, FieldType>,
}

impl Table {
    /// Creates a table, adding the implicit `id` field unless one is declared
    pub fn new(name: impl Into<String>, mut fields: BTreeMap<String, FieldType>) -> Self {
        fields
            .entry(ID_FIELD.to_string())
            .or_insert_with(|| FieldType::String(StringRules::auto_id(DEFAULT_ID_LENGTH)));

        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.get(name)
    }
}

/// Compiled schema: table name to table. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    tables: BTreeMap<String, Table>,
}

impl Schema {
    pub(crate) fn from_tables(tables: BTreeMap<String, Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

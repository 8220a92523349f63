//! Row key grammar
//!
//! ```text
//! row key    := table "/" id ("," id)*     ids trimmed of surrounding spaces
//! table ref  := table | table "/*"         create
//! update key := table "/" id | table "/*"  update
//! ```
//!
//! A table is everything before the first `/` and may not be empty or hold
//! `*`. An id may not be empty or hold `/`, `*` or `,`.

use crate::errors::{ArgsError, ArgsErrorKind};
use crate::storage::has_wildcard;

const BULK_SUFFIX: &str = "/*";

/// A parsed `table/id[,id]` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    pub table: String,
    pub ids: Vec<String>,
}

impl RowKey {
    /// Storage keys addressed by this row key, in id order
    pub fn storage_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.ids.iter().map(|id| storage_key(&self.table, id))
    }
}

/// Target of an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKey {
    /// `table/id`
    Single { table: String, id: String },
    /// `table/*`
    Bulk { table: String },
}

/// Builds the storage key of one row
pub fn storage_key(table: &str, id: &str) -> String {
    format!("{}/{}", table, id)
}

fn is_valid_table(table: &str) -> bool {
    !table.is_empty() && !table.contains('/') && !has_wildcard(table)
}

/// Returns true if `id` can be addressed through a row key
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.trim() == id && !id.contains(['/', '*', ','])
}

/// Parses `table/id[,id...]`
pub fn parse_row_key(key: &str) -> Result<RowKey, ArgsError> {
    let (table, ids) = key.split_once('/').ok_or_else(|| ArgsError::malformed_key(key))?;
    if !is_valid_table(table) {
        return Err(ArgsError::malformed_key(key));
    }

    let ids = ids
        .split(',')
        .map(str::trim)
        .map(|id| {
            if is_valid_id(id) {
                Ok(id.to_string())
            } else {
                Err(ArgsError::malformed_key(key))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RowKey {
        table: table.to_string(),
        ids,
    })
}

/// Parses a create target, returning the table and whether it is bulk
pub fn parse_table_ref(table_ref: &str) -> Result<(&str, bool), ArgsError> {
    let (table, bulk) = match table_ref.strip_suffix(BULK_SUFFIX) {
        Some(table) => (table, true),
        None => (table_ref, false),
    };

    if !is_valid_table(table) {
        return Err(ArgsError::new(
            ArgsErrorKind::MalformedKey,
            format!("\"{}\" must be a table name, optionally followed by \"/*\"", table_ref),
        ));
    }
    Ok((table, bulk))
}

/// Parses `table/id` or `table/*`
pub fn parse_update_key(key: &str) -> Result<UpdateKey, ArgsError> {
    if let Some(table) = key.strip_suffix(BULK_SUFFIX) {
        if !is_valid_table(table) {
            return Err(ArgsError::malformed_key(key));
        }
        return Ok(UpdateKey::Bulk {
            table: table.to_string(),
        });
    }

    let RowKey { table, mut ids } = parse_row_key(key)?;
    match ids.pop() {
        Some(id) if ids.is_empty() => Ok(UpdateKey::Single { table, id }),
        _ => Err(ArgsError::new(
            ArgsErrorKind::MalformedKey,
            format!("\"{}\" must address one row (\"table/id\") or a whole table (\"table/*\")", key),
        )),
    }
}

//! CRUD engine
//!
//! Addresses rows by `table/id` keys over a namespaced key-value store and
//! checks every row against the compiled schema before any write.

mod database;
mod keys;

pub use database::{CruddyDb, Updated};
pub use keys::{is_valid_id, parse_row_key, parse_table_ref, parse_update_key, storage_key, RowKey, UpdateKey};

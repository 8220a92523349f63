//! Key-value storage for cruddydb
//!
//! The engine talks to storage only through the `KeyValueStore` trait. The
//! bundled backend is an in-memory medium partitioned by namespace, which can
//! be snapshotted to a JSON file.
//!
//! # Contract
//!
//! - `create` rejects existing keys, wildcard keys and null values
//! - `read` returns 0 or 1 entries for an exact key, all matches for a wildcard
//! - `update` rejects missing keys and wildcard keys
//! - `delete` removes every match and is a no-op when nothing matches

mod backend;
mod errors;
mod memory;
mod wildcard;

pub use backend::{has_wildcard, Entries, KeyValueStore, WILDCARD};
pub use errors::{StorageError, StorageResult};
pub use memory::{MemoryMedium, NamespacedStore};
pub use wildcard::WildcardPattern;

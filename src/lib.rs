//! cruddydb - schema-validated CRUD over a namespaced key-value store
//!
//! - `schema`: declaration grammar, compiler, row validation and fixup
//! - `engine`: table/key-addressed create, read, update and delete
//! - `latency`, `queue`: delay-injected asynchronous access, serialized FIFO

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod latency;
pub mod observability;
pub mod queue;
pub mod randoms;
pub mod schema;
pub mod storage;

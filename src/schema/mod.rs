//! Schema subsystem
//!
//! Schemas are compiled once from a declaration into immutable descriptors,
//! then bound to a store by `SchemaValidator` for the checks that need one
//! (references).
//!
//! # Design Principles
//!
//! - Closed field sets: undeclared fields are rejected
//! - Every declared field is checked, present or not
//! - Every table carries an `id` field
//! - Compilation never touches storage

mod compiler;
mod declaration;
mod parser;
mod types;
mod validator;

pub use compiler::compile;
pub use declaration::SchemaDecl;
pub use parser::parse_field;
pub use types::{FieldType, Schema, StringRules, Table, DEFAULT_ID_LENGTH, ID_FIELD};
pub use validator::{Row, SchemaValidator};

//! Error taxonomy for cruddydb
//!
//! Two families reach callers of the engine:
//! - `ArgsError`: the caller supplied something unusable (bad key, bad row,
//!   unknown table, malformed schema). Never retried.
//! - `StorageError`: the backing store rejected the operation. Propagated
//!   verbatim.
//!
//! Validation failures are the `ValidationFailed` kind of `ArgsError` and
//! guarantee that nothing was written for the rejected batch.

use std::fmt;

use thiserror::Error;

use crate::storage::StorageError;

/// Kinds of caller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgsErrorKind {
    /// A required argument or value is missing
    MissingValue,
    /// A key does not follow the `table/id[,id]` grammar
    MalformedKey,
    /// The table is not declared in the schema
    UnknownTable,
    /// A row does not conform to its table
    ValidationFailed,
    /// The payload id disagrees with the key id
    IdMismatch,
    /// Two rows in one batch share an id
    DuplicateId,
    /// A schema declaration could not be compiled
    MalformedSchema,
    /// Any other unusable argument
    InvalidArgument,
}

impl ArgsErrorKind {
    /// Returns the stable code string for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ArgsErrorKind::MissingValue => "CRUDDY_ARGS_MISSING_VALUE",
            ArgsErrorKind::MalformedKey => "CRUDDY_ARGS_MALFORMED_KEY",
            ArgsErrorKind::UnknownTable => "CRUDDY_ARGS_UNKNOWN_TABLE",
            ArgsErrorKind::ValidationFailed => "CRUDDY_ARGS_VALIDATION_FAILED",
            ArgsErrorKind::IdMismatch => "CRUDDY_ARGS_ID_MISMATCH",
            ArgsErrorKind::DuplicateId => "CRUDDY_ARGS_DUPLICATE_ID",
            ArgsErrorKind::MalformedSchema => "CRUDDY_ARGS_MALFORMED_SCHEMA",
            ArgsErrorKind::InvalidArgument => "CRUDDY_ARGS_INVALID_ARGUMENT",
        }
    }
}

impl fmt::Display for ArgsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where a row failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g. "team[2]")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// What was found instead
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn undeclared_field(field: impl Into<String>) -> Self {
        Self::new(field, "a declared field", "undeclared field present")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// Caller-supplied invalid input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ArgsError [{kind}]: {message}")]
pub struct ArgsError {
    kind: ArgsErrorKind,
    message: String,
    details: Option<ValidationDetails>,
}

impl ArgsError {
    pub fn new(kind: ArgsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// A required value was absent or null
    pub fn missing_value(what: &str) -> Self {
        Self::new(ArgsErrorKind::MissingValue, format!("{} is missing", what))
    }

    /// Key does not follow the row key grammar
    pub fn malformed_key(key: &str) -> Self {
        Self::new(
            ArgsErrorKind::MalformedKey,
            format!(
                "\"{}\" must be in \"table/id[,id]\" format, ex: \"users/123\" or \"users/123,456\"",
                key
            ),
        )
    }

    /// Table is not part of the compiled schema
    pub fn unknown_table(table: &str) -> Self {
        Self::new(
            ArgsErrorKind::UnknownTable,
            format!("\"{}\" is not a recognized table", table),
        )
    }

    /// A single row failed validation
    pub fn validation_failed(table: &str, details: ValidationDetails) -> Self {
        Self {
            kind: ArgsErrorKind::ValidationFailed,
            message: format!("invalid row for table \"{}\": {}", table, details),
            details: Some(details),
        }
    }

    /// At least one row of a bulk batch failed validation
    pub fn rows_invalid() -> Self {
        Self::new(ArgsErrorKind::ValidationFailed, "one or more rows are invalid")
    }

    /// The payload id disagrees with the key id
    pub fn id_mismatch(key_id: &str, row_id: &str) -> Self {
        Self::new(
            ArgsErrorKind::IdMismatch,
            format!("key id \"{}\" must match the row id \"{}\"", key_id, row_id),
        )
    }

    /// Two rows in one batch resolved to the same id
    pub fn duplicate_id(table: &str, id: &str) -> Self {
        Self::new(
            ArgsErrorKind::DuplicateId,
            format!("id \"{}\" appears more than once in the batch for \"{}\"", id, table),
        )
    }

    /// A field declaration or schema could not be compiled
    pub fn malformed_schema(reason: impl Into<String>) -> Self {
        Self::new(ArgsErrorKind::MalformedSchema, reason)
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::new(ArgsErrorKind::InvalidArgument, reason)
    }

    pub fn kind(&self) -> ArgsErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns validation details if applicable
    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }

    pub fn is_validation_failure(&self) -> bool {
        self.kind == ArgsErrorKind::ValidationFailed
    }
}

/// Any failure surfaced by the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CruddyError {
    #[error(transparent)]
    Args(#[from] ArgsError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CruddyError {
    /// Returns the caller error, if this is one
    pub fn as_args(&self) -> Option<&ArgsError> {
        match self {
            CruddyError::Args(e) => Some(e),
            CruddyError::Storage(_) => None,
        }
    }

    /// Returns the storage error, if this is one
    pub fn as_storage(&self) -> Option<&StorageError> {
        match self {
            CruddyError::Storage(e) => Some(e),
            CruddyError::Args(_) => None,
        }
    }

    pub fn is_args(&self) -> bool {
        self.as_args().is_some()
    }

    pub fn is_validation_failure(&self) -> bool {
        self.as_args().map_or(false, ArgsError::is_validation_failure)
    }

    /// Stable code string for either family
    pub fn code(&self) -> &'static str {
        match self {
            CruddyError::Args(e) => e.code(),
            CruddyError::Storage(e) => e.code(),
        }
    }
}

/// Result type for engine operations
pub type CruddyResult<T> = Result<T, CruddyError>;

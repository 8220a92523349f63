//! Request and response envelopes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::CruddyDb;
use crate::errors::CruddyResult;

/// One engine call, as carried through the latency wrapper and the queue.
///
/// Serialized with an `op` tag:
///
/// ```json
/// {"op": "create", "table": "users", "rows": {"name": "Bob"}}
/// {"op": "read",   "key": "users/*"}
/// {"op": "update", "key": "users/abc12", "value": {"name": "Bob2"}}
/// {"op": "delete", "key": "users/abc12"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    Create {
        table: String,
        #[serde(default)]
        rows: Value,
    },
    Read {
        key: String,
    },
    Update {
        key: String,
        #[serde(default)]
        value: Value,
    },
    Delete {
        key: String,
    },
}

impl Request {
    pub fn create(table: impl Into<String>, rows: Value) -> Self {
        Request::Create {
            table: table.into(),
            rows,
        }
    }

    pub fn read(key: impl Into<String>) -> Self {
        Request::Read { key: key.into() }
    }

    pub fn update(key: impl Into<String>, value: Value) -> Self {
        Request::Update {
            key: key.into(),
            value,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Request::Delete { key: key.into() }
    }

    /// Operation name, as used in the `op` tag
    pub fn op(&self) -> &'static str {
        match self {
            Request::Create { .. } => "create",
            Request::Read { .. } => "read",
            Request::Update { .. } => "update",
            Request::Delete { .. } => "delete",
        }
    }

    /// Table reference or key the request addresses
    pub fn target(&self) -> &str {
        match self {
            Request::Create { table, .. } => table,
            Request::Read { key } | Request::Update { key, .. } | Request::Delete { key } => key,
        }
    }

    /// Runs the request against the engine, converting the result to JSON
    pub fn apply(self, db: &CruddyDb) -> CruddyResult<Value> {
        match self {
            Request::Create { table, rows } => {
                let created = db.create(&table, rows)?;
                Ok(Value::Array(created.into_iter().map(Value::Object).collect()))
            }
            Request::Read { key } => Ok(Value::Object(db.read(&key)?.into_iter().collect())),
            Request::Update { key, value } => Ok(db.update(&key, value)?.into_value()),
            Request::Delete { key } => {
                db.delete(&key)?;
                Ok(Value::Null)
            }
        }
    }
}

/// Outcome of a request: `{success, result?, error?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: (!result.is_null()).then_some(result),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn from_result(result: CruddyResult<Value>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

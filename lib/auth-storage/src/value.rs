//! Database-agnostic statement parameters and the executor seam.
//!
//! Storage engines hand fully rendered SQL plus a list of [`Value`]s to a
//! [`SqlExecutor`]. Backends (e.g. the PostgreSQL pool wrapper) translate the
//! values to their driver's argument types and decode result columns back
//! according to the requested [`ValueKind`]s.

use async_trait::async_trait;

use crate::{StorageDatetime, StorageError, UserId};

/// A value that can be bound to a statement parameter or read from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    Datetime(StorageDatetime),
    Json(serde_json::Value),
    Null,
}

/// The shape a selected column should be decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    BigInt,
    Boolean,
    Datetime,
    Json,
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Datetime(_) => "datetime",
            Value::Json(_) => "json",
            Value::Null => "null",
        }
    }

    pub fn into_string(self) -> Result<String, StorageError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }

    pub fn into_int(self) -> Result<i64, StorageError> {
        match self {
            Value::Int(n) => Ok(n),
            other => Err(mismatch("int", &other)),
        }
    }

    pub fn into_bool(self) -> Result<bool, StorageError> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }

    pub fn into_json(self) -> Result<serde_json::Value, StorageError> {
        match self {
            Value::Json(v) => Ok(v),
            Value::Null => Ok(serde_json::Value::Null),
            other => Err(mismatch("json", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Value) -> StorageError {
    StorageError::TypeMismatch(format!("expected {}, got {}", expected, got.kind_name()))
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<UserId> for Value {
    fn from(id: UserId) -> Self {
        Value::Int(id.0)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<StorageDatetime> for Value {
    fn from(dt: StorageDatetime) -> Self {
        Value::Datetime(dt)
    }
}

impl From<&StorageDatetime> for Value {
    fn from(dt: &StorageDatetime) -> Self {
        Value::Datetime(*dt)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

/// Trait for executing rendered statements against a database backend.
///
/// Implemented by database-specific pool types (e.g., a wrapped `sqlx::PgPool`).
/// The connection's lifecycle belongs to the caller; storage engines only
/// borrow it for the duration of a call.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// The raw driver error, classified by a matching bridge.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute a statement and return the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, Self::Error>;

    /// Execute a statement and decode at most one row.
    ///
    /// The row is returned as one value per entry in `kinds`, in select order.
    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
        kinds: &[ValueKind],
    ) -> Result<Option<Vec<Value>>, Self::Error>;
}

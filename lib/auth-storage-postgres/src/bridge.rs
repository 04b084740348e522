//! PostgreSQL error classification and time conversion.

use auth_storage::{
    ErrorClass, SqlBridge, StorageDatetime, StorageError, Value, ValueKind, WriteKind,
};

/// SQLSTATE raised by PostgreSQL for unique constraint violations.
pub const POSTGRES_UNIQUE_VIOLATION: &str = "23505";

/// Bridge for sqlx's PostgreSQL driver.
///
/// Times are bound and scanned as `TIMESTAMPTZ` directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgBridge;

impl PgBridge {
    pub fn new() -> Self {
        PgBridge
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => {
                db_err.code().as_deref() == Some(POSTGRES_UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }
}

impl SqlBridge for PgBridge {
    type Error = sqlx::Error;

    fn convert_time(&self, time: &StorageDatetime) -> Value {
        Value::Datetime(*time)
    }

    fn time_scan_type(&self) -> ValueKind {
        ValueKind::Datetime
    }

    fn convert_time_scan(&self, value: Value) -> Result<StorageDatetime, StorageError> {
        match value {
            Value::Datetime(dt) => Ok(dt),
            other => Err(StorageError::TypeMismatch(format!(
                "PgBridge: expected datetime, got {}",
                other.kind_name()
            ))),
        }
    }

    fn classify(&self, err: &sqlx::Error, kind: WriteKind) -> ErrorClass {
        if !Self::is_unique_violation(err) {
            return ErrorClass::Other;
        }
        match kind {
            WriteKind::Insert => ErrorClass::DuplicateInsert,
            WriteKind::Update => ErrorClass::DuplicateUpdate,
        }
    }
}

//! PostgreSQL implementation of SqlExecutor.

const DEFAULT_MAX_CONNECTIONS: u32 = 16;

use async_trait::async_trait;
use auth_storage::{SqlExecutor, StorageError, Value, ValueKind};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Arguments, Row};
use std::ops::Deref;
use tracing::debug;

/// Wrapper around sqlx::PgPool that implements SqlExecutor.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Clone, Debug)]
pub struct PgPool(sqlx::PgPool);

impl PgPool {
    /// Create a new PgPool from an sqlx PgPool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self(pool)
    }

    /// Connect to a PostgreSQL database.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        Self::connect_with(url, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn connect_with(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(StorageError::database)?;
        Ok(Self(pool))
    }

    /// Get the inner sqlx::PgPool.
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.0
    }
}

impl Deref for PgPool {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn bind_values(params: &[Value]) -> Result<PgArguments, sqlx::Error> {
    let mut args = PgArguments::default();
    for value in params {
        bind_value(&mut args, value)?;
    }
    Ok(args)
}

/// Bind a Value to PgArguments.
fn bind_value(args: &mut PgArguments, value: &Value) -> Result<(), sqlx::Error> {
    let bound = match value {
        Value::String(s) => args.add(s.clone()),
        Value::Int(n) => args.add(*n),
        Value::Bool(b) => args.add(*b),
        Value::Datetime(dt) => args.add(*dt.inner()),
        Value::Json(v) => args.add(v.clone()),
        Value::Null => args.add(None::<String>),
    };
    bound.map_err(sqlx::Error::Encode)
}

/// Decode a row positionally, one value per requested kind.
fn decode_row(row: &PgRow, kinds: &[ValueKind]) -> Result<Vec<Value>, sqlx::Error> {
    kinds
        .iter()
        .enumerate()
        .map(|(idx, kind)| decode_column(row, idx, *kind))
        .collect()
}

fn decode_column(row: &PgRow, idx: usize, kind: ValueKind) -> Result<Value, sqlx::Error> {
    let value = match kind {
        ValueKind::Text => row.try_get::<Option<String>, _>(idx)?.map(Value::String),
        ValueKind::BigInt => row.try_get::<Option<i64>, _>(idx)?.map(Value::Int),
        ValueKind::Boolean => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        ValueKind::Datetime => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|dt| Value::Datetime(dt.into())),
        ValueKind::Json => row
            .try_get::<Option<serde_json::Value>, _>(idx)?
            .map(Value::Json),
    };
    Ok(value.unwrap_or(Value::Null))
}

#[async_trait]
impl SqlExecutor for PgPool {
    type Error = sqlx::Error;

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, sqlx::Error> {
        let args = bind_values(params)?;
        let result = sqlx::query_with(sql, args).execute(&self.0).await?;
        debug!(rows = result.rows_affected(), "statement executed");
        Ok(result.rows_affected())
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
        kinds: &[ValueKind],
    ) -> Result<Option<Vec<Value>>, sqlx::Error> {
        let args = bind_values(params)?;
        let row = sqlx::query_with(sql, args).fetch_optional(&self.0).await?;
        row.map(|row| decode_row(&row, kinds)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_storage::StorageDatetime;

    #[test]
    fn binds_every_value_kind() {
        bind_values(&[
            Value::from("alice"),
            Value::Int(1),
            Value::Bool(true),
            Value::Datetime(StorageDatetime::now()),
            Value::Json(serde_json::json!({ "k": 1 })),
            Value::Null,
        ])
        .unwrap();
    }
}

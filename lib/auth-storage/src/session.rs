//! Generic SQL implementation of [`SessionStorage`].

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    SessionModel, SessionQueries, SessionStorage, SqlBridge, SqlExecutor, StorageDatetime,
    StorageError, UserId, Value, ValueKind,
};

/// Session storage over any SQL backend.
///
/// Every operation is a single parameterized statement. Sessions reference
/// users, so the users schema must exist before [`SessionStorage::init_sessions`].
#[derive(Debug, Clone)]
pub struct SqlSessionStorage<E, Q, B> {
    executor: E,
    queries: Q,
    bridge: B,
}

impl<E, Q, B> SqlSessionStorage<E, Q, B>
where
    E: SqlExecutor,
    Q: SessionQueries,
    B: SqlBridge<Error = E::Error>,
{
    pub fn new(executor: E, queries: Q, bridge: B) -> Self {
        Self {
            executor,
            queries,
            bridge,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn queries(&self) -> &Q {
        &self.queries
    }

    fn row_to_session(&self, row: Vec<Value>) -> Result<SessionModel, StorageError> {
        let [key, user, expire_date, data]: [Value; 4] = row.try_into().map_err(|row: Vec<Value>| {
            StorageError::TypeMismatch(format!("expected 4 session columns, got {}", row.len()))
        })?;

        Ok(SessionModel {
            key: key.into_string()?,
            user: UserId(user.into_int()?),
            expire_date: self.bridge.convert_time_scan(expire_date)?,
            data: data.into_json()?,
        })
    }
}

#[async_trait]
impl<E, Q, B> SessionStorage for SqlSessionStorage<E, Q, B>
where
    E: SqlExecutor,
    Q: SessionQueries,
    B: SqlBridge<Error = E::Error>,
{
    async fn init_sessions(&self) -> Result<(), StorageError> {
        for statement in self.queries.init_sessions() {
            self.executor
                .execute(statement, &[])
                .await
                .map_err(StorageError::database)?;
        }
        debug!(
            statements = self.queries.init_sessions().len(),
            "sessions schema initialized"
        );
        Ok(())
    }

    async fn insert_session(&self, session: &SessionModel) -> Result<(), StorageError> {
        let params = [
            Value::from(&session.key),
            Value::from(session.user),
            self.bridge.convert_time(&session.expire_date),
            Value::from(session.data.clone()),
        ];

        match self.executor.execute(self.queries.insert_session(), &params).await {
            Ok(_) => Ok(()),
            Err(err) if self.bridge.is_duplicate_insert(&err) => {
                warn!(user = %session.user, "session insert rejected by unique constraint");
                Err(StorageError::SessionExists(format!(
                    "unique constraint failed: {}",
                    err
                )))
            }
            Err(err) => Err(StorageError::database(err)),
        }
    }

    async fn get_session(&self, key: &str) -> Result<SessionModel, StorageError> {
        let kinds = [
            ValueKind::Text,
            ValueKind::BigInt,
            self.bridge.time_scan_type(),
            ValueKind::Json,
        ];
        let row = self
            .executor
            .fetch_optional(self.queries.get_session(), &[key.into()], &kinds)
            .await
            .map_err(StorageError::database)?;

        match row {
            Some(row) => self.row_to_session(row),
            None => Err(StorageError::NotFound("session".to_string())),
        }
    }

    async fn delete_session(&self, key: &str) -> Result<(), StorageError> {
        self.executor
            .execute(self.queries.delete_session(), &[key.into()])
            .await
            .map_err(StorageError::database)?;
        Ok(())
    }

    async fn clean_up_expired(&self, reference: &StorageDatetime) -> Result<u64, StorageError> {
        let deleted = self
            .executor
            .execute(
                self.queries.clean_up_sessions(),
                &[self.bridge.convert_time(reference)],
            )
            .await
            .map_err(StorageError::database)?;
        debug!(deleted, %reference, "expired sessions removed");
        Ok(deleted)
    }

    async fn delete_sessions_for_user(&self, user: UserId) -> Result<u64, StorageError> {
        let deleted = self
            .executor
            .execute(self.queries.delete_sessions_for_user(), &[user.into()])
            .await
            .map_err(StorageError::database)?;
        debug!(deleted, %user, "user sessions removed");
        Ok(deleted)
    }
}

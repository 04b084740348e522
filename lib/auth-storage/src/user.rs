//! Generic SQL implementation of [`UserStorage`].

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    SqlBridge, SqlExecutor, StorageDatetime, StorageError, UserField, UserId, UserModel,
    UserQueries, UserStorage, Value, ValueKind,
};

const USER_COLUMN_COUNT: usize = 11;

/// User storage over any SQL backend.
///
/// The engine owns an immutable query set and a bridge; the executor is a
/// handle to a caller-owned connection or pool. No state is kept between
/// calls and nothing is cached: every read is a fresh query.
#[derive(Debug, Clone)]
pub struct SqlUserStorage<E, Q, B> {
    executor: E,
    queries: Q,
    bridge: B,
}

impl<E, Q, B> SqlUserStorage<E, Q, B>
where
    E: SqlExecutor,
    Q: UserQueries,
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

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    fn row_kinds(&self) -> [ValueKind; USER_COLUMN_COUNT] {
        let time = self.bridge.time_scan_type();
        [
            ValueKind::BigInt,
            ValueKind::Text,
            ValueKind::Text,
            ValueKind::Text,
            ValueKind::Text,
            ValueKind::Text,
            ValueKind::Boolean,
            ValueKind::Boolean,
            ValueKind::Boolean,
            time,
            time,
        ]
    }

    fn row_to_user(&self, row: Vec<Value>) -> Result<UserModel, StorageError> {
        if row.len() != USER_COLUMN_COUNT {
            return Err(StorageError::TypeMismatch(format!(
                "expected {} user columns, got {}",
                USER_COLUMN_COUNT,
                row.len()
            )));
        }
        let mut values = row.into_iter();
        let mut next = || {
            values
                .next()
                .ok_or_else(|| StorageError::StorageError("user row exhausted".to_string()))
        };

        Ok(UserModel {
            id: UserId(next()?.into_int()?),
            username: next()?.into_string()?,
            password: next()?.into_string()?,
            email: next()?.into_string()?,
            first_name: next()?.into_string()?,
            last_name: next()?.into_string()?,
            is_superuser: next()?.into_bool()?,
            is_staff: next()?.into_bool()?,
            is_active: next()?.into_bool()?,
            date_joined: self.bridge.convert_time_scan(next()?)?,
            last_login: self.bridge.convert_time_scan(next()?)?,
        })
    }

    /// The bound value for one field; times go through the bridge.
    fn field_value(&self, user: &UserModel, field: UserField) -> Value {
        match field {
            UserField::Username => Value::from(&user.username),
            UserField::Password => Value::from(&user.password),
            UserField::EMail => Value::from(&user.email),
            UserField::FirstName => Value::from(&user.first_name),
            UserField::LastName => Value::from(&user.last_name),
            UserField::IsSuperUser => Value::from(user.is_superuser),
            UserField::IsStaff => Value::from(user.is_staff),
            UserField::IsActive => Value::from(user.is_active),
            UserField::DateJoined => self.bridge.convert_time(&user.date_joined),
            UserField::LastLogin => self.bridge.convert_time(&user.last_login),
        }
    }

    fn full_row_values(&self, user: &UserModel) -> Vec<Value> {
        UserField::ALL
            .iter()
            .map(|field| self.field_value(user, *field))
            .collect()
    }

    async fn fetch_user(
        &self,
        sql: &str,
        key: Value,
        description: String,
    ) -> Result<UserModel, StorageError> {
        let row = self
            .executor
            .fetch_optional(sql, &[key], &self.row_kinds())
            .await
            .map_err(StorageError::database)?;

        match row {
            Some(row) => self.row_to_user(row),
            None => Err(StorageError::NotFound(description)),
        }
    }
}

/// Parse field names, rejecting unknown and repeated ones.
fn resolve_fields(fields: &[&str]) -> Result<Vec<UserField>, StorageError> {
    let mut resolved: Vec<UserField> = Vec::with_capacity(fields.len());
    for name in fields {
        let field: UserField = name.parse()?;
        if resolved.contains(&field) {
            return Err(StorageError::DuplicateField(field.name().to_string()));
        }
        resolved.push(field);
    }
    Ok(resolved)
}

#[async_trait]
impl<E, Q, B> UserStorage for SqlUserStorage<E, Q, B>
where
    E: SqlExecutor,
    Q: UserQueries,
    B: SqlBridge<Error = E::Error>,
{
    async fn init_users(&self) -> Result<(), StorageError> {
        for statement in self.queries.init_users() {
            self.executor
                .execute(statement, &[])
                .await
                .map_err(StorageError::database)?;
        }
        debug!(
            statements = self.queries.init_users().len(),
            "users schema initialized"
        );
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<UserModel, StorageError> {
        self.fetch_user(self.queries.get_user(), id.into(), format!("user with id {}", id))
            .await
    }

    async fn get_user_by_name(&self, username: &str) -> Result<UserModel, StorageError> {
        self.fetch_user(
            self.queries.get_user_by_name(),
            username.into(),
            format!("user with username \"{}\"", username),
        )
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserModel, StorageError> {
        self.fetch_user(
            self.queries.get_user_by_email(),
            email.into(),
            format!("user with email \"{}\"", email),
        )
        .await
    }

    async fn insert_user(&self, user: &mut UserModel) -> Result<UserId, StorageError> {
        user.id = UserId::INVALID;
        user.date_joined = StorageDatetime::now();
        user.last_login = StorageDatetime::zero();

        let params = self.full_row_values(user);
        let result = self
            .executor
            .fetch_optional(self.queries.insert_user(), &params, &[ValueKind::BigInt])
            .await;

        let row = match result {
            Ok(row) => row,
            Err(err) if self.bridge.is_duplicate_insert(&err) => {
                warn!(username = %user.username, "user insert rejected by unique constraint");
                return Err(StorageError::UserExists(format!(
                    "unique constraint failed: {}",
                    err
                )));
            }
            Err(err) => return Err(StorageError::database(err)),
        };

        let id = row
            .and_then(|values| values.into_iter().next())
            .ok_or_else(|| StorageError::StorageError("insert returned no id".to_string()))?
            .into_int()?;

        user.id = UserId(id);
        debug!(id, username = %user.username, "user inserted");
        Ok(user.id)
    }

    async fn update_user(
        &self,
        id: UserId,
        user: &UserModel,
        fields: &[&str],
    ) -> Result<(), StorageError> {
        let resolved = resolve_fields(fields)?;

        let (sql, mut params) = if resolved.is_empty() || !self.queries.supports_user_fields() {
            (self.queries.update_user(&[])?, self.full_row_values(user))
        } else {
            let params = resolved
                .iter()
                .map(|field| self.field_value(user, *field))
                .collect::<Vec<_>>();
            (self.queries.update_user(fields)?, params)
        };
        params.push(id.into());

        match self.executor.execute(&sql, &params).await {
            Ok(rows) => {
                debug!(%id, rows, fields = fields.len(), "user updated");
                Ok(())
            }
            Err(err) if self.bridge.is_duplicate_update(&err) => {
                warn!(%id, "user update rejected by unique constraint");
                Err(StorageError::AmbiguousCredentials(format!(
                    "unique constraint failed: {}",
                    err
                )))
            }
            Err(err) => Err(StorageError::database(err)),
        }
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let rows = self
            .executor
            .execute(self.queries.delete_user(), &[id.into()])
            .await
            .map_err(StorageError::database)?;
        debug!(%id, rows, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBridge, MockError, MockExecutor, MockUserQueries};

    type MockUserStorage = SqlUserStorage<MockExecutor, MockUserQueries, MockBridge>;

    fn storage(executor: MockExecutor) -> MockUserStorage {
        SqlUserStorage::new(executor, MockUserQueries::new(true), MockBridge)
    }

    fn stored_row(id: i64, username: &str) -> Vec<Value> {
        let joined = StorageDatetime::now();
        vec![
            Value::Int(id),
            Value::from(username),
            Value::from("hash"),
            Value::from(format!("{}@example.com", username)),
            Value::from("First"),
            Value::from("Last"),
            Value::Bool(false),
            Value::Bool(false),
            Value::Bool(true),
            Value::Datetime(joined),
            Value::Datetime(StorageDatetime::zero()),
        ]
    }

    #[tokio::test]
    async fn insert_stamps_times_and_sets_id() {
        let executor = MockExecutor::new();
        executor.push_row(vec![Value::Int(42)]);
        let storage = storage(executor);

        let before = StorageDatetime::now();
        let mut user = UserModel::new("alice", "hash", "alice@example.com");
        user.last_login = before;
        let id = storage.insert_user(&mut user).await.unwrap();
        let after = StorageDatetime::now();

        assert_eq!(id, UserId(42));
        assert_eq!(user.id, UserId(42));
        assert!(user.last_login.is_zero());
        assert!(before <= user.date_joined && user.date_joined <= after);

        let calls = storage.executor().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sql, "INSERT USER");
        assert_eq!(calls[0].params.len(), 10);
        assert_eq!(calls[0].params[0], Value::from("alice"));
        assert_eq!(calls[0].params[2], Value::from("alice@example.com"));
        assert_eq!(calls[0].params[9], Value::Datetime(StorageDatetime::zero()));
    }

    #[tokio::test]
    async fn duplicate_insert_becomes_user_exists() {
        let executor = MockExecutor::new();
        executor.push_error(MockError::Duplicate);
        let storage = storage(executor);

        let mut user = UserModel::new("alice", "hash", "alice@example.com");
        user.id = UserId(3);
        let err = storage.insert_user(&mut user).await.unwrap_err();

        assert!(matches!(err, StorageError::UserExists(_)));
        assert_eq!(user.id, UserId::INVALID);
    }

    #[tokio::test]
    async fn other_insert_failures_pass_through() {
        let executor = MockExecutor::new();
        executor.push_error(MockError::Broken);
        let storage = storage(executor);

        let mut user = UserModel::new("alice", "hash", "alice@example.com");
        let err = storage.insert_user(&mut user).await.unwrap_err();

        match err {
            StorageError::Database(source) => {
                assert!(source.downcast_ref::<MockError>().is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(user.id, UserId::INVALID);
    }

    #[tokio::test]
    async fn fetch_decodes_every_column() {
        let executor = MockExecutor::new();
        executor.push_row(stored_row(7, "bob"));
        let storage = storage(executor);

        let user = storage.get_user_by_name("bob").await.unwrap();
        assert_eq!(user.id, UserId(7));
        assert_eq!(user.username, "bob");
        assert_eq!(user.email, "bob@example.com");
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(user.last_login.is_zero());

        let calls = storage.executor().calls();
        assert_eq!(calls[0].sql, "GET USER BY NAME");
        assert_eq!(calls[0].params, vec![Value::from("bob")]);
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let storage = storage(MockExecutor::new());
        let err = storage.get_user(UserId(9)).await.unwrap_err();
        assert!(err.is_not_found());

        let err = storage.get_user_by_email("x@example.com").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn fetch_failure_is_not_not_found() {
        let executor = MockExecutor::new();
        executor.push_error(MockError::Broken);
        let storage = storage(executor);

        let err = storage.get_user(UserId(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
    }

    #[tokio::test]
    async fn malformed_time_column_is_a_type_mismatch() {
        let executor = MockExecutor::new();
        let mut row = stored_row(7, "bob");
        row[9] = Value::from("yesterday");
        executor.push_row(row);
        let storage = storage(executor);

        let err = storage.get_user(UserId(7)).await.unwrap_err();
        assert!(matches!(err, StorageError::TypeMismatch(_)));
    }

    #[tokio::test]
    async fn empty_fields_update_full_row() {
        let storage = storage(MockExecutor::new());
        let user = UserModel::new("carol", "hash", "carol@example.com");

        storage.update_user(UserId(5), &user, &[]).await.unwrap();

        let calls = storage.executor().calls();
        assert_eq!(calls[0].sql, "UPDATE USER FULL");
        assert_eq!(calls[0].params.len(), 11);
        assert_eq!(calls[0].params[10], Value::Int(5));
    }

    #[tokio::test]
    async fn partial_update_binds_named_fields_then_id() {
        let storage = storage(MockExecutor::new());
        let mut user = UserModel::new("carol", "hash", "carol@example.com");
        user.first_name = "Caroline".to_string();

        storage
            .update_user(UserId(5), &user, &["FirstName", "LastLogin"])
            .await
            .unwrap();

        let calls = storage.executor().calls();
        assert_eq!(calls[0].sql, "UPDATE USER FirstName,LastLogin");
        assert_eq!(
            calls[0].params,
            vec![
                Value::from("Caroline"),
                Value::Datetime(StorageDatetime::zero()),
                Value::Int(5),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_field_fails_before_executing() {
        let storage = storage(MockExecutor::new());
        let user = UserModel::new("carol", "hash", "carol@example.com");

        let err = storage
            .update_user(UserId(5), &user, &["FirstName", "Nickname"])
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UnknownField(name) if name == "Nickname"));
        assert!(storage.executor().calls().is_empty());
    }

    #[tokio::test]
    async fn repeated_field_fails_before_executing() {
        let storage = storage(MockExecutor::new());
        let user = UserModel::new("carol", "hash", "carol@example.com");

        let err = storage
            .update_user(UserId(5), &user, &["EMail", "EMail"])
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::DuplicateField(_)));
        assert!(storage.executor().calls().is_empty());
    }

    #[tokio::test]
    async fn partial_update_falls_back_without_field_support() {
        let storage = SqlUserStorage::new(
            MockExecutor::new(),
            MockUserQueries::new(false),
            MockBridge,
        );
        let user = UserModel::new("carol", "hash", "carol@example.com");

        storage
            .update_user(UserId(5), &user, &["FirstName"])
            .await
            .unwrap();

        let calls = storage.executor().calls();
        assert_eq!(calls[0].sql, "UPDATE USER FULL");
        assert_eq!(calls[0].params.len(), 11);
    }

    #[tokio::test]
    async fn duplicate_update_becomes_ambiguous_credentials() {
        let executor = MockExecutor::new();
        executor.push_error(MockError::Duplicate);
        let storage = storage(executor);
        let user = UserModel::new("carol", "hash", "taken@example.com");

        let err = storage
            .update_user(UserId(5), &user, &["EMail"])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AmbiguousCredentials(_)));
    }

    #[tokio::test]
    async fn delete_of_missing_user_succeeds() {
        let executor = MockExecutor::new();
        executor.push_affected(0);
        let storage = storage(executor);

        storage.delete_user(UserId(404)).await.unwrap();
        assert_eq!(storage.executor().calls()[0].params, vec![Value::Int(404)]);
    }

    #[tokio::test]
    async fn init_runs_statements_in_order_and_stops_on_error() {
        let storage = storage(MockExecutor::new());
        storage.init_users().await.unwrap();
        let sql: Vec<String> = storage
            .executor()
            .calls()
            .into_iter()
            .map(|call| call.sql)
            .collect();
        assert_eq!(sql, vec!["CREATE USERS", "INDEX USERNAME", "INDEX EMAIL"]);

        let executor = MockExecutor::new();
        executor.push_error(MockError::Broken);
        let failing = SqlUserStorage::new(executor, MockUserQueries::new(true), MockBridge);
        assert!(failing.init_users().await.is_err());
        assert_eq!(failing.executor().calls().len(), 1);
    }
}

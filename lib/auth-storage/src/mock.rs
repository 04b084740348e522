//! Recording executor and stub collaborators for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    ErrorClass, SessionQueries, SqlBridge, SqlExecutor, StorageDatetime, StorageError, UserColumns,
    UserQueries, Value, ValueKind, WriteKind,
};

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("duplicate key")]
    Duplicate,
    #[error("connection reset")]
    Broken,
}

enum Response {
    Row(Vec<Value>),
    Affected(u64),
    Error(MockError),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Replays queued responses in order and records every statement.
///
/// With nothing queued, `execute` reports zero rows and `fetch_optional`
/// finds nothing.
#[derive(Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<Response>>,
    calls: Mutex<Vec<Call>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&self, row: Vec<Value>) {
        self.responses.lock().unwrap().push_back(Response::Row(row));
    }

    pub fn push_affected(&self, rows: u64) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Response::Affected(rows));
    }

    pub fn push_error(&self, err: MockError) {
        self.responses.lock().unwrap().push_back(Response::Error(err));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[Value]) -> Option<Response> {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        self.responses.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl SqlExecutor for MockExecutor {
    type Error = MockError;

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, MockError> {
        match self.record(sql, params) {
            Some(Response::Affected(rows)) => Ok(rows),
            Some(Response::Row(_)) => Ok(1),
            Some(Response::Error(err)) => Err(err),
            None => Ok(0),
        }
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
        _kinds: &[ValueKind],
    ) -> Result<Option<Vec<Value>>, MockError> {
        match self.record(sql, params) {
            Some(Response::Row(row)) => Ok(Some(row)),
            Some(Response::Error(err)) => Err(err),
            Some(Response::Affected(_)) | None => Ok(None),
        }
    }
}

pub struct MockBridge;

impl SqlBridge for MockBridge {
    type Error = MockError;

    fn convert_time(&self, time: &StorageDatetime) -> Value {
        Value::Datetime(*time)
    }

    fn time_scan_type(&self) -> ValueKind {
        ValueKind::Datetime
    }

    fn convert_time_scan(&self, value: Value) -> Result<StorageDatetime, StorageError> {
        match value {
            Value::Datetime(dt) => Ok(dt),
            other => Err(StorageError::TypeMismatch(other.kind_name().to_string())),
        }
    }

    fn classify(&self, err: &MockError, kind: WriteKind) -> ErrorClass {
        match (err, kind) {
            (MockError::Duplicate, WriteKind::Insert) => ErrorClass::DuplicateInsert,
            (MockError::Duplicate, WriteKind::Update) => ErrorClass::DuplicateUpdate,
            (MockError::Broken, _) => ErrorClass::Other,
        }
    }
}

/// Statement names stand in for SQL so tests can see which one ran.
pub struct MockUserQueries {
    supports_fields: bool,
    columns: UserColumns,
    init: Vec<String>,
}

impl MockUserQueries {
    pub fn new(supports_fields: bool) -> Self {
        Self {
            supports_fields,
            columns: UserColumns::default(),
            init: vec![
                "CREATE USERS".to_string(),
                "INDEX USERNAME".to_string(),
                "INDEX EMAIL".to_string(),
            ],
        }
    }
}

impl UserQueries for MockUserQueries {
    fn init_users(&self) -> &[String] {
        &self.init
    }

    fn get_user(&self) -> &str {
        "GET USER"
    }

    fn get_user_by_name(&self) -> &str {
        "GET USER BY NAME"
    }

    fn get_user_by_email(&self) -> &str {
        "GET USER BY EMAIL"
    }

    fn insert_user(&self) -> &str {
        "INSERT USER"
    }

    fn update_user(&self, fields: &[&str]) -> Result<String, StorageError> {
        if fields.is_empty() || !self.supports_fields {
            return Ok("UPDATE USER FULL".to_string());
        }
        for name in fields {
            self.columns.column_for(name)?;
        }
        Ok(format!("UPDATE USER {}", fields.join(",")))
    }

    fn delete_user(&self) -> &str {
        "DELETE USER"
    }

    fn supports_user_fields(&self) -> bool {
        self.supports_fields
    }
}

pub struct MockSessionQueries {
    init: Vec<String>,
}

impl MockSessionQueries {
    pub fn new() -> Self {
        Self {
            init: vec!["CREATE SESSIONS".to_string(), "INDEX USER".to_string()],
        }
    }
}

impl SessionQueries for MockSessionQueries {
    fn init_sessions(&self) -> &[String] {
        &self.init
    }

    fn get_session(&self) -> &str {
        "GET SESSION"
    }

    fn insert_session(&self) -> &str {
        "INSERT SESSION"
    }

    fn delete_session(&self) -> &str {
        "DELETE SESSION"
    }

    fn clean_up_sessions(&self) -> &str {
        "CLEAN UP SESSIONS"
    }

    fn delete_sessions_for_user(&self) -> &str {
        "DELETE SESSIONS FOR USER"
    }
}

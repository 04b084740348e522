//! PostgreSQL statement templates and the query sets rendered from them.

use auth_storage::{
    SessionQueries, SqlTemplateReplacer, StorageError, UserColumns, UserField, UserQueries,
};

const SELECT_COLUMNS: &str = "$SELECT_COLUMNS$";
const INSERT_COLUMNS: &str = "$INSERT_COLUMNS$";
const INSERT_PARAMS: &str = "$INSERT_PARAMS$";
const UPDATE_ALL: &str = "$UPDATE_ALL$";
const FULL_ID_PARAM: &str = "$FULL_ID_PARAM$";

// Filled per call by `PgUserQueries::update_user`.
const UPDATE_CONTENT: &str = "$UPDATE_CONTENT$";
const ID_PARAM_NUM: &str = "$ID_PARAM_NUM$";

pub const POSTGRES_USERS_INIT: &str = "CREATE TABLE IF NOT EXISTS $USERS_TABLE_NAME$ (
id BIGSERIAL PRIMARY KEY,
username VARCHAR(150) NOT NULL UNIQUE,
password VARCHAR(270) NOT NULL,
email VARCHAR(254) NOT NULL $EMAIL_UNIQUE$,
first_name VARCHAR(50) NOT NULL,
last_name VARCHAR(150) NOT NULL,
is_superuser BOOL NOT NULL,
is_staff BOOL NOT NULL,
is_active BOOL NOT NULL,
date_joined TIMESTAMPTZ NOT NULL,
last_login TIMESTAMPTZ NOT NULL
);";

pub const POSTGRES_USERNAME_INDEX: &str = "CREATE INDEX IF NOT EXISTS \
$USERS_INDEX_PREFIX$_username_idx
ON $USERS_TABLE_NAME$ (username);";

pub const POSTGRES_EMAIL_INDEX: &str = "CREATE INDEX IF NOT EXISTS \
$USERS_INDEX_PREFIX$_email_idx
ON $USERS_TABLE_NAME$ (email);";

pub const POSTGRES_QUERY_USERID: &str =
    "SELECT $SELECT_COLUMNS$ FROM $USERS_TABLE_NAME$ WHERE id=$1;";

pub const POSTGRES_QUERY_USERNAME: &str =
    "SELECT $SELECT_COLUMNS$ FROM $USERS_TABLE_NAME$ WHERE username=$1;";

pub const POSTGRES_QUERY_USERMAIL: &str =
    "SELECT $SELECT_COLUMNS$ FROM $USERS_TABLE_NAME$ WHERE email=$1;";

pub const POSTGRES_INSERT_USER: &str = "INSERT INTO $USERS_TABLE_NAME$ ($INSERT_COLUMNS$)
VALUES ($INSERT_PARAMS$)
RETURNING id;";

pub const POSTGRES_UPDATE_USER: &str = "UPDATE $USERS_TABLE_NAME$
SET $UPDATE_ALL$
WHERE id=$FULL_ID_PARAM$;";

pub const POSTGRES_UPDATE_USER_FIELDS: &str = "UPDATE $USERS_TABLE_NAME$
SET $UPDATE_CONTENT$
WHERE id=$ID_PARAM_NUM$;";

pub const POSTGRES_DELETE_USER: &str = "DELETE FROM $USERS_TABLE_NAME$ WHERE id=$1;";

pub const POSTGRES_SESSIONS_INIT: &str = "CREATE TABLE IF NOT EXISTS $SESSIONS_TABLE_NAME$ (
session_key VARCHAR(128) PRIMARY KEY,
user_id BIGINT NOT NULL REFERENCES $USERS_TABLE_NAME$ (id) ON DELETE CASCADE,
expire_date TIMESTAMPTZ NOT NULL,
data JSONB NOT NULL
);";

pub const POSTGRES_SESSION_USER_INDEX: &str = "CREATE INDEX IF NOT EXISTS \
$SESSIONS_INDEX_PREFIX$_user_idx
ON $SESSIONS_TABLE_NAME$ (user_id);";

pub const POSTGRES_SESSION_EXPIRE_INDEX: &str = "CREATE INDEX IF NOT EXISTS \
$SESSIONS_INDEX_PREFIX$_expire_idx
ON $SESSIONS_TABLE_NAME$ (expire_date);";

pub const POSTGRES_QUERY_SESSION: &str = "SELECT session_key, user_id, expire_date, data
FROM $SESSIONS_TABLE_NAME$ WHERE session_key=$1;";

pub const POSTGRES_INSERT_SESSION: &str = "INSERT INTO $SESSIONS_TABLE_NAME$ \
(session_key, user_id, expire_date, data)
VALUES ($1, $2, $3, $4);";

pub const POSTGRES_DELETE_SESSION: &str =
    "DELETE FROM $SESSIONS_TABLE_NAME$ WHERE session_key=$1;";

pub const POSTGRES_CLEAN_UP_SESSIONS: &str =
    "DELETE FROM $SESSIONS_TABLE_NAME$ WHERE expire_date <= $1;";

pub const POSTGRES_DELETE_SESSIONS_FOR_USER: &str =
    "DELETE FROM $SESSIONS_TABLE_NAME$ WHERE user_id=$1;";

/// `col=$1, col=$2, ...` in the given order.
fn assignments(columns: &[&str]) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| format!("{}=${}", column, idx + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

fn param_list(count: usize) -> String {
    (1..=count)
        .map(|idx| format!("${}", idx))
        .collect::<Vec<_>>()
        .join(", ")
}

/// User statements rendered for PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgUserQueries {
    init: Vec<String>,
    get_user: String,
    get_user_by_name: String,
    get_user_by_email: String,
    insert_user: String,
    update_user: String,
    update_fields: Option<String>,
    delete_user: String,
    columns: UserColumns,
}

impl PgUserQueries {
    pub fn new(replacer: &SqlTemplateReplacer, columns: UserColumns) -> Self {
        let field_columns: Vec<&str> = UserField::ALL
            .iter()
            .map(|field| columns.column(*field))
            .collect();

        let mut replacer = replacer.clone();
        replacer.set(SELECT_COLUMNS, columns.select_order().join(", "));
        replacer.set(INSERT_COLUMNS, field_columns.join(", "));
        replacer.set(INSERT_PARAMS, param_list(field_columns.len()));
        replacer.set(UPDATE_ALL, assignments(&field_columns));
        replacer.set(FULL_ID_PARAM, format!("${}", field_columns.len() + 1));

        Self {
            init: vec![
                replacer.apply(POSTGRES_USERS_INIT),
                replacer.apply(POSTGRES_USERNAME_INDEX),
                replacer.apply(POSTGRES_EMAIL_INDEX),
            ],
            get_user: replacer.apply(POSTGRES_QUERY_USERID),
            get_user_by_name: replacer.apply(POSTGRES_QUERY_USERNAME),
            get_user_by_email: replacer.apply(POSTGRES_QUERY_USERMAIL),
            insert_user: replacer.apply(POSTGRES_INSERT_USER),
            update_user: replacer.apply(POSTGRES_UPDATE_USER),
            update_fields: Some(replacer.apply(POSTGRES_UPDATE_USER_FIELDS)),
            delete_user: replacer.apply(POSTGRES_DELETE_USER),
            columns,
        }
    }

    /// Disable partial updates; every update rewrites the full row.
    pub fn without_field_updates(mut self) -> Self {
        self.update_fields = None;
        self
    }

    pub fn columns(&self) -> &UserColumns {
        &self.columns
    }
}

impl Default for PgUserQueries {
    fn default() -> Self {
        Self::new(&SqlTemplateReplacer::default(), UserColumns::default())
    }
}

impl UserQueries for PgUserQueries {
    fn init_users(&self) -> &[String] {
        &self.init
    }

    fn get_user(&self) -> &str {
        &self.get_user
    }

    fn get_user_by_name(&self) -> &str {
        &self.get_user_by_name
    }

    fn get_user_by_email(&self) -> &str {
        &self.get_user_by_email
    }

    fn insert_user(&self) -> &str {
        &self.insert_user
    }

    fn update_user(&self, fields: &[&str]) -> Result<String, StorageError> {
        let template = match &self.update_fields {
            Some(template) if !fields.is_empty() => template,
            _ => return Ok(self.update_user.clone()),
        };

        let columns = fields
            .iter()
            .map(|name| self.columns.column_for(name))
            .collect::<Result<Vec<_>, _>>()?;

        // two fixed tokens, no replacer needed
        Ok(template
            .replacen(UPDATE_CONTENT, &assignments(&columns), 1)
            .replacen(ID_PARAM_NUM, &format!("${}", fields.len() + 1), 1))
    }

    fn delete_user(&self) -> &str {
        &self.delete_user
    }

    fn supports_user_fields(&self) -> bool {
        self.update_fields.is_some()
    }
}

/// Session statements rendered for PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgSessionQueries {
    init: Vec<String>,
    get_session: String,
    insert_session: String,
    delete_session: String,
    clean_up_sessions: String,
    delete_sessions_for_user: String,
}

impl PgSessionQueries {
    pub fn new(replacer: &SqlTemplateReplacer) -> Self {
        Self {
            init: vec![
                replacer.apply(POSTGRES_SESSIONS_INIT),
                replacer.apply(POSTGRES_SESSION_USER_INDEX),
                replacer.apply(POSTGRES_SESSION_EXPIRE_INDEX),
            ],
            get_session: replacer.apply(POSTGRES_QUERY_SESSION),
            insert_session: replacer.apply(POSTGRES_INSERT_SESSION),
            delete_session: replacer.apply(POSTGRES_DELETE_SESSION),
            clean_up_sessions: replacer.apply(POSTGRES_CLEAN_UP_SESSIONS),
            delete_sessions_for_user: replacer.apply(POSTGRES_DELETE_SESSIONS_FOR_USER),
        }
    }
}

impl Default for PgSessionQueries {
    fn default() -> Self {
        Self::new(&SqlTemplateReplacer::default())
    }
}

impl SessionQueries for PgSessionQueries {
    fn init_sessions(&self) -> &[String] {
        &self.init
    }

    fn get_session(&self) -> &str {
        &self.get_session
    }

    fn insert_session(&self) -> &str {
        &self.insert_session
    }

    fn delete_session(&self) -> &str {
        &self.delete_session
    }

    fn clean_up_sessions(&self) -> &str {
        &self.clean_up_sessions
    }

    fn delete_sessions_for_user(&self) -> &str {
        &self.delete_sessions_for_user
    }
}

//! Storage traits for users and sessions plus connection configuration.
//!
//! - `UserStorage`: CRUD for user records
//! - `SessionStorage`: lifecycle of login sessions
//! - `StorageConnection`: Database connection and initialization

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::template::EMAIL_UNIQUE;
use crate::{SessionModel, SqlTemplateReplacer, StorageDatetime, StorageError, UserId, UserModel};

const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// Connection configuration for database backends.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// Connect using a database URL string.
    Url(String),
}

impl From<&str> for ConnectionConfig {
    fn from(url: &str) -> Self {
        ConnectionConfig::Url(url.to_string())
    }
}

impl From<String> for ConnectionConfig {
    fn from(url: String) -> Self {
        ConnectionConfig::Url(url)
    }
}

impl From<&String> for ConnectionConfig {
    fn from(url: &String) -> Self {
        ConnectionConfig::Url(url.clone())
    }
}

/// Everything a backend needs to open a pool and render its statements.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub connection: ConnectionConfig,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Template token overrides, e.g. `"$USERS_TABLE_NAME$" = "accounts"`.
    #[serde(default)]
    pub replacements: HashMap<String, String>,

    /// Whether the email column carries a unique constraint.
    #[serde(default = "default_email_unique")]
    pub email_unique: bool,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_email_unique() -> bool {
    true
}

impl StorageConfig {
    pub fn new(connection: impl Into<ConnectionConfig>) -> Self {
        Self {
            connection: connection.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            replacements: HashMap::new(),
            email_unique: true,
        }
    }

    pub fn with_replacement(
        mut self,
        token: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        self.replacements.insert(token.into(), fragment.into());
        self
    }

    pub fn with_email_unique(mut self, email_unique: bool) -> Self {
        self.email_unique = email_unique;
        self
    }

    /// Defaults, then `replacements`, then the email uniqueness flag.
    pub fn replacer(&self) -> SqlTemplateReplacer {
        let mut replacer = SqlTemplateReplacer::with_overrides(&self.replacements);
        if !self.email_unique {
            replacer.set(EMAIL_UNIQUE, "");
        }
        replacer
    }
}

impl From<ConnectionConfig> for StorageConfig {
    fn from(connection: ConnectionConfig) -> Self {
        StorageConfig::new(connection)
    }
}

impl From<&str> for StorageConfig {
    fn from(url: &str) -> Self {
        StorageConfig::new(url)
    }
}

impl From<String> for StorageConfig {
    fn from(url: String) -> Self {
        StorageConfig::new(url)
    }
}

/// Trait for database connection and initialization.
#[async_trait]
pub trait StorageConnection: Sized + Send + Sync {
    /// Connect to the database using the provided configuration.
    async fn connect(config: impl Into<StorageConfig> + Send) -> Result<Self, StorageError>;

    /// Create users and sessions tables (and their indexes) if absent.
    async fn initialize(&self) -> Result<(), StorageError>;
}

/// Storage contract for user records.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Create the users table and its indexes. Safe to call repeatedly.
    async fn init_users(&self) -> Result<(), StorageError>;

    /// Returns [`StorageError::NotFound`] if no user has this id.
    async fn get_user(&self, id: UserId) -> Result<UserModel, StorageError>;

    async fn get_user_by_name(&self, username: &str) -> Result<UserModel, StorageError>;

    async fn get_user_by_email(&self, email: &str) -> Result<UserModel, StorageError>;

    /// Insert a new user and return its id.
    ///
    /// Sets `date_joined` to now and `last_login` to the zero time on the
    /// model. On success `user.id` holds the new id, on failure it is
    /// [`UserId::INVALID`]. A username (or unique email) collision yields
    /// [`StorageError::UserExists`].
    async fn insert_user(&self, user: &mut UserModel) -> Result<UserId, StorageError>;

    /// Write `user` to the row with `id`.
    ///
    /// An empty `fields` slice rewrites every field. Otherwise only the named
    /// fields are written. A collision on username or email yields
    /// [`StorageError::AmbiguousCredentials`].
    async fn update_user(
        &self,
        id: UserId,
        user: &UserModel,
        fields: &[&str],
    ) -> Result<(), StorageError>;

    /// Delete the user with `id`. Deleting a missing user is not an error.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;
}

/// Storage contract for login sessions.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Create the sessions table and its indexes. Safe to call repeatedly.
    async fn init_sessions(&self) -> Result<(), StorageError>;

    /// A key collision yields [`StorageError::SessionExists`].
    async fn insert_session(&self, session: &SessionModel) -> Result<(), StorageError>;

    async fn get_session(&self, key: &str) -> Result<SessionModel, StorageError>;

    /// Deleting a missing session is not an error.
    async fn delete_session(&self, key: &str) -> Result<(), StorageError>;

    /// Delete every session that expires at or before `reference`.
    async fn clean_up_expired(&self, reference: &StorageDatetime) -> Result<u64, StorageError>;

    async fn delete_sessions_for_user(&self, user: UserId) -> Result<u64, StorageError>;
}

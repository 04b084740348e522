//! Ready-made PostgreSQL user and session stores.

use async_trait::async_trait;
use auth_storage::{
    ConnectionConfig, SessionStorage, SqlSessionStorage, SqlTemplateReplacer, SqlUserStorage,
    StorageConfig, StorageConnection, StorageError, UserColumns, UserStorage,
};
use tracing::info;

use crate::{PgBridge, PgPool, PgSessionQueries, PgUserQueries};

pub type PgUserStorage = SqlUserStorage<PgPool, PgUserQueries, PgBridge>;

pub type PgSessionStorage = SqlSessionStorage<PgPool, PgSessionQueries, PgBridge>;

/// User storage with statements rendered by `replacer`.
pub fn pg_user_storage(pool: PgPool, replacer: &SqlTemplateReplacer) -> PgUserStorage {
    let queries = PgUserQueries::new(replacer, UserColumns::default());
    SqlUserStorage::new(pool, queries, PgBridge::new())
}

/// Session storage with statements rendered by `replacer`.
///
/// The replacer must name the same users table as the user storage, the
/// sessions table references it.
pub fn pg_session_storage(pool: PgPool, replacer: &SqlTemplateReplacer) -> PgSessionStorage {
    SqlSessionStorage::new(pool, PgSessionQueries::new(replacer), PgBridge::new())
}

/// User and session storage sharing one pool and one set of replacements.
///
/// ```text
/// let storage = PgAuthStorage::connect("postgres://localhost/auth").await?;
/// storage.initialize().await?;
/// let id = storage.users.insert_user(&mut user).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PgAuthStorage {
    pub users: PgUserStorage,
    pub sessions: PgSessionStorage,
}

impl PgAuthStorage {
    pub fn new(pool: PgPool, replacer: &SqlTemplateReplacer) -> Self {
        Self {
            users: pg_user_storage(pool.clone(), replacer),
            sessions: pg_session_storage(pool, replacer),
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.users.executor()
    }
}

#[async_trait]
impl StorageConnection for PgAuthStorage {
    async fn connect(config: impl Into<StorageConfig> + Send) -> Result<Self, StorageError> {
        let config = config.into();
        let ConnectionConfig::Url(url) = &config.connection;
        let pool = PgPool::connect_with(url, config.max_connections).await?;
        info!(max_connections = config.max_connections, "connected to postgres");
        Ok(Self::new(pool, &config.replacer()))
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        // sessions reference users
        self.users.init_users().await?;
        self.sessions.init_sessions().await?;
        Ok(())
    }
}

//! PostgreSQL implementation for auth-storage.
//!
//! This crate supplies the two PostgreSQL-specific collaborators of the
//! generic engines in `auth-storage`:
//!
//! - [`PgUserQueries`] / [`PgSessionQueries`]: statement templates rendered
//!   once through a [`SqlTemplateReplacer`]
//! - [`PgBridge`]: `TIMESTAMPTZ` conversion and SQLSTATE `23505` detection
//!
//! plus [`PgPool`], an sqlx pool wrapper implementing `SqlExecutor`.
//!
//! # Usage
//!
//! ```text
//! use auth_storage_postgres::{PgAuthStorage, StorageConfig, StorageConnection, UserStorage};
//!
//! let config = StorageConfig::new("postgres://localhost/auth")
//!     .with_replacement("$USERS_TABLE_NAME$", "accounts")
//!     .with_email_unique(false);
//! let storage = PgAuthStorage::connect(config).await?;
//! storage.initialize().await?;
//!
//! let user = storage.users.get_user_by_name("alice").await?;
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod bridge;
mod executor;
mod queries;
mod storage;

pub use bridge::{POSTGRES_UNIQUE_VIOLATION, PgBridge};
pub use executor::PgPool;
pub use queries::{PgSessionQueries, PgUserQueries};
pub use storage::{
    PgAuthStorage, PgSessionStorage, PgUserStorage, pg_session_storage, pg_user_storage,
};

// Re-export core types for convenience
pub use auth_storage::{
    ConnectionConfig, ErrorClass, SessionModel, SessionStorage, SqlTemplateReplacer,
    StorageConfig, StorageConnection, StorageDatetime, StorageError, UserColumns, UserField,
    UserId, UserModel, UserStorage,
};

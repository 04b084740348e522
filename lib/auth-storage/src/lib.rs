//! Auth Storage - a database-agnostic SQL engine for user and session records.
//!
//! The engine is composed from three collaborators rather than specialized by
//! subclassing:
//!
//! - a [`SqlExecutor`]: the caller's connection or pool
//! - a query provider ([`UserQueries`] / [`SessionQueries`]): SQL text rendered
//!   once, at construction, from dialect templates via [`SqlTemplateReplacer`]
//! - a [`SqlBridge`]: time conversion and duplicate-key detection for one driver
//!
//! A backend crate supplies the provider and bridge; [`SqlUserStorage`] and
//! [`SqlSessionStorage`] do the rest.
//!
//! # Traits
//!
//! - [`UserStorage`]: CRUD for users, including partial updates by field name
//! - [`SessionStorage`]: session insert, lookup, deletion and expiry clean-up
//! - [`StorageConnection`]: connect and initialize a backend

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

mod bridge;
mod error;
#[cfg(test)]
mod mock;
mod model;
mod queries;
mod repository;
mod session;
pub mod template;
mod time;
mod user;
mod value;

pub use bridge::{ErrorClass, SqlBridge, WriteKind};
pub use error::StorageError;
pub use model::{SessionModel, UserField, UserId, UserModel};
pub use queries::{SessionQueries, UserColumns, UserQueries};
pub use repository::{
    ConnectionConfig, SessionStorage, StorageConfig, StorageConnection, UserStorage,
};
pub use session::SqlSessionStorage;
pub use template::SqlTemplateReplacer;
pub use time::StorageDatetime;
pub use user::SqlUserStorage;
pub use value::{SqlExecutor, Value, ValueKind};

//! Query provider capabilities consumed by the SQL storage engines.
//!
//! A provider holds SQL text that has already been rendered for one dialect
//! and deployment. Positional parameter order is part of the contract:
//!
//! - fetch statements take the lookup key as `$1` and select the columns of
//!   [`UserColumns::select_order`] (users) or `key, user, expire_date, data`
//!   (sessions), in that order
//! - the user insert binds [`UserField::ALL`] in order and returns the new id
//! - the full user update binds [`UserField::ALL`] followed by the id
//! - the partial user update binds the requested fields followed by the id
//! - the session insert binds `key, user, expire_date, data`

use std::collections::BTreeMap;

use crate::{StorageError, UserField};

/// Field to column mapping for the users table.
///
/// Built once and handed to a query provider at construction; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserColumns {
    id: String,
    columns: BTreeMap<UserField, String>,
}

impl UserColumns {
    pub fn id_column(&self) -> &str {
        &self.id
    }

    pub fn column(&self, field: UserField) -> &str {
        self.columns
            .get(&field)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Resolve a field name to its column.
    pub fn column_for(&self, field_name: &str) -> Result<&str, StorageError> {
        let field: UserField = field_name.parse()?;
        Ok(self.column(field))
    }

    /// Id followed by every field column, the order rows are selected in.
    pub fn select_order(&self) -> Vec<&str> {
        std::iter::once(self.id_column())
            .chain(UserField::ALL.iter().map(|field| self.column(*field)))
            .collect()
    }
}

impl Default for UserColumns {
    fn default() -> Self {
        let columns = UserField::ALL
            .iter()
            .map(|field| {
                let column = match field {
                    UserField::Username => "username",
                    UserField::Password => "password",
                    UserField::EMail => "email",
                    UserField::FirstName => "first_name",
                    UserField::LastName => "last_name",
                    UserField::IsSuperUser => "is_superuser",
                    UserField::IsStaff => "is_staff",
                    UserField::IsActive => "is_active",
                    UserField::DateJoined => "date_joined",
                    UserField::LastLogin => "last_login",
                };
                (*field, column.to_string())
            })
            .collect();
        Self {
            id: "id".to_string(),
            columns,
        }
    }
}

/// Rendered SQL for every user operation.
pub trait UserQueries: Send + Sync {
    /// Schema statements in execution order (table before indexes).
    fn init_users(&self) -> &[String];

    fn get_user(&self) -> &str;

    fn get_user_by_name(&self) -> &str;

    fn get_user_by_email(&self) -> &str;

    fn insert_user(&self) -> &str;

    /// Update statement for the given fields.
    ///
    /// Returns the full update when `fields` is empty or partial updates are
    /// not supported. Fails with [`StorageError::UnknownField`] for names that
    /// are not fields of the user model.
    fn update_user(&self, fields: &[&str]) -> Result<String, StorageError>;

    fn delete_user(&self) -> &str;

    fn supports_user_fields(&self) -> bool;
}

/// Rendered SQL for every session operation.
pub trait SessionQueries: Send + Sync {
    /// Schema statements in execution order (table before indexes).
    fn init_sessions(&self) -> &[String];

    fn get_session(&self) -> &str;

    fn insert_session(&self) -> &str;

    fn delete_session(&self) -> &str;

    /// Deletes sessions whose expiry is at or before `$1`.
    fn clean_up_sessions(&self) -> &str;

    /// Deletes all sessions owned by user `$1`.
    fn delete_sessions_for_user(&self) -> &str;
}

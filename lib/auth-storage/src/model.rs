//! User and session records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{StorageDatetime, StorageError};

/// Database identity of a user.
///
/// Negative ids are never handed out by the store; [`UserId::INVALID`] marks a
/// model that has not been persisted (or whose insert failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub const INVALID: UserId = UserId(-1);

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl Default for UserId {
    fn default() -> Self {
        UserId::INVALID
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    pub id: UserId,
    pub username: String,
    /// Password hash, never the plain password.
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: StorageDatetime,
    pub last_login: StorageDatetime,
}

impl UserModel {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
            ..Self::default()
        }
    }
}

/// The mutable fields of [`UserModel`], addressed by name in partial updates.
///
/// The id is deliberately absent: once assigned it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserField {
    Username,
    Password,
    EMail,
    FirstName,
    LastName,
    IsSuperUser,
    IsStaff,
    IsActive,
    DateJoined,
    LastLogin,
}

impl UserField {
    /// All fields in full-row order (the order of the insert and full update statements).
    pub const ALL: [UserField; 10] = [
        UserField::Username,
        UserField::Password,
        UserField::EMail,
        UserField::FirstName,
        UserField::LastName,
        UserField::IsSuperUser,
        UserField::IsStaff,
        UserField::IsActive,
        UserField::DateJoined,
        UserField::LastLogin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UserField::Username => "Username",
            UserField::Password => "Password",
            UserField::EMail => "EMail",
            UserField::FirstName => "FirstName",
            UserField::LastName => "LastName",
            UserField::IsSuperUser => "IsSuperUser",
            UserField::IsStaff => "IsStaff",
            UserField::IsActive => "IsActive",
            UserField::DateJoined => "DateJoined",
            UserField::LastLogin => "LastLogin",
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UserField {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| StorageError::UnknownField(s.to_string()))
    }
}

/// A login session owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionModel {
    /// Opaque session token, unique across the store.
    pub key: String,
    pub user: UserId,
    pub expire_date: StorageDatetime,
    /// Arbitrary data attached to the session.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SessionModel {
    pub fn new(key: impl Into<String>, user: UserId, expire_date: StorageDatetime) -> Self {
        Self {
            key: key.into(),
            user,
            expire_date,
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn is_expired_at(&self, reference: &StorageDatetime) -> bool {
        self.expire_date <= *reference
    }
}

//! Placeholder substitution for SQL statement templates.
//!
//! Templates name dialect- and deployment-specific fragments with `$NAME$`
//! tokens. A replacer is applied once when a query set is built; the rendered
//! strings are what gets executed.

use std::collections::BTreeMap;

pub const USERS_TABLE_NAME: &str = "$USERS_TABLE_NAME$";
pub const SESSIONS_TABLE_NAME: &str = "$SESSIONS_TABLE_NAME$";
pub const EMAIL_UNIQUE: &str = "$EMAIL_UNIQUE$";

/// Prefix for index names on the users table.
///
/// Without an explicit entry it is derived from the users table fragment:
/// quotes are dropped and anything other than ASCII alphanumerics or `_`
/// becomes `_`, so `auth.users` yields `auth_users`.
pub const USERS_INDEX_PREFIX: &str = "$USERS_INDEX_PREFIX$";
/// Prefix for index names on the sessions table, derived like
/// [`USERS_INDEX_PREFIX`].
pub const SESSIONS_INDEX_PREFIX: &str = "$SESSIONS_INDEX_PREFIX$";

const DEFAULT_USERS_TABLE: &str = "auth_user";
const DEFAULT_SESSIONS_TABLE: &str = "auth_session";

/// Token to fragment mapping applied to statement templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplateReplacer {
    dict: BTreeMap<String, String>,
}

impl SqlTemplateReplacer {
    /// A replacer with no entries at all.
    pub fn empty() -> Self {
        Self {
            dict: BTreeMap::new(),
        }
    }

    /// A replacer with the given overrides applied on top of the defaults.
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut replacer = Self::default();
        replacer.update(overrides);
        replacer
    }

    pub fn set(&mut self, token: impl Into<String>, fragment: impl Into<String>) {
        self.dict.insert(token.into(), fragment.into());
    }

    pub fn update<'a, I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (token, fragment) in overrides {
            self.dict.insert(token.clone(), fragment.clone());
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.dict.get(token).map(String::as_str)
    }

    /// Substitute every known token in `template`. Unknown tokens are left as-is.
    pub fn apply(&self, template: &str) -> String {
        let sql = [
            (USERS_INDEX_PREFIX, USERS_TABLE_NAME),
            (SESSIONS_INDEX_PREFIX, SESSIONS_TABLE_NAME),
        ]
        .into_iter()
        .fold(template.to_string(), |sql, (prefix, table)| {
            if self.dict.contains_key(prefix) || !sql.contains(prefix) {
                return sql;
            }
            match self.get(table) {
                Some(fragment) => sql.replace(prefix, &index_prefix(fragment)),
                None => sql,
            }
        });

        self.dict
            .iter()
            .fold(sql, |sql, (token, fragment)| sql.replace(token.as_str(), fragment))
    }
}

/// An identifier-safe index name prefix for a table fragment.
fn index_prefix(table: &str) -> String {
    table
        .chars()
        .filter(|c| *c != '"')
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

impl Default for SqlTemplateReplacer {
    fn default() -> Self {
        let mut replacer = Self::empty();
        replacer.set(USERS_TABLE_NAME, DEFAULT_USERS_TABLE);
        replacer.set(SESSIONS_TABLE_NAME, DEFAULT_SESSIONS_TABLE);
        replacer.set(EMAIL_UNIQUE, "UNIQUE");
        replacer
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("User exists: {0}")]
    UserExists(String),

    #[error("Session exists: {0}")]
    SessionExists(String),

    /// A username or email update collided with another user.
    #[error("Ambiguous credentials: {0}")]
    AmbiguousCredentials(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid field name \"{0}\": must be a valid field name of UserModel")]
    UnknownField(String),

    #[error("Field \"{0}\" given more than once")]
    DuplicateField(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl StorageError {
    pub fn database<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Database(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

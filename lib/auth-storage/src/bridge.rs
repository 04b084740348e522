//! Backend-specific value conversion and error classification.

use crate::{StorageDatetime, StorageError, Value, ValueKind};

/// Outcome of classifying a driver error raised by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A unique constraint rejected an insert.
    DuplicateInsert,
    /// A unique constraint rejected an update.
    DuplicateUpdate,
    Other,
}

/// The kind of write an error was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
}

/// Keeps everything a storage engine must know about a particular driver in
/// one place: how times are bound and scanned, and which errors mean
/// "duplicate key".
pub trait SqlBridge: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Convert a time to the value bound for temporal columns.
    fn convert_time(&self, time: &StorageDatetime) -> Value;

    /// Decode target for temporal columns.
    fn time_scan_type(&self) -> ValueKind;

    /// Rebuild a time from a value scanned with [`SqlBridge::time_scan_type`].
    fn convert_time_scan(&self, value: Value) -> Result<StorageDatetime, StorageError>;

    fn classify(&self, err: &Self::Error, kind: WriteKind) -> ErrorClass;

    fn is_duplicate_insert(&self, err: &Self::Error) -> bool {
        self.classify(err, WriteKind::Insert) == ErrorClass::DuplicateInsert
    }

    fn is_duplicate_update(&self, err: &Self::Error) -> bool {
        self.classify(err, WriteKind::Update) == ErrorClass::DuplicateUpdate
    }
}

//! Key-value preference store contracts.
//!
//! # Responsibility
//! - Define the opaque asynchronous store the preference repository talks to.
//! - Provide the `Preferences` snapshot type and store-level errors.
//!
//! # Invariants
//! - `edit` runs its transform as one atomic read-modify-write; concurrent
//!   edits against the same store never observe the same pre-image.
//! - The change counter advances only after a committed edit that changed data.

use crate::db::DbError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::watch;

mod memory;
mod sqlite;

pub use memory::MemoryPreferenceStore;
pub use sqlite::SqlitePreferenceStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Transform applied inside one store transaction.
///
/// Owned and `'static` so stores can run it off the async executor.
pub type EditFn = Box<dyn FnOnce(&mut Preferences) -> StoreResult<()> + Send + 'static>;

/// Store-level error for preference reads and writes.
#[derive(Debug)]
pub enum StoreError {
    /// Transient I/O failure reading or writing the backing medium.
    Io(std::io::Error),
    Db(DbError),
    /// Entry exists but holds a different value kind.
    TypeMismatch {
        key: String,
        expected: &'static str,
    },
    InvalidData(String),
    /// Store lock was poisoned by a panicking writer.
    Poisoned,
    /// Blocking store task panicked or was cancelled.
    Join(tokio::task::JoinError),
}

impl StoreError {
    /// Returns whether this error is a transient I/O condition.
    pub fn is_transient_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "preference store i/o failure: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TypeMismatch { key, expected } => {
                write!(f, "preference `{key}` is not a {expected} value")
            }
            Self::InvalidData(message) => write!(f, "invalid preference data: {message}"),
            Self::Poisoned => write!(f, "preference store lock poisoned"),
            Self::Join(err) => write!(f, "preference store task failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Join(err) => Some(err),
            Self::TypeMismatch { .. } | Self::InvalidData(_) | Self::Poisoned => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(rusqlite::ErrorCode::SystemIoFailure) => {
                Self::Io(std::io::Error::other(value))
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Scalar preference value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    Bool(bool),
    Str(String),
}

impl PrefValue {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
        }
    }
}

/// Point-in-time snapshot of all stored preference entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    entries: BTreeMap<String, PrefValue>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PrefValue> {
        self.entries.get(key)
    }

    /// Reads a bool entry. `Ok(None)` when absent.
    pub fn get_bool(&self, key: &str) -> StoreResult<Option<bool>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(PrefValue::Bool(value)) => Ok(Some(*value)),
            Some(PrefValue::Str(_)) => Err(StoreError::TypeMismatch {
                key: key.to_string(),
                expected: "bool",
            }),
        }
    }

    /// Reads a string entry. `Ok(None)` when absent.
    pub fn get_str(&self, key: &str) -> StoreResult<Option<&str>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(PrefValue::Str(value)) => Ok(Some(value.as_str())),
            Some(PrefValue::Bool(_)) => Err(StoreError::TypeMismatch {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.entries.insert(key.to_string(), PrefValue::Bool(value));
    }

    pub fn set_str(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(key.to_string(), PrefValue::Str(value.into()));
    }

    pub fn remove(&mut self, key: &str) -> Option<PrefValue> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrefValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub(crate) fn insert(&mut self, key: String, value: PrefValue) {
        self.entries.insert(key, value);
    }
}

/// Asynchronous key-value store holding user preferences.
///
/// Implementations must serialize `edit` calls so that each transform sees
/// the result of every previously committed edit.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Reads the current snapshot.
    async fn data(&self) -> StoreResult<Preferences>;

    /// Atomically applies `transform` to the current snapshot and persists it.
    ///
    /// Returns the committed snapshot. When `transform` fails nothing is
    /// written and the error is returned unchanged.
    async fn edit(&self, transform: EditFn) -> StoreResult<Preferences>;

    /// Subscribes to the committed-change counter.
    fn changes(&self) -> watch::Receiver<u64>;
}

//! User preference repository.
//!
//! # Responsibility
//! - Map raw store entries onto typed `Settings`.
//! - Expose the settings stream, the one-shot initial read and the three
//!   preference mutations.
//!
//! # Invariants
//! - Absent entries resolve to `Settings::default()` values.
//! - An unknown persisted `sort_order` name is fatal, never defaulted.
//! - Sort toggles run as one store transaction each; concurrent toggles on
//!   different axes never overwrite each other.
//! - Transient I/O read failures inside `settings_stream` yield defaults and
//!   keep the stream alive; every other failure ends it.

use crate::model::settings::{Settings, SortOrder};
use crate::store::{PreferenceStore, Preferences, StoreError};
use futures::stream::BoxStream;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Persisted key of the show-completed flag.
pub const SHOW_COMPLETED_KEY: &str = "show_completed";
/// Persisted key of the sort order name.
pub const SORT_ORDER_KEY: &str = "sort_order";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for preference reads and mutations.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    /// Persisted data cannot be decoded into `Settings`.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted preference: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::InvalidData(message) => Self::InvalidData(message),
            StoreError::TypeMismatch { key, expected } => {
                Self::InvalidData(format!("`{key}` is not a {expected} value"))
            }
            other => Self::Store(other),
        }
    }
}

/// Typed access to user preferences over a `PreferenceStore`.
///
/// Cloning is cheap; clones share the same store.
pub struct UserPreferencesRepository<S: PreferenceStore> {
    store: Arc<S>,
}

impl<S: PreferenceStore> Clone for UserPreferencesRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PreferenceStore + 'static> UserPreferencesRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Streams current settings, then fresh settings after every committed change.
    ///
    /// Each call creates an independent subscription. The stream only ends
    /// after yielding a non-transient error.
    pub fn settings_stream(&self) -> BoxStream<'static, RepoResult<Settings>> {
        let store = Arc::clone(&self.store);
        Box::pin(async_stream::stream! {
            let mut changes = store.changes();
            loop {
                changes.borrow_and_update();
                match store.data().await {
                    Ok(prefs) => match map_settings(&prefs) {
                        Ok(settings) => yield Ok(settings),
                        Err(err) => {
                            error!("event=prefs_stream module=repo status=error error={err}");
                            yield Err(err);
                            break;
                        }
                    },
                    Err(err) if err.is_transient_io() => {
                        warn!("event=prefs_stream module=repo status=degraded fallback=defaults error={err}");
                        yield Ok(Settings::default());
                    }
                    Err(err) => {
                        error!("event=prefs_stream module=repo status=error error={err}");
                        yield Err(RepoError::from(err));
                        break;
                    }
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Reads the currently persisted settings once.
    ///
    /// Unlike `settings_stream`, I/O failures are returned to the caller.
    pub async fn fetch_initial(&self) -> RepoResult<Settings> {
        let prefs = self.store.data().await?;
        map_settings(&prefs)
    }

    /// Overwrites the show-completed flag.
    pub async fn set_show_completed(&self, show_completed: bool) -> RepoResult<()> {
        self.store
            .edit(Box::new(move |prefs: &mut Preferences| {
                prefs.set_bool(SHOW_COMPLETED_KEY, show_completed);
                Ok(())
            }))
            .await?;
        info!("event=prefs_update module=repo status=ok op=set_show_completed value={show_completed}");
        Ok(())
    }

    /// Turns deadline sorting on or off, keeping the priority axis.
    pub async fn enable_sort_by_deadline(&self, enable: bool) -> RepoResult<SortOrder> {
        self.update_sort("enable_sort_by_deadline", enable, move |order| {
            order.flags().with_deadline(enable).order()
        })
        .await
    }

    /// Turns priority sorting on or off, keeping the deadline axis.
    pub async fn enable_sort_by_priority(&self, enable: bool) -> RepoResult<SortOrder> {
        self.update_sort("enable_sort_by_priority", enable, move |order| {
            order.flags().with_priority(enable).order()
        })
        .await
    }

    async fn update_sort(
        &self,
        op: &'static str,
        enable: bool,
        apply: impl FnOnce(SortOrder) -> SortOrder + Send + 'static,
    ) -> RepoResult<SortOrder> {
        let committed = self
            .store
            .edit(Box::new(move |prefs: &mut Preferences| {
                let current = decode_sort_order(prefs)?;
                prefs.set_str(SORT_ORDER_KEY, apply(current).as_str());
                Ok(())
            }))
            .await
            .map_err(|err| {
                error!("event=prefs_update module=repo status=error op={op} enable={enable} error={err}");
                RepoError::from(err)
            })?;

        let sort_order = decode_sort_order(&committed)?;
        info!("event=prefs_update module=repo status=ok op={op} enable={enable} sort_order={sort_order}");
        Ok(sort_order)
    }
}

/// Maps raw entries to `Settings`, substituting defaults for absent keys.
pub fn map_settings(prefs: &Preferences) -> RepoResult<Settings> {
    let sort_order = decode_sort_order(prefs)?;
    let show_completed = prefs.get_bool(SHOW_COMPLETED_KEY)?.unwrap_or(false);
    Ok(Settings::new(show_completed, sort_order))
}

fn decode_sort_order(prefs: &Preferences) -> Result<SortOrder, StoreError> {
    match prefs.get_str(SORT_ORDER_KEY)? {
        None => Ok(SortOrder::default()),
        Some(name) => SortOrder::parse(name)
            .map_err(|err| StoreError::InvalidData(format!("{SORT_ORDER_KEY}: {err}"))),
    }
}

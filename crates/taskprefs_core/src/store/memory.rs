//! In-process preference store.
//!
//! # Invariants
//! - Edits run under one mutex, so transforms are serialized.
//! - Nothing survives process exit.

use super::{EditFn, PreferenceStore, Preferences, StoreError, StoreResult};
use async_trait::async_trait;
use log::debug;
use std::sync::Mutex;
use tokio::sync::watch;

/// Volatile `PreferenceStore` backed by a mutex-guarded snapshot.
pub struct MemoryPreferenceStore {
    state: Mutex<Preferences>,
    version: watch::Sender<u64>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::with_preferences(Preferences::new())
    }

    /// Creates a store pre-populated with `initial`.
    pub fn with_preferences(initial: Preferences) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Mutex::new(initial),
            version,
        }
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.version.receiver_count()
    }
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn data(&self) -> StoreResult<Preferences> {
        let state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(state.clone())
    }

    async fn edit(&self, transform: EditFn) -> StoreResult<Preferences> {
        let committed = {
            let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
            let mut next = state.clone();
            transform(&mut next)?;
            if next == *state {
                return Ok(next);
            }
            *state = next.clone();
            next
        };

        self.version.send_modify(|version| *version += 1);
        debug!("event=prefs_commit module=store status=ok backend=memory");
        Ok(committed)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

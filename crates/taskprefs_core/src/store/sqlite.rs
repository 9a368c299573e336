//! SQLite-backed preference store.
//!
//! # Responsibility
//! - Persist preference entries in the `preferences` table.
//! - Run edits as `BEGIN IMMEDIATE` transactions.
//! - Keep blocking SQLite calls on tokio's blocking pool.
//!
//! # Invariants
//! - One row per key; `value_type` is `bool` or `string`.
//! - Bool values are stored as `"true"` / `"false"`.
//! - A failed transform or write rolls back; nothing partial is committed.

use super::{EditFn, PrefValue, PreferenceStore, Preferences, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use async_trait::async_trait;
use log::{debug, error};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// `PreferenceStore` persisted in a SQLite database.
pub struct SqlitePreferenceStore {
    conn: Arc<Mutex<Connection>>,
    version: watch::Sender<u64>,
}

impl SqlitePreferenceStore {
    /// Opens (or creates) a store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            version,
        }
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.version.receiver_count()
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn data(&self) -> StoreResult<Preferences> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            load_preferences(&conn)
        })
        .await?
    }

    async fn edit(&self, transform: EditFn) -> StoreResult<Preferences> {
        let conn = Arc::clone(&self.conn);
        let (committed, changed) = tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = load_preferences(&tx)?;
            let mut next = current.clone();
            transform(&mut next)?;

            let changed = write_diff(&tx, &current, &next).map_err(|err| {
                error!("event=prefs_commit module=store status=error backend=sqlite error={err}");
                err
            })?;
            tx.commit()?;
            Ok::<_, StoreError>((next, changed))
        })
        .await??;

        if changed > 0 {
            self.version.send_modify(|version| *version += 1);
            debug!(
                "event=prefs_commit module=store status=ok backend=sqlite changed_keys={}",
                changed
            );
        }
        Ok(committed)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

fn load_preferences(conn: &Connection) -> StoreResult<Preferences> {
    let mut stmt = conn.prepare("SELECT key, value_type, value FROM preferences ORDER BY key;")?;
    let mut rows = stmt.query([])?;
    let mut prefs = Preferences::new();

    while let Some(row) = rows.next()? {
        let key: String = row.get(0)?;
        let value_type: String = row.get(1)?;
        let raw: String = row.get(2)?;
        let value = match (value_type.as_str(), raw.as_str()) {
            ("bool", "true") => PrefValue::Bool(true),
            ("bool", "false") => PrefValue::Bool(false),
            ("string", _) => PrefValue::Str(raw),
            _ => {
                return Err(StoreError::InvalidData(format!(
                    "invalid `{value_type}` value `{raw}` for key `{key}` in preferences"
                )));
            }
        };
        prefs.insert(key, value);
    }

    Ok(prefs)
}

/// Writes only the keys that differ between `before` and `after`.
fn write_diff(conn: &Connection, before: &Preferences, after: &Preferences) -> StoreResult<usize> {
    let mut changed = 0;

    for (key, _) in before.iter() {
        if after.get(key).is_none() {
            conn.execute("DELETE FROM preferences WHERE key = ?1;", [key])?;
            changed += 1;
        }
    }

    for (key, value) in after.iter() {
        if before.get(key) == Some(value) {
            continue;
        }
        let raw = match value {
            PrefValue::Bool(flag) => flag.to_string(),
            PrefValue::Str(text) => text.clone(),
        };
        conn.execute(
            "INSERT INTO preferences (key, value_type, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value_type = excluded.value_type,
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value.kind(), raw],
        )?;
        changed += 1;
    }

    Ok(changed)
}

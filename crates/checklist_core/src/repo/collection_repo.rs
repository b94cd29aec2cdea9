//! Collection repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the full checklist collection as a single JSON record.
//! - Persist the dark-mode preference independently of the collection.
//!
//! # Invariants
//! - A missing record reads as "nothing stored yet" (empty / `false`).
//! - Writes replace the whole record in one statement.
//! - Records are decoded one by one; a record that cannot be decoded is
//!   skipped and counted, never fails the whole load.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::checklist::Checklist;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key of the serialized collection.
pub const COLLECTION_KEY: &str = "checklists";
/// Storage key holding the last collection payload that failed to load.
pub const UNREADABLE_COLLECTION_KEY: &str = "checklists_unreadable";
/// Storage key of the dark-mode flag.
pub const DARK_MODE_KEY: &str = "dark_mode";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for collection persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Stored or outgoing payload could not be (de)serialized.
    Serialization(serde_json::Error),
    /// Connection was not opened through `db::open_db*`.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "invalid checklist payload: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with db::open_db"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Result of decoding the stored collection.
#[derive(Debug, Default)]
pub struct LoadedCollection {
    pub checklists: Vec<Checklist>,
    /// Records present in storage that could not be decoded.
    pub skipped_records: usize,
}

/// Durable storage contract for the collection store.
pub trait CollectionRepository {
    /// Loads the stored collection; empty when nothing is stored.
    ///
    /// # Errors
    /// - `Serialization` when the payload is not a JSON array at all.
    fn load_collection(&self) -> RepoResult<LoadedCollection>;
    /// Replaces the stored collection with `checklists`.
    fn save_collection(&self, checklists: &[Checklist]) -> RepoResult<()>;
    /// Copies the raw stored collection aside so a later save cannot erase
    /// records that failed to load.
    fn preserve_unreadable_collection(&self) -> RepoResult<()>;
    /// Loads the dark-mode flag; `false` when unset or unreadable.
    fn load_dark_mode(&self) -> RepoResult<bool>;
    fn save_dark_mode(&self, enabled: bool) -> RepoResult<()>;
}

/// SQLite-backed key/value collection repository.
pub struct SqliteCollectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCollectionRepository<'conn> {
    /// Wraps a connection that has been migrated to the latest schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn read_value(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_value(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

impl CollectionRepository for SqliteCollectionRepository<'_> {
    fn load_collection(&self) -> RepoResult<LoadedCollection> {
        let Some(payload) = self.read_value(COLLECTION_KEY)? else {
            return Ok(LoadedCollection::default());
        };
        let records: Vec<Value> = serde_json::from_str(&payload)?;

        let mut loaded = LoadedCollection::default();
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Checklist>(record) {
                Ok(checklist) => loaded.checklists.push(checklist),
                Err(err) => {
                    warn!(
                        "event=collection_load module=repo status=skipped record_index={index} error={err}"
                    );
                    loaded.skipped_records += 1;
                }
            }
        }
        Ok(loaded)
    }

    fn save_collection(&self, checklists: &[Checklist]) -> RepoResult<()> {
        let payload = serde_json::to_string(checklists)?;
        self.write_value(COLLECTION_KEY, &payload)
    }

    fn preserve_unreadable_collection(&self) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             SELECT ?2, value, (strftime('%s', 'now') * 1000)
             FROM kv_store
             WHERE key = ?1
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![COLLECTION_KEY, UNREADABLE_COLLECTION_KEY],
        )?;
        Ok(())
    }

    fn load_dark_mode(&self) -> RepoResult<bool> {
        Ok(self
            .read_value(DARK_MODE_KEY)?
            .is_some_and(|value| value.trim() == "true"))
    }

    fn save_dark_mode(&self, enabled: bool) -> RepoResult<()> {
        self.write_value(DARK_MODE_KEY, if enabled { "true" } else { "false" })
    }
}

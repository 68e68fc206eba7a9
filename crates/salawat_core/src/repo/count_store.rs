//! Persistent count store contracts and implementations.
//!
//! # Responsibility
//! - Persist the count as decimal text and the golden flag as its own record.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Writes overwrite prior values (last write wins).
//! - Read paths report malformed persisted text as `InvalidData` instead of
//!   masking it; the engine decides how to recover.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::count::Count;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

const COUNT_KEY: &str = "count";
const GOLDEN_UNLOCKED_KEY: &str = "golden_unlocked";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for count store reads and writes.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidData(String),
    /// Storage backend refused the operation (used by non-SQLite stores).
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted counter data: {message}"),
            Self::Unavailable(message) => write!(f, "counter storage unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable storage of the count and the golden unlock flag.
pub trait CountStore {
    /// Returns `None` when no count was ever saved.
    fn load_count(&self) -> StoreResult<Option<Count>>;
    fn save_count(&self, count: &Count) -> StoreResult<()>;
    /// Returns `None` when the flag was never saved.
    fn load_golden_unlocked(&self) -> StoreResult<Option<bool>>;
    fn save_golden_unlocked(&self, unlocked: bool) -> StoreResult<()>;
}

impl<S: CountStore + ?Sized> CountStore for Box<S> {
    fn load_count(&self) -> StoreResult<Option<Count>> {
        (**self).load_count()
    }

    fn save_count(&self, count: &Count) -> StoreResult<()> {
        (**self).save_count(count)
    }

    fn load_golden_unlocked(&self) -> StoreResult<Option<bool>> {
        (**self).load_golden_unlocked()
    }

    fn save_golden_unlocked(&self, unlocked: bool) -> StoreResult<()> {
        (**self).save_golden_unlocked(unlocked)
    }
}

/// SQLite-backed count store owning its connection.
pub struct SqliteCountStore {
    conn: Connection,
}

impl SqliteCountStore {
    /// Wraps an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (or creates) the counter database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a session-only database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn read_value(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM counter_state WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_value(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO counter_state (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

impl CountStore for SqliteCountStore {
    fn load_count(&self) -> StoreResult<Option<Count>> {
        self.read_value(COUNT_KEY)?
            .map(|text| {
                Count::parse_decimal(&text).map_err(|err| {
                    StoreError::InvalidData(format!("counter_state.{COUNT_KEY}: {err}"))
                })
            })
            .transpose()
    }

    fn save_count(&self, count: &Count) -> StoreResult<()> {
        self.write_value(COUNT_KEY, &count.to_decimal_string())
    }

    fn load_golden_unlocked(&self) -> StoreResult<Option<bool>> {
        self.read_value(GOLDEN_UNLOCKED_KEY)?
            .map(|text| parse_flag(&text))
            .transpose()
    }

    fn save_golden_unlocked(&self, unlocked: bool) -> StoreResult<()> {
        self.write_value(GOLDEN_UNLOCKED_KEY, flag_to_db(unlocked))
    }
}

/// Process-local store; holds the same text encoding as the SQLite store.
///
/// Backs the degraded in-memory-only mode and tests.
#[derive(Debug, Default)]
pub struct MemoryCountStore {
    records: Mutex<MemoryRecords>,
}

#[derive(Debug, Default)]
struct MemoryRecords {
    count: Option<String>,
    golden_unlocked: Option<bool>,
}

impl MemoryCountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds raw count text, including malformed values.
    pub fn with_raw_count(text: impl Into<String>) -> Self {
        let store = Self::default();
        store.records().count = Some(text.into());
        store
    }

    /// Returns the raw persisted count text.
    pub fn raw_count(&self) -> Option<String> {
        self.records().count.clone()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, MemoryRecords> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CountStore for MemoryCountStore {
    fn load_count(&self) -> StoreResult<Option<Count>> {
        self.records()
            .count
            .as_deref()
            .map(|text| {
                Count::parse_decimal(text)
                    .map_err(|err| StoreError::InvalidData(format!("count: {err}")))
            })
            .transpose()
    }

    fn save_count(&self, count: &Count) -> StoreResult<()> {
        self.records().count = Some(count.to_decimal_string());
        Ok(())
    }

    fn load_golden_unlocked(&self) -> StoreResult<Option<bool>> {
        Ok(self.records().golden_unlocked)
    }

    fn save_golden_unlocked(&self, unlocked: bool) -> StoreResult<()> {
        self.records().golden_unlocked = Some(unlocked);
        Ok(())
    }
}

fn flag_to_db(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn parse_flag(value: &str) -> StoreResult<bool> {
    match value.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in counter_state.{GOLDEN_UNLOCKED_KEY}"
        ))),
    }
}

//! Persistent source/target mapping table
//!
//! Backed by a single SQLite file. Two tables:
//! - `mappings`: one row per source/target pair with sync metadata
//! - `meta`: small key-value section (last cleanup time, daemon health)
//!
//! Every storage failure surfaces as [`SyncError::StoreUnavailable`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};

use crate::error::{Result, SyncError};

const SCHEMA_VERSION: i32 = 1;

const MAPPING_COLUMNS: &str = "source_path, target_path, source_hash, target_hash, \
     source_mtime, target_mtime, last_synced_at, status";

/// Lifecycle state of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MappingStatus {
    /// Normal, in sync or pending sync
    #[default]
    Active,
    /// A conflict copy was written and awaits manual resolution
    Conflict,
    /// Source vanished or left every configured root
    Orphaned,
}

impl MappingStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Conflict => "conflict",
            Self::Orphaned => "orphaned",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "conflict" => Some(Self::Conflict),
            "orphaned" => Some(Self::Orphaned),
            _ => None,
        }
    }
}

impl std::fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown mapping status '{0}'")]
struct UnknownStatus(String);

/// Association between one source file and its collection copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Absolute source path
    pub source_path: PathBuf,
    /// Absolute target path; authoritative once recorded
    pub target_path: PathBuf,
    /// Source content hash at last sync
    pub source_hash: Option<String>,
    /// Target content hash at last sync
    pub target_hash: Option<String>,
    /// Source mtime (seconds) at last sync
    pub source_mtime: Option<i64>,
    /// Target mtime (seconds) at last sync
    pub target_mtime: Option<i64>,
    /// When a sync action last touched this mapping
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Lifecycle state
    pub status: MappingStatus,
}

impl Mapping {
    /// New active mapping with no recorded file state
    #[must_use]
    pub const fn new(source_path: PathBuf, target_path: PathBuf) -> Self {
        Self {
            source_path,
            target_path,
            source_hash: None,
            target_hash: None,
            source_mtime: None,
            target_mtime: None,
            last_synced_at: None,
            status: MappingStatus::Active,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let source: String = row.get(0)?;
        let target: String = row.get(1)?;
        let synced: Option<String> = row.get(6)?;
        let status: String = row.get(7)?;

        let last_synced_at = synced
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))
            })
            .transpose()?;

        let status = MappingStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(UnknownStatus(status.clone())))
        })?;

        Ok(Self {
            source_path: PathBuf::from(source),
            target_path: PathBuf::from(target),
            source_hash: row.get(2)?,
            target_hash: row.get(3)?,
            source_mtime: row.get(4)?,
            target_mtime: row.get(5)?,
            last_synced_at,
            status,
        })
    }
}

/// SQLite-backed mapping store
///
/// The connection sits behind a mutex so the store can be shared between the
/// daemon threads and foreground passes.
pub struct MappingStore {
    conn: Mutex<Connection>,
}

impl MappingStore {
    /// Open (creating if needed) the store at `path`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MappingIo`] if the parent directory cannot be
    /// created, or [`SyncError::StoreUnavailable`] if the database cannot be
    /// opened or is not a mapping store.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open a throwaway in-memory store
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] if SQLite fails to initialize.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS mappings (
                source_path    TEXT NOT NULL PRIMARY KEY,
                target_path    TEXT NOT NULL UNIQUE,
                source_hash    TEXT,
                target_hash    TEXT,
                source_mtime   INTEGER,
                target_mtime   INTEGER,
                last_synced_at TEXT,
                status         TEXT NOT NULL DEFAULT 'active'
            );

            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT NOT NULL PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(SyncError::StoreUnavailable(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISMATCH),
                Some(format!(
                    "store schema version {version} is newer than supported ({SCHEMA_VERSION})"
                )),
            )));
        }
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Poisoning is ignored; the connection stays usable.
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Mapping for `source_path`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn get(&self, source_path: &Path) -> Result<Option<Mapping>> {
        let sql = format!("SELECT {MAPPING_COLUMNS} FROM mappings WHERE source_path = ?1");
        let mapping = self
            .conn()
            .query_row(&sql, params![path_text(source_path)], Mapping::from_row)
            .optional()?;
        Ok(mapping)
    }

    /// Mapping whose target is `target_path`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn get_by_target(&self, target_path: &Path) -> Result<Option<Mapping>> {
        let sql = format!("SELECT {MAPPING_COLUMNS} FROM mappings WHERE target_path = ?1");
        let mapping = self
            .conn()
            .query_row(&sql, params![path_text(target_path)], Mapping::from_row)
            .optional()?;
        Ok(mapping)
    }

    /// Insert or replace the mapping keyed by its source path
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure, including
    /// a target path already owned by another source.
    pub fn upsert(&self, mapping: &Mapping) -> Result<()> {
        upsert_with(&self.conn(), mapping)?;
        Ok(())
    }

    /// Upsert several mappings atomically
    ///
    /// Either all rows are written or none are.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn upsert_many(&self, mappings: &[Mapping]) -> Result<()> {
        if mappings.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for mapping in mappings {
            upsert_with(&tx, mapping)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove the mapping for `source_path`; returns whether a row existed
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn delete(&self, source_path: &Path) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM mappings WHERE source_path = ?1",
            params![path_text(source_path)],
        )?;
        Ok(removed > 0)
    }

    /// Change only the status of an existing mapping
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn set_status(&self, source_path: &Path, status: MappingStatus) -> Result<()> {
        self.conn().execute(
            "UPDATE mappings SET status = ?2 WHERE source_path = ?1",
            params![path_text(source_path), status.as_str()],
        )?;
        Ok(())
    }

    /// Every mapping, ordered by source path
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn list_all(&self) -> Result<Vec<Mapping>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {MAPPING_COLUMNS} FROM mappings ORDER BY source_path"))?;
        let rows = stmt.query_map([], Mapping::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Mappings whose source no longer exists or lies outside every root
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn list_orphaned(&self, valid_source_roots: &[PathBuf]) -> Result<Vec<Mapping>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|m| !m.source_path.is_file() || !is_under_any(&m.source_path, valid_source_roots))
            .collect())
    }

    /// Number of mappings per status: (active, conflict, orphaned)
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn count_by_status(&self) -> Result<(usize, usize, usize)> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM mappings GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let (mut active, mut conflict, mut orphaned) = (0, 0, 0);
        for row in rows {
            let (status, count) = row?;
            let count = usize::try_from(count).unwrap_or_default();
            match MappingStatus::parse(&status) {
                Some(MappingStatus::Active) => active += count,
                Some(MappingStatus::Conflict) => conflict += count,
                Some(MappingStatus::Orphaned) => orphaned += count,
                None => {}
            }
        }
        Ok((active, conflict, orphaned))
    }

    /// Write a key-value entry
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read a key-value entry
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Remove a key-value entry
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] on storage failure.
    pub fn delete_meta(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM meta WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn upsert_with(conn: &Connection, m: &Mapping) -> rusqlite::Result<usize> {
    conn.execute(
        r"
        INSERT INTO mappings (source_path, target_path, source_hash, target_hash,
                              source_mtime, target_mtime, last_synced_at, status)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(source_path) DO UPDATE SET
            target_path    = excluded.target_path,
            source_hash    = excluded.source_hash,
            target_hash    = excluded.target_hash,
            source_mtime   = excluded.source_mtime,
            target_mtime   = excluded.target_mtime,
            last_synced_at = excluded.last_synced_at,
            status         = excluded.status
        ",
        params![
            path_text(&m.source_path),
            path_text(&m.target_path),
            m.source_hash,
            m.target_hash,
            m.source_mtime,
            m.target_mtime,
            m.last_synced_at.map(|t| t.to_rfc3339()),
            m.status.as_str(),
        ],
    )
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Whether `path` lies under at least one of `roots`
#[must_use]
pub fn is_under_any(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

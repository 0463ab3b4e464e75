//! SQLite-backed relational store
//!
//! A single connection guarded by a mutex. Each transaction holds the mutex
//! for its whole lifetime and runs between `BEGIN IMMEDIATE` and `COMMIT`;
//! dropping a handle that was not committed issues `ROLLBACK`. A `begin`
//! that cannot take the connection within the busy timeout fails with
//! [`StoreError::Busy`], including on a thread that already holds a handle.
//!
//! ## Schema
//!
//! - `link_categories(id, name, description, version)`
//! - `link_types(id, name, description, source_type_name, target_type_name,
//!   forward_name, reverse_name, topology, link_category_id, version,
//!   created_at_us, updated_at_us)` with `UNIQUE(name, link_category_id)` and
//!   a foreign key on `link_category_id`

use crate::error::{StoreError, StoreResult};
use crate::traits::{Store, Tables, Transaction};
use linkstore_core::{
    LinkCategory, LinkCategoryId, LinkType, LinkTypeId, Page, Timestamp, Topology, Version,
};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default time a writer waits on a locked database
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS link_categories (
      id TEXT PRIMARY KEY,
      name TEXT NOT NULL,
      description TEXT,
      version INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS link_types (
      id TEXT PRIMARY KEY,
      name TEXT NOT NULL,
      description TEXT,
      source_type_name TEXT NOT NULL,
      target_type_name TEXT NOT NULL,
      forward_name TEXT NOT NULL,
      reverse_name TEXT NOT NULL,
      topology TEXT NOT NULL,
      link_category_id TEXT NOT NULL REFERENCES link_categories(id),
      version INTEGER NOT NULL,
      created_at_us INTEGER NOT NULL,
      updated_at_us INTEGER NOT NULL,
      UNIQUE (name, link_category_id)
    );

    CREATE INDEX IF NOT EXISTS idx_link_types_category ON link_types(link_category_id);
"#;

const LINK_TYPE_COLUMNS: &str = "id, name, description, source_type_name, target_type_name, \
     forward_name, reverse_name, topology, link_category_id, version, created_at_us, updated_at_us";

/// Connection options for [`SqliteStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Relational store on a single SQLite connection
#[derive(Debug)]
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open (creating if needed) a database file with default options
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, &SqliteOptions::default())
    }

    /// Open (creating if needed) a database file
    pub fn open_with(path: impl AsRef<Path>, options: &SqliteOptions) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::init(conn, Some(path), options)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_in_memory_with(&SqliteOptions::default())
    }

    /// Open a private in-memory database with the given options
    pub fn open_in_memory_with(options: &SqliteOptions) -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None, options)
    }

    fn init(conn: Connection, path: Option<PathBuf>, options: &SqliteOptions) -> StoreResult<Self> {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        info!(
            target: "linkstore::store",
            path = %path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".to_string()),
            "SQLite schema ready"
        );
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            busy_timeout: options.busy_timeout,
        })
    }

    /// Database file path, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Store for SqliteStore {
    type Tx<'a> = SqliteTransaction<'a>;

    fn begin(&self) -> StoreResult<SqliteTransaction<'_>> {
        // Held for the whole transaction; wait at most the busy timeout.
        let conn = self
            .conn
            .try_lock_for(self.busy_timeout)
            .ok_or(StoreError::Busy(self.busy_timeout))?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(SqliteTransaction { conn, done: false })
    }
}

/// Transaction on a [`SqliteStore`]
pub struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    done: bool,
}

impl<'a> Drop for SqliteTransaction<'a> {
    fn drop(&mut self) {
        if !self.done {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(target: "linkstore::store", error = %e, "Rollback on drop failed");
            }
        }
    }
}

fn to_sql_version(version: Version) -> StoreResult<i64> {
    i64::try_from(version).map_err(|_| StoreError::Corrupt(format!("version {version} out of range")))
}

fn to_sql_count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Raw `link_types` columns before validation
struct LinkTypeRecord {
    id: String,
    name: String,
    description: Option<String>,
    source_type_name: String,
    target_type_name: String,
    forward_name: String,
    reverse_name: String,
    topology: String,
    link_category_id: String,
    version: i64,
    created_at_us: i64,
    updated_at_us: i64,
}

impl LinkTypeRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            source_type_name: row.get(3)?,
            target_type_name: row.get(4)?,
            forward_name: row.get(5)?,
            reverse_name: row.get(6)?,
            topology: row.get(7)?,
            link_category_id: row.get(8)?,
            version: row.get(9)?,
            created_at_us: row.get(10)?,
            updated_at_us: row.get(11)?,
        })
    }
}

impl TryFrom<LinkTypeRecord> for LinkType {
    type Error = StoreError;

    fn try_from(r: LinkTypeRecord) -> StoreResult<Self> {
        let id = LinkTypeId::from_string(&r.id)
            .ok_or_else(|| StoreError::Corrupt(format!("link type id '{}'", r.id)))?;
        let topology = Topology::parse(&r.topology)
            .ok_or_else(|| StoreError::Corrupt(format!("topology '{}' of link type {id}", r.topology)))?;
        let link_category_id = LinkCategoryId::from_string(&r.link_category_id).ok_or_else(|| {
            StoreError::Corrupt(format!("category id '{}' of link type {id}", r.link_category_id))
        })?;
        let version = Version::try_from(r.version)
            .map_err(|_| StoreError::Corrupt(format!("version {} of link type {id}", r.version)))?;
        Ok(LinkType {
            id,
            name: r.name,
            description: r.description,
            source_type_name: r.source_type_name,
            target_type_name: r.target_type_name,
            forward_name: r.forward_name,
            reverse_name: r.reverse_name,
            topology,
            link_category_id,
            version,
            created_at: Timestamp::from_micros(r.created_at_us),
            updated_at: Timestamp::from_micros(r.updated_at_us),
        })
    }
}

impl<'a> SqliteTransaction<'a> {
    fn query_link_types(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<LinkType>> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params, LinkTypeRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        records.into_iter().map(LinkType::try_from).collect()
    }
}

impl<'a> Tables for SqliteTransaction<'a> {
    fn find_category(&mut self, id: LinkCategoryId) -> StoreResult<Option<LinkCategory>> {
        let record = self
            .conn
            .query_row(
                "SELECT name, description, version FROM link_categories WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        record
            .map(|(name, description, version)| {
                let version = Version::try_from(version).map_err(|_| {
                    StoreError::Corrupt(format!("version {version} of link category {id}"))
                })?;
                Ok(LinkCategory {
                    id,
                    name,
                    description,
                    version,
                })
            })
            .transpose()
    }

    fn insert_category(&mut self, category: &LinkCategory) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO link_categories(id, name, description, version) VALUES (?1, ?2, ?3, ?4)",
                params![
                    category.id.to_string(),
                    category.name,
                    category.description,
                    to_sql_version(category.version)?
                ],
            )
            .map_err(StoreError::from_sqlite_write)?;
        Ok(())
    }

    fn find_link_type(&mut self, id: LinkTypeId) -> StoreResult<Option<LinkType>> {
        let sql = format!("SELECT {LINK_TYPE_COLUMNS} FROM link_types WHERE id = ?1");
        let record = self
            .conn
            .query_row(&sql, params![id.to_string()], LinkTypeRecord::from_row)
            .optional()?;
        record.map(LinkType::try_from).transpose()
    }

    fn find_link_type_by_name(
        &mut self,
        name: &str,
        category: LinkCategoryId,
    ) -> StoreResult<Option<LinkType>> {
        let sql = format!(
            "SELECT {LINK_TYPE_COLUMNS} FROM link_types WHERE name = ?1 AND link_category_id = ?2"
        );
        let record = self
            .conn
            .query_row(
                &sql,
                params![name, category.to_string()],
                LinkTypeRecord::from_row,
            )
            .optional()?;
        record.map(LinkType::try_from).transpose()
    }

    fn insert_link_type(&mut self, lt: &LinkType) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO link_types({LINK_TYPE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        );
        self.conn
            .execute(
                &sql,
                params![
                    lt.id.to_string(),
                    lt.name,
                    lt.description,
                    lt.source_type_name,
                    lt.target_type_name,
                    lt.forward_name,
                    lt.reverse_name,
                    lt.topology.as_str(),
                    lt.link_category_id.to_string(),
                    to_sql_version(lt.version)?,
                    lt.created_at.as_micros(),
                    lt.updated_at.as_micros(),
                ],
            )
            .map_err(StoreError::from_sqlite_write)?;
        Ok(())
    }

    fn update_link_type(&mut self, lt: &LinkType, expected_version: Version) -> StoreResult<usize> {
        let affected = self
            .conn
            .execute(
                r#"
                UPDATE link_types
                SET name = ?1, description = ?2, source_type_name = ?3, target_type_name = ?4,
                    forward_name = ?5, reverse_name = ?6, topology = ?7, link_category_id = ?8,
                    version = ?9, updated_at_us = ?10
                WHERE id = ?11 AND version = ?12
                "#,
                params![
                    lt.name,
                    lt.description,
                    lt.source_type_name,
                    lt.target_type_name,
                    lt.forward_name,
                    lt.reverse_name,
                    lt.topology.as_str(),
                    lt.link_category_id.to_string(),
                    to_sql_version(lt.version)?,
                    lt.updated_at.as_micros(),
                    lt.id.to_string(),
                    to_sql_version(expected_version)?,
                ],
            )
            .map_err(StoreError::from_sqlite_write)?;
        Ok(affected)
    }

    fn delete_link_type(&mut self, id: LinkTypeId) -> StoreResult<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM link_types WHERE id = ?1", params![id.to_string()])
            .map_err(StoreError::from_sqlite_write)?;
        Ok(affected)
    }

    fn list_link_types(&mut self, page: Option<Page>) -> StoreResult<Vec<LinkType>> {
        let (limit, offset) = match page {
            Some(page) => (to_sql_count(page.limit), to_sql_count(page.offset)),
            None => (-1, 0),
        };
        let sql = format!(
            "SELECT {LINK_TYPE_COLUMNS} FROM link_types ORDER BY name, id LIMIT ?1 OFFSET ?2"
        );
        self.query_link_types(&sql, params![limit, offset])
    }

    fn count_link_types(&mut self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM link_types", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|_| StoreError::Corrupt(format!("row count {count}")))
    }
}

impl<'a> Transaction for SqliteTransaction<'a> {
    fn commit(mut self) -> StoreResult<()> {
        self.done = true;
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            // A failed COMMIT can leave the transaction open.
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(e.into());
        }
        Ok(())
    }

    fn rollback(mut self) -> StoreResult<()> {
        self.done = true;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

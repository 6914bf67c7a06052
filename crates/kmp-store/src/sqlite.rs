//! SQLite-backed record store.
//!
//! One connection behind a mutex. Read-modify-write operations (supporter
//! lists) run entirely while the lock is held.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::schema::SCHEMA_SQL;
use crate::traits::RecordStore;
use crate::types::*;
use kmp_core::{Error, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// SQLite implementation of [`RecordStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn conversion_err<E>(row: &rusqlite::Row<'_>, name: &str, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let idx = row.as_ref().column_index(name).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Decode a JSON text column. Bad contents are an error, never a default.
fn json_column<T: DeserializeOwned>(row: &rusqlite::Row<'_>, name: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(name)?;
    serde_json::from_str(&raw).map_err(|e| conversion_err(row, name, e))
}

impl SqliteStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/kmp.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("kmp.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let (knowledge, ideas, pulse) = store.counts()?;
        info!(
            "SqliteStore initialized: {} knowledge records, {} ideas, {} pulse updates, path={}",
            knowledge,
            ideas,
            pulse,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Row counts for (knowledge, ideas, pulse_updates).
    pub fn counts(&self) -> Result<(i64, i64, i64)> {
        let conn = self.conn.lock();
        let count = |table: &str| -> Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .map_err(db_err)
        };
        Ok((count("knowledge")?, count("ideas")?, count("pulse_updates")?))
    }

    // ---------------------------------------------------------------
    // Inserts with an explicit timestamp
    // ---------------------------------------------------------------

    /// Insert a knowledge record created at `created_at` (epoch seconds).
    pub fn put_knowledge_record_at(
        &self,
        content: &str,
        department: &str,
        employee_name: &str,
        tags: &[String],
        created_at: i64,
    ) -> Result<String> {
        let id = new_id();
        let tags_json = serde_json::to_string(tags)?;
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO knowledge (id, content, department, employee_name, tags_json, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(db_err)?
        .execute(params![id, content, department, employee_name, tags_json, created_at])
        .map_err(db_err)?;
        debug!("Stored knowledge record {} ({} tags)", id, tags.len());
        Ok(id)
    }

    /// Insert an idea created at `created_at` (epoch seconds).
    pub fn put_idea_at(
        &self,
        title: &str,
        description: &str,
        employee_name: &str,
        department: &str,
        created_at: i64,
    ) -> Result<String> {
        let id = new_id();
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO ideas (id, title, description, employee_name, department, supporters_json, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, '[]', ?6, ?7)",
        )
        .map_err(db_err)?
        .execute(params![
            id,
            title,
            description,
            employee_name,
            department,
            IdeaStatus::Proposed.as_str(),
            created_at
        ])
        .map_err(db_err)?;
        debug!("Stored idea {}", id);
        Ok(id)
    }

    /// Insert a pulse update created at `created_at` (epoch seconds).
    pub fn put_pulse_update_at(
        &self,
        title: &str,
        content: &str,
        department: &str,
        created_at: i64,
    ) -> Result<String> {
        let id = new_id();
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO pulse_updates (id, title, content, department, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(db_err)?
        .execute(params![id, title, content, department, created_at])
        .map_err(db_err)?;
        debug!("Stored pulse update {}", id);
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Row mapping
    // ---------------------------------------------------------------

    fn row_to_knowledge(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnowledgeRecord> {
        Ok(KnowledgeRecord {
            id: row.get("id")?,
            content: row.get("content")?,
            department: row.get("department")?,
            employee_name: row.get("employee_name")?,
            tags: json_column(row, "tags_json")?,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_idea(row: &rusqlite::Row<'_>) -> rusqlite::Result<Idea> {
        let status: String = row.get("status")?;
        let status = status
            .parse::<IdeaStatus>()
            .map_err(|e| conversion_err(row, "status", e))?;
        Ok(Idea {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            employee_name: row.get("employee_name")?,
            department: row.get("department")?,
            supporters: json_column(row, "supporters_json")?,
            status,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_pulse(row: &rusqlite::Row<'_>) -> rusqlite::Result<PulseUpdate> {
        Ok(PulseUpdate {
            id: row.get("id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            department: row.get("department")?,
            created_at: row.get("created_at")?,
        })
    }

    fn query_all<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, map)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn query_one<T>(
        &self,
        sql: &str,
        id: &str,
        map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(sql)
            .map_err(db_err)?
            .query_row(params![id], map)
            .optional()
            .map_err(db_err)?;
        Ok(row)
    }
}

impl RecordStore for SqliteStore {
    fn put_knowledge_record(
        &self,
        content: &str,
        department: &str,
        employee_name: &str,
        tags: &[String],
    ) -> Result<String> {
        self.put_knowledge_record_at(content, department, employee_name, tags, now_secs())
    }

    fn get_knowledge_record(&self, id: &str) -> Result<Option<KnowledgeRecord>> {
        self.query_one(
            "SELECT * FROM knowledge WHERE id = ?1",
            id,
            Self::row_to_knowledge,
        )
    }

    fn scan_knowledge(&self) -> Result<Vec<KnowledgeRecord>> {
        self.query_all(
            "SELECT * FROM knowledge ORDER BY created_at DESC, rowid DESC",
            [],
            Self::row_to_knowledge,
        )
    }

    fn put_idea(
        &self,
        title: &str,
        description: &str,
        employee_name: &str,
        department: &str,
    ) -> Result<String> {
        self.put_idea_at(title, description, employee_name, department, now_secs())
    }

    fn get_idea(&self, id: &str) -> Result<Option<Idea>> {
        self.query_one("SELECT * FROM ideas WHERE id = ?1", id, Self::row_to_idea)
    }

    fn scan_ideas(&self) -> Result<Vec<Idea>> {
        self.query_all(
            "SELECT * FROM ideas ORDER BY created_at DESC, rowid DESC",
            [],
            Self::row_to_idea,
        )
    }

    fn set_idea_status(&self, id: &str, status: IdeaStatus) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE ideas SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(Error::NotFound(format!("idea {}", id)));
        }
        info!("Idea {} moved to {}", id, status);
        Ok(())
    }

    fn add_supporter(&self, id: &str, employee_name: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();

        let supporters_json: String = conn
            .prepare_cached("SELECT supporters_json FROM ideas WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![id], |row| row.get(0))
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound(format!("idea {}", id)))?;

        let mut supporters: Vec<String> = serde_json::from_str(&supporters_json)?;

        if !supporters.iter().any(|s| s == employee_name) {
            supporters.push(employee_name.to_string());
            conn.execute(
                "UPDATE ideas SET supporters_json = ?1 WHERE id = ?2",
                params![serde_json::to_string(&supporters)?, id],
            )
            .map_err(db_err)?;
            debug!("Idea {} now has {} supporters", id, supporters.len());
        }

        Ok(supporters)
    }

    fn put_pulse_update(&self, title: &str, content: &str, department: &str) -> Result<String> {
        self.put_pulse_update_at(title, content, department, now_secs())
    }

    fn scan_pulse(&self) -> Result<Vec<PulseUpdate>> {
        self.query_all(
            "SELECT * FROM pulse_updates ORDER BY created_at DESC, rowid DESC",
            [],
            Self::row_to_pulse,
        )
    }

    fn recent_pulse_updates(&self, days: u32) -> Result<Vec<PulseUpdate>> {
        let cutoff = now_secs() - i64::from(days) * SECONDS_PER_DAY;
        self.query_all(
            "SELECT * FROM pulse_updates WHERE created_at >= ?1 ORDER BY created_at DESC, rowid DESC",
            params![cutoff],
            Self::row_to_pulse,
        )
    }
}

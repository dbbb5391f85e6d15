//! Content store using SQLite
//!
//! Stores embeddings as BLOBs and computes similarity in Rust. Keyword
//! search runs on FTS5 external-content tables kept in sync by triggers.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::fts::match_expression;
use super::ContentStore;
use crate::core::model::{
    ContentCounts, FileEntry, Memory, Project, Scored, Session, UsageStat, UsageTotals,
};
use crate::error::{Error, Result};
use crate::search::embedding::similarity_score;

const SCHEMA: &str = r#"
-- Tenants
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    root_path TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',  -- JSON object
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Key-value notes
CREATE TABLE IF NOT EXISTS memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    topic TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    created_by TEXT,
    embedding BLOB,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (project_id, topic, key)
);

CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    value,
    content = 'memories',
    content_rowid = 'id',
    tokenize = 'porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts (rowid, value) VALUES (new.id, new.value);
END;
CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts (memories_fts, rowid, value) VALUES ('delete', old.id, old.value);
END;
CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
    INSERT INTO memories_fts (memories_fts, rowid, value) VALUES ('delete', old.id, old.value);
    INSERT INTO memories_fts (rowid, value) VALUES (new.id, new.value);
END;

-- Numbered transcripts
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    session_num INTEGER NOT NULL,
    title TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    metadata TEXT NOT NULL DEFAULT '{}',  -- JSON object
    embedding BLOB,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (project_id, session_num)
);

CREATE VIRTUAL TABLE IF NOT EXISTS sessions_fts USING fts5(
    title,
    summary,
    content,
    content = 'sessions',
    content_rowid = 'id',
    tokenize = 'porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS sessions_ai AFTER INSERT ON sessions BEGIN
    INSERT INTO sessions_fts (rowid, title, summary, content)
    VALUES (new.id, new.title, new.summary, new.content);
END;
CREATE TRIGGER IF NOT EXISTS sessions_ad AFTER DELETE ON sessions BEGIN
    INSERT INTO sessions_fts (sessions_fts, rowid, title, summary, content)
    VALUES ('delete', old.id, old.title, old.summary, old.content);
END;
CREATE TRIGGER IF NOT EXISTS sessions_au AFTER UPDATE ON sessions BEGIN
    INSERT INTO sessions_fts (sessions_fts, rowid, title, summary, content)
    VALUES ('delete', old.id, old.title, old.summary, old.content);
    INSERT INTO sessions_fts (rowid, title, summary, content)
    VALUES (new.id, new.title, new.summary, new.content);
END;

-- File signatures
CREATE TABLE IF NOT EXISTS file_index (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    file_path TEXT NOT NULL,
    file_type TEXT,
    symbols TEXT NOT NULL DEFAULT '[]',  -- JSON array
    summary TEXT NOT NULL DEFAULT '',
    embedding BLOB,
    last_indexed INTEGER NOT NULL,
    UNIQUE (project_id, file_path)
);

CREATE VIRTUAL TABLE IF NOT EXISTS file_index_fts USING fts5(
    file_path,
    summary,
    content = 'file_index',
    content_rowid = 'id',
    tokenize = 'porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS file_index_ai AFTER INSERT ON file_index BEGIN
    INSERT INTO file_index_fts (rowid, file_path, summary)
    VALUES (new.id, new.file_path, new.summary);
END;
CREATE TRIGGER IF NOT EXISTS file_index_ad AFTER DELETE ON file_index BEGIN
    INSERT INTO file_index_fts (file_index_fts, rowid, file_path, summary)
    VALUES ('delete', old.id, old.file_path, old.summary);
END;
CREATE TRIGGER IF NOT EXISTS file_index_au AFTER UPDATE ON file_index BEGIN
    INSERT INTO file_index_fts (file_index_fts, rowid, file_path, summary)
    VALUES ('delete', old.id, old.file_path, old.summary);
    INSERT INTO file_index_fts (rowid, file_path, summary)
    VALUES (new.id, new.file_path, new.summary);
END;

-- Accounting records (append only, project is optional)
CREATE TABLE IF NOT EXISTS usage_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT,
    tool_name TEXT NOT NULL,
    query_text TEXT NOT NULL DEFAULT '',
    results_count INTEGER NOT NULL,
    tokens_estimated INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_memories_project_topic ON memories(project_id, topic);
CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project_id);
CREATE INDEX IF NOT EXISTS idx_file_index_project ON file_index(project_id);
CREATE INDEX IF NOT EXISTS idx_usage_created ON usage_stats(created_at);
CREATE INDEX IF NOT EXISTS idx_usage_project ON usage_stats(project_id);
"#;

const PROJECT_COLUMNS: &str = "id, name, root_path, metadata, created_at, updated_at";

const MEMORY_COLUMNS: &str = "m.id, m.project_id, m.topic, m.key, m.value, m.created_by, \
     m.embedding, m.created_at, m.updated_at";

const SESSION_COLUMNS: &str = "s.id, s.project_id, s.session_num, s.title, s.summary, \
     s.content, s.metadata, s.embedding, s.created_at, s.updated_at";

/// Listings leave the transcript body out.
const SESSION_LIST_COLUMNS: &str = "s.id, s.project_id, s.session_num, s.title, s.summary, \
     '' AS content, s.metadata, s.embedding, s.created_at, s.updated_at";

const FILE_COLUMNS: &str = "f.id, f.project_id, f.file_path, f.file_type, f.symbols, \
     f.summary, f.embedding, f.last_indexed";

/// SQLite-backed [`ContentStore`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }
}

impl ContentStore for SqliteStore {
    fn upsert_project(&self, project: &Project) -> Result<()> {
        let metadata = serde_json::to_string(&project.metadata)?;
        let now = Utc::now().timestamp();

        self.conn()?.execute(
            r#"
            INSERT INTO projects (id, name, root_path, metadata, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                root_path = excluded.root_path,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at
            "#,
            params![project.id, project.name, project.root_path, metadata, now],
        )?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn()?;
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name, id"
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    fn upsert_memory(&self, memory: &Memory, embedding: Option<&[f32]>) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn()?.execute(
            r#"
            INSERT INTO memories (project_id, topic, key, value, created_by, embedding, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(project_id, topic, key) DO UPDATE SET
                value = excluded.value,
                created_by = COALESCE(excluded.created_by, memories.created_by),
                embedding = COALESCE(excluded.embedding, memories.embedding),
                updated_at = excluded.updated_at
            "#,
            params![
                memory.project_id,
                memory.topic,
                memory.key,
                memory.value,
                memory.created_by,
                embedding_param(embedding),
                now,
            ],
        )?;
        Ok(())
    }

    fn get_memory(&self, project_id: &str, topic: &str, key: &str) -> Result<Option<Memory>> {
        let conn = self.conn()?;
        let memory = conn
            .query_row(
                &format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories m \
                     WHERE m.project_id = ?1 AND m.topic = ?2 AND m.key = ?3"
                ),
                params![project_id, topic, key],
                memory_from_row,
            )
            .optional()?;
        Ok(memory)
    }

    fn list_memories(&self, project_id: &str, topic: Option<&str>) -> Result<Vec<Memory>> {
        let conn = self.conn()?;
        let memories = match topic {
            Some(topic) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories m \
                     WHERE m.project_id = ?1 AND m.topic = ?2 ORDER BY m.topic, m.key"
                ))?;
                let rows = stmt.query_map(params![project_id, topic], memory_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories m \
                     WHERE m.project_id = ?1 ORDER BY m.topic, m.key"
                ))?;
                let rows = stmt.query_map(params![project_id], memory_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(memories)
    }

    fn delete_memory(&self, project_id: &str, topic: &str, key: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "DELETE FROM memories WHERE project_id = ?1 AND topic = ?2 AND key = ?3",
            params![project_id, topic, key],
        )?;
        Ok(changed > 0)
    }

    fn search_memories_by_similarity(
        &self,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories m \
             WHERE m.project_id = ?1 AND m.embedding IS NOT NULL"
        ))?;
        let candidates = stmt
            .query_map(params![project_id], memory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rank_by_similarity(candidates, |m| m.embedding.as_deref(), vector, limit))
    }

    fn search_memories_by_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS}, -bm25(memories_fts) AS score \
             FROM memories_fts JOIN memories m ON m.id = memories_fts.rowid \
             WHERE memories_fts MATCH ?1 AND m.project_id = ?2 \
             ORDER BY score DESC, m.id ASC LIMIT ?3"
        ))?;
        let results = stmt
            .query_map(params![expr, project_id, limit as i64], |row| {
                Ok(Scored::new(memory_from_row(row)?, row.get(9)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(results)
    }

    fn upsert_session(&self, session: &Session, embedding: Option<&[f32]>) -> Result<()> {
        let metadata = serde_json::to_string(&session.metadata)?;
        let now = Utc::now().timestamp();

        self.conn()?.execute(
            r#"
            INSERT INTO sessions (project_id, session_num, title, summary, content, metadata, embedding, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(project_id, session_num) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                content = excluded.content,
                metadata = excluded.metadata,
                embedding = COALESCE(excluded.embedding, sessions.embedding),
                updated_at = excluded.updated_at
            "#,
            params![
                session.project_id,
                session.session_num,
                session.title,
                session.summary,
                session.content,
                metadata,
                embedding_param(embedding),
                now,
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, project_id: &str, session_num: i64) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions s \
                     WHERE s.project_id = ?1 AND s.session_num = ?2"
                ),
                params![project_id, session_num],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn list_sessions(&self, project_id: &str) -> Result<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_LIST_COLUMNS} FROM sessions s \
             WHERE s.project_id = ?1 ORDER BY s.session_num"
        ))?;
        let sessions = stmt
            .query_map(params![project_id], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    fn delete_session(&self, project_id: &str, session_num: i64) -> Result<bool> {
        let changed = self.conn()?.execute(
            "DELETE FROM sessions WHERE project_id = ?1 AND session_num = ?2",
            params![project_id, session_num],
        )?;
        Ok(changed > 0)
    }

    fn search_sessions_by_similarity(
        &self,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Session>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_LIST_COLUMNS} FROM sessions s \
             WHERE s.project_id = ?1 AND s.embedding IS NOT NULL"
        ))?;
        let candidates = stmt
            .query_map(params![project_id], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rank_by_similarity(candidates, |s| s.embedding.as_deref(), vector, limit))
    }

    fn search_sessions_by_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Session>>> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_LIST_COLUMNS}, -bm25(sessions_fts) AS score \
             FROM sessions_fts JOIN sessions s ON s.id = sessions_fts.rowid \
             WHERE sessions_fts MATCH ?1 AND s.project_id = ?2 \
             ORDER BY score DESC, s.id ASC LIMIT ?3"
        ))?;
        let results = stmt
            .query_map(params![expr, project_id, limit as i64], |row| {
                Ok(Scored::new(session_from_row(row)?, row.get(10)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(results)
    }

    fn upsert_file(&self, file: &FileEntry, embedding: Option<&[f32]>) -> Result<()> {
        let symbols = serde_json::to_string(&file.symbols)?;
        let now = Utc::now().timestamp();

        self.conn()?.execute(
            r#"
            INSERT INTO file_index (project_id, file_path, file_type, symbols, summary, embedding, last_indexed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(project_id, file_path) DO UPDATE SET
                file_type = excluded.file_type,
                symbols = excluded.symbols,
                summary = excluded.summary,
                embedding = COALESCE(excluded.embedding, file_index.embedding),
                last_indexed = excluded.last_indexed
            "#,
            params![
                file.project_id,
                file.file_path,
                file.file_type,
                symbols,
                file.summary,
                embedding_param(embedding),
                now,
            ],
        )?;
        Ok(())
    }

    fn get_file(&self, project_id: &str, file_path: &str) -> Result<Option<FileEntry>> {
        let conn = self.conn()?;
        let file = conn
            .query_row(
                &format!(
                    "SELECT {FILE_COLUMNS} FROM file_index f \
                     WHERE f.project_id = ?1 AND f.file_path = ?2"
                ),
                params![project_id, file_path],
                file_from_row,
            )
            .optional()?;
        Ok(file)
    }

    fn list_files(&self, project_id: &str, file_type: Option<&str>) -> Result<Vec<FileEntry>> {
        let conn = self.conn()?;
        let files = match file_type {
            Some(file_type) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {FILE_COLUMNS} FROM file_index f \
                     WHERE f.project_id = ?1 AND f.file_type = ?2 ORDER BY f.file_path"
                ))?;
                let rows = stmt.query_map(params![project_id, file_type], file_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {FILE_COLUMNS} FROM file_index f \
                     WHERE f.project_id = ?1 ORDER BY f.file_path"
                ))?;
                let rows = stmt.query_map(params![project_id], file_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(files)
    }

    fn delete_file(&self, project_id: &str, file_path: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "DELETE FROM file_index WHERE project_id = ?1 AND file_path = ?2",
            params![project_id, file_path],
        )?;
        Ok(changed > 0)
    }

    fn search_files_by_similarity(
        &self,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM file_index f \
             WHERE f.project_id = ?1 AND f.embedding IS NOT NULL"
        ))?;
        let candidates = stmt
            .query_map(params![project_id], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rank_by_similarity(candidates, |f| f.embedding.as_deref(), vector, limit))
    }

    fn search_files_by_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS}, -bm25(file_index_fts) AS score \
             FROM file_index_fts JOIN file_index f ON f.id = file_index_fts.rowid \
             WHERE file_index_fts MATCH ?1 AND f.project_id = ?2 \
             ORDER BY score DESC, f.id ASC LIMIT ?3"
        ))?;
        let results = stmt
            .query_map(params![expr, project_id, limit as i64], |row| {
                Ok(Scored::new(file_from_row(row)?, row.get(8)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(results)
    }

    fn count_projects(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_content(&self, project_id: Option<&str>) -> Result<ContentCounts> {
        let conn = self.conn()?;
        let count = |table: &str| -> rusqlite::Result<u64> {
            let n: i64 = match project_id {
                Some(id) => conn.query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE project_id = ?1"),
                    params![id],
                    |row| row.get(0),
                )?,
                None => conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?,
            };
            Ok(n as u64)
        };

        Ok(ContentCounts {
            memories: count("memories")?,
            sessions: count("sessions")?,
            files: count("file_index")?,
        })
    }

    fn append_usage(&self, record: &UsageStat) -> Result<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO usage_stats (project_id, tool_name, query_text, results_count, tokens_estimated, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.project_id,
                record.tool_name,
                record.query_text,
                record.results_count,
                record.tokens_estimated,
                record.created_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    fn usage_totals(&self, since: Option<DateTime<Utc>>) -> Result<UsageTotals> {
        let conn = self.conn()?;
        let totals = match since {
            Some(since) => conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(tokens_estimated), 0) FROM usage_stats \
                 WHERE created_at > ?1",
                params![since.timestamp()],
                totals_from_row,
            )?,
            None => conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(tokens_estimated), 0) FROM usage_stats",
                [],
                totals_from_row,
            )?,
        };
        Ok(totals)
    }

    fn project_usage_totals(&self, project_id: &str) -> Result<UsageTotals> {
        let conn = self.conn()?;
        let totals = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(tokens_estimated), 0) FROM usage_stats \
             WHERE project_id = ?1",
            params![project_id],
            totals_from_row,
        )?;
        Ok(totals)
    }
}

/// Score every candidate against `vector`, best first, capped at `limit`.
///
/// Candidates whose stored vector has a different dimensionality are not
/// comparable and are skipped.
fn rank_by_similarity<T>(
    candidates: Vec<T>,
    embedding_of: impl Fn(&T) -> Option<&[f32]>,
    vector: &[f32],
    limit: usize,
) -> Vec<Scored<T>> {
    let mut results: Vec<Scored<T>> = candidates
        .into_iter()
        .filter_map(|item| {
            let score = match embedding_of(&item) {
                Some(stored) if stored.len() == vector.len() => similarity_score(vector, stored),
                _ => return None,
            };
            Some(Scored::new(item, score))
        })
        .collect();

    // Sort by similarity descending
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
    results
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        root_path: row.get(2)?,
        metadata: json_column(row, 3)?,
        created_at: timestamp(row.get(4)?),
        updated_at: timestamp(row.get(5)?),
    })
}

fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    Ok(Memory {
        id: row.get(0)?,
        project_id: row.get(1)?,
        topic: row.get(2)?,
        key: row.get(3)?,
        value: row.get(4)?,
        created_by: row.get(5)?,
        embedding: row.get::<_, Option<Vec<u8>>>(6)?.map(|b| blob_to_embedding(&b)),
        created_at: timestamp(row.get(7)?),
        updated_at: timestamp(row.get(8)?),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        project_id: row.get(1)?,
        session_num: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        content: row.get(5)?,
        metadata: json_column(row, 6)?,
        embedding: row.get::<_, Option<Vec<u8>>>(7)?.map(|b| blob_to_embedding(&b)),
        created_at: timestamp(row.get(8)?),
        updated_at: timestamp(row.get(9)?),
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileEntry> {
    Ok(FileEntry {
        id: row.get(0)?,
        project_id: row.get(1)?,
        file_path: row.get(2)?,
        file_type: row.get(3)?,
        symbols: json_column(row, 4)?,
        summary: row.get(5)?,
        embedding: row.get::<_, Option<Vec<u8>>>(6)?.map(|b| blob_to_embedding(&b)),
        last_indexed: timestamp(row.get(7)?),
    })
}

fn totals_from_row(row: &Row<'_>) -> rusqlite::Result<UsageTotals> {
    let queries: i64 = row.get(0)?;
    Ok(UsageTotals {
        queries: queries as u64,
        tokens: row.get(1)?,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// An empty vector is treated as absent so it never replaces a stored one.
fn embedding_param(embedding: Option<&[f32]>) -> Option<Vec<u8>> {
    embedding.filter(|e| !e.is_empty()).map(embedding_to_blob)
}

/// Convert f32 embedding to BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

/// Convert BLOB to f32 embedding
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

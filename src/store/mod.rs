//! Storage engine boundary
//!
//! The engine owns indexing, exact-match lookups and the two native ranked
//! queries. Everything here is tenant scoped except project enumeration and
//! the global counters used by the dashboard.

pub mod fts;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use chrono::{DateTime, Utc};

use crate::core::model::{
    ContentCounts, FileEntry, Memory, Project, Scored, Session, UsageStat, UsageTotals,
};
use crate::error::Result;

pub use sqlite::SqliteStore;

/// Persistence interface consumed by the search engine and the service.
///
/// `upsert_*` methods take the vector separately: `None` keeps whatever
/// vector is already stored for the natural key.
pub trait ContentStore: Send + Sync {
    // ---- projects ----
    fn upsert_project(&self, project: &Project) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;

    // ---- notes ----
    fn upsert_memory(&self, memory: &Memory, embedding: Option<&[f32]>) -> Result<()>;
    fn get_memory(&self, project_id: &str, topic: &str, key: &str) -> Result<Option<Memory>>;
    fn list_memories(&self, project_id: &str, topic: Option<&str>) -> Result<Vec<Memory>>;
    fn delete_memory(&self, project_id: &str, topic: &str, key: &str) -> Result<bool>;
    fn search_memories_by_similarity(
        &self,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>>;
    fn search_memories_by_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>>;

    // ---- transcripts ----
    fn upsert_session(&self, session: &Session, embedding: Option<&[f32]>) -> Result<()>;
    fn get_session(&self, project_id: &str, session_num: i64) -> Result<Option<Session>>;
    fn list_sessions(&self, project_id: &str) -> Result<Vec<Session>>;
    fn delete_session(&self, project_id: &str, session_num: i64) -> Result<bool>;
    fn search_sessions_by_similarity(
        &self,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Session>>>;
    fn search_sessions_by_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Session>>>;

    // ---- file signatures ----
    fn upsert_file(&self, file: &FileEntry, embedding: Option<&[f32]>) -> Result<()>;
    fn get_file(&self, project_id: &str, file_path: &str) -> Result<Option<FileEntry>>;
    fn list_files(&self, project_id: &str, file_type: Option<&str>) -> Result<Vec<FileEntry>>;
    fn delete_file(&self, project_id: &str, file_path: &str) -> Result<bool>;
    fn search_files_by_similarity(
        &self,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>>;
    fn search_files_by_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>>;

    // ---- counts ----
    fn count_projects(&self) -> Result<u64>;
    /// Content rows for one project, or for every project when `None`.
    fn count_content(&self, project_id: Option<&str>) -> Result<ContentCounts>;

    // ---- accounting ----
    fn append_usage(&self, record: &UsageStat) -> Result<()>;
    /// Records created strictly after `since`, or all records when `None`.
    fn usage_totals(&self, since: Option<DateTime<Utc>>) -> Result<UsageTotals>;
    fn project_usage_totals(&self, project_id: &str) -> Result<UsageTotals>;
}

//! Delegating store for tests that need to inject failures or interleave
//! writes between reads.

use chrono::{DateTime, Utc};

use super::{ContentStore, SqliteStore};
use crate::core::model::{
    ContentCounts, FileEntry, Memory, Project, Scored, Session, UsageStat, UsageTotals,
};
use crate::error::{Error, Result};

type Hook = Box<dyn Fn(&SqliteStore) + Send + Sync>;

/// Delegates to SQLite with optional faults.
pub(crate) struct HookedStore {
    pub inner: SqliteStore,
    /// Note searches for this project fail.
    pub broken_project: Option<&'static str>,
    /// Runs right after every `usage_totals` read returns.
    pub after_usage_totals: Option<Hook>,
}

impl HookedStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            broken_project: None,
            after_usage_totals: None,
        }
    }

    fn check(&self, project_id: &str) -> Result<()> {
        if self.broken_project == Some(project_id) {
            return Err(Error::Storage(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }
}

impl ContentStore for HookedStore {
    fn upsert_project(&self, project: &Project) -> Result<()> {
        self.inner.upsert_project(project)
    }
    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.inner.get_project(id)
    }
    fn list_projects(&self) -> Result<Vec<Project>> {
        self.inner.list_projects()
    }
    fn upsert_memory(&self, memory: &Memory, embedding: Option<&[f32]>) -> Result<()> {
        self.inner.upsert_memory(memory, embedding)
    }
    fn get_memory(&self, p: &str, topic: &str, key: &str) -> Result<Option<Memory>> {
        self.inner.get_memory(p, topic, key)
    }
    fn list_memories(&self, p: &str, topic: Option<&str>) -> Result<Vec<Memory>> {
        self.inner.list_memories(p, topic)
    }
    fn delete_memory(&self, p: &str, topic: &str, key: &str) -> Result<bool> {
        self.inner.delete_memory(p, topic, key)
    }
    fn search_memories_by_similarity(
        &self,
        p: &str,
        v: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>> {
        self.check(p)?;
        self.inner.search_memories_by_similarity(p, v, limit)
    }
    fn search_memories_by_keyword(
        &self,
        p: &str,
        q: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>> {
        self.check(p)?;
        self.inner.search_memories_by_keyword(p, q, limit)
    }
    fn upsert_session(&self, s: &Session, embedding: Option<&[f32]>) -> Result<()> {
        self.inner.upsert_session(s, embedding)
    }
    fn get_session(&self, p: &str, n: i64) -> Result<Option<Session>> {
        self.inner.get_session(p, n)
    }
    fn list_sessions(&self, p: &str) -> Result<Vec<Session>> {
        self.inner.list_sessions(p)
    }
    fn delete_session(&self, p: &str, n: i64) -> Result<bool> {
        self.inner.delete_session(p, n)
    }
    fn search_sessions_by_similarity(
        &self,
        p: &str,
        v: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Session>>> {
        self.inner.search_sessions_by_similarity(p, v, limit)
    }
    fn search_sessions_by_keyword(
        &self,
        p: &str,
        q: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Session>>> {
        self.inner.search_sessions_by_keyword(p, q, limit)
    }
    fn upsert_file(&self, f: &FileEntry, embedding: Option<&[f32]>) -> Result<()> {
        self.inner.upsert_file(f, embedding)
    }
    fn get_file(&self, p: &str, path: &str) -> Result<Option<FileEntry>> {
        self.inner.get_file(p, path)
    }
    fn list_files(&self, p: &str, file_type: Option<&str>) -> Result<Vec<FileEntry>> {
        self.inner.list_files(p, file_type)
    }
    fn delete_file(&self, p: &str, path: &str) -> Result<bool> {
        self.inner.delete_file(p, path)
    }
    fn search_files_by_similarity(
        &self,
        p: &str,
        v: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>> {
        self.inner.search_files_by_similarity(p, v, limit)
    }
    fn search_files_by_keyword(
        &self,
        p: &str,
        q: &str,
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>> {
        self.inner.search_files_by_keyword(p, q, limit)
    }
    fn count_projects(&self) -> Result<u64> {
        self.inner.count_projects()
    }
    fn count_content(&self, p: Option<&str>) -> Result<ContentCounts> {
        self.inner.count_content(p)
    }
    fn append_usage(&self, record: &UsageStat) -> Result<()> {
        self.inner.append_usage(record)
    }
    fn usage_totals(&self, since: Option<DateTime<Utc>>) -> Result<UsageTotals> {
        let totals = self.inner.usage_totals(since)?;
        if let Some(hook) = &self.after_usage_totals {
            hook(&self.inner);
        }
        Ok(totals)
    }
    fn project_usage_totals(&self, p: &str) -> Result<UsageTotals> {
        self.inner.project_usage_totals(p)
    }
}

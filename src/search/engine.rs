//! Search Engine - entity executors and the cross-entity aggregator
//!
//! Each content kind exposes the same two ranked queries. A single
//! [`Strategy`] decides which one runs; `search_all` resolves the strategy
//! once and fans it out over every project and every kind.

use std::sync::Arc;

use super::strategy::{self, Strategy};
use crate::core::model::{FileEntry, Memory, Project, Scored, SearchAllResult, Session};
use crate::error::Result;
use crate::store::ContentStore;

/// Result count used when the caller gives none (or zero).
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Upper bound on any single search.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Resolve a caller supplied limit.
pub fn normalize_limit(limit: Option<usize>) -> usize {
    match limit {
        None | Some(0) => DEFAULT_SEARCH_LIMIT,
        Some(n) => n.min(MAX_SEARCH_LIMIT),
    }
}

/// A searchable content kind.
pub trait EntityKind {
    type Item;

    /// Kind name used in logs.
    const NAME: &'static str;

    fn by_similarity(
        store: &dyn ContentStore,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Self::Item>>>;

    fn by_keyword(
        store: &dyn ContentStore,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Self::Item>>>;
}

/// Key-value notes.
pub struct Notes;

/// Numbered session transcripts.
pub struct Transcripts;

/// Indexed file signatures.
pub struct FileSignatures;

impl EntityKind for Notes {
    type Item = Memory;
    const NAME: &'static str = "memories";

    fn by_similarity(
        store: &dyn ContentStore,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>> {
        store.search_memories_by_similarity(project_id, vector, limit)
    }

    fn by_keyword(
        store: &dyn ContentStore,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Memory>>> {
        store.search_memories_by_keyword(project_id, query, limit)
    }
}

impl EntityKind for Transcripts {
    type Item = Session;
    const NAME: &'static str = "sessions";

    fn by_similarity(
        store: &dyn ContentStore,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<Session>>> {
        store.search_sessions_by_similarity(project_id, vector, limit)
    }

    fn by_keyword(
        store: &dyn ContentStore,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<Session>>> {
        store.search_sessions_by_keyword(project_id, query, limit)
    }
}

impl EntityKind for FileSignatures {
    type Item = FileEntry;
    const NAME: &'static str = "files";

    fn by_similarity(
        store: &dyn ContentStore,
        project_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>> {
        store.search_files_by_similarity(project_id, vector, limit)
    }

    fn by_keyword(
        store: &dyn ContentStore,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<FileEntry>>> {
        store.search_files_by_keyword(project_id, query, limit)
    }
}

/// Search engine over a shared content store
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn ContentStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Run one kind's executor for one project.
    pub fn search<K: EntityKind>(
        &self,
        project_id: &str,
        strategy: Strategy<'_>,
        limit: usize,
    ) -> Result<Vec<Scored<K::Item>>> {
        tracing::debug!(
            kind = K::NAME,
            project = project_id,
            mode = %strategy.mode(),
            limit,
            "search"
        );
        match strategy {
            Strategy::Similarity(vector) => {
                K::by_similarity(self.store.as_ref(), project_id, vector, limit)
            }
            Strategy::Keyword(query) => {
                K::by_keyword(self.store.as_ref(), project_id, query, limit)
            }
        }
    }

    /// Search every kind across every project.
    ///
    /// Per-project failures are logged and skipped; only failing to
    /// enumerate projects aborts the call. Each kind is capped at `limit`
    /// across all projects combined.
    pub fn search_all(
        &self,
        query: &str,
        vector: Option<&[f32]>,
        limit: usize,
    ) -> Result<SearchAllResult> {
        let strategy = strategy::select(query, vector);
        let projects = self.store.list_projects()?;

        Ok(SearchAllResult {
            memories: self.gather::<Notes>(&projects, strategy, limit),
            sessions: self.gather::<Transcripts>(&projects, strategy, limit),
            files: self.gather::<FileSignatures>(&projects, strategy, limit),
        })
    }

    fn gather<K: EntityKind>(
        &self,
        projects: &[Project],
        strategy: Strategy<'_>,
        limit: usize,
    ) -> Vec<Scored<K::Item>> {
        let mut all = Vec::new();
        for project in projects {
            match self.search::<K>(&project.id, strategy, limit) {
                Ok(results) => all.extend(results),
                Err(e) => {
                    tracing::warn!(
                        kind = K::NAME,
                        project = %project.id,
                        error = %e,
                        "skipping project in cross-project search"
                    );
                }
            }
        }
        rank(&mut all, limit);
        all
    }
}

/// Sort by score descending, stable on insertion order, then cap.
fn rank<T>(results: &mut Vec<Scored<T>>, limit: usize) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::HookedStore;
    use crate::store::SqliteStore;

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        for project in ["t1", "t2"] {
            store.upsert_project(&Project::new(project, project)).unwrap();
            for (i, value) in [
                "auth middleware checks tokens",
                "auth auth flow uses auth cookies",
                "auth is handled upstream of the gateway service",
            ]
            .iter()
            .enumerate()
            {
                store
                    .upsert_memory(&Memory::new(project, "auth", i.to_string(), *value), None)
                    .unwrap();
            }
        }
        store
    }

    #[test]
    fn test_normalize_limit() {
        assert_eq!(normalize_limit(None), DEFAULT_SEARCH_LIMIT);
        assert_eq!(normalize_limit(Some(0)), DEFAULT_SEARCH_LIMIT);
        assert_eq!(normalize_limit(Some(5)), 5);
        assert_eq!(normalize_limit(Some(10_000)), MAX_SEARCH_LIMIT);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let mut results = vec![
            Scored::new("a", 0.5),
            Scored::new("b", 0.9),
            Scored::new("c", 0.5),
        ];
        rank(&mut results, 10);
        let order: Vec<_> = results.iter().map(|r| r.item).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_search_all_caps_each_kind_across_projects() {
        let engine = SearchEngine::new(Arc::new(seeded_store()));

        let result = engine.search_all("auth", None, 2).unwrap();
        assert_eq!(result.memories.len(), 2);
        assert!(result.sessions.is_empty());
        assert!(result.files.is_empty());
        assert!(result.memories[0].score >= result.memories[1].score);
        assert_eq!(result.memories[0].item.key, "1");
    }

    #[test]
    fn test_search_all_with_vector_uses_similarity() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_project(&Project::new("t1", "t1")).unwrap();
        store
            .upsert_memory(&Memory::new("t1", "a", "near", "x"), Some(&[1.0, 0.0][..]))
            .unwrap();
        store
            .upsert_memory(&Memory::new("t1", "a", "text-only", "auth"), None)
            .unwrap();

        let engine = SearchEngine::new(Arc::new(store));
        let result = engine.search_all("auth", Some(&[1.0, 0.0][..]), 10).unwrap();
        let keys: Vec<_> = result.memories.iter().map(|m| m.item.key.as_str()).collect();
        assert_eq!(keys, vec!["near"]);
    }

    #[test]
    fn test_search_all_without_projects_is_empty() {
        let engine = SearchEngine::new(Arc::new(SqliteStore::open_in_memory().unwrap()));
        assert!(engine.search_all("auth", None, 5).unwrap().is_empty());
    }

    #[test]
    fn test_failing_project_is_skipped() {
        let mut store = HookedStore::new(seeded_store());
        store.broken_project = Some("t1");
        let mut file = FileEntry::new("t1", "src/auth.rs");
        file.summary = "auth handlers".to_string();
        store.upsert_file(&file, None).unwrap();

        let engine = SearchEngine::new(Arc::new(store));
        let result = engine.search_all("auth", None, 10).unwrap();

        assert_eq!(result.memories.len(), 3);
        assert!(result.memories.iter().all(|m| m.item.project_id == "t2"));
        // Other kinds for the failing project still contribute.
        assert_eq!(result.files.len(), 1);

        assert!(engine
            .search::<Notes>("t1", Strategy::Keyword("auth"), 10)
            .is_err());
    }
}

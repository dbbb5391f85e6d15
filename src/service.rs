//! Memory service - every externally visible operation
//!
//! Each operation validates its arguments before touching the embedder or
//! the store, runs, and then records exactly one accounting record. An
//! operation that fails records nothing.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::core::model::{
    ContentCounts, DashboardStats, FileEntry, Memory, Project, Scored, SearchAllResult, Session,
    UsageTotals,
};
use crate::core::operation::Operation;
use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::search::embedding::{Embedder, EmbeddingStatus};
use crate::search::engine::{
    normalize_limit, EntityKind, FileSignatures, Notes, SearchEngine, Transcripts,
};
use crate::search::strategy::{self, SearchMode};
use crate::stats;
use crate::store::ContentStore;
use crate::usage::UsageRecorder;

/// Ranked results for one kind, labelled with the strategy that ran.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse<T> {
    pub search_type: SearchMode,
    pub results: Vec<Scored<T>>,
}

/// Cross-project results, labelled with the strategy that ran.
#[derive(Debug, Clone, Serialize)]
pub struct SearchAllResponse {
    pub search_type: SearchMode,
    #[serde(flatten)]
    pub results: SearchAllResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub project: Project,
    pub counts: ContentCounts,
    pub usage: UsageTotals,
    pub embedding_status: String,
}

/// Vectors filled in by [`MemoryService::reembed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReembedReport {
    pub memories: usize,
    pub sessions: usize,
    pub files: usize,
    /// Items still without a vector after the pass.
    pub skipped: usize,
}

impl ReembedReport {
    pub fn updated(&self) -> usize {
        self.memories + self.sessions + self.files
    }
}

/// Transcript fields supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct SessionInput {
    pub summary: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// File-signature fields supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct FileInput {
    pub file_type: Option<String>,
    pub symbols: Vec<Value>,
    pub summary: Option<String>,
}

#[derive(Clone)]
pub struct MemoryService {
    store: Arc<dyn ContentStore>,
    embedder: Arc<dyn Embedder>,
    engine: SearchEngine,
    usage: UsageRecorder,
}

impl MemoryService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        embedder: Arc<dyn Embedder>,
        events: EventBus,
    ) -> Self {
        Self {
            engine: SearchEngine::new(store.clone()),
            usage: UsageRecorder::new(store.clone(), events),
            store,
            embedder,
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        self.usage.events()
    }

    pub fn embedding_status(&self) -> EmbeddingStatus {
        self.embedder.status()
    }

    // ---- projects ----

    pub fn register_project(
        &self,
        id: &str,
        name: &str,
        root_path: Option<&str>,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Project> {
        required("project_id", id)?;
        required("name", name)?;

        let mut project = Project::new(id, name);
        project.root_path = non_empty(root_path).map(str::to_string);
        project.metadata = metadata.unwrap_or_default();
        self.store.upsert_project(&project)?;

        let stored = self.existing_project(id)?;
        self.usage.record(Operation::ProjectRegister, Some(id), name, 1);
        Ok(stored)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = self.store.list_projects()?;
        self.usage.record(Operation::ProjectList, None, "", projects.len());
        Ok(projects)
    }

    pub fn project_status(&self, id: &str) -> Result<ProjectStatus> {
        required("project_id", id)?;

        let project = self.existing_project(id)?;
        let status = ProjectStatus {
            counts: self.store.count_content(Some(id))?,
            usage: self.store.project_usage_totals(id)?,
            embedding_status: self.embedder.status().to_string(),
            project,
        };
        self.usage.record(Operation::ProjectStatus, Some(id), "", 1);
        Ok(status)
    }

    // ---- notes ----

    /// Upsert a note. With `value = None` the stored value is kept and
    /// only re-embedded.
    pub async fn set_memory(
        &self,
        project_id: &str,
        topic: &str,
        key: &str,
        value: Option<&str>,
        created_by: Option<&str>,
    ) -> Result<Memory> {
        required("project_id", project_id)?;
        required("topic", topic)?;
        required("key", key)?;
        if let Some(value) = value {
            required("value", value)?;
        }

        let value = match value {
            Some(value) => value.to_string(),
            None => self
                .store
                .get_memory(project_id, topic, key)?
                .map(|m| m.value)
                .ok_or_else(|| Error::NotFound(format!("memory {topic}/{key}")))?,
        };

        let mut memory = Memory::new(project_id, topic, key, value);
        memory.created_by = non_empty(created_by).map(str::to_string);

        let embedding = self.embedder.embed(&memory.value).await;
        self.store.upsert_memory(&memory, embedding.as_deref())?;

        let stored = self
            .store
            .get_memory(project_id, topic, key)?
            .ok_or_else(|| Error::NotFound(format!("memory {topic}/{key}")))?;
        self.usage.record(
            Operation::MemorySet,
            Some(project_id),
            &format!("{topic}/{key}"),
            1,
        );
        Ok(stored)
    }

    pub fn get_memory(&self, project_id: &str, topic: &str, key: &str) -> Result<Option<Memory>> {
        required("project_id", project_id)?;
        required("topic", topic)?;
        required("key", key)?;

        let memory = self.store.get_memory(project_id, topic, key)?;
        self.usage.record(
            Operation::MemoryGet,
            Some(project_id),
            &format!("{topic}/{key}"),
            usize::from(memory.is_some()),
        );
        Ok(memory)
    }

    pub fn list_memories(&self, project_id: &str, topic: Option<&str>) -> Result<Vec<Memory>> {
        required("project_id", project_id)?;

        let topic = non_empty(topic);
        let memories = self.store.list_memories(project_id, topic)?;
        self.usage.record(
            Operation::MemoryList,
            Some(project_id),
            topic.unwrap_or(""),
            memories.len(),
        );
        Ok(memories)
    }

    pub async fn search_memories(
        &self,
        project_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchResponse<Memory>> {
        self.search_kind::<Notes>(Operation::MemorySearch, project_id, query, limit)
            .await
    }

    pub fn delete_memory(&self, project_id: &str, topic: &str, key: &str) -> Result<bool> {
        required("project_id", project_id)?;
        required("topic", topic)?;
        required("key", key)?;

        let deleted = self.store.delete_memory(project_id, topic, key)?;
        self.usage.record(
            Operation::MemoryDelete,
            Some(project_id),
            &format!("{topic}/{key}"),
            usize::from(deleted),
        );
        Ok(deleted)
    }

    // ---- transcripts ----

    pub async fn create_session(
        &self,
        project_id: &str,
        session_num: i64,
        title: &str,
        input: SessionInput,
    ) -> Result<Session> {
        required("project_id", project_id)?;
        required_session_num(session_num)?;
        required("title", title)?;

        let mut session = Session::new(project_id, session_num, title);
        session.summary = input.summary.unwrap_or_default();
        session.content = input.content.unwrap_or_default();
        session.metadata = input.metadata.unwrap_or_default();

        let embedding = self.embedder.embed(session.embedding_text()).await;
        self.store.upsert_session(&session, embedding.as_deref())?;

        let stored = self
            .store
            .get_session(project_id, session_num)?
            .ok_or_else(|| Error::NotFound(format!("session {session_num}")))?;
        self.usage.record(Operation::SessionCreate, Some(project_id), title, 1);
        Ok(stored)
    }

    pub fn get_session(&self, project_id: &str, session_num: i64) -> Result<Option<Session>> {
        required("project_id", project_id)?;
        required_session_num(session_num)?;

        let session = self.store.get_session(project_id, session_num)?;
        self.usage.record(
            Operation::SessionGet,
            Some(project_id),
            &session_num.to_string(),
            usize::from(session.is_some()),
        );
        Ok(session)
    }

    pub fn list_sessions(&self, project_id: &str) -> Result<Vec<Session>> {
        required("project_id", project_id)?;

        let sessions = self.store.list_sessions(project_id)?;
        self.usage.record(
            Operation::SessionList,
            Some(project_id),
            "",
            sessions.len(),
        );
        Ok(sessions)
    }

    pub async fn search_sessions(
        &self,
        project_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchResponse<Session>> {
        self.search_kind::<Transcripts>(Operation::SessionSearch, project_id, query, limit)
            .await
    }

    pub fn delete_session(&self, project_id: &str, session_num: i64) -> Result<bool> {
        required("project_id", project_id)?;
        required_session_num(session_num)?;

        let deleted = self.store.delete_session(project_id, session_num)?;
        self.usage.record(
            Operation::SessionDelete,
            Some(project_id),
            &session_num.to_string(),
            usize::from(deleted),
        );
        Ok(deleted)
    }

    // ---- file signatures ----

    /// Upsert a file signature. The file type defaults to the path's
    /// extension.
    pub async fn index_file(
        &self,
        project_id: &str,
        file_path: &str,
        input: FileInput,
    ) -> Result<FileEntry> {
        required("project_id", project_id)?;
        required("file_path", file_path)?;

        let mut file = FileEntry::new(project_id, file_path);
        file.file_type = non_empty(input.file_type.as_deref())
            .map(str::to_string)
            .or_else(|| file_extension(file_path));
        file.symbols = input.symbols;
        file.summary = input.summary.unwrap_or_default();

        let embedding = self.embedder.embed(file.embedding_text()).await;
        self.store.upsert_file(&file, embedding.as_deref())?;

        let stored = self
            .store
            .get_file(project_id, file_path)?
            .ok_or_else(|| Error::NotFound(format!("file {file_path}")))?;
        self.usage.record(Operation::FileIndex, Some(project_id), file_path, 1);
        Ok(stored)
    }

    pub fn get_file(&self, project_id: &str, file_path: &str) -> Result<Option<FileEntry>> {
        required("project_id", project_id)?;
        required("file_path", file_path)?;

        let file = self.store.get_file(project_id, file_path)?;
        self.usage.record(
            Operation::FileGet,
            Some(project_id),
            file_path,
            usize::from(file.is_some()),
        );
        Ok(file)
    }

    pub fn list_files(&self, project_id: &str, file_type: Option<&str>) -> Result<Vec<FileEntry>> {
        required("project_id", project_id)?;

        let file_type = non_empty(file_type);
        let files = self.store.list_files(project_id, file_type)?;
        self.usage.record(
            Operation::FileList,
            Some(project_id),
            file_type.unwrap_or(""),
            files.len(),
        );
        Ok(files)
    }

    pub async fn search_files(
        &self,
        project_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchResponse<FileEntry>> {
        self.search_kind::<FileSignatures>(Operation::FileSearch, project_id, query, limit)
            .await
    }

    pub fn delete_file(&self, project_id: &str, file_path: &str) -> Result<bool> {
        required("project_id", project_id)?;
        required("file_path", file_path)?;

        let deleted = self.store.delete_file(project_id, file_path)?;
        self.usage.record(
            Operation::FileDelete,
            Some(project_id),
            file_path,
            usize::from(deleted),
        );
        Ok(deleted)
    }

    // ---- cross-project ----

    pub async fn search_all(&self, query: &str, limit: Option<usize>) -> Result<SearchAllResponse> {
        required("query", query)?;
        let limit = normalize_limit(limit);

        let vector = self.embedder.embed(query).await;
        let search_type = strategy::select(query, vector.as_deref()).mode();
        let results = self.engine.search_all(query, vector.as_deref(), limit)?;

        self.usage.record(Operation::SearchAll, None, query, results.total());
        Ok(SearchAllResponse {
            search_type,
            results,
        })
    }

    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        let status = self.embedder.status();
        let stats = stats::dashboard_stats(self.store.as_ref(), &status, Utc::now())?;
        self.usage.record(
            Operation::DashboardStats,
            None,
            "",
            stats.project_count as usize,
        );
        Ok(stats)
    }

    /// Compute vectors for every item of a project that has none.
    pub async fn reembed(&self, project_id: &str) -> Result<ReembedReport> {
        required("project_id", project_id)?;
        self.existing_project(project_id)?;

        let mut report = ReembedReport::default();

        for memory in self.store.list_memories(project_id, None)? {
            if memory.has_embedding() {
                continue;
            }
            match self.embedder.embed(&memory.value).await {
                Some(vector) => {
                    self.store.upsert_memory(&memory, Some(&vector))?;
                    report.memories += 1;
                }
                None => report.skipped += 1,
            }
        }

        for listed in self.store.list_sessions(project_id)? {
            if listed.embedding.is_some() {
                continue;
            }
            // Listings carry no transcript body; reload before writing back.
            let Some(session) = self.store.get_session(project_id, listed.session_num)? else {
                continue;
            };
            match self.embedder.embed(session.embedding_text()).await {
                Some(vector) => {
                    self.store.upsert_session(&session, Some(&vector))?;
                    report.sessions += 1;
                }
                None => report.skipped += 1,
            }
        }

        for file in self.store.list_files(project_id, None)? {
            if file.embedding.is_some() {
                continue;
            }
            match self.embedder.embed(file.embedding_text()).await {
                Some(vector) => {
                    self.store.upsert_file(&file, Some(&vector))?;
                    report.files += 1;
                }
                None => report.skipped += 1,
            }
        }

        tracing::info!(
            project = project_id,
            memories = report.memories,
            sessions = report.sessions,
            files = report.files,
            skipped = report.skipped,
            "reembed finished"
        );
        self.usage.record(Operation::Reembed, Some(project_id), "", report.updated());
        Ok(report)
    }

    async fn search_kind<K: EntityKind>(
        &self,
        operation: Operation,
        project_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchResponse<K::Item>> {
        required("project_id", project_id)?;
        required("query", query)?;
        let limit = normalize_limit(limit);

        let vector = self.embedder.embed(query).await;
        let strategy = strategy::select(query, vector.as_deref());
        let results = self.engine.search::<K>(project_id, strategy, limit)?;

        self.usage.record(operation, Some(project_id), query, results.len());
        Ok(SearchResponse {
            search_type: strategy.mode(),
            results,
        })
    }

    fn existing_project(&self, id: &str) -> Result<Project> {
        self.store
            .get_project(id)?
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))
    }
}

fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid(format!("{field} is required")));
    }
    Ok(())
}

fn required_session_num(session_num: i64) -> Result<()> {
    if session_num < 1 {
        return Err(Error::invalid(format!(
            "session_num must be positive, got {session_num}"
        )));
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn file_extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Vector;
    use crate::search::embedding::DisabledEmbedder;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder: one dimension per vocabulary word.
    #[derive(Default)]
    struct StubEmbedder {
        calls: AtomicUsize,
    }

    const VOCAB: [&str; 3] = ["auth", "database", "cache"];

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Option<Vector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.is_empty() {
                return None;
            }
            let lower = text.to_lowercase();
            let mut v: Vector = VOCAB
                .iter()
                .map(|w| lower.matches(w).count() as f32)
                .collect();
            v.push(0.1);
            Some(v)
        }

        fn dimensions(&self) -> usize {
            VOCAB.len() + 1
        }

        fn status(&self) -> EmbeddingStatus {
            EmbeddingStatus::Available {
                url: "stub".to_string(),
                dim: self.dimensions(),
            }
        }
    }

    fn service_with(
        store: Arc<SqliteStore>,
        embedder: Arc<dyn Embedder>,
    ) -> MemoryService {
        MemoryService::new(store, embedder, EventBus::new())
    }

    fn keyword_service() -> (Arc<SqliteStore>, MemoryService) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service = service_with(store.clone(), Arc::new(DisabledEmbedder::new(4)));
        service.register_project("t1", "T1", None, None).unwrap();
        (store, service)
    }

    fn queries(store: &SqliteStore) -> u64 {
        store.usage_totals(None).unwrap().queries
    }

    #[tokio::test]
    async fn test_note_without_vector_then_reembedded() {
        let (store, keyword) = keyword_service();

        keyword
            .set_memory("t1", "arch", "db", Some("uses pgvector"), None)
            .await
            .unwrap();
        let note = keyword.get_memory("t1", "arch", "db").unwrap().unwrap();
        assert_eq!(note.value, "uses pgvector");
        assert!(note.embedding.is_none());

        let semantic = service_with(store.clone(), Arc::new(StubEmbedder::default()));
        let updated = semantic
            .set_memory("t1", "arch", "db", None, None)
            .await
            .unwrap();
        assert_eq!(updated.value, "uses pgvector");
        assert!(updated.embedding.is_some());

        // A later write without a vector keeps it.
        keyword
            .set_memory("t1", "arch", "db", Some("uses pgvector 0.7"), None)
            .await
            .unwrap();
        let note = store.get_memory("t1", "arch", "db").unwrap().unwrap();
        assert_eq!(note.value, "uses pgvector 0.7");
        assert!(note.embedding.is_some());
    }

    #[tokio::test]
    async fn test_set_without_value_requires_existing_note() {
        let (store, service) = keyword_service();
        let before = queries(&store);

        let err = service
            .set_memory("t1", "arch", "missing", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(queries(&store), before);
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_io() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let embedder = Arc::new(StubEmbedder::default());
        let service = service_with(store.clone(), embedder.clone());

        let err = service.search_memories(" ", "auth", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = service.search_all("", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = service
            .create_session("t1", 0, "title", SessionInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = service
            .set_memory("t1", "arch", "db", Some("  "), None)
            .await
            .unwrap_err();
        assert!(err.is_caller_error());

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(queries(&store), 0);
    }

    #[tokio::test]
    async fn test_unknown_project_write_fails_without_record() {
        let (store, service) = keyword_service();
        let before = queries(&store);

        let err = service
            .set_memory("ghost", "arch", "db", Some("value"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(queries(&store), before);

        let err = service.project_status("ghost").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_every_completed_operation_records_once() {
        let (store, service) = keyword_service();
        let mut expected = queries(&store);
        let mut step = || {
            expected += 1;
            assert_eq!(queries(&store), expected);
        };

        service
            .set_memory("t1", "arch", "db", Some("auth database"), None)
            .await
            .unwrap();
        step();
        service.get_memory("t1", "arch", "nope").unwrap();
        step();
        service.search_memories("t1", "kubernetes", None).await.unwrap();
        step();
        service.delete_memory("t1", "arch", "nope").unwrap();
        step();
        service.list_sessions("t1").unwrap();
        step();
        service.search_all("auth", None).await.unwrap();
        step();
        service.dashboard_stats().unwrap();
        step();
    }

    #[tokio::test]
    async fn test_search_type_follows_vector_availability() {
        let (store, keyword) = keyword_service();
        keyword
            .set_memory("t1", "arch", "auth", Some("auth tokens live in cookies"), None)
            .await
            .unwrap();

        let response = keyword.search_memories("t1", "auth", None).await.unwrap();
        assert_eq!(response.search_type, SearchMode::FullText);
        assert_eq!(response.results.len(), 1);

        let semantic = service_with(store, Arc::new(StubEmbedder::default()));
        semantic.reembed("t1").await.unwrap();
        let response = semantic.search_memories("t1", "auth", None).await.unwrap();
        assert_eq!(response.search_type, SearchMode::Semantic);
        assert_eq!(response.results.len(), 1);
        assert!(response.results[0].score > 0.9);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["search_type"], "semantic (vector)");
    }

    #[tokio::test]
    async fn test_semantic_ranking_is_non_increasing() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service = service_with(store, Arc::new(StubEmbedder::default()));
        service.register_project("t1", "T1", None, None).unwrap();

        for (key, value) in [
            ("a", "cache warmup"),
            ("b", "auth database"),
            ("c", "auth auth"),
        ] {
            service
                .set_memory("t1", "notes", key, Some(value), None)
                .await
                .unwrap();
        }

        let response = service.search_memories("t1", "auth", Some(3)).await.unwrap();
        let scores: Vec<f64> = response.results.iter().map(|r| r.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(response.results[0].item.key, "c");
    }

    #[tokio::test]
    async fn test_session_and_file_operations() {
        let (store, service) = keyword_service();

        let session = service
            .create_session(
                "t1",
                1,
                "Auth rework",
                SessionInput {
                    summary: Some("Moved tokens to cookies".to_string()),
                    content: Some("long transcript about auth".to_string()),
                    metadata: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(session.session_num, 1);

        let file = service
            .index_file(
                "t1",
                "src/Auth.RS",
                FileInput {
                    summary: Some("fn login".to_string()),
                    ..FileInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(file.file_type.as_deref(), Some("rs"));
        assert_eq!(service.list_files("t1", Some("rs")).unwrap().len(), 1);

        let sessions = service.search_sessions("t1", "auth", None).await.unwrap();
        assert_eq!(sessions.results.len(), 1);
        let files = service.search_files("t1", "login", None).await.unwrap();
        assert_eq!(files.results.len(), 1);

        let totals = store.project_usage_totals("t1").unwrap();
        assert!(totals.tokens >= 2000 + 800);

        assert!(service.delete_session("t1", 1).unwrap());
        assert!(service.get_session("t1", 1).unwrap().is_none());
        assert!(service.delete_file("t1", "src/Auth.RS").unwrap());
    }

    #[tokio::test]
    async fn test_reembed_fills_missing_vectors() {
        let (store, keyword) = keyword_service();
        keyword
            .set_memory("t1", "arch", "db", Some("database"), None)
            .await
            .unwrap();
        keyword
            .create_session(
                "t1",
                2,
                "Cache",
                SessionInput {
                    content: Some("body".to_string()),
                    ..SessionInput::default()
                },
            )
            .await
            .unwrap();

        let disabled = keyword.reembed("t1").await.unwrap();
        assert_eq!(disabled.updated(), 0);
        assert_eq!(disabled.skipped, 2);

        let semantic = service_with(store.clone(), Arc::new(StubEmbedder::default()));
        let report = semantic.reembed("t1").await.unwrap();
        assert_eq!(report.memories, 1);
        assert_eq!(report.sessions, 1);

        let session = store.get_session("t1", 2).unwrap().unwrap();
        assert_eq!(session.content, "body");
        assert!(session.embedding.is_some());

        assert_eq!(semantic.reembed("t1").await.unwrap().updated(), 0);
        assert!(matches!(
            semantic.reembed("ghost").await,
            Err(Error::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_project_status() {
        let (_store, service) = keyword_service();
        service
            .set_memory("t1", "arch", "db", Some("sqlite"), None)
            .await
            .unwrap();

        let status = service.project_status("t1").unwrap();
        assert_eq!(status.counts.memories, 1);
        assert!(status.usage.queries >= 2);
        assert!(status.embedding_status.starts_with("disabled"));
    }
}

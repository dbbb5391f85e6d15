//! Data model shared by the store, the search engine and the MCP surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Embedding vector.
pub type Vector = Vec<f32>;

/// Tenant. Every content and accounting row is scoped by a project id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            root_path: None,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = Some(root_path.into());
        self
    }
}

/// Key-value note. Natural key: (project_id, topic, key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: i64,
    pub project_id: String,
    pub topic: String,
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip)]
    pub embedding: Option<Vector>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(
        project_id: impl Into<String>,
        topic: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            project_id: project_id.into(),
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
            created_by: None,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// Numbered session transcript. Natural key: (project_id, session_num).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub project_id: String,
    pub session_num: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(skip)]
    pub embedding: Option<Vector>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(project_id: impl Into<String>, session_num: i64, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            project_id: project_id.into(),
            session_num,
            title: title.into(),
            summary: String::new(),
            content: String::new(),
            metadata: Map::new(),
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Text used to compute the transcript's vector.
    pub fn embedding_text(&self) -> &str {
        if self.summary.trim().is_empty() {
            &self.title
        } else {
            &self.summary
        }
    }
}

/// Indexed file signature. Natural key: (project_id, file_path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: i64,
    pub project_id: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip)]
    pub embedding: Option<Vector>,
    pub last_indexed: DateTime<Utc>,
}

impl FileEntry {
    pub fn new(project_id: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            id: 0,
            project_id: project_id.into(),
            file_path: file_path.into(),
            file_type: None,
            symbols: Vec::new(),
            summary: String::new(),
            embedding: None,
            last_indexed: Utc::now(),
        }
    }

    pub fn embedding_text(&self) -> &str {
        if self.summary.trim().is_empty() {
            &self.file_path
        } else {
            &self.summary
        }
    }
}

/// Immutable accounting record, one per completed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStat {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub tool_name: String,
    pub query_text: String,
    pub results_count: i64,
    pub tokens_estimated: i64,
    pub created_at: DateTime<Utc>,
}

/// A content item with a strategy-dependent score.
///
/// Similarity scores live in `[0, 1]`; keyword scores are an unbounded
/// non-negative relevance rank. The two scales are never compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scored<T> {
    #[serde(flatten)]
    pub item: T,
    pub score: f64,
}

impl<T> Scored<T> {
    pub fn new(item: T, score: f64) -> Self {
        Self { item, score }
    }
}

/// Cross-entity search result, each list sorted by score and capped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchAllResult {
    pub memories: Vec<Scored<Memory>>,
    pub sessions: Vec<Scored<Session>>,
    pub files: Vec<Scored<FileEntry>>,
}

impl SearchAllResult {
    pub fn total(&self) -> usize {
        self.memories.len() + self.sessions.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Content row counts for one project or for the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentCounts {
    pub memories: u64,
    pub sessions: u64,
    pub files: u64,
}

/// Accounting aggregate: number of records and summed token estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageTotals {
    pub queries: u64,
    pub tokens: i64,
}

/// Per-project dashboard breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub project: Project,
    pub memory_count: u64,
    pub session_count: u64,
    pub file_count: u64,
    pub query_count: u64,
    pub tokens_saved: i64,
}

/// Dashboard summary, recomputed on demand and never stored.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub project_count: u64,
    pub memory_count: u64,
    pub session_count: u64,
    pub file_count: u64,
    pub total_queries: u64,
    pub total_tokens_saved: i64,
    pub queries_last_24h: u64,
    pub tokens_last_24h: i64,
    pub embedding_status: String,
    pub projects: Vec<ProjectStats>,
}

//! DevMemory MCP Server implementation

use anyhow::Result;
use chrono::Utc;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::events::DASHBOARD_STATS_TOPIC;
use crate::service::{FileInput, MemoryService, SessionInput};
use crate::stats;

/// Parameters for project_register
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterProjectParams {
    #[schemars(description = "Project identifier (e.g. \"devmemory\")")]
    pub project_id: String,
    #[schemars(description = "Human readable project name")]
    pub name: String,
    #[schemars(description = "Absolute path of the project checkout")]
    #[serde(default)]
    pub root_path: Option<String>,
    #[schemars(description = "Free-form JSON object")]
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectParams {
    #[schemars(description = "Project identifier")]
    pub project_id: String,
}

/// Parameters for memory_set
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MemorySetParams {
    pub project_id: String,
    #[schemars(description = "Topic grouping related notes (e.g. \"architecture\")")]
    pub topic: String,
    #[schemars(description = "Note key, unique within the topic")]
    pub key: String,
    #[schemars(description = "Note text. Omit to re-embed the stored value")]
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MemoryKeyParams {
    pub project_id: String,
    pub topic: String,
    pub key: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MemoryListParams {
    pub project_id: String,
    #[schemars(description = "Only list notes in this topic")]
    #[serde(default)]
    pub topic: Option<String>,
}

/// Parameters for the per-project search tools
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    pub project_id: String,
    #[schemars(description = "Natural language search query")]
    pub query: String,
    #[schemars(description = "Maximum number of results (default: 10, max: 100)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionCreateParams {
    pub project_id: String,
    #[schemars(description = "Session number, unique within the project (>= 1)")]
    pub session_num: i64,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[schemars(description = "Full transcript text")]
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionKeyParams {
    pub project_id: String,
    pub session_num: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FileIndexParams {
    pub project_id: String,
    #[schemars(description = "Path relative to the project root")]
    pub file_path: String,
    #[schemars(description = "File type (defaults to the path extension)")]
    #[serde(default)]
    pub file_type: Option<String>,
    #[schemars(description = "Symbols defined in the file")]
    #[serde(default)]
    pub symbols: Vec<Value>,
    #[schemars(description = "Signature summary used for search")]
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FileKeyParams {
    pub project_id: String,
    pub file_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FileListParams {
    pub project_id: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchAllParams {
    #[schemars(description = "Natural language search query")]
    pub query: String,
    #[schemars(description = "Maximum results per content kind (default: 10, max: 100)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct DeleteResult<'a> {
    deleted: bool,
    target: &'a str,
}

/// DevMemory MCP Service
#[derive(Clone)]
pub struct DevMemoryServer {
    service: MemoryService,
    tool_router: ToolRouter<Self>,
}

impl DevMemoryServer {
    pub fn new(service: MemoryService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl DevMemoryServer {
    #[tool(description = "Register or update a project. Every note, session and file belongs to a project.")]
    async fn project_register(
        &self,
        Parameters(params): Parameters<RegisterProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let metadata = object_param("metadata", params.metadata)?;
        let project = self
            .service
            .register_project(
                &params.project_id,
                &params.name,
                params.root_path.as_deref(),
                metadata,
            )
            .map_err(to_mcp_error)?;
        json_result(&project)
    }

    #[tool(description = "List registered projects.")]
    async fn project_list(&self) -> Result<CallToolResult, McpError> {
        let projects = self.service.list_projects().map_err(to_mcp_error)?;
        json_result(&projects)
    }

    #[tool(description = "Show a project's content counts, usage totals and embedding status.")]
    async fn project_status(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let status = self
            .service
            .project_status(&params.project_id)
            .map_err(to_mcp_error)?;
        json_result(&status)
    }

    #[tool(description = "Store a project note under topic/key. Overwrites an existing note with the same key.")]
    async fn memory_set(
        &self,
        Parameters(params): Parameters<MemorySetParams>,
    ) -> Result<CallToolResult, McpError> {
        let memory = self
            .service
            .set_memory(
                &params.project_id,
                &params.topic,
                &params.key,
                params.value.as_deref(),
                params.created_by.as_deref(),
            )
            .await
            .map_err(to_mcp_error)?;
        json_result(&memory)
    }

    #[tool(description = "Get a project note by topic/key.")]
    async fn memory_get(
        &self,
        Parameters(params): Parameters<MemoryKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        let memory = self
            .service
            .get_memory(&params.project_id, &params.topic, &params.key)
            .map_err(to_mcp_error)?;
        match memory {
            Some(memory) => json_result(&memory),
            None => Ok(not_found(&format!(
                "Memory not found: {}/{}",
                params.topic, params.key
            ))),
        }
    }

    #[tool(description = "List project notes, optionally for one topic.")]
    async fn memory_list(
        &self,
        Parameters(params): Parameters<MemoryListParams>,
    ) -> Result<CallToolResult, McpError> {
        let memories = self
            .service
            .list_memories(&params.project_id, params.topic.as_deref())
            .map_err(to_mcp_error)?;
        json_result(&memories)
    }

    #[tool(description = "Search project notes. Uses vector similarity when embeddings are available, full-text search otherwise.")]
    async fn memory_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let response = self
            .service
            .search_memories(&params.project_id, &params.query, params.limit)
            .await
            .map_err(to_mcp_error)?;
        json_result(&response)
    }

    #[tool(description = "Delete a project note by topic/key.")]
    async fn memory_delete(
        &self,
        Parameters(params): Parameters<MemoryKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        let deleted = self
            .service
            .delete_memory(&params.project_id, &params.topic, &params.key)
            .map_err(to_mcp_error)?;
        json_result(&DeleteResult {
            deleted,
            target: &format!("{}/{}", params.topic, params.key),
        })
    }

    #[tool(description = "Store a numbered session transcript with title, summary and content.")]
    async fn session_create(
        &self,
        Parameters(params): Parameters<SessionCreateParams>,
    ) -> Result<CallToolResult, McpError> {
        let input = SessionInput {
            summary: params.summary,
            content: params.content,
            metadata: object_param("metadata", params.metadata)?,
        };
        let session = self
            .service
            .create_session(&params.project_id, params.session_num, &params.title, input)
            .await
            .map_err(to_mcp_error)?;
        json_result(&session)
    }

    #[tool(description = "Get a session transcript by number, including its full content.")]
    async fn session_get(
        &self,
        Parameters(params): Parameters<SessionKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        let session = self
            .service
            .get_session(&params.project_id, params.session_num)
            .map_err(to_mcp_error)?;
        match session {
            Some(session) => json_result(&session),
            None => Ok(not_found(&format!(
                "Session not found: {}",
                params.session_num
            ))),
        }
    }

    #[tool(description = "List session transcripts (without content).")]
    async fn session_list(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let sessions = self
            .service
            .list_sessions(&params.project_id)
            .map_err(to_mcp_error)?;
        json_result(&sessions)
    }

    #[tool(description = "Search session transcripts by meaning or keywords.")]
    async fn session_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let response = self
            .service
            .search_sessions(&params.project_id, &params.query, params.limit)
            .await
            .map_err(to_mcp_error)?;
        json_result(&response)
    }

    #[tool(description = "Delete a session transcript by number.")]
    async fn session_delete(
        &self,
        Parameters(params): Parameters<SessionKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        let deleted = self
            .service
            .delete_session(&params.project_id, params.session_num)
            .map_err(to_mcp_error)?;
        json_result(&DeleteResult {
            deleted,
            target: &params.session_num.to_string(),
        })
    }

    #[tool(description = "Index a source file's signature: symbols and a short summary.")]
    async fn file_index(
        &self,
        Parameters(params): Parameters<FileIndexParams>,
    ) -> Result<CallToolResult, McpError> {
        let input = FileInput {
            file_type: params.file_type,
            symbols: params.symbols,
            summary: params.summary,
        };
        let file = self
            .service
            .index_file(&params.project_id, &params.file_path, input)
            .await
            .map_err(to_mcp_error)?;
        json_result(&file)
    }

    #[tool(description = "Get an indexed file signature by path.")]
    async fn file_get(
        &self,
        Parameters(params): Parameters<FileKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        let file = self
            .service
            .get_file(&params.project_id, &params.file_path)
            .map_err(to_mcp_error)?;
        match file {
            Some(file) => json_result(&file),
            None => Ok(not_found(&format!("File not indexed: {}", params.file_path))),
        }
    }

    #[tool(description = "List indexed files, optionally by file type.")]
    async fn file_list(
        &self,
        Parameters(params): Parameters<FileListParams>,
    ) -> Result<CallToolResult, McpError> {
        let files = self
            .service
            .list_files(&params.project_id, params.file_type.as_deref())
            .map_err(to_mcp_error)?;
        json_result(&files)
    }

    #[tool(description = "Search indexed files by meaning or keywords instead of reading them.")]
    async fn file_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let response = self
            .service
            .search_files(&params.project_id, &params.query, params.limit)
            .await
            .map_err(to_mcp_error)?;
        json_result(&response)
    }

    #[tool(description = "Remove a file signature from the index.")]
    async fn file_delete(
        &self,
        Parameters(params): Parameters<FileKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        let deleted = self
            .service
            .delete_file(&params.project_id, &params.file_path)
            .map_err(to_mcp_error)?;
        json_result(&DeleteResult {
            deleted,
            target: &params.file_path,
        })
    }

    #[tool(description = "Search notes, sessions and files across all projects.")]
    async fn search_all(
        &self,
        Parameters(params): Parameters<SearchAllParams>,
    ) -> Result<CallToolResult, McpError> {
        let response = self
            .service
            .search_all(&params.query, params.limit)
            .await
            .map_err(to_mcp_error)?;
        json_result(&response)
    }

    #[tool(description = "Usage dashboard: content counts, queries and estimated tokens saved.")]
    async fn dashboard_stats(&self) -> Result<CallToolResult, McpError> {
        let stats = self.service.dashboard_stats().map_err(to_mcp_error)?;
        json_result(&stats)
    }

    #[tool(description = "Compute missing embeddings for a project's notes, sessions and files.")]
    async fn reembed(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .service
            .reembed(&params.project_id)
            .await
            .map_err(to_mcp_error)?;
        json_result(&report)
    }
}

#[tool_handler]
impl ServerHandler for DevMemoryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "DevMemory MCP Server. Project memory for coding sessions: notes, session transcripts and file signatures with semantic or full-text search.".to_string()
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn to_mcp_error(e: Error) -> McpError {
    if e.is_caller_error() {
        McpError::invalid_params(e.to_string(), None)
    } else {
        tracing::error!(error = %e, "tool call failed");
        McpError::internal_error(e.to_string(), None)
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

fn not_found(message: &str) -> CallToolResult {
    CallToolResult::success(vec![Content::text(message.to_string())])
}

fn object_param(name: &str, value: Option<Value>) -> Result<Option<Map<String, Value>>, McpError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(McpError::invalid_params(
            format!("{name} must be a JSON object"),
            None,
        )),
    }
}

/// Log a dashboard summary every time the stats topic fires.
fn spawn_stats_watcher(service: &MemoryService) -> tokio::task::JoinHandle<()> {
    let mut subscription = service.events().subscribe();
    let service = service.clone();

    tokio::spawn(async move {
        while let Some(topic) = subscription.recv().await {
            if topic != DASHBOARD_STATS_TOPIC {
                continue;
            }
            // Read directly: going through the service would record usage
            // and re-fire the topic.
            let status = service.embedding_status();
            match stats::dashboard_stats(service.store().as_ref(), &status, Utc::now()) {
                Ok(stats) => tracing::info!(
                    projects = stats.project_count,
                    memories = stats.memory_count,
                    sessions = stats.session_count,
                    files = stats.file_count,
                    queries = stats.total_queries,
                    tokens_saved = stats.total_tokens_saved,
                    queries_24h = stats.queries_last_24h,
                    "dashboard stats"
                ),
                Err(e) => tracing::warn!(error = %e, "dashboard stats refresh failed"),
            }
        }
    })
}

/// Run the MCP server over stdio
pub async fn run_mcp_server(service: MemoryService, watch_stats: bool) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let watcher = watch_stats.then(|| spawn_stats_watcher(&service));

    tracing::info!(watch_stats, "starting MCP server on stdio");
    let transport = (stdin(), stdout());
    let server = DevMemoryServer::new(service).serve(transport).await?;
    server.waiting().await?;

    if let Some(watcher) = watcher {
        watcher.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::search::embedding::DisabledEmbedder;
    use crate::store::SqliteStore;
    use std::sync::Arc;

    fn server() -> DevMemoryServer {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let embedder = Arc::new(DisabledEmbedder::new(384));
        let service = MemoryService::new(store, embedder, EventBus::new());
        DevMemoryServer::new(service)
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_memory_roundtrip_through_tools() {
        let server = server();
        server
            .project_register(Parameters(RegisterProjectParams {
                project_id: "t1".to_string(),
                name: "T1".to_string(),
                root_path: None,
                metadata: Some(serde_json::json!({"lang": "rust"})),
            }))
            .await
            .unwrap();

        server
            .memory_set(Parameters(MemorySetParams {
                project_id: "t1".to_string(),
                topic: "arch".to_string(),
                key: "db".to_string(),
                value: Some("uses sqlite with fts5".to_string()),
                created_by: None,
            }))
            .await
            .unwrap();

        let result = server
            .memory_search(Parameters(SearchParams {
                project_id: "t1".to_string(),
                query: "sqlite".to_string(),
                limit: None,
            }))
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(json["search_type"], "full-text");
        assert_eq!(json["results"][0]["key"], "db");

        let missing = server
            .memory_get(Parameters(MemoryKeyParams {
                project_id: "t1".to_string(),
                topic: "arch".to_string(),
                key: "cache".to_string(),
            }))
            .await
            .unwrap();
        assert!(text(&missing).starts_with("Memory not found"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_map_to_invalid_params() {
        let server = server();
        let err = server
            .search_all(Parameters(SearchAllParams {
                query: "  ".to_string(),
                limit: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

        let err = server
            .project_register(Parameters(RegisterProjectParams {
                project_id: "t1".to_string(),
                name: "T1".to_string(),
                root_path: None,
                metadata: Some(serde_json::json!(["not", "an", "object"])),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_server_exposes_tools() {
        let info = server().get_info();
        assert!(info.capabilities.tools.is_some());
    }
}

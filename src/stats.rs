//! Accounting Reader
//!
//! Dashboard numbers are recomputed from the store on every call.

use chrono::{DateTime, Duration, Utc};

use crate::core::model::{DashboardStats, ProjectStats};
use crate::error::Result;
use crate::search::embedding::EmbeddingStatus;
use crate::store::ContentStore;

/// Trailing window for the "recent" counters.
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// Build the dashboard summary as of `now`.
pub fn dashboard_stats(
    store: &dyn ContentStore,
    embedding_status: &EmbeddingStatus,
    now: DateTime<Utc>,
) -> Result<DashboardStats> {
    let project_count = store.count_projects()?;
    let content = store.count_content(None)?;
    // Window first: usage is append-only, so recent <= all-time holds.
    let recent = store.usage_totals(Some(now - Duration::hours(RECENT_WINDOW_HOURS)))?;
    let all_time = store.usage_totals(None)?;

    let mut projects = Vec::new();
    for project in store.list_projects()? {
        let breakdown = store
            .count_content(Some(&project.id))
            .and_then(|counts| Ok((counts, store.project_usage_totals(&project.id)?)));
        match breakdown {
            Ok((counts, usage)) => projects.push(ProjectStats {
                project,
                memory_count: counts.memories,
                session_count: counts.sessions,
                file_count: counts.files,
                query_count: usage.queries,
                tokens_saved: usage.tokens,
            }),
            Err(e) => {
                tracing::warn!(project = %project.id, error = %e, "skipping project stats");
            }
        }
    }

    Ok(DashboardStats {
        project_count,
        memory_count: content.memories,
        session_count: content.sessions,
        file_count: content.files,
        total_queries: all_time.queries,
        total_tokens_saved: all_time.tokens,
        queries_last_24h: recent.queries,
        tokens_last_24h: recent.tokens,
        embedding_status: embedding_status.to_string(),
        projects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Memory, Project, UsageStat};
    use crate::store::testing::HookedStore;
    use crate::store::SqliteStore;

    fn usage(project: &str, tokens: i64, at: DateTime<Utc>) -> UsageStat {
        UsageStat {
            id: 0,
            project_id: Some(project.to_string()),
            tool_name: "memory_search".to_string(),
            query_text: "auth".to_string(),
            results_count: 1,
            tokens_estimated: tokens,
            created_at: at,
        }
    }

    #[test]
    fn test_dashboard_stats() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_project(&Project::new("a", "Alpha")).unwrap();
        store.upsert_project(&Project::new("b", "Beta")).unwrap();
        store
            .upsert_memory(&Memory::new("a", "arch", "db", "sqlite"), None)
            .unwrap();
        store
            .upsert_memory(&Memory::new("b", "arch", "db", "postgres"), None)
            .unwrap();
        store
            .upsert_memory(&Memory::new("b", "arch", "cache", "redis"), None)
            .unwrap();

        let now = Utc::now();
        store.append_usage(&usage("a", 500, now)).unwrap();
        store
            .append_usage(&usage("b", 2000, now - Duration::hours(30)))
            .unwrap();

        let stats = dashboard_stats(&store, &EmbeddingStatus::Disabled, now).unwrap();
        assert_eq!(stats.project_count, 2);
        assert_eq!(stats.memory_count, 3);
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.total_tokens_saved, 2500);
        assert_eq!(stats.queries_last_24h, 1);
        assert_eq!(stats.tokens_last_24h, 500);
        assert!(stats.queries_last_24h <= stats.total_queries);
        assert!(stats.embedding_status.starts_with("disabled"));

        let beta = stats.projects.iter().find(|p| p.project.id == "b").unwrap();
        assert_eq!(beta.memory_count, 2);
        assert_eq!(beta.query_count, 1);
        assert_eq!(beta.tokens_saved, 2000);
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let status = EmbeddingStatus::Unknown {
            url: "http://localhost:8080/embed".to_string(),
            dim: 384,
        };
        let stats = dashboard_stats(&store, &status, Utc::now()).unwrap();
        assert_eq!(stats.project_count, 0);
        assert_eq!(stats.total_queries, 0);
        assert!(stats.projects.is_empty());
        assert_eq!(
            stats.embedding_status,
            "enabled (url=http://localhost:8080/embed, dim=384)"
        );
    }

    #[test]
    fn test_recent_never_exceeds_all_time_with_concurrent_writes() {
        let mut store = HookedStore::new(SqliteStore::open_in_memory().unwrap());
        store.upsert_project(&Project::new("a", "Alpha")).unwrap();
        // Another request records usage after every totals read.
        store.after_usage_totals = Some(Box::new(|inner: &SqliteStore| {
            inner.append_usage(&usage("a", 500, Utc::now())).unwrap();
        }));

        let stats = dashboard_stats(&store, &EmbeddingStatus::Disabled, Utc::now()).unwrap();
        assert_eq!(stats.queries_last_24h, 0);
        assert_eq!(stats.total_queries, 1);
        assert!(stats.queries_last_24h <= stats.total_queries);
        assert!(stats.tokens_last_24h <= stats.total_tokens_saved);
    }
}

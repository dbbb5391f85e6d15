use std::sync::Arc;
use std::time::Duration;

use devmemory::search::embedding::{from_config, HttpEmbedder};
use devmemory::service::SessionInput;
use devmemory::{
    ContentStore, EmbeddingStatus, EventBus, MemoryService, SearchMode, SqliteStore,
    DASHBOARD_STATS_TOPIC,
};

fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

fn keyword_service(store: Arc<SqliteStore>) -> MemoryService {
    let embedder = from_config(None, 3, Duration::from_secs(1)).unwrap();
    MemoryService::new(store, embedder, EventBus::new())
}

#[tokio::test]
async fn search_all_caps_each_kind_across_projects() {
    let store = store();
    let service = keyword_service(store.clone());

    for project in ["t1", "t2"] {
        service.register_project(project, project, None, None).unwrap();
        for (key, value) in [
            ("a", "auth handled by the gateway"),
            ("b", "auth tokens rotate daily"),
            ("c", "auth auth auth everywhere"),
        ] {
            service
                .set_memory(project, "auth", key, Some(value), None)
                .await
                .unwrap();
        }
    }

    let response = service.search_all("auth", Some(2)).await.unwrap();
    assert_eq!(response.search_type, SearchMode::FullText);
    assert_eq!(response.results.memories.len(), 2);
    assert!(response.results.memories[0].score >= response.results.memories[1].score);
    assert!(response.results.memories.iter().all(|m| m.item.key == "c"));
}

#[tokio::test]
async fn http_embeddings_drive_semantic_search_and_degrade_to_full_text() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("POST", "/embed")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embedding": [1.0, 0.0, 0.0]}"#)
        .expect(2)
        .create_async()
        .await;

    let store = store();
    let embedder = Arc::new(
        HttpEmbedder::new(format!("{}/embed", server.url()), 3, Duration::from_secs(5)).unwrap(),
    );
    let service = MemoryService::new(store.clone(), embedder, EventBus::new());
    service.register_project("t1", "T1", None, None).unwrap();

    let note = service
        .set_memory("t1", "arch", "db", Some("uses sqlite"), None)
        .await
        .unwrap();
    assert!(note.embedding.is_some());

    let response = service.search_memories("t1", "database", None).await.unwrap();
    assert_eq!(response.search_type, SearchMode::Semantic);
    assert_eq!(response.results.len(), 1);
    assert!((response.results[0].score - 1.0).abs() < 1e-6);
    ok.assert_async().await;

    // Service starts failing: writes keep the stored vector, search falls back.
    ok.remove_async().await;
    server
        .mock("POST", "/embed")
        .with_status(500)
        .create_async()
        .await;

    service
        .set_memory("t1", "arch", "db", Some("uses sqlite with fts5"), None)
        .await
        .unwrap();
    let stored = store.get_memory("t1", "arch", "db").unwrap().unwrap();
    assert_eq!(stored.value, "uses sqlite with fts5");
    assert_eq!(stored.embedding, Some(vec![1.0, 0.0, 0.0]));

    let response = service.search_memories("t1", "fts5", None).await.unwrap();
    assert_eq!(response.search_type, SearchMode::FullText);
    assert_eq!(response.results.len(), 1);
    assert!(matches!(
        service.embedding_status(),
        EmbeddingStatus::Degraded { .. }
    ));
}

#[tokio::test]
async fn observers_are_signalled_and_slow_ones_miss_events() {
    let store = store();
    let events = EventBus::with_capacity(1);
    let embedder = from_config(None, 3, Duration::from_secs(1)).unwrap();
    let service = MemoryService::new(store.clone(), embedder, events.clone());

    let mut slow = events.subscribe();
    service.register_project("t1", "T1", None, None).unwrap();
    service.list_projects().unwrap();
    service.list_sessions("t1").unwrap();

    // Three publishes, capacity one: only the first is buffered.
    assert_eq!(slow.try_recv().as_deref(), Some(DASHBOARD_STATS_TOPIC));
    assert_eq!(slow.try_recv(), None);

    let totals = store.usage_totals(None).unwrap();
    assert_eq!(totals.queries, 3);

    slow.unsubscribe();
    assert_eq!(events.subscriber_count(), 0);
}

#[tokio::test]
async fn dashboard_reflects_recorded_operations() {
    let store = store();
    let service = keyword_service(store);
    service.register_project("t1", "T1", None, None).unwrap();
    service
        .create_session(
            "t1",
            1,
            "Auth rework",
            SessionInput {
                summary: Some("Moved tokens to cookies".to_string()),
                ..SessionInput::default()
            },
        )
        .await
        .unwrap();
    let hits = service.search_sessions("t1", "cookies", None).await.unwrap();
    assert_eq!(hits.results.len(), 1);

    let stats = service.dashboard_stats().unwrap();
    assert_eq!(stats.project_count, 1);
    assert_eq!(stats.session_count, 1);
    // register + create + search
    assert_eq!(stats.total_queries, 3);
    assert_eq!(stats.total_tokens_saved, 100 + 100 + 2000);
    assert!(stats.tokens_last_24h <= stats.total_tokens_saved);
    assert_eq!(stats.projects[0].session_count, 1);
}

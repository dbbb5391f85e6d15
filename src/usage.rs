//! Usage Recorder
//!
//! One accounting record per completed operation. Recording never fails
//! the operation it instruments.

use chrono::Utc;
use std::sync::Arc;

use crate::core::model::UsageStat;
use crate::core::operation::Operation;
use crate::events::{EventBus, DASHBOARD_STATS_TOPIC};
use crate::store::ContentStore;

#[derive(Clone)]
pub struct UsageRecorder {
    store: Arc<dyn ContentStore>,
    events: EventBus,
}

impl UsageRecorder {
    pub fn new(store: Arc<dyn ContentStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Persist an accounting record and signal dashboard observers.
    ///
    /// Persistence failures are logged and swallowed; observers are only
    /// signalled after a successful write.
    pub fn record(
        &self,
        operation: Operation,
        project_id: Option<&str>,
        query: &str,
        results_count: usize,
    ) {
        let stat = UsageStat {
            id: 0,
            project_id: project_id.map(str::to_string),
            tool_name: operation.as_str().to_string(),
            query_text: query.to_string(),
            results_count: results_count as i64,
            tokens_estimated: operation.estimate_tokens(results_count),
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.append_usage(&stat) {
            tracing::warn!(
                operation = %operation,
                project = project_id.unwrap_or("-"),
                error = %e,
                "failed to record usage"
            );
            return;
        }

        let notified = self.events.publish(DASHBOARD_STATS_TOPIC.to_string());
        tracing::trace!(operation = %operation, notified, "usage recorded");
    }
}

//! Externally visible operations and their token-savings estimates
//!
//! The per-operation weights are product policy. They approximate how many
//! tokens a caller would have spent re-reading the material a result
//! replaces; keep them stable so dashboard history stays comparable.

use serde::Serialize;
use std::fmt;

/// Flat estimate for single-effect operations (writes, deletes, listings).
pub const FLAT_TOKEN_ESTIMATE: i64 = 100;

/// How an operation's token estimate is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCost {
    PerResult(i64),
    Flat(i64),
}

impl TokenCost {
    pub fn estimate(self, results_count: usize) -> i64 {
        match self {
            TokenCost::PerResult(weight) => weight.saturating_mul(results_count as i64),
            TokenCost::Flat(tokens) => tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ProjectRegister,
    ProjectList,
    ProjectStatus,
    MemorySet,
    MemoryGet,
    MemoryList,
    MemorySearch,
    MemoryDelete,
    SessionCreate,
    SessionGet,
    SessionList,
    SessionSearch,
    SessionDelete,
    FileIndex,
    FileGet,
    FileList,
    FileSearch,
    FileDelete,
    SearchAll,
    DashboardStats,
    Reembed,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ProjectRegister => "project_register",
            Operation::ProjectList => "project_list",
            Operation::ProjectStatus => "project_status",
            Operation::MemorySet => "memory_set",
            Operation::MemoryGet => "memory_get",
            Operation::MemoryList => "memory_list",
            Operation::MemorySearch => "memory_search",
            Operation::MemoryDelete => "memory_delete",
            Operation::SessionCreate => "session_create",
            Operation::SessionGet => "session_get",
            Operation::SessionList => "session_list",
            Operation::SessionSearch => "session_search",
            Operation::SessionDelete => "session_delete",
            Operation::FileIndex => "file_index",
            Operation::FileGet => "file_get",
            Operation::FileList => "file_list",
            Operation::FileSearch => "file_search",
            Operation::FileDelete => "file_delete",
            Operation::SearchAll => "search_all",
            Operation::DashboardStats => "dashboard_stats",
            Operation::Reembed => "reembed",
        }
    }

    pub fn token_cost(self) -> TokenCost {
        match self {
            Operation::MemorySearch => TokenCost::PerResult(500),
            Operation::SessionSearch => TokenCost::PerResult(2000),
            Operation::FileSearch => TokenCost::PerResult(800),
            _ => TokenCost::Flat(FLAT_TOKEN_ESTIMATE),
        }
    }

    pub fn estimate_tokens(self, results_count: usize) -> i64 {
        self.token_cost().estimate(results_count)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

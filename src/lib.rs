//! devmemory library
//!
//! Persistent project memory for coding agents: notes, session transcripts
//! and file signatures, retrieved by vector similarity or full-text search,
//! with per-operation token-savings accounting.
//!
//! # Modules
//!
//! - `core`: Data model and operation table
//! - `store`: Storage boundary and the SQLite engine
//! - `search`: Embedding gateway, strategy selection, cross-project search
//! - `service`: Every externally visible operation
//! - `mcp`: MCP server exposing the service as tools

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod logging;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod search;
pub mod service;
pub mod stats;
pub mod store;
pub mod usage;

// Re-exports for convenience
pub use core::model::{
    DashboardStats, FileEntry, Memory, Project, Scored, SearchAllResult, Session, UsageStat,
};
pub use core::operation::Operation;
pub use error::{Error, Result};
pub use events::{EventBus, Subscription, DASHBOARD_STATS_TOPIC};
pub use search::embedding::{Embedder, EmbeddingStatus};
pub use search::strategy::SearchMode;
pub use service::MemoryService;
pub use store::{ContentStore, SqliteStore};

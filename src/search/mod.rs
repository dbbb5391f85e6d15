//! Retrieval for DevMemory
//!
//! An embedding gateway that may or may not produce a vector, a selector
//! that picks similarity or keyword ranking from that, and the executors
//! that run the chosen strategy per content kind and across projects.

pub mod embedding;
pub mod engine;
pub mod strategy;

pub use embedding::{Embedder, EmbeddingStatus};
pub use engine::{normalize_limit, SearchEngine};
pub use strategy::{SearchMode, Strategy};

//! Embedding Gateway
//!
//! Thin client to the external text→vector service. `embed` is total: any
//! transport failure, non-success status, malformed body or dimension
//! mismatch yields `None`, and the caller falls back to keyword search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::model::Vector;
use crate::error::Result;

/// Default embedding dimension (all-MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Default bound on a single embedding call
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);

/// Availability of the embedding service as last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingStatus {
    /// No service configured; keyword search only.
    Disabled,
    /// Configured, no call made yet.
    Unknown { url: String, dim: usize },
    Available { url: String, dim: usize },
    /// Configured, but the last call resolved to absent.
    Degraded { url: String, dim: usize },
}

impl EmbeddingStatus {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EmbeddingStatus::Disabled)
    }
}

impl fmt::Display for EmbeddingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingStatus::Disabled => write!(
                f,
                "disabled (no EMBEDDING_URL configured, using keyword search only)"
            ),
            EmbeddingStatus::Unknown { url, dim } => write!(f, "enabled (url={url}, dim={dim})"),
            EmbeddingStatus::Available { url, dim } => {
                write!(f, "available (url={url}, dim={dim})")
            }
            EmbeddingStatus::Degraded { url, dim } => write!(
                f,
                "degraded (url={url}, dim={dim}, last call failed, falling back to keyword search)"
            ),
        }
    }
}

/// Text→vector provider. Never fails the caller.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. `None` means "no vector available".
    async fn embed(&self, text: &str) -> Option<Vector>;

    /// Embed several texts as repeated single calls.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vector>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        results
    }

    /// Configured dimensionality.
    fn dimensions(&self) -> usize;

    fn status(&self) -> EmbeddingStatus;
}

/// Embedder used when no service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEmbedder {
    dim: usize,
}

impl DisabledEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Option<Vector> {
        None
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn status(&self) -> EmbeddingStatus {
        EmbeddingStatus::Disabled
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

const STATE_UNKNOWN: u8 = 0;
const STATE_AVAILABLE: u8 = 1;
const STATE_DEGRADED: u8 = 2;

/// HTTP client for a `POST {"text"} -> {"embedding": [...]}` service.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    dim: usize,
    state: AtomicU8,
}

impl HttpEmbedder {
    pub fn new(url: impl Into<String>, dim: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            dim,
            state: AtomicU8::new(STATE_UNKNOWN),
        })
    }

    fn mark(&self, ok: bool) {
        let state = if ok { STATE_AVAILABLE } else { STATE_DEGRADED };
        self.state.store(state, Ordering::Relaxed);
    }

    async fn request(&self, text: &str) -> std::result::Result<Vector, String> {
        let resp = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest { text })
            .send()
            .await
            .map_err(|e| format!("embedding call failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("embedding API error: status={status} body={body}"));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| format!("embedding decode error: {e}"))?;

        if parsed.embedding.len() != self.dim {
            return Err(format!(
                "embedding dimension mismatch: expected={} got={}",
                self.dim,
                parsed.embedding.len()
            ));
        }

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Option<Vector> {
        if text.is_empty() {
            return None;
        }

        match self.request(text).await {
            Ok(vector) => {
                self.mark(true);
                Some(vector)
            }
            Err(reason) => {
                tracing::warn!(url = %self.url, "{reason}");
                self.mark(false);
                None
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn status(&self) -> EmbeddingStatus {
        let url = self.url.clone();
        let dim = self.dim;
        match self.state.load(Ordering::Relaxed) {
            STATE_AVAILABLE => EmbeddingStatus::Available { url, dim },
            STATE_DEGRADED => EmbeddingStatus::Degraded { url, dim },
            _ => EmbeddingStatus::Unknown { url, dim },
        }
    }
}

/// Build the gateway for an optional service URL.
pub fn from_config(url: Option<&str>, dim: usize, timeout: Duration) -> Result<Arc<dyn Embedder>> {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Ok(Arc::new(HttpEmbedder::new(url, dim, timeout)?)),
        None => Ok(Arc::new(DisabledEmbedder::new(dim))),
    }
}

/// Cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// Similarity score in `[0, 1]`: `1 - cosine distance`, clamped.
pub fn similarity_score(a: &[f32], b: &[f32]) -> f64 {
    let distance = 1.0 - cosine_similarity(a, b) as f64;
    (1.0 - distance).clamp(0.0, 1.0)
}

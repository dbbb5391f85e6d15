//! Runtime configuration
//!
//! Every setting is a global CLI flag with an environment fallback, so a
//! `.env` file loaded at startup configures the MCP server as well.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::events::EventBus;
use crate::logging::LogFormat;
use crate::search::embedding::{self, Embedder, DEFAULT_EMBEDDING_DIM};
use crate::service::MemoryService;
use crate::store::SqliteStore;

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite database path
    #[arg(long, global = true, env = "DEVMEMORY_DB", default_value = "devmemory.db")]
    pub db: PathBuf,

    /// Embedding service endpoint (unset: keyword search only)
    #[arg(long, global = true, env = "EMBEDDING_URL")]
    pub embedding_url: Option<String>,

    /// Expected embedding dimension
    #[arg(long, global = true, env = "EMBEDDING_DIM", default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Embedding request timeout in seconds
    #[arg(long, global = true, env = "EMBEDDING_TIMEOUT_SECS", default_value_t = 30)]
    pub embedding_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs.max(1))
    }

    pub fn open_store(&self) -> Result<Arc<SqliteStore>> {
        Ok(Arc::new(SqliteStore::open(&self.db)?))
    }

    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        embedding::from_config(
            self.embedding_url.as_deref(),
            self.embedding_dim,
            self.embedding_timeout(),
        )
    }

    /// Open the store and wire the service with a fresh event bus.
    pub fn build_service(&self) -> Result<MemoryService> {
        let service = MemoryService::new(self.open_store()?, self.embedder()?, EventBus::new());
        tracing::info!(
            db = %self.db.display(),
            embedding = %service.embedding_status(),
            "devmemory ready"
        );
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = TestCli::try_parse_from([
            "devmemory",
            "--db",
            "/tmp/dm.db",
            "--embedding-url",
            "http://localhost:8080/embed",
            "--embedding-dim",
            "8",
            "--embedding-timeout-secs",
            "0",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config.db, PathBuf::from("/tmp/dm.db"));
        assert_eq!(cli.config.embedding_dim, 8);
        assert_eq!(cli.config.embedding_timeout(), Duration::from_secs(1));
        assert_eq!(cli.config.log_format, LogFormat::Json);
        assert!(cli.config.embedder().unwrap().status().is_enabled());
    }

    #[test]
    fn test_build_service_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dm.db");
        let cli = TestCli::try_parse_from([
            "devmemory",
            "--db",
            db.to_str().unwrap(),
            "--embedding-url",
            "",
        ])
        .unwrap();

        let service = cli.config.build_service().unwrap();
        assert!(!service.embedding_status().is_enabled());
        assert!(db.exists());
    }
}

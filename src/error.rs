//! Library error taxonomy
//!
//! Only fatal-to-operation failures live here. Embedding failures resolve to
//! an absent vector and accounting failures are logged, so neither has a
//! variant.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed caller argument, rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("project '{0}' not found")]
    ProjectNotFound(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage connection lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// True for errors caused by the caller rather than the engine.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_) | Error::ProjectNotFound(_) | Error::NotFound(_)
        )
    }
}

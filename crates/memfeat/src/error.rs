//! Error types for the memfeat pipeline shell.
//!
//! Normalizing and aggregating never fail. These cover what surrounds them:
//! reading snapshot directories, loading settings, writing artifacts.

use thiserror::Error;
use voltab::TableError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("snapshot directory not found: {0}")]
    SnapshotNotFound(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

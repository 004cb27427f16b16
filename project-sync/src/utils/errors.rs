//! Error types for the sync tools.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("path escapes base directory: {0}")]
    PathEscape(String),

    #[error("Remote protocol error: {0}")]
    RemoteProtocol(String),

    #[error("Invalid manifest: {0}")]
    ManifestFormat(String),

    #[error("Archive extraction failed: {0}")]
    ArchiveExtraction(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("target directory is not empty: {0}")]
    TargetNotEmpty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

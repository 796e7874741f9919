use std::path::PathBuf;

use thiserror::Error;

/// Inventory problems are fatal: the run never starts.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("cannot read inventory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse inventory {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("duplicate device id '{0}' in inventory")]
    DuplicateId(String),

    #[error("device #{index} has an empty '{field}'")]
    EmptyField { index: usize, field: &'static str },

    #[error("command set is empty")]
    EmptyCommandSet,
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("run '{0}' is already archived")]
    AlreadyExists(String),

    #[error("run '{0}' not found in archive")]
    NotFound(String),

    #[error("invalid run id '{0}'")]
    InvalidRunId(String),

    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

//! Error types for overlay-fs

use std::path::PathBuf;

/// Result type for overlay-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in overlay-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("No backup available for {path}")]
    NoBackupAvailable { path: PathBuf },

    #[error("No backup of {path} matches timestamp {timestamp}")]
    BackupNotFound { path: PathBuf, timestamp: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

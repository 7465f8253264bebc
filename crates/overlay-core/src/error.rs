//! Error types for overlay-core

use std::path::PathBuf;

/// Result type for overlay-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in overlay-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A layer fragment failed to parse or is not a JSON object
    #[error("Layer '{source_id}' is not a valid JSON object fragment: {message}")]
    InvalidFragment { source_id: String, message: String },

    /// A merge strategy met a value of the wrong shape
    #[error("Merge strategy cannot apply at '{key_path}': {detail}")]
    StrategyTypeMismatch { key_path: String, detail: String },

    /// Two layers in one composition declare the same precedence
    #[error("Layers '{first}' and '{second}' both declare precedence {precedence}")]
    DuplicatePrecedence {
        precedence: u32,
        first: String,
        second: String,
    },

    /// The target changed on disk between the read and the write
    #[error("{path} changed on disk since it was read: expected digest {expected}, found {found}")]
    ConcurrentModification {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Content failed validation for its target kind
    #[error("Refusing to write invalid {kind} content to {path}: {message}")]
    InvalidContent {
        path: PathBuf,
        kind: String,
        message: String,
    },

    /// The rename failed after staging; manual recovery may be needed
    #[error("Write to {path} failed after staging; pre-write backup kept at {backup}: {source}")]
    CommitFailed {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: overlay_fs::Error,
    },

    /// A manifest names a strategy this engine does not know
    #[error("Unknown merge strategy '{name}'")]
    UnknownStrategy { name: String },

    /// A requested target is not declared in the manifest
    #[error("Target '{name}' is not declared in the manifest")]
    UnknownTarget { name: String },

    /// Filesystem error from overlay-fs
    #[error(transparent)]
    Fs(#[from] overlay_fs::Error),

    /// Section engine error from overlay-content
    #[error(transparent)]
    Content(#[from] overlay_content::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

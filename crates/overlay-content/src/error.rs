//! Error types for overlay-content

/// Result type for overlay-content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in overlay-content operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unbalanced markers for section '{name}': {detail}")]
    UnbalancedMarkers { name: String, detail: String },

    #[error("Section '{name}' appears more than once")]
    DuplicateSection { name: String },

    #[error("Invalid version '{version}' in begin marker for '{name}': {source}")]
    InvalidVersion {
        name: String,
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Section not found: {name}")]
    SectionNotFound { name: String },
}

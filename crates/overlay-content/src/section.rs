//! Managed section types

use semver::Version;
use serde::{Deserialize, Serialize};

/// A versioned block of text owned by the engine.
///
/// Within a target document at most one section with a given name exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier, also carried in the markers
    pub name: String,
    /// Version written into the begin marker; compared for equality only
    pub version: Version,
    /// Content between the markers (excluding the markers themselves)
    pub body: String,
}

impl Section {
    /// Create a new section.
    pub fn new(name: impl Into<String>, version: Version, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            body: body.into(),
        }
    }
}

/// Where a new section block is inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Anchor {
    /// Before the user-customization region when present, else at the end
    #[default]
    Auto,
    /// Always at document end
    End,
    /// Immediately before the first occurrence of the given text
    Before(String),
}

/// What an upsert did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// A new block was appended at the anchor
    Inserted,
    /// Version differed; only the block's body and version token changed
    Updated { previous: Version },
    /// Same version already present; the document is byte-identical
    Unchanged,
}

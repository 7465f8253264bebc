//! Managed-section engine for Overlay
//!
//! Finds, validates, and rewrites marker-delimited regions inside text
//! documents without disturbing user-authored content. All operations work on
//! an in-memory copy and return a complete new string or an error, never a
//! partially updated document.

pub mod document;
pub mod error;
pub mod markers;
pub mod section;

pub use document::SectionDocument;
pub use error::{Error, Result};
pub use markers::{DEFAULT_PREFIX, Markers};
pub use section::{Anchor, Section, SectionOutcome};

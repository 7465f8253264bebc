//! Core composition and orchestration layer for Overlay
//!
//! This crate coordinates the Layer 0 crates into the mutation pipeline:
//!
//! - **Layer composer**: folds ordered JSON fragments into one settings
//!   document under per-key merge strategies
//! - **Drift ledger**: digests recorded at write time, compared on demand
//! - **Engine**: the backup → stage → verify → rename → record sequence for
//!   every managed target
//! - **Syncer**: manifest-driven synchronization of all declared targets
//!
//! # Architecture
//!
//! ```text
//!           CLI
//!            |
//!       overlay-core
//!            |
//!     +------+---------+
//!     |                |
//! overlay-fs    overlay-content
//! ```

pub mod apply;
pub mod compose;
pub mod drift;
pub mod error;
pub mod manifest;
pub mod report;
pub mod sync;

pub use apply::{ApplyOutcome, Engine, TargetKind};
pub use compose::{Composed, Layer, MergeStrategy, StrategyTable, compose, render_canonical};
pub use drift::{DigestLedger, DriftState};
pub use error::{Error, Result};
pub use manifest::{DocumentTarget, LayerSpec, Manifest, SectionSpec, SettingsTarget};
pub use report::{ChangeAction, ChangeEntry, ChangeSet};
pub use sync::{SyncOptions, SyncReport, Syncer, TargetPreview};

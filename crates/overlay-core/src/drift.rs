//! Drift records
//!
//! A JSON sidecar maps each managed target to the digest recorded at its last
//! successful apply. The ledger is rewritten on every successful write and
//! consulted by `status` and the optimistic concurrency check; it never feeds
//! into merge decisions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use overlay_fs::{file_digest, write_atomic};

use crate::error::Result;

/// Relationship between a recorded digest and the file's current bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftState {
    /// Recorded digest matches the on-disk bytes
    Clean,
    /// File content differs from the last recorded digest
    Drifted { recorded: String, current: String },
    /// A digest is recorded but the file is gone
    Missing { recorded: String },
    /// No digest recorded for this path
    Untracked,
}

/// Persistent digest records, one per tracked path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestLedger {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl DigestLedger {
    /// Load the ledger, or start empty if the sidecar does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        let mut ledger: Self = if path.exists() {
            let content =
                fs::read_to_string(path).map_err(|e| overlay_fs::Error::io(path, e))?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };
        ledger.path = path.to_path_buf();
        Ok(ledger)
    }

    /// Persist the ledger atomically.
    pub fn save(&self) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        write_atomic(&self.path, content.as_bytes())?;
        Ok(())
    }

    /// Record (or overwrite) the digest for a target.
    pub fn record(&mut self, target: &Path, digest: impl Into<String>) {
        self.entries.insert(ledger_key(target), digest.into());
    }

    /// Drop the record for a target. Returns whether one existed.
    pub fn forget(&mut self, target: &Path) -> bool {
        self.entries.remove(&ledger_key(target)).is_some()
    }

    /// The digest recorded for a target, if any.
    pub fn recorded(&self, target: &Path) -> Option<&str> {
        self.entries.get(&ledger_key(target)).map(String::as_str)
    }

    /// Compare the recorded digest against the file's current bytes.
    pub fn state(&self, target: &Path) -> Result<DriftState> {
        let Some(recorded) = self.recorded(target) else {
            return Ok(DriftState::Untracked);
        };
        if !target.exists() {
            return Ok(DriftState::Missing {
                recorded: recorded.to_string(),
            });
        }
        let current = file_digest(target)?;
        if current == recorded {
            Ok(DriftState::Clean)
        } else {
            Ok(DriftState::Drifted {
                recorded: recorded.to_string(),
                current,
            })
        }
    }
}

/// Ledger keys are absolute paths so relative spellings collapse.
fn ledger_key(target: &Path) -> String {
    std::path::absolute(target)
        .unwrap_or_else(|_| target.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

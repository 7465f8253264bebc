//! Mutation orchestration
//!
//! The engine owns the backup → stage → verify → rename → record sequence for
//! every managed target. No other component writes to managed files, so a
//! failure before the rename always leaves the original untouched.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use overlay_content::{Markers, SectionDocument};
use overlay_fs::{
    BackupSelector, BackupStore, PruneReport, Snapshot, StagedWrite, content_digest, file_digest,
};

use crate::drift::{DigestLedger, DriftState};
use crate::error::{Error, Result};

/// How `apply` validates content before and after staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Must parse as a JSON object; staged bytes are re-parsed before commit
    Json,
    /// Markers must balance
    Text,
}

/// What a successful apply did.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Content was written; the pre-write state is in `backup`
    Written { digest: String, backup: Snapshot },
    /// On-disk bytes already matched; nothing was written
    Unchanged,
}

/// Orchestrator for all managed-file mutations.
pub struct Engine {
    backups: BackupStore,
    ledger_path: PathBuf,
    markers: Markers,
}

impl Engine {
    /// Create an engine with its state under `state_root` (backups and the
    /// digest sidecar).
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        let root = state_root.into();
        Self {
            backups: BackupStore::new(root.join("backups")),
            ledger_path: root.join("state").join("digests.json"),
            markers: Markers::default(),
        }
    }

    /// Use a custom marker dialect for text validation.
    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    /// The snapshot store backing this engine.
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Load the digest ledger.
    pub fn ledger(&self) -> Result<DigestLedger> {
        DigestLedger::load(&self.ledger_path)
    }

    /// Write `new_content` to `target` through the full safety sequence.
    ///
    /// With `expected_prior_digest`, the current on-disk digest is checked
    /// first: a mismatch fails with `ConcurrentModification` and writes
    /// nothing, so content composed from a stale read cannot clobber an
    /// externally modified file. The check is never retried internally.
    pub fn apply(
        &self,
        target: &Path,
        new_content: &str,
        kind: TargetKind,
        expected_prior_digest: Option<&str>,
    ) -> Result<ApplyOutcome> {
        self.validate(target, new_content, kind)?;

        let current = match fs::read(target) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(overlay_fs::Error::io(target, e).into()),
        };

        if let Some(expected) = expected_prior_digest {
            let found = current
                .as_deref()
                .map(content_digest)
                .unwrap_or_else(|| "absent".to_string());
            if found != expected {
                return Err(Error::ConcurrentModification {
                    path: target.to_path_buf(),
                    expected: expected.to_string(),
                    found,
                });
            }
        }

        let digest = content_digest(new_content.as_bytes());

        if current.as_deref() == Some(new_content.as_bytes()) {
            // Nothing to write; refresh the drift record so status stays accurate
            let mut ledger = self.ledger()?;
            ledger.record(target, &digest);
            ledger.save()?;
            return Ok(ApplyOutcome::Unchanged);
        }

        let backup = self.backups.snapshot(target)?;

        let staged = StagedWrite::stage(target, new_content.as_bytes())?;
        if kind == TargetKind::Json {
            // The staged bytes, not the in-memory string, are what goes live
            let staged_bytes = fs::read(staged.staged_path())
                .map_err(|e| overlay_fs::Error::io(staged.staged_path(), e))?;
            if let Err(e) = serde_json::from_slice::<Value>(&staged_bytes) {
                return Err(Error::InvalidContent {
                    path: target.to_path_buf(),
                    kind: "JSON".to_string(),
                    message: format!("staged bytes failed to re-parse: {e}"),
                });
            }
        }

        if let Err(e) = staged.commit() {
            return Err(Error::CommitFailed {
                path: target.to_path_buf(),
                backup: backup.backup_path.clone(),
                source: e,
            });
        }

        let mut ledger = self.ledger()?;
        ledger.record(target, &digest);
        ledger.save()?;

        tracing::info!(target_file = %target.display(), %digest, "applied new content");
        Ok(ApplyOutcome::Written { digest, backup })
    }

    /// Roll a target back to a snapshot and rebase its drift record.
    pub fn restore(&self, target: &Path, selector: &BackupSelector) -> Result<Snapshot> {
        let snapshot = self.backups.restore(target, selector)?;

        let mut ledger = self.ledger()?;
        if target.exists() {
            ledger.record(target, file_digest(target)?);
        } else {
            ledger.forget(target);
        }
        ledger.save()?;

        Ok(snapshot)
    }

    /// Drift state of a target against its recorded digest.
    pub fn status(&self, target: &Path) -> Result<DriftState> {
        self.ledger()?.state(target)
    }

    /// Prune old snapshots of a target.
    pub fn prune(&self, target: &Path, keep: usize) -> Result<PruneReport> {
        Ok(self.backups.prune(target, keep)?)
    }

    fn validate(&self, target: &Path, content: &str, kind: TargetKind) -> Result<()> {
        match kind {
            TargetKind::Json => {
                let value: Value =
                    serde_json::from_str(content).map_err(|e| Error::InvalidContent {
                        path: target.to_path_buf(),
                        kind: "JSON".to_string(),
                        message: e.to_string(),
                    })?;
                if !value.is_object() {
                    return Err(Error::InvalidContent {
                        path: target.to_path_buf(),
                        kind: "JSON".to_string(),
                        message: "top-level value must be an object".to_string(),
                    });
                }
            }
            TargetKind::Text => {
                SectionDocument::parse_with(content, self.markers.clone())?;
            }
        }
        Ok(())
    }
}

//! Timestamped snapshot store
//!
//! One immutable file per snapshot event, named
//! `<logical-name>_<sortable-timestamp>.<ext>` under a single backup root.
//! The logical name carries a short digest of the original's absolute path so
//! same-named files from different directories cannot collide. Snapshots of an
//! absent original use the `.absent` extension so a rollback can restore
//! "no file" exactly.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::io::write_atomic;
use crate::{Error, Result};

/// Extension marking a snapshot of a file that did not exist
const ABSENT_EXT: &str = "absent";

/// Timestamp format, lexicographically sortable at microsecond resolution
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%6fZ";

/// A single snapshot event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The file this snapshot was taken of
    pub original_path: PathBuf,
    /// Sortable timestamp token from the snapshot file name
    pub timestamp: String,
    /// Where the payload is stored
    pub backup_path: PathBuf,
    /// True when the original did not exist at snapshot time
    pub absent: bool,
}

/// Which backup `restore` should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupSelector {
    /// The most recent snapshot
    Latest,
    /// The snapshot with this exact timestamp token
    At(String),
}

/// Result of a prune pass. Deletion failures are collected, never raised.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Store of immutable snapshot files under a single backup root.
///
/// `snapshot` is a pure copy and never touches the original. `restore`
/// overwrites the target through the same atomic-write discipline as the
/// orchestrator, after taking a safety snapshot of the current state.
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created lazily on the first snapshot.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The backup root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot the current bytes of `path` (or record its absence).
    pub fn snapshot(&self, path: &Path) -> Result<Snapshot> {
        fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))?;

        let logical = logical_name(path);
        let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        let (payload, ext) = match fs::read(path) {
            Ok(bytes) => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("bak")
                    .to_string();
                (bytes, ext)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Vec::new(), ABSENT_EXT.to_string())
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        let backup_path = self.unique_backup_path(&logical, &timestamp, &ext);
        write_atomic(&backup_path, &payload)?;

        let absent = ext == ABSENT_EXT;
        tracing::debug!(
            original = %path.display(),
            backup = %backup_path.display(),
            absent,
            "snapshot taken"
        );

        Ok(Snapshot {
            original_path: path.to_path_buf(),
            timestamp: timestamp_token(&backup_path, &logical),
            backup_path,
            absent,
        })
    }

    /// All snapshots of `path`, oldest first.
    pub fn list(&self, path: &Path) -> Result<Vec<Snapshot>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let logical = logical_name(path);
        let prefix = format!("{logical}_");
        let mut snapshots = Vec::new();

        for entry in fs::read_dir(&self.root).map_err(|e| Error::io(&self.root, e))? {
            let entry = entry.map_err(|e| Error::io(&self.root, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }

            let backup_path = entry.path();
            let absent = backup_path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == ABSENT_EXT);

            snapshots.push(Snapshot {
                original_path: path.to_path_buf(),
                timestamp: timestamp_token(&backup_path, &logical),
                backup_path,
                absent,
            });
        }

        snapshots.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(snapshots)
    }

    /// Roll `path` back to a chosen snapshot.
    ///
    /// The current state is snapshotted first, so a rollback is itself
    /// recoverable. Returns the snapshot that was restored.
    pub fn restore(&self, path: &Path, selector: &BackupSelector) -> Result<Snapshot> {
        let snapshots = self.list(path)?;
        let chosen = match selector {
            BackupSelector::Latest => {
                snapshots
                    .last()
                    .cloned()
                    .ok_or_else(|| Error::NoBackupAvailable {
                        path: path.to_path_buf(),
                    })?
            }
            BackupSelector::At(timestamp) => snapshots
                .iter()
                .find(|s| s.timestamp == *timestamp)
                .cloned()
                .ok_or_else(|| Error::BackupNotFound {
                    path: path.to_path_buf(),
                    timestamp: timestamp.clone(),
                })?,
        };

        // Safety backup of current state before rollback
        self.snapshot(path)?;

        if chosen.absent {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(path, e)),
            }
        } else {
            let payload =
                fs::read(&chosen.backup_path).map_err(|e| Error::io(&chosen.backup_path, e))?;
            write_atomic(path, &payload)?;
        }

        tracing::info!(
            target_file = %path.display(),
            timestamp = %chosen.timestamp,
            "restored from snapshot"
        );
        Ok(chosen)
    }

    /// Keep the `keep` most recent snapshots of `path`, deleting the rest.
    ///
    /// Deletion is best-effort; failures land in the report and do not abort
    /// the calling operation.
    pub fn prune(&self, path: &Path, keep: usize) -> Result<PruneReport> {
        let snapshots = self.list(path)?;
        let mut report = PruneReport::default();

        if snapshots.len() <= keep {
            return Ok(report);
        }

        let excess = snapshots.len() - keep;
        for snapshot in &snapshots[..excess] {
            match fs::remove_file(&snapshot.backup_path) {
                Ok(()) => report.removed.push(snapshot.backup_path.clone()),
                Err(e) => {
                    tracing::warn!(
                        backup = %snapshot.backup_path.display(),
                        error = %e,
                        "failed to prune snapshot"
                    );
                    report
                        .failed
                        .push((snapshot.backup_path.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// First free name for a snapshot file.
    ///
    /// Two snapshots of one file within the same microsecond get a numeric
    /// suffix on the timestamp token; the suffixed token still sorts after
    /// the bare one.
    fn unique_backup_path(&self, logical: &str, timestamp: &str, ext: &str) -> PathBuf {
        let base = self.root.join(format!("{logical}_{timestamp}.{ext}"));
        if !base.exists() {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = self.root.join(format!("{logical}_{timestamp}-{n}.{ext}"));
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Stable identity of an original file inside the backup root.
fn logical_name(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(absolute.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    format!("{stem}-{}", &digest[..8])
}

/// Extract the timestamp token between `<logical>_` and the extension.
fn timestamp_token(backup_path: &Path, logical: &str) -> String {
    backup_path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix(&format!("{logical}_")))
        .unwrap_or_default()
        .to_string()
}

//! Atomic file writes
//!
//! Every mutation of a managed target goes through the write-to-temp-then-rename
//! discipline with an advisory lock on the temp file. `StagedWrite` exposes the
//! two halves separately so the orchestrator can verify staged bytes before the
//! rename makes them live.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// A temp file staged next to its target, awaiting commit.
///
/// The target is only ever touched by the rename in [`StagedWrite::commit`].
/// Dropping an uncommitted stage removes the temp file, so an aborted
/// operation leaves at most nothing behind.
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    temp: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Stage `content` into a temp file in the target's directory.
    ///
    /// The temp file lives in the same directory as the target so the final
    /// rename stays on one filesystem.
    pub fn stage(target: &Path, content: &[u8]) -> Result<Self> {
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let temp_name = format!(
            ".{}.{}.tmp",
            target
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
            std::process::id()
        );
        let temp = target.with_file_name(&temp_name);

        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)
            .map_err(|e| Error::io(&temp, e))?;

        temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: target.to_path_buf(),
        })?;

        temp_file
            .write_all(content)
            .map_err(|e| Error::io(&temp, e))?;

        temp_file.sync_all().map_err(|e| Error::io(&temp, e))?;

        FileExt::unlock(&temp_file).map_err(|_| Error::LockFailed {
            path: target.to_path_buf(),
        })?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            committed: false,
        })
    }

    /// Path of the staged temp file, for pre-commit verification.
    pub fn staged_path(&self) -> &Path {
        &self.temp
    }

    /// Atomically rename the temp file over the target.
    ///
    /// This is the sole serialization point: the last commit to complete wins.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.temp, &self.target).map_err(|e| Error::io(&self.target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// Write content atomically to a file in one step.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    StagedWrite::stage(path, content)?.commit()
}

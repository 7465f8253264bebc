//! Restore command implementation

use std::path::Path;

use colored::Colorize;

use overlay_core::Syncer;
use overlay_fs::BackupSelector;

use crate::error::Result;

/// Roll a managed target back to a snapshot, or list its snapshots.
pub fn run_restore(root: &Path, target: &str, at: Option<&str>, list: bool) -> Result<()> {
    let syncer = Syncer::load(root)?;
    let path = syncer.resolve_target(target)?;

    if list {
        let snapshots = syncer.engine().backups().list(&path)?;
        if snapshots.is_empty() {
            println!("No snapshots of {target}.");
            return Ok(());
        }
        for snapshot in &snapshots {
            let note = if snapshot.absent {
                " (file did not exist)".dimmed().to_string()
            } else {
                String::new()
            };
            println!("  {}{}", snapshot.timestamp, note);
        }
        return Ok(());
    }

    let selector = match at {
        Some(timestamp) => BackupSelector::At(timestamp.to_string()),
        None => BackupSelector::Latest,
    };

    let restored = syncer.engine().restore(&path, &selector)?;

    if restored.absent {
        println!(
            "{} Removed {} (restored pre-creation state from {})",
            "OK".green().bold(),
            target,
            restored.timestamp
        );
    } else {
        println!(
            "{} Restored {} from snapshot {}",
            "OK".green().bold(),
            target,
            restored.timestamp
        );
    }
    Ok(())
}

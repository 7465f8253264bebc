//! Sync command implementation

use std::path::Path;

use colored::Colorize;

use overlay_core::{SyncOptions, Syncer};

use crate::error::{CliError, Result};

/// Compose layers and update managed targets.
pub fn run_sync(root: &Path, dry_run: bool, tags: &[String], json: bool) -> Result<()> {
    let syncer = Syncer::load(root)?;
    let options = SyncOptions {
        dry_run,
        tags: tags.to_vec(),
    };

    let report = syncer.sync(&options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for action in &report.actions {
            if action.starts_with("Unchanged") {
                println!("  {} {}", "=".dimmed(), action.dimmed());
            } else {
                println!("  {} {}", "+".green(), action);
            }
        }
        for error in &report.errors {
            println!("  {} {}", "!".red().bold(), error);
        }
        if report.success {
            println!("{} Sync complete.", "OK".green().bold());
        }
    }

    if !report.success {
        return Err(CliError::user("sync completed with errors"));
    }
    Ok(())
}

//! Status command implementation

use std::path::Path;

use colored::Colorize;

use overlay_core::{DriftState, Syncer};

use crate::error::Result;

/// Report the drift state of every managed target.
pub fn run_status(root: &Path, json: bool) -> Result<()> {
    let syncer = Syncer::load(root)?;
    let states = syncer.status()?;

    if json {
        let entries: Vec<serde_json::Value> = states
            .iter()
            .map(|(path, state)| {
                serde_json::json!({
                    "path": path.display().to_string(),
                    "state": state_label(state),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if states.is_empty() {
        println!("No targets declared in the manifest.");
        return Ok(());
    }

    let mut drifted = 0;
    for (path, state) in &states {
        let display = path.strip_prefix(root).unwrap_or(path).display();
        match state {
            DriftState::Clean => {
                println!("{} {}", "clean".green().bold(), display);
            }
            DriftState::Drifted { .. } => {
                drifted += 1;
                println!(
                    "{} {} (edited since last sync)",
                    "drifted".red().bold(),
                    display
                );
            }
            DriftState::Missing { .. } => {
                drifted += 1;
                println!("{} {} (file is gone)", "missing".yellow().bold(), display);
            }
            DriftState::Untracked => {
                println!("{} {} (never synced)", "untracked".dimmed(), display);
            }
        }
    }

    if drifted > 0 {
        println!();
        println!(
            "Run {} to see differences, {} to reapply.",
            "overlay diff".cyan(),
            "overlay sync".cyan()
        );
    }

    Ok(())
}

fn state_label(state: &DriftState) -> &'static str {
    match state {
        DriftState::Clean => "clean",
        DriftState::Drifted { .. } => "drifted",
        DriftState::Missing { .. } => "missing",
        DriftState::Untracked => "untracked",
    }
}

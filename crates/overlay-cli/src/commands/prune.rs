//! Prune command implementation

use std::path::Path;

use colored::Colorize;

use overlay_core::Syncer;

use crate::error::Result;

/// Delete old snapshots, keeping the most recent per target.
pub fn run_prune(root: &Path, keep: usize) -> Result<()> {
    let syncer = Syncer::load(root)?;

    let mut removed = 0;
    let mut failed = 0;
    for target in syncer.targets() {
        let report = syncer.engine().prune(&target, keep)?;
        removed += report.removed.len();
        failed += report.failed.len();
        for (path, reason) in &report.failed {
            println!(
                "  {} could not remove {}: {}",
                "!".yellow().bold(),
                path.display(),
                reason
            );
        }
    }

    println!(
        "{} Pruned {} snapshot(s), keeping up to {} per target.",
        "OK".green().bold(),
        removed,
        keep
    );
    if failed > 0 {
        println!("{failed} deletion(s) failed; see above.");
    }
    Ok(())
}

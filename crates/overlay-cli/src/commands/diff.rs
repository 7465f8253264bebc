//! Diff command implementation

use std::path::Path;

use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use overlay_core::Syncer;

use crate::error::Result;

/// Show a line diff between each installed target and its composed state.
pub fn run_diff(root: &Path, tags: &[String]) -> Result<()> {
    let syncer = Syncer::load(root)?;
    let previews = syncer.preview(tags)?;

    let mut changed = 0;
    for preview in &previews {
        let current = preview.current.as_deref().unwrap_or("");
        if current == preview.desired {
            continue;
        }
        changed += 1;

        let display = preview.path.strip_prefix(root).unwrap_or(&preview.path);
        println!(
            "{} {} ({})",
            "==>".blue().bold(),
            display.display(),
            preview.changes.summary()
        );

        let diff = TextDiff::from_lines(current, &preview.desired);
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Delete => print!("{}", format!("-{}", change.value()).red()),
                ChangeTag::Insert => print!("{}", format!("+{}", change.value()).green()),
                ChangeTag::Equal => {}
            }
        }
        println!();
    }

    if changed == 0 {
        println!("{} Everything up to date.", "OK".green().bold());
    } else {
        println!("Run {} to apply.", "overlay sync".cyan());
    }

    Ok(())
}

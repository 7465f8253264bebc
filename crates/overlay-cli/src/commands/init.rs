//! Init command implementation

use std::fs;
use std::path::Path;

use colored::Colorize;

use overlay_core::sync::{MANIFEST_FILE, STATE_DIR};

use crate::error::{CliError, Result};

const MANIFEST_TEMPLATE: &str = r#"# Overlay manifest
#
# Declare composed settings files and managed documents here. Paths are
# relative to the project root.

# [[settings]]
# target = ".assistant/settings.json"
#
# [[settings.layer]]
# source = "base"
# precedence = 0
# path = "layers/base.json"
#
# [[settings.layer]]
# source = "python"
# precedence = 10
# path = "layers/python.json"
# when = ["python"]
#
# [settings.strategy]
# "permissions.allow" = "union"
# hooks = { strategy = "deep-merge", dedup-by = "command" }
# feedbackSurveyState = "preserved"

# [[document]]
# target = "ASSISTANT.md"
#
# [[document.section]]
# name = "general"
# version = "0.1.0"
# source = "sections/general.md"
"#;

/// Create the .overlay/ directory with a starter manifest.
pub fn run_init(root: &Path) -> Result<()> {
    let state_dir = root.join(STATE_DIR);
    let manifest_path = state_dir.join(MANIFEST_FILE);

    if manifest_path.exists() {
        return Err(CliError::user(format!(
            "{} already exists",
            manifest_path.display()
        )));
    }

    fs::create_dir_all(&state_dir)?;
    fs::write(&manifest_path, MANIFEST_TEMPLATE)?;

    println!(
        "{} Created {}",
        "OK".green().bold(),
        manifest_path.display()
    );
    println!();
    println!(
        "Declare your targets there, then run {}.",
        "overlay sync".cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_manifest() {
        let temp = TempDir::new().unwrap();
        run_init(temp.path()).unwrap();

        let manifest = temp.path().join(".overlay/config.toml");
        assert!(manifest.exists());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        run_init(temp.path()).unwrap();

        let result = run_init(temp.path());
        assert!(result.is_err());
    }
}

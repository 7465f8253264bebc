//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};

/// Overlay - compose layered settings and keep managed documents in sync
#[derive(Parser, Debug)]
#[command(name = "overlay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Initialize an .overlay/ directory with a starter manifest
    Init,

    /// Show drift state of every managed target
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Preview what sync would change
    Diff {
        /// Tags activating conditional layers and sections
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// Compose layers and update managed targets
    ///
    /// Reads the manifest, composes every settings target from its layers,
    /// upserts managed sections, and writes changed targets atomically with
    /// a backup of the prior state.
    ///
    /// Examples:
    ///   overlay sync                 # Update all targets
    ///   overlay sync --dry-run       # Preview without changing
    ///   overlay sync --tag python    # Activate python-tagged layers
    Sync {
        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Tags activating conditional layers and sections
        #[arg(short, long)]
        tag: Vec<String>,

        /// Output the report as JSON for CI integration
        #[arg(long)]
        json: bool,
    },

    /// Roll a managed target back to a snapshot
    Restore {
        /// Target path as declared in the manifest
        target: String,

        /// Timestamp of the snapshot to restore (defaults to the latest)
        #[arg(long)]
        at: Option<String>,

        /// List available snapshots instead of restoring
        #[arg(long)]
        list: bool,
    },

    /// Delete old snapshots, keeping the most recent per target
    Prune {
        /// Number of snapshots to keep per target
        #[arg(long, default_value_t = 5)]
        keep: usize,
    },
}

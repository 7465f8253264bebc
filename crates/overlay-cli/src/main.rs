//! Overlay CLI
//!
//! The command-line interface for composing layered settings files and
//! keeping managed document sections in sync.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let cwd = std::env::current_dir()?;

    match cli.command {
        Some(Commands::Init) => commands::run_init(&cwd),
        Some(Commands::Status { json }) => commands::run_status(&cwd, json),
        Some(Commands::Diff { tag }) => commands::run_diff(&cwd, &tag),
        Some(Commands::Sync { dry_run, tag, json }) => {
            commands::run_sync(&cwd, dry_run, &tag, json)
        }
        Some(Commands::Restore { target, at, list }) => {
            commands::run_restore(&cwd, &target, at.as_deref(), list)
        }
        Some(Commands::Prune { keep }) => commands::run_prune(&cwd, keep),
        None => {
            println!("{} layered settings composer", "overlay".green().bold());
            println!();
            println!("Run {} for available commands.", "overlay --help".cyan());
            Ok(())
        }
    }
}

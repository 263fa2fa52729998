//! Command-line host for the launcher.
//!
//! The binary is the presentation layer around [`crate::orchestrator`]: it
//! loads the configuration next to the executable, drives a check or an
//! install, renders progress and hands leftover obsolete files to a detached
//! `purge` process on exit.
//!
//! # Commands
//!
//! - `check` - ask the release source for the latest version
//! - `update [--clean]` - check, then install the newer version if any
//! - `status` - show the installed version, release source and layout
//! - `notes [--latest]` - print the release notes location
//! - `purge` (hidden) - the deferred-deletion process spawned on exit
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//! - `--no-progress` - no progress bars (also `RELAUNCH_NO_PROGRESS`)
//! - `--config <PATH>` - configuration file (also `RELAUNCH_CONFIG`)
//!
//! # Example
//!
//! ```bash
//! # See whether a new version exists
//! Launcher check
//!
//! # Install it, downloading the full archive instead of the patch
//! Launcher update --clean
//! ```

mod check;
mod context;
mod handoff;
mod notes;
mod purge;
mod status;
mod update;

pub use context::{LauncherContext, LauncherOrchestrator};
pub use handoff::spawn_purge;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runtime configuration derived from the global flags.
///
/// Passed to every command instead of being written to the process
/// environment, so tests can run commands side by side.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Filter directive for logging, `None` keeps `RUST_LOG`.
    pub log_level: Option<String>,
    /// Hide progress bars.
    pub no_progress: bool,
    /// Configuration file overriding `<stem>.toml` beside the executable.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_no_progress(mut self, no_progress: bool) -> Self {
        self.no_progress = no_progress;
        self
    }
}

/// Self-updating application launcher.
#[derive(Parser)]
#[command(
    name = "relaunch",
    about = "Self-updating application launcher",
    version,
    long_about = "Checks for a newer release of the application, downloads it and replaces the \
                  launcher and its files in place, rolling back when anything fails."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file.
    ///
    /// Defaults to `<executable stem>.toml` next to the executable.
    #[arg(short, long, global = true, env = "RELAUNCH_CONFIG")]
    config: Option<PathBuf>,

    /// Disable progress bars.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a newer version is available.
    Check(check::CheckCommand),

    /// Download and install the latest version.
    Update(update::UpdateCommand),

    /// Show the installed version and where updates come from.
    Status(status::StatusCommand),

    /// Print where the release notes can be read.
    Notes(notes::NotesCommand),

    /// Delete obsolete files left by an update.
    #[command(hide = true)]
    Purge(purge::PurgeCommand),
}

impl Cli {
    /// Runs the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translates the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Update(cmd) => cmd.execute(&config).await,
            Commands::Status(cmd) => cmd.execute(&config).await,
            Commands::Notes(cmd) => cmd.execute(&config).await,
            Commands::Purge(cmd) => cmd.execute().await,
        }
    }
}

//! relaunch entry point
//!
//! Parses the command line, sets up logging to stderr and to
//! `<executable stem>.log` beside the executable, runs the command and turns
//! errors into a colored report with exit code 1.

use anyhow::Result;
use clap::Parser;
use relaunch::cli::{Cli, CliConfig};
use relaunch::config::Layout;
use relaunch::core::error::user_friendly_error;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let config = cli.build_config();
    let log_path = Layout::current().ok().map(|layout| layout.log_path);
    init_logging(&config, log_path.as_deref());

    match cli.execute_with_config(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}

fn init_logging(config: &CliConfig, log_path: Option<&Path>) {
    let filter = match &config.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    // The log file is best effort: a read-only install still runs.
    let file_layer = log_path
        .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok())
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

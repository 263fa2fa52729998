//! `check` - report whether a newer version is available.

use super::{CliConfig, LauncherContext, handoff};
use crate::orchestrator::{Outcome, Stage};
use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct CheckCommand {}

impl CheckCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let context = LauncherContext::load(config).await?;
        let orchestrator = context.orchestrator().await?;

        if !config.no_progress {
            println!("{}", "Checking for updates...".cyan());
        }
        let outcome = orchestrator.start_check().await?;
        let result = report_check(outcome, context.project_name());
        if matches!(result, Ok(true)) {
            println!("Run `update` to install it, or `update --clean` for a full download");
        }

        handoff::hand_off(orchestrator.into_deletion_queue(), &context.layout);
        result.map(|_| ())
    }
}

/// Prints a check outcome and returns whether an update is available.
///
/// A failed check becomes the command error.
pub(super) fn report_check(outcome: Outcome, project: &str) -> Result<bool> {
    match (outcome.stage, outcome.error) {
        (Stage::Done, _) => {
            println!("{}", outcome.message.green());
            Ok(false)
        }
        (Stage::Update, _) => {
            println!("{}: {}", project.bold(), outcome.message.yellow());
            Ok(true)
        }
        (_, Some(error)) => Err(error.into()),
        (_, None) => Err(anyhow!("Version check did not complete")),
    }
}

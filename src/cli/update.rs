//! `update` - check, then download and install the newer version.

use super::check::report_check;
use super::context::LauncherOrchestrator;
use super::{CliConfig, LauncherContext, handoff};
use crate::core::RelaunchError;
use crate::orchestrator::{MSG_INSTALLED, Outcome, Stage, Status};
use crate::utils::progress::{MultiProgress, ProgressBar, ProgressUnit};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Download the full archive instead of the patch.
    #[arg(long)]
    pub clean: bool,
}

impl UpdateCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let context = LauncherContext::load(config).await?;
        let orchestrator = context.orchestrator().await?;

        let outcome = orchestrator.start_check().await?;
        let result = match report_check(outcome, context.project_name()) {
            Ok(true) => self.install(&orchestrator, config).await,
            Ok(false) => Ok(()),
            Err(e) => Err(e),
        };

        handoff::hand_off(orchestrator.into_deletion_queue(), &context.layout);
        result
    }

    async fn install(&self, orchestrator: &LauncherOrchestrator, config: &CliConfig) -> Result<()> {
        let multi = MultiProgress::new(config.no_progress);
        let bars = ProgressBars::new(&multi);
        let listener_bars = bars.clone();
        orchestrator.subscribe(Arc::new(move |status: &Status| listener_bars.show(status)));

        let outcome = run_until_done(orchestrator, self.clean, &multi).await?;
        bars.finish();
        report_install(outcome)
    }
}

/// Runs the install, turning Ctrl-C into a cancellation request.
async fn run_until_done(
    orchestrator: &LauncherOrchestrator,
    clean_install: bool,
    multi: &MultiProgress,
) -> Result<Outcome> {
    let update = orchestrator.start_update(clean_install);
    tokio::pin!(update);
    let mut listening = true;

    loop {
        tokio::select! {
            outcome = &mut update => return Ok(outcome?),
            signal = tokio::signal::ctrl_c(), if listening => match signal {
                Ok(()) if orchestrator.cancel() => {}
                Ok(()) => multi.println("Installing, the update can no longer be canceled"),
                Err(e) => {
                    warn!("Cannot listen for Ctrl-C: {e}");
                    listening = false;
                }
            },
        }
    }
}

fn report_install(outcome: Outcome) -> Result<()> {
    match (outcome.stage, outcome.error) {
        (Stage::Done, None) => {
            println!("{}", outcome.message.green());
            Ok(())
        }
        (Stage::Done, Some(persist)) => {
            println!("{}", MSG_INSTALLED.green());
            eprintln!("{}: {persist}", "warning".yellow());
            Ok(())
        }
        (_, Some(RelaunchError::Canceled)) => {
            println!("{}", outcome.message.yellow());
            Ok(())
        }
        (_, Some(error)) => Err(error.into()),
        (_, None) => Err(anyhow::anyhow!("{}", outcome.message)),
    }
}

/// Download and install bars fed from status snapshots.
#[derive(Clone)]
struct ProgressBars {
    download: ProgressBar,
    install: ProgressBar,
}

impl ProgressBars {
    fn new(multi: &MultiProgress) -> Self {
        let download = multi.add_bar(ProgressUnit::Bytes);
        download.set_prefix("Download");
        let install = multi.add_bar(ProgressUnit::Entries);
        install.set_prefix("Install ");
        Self {
            download,
            install,
        }
    }

    fn show(&self, status: &Status) {
        if status.stage != Stage::Cancel {
            return;
        }
        if status.install.done == 0 {
            self.download.update(status.download);
            self.download.set_message(status.message.clone());
        } else {
            self.install.update(status.install);
            self.install.set_message(status.message.clone());
        }
    }

    fn finish(&self) {
        self.download.finish_and_clear();
        self.install.finish_and_clear();
    }
}

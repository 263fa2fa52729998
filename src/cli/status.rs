//! `status` - show the installed version, release source and layout.

use super::{CliConfig, LauncherContext};
use crate::release::ReleaseSource;
use crate::utils::fs::with_suffix;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let context = LauncherContext::load(config).await?;
        let source = context.source(&context.transfer()?)?;
        let layout = &context.layout;

        println!("{}", context.project_name().bold());
        println!("  Installed version: {}", context.settings.current_version.green());
        println!("  Release source:    {}", source.describe());
        println!("  Executable:        {}", layout.executable.display());
        println!("  Install directory: {}", layout.install_dir.display());
        println!("  Scratch directory: {}", layout.scratch_dir.display());
        println!("  Configuration:     {}", layout.config_path.display());

        let targets = layout.replacement_targets(&context.settings);
        if targets.len() > 1 {
            println!("  Replaced with the executable:");
            for target in &targets[1..] {
                println!("    {}", target.display());
            }
        }

        let leftovers: Vec<_> = targets
            .iter()
            .map(|t| with_suffix(t, &context.settings.obsolete_suffix))
            .filter(|p| p.exists())
            .collect();
        if !leftovers.is_empty() {
            println!("  {}", "Obsolete copies awaiting cleanup:".yellow());
            for path in leftovers {
                println!("    {}", path.display());
            }
        }
        Ok(())
    }
}

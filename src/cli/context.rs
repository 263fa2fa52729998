//! Wiring shared by the commands: layout, settings and the orchestrator.

use super::CliConfig;
use crate::config::{ConfigStore, LauncherSettings, Layout};
use crate::orchestrator::{Orchestrator, OrchestratorOptions};
use crate::release::ConfiguredSource;
use crate::replace::{DisposalStrategy, SelfReplacer};
use crate::transfer::HttpTransfer;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// The launcher's view of itself: where it lives and how it is configured.
#[derive(Debug, Clone)]
pub struct LauncherContext {
    pub layout: Layout,
    pub settings: LauncherSettings,
}

/// An orchestrator wired to the configured release source and HTTP.
pub type LauncherOrchestrator = Orchestrator<ConfiguredSource, HttpTransfer>;

impl LauncherContext {
    /// Loads the context for the running executable.
    pub async fn load(config: &CliConfig) -> Result<Self> {
        let layout = Layout::current().context("Failed to locate the launcher executable")?;
        Self::load_for(layout, config.config_path.as_deref()).await
    }

    /// Loads the settings section named after the executable stem.
    pub async fn load_for(layout: Layout, config_path: Option<&Path>) -> Result<Self> {
        let layout = match config_path {
            Some(path) => layout.with_config_path(path.to_path_buf()),
            None => layout,
        };
        let store = ConfigStore::load(&layout.config_path).await?;
        let settings: LauncherSettings = store.section(&layout.stem)?;
        settings.validate()?;
        debug!(target: "config", "Loaded [{}] from {}", layout.stem, layout.config_path.display());

        Ok(Self {
            layout: layout.with_settings(&settings),
            settings,
        })
    }

    /// Display name for messages.
    pub fn project_name(&self) -> &str {
        self.settings.project_name.as_deref().unwrap_or(&self.layout.stem)
    }

    pub fn transfer(&self) -> Result<HttpTransfer> {
        Ok(HttpTransfer::new(&self.settings.user_agent)?)
    }

    pub fn source(&self, transfer: &HttpTransfer) -> Result<ConfiguredSource> {
        Ok(ConfiguredSource::from_settings(
            &self.settings,
            self.layout.artifact_base_name(&self.settings),
            transfer.client().clone(),
        )?)
    }

    pub fn replacer(&self) -> SelfReplacer {
        SelfReplacer::new(
            self.layout.replacement_targets(&self.settings),
            &self.settings.obsolete_suffix,
            DisposalStrategy::platform_default(),
            self.settings.cleanup_delay(),
        )
    }

    /// Builds the orchestrator and heals an interrupted earlier update.
    pub async fn orchestrator(&self) -> Result<LauncherOrchestrator> {
        let transfer = self.transfer()?;
        let source = self.source(&transfer)?;
        let options = OrchestratorOptions::new(
            self.settings.current_version.as_str(),
            &self.layout.install_dir,
            &self.layout.scratch_dir,
        )
        .with_version_record(&self.layout.config_path, &self.layout.stem);

        let orchestrator = Orchestrator::new(source, transfer, self.replacer(), options);
        orchestrator.recover().await.context("Failed to recover from an interrupted update")?;
        Ok(orchestrator)
    }
}

//! `notes` - print where the release notes can be read.

use super::{CliConfig, LauncherContext};
use crate::release::{ConfiguredSource, ReleaseSource};
use anyhow::{Result, bail};
use clap::Args;

#[derive(Args, Debug)]
pub struct NotesCommand {
    /// Notes of the latest release instead of the installed one.
    #[arg(long)]
    pub latest: bool,
}

impl NotesCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let context = LauncherContext::load(config).await?;
        let source = context.source(&context.transfer()?)?;

        let notes = if self.latest {
            source.latest().await?.notes_uri
        } else {
            installed_notes(&context, &source)
        };

        match notes {
            Some(uri) => {
                println!("{uri}");
                Ok(())
            }
            None => bail!("No release notes location is known for {}", context.project_name()),
        }
    }
}

/// The configured `notes_uri`, else the GitHub release page of the installed tag.
fn installed_notes(context: &LauncherContext, source: &ConfiguredSource) -> Option<String> {
    context.settings.notes_uri.clone().or_else(|| match source {
        ConfiguredSource::Github(github) => Some(github.notes_uri(&context.settings.current_version)),
        ConfiguredSource::Endpoint(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LauncherSettings, Layout};
    use std::path::Path;

    fn context(settings: LauncherSettings) -> LauncherContext {
        LauncherContext {
            layout: Layout::for_executable(Path::new("/opt/game/Launcher/Game.exe")).unwrap(),
            settings,
        }
    }

    #[tokio::test]
    async fn test_installed_notes_prefers_configured_uri() {
        let mut settings = LauncherSettings::new("1.2.0");
        settings.github = Some("acme/game".to_string());
        settings.notes_uri = Some("https://acme.example/notes".to_string());
        let context = context(settings);
        let source = context.source(&context.transfer().unwrap()).unwrap();

        assert_eq!(installed_notes(&context, &source).as_deref(), Some("https://acme.example/notes"));
    }

    #[tokio::test]
    async fn test_installed_notes_from_github_tag() {
        let mut settings = LauncherSettings::new("1.2.0");
        settings.github = Some("acme/game".to_string());
        let context = context(settings);
        let source = context.source(&context.transfer().unwrap()).unwrap();

        assert_eq!(
            installed_notes(&context, &source).as_deref(),
            Some("https://github.com/acme/game/releases/tag/1.2.0")
        );
    }

    #[tokio::test]
    async fn test_endpoint_without_notes_uri() {
        let mut settings = LauncherSettings::new("1.2.0");
        settings.latest_version_uri = Some("https://acme.example/latest".to_string());
        let context = context(settings);
        let source = context.source(&context.transfer().unwrap()).unwrap();

        assert_eq!(installed_notes(&context, &source), None);
    }
}

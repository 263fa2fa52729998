//! Typed launcher settings and the on-disk layout derived from them.

use crate::constants::{
    DEFAULT_CLEANUP_DELAY, DEFAULT_INSTALL_DIR, GITHUB_API_BASE, GITHUB_WEB_BASE, OBSOLETE_SUFFIX,
    SCRATCH_DIR_NAME, default_user_agent,
};
use crate::core::{RelaunchError, Result};
use crate::utils::fs::normalize_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The launcher section of the configuration file.
///
/// The section is named after the executable stem, so a launcher shipped as
/// `MyGame.exe` reads `[MyGame]` from `MyGame.toml`:
///
/// ```toml
/// [MyGame]
/// current_version = "1.0.0"
/// github = "acme/my-game"
/// auxiliary_files = ["MyGame.dll"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LauncherSettings {
    /// Last successfully installed version tag.
    pub current_version: String,

    /// JSON endpoint describing the latest release.
    #[serde(default)]
    pub latest_version_uri: Option<String>,

    /// GitHub repository as `owner/repo`, used when no endpoint is set.
    #[serde(default)]
    pub github: Option<String>,

    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,

    #[serde(default = "default_github_web_base")]
    pub github_web_base: String,

    /// Artifact name prefix; defaults to the executable stem.
    #[serde(default)]
    pub artifact_base_name: Option<String>,

    /// Release notes for the installed version.
    #[serde(default)]
    pub notes_uri: Option<String>,

    /// Display name for messages.
    #[serde(default)]
    pub project_name: Option<String>,

    /// Files replaced together with the executable, relative to its directory.
    #[serde(default)]
    pub auxiliary_files: Vec<PathBuf>,

    /// Directory the artifact is unpacked into, relative to the executable directory.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Scratch directory for downloads, relative to the executable directory.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    #[serde(default = "default_obsolete_suffix")]
    pub obsolete_suffix: String,

    /// Wait before the deferred-deletion process removes obsolete copies.
    #[serde(default = "default_cleanup_delay_ms")]
    pub cleanup_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_github_api_base() -> String {
    GITHUB_API_BASE.to_string()
}

fn default_github_web_base() -> String {
    GITHUB_WEB_BASE.to_string()
}

fn default_install_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INSTALL_DIR)
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(SCRATCH_DIR_NAME)
}

fn default_obsolete_suffix() -> String {
    OBSOLETE_SUFFIX.to_string()
}

fn default_cleanup_delay_ms() -> u64 {
    DEFAULT_CLEANUP_DELAY.as_millis() as u64
}

impl LauncherSettings {
    /// Settings with every optional key at its default.
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            latest_version_uri: None,
            github: None,
            github_api_base: default_github_api_base(),
            github_web_base: default_github_web_base(),
            artifact_base_name: None,
            notes_uri: None,
            project_name: None,
            auxiliary_files: Vec::new(),
            install_dir: default_install_dir(),
            scratch_dir: default_scratch_dir(),
            obsolete_suffix: default_obsolete_suffix(),
            cleanup_delay_ms: default_cleanup_delay_ms(),
            user_agent: default_user_agent(),
        }
    }

    /// Rejects values that would make an update unsafe or impossible.
    pub fn validate(&self) -> Result<()> {
        if self.current_version.trim().is_empty() {
            return Err(config_error("current_version must not be empty"));
        }
        if self.latest_version_uri.is_none() && self.github.is_none() {
            return Err(config_error("either latest_version_uri or github must be set"));
        }
        if let Some(repo) = &self.github
            && repo.split('/').filter(|part| !part.is_empty()).count() != 2
        {
            return Err(config_error(format!("github must be 'owner/repo', got '{repo}'")));
        }
        if self.obsolete_suffix.is_empty() {
            return Err(config_error("obsolete_suffix must not be empty"));
        }
        for file in &self.auxiliary_files {
            if file.is_absolute() || file.components().any(|c| c == std::path::Component::ParentDir) {
                return Err(config_error(format!(
                    "auxiliary file '{}' must be relative to the executable directory",
                    file.display()
                )));
            }
        }
        Ok(())
    }

    /// Wait handed to the deferred-deletion process.
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }
}

fn config_error(message: impl Into<String>) -> RelaunchError {
    RelaunchError::ConfigError {
        message: message.into(),
    }
}

/// Where everything lives, resolved from the executable location.
///
/// The launcher sits one directory below the application it updates:
///
/// ```text
/// app/                  <- install_dir (archive root)
/// ├── Game.exe
/// └── Launcher/         <- launcher_dir
///     ├── Launcher.exe  <- executable
///     ├── Launcher.toml <- config_path
///     ├── Launcher.log  <- log_path
///     └── Temp/         <- scratch_dir
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub executable: PathBuf,
    pub launcher_dir: PathBuf,
    pub install_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
    /// Executable file stem; names the config section, log and artifacts.
    pub stem: String,
}

impl Layout {
    /// Layout with default directories for the given executable path.
    pub fn for_executable(executable: &Path) -> Result<Self> {
        let executable = normalize_path(executable);
        let launcher_dir = executable
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| config_error(format!("{} has no parent directory", executable.display())))?;
        let stem = executable
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| config_error(format!("{} has no usable file name", executable.display())))?
            .to_string();

        Ok(Self {
            install_dir: normalize_path(&launcher_dir.join(DEFAULT_INSTALL_DIR)),
            scratch_dir: launcher_dir.join(SCRATCH_DIR_NAME),
            config_path: launcher_dir.join(format!("{stem}.toml")),
            log_path: launcher_dir.join(format!("{stem}.log")),
            executable,
            launcher_dir,
            stem,
        })
    }

    /// Layout for the running executable.
    pub fn current() -> Result<Self> {
        let exe = std::env::current_exe()?;
        Self::for_executable(&exe)
    }

    /// Replaces the configuration path.
    #[must_use]
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = path;
        self
    }

    /// Applies directory settings from the configuration.
    #[must_use]
    pub fn with_settings(mut self, settings: &LauncherSettings) -> Self {
        self.install_dir = normalize_path(&self.launcher_dir.join(&settings.install_dir));
        self.scratch_dir = normalize_path(&self.launcher_dir.join(&settings.scratch_dir));
        self
    }

    /// The running executable followed by every auxiliary file.
    pub fn replacement_targets(&self, settings: &LauncherSettings) -> Vec<PathBuf> {
        std::iter::once(self.executable.clone())
            .chain(settings.auxiliary_files.iter().map(|f| self.launcher_dir.join(f)))
            .collect()
    }

    /// Artifact name prefix, falling back to the executable stem.
    pub fn artifact_base_name<'a>(&'a self, settings: &'a LauncherSettings) -> &'a str {
        settings.artifact_base_name.as_deref().unwrap_or(&self.stem)
    }
}

//! Version check service.
//!
//! A [`ReleaseSource`] answers one question: what is the latest release, and
//! where are its artifacts? Two sources are provided:
//!
//! - [`EndpointSource`] - a JSON document at a fixed URI
//! - [`GithubSource`] - the GitHub "latest release" API plus the artifact
//!   naming convention `{base}{tag}{""|"patch"}.zip`
//!
//! [`ConfiguredSource`] picks one from the launcher settings.
//!
//! Version tags are opaque: two tags are equal when they match ignoring case.
//! There is no semantic version ordering, so any difference from the installed
//! version counts as an update.

mod endpoint;
mod github;

pub use endpoint::{EndpointSource, ReleaseDocument};
pub use github::{GithubRelease, GithubSource};

use crate::config::LauncherSettings;
use crate::constants::{ARTIFACT_EXTENSION, PATCH_ARTIFACT_MARKER};
use crate::core::{RelaunchError, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// A release identifier compared case-insensitively.
///
/// ```rust
/// use relaunch::release::VersionTag;
///
/// assert_eq!(VersionTag::new("V1.0.1-RC"), VersionTag::new("v1.0.1-rc"));
/// assert_ne!(VersionTag::new("1.0.1"), VersionTag::new("1.0.10"));
/// ```
#[derive(Debug, Clone)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag as written by the release source.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PartialEq for VersionTag {
    fn eq(&self, other: &Self) -> bool {
        self.folded() == other.folded()
    }
}

impl Eq for VersionTag {}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.folded().cmp(&other.folded())
    }
}

impl Hash for VersionTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for VersionTag {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

/// The latest release as reported by a [`ReleaseSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub latest_version_tag: VersionTag,
    /// Full artifact, used for clean installs.
    pub clean_artifact_uri: String,
    /// Incremental artifact carrying only changed files.
    pub patch_artifact_uri: String,
    pub notes_uri: Option<String>,
}

impl ReleaseDescriptor {
    /// The artifact to download for the requested install kind.
    pub fn artifact_uri(&self, clean_install: bool) -> &str {
        if clean_install { &self.clean_artifact_uri } else { &self.patch_artifact_uri }
    }
}

/// Artifact file name for a release.
///
/// ```rust
/// use relaunch::release::artifact_file_name;
///
/// assert_eq!(artifact_file_name("app", "1.0.1", true), "app1.0.1.zip");
/// assert_eq!(artifact_file_name("app", "1.0.1", false), "app1.0.1patch.zip");
/// ```
pub fn artifact_file_name(base_name: &str, tag: &str, clean_install: bool) -> String {
    let marker = if clean_install { "" } else { PATCH_ARTIFACT_MARKER };
    format!("{base_name}{tag}{marker}{ARTIFACT_EXTENSION}")
}

/// Provider of the latest release.
pub trait ReleaseSource: Send + Sync {
    /// One round trip to the release metadata provider.
    ///
    /// Fails with [`RelaunchError::VersionCheckFailed`] on transport errors
    /// and [`RelaunchError::ReleaseDecodeFailed`] when the payload is unusable.
    fn latest(&self) -> impl Future<Output = Result<ReleaseDescriptor>> + Send;

    /// Human-readable location of the source, for messages.
    fn describe(&self) -> String;
}

/// The release source selected by the launcher settings.
#[derive(Debug, Clone)]
pub enum ConfiguredSource {
    Endpoint(EndpointSource),
    Github(GithubSource),
}

impl ConfiguredSource {
    /// An explicit `latest_version_uri` wins over `github`.
    pub fn from_settings(
        settings: &LauncherSettings,
        artifact_base_name: &str,
        client: reqwest::Client,
    ) -> Result<Self> {
        if let Some(uri) = &settings.latest_version_uri {
            return Ok(Self::Endpoint(EndpointSource::new(client, uri.clone())));
        }
        let repo = settings.github.as_deref().ok_or_else(|| RelaunchError::ConfigError {
            message: "either latest_version_uri or github must be set".to_string(),
        })?;
        let (owner, name) = repo.split_once('/').ok_or_else(|| RelaunchError::ConfigError {
            message: format!("github must be 'owner/repo', got '{repo}'"),
        })?;
        Ok(Self::Github(
            GithubSource::new(client, owner, name, artifact_base_name)
                .with_api_base(&settings.github_api_base)
                .with_web_base(&settings.github_web_base),
        ))
    }
}

impl ReleaseSource for ConfiguredSource {
    async fn latest(&self) -> Result<ReleaseDescriptor> {
        match self {
            Self::Endpoint(source) => source.latest().await,
            Self::Github(source) => source.latest().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Endpoint(source) => source.describe(),
            Self::Github(source) => source.describe(),
        }
    }
}

/// GET `uri` and decode the JSON body into `T`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    uri: &str,
    accept: &str,
) -> Result<T> {
    let check_failed = |reason: String| RelaunchError::VersionCheckFailed {
        source_uri: uri.to_string(),
        reason,
    };

    debug!(target: "release", "GET {uri}");
    let response = client
        .get(uri)
        .header(reqwest::header::ACCEPT, accept)
        .send()
        .await
        .map_err(|e| check_failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(check_failed(format!("server responded with {status}")));
    }

    let body = response.text().await.map_err(|e| check_failed(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| RelaunchError::ReleaseDecodeFailed {
        reason: e.to_string(),
    })
}

/// Rejects blank required strings that serde accepted.
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RelaunchError::ReleaseDecodeFailed {
            reason: format!("field `{field}` is empty"),
        });
    }
    Ok(())
}

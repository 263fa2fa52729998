//! GitHub Releases as a release source.
//!
//! Only `tag_name` is read from the API. Artifact locations follow the release
//! download URL scheme, so a release needs two assets named by
//! [`artifact_file_name`]: `{base}{tag}.zip` and `{base}{tag}patch.zip`.

use super::{ReleaseDescriptor, ReleaseSource, VersionTag, artifact_file_name, fetch_json, require_non_empty};
use crate::constants::{GITHUB_API_BASE, GITHUB_WEB_BASE};
use crate::core::Result;
use serde::Deserialize;

/// The fields of a GitHub release this crate reads.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// The latest release of `owner/repo`.
#[derive(Debug, Clone)]
pub struct GithubSource {
    client: reqwest::Client,
    owner: String,
    repo: String,
    artifact_base_name: String,
    api_base: String,
    web_base: String,
}

impl GithubSource {
    pub fn new(client: reqwest::Client, owner: &str, repo: &str, artifact_base_name: &str) -> Self {
        Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            artifact_base_name: artifact_base_name.to_string(),
            api_base: GITHUB_API_BASE.to_string(),
            web_base: GITHUB_WEB_BASE.to_string(),
        }
    }

    /// Overrides `https://api.github.com` (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Overrides `https://github.com`.
    #[must_use]
    pub fn with_web_base(mut self, base: &str) -> Self {
        self.web_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn latest_release_uri(&self) -> String {
        format!("{}/repos/{}/{}/releases/latest", self.api_base, self.owner, self.repo)
    }

    pub fn download_uri(&self, tag: &str, file_name: &str) -> String {
        format!("{}/{}/{}/releases/download/{tag}/{file_name}", self.web_base, self.owner, self.repo)
    }

    pub fn notes_uri(&self, tag: &str) -> String {
        format!("{}/{}/{}/releases/tag/{tag}", self.web_base, self.owner, self.repo)
    }

    fn descriptor(&self, release: GithubRelease) -> Result<ReleaseDescriptor> {
        require_non_empty("tag_name", &release.tag_name)?;
        let tag = release.tag_name.trim();
        let clean = artifact_file_name(&self.artifact_base_name, tag, true);
        let patch = artifact_file_name(&self.artifact_base_name, tag, false);
        Ok(ReleaseDescriptor {
            latest_version_tag: VersionTag::new(tag),
            clean_artifact_uri: self.download_uri(tag, &clean),
            patch_artifact_uri: self.download_uri(tag, &patch),
            notes_uri: Some(release.html_url.unwrap_or_else(|| self.notes_uri(tag))),
        })
    }
}

impl ReleaseSource for GithubSource {
    async fn latest(&self) -> Result<ReleaseDescriptor> {
        let release: GithubRelease =
            fetch_json(&self.client, &self.latest_release_uri(), "application/vnd.github+json").await?;
        self.descriptor(release)
    }

    fn describe(&self) -> String {
        format!("github.com/{}/{}", self.owner, self.repo)
    }
}

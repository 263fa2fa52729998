//! Release metadata served as a JSON document.
//!
//! ```json
//! {
//!   "latest_version": "1.0.1",
//!   "latest_version_uri": "https://cdn.example.com/app1.0.1.zip",
//!   "latest_version_patch_uri": "https://cdn.example.com/app1.0.1patch.zip",
//!   "latest_version_description_uri": "https://example.com/notes/1.0.1"
//! }
//! ```
//!
//! The first three keys are required; the notes link is optional.

use super::{ReleaseDescriptor, ReleaseSource, VersionTag, fetch_json, require_non_empty};
use crate::core::Result;
use serde::Deserialize;

/// Wire shape of the endpoint response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseDocument {
    pub latest_version: String,
    pub latest_version_uri: String,
    pub latest_version_patch_uri: String,
    #[serde(default)]
    pub latest_version_description_uri: Option<String>,
}

impl TryFrom<ReleaseDocument> for ReleaseDescriptor {
    type Error = crate::core::RelaunchError;

    fn try_from(doc: ReleaseDocument) -> Result<Self> {
        require_non_empty("latest_version", &doc.latest_version)?;
        require_non_empty("latest_version_uri", &doc.latest_version_uri)?;
        require_non_empty("latest_version_patch_uri", &doc.latest_version_patch_uri)?;
        Ok(Self {
            latest_version_tag: VersionTag::new(doc.latest_version),
            clean_artifact_uri: doc.latest_version_uri,
            patch_artifact_uri: doc.latest_version_patch_uri,
            notes_uri: doc.latest_version_description_uri.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Reads [`ReleaseDocument`]s from a fixed URI.
#[derive(Debug, Clone)]
pub struct EndpointSource {
    client: reqwest::Client,
    uri: String,
}

impl EndpointSource {
    pub fn new(client: reqwest::Client, uri: impl Into<String>) -> Self {
        Self {
            client,
            uri: uri.into(),
        }
    }
}

impl ReleaseSource for EndpointSource {
    async fn latest(&self) -> Result<ReleaseDescriptor> {
        let doc: ReleaseDocument = fetch_json(&self.client, &self.uri, "application/json").await?;
        doc.try_into()
    }

    fn describe(&self) -> String {
        self.uri.clone()
    }
}

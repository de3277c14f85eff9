//! Remote release feed for the umu runtime package.
//!
//! The feed is a read-only, third-party JSON document; its schema is owned
//! by GitHub, not by this crate. We only consume the asset list.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::Error;

const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/Open-Wine-Components/umu-launcher/releases/latest";

pub(crate) const USER_AGENT: &str = concat!("winecap/", env!("CARGO_PKG_VERSION"));

/// A named, downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub assets: Vec<ReleaseAsset>,
}

/// Seam for the release feed so provisioning can be exercised without the
/// network.
pub trait ReleaseFeed {
    fn latest_release(&self) -> Result<Release>;
}

pub struct GithubFeed {
    url: String,
}

impl GithubFeed {
    pub fn new() -> Self {
        Self {
            url: LATEST_RELEASE_URL.to_string(),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for GithubFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseFeed for GithubFeed {
    fn latest_release(&self) -> Result<Release> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build http client")?;

        // Non-2xx statuses are network failures too; keep them in the same
        // taxonomy class as connection errors.
        let resp = client
            .get(&self.url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|source| Error::Network {
                context: "release feed query".to_string(),
                source,
            })?;

        resp.json().context("failed to parse release feed JSON")
    }
}

//! Cached blocking downloads into the host-level download cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::error::Error;
use crate::lock::LockGuard;

/// Override for the cache directory (tests).
pub const CACHE_DIR_ENV: &str = "WINECAP_CACHE_DIR";

/// Download cache keyed by filename. A present file is trusted as-is -- no
/// checksum -- unless the caller forces a re-fetch.
pub struct DownloadCache {
    dir: PathBuf,
}

impl DownloadCache {
    /// Host-level cache under `~/.winecap/cache/downloads`.
    pub fn host_default() -> Result<Self> {
        let dir = match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("home directory not available")?
                .join(".winecap")
                .join("cache")
                .join("downloads"),
        };
        Ok(Self::at(dir))
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download `url` to `<cache>/<filename>` unless a cached copy exists.
    ///
    /// `force` discards any cached copy first. Concurrent provisioning runs
    /// share this directory, so the cache lock is held for the whole fetch.
    /// Writes go to a `.part` sibling and are renamed into place so a
    /// half-written file is never mistaken for a cached download.
    pub fn fetch(&self, url: &str, filename: &str, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create cache directory '{}'", self.dir.display())
        })?;
        let _lock = LockGuard::acquire(&self.dir.join(".lock"))?;

        let dest = self.dir.join(filename);
        if dest.exists() {
            if !force {
                info!(file = %dest.display(), "using cached download");
                return Ok(dest);
            }
            fs::remove_file(&dest)
                .with_context(|| format!("failed to discard cached file '{}'", dest.display()))?;
        }

        info!(%url, file = filename, "downloading");
        let client = reqwest::blocking::Client::builder()
            .user_agent(crate::feed::USER_AGENT)
            .build()
            .context("failed to build http client")?;

        // Error statuses classify the same as connection failures.
        let mut resp = client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|source| Error::Network {
                context: format!("download of {filename}"),
                source,
            })?;

        let part = self.dir.join(format!("{filename}.part"));
        let mut out = fs::File::create(&part)
            .with_context(|| format!("failed to create '{}'", part.display()))?;
        io::copy(&mut resp, &mut out)
            .with_context(|| format!("failed while writing '{}'", part.display()))?;
        fs::rename(&part, &dest)
            .with_context(|| format!("failed to move download into place at '{}'", dest.display()))?;

        Ok(dest)
    }
}

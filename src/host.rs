//! Host identification: os-release parsing and distro-target derivation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::Error;

/// Distro families winecap knows how to provision (apt-based).
pub const SUPPORTED_FAMILIES: [&str; 2] = ["ubuntu", "debian"];

/// Package architectures the runtime release feed publishes builds for.
pub const SUPPORTED_ARCHES: [&str; 2] = ["amd64", "arm64"];

/// Override for the os-release path (tests).
pub const OS_RELEASE_ENV: &str = "WINECAP_OS_RELEASE";

/// The fields of `/etc/os-release` we consume.
#[derive(Debug, Clone)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
}

impl OsRelease {
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(OS_RELEASE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/os-release"));
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read os-release at '{}'", path.display()))?;
        Self::parse(&text)
    }

    /// Minimal os-release parser: `KEY=value` lines, optional double quotes.
    pub fn parse(text: &str) -> Result<Self> {
        let mut id = None;
        let mut version_id = None;

        for line in text.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim_matches('"');
            match key {
                "ID" => id = Some(value.to_string()),
                "VERSION_ID" => version_id = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(Self {
            id: id.context("os-release has no ID field")?,
            version_id: version_id.unwrap_or_default(),
        })
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_FAMILIES.contains(&self.id.as_str())
    }
}

/// Selection key for runtime packages: architecture plus distro tag.
/// Derived per provisioning run, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroTarget {
    pub arch: String,
    pub distro: String,
}

impl DistroTarget {
    /// Normalize host identification into a package-selection key.
    ///
    /// An architecture outside the allow-list is fatal and non-retryable:
    /// there is no runtime build to fall back to.
    pub fn derive(os: &OsRelease, arch: &str) -> Result<Self, Error> {
        if !SUPPORTED_ARCHES.contains(&arch) {
            return Err(Error::PlatformUnsupported {
                detail: format!(
                    "no runtime packages exist for architecture '{arch}' (supported: {})",
                    SUPPORTED_ARCHES.join(", ")
                ),
            });
        }
        Ok(Self {
            arch: arch.to_string(),
            distro: format!("{}-{}", os.id, os.version_id),
        })
    }
}

/// Search PATH for an executable, the way a shell would.
pub fn find_in_path(bin: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

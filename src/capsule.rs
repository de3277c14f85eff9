//! Capsule bundles and their co-located home directories.
//!
//! A capsule is identified by its bundle path. Its mutable state lives in a
//! sibling `<bundle-name>.home/` directory: `prefix/` for the Wine sandbox,
//! `cache/` for shader and pipeline-state caches, and `metadata.json`. The
//! home directory is created once, mutated on every run, and never deleted
//! automatically.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const HOME_SUFFIX: &str = ".home";
pub const METADATA_FILE: &str = "metadata.json";
pub const METADATA_TEMPLATE: &str = "metadata.template.json";

/// Initialization is permanent: once a capsule owns a home directory it
/// never goes back to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapsuleState {
    Uninitialized,
    Initialized,
}

/// Open, versioned metadata document.
///
/// Only `dxvk_hud` is consumed today. The schema is intentionally open-ended:
/// unknown keys are preserved through the flatten map and never rejected, so
/// future tools can add fields without breaking older launchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Diagnostic overlay toggle (DXVK HUD). Off unless the document enables it.
    #[serde(default)]
    pub dxvk_hud: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            dxvk_hud: false,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Capsule {
    bundle: PathBuf,
    home: PathBuf,
}

impl Capsule {
    /// Canonicalize the bundle path and derive the home directory from the
    /// bundle file name plus the fixed suffix. Both always end up in the
    /// same parent directory.
    pub fn open(bundle_path: &Path) -> Result<Self> {
        let bundle = bundle_path.canonicalize().with_context(|| {
            format!("failed to canonicalize bundle path '{}'", bundle_path.display())
        })?;
        let name = bundle
            .file_name()
            .and_then(|n| n.to_str())
            .context("bundle path has no usable file name")?;
        let home = bundle.with_file_name(format!("{name}{HOME_SUFFIX}"));
        Ok(Self { bundle, home })
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle
    }

    pub fn home_path(&self) -> &Path {
        &self.home
    }

    pub fn prefix_path(&self) -> PathBuf {
        self.home.join("prefix")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.home.join("cache")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.home.join(METADATA_FILE)
    }

    /// Lock file guarding the prefix against concurrent launches.
    pub fn lock_path(&self) -> PathBuf {
        self.home.join(".prefix.lock")
    }

    /// Directory the wrapped executable runs from: the bundled `game/`
    /// directory, falling back to the bundle root when a bundle ships flat.
    pub fn game_dir(&self) -> PathBuf {
        let game = self.bundle.join("game");
        if game.is_dir() {
            game
        } else if self.bundle.is_dir() {
            self.bundle.clone()
        } else {
            // Packed bundle file; the runtime is handed the directory next
            // to it.
            self.bundle
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.bundle.clone())
        }
    }

    /// The home directory itself can pre-exist an initialization (the launch
    /// lock file lives inside it), so the prefix is the initialization marker.
    pub fn state(&self) -> CapsuleState {
        if self.prefix_path().is_dir() {
            CapsuleState::Initialized
        } else {
            CapsuleState::Uninitialized
        }
    }

    /// One-time home creation: `prefix/`, `cache/`, and the live metadata
    /// document seeded from the bundle's template when one ships.
    ///
    /// Idempotent -- a second call on an initialized capsule mutates nothing.
    /// Each path is created individually rather than gating on the home
    /// directory, which may already exist holding only the lock file.
    pub fn init_home(&self) -> Result<CapsuleState> {
        fs::create_dir_all(self.prefix_path()).with_context(|| {
            format!("failed to create prefix directory in '{}'", self.home.display())
        })?;
        fs::create_dir_all(self.cache_path()).with_context(|| {
            format!("failed to create cache directory in '{}'", self.home.display())
        })?;

        // A missing template is fine: the bundle simply ships no defaults.
        // Never clobber a live metadata document.
        let template = self.bundle.join(METADATA_TEMPLATE);
        if template.is_file() && !self.metadata_path().exists() {
            fs::copy(&template, self.metadata_path()).with_context(|| {
                format!("failed to seed metadata from '{}'", template.display())
            })?;
        }

        Ok(CapsuleState::Initialized)
    }

    /// Load the metadata document, degrading to defaults on any problem.
    /// A broken or absent document must never abort a launch.
    pub fn load_metadata(&self) -> Metadata {
        let path = self.metadata_path();
        let Ok(text) = fs::read_to_string(&path) else {
            return Metadata::default();
        };
        match serde_json::from_str(&text) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(file = %path.display(), %err, "metadata unreadable; using defaults");
                Metadata::default()
            }
        }
    }

    pub fn save_metadata(&self, metadata: &Metadata) -> Result<()> {
        let text = serde_json::to_string_pretty(metadata).context("failed to serialize metadata")?;
        let path = self.metadata_path();
        fs::write(&path, text)
            .with_context(|| format!("failed to write metadata to '{}'", path.display()))?;
        Ok(())
    }

    /// Maintenance: drop the sandbox so the next launch rebuilds it fresh.
    pub fn rebuild_prefix(&self) -> Result<()> {
        let prefix = self.prefix_path();
        if prefix.is_dir() {
            fs::remove_dir_all(&prefix)
                .with_context(|| format!("failed to remove prefix '{}'", prefix.display()))?;
        }
        fs::create_dir_all(&prefix)
            .with_context(|| format!("failed to recreate prefix '{}'", prefix.display()))?;
        Ok(())
    }

    /// Maintenance: empty the shader/pipeline-state cache.
    pub fn clear_cache(&self) -> Result<()> {
        let cache = self.cache_path();
        if cache.is_dir() {
            fs::remove_dir_all(&cache)
                .with_context(|| format!("failed to remove cache '{}'", cache.display()))?;
        }
        fs::create_dir_all(&cache)
            .with_context(|| format!("failed to recreate cache '{}'", cache.display()))?;
        Ok(())
    }
}

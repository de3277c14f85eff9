//! Launch a capsule's wrapped executable inside its umu/Wine sandbox.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};
use tracing::info;

use crate::capsule::{Capsule, Metadata};
use crate::error::Error;
use crate::host;
use crate::lock::LockGuard;

/// Environment override for the runtime binary (tests, power users).
pub const RUNTIME_BIN_ENV: &str = "WINECAP_UMU_BIN";

const RUNTIME_BIN: &str = "umu-run";

/// The sandbox environment contract as an explicit, immutable value.
///
/// Serialized to real environment variables only at the spawn boundary, so
/// everything up to that point stays testable without touching the process
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnv {
    pub wine_prefix: PathBuf,
    pub wine_debug: String,
    pub large_address_aware: bool,
    pub shader_disk_cache: PathBuf,
    pub state_cache: PathBuf,
    pub dxvk_hud: bool,
}

impl LaunchEnv {
    pub fn for_capsule(capsule: &Capsule, metadata: &Metadata) -> Self {
        Self {
            wine_prefix: capsule.prefix_path(),
            // Verbose Wine diagnostics stay off for normal runs.
            wine_debug: "-all".to_string(),
            large_address_aware: true,
            shader_disk_cache: capsule.cache_path(),
            state_cache: capsule.cache_path(),
            dxvk_hud: metadata.dxvk_hud,
        }
    }

    /// The exact variable set handed to the child.
    pub fn vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            (
                "WINEPREFIX".to_string(),
                self.wine_prefix.display().to_string(),
            ),
            ("WINEDEBUG".to_string(), self.wine_debug.clone()),
            (
                "__GL_SHADER_DISK_CACHE_PATH".to_string(),
                self.shader_disk_cache.display().to_string(),
            ),
            (
                "DXVK_STATE_CACHE_PATH".to_string(),
                self.state_cache.display().to_string(),
            ),
        ];
        if self.large_address_aware {
            vars.push(("WINE_LARGE_ADDRESS_AWARE".to_string(), "1".to_string()));
        }
        if self.dxvk_hud {
            vars.push(("DXVK_HUD".to_string(), "fps".to_string()));
        }
        vars
    }
}

/// Locate the execution-sandbox runtime: env override first, then PATH.
pub fn resolve_runtime_bin() -> Result<PathBuf, Error> {
    if let Some(overridden) = std::env::var_os(RUNTIME_BIN_ENV) {
        let path = PathBuf::from(overridden);
        if path.is_file() {
            return Ok(path);
        }
        return Err(Error::RuntimeMissing);
    }
    host::find_in_path(RUNTIME_BIN).ok_or(Error::RuntimeMissing)
}

/// Run the capsule's executable and block until it exits.
///
/// `launch_args` are passed through verbatim -- word-split, no additional
/// quoting. The child's exit code comes back unchanged, never remapped.
pub fn launch(bundle_path: &Path, executable: &str, launch_args: &[String]) -> Result<i32> {
    let capsule = Capsule::open(bundle_path)?;

    // Two simultaneous launches of one capsule would corrupt prefix state;
    // hold the home lock from initialization until the child exits.
    let _lock = LockGuard::acquire(&capsule.lock_path())?;

    capsule.init_home()?;
    let metadata = capsule.load_metadata();

    // Checked before any sandbox mutation beyond the one-time creation above.
    let runtime = resolve_runtime_bin()?;

    let env = LaunchEnv::for_capsule(&capsule, &metadata);
    let mut cmd = Command::new(&runtime);
    cmd.current_dir(capsule.game_dir())
        .arg(executable)
        .args(launch_args);
    for (key, value) in env.vars() {
        cmd.env(key, value);
    }

    info!(runtime = %runtime.display(), exe = executable, "launching capsule");
    let status = cmd
        .status()
        .with_context(|| format!("failed to spawn runtime '{}'", runtime.display()))?;

    Ok(exit_code(status))
}

/// The child's exit code, unmapped. Signal deaths carry no code, so they use
/// the shell convention `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

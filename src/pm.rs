//! Package-manager seam.
//!
//! The orchestrator hands the package manager a list of packages and gets
//! back success or failure; everything else (resolution, transactions) is
//! apt's business. Tests install a recording fake behind the same trait.

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

use crate::error::Error;
use crate::host;

/// Base utilities capsules and the AppImage runtime rely on.
pub const BASE_PACKAGES: &[&str] = &["libfuse2", "curl", "ca-certificates"];

/// 3D-acceleration libraries (Vulkan loader + tools, both architectures).
pub const VULKAN_PACKAGES: &[&str] = &["vulkan-tools", "libvulkan1", "libvulkan1:i386"];

/// GPU driver libraries (Mesa, both architectures).
pub const GPU_PACKAGES: &[&str] = &[
    "mesa-vulkan-drivers",
    "mesa-vulkan-drivers:i386",
    "libgl1-mesa-dri",
    "libgl1-mesa-dri:i386",
];

pub trait PackageManager {
    /// Verify the manager is usable at all: tooling on PATH, install rights
    /// available. Must not mutate anything.
    fn preflight(&mut self) -> Result<()>;

    /// Host package architecture, e.g. `amd64`.
    fn host_architecture(&mut self) -> Result<String>;

    /// Enable the i386 package channel. Idempotent: a no-op when the channel
    /// is already enabled.
    fn enable_i386(&mut self) -> Result<()>;

    fn refresh_index(&mut self) -> Result<()>;

    fn install(&mut self, packages: &[&str], reinstall: bool) -> Result<()>;

    /// Install a downloaded `.deb` from the local filesystem.
    fn install_local(&mut self, deb: &Path, reinstall: bool) -> Result<()>;
}

/// The real thing: blocking `apt-get` / `dpkg` invocations, awaited to
/// completion. No timeouts anywhere -- a hung apt hangs the run.
pub struct Apt;

impl Apt {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let status = Command::new(program)
            .args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .status()
            .with_context(|| format!("failed to run {program}"))?;
        if !status.success() {
            return Err(anyhow!("{program} {} exited with {status}", args.join(" ")));
        }
        Ok(())
    }

    fn stdout(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to run {program}"))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{program} {} exited with {}",
                args.join(" "),
                output.status
            ));
        }
        String::from_utf8(output.stdout)
            .with_context(|| format!("{program} produced non-UTF-8 output"))
    }
}

impl Default for Apt {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageManager for Apt {
    fn preflight(&mut self) -> Result<()> {
        if host::find_in_path("apt-get").is_none() {
            return Err(Error::ToolingMissing {
                tool: "apt-get".to_string(),
            }
            .into());
        }
        let uid = self.stdout("id", &["-u"])?;
        if uid.trim() != "0" {
            return Err(Error::Privilege {
                detail: "package installation needs root; re-run with sudo".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn host_architecture(&mut self) -> Result<String> {
        Ok(self.stdout("dpkg", &["--print-architecture"])?.trim().to_string())
    }

    fn enable_i386(&mut self) -> Result<()> {
        let enabled = self.stdout("dpkg", &["--print-foreign-architectures"])?;
        if enabled.lines().any(|line| line.trim() == "i386") {
            return Ok(());
        }
        self.run("dpkg", &["--add-architecture", "i386"])
    }

    fn refresh_index(&mut self) -> Result<()> {
        self.run("apt-get", &["update"])
    }

    fn install(&mut self, packages: &[&str], reinstall: bool) -> Result<()> {
        let mut args = vec!["install", "-y"];
        if reinstall {
            args.push("--reinstall");
        }
        args.extend_from_slice(packages);
        self.run("apt-get", &args)
    }

    fn install_local(&mut self, deb: &Path, reinstall: bool) -> Result<()> {
        // apt-get only treats the argument as a file path when it contains a
        // slash; fetch always hands us an absolute path.
        let deb = deb
            .to_str()
            .context("downloaded package path is not valid UTF-8")?;
        let mut args = vec!["install", "-y"];
        if reinstall {
            args.push("--reinstall");
        }
        args.push(deb);
        self.run("apt-get", &args)
    }
}

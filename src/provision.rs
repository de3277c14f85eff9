//! Host provisioning: bring a machine from "no runtime support" to "capsules
//! can run", idempotently.
//!
//! Every step is `{kind, action}` data interpreted by [`run`]: the first
//! Required failure aborts the whole run, Optional failures are logged and
//! skipped. There are no retries and no rollback of already-completed steps;
//! the three package groups in particular install independently (documented
//! limitation, not a bug).

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::error::Error;
use crate::feed::ReleaseFeed;
use crate::fetch::DownloadCache;
use crate::host::{DistroTarget, OsRelease, SUPPORTED_FAMILIES};
use crate::pm::{PackageManager, BASE_PACKAGES, GPU_PACKAGES, VULKAN_PACKAGES};
use crate::resolve;

/// Redistributables individual games commonly expect. Prefetched into the
/// cache as a convenience, never a provisioning blocker.
pub const REDISTRIBUTABLES: [(&str, &str); 2] = [
    ("vc_redist.x64.exe", "https://aka.ms/vs/17/release/vc_redist.x64.exe"),
    ("vc_redist.x86.exe", "https://aka.ms/vs/17/release/vc_redist.x86.exe"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Required,
    Optional,
}

/// Everything a step may read or write while the plan runs.
pub struct ProvisionCtx<'a> {
    pub os: OsRelease,
    pub reinstall: bool,
    pub pm: &'a mut dyn PackageManager,
    pub feed: &'a dyn ReleaseFeed,
    pub cache: DownloadCache,
    /// `(filename, url)` pairs for the optional prefetch steps.
    pub redistributables: Vec<(String, String)>,
    /// Derived mid-run by the target-derivation step.
    pub target: Option<DistroTarget>,
}

impl<'a> ProvisionCtx<'a> {
    pub fn new(
        os: OsRelease,
        pm: &'a mut dyn PackageManager,
        feed: &'a dyn ReleaseFeed,
        cache: DownloadCache,
        reinstall: bool,
    ) -> Self {
        Self {
            os,
            reinstall,
            pm,
            feed,
            cache,
            redistributables: REDISTRIBUTABLES
                .iter()
                .map(|(name, url)| (name.to_string(), url.to_string()))
                .collect(),
            target: None,
        }
    }
}

pub struct Step {
    pub name: &'static str,
    pub kind: StepKind,
    pub action: fn(&mut ProvisionCtx<'_>) -> Result<()>,
}

/// The ordered provisioning plan.
pub fn plan() -> Vec<Step> {
    use StepKind::{Optional, Required};
    vec![
        Step {
            name: "platform check",
            kind: Required,
            action: check_platform,
        },
        Step {
            name: "verify package tooling and privileges",
            kind: Required,
            action: preflight,
        },
        Step {
            name: "enable i386 package channel",
            kind: Required,
            action: enable_i386,
        },
        Step {
            name: "refresh package index",
            kind: Required,
            action: refresh_index,
        },
        Step {
            name: "install base utilities",
            kind: Required,
            action: install_base,
        },
        Step {
            name: "install 3D acceleration libraries",
            kind: Required,
            action: install_vulkan,
        },
        Step {
            name: "install GPU driver libraries",
            kind: Required,
            action: install_gpu,
        },
        Step {
            name: "derive distro target",
            kind: Required,
            action: derive_target,
        },
        Step {
            name: "install umu runtime package",
            kind: Required,
            action: install_runtime,
        },
        Step {
            name: "prefetch vc_redist (x64)",
            kind: Optional,
            action: prefetch_redist_x64,
        },
        Step {
            name: "prefetch vc_redist (x86)",
            kind: Optional,
            action: prefetch_redist_x86,
        },
    ]
}

/// One interpreter for the whole plan.
pub fn run(ctx: &mut ProvisionCtx<'_>, steps: Vec<Step>) -> Result<()> {
    for step in steps {
        info!(step = step.name, "provisioning step");
        if let Err(err) = (step.action)(ctx) {
            match step.kind {
                StepKind::Required => {
                    return Err(err.context(format!("required step '{}' failed", step.name)));
                }
                StepKind::Optional => {
                    let reason = format!("{err:#}");
                    warn!(step = step.name, %reason, "optional step failed; continuing");
                }
            }
        }
    }
    Ok(())
}

/// Full provisioning entry point used by `winecap-setup`.
pub fn provision(
    os: OsRelease,
    pm: &mut dyn PackageManager,
    feed: &dyn ReleaseFeed,
    cache: DownloadCache,
    reinstall: bool,
) -> Result<()> {
    let mut ctx = ProvisionCtx::new(os, pm, feed, cache, reinstall);
    run(&mut ctx, plan())
}

fn check_platform(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    if ctx.os.is_supported() {
        return Ok(());
    }
    Err(Error::PlatformUnsupported {
        detail: format!(
            "distro '{}' is not supported (need one of: {})",
            ctx.os.id,
            SUPPORTED_FAMILIES.join(", ")
        ),
    }
    .into())
}

fn preflight(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    ctx.pm.preflight()
}

fn enable_i386(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    ctx.pm.enable_i386()
}

fn refresh_index(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    ctx.pm.refresh_index()
}

fn install_base(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    ctx.pm.install(BASE_PACKAGES, ctx.reinstall)
}

fn install_vulkan(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    ctx.pm.install(VULKAN_PACKAGES, ctx.reinstall)
}

fn install_gpu(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    ctx.pm.install(GPU_PACKAGES, ctx.reinstall)
}

fn derive_target(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    let arch = ctx.pm.host_architecture()?;
    let target = DistroTarget::derive(&ctx.os, &arch)?;
    info!(arch = %target.arch, distro = %target.distro, "derived distro target");
    ctx.target = Some(target);
    Ok(())
}

/// The one package capsules cannot run without: query the feed, resolve the
/// matching asset, download it, install it. Any failure here is fatal.
fn install_runtime(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    let target = ctx
        .target
        .clone()
        .ok_or_else(|| anyhow!("distro target not derived"))?;

    let release = ctx
        .feed
        .latest_release()
        .context("failed to query runtime release feed")?;

    let asset = resolve::resolve(&release.assets, &target.arch, &target.distro).ok_or(
        Error::NoMatchingAsset {
            distro: target.distro.clone(),
            arch: target.arch.clone(),
        },
    )?;
    info!(asset = %asset.name, release = %release.tag_name, "resolved runtime package");

    let deb = ctx.cache.fetch(&asset.url, &asset.name, ctx.reinstall)?;
    ctx.pm.install_local(&deb, ctx.reinstall)
}

fn prefetch_redist_x64(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    prefetch_redist(ctx, 0)
}

fn prefetch_redist_x86(ctx: &mut ProvisionCtx<'_>) -> Result<()> {
    prefetch_redist(ctx, 1)
}

fn prefetch_redist(ctx: &mut ProvisionCtx<'_>, index: usize) -> Result<()> {
    let (name, url) = ctx
        .redistributables
        .get(index)
        .cloned()
        .ok_or_else(|| anyhow!("no redistributable configured at index {index}"))?;
    ctx.cache.fetch(&url, &name, ctx.reinstall)?;
    Ok(())
}

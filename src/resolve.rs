//! Two-tier, order-preserving selection of a runtime package asset.
//!
//! Selection is deterministic: the result depends only on input order and
//! tier precedence. No scoring, no fuzzy matching. Adding a new package tier
//! is a data change in [`tiers`], not new control flow.

use crate::feed::ReleaseAsset;

/// Preferred-package marker: only debs for this package are eligible.
const PACKAGE_MARKER: &str = "python3-umu-launcher";

/// Package-archive suffix the feed uses for installable assets.
const PACKAGE_SUFFIX: &str = ".deb";

/// One selection tier: an asset qualifies when its name carries the marker
/// and ends with `_{arch_label}_{distro}.deb`.
#[derive(Debug, Clone)]
struct Tier {
    arch_label: String,
}

impl Tier {
    fn matches(&self, name: &str, distro: &str) -> bool {
        name.contains(PACKAGE_MARKER)
            && name.ends_with(&format!("_{}_{}{}", self.arch_label, distro, PACKAGE_SUFFIX))
    }
}

/// Tier precedence: exact architecture first, then the architecture-
/// independent `all` build.
fn tiers(arch: &str) -> Vec<Tier> {
    vec![
        Tier {
            arch_label: arch.to_string(),
        },
        Tier {
            arch_label: "all".to_string(),
        },
    ]
}

/// Pick the runtime package for `(arch, distro)` from an ordered asset list.
///
/// A tier is exhausted over the whole list before the next tier is consulted;
/// within a tier the first qualifying asset in input order wins. `None` means
/// the caller must surface a resolution failure naming the attempted pair.
pub fn resolve<'a>(assets: &'a [ReleaseAsset], arch: &str, distro: &str) -> Option<&'a ReleaseAsset> {
    for tier in tiers(arch) {
        if let Some(asset) = assets.iter().find(|a| tier.matches(&a.name, distro)) {
            return Some(asset);
        }
    }
    None
}

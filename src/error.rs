use thiserror::Error;

/// Failure classes that must stay distinguishable at the process boundary.
///
/// Everything here is fatal when it blocks a required provisioning step or a
/// launch; `Network` alone is recoverable when an optional step hits it.
#[derive(Debug, Error)]
pub enum Error {
    /// Host distro or architecture is outside the allow-list. Non-retryable;
    /// raised before any mutation.
    #[error("unsupported platform: {detail}")]
    PlatformUnsupported { detail: String },

    /// Elevated install rights could not be obtained.
    #[error("insufficient privileges: {detail}")]
    Privilege { detail: String },

    /// A required external tool is not on PATH.
    #[error("required tool not found: {tool}")]
    ToolingMissing { tool: String },

    #[error("network operation failed: {context}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The release feed had no asset for the attempted selection key. The
    /// pair is part of the message for diagnosability.
    #[error("no runtime package matches distro '{distro}' on architecture '{arch}'")]
    NoMatchingAsset { distro: String, arch: String },

    /// No execution-sandbox runtime is resolvable at launch time. Detected
    /// before any sandbox mutation beyond one-time home creation.
    #[error("no compatible runtime found: umu-run is not on PATH (set WINECAP_UMU_BIN to override)")]
    RuntimeMissing,
}

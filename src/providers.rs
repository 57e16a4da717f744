//! Read-only collaborators queried while building a report.
//!
//! The report itself is assembled by [`ReportBuilder`](crate::ReportBuilder);
//! everything it knows about the host comes from the providers in this module
//! (plus the [`InventoryProvider`](crate::InventoryProvider)):
//!
//! - [`VersionProvider`] is queried on every report, never cached.
//! - [`ExecutionContext`] tells which environment the process runs as and
//!   which script is currently active.
//!
//! Provider failures are not handled. They surface to the caller as a
//! [`ProviderError`] naming the provider that failed.

use alloc::{
    borrow::Cow,
    boxed::Box,
    string::{String, ToString},
};
use core::{error::Error, fmt};

/// Boxed error returned by providers.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Which provider failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    /// The [`InventoryProvider`](crate::InventoryProvider).
    Inventory,
    /// The [`VersionProvider`].
    Version,
    /// The [`ExecutionContext`].
    ExecutionContext,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inventory => "inventory",
            Self::Version => "version",
            Self::ExecutionContext => "execution context",
        })
    }
}

/// A provider failed while a report was being built.
///
/// This is the only error [`ReportBuilder::emit`](crate::ReportBuilder::emit)
/// returns. It is treated as a configuration problem of the host: nothing is
/// retried and the report is not written.
#[derive(Debug)]
pub struct ProviderError {
    provider: Provider,
    source: BoxError,
}

impl ProviderError {
    /// Wraps the failure of `provider`.
    pub fn new(provider: Provider, source: impl Into<BoxError>) -> Self {
        Self {
            provider,
            source: source.into(),
        }
    }

    /// The provider that failed.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Consumes the error, returning the provider's own error.
    #[must_use]
    pub fn into_source(self) -> BoxError {
        self.source
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the {} provider failed", self.provider)
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

/// A named component version, e.g. the host loader or the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedVersion {
    /// Label used in the version block, e.g. `NeoForge`.
    pub name: Cow<'static, str>,
    /// Version string.
    pub version: String,
}

impl NamedVersion {
    /// Creates a new named version.
    pub fn new(name: impl Into<Cow<'static, str>>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// The language runtime the process runs on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageRuntime {
    /// Label used in the version block, e.g. `Rust`.
    pub name: Cow<'static, str>,
    /// Runtime version.
    pub version: String,
    /// Runtime vendor.
    pub vendor: String,
    /// Virtual machine or compilation target.
    pub vm: String,
}

/// The operating system the process runs on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OsInfo {
    /// Operating system name.
    pub name: String,
    /// CPU architecture.
    pub arch: String,
    /// Operating system version.
    pub version: String,
}

#[cfg(feature = "std")]
impl LanguageRuntime {
    /// The Rust toolchain this crate was compiled with.
    #[must_use]
    pub fn current() -> Self {
        Self {
            name: Cow::Borrowed("Rust"),
            version: include!(concat!(env!("OUT_DIR"), "/rustc_version")).to_string(),
            vendor: "rust-lang".to_string(),
            vm: include!(concat!(env!("OUT_DIR"), "/rustc_target")).to_string(),
        }
    }
}

#[cfg(feature = "std")]
impl OsInfo {
    /// The operating system of the running process.
    ///
    /// The version is read from the kernel on Linux and is `unknown`
    /// elsewhere.
    #[must_use]
    pub fn current() -> Self {
        let version = if cfg!(target_os = "linux") {
            std::fs::read_to_string("/proc/sys/kernel/osrelease")
                .map(|release| release.trim().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        } else {
            "unknown".to_string()
        };
        Self {
            name: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            version,
        }
    }
}

/// Version metadata printed in the version block of every report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionInfo {
    /// Version of the core runtime.
    pub runtime: String,
    /// The host loader, e.g. `NeoForge 21.1.72`.
    pub host: NamedVersion,
    /// The platform, e.g. `Minecraft 1.21.1`.
    pub platform: NamedVersion,
    /// The language runtime.
    pub language: LanguageRuntime,
    /// The operating system.
    pub os: OsInfo,
}

impl VersionInfo {
    /// Version info with only the runtime version known.
    ///
    /// Every other field reads `unknown`. Useful for tests and for hosts that
    /// cannot resolve their own metadata.
    pub fn unknown(runtime: impl Into<String>) -> Self {
        let unknown = || "unknown".to_string();
        Self {
            runtime: runtime.into(),
            host: NamedVersion::new("Host", unknown()),
            platform: NamedVersion::new("Platform", unknown()),
            language: LanguageRuntime {
                name: Cow::Borrowed("Language"),
                version: unknown(),
                vendor: unknown(),
                vm: unknown(),
            },
            os: OsInfo {
                name: unknown(),
                arch: unknown(),
                version: unknown(),
            },
        }
    }
}

/// Supplies [`VersionInfo`], queried fresh for every report.
///
/// Implemented for closures, and for a fixed [`VersionInfo`] value:
///
/// ```rust
/// use crashprint::{BoxError, VersionInfo, VersionProvider};
///
/// let provider = || -> Result<VersionInfo, BoxError> { Ok(VersionInfo::unknown("2.1.0")) };
/// assert_eq!(provider.version_info().unwrap().runtime, "2.1.0");
///
/// let fixed = VersionInfo::unknown("2.1.0");
/// assert_eq!(fixed.version_info().unwrap().runtime, "2.1.0");
/// ```
pub trait VersionProvider: 'static + Send + Sync {
    /// Returns the current version metadata.
    fn version_info(&self) -> Result<VersionInfo, BoxError>;
}

impl<F> VersionProvider for F
where
    F: Fn() -> Result<VersionInfo, BoxError> + 'static + Send + Sync,
{
    fn version_info(&self) -> Result<VersionInfo, BoxError> {
        self()
    }
}

impl VersionProvider for VersionInfo {
    fn version_info(&self) -> Result<VersionInfo, BoxError> {
        Ok(self.clone())
    }
}

/// Describes the surrounding execution context of a report.
pub trait ExecutionContext: 'static + Send + Sync {
    /// Which side or distribution the process runs as, e.g. `DEDICATED_SERVER`.
    fn environment(&self) -> Result<Cow<'_, str>, BoxError>;

    /// Name of the currently active script or file, if any.
    fn current_script(&self) -> Result<Option<String>, BoxError>;
}

/// An [`ExecutionContext`] with a fixed environment and no active script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticContext {
    /// Reported environment classification.
    pub environment: Cow<'static, str>,
}

impl StaticContext {
    /// Context used when the host did not provide one.
    pub const UNKNOWN: Self = Self {
        environment: Cow::Borrowed("unknown"),
    };
}

impl ExecutionContext for StaticContext {
    fn environment(&self) -> Result<Cow<'_, str>, BoxError> {
        Ok(Cow::Borrowed(self.environment.as_ref()))
    }

    fn current_script(&self) -> Result<Option<String>, BoxError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn test_provider_error_display_and_source() {
        let err = ProviderError::new(Provider::Version, "metadata file missing");
        assert_eq!(format!("{err}"), "the version provider failed");
        assert_eq!(err.provider(), Provider::Version);
        let source = err.source().map(|source| format!("{source}"));
        assert_eq!(source.as_deref(), Some("metadata file missing"));
    }

    #[test]
    fn test_static_context() {
        let context = StaticContext::UNKNOWN;
        assert_eq!(context.environment().unwrap(), "unknown");
        assert_eq!(context.current_script().unwrap(), None);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_current_platform() {
        let language = LanguageRuntime::current();
        assert_eq!(language.name, "Rust");
        assert_eq!(language.vendor, "rust-lang");
        // `1.89.0` or `1.91.0-nightly`
        let mut parts = language.version.splitn(3, '.');
        for _ in 0..3 {
            let part = parts.next().unwrap();
            assert!(part.starts_with(|c: char| c.is_ascii_digit()), "{}", language.version);
        }
        // Target triple, e.g. `x86_64-unknown-linux-gnu`
        assert!(language.vm.contains('-'), "{}", language.vm);

        let os = OsInfo::current();
        assert_eq!(os.name, std::env::consts::OS);
        assert_eq!(os.arch, std::env::consts::ARCH);
        assert!(!os.version.is_empty());
    }

    #[test]
    fn test_provider_error_send_sync() {
        static_assertions::assert_impl_all!(ProviderError: Send, Sync, Error);
    }
}

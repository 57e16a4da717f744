//! Static configuration for report composition.
//!
//! Most users never touch this module: [`ReportConfig::DEFAULT`] describes
//! the Scroll runtime and the `#!#! ` line prefix. Hosts embedding a
//! different core runtime swap in their own [`CoreRuntime`]:
//!
//! ```rust
//! use crashprint::{CoreRuntime, ReportConfig};
//!
//! let config = ReportConfig {
//!     core: CoreRuntime {
//!         id: "quill",
//!         display_name: "Quill",
//!         default_report_url: "https://example.org/quill/issues",
//!     },
//!     ..ReportConfig::DEFAULT
//! };
//! assert_eq!(config.line_prefix, "#!#! ");
//! ```

/// Identity of the core runtime hosting all contributors.
///
/// Guidance text is only printed when the failing contributor *is* the core
/// runtime, and the core runtime's own component entry is left out of the
/// inventory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CoreRuntime {
    /// Identifier the core runtime reports under, matched exactly against the
    /// contributor name and case-insensitively against component ids.
    pub id: &'static str,
    /// Human-readable name used in guidance text and the version block.
    pub display_name: &'static str,
    /// Issue tracker used when a contributor has no report URL of its own.
    pub default_report_url: &'static str,
}

impl CoreRuntime {
    /// The Scroll scripting runtime.
    pub const SCROLL: Self = Self {
        id: "scroll",
        display_name: "Scroll",
        default_report_url: "https://github.com/ScrollLang/Scroll/issues",
    };
}

/// Configuration shared by every report built from one
/// [`Environment`](crate::Environment).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    /// Prefix written in front of every line handed to the sink, so the
    /// report stands out from ordinary log output.
    pub line_prefix: &'static str,
    /// The core runtime.
    pub core: CoreRuntime,
    /// Substring marking an unstable version string.
    pub nightly_marker: &'static str,
    /// First line of the inventory section.
    pub inventory_header: &'static str,
}

impl ReportConfig {
    /// Default configuration for the Scroll runtime.
    pub const DEFAULT: Self = Self {
        line_prefix: "#!#! ",
        core: CoreRuntime::SCROLL,
        nightly_marker: "nightly",
        inventory_header: "Current Mods:",
    };

    /// Returns `url` unless it is absent or empty, in which case the core
    /// runtime's default issue tracker is used.
    pub fn report_url_or_default<'a>(&self, url: Option<&'a str>) -> &'a str {
        match url {
            Some(url) if !url.is_empty() => url,
            _ => self.core.default_report_url,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

//! Release channel classification of version strings.

use crate::config::ReportConfig;

/// Which release channel a version string belongs to.
///
/// Only used to choose guidance text. It is derived from the version string
/// on every report and never stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VersionChannel {
    /// An unstable build, e.g. `2.1.0-nightly`.
    Nightly,
    /// Anything else.
    Stable,
}

impl VersionChannel {
    /// Classifies `version` using the configured nightly marker.
    ///
    /// ```rust
    /// use crashprint::{ReportConfig, VersionChannel};
    ///
    /// let config = ReportConfig::DEFAULT;
    /// assert_eq!(VersionChannel::classify("2.1.0-nightly", &config), VersionChannel::Nightly);
    /// assert_eq!(VersionChannel::classify("2.1.0", &config), VersionChannel::Stable);
    /// ```
    #[must_use]
    pub fn classify(version: &str, config: &ReportConfig) -> Self {
        if !config.nightly_marker.is_empty() && version.contains(config.nightly_marker) {
            Self::Nightly
        } else {
            Self::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_anywhere_in_version() {
        let config = ReportConfig::DEFAULT;
        assert_eq!(
            VersionChannel::classify("nightly-20240101", &config),
            VersionChannel::Nightly
        );
        assert_eq!(
            VersionChannel::classify("2.0.0+nightly.7", &config),
            VersionChannel::Nightly
        );
        // Exact substring match, same as the marker is configured.
        assert_eq!(
            VersionChannel::classify("2.0.0-NIGHTLY", &config),
            VersionChannel::Stable
        );
        assert_eq!(
            VersionChannel::classify("2.0.0-beta", &config),
            VersionChannel::Stable
        );
    }

    #[test]
    fn test_empty_marker_is_never_nightly() {
        let config = ReportConfig {
            nightly_marker: "",
            ..ReportConfig::DEFAULT
        };
        assert_eq!(
            VersionChannel::classify("2.1.0-nightly", &config),
            VersionChannel::Stable
        );
    }
}

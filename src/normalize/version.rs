// src/normalize/version.rs

//! Per-family version splitting
//!
//! Each family encodes packaging-only information differently:
//!
//! | scheme            | example raw        | version     |
//! |-------------------|--------------------|-------------|
//! | `PortsSuffix`     | `1.4.0_10,3`       | `1.4.0`     |
//! | `RevisionSuffix`  | `0.9.5-r1`         | `0.9.5`     |
//! | `EpochRelease`    | `1:1.2.8-7`        | `1.2.8`     |
//! | `Debian`          | `1:2.3+dfsg1-4`    | `2.3`       |
//! | `SeparateRevision`| `1.6.6` + rev `1`  | `1.6.6`     |
//!
//! `origversion` is only reported when it differs from `version`.

use regex::Regex;
use std::sync::LazyLock;

static GENTOO_REVISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-r[0-9]+$").expect("valid revision regex"));

static DEBIAN_REPACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[+~.](dfsg|ds|repack|debian)[0-9.]*$").expect("valid repack regex")
});

/// How a family separates upstream version from packaging data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionScheme {
    /// Raw version is the upstream version
    #[default]
    Verbatim,
    /// FreeBSD ports: `<version>_<portrevision>,<portepoch>`
    PortsSuffix,
    /// Gentoo/GoboLinux: `<version>-r<N>`
    RevisionSuffix,
    /// pacman: `<epoch>:<version>-<pkgrel>`
    EpochRelease,
    /// dpkg: `<epoch>:<upstream>-<revision>` plus repack markers
    Debian,
    /// Revision declared in its own field, joined with `separator`
    SeparateRevision { separator: &'static str },
}

impl VersionScheme {
    /// Split a raw version into `(version, origversion)`
    pub fn split(&self, raw: &str) -> (String, Option<String>) {
        let version = match self {
            VersionScheme::Verbatim | VersionScheme::SeparateRevision { .. } => raw.to_string(),
            VersionScheme::PortsSuffix => {
                let version = raw.rsplit_once(',').map_or(raw, |(head, _)| head);
                version
                    .rsplit_once('_')
                    .map_or(version, |(head, _)| head)
                    .to_string()
            }
            VersionScheme::RevisionSuffix => strip_gentoo_revision(raw).to_string(),
            VersionScheme::EpochRelease => {
                let version = strip_epoch(raw);
                version
                    .rsplit_once('-')
                    .map_or(version, |(head, _)| head)
                    .to_string()
            }
            VersionScheme::Debian => {
                let version = strip_epoch(raw);
                let version = version.rsplit_once('-').map_or(version, |(head, _)| head);
                DEBIAN_REPACK.replace(version, "").into_owned()
            }
        };

        if version.is_empty() {
            // stripping removed everything; keep the raw form instead
            return (raw.to_string(), None);
        }

        let origversion = (version != raw).then(|| raw.to_string());
        (version, origversion)
    }

    /// Combine a version with a separately declared revision
    ///
    /// Returns `(version, origversion)`; families without a separate
    /// revision field fall back to [`VersionScheme::split`].
    pub fn compose(&self, raw: &str, revision: Option<&str>) -> (String, Option<String>) {
        match (self, revision.map(str::trim)) {
            (VersionScheme::SeparateRevision { separator }, Some(revision))
                if !revision.is_empty() =>
            {
                (raw.to_string(), Some(format!("{}{}{}", raw, separator, revision)))
            }
            _ => self.split(raw),
        }
    }
}

fn strip_epoch(raw: &str) -> &str {
    match raw.split_once(':') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.chars().all(|c| c.is_ascii_digit()) => {
            rest
        }
        _ => raw,
    }
}

fn strip_gentoo_revision(raw: &str) -> &str {
    GENTOO_REVISION
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map_or(raw, |version| version.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(scheme: VersionScheme, raw: &str) -> (String, Option<String>) {
        scheme.split(raw)
    }

    #[test]
    fn test_ports_suffix() {
        assert_eq!(
            split(VersionScheme::PortsSuffix, "1.4.0_10,3"),
            ("1.4.0".to_string(), Some("1.4.0_10,3".to_string()))
        );
        assert_eq!(split(VersionScheme::PortsSuffix, "2.1,1").0, "2.1");
        assert_eq!(split(VersionScheme::PortsSuffix, "3.0"), ("3.0".to_string(), None));
    }

    #[test]
    fn test_revision_suffix() {
        assert_eq!(
            split(VersionScheme::RevisionSuffix, "0.9.5-r1"),
            ("0.9.5".to_string(), Some("0.9.5-r1".to_string()))
        );
        assert_eq!(
            split(VersionScheme::RevisionSuffix, "0.60.7_rc1"),
            ("0.60.7_rc1".to_string(), None)
        );
        assert_eq!(split(VersionScheme::RevisionSuffix, "1.0-rc2").0, "1.0-rc2");
    }

    #[test]
    fn test_epoch_release() {
        assert_eq!(
            split(VersionScheme::EpochRelease, "1:1.2.8-7"),
            ("1.2.8".to_string(), Some("1:1.2.8-7".to_string()))
        );
        assert_eq!(split(VersionScheme::EpochRelease, "5.2.037-1").0, "5.2.037");
    }

    #[test]
    fn test_debian() {
        assert_eq!(
            split(VersionScheme::Debian, "0.7.4-18"),
            ("0.7.4".to_string(), Some("0.7.4-18".to_string()))
        );
        assert_eq!(split(VersionScheme::Debian, "1:1.2.8.dfsg-4").0, "1.2.8");
        assert_eq!(split(VersionScheme::Debian, "2.3+repack1-1").0, "2.3");
        assert_eq!(split(VersionScheme::Debian, "1.0"), ("1.0".to_string(), None));
    }

    #[test]
    fn test_separate_revision() {
        let scheme = VersionScheme::SeparateRevision { separator: "nb" };

        assert_eq!(
            scheme.compose("1.6.6", Some("1")),
            ("1.6.6".to_string(), Some("1.6.6nb1".to_string()))
        );
        assert_eq!(scheme.compose("1.6.6", None), ("1.6.6".to_string(), None));
        assert_eq!(scheme.compose("1.6.6", Some(" ")), ("1.6.6".to_string(), None));
    }

    #[test]
    fn test_never_strips_to_empty() {
        assert_eq!(split(VersionScheme::EpochRelease, "-1"), ("-1".to_string(), None));
    }
}

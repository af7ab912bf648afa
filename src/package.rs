// src/package.rs

//! Unified package record
//!
//! Every family parser's output ends up as a [`Package`]. The record is
//! built once by the normalizer and never mutated afterwards.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ecosystem grammar a repository follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Family {
    /// FreeBSD ports `INDEX`
    Freebsd,
    /// Gentoo ebuild tree with md5-cache
    Gentoo,
    /// Arch Linux repository database
    Arch,
    /// CPAN `02packages.details.txt`
    Cpan,
    /// Debian/Ubuntu `Sources`
    Debuntu,
    /// GoboLinux recipe tree
    Gobolinux,
    /// SlackBuilds.org tree
    Slackbuilds,
    /// pkgsrc Makefile tree
    Pkgsrc,
}

impl Family {
    /// Every known family
    pub const ALL: [Family; 8] = [
        Family::Freebsd,
        Family::Gentoo,
        Family::Arch,
        Family::Cpan,
        Family::Debuntu,
        Family::Gobolinux,
        Family::Slackbuilds,
        Family::Pkgsrc,
    ];

    /// Identifier used in definitions and output
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Freebsd => "freebsd",
            Family::Gentoo => "gentoo",
            Family::Arch => "arch",
            Family::Cpan => "cpan",
            Family::Debuntu => "debuntu",
            Family::Gobolinux => "gobolinux",
            Family::Slackbuilds => "slackbuilds",
            Family::Pkgsrc => "pkgsrc",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Family {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| Error::UnknownFamily(s.to_string()))
    }
}

impl TryFrom<String> for Family {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Family> for String {
    fn from(family: Family) -> Self {
        family.as_str().to_string()
    }
}

/// Normalized package record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Repository instance the record came from
    pub repo: String,
    /// Grammar that produced the record
    pub family: Family,
    /// Component/section within the repository
    pub subrepo: Option<String>,

    pub name: String,
    /// Cross-ecosystem matching name, left to the name mapper hook
    pub effname: Option<String>,

    /// Upstream version with packaging revision/epoch stripped
    pub version: String,
    /// Raw version as declared, when it differs from `version`
    pub origversion: Option<String>,
    /// Reserved for downstream normalization
    pub effversion: Option<String>,
    /// Reserved for cross-repository comparison; never set here
    pub versionclass: Option<String>,

    pub maintainers: Vec<String>,
    pub category: Option<String>,
    pub comment: Option<String>,
    pub homepage: Option<String>,
    pub licenses: Vec<String>,
    pub downloads: Vec<String>,

    /// Parsed, but should be excluded downstream
    pub ignore: bool,
    /// Indirect/derived entry kept out of primary comparisons
    pub shadow: bool,
    /// Version should not take part in comparison
    pub ignoreversion: bool,

    /// Ecosystem-specific fields with no place in the unified schema
    pub extrafields: BTreeMap<String, String>,
}

impl Package {
    /// Create a record with every optional field at its default
    ///
    /// This is the single default table for the unified schema: options
    /// unset, lists and maps empty, flags false.
    pub fn new(repo: String, family: Family, name: String, version: String) -> Self {
        Self {
            repo,
            family,
            subrepo: None,
            name,
            effname: None,
            version,
            origversion: None,
            effversion: None,
            versionclass: None,
            maintainers: Vec::new(),
            category: None,
            comment: None,
            homepage: None,
            licenses: Vec::new(),
            downloads: Vec::new(),
            ignore: false,
            shadow: false,
            ignoreversion: false,
            extrafields: BTreeMap::new(),
        }
    }

    /// `name-version` label used in logs
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_round_trip_names() {
        for family in Family::ALL {
            assert_eq!(family.as_str().parse::<Family>().unwrap(), family);
        }
        assert!(matches!(
            "portage".parse::<Family>(),
            Err(Error::UnknownFamily(name)) if name == "portage"
        ));
    }

    #[test]
    fn test_package_defaults() {
        let pkg = Package::new(
            "freebsd".to_string(),
            Family::Freebsd,
            "vorbis-tools".to_string(),
            "1.4.0".to_string(),
        );

        assert_eq!(pkg.subrepo, None);
        assert_eq!(pkg.origversion, None);
        assert!(pkg.maintainers.is_empty());
        assert!(pkg.extrafields.is_empty());
        assert!(!pkg.ignore && !pkg.shadow && !pkg.ignoreversion);
        assert_eq!(pkg.label(), "vorbis-tools-1.4.0");
    }

    #[test]
    fn test_family_serializes_as_identifier() {
        let pkg = Package::new("cpan".into(), Family::Cpan, "Acme-Brainfuck".into(), "1.1.1".into());
        let json = serde_json::to_value(&pkg).unwrap();

        assert_eq!(json["family"], "cpan");
        assert_eq!(json["versionclass"], serde_json::Value::Null);
    }
}

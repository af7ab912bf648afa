// src/repository/parsers/debian.rs

//! Debian/Ubuntu `Sources` parser
//!
//! Parses Debian-style Sources files which use RFC 822-like format
//! (similar to email headers with key: value pairs). Each paragraph
//! describes one source package and is parsed as its own unit, so one
//! broken paragraph only loses that package.

use super::{FamilyParser, PackageUnit, SourceContext, read_source_text};
use crate::error::{Error, Result};
use crate::extract::stanza::split_paragraphs;
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use serde::Deserialize;
use tracing::debug;

/// Debian source entry structure for rfc822-like parsing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DebianSourceEntry {
    package: String,
    version: String,
    #[serde(default)]
    maintainer: Option<String>,
    #[serde(default)]
    uploaders: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    section: Option<String>,
}

/// Debian/Ubuntu Sources parser
pub struct DebianParser;

impl FamilyParser for DebianParser {
    fn family(&self) -> Family {
        Family::Debuntu
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::Debian
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let text = read_source_text(&ctx.path)?;
        let units: Vec<PackageUnit> = split_paragraphs(&text)
            .into_iter()
            .map(|paragraph| {
                PackageUnit::text(format!("paragraph at line {}", paragraph.line), paragraph.text)
            })
            .collect();

        debug!("Found {} source paragraphs in {}", units.len(), ctx.path.display());
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        _ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let entries: Vec<DebianSourceEntry> = rfc822_like::from_str(&unit.read_text()?)
            .map_err(|e| Error::ParseError(format!("Failed to parse source paragraph: {}", e)))?;
        let [entry] = <[DebianSourceEntry; 1]>::try_from(entries).map_err(|entries| {
            Error::ParseError(format!("expected one paragraph, found {}", entries.len()))
        })?;

        let mut raw = RawPackage::new();
        raw.set(keys::NAME, entry.package)
            .set(keys::VERSION, entry.version)
            .set_opt(keys::HOMEPAGE, entry.homepage)
            .extend(keys::MAINTAINERS, entry.maintainer.into_iter().chain(entry.uploaders));

        // sections outside main carry their component: "contrib/games"
        if let Some(section) = &entry.section {
            raw.set(keys::CATEGORY, section.rsplit('/').next().unwrap_or(section));
        }

        Ok(Some(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RepositoryDefinition, SourceDefinition};

    const A52DEC: &str = "Package: a52dec
Binary: liba52-0.7.4, liba52-0.7.4-dev, a52dec, a52dec-dev
Version: 0.7.4-18
Maintainer: Debian Multimedia Maintainers <pkg-multimedia-maintainers@lists.alioth.debian.org>
Uploaders: Dmitrij Ledkov <dmitrij.ledkov@ubuntu.com>, Sam Hocevar (Debian packages) <sam+deb@zoy.org>,
 Reinhard Tartler <siretart@tauware.de>
Homepage: http://liba52.sourceforge.net/
Section: contrib/devel
Files:
 44b15ed1c8d0eb18e6b8d5e1cd3fab4c 1823 a52dec_0.7.4-18.dsc
";

    fn parse(text: &str) -> Result<Option<RawPackage>> {
        let definition = RepositoryDefinition::new(
            "debian_unstable",
            Family::Debuntu,
            SourceDefinition::with_subrepo("main/Sources", "main"),
        );
        let ctx = SourceContext::new(&definition, &definition.sources[0], "Sources".into());
        DebianParser.parse_unit(&PackageUnit::text("paragraph at line 1", text.to_string()), &ctx)
    }

    #[test]
    fn test_parse_source_paragraph() {
        let raw = parse(A52DEC).unwrap().unwrap();

        assert_eq!(raw.first(keys::NAME), Some("a52dec"));
        assert_eq!(raw.first(keys::VERSION), Some("0.7.4-18"));
        assert_eq!(raw.first(keys::CATEGORY), Some("devel"));
        assert_eq!(raw.get(keys::MAINTAINERS).unwrap().items().len(), 2);
        assert!(raw.get("Binary").is_none());
    }

    #[test]
    fn test_paragraph_without_version() {
        assert!(matches!(
            parse("Package: broken\nSection: misc\n"),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_units_follow_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Sources");
        std::fs::write(&path, format!("{}\nPackage: zlib\nVersion: 1:1.2.8.dfsg-4\n", A52DEC)).unwrap();

        let definition = RepositoryDefinition::new("debian_unstable", Family::Debuntu, SourceDefinition::new("Sources"));
        let ctx = SourceContext::new(&definition, &definition.sources[0], path);
        let units = DebianParser.units(&ctx).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units[1].id, "paragraph at line 12");
        let raw = DebianParser.parse_unit(&units[1], &ctx).unwrap().unwrap();
        assert_eq!(raw.first(keys::NAME), Some("zlib"));
        assert!(raw.get(keys::MAINTAINERS).is_none());
    }
}

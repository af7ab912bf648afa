// src/repository/parsers/cpan.rs

//! CPAN `02packages.details.txt` parser
//!
//! The index starts with a `Key: value` header, then after a blank line
//! lists one module per row:
//!
//! ```text
//! Acme::Brainfuck    1.001001  J/JA/JALDHAR/Acme-Brainfuck-1.1.1.tar.gz
//! ```
//!
//! Only the row whose module names the distribution itself becomes a
//! package; name and version come from the distribution file. Every CPAN
//! record is a shadow: it mirrors software other repositories package.

use super::{FamilyParser, PackageUnit, SourceContext, read_source_text};
use crate::error::{Error, Result};
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use serde::Deserialize;
use tracing::debug;

const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".zip"];

/// Index header fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IndexHeader {
    columns: String,
    #[serde(rename = "Line-Count", default)]
    line_count: Option<String>,
}

/// CPAN package index parser
pub struct CpanParser;

impl FamilyParser for CpanParser {
    fn family(&self) -> Family {
        Family::Cpan
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::Verbatim
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let text = read_source_text(&ctx.path)?;
        let mut lines = text.lines().enumerate();

        let mut header = String::new();
        for (_, line) in lines.by_ref().take_while(|(_, line)| !line.trim().is_empty()) {
            header.push_str(line);
            header.push('\n');
        }
        let headers: Vec<IndexHeader> = rfc822_like::from_str(&header).map_err(|e| {
            Error::ParseError(format!("{}: invalid index header: {}", ctx.path.display(), e))
        })?;
        let Some(header) = headers.into_iter().next() else {
            return Err(Error::ParseError(format!(
                "{}: missing index header",
                ctx.path.display()
            )));
        };

        let units: Vec<PackageUnit> = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| PackageUnit::text(format!("line {}", index + 1), line.to_string()))
            .collect();

        debug!(
            "Found {} index rows in {} (columns: {}; header line count {})",
            units.len(),
            ctx.path.display(),
            header.columns.trim(),
            header.line_count.as_deref().unwrap_or("?")
        );
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        _ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let row = unit.read_text()?;
        let columns: Vec<&str> = row.split_whitespace().collect();
        let &[module, _module_version, path] = columns.as_slice() else {
            return Err(Error::ParseError(format!(
                "expected 3 columns, found {}",
                columns.len()
            )));
        };

        let mut components = path.split('/');
        let (Some(_), Some(_), Some(author), Some(filename)) = (
            components.next(),
            components.next(),
            components.next(),
            components.next_back(),
        ) else {
            return Err(Error::ParseError(format!("unexpected distribution path '{}'", path)));
        };

        let Some((dist, version)) = split_distribution(filename) else {
            return Err(Error::ParseError(format!(
                "unexpected distribution file '{}'",
                filename
            )));
        };

        if module.replace("::", "-") != dist {
            return Ok(None);
        }

        let version = version.strip_prefix('v').unwrap_or(version);
        if !version.starts_with(|c: char| c.is_ascii_digit()) {
            debug!("{}: skipping non-numeric version '{}'", unit.id, version);
            return Ok(None);
        }

        let mut raw = RawPackage::new();
        raw.set(keys::NAME, dist)
            .set(keys::VERSION, version)
            .set(keys::MAINTAINERS, format!("{}@cpan", author.to_lowercase()))
            .set(keys::HOMEPAGE, format!("http://search.cpan.org/dist/{}/", dist))
            .flag(keys::SHADOW, true);

        Ok(Some(raw))
    }
}

/// `(distribution, version)` of a distribution file name
fn split_distribution(filename: &str) -> Option<(&str, &str)> {
    let stem = ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| filename.strip_suffix(suffix))?;
    stem.rsplit_once('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RepositoryDefinition, SourceDefinition};

    fn parse(row: &str) -> Result<Option<RawPackage>> {
        let definition =
            RepositoryDefinition::new("cpan", Family::Cpan, SourceDefinition::new("02packages.details.txt"));
        let ctx = SourceContext::new(&definition, &definition.sources[0], "02packages.details.txt".into());
        CpanParser.parse_unit(&PackageUnit::text("line 10", row.to_string()), &ctx)
    }

    #[test]
    fn test_distribution_row() {
        let raw = parse("Acme::Brainfuck   1.001001  J/JA/JALDHAR/Acme-Brainfuck-1.1.1.tar.gz")
            .unwrap()
            .unwrap();

        assert_eq!(raw.first(keys::NAME), Some("Acme-Brainfuck"));
        assert_eq!(raw.first(keys::VERSION), Some("1.1.1"));
        assert_eq!(raw.first(keys::MAINTAINERS), Some("jaldhar@cpan"));
        assert_eq!(raw.first(keys::SHADOW), Some("true"));
    }

    #[test]
    fn test_skipped_rows() {
        // submodule of another distribution
        assert!(parse("Acme::Brainfuck::Util  undef  J/JA/JALDHAR/Acme-Brainfuck-1.1.1.tar.gz")
            .unwrap()
            .is_none());
        // non-numeric version
        assert!(parse("Foo  undef  A/AB/ABC/Foo-latest.tar.gz").unwrap().is_none());
    }

    #[test]
    fn test_version_prefix_stripped() {
        let raw = parse("Foo  v2.1  A/AB/ABC/Foo-v2.1.tar.gz").unwrap().unwrap();
        assert_eq!(raw.first(keys::VERSION), Some("2.1"));
    }

    #[test]
    fn test_units_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("02packages.details.txt");
        std::fs::write(
            &path,
            "File:         02packages.details.txt\nColumns:      package name, version, path\nLine-Count:   2\n\n\
             Foo          1.0  A/AB/ABC/Foo-1.0.tar.gz\n\nBar          2.0  A/AB/ABC/Bar-2.0.tar.gz\n",
        )
        .unwrap();

        let definition =
            RepositoryDefinition::new("cpan", Family::Cpan, SourceDefinition::new("02packages.details.txt"));
        let ctx = SourceContext::new(&definition, &definition.sources[0], path.clone());
        let units = CpanParser.units(&ctx).unwrap();

        let ids: Vec<&str> = units.iter().map(|unit| unit.id.as_str()).collect();
        assert_eq!(ids, vec!["line 5", "line 7"]);

        std::fs::write(&path, "File:  02packages.details.txt\n\nFoo  1.0  A/AB/ABC/Foo-1.0.tar.gz\n").unwrap();
        assert!(matches!(CpanParser.units(&ctx), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_malformed_rows() {
        assert!(matches!(parse("Foo 1.0"), Err(Error::ParseError(_))));
        assert!(matches!(parse("Foo 1.0 Foo-1.0.tar.gz"), Err(Error::ParseError(_))));
        assert!(matches!(parse("Foo 1.0 A/AB/ABC/Foo.pm"), Err(Error::ParseError(_))));
    }
}

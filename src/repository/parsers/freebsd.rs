// src/repository/parsers/freebsd.rs

//! FreeBSD ports INDEX parser
//!
//! Every line of `INDEX` describes one port in 13 `|`-separated fields:
//!
//! ```text
//! pkgname-version|path|prefix|comment|descr|maintainer|categories|
//! build-deps|run-deps|www|extract-deps|patch-deps|fetch-deps
//! ```

use super::{FamilyParser, PackageUnit, SourceContext, read_source_text};
use crate::error::{Error, Result};
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use tracing::debug;

/// Fields a well-formed INDEX line carries at minimum
const MIN_FIELDS: usize = 10;

const PKGNAME: usize = 0;
const PATH: usize = 1;
const COMMENT: usize = 3;
const MAINTAINER: usize = 5;
const CATEGORIES: usize = 6;
const WWW: usize = 9;

/// FreeBSD ports INDEX parser
pub struct FreebsdParser;

impl FamilyParser for FreebsdParser {
    fn family(&self) -> Family {
        Family::Freebsd
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::PortsSuffix
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let text = read_source_text(&ctx.path)?;
        let units: Vec<PackageUnit> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| PackageUnit::text(format!("line {}", index + 1), line.to_string()))
            .collect();

        debug!("Found {} INDEX lines in {}", units.len(), ctx.path.display());
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        _ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let line = unit.read_text()?;
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < MIN_FIELDS {
            return Err(Error::ParseError(format!(
                "expected at least {} fields, found {}",
                MIN_FIELDS,
                fields.len()
            )));
        }

        let (name, version) = fields[PKGNAME].rsplit_once('-').ok_or_else(|| {
            Error::ParseError(format!("'{}' is not name-version", fields[PKGNAME]))
        })?;

        let mut raw = RawPackage::new();
        raw.set(keys::NAME, name)
            .set(keys::VERSION, version)
            .set(keys::COMMENT, fields[COMMENT])
            .set(keys::MAINTAINERS, fields[MAINTAINER])
            .set(keys::HOMEPAGE, fields[WWW])
            .set_opt(keys::CATEGORY, fields[CATEGORIES].split_whitespace().next());

        // origin is the last two components of the port path
        let mut components = fields[PATH].trim_end_matches('/').rsplit('/');
        if let (Some(portname), Some(category)) = (components.next(), components.next()) {
            raw.set("portname", portname)
                .set("origin", format!("{}/{}", category, portname));
        }

        Ok(Some(raw))
    }
}

// src/repository/parsers/pkgsrc.rs

//! pkgsrc tree parser
//!
//! One unit per `<category>/<package>/Makefile`. Variables are read with
//! Makefile assignment rules and expanded against each other; `.include`d
//! files are not followed, so anything defined elsewhere stays unresolved.
//! The packaging revision is declared separately in `PKGREVISION`.

use super::{FamilyParser, PackageUnit, SourceContext, file_name, sorted_subdirs};
use crate::error::{Error, Result};
use crate::extract::{Convention, RawFields, expand_variables, parse_assignments};
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use tracing::debug;

const MAKEFILE: &str = "Makefile";
const DEFAULT_EXTRACT_SUFX: &str = ".tar.gz";

/// Nesting limit for variable references
const MAX_EXPANSION_DEPTH: usize = 8;

/// pkgsrc tree parser
pub struct PkgsrcParser;

impl FamilyParser for PkgsrcParser {
    fn family(&self) -> Family {
        Family::Pkgsrc
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::SeparateRevision { separator: "nb" }
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let mut units = Vec::new();
        for category in sorted_subdirs(&ctx.path)? {
            let category_name = file_name(&category);
            for package in sorted_subdirs(&category)? {
                let makefile = package.join(MAKEFILE);
                if makefile.is_file() {
                    let id = format!("{}/{}/{}", category_name, file_name(&package), MAKEFILE);
                    units.push(PackageUnit::file(id, makefile));
                }
            }
        }

        debug!("Found {} Makefiles in {}", units.len(), ctx.path.display());
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        _ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let fields = parse_assignments(&unit.read_text()?, &Convention::MAKEFILE)?;
        let value = |key: &str| fields.get(key).map(|raw| expand(&raw.joined(), &fields, 0));

        let distname = value("DISTNAME").ok_or(Error::MissingField("DISTNAME"))?;
        let pkgname = value("PKGNAME").unwrap_or_else(|| distname.clone());
        if pkgname.contains('$') {
            return Err(Error::ParseError(format!(
                "unresolved variable in package name '{}'",
                pkgname
            )));
        }
        let (name, version) = pkgname
            .rsplit_once('-')
            .ok_or_else(|| Error::ParseError(format!("'{}' is not name-version", pkgname)))?;

        let mut raw = RawPackage::new();
        raw.set(keys::NAME, name)
            .set(keys::VERSION, version)
            .set_opt(keys::REVISION, value("PKGREVISION"))
            .set_opt(keys::COMMENT, value("COMMENT"))
            .set_opt(keys::HOMEPAGE, value("HOMEPAGE"))
            .set_opt(keys::MAINTAINERS, value("MAINTAINER"))
            .set_opt(keys::LICENSES, value("LICENSE"));

        // the directory wins over the first of CATEGORIES
        let category = match unit.id.split_once('/') {
            Some((category, _)) => Some(category.to_string()),
            None => value("CATEGORIES")
                .and_then(|categories| categories.split_whitespace().next().map(str::to_string)),
        };
        raw.set_opt(keys::CATEGORY, category);

        let suffix = value("EXTRACT_SUFX").unwrap_or_else(|| DEFAULT_EXTRACT_SUFX.to_string());
        let downloads: Vec<String> = value("MASTER_SITES")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|site| !site.contains('$'))
            .map(|site| format!("{}/{}{}", site.trim_end_matches('/'), distname, suffix))
            .collect();
        raw.extend(keys::DOWNLOADS, downloads);

        Ok(Some(raw))
    }
}

/// Expand `${VAR}` references against the Makefile's own variables
fn expand(value: &str, fields: &RawFields, depth: usize) -> String {
    if depth >= MAX_EXPANSION_DEPTH || !value.contains('$') {
        return value.to_string();
    }
    expand_variables(value, |name| {
        fields
            .get(name)
            .map(|raw| expand(&raw.joined(), fields, depth + 1))
    })
}

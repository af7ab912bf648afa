// src/repository/parsers/slackbuilds.rs

//! SlackBuilds.org tree parser
//!
//! One unit per `<category>/<package>/<package>.info`, a shell fragment:
//!
//! ```text
//! PRGNAM="baudline"
//! VERSION="1.08"
//! DOWNLOAD="http://www.baudline.com/baudline_1.08_linux_i686.tar.gz"
//! DOWNLOAD_x86_64="http://www.baudline.com/baudline_1.08_linux_x86_64.tar.gz"
//! EMAIL="joshuakwood@gmail.com"
//! ```
//!
//! `DOWNLOAD` and its `DOWNLOAD_<arch>` variants are resolved through
//! [`VariantField`].

use super::{FamilyParser, PackageUnit, SourceContext, UnitContent, file_name, sorted_subdirs};
use crate::error::{Error, Result};
use crate::extract::{Convention, parse_assignments};
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use crate::variant::{StatusMarkers, VariantField};
use tracing::debug;

const ALIASES: &[(&str, &str)] = &[
    ("PRGNAM", keys::NAME),
    ("VERSION", keys::VERSION),
    ("HOMEPAGE", keys::HOMEPAGE),
    ("EMAIL", keys::MAINTAINERS),
];

/// SlackBuilds.org tree parser
pub struct SlackbuildsParser;

impl FamilyParser for SlackbuildsParser {
    fn family(&self) -> Family {
        Family::Slackbuilds
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::Verbatim
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let mut units = Vec::new();
        for category in sorted_subdirs(&ctx.path)? {
            let category_name = file_name(&category);
            for package in sorted_subdirs(&category)? {
                let package_name = file_name(&package);
                let info = package.join(format!("{}.info", package_name));
                if info.is_file() {
                    let id = format!("{}/{}/{}.info", category_name, package_name, package_name);
                    units.push(PackageUnit::file(id, info));
                }
            }
        }

        debug!("Found {} .info files in {}", units.len(), ctx.path.display());
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let UnitContent::File(info) = &unit.content else {
            return Err(Error::ParseError(format!("{} is not an .info file", unit.id)));
        };

        let fields = parse_assignments(&unit.read_text()?, &Convention::SHELL)?;
        let mut raw = RawPackage::alias(&fields, ALIASES);

        let category = info
            .parent()
            .and_then(|package| package.parent())
            .map(file_name);
        raw.set_opt(keys::CATEGORY, category);

        let download = VariantField::from_fields(&fields, "DOWNLOAD", '_', &StatusMarkers::SLACKBUILDS);
        let downloads = match ctx.qualifiers() {
            Some(arches) => download.resolve_all(arches),
            None => download.resolve_declared(),
        };
        raw.extend(keys::DOWNLOADS, downloads);

        Ok(Some(raw))
    }
}

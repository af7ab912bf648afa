// src/repository/parsers/gentoo.rs

//! Gentoo ebuild tree parser
//!
//! One unit per `<category>/<package>/<package>-<version>.ebuild`. The
//! ebuild itself is never sourced; its metadata comes from the generated
//! md5-cache entry `metadata/md5-cache/<category>/<package>-<version>`
//! (`KEY=value` lines). Maintainers come from the package's
//! `metadata.xml`, shared by every ebuild of the package.

use super::{
    FamilyParser, PackageUnit, SourceContext, UnitContent, file_name, read_source_text,
    sorted_files, sorted_subdirs,
};
use crate::error::{Error, Result};
use crate::extract::{Convention, parse_assignments};
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::Path;
use tracing::{debug, warn};

/// Top-level directories of a tree that are not categories
const FAKE_CATEGORIES: &[&str] = &["eclass", "profiles", "metadata", "licenses"];

const LIVE_VERSION_SUFFIX: &str = "9999";

/// Gentoo ebuild tree parser
pub struct GentooParser;

impl FamilyParser for GentooParser {
    fn family(&self) -> Family {
        Family::Gentoo
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::RevisionSuffix
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let mut units = Vec::new();

        for category in sorted_subdirs(&ctx.path)? {
            let category_name = file_name(&category);
            if FAKE_CATEGORIES.contains(&category_name.as_str()) {
                continue;
            }

            for package in sorted_subdirs(&category)? {
                let package_name = file_name(&package);
                for ebuild in sorted_files(&package)? {
                    let ebuild_name = file_name(&ebuild);
                    if ebuild_name.ends_with(".ebuild") {
                        let id = format!("{}/{}/{}", category_name, package_name, ebuild_name);
                        units.push(PackageUnit::file(id, ebuild));
                    }
                }
            }
        }

        debug!("Found {} ebuilds in {}", units.len(), ctx.path.display());
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let UnitContent::File(ebuild) = &unit.content else {
            return Err(Error::ParseError(format!("{} is not an ebuild file", unit.id)));
        };
        let (category, package, version) = split_ebuild_path(ebuild)?;

        let cache_path = ctx
            .path
            .join("metadata/md5-cache")
            .join(&category)
            .join(format!("{}-{}", package, version));
        if !cache_path.is_file() {
            return Err(Error::ParseError(format!(
                "no md5-cache entry for {}/{}-{}",
                category, package, version
            )));
        }
        let cache = parse_assignments(&read_source_text(&cache_path)?, &Convention::KEY_VALUE)?;

        let mut raw = RawPackage::new();
        raw.set(keys::NAME, package.as_str())
            .set(keys::VERSION, version.as_str())
            .set(keys::CATEGORY, category.as_str());

        if let Some(description) = cache.get("DESCRIPTION") {
            raw.set(keys::COMMENT, description.joined());
        }
        if let Some(homepage) = cache.get("HOMEPAGE") {
            raw.set_opt(keys::HOMEPAGE, homepage.words().first().copied());
        }
        if let Some(license) = cache.get("LICENSE") {
            raw.extend(keys::LICENSES, split_license(&license.joined()));
        }
        if let Some(src_uri) = cache.get("SRC_URI") {
            raw.extend(keys::DOWNLOADS, flatten_src_uri(&src_uri.joined()));
        }

        let metadata_xml = ebuild.with_file_name("metadata.xml");
        if metadata_xml.is_file() {
            match read_source_text(&metadata_xml).and_then(|xml| parse_maintainers(&xml)) {
                Ok(maintainers) => {
                    raw.extend(keys::MAINTAINERS, maintainers);
                }
                Err(e) => warn!("{}: ignoring metadata.xml: {}", unit.id, e),
            }
        }

        if version.ends_with(LIVE_VERSION_SUFFIX) {
            raw.flag(keys::IGNOREVERSION, true);
        }

        Ok(Some(raw))
    }
}

/// `(category, package, version)` of an ebuild path
fn split_ebuild_path(ebuild: &Path) -> Result<(String, String, String)> {
    let package_dir = ebuild.parent();
    let package = package_dir.map(file_name).unwrap_or_default();
    let category = package_dir
        .and_then(Path::parent)
        .map(file_name)
        .unwrap_or_default();

    let version = file_name(ebuild)
        .strip_suffix(".ebuild")
        .and_then(|stem| stem.strip_prefix(&format!("{}-", package)))
        .map(str::to_string)
        .ok_or_else(|| {
            Error::ParseError(format!(
                "{} does not match its package directory",
                ebuild.display()
            ))
        })?;

    Ok((category, package, version))
}

/// Split a LICENSE expression into licenses
///
/// Expressions with groups (`|| ( A B )`, `flag? ( A )`) cannot be reduced
/// to a plain list and are kept as one string.
fn split_license(license: &str) -> Vec<String> {
    let license = license.trim();
    if license.is_empty() {
        Vec::new()
    } else if license.contains('(') {
        vec![license.to_string()]
    } else {
        license.split_whitespace().map(str::to_string).collect()
    }
}

/// Download URLs of a SRC_URI expression
///
/// USE-conditional groups are flattened and `-> filename` renames dropped.
fn flatten_src_uri(src_uri: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut tokens = src_uri.split_whitespace();

    while let Some(token) = tokens.next() {
        if token == "->" {
            tokens.next();
        } else if token.contains("://") {
            urls.push(token.to_string());
        }
    }
    urls
}

/// Maintainer e-mails listed in a metadata.xml document
fn parse_maintainers(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut maintainers = Vec::new();
    let mut in_maintainer = false;
    let mut in_email = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"maintainer" => in_maintainer = true,
            Ok(Event::Start(e)) if e.name().as_ref() == b"email" => in_email = in_maintainer,
            Ok(Event::Text(e)) if in_email => {
                let email = e
                    .unescape()
                    .map_err(|e| Error::ParseError(format!("metadata.xml: {}", e)))?;
                maintainers.push(email.trim().to_string());
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"email" => in_email = false,
            Ok(Event::End(e)) if e.name().as_ref() == b"maintainer" => in_maintainer = false,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "metadata.xml at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(maintainers)
}

// src/repository/parsers/arch.rs

//! Arch Linux repository database parser
//!
//! A source is either an extracted database tree (`<name>-<version>/desc`)
//! or the `.db` tarball itself. Each `desc` file is one unit, written in
//! `%FIELD%` blocks:
//!
//! ```text
//! %NAME%
//! zlib
//!
//! %VERSION%
//! 1:1.2.8-7
//! ```

use super::{FamilyParser, PackageUnit, SourceContext, file_name, sorted_subdirs};
use crate::error::{Error, Result};
use crate::extract::blocks::{BlockMarkers, parse_blocks};
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;

const DESC_FILE: &str = "desc";

/// Native field → raw key
const ALIASES: &[(&str, &str)] = &[
    ("NAME", keys::NAME),
    ("VERSION", keys::VERSION),
    ("DESC", keys::COMMENT),
    ("URL", keys::HOMEPAGE),
    ("LICENSE", keys::LICENSES),
    ("PACKAGER", keys::MAINTAINERS),
];

/// Arch Linux repository database parser
pub struct ArchParser;

impl ArchParser {
    /// One unit per `desc` file of an extracted database
    fn tree_units(&self, root: &Path) -> Result<Vec<PackageUnit>> {
        let mut units = Vec::new();
        for package in sorted_subdirs(root)? {
            let desc = package.join(DESC_FILE);
            if desc.is_file() {
                units.push(PackageUnit::file(
                    format!("{}/{}", file_name(&package), DESC_FILE),
                    desc,
                ));
            }
        }
        Ok(units)
    }

    /// One unit per `desc` entry of a database tarball
    fn tarball_units(&self, path: &Path) -> Result<Vec<PackageUnit>> {
        let data = std::fs::read(path)?;
        let decompressed = self.decompress_database(&data)?;

        let mut archive = Archive::new(decompressed.as_slice());
        let mut units = Vec::new();

        for entry in archive.entries()? {
            let mut entry = entry
                .map_err(|e| Error::ParseError(format!("Failed to read tarball entry: {}", e)))?;

            let entry_path = entry
                .path()
                .map_err(|e| Error::ParseError(format!("Invalid path in tarball: {}", e)))?
                .to_string_lossy()
                .into_owned();

            if entry_path.ends_with("/desc") {
                let mut content = String::new();
                entry.read_to_string(&mut content).map_err(|e| {
                    Error::ParseError(format!("Failed to read {}: {}", entry_path, e))
                })?;
                units.push(PackageUnit::text(entry_path, content));
            }
        }

        units.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(units)
    }

    /// Decompress the database (handles .gz, .xz, or .zst)
    fn decompress_database(&self, data: &[u8]) -> Result<Vec<u8>> {
        // Try gzip first
        let mut gz = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        if gz.read_to_end(&mut decompressed).is_ok() && !decompressed.is_empty() {
            debug!("Decompressed gzip database");
            return Ok(decompressed);
        }

        // Try xz
        let mut xz = XzDecoder::new(data);
        let mut decompressed = Vec::new();
        if xz.read_to_end(&mut decompressed).is_ok() && !decompressed.is_empty() {
            debug!("Decompressed xz database");
            return Ok(decompressed);
        }

        // If neither worked, try zstd
        match zstd::decode_all(data) {
            Ok(decompressed) => {
                debug!("Decompressed zstd database");
                Ok(decompressed)
            }
            Err(e) => Err(Error::Decompress(format!(
                "Failed to decompress database (tried gz, xz, zstd): {}",
                e
            ))),
        }
    }
}

impl FamilyParser for ArchParser {
    fn family(&self) -> Family {
        Family::Arch
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::EpochRelease
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let units = if ctx.path.is_dir() {
            self.tree_units(&ctx.path)?
        } else {
            self.tarball_units(&ctx.path)?
        };

        debug!("Found {} desc files in {}", units.len(), ctx.path.display());
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        _ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let fields = parse_blocks(&unit.read_text()?, &BlockMarkers::PERCENT);
        Ok(Some(RawPackage::alias(&fields, ALIASES)))
    }
}

// src/repository/parsers/mod.rs

//! Per-family metadata parsers
//!
//! Each supported family implements [`FamilyParser`]:
//! - FreeBSD: ports `INDEX` lines
//! - Gentoo: ebuild tree with md5-cache and `metadata.xml`
//! - Arch Linux: `desc` trees or `.db` tarballs
//! - CPAN: `02packages.details.txt`
//! - Debian/Ubuntu: `Sources` stanzas
//! - GoboLinux: recipe tree
//! - SlackBuilds: `.info` files
//! - pkgsrc: Makefile tree
//!
//! Parsing happens in two steps so units can be processed in parallel:
//! [`FamilyParser::units`] enumerates the package units of a source, then
//! [`FamilyParser::parse_unit`] turns one unit into a [`RawPackage`].

pub mod arch;
pub mod cpan;
pub mod debian;
pub mod freebsd;
pub mod gentoo;
pub mod gobolinux;
pub mod pkgsrc;
pub mod slackbuilds;

use crate::config::{RepositoryDefinition, SourceDefinition};
use crate::error::{Error, Result};
use crate::normalize::{RawPackage, VersionScheme};
use crate::package::Family;
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use xz2::read::XzDecoder;

/// Parser for one family's native metadata format
pub trait FamilyParser: Send + Sync {
    /// Family this parser understands
    fn family(&self) -> Family;

    /// How the family's raw versions are split
    fn version_scheme(&self) -> VersionScheme;

    /// Enumerate the package units of a source, in a deterministic order
    ///
    /// An error here means the whole source is unusable.
    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>>;

    /// Parse one unit
    ///
    /// `Ok(None)` skips a unit that is well formed but not a package
    /// record (a header row, an index entry for another module).
    fn parse_unit(&self, unit: &PackageUnit, ctx: &SourceContext<'_>)
    -> Result<Option<RawPackage>>;
}

/// The source a parser is working on
#[derive(Debug, Clone)]
pub struct SourceContext<'a> {
    pub definition: &'a RepositoryDefinition,
    pub source: &'a SourceDefinition,
    /// Resolved location of the source on disk
    pub path: PathBuf,
}

impl<'a> SourceContext<'a> {
    pub fn new(
        definition: &'a RepositoryDefinition,
        source: &'a SourceDefinition,
        path: PathBuf,
    ) -> Self {
        Self {
            definition,
            source,
            path,
        }
    }

    pub fn subrepo(&self) -> Option<&str> {
        self.source.subrepo.as_deref()
    }

    /// Qualifiers configured for variant resolution, if any
    pub fn qualifiers(&self) -> Option<&[String]> {
        self.definition.arches.as_deref()
    }
}

/// Smallest artifact describing one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUnit {
    /// Identifier used in diagnostics (a relative path, a line number)
    pub id: String,
    pub content: UnitContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitContent {
    /// A file holding the unit
    File(PathBuf),
    /// A directory holding the unit's files
    Dir(PathBuf),
    /// Text already split out of a larger source
    Text(String),
}

impl PackageUnit {
    pub fn file(id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            id: id.into(),
            content: UnitContent::File(path),
        }
    }

    pub fn dir(id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            id: id.into(),
            content: UnitContent::Dir(path),
        }
    }

    pub fn text(id: impl Into<String>, text: String) -> Self {
        Self {
            id: id.into(),
            content: UnitContent::Text(text),
        }
    }

    /// Text of a file or text unit
    pub fn read_text(&self) -> Result<String> {
        match &self.content {
            UnitContent::File(path) => read_source_text(path),
            UnitContent::Text(text) => Ok(text.clone()),
            UnitContent::Dir(path) => Err(Error::ParseError(format!(
                "{} is a directory unit",
                path.display()
            ))),
        }
    }

    /// Directory of a directory unit
    pub fn dir_path(&self) -> Result<&Path> {
        match &self.content {
            UnitContent::Dir(path) => Ok(path),
            _ => Err(Error::ParseError(format!("{} is not a directory unit", self.id))),
        }
    }
}

/// Maps each family to its parser
pub struct ParserRegistry {
    parsers: HashMap<Family, Box<dyn FamilyParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ParserRegistry {
    /// A registry without any parser
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// A registry with a parser for every known family
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(freebsd::FreebsdParser));
        registry.register(Box::new(gentoo::GentooParser));
        registry.register(Box::new(arch::ArchParser));
        registry.register(Box::new(cpan::CpanParser));
        registry.register(Box::new(debian::DebianParser));
        registry.register(Box::new(gobolinux::GobolinuxParser));
        registry.register(Box::new(slackbuilds::SlackbuildsParser));
        registry.register(Box::new(pkgsrc::PkgsrcParser));
        registry
    }

    /// Register a parser, replacing any previous one for its family
    pub fn register(&mut self, parser: Box<dyn FamilyParser>) {
        self.parsers.insert(parser.family(), parser);
    }

    pub fn get(&self, family: Family) -> Result<&dyn FamilyParser> {
        self.parsers
            .get(&family)
            .map(|parser| parser.as_ref())
            .ok_or_else(|| Error::UnknownFamily(family.to_string()))
    }
}

/// Read a source file as text, decompressing by extension
///
/// Invalid UTF-8 is replaced rather than rejected; upstream files are not
/// always clean.
pub fn read_source_text(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let data = match extension {
        "gz" => {
            let mut decoded = Vec::new();
            GzDecoder::new(data.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|e| decompress_error(path, "gzip", e))?;
            decoded
        }
        "xz" => {
            let mut decoded = Vec::new();
            XzDecoder::new(data.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|e| decompress_error(path, "xz", e))?;
            decoded
        }
        "zst" => zstd::decode_all(data.as_slice()).map_err(|e| decompress_error(path, "zstd", e))?,
        _ => data,
    };

    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn decompress_error(path: &Path, format: &str, err: std::io::Error) -> Error {
    Error::Decompress(format!("{} ({}): {}", path.display(), format, err))
}

/// Directories directly under `path`, sorted by name, hidden ones skipped
pub fn sorted_subdirs(path: &Path) -> Result<Vec<PathBuf>> {
    sorted_entries(path, |entry| entry.file_type().is_dir())
}

/// Files directly under `path`, sorted by name, hidden ones skipped
pub fn sorted_files(path: &Path) -> Result<Vec<PathBuf>> {
    sorted_entries(path, |entry| entry.file_type().is_file())
}

fn sorted_entries(path: &Path, keep: impl Fn(&walkdir::DirEntry) -> bool) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(err) => Error::Io(err),
            None => Error::ParseError(format!("Failed to walk {}", path.display())),
        })?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && keep(&entry) {
            entries.push(entry.into_path());
        }
    }
    Ok(entries)
}

/// Last component of a path as a string
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

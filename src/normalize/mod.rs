// src/normalize/mod.rs

//! Raw field-map to unified [`Package`] normalization
//!
//! Family parsers emit a [`RawPackage`] keyed by the vocabulary in
//! [`keys`]. The [`Normalizer`] turns it into a [`Package`]:
//! - splits the version according to the family's [`VersionScheme`]
//! - reduces maintainer strings to addresses, substituting the
//!   repository's fallback maintainer when none is left
//! - deduplicates and sorts list fields
//! - moves every key outside the vocabulary into `extrafields`

mod version;

pub use version::VersionScheme;

use crate::error::{Error, Result};
use crate::extract::contacts::extract_maintainers;
use crate::extract::{RawFields, RawValue};
use crate::package::{Family, Package};
use tracing::debug;

/// Raw keys with a place in the unified schema
pub mod keys {
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    /// Packaging revision declared apart from the version
    pub const REVISION: &str = "revision";
    /// Overrides the subrepo of the source the unit came from
    pub const SUBREPO: &str = "subrepo";
    pub const CATEGORY: &str = "category";
    pub const COMMENT: &str = "comment";
    pub const HOMEPAGE: &str = "homepage";
    pub const MAINTAINERS: &str = "maintainers";
    pub const LICENSES: &str = "licenses";
    pub const DOWNLOADS: &str = "downloads";
    pub const IGNORE: &str = "ignore";
    pub const SHADOW: &str = "shadow";
    pub const IGNOREVERSION: &str = "ignoreversion";
}

/// Field map of one package unit, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPackage {
    fields: RawFields,
}

impl RawPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the listed native keys of `fields` under their canonical names
    ///
    /// Keys not listed are left behind; parsers add extras explicitly.
    pub fn alias(fields: &RawFields, aliases: &[(&str, &str)]) -> Self {
        let mut raw = Self::new();
        for (native, canonical) in aliases {
            if let Some(value) = fields.get(*native) {
                raw.fields.insert(canonical.to_string(), value.clone());
            }
        }
        raw
    }

    pub fn set(&mut self, key: &str, value: impl Into<RawValue>) -> &mut Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Set a key only when a value is present
    pub fn set_opt<S: Into<String>>(&mut self, key: &str, value: Option<S>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, RawValue::Single(value.into()));
        }
        self
    }

    /// Append values to a key, creating a list when absent
    pub fn extend<I, S>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = values.into_iter().map(Into::into).peekable();
        if values.peek().is_none() {
            return self;
        }

        match self.fields.get_mut(key) {
            Some(existing) => values.for_each(|value| existing.push(value)),
            None => {
                self.fields
                    .insert(key.to_string(), RawValue::List(values.collect()));
            }
        }
        self
    }

    pub fn flag(&mut self, key: &str, value: bool) -> &mut Self {
        self.set(key, if value { "true" } else { "false" })
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    pub fn take(&mut self, key: &str) -> Option<RawValue> {
        self.fields.remove(key)
    }

    /// First string of a key, if any
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(RawValue::first)
    }
}

/// Repository-level context a record is normalized in
#[derive(Debug, Clone)]
pub struct Origin<'a> {
    pub repo: &'a str,
    pub family: Family,
    pub subrepo: Option<&'a str>,
    pub fallback_maintainer: Option<&'a str>,
    pub scheme: VersionScheme,
}

/// Hook computing the cross-ecosystem matching name
pub trait NameMapper: Send + Sync {
    fn effname(&self, family: Family, name: &str) -> Option<String>;
}

/// Leaves `effname` unset
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl NameMapper for PassThrough {
    fn effname(&self, _family: Family, _name: &str) -> Option<String> {
        None
    }
}

/// Builds [`Package`] records from raw field maps
pub struct Normalizer {
    mapper: Box<dyn NameMapper>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            mapper: Box::new(PassThrough),
        }
    }

    pub fn with_name_mapper(mapper: impl NameMapper + 'static) -> Self {
        Self {
            mapper: Box::new(mapper),
        }
    }

    /// Normalize one raw package
    ///
    /// Fails with [`Error::MissingField`] when the name or version is
    /// missing or blank; every other anomaly falls back to the field's
    /// default.
    pub fn normalize(&self, mut raw: RawPackage, origin: &Origin<'_>) -> Result<Package> {
        let name = take_text(&mut raw, keys::NAME).ok_or(Error::MissingField(keys::NAME))?;
        let raw_version =
            take_text(&mut raw, keys::VERSION).ok_or(Error::MissingField(keys::VERSION))?;
        let revision = take_text(&mut raw, keys::REVISION);

        let (version, origversion) = origin.scheme.compose(&raw_version, revision.as_deref());

        let mut pkg = Package::new(origin.repo.to_string(), origin.family, name, version);
        pkg.origversion = origversion;
        pkg.subrepo = take_text(&mut raw, keys::SUBREPO).or(origin.subrepo.map(str::to_string));
        pkg.effname = self.mapper.effname(origin.family, &pkg.name);

        pkg.category = take_text(&mut raw, keys::CATEGORY);
        pkg.comment = take_text(&mut raw, keys::COMMENT);
        pkg.homepage = take_text(&mut raw, keys::HOMEPAGE);

        pkg.maintainers = raw
            .take(keys::MAINTAINERS)
            .map(|value| {
                value
                    .items()
                    .into_iter()
                    .flat_map(extract_maintainers)
                    .collect()
            })
            .unwrap_or_default();
        if pkg.maintainers.is_empty()
            && let Some(fallback) = origin.fallback_maintainer
        {
            pkg.maintainers.push(fallback.to_string());
        }
        pkg.licenses = take_list(&mut raw, keys::LICENSES, RawValue::items);
        pkg.downloads = take_list(&mut raw, keys::DOWNLOADS, RawValue::words);
        sort_unique(&mut pkg.maintainers);

        pkg.ignore = take_flag(&mut raw, keys::IGNORE);
        pkg.shadow = take_flag(&mut raw, keys::SHADOW);
        pkg.ignoreversion = take_flag(&mut raw, keys::IGNOREVERSION);

        if !pkg.version.chars().any(|c| c.is_ascii_digit()) {
            debug!("{}: version '{}' has no digits, ignoring", pkg.name, pkg.version);
            pkg.ignore = true;
        }

        pkg.extrafields = raw
            .fields
            .into_iter()
            .map(|(key, value)| (key, value.joined()))
            .collect();

        Ok(pkg)
    }
}

fn take_text(raw: &mut RawPackage, key: &str) -> Option<String> {
    let value = raw.take(key)?;
    let text = value.first()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn take_list(raw: &mut RawPackage, key: &str, split: fn(&RawValue) -> Vec<&str>) -> Vec<String> {
    let mut list: Vec<String> = raw
        .take(key)
        .map(|value| {
            split(&value)
                .into_iter()
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    sort_unique(&mut list);
    list
}

fn take_flag(raw: &mut RawPackage, key: &str) -> bool {
    raw.take(key)
        .and_then(|value| value.first().map(str::trim).map(str::to_ascii_lowercase))
        .is_some_and(|value| matches!(value.as_str(), "true" | "1" | "yes"))
}

fn sort_unique(list: &mut Vec<String>) {
    list.sort();
    list.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(scheme: VersionScheme) -> Origin<'static> {
        Origin {
            repo: "test",
            family: Family::Freebsd,
            subrepo: None,
            fallback_maintainer: None,
            scheme,
        }
    }

    fn raw(name: &str, version: &str) -> RawPackage {
        let mut raw = RawPackage::new();
        raw.set(keys::NAME, name).set(keys::VERSION, version);
        raw
    }

    #[test]
    fn test_defaults() {
        let pkg = Normalizer::new()
            .normalize(raw("foo", "1.0"), &origin(VersionScheme::Verbatim))
            .unwrap();

        assert_eq!(pkg.repo, "test");
        assert_eq!(pkg.version, "1.0");
        assert_eq!(pkg.origversion, None);
        assert_eq!(pkg.effname, None);
        assert!(pkg.maintainers.is_empty());
        assert!(pkg.extrafields.is_empty());
        assert!(!pkg.ignore);
    }

    #[test]
    fn test_missing_name_or_version() {
        let normalizer = Normalizer::new();
        let origin = origin(VersionScheme::Verbatim);

        let err = normalizer.normalize(raw("  ", "1.0"), &origin).unwrap_err();
        assert!(matches!(err, Error::MissingField("name")));

        let mut no_version = RawPackage::new();
        no_version.set(keys::NAME, "foo");
        let err = normalizer.normalize(no_version, &origin).unwrap_err();
        assert!(matches!(err, Error::MissingField("version")));
    }

    #[test]
    fn test_version_split_and_revision() {
        let pkg = Normalizer::new()
            .normalize(raw("vorbis-tools", "1.4.0_10,3"), &origin(VersionScheme::PortsSuffix))
            .unwrap();
        assert_eq!(pkg.version, "1.4.0");
        assert_eq!(pkg.origversion.as_deref(), Some("1.4.0_10,3"));

        let mut with_revision = raw("pv", "1.6.6");
        with_revision.set(keys::REVISION, "1");
        let pkg = Normalizer::new()
            .normalize(
                with_revision,
                &origin(VersionScheme::SeparateRevision { separator: "nb" }),
            )
            .unwrap();
        assert_eq!(pkg.origversion.as_deref(), Some("1.6.6nb1"));
        assert!(pkg.extrafields.is_empty());
    }

    #[test]
    fn test_maintainers_and_fallback() {
        let mut declared = raw("a52dec", "0.7.4");
        declared.extend(
            keys::MAINTAINERS,
            [
                "Maintainers <PKG@lists.example.org>",
                "Someone <b@example.org>, Other <pkg@lists.example.org>",
            ],
        );
        let mut origin = origin(VersionScheme::Verbatim);
        origin.fallback_maintainer = Some("fallback@example.org");

        let pkg = Normalizer::new().normalize(declared, &origin).unwrap();
        assert_eq!(pkg.maintainers, vec!["b@example.org", "pkg@lists.example.org"]);

        let pkg = Normalizer::new().normalize(raw("away", "0.9.5"), &origin).unwrap();
        assert_eq!(pkg.maintainers, vec!["fallback@example.org"]);
    }

    #[test]
    fn test_lists_are_deduplicated() {
        let mut raw = raw("foo", "1.0");
        raw.extend(keys::LICENSES, ["GPL-2", "MIT", "GPL-2"])
            .extend(keys::DOWNLOADS, ["http://b/x.tgz http://a/x.tgz", "http://b/x.tgz"]);

        let pkg = Normalizer::new()
            .normalize(raw, &origin(VersionScheme::Verbatim))
            .unwrap();
        assert_eq!(pkg.licenses, vec!["GPL-2", "MIT"]);
        assert_eq!(pkg.downloads, vec!["http://a/x.tgz", "http://b/x.tgz"]);
    }

    #[test]
    fn test_flags_and_extrafields() {
        let mut raw = raw("Acme-Brainfuck", "1.1.1");
        raw.flag(keys::SHADOW, true)
            .flag(keys::IGNORE, false)
            .set("origin", "audio/vorbis-tools")
            .set("words", vec!["a".to_string(), "b".to_string()]);

        let pkg = Normalizer::new()
            .normalize(raw, &origin(VersionScheme::Verbatim))
            .unwrap();
        assert!(pkg.shadow);
        assert!(!pkg.ignore);
        assert_eq!(pkg.extrafields["origin"], "audio/vorbis-tools");
        assert_eq!(pkg.extrafields["words"], "a b");
    }

    #[test]
    fn test_version_without_digits_is_ignored() {
        let pkg = Normalizer::new()
            .normalize(raw("foo", "latest"), &origin(VersionScheme::Verbatim))
            .unwrap();
        assert!(pkg.ignore);
        assert_eq!(pkg.version, "latest");
    }

    #[test]
    fn test_name_mapper_hook() {
        struct Lowercase;
        impl NameMapper for Lowercase {
            fn effname(&self, _family: Family, name: &str) -> Option<String> {
                Some(name.to_lowercase())
            }
        }

        let pkg = Normalizer::with_name_mapper(Lowercase)
            .normalize(raw("AutoFS", "5.0.5"), &origin(VersionScheme::Verbatim))
            .unwrap();
        assert_eq!(pkg.effname.as_deref(), Some("autofs"));
    }

    #[test]
    fn test_alias_copies_listed_keys_only() {
        let fields: RawFields = [
            ("PRGNAM".to_string(), RawValue::from("kforth")),
            ("MD5SUM".to_string(), RawValue::from("abc")),
        ]
        .into_iter()
        .collect();

        let raw = RawPackage::alias(&fields, &[("PRGNAM", keys::NAME), ("VERSION", keys::VERSION)]);
        assert_eq!(raw.first(keys::NAME), Some("kforth"));
        assert!(raw.get(keys::VERSION).is_none());
        assert!(raw.get("MD5SUM").is_none());
    }
}

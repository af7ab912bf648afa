// src/variant.rs

//! Variant/architecture resolution
//!
//! Some formats declare a generic key plus qualifier-suffixed variants of
//! it, for example a SlackBuild's `DOWNLOAD` and `DOWNLOAD_x86_64`. A
//! variant value may also be a support-status marker instead of URLs:
//! `UNSUPPORTED` means the package does not build for that qualifier,
//! `UNTESTED` means it was never tried there.
//!
//! Resolution for one qualifier:
//! 1. a qualified variant that is not unsupported and carries values wins,
//!    replacing the generic value
//! 2. otherwise the generic value applies, unless it is unsupported itself
//! 3. otherwise nothing applies
//!
//! Untested never suppresses a value. Resolving for several qualifiers
//! resolves each one independently and unions the results; the generic
//! value only takes part where a qualifier falls back to it. Resolving for
//! the declared qualifiers also covers the unqualified target.

use crate::extract::{RawFields, RawValue};
use std::collections::BTreeMap;

/// Support status attached to a variant value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariantStatus {
    #[default]
    Supported,
    Untested,
    Unsupported,
}

/// One declared value of a variant field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Variant {
    pub values: Vec<String>,
    pub status: VariantStatus,
}

impl Variant {
    /// A supported variant with the given values
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            status: VariantStatus::Supported,
        }
    }

    /// A variant marked as not supported
    pub fn unsupported() -> Self {
        Self {
            values: Vec::new(),
            status: VariantStatus::Unsupported,
        }
    }

    /// A variant marked as untested, optionally still carrying values
    pub fn untested<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: VariantStatus::Untested,
            ..Self::new(values)
        }
    }

    fn is_usable(&self) -> bool {
        self.status != VariantStatus::Unsupported && !self.values.is_empty()
    }
}

/// Marker words that turn a raw value into a status
#[derive(Debug, Clone, Copy)]
pub struct StatusMarkers {
    pub unsupported: &'static [&'static str],
    pub untested: &'static [&'static str],
}

impl StatusMarkers {
    /// Markers used in SlackBuild `.info` files
    pub const SLACKBUILDS: StatusMarkers = StatusMarkers {
        unsupported: &["UNSUPPORTED"],
        untested: &["UNTESTED"],
    };

    /// Classify a raw value; blank values count as not declared
    pub fn classify(&self, raw: &RawValue) -> Option<Variant> {
        if raw.is_blank() {
            return None;
        }

        let words = raw.words();
        let is_marker = |markers: &[&str]| words.len() == 1 && markers.contains(&words[0]);

        if is_marker(self.unsupported) {
            Some(Variant::unsupported())
        } else if is_marker(self.untested) {
            Some(Variant::untested(Vec::<String>::new()))
        } else {
            Some(Variant::new(words))
        }
    }
}

/// A logical field made of a generic value and qualified variants
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantField {
    pub generic: Option<Variant>,
    pub qualified: BTreeMap<String, Variant>,
}

impl VariantField {
    /// Collect `key` and every `key<separator><qualifier>` from raw fields
    pub fn from_fields(
        fields: &RawFields,
        key: &str,
        separator: char,
        markers: &StatusMarkers,
    ) -> Self {
        let prefix = format!("{}{}", key, separator);
        let mut field = VariantField {
            generic: fields.get(key).and_then(|raw| markers.classify(raw)),
            qualified: BTreeMap::new(),
        };

        for (raw_key, raw) in fields.range(prefix.clone()..) {
            let Some(qualifier) = raw_key.strip_prefix(&prefix) else {
                break;
            };
            if qualifier.is_empty() {
                continue;
            }
            if let Some(variant) = markers.classify(raw) {
                field.qualified.insert(qualifier.to_string(), variant);
            }
        }

        field
    }

    /// Qualifiers declared for this field, in sorted order
    pub fn qualifiers(&self) -> impl Iterator<Item = &str> {
        self.qualified.keys().map(String::as_str)
    }

    /// Values applying when no qualifier is in effect
    pub fn resolve_generic(&self) -> Vec<String> {
        match &self.generic {
            Some(variant) if variant.is_usable() => variant.values.clone(),
            _ => Vec::new(),
        }
    }

    /// Values applying to one qualifier
    pub fn resolve(&self, qualifier: &str) -> Vec<String> {
        match self.qualified.get(qualifier) {
            Some(variant) if variant.is_usable() => variant.values.clone(),
            _ => self.resolve_generic(),
        }
    }

    /// Union of the values applying to each given qualifier
    ///
    /// Each qualifier's values follow in the order given; duplicates are
    /// dropped.
    pub fn resolve_all<I, S>(&self, qualifiers: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = Vec::new();
        for qualifier in qualifiers {
            union_into(&mut resolved, self.resolve(qualifier.as_ref()));
        }
        resolved
    }

    /// Union over the unqualified target and every declared qualifier
    pub fn resolve_declared(&self) -> Vec<String> {
        let mut resolved = self.resolve_generic();
        union_into(&mut resolved, self.resolve_all(self.qualifiers()));
        resolved
    }
}

fn union_into(resolved: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        if !resolved.contains(&value) {
            resolved.push(value);
        }
    }
}

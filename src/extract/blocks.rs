// src/extract/blocks.rs

//! Marker-delimited field blocks
//!
//! Two shapes share one tokenizer:
//! - Arch `desc` files: a `%KEY%` header line followed by one value per
//!   line until a blank line
//! - GoboLinux `Description` files: `[Key] value` with the value possibly
//!   running over the following lines

use super::{RawFields, RawValue};

/// Describes how block headers are written
#[derive(Debug, Clone, Copy)]
pub struct BlockMarkers {
    pub open: char,
    pub close: char,
    /// The value starts on the header line itself
    pub inline: bool,
}

impl BlockMarkers {
    /// `%NAME%` headers with values on the following lines
    pub const PERCENT: BlockMarkers = BlockMarkers {
        open: '%',
        close: '%',
        inline: false,
    };

    /// `[Name] value` headers
    pub const BRACKET: BlockMarkers = BlockMarkers {
        open: '[',
        close: ']',
        inline: true,
    };

    /// Split a header line into key and the text after the header
    fn header<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = line.strip_prefix(self.open)?;
        let end = rest.find(self.close)?;
        let key = &rest[..end];
        let after = &rest[end + self.close.len_utf8()..];

        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        if !self.inline && !after.trim().is_empty() {
            return None;
        }

        Some((key, after.trim()))
    }
}

/// Parse marker-delimited blocks into a field map
///
/// Non-inline blocks always produce list values; inline blocks produce a
/// single string with continuation lines joined by spaces. A repeated
/// header appends to the earlier value.
pub fn parse_blocks(text: &str, markers: &BlockMarkers) -> RawFields {
    let mut fields = RawFields::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some((key, rest)) = markers.header(trimmed) {
            let key = key.to_string();
            if markers.inline {
                match fields.get_mut(&key) {
                    Some(existing) => existing.push(rest.to_string()),
                    None => {
                        fields.insert(key.clone(), RawValue::Single(rest.to_string()));
                    }
                }
            } else {
                fields
                    .entry(key.clone())
                    .or_insert_with(|| RawValue::List(Vec::new()));
            }
            current = Some(key);
            continue;
        }

        if trimmed.is_empty() {
            if !markers.inline {
                current = None;
            }
            continue;
        }

        let Some(value) = current.as_ref().and_then(|key| fields.get_mut(key)) else {
            continue;
        };

        match value {
            RawValue::List(items) if !markers.inline => items.push(trimmed.to_string()),
            RawValue::Single(text) => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(trimmed);
            }
            RawValue::List(items) => {
                if let Some(last) = items.last_mut() {
                    last.push(' ');
                    last.push_str(trimmed);
                }
            }
        }
    }

    fields
}

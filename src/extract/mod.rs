// src/extract/mod.rs

//! Field extraction primitives
//!
//! Tokenizers that turn the text of a package unit into a flat
//! key → value(s) mapping without knowing what any key means.
//!
//! The lexical shape of a format is described by a [`Convention`]:
//! - Shell assignment (`KEY="value" \` continuation, `KEY=( a b )` arrays)
//! - Makefile assignment (`KEY= value`, `KEY+= more`, `KEY?= default`)
//! - Plain `KEY=value` lines (Gentoo md5-cache)
//!
//! Marker-delimited blocks (`%KEY%`, `[Key]`) live in [`blocks`], blank-line
//! paragraphs in [`stanza`], contact extraction in [`contacts`].
//!
//! Qualifier-suffixed keys such as `DOWNLOAD_x86_64` are kept as distinct
//! raw keys; interpreting them is the job of [`crate::variant`].

pub mod blocks;
pub mod contacts;
pub mod stanza;

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A raw value: one string, or an ordered sequence of strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Single(String),
    List(Vec<String>),
}

impl RawValue {
    /// First string of the value, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            RawValue::Single(value) => Some(value.as_str()),
            RawValue::List(items) => items.first().map(String::as_str),
        }
    }

    /// All strings of the value, in declaration order
    pub fn items(&self) -> Vec<&str> {
        match self {
            RawValue::Single(value) => vec![value.as_str()],
            RawValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// All whitespace-separated words across every item
    pub fn words(&self) -> Vec<&str> {
        self.items()
            .into_iter()
            .flat_map(str::split_whitespace)
            .collect()
    }

    /// Items joined with a single space
    pub fn joined(&self) -> String {
        match self {
            RawValue::Single(value) => value.clone(),
            RawValue::List(items) => items.join(" "),
        }
    }

    /// True when no item carries any non-whitespace text
    pub fn is_blank(&self) -> bool {
        self.items().iter().all(|item| item.trim().is_empty())
    }

    /// Append a string, turning a single value into a list
    pub fn push(&mut self, value: String) {
        match self {
            RawValue::Single(first) => {
                let first = std::mem::take(first);
                *self = RawValue::List(vec![first, value]);
            }
            RawValue::List(items) => items.push(value),
        }
    }

    /// Concatenate another value onto this one (Makefile `+=` semantics)
    fn append(&mut self, other: RawValue) {
        match other {
            RawValue::Single(more) => match self {
                RawValue::Single(existing) if existing.is_empty() => *existing = more,
                RawValue::Single(existing) => {
                    if !more.is_empty() {
                        existing.push(' ');
                        existing.push_str(&more);
                    }
                }
                RawValue::List(items) => items.push(more),
            },
            RawValue::List(more) => {
                if let RawValue::Single(existing) = self {
                    let first = std::mem::take(existing);
                    let items = if first.is_empty() { Vec::new() } else { vec![first] };
                    *self = RawValue::List(items);
                }
                if let RawValue::List(items) = self {
                    items.extend(more);
                }
            }
        }
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Single(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for RawValue {
    fn from(items: Vec<String>) -> Self {
        RawValue::List(items)
    }
}

/// Flat key → value(s) mapping produced by the tokenizers
pub type RawFields = BTreeMap<String, RawValue>;

/// How a logical value continues onto the next physical line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Every physical line stands alone
    None,
    /// A trailing backslash joins the next line
    Backslash,
}

/// Descriptor of a lexical assignment convention
#[derive(Debug, Clone, Copy)]
pub struct Convention {
    /// Assignment operators, longest first
    pub operators: &'static [&'static str],
    /// Comment marker, if the format has comments
    pub comment: Option<char>,
    pub continuation: Continuation,
    /// A comment ending in a backslash swallows the next line (make)
    pub continue_comments: bool,
    /// Strip shell quoting from values
    pub unquote: bool,
    /// Accept shell arrays `KEY=( ... )`
    pub arrays: bool,
    /// Malformed lines are errors rather than skipped
    pub strict: bool,
}

impl Convention {
    /// Shell variable assignment (SlackBuild `.info`, GoboLinux `Recipe`)
    pub const SHELL: Convention = Convention {
        operators: &["+=", "="],
        comment: Some('#'),
        continuation: Continuation::Backslash,
        continue_comments: false,
        unquote: true,
        arrays: true,
        strict: false,
    };

    /// Makefile variable assignment (pkgsrc)
    pub const MAKEFILE: Convention = Convention {
        operators: &["+=", "?=", ":=", "!=", "="],
        comment: Some('#'),
        continuation: Continuation::Backslash,
        continue_comments: true,
        unquote: false,
        arrays: false,
        strict: false,
    };

    /// Bare `KEY=value` lines where everything after `=` is the value
    pub const KEY_VALUE: Convention = Convention {
        operators: &["="],
        comment: None,
        continuation: Continuation::None,
        continue_comments: false,
        unquote: false,
        arrays: false,
        strict: false,
    };

    /// Same convention, but malformed lines are reported as errors
    pub const fn strict(self) -> Convention {
        Convention {
            strict: true,
            ..self
        }
    }

    fn is_comment(&self, line: &str) -> bool {
        self.comment
            .is_some_and(|marker| line.trim_start().starts_with(marker))
    }

    /// Turn the text right of the operator into a raw value
    fn clean_value(&self, value: &str) -> RawValue {
        let value = match self.comment {
            Some(marker) => strip_inline_comment(value, marker),
            None => value,
        }
        .trim();

        if self.arrays
            && let Some(inner) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')'))
        {
            return RawValue::List(shell_words(inner));
        }

        if self.unquote {
            RawValue::Single(unquote_shell(value))
        } else {
            RawValue::Single(value.to_string())
        }
    }
}

/// Parse assignment lines into a field map
///
/// Later assignments override earlier ones, `+=` appends and `?=` only
/// assigns an unset key. Lines that are not assignments (function bodies,
/// `.include` directives, stray text) are skipped unless the convention is
/// strict.
pub fn parse_assignments(text: &str, convention: &Convention) -> Result<RawFields> {
    let mut fields = RawFields::new();

    for (number, line) in logical_lines(text, convention) {
        let trimmed = line.trim();
        if trimmed.is_empty() || convention.is_comment(trimmed) {
            continue;
        }

        let Some((key, operator, value)) = split_assignment(trimmed, convention) else {
            if convention.strict {
                return Err(Error::ParseError(format!(
                    "line {}: not an assignment: {}",
                    number, trimmed
                )));
            }
            continue;
        };

        let value = convention.clean_value(value);
        match operator {
            "+=" => match fields.get_mut(key) {
                Some(existing) => existing.append(value),
                None => {
                    fields.insert(key.to_string(), value);
                }
            },
            "?=" => {
                fields.entry(key.to_string()).or_insert(value);
            }
            // command substitution, never evaluated
            "!=" => {}
            _ => {
                fields.insert(key.to_string(), value);
            }
        }
    }

    Ok(fields)
}

/// Split `KEY <op> value` into its parts
pub(crate) fn split_assignment<'a>(
    line: &'a str,
    convention: &Convention,
) -> Option<(&'a str, &'static str, &'a str)> {
    let line = if convention.unquote {
        line.strip_prefix("export ").unwrap_or(line).trim_start()
    } else {
        line
    };

    let key_end = line.find(|c: char| !is_key_char(c)).unwrap_or(line.len());
    if key_end == 0 {
        return None;
    }

    let (key, rest) = line.split_at(key_end);
    let rest = rest.trim_start();
    convention
        .operators
        .iter()
        .find(|operator| rest.starts_with(**operator))
        .map(|operator| (key, *operator, rest[operator.len()..].trim()))
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Join physical lines into logical lines, remembering where each starts
fn logical_lines(text: &str, convention: &Convention) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<Pending> = None;

    for (index, raw) in text.lines().enumerate() {
        let mut line = raw.trim_end();

        // an unbalanced quote stops at the next assignment
        if pending.as_ref().is_some_and(|open| open.quoted) && starts_assignment(line, convention) {
            lines.extend(pending.take().map(|open| (open.start, open.buffer)));
        }

        let (start, mut buffer) = pending
            .take()
            .map_or((index + 1, String::new()), |open| (open.start, open.buffer));

        if buffer.is_empty() && !convention.continue_comments && convention.is_comment(line) {
            lines.push((start, line.to_string()));
            continue;
        }

        let backslash = convention.continuation == Continuation::Backslash
            && line.ends_with('\\')
            && !line.ends_with("\\\\");
        if backslash {
            line = &line[..line.len() - 1];
        }

        if buffer.is_empty() {
            buffer.push_str(line);
        } else {
            buffer.push(' ');
            buffer.push_str(line.trim_start());
        }

        let quoted =
            !backslash && convention.unquote && is_unterminated(&buffer, convention.arrays);
        if backslash || quoted {
            pending = Some(Pending {
                start,
                buffer,
                quoted,
            });
        } else {
            lines.push((start, buffer));
        }
    }

    lines.extend(pending.map(|open| (open.start, open.buffer)));
    lines
}

/// A logical line still waiting for its continuation
struct Pending {
    start: usize,
    buffer: String,
    /// Held open by a quote or array rather than a backslash
    quoted: bool,
}

/// Whether a physical line starts a new assignment at column zero
fn starts_assignment(line: &str, convention: &Convention) -> bool {
    !line.starts_with(char::is_whitespace) && split_assignment(line, convention).is_some()
}

/// Whether a shell line leaves a quote or array open
fn is_unterminated(text: &str, arrays: bool) -> bool {
    let mut quote: Option<char> = None;
    let mut depth = 0i32;
    let mut previous = ' ';
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), _) => {}
            (_, '\\') => {
                chars.next();
            }
            (Some('"'), '"') => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') if previous.is_whitespace() => break,
            (None, '(') if arrays => depth += 1,
            (None, ')') if arrays => depth -= 1,
            _ => {}
        }
        previous = c;
    }

    quote.is_some() || depth > 0
}

/// Cut a trailing comment that starts outside quotes after whitespace
fn strip_inline_comment(value: &str, marker: char) -> &str {
    let mut quote: Option<char> = None;
    let mut previous = ' ';

    for (index, c) in value.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == marker && previous.is_whitespace() => return &value[..index],
            None => {}
        }
        previous = c;
    }

    value
}

/// Remove shell quoting, keeping whitespace as written
pub fn unquote_shell(value: &str) -> String {
    scan_shell(value, false).concat()
}

/// Split a shell string into words, honouring quotes and escapes
pub fn shell_words(value: &str) -> Vec<String> {
    scan_shell(value, true)
}

fn scan_shell(value: &str, split: bool) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('"'), '"') => quote = None,
            (Some('"') | None, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                in_word = true;
            }
            (Some(_), _) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, _) if split && c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word || (!split && !current.is_empty()) {
        words.push(current);
    }

    words
}

/// Expand `${NAME}` and `$NAME` references
///
/// References the lookup cannot resolve are left in place verbatim, so
/// callers can detect them by searching for `$`.
pub fn expand_variables<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(position) = rest.find('$') {
        expanded.push_str(&rest[..position]);
        let after = &rest[position + 1..];

        if let Some(inner) = after.strip_prefix('{') {
            if let Some(end) = inner.find('}') {
                let name = &inner[..end];
                match lookup(name) {
                    Some(resolved) => expanded.push_str(&resolved),
                    None => {
                        expanded.push_str("${");
                        expanded.push_str(name);
                        expanded.push('}');
                    }
                }
                rest = &inner[end + 1..];
                continue;
            }
        } else {
            let length = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if length > 0 {
                let name = &after[..length];
                match lookup(name) {
                    Some(resolved) => expanded.push_str(&resolved),
                    None => {
                        expanded.push('$');
                        expanded.push_str(name);
                    }
                }
                rest = &after[length..];
                continue;
            }
        }

        expanded.push('$');
        rest = after;
    }

    expanded.push_str(rest);
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(fields: &RawFields, key: &str) -> String {
        fields.get(key).and_then(RawValue::first).unwrap_or_default().to_string()
    }

    #[test]
    fn test_shell_assignment_unquotes() {
        let text = "PRGNAM=\"baudline\"\nVERSION='1.08'\nREQUIRES=\"\"\n";
        let fields = parse_assignments(text, &Convention::SHELL).unwrap();

        assert_eq!(single(&fields, "PRGNAM"), "baudline");
        assert_eq!(single(&fields, "VERSION"), "1.08");
        assert_eq!(single(&fields, "REQUIRES"), "");
    }

    #[test]
    fn test_shell_backslash_continuation() {
        let text = "DOWNLOAD=\"http://a/one.tar.gz \\\n          http://a/two.iso\"\nMD5SUM=\"x\"\n";
        let fields = parse_assignments(text, &Convention::SHELL).unwrap();

        assert_eq!(
            fields["DOWNLOAD"].words(),
            vec!["http://a/one.tar.gz", "http://a/two.iso"]
        );
        assert_eq!(single(&fields, "MD5SUM"), "x");
    }

    #[test]
    fn test_shell_multiline_quote_without_backslash() {
        let text = "url=\"http://a/b.tar.gz\nhttp://a/c.tar.gz\"\nother=1\n";
        let fields = parse_assignments(text, &Convention::SHELL).unwrap();

        assert_eq!(fields["url"].words().len(), 2);
        assert_eq!(single(&fields, "other"), "1");
    }

    #[test]
    fn test_shell_arrays_span_lines() {
        let text = "urls=(\n  \"http://a/one.tar.gz\"\n  'http://a/two.tar.gz'\n)\nrecipe_type=configure\n";
        let fields = parse_assignments(text, &Convention::SHELL).unwrap();

        assert_eq!(
            fields["urls"],
            RawValue::List(vec![
                "http://a/one.tar.gz".to_string(),
                "http://a/two.tar.gz".to_string()
            ])
        );
        assert_eq!(single(&fields, "recipe_type"), "configure");
    }

    #[test]
    fn test_shell_comments_and_noise_skipped() {
        let text = "# Recipe for foo \\\nname=foo # trailing\nif [ -d x ]\nthen\nfi\n";
        let fields = parse_assignments(text, &Convention::SHELL).unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(single(&fields, "name"), "foo");
    }

    #[test]
    fn test_unbalanced_quote_stops_at_next_assignment() {
        let text = "\
compile_version=1.8.3
cat <<EOF > notes
don't forget the daemon
EOF
url=\"http://a/autofs-$v.tar.bz2\"
recipe_type=configure
";
        let fields = parse_assignments(text, &Convention::SHELL).unwrap();

        assert_eq!(single(&fields, "url"), "http://a/autofs-$v.tar.bz2");
        assert_eq!(single(&fields, "recipe_type"), "configure");
        assert_eq!(single(&fields, "compile_version"), "1.8.3");
    }

    #[test]
    fn test_makefile_comment_continuation() {
        let text = "# disabled for now \\\nCOMMENT=\tswallowed by the comment\nDISTNAME=\tpv-1.6.6\n";
        let fields = parse_assignments(text, &Convention::MAKEFILE).unwrap();

        assert!(!fields.contains_key("COMMENT"));
        assert_eq!(single(&fields, "DISTNAME"), "pv-1.6.6");
    }

    #[test]
    fn test_qualified_keys_stay_distinct() {
        let text = "DOWNLOAD=\"a\"\nDOWNLOAD_x86_64=\"b\"\n";
        let fields = parse_assignments(text, &Convention::SHELL).unwrap();

        assert_eq!(single(&fields, "DOWNLOAD"), "a");
        assert_eq!(single(&fields, "DOWNLOAD_x86_64"), "b");
    }

    #[test]
    fn test_makefile_operators() {
        let text = "\
DISTNAME=\tpv-1.6.6
CATEGORIES=\tsysutils
CATEGORIES+=\tmisc
EXTRACT_SUFX?=\t.tar.bz2
EXTRACT_SUFX?=\t.zip
UNAME!=\tuname -s
COMMENT=\tMonitor data # through a pipe
HOMEPAGE=\thttp://example.org/#top

.include \"../../mk/bsd.pkg.mk\"
";
        let fields = parse_assignments(text, &Convention::MAKEFILE).unwrap();

        assert_eq!(single(&fields, "DISTNAME"), "pv-1.6.6");
        assert_eq!(single(&fields, "CATEGORIES"), "sysutils misc");
        assert_eq!(single(&fields, "EXTRACT_SUFX"), ".tar.bz2");
        assert_eq!(single(&fields, "COMMENT"), "Monitor data");
        assert_eq!(single(&fields, "HOMEPAGE"), "http://example.org/#top");
        assert!(!fields.contains_key("UNAME"));
    }

    #[test]
    fn test_key_value_keeps_everything() {
        let text = "DESCRIPTION=Chromium B.S.U. - an arcade game # yes\nSLOT=0\n";
        let fields = parse_assignments(text, &Convention::KEY_VALUE).unwrap();

        assert_eq!(
            single(&fields, "DESCRIPTION"),
            "Chromium B.S.U. - an arcade game # yes"
        );
    }

    #[test]
    fn test_strict_rejects_garbage() {
        let text = "KEY=value\nthis is not an assignment\n";

        assert!(parse_assignments(text, &Convention::KEY_VALUE).is_ok());
        let result = parse_assignments(text, &Convention::KEY_VALUE.strict());
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_shell_words() {
        assert_eq!(
            shell_words(r#"one "two three" 'four' fi\ ve"#),
            vec!["one", "two three", "four", "fi ve"]
        );
        assert_eq!(unquote_shell(r#""a  b"c"#), "a  bc");
    }

    #[test]
    fn test_expand_variables() {
        let lookup = |name: &str| match name {
            "v" | "version" => Some("5.0.5".to_string()),
            _ => None,
        };

        assert_eq!(expand_variables("autofs-$v.tar.bz2", lookup), "autofs-5.0.5.tar.bz2");
        assert_eq!(expand_variables("autofs-${version}.tar", lookup), "autofs-5.0.5.tar");
        assert_eq!(expand_variables("${MASTER_SITE_GNU:=pv/}", lookup), "${MASTER_SITE_GNU:=pv/}");
        assert_eq!(expand_variables("$httpMirror/x", lookup), "$httpMirror/x");
        assert_eq!(expand_variables("cost $ 5", lookup), "cost $ 5");
    }
}

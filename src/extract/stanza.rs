// src/extract/stanza.rs

//! Blank-line paragraph splitting
//!
//! Debian `Sources` files are sequences of `Key: value` paragraphs
//! separated by blank lines. Fields are deserialized per paragraph with
//! `rfc822_like`; splitting first gives every paragraph its own unit and
//! a line number to report.

/// One blank-line delimited paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// 1-based line number of the paragraph's first line
    pub line: usize,
    pub text: String,
}

/// Split text into paragraphs at blank lines
pub fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            if let Some(paragraph) = current.take() {
                paragraphs.push(paragraph);
            }
            continue;
        }

        let paragraph = current.get_or_insert_with(|| Paragraph {
            line: index + 1,
            text: String::new(),
        });
        paragraph.text.push_str(line);
        paragraph.text.push('\n');
    }

    if let Some(paragraph) = current {
        paragraphs.push(paragraph);
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCES: &str = "\
Package: a52dec
Version: 0.7.4-18
Uploaders: Dmitrij Ledkov <dmitrij.ledkov@ubuntu.com>,
 Reinhard Tartler <siretart@tauware.de>
Files:
 44b15ed1c8d0eb18e6b8d5e1cd3fab4c 1823 a52dec_0.7.4-18.dsc
 0fc4a3a9a4b0d2ab4fd1d1cab4b7d9a8 5048 a52dec_0.7.4-18.debian.tar.xz


Package: zlib
Version: 1:1.2.8.dfsg-4
";

    #[test]
    fn test_split_paragraphs() {
        let paragraphs = split_paragraphs(SOURCES);

        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].line, 1);
        assert_eq!(paragraphs[1].line, 10);
        assert!(paragraphs[0].text.ends_with("debian.tar.xz\n"));
        assert!(paragraphs[1].text.starts_with("Package: zlib"));
    }

    #[test]
    fn test_no_paragraphs() {
        assert!(split_paragraphs("\n  \n").is_empty());
    }
}

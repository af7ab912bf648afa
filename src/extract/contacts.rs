// src/extract/contacts.rs

//! Maintainer contact extraction
//!
//! Upstream formats write maintainers as free text: `Name <mail>` lists
//! (Debian, Arch), bare addresses (FreeBSD, SlackBuilds, pkgsrc) or
//! addresses inside XML (Gentoo). Everything is reduced to lowercased
//! addresses.

/// Extract lowercased contact addresses from a maintainer string
///
/// Addresses inside angle brackets win; without brackets, any
/// comma/whitespace-separated token containing `@` is taken. Text without
/// an address (a bare name, "Unknown Packager") yields nothing.
pub fn extract_maintainers(text: &str) -> Vec<String> {
    let mut found = Vec::new();

    let mut rest = text;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            break;
        };
        let candidate = after[..close].trim();
        if candidate.contains('@') {
            push_unique(&mut found, candidate);
        }
        rest = &after[close + 1..];
    }

    if found.is_empty() {
        for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
            let token = token.trim_matches(|c: char| matches!(c, '<' | '>' | '(' | ')' | '"' | '\''));
            if token.contains('@') && !token.starts_with('@') && !token.ends_with('@') {
                push_unique(&mut found, token);
            }
        }
    }

    found
}

fn push_unique(found: &mut Vec<String>, address: &str) {
    let address = address.to_lowercase();
    if !found.contains(&address) {
        found.push(address);
    }
}

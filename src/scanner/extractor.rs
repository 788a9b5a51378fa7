//! Regex extraction of translation keys from source text.

use regex::Regex;

use super::Candidate;
use crate::types::JSON_GROUP;

/// Finds string-literal first arguments of translation helper calls.
#[derive(Debug, Clone)]
pub struct KeyExtractor {
    /// Call pattern. Group 1 is whatever glues the name to a longer
    /// identifier, group 2 a single-quoted and group 3 a double-quoted
    /// argument.
    pattern: Regex,
}

impl KeyExtractor {
    pub fn new(functions: &[String]) -> Result<Self, regex::Error> {
        let mut names: Vec<&str> = functions.iter().map(String::as_str).collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));
        let alternatives = names.iter().map(|name| regex::escape(name)).collect::<Vec<_>>().join("|");

        let pattern = format!(
            r#"(->|::|[\w$@])?(?:{alternatives})\(\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*[),]"#
        );
        Ok(Self { pattern: Regex::new(&pattern)? })
    }

    /// Candidates in order of appearance, duplicates included.
    #[must_use]
    pub fn extract(&self, source: &str) -> Vec<Candidate> {
        self.pattern
            .captures_iter(source)
            .filter_map(|captures| {
                // `->trans(`, `Foo::trans(` and `my__(` are not helper calls.
                if captures.get(1).is_some() {
                    return None;
                }
                if let Some(single) = captures.get(2) {
                    return classify(&unescape(single.as_str(), '\''));
                }
                let double = captures.get(3)?.as_str();
                if double.contains('$') {
                    tracing::debug!("Skipping interpolated key \"{}\"", double);
                    return None;
                }
                classify(&unescape(double, '"'))
            })
            .collect()
    }
}

/// Resolves `\<quote>` and `\\` inside a literal.
fn unescape(literal: &str, quote: char) -> String {
    let mut text = String::with_capacity(literal.len());
    let mut chars = literal.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && (next == quote || next == '\\')
        {
            text.push(next);
            chars.next();
        } else {
            text.push(c);
        }
    }
    text
}

/// Maps a helper argument to its row address.
///
/// `group.key` and `sub/group.key` address group files, `package::group.key`
/// a vendor group. Anything with whitespace, or without a usable group part,
/// is a key of the JSON namespace.
#[must_use]
pub fn classify(text: &str) -> Option<Candidate> {
    if text.trim().is_empty() {
        return None;
    }

    if !text.contains(char::is_whitespace) {
        if let Some((package, rest)) = text.split_once("::") {
            if is_group_name(package)
                && !package.contains('/')
                && let Some((group, key)) = split_group_key(rest)
            {
                return Some(Candidate::new(&format!("vendor/{package}/{group}"), key));
            }
        } else if let Some((group, key)) = split_group_key(text) {
            return Some(Candidate::new(group, key));
        }
    }

    Some(Candidate::new(JSON_GROUP, text))
}

/// `group.key` with a usable group name and key.
fn split_group_key(text: &str) -> Option<(&str, &str)> {
    let (group, key) = text.split_once('.')?;
    let usable = is_group_name(group) && !key.is_empty() && !key.starts_with('.') && !key.ends_with('.');
    usable.then_some((group, key))
}

/// Group names are relative paths of `[A-Za-z0-9_-]` segments.
fn is_group_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.ends_with('/')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'))
}

//! Variable placeholder scanner
//!
//! Finds template-variable references inside arbitrary text. Three syntaxes
//! coexist and are matched by a single pattern in one pass:
//!
//! ```text
//! $name                   bare sigil
//! [[name]] [[name:fmt]]   bracket form
//! ${name} ${name.path}    brace form
//! ${name:fmt}
//! ```
//!
//! Names are `[A-Za-z0-9_]+` and case-sensitive. A name is reported whether
//! or not a matching variable exists; resolving it is the resolver's job.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::ops::Range;

lazy_static! {
    static ref VARIABLE_PATTERN: Regex = Regex::new(concat!(
        r"\$([A-Za-z0-9_]+)",
        r"|\[\[([A-Za-z0-9_]+?)(?::([A-Za-z0-9_]+))?\]\]",
        r"|\$\{([A-Za-z0-9_]+)(?:\.([^:^\}]+))?(?::([^\}]+))?\}",
    ))
    .expect("variable placeholder pattern is valid");
}

/// Which placeholder syntax matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderSyntax {
    /// `$name`
    Bare,
    /// `[[name]]` or `[[name:fmt]]`
    Bracket,
    /// `${name}`, `${name.path}` or `${name:fmt}`
    Brace,
}

/// One placeholder occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Variable name
    pub name: &'a str,
    /// Format specifier after `:`, if any
    pub format: Option<&'a str>,
    /// Field path after `.`, brace form only
    pub field_path: Option<&'a str>,
    /// Matched syntax
    pub syntax: PlaceholderSyntax,
    /// Byte range of the whole placeholder in the scanned text
    pub span: Range<usize>,
}

impl<'a> Placeholder<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        let span = caps.get(0)?.range();
        if let Some(name) = caps.get(1) {
            return Some(Self {
                name: name.as_str(),
                format: None,
                field_path: None,
                syntax: PlaceholderSyntax::Bare,
                span,
            });
        }
        if let Some(name) = caps.get(2) {
            return Some(Self {
                name: name.as_str(),
                format: caps.get(3).map(|m| m.as_str()),
                field_path: None,
                syntax: PlaceholderSyntax::Bracket,
                span,
            });
        }
        let name = caps.get(4)?;
        Some(Self {
            name: name.as_str(),
            format: caps.get(6).map(|m| m.as_str()),
            field_path: caps.get(5).map(|m| m.as_str()),
            syntax: PlaceholderSyntax::Brace,
            span,
        })
    }
}

/// Iterate over every placeholder occurrence, left to right
pub fn placeholders(text: &str) -> impl Iterator<Item = Placeholder<'_>> + '_ {
    VARIABLE_PATTERN
        .captures_iter(text)
        .filter_map(|caps| Placeholder::from_captures(&caps))
}

/// Distinct variable names referenced in `text`, in first-seen order
pub fn scan_variables(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for placeholder in placeholders(text) {
        if !names.iter().any(|n| n == placeholder.name) {
            names.push(placeholder.name.to_string());
        }
    }
    names
}

/// True if `text` references at least one variable
pub fn contains_placeholder(text: &str) -> bool {
    VARIABLE_PATTERN.is_match(text)
}

/// Rewrite every placeholder through `replace`, keeping surrounding text
///
/// `replace` returns `None` to leave the placeholder text as written.
pub fn replace_placeholders<F>(text: &str, mut replace: F) -> String
where
    F: FnMut(&Placeholder<'_>) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for placeholder in placeholders(text) {
        out.push_str(&text[last..placeholder.span.start]);
        match replace(&placeholder) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&text[placeholder.span.clone()]),
        }
        last = placeholder.span.end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_syntaxes_collapse_to_one_name() {
        let names = scan_variables("$a [[a]] ${a} ${a:regex} [[a:glob]] ${a.path}");
        assert_eq!(names, vec!["a".to_string()]);
    }

    #[test]
    fn test_first_seen_order() {
        let names = scan_variables("rate(m{x=\"${zone}\", y=\"$host\"}[$interval]) $host");
        assert_eq!(names, vec!["zone", "host", "interval"]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let names = scan_variables("$Host $host");
        assert_eq!(names, vec!["Host", "host"]);
    }

    #[test]
    fn test_placeholder_details() {
        let found: Vec<_> = placeholders("[[svc:csv]] ${pod.name:raw}").collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "svc");
        assert_eq!(found[0].format, Some("csv"));
        assert_eq!(found[0].syntax, PlaceholderSyntax::Bracket);
        assert_eq!(found[1].name, "pod");
        assert_eq!(found[1].field_path, Some("name"));
        assert_eq!(found[1].format, Some("raw"));
        assert_eq!(found[1].span, 12..27);
    }

    #[test]
    fn test_no_placeholders() {
        assert!(scan_variables("cpu_usage{host=\"a\"}").is_empty());
        assert!(!contains_placeholder("price in $ only"));
        assert!(contains_placeholder("${x}"));
    }

    #[test]
    fn test_replace_keeps_unresolved_text() {
        let out = replace_placeholders("a=$a b=${b}", |p| {
            (p.name == "a").then(|| "1".to_string())
        });
        assert_eq!(out, "a=1 b=${b}");
    }
}

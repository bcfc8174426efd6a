use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder regex"));

/// One `{key}` occurrence. Offsets are byte offsets into the scanned text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaceholderMatch<'t> {
    pub start: usize,
    pub end: usize,
    /// The whole `{...}` span, braces included.
    pub literal: &'t str,
    /// Text between the braces with surrounding whitespace removed.
    pub key: &'t str,
}

/// Left-to-right, non-overlapping placeholder matches. Each match stops at
/// the first closing brace; there is no escape syntax.
pub fn scan(text: &str) -> impl Iterator<Item = PlaceholderMatch<'_>> {
    PLACEHOLDER_RE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let inner = caps.get(1)?;
        Some(PlaceholderMatch {
            start: whole.start(),
            end: whole.end(),
            literal: whole.as_str(),
            key: inner.as_str().trim(),
        })
    })
}

pub fn contains_placeholder(text: &str) -> bool {
    PLACEHOLDER_RE.is_match(text)
}

//! Topical tag resolution for checklist lines.
//!
//! # Invariants
//! - Only the first `#word` occurrence is returned.
//! - Case is preserved; matching against mappings is case-insensitive
//!   and happens in `policy`.
//! - A previously rendered leading glyph is never read as text.

use crate::checklist::line::strip_leading_glyph;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid tag regex"));

/// Resolves the first `#word` tag of a checklist line.
///
/// Leading whitespace and a leading glyph run are skipped first. A `#`
/// glued to a preceding word (`foo#bar`) still matches.
pub fn resolve_tag(line_text: &str) -> Option<String> {
    let remainder = strip_leading_glyph(line_text.trim_start());
    TAG_RE
        .captures(remainder)
        .and_then(|caps| caps.get(1))
        .map(|tag| tag.as_str().to_string())
}

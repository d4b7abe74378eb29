//! Task-line anatomy shared by tag resolution and text reconciliation.
//!
//! A glyph is a leading run of non-ASCII characters that are neither
//! alphanumeric nor whitespace, plus keycap sequences (`1️⃣`, `#️⃣`, `*️⃣`).
//! Emoji with variation selectors or ZWJ sequences form a single run; other
//! ASCII punctuation (`[`, `-`, `*`) is markdown syntax and never part of a
//! glyph. Only glyphs this module recognizes whole may be written to a line.
//!
//! Two task-line shapes are recognized:
//! - bare: `[indent][glyph ]\[ \] text`, glyph slot at the indentation end;
//! - list: `[indent]- \[ \] [glyph ]text`, glyph slot after the checkbox
//!   markup so the line stays a markdown task item.
//!
//! A trailing `\r` (CRLF text split on `\n`) counts as end of line.

use std::ops::Range;

const KEYCAP_MARK: char = '\u{20E3}';
const VARIATION_SELECTOR: char = '\u{FE0F}';

/// Returns whether `c` can be part of a rendered glyph.
pub fn is_glyph_char(c: char) -> bool {
    !c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace()
}

/// Returns the byte length of the leading glyph run of `text`.
pub fn leading_glyph_len(text: &str) -> usize {
    let mut len = 0;
    loop {
        let rest = &text[len..];
        if let Some(keycap) = keycap_len(rest) {
            len += keycap;
            continue;
        }
        match rest.chars().next() {
            Some(c) if is_glyph_char(c) => len += c.len_utf8(),
            _ => return len,
        }
    }
}

/// Whether `glyph` is non-empty and found again whole once written.
pub fn is_recognized_glyph(glyph: &str) -> bool {
    !glyph.is_empty() && leading_glyph_len(glyph) == glyph.len()
}

/// Strips a leading glyph run from `text`.
pub fn strip_leading_glyph(text: &str) -> &str {
    &text[leading_glyph_len(text)..]
}

/// `[0-9#*]`, an optional variation selector, then the keycap mark.
fn keycap_len(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    let base = chars
        .next()
        .filter(|c| c.is_ascii_digit() || *c == '#' || *c == '*')?;
    let mut len = base.len_utf8();
    let mut next = chars.next()?;
    if next == VARIATION_SELECTOR {
        len += next.len_utf8();
        next = chars.next()?;
    }
    (next == KEYCAP_MARK).then_some(len + next.len_utf8())
}

/// Located glyph slot inside one task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphSlot {
    /// Byte offset where the glyph (or the inserted glyph) starts.
    pub start: usize,
    /// Byte range of the existing glyph plus its single separator, if any.
    pub existing: Range<usize>,
    /// `start` directly follows checkbox markup with no space (`- [ ]` at
    /// end of line); a written glyph needs a leading space.
    pub needs_separator: bool,
}

impl GlyphSlot {
    /// Returns the existing glyph text without its separator.
    pub fn existing_glyph<'a>(&self, line: &'a str) -> &'a str {
        line[self.existing.clone()].trim_end_matches(char::is_whitespace)
    }
}

/// Parsed task line: checkbox markup position and glyph slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    /// Byte range of `[ ]`, `[x]` or `[X]`.
    pub checkbox: Range<usize>,
    pub slot: GlyphSlot,
}

impl TaskLine {
    /// Whether the checkbox markup is ticked.
    pub fn is_checked(&self, line: &str) -> bool {
        &line[self.checkbox.clone()] != "[ ]"
    }
}

/// Parses `line` as a task line in either recognized shape.
pub fn parse_task_line(line: &str) -> Option<TaskLine> {
    let content = line.strip_suffix('\r').unwrap_or(line);
    let indent = content.len() - content.trim_start_matches([' ', '\t']).len();
    let body = &content[indent..];

    if let Some(marker_len) = list_marker_len(body) {
        let checkbox_start = indent + marker_len;
        let checkbox_len = checkbox_markup_len(&content[checkbox_start..])?;
        let checkbox_end = checkbox_start + checkbox_len;
        let rest = &content[checkbox_end..];
        let mut start = checkbox_end;
        if let Some(space) = rest.chars().next().filter(|c| *c == ' ' || *c == '\t') {
            start += space.len_utf8();
        } else if !rest.is_empty() {
            return None;
        }
        let mut slot = slot_at(content, start);
        slot.needs_separator = start == checkbox_end;
        return Some(TaskLine {
            checkbox: checkbox_start..checkbox_end,
            slot,
        });
    }

    let slot = slot_at(content, indent);
    let checkbox_start = slot.existing.end;
    let checkbox_len = checkbox_markup_len(&content[checkbox_start..])?;
    Some(TaskLine {
        checkbox: checkbox_start..checkbox_start + checkbox_len,
        slot,
    })
}

/// Locates the glyph slot of a task line.
///
/// Returns `None` when `line` carries no checkbox markup in either
/// recognized shape.
pub fn locate_glyph_slot(line: &str) -> Option<GlyphSlot> {
    parse_task_line(line).map(|task| task.slot)
}

fn slot_at(line: &str, start: usize) -> GlyphSlot {
    let rest = &line[start..];
    let glyph_len = leading_glyph_len(rest);
    if glyph_len == 0 {
        return GlyphSlot {
            start,
            existing: start..start,
            needs_separator: false,
        };
    }
    let separator_len = rest[glyph_len..]
        .chars()
        .next()
        .filter(|c| c.is_whitespace())
        .map_or(0, char::len_utf8);
    GlyphSlot {
        start,
        existing: start..start + glyph_len + separator_len,
        needs_separator: false,
    }
}

/// Length of a markdown list marker plus its following space, if present.
fn list_marker_len(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let marker_len = match bytes.first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(b'.') | Some(b')') if digits <= 9 => digits + 1,
                _ => return None,
            }
        }
        _ => return None,
    };
    match bytes.get(marker_len) {
        Some(b' ') | Some(b'\t') => Some(marker_len + 1),
        _ => None,
    }
}

/// Length of `[ ]`, `[x]` or `[X]` at the start of `text`.
fn checkbox_markup_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    match (bytes.first(), bytes.get(1), bytes.get(2)) {
        (Some(b'['), Some(b' ' | b'x' | b'X'), Some(b']')) => Some(3),
        _ => None,
    }
}

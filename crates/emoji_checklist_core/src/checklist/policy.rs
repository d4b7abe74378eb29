//! Glyph selection policy.
//!
//! Tag-specific mappings override global defaults. The first mapping whose
//! tag equals the resolved tag case-insensitively wins; there is no prefix
//! or partial matching. Mappings with a blank tag never match.
//!
//! A glyph the task-line parser would not recognize (blank, `:)`, `->`)
//! is never returned: a mapping glyph falls back to the global default and
//! a global default falls back to the built-in glyph.

use crate::checklist::line::is_recognized_glyph;
use crate::model::settings::{ChecklistSettings, DEFAULT_CHECKED_EMOJI, DEFAULT_UNCHECKED_EMOJI};

/// Returns the glyph for `tag` in the given checked state.
///
/// Falls back to the global default when `tag` is `None` or unmapped. An
/// unusable global default falls back to the built-in glyph, so the result
/// is always writable for validated or unvalidated settings alike.
pub fn glyph_for<'a>(tag: Option<&str>, checked: bool, settings: &'a ChecklistSettings) -> &'a str {
    if let Some(tag) = tag {
        let wanted = tag.to_lowercase();
        let mapped = settings.tag_mappings.iter().find(|mapping| {
            let key = mapping.tag.trim();
            !key.is_empty() && key.to_lowercase() == wanted
        });
        if let Some(glyph) = mapped
            .map(|mapping| mapping.glyph(checked))
            .filter(|glyph| is_recognized_glyph(glyph))
        {
            return glyph;
        }
    }
    global_glyph(checked, settings)
}

fn global_glyph(checked: bool, settings: &ChecklistSettings) -> &str {
    let configured = settings.default_glyph(checked);
    if is_recognized_glyph(configured) {
        return configured;
    }
    if checked {
        DEFAULT_CHECKED_EMOJI
    } else {
        DEFAULT_UNCHECKED_EMOJI
    }
}

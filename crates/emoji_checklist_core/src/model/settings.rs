//! Checklist settings model.
//!
//! # Responsibility
//! - Define global default glyphs and ordered tag-specific overrides.
//! - Merge partially persisted settings with defaults on load.
//! - Validate and normalize settings at the configuration boundary.
//!
//! # Invariants
//! - `unchecked_emoji` and `checked_emoji` are non-empty after `validate()`.
//! - Mapping order is significant: the first matching tag wins.
//! - Mapping tags are compared case-insensitively.
//! - Every glyph of a validated snapshot is recognized whole by the task-line
//!   parser, so reconciliation can always find and replace it.

use crate::checklist::line::is_recognized_glyph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Glyph shown for unchecked items when no tag mapping applies.
pub const DEFAULT_UNCHECKED_EMOJI: &str = "⭕";
/// Glyph shown for checked items when no tag mapping applies.
pub const DEFAULT_CHECKED_EMOJI: &str = "✅";

/// Tag-specific glyph override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEmojiMapping {
    /// Lowercased match key without the leading `#`.
    pub tag: String,
    pub unchecked_emoji: String,
    pub checked_emoji: String,
}

impl TagEmojiMapping {
    /// Creates a mapping with a normalized tag key.
    ///
    /// An input that normalizes to nothing keeps an empty tag, which
    /// `ChecklistSettings::validate` rejects.
    pub fn new(
        tag: impl AsRef<str>,
        unchecked_emoji: impl Into<String>,
        checked_emoji: impl Into<String>,
    ) -> Self {
        Self {
            tag: normalize_mapping_tag(tag.as_ref()).unwrap_or_default(),
            unchecked_emoji: unchecked_emoji.into(),
            checked_emoji: checked_emoji.into(),
        }
    }

    /// Returns the glyph for the given checked state.
    pub fn glyph(&self, checked: bool) -> &str {
        if checked {
            self.checked_emoji.as_str()
        } else {
            self.unchecked_emoji.as_str()
        }
    }
}

/// Process-wide checklist settings snapshot.
///
/// Missing fields deserialize to defaults, so data written by older
/// versions (without `tagMappings`) still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistSettings {
    pub unchecked_emoji: String,
    pub checked_emoji: String,
    pub tag_mappings: Vec<TagEmojiMapping>,
}

impl Default for ChecklistSettings {
    fn default() -> Self {
        Self {
            unchecked_emoji: DEFAULT_UNCHECKED_EMOJI.to_string(),
            checked_emoji: DEFAULT_CHECKED_EMOJI.to_string(),
            tag_mappings: Vec::new(),
        }
    }
}

impl ChecklistSettings {
    /// Creates settings with explicit global glyphs and no tag mappings.
    pub fn with_defaults(
        unchecked_emoji: impl Into<String>,
        checked_emoji: impl Into<String>,
    ) -> Self {
        Self {
            unchecked_emoji: unchecked_emoji.into(),
            checked_emoji: checked_emoji.into(),
            tag_mappings: Vec::new(),
        }
    }

    /// Appends one mapping (builder style). Does not validate.
    pub fn with_mapping(mut self, mapping: TagEmojiMapping) -> Self {
        self.tag_mappings.push(mapping);
        self
    }

    /// Returns the global default glyph for the given checked state.
    pub fn default_glyph(&self, checked: bool) -> &str {
        if checked {
            self.checked_emoji.as_str()
        } else {
            self.unchecked_emoji.as_str()
        }
    }

    /// Parses settings from the JSON plugin-data format, merging defaults.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let parsed: Self =
            serde_json::from_str(raw).map_err(|err| SettingsError::Malformed(err.to_string()))?;
        parsed.normalized()
    }

    /// Serializes settings into the JSON plugin-data format.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(|err| SettingsError::Malformed(err.to_string()))
    }

    /// Returns a normalized copy and validates it.
    ///
    /// Normalization trims global glyphs and lowercases mapping tags.
    pub fn normalized(&self) -> Result<Self, SettingsError> {
        let normalized = Self {
            unchecked_emoji: self.unchecked_emoji.trim().to_string(),
            checked_emoji: self.checked_emoji.trim().to_string(),
            tag_mappings: self
                .tag_mappings
                .iter()
                .map(|mapping| TagEmojiMapping {
                    tag: normalize_mapping_tag(&mapping.tag).unwrap_or_default(),
                    unchecked_emoji: mapping.unchecked_emoji.trim().to_string(),
                    checked_emoji: mapping.checked_emoji.trim().to_string(),
                })
                .collect(),
        };
        normalized.validate()?;
        Ok(normalized)
    }

    /// Validates configuration-boundary invariants.
    ///
    /// # Errors
    /// - `EmptyGlobalEmoji` when either global glyph is blank.
    /// - `EmptyTag` / `EmptyMappingEmoji` for incomplete mappings.
    /// - `DuplicateTag` when two mappings share a case-insensitive key.
    /// - `UnrecognizedEmoji` for glyphs such as `:)` or `->` that would be
    ///   read back as task text.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.unchecked_emoji.trim().is_empty() {
            return Err(SettingsError::EmptyGlobalEmoji("unchecked"));
        }
        if self.checked_emoji.trim().is_empty() {
            return Err(SettingsError::EmptyGlobalEmoji("checked"));
        }
        for glyph in [&self.unchecked_emoji, &self.checked_emoji] {
            check_glyph(glyph)?;
        }

        let mut seen = BTreeSet::new();
        for (index, mapping) in self.tag_mappings.iter().enumerate() {
            let Some(tag) = normalize_mapping_tag(&mapping.tag) else {
                return Err(SettingsError::EmptyTag { index });
            };
            if mapping.unchecked_emoji.trim().is_empty() || mapping.checked_emoji.trim().is_empty()
            {
                return Err(SettingsError::EmptyMappingEmoji(tag));
            }
            check_glyph(&mapping.unchecked_emoji)?;
            check_glyph(&mapping.checked_emoji)?;
            if !seen.insert(tag.clone()) {
                return Err(SettingsError::DuplicateTag(tag));
            }
        }
        Ok(())
    }
}

fn check_glyph(glyph: &str) -> Result<(), SettingsError> {
    let glyph = glyph.trim();
    if is_recognized_glyph(glyph) {
        Ok(())
    } else {
        Err(SettingsError::UnrecognizedEmoji(glyph.to_string()))
    }
}

/// Normalizes one mapping tag: trims, drops a leading `#`, lowercases.
///
/// Returns `None` when nothing remains.
pub fn normalize_mapping_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Settings validation errors raised at the configuration boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    EmptyGlobalEmoji(&'static str),
    EmptyTag { index: usize },
    EmptyMappingEmoji(String),
    DuplicateTag(String),
    /// Plain ASCII text or multi-part glyphs cannot be told apart from task
    /// text once written into a line.
    UnrecognizedEmoji(String),
    Malformed(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyGlobalEmoji(which) => write!(f, "{which} emoji cannot be empty"),
            Self::EmptyTag { index } => write!(f, "tag mapping #{index} has an empty tag"),
            Self::EmptyMappingEmoji(tag) => {
                write!(f, "tag mapping `{tag}` must define both emoji")
            }
            Self::DuplicateTag(tag) => write!(f, "tag mapping `{tag}` is defined more than once"),
            Self::UnrecognizedEmoji(glyph) => {
                write!(f, "`{glyph}` is not a single emoji glyph")
            }
            Self::Malformed(details) => write!(f, "malformed settings data: {details}"),
        }
    }
}

impl Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::{
        normalize_mapping_tag, ChecklistSettings, SettingsError, TagEmojiMapping,
        DEFAULT_CHECKED_EMOJI, DEFAULT_UNCHECKED_EMOJI,
    };

    #[test]
    fn defaults_use_circle_and_check_mark() {
        let settings = ChecklistSettings::default();
        assert_eq!(settings.unchecked_emoji, DEFAULT_UNCHECKED_EMOJI);
        assert_eq!(settings.checked_emoji, DEFAULT_CHECKED_EMOJI);
        assert!(settings.tag_mappings.is_empty());
    }

    #[test]
    fn json_without_mappings_merges_defaults() {
        let settings = ChecklistSettings::from_json(r#"{"uncheckedEmoji":"⬜️"}"#)
            .expect("partial settings should load");
        assert_eq!(settings.unchecked_emoji, "⬜️");
        assert_eq!(settings.checked_emoji, DEFAULT_CHECKED_EMOJI);
        assert!(settings.tag_mappings.is_empty());
    }

    #[test]
    fn json_mapping_tags_are_normalized() {
        let raw = r##"{"tagMappings":[{"tag":" #Stopper ","uncheckedEmoji":"🛑","checkedEmoji":"✅"}]}"##;
        let settings = ChecklistSettings::from_json(raw).expect("settings should load");
        assert_eq!(settings.tag_mappings[0].tag, "stopper");
    }

    #[test]
    fn validate_rejects_case_insensitive_duplicates() {
        let settings = ChecklistSettings::default()
            .with_mapping(TagEmojiMapping::new("Stopper", "🛑", "✅"))
            .with_mapping(TagEmojiMapping::new("stopper", "🚧", "✅"));
        let err = settings.validate().expect_err("duplicate tags must fail");
        assert_eq!(err, SettingsError::DuplicateTag("stopper".to_string()));
    }

    #[test]
    fn validate_rejects_empty_tag_and_empty_globals() {
        let empty_tag = ChecklistSettings::default().with_mapping(TagEmojiMapping::new("#", "a", "b"));
        assert_eq!(
            empty_tag.validate().expect_err("empty tag must fail"),
            SettingsError::EmptyTag { index: 0 }
        );

        let empty_global = ChecklistSettings::with_defaults("  ", "✅");
        assert!(matches!(
            empty_global.validate(),
            Err(SettingsError::EmptyGlobalEmoji("unchecked"))
        ));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = ChecklistSettings::from_json("{not json").expect_err("must fail");
        assert!(matches!(err, SettingsError::Malformed(_)));
    }

    #[test]
    fn normalize_mapping_tag_strips_hash_and_lowercases() {
        assert_eq!(normalize_mapping_tag("#Urgent").as_deref(), Some("urgent"));
        assert_eq!(normalize_mapping_tag("   "), None);
    }

    #[test]
    fn validate_rejects_ascii_glyphs() {
        let emoticons = ChecklistSettings::with_defaults(":(", ":)");
        assert_eq!(
            emoticons.validate().expect_err("ascii glyph must fail"),
            SettingsError::UnrecognizedEmoji(":(".to_string())
        );

        let arrow = ChecklistSettings::default().with_mapping(TagEmojiMapping::new("next", "->", "✅"));
        assert_eq!(
            arrow.validate().expect_err("ascii mapping glyph must fail"),
            SettingsError::UnrecognizedEmoji("->".to_string())
        );

        let keycaps = ChecklistSettings::with_defaults("1️⃣", "#️⃣");
        assert_eq!(keycaps.validate(), Ok(()));
    }
}

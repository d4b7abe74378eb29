//! Checklist settings configuration surface.
//!
//! # Responsibility
//! - Load the persisted snapshot (or defaults) once.
//! - Apply edits to global glyphs and tag mappings.
//! - Validate, persist, then publish each new snapshot.
//!
//! # Invariants
//! - The published snapshot always passes `ChecklistSettings::validate()`.
//! - A failed edit leaves both storage and the published snapshot unchanged.
//! - Tag keys are unique case-insensitively and never empty.

use crate::model::settings::{
    normalize_mapping_tag, ChecklistSettings, SettingsError, TagEmojiMapping,
};
use crate::repo::settings_repo::{RepoError, SettingsRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for settings use-cases.
#[derive(Debug)]
pub enum SettingsServiceError {
    /// The edit would produce an invalid snapshot.
    Invalid(SettingsError),
    /// No mapping exists for the given tag.
    MappingNotFound(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for SettingsServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::MappingNotFound(tag) => write!(f, "no tag mapping for `{tag}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::MappingNotFound(_) => None,
        }
    }
}

impl From<SettingsError> for SettingsServiceError {
    fn from(value: SettingsError) -> Self {
        Self::Invalid(value)
    }
}

impl From<RepoError> for SettingsServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// Settings service facade over repository implementations.
pub struct SettingsService<R: SettingsRepository> {
    repo: R,
    current: ChecklistSettings,
}

impl<R: SettingsRepository> SettingsService<R> {
    /// Loads the stored snapshot, falling back to defaults when empty.
    pub fn load(repo: R) -> Result<Self, SettingsServiceError> {
        let current = repo.load_settings()?.unwrap_or_default();
        info!(
            "event=settings_load module=service status=ok mapping_count={}",
            current.tag_mappings.len()
        );
        Ok(Self { repo, current })
    }

    /// Current published snapshot, read by the rendering core.
    pub fn settings(&self) -> &ChecklistSettings {
        &self.current
    }

    pub fn set_unchecked_emoji(
        &mut self,
        emoji: impl Into<String>,
    ) -> Result<&ChecklistSettings, SettingsServiceError> {
        let emoji = emoji.into();
        self.apply("set_unchecked_emoji", move |draft| {
            draft.unchecked_emoji = emoji;
            Ok(())
        })
    }

    pub fn set_checked_emoji(
        &mut self,
        emoji: impl Into<String>,
    ) -> Result<&ChecklistSettings, SettingsServiceError> {
        let emoji = emoji.into();
        self.apply("set_checked_emoji", move |draft| {
            draft.checked_emoji = emoji;
            Ok(())
        })
    }

    /// Appends a mapping; duplicate or empty tags are rejected.
    pub fn add_mapping(
        &mut self,
        tag: &str,
        unchecked_emoji: impl Into<String>,
        checked_emoji: impl Into<String>,
    ) -> Result<&ChecklistSettings, SettingsServiceError> {
        let mapping = TagEmojiMapping::new(tag, unchecked_emoji, checked_emoji);
        self.apply("add_mapping", move |draft| {
            draft.tag_mappings.push(mapping);
            Ok(())
        })
    }

    /// Replaces the glyphs of an existing mapping.
    pub fn update_mapping(
        &mut self,
        tag: &str,
        unchecked_emoji: impl Into<String>,
        checked_emoji: impl Into<String>,
    ) -> Result<&ChecklistSettings, SettingsServiceError> {
        let key = mapping_key(tag)?;
        let unchecked_emoji = unchecked_emoji.into();
        let checked_emoji = checked_emoji.into();
        self.apply("update_mapping", move |draft| {
            let mapping = find_mapping(draft, &key)?;
            mapping.unchecked_emoji = unchecked_emoji;
            mapping.checked_emoji = checked_emoji;
            Ok(())
        })
    }

    pub fn remove_mapping(&mut self, tag: &str) -> Result<&ChecklistSettings, SettingsServiceError> {
        let key = mapping_key(tag)?;
        self.apply("remove_mapping", move |draft| {
            let before = draft.tag_mappings.len();
            draft.tag_mappings.retain(|mapping| mapping.tag != key);
            if draft.tag_mappings.len() == before {
                return Err(SettingsServiceError::MappingNotFound(key));
            }
            Ok(())
        })
    }

    /// Moves a mapping to `index` (clamped), changing match precedence.
    pub fn move_mapping(
        &mut self,
        tag: &str,
        index: usize,
    ) -> Result<&ChecklistSettings, SettingsServiceError> {
        let key = mapping_key(tag)?;
        self.apply("move_mapping", move |draft| {
            let Some(from) = draft.tag_mappings.iter().position(|m| m.tag == key) else {
                return Err(SettingsServiceError::MappingNotFound(key));
            };
            let mapping = draft.tag_mappings.remove(from);
            let to = index.min(draft.tag_mappings.len());
            draft.tag_mappings.insert(to, mapping);
            Ok(())
        })
    }

    pub fn reset_to_defaults(&mut self) -> Result<&ChecklistSettings, SettingsServiceError> {
        self.apply("reset", |draft| {
            *draft = ChecklistSettings::default();
            Ok(())
        })
    }

    /// Replaces the snapshot with JSON plugin data (defaults merged in).
    pub fn import_json(&mut self, raw: &str) -> Result<&ChecklistSettings, SettingsServiceError> {
        let imported = ChecklistSettings::from_json(raw)?;
        self.apply("import_json", move |draft| {
            *draft = imported;
            Ok(())
        })
    }

    pub fn export_json(&self) -> Result<String, SettingsServiceError> {
        Ok(self.current.to_json()?)
    }

    fn apply(
        &mut self,
        op: &'static str,
        edit: impl FnOnce(&mut ChecklistSettings) -> Result<(), SettingsServiceError>,
    ) -> Result<&ChecklistSettings, SettingsServiceError> {
        let mut draft = self.current.clone();
        let result = edit(&mut draft)
            .and_then(|()| draft.normalized().map_err(SettingsServiceError::from))
            .and_then(|next| {
                self.repo.save_settings(&next)?;
                Ok(next)
            });

        match result {
            Ok(next) => {
                self.current = next;
                info!(
                    "event=settings_update module=service status=ok op={} mapping_count={}",
                    op,
                    self.current.tag_mappings.len()
                );
                Ok(&self.current)
            }
            Err(err) => {
                warn!(
                    "event=settings_update module=service status=error op={} error={}",
                    op, err
                );
                Err(err)
            }
        }
    }
}

fn mapping_key(tag: &str) -> Result<String, SettingsServiceError> {
    normalize_mapping_tag(tag).ok_or_else(|| SettingsServiceError::MappingNotFound(tag.to_string()))
}

fn find_mapping<'a>(
    settings: &'a mut ChecklistSettings,
    key: &str,
) -> Result<&'a mut TagEmojiMapping, SettingsServiceError> {
    settings
        .tag_mappings
        .iter_mut()
        .find(|mapping| mapping.tag == key)
        .ok_or_else(|| SettingsServiceError::MappingNotFound(key.to_string()))
}

//! Core logic for the emoji checklist renderer.
//!
//! Renders task-list checkboxes as clickable glyphs chosen by tag, and keeps
//! the backing document line, the native checkbox and the glyph in
//! agreement as items are toggled.

pub mod checklist;
pub mod db;
pub mod editor;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod service;

pub use checklist::policy::glyph_for;
pub use checklist::tag::resolve_tag;
pub use editor::buffer::{BufferError, EditorBuffer, EditorPosition, LineBuffer};
pub use editor::sync::{
    checkbox_line_text, reconcile, reconcile_checkbox, reconcile_line_text, ReconcileOutcome,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::settings::{
    ChecklistSettings, SettingsError, TagEmojiMapping, DEFAULT_CHECKED_EMOJI,
    DEFAULT_UNCHECKED_EMOJI,
};
pub use render::binder::{
    BindOutcome, CheckboxBinding, RenderEnv, RenderedFragment, SectionInfo, SURROGATE_CLASS,
};
pub use render::dom::{DomEvent, EventKind, Fragment, NodeId};
pub use render::processor::{post_process, process_document, ProcessReport};
pub use repo::settings_repo::{
    InMemorySettingsRepository, RepoError, RepoResult, SettingsRepository,
    SqliteSettingsRepository,
};
pub use service::settings_service::{SettingsService, SettingsServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

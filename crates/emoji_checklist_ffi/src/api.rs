//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level checklist functions to Dart via FRB.
//! - Own the settings database location for host processes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported through envelope fields, never thrown.
//! - Markdown inputs are never written back; hosts apply returned text.
//! - A toggle persists the checked state into the `[ ]`/`[x]` markup, so
//!   returned text re-renders in the same state.

use emoji_checklist_core::db::open_db;
use emoji_checklist_core::{
    core_version as core_version_inner, glyph_for as glyph_for_inner,
    init_logging as init_logging_inner, process_document, reconcile_checkbox, reconcile_line_text,
    resolve_tag as resolve_tag_inner, ChecklistSettings, LineBuffer, NodeId, RenderEnv,
    RenderedFragment, SettingsService, SettingsServiceError, SqliteSettingsRepository,
};
use log::{debug, warn};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::OnceLock;

const SETTINGS_DB_FILE_NAME: &str = "emoji_checklist.sqlite3";
static SETTINGS_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Returns the first `#tag` of a task line, without the `#`.
#[flutter_rust_bridge::frb(sync)]
pub fn resolve_tag(line_text: String) -> Option<String> {
    resolve_tag_inner(&line_text)
}

/// Settings snapshot envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Current snapshot as JSON (camelCase), also on failure when readable.
    pub settings_json: String,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl SettingsResponse {
    fn success(message: impl Into<String>, settings: &ChecklistSettings) -> Self {
        match settings.to_json() {
            Ok(settings_json) => Self {
                ok: true,
                settings_json,
                message: message.into(),
            },
            Err(err) => Self::failure(format!("settings export failed: {err}")),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            settings_json: String::new(),
            message: message.into(),
        }
    }
}

/// Checklist text envelope for reconcile and toggle flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistTextResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Resulting markdown; equals the input when nothing changed or on failure.
    pub text: String,
    /// Task checkboxes bound to a glyph.
    pub bound: u32,
    /// Buffer lines rewritten.
    pub lines_updated: u32,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Reads the persisted settings snapshot (defaults when none stored).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_get() -> SettingsResponse {
    settings_call("settings_get", |service| Ok(service.settings().clone()))
}

/// Replaces the settings with JSON plugin data; missing fields take defaults.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_import(json: String) -> SettingsResponse {
    settings_call("settings_import", |service| {
        service.import_json(&json).cloned()
    })
}

/// Sets both global glyphs.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_set_global_emojis(unchecked_emoji: String, checked_emoji: String) -> SettingsResponse {
    settings_call("settings_set_global_emojis", |service| {
        service.set_unchecked_emoji(unchecked_emoji)?;
        service.set_checked_emoji(checked_emoji).cloned()
    })
}

/// Adds a tag mapping; tags match case-insensitively and must be unique.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_add_mapping(
    tag: String,
    unchecked_emoji: String,
    checked_emoji: String,
) -> SettingsResponse {
    settings_call("settings_add_mapping", |service| {
        service
            .add_mapping(&tag, unchecked_emoji, checked_emoji)
            .cloned()
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn settings_remove_mapping(tag: String) -> SettingsResponse {
    settings_call("settings_remove_mapping", |service| {
        service.remove_mapping(&tag).cloned()
    })
}

/// Moves a mapping to `index`, changing which mapping wins first.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_move_mapping(tag: String, index: u32) -> SettingsResponse {
    settings_call("settings_move_mapping", |service| {
        service.move_mapping(&tag, index as usize).cloned()
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn settings_reset() -> SettingsResponse {
    settings_call("settings_reset", |service| {
        service.reset_to_defaults().cloned()
    })
}

/// Returns the glyph for a tag and checked state under stored settings.
///
/// Falls back to built-in defaults when storage is unavailable.
#[flutter_rust_bridge::frb(sync)]
pub fn glyph_for(tag: Option<String>, checked: bool) -> String {
    let settings = load_settings_or_default("glyph_for");
    glyph_for_inner(tag.as_deref(), checked, &settings).to_string()
}

/// Rewrites one task line so its glyph slot shows `glyph`.
///
/// Returns `None` when the line is not a task line.
#[flutter_rust_bridge::frb(sync)]
pub fn reconcile_line(line_text: String, glyph: String) -> Option<String> {
    reconcile_line_text(&line_text, &glyph)
}

/// Renders `markdown` and brings every task line's glyph in line with its
/// tag and checked state.
///
/// # FFI contract
/// - Sync call; reads settings from DB.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn reconcile_markdown(markdown: String) -> ChecklistTextResponse {
    checklist_text_call(markdown, None)
}

/// Toggles the `task_index`-th task checkbox of `markdown` (document
/// order) and returns the updated text.
///
/// Both the glyph and the checkbox markup change, so calling this again on
/// the returned text toggles back.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_task(markdown: String, task_index: u32) -> ChecklistTextResponse {
    checklist_text_call(markdown, Some(task_index as usize))
}

fn checklist_text_call(markdown: String, toggle: Option<usize>) -> ChecklistTextResponse {
    let settings = load_settings_or_default("checklist_text");
    let mut buffer = LineBuffer::from_text(&markdown);
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut fragments, report) = process_document(&markdown, &mut env);

    let mut message = format!("Bound {} task(s).", report.bound);
    let mut ok = true;
    if let Some(task_index) = toggle {
        let target = fragments
            .iter()
            .enumerate()
            .flat_map(|(fragment, rendered)| {
                rendered
                    .bindings()
                    .iter()
                    .map(move |binding| (fragment, binding.surrogate))
            })
            .nth(task_index);
        match target {
            Some((fragment, surrogate)) => {
                let rendered = &mut fragments[fragment];
                let changed = Rc::new(RefCell::new(Vec::new()));
                let sink = Rc::clone(&changed);
                let root = rendered.fragment().root();
                rendered.add_change_observer(root, move |event| {
                    sink.borrow_mut().push(event.target);
                });
                rendered.click(surrogate, &mut env);
                for native in changed.borrow().iter() {
                    persist_checked_state(rendered, *native, &mut env);
                }
                message = format!("Toggled task {task_index}.");
            }
            None => {
                ok = false;
                message = format!("toggle_task failed: no task at index {task_index}");
            }
        }
    }
    for rendered in &mut fragments {
        rendered.unload();
    }
    drop(env);

    ChecklistTextResponse {
        ok,
        text: buffer.to_text(),
        bound: u32::try_from(report.bound).unwrap_or(u32::MAX),
        lines_updated: u32::try_from(report.lines_updated).unwrap_or(u32::MAX),
        message,
    }
}

/// Writes the native checked state of `native` into its backing line.
fn persist_checked_state(rendered: &RenderedFragment, native: NodeId, env: &mut RenderEnv<'_>) {
    let Some(binding) = rendered
        .bindings()
        .iter()
        .find(|binding| binding.native == native)
    else {
        return;
    };
    let (Some(line), Some(buffer)) = (binding.line_index, env.buffer.as_deref_mut()) else {
        return;
    };
    let outcome = reconcile_checkbox(buffer, line, binding.checked);
    debug!(
        "event=persist_checked module=ffi status={} line={} checked={}",
        outcome.as_str(),
        line,
        binding.checked
    );
}

fn resolve_settings_db_path() -> PathBuf {
    SETTINGS_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("EMOJI_CHECKLIST_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(SETTINGS_DB_FILE_NAME)
        })
        .clone()
}

fn with_settings_service<T>(
    f: impl FnOnce(
        &mut SettingsService<SqliteSettingsRepository<'_>>,
    ) -> Result<T, SettingsServiceError>,
) -> Result<T, String> {
    let db_path = resolve_settings_db_path();
    let mut conn = open_db(&db_path).map_err(|err| format!("settings DB open failed: {err}"))?;
    let repo = SqliteSettingsRepository::try_new(&mut conn)
        .map_err(|err| format!("settings repo init failed: {err}"))?;
    let mut service =
        SettingsService::load(repo).map_err(|err| format!("settings load failed: {err}"))?;
    f(&mut service).map_err(|err| err.to_string())
}

fn settings_call(
    op: &'static str,
    f: impl FnOnce(
        &mut SettingsService<SqliteSettingsRepository<'_>>,
    ) -> Result<ChecklistSettings, SettingsServiceError>,
) -> SettingsResponse {
    match with_settings_service(f) {
        Ok(settings) => SettingsResponse::success("Settings saved.", &settings),
        Err(err) => SettingsResponse::failure(format!("{op} failed: {err}")),
    }
}

fn load_settings_or_default(op: &'static str) -> ChecklistSettings {
    match with_settings_service(|service| Ok(service.settings().clone())) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(
                "event=settings_load module=ffi status=fallback op={} error={}",
                op, err
            );
            ChecklistSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, glyph_for, init_logging, reconcile_line, reconcile_markdown, resolve_tag,
        settings_add_mapping, settings_get, settings_import, settings_remove_mapping, toggle_task,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn resolve_tag_and_reconcile_line_are_pure() {
        assert_eq!(
            resolve_tag("⬜️ [ ] blocked work #stopper".to_string()).as_deref(),
            Some("stopper")
        );
        assert_eq!(
            reconcile_line("[ ] plain task".to_string(), "⬜️".to_string()).as_deref(),
            Some("⬜️ [ ] plain task")
        );
        assert_eq!(reconcile_line("prose".to_string(), "⭕".to_string()), None);
    }

    #[test]
    fn settings_get_returns_camel_case_json() {
        let response = settings_get();
        assert!(response.ok, "{}", response.message);
        assert!(response.settings_json.contains("\"uncheckedEmoji\""));
    }

    #[test]
    fn added_mapping_drives_glyph_until_removed() {
        let tag = unique_token("tag");
        let added = settings_add_mapping(format!("#{tag}"), "🧪".to_string(), "🎉".to_string());
        assert!(added.ok, "{}", added.message);
        assert_eq!(glyph_for(Some(tag.to_uppercase()), false), "🧪");
        assert_eq!(glyph_for(Some(tag.clone()), true), "🎉");

        let duplicate = settings_add_mapping(tag.clone(), "❌".to_string(), "❌".to_string());
        assert!(!duplicate.ok);

        let removed = settings_remove_mapping(tag.clone());
        assert!(removed.ok, "{}", removed.message);
        assert!(!removed.settings_json.contains(&tag));
    }

    #[test]
    fn malformed_import_is_rejected() {
        let response = settings_import("{not json".to_string());
        assert!(!response.ok);
        assert!(response.message.starts_with("settings_import failed"));
    }

    #[test]
    fn toggle_task_persists_markup_and_toggles_back() {
        let tag = unique_token("toggle");
        let markdown = format!("- [ ] first #{tag}\n- [ ] second #{tag}");
        let reconciled = reconcile_markdown(markdown.clone());
        assert!(reconciled.ok, "{}", reconciled.message);
        assert_eq!(reconciled.bound, 2);
        assert_eq!(reconciled.lines_updated, 2);

        let once = toggle_task(reconciled.text.clone(), 1);
        assert!(once.ok, "{}", once.message);
        let lines: Vec<&str> = once.text.lines().collect();
        let before: Vec<&str> = reconciled.text.lines().collect();
        assert_eq!(lines[0], before[0]);
        assert!(lines[1].starts_with("- [x] "), "{}", lines[1]);

        let rerendered = reconcile_markdown(once.text.clone());
        assert_eq!(rerendered.text, once.text);
        assert_eq!(rerendered.lines_updated, 0);

        let twice = toggle_task(once.text.clone(), 1);
        assert!(twice.ok, "{}", twice.message);
        assert_eq!(twice.text, reconciled.text);
    }

    #[test]
    fn toggle_task_out_of_range_leaves_text() {
        let response = toggle_task("- [ ] only".to_string(), 3);
        assert!(!response.ok);
        assert!(response.text.starts_with("- [ ] "));
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}{nanos}")
    }
}

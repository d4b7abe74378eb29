//! Glyph and checkbox reconciliation of backing-buffer task lines.
//!
//! # Invariants
//! - The rewrite covers the whole line (column 0 to old line end) as one
//!   edit, computed from the line text read at edit time.
//! - Text outside the rewritten slot is preserved byte-for-byte.
//! - Reconciling a line that already shows the target state performs no edit.
//! - Only glyphs the line parser recognizes whole are ever written, so a
//!   written glyph is always replaced, never stacked, by the next reconcile.

use crate::checklist::line::{is_recognized_glyph, parse_task_line};
use crate::editor::buffer::{EditorBuffer, EditorPosition};
use log::{debug, warn};

/// Result of one reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The line was rewritten.
    Updated,
    /// The line already showed the target state.
    Unchanged,
    /// The target line is not a task line; nothing was written.
    NotTaskLine,
    /// The glyph would not be recognized in the line again; nothing was written.
    UnrecognizedGlyph,
    /// The target line does not exist (buffer shrank or bad offset).
    LineMissing,
    /// The host rejected the edit.
    EditFailed,
}

impl ReconcileOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::NotTaskLine => "not_task_line",
            Self::UnrecognizedGlyph => "unrecognized_glyph",
            Self::LineMissing => "line_missing",
            Self::EditFailed => "edit_failed",
        }
    }
}

/// Returns `line` with its glyph slot replaced by `glyph`.
///
/// The existing glyph and its single separator are replaced by
/// `glyph + " "`; an empty `glyph` removes the slot content. Returns `None`
/// when `line` is not a task line or `glyph` is not a recognized glyph.
pub fn reconcile_line_text(line: &str, glyph: &str) -> Option<String> {
    if !glyph.is_empty() && !is_recognized_glyph(glyph) {
        return None;
    }
    let slot = parse_task_line(line)?.slot;
    let mut rewritten = String::with_capacity(line.len() + glyph.len() + 2);
    rewritten.push_str(&line[..slot.start]);
    if !glyph.is_empty() {
        if slot.needs_separator {
            rewritten.push(' ');
        }
        rewritten.push_str(glyph);
        rewritten.push(' ');
    }
    rewritten.push_str(&line[slot.existing.end..]);
    Some(rewritten)
}

/// Returns `line` with its checkbox markup set to `[x]` or `[ ]`.
///
/// Markup already in the requested state (including `[X]`) is kept as is.
/// Returns `None` when `line` is not a task line.
pub fn checkbox_line_text(line: &str, checked: bool) -> Option<String> {
    let task = parse_task_line(line)?;
    if task.is_checked(line) == checked {
        return Some(line.to_string());
    }
    let markup = if checked { "[x]" } else { "[ ]" };
    let mut rewritten = String::with_capacity(line.len());
    rewritten.push_str(&line[..task.checkbox.start]);
    rewritten.push_str(markup);
    rewritten.push_str(&line[task.checkbox.end..]);
    Some(rewritten)
}

/// Rewrites the glyph slot of `line_index` in `buffer` to `glyph`.
///
/// Never fails: every anomaly is reported as an outcome and logged.
pub fn reconcile<B: EditorBuffer + ?Sized>(
    buffer: &mut B,
    line_index: usize,
    glyph: &str,
) -> ReconcileOutcome {
    if !is_recognized_glyph(glyph) {
        debug!(
            "event=reconcile module=editor status=skip reason=unrecognized_glyph line={}",
            line_index
        );
        return ReconcileOutcome::UnrecognizedGlyph;
    }
    rewrite_line(buffer, line_index, "reconcile", |line| {
        reconcile_line_text(line, glyph)
    })
}

/// Persists a checked state into the checkbox markup of `line_index`.
///
/// This is the host-side counterpart of a native `change`: the glyph
/// reconciler never touches the markup itself.
pub fn reconcile_checkbox<B: EditorBuffer + ?Sized>(
    buffer: &mut B,
    line_index: usize,
    checked: bool,
) -> ReconcileOutcome {
    rewrite_line(buffer, line_index, "reconcile_checkbox", |line| {
        checkbox_line_text(line, checked)
    })
}

fn rewrite_line<B: EditorBuffer + ?Sized>(
    buffer: &mut B,
    line_index: usize,
    op: &'static str,
    rewrite: impl FnOnce(&str) -> Option<String>,
) -> ReconcileOutcome {
    let Some(current) = buffer.get_line(line_index) else {
        debug!(
            "event={} module=editor status=skip reason=line_missing line={} line_count={}",
            op,
            line_index,
            buffer.line_count()
        );
        return ReconcileOutcome::LineMissing;
    };

    let Some(rewritten) = rewrite(&current) else {
        debug!(
            "event={} module=editor status=skip reason=not_task_line line={}",
            op, line_index
        );
        return ReconcileOutcome::NotTaskLine;
    };

    if rewritten == current {
        return ReconcileOutcome::Unchanged;
    }

    let from = EditorPosition::new(line_index, 0);
    let to = EditorPosition::new(line_index, current.len());
    match buffer.replace_range(from, to, &rewritten) {
        Ok(()) => {
            debug!(
                "event={} module=editor status=ok line={} old_len={} new_len={}",
                op,
                line_index,
                current.len(),
                rewritten.len()
            );
            ReconcileOutcome::Updated
        }
        Err(err) => {
            warn!(
                "event={} module=editor status=error line={} error={}",
                op, line_index, err
            );
            ReconcileOutcome::EditFailed
        }
    }
}

//! Post-processing entry points invoked once per rendered block.

use crate::editor::sync::ReconcileOutcome;
use crate::render::binder::{BindOutcome, RenderEnv, RenderedFragment, SectionInfo};
use crate::render::dom::Fragment;
use crate::render::markdown::render_sections;
use log::info;

/// Per-fragment processing summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub discovered: usize,
    pub bound: usize,
    pub skipped: usize,
    pub lines_updated: usize,
    pub lines_unchanged: usize,
    /// Reconciliation attempts that wrote nothing for a structural reason.
    pub lines_skipped: usize,
}

impl ProcessReport {
    fn record(&mut self, outcome: BindOutcome) {
        match outcome {
            BindOutcome::Bound(reconciled) => {
                self.bound += 1;
                match reconciled {
                    Some(ReconcileOutcome::Updated) => self.lines_updated += 1,
                    Some(ReconcileOutcome::Unchanged) => self.lines_unchanged += 1,
                    Some(_) => self.lines_skipped += 1,
                    None => {}
                }
            }
            BindOutcome::Malformed | BindOutcome::AlreadyBound => self.skipped += 1,
        }
    }

    fn merge(&mut self, other: ProcessReport) {
        self.discovered += other.discovered;
        self.bound += other.bound;
        self.skipped += other.skipped;
        self.lines_updated += other.lines_updated;
        self.lines_unchanged += other.lines_unchanged;
        self.lines_skipped += other.lines_skipped;
    }
}

/// Binds every task checkbox of `fragment`.
///
/// The `n`-th discovered checkbox maps to buffer line
/// `section.line_start + n` when `section` is given.
pub fn post_process(
    fragment: Fragment,
    section: Option<SectionInfo>,
    env: &mut RenderEnv<'_>,
) -> (RenderedFragment, ProcessReport) {
    let checkboxes = fragment.task_checkboxes();
    let mut rendered = RenderedFragment::new(fragment, section);
    let mut report = ProcessReport {
        discovered: checkboxes.len(),
        ..ProcessReport::default()
    };

    for (index, checkbox) in checkboxes.into_iter().enumerate() {
        report.record(rendered.bind(checkbox, index, env));
    }

    if report.discovered > 0 {
        info!(
            "event=post_process module=render status=ok discovered={} bound={} skipped={} lines_updated={} editable={} has_section={}",
            report.discovered,
            report.bound,
            report.skipped,
            report.lines_updated,
            env.buffer.is_some(),
            section.is_some()
        );
    }
    (rendered, report)
}

/// Renders `source` block by block and post-processes every block.
///
/// `source` must be the current text of `env.buffer` when one is given.
pub fn process_document(
    source: &str,
    env: &mut RenderEnv<'_>,
) -> (Vec<RenderedFragment>, ProcessReport) {
    let mut total = ProcessReport::default();
    let mut rendered = Vec::new();
    for block in render_sections(source) {
        let (fragment, report) = post_process(block.fragment, Some(block.section), env);
        total.merge(report);
        rendered.push(fragment);
    }
    (rendered, total)
}

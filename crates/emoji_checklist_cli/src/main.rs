//! CLI entry point.
//!
//! # Responsibility
//! - Print the linked core version.
//! - Given a markdown file, print its task lines reconciled with default
//!   glyphs. The file itself is never written.

use emoji_checklist_core::{
    core_version, process_document, ChecklistSettings, LineBuffer, RenderEnv,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("emoji_checklist_core version={}", core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("failed to read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let settings = ChecklistSettings::default();
    let mut buffer = LineBuffer::from_text(&source);
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (_, report) = process_document(&source, &mut env);
    drop(env);

    println!(
        "tasks={} lines_updated={} lines_unchanged={} skipped={}",
        report.bound,
        report.lines_updated,
        report.lines_unchanged,
        report.skipped + report.lines_skipped
    );
    print!("{}", buffer.to_text());
    if !source.is_empty() && !source.ends_with('\n') {
        println!();
    }
    ExitCode::SUCCESS
}

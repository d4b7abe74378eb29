use emoji_checklist_core::render::dom::TASK_CHECKBOX_CLASS;
use emoji_checklist_core::render::markdown::render_fragment;
use emoji_checklist_core::{
    glyph_for, post_process, reconcile_line_text, resolve_tag, ChecklistSettings, EditorBuffer,
    EventKind, Fragment, LineBuffer, NodeId, RenderEnv, SectionInfo, TagEmojiMapping,
};
use std::cell::RefCell;
use std::rc::Rc;

fn stopper_settings() -> ChecklistSettings {
    ChecklistSettings::with_defaults("⬜️", "✅")
        .with_mapping(TagEmojiMapping::new("stopper", "🛑", "✅"))
}

/// Builds `ul > li.task-list-item > input + text` for each item.
fn bare_task_list(items: &[(&str, bool)]) -> Fragment {
    let mut fragment = Fragment::new();
    let list = fragment.append_element(fragment.root(), "ul");
    for (text, checked) in items {
        let item = fragment.append_element(list, "li");
        fragment
            .element_mut(item)
            .unwrap()
            .add_class("task-list-item");
        let input = fragment.append_element(item, "input");
        let element = fragment.element_mut(input).unwrap();
        element.set_attribute("type", "checkbox");
        element.add_class(TASK_CHECKBOX_CLASS);
        element.set_checked(*checked);
        fragment.append_text(item, *text);
    }
    fragment
}

fn native_checked(fragment: &Fragment, native: NodeId) -> bool {
    fragment.element(native).unwrap().checked()
}

#[test]
fn stopper_scenario_resolves_tag_glyph_and_line() {
    let settings = stopper_settings();
    let line = "⬜️ [ ] blocked work #stopper";

    let tag = resolve_tag(line);
    assert_eq!(tag.as_deref(), Some("stopper"));
    let glyph = glyph_for(tag.as_deref(), false, &settings);
    assert_eq!(glyph, "🛑");
    assert_eq!(
        reconcile_line_text(line, glyph).as_deref(),
        Some("🛑 [ ] blocked work #stopper")
    );
}

#[test]
fn plain_task_scenario_gets_global_glyph() {
    let settings = stopper_settings();
    let line = "[ ] plain task";

    let tag = resolve_tag(line);
    assert_eq!(tag, None);
    let glyph = glyph_for(tag.as_deref(), false, &settings);
    assert_eq!(glyph, "⬜️");
    assert_eq!(
        reconcile_line_text(line, glyph).as_deref(),
        Some("⬜️ [ ] plain task")
    );
}

#[test]
fn unmapped_tag_uses_global_checked_glyph() {
    assert_eq!(glyph_for(Some("urgent"), true, &stopper_settings()), "✅");
}

#[test]
fn render_reconciles_then_toggle_rewrites_only_the_glyph() {
    let settings = stopper_settings();
    let mut buffer = LineBuffer::from_text("⬜️ [ ] blocked work #stopper\n[ ] plain task");
    let fragment = bare_task_list(&[("blocked work #stopper", false), ("plain task", false)]);

    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut rendered, report) = post_process(fragment, Some(SectionInfo::new(0, 1)), &mut env);
    assert_eq!(report.bound, 2);
    assert_eq!(report.lines_updated, 2);

    let stopper = rendered.bindings()[0].clone();
    assert_eq!(stopper.resolved_tag.as_deref(), Some("stopper"));
    assert_eq!(rendered.fragment().text_content(stopper.surrogate), "🛑");

    rendered.click(stopper.surrogate, &mut env);
    assert!(native_checked(rendered.fragment(), stopper.native));
    assert_eq!(rendered.fragment().text_content(stopper.surrogate), "✅");
    assert!(rendered.is_consistent(&settings));
    drop(env);

    assert_eq!(
        buffer.to_text(),
        "✅ [ ] blocked work #stopper\n⬜️ [ ] plain task"
    );
}

#[test]
fn toggling_twice_restores_state_and_line_bytes() {
    let settings = stopper_settings();
    let mut buffer = LineBuffer::from_text("🛑 [ ] blocked work #stopper");
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut rendered, report) = post_process(
        bare_task_list(&[("blocked work #stopper", false)]),
        Some(SectionInfo::new(0, 0)),
        &mut env,
    );
    assert_eq!(report.lines_unchanged, 1);

    let binding = rendered.bindings()[0].clone();
    rendered.click(binding.surrogate, &mut env);
    rendered.click(binding.surrogate, &mut env);
    assert!(!native_checked(rendered.fragment(), binding.native));
    drop(env);

    assert_eq!(buffer.to_text(), "🛑 [ ] blocked work #stopper");
    assert_eq!(buffer.history().len(), 2, "one edit per toggle");
}

#[test]
fn each_toggle_is_a_single_undoable_edit() {
    let settings = ChecklistSettings::default();
    let source = "- [ ] ⭕ write report";
    let mut buffer = LineBuffer::from_text(source);
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut rendered, _) = post_process(
        render_fragment(source),
        Some(SectionInfo::new(0, 0)),
        &mut env,
    );

    let surrogate = rendered.bindings()[0].surrogate;
    rendered.click(surrogate, &mut env);
    drop(env);

    assert_eq!(buffer.to_text(), "- [ ] ✅ write report");
    assert_eq!(buffer.history().len(), 1);
    assert!(buffer.undo());
    assert_eq!(buffer.to_text(), source);
}

#[test]
fn surrogate_click_and_native_activation_converge() {
    let settings = stopper_settings();
    let source = "[ ] ship it #stopper";

    let mut via_surrogate = LineBuffer::from_text(source);
    let surrogate_state = {
        let mut env = RenderEnv::editable(&settings, &mut via_surrogate);
        let (mut rendered, _) = post_process(
            bare_task_list(&[("ship it #stopper", false)]),
            Some(SectionInfo::new(0, 0)),
            &mut env,
        );
        let binding = rendered.bindings()[0].clone();
        rendered.click(binding.surrogate, &mut env);
        (
            native_checked(rendered.fragment(), binding.native),
            rendered.fragment().text_content(binding.surrogate),
        )
    };

    let mut via_native = LineBuffer::from_text(source);
    let native_state = {
        let mut env = RenderEnv::editable(&settings, &mut via_native);
        let (mut rendered, _) = post_process(
            bare_task_list(&[("ship it #stopper", false)]),
            Some(SectionInfo::new(0, 0)),
            &mut env,
        );
        let binding = rendered.bindings()[0].clone();
        let event = rendered.click(binding.native, &mut env);
        assert!(!event.default_prevented());
        (
            native_checked(rendered.fragment(), binding.native),
            rendered.fragment().text_content(binding.surrogate),
        )
    };

    assert_eq!(surrogate_state, (true, "✅".to_string()));
    assert_eq!(surrogate_state, native_state);
    assert_eq!(via_surrogate.to_text(), via_native.to_text());
}

#[test]
fn host_change_event_settles_glyph_and_line() {
    let settings = ChecklistSettings::default();
    let mut buffer = LineBuffer::from_text("- [ ] ⭕ task");
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut rendered, _) = post_process(
        render_fragment("- [ ] ⭕ task"),
        Some(SectionInfo::new(0, 0)),
        &mut env,
    );
    let binding = rendered.bindings()[0].clone();

    rendered
        .fragment_mut()
        .element_mut(binding.native)
        .unwrap()
        .set_checked(true);
    rendered.dispatch_change(binding.native, &mut env);

    assert_eq!(rendered.fragment().text_content(binding.surrogate), "✅");
    assert!(rendered.bindings()[0].checked);
    drop(env);
    assert_eq!(buffer.get_line(0).as_deref(), Some("- [ ] ✅ task"));
}

#[test]
fn observers_receive_synthetic_bubbling_change() {
    let settings = ChecklistSettings::default();
    let mut env = RenderEnv::display_only(&settings);
    let (mut rendered, _) = post_process(render_fragment("- [ ] a\n- [ ] b"), None, &mut env);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let root = rendered.fragment().root();
    rendered
        .add_change_observer(root, move |event| {
            sink.borrow_mut()
                .push((event.kind, event.target, event.synthetic, event.current_target));
        })
        .unwrap();

    let second = rendered.bindings()[1].clone();
    rendered.click(second.surrogate, &mut env);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], (EventKind::Change, second.native, true, root));
}

#[test]
fn display_only_toggle_changes_surrogate_without_buffer() {
    let settings = ChecklistSettings::default();
    let mut env = RenderEnv::display_only(&settings);
    let (mut rendered, report) = post_process(
        render_fragment("- [x] done"),
        Some(SectionInfo::new(0, 0)),
        &mut env,
    );
    assert_eq!(report.lines_updated, 0);

    let binding = rendered.bindings()[0].clone();
    assert_eq!(rendered.fragment().text_content(binding.surrogate), "✅");
    rendered.click(binding.surrogate, &mut env);
    assert_eq!(rendered.fragment().text_content(binding.surrogate), "⭕");
    assert!(rendered.is_consistent(&settings));
}

#[test]
fn unload_releases_listeners_exactly_once() {
    let settings = ChecklistSettings::default();
    let mut env = RenderEnv::display_only(&settings);
    let (mut rendered, _) = post_process(render_fragment("- [ ] a\n- [ ] b"), None, &mut env);
    let root = rendered.fragment().root();
    rendered.add_change_observer(root, |_| {}).unwrap();

    let teardowns = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&teardowns);
    rendered.on_unload(move || *counter.borrow_mut() += 1);

    assert_eq!(rendered.fragment().listener_count(), 5);
    assert_eq!(rendered.unload(), 5);
    assert_eq!(rendered.unload(), 0);
    assert!(!rendered.is_loaded());

    let binding = rendered.bindings()[0].clone();
    rendered.click(binding.surrogate, &mut env);
    assert_eq!(rendered.fragment().text_content(binding.surrogate), "⭕");
    assert!(!native_checked(rendered.fragment(), binding.native));

    drop(rendered);
    assert_eq!(*teardowns.borrow(), 1);
}

#[test]
fn shifted_buffer_line_is_skipped_not_corrupted() {
    let settings = ChecklistSettings::default();
    let mut buffer = LineBuffer::from_text("- [ ] ⭕ task");
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut rendered, _) = post_process(
        render_fragment("- [ ] ⭕ task"),
        Some(SectionInfo::new(0, 0)),
        &mut env,
    );
    drop(env);

    buffer.insert_line(0, "A heading typed above");
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let surrogate = rendered.bindings()[0].surrogate;
    rendered.click(surrogate, &mut env);
    drop(env);

    assert_eq!(rendered.fragment().text_content(surrogate), "✅");
    assert_eq!(buffer.to_text(), "A heading typed above\n- [ ] ⭕ task");
}

#[test]
fn emoticon_settings_never_stack_glyphs() {
    let settings = ChecklistSettings::with_defaults(":(", ":)");
    assert!(settings.validate().is_err());

    let mut buffer = LineBuffer::from_text("- [ ] task\n[ ] bare task");
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut rendered, _) = post_process(
        bare_task_list(&[("task", false), ("bare task", false)]),
        Some(SectionInfo::new(0, 1)),
        &mut env,
    );
    for binding in rendered.bindings().to_vec() {
        rendered.click(binding.surrogate, &mut env);
        rendered.click(binding.surrogate, &mut env);
    }
    assert!(rendered.is_consistent(&settings));
    drop(env);

    assert_eq!(buffer.to_text(), "- [ ] ⭕ task\n⭕ [ ] bare task");
    assert_eq!(buffer.history().len(), 6, "bind plus one edit per toggle");
}

#[test]
fn keycap_glyphs_round_trip_in_both_line_shapes() {
    let settings = ChecklistSettings::with_defaults("1️⃣", "#️⃣");
    assert_eq!(settings.validate(), Ok(()));

    let source = "- [ ] listed\n[ ] bare";
    let mut buffer = LineBuffer::from_text(source);
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (mut rendered, report) = post_process(
        bare_task_list(&[("listed", false), ("bare", false)]),
        Some(SectionInfo::new(0, 1)),
        &mut env,
    );
    assert_eq!(report.lines_updated, 2);

    let listed = rendered.bindings()[0].surrogate;
    let bare = rendered.bindings()[1].surrogate;
    rendered.click(listed, &mut env);
    rendered.click(bare, &mut env);
    drop(env);
    assert_eq!(buffer.to_text(), "- [ ] #️⃣ listed\n#️⃣ [ ] bare");

    let mut env = RenderEnv::editable(&settings, &mut buffer);
    rendered.click(listed, &mut env);
    rendered.click(bare, &mut env);
    drop(env);

    assert_eq!(buffer.to_text(), "- [ ] 1️⃣ listed\n1️⃣ [ ] bare");
    assert_eq!(buffer.history().len(), 6);
}

#[test]
fn crlf_document_keeps_line_endings() {
    let settings = ChecklistSettings::default();
    let source = "- [ ] first\r\n- [ ]\r\n";
    let mut buffer = LineBuffer::from_text(source);
    let mut env = RenderEnv::editable(&settings, &mut buffer);
    let (_, report) = post_process(
        bare_task_list(&[("first", false), ("", false)]),
        Some(SectionInfo::new(0, 1)),
        &mut env,
    );
    assert_eq!(report.lines_updated, 2);
    assert_eq!(report.lines_skipped, 0);
    drop(env);

    assert_eq!(buffer.to_text(), "- [ ] ⭕ first\r\n- [ ] ⭕ \r\n");
}

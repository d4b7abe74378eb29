//! Checkbox surrogate binding and toggle handling.
//!
//! # Responsibility
//! - Replace each task checkbox with a clickable glyph surrogate.
//! - Route surrogate clicks and native change events to one toggle path.
//! - Reconcile the backing line whenever a binding settles.
//!
//! # Invariants
//! - After bind and after every completed toggle, the surrogate text equals
//!   `glyph_for(tag, native.checked)`.
//! - The native checkbox stays in the tree, hidden, as the source of truth.
//! - Nothing here returns an error; anomalies degrade to skip/display-only.

use crate::checklist::policy::glyph_for;
use crate::checklist::tag::resolve_tag;
use crate::editor::buffer::EditorBuffer;
use crate::editor::sync::{reconcile, ReconcileOutcome};
use crate::model::settings::ChecklistSettings;
use crate::render::dom::{
    is_list_container, DomEvent, EventHandler, EventKind, Fragment, ListenerId, NodeId,
};
use crate::render::lifecycle::{RegistrationId, RenderScope};
use log::debug;

/// Class carried by every surrogate element.
pub const SURROGATE_CLASS: &str = "emoji-checklist-surrogate";

/// Position of a rendered fragment in the backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    /// First buffer line of the fragment.
    pub line_start: usize,
    /// Last buffer line of the fragment (inclusive).
    pub line_end: usize,
}

impl SectionInfo {
    pub fn new(line_start: usize, line_end: usize) -> Self {
        Self {
            line_start,
            line_end: line_end.max(line_start),
        }
    }

    /// Buffer line of the `index`-th checkbox, if it falls inside the section.
    pub fn line_for(&self, index: usize) -> Option<usize> {
        let line = self.line_start.checked_add(index)?;
        (line <= self.line_end).then_some(line)
    }
}

/// Explicit per-call context: settings snapshot plus optional editor.
pub struct RenderEnv<'a> {
    pub settings: &'a ChecklistSettings,
    pub buffer: Option<&'a mut dyn EditorBuffer>,
}

impl<'a> RenderEnv<'a> {
    /// Context without an editable buffer; only surrogates change.
    pub fn display_only(settings: &'a ChecklistSettings) -> Self {
        Self {
            settings,
            buffer: None,
        }
    }

    pub fn editable(settings: &'a ChecklistSettings, buffer: &'a mut dyn EditorBuffer) -> Self {
        Self {
            settings,
            buffer: Some(buffer),
        }
    }
}

/// One native checkbox and its surrogate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxBinding {
    pub native: NodeId,
    pub surrogate: NodeId,
    pub resolved_tag: Option<String>,
    /// Backing buffer line, `None` when no section info applies.
    pub line_index: Option<usize>,
    /// Mirror of the native checked state.
    pub checked: bool,
    pub registration: Option<RegistrationId>,
}

/// Result of binding one discovered checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// Surrogate installed; carries the reconcile result if one ran.
    Bound(Option<ReconcileOutcome>),
    /// The node is not a checkbox or has no enclosing list item.
    Malformed,
    /// The checkbox already has a surrogate.
    AlreadyBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteAction {
    SurrogateClick,
    NativeChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Route {
    binding: usize,
    action: RouteAction,
}

/// A fragment after checklist processing, owning its bindings and scope.
pub struct RenderedFragment {
    fragment: Fragment,
    section: Option<SectionInfo>,
    bindings: Vec<CheckboxBinding>,
    routes: Vec<Route>,
    scope: RenderScope,
}

impl RenderedFragment {
    pub fn new(fragment: Fragment, section: Option<SectionInfo>) -> Self {
        Self {
            fragment,
            section,
            bindings: Vec::new(),
            routes: Vec::new(),
            scope: RenderScope::new(),
        }
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// Host access for DOM changes made outside the binder.
    pub fn fragment_mut(&mut self) -> &mut Fragment {
        &mut self.fragment
    }

    pub fn section(&self) -> Option<SectionInfo> {
        self.section
    }

    pub fn bindings(&self) -> &[CheckboxBinding] {
        &self.bindings
    }

    pub fn is_loaded(&self) -> bool {
        self.scope.is_loaded()
    }

    /// Installs a surrogate for `checkbox`, the `index`-th one discovered.
    pub fn bind(&mut self, checkbox: NodeId, index: usize, env: &mut RenderEnv<'_>) -> BindOutcome {
        let checked = match self.fragment.element(checkbox) {
            Some(element) if element.is_checkbox() => element.checked(),
            _ => return BindOutcome::Malformed,
        };
        if self.bindings.iter().any(|binding| binding.native == checkbox) {
            return BindOutcome::AlreadyBound;
        }
        let Some(item) = self.fragment.closest(checkbox, |element| element.tag == "li") else {
            debug!(
                "event=bind module=render status=skip reason=no_list_item index={}",
                index
            );
            return BindOutcome::Malformed;
        };

        let item_text = self.fragment.text_content_filtered(item, is_list_container);
        let resolved_tag = resolve_tag(&item_text);
        let glyph = glyph_for(resolved_tag.as_deref(), checked, env.settings).to_string();

        let surrogate = self.fragment.create_element("span");
        if let Some(element) = self.fragment.element_mut(surrogate) {
            element.add_class(SURROGATE_CLASS);
            if let Some(tag) = resolved_tag.as_deref() {
                element.set_attribute("data-tag", tag);
            }
        }
        self.fragment.set_text_content(surrogate, glyph);
        if !self.fragment.insert_after(checkbox, surrogate) {
            return BindOutcome::Malformed;
        }
        if let Some(element) = self.fragment.element_mut(checkbox) {
            element.set_hidden(true);
        }

        let binding = self.bindings.len();
        let click = self.add_route(surrogate, EventKind::Click, binding, RouteAction::SurrogateClick);
        let change = self.add_route(checkbox, EventKind::Change, binding, RouteAction::NativeChange);
        let registration = self
            .scope
            .register(&mut self.fragment, surrogate, vec![click, change]);

        self.bindings.push(CheckboxBinding {
            native: checkbox,
            surrogate,
            line_index: self.section.and_then(|section| section.line_for(index)),
            resolved_tag,
            checked,
            registration,
        });

        BindOutcome::Bound(self.reconcile_binding(binding, env))
    }

    /// Delivers a user click to `target`, bubbling.
    pub fn click(&mut self, target: NodeId, env: &mut RenderEnv<'_>) -> DomEvent {
        self.dispatch(DomEvent::new(EventKind::Click, target, true), env)
    }

    /// Delivers a `change` event for a checkbox whose state the host
    /// already updated (e.g. keyboard activation).
    pub fn dispatch_change(&mut self, target: NodeId, env: &mut RenderEnv<'_>) -> DomEvent {
        self.dispatch(DomEvent::new(EventKind::Change, target, true), env)
    }

    /// Registers a host observer for `change` events reaching `node`.
    ///
    /// The observer is released with the fragment.
    pub fn add_change_observer(
        &mut self,
        node: NodeId,
        observer: impl FnMut(&DomEvent) + 'static,
    ) -> Option<ListenerId> {
        let id = self.fragment.add_listener(
            node,
            EventKind::Change,
            EventHandler::Observer(Box::new(observer)),
        );
        self.scope.register(&mut self.fragment, node, vec![id])?;
        Some(id)
    }

    /// Adds a teardown callback run when this fragment is discarded.
    pub fn on_unload(&mut self, teardown: impl FnOnce() + 'static) {
        self.scope.on_unload(teardown);
    }

    /// Releases all listeners. Returns the number removed.
    pub fn unload(&mut self) -> usize {
        self.scope.unload(&mut self.fragment)
    }

    /// Whether every surrogate shows the glyph for its native state.
    pub fn is_consistent(&self, settings: &ChecklistSettings) -> bool {
        self.bindings.iter().all(|binding| {
            let checked = self
                .fragment
                .element(binding.native)
                .is_some_and(|element| element.checked());
            let expected = glyph_for(binding.resolved_tag.as_deref(), checked, settings);
            binding.checked == checked && self.fragment.text_content(binding.surrogate) == expected
        })
    }

    fn add_route(
        &mut self,
        node: NodeId,
        kind: EventKind,
        binding: usize,
        action: RouteAction,
    ) -> ListenerId {
        self.routes.push(Route { binding, action });
        self.fragment
            .add_listener(node, kind, EventHandler::Route(self.routes.len() - 1))
    }

    fn dispatch(&mut self, mut event: DomEvent, env: &mut RenderEnv<'_>) -> DomEvent {
        let path = if event.bubbles {
            self.fragment.ancestors_inclusive(event.target)
        } else {
            vec![event.target]
        };

        for node in path {
            event.current_target = node;
            for listener in self.fragment.listeners_on(node, event.kind) {
                if !self.fragment.has_listener(listener) {
                    continue;
                }
                match self.fragment.route_of(listener) {
                    Some(token) => self.run_route(token, &mut event, env),
                    None => {
                        self.fragment.notify_observer(listener, &event);
                    }
                }
            }
            if event.propagation_stopped() {
                break;
            }
        }
        event.current_target = event.target;

        if event.kind == EventKind::Click && !event.default_prevented() {
            self.run_checkbox_default_action(event.target, env);
        }
        event
    }

    fn run_checkbox_default_action(&mut self, target: NodeId, env: &mut RenderEnv<'_>) {
        let Some(element) = self.fragment.element_mut(target) else {
            return;
        };
        if !element.is_checkbox() {
            return;
        }
        let checked = !element.checked();
        element.set_checked(checked);
        self.dispatch(DomEvent::new(EventKind::Change, target, true), env);
    }

    fn run_route(&mut self, token: usize, event: &mut DomEvent, env: &mut RenderEnv<'_>) {
        let Some(route) = self.routes.get(token).copied() else {
            return;
        };
        match route.action {
            RouteAction::SurrogateClick => self.toggle_from_surrogate(route.binding, event, env),
            RouteAction::NativeChange => self.settle_from_native(route.binding, env),
        }
    }

    fn toggle_from_surrogate(
        &mut self,
        binding: usize,
        event: &mut DomEvent,
        env: &mut RenderEnv<'_>,
    ) {
        event.prevent_default();
        event.stop_propagation();

        let Some(native) = self.bindings.get(binding).map(|binding| binding.native) else {
            return;
        };
        let Some(element) = self.fragment.element_mut(native) else {
            return;
        };
        let checked = !element.checked();
        element.set_checked(checked);
        self.bindings[binding].checked = checked;
        self.refresh_surrogate(binding, env.settings);

        // Other collaborators observe native changes; they are not awaited.
        let change = DomEvent::new(EventKind::Change, native, true).synthetic();
        self.dispatch(change, env);

        self.reconcile_binding(binding, env);
    }

    fn settle_from_native(&mut self, binding: usize, env: &mut RenderEnv<'_>) {
        let Some(native) = self.bindings.get(binding).map(|binding| binding.native) else {
            return;
        };
        let checked = self
            .fragment
            .element(native)
            .is_some_and(|element| element.checked());
        self.bindings[binding].checked = checked;
        self.refresh_surrogate(binding, env.settings);
        self.reconcile_binding(binding, env);
    }

    fn refresh_surrogate(&mut self, binding: usize, settings: &ChecklistSettings) {
        let Some(current) = self.bindings.get(binding) else {
            return;
        };
        let glyph = glyph_for(current.resolved_tag.as_deref(), current.checked, settings).to_string();
        let surrogate = current.surrogate;
        self.fragment.set_text_content(surrogate, glyph);
    }

    fn reconcile_binding(
        &self,
        binding: usize,
        env: &mut RenderEnv<'_>,
    ) -> Option<ReconcileOutcome> {
        let current = self.bindings.get(binding)?;
        let line = current.line_index?;
        let glyph = glyph_for(current.resolved_tag.as_deref(), current.checked, env.settings);
        let buffer = env.buffer.as_deref_mut()?;
        Some(reconcile(buffer, line, glyph))
    }
}

#[cfg(test)]
mod tests {
    use super::{BindOutcome, RenderEnv, RenderedFragment, SectionInfo};
    use crate::editor::buffer::LineBuffer;
    use crate::editor::sync::ReconcileOutcome;
    use crate::model::settings::ChecklistSettings;
    use crate::render::dom::{Fragment, NodeId, TASK_CHECKBOX_CLASS};

    fn single_item(text: &str, checked: bool) -> (Fragment, NodeId) {
        let mut fragment = Fragment::new();
        let list = fragment.append_element(fragment.root(), "ul");
        let item = fragment.append_element(list, "li");
        fragment
            .element_mut(item)
            .expect("li")
            .add_class("task-list-item");
        let input = fragment.append_element(item, "input");
        let element = fragment.element_mut(input).expect("input");
        element.set_attribute("type", "checkbox");
        element.add_class(TASK_CHECKBOX_CLASS);
        element.set_checked(checked);
        fragment.append_text(item, text);
        (fragment, input)
    }

    #[test]
    fn bind_hides_native_and_inserts_surrogate_after_it() {
        let settings = ChecklistSettings::default();
        let (fragment, input) = single_item("write docs", false);
        let mut rendered = RenderedFragment::new(fragment, None);
        let mut env = RenderEnv::display_only(&settings);

        assert_eq!(rendered.bind(input, 0, &mut env), BindOutcome::Bound(None));
        let binding = rendered.bindings()[0].clone();
        assert_eq!(rendered.fragment().next_sibling(input), Some(binding.surrogate));
        assert!(rendered
            .fragment()
            .element(input)
            .expect("input")
            .is_hidden());
        assert_eq!(rendered.fragment().text_content(binding.surrogate), "⭕");
        assert!(rendered.is_consistent(&settings));
    }

    #[test]
    fn binding_twice_is_rejected() {
        let settings = ChecklistSettings::default();
        let (fragment, input) = single_item("task", false);
        let mut rendered = RenderedFragment::new(fragment, None);
        let mut env = RenderEnv::display_only(&settings);
        rendered.bind(input, 0, &mut env);
        assert_eq!(rendered.bind(input, 0, &mut env), BindOutcome::AlreadyBound);
    }

    #[test]
    fn surrogate_click_prevents_default_and_stops_propagation() {
        let settings = ChecklistSettings::default();
        let (fragment, input) = single_item("task", false);
        let mut rendered = RenderedFragment::new(fragment, None);
        let mut env = RenderEnv::display_only(&settings);
        rendered.bind(input, 0, &mut env);
        let surrogate = rendered.bindings()[0].surrogate;

        let event = rendered.click(surrogate, &mut env);
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());
        assert!(rendered.bindings()[0].checked);
        assert_eq!(rendered.fragment().text_content(surrogate), "✅");
    }

    #[test]
    fn out_of_section_index_is_display_only() {
        let settings = ChecklistSettings::default();
        let (fragment, input) = single_item("task", false);
        let mut rendered = RenderedFragment::new(fragment, Some(SectionInfo::new(4, 4)));
        let mut buffer = LineBuffer::from_text("a\nb\nc\nd\n[ ] task\n[ ] other");
        let mut env = RenderEnv::editable(&settings, &mut buffer);

        assert_eq!(
            rendered.bind(input, 1, &mut env),
            BindOutcome::Bound(None)
        );
        assert_eq!(rendered.bindings()[0].line_index, None);
        assert!(buffer.history().is_empty());
    }

    #[test]
    fn bind_reconciles_the_section_line() {
        let settings = ChecklistSettings::default();
        let (fragment, input) = single_item("task", false);
        let mut rendered = RenderedFragment::new(fragment, Some(SectionInfo::new(1, 1)));
        let mut buffer = LineBuffer::from_text("# heading\n- [ ] task");
        let mut env = RenderEnv::editable(&settings, &mut buffer);

        assert_eq!(
            rendered.bind(input, 0, &mut env),
            BindOutcome::Bound(Some(ReconcileOutcome::Updated))
        );
        assert_eq!(buffer.to_text(), "# heading\n- [ ] ⭕ task");
    }

    #[test]
    fn checkbox_outside_list_item_is_skipped() {
        let settings = ChecklistSettings::default();
        let mut fragment = Fragment::new();
        let input = fragment.append_element(fragment.root(), "input");
        let element = fragment.element_mut(input).expect("input");
        element.set_attribute("type", "checkbox");
        element.add_class(TASK_CHECKBOX_CLASS);

        let mut rendered = RenderedFragment::new(fragment, None);
        let mut env = RenderEnv::display_only(&settings);
        assert_eq!(rendered.bind(input, 0, &mut env), BindOutcome::Malformed);
        assert!(rendered.bindings().is_empty());
        assert!(!rendered
            .fragment()
            .element(input)
            .expect("input")
            .is_hidden());
    }
}

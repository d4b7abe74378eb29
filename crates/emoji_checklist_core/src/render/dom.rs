//! Minimal arena DOM for rendered fragments.
//!
//! # Responsibility
//! - Hold one rendered block as an element/text tree.
//! - Provide the queries and mutations the checklist binder needs.
//! - Keep per-node event listener registrations.
//!
//! # Invariants
//! - `NodeId`s are stable for the fragment lifetime; nodes are never freed.
//! - A node has at most one parent; `insert_after`/`append_child` detach first.
//! - Listeners on one node run in registration order.

use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const TASK_LIST_ITEM_CLASS: &str = "task-list-item";
pub const TASK_CHECKBOX_CLASS: &str = "task-list-item-checkbox";

/// Stable node handle inside one `Fragment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// Stable listener handle inside one `Fragment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Change,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Change => "change",
        }
    }
}

/// Event travelling through the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    pub current_target: NodeId,
    pub bubbles: bool,
    /// Set for events created by code rather than by the user.
    pub synthetic: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(kind: EventKind, target: NodeId, bubbles: bool) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            bubbles,
            synthetic: false,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Listener body.
pub enum EventHandler {
    /// Opaque route token resolved by the owner of the fragment.
    Route(usize),
    /// Host observer. Sees the event but cannot alter it.
    Observer(Box<dyn FnMut(&DomEvent)>),
}

struct Listener {
    node: NodeId,
    kind: EventKind,
    handler: EventHandler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    checked: bool,
    hidden: bool,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            checked: false,
            hidden: false,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|value| value == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn is_checkbox(&self) -> bool {
        self.tag == "input"
            && self
                .attribute("type")
                .is_some_and(|value| value.eq_ignore_ascii_case("checkbox"))
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    /// Whether the element is visually hidden (`display: none`).
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One rendered block of document content.
pub struct Fragment {
    nodes: Vec<Node>,
    listeners: Vec<Option<Listener>>,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragment {
    /// Creates a fragment with an empty `div` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Element(Element::new("div")),
                parent: None,
                children: Vec::new(),
            }],
            listeners: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(Element::new(tag)))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    /// Creates an element and appends it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Creates a text node and appends it to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `node` as the next sibling of `reference`.
    ///
    /// Returns `false` and leaves `node` untouched when `reference` has no
    /// parent.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> bool {
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        self.detach(node);
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings
            .iter()
            .position(|id| *id == reference)
            .map_or(siblings.len(), |index| index + 1);
        siblings.insert(position, node);
        self.nodes[node.0].parent = Some(parent);
        true
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(index + 1).copied()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|node| &node.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id)? {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.data)? {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    /// Concatenated text of `id` and all of its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_content_filtered(id, |_| false)
    }

    /// Like `text_content`, skipping subtrees whose element matches `skip`.
    pub fn text_content_filtered(&self, id: NodeId, skip: impl Fn(&Element) -> bool) -> String {
        let mut out = String::new();
        self.collect_text(id, &skip, &mut out);
        out
    }

    /// Replaces all children of `id` with one text node.
    ///
    /// A lone text child is rewritten in place, so repeated refreshes do
    /// not grow the arena.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        if let [only] = self.nodes[id.0].children.as_slice() {
            let only = *only;
            if let NodeData::Text(existing) = &mut self.nodes[only.0].data {
                *existing = text.into();
                return;
            }
        }
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        let text_node = self.create_text(text);
        self.append_child(id, text_node);
    }

    /// Nodes below `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Nearest inclusive ancestor whose element satisfies `predicate`.
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&Element) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.element(node).is_some_and(&predicate) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// `id` followed by its ancestors up to the root.
    pub fn ancestors_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Checkbox inputs that belong to task-list items, in document order.
    ///
    /// An input qualifies when it carries the task checkbox class or sits
    /// inside an `li.task-list-item`. Enclosing-item checks are the
    /// binder's job.
    pub fn task_checkboxes(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| {
                let Some(element) = self.element(*id) else {
                    return false;
                };
                element.is_checkbox()
                    && (element.has_class(TASK_CHECKBOX_CLASS)
                        || self.closest(*id, is_task_list_item).is_some())
            })
            .collect()
    }

    pub fn add_listener(
        &mut self,
        node: NodeId,
        kind: EventKind,
        handler: EventHandler,
    ) -> ListenerId {
        self.listeners.push(Some(Listener {
            node,
            kind,
            handler,
        }));
        ListenerId(self.listeners.len() - 1)
    }

    /// Removes one listener. Returns `false` if it was already removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners
            .get_mut(id.0)
            .and_then(Option::take)
            .is_some()
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        matches!(self.listeners.get(id.0), Some(Some(_)))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.iter().flatten().count()
    }

    /// Live listeners for `kind` on `node`, in registration order.
    pub fn listeners_on(&self, node: NodeId, kind: EventKind) -> Vec<ListenerId> {
        self.listeners
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                entry
                    .as_ref()
                    .filter(|listener| listener.node == node && listener.kind == kind)
                    .map(|_| ListenerId(index))
            })
            .collect()
    }

    /// Route token of a listener, or `None` for observers and removed ids.
    pub fn route_of(&self, id: ListenerId) -> Option<usize> {
        match &self.listeners.get(id.0)?.as_ref()?.handler {
            EventHandler::Route(token) => Some(*token),
            EventHandler::Observer(_) => None,
        }
    }

    /// Invokes an observer listener. Returns `false` for routes/removed ids.
    pub fn notify_observer(&mut self, id: ListenerId, event: &DomEvent) -> bool {
        match self.listeners.get_mut(id.0) {
            Some(Some(Listener {
                handler: EventHandler::Observer(observer),
                ..
            })) => {
                observer(event);
                true
            }
            _ => false,
        }
    }

    /// Serializes the subtree of `id` (exclusive) as HTML.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(&escape_html(text)),
            Some(NodeData::Element(element)) => {
                let _ = write!(out, "<{}", element.tag);
                if !element.classes.is_empty() {
                    let _ = write!(out, " class=\"{}\"", escape_html(&element.classes.join(" ")));
                }
                for (name, value) in &element.attributes {
                    let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
                }
                if element.is_checkbox() && element.checked {
                    out.push_str(" checked");
                }
                if element.hidden {
                    out.push_str(" style=\"display: none\"");
                }
                out.push('>');
                if is_void_element(&element.tag) {
                    return;
                }
                for child in self.children(id) {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
            None => {}
        }
    }

    fn collect_text(&self, id: NodeId, skip: &impl Fn(&Element) -> bool, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element(element)) => {
                if skip(element) {
                    return;
                }
                for child in self.children(id) {
                    self.collect_text(*child, skip, out);
                }
            }
            None => {}
        }
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }
}

/// Matches `li.task-list-item`.
pub fn is_task_list_item(element: &Element) -> bool {
    element.tag == "li" && element.has_class(TASK_LIST_ITEM_CLASS)
}

/// Matches nested list containers.
pub fn is_list_container(element: &Element) -> bool {
    element.tag == "ul" || element.tag == "ol"
}

fn is_void_element(tag: &str) -> bool {
    matches!(tag, "input" | "br" | "hr" | "img")
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

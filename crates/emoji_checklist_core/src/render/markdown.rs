//! Markdown-to-fragment rendering for task lists.
//!
//! Produces the same task-list shape a host renderer emits
//! (`ul.contains-task-list > li.task-list-item > input.task-list-item-checkbox`),
//! one fragment per top-level block with its source line span.

use crate::render::binder::SectionInfo;
use crate::render::dom::{Fragment, NodeId, TASK_CHECKBOX_CLASS, TASK_LIST_ITEM_CLASS};
use pulldown_cmark::{Event, Options, Parser, Tag};

const CONTAINS_TASK_LIST_CLASS: &str = "contains-task-list";

/// One top-level markdown block rendered into its own fragment.
pub struct RenderedSection {
    pub fragment: Fragment,
    pub section: SectionInfo,
}

/// Renders `source` into one fragment per top-level block.
pub fn render_sections(source: &str) -> Vec<RenderedSection> {
    let line_starts = line_start_offsets(source);
    let line_of = |offset: usize| line_starts.partition_point(|start| *start <= offset) - 1;

    let mut sections = Vec::new();
    let mut current: Option<(FragmentBuilder, SectionInfo)> = None;
    let mut depth = 0usize;

    for (event, range) in Parser::new_ext(source, markdown_options()).into_offset_iter() {
        let last_byte = range.end.saturating_sub(1).max(range.start);
        let section = SectionInfo::new(line_of(range.start), line_of(last_byte));
        match event {
            Event::Start(tag) => {
                let (builder, _) = current.get_or_insert_with(|| (FragmentBuilder::new(), section));
                builder.start(tag);
                depth += 1;
            }
            Event::End(_) => {
                if let Some((builder, _)) = current.as_mut() {
                    builder.end();
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some((builder, section)) = current.take() {
                        sections.push(RenderedSection {
                            fragment: builder.finish(),
                            section,
                        });
                    }
                }
            }
            other => match current.as_mut() {
                Some((builder, _)) => builder.leaf(other),
                None => {
                    let mut builder = FragmentBuilder::new();
                    builder.leaf(other);
                    sections.push(RenderedSection {
                        fragment: builder.finish(),
                        section,
                    });
                }
            },
        }
    }
    sections
}

/// Renders the whole of `source` into a single fragment.
pub fn render_fragment(source: &str) -> Fragment {
    let mut builder = FragmentBuilder::new();
    for event in Parser::new_ext(source, markdown_options()) {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(_) => builder.end(),
            other => builder.leaf(other),
        }
    }
    builder.finish()
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options
}

fn line_start_offsets(source: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(index, _)| index + 1))
        .collect()
}

struct FragmentBuilder {
    fragment: Fragment,
    stack: Vec<NodeId>,
}

impl FragmentBuilder {
    fn new() -> Self {
        let fragment = Fragment::new();
        let root = fragment.root();
        Self {
            fragment,
            stack: vec![root],
        }
    }

    fn top(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.fragment.root())
    }

    fn start(&mut self, tag: Tag<'_>) {
        let parent = self.top();
        let node = match tag {
            Tag::Paragraph => self.fragment.append_element(parent, "p"),
            Tag::Heading { level, .. } => {
                self.fragment
                    .append_element(parent, &format!("h{}", level as usize))
            }
            Tag::BlockQuote(..) => self.fragment.append_element(parent, "blockquote"),
            Tag::CodeBlock(_) => self.fragment.append_element(parent, "pre"),
            Tag::List(Some(start)) => {
                let list = self.fragment.append_element(parent, "ol");
                if start != 1 {
                    if let Some(element) = self.fragment.element_mut(list) {
                        element.set_attribute("start", start.to_string());
                    }
                }
                list
            }
            Tag::List(None) => self.fragment.append_element(parent, "ul"),
            Tag::Item => self.fragment.append_element(parent, "li"),
            Tag::Emphasis => self.fragment.append_element(parent, "em"),
            Tag::Strong => self.fragment.append_element(parent, "strong"),
            Tag::Strikethrough => self.fragment.append_element(parent, "del"),
            Tag::Link { dest_url, .. } => {
                let link = self.fragment.append_element(parent, "a");
                if let Some(element) = self.fragment.element_mut(link) {
                    element.set_attribute("href", dest_url.to_string());
                }
                link
            }
            Tag::Table(_) => self.fragment.append_element(parent, "table"),
            Tag::TableRow | Tag::TableHead => self.fragment.append_element(parent, "tr"),
            Tag::TableCell => self.fragment.append_element(parent, "td"),
            _ => self.fragment.append_element(parent, "span"),
        };
        self.stack.push(node);
    }

    fn end(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn leaf(&mut self, event: Event<'_>) {
        let parent = self.top();
        match event {
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.fragment.append_text(parent, text.to_string());
            }
            Event::Code(text) => {
                let code = self.fragment.append_element(parent, "code");
                self.fragment.append_text(code, text.to_string());
            }
            Event::SoftBreak => {
                self.fragment.append_text(parent, "\n");
            }
            Event::HardBreak => {
                self.fragment.append_element(parent, "br");
            }
            Event::Rule => {
                self.fragment.append_element(parent, "hr");
            }
            Event::TaskListMarker(checked) => self.task_marker(parent, checked),
            _ => {}
        }
    }

    fn task_marker(&mut self, parent: NodeId, checked: bool) {
        let input = self.fragment.append_element(parent, "input");
        if let Some(element) = self.fragment.element_mut(input) {
            element.set_attribute("type", "checkbox");
            element.add_class(TASK_CHECKBOX_CLASS);
            element.set_checked(checked);
        }

        // Loose items wrap the marker in a paragraph; walk up to the item.
        let item = self.stack.iter().rev().copied().find(|id| {
            self.fragment
                .element(*id)
                .is_some_and(|element| element.tag == "li")
        });
        let Some(item) = item else {
            return;
        };
        if let Some(element) = self.fragment.element_mut(item) {
            element.add_class(TASK_LIST_ITEM_CLASS);
            element.set_attribute("data-task", if checked { "x" } else { " " });
        }
        if let Some(list) = self.fragment.parent(item) {
            if let Some(element) = self.fragment.element_mut(list) {
                element.add_class(CONTAINS_TASK_LIST_CLASS);
            }
        }
    }

    fn finish(self) -> Fragment {
        self.fragment
    }
}

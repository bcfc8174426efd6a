//! One `w:p` element as an owned node list.
//!
//! Runs are pulled out of the event stream into their own nodes so the whole
//! run collection can be dropped and replaced in one step, leaving every
//! other piece of paragraph markup (properties, bookmarks, hyperlink shells)
//! where it was.

use anyhow::{anyhow, Context};

use crate::docx::style::StyleDescriptor;
use crate::docx::xml::{find_attr, matching_end, XmlEvent};

/// Elements that may sit between a paragraph and its runs without hiding them.
const INLINE_RUN_WRAPPERS: [&str; 6] = [
    "w:hyperlink",
    "w:smartTag",
    "w:customXml",
    "w:ins",
    "w:dir",
    "w:bdo",
];

#[derive(Clone, Debug)]
pub struct Run {
    /// Full subtree, `<w:r>` through `</w:r>`.
    events: Vec<XmlEvent>,
    text: Option<String>,
}

impl Run {
    fn from_events(events: Vec<XmlEvent>) -> Self {
        let mut collector = TextCollector::default();
        for ev in &events {
            collector.feed(ev);
        }
        let text = (!collector.unreadable).then_some(collector.out);
        Self { events, text }
    }

    /// A fresh run carrying `text` with `style` stamped on it. Tabs and line
    /// breaks become `w:tab` / `w:br` elements.
    pub fn new(text: &str, style: &StyleDescriptor) -> Self {
        let mut events = vec![XmlEvent::start("w:r", Vec::new())];
        events.extend(style.to_rpr_events());

        let mut pending = String::new();
        let mut wrote_any = false;
        for ch in text.chars() {
            match ch {
                '\t' | '\n' => {
                    if !pending.is_empty() {
                        push_t(&mut events, &pending);
                        pending.clear();
                    }
                    let tag = if ch == '\t' { "w:tab" } else { "w:br" };
                    events.push(XmlEvent::empty(tag, Vec::new()));
                    wrote_any = true;
                }
                '\r' => {}
                _ => pending.push(ch),
            }
        }
        if !pending.is_empty() || !wrote_any {
            push_t(&mut events, &pending);
        }
        events.push(XmlEvent::end("w:r"));
        Self::from_events(events)
    }

    /// Visible text of the run, or `None` when its markup cannot be read as text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn style(&self) -> StyleDescriptor {
        let n = self.events.len();
        if n < 2 {
            return StyleDescriptor::default();
        }
        StyleDescriptor::from_run_events(&self.events[1..n - 1])
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }
}

fn push_t(events: &mut Vec<XmlEvent>, text: &str) {
    events.push(XmlEvent::start(
        "w:t",
        vec![("xml:space".to_string(), "preserve".to_string())],
    ));
    if !text.is_empty() {
        events.push(XmlEvent::text(text));
    }
    events.push(XmlEvent::end("w:t"));
}

#[derive(Clone, Debug)]
pub enum ParagraphNode {
    Markup(XmlEvent),
    Run(Run),
}

#[derive(Clone, Debug)]
pub struct Paragraph {
    open: XmlEvent,
    nodes: Vec<ParagraphNode>,
    close: XmlEvent,
}

impl Paragraph {
    /// `events` must be exactly one `<w:p>...</w:p>` element.
    pub fn from_events(events: &[XmlEvent]) -> anyhow::Result<Self> {
        let (open, close) = match (events.first(), events.last()) {
            (Some(o), Some(c)) if o.is_start_of("w:p") && c.is_end_of("w:p") && events.len() >= 2 => {
                (o.clone(), c.clone())
            }
            _ => return Err(anyhow!("not a w:p element")),
        };
        let inner = &events[1..events.len() - 1];

        let mut nodes = Vec::with_capacity(inner.len());
        let mut wrappers: Vec<&str> = Vec::new();
        let mut i = 0usize;
        while i < inner.len() {
            let ev = &inner[i];
            match ev {
                XmlEvent::Start { name, .. } => {
                    let in_inline_context = wrappers
                        .iter()
                        .all(|w| INLINE_RUN_WRAPPERS.contains(w));
                    if name == "w:r" && in_inline_context {
                        let end = matching_end(inner, i)
                            .with_context(|| format!("unterminated w:r at event {i}"))?;
                        nodes.push(ParagraphNode::Run(Run::from_events(inner[i..=end].to_vec())));
                        i = end + 1;
                        continue;
                    }
                    wrappers.push(name.as_str());
                }
                XmlEvent::End { .. } => {
                    wrappers.pop();
                }
                _ => {}
            }
            nodes.push(ParagraphNode::Markup(ev.clone()));
            i += 1;
        }

        Ok(Self { open, nodes, close })
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.nodes.iter().filter_map(|n| match n {
            ParagraphNode::Run(r) => Some(r),
            ParagraphNode::Markup(_) => None,
        })
    }

    pub fn run_count(&self) -> usize {
        self.runs().count()
    }

    /// Flattened text of the whole paragraph, including text that lives
    /// outside the run list (e.g. inside content controls).
    pub fn text(&self) -> String {
        let mut collector = TextCollector::default();
        for node in &self.nodes {
            match node {
                ParagraphNode::Run(r) => {
                    for ev in r.events() {
                        collector.feed(ev);
                    }
                }
                ParagraphNode::Markup(ev) => collector.feed(ev),
            }
        }
        collector.out
    }

    /// Destroys every run and appends `runs`, in order, at the end of the
    /// paragraph. Non-run markup keeps its position.
    pub fn replace_runs(&mut self, runs: Vec<Run>) {
        self.nodes.retain(|n| matches!(n, ParagraphNode::Markup(_)));
        self.nodes.extend(runs.into_iter().map(ParagraphNode::Run));
    }

    /// Like [`Paragraph::replace_runs`], but also drops every top-level
    /// markup element that carries visible text (an inline content control,
    /// say). For runs rebuilt from [`Paragraph::text`], which already holds
    /// that text.
    pub fn replace_text(&mut self, runs: Vec<Run>) {
        let mut kept = Vec::with_capacity(self.nodes.len());
        let mut pending = Vec::new();
        let mut collector = TextCollector::default();
        let mut depth = 0usize;
        for node in std::mem::take(&mut self.nodes) {
            let ParagraphNode::Markup(ev) = node else {
                continue;
            };
            match &ev {
                XmlEvent::Start { .. } => depth += 1,
                XmlEvent::End { .. } => depth = depth.saturating_sub(1),
                _ => {}
            }
            collector.feed(&ev);
            pending.push(ParagraphNode::Markup(ev));
            if depth == 0 {
                if collector.out.is_empty() {
                    kept.append(&mut pending);
                } else {
                    pending.clear();
                }
                collector = TextCollector::default();
            }
        }
        kept.append(&mut pending);
        kept.extend(runs.into_iter().map(ParagraphNode::Run));
        self.nodes = kept;
    }

    pub fn to_events(&self) -> Vec<XmlEvent> {
        let mut out = Vec::with_capacity(self.nodes.len() + 2);
        out.push(self.open.clone());
        for node in &self.nodes {
            match node {
                ParagraphNode::Markup(ev) => out.push(ev.clone()),
                ParagraphNode::Run(r) => out.extend(r.events().iter().cloned()),
            }
        }
        out.push(self.close.clone());
        out
    }
}

/// Accumulates visible text the way a word processor's plain-text view does:
/// `w:t` content, tabs and breaks that are direct run children, and nothing
/// from nested (text box) paragraphs.
#[derive(Default)]
pub(crate) struct TextCollector {
    stack: Vec<String>,
    pub(crate) out: String,
    pub(crate) unreadable: bool,
}

impl TextCollector {
    pub(crate) fn feed(&mut self, ev: &XmlEvent) {
        match ev {
            XmlEvent::Start { name, .. } => {
                if self.parent() == Some("w:t") {
                    self.unreadable = true;
                }
                self.stack.push(name.clone());
            }
            XmlEvent::End { .. } => {
                self.stack.pop();
            }
            XmlEvent::Empty { name, attrs } => {
                if self.parent() != Some("w:r") || self.nested_paragraph() {
                    return;
                }
                match name.as_str() {
                    "w:tab" | "w:ptab" => self.out.push('\t'),
                    "w:cr" => self.out.push('\n'),
                    "w:br" => {
                        if find_attr(attrs, "w:type").unwrap_or("textWrapping") == "textWrapping" {
                            self.out.push('\n');
                        }
                    }
                    "w:noBreakHyphen" => self.out.push('-'),
                    _ => {}
                }
            }
            XmlEvent::Text { text } | XmlEvent::CData { text } => {
                if self.parent() == Some("w:t") && !self.nested_paragraph() {
                    self.out.push_str(text);
                }
            }
            _ => {}
        }
    }

    fn parent(&self) -> Option<&str> {
        self.stack.last().map(|s| s.as_str())
    }

    fn nested_paragraph(&self) -> bool {
        self.stack.iter().any(|s| s == "w:p")
    }
}

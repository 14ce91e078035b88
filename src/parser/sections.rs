use tracing::trace;

use super::model::{ContentNode, ParsedSection};
use super::precedence::{classify, HeadingCategory};
use super::tree::{is_phrasing, normalize_text, Document, Item, NodeId};
use super::ParserOptions;

/// Emitted with their full text unless a heading sits inside.
const BLOCK_TAGS: &[&str] = &[
    "p", "li", "blockquote", "pre", "td", "th", "dd", "dt", "figcaption", "caption", "address",
];

/// Open sections, outermost first, with their rank.
///
/// Ranks are strictly increasing from bottom to top. Opening a section at
/// rank `r` first folds away every open section ranked `r` or deeper.
#[derive(Debug, Default)]
pub struct SectionStack {
    frames: Vec<(ParsedSection, usize)>,
    out: Vec<ContentNode>,
}

impl SectionStack {
    pub fn push_text(&mut self, text: String) {
        let node = ContentNode::text(text);
        match self.frames.last_mut() {
            Some((section, _)) => section.content.push(node),
            None => self.out.push(node),
        }
    }

    pub fn open(&mut self, name: String, rank: usize) {
        self.close_from(rank);
        self.frames.push((ParsedSection::new(name), rank));
    }

    /// Fold every open section with rank `>= rank` into its parent.
    fn close_from(&mut self, rank: usize) {
        while self.frames.last().is_some_and(|(_, r)| *r >= rank) {
            let Some((section, _)) = self.frames.pop() else {
                break;
            };
            let node = ContentNode::Section(section);
            match self.frames.last_mut() {
                Some((parent, _)) => parent.content.push(node),
                None => self.out.push(node),
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn finish(mut self) -> Vec<ContentNode> {
        self.close_from(0);
        self.out
    }
}

/// Rebuild the section tree of `scope`.
///
/// A heading's rank is its index in `precedence`; rank 0 is the title
/// category, so a repeat of it closes everything and opens a top-level
/// section. The `title` node itself is skipped.
pub fn build_sections(
    doc: &Document,
    scope: NodeId,
    precedence: &[HeadingCategory],
    title: Option<NodeId>,
    options: &ParserOptions,
) -> Vec<ContentNode> {
    let mut walk = SectionWalk {
        doc,
        precedence,
        title,
        options,
        stack: SectionStack::default(),
        run: String::new(),
    };
    walk.visit(scope);
    walk.flush();
    walk.stack.finish()
}

/// Document-order walk feeding a [`SectionStack`].
///
/// Headings, the title and blocks without a heading inside are consumed
/// whole. Everything else is descended into; its loose text collects in
/// `run` until the next non-phrasing boundary.
struct SectionWalk<'a> {
    doc: &'a Document,
    precedence: &'a [HeadingCategory],
    title: Option<NodeId>,
    options: &'a ParserOptions,
    stack: SectionStack,
    run: String,
}

impl SectionWalk<'_> {
    fn visit(&mut self, id: NodeId) {
        let doc = self.doc;
        let tag = doc.tag(id).unwrap_or_default();

        if self.title == Some(id) {
            self.flush();
            return;
        }

        if let Some(category) = classify(doc, id, self.options) {
            self.flush();
            let name = doc.text(id);
            if name.is_empty() {
                return;
            }
            match self.precedence.iter().position(|c| *c == category) {
                Some(rank) => {
                    trace!(rank, depth = self.stack.depth(), %name, "open section");
                    self.stack.open(name, rank);
                }
                None => self.stack.push_text(name),
            }
            return;
        }

        if BLOCK_TAGS.contains(&tag) && !self.holds_heading(id) {
            self.flush();
            let text = doc.text(id);
            if !text.is_empty() {
                self.stack.push_text(text);
            }
            return;
        }

        if tag == "br" {
            self.run.push(' ');
            return;
        }
        let breaks = !is_phrasing(tag);
        if breaks {
            self.flush();
        }
        for item in doc.items(id) {
            match item {
                Item::Text(t) => self.run.push_str(t),
                Item::Child(c) => self.visit(*c),
            }
        }
        if breaks {
            self.flush();
        }
    }

    fn holds_heading(&self, id: NodeId) -> bool {
        self.doc
            .descendants(id)
            .any(|d| classify(self.doc, d, self.options).is_some())
    }

    fn flush(&mut self) {
        let text = normalize_text(&self.run);
        self.run.clear();
        if !text.is_empty() {
            self.stack.push_text(text);
        }
    }
}

// ── Tests ──

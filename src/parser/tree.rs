use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Elements whose content never reaches the arena.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Text-level elements. Text flows across them; any other element separates words.
const PHRASING_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "del", "dfn", "em", "font", "i",
    "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub",
    "sup", "time", "tt", "u", "var",
];

pub fn is_phrasing(tag: &str) -> bool {
    PHRASING_TAGS.contains(&tag)
}

/// Stable node handle: the node's pre-order index in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    Text(String),
    Child(NodeId),
}

#[derive(Debug, Clone)]
struct NodeData {
    /// `None` only for the document root.
    tag: Option<String>,
    parent: Option<NodeId>,
    /// Inclusive pre-order index of the last node in this subtree.
    last_descendant: usize,
    items: Vec<Item>,
}

/// Read-only arena built from a parsed HTML document.
///
/// Only the document root and element nodes get ids; text is stored on its
/// owning element in document order next to the element's children. Since ids
/// are assigned in pre-order, the subtree of `id` is exactly the id range
/// `id..=last_descendant(id)`.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let html = Html::parse_document(html);
        let mut nodes: Vec<NodeData> = Vec::new();

        // Children are pushed in reverse so they pop in document order,
        // which keeps ids in pre-order.
        let mut stack = vec![(html.tree.root(), None::<NodeId>)];
        while let Some((node, parent)) = stack.pop() {
            let tag = match node.value() {
                Node::Document | Node::Fragment => None,
                Node::Element(el) => {
                    let name = el.name().to_ascii_lowercase();
                    if SKIPPED_TAGS.contains(&name.as_str()) {
                        continue;
                    }
                    Some(name)
                }
                Node::Text(text) => {
                    if let Some(p) = parent {
                        nodes[p.0].items.push(Item::Text(String::from(&**text)));
                    }
                    continue;
                }
                _ => continue,
            };

            let id = NodeId(nodes.len());
            if let Some(p) = parent {
                nodes[p.0].items.push(Item::Child(id));
            }
            nodes.push(NodeData {
                tag,
                parent,
                last_descendant: id.0,
                items: Vec::new(),
            });
            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        // Children always carry larger ids than their parent.
        for i in (0..nodes.len()).rev() {
            let end = nodes[i].last_descendant;
            if let Some(p) = nodes[i].parent {
                let parent = &mut nodes[p.0];
                parent.last_descendant = parent.last_descendant.max(end);
            }
        }

        Document { nodes }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Lowercase tag name, `None` for the document root.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0)?.tag.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    /// Parent chain of `id`, nearest first, ending at the document root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn last_descendant(&self, id: NodeId) -> NodeId {
        NodeId(self.nodes[id.0].last_descendant)
    }

    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor < id && id <= self.last_descendant(ancestor)
    }

    /// Every node strictly below `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        (id.0 + 1..=self.nodes[id.0].last_descendant).map(NodeId)
    }

    /// Nodes below `scope` whose tag is one of `tags`, in document order.
    pub fn find_all<'a>(
        &'a self,
        scope: NodeId,
        tags: &'a [&'a str],
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(scope)
            .filter(move |&id| self.tag(id).is_some_and(|t| tags.contains(&t)))
    }

    /// Text runs and child elements of `id`, in document order.
    pub fn items(&self, id: NodeId) -> &[Item] {
        &self.nodes[id.0].items
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].items.iter().filter_map(|item| match item {
            Item::Child(c) => Some(*c),
            Item::Text(_) => None,
        })
    }

    /// Text owned by the node itself, untouched.
    pub fn direct_text(&self, id: NodeId) -> String {
        self.nodes[id.0]
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Text(t) => Some(t.as_str()),
                Item::Child(_) => None,
            })
            .collect()
    }

    /// Whitespace-normalized text of the whole subtree.
    pub fn text(&self, id: NodeId) -> String {
        self.text_where(id, |_| true)
    }

    /// Whitespace-normalized text of `id`, descending only into child
    /// elements whose tag passes `descend`. Non-phrasing children and `<br>`
    /// separate the words around them.
    pub fn text_where(&self, id: NodeId, descend: impl Fn(&str) -> bool) -> String {
        enum Step<'a> {
            Visit(&'a Item),
            Break,
        }

        let mut out = String::new();
        let mut stack: Vec<Step> = self.items(id).iter().rev().map(Step::Visit).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Break => out.push(' '),
                Step::Visit(Item::Text(t)) => out.push_str(t),
                Step::Visit(Item::Child(c)) => {
                    let Some(tag) = self.tag(*c) else {
                        continue;
                    };
                    let breaks = !is_phrasing(tag);
                    if breaks {
                        out.push(' ');
                    }
                    if descend(tag) {
                        if breaks {
                            stack.push(Step::Break);
                        }
                        stack.extend(self.items(*c).iter().rev().map(Step::Visit));
                    }
                }
            }
        }
        normalize_text(&out)
    }
}

pub fn normalize_text(s: &str) -> String {
    WS_RE.replace_all(s.trim(), " ").into_owned()
}

// ── Tests ──

use super::tree::{Document, NodeId};
use super::ParserOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeadingCategory {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    /// A block holding nothing but bold text, used as an inline heading.
    Emphasis,
}

impl HeadingCategory {
    /// Most significant first.
    pub const CANONICAL: [HeadingCategory; 7] = [
        HeadingCategory::H1,
        HeadingCategory::H2,
        HeadingCategory::H3,
        HeadingCategory::H4,
        HeadingCategory::H5,
        HeadingCategory::H6,
        HeadingCategory::Emphasis,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" => Some(HeadingCategory::H1),
            "h2" => Some(HeadingCategory::H2),
            "h3" => Some(HeadingCategory::H3),
            "h4" => Some(HeadingCategory::H4),
            "h5" => Some(HeadingCategory::H5),
            "h6" => Some(HeadingCategory::H6),
            _ => None,
        }
    }
}

const EMPHASIS_HOSTS: &[&str] = &["p", "div", "li"];
const EMPHASIS_TAGS: &[&str] = &["strong", "b"];

/// Heading category of a node, if it acts as one.
pub fn classify(doc: &Document, id: NodeId, options: &ParserOptions) -> Option<HeadingCategory> {
    let tag = doc.tag(id)?;
    if let Some(category) = HeadingCategory::from_tag(tag) {
        return Some(category);
    }
    (options.emphasis_headings && is_emphasis_heading(doc, id, tag, options.min_text_length))
        .then_some(HeadingCategory::Emphasis)
}

fn is_emphasis_heading(doc: &Document, id: NodeId, tag: &str, max_len: usize) -> bool {
    if !EMPHASIS_HOSTS.contains(&tag) || !doc.direct_text(id).trim().is_empty() {
        return false;
    }
    let mut children = doc.element_children(id);
    let only_bold = match (children.next(), children.next()) {
        (Some(child), None) => doc.tag(child).is_some_and(|t| EMPHASIS_TAGS.contains(&t)),
        _ => false,
    };
    if !only_bold {
        return false;
    }
    let text = doc.text(id);
    !text.is_empty() && text.chars().count() < max_len
}

/// Heading categories used anywhere in the document, in canonical order.
///
/// Observation order only decides membership; a document that opens with an
/// `<h3>` and later uses `<h2>` still ranks `h2` above `h3`.
pub fn rank_headings(doc: &Document, options: &ParserOptions) -> Vec<HeadingCategory> {
    let mut seen: Vec<HeadingCategory> = Vec::new();
    for id in doc.descendants(doc.root()) {
        if let Some(category) = classify(doc, id, options) {
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
    }
    HeadingCategory::CANONICAL
        .into_iter()
        .filter(|c| seen.contains(c))
        .collect()
}

/// First non-empty heading of the top-ranked category, anywhere in the document.
pub fn find_title(
    doc: &Document,
    precedence: &[HeadingCategory],
    options: &ParserOptions,
) -> Option<(NodeId, String)> {
    let top = *precedence.first()?;
    doc.descendants(doc.root())
        .filter(|&id| classify(doc, id, options) == Some(top))
        .map(|id| (id, doc.text(id)))
        .find(|(_, text)| !text.is_empty())
}

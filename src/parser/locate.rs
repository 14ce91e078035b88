use super::tree::{Document, NodeId};

pub const DEFAULT_MIN_LENGTH: usize = 100;

/// Tags whose own text can count as substantive content.
pub const TEXT_TAGS: &[&str] = &[
    "p", "li", "div", "span", "td", "dd", "blockquote", "section", "article", "main", "pre",
    "font",
];

/// Nodes whose trimmed direct text is at least `min_len` characters long.
pub fn find_long_text(doc: &Document, min_len: usize) -> Vec<NodeId> {
    doc.find_all(doc.root(), TEXT_TAGS)
        .filter(|&id| {
            let text = doc.direct_text(id);
            let text = text.trim();
            !text.is_empty() && text.chars().count() >= min_len
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_only_long_direct_text() {
        let long = "x".repeat(120);
        let html = format!(
            "<nav><a>Home</a></nav><p>short</p><div><p>{long}</p></div><h2>{long}</h2>"
        );
        let doc = Document::parse(&html);
        let found = find_long_text(&doc, DEFAULT_MIN_LENGTH);
        assert_eq!(found.len(), 1);
        assert_eq!(doc.tag(found[0]), Some("p"));
    }

    #[test]
    fn descendant_text_does_not_count() {
        let long = "y".repeat(150);
        let doc = Document::parse(&format!("<div><span>{long}</span></div>"));
        let found = find_long_text(&doc, DEFAULT_MIN_LENGTH);
        assert_eq!(found.len(), 1);
        assert_eq!(doc.tag(found[0]), Some("span"));
    }

    #[test]
    fn threshold_is_inclusive_and_trimmed() {
        let exact = "z".repeat(100);
        let doc = Document::parse(&format!("<p>   {exact}   </p><p>{}</p>", "z".repeat(99)));
        assert_eq!(find_long_text(&doc, 100).len(), 1);
    }

    #[test]
    fn empty_when_nothing_qualifies() {
        let doc = Document::parse("<p>tiny</p><li>also tiny</li>");
        assert!(find_long_text(&doc, DEFAULT_MIN_LENGTH).is_empty());
    }
}

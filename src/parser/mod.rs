pub mod error;
pub mod lca;
pub mod locate;
pub mod model;
pub mod precedence;
pub mod sections;
pub mod tree;

use tracing::{debug, warn};

use crate::db::{PolicyRow, StoredPage};
pub use error::ParseError;
pub use model::{ContentNode, ParsedPolicy, ParsedSection, TextNode};
use tree::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Minimum trimmed direct-text length for a node to count as content.
    pub min_text_length: usize,
    /// Treat blocks holding only bold text as the weakest heading level.
    pub emphasis_headings: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            min_text_length: locate::DEFAULT_MIN_LENGTH,
            emphasis_headings: false,
        }
    }
}

/// Recovers title and nested sections from one HTML document.
///
/// Pipeline: long-text nodes → their lowest common ancestor → heading
/// precedence over the whole document → section build over the ancestor's
/// subtree.
#[derive(Debug, Clone)]
pub struct PolicyParser {
    document: Document,
    options: ParserOptions,
}

impl PolicyParser {
    pub fn new(html: &str) -> Self {
        Self::with_options(html, ParserOptions::default())
    }

    pub fn with_options(html: &str, options: ParserOptions) -> Self {
        PolicyParser {
            document: Document::parse(html),
            options,
        }
    }

    pub fn try_parse(&self) -> Result<ParsedPolicy, ParseError> {
        let doc = &self.document;
        let threshold = self.options.min_text_length;

        let long = locate::find_long_text(doc, threshold);
        if long.is_empty() {
            return Err(ParseError::NoContentFound { threshold });
        }
        let scope =
            lca::lowest_common_ancestor(doc, &long).ok_or(ParseError::NoCommonAncestor)?;

        let precedence = precedence::rank_headings(doc, &self.options);
        let title = precedence::find_title(doc, &precedence, &self.options);
        if title.is_none() {
            warn!("{}", ParseError::TitleUnresolvable);
        }
        debug!(
            long_nodes = long.len(),
            scope = ?doc.tag(scope),
            ?precedence,
            "content region resolved"
        );

        let title_node = title.as_ref().map(|(id, _)| *id);
        let content =
            sections::build_sections(doc, scope, &precedence, title_node, &self.options);

        Ok(ParsedPolicy {
            title: title.map(|(_, text)| text),
            content,
        })
    }

    /// Standard representation of the document, `None` when no content region exists.
    pub fn stdrep(&self) -> Option<ParsedPolicy> {
        match self.try_parse() {
            Ok(policy) => Some(policy),
            Err(e) => {
                debug!("no policy: {}", e);
                None
            }
        }
    }
}

pub fn parse_policy(html: &str, options: &ParserOptions) -> Option<ParsedPolicy> {
    PolicyParser::with_options(html, options.clone()).stdrep()
}

/// Parse one stored page into a row; pages without content get a row with no JSON.
pub fn process_page(page: &StoredPage, options: &ParserOptions) -> PolicyRow {
    let policy = parse_policy(&page.html, options);
    PolicyRow {
        page_id: page.page_id,
        url: page.url.clone(),
        title: policy.as_ref().and_then(|p| p.title.clone()),
        sections: policy.as_ref().map_or(0, |p| p.section_count() as i64),
        text_nodes: policy.as_ref().map_or(0, |p| p.text_count() as i64),
        json: policy.and_then(|p| p.to_json().ok()),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn para(label: &str) -> String {
        format!("<p>{label} {}</p>", "lorem ipsum dolor sit amet ".repeat(5))
    }

    fn section(node: &ContentNode) -> &ParsedSection {
        match node {
            ContentNode::Section(s) => s,
            other => panic!("expected section, got {:?}", other),
        }
    }

    #[test]
    fn single_heading_document() {
        let body = "x".repeat(120);
        let html = format!("<html><body><h1>Title</h1><p>{body}</p></body></html>");
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.title.as_deref(), Some("Title"));
        assert_eq!(policy.content, vec![ContentNode::text(body)]);
    }

    #[test]
    fn skipped_heading_levels() {
        let html = format!(
            "<body><h2>A</h2>{}<h4>A.1</h4>{}<h4>A.2</h4>{}<h2>B</h2>{}</body>",
            para("a"),
            para("a1"),
            para("a2"),
            para("b")
        );
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.title.as_deref(), Some("A"));

        let c = &policy.content;
        assert_eq!(c.len(), 4);
        // The title heading opens nothing, so its paragraph sits at the top level.
        assert!(matches!(&c[0], ContentNode::Text(t) if t.text.starts_with("a ")));
        let names: Vec<_> = c[1..].iter().map(|n| section(n).name.as_str()).collect();
        assert_eq!(names, vec!["A.1", "A.2", "B"]);
        for n in &c[1..] {
            assert_eq!(section(n).content.len(), 1);
        }
        assert!(matches!(&section(&c[3]).content[0], ContentNode::Text(t) if t.text.starts_with("b ")));
    }

    #[test]
    fn no_headings_flat_text() {
        let html = format!("<div>{}{}{}</div>", para("1"), para("2"), para("3"));
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.title, None);
        assert_eq!(policy.section_count(), 0);
        assert_eq!(policy.text_count(), 3);
    }

    #[test]
    fn no_long_text_is_absent() {
        let parser = PolicyParser::new("<h1>Hi</h1><p>short</p><li>also short</li>");
        assert_eq!(parser.stdrep(), None);
        assert_eq!(
            parser.try_parse(),
            Err(ParseError::NoContentFound { threshold: 100 })
        );
    }

    #[test]
    fn boilerplate_outside_region_is_ignored() {
        let html = format!(
            "<body><nav><ul><li>Home</li><li>About</li></ul></nav>\
             <h1>Privacy Policy</h1>\
             <article><h2>Data</h2>{}<h3>Cookies</h3>{}<h2>Rights</h2>{}</article>\
             <footer><p>© Example</p></footer></body>",
            para("d"),
            para("c"),
            para("r")
        );
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.title.as_deref(), Some("Privacy Policy"));
        assert_eq!(policy.content.len(), 2);
        let data = section(&policy.content[0]);
        assert_eq!(data.name, "Data");
        assert_eq!(section(&data.content[1]).name, "Cookies");
        assert_eq!(section(&policy.content[1]).name, "Rights");
    }

    #[test]
    fn bare_span_region() {
        let html = format!("<div><span>{}</span></div>", "y".repeat(130));
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.content.len(), 1);
        assert_eq!(policy.title, None);
    }

    #[test]
    fn parsing_is_idempotent() {
        let html = format!("<h1>T</h1><h2>S</h2>{}{}", para("x"), para("y"));
        let first = parse_policy(&html, &ParserOptions::default());
        let second = parse_policy(&html, &ParserOptions::default());
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn custom_threshold() {
        let options = ParserOptions {
            min_text_length: 10,
            ..ParserOptions::default()
        };
        assert!(parse_policy("<p>just over ten</p>", &options).is_some());
        assert!(parse_policy("<p>just over ten</p>", &ParserOptions::default()).is_none());
    }

    #[test]
    fn process_page_row() {
        let page = StoredPage {
            page_id: 7,
            url: "https://example.com/terms".into(),
            html: format!("<h1>Terms</h1><h2>Use</h2>{}", para("u")),
        };
        let row = process_page(&page, &ParserOptions::default());
        assert_eq!(row.page_id, 7);
        assert_eq!(row.title.as_deref(), Some("Terms"));
        assert_eq!((row.sections, row.text_nodes), (1, 1));
        let policy = ParsedPolicy::from_json(row.json.as_deref().unwrap()).unwrap();
        assert_eq!(policy.section_count(), 1);

        let empty = process_page(
            &StoredPage {
                html: "<p>nothing</p>".into(),
                ..page
            },
            &ParserOptions::default(),
        );
        assert!(empty.json.is_none());
    }

    #[test]
    fn title_outside_nested_region() {
        let html = format!(
            "<body><header><h1>Terms of Service</h1></header>\
             <div id=\"wrap\"><div class=\"content\">\
             <h1>Part One</h1>{}<h2>Eligibility</h2>{}\
             <h1>Part Two</h1>{}\
             </div></div></body>",
            para("one"),
            para("elig"),
            para("two")
        );
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.title.as_deref(), Some("Terms of Service"));

        let c = &policy.content;
        assert_eq!(c.len(), 2);
        let one = section(&c[0]);
        assert_eq!(one.name, "Part One");
        assert_eq!(one.content.len(), 2);
        assert!(matches!(&one.content[0], ContentNode::Text(t) if t.text.starts_with("one ")));
        assert_eq!(section(&one.content[1]).name, "Eligibility");
        let two = section(&c[1]);
        assert_eq!(two.name, "Part Two");
        assert_eq!(two.content.len(), 1);
    }

    #[test]
    fn headings_in_list_items() {
        let html = format!(
            "<body><h1>Terms</h1><ol><li><h2>Use</h2>{}</li><li><h2>Fees</h2>{}</li></ol></body>",
            para("u"),
            para("f")
        );
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.title.as_deref(), Some("Terms"));
        assert_eq!(policy.section_count(), 2);
        let names: Vec<_> = policy.content.iter().map(|n| section(n).name.as_str()).collect();
        assert_eq!(names, vec!["Use", "Fees"]);
        for n in &policy.content {
            let s = section(n);
            assert_eq!(s.content.len(), 1);
            assert!(matches!(&s.content[0], ContentNode::Text(t) if !t.text.contains("Use")));
        }
    }

    #[test]
    fn region_root_text_survives() {
        let html = format!(
            "<body><article>Effective date: 1 May 2024 {}{}</article></body>",
            para("a"),
            para("b")
        );
        let policy = PolicyParser::new(&html).stdrep().unwrap();
        assert_eq!(policy.text_count(), 3);
        assert_eq!(policy.content[0], ContentNode::text("Effective date: 1 May 2024"));
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNode {
    #[serde(rename = "content")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSection {
    pub name: String,
    pub content: Vec<ContentNode>,
}

impl ParsedSection {
    pub fn new(name: impl Into<String>) -> Self {
        ParsedSection {
            name: name.into(),
            content: Vec::new(),
        }
    }
}

/// One entry of a policy's or section's content, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentNode {
    Text(TextNode),
    Section(ParsedSection),
}

impl ContentNode {
    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::Text(TextNode { text: text.into() })
    }
}

/// Root of a parse: optional title plus top-level content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "PolicyRepr", from = "PolicyRepr")]
pub struct ParsedPolicy {
    pub title: Option<String>,
    pub content: Vec<ContentNode>,
}

// Adds the `"type": "policy"` marker on the wire.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PolicyRepr {
    Policy {
        title: Option<String>,
        content: Vec<ContentNode>,
    },
}

impl From<ParsedPolicy> for PolicyRepr {
    fn from(p: ParsedPolicy) -> Self {
        PolicyRepr::Policy {
            title: p.title,
            content: p.content,
        }
    }
}

impl From<PolicyRepr> for ParsedPolicy {
    fn from(r: PolicyRepr) -> Self {
        let PolicyRepr::Policy { title, content } = r;
        ParsedPolicy { title, content }
    }
}

impl ParsedPolicy {
    pub fn section_count(&self) -> usize {
        count(&self.content, |n| matches!(n, ContentNode::Section(_)))
    }

    pub fn text_count(&self) -> usize {
        count(&self.content, |n| matches!(n, ContentNode::Text(_)))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn count(nodes: &[ContentNode], pred: fn(&ContentNode) -> bool) -> usize {
    nodes
        .iter()
        .map(|n| {
            let nested = match n {
                ContentNode::Section(s) => count(&s.content, pred),
                ContentNode::Text(_) => 0,
            };
            usize::from(pred(n)) + nested
        })
        .sum()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ParsedPolicy {
        let mut inner = ParsedSection::new("1.1 Scope");
        inner.content.push(ContentNode::text("Applies to everyone."));
        let mut outer = ParsedSection::new("1. General");
        outer.content.push(ContentNode::text("Read carefully."));
        outer.content.push(ContentNode::Section(inner));
        ParsedPolicy {
            title: Some("Terms".into()),
            content: vec![ContentNode::text("Intro"), ContentNode::Section(outer)],
        }
    }

    #[test]
    fn wire_format() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "policy",
                "title": "Terms",
                "content": [
                    { "type": "text", "content": "Intro" },
                    {
                        "type": "section",
                        "name": "1. General",
                        "content": [
                            { "type": "text", "content": "Read carefully." },
                            {
                                "type": "section",
                                "name": "1.1 Scope",
                                "content": [
                                    { "type": "text", "content": "Applies to everyone." }
                                ]
                            }
                        ]
                    }
                ]
            })
        );
    }

    #[test]
    fn null_title() {
        let value = serde_json::to_value(ParsedPolicy::default()).unwrap();
        assert_eq!(value, json!({ "type": "policy", "title": null, "content": [] }));
    }

    #[test]
    fn reload_keeps_counts_and_order() {
        let policy = sample();
        let back = ParsedPolicy::from_json(&policy.to_json().unwrap()).unwrap();
        assert_eq!(back, policy);
        assert_eq!(back.section_count(), 2);
        assert_eq!(back.text_count(), 3);
    }
}

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::DivTaxError;
use crate::ofx::node::{OfxBranch, OfxNode};
use crate::DivTaxResult;

const OFX_OPEN_TAG: &str = "<OFX>";

/// Element wrapped around the cleaned content when it does not open with
/// `<OFX>`, so the structural parse always sees a single root.
pub const SYNTHETIC_ROOT: &str = "OFXRoot";

fn empty_element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<([A-Za-z0-9_]+)>\s*</([A-Za-z0-9_]+)>").expect("static pattern")
    })
}

fn ampersand_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"&(amp;|lt;|gt;|quot;|apos;)?").expect("static pattern"))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse raw OFX text into a tree.
///
/// Everything before the first `<OFX>` (SGML headers, XML declarations) is
/// dropped. The returned node is the document: a branch whose single child
/// is the root element (`OFX`, or the synthetic root).
pub fn parse_ofx(raw: &str) -> DivTaxResult<OfxNode> {
    let start = raw.find(OFX_OPEN_TAG).ok_or(DivTaxError::NoOfxSectionFound)?;
    let cleaned = clean_ofx_content(&raw[start..]);
    build_tree(&cleaned)
}

/// Apply the textual repairs OFX exports need before a strict parse:
/// collapse `<TAG></TAG>` to `<TAG/>`, escape bare ampersands, and wrap in a
/// synthetic root when the content no longer opens with `<OFX>`.
pub fn clean_ofx_content(section: &str) -> String {
    let collapsed = collapse_empty_elements(section);
    let escaped = escape_bare_ampersands(&collapsed);

    if escaped.trim().starts_with(OFX_OPEN_TAG) {
        escaped.into_owned()
    } else {
        format!("<{SYNTHETIC_ROOT}>{escaped}</{SYNTHETIC_ROOT}>")
    }
}

fn collapse_empty_elements(content: &str) -> Cow<'_, str> {
    empty_element_pattern().replace_all(content, |caps: &Captures| {
        if caps[1] == caps[2] {
            format!("<{}/>", &caps[1])
        } else {
            caps[0].to_string()
        }
    })
}

fn escape_bare_ampersands(content: &str) -> Cow<'_, str> {
    ampersand_pattern().replace_all(content, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            "&amp;".to_string()
        }
    })
}

// ---------------------------------------------------------------------------
// Structural parse
// ---------------------------------------------------------------------------

struct OpenElement {
    name: String,
    branch: OfxBranch,
}

impl OpenElement {
    fn open(start: &BytesStart<'_>) -> DivTaxResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = BTreeMap::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(malformed)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(malformed)?.into_owned();
            attributes.insert(key, value);
        }
        Ok(Self {
            name,
            branch: OfxBranch {
                attributes,
                ..OfxBranch::default()
            },
        })
    }

    /// Whitespace between tags is insignificant; only the first genuine text
    /// segment is kept.
    fn push_text(&mut self, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() && self.branch.text.is_none() {
            self.branch.text = Some(trimmed.to_string());
        }
    }

    fn finish(self) -> (String, OfxNode) {
        let branch = self.branch;
        let node = if branch.attributes.is_empty() && branch.children.is_empty() {
            match branch.text {
                Some(text) => OfxNode::Leaf(text),
                None => OfxNode::Branch(OfxBranch::default()),
            }
        } else {
            OfxNode::Branch(branch)
        };
        (self.name, node)
    }
}

struct TreeBuilder {
    stack: Vec<OpenElement>,
    document: OfxBranch,
    root_closed: bool,
    elements: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            document: OfxBranch::default(),
            root_closed: false,
            elements: 0,
        }
    }

    fn open(&mut self, element: OpenElement) -> DivTaxResult<()> {
        if self.stack.is_empty() && self.root_closed {
            return Err(malformed(format!(
                "extra content after the root element: <{}>",
                element.name
            )));
        }
        self.stack.push(element);
        Ok(())
    }

    fn close(&mut self) -> DivTaxResult<()> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| malformed("closing tag without a matching opening tag"))?;
        let (name, node) = element.finish();
        self.elements += 1;
        match self.stack.last_mut() {
            Some(parent) => parent.branch.push_child(name, node),
            None => {
                self.document.push_child(name, node);
                self.root_closed = true;
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> DivTaxResult<()> {
        match self.stack.last_mut() {
            Some(current) => current.push_text(text),
            None if text.trim().is_empty() => {}
            None => return Err(malformed("text outside the root element")),
        }
        Ok(())
    }

    fn finish(self) -> DivTaxResult<OfxNode> {
        if let Some(open) = self.stack.last() {
            return Err(malformed(format!("unclosed element <{}>", open.name)));
        }
        if !self.root_closed {
            return Err(malformed("document has no root element"));
        }
        debug!(elements = self.elements, "parsed OFX tree");
        Ok(OfxNode::Branch(self.document))
    }
}

fn build_tree(content: &str) -> DivTaxResult<OfxNode> {
    let mut reader = Reader::from_str(content);
    let mut builder = TreeBuilder::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => builder.open(OpenElement::open(&start)?)?,
            Ok(Event::Empty(start)) => {
                builder.open(OpenElement::open(&start)?)?;
                builder.close()?;
            }
            Ok(Event::End(_)) => builder.close()?,
            Ok(Event::Text(text)) => {
                let decoded = text.unescape().map_err(malformed)?;
                builder.text(&decoded)?;
            }
            Ok(Event::CData(data)) => {
                let raw = data.into_inner();
                builder.text(&String::from_utf8_lossy(&raw))?;
            }
            Ok(Event::Eof) => break,
            // declarations, comments, processing instructions, doctype
            Ok(_) => {}
            Err(e) => {
                return Err(malformed(format!(
                    "{} (at byte {})",
                    e,
                    reader.buffer_position()
                )))
            }
        }
    }

    builder.finish()
}

fn malformed(e: impl std::fmt::Display) -> DivTaxError {
    DivTaxError::MalformedOfxXml(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ofx::node::OfxChild;
    use serde_json::json;

    #[test]
    fn test_signon_section_round_trips_leaf_values() {
        let content = r#"
            <OFX>
              <SIGNONMSGSRSV1>
                <SONRS>
                  <STATUS>
                    <CODE>0</CODE>
                    <SEVERITY>INFO</SEVERITY>
                  </STATUS>
                </SONRS>
              </SIGNONMSGSRSV1>
            </OFX>
        "#;
        let tree = parse_ofx(content).unwrap();
        let status = tree
            .path(&["OFX", "SIGNONMSGSRSV1", "SONRS", "STATUS"])
            .unwrap();

        assert_eq!(status.get_text("CODE"), Some("0"));
        assert_eq!(status.get_text("SEVERITY"), Some("INFO"));
    }

    #[test]
    fn test_missing_ofx_section() {
        let result = parse_ofx("INVALID CONTENT");
        assert!(matches!(result, Err(DivTaxError::NoOfxSectionFound)));
    }

    #[test]
    fn test_headers_before_ofx_are_ignored() {
        let content = "OFXHEADER:100\nDATA:OFXSGML\nVERSION:102\n\n<OFX>\n<CODE>0</CODE>\n</OFX>";
        let tree = parse_ofx(content).unwrap();
        assert_eq!(tree.path(&["OFX", "CODE"]).and_then(OfxNode::text), Some("0"));
    }

    #[test]
    fn test_whitespace_between_tags_produces_no_text() {
        let tree = parse_ofx("<OFX>\n   <A>\n  <B>1</B>\n   </A>\n</OFX>").unwrap();
        let a = tree.path(&["OFX", "A"]).unwrap();
        assert_eq!(a.as_branch().unwrap().text, None);
        assert_eq!(serde_json::to_value(a).unwrap(), json!({ "B": "1" }));
    }

    #[test]
    fn test_repeated_tags_collapse_to_sequence() {
        let tree = parse_ofx(
            "<OFX><LIST><ITEM>1</ITEM><OTHER>x</OTHER><ITEM>2</ITEM><ITEM>3</ITEM></LIST></OFX>",
        )
        .unwrap();
        let list = tree.path(&["OFX", "LIST"]).unwrap();

        let items: Vec<&str> = list
            .get_all("ITEM")
            .into_iter()
            .filter_map(OfxNode::text)
            .collect();
        assert_eq!(items, vec!["1", "2", "3"]);
        assert!(matches!(
            list.as_branch().unwrap().child("OTHER"),
            Some(OfxChild::One(_))
        ));
    }

    #[test]
    fn test_attributes_and_text_use_reserved_keys() {
        let tree = parse_ofx(r#"<OFX><ROOT attr="value">Text</ROOT></OFX>"#).unwrap();
        let root = tree.path(&["OFX", "ROOT"]).unwrap();
        assert_eq!(
            serde_json::to_value(root).unwrap(),
            json!({ "@attributes": { "attr": "value" }, "#text": "Text" })
        );
        assert_eq!(root.attribute("attr"), Some("value"));
    }

    #[test]
    fn test_inline_text_alongside_children() {
        let tree = parse_ofx("<OFX><NOTE> hello <B>x</B></NOTE></OFX>").unwrap();
        let note = tree.path(&["OFX", "NOTE"]).unwrap();
        assert_eq!(
            serde_json::to_value(note).unwrap(),
            json!({ "B": "x", "#text": "hello" })
        );
    }

    #[test]
    fn test_bare_ampersands_are_escaped() {
        let tree =
            parse_ofx("<OFX><MEMO>AT&T Inc</MEMO><NAME>Johnson &amp; Johnson</NAME></OFX>")
                .unwrap();
        let ofx = tree.get("OFX").unwrap();
        assert_eq!(ofx.get_text("MEMO"), Some("AT&T Inc"));
        assert_eq!(ofx.get_text("NAME"), Some("Johnson & Johnson"));
    }

    #[test]
    fn test_empty_element_pairs_collapse() {
        let cleaned = clean_ofx_content("<OFX><MEMO></MEMO><NAME>  \n </NAME><A></B></OFX>");
        assert_eq!(cleaned, "<OFX><MEMO/><NAME/><A></B></OFX>");

        let tree = parse_ofx("<OFX><MEMO></MEMO><CODE>0</CODE></OFX>").unwrap();
        let ofx = tree.get("OFX").unwrap();
        assert_eq!(ofx.get("MEMO"), Some(&OfxNode::Branch(OfxBranch::default())));
        assert_eq!(ofx.get_text("MEMO"), None);
        assert_eq!(ofx.get_text("CODE"), Some("0"));
    }

    #[test]
    fn test_synthetic_root_when_ofx_collapses() {
        let tree = parse_ofx("<OFX></OFX>").unwrap();
        assert!(tree.path(&[SYNTHETIC_ROOT, "OFX"]).is_some());
    }

    #[test]
    fn test_mismatched_closing_tag_is_malformed() {
        let result = parse_ofx("<OFX><A>1</B></OFX>");
        assert!(matches!(result, Err(DivTaxError::MalformedOfxXml(_))));
    }

    #[test]
    fn test_unclosed_element_is_malformed() {
        match parse_ofx("<OFX><CODE>0</CODE>") {
            Err(DivTaxError::MalformedOfxXml(message)) => assert!(message.contains("OFX")),
            other => panic!("Expected MalformedOfxXml, got {:?}", other),
        }
    }

    #[test]
    fn test_sgml_leaf_without_close_is_malformed() {
        let result = parse_ofx("<OFX><STATUS><CODE>0</STATUS></OFX>");
        assert!(matches!(result, Err(DivTaxError::MalformedOfxXml(_))));
    }
}

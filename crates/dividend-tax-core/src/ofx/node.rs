use std::collections::BTreeMap;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Reserved key holding an element's attributes in the serialized tree.
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// Reserved key holding inline text that sits next to child elements.
pub const TEXT_KEY: &str = "#text";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A node of the parsed OFX tree.
///
/// Elements that carry nothing but text collapse to `Leaf`. Everything else
/// (child elements, attributes, or an empty element) is a `Branch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfxNode {
    Leaf(String),
    Branch(OfxBranch),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfxBranch {
    pub attributes: BTreeMap<String, String>,
    /// Child tags in order of first appearance.
    pub children: Vec<(String, OfxChild)>,
    pub text: Option<String>,
}

/// Value stored under a tag name. A tag seen once under its parent is `One`;
/// seen twice or more it becomes `Many`, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfxChild {
    One(OfxNode),
    Many(Vec<OfxNode>),
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl OfxChild {
    fn push(&mut self, node: OfxNode) {
        match self {
            OfxChild::Many(nodes) => nodes.push(node),
            OfxChild::One(existing) => {
                let first = std::mem::replace(existing, OfxNode::Leaf(String::new()));
                *self = OfxChild::Many(vec![first, node]);
            }
        }
    }

    /// Coerce to a sequence regardless of cardinality.
    pub fn nodes(&self) -> Vec<&OfxNode> {
        match self {
            OfxChild::One(node) => vec![node],
            OfxChild::Many(nodes) => nodes.iter().collect(),
        }
    }
}

impl OfxBranch {
    /// Attach a child under `name`, turning a scalar slot into a sequence on
    /// the second occurrence.
    pub fn push_child(&mut self, name: String, node: OfxNode) {
        match self.children.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => slot.push(node),
            None => self.children.push((name, OfxChild::One(node))),
        }
    }

    pub fn child(&self, name: &str) -> Option<&OfxChild> {
        self.children
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, child)| child)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty() && self.text.is_none()
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl OfxNode {
    /// Leaf text, if this node is a leaf.
    pub fn text(&self) -> Option<&str> {
        match self {
            OfxNode::Leaf(text) => Some(text),
            OfxNode::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&OfxBranch> {
        match self {
            OfxNode::Leaf(_) => None,
            OfxNode::Branch(branch) => Some(branch),
        }
    }

    /// Single child under `name`. A repeated tag has no single value and
    /// yields `None`; use [`OfxNode::get_all`] for those.
    pub fn get(&self, name: &str) -> Option<&OfxNode> {
        match self.as_branch()?.child(name)? {
            OfxChild::One(node) => Some(node),
            OfxChild::Many(_) => None,
        }
    }

    /// Every child under `name`: absent gives an empty sequence, a single
    /// child a one-element sequence.
    pub fn get_all(&self, name: &str) -> Vec<&OfxNode> {
        self.as_branch()
            .and_then(|branch| branch.child(name))
            .map(OfxChild::nodes)
            .unwrap_or_default()
    }

    /// Follow a chain of single-valued tags.
    pub fn path(&self, names: &[&str]) -> Option<&OfxNode> {
        names.iter().try_fold(self, |node, name| node.get(name))
    }

    /// Non-empty leaf text of the child `name`.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(OfxNode::text)
            .filter(|text| !text.is_empty())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.as_branch()?.attributes.get(name).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Serde: dynamic tree shape
// ---------------------------------------------------------------------------

impl Serialize for OfxNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OfxNode::Leaf(text) => serializer.serialize_str(text),
            OfxNode::Branch(branch) => branch.serialize(serializer),
        }
    }
}

impl Serialize for OfxChild {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OfxChild::One(node) => node.serialize(serializer),
            OfxChild::Many(nodes) => nodes.serialize(serializer),
        }
    }
}

impl Serialize for OfxBranch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.children.len()
            + usize::from(!self.attributes.is_empty())
            + usize::from(self.text.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if !self.attributes.is_empty() {
            map.serialize_entry(ATTRIBUTES_KEY, &self.attributes)?;
        }
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        if let Some(text) = &self.text {
            map.serialize_entry(TEXT_KEY, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OfxNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(OfxNode::from)
    }
}

impl From<Value> for OfxNode {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => OfxNode::Leaf(text),
            Value::Number(number) => OfxNode::Leaf(number.to_string()),
            Value::Bool(flag) => OfxNode::Leaf(flag.to_string()),
            Value::Null | Value::Array(_) => OfxNode::Branch(OfxBranch::default()),
            Value::Object(map) => {
                let mut branch = OfxBranch::default();
                for (key, value) in map {
                    if key == ATTRIBUTES_KEY {
                        if let Value::Object(attributes) = value {
                            for (name, attr) in attributes {
                                branch.attributes.insert(name, scalar_text(attr));
                            }
                        }
                    } else if key == TEXT_KEY {
                        branch.text = Some(scalar_text(value));
                    } else {
                        let child = match value {
                            Value::Array(items) => {
                                OfxChild::Many(items.into_iter().map(OfxNode::from).collect())
                            }
                            other => OfxChild::One(OfxNode::from(other)),
                        };
                        branch.children.push((key, child));
                    }
                }
                OfxNode::Branch(branch)
            }
        }
    }
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(text: &str) -> OfxNode {
        OfxNode::Leaf(text.to_string())
    }

    #[test]
    fn test_repeated_child_becomes_sequence_in_order() {
        let mut branch = OfxBranch::default();
        branch.push_child("STMTTRN".into(), leaf("a"));
        assert_eq!(branch.child("STMTTRN"), Some(&OfxChild::One(leaf("a"))));

        branch.push_child("STMTTRN".into(), leaf("b"));
        branch.push_child("STMTTRN".into(), leaf("c"));
        assert_eq!(
            branch.child("STMTTRN"),
            Some(&OfxChild::Many(vec![leaf("a"), leaf("b"), leaf("c")]))
        );
    }

    #[test]
    fn test_get_all_coerces_every_shape() {
        let node = OfxNode::from(json!({
            "SINGLE": { "X": "1" },
            "REPEATED": [{ "X": "1" }, { "X": "2" }],
            "EMPTY": []
        }));

        assert_eq!(node.get_all("SINGLE").len(), 1);
        assert_eq!(node.get_all("REPEATED").len(), 2);
        assert!(node.get_all("EMPTY").is_empty());
        assert!(node.get_all("MISSING").is_empty());
    }

    #[test]
    fn test_get_on_repeated_tag_has_no_single_value() {
        let node = OfxNode::from(json!({ "A": ["1", "2"] }));
        assert!(node.get("A").is_none());
    }

    #[test]
    fn test_path_and_text() {
        let node = OfxNode::from(json!({
            "OFX": { "SONRS": { "STATUS": { "CODE": "0", "BLANK": "" } } }
        }));

        let status = node.path(&["OFX", "SONRS", "STATUS"]).unwrap();
        assert_eq!(status.get_text("CODE"), Some("0"));
        assert_eq!(status.get_text("BLANK"), None);
        assert!(node.path(&["OFX", "NOPE", "STATUS"]).is_none());
    }

    #[test]
    fn test_serialize_reserved_keys() {
        let mut branch = OfxBranch::default();
        branch.attributes.insert("attr".into(), "value".into());
        branch.text = Some("Text".into());

        let value = serde_json::to_value(OfxNode::Branch(branch)).unwrap();
        assert_eq!(value, json!({ "@attributes": { "attr": "value" }, "#text": "Text" }));
    }

    #[test]
    fn test_json_shape_round_trips_through_tree() {
        let shape = json!({
            "OFX": {
                "LIST": { "ITEM": [{ "A": "1" }, { "A": "2" }], "CURDEF": "USD" }
            }
        });
        let node: OfxNode = serde_json::from_value(shape.clone()).unwrap();
        assert_eq!(serde_json::to_value(&node).unwrap(), shape);
    }
}

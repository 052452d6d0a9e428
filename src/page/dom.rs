//! Minimal document model the capture side operates on.
//!
//! An arena of nodes rooted at `body`. Just enough structure for the
//! addressor (tags, ids, classes, sibling order) and the observer (form
//! state, text, geometry) — not a general DOM.

use std::collections::BTreeMap;

use crate::model::BoundingBox;

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct NodeData {
    pub tag: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub bounding_box: BoundingBox,
}

/// Builder for nodes appended to a document.
#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    bounding_box: BoundingBox,
}

impl Node {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = BoundingBox {
            x,
            y,
            width,
            height,
        };
        self
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// New document containing only the `body` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                tag: "body".to_string(),
                parent: None,
                children: Vec::new(),
                attributes: BTreeMap::new(),
                text: None,
                bounding_box: BoundingBox::default(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn append(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: node.tag,
            parent: Some(parent),
            children: Vec::new(),
            attributes: node.attributes,
            text: node.text,
            bounding_box: node.bounding_box,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id.0]
            .attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].attributes.remove(name);
    }

    /// Class list of a node, split on whitespace.
    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Whether `id` or any of its ancestors carries the given id attribute.
    pub fn is_within_id(&self, id: NodeId, ancestor_id: &str) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.attribute(node, "id") == Some(ancestor_id) {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// 1-based position of `id` among same-tag siblings, and the sibling
    /// count. Position is 0 if the node is detached.
    pub fn nth_of_type(&self, id: NodeId) -> (usize, usize) {
        let Some(parent) = self.parent(id) else {
            return (0, 1);
        };
        let tag = &self.nodes[id.0].tag;
        let same_tag: Vec<NodeId> = self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .filter(|c| &self.nodes[c.0].tag == tag)
            .collect();
        let position = same_tag.iter().position(|c| *c == id).map_or(0, |p| p + 1);
        (position, same_tag.len())
    }

    /// Count of nodes matching `tag` with all of `classes` present. This is
    /// the uniqueness check behind `tag.class1.class2` selectors.
    pub fn count_tag_class_matches(&self, tag: &str, classes: &[&str]) -> usize {
        (0..self.nodes.len())
            .filter(|&i| {
                let node = &self.nodes[i];
                if node.tag != tag {
                    return false;
                }
                let node_classes = self.classes(NodeId(i));
                classes.iter().all(|c| node_classes.contains(c))
            })
            .count()
    }

    /// Concatenated visible text of a node and its descendants, depth-first.
    pub fn visible_text(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_text(id, &mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, id: NodeId, parts: &mut Vec<String>) {
        if let Some(text) = &self.nodes[id.0].text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        for child in &self.nodes[id.0].children {
            self.collect_text(*child, parts);
        }
    }

    /// Display text of the currently selected `<option>` of a select node,
    /// matched by value.
    pub fn selected_option_text(&self, select: NodeId) -> Option<String> {
        let value = self.attribute(select, "value")?;
        self.nodes[select.0]
            .children
            .iter()
            .find(|c| {
                self.nodes[c.0].tag == "option" && self.attribute(**c, "value") == Some(value)
            })
            .and_then(|c| self.nodes[c.0].text.clone())
    }

    /// Resolve a selector produced by the addressor back to nodes.
    ///
    /// Supports exactly the grammar the addressor emits: `body`, `#id`,
    /// `[data-testid="…"]`, `tag.class…`, and `>`-chains of `tag` /
    /// `tag:nth-of-type(n)` segments. Used by tests to check the uniqueness
    /// contract, and by offline tooling.
    pub fn resolve(&self, selector: &str) -> Vec<NodeId> {
        let mut segments = selector.split(" > ");
        let Some(first) = segments.next() else {
            return Vec::new();
        };
        let Some(seg) = Segment::parse(first) else {
            return Vec::new();
        };
        let mut candidates = self.match_document_wide(&seg);
        for raw in segments {
            let Some(seg) = Segment::parse(raw) else {
                return Vec::new();
            };
            let mut next = Vec::new();
            for parent in candidates {
                next.extend(self.match_children(parent, &seg));
            }
            candidates = next;
        }
        candidates
    }

    fn match_document_wide(&self, seg: &Segment) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.segment_matches(*id, seg))
            .collect()
    }

    fn match_children(&self, parent: NodeId, seg: &Segment) -> Vec<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.segment_matches(*c, seg))
            .collect()
    }

    fn segment_matches(&self, id: NodeId, seg: &Segment) -> bool {
        let node = &self.nodes[id.0];
        match seg {
            Segment::Body => node.parent.is_none(),
            Segment::Id(wanted) => self.attribute(id, "id") == Some(wanted.as_str()),
            Segment::TestId(wanted) => {
                self.attribute(id, "data-testid") == Some(wanted.as_str())
            }
            Segment::Tag {
                tag,
                classes,
                nth_of_type,
            } => {
                if &node.tag != tag {
                    return false;
                }
                let node_classes = self.classes(id);
                if !classes.iter().all(|c| node_classes.contains(&c.as_str())) {
                    return false;
                }
                match nth_of_type {
                    Some(n) => self.nth_of_type(id).0 == *n,
                    None => true,
                }
            }
        }
    }
}

#[derive(Debug)]
enum Segment {
    Body,
    Id(String),
    TestId(String),
    Tag {
        tag: String,
        classes: Vec<String>,
        nth_of_type: Option<usize>,
    },
}

impl Segment {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "body" {
            return Some(Segment::Body);
        }
        if let Some(id) = raw.strip_prefix('#') {
            return Some(Segment::Id(css_unescape(id)));
        }
        if let Some(inner) = raw
            .strip_prefix("[data-testid=\"")
            .and_then(|r| r.strip_suffix("\"]"))
        {
            return Some(Segment::TestId(inner.to_string()));
        }

        let (head, nth_of_type) = match raw.find(":nth-of-type(") {
            Some(pos) => {
                let n = raw[pos + ":nth-of-type(".len()..]
                    .strip_suffix(')')?
                    .parse()
                    .ok()?;
                (&raw[..pos], Some(n))
            }
            None => (raw, None),
        };

        let mut parts = head.split('.');
        let tag = parts.next()?.to_string();
        if tag.is_empty() {
            return None;
        }
        let classes = parts.map(str::to_string).collect();
        Some(Segment::Tag {
            tag,
            classes,
            nth_of_type,
        })
    }
}

/// Undo the escaping applied by [`crate::page::addressor::css_escape`].
fn css_unescape(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(*h);
                    chars.next();
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            if let Some(literal) = chars.next() {
                out.push(literal);
            }
        } else {
            if let Some(cp) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                out.push(cp);
            }
            // A single space terminates a hex escape.
            if chars.peek() == Some(&' ') {
                chars.next();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let form = doc.append(doc.root(), Node::tag("form").attr("id", "login"));
        let email = doc.append(form, Node::tag("input").attr("name", "email"));
        let password = doc.append(form, Node::tag("input").attr("name", "password"));
        let _ = password;
        (doc, form, email)
    }

    #[test]
    fn nth_of_type_counts_same_tag_siblings_only() {
        let (mut doc, form, email) = sample();
        doc.append(form, Node::tag("button"));
        assert_eq!(doc.nth_of_type(email), (1, 2));
    }

    #[test]
    fn is_within_id_walks_ancestors() {
        let (doc, _, email) = sample();
        assert!(doc.is_within_id(email, "login"));
        assert!(!doc.is_within_id(email, "other"));
    }

    #[test]
    fn visible_text_concatenates_descendants() {
        let mut doc = Document::new();
        let div = doc.append(doc.root(), Node::tag("div").text("Hello"));
        doc.append(div, Node::tag("span").text("world"));
        assert_eq!(doc.visible_text(div), "Hello world");
    }

    #[test]
    fn resolve_id_selector() {
        let (doc, form, _) = sample();
        assert_eq!(doc.resolve("#login"), vec![form]);
    }

    #[test]
    fn resolve_child_chain_with_nth_of_type() {
        let (doc, _, email) = sample();
        assert_eq!(doc.resolve("#login > input:nth-of-type(1)"), vec![email]);
        assert!(doc.resolve("#login > input:nth-of-type(3)").is_empty());
    }

    #[test]
    fn resolve_tag_class_selector() {
        let mut doc = Document::new();
        let btn = doc.append(doc.root(), Node::tag("button").attr("class", "primary large"));
        doc.append(doc.root(), Node::tag("button").attr("class", "secondary"));
        assert_eq!(doc.resolve("button.primary.large"), vec![btn]);
    }

    #[test]
    fn resolve_test_id_selector() {
        let mut doc = Document::new();
        let el = doc.append(doc.root(), Node::tag("div").attr("data-testid", "cart"));
        assert_eq!(doc.resolve("[data-testid=\"cart\"]"), vec![el]);
    }

    #[test]
    fn css_unescape_roundtrips_common_escapes() {
        assert_eq!(css_unescape("my\\ id"), "my id");
        assert_eq!(css_unescape("\\31 a"), "1a");
        assert_eq!(css_unescape("plain"), "plain");
    }

    #[test]
    fn selected_option_text_matches_by_value() {
        let mut doc = Document::new();
        let select = doc.append(doc.root(), Node::tag("select").attr("value", "us"));
        doc.append(select, Node::tag("option").attr("value", "de").text("Germany"));
        doc.append(select, Node::tag("option").attr("value", "us").text("United States"));
        assert_eq!(
            doc.selected_option_text(select).as_deref(),
            Some("United States")
        );
    }
}

//! Element addressor: compute a stable `(selector, structural_path)` pair
//! for a document node.
//!
//! The selector algorithm tries, in order: id, test identifier attribute,
//! document-unique tag+class combination, then a `>`-chained path built by
//! recursing to the parent. The structural path is an independent indexed
//! tag path, retained even when the selector succeeds.
//!
//! For a static document, repeated calls return byte-identical output.

use crate::page::dom::{Document, NodeId};

/// Attribute treated as a designated test identifier.
pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

/// Compute both locators for a node.
pub fn locate(doc: &Document, node: NodeId) -> (String, String) {
    (selector(doc, node), structural_path(doc, node))
}

/// CSS selector resolving uniquely to `node` within `doc`.
pub fn selector(doc: &Document, node: NodeId) -> String {
    if node == doc.root() {
        return "body".to_string();
    }

    if let Some(id) = doc.attribute(node, "id").filter(|v| !v.is_empty()) {
        return format!("#{}", css_escape(id));
    }

    if let Some(test_id) = doc
        .attribute(node, TEST_ID_ATTRIBUTE)
        .filter(|v| !v.is_empty())
    {
        let candidate = format!("[{TEST_ID_ATTRIBUTE}=\"{test_id}\"]");
        if doc.resolve(&candidate).len() == 1 {
            return candidate;
        }
    }

    let tag = &doc.node(node).tag;
    let classes = doc.classes(node);
    if !classes.is_empty() && doc.count_tag_class_matches(tag, &classes) == 1 {
        return format!("{tag}.{}", classes.join("."));
    }

    let Some(parent) = doc.parent(node) else {
        // Detached node: nothing better than the bare tag.
        return tag.clone();
    };

    let (position, sibling_count) = doc.nth_of_type(node);
    if sibling_count == 1 {
        format!("{} > {tag}", selector(doc, parent))
    } else {
        format!("{} > {tag}:nth-of-type({position})", selector(doc, parent))
    }
}

/// Ancestor-id-or-root-anchored indexed tag path, e.g.
/// `/html/body/div[2]/input`. Ancestors with ids short-circuit to
/// `//*[@id="…"]`.
pub fn structural_path(doc: &Document, node: NodeId) -> String {
    if let Some(id) = doc.attribute(node, "id").filter(|v| !v.is_empty()) {
        return format!("//*[@id=\"{id}\"]");
    }
    if node == doc.root() {
        return "/html/body".to_string();
    }

    let tag = &doc.node(node).tag;
    let (position, sibling_count) = doc.nth_of_type(node);
    let mut segment = format!("/{tag}");
    if sibling_count > 1 {
        segment.push_str(&format!("[{position}]"));
    }

    match doc.parent(node) {
        Some(parent) => format!("{}{segment}", structural_path(doc, parent)),
        None => segment,
    }
}

/// Escape an identifier for use in a CSS id selector, following the shape of
/// `CSS.escape`: alphanumerics, `-`, `_` and non-ASCII pass through, a
/// leading digit becomes a hex escape, everything else is backslash-escaped.
pub fn css_escape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        let passthrough =
            c.is_ascii_alphanumeric() || c == '-' || c == '_' || (c as u32) > 0x7f;
        if i == 0 && c.is_ascii_digit() {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if passthrough {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

use serde::{Deserialize, Serialize};

/// Viewport-relative element geometry in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The fixed allow-list of attributes captured per element, in capture order.
///
/// Anything else on the node is deliberately not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// Immutable snapshot of a DOM node at interaction time.
///
/// `selector` is a CSS locator that resolved uniquely within the document
/// when the event was captured. `structural_path` is an indexed tag path
/// kept as a recovery locator for offline inspection even when `selector`
/// succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub selector: String,
    pub structural_path: String,
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub attributes: ElementAttributes,
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

impl ElementDescriptor {
    /// A descriptor is usable only if it carries at least one locator and a
    /// tag name. Payloads failing this are dropped by the step assembler.
    pub fn is_well_formed(&self) -> bool {
        !self.tag_name.is_empty() && !(self.selector.is_empty() && self.structural_path.is_empty())
    }

    /// Human-readable identifier used by description templates, in priority
    /// order: visible text, id attribute, placeholder, tag name.
    pub fn display_identifier(&self) -> &str {
        self.visible_text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.attributes.id.as_deref())
            .or(self.placeholder.as_deref())
            .unwrap_or(&self.tag_name)
    }
}

//! Document node identity and usage references.

use std::fmt;
use std::str::FromStr;

use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Host identifier of a document node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub CompactString);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Kind of document node, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Frame,
    Group,
    Section,
    Component,
    ComponentSet,
    Instance,
    Rectangle,
    Text,
    Vector,
    Line,
    Star,
    Polygon,
    Ellipse,
    BooleanOperation,
    Slice,
    /// Any node type this crate has no special handling for.
    #[strum(default)]
    Other(String),
}

impl NodeType {
    /// Pure vector/shape kinds, skipped unless vectors are included.
    pub fn is_vector_shape(&self) -> bool {
        matches!(
            self,
            NodeType::Vector
                | NodeType::Line
                | NodeType::Star
                | NodeType::Polygon
                | NodeType::Ellipse
                | NodeType::BooleanOperation
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeType::Text)
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeType::Other(raw) => serializer.serialize_str(raw),
            known => serializer.collect_str(known),
        }
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        // `Other` is the strum default, so parsing cannot fail.
        Ok(NodeType::from_str(&raw).unwrap_or(NodeType::Other(raw)))
    }
}

/// Which paint slot of a node a color came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Fill,
    Stroke,
    Text,
    Effect,
}

/// Minimal view of a node resolved from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub visible: bool,
}

/// One occurrence of a color on a node's paint slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef {
    pub node_id: NodeId,
    pub node_name: String,
    pub node_type: NodeType,
    /// Ancestor names joined by `" > "`, page excluded.
    pub layer_path: String,
    pub property_type: PropertyType,
    /// Paint index for fills and strokes, run start offset for text.
    pub property_index: usize,
}

impl NodeRef {
    /// Build a reference for a paint slot on `node`.
    pub fn new(
        node: &NodeSummary,
        layer_path: impl Into<String>,
        property_type: PropertyType,
        property_index: usize,
    ) -> Self {
        Self {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            node_type: node.node_type.clone(),
            layer_path: layer_path.into(),
            property_type,
            property_index,
        }
    }
}

//! Narrow query interfaces onto the host document and its token store.
//!
//! The scan engine never sees the host API directly; hosts (and test fakes)
//! implement these traits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::{DocumentError, TokenStoreError};
use crate::node::{NodeId, NodeSummary, NodeType};
use crate::paint::{
    BoundVariable, CollectionId, Paint, PaintProperty, StyleId, TextSegment, VariableId,
};
use crate::token::{LibraryCollection, Style, Variable, VariableCollection};

/// Read-only view of the document tree.
pub trait DocumentTree {
    /// Ids of the currently selected nodes, in selection order.
    fn current_selection(&self) -> Vec<NodeId>;

    /// Top-level nodes of the current page.
    fn page_roots(&self) -> Result<Vec<NodeId>, DocumentError>;

    /// Resolve a node, `None` when the id is stale.
    fn resolve_node(&self, id: &NodeId) -> Option<NodeSummary>;

    /// Children of a node in document order.
    fn children_of(&self, id: &NodeId) -> Result<Vec<NodeId>, DocumentError>;

    fn fills_of(&self, id: &NodeId) -> Result<Vec<Paint>, DocumentError>;

    fn strokes_of(&self, id: &NodeId) -> Result<Vec<Paint>, DocumentError>;

    /// Styled runs of a text node. Empty for other node types.
    fn text_segments_of(&self, id: &NodeId) -> Result<Vec<TextSegment>, DocumentError>;

    /// Variable bound to a paint slot, if any.
    fn bound_variable_for(
        &self,
        id: &NodeId,
        property: PaintProperty,
        index: usize,
    ) -> Option<BoundVariable>;

    /// Legacy style applied to a whole paint list, if any.
    fn legacy_style_ref_for(&self, id: &NodeId, property: PaintProperty) -> Option<StyleId>;

    /// Ancestors of a node, nearest first, stopping below the page.
    fn ancestor_chain(&self, id: &NodeId) -> Result<Vec<NodeId>, DocumentError>;

    fn is_visible(&self, id: &NodeId) -> bool {
        self.resolve_node(id).is_some_and(|node| node.visible)
    }

    fn type_of(&self, id: &NodeId) -> Result<NodeType, DocumentError> {
        self.resolve_node(id)
            .map(|node| node.node_type)
            .ok_or_else(|| DocumentError::not_found(id))
    }
}

/// Document-level side effects the tracker may request.
pub trait SelectionHost {
    fn clear_selection(&mut self) -> Result<(), DocumentError>;
}

/// Lookups against the design token store.
pub trait TokenStore {
    fn variable_by_id(&self, id: &VariableId) -> Result<Option<Variable>, TokenStoreError>;

    fn collection_by_id(
        &self,
        id: &CollectionId,
    ) -> Result<Option<VariableCollection>, TokenStoreError>;

    /// Collections of every enabled remote library.
    fn available_library_collections(&self) -> Result<Vec<LibraryCollection>, TokenStoreError>;

    fn style_by_id(&self, id: &StyleId) -> Result<Option<Style>, TokenStoreError>;
}

/// Kind of a document change record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Create,
    Delete,
    PropertyChange,
    /// Any other host change type.
    #[strum(default)]
    Other(String),
}

impl Serialize for ChangeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChangeKind::Other(raw) => serializer.serialize_str(raw),
            known => serializer.collect_str(known),
        }
    }
}

impl<'de> Deserialize<'de> for ChangeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(ChangeKind::Other(raw)))
    }
}

/// One entry of a document-change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub node_id: NodeId,
}

impl DocumentChange {
    pub fn new(kind: ChangeKind, node_id: impl Into<NodeId>) -> Self {
        Self {
            kind,
            node_id: node_id.into(),
        }
    }

    pub fn create(node_id: impl Into<NodeId>) -> Self {
        Self::new(ChangeKind::Create, node_id)
    }

    pub fn delete(node_id: impl Into<NodeId>) -> Self {
        Self::new(ChangeKind::Delete, node_id)
    }

    pub fn property_change(node_id: impl Into<NodeId>) -> Self {
        Self::new(ChangeKind::PropertyChange, node_id)
    }
}

/// Whether `id` is one of `scope` or has one of them as an ancestor.
///
/// A node that no longer resolves is treated as outside the scope.
pub fn is_within_scope(doc: &dyn DocumentTree, id: &NodeId, scope: &[NodeId]) -> bool {
    if scope.contains(id) {
        return true;
    }
    match doc.ancestor_chain(id) {
        Ok(ancestors) => ancestors.iter().any(|ancestor| scope.contains(ancestor)),
        Err(_) => false,
    }
}

/// Whether a node and all of its ancestors are visible.
pub fn is_effectively_visible(doc: &dyn DocumentTree, id: &NodeId) -> Result<bool, DocumentError> {
    if doc.resolve_node(id).is_none() {
        return Err(DocumentError::not_found(id));
    }
    if !doc.is_visible(id) {
        return Ok(false);
    }
    let ancestors = doc.ancestor_chain(id)?;
    Ok(ancestors.iter().all(|ancestor| doc.is_visible(ancestor)))
}

/// Layer path of a node: ancestor names then its own, joined by `" > "`.
pub fn layer_path(doc: &dyn DocumentTree, node: &NodeSummary) -> Result<String, DocumentError> {
    let ancestors = doc.ancestor_chain(&node.id)?;
    let mut parts = Vec::with_capacity(ancestors.len() + 1);
    for ancestor in ancestors.iter().rev() {
        let resolved = doc
            .resolve_node(ancestor)
            .ok_or_else(|| DocumentError::not_found(ancestor))?;
        parts.push(resolved.name);
    }
    parts.push(node.name.clone());
    Ok(parts.join(" > "))
}

//! In-memory document and token store.
//!
//! Implements every collaborator trait so the engine can run against a JSON
//! snapshot (the CLI) or a hand-built tree (the test suites). Mutations
//! return the change records a host would emit for them.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{DocumentChange, DocumentTree, SelectionHost, TokenStore};
use crate::error::{DocumentError, TokenStoreError};
use crate::node::{NodeId, NodeSummary, NodeType};
use crate::paint::{
    BoundVariable, CollectionId, Paint, PaintProperty, StyleId, TextSegment, VariableId,
};
use crate::token::{LibraryCollection, Style, Variable, VariableCollection};

/// Variables bound to individual paint slots, indexed like the paint lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundVariables {
    #[serde(default)]
    pub fills: Vec<Option<BoundVariable>>,
    #[serde(default)]
    pub strokes: Vec<Option<BoundVariable>>,
}

impl BoundVariables {
    fn slots(&self, property: PaintProperty) -> &[Option<BoundVariable>] {
        match property {
            PaintProperty::Fills => &self.fills,
            PaintProperty::Strokes => &self.strokes,
        }
    }

    fn slots_mut(&mut self, property: PaintProperty) -> &mut Vec<Option<BoundVariable>> {
        match property {
            PaintProperty::Fills => &mut self.fills,
            PaintProperty::Strokes => &mut self.strokes,
        }
    }
}

/// A node of a document snapshot, children nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryNode {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub fills: Vec<Paint>,
    #[serde(default)]
    pub strokes: Vec<Paint>,
    #[serde(default)]
    pub text_segments: Vec<TextSegment>,
    #[serde(default)]
    pub bound_variables: BoundVariables,
    #[serde(default)]
    pub fill_style_id: Option<StyleId>,
    #[serde(default)]
    pub stroke_style_id: Option<StyleId>,
    #[serde(default)]
    pub children: Vec<MemoryNode>,
}

fn default_visible() -> bool {
    true
}

impl MemoryNode {
    /// Create a visible node with no paints.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            visible: true,
            fills: Vec::new(),
            strokes: Vec::new(),
            text_segments: Vec::new(),
            bound_variables: BoundVariables::default(),
            fill_style_id: None,
            stroke_style_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_fill(mut self, paint: Paint) -> Self {
        self.fills.push(paint);
        self
    }

    pub fn with_stroke(mut self, paint: Paint) -> Self {
        self.strokes.push(paint);
        self
    }

    pub fn with_text_segment(mut self, segment: TextSegment) -> Self {
        self.text_segments.push(segment);
        self
    }

    pub fn with_child(mut self, child: MemoryNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Bind a variable to a paint slot.
    pub fn with_bound_variable(
        mut self,
        property: PaintProperty,
        index: usize,
        binding: impl Into<BoundVariable>,
    ) -> Self {
        set_slot(&mut self.bound_variables, property, index, Some(binding.into()));
        self
    }

    /// Apply a legacy style to a paint list.
    pub fn with_style(mut self, property: PaintProperty, style_id: impl Into<StyleId>) -> Self {
        match property {
            PaintProperty::Fills => self.fill_style_id = Some(style_id.into()),
            PaintProperty::Strokes => self.stroke_style_id = Some(style_id.into()),
        }
        self
    }
}

fn set_slot(
    bindings: &mut BoundVariables,
    property: PaintProperty,
    index: usize,
    binding: Option<BoundVariable>,
) {
    let slots = bindings.slots_mut(property);
    if slots.len() <= index {
        slots.resize(index + 1, None);
    }
    slots[index] = binding;
}

/// Serialized form of a whole document and its token store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub page: Vec<MemoryNode>,
    #[serde(default)]
    pub selection: Vec<NodeId>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub collections: Vec<VariableCollection>,
    #[serde(default)]
    pub library_collections: Vec<LibraryCollection>,
    #[serde(default)]
    pub styles: Vec<Style>,
}

/// Errors loading a document snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Clone)]
struct StoredNode {
    /// Node data with `children` emptied; structure lives in `child_ids`.
    data: MemoryNode,
    parent: Option<NodeId>,
    child_ids: Vec<NodeId>,
}

/// A mutable in-memory document.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: HashMap<NodeId, StoredNode>,
    roots: Vec<NodeId>,
    selection: Vec<NodeId>,
    variables: HashMap<VariableId, Variable>,
    collections: HashMap<CollectionId, VariableCollection>,
    library_collections: Vec<LibraryCollection>,
    styles: HashMap<StyleId, Style>,
    token_store_online: bool,
    libraries_online: bool,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            selection: Vec::new(),
            variables: HashMap::new(),
            collections: HashMap::new(),
            library_collections: Vec::new(),
            styles: HashMap::new(),
            token_store_online: true,
            libraries_online: true,
        }
    }

    /// Build a document from a snapshot.
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Result<Self, DocumentError> {
        let mut doc = Self::new();
        for node in snapshot.page {
            doc.add_root(node)?;
        }
        doc.selection = snapshot.selection;
        for variable in snapshot.variables {
            doc.add_variable(variable);
        }
        for collection in snapshot.collections {
            doc.add_collection(collection);
        }
        doc.library_collections = snapshot.library_collections;
        for style in snapshot.styles {
            doc.add_style(style);
        }
        Ok(doc)
    }

    /// Parse a document from snapshot JSON.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let snapshot: DocumentSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot)?)
    }

    /// Load a document from a snapshot JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Append a top-level node (and its subtree) to the page.
    pub fn add_root(&mut self, node: MemoryNode) -> Result<Vec<DocumentChange>, DocumentError> {
        let id = node.id.clone();
        self.check_new_ids(&node)?;
        let changes = self.store_subtree(node, None);
        self.roots.push(id);
        Ok(changes)
    }

    /// Append a node (and its subtree) as the last child of `parent`.
    pub fn insert(
        &mut self,
        parent: &NodeId,
        node: MemoryNode,
    ) -> Result<Vec<DocumentChange>, DocumentError> {
        if !self.nodes.contains_key(parent) {
            return Err(DocumentError::not_found(parent));
        }
        let id = node.id.clone();
        self.check_new_ids(&node)?;
        let changes = self.store_subtree(node, Some(parent.clone()));
        if let Some(stored) = self.nodes.get_mut(parent) {
            stored.child_ids.push(id);
        }
        Ok(changes)
    }

    /// Reject a subtree reusing an id, from the document or from itself,
    /// before any of it is stored.
    fn check_new_ids(&self, root: &MemoryNode) -> Result<(), DocumentError> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.nodes.contains_key(&node.id) || !seen.insert(&node.id) {
                return Err(DocumentError::Unavailable {
                    message: format!("duplicate node id {}", node.id),
                });
            }
            stack.extend(&node.children);
        }
        Ok(())
    }

    fn store_subtree(
        &mut self,
        mut node: MemoryNode,
        parent: Option<NodeId>,
    ) -> Vec<DocumentChange> {
        let id = node.id.clone();
        let children = std::mem::take(&mut node.children);
        let mut changes = vec![DocumentChange::create(id.clone())];
        let child_ids = children.iter().map(|child| child.id.clone()).collect();
        self.nodes.insert(
            id.clone(),
            StoredNode {
                data: node,
                parent,
                child_ids,
            },
        );
        for child in children {
            changes.extend(self.store_subtree(child, Some(id.clone())));
        }
        changes
    }

    /// Remove a node and its subtree. Emits a single delete record.
    pub fn remove(&mut self, id: &NodeId) -> Result<Vec<DocumentChange>, DocumentError> {
        let stored = self
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| DocumentError::not_found(id))?;

        match &stored.parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(parent) {
                    parent.child_ids.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|root| root != id),
        }

        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&current) {
                stack.extend(removed.child_ids);
            }
            self.selection.retain(|selected| selected != &current);
        }

        Ok(vec![DocumentChange::delete(id.clone())])
    }

    /// Look up a node's data. `children` is always empty; use
    /// [`DocumentTree::children_of`] for structure.
    pub fn node(&self, id: &NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id).map(|stored| &stored.data)
    }

    /// Apply an edit to a node's own properties.
    pub fn update(
        &mut self,
        id: &NodeId,
        edit: impl FnOnce(&mut MemoryNode),
    ) -> Result<DocumentChange, DocumentError> {
        let stored = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| DocumentError::not_found(id))?;
        edit(&mut stored.data);
        Ok(DocumentChange::property_change(id.clone()))
    }

    pub fn set_fills(
        &mut self,
        id: &NodeId,
        fills: Vec<Paint>,
    ) -> Result<DocumentChange, DocumentError> {
        self.update(id, |node| node.fills = fills)
    }

    pub fn set_strokes(
        &mut self,
        id: &NodeId,
        strokes: Vec<Paint>,
    ) -> Result<DocumentChange, DocumentError> {
        self.update(id, |node| node.strokes = strokes)
    }

    pub fn set_visible(
        &mut self,
        id: &NodeId,
        visible: bool,
    ) -> Result<DocumentChange, DocumentError> {
        self.update(id, |node| node.visible = visible)
    }

    pub fn rename(
        &mut self,
        id: &NodeId,
        name: impl Into<String>,
    ) -> Result<DocumentChange, DocumentError> {
        let name = name.into();
        self.update(id, |node| node.name = name)
    }

    pub fn set_text_segments(
        &mut self,
        id: &NodeId,
        segments: Vec<TextSegment>,
    ) -> Result<DocumentChange, DocumentError> {
        self.update(id, |node| node.text_segments = segments)
    }

    /// Bind (or unbind, with `None`) a variable on a paint slot.
    pub fn bind_variable(
        &mut self,
        id: &NodeId,
        property: PaintProperty,
        index: usize,
        binding: Option<BoundVariable>,
    ) -> Result<DocumentChange, DocumentError> {
        self.update(id, |node| set_slot(&mut node.bound_variables, property, index, binding))
    }

    /// Replace the selection.
    pub fn set_selection(&mut self, ids: Vec<NodeId>) {
        self.selection = ids;
    }

    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.id.clone(), variable);
    }

    pub fn add_collection(&mut self, collection: VariableCollection) {
        self.collections.insert(collection.id.clone(), collection);
    }

    pub fn add_library_collection(&mut self, collection: LibraryCollection) {
        self.library_collections.push(collection);
    }

    pub fn add_style(&mut self, style: Style) {
        self.styles.insert(style.id.clone(), style);
    }

    /// Simulate the whole token store failing.
    pub fn set_token_store_online(&mut self, online: bool) {
        self.token_store_online = online;
    }

    /// Simulate remote libraries being unreachable or disabled.
    pub fn set_libraries_online(&mut self, online: bool) {
        self.libraries_online = online;
    }

    /// Number of nodes in the document.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn stored(&self, id: &NodeId) -> Result<&StoredNode, DocumentError> {
        self.nodes.get(id).ok_or_else(|| DocumentError::not_found(id))
    }

    fn check_token_store(&self) -> Result<(), TokenStoreError> {
        if self.token_store_online {
            Ok(())
        } else {
            Err(TokenStoreError::Unavailable {
                message: "token store offline".to_string(),
            })
        }
    }
}

impl DocumentTree for MemoryDocument {
    fn current_selection(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    fn page_roots(&self) -> Result<Vec<NodeId>, DocumentError> {
        Ok(self.roots.clone())
    }

    fn resolve_node(&self, id: &NodeId) -> Option<NodeSummary> {
        self.nodes.get(id).map(|stored| NodeSummary {
            id: stored.data.id.clone(),
            name: stored.data.name.clone(),
            node_type: stored.data.node_type.clone(),
            visible: stored.data.visible,
        })
    }

    fn children_of(&self, id: &NodeId) -> Result<Vec<NodeId>, DocumentError> {
        Ok(self.stored(id)?.child_ids.clone())
    }

    fn fills_of(&self, id: &NodeId) -> Result<Vec<Paint>, DocumentError> {
        Ok(self.stored(id)?.data.fills.clone())
    }

    fn strokes_of(&self, id: &NodeId) -> Result<Vec<Paint>, DocumentError> {
        Ok(self.stored(id)?.data.strokes.clone())
    }

    fn text_segments_of(&self, id: &NodeId) -> Result<Vec<TextSegment>, DocumentError> {
        Ok(self.stored(id)?.data.text_segments.clone())
    }

    fn bound_variable_for(
        &self,
        id: &NodeId,
        property: PaintProperty,
        index: usize,
    ) -> Option<BoundVariable> {
        let stored = self.nodes.get(id)?;
        stored
            .data
            .bound_variables
            .slots(property)
            .get(index)
            .cloned()
            .flatten()
    }

    fn legacy_style_ref_for(&self, id: &NodeId, property: PaintProperty) -> Option<StyleId> {
        let data = &self.nodes.get(id)?.data;
        match property {
            PaintProperty::Fills => data.fill_style_id.clone(),
            PaintProperty::Strokes => data.stroke_style_id.clone(),
        }
    }

    fn ancestor_chain(&self, id: &NodeId) -> Result<Vec<NodeId>, DocumentError> {
        let mut chain = Vec::new();
        let mut current = self.stored(id)?.parent.clone();
        while let Some(parent) = current {
            current = self.stored(&parent)?.parent.clone();
            chain.push(parent);
        }
        Ok(chain)
    }
}

impl SelectionHost for MemoryDocument {
    fn clear_selection(&mut self) -> Result<(), DocumentError> {
        self.selection.clear();
        Ok(())
    }
}

impl TokenStore for MemoryDocument {
    fn variable_by_id(&self, id: &VariableId) -> Result<Option<Variable>, TokenStoreError> {
        self.check_token_store()?;
        Ok(self.variables.get(id).cloned())
    }

    fn collection_by_id(
        &self,
        id: &CollectionId,
    ) -> Result<Option<VariableCollection>, TokenStoreError> {
        self.check_token_store()?;
        Ok(self.collections.get(id).cloned())
    }

    fn available_library_collections(&self) -> Result<Vec<LibraryCollection>, TokenStoreError> {
        if !self.libraries_online {
            return Err(TokenStoreError::LibraryLookup {
                message: "libraries unavailable".to_string(),
            });
        }
        Ok(self.library_collections.clone())
    }

    fn style_by_id(&self, id: &StyleId) -> Result<Option<Style>, TokenStoreError> {
        self.check_token_store()?;
        Ok(self.styles.get(id).cloned())
    }
}

/// A [`MemoryDocument`] shared between a live session and whoever edits it.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument {
    inner: Arc<RwLock<MemoryDocument>>,
}

impl SharedDocument {
    pub fn new(doc: MemoryDocument) -> Self {
        Self {
            inner: Arc::new(RwLock::new(doc)),
        }
    }

    /// Read access. A poisoned lock still yields the last written state.
    pub fn read(&self) -> RwLockReadGuard<'_, MemoryDocument> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryDocument> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run an edit against the document.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut MemoryDocument) -> R) -> R {
        edit(&mut self.write())
    }
}

impl DocumentTree for SharedDocument {
    fn current_selection(&self) -> Vec<NodeId> {
        self.read().current_selection()
    }

    fn page_roots(&self) -> Result<Vec<NodeId>, DocumentError> {
        self.read().page_roots()
    }

    fn resolve_node(&self, id: &NodeId) -> Option<NodeSummary> {
        self.read().resolve_node(id)
    }

    fn children_of(&self, id: &NodeId) -> Result<Vec<NodeId>, DocumentError> {
        self.read().children_of(id)
    }

    fn fills_of(&self, id: &NodeId) -> Result<Vec<Paint>, DocumentError> {
        self.read().fills_of(id)
    }

    fn strokes_of(&self, id: &NodeId) -> Result<Vec<Paint>, DocumentError> {
        self.read().strokes_of(id)
    }

    fn text_segments_of(&self, id: &NodeId) -> Result<Vec<TextSegment>, DocumentError> {
        self.read().text_segments_of(id)
    }

    fn bound_variable_for(
        &self,
        id: &NodeId,
        property: PaintProperty,
        index: usize,
    ) -> Option<BoundVariable> {
        self.read().bound_variable_for(id, property, index)
    }

    fn legacy_style_ref_for(&self, id: &NodeId, property: PaintProperty) -> Option<StyleId> {
        self.read().legacy_style_ref_for(id, property)
    }

    fn ancestor_chain(&self, id: &NodeId) -> Result<Vec<NodeId>, DocumentError> {
        self.read().ancestor_chain(id)
    }
}

impl SelectionHost for SharedDocument {
    fn clear_selection(&mut self) -> Result<(), DocumentError> {
        self.write().clear_selection()
    }
}

impl TokenStore for SharedDocument {
    fn variable_by_id(&self, id: &VariableId) -> Result<Option<Variable>, TokenStoreError> {
        self.read().variable_by_id(id)
    }

    fn collection_by_id(
        &self,
        id: &CollectionId,
    ) -> Result<Option<VariableCollection>, TokenStoreError> {
        self.read().collection_by_id(id)
    }

    fn available_library_collections(&self) -> Result<Vec<LibraryCollection>, TokenStoreError> {
        self.read().available_library_collections()
    }

    fn style_by_id(&self, id: &StyleId) -> Result<Option<Style>, TokenStoreError> {
        self.read().style_by_id(id)
    }
}

//! The deduplicated color inventory and the context of the scan behind it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::DocumentTree;
use crate::entry::ColorEntry;
use crate::node::{NodeId, NodeType};

/// Map from dedup key to inventory row, plus the set of nodes the scan
/// visited.
#[derive(Debug, Clone, Default)]
pub struct ColorInventory {
    entries: IndexMap<String, ColorEntry>,
    known_nodes: HashSet<NodeId>,
}

impl ColorInventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an entry in under its dedup key.
    pub fn fold(&mut self, entry: ColorEntry) {
        match self.entries.get_mut(&entry.dedup_key) {
            Some(existing) => existing.absorb(entry),
            None => {
                self.entries.insert(entry.dedup_key.clone(), entry);
            }
        }
    }

    /// Fold every entry of another inventory in, and adopt its visited nodes.
    pub fn merge(&mut self, other: ColorInventory) {
        self.known_nodes.extend(other.known_nodes);
        for entry in other.entries.into_values() {
            self.fold(entry);
        }
    }

    /// Record that a node was visited by a scan.
    pub fn mark_visited(&mut self, id: NodeId) {
        self.known_nodes.insert(id);
    }

    /// Whether a scan visited this node.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.known_nodes.contains(id)
    }

    /// Remove every reference to the given nodes.
    ///
    /// Entries left without references are dropped; touched entries have
    /// their usage count and property types recomputed.
    pub fn remove_nodes(&mut self, ids: &HashSet<NodeId>) {
        for id in ids {
            self.known_nodes.remove(id);
        }
        self.entries.retain(|_, entry| {
            entry.remove_nodes(ids);
            !entry.nodes.is_empty()
        });
    }

    /// Put the references of every entry with conflicting bindings back in
    /// document order, given each node's preorder position, so that the
    /// first binding in traversal order is the one shown. Nodes without a
    /// position sort last.
    pub fn restore_document_order(&mut self, position: &HashMap<NodeId, usize>) {
        for entry in self.entries.values_mut().filter(|entry| entry.has_mixed_tokens()) {
            entry.sort_nodes_by_key(|node| {
                (
                    position.get(&node.node_id).copied().unwrap_or(usize::MAX),
                    node.property_type,
                    node.property_index,
                )
            });
        }
    }

    /// Whether any entry's metadata depends on reference order.
    pub fn has_mixed_tokens(&self) -> bool {
        self.entries.values().any(ColorEntry::has_mixed_tokens)
    }

    pub fn get(&self, dedup_key: &str) -> Option<&ColorEntry> {
        self.entries.get(dedup_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes visited by the scan.
    pub fn known_node_count(&self) -> usize {
        self.known_nodes.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ColorEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in first-seen order.
    pub fn to_vec(&self) -> Vec<ColorEntry> {
        self.entries.values().cloned().collect()
    }

    /// Total references across all entries.
    pub fn total_usage(&self) -> usize {
        self.entries.values().map(|entry| entry.usage_count).sum()
    }

    /// Check the invariants of every entry.
    pub fn is_consistent(&self) -> bool {
        self.entries
            .iter()
            .all(|(key, entry)| key == &entry.dedup_key && entry.is_consistent())
    }
}

/// Whether the scan covered the page or a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Page,
    Selection,
}

/// Snapshot of what a published inventory was scanned over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanContext {
    pub mode: ScanMode,
    pub scope_node_id: Option<NodeId>,
    pub scope_node_ids: Vec<NodeId>,
    pub scope_node_name: Option<String>,
    pub scope_node_type: Option<NodeType>,
    pub total_nodes_scanned: u64,
    pub timestamp: DateTime<Utc>,
}

impl ScanContext {
    /// Context for a whole-page scan.
    pub fn page() -> Self {
        Self {
            mode: ScanMode::Page,
            scope_node_id: None,
            scope_node_ids: Vec::new(),
            scope_node_name: None,
            scope_node_type: None,
            total_nodes_scanned: 0,
            timestamp: Utc::now(),
        }
    }

    /// Context for the document's current selection.
    ///
    /// Selected ids that no longer resolve are dropped. A single selection is
    /// named after its node; several are named by count.
    pub fn from_selection(doc: &dyn DocumentTree) -> Self {
        let selected: Vec<_> = doc
            .current_selection()
            .iter()
            .filter_map(|id| doc.resolve_node(id))
            .collect();

        match selected.as_slice() {
            [] => Self::page(),
            [only] => Self {
                mode: ScanMode::Selection,
                scope_node_id: Some(only.id.clone()),
                scope_node_ids: vec![only.id.clone()],
                scope_node_name: Some(only.name.clone()),
                scope_node_type: Some(only.node_type.clone()),
                total_nodes_scanned: 0,
                timestamp: Utc::now(),
            },
            many => Self {
                mode: ScanMode::Selection,
                scope_node_id: Some(many[0].id.clone()),
                scope_node_ids: many.iter().map(|node| node.id.clone()).collect(),
                scope_node_name: Some(format!("{} elements", many.len())),
                scope_node_type: None,
                total_nodes_scanned: 0,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn is_selection(&self) -> bool {
        self.mode == ScanMode::Selection
    }

    /// Refresh the timestamp to now.
    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }
}

//! The scope a live session tracks.

use swatchscan_core::{NodeId, ScanContext};

/// Which part of the document the inventory follows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Nothing selected.
    #[default]
    NoScope,
    /// The selected nodes, in selection order.
    Selection(Vec<NodeId>),
}

impl Scope {
    /// Scope described by a scan context.
    pub fn from_context(context: &ScanContext) -> Self {
        if context.is_selection() && !context.scope_node_ids.is_empty() {
            Scope::Selection(context.scope_node_ids.clone())
        } else {
            Scope::NoScope
        }
    }

    pub fn ids(&self) -> &[NodeId] {
        match self {
            Scope::NoScope => &[],
            Scope::Selection(ids) => ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Whether `id` is one of the scope roots.
    pub fn is_root(&self, id: &NodeId) -> bool {
        self.ids().contains(id)
    }
}

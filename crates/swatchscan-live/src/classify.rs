//! Classification of settled document-change batches.

use itertools::Itertools;

use swatchscan_core::{
    ChangeKind, ColorInventory, DocumentChange, DocumentTree, NodeId, is_within_scope,
};

use crate::scope::Scope;

/// What a batch of document changes requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePlan {
    /// Nothing to do.
    Ignore,
    /// A scope root was deleted.
    ScopeInvalidated,
    /// The dedup table may be structurally stale.
    FullRescan,
    /// Re-extract these nodes, in first-seen order.
    Incremental(Vec<NodeId>),
}

/// Decide how to react to a settled batch.
///
/// "Known" nodes are the ones the last scan visited. A full rescan wins over
/// incremental handling anywhere in the batch.
pub fn classify(
    batch: &[DocumentChange],
    scope: &Scope,
    inventory: &ColorInventory,
    doc: &dyn DocumentTree,
) -> ChangePlan {
    if scope.is_empty() {
        return ChangePlan::Ignore;
    }

    // Hosts report one delete for the top of a removed subtree, so a scope
    // root may be gone without being named in the batch.
    let deletes: Vec<_> = batch
        .iter()
        .filter(|change| change.kind == ChangeKind::Delete)
        .collect();
    let deletes_scope_root = deletes.iter().any(|change| scope.is_root(&change.node_id))
        || (!deletes.is_empty()
            && scope
                .ids()
                .iter()
                .any(|root| doc.resolve_node(root).is_none()));
    if deletes_scope_root {
        return ChangePlan::ScopeInvalidated;
    }

    let mut incremental = Vec::new();
    for change in batch {
        let id = &change.node_id;
        let known = inventory.contains_node(id);
        match &change.kind {
            ChangeKind::Delete if known => return ChangePlan::FullRescan,
            ChangeKind::Delete => {}
            ChangeKind::Create => {
                if is_within_scope(doc, id, scope.ids()) {
                    return ChangePlan::FullRescan;
                }
            }
            ChangeKind::PropertyChange => {
                if known || is_within_scope(doc, id, scope.ids()) {
                    incremental.push(id.clone());
                }
            }
            ChangeKind::Other(_) => {
                if known || is_within_scope(doc, id, scope.ids()) {
                    return ChangePlan::FullRescan;
                }
            }
        }
    }

    if incremental.is_empty() {
        ChangePlan::Ignore
    } else {
        ChangePlan::Incremental(incremental.into_iter().unique().collect())
    }
}

//! Depth-first traversal of the visible part of a document tree.
//!
//! The walker is a plain iterator over an explicit stack. It never blocks
//! and never decides anything on its own: it reports the start of every
//! root and a checkpoint after every `yield_interval` visited nodes, and the
//! consumer decides whether to keep pulling.

use std::collections::VecDeque;

use swatchscan_core::{DocumentTree, NodeId, NodeSummary, ScanWarning, WarningKind};

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkStep {
    /// Traversal of the next root is about to start.
    Root(NodeId),
    /// A visible node, in pre-order.
    Visit(NodeSummary),
    /// `yield_interval` more nodes were visited; carries the running total.
    Checkpoint(u64),
    /// A node or subtree could not be read and was skipped.
    Skipped(ScanWarning),
}

/// Lazy pre-order walk over the visible nodes under a set of roots.
///
/// An invisible node hides its whole subtree, whatever the visibility of its
/// descendants.
pub struct TreeWalker<'a> {
    doc: &'a dyn DocumentTree,
    roots: std::vec::IntoIter<NodeId>,
    stack: Vec<NodeId>,
    pending: VecDeque<WalkStep>,
    yield_interval: u64,
    visited: u64,
}

impl<'a> TreeWalker<'a> {
    pub fn new(doc: &'a dyn DocumentTree, roots: Vec<NodeId>, yield_interval: u64) -> Self {
        Self {
            doc,
            roots: roots.into_iter(),
            stack: Vec::new(),
            pending: VecDeque::new(),
            yield_interval: yield_interval.max(1),
            visited: 0,
        }
    }

    /// Number of visible nodes visited so far.
    pub fn visited(&self) -> u64 {
        self.visited
    }

    fn visit(&mut self, id: NodeId) -> Option<WalkStep> {
        let Some(node) = self.doc.resolve_node(&id) else {
            return Some(WalkStep::Skipped(ScanWarning::new(
                id,
                "Node no longer resolves",
                WarningKind::StaleNode,
            )));
        };
        if !node.visible {
            return None;
        }

        self.visited += 1;
        if self.visited % self.yield_interval == 0 {
            self.pending.push_back(WalkStep::Checkpoint(self.visited));
        }

        match self.doc.children_of(&id) {
            Ok(children) => self.stack.extend(children.into_iter().rev()),
            Err(err) => self.pending.push_back(WalkStep::Skipped(ScanWarning::new(
                id,
                err.to_string(),
                WarningKind::ChildrenUnavailable,
            ))),
        }

        Some(WalkStep::Visit(node))
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = WalkStep;

    fn next(&mut self) -> Option<WalkStep> {
        loop {
            if let Some(step) = self.pending.pop_front() {
                return Some(step);
            }
            if let Some(id) = self.stack.pop() {
                if let Some(step) = self.visit(id) {
                    return Some(step);
                }
                continue;
            }
            let root = self.roots.next()?;
            self.stack.push(root.clone());
            return Some(WalkStep::Root(root));
        }
    }
}

/// Count the visible nodes under `roots`, skipping invisible subtrees the
/// same way the walker does.
pub fn count_visible(doc: &dyn DocumentTree, roots: &[NodeId]) -> u64 {
    let mut stack: Vec<NodeId> = roots.iter().rev().cloned().collect();
    let mut count = 0;
    while let Some(id) = stack.pop() {
        if !doc.is_visible(&id) {
            continue;
        }
        count += 1;
        if let Ok(children) = doc.children_of(&id) {
            stack.extend(children.into_iter().rev());
        }
    }
    count
}

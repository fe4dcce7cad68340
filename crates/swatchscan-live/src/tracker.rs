//! Scope state and the debounced event queues feeding it.

use tokio::time::Instant;
use tracing::debug;

use swatchscan_core::{ColorInventory, DocumentChange, DocumentTree, ScanConfig, ScanContext};

use crate::classify::{ChangePlan, classify};
use crate::debounce::Debouncer;
use crate::scope::Scope;

/// Owns the current scope and debounces host events.
#[derive(Debug)]
pub struct ChangeTracker {
    scope: Scope,
    selection: Debouncer<()>,
    changes: Debouncer<DocumentChange>,
}

impl ChangeTracker {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            scope: Scope::NoScope,
            selection: Debouncer::new(config.selection_debounce()),
            changes: Debouncer::new(config.change_debounce()),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Replace the scope. Returns whether it changed.
    pub fn set_scope(&mut self, scope: Scope) -> bool {
        if self.scope == scope {
            return false;
        }
        debug!(from = ?self.scope, to = ?scope, "Scope changed");
        self.scope = scope;
        true
    }

    pub fn on_selection_changed(&mut self, now: Instant) {
        self.selection.push((), now);
    }

    /// Queue a batch; batches arriving within the debounce window accumulate.
    pub fn on_document_changed(&mut self, batch: Vec<DocumentChange>, now: Instant) {
        self.changes.extend(batch, now);
    }

    /// Earliest pending debounce deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.selection.deadline(), self.changes.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn selection_due(&self, now: Instant) -> bool {
        self.selection.is_due(now)
    }

    /// Consume a settled selection change.
    pub fn take_selection(&mut self, now: Instant) -> bool {
        self.selection.take_due(now).is_some()
    }

    /// Consume a settled batch of document changes.
    pub fn take_changes(&mut self, now: Instant) -> Option<Vec<DocumentChange>> {
        self.changes.take_due(now)
    }

    /// Consume a pending selection change regardless of its deadline.
    pub fn flush_selection(&mut self) -> bool {
        self.selection.flush().is_some()
    }

    /// Consume pending document changes regardless of their deadline.
    pub fn flush_changes(&mut self) -> Option<Vec<DocumentChange>> {
        self.changes.flush()
    }

    /// Scope the current selection would give.
    pub fn observed_scope(doc: &dyn DocumentTree) -> (Scope, ScanContext) {
        let context = ScanContext::from_selection(doc);
        (Scope::from_context(&context), context)
    }

    /// Classify a settled batch against the current scope and inventory.
    pub fn classify(
        &self,
        batch: &[DocumentChange],
        inventory: &ColorInventory,
        doc: &dyn DocumentTree,
    ) -> ChangePlan {
        let plan = classify(batch, &self.scope, inventory, doc);
        debug!(changes = batch.len(), ?plan, "Classified document changes");
        plan
    }
}

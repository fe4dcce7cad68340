//! Sequencing of full scans and incremental updates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use swatchscan_core::{
    ColorInventory, DocumentError, DocumentTree, NodeId, ScanConfig, ScanContext, ScanError,
    TokenStore, is_effectively_visible,
};
use swatchscan_scan::{ColorScanner, ScanControl, ScanProgress, TreeWalker, WalkStep};

use crate::publish::{Notification, Publisher};

/// Monotonic scan generation counter.
///
/// A scan is stale as soon as the counter moves past the generation it
/// started with. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct ScanGeneration(Arc<AtomicU64>);

impl ScanGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Start a new generation, superseding every earlier one.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// How a scan request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A new inventory was published.
    Published,
    /// A newer generation took over; nothing was published.
    Superseded,
    /// The scan failed; the previous inventory is untouched.
    Failed,
}

/// Cancels when the generation moves on, and forwards progress while the
/// scan is still current.
struct GenerationControl<'a> {
    generation: &'a ScanGeneration,
    mine: u64,
    inner: &'a mut dyn ScanControl,
    publisher: &'a mut dyn Publisher,
}

impl ScanControl for GenerationControl<'_> {
    fn is_cancelled(&mut self) -> bool {
        self.inner.is_cancelled() || !self.generation.is_current(self.mine)
    }

    fn on_progress(&mut self, progress: &ScanProgress) {
        self.inner.on_progress(progress);
        if self.generation.is_current(self.mine) {
            self.publisher.publish(Notification::ScanProgress {
                scanned: progress.nodes_scanned,
                total: progress.total_nodes,
            });
        }
    }

    fn on_notice(&mut self, message: &str) {
        self.inner.on_notice(message);
        self.publisher.publish(Notification::Notice {
            message: message.to_string(),
        });
    }
}

/// Owns the live inventory and decides what gets published.
pub struct ScanOrchestrator {
    scanner: ColorScanner,
    generation: ScanGeneration,
    inventory: ColorInventory,
    context: ScanContext,
}

impl ScanOrchestrator {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            scanner: ColorScanner::new(config),
            generation: ScanGeneration::new(),
            inventory: ColorInventory::new(),
            context: ScanContext::page(),
        }
    }

    pub fn inventory(&self) -> &ColorInventory {
        &self.inventory
    }

    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    /// Handle on the generation counter.
    pub fn generation(&self) -> ScanGeneration {
        self.generation.clone()
    }

    pub fn scanner(&self) -> &ColorScanner {
        &self.scanner
    }

    pub fn scanner_mut(&mut self) -> &mut ColorScanner {
        &mut self.scanner
    }

    /// Rebuild the inventory from the current selection, or the whole page.
    ///
    /// The inventory is replaced only if this scan is still the newest one
    /// when it finishes.
    pub fn full_scan(
        &mut self,
        doc: &dyn DocumentTree,
        store: &dyn TokenStore,
        control: &mut dyn ScanControl,
        publisher: &mut dyn Publisher,
    ) -> ScanOutcome {
        let mine = self.generation.advance();
        debug!(generation = mine, "Full scan started");

        let result = {
            let mut control = GenerationControl {
                generation: &self.generation,
                mine,
                inner: &mut *control,
                publisher: &mut *publisher,
            };
            self.scanner.scan(doc, store, &mut control)
        };

        match result {
            Ok(report) if self.generation.is_current(mine) => {
                self.inventory = report.inventory;
                self.context = report.context;
                self.publish_inventory(publisher);
                ScanOutcome::Published
            }
            Ok(_) | Err(ScanError::Cancelled) => {
                debug!(generation = mine, "Full scan superseded");
                ScanOutcome::Superseded
            }
            Err(err) => {
                warn!(generation = mine, error = %err, "Full scan failed");
                publisher.publish(Notification::ScanError {
                    message: err.to_string(),
                });
                ScanOutcome::Failed
            }
        }
    }

    /// Patch the inventory for a set of changed nodes, falling back to a full
    /// scan if the patch cannot be built.
    pub fn incremental_update(
        &mut self,
        doc: &dyn DocumentTree,
        store: &dyn TokenStore,
        ids: &[NodeId],
        control: &mut dyn ScanControl,
        publisher: &mut dyn Publisher,
    ) -> ScanOutcome {
        match self.patched_inventory(doc, store, ids) {
            Ok(inventory) => {
                debug!(nodes = ids.len(), "Incremental update applied");
                self.inventory = inventory;
                self.context.total_nodes_scanned = self.inventory.known_node_count() as u64;
                self.context.touch();
                self.publish_inventory(publisher);
                ScanOutcome::Published
            }
            Err(err) => {
                warn!(error = %err, "Incremental update failed, rescanning");
                self.full_scan(doc, store, control, publisher)
            }
        }
    }

    /// Drop the inventory and publish an empty page-wide result.
    pub fn clear(&mut self, publisher: &mut dyn Publisher) {
        self.generation.advance();
        self.inventory = ColorInventory::new();
        self.context = ScanContext::page();
        self.publish_inventory(publisher);
    }

    fn publish_inventory(&self, publisher: &mut dyn Publisher) {
        publisher.publish(Notification::ScanComplete {
            colors: self.inventory.to_vec(),
            context: self.context.clone(),
        });
    }

    /// Build the patched inventory on a copy, so a failure leaves the live
    /// one untouched.
    fn patched_inventory(
        &self,
        doc: &dyn DocumentTree,
        store: &dyn TokenStore,
        ids: &[NodeId],
    ) -> Result<ColorInventory, ScanError> {
        let flagged: HashSet<&NodeId> = ids.iter().collect();
        let mut removed = HashSet::new();
        let mut roots = Vec::new();

        for id in ids {
            collect_subtree(doc, id, &mut removed)?;
            // A flagged descendant of another flagged node is re-walked with it.
            let ancestors = doc.ancestor_chain(id)?;
            if !ancestors.iter().any(|ancestor| flagged.contains(ancestor)) {
                roots.push(id.clone());
            }
        }

        let mut next = self.inventory.clone();
        next.remove_nodes(&removed);

        for root in &roots {
            if is_effectively_visible(doc, root)? {
                next.merge(self.scanner.rescan_subtree(doc, store, root)?);
            }
        }

        if next.has_mixed_tokens() {
            let position = self.document_positions(doc)?;
            next.restore_document_order(&position);
        }

        Ok(next)
    }

    /// Preorder position of every visible node in the current scope.
    fn document_positions(
        &self,
        doc: &dyn DocumentTree,
    ) -> Result<HashMap<NodeId, usize>, DocumentError> {
        let roots = if self.context.is_selection() {
            self.context.scope_node_ids.clone()
        } else {
            doc.page_roots()?
        };
        let position = TreeWalker::new(doc, roots, u64::MAX)
            .filter_map(|step| match step {
                WalkStep::Visit(node) => Some(node.id),
                _ => None,
            })
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();
        Ok(position)
    }
}

/// Every node id under `root`, visible or not, including `root`.
fn collect_subtree(
    doc: &dyn DocumentTree,
    root: &NodeId,
    into: &mut HashSet<NodeId>,
) -> Result<(), DocumentError> {
    if doc.resolve_node(root).is_none() {
        return Err(DocumentError::not_found(root));
    }
    let mut stack = vec![root.clone()];
    while let Some(id) = stack.pop() {
        stack.extend(doc.children_of(&id)?);
        into.insert(id);
    }
    Ok(())
}

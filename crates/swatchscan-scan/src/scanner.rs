//! Inventory builder driving the tree walker.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use swatchscan_core::{
    ColorInventory, DocumentError, DocumentTree, NodeId, ScanConfig, ScanContext, ScanError,
    ScanWarning, TokenStore,
};

use crate::extract::extract_node;
use crate::progress::{ProgressTracker, ScanProgress};
use crate::resolver::TokenResolver;
use crate::walker::{TreeWalker, WalkStep, count_visible};

/// Advisory shown when a scan covers more nodes than the configured threshold.
pub const LARGE_DOCUMENT_NOTICE: &str =
    "Large page detected. Consider scoping to a selection for faster results.";

/// Hooks the scanner calls at its suspension points.
///
/// `is_cancelled` is polled at the start of every root and at every
/// checkpoint; returning `true` abandons the scan with
/// [`ScanError::Cancelled`].
pub trait ScanControl {
    fn is_cancelled(&mut self) -> bool;

    fn on_progress(&mut self, _progress: &ScanProgress) {}

    fn on_notice(&mut self, _message: &str) {}
}

/// Control that never cancels and ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopControl;

impl ScanControl for NoopControl {
    fn is_cancelled(&mut self) -> bool {
        false
    }
}

/// Result of a completed scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub inventory: ColorInventory,
    pub context: ScanContext,
    /// Visible nodes under the roots, from the counting pre-pass.
    pub total_nodes: u64,
    pub warnings: Vec<ScanWarning>,
    /// Advisory messages raised during the scan.
    pub notices: Vec<String>,
}

/// Builds color inventories from a document.
pub struct ColorScanner {
    config: ScanConfig,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl ColorScanner {
    /// Create a new scanner.
    pub fn new(config: ScanConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            progress_tx,
        }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn set_include_vectors(&mut self, include_vectors: bool) {
        self.config.include_vectors = include_vectors;
    }

    /// Scan the current selection, or the whole page when nothing is
    /// selected.
    pub fn scan(
        &self,
        doc: &dyn DocumentTree,
        store: &dyn TokenStore,
        control: &mut dyn ScanControl,
    ) -> Result<ScanReport, ScanError> {
        let context = ScanContext::from_selection(doc);
        let roots = if context.is_selection() {
            context.scope_node_ids.clone()
        } else {
            doc.page_roots()?
        };
        self.scan_roots(doc, store, context, roots, control)
    }

    /// Scan an explicit set of roots under a given context.
    pub fn scan_roots(
        &self,
        doc: &dyn DocumentTree,
        store: &dyn TokenStore,
        mut context: ScanContext,
        roots: Vec<NodeId>,
        control: &mut dyn ScanControl,
    ) -> Result<ScanReport, ScanError> {
        self.config
            .validate()
            .map_err(|message| ScanError::InvalidConfig { message })?;

        let total_nodes = count_visible(doc, &roots);
        debug!(roots = roots.len(), total_nodes, "Starting scan");

        let mut notices = Vec::new();
        if self.config.is_large_document(total_nodes) {
            info!(total_nodes, "{LARGE_DOCUMENT_NOTICE}");
            control.on_notice(LARGE_DOCUMENT_NOTICE);
            notices.push(LARGE_DOCUMENT_NOTICE.to_string());
        }

        let mut tracker = ProgressTracker::new(total_nodes);
        let mut warnings = Vec::new();
        let inventory = self.walk(doc, store, roots, &mut tracker, &mut warnings, control)?;

        let done = tracker.finish(inventory.len());
        let _ = self.progress_tx.send(done.clone());
        control.on_progress(&done);

        context.total_nodes_scanned = inventory.known_node_count() as u64;
        context.touch();
        debug!(
            colors = inventory.len(),
            warnings = warnings.len(),
            "Scan complete"
        );

        Ok(ScanReport {
            inventory,
            context,
            total_nodes,
            warnings,
            notices,
        })
    }

    /// Re-extract the subtree under one node, without progress reporting.
    pub fn rescan_subtree(
        &self,
        doc: &dyn DocumentTree,
        store: &dyn TokenStore,
        root: &NodeId,
    ) -> Result<ColorInventory, ScanError> {
        if doc.resolve_node(root).is_none() {
            return Err(DocumentError::not_found(root).into());
        }
        let mut tracker = ProgressTracker::new(0);
        let mut warnings = Vec::new();
        self.walk(
            doc,
            store,
            vec![root.clone()],
            &mut tracker,
            &mut warnings,
            &mut NoopControl,
        )
    }

    fn walk(
        &self,
        doc: &dyn DocumentTree,
        store: &dyn TokenStore,
        roots: Vec<NodeId>,
        tracker: &mut ProgressTracker,
        warnings: &mut Vec<ScanWarning>,
        control: &mut dyn ScanControl,
    ) -> Result<ColorInventory, ScanError> {
        let resolver = TokenResolver::new(store);
        let mut inventory = ColorInventory::new();

        for step in TreeWalker::new(doc, roots, self.config.yield_interval) {
            match step {
                WalkStep::Root(_) => {
                    if control.is_cancelled() {
                        return Err(ScanError::Cancelled);
                    }
                }
                WalkStep::Checkpoint(visited) => {
                    tracker.set_scanned(visited);
                    let progress = tracker.snapshot(inventory.len());
                    let _ = self.progress_tx.send(progress.clone());
                    control.on_progress(&progress);
                    if control.is_cancelled() {
                        return Err(ScanError::Cancelled);
                    }
                }
                WalkStep::Skipped(warning) => {
                    warn!(node = %warning.node_id, "{}", warning.message);
                    tracker.record_error();
                    warnings.push(warning);
                }
                WalkStep::Visit(node) => {
                    inventory.mark_visited(node.id.clone());
                    if !self.config.include_vectors && node.node_type.is_vector_shape() {
                        continue;
                    }
                    match extract_node(doc, &resolver, &node) {
                        Ok(entries) => entries.into_iter().for_each(|e| inventory.fold(e)),
                        Err(err) => {
                            warn!(node = %node.id, error = %err, "Failed to extract colors");
                            tracker.record_error();
                            warnings.push(ScanWarning::extraction_failed(node.id, &err));
                        }
                    }
                }
            }
        }

        Ok(inventory)
    }
}

impl Default for ColorScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swatchscan_core::{
        MemoryDocument, MemoryNode, NodeType, Paint, PropertyType, Rgba, ScanMode, WarningKind,
    };

    fn red() -> Paint {
        Paint::solid(Rgba::opaque(1.0, 0.0, 0.0))
    }

    fn grid(count: usize) -> MemoryDocument {
        let mut frame = MemoryNode::new("frame", "Frame", NodeType::Frame);
        for i in 0..count {
            frame = frame.with_child(
                MemoryNode::new(format!("r{i}"), format!("R{i}"), NodeType::Rectangle)
                    .with_fill(red()),
            );
        }
        let mut doc = MemoryDocument::new();
        doc.add_root(frame).unwrap();
        doc
    }

    struct CancelAfter {
        checks: usize,
        progress: Vec<u64>,
    }

    impl ScanControl for CancelAfter {
        fn is_cancelled(&mut self) -> bool {
            if self.checks == 0 {
                return true;
            }
            self.checks -= 1;
            false
        }

        fn on_progress(&mut self, progress: &ScanProgress) {
            self.progress.push(progress.nodes_scanned);
        }
    }

    #[test]
    fn test_page_scan_dedups() {
        let doc = grid(2);
        let scanner = ColorScanner::default();
        let report = scanner.scan(&doc, &doc, &mut NoopControl).unwrap();

        assert_eq!(report.context.mode, ScanMode::Page);
        assert_eq!(report.total_nodes, 3);
        assert_eq!(report.context.total_nodes_scanned, 3);
        let entry = report.inventory.get("FF0000FF").unwrap();
        assert_eq!(entry.usage_count, 2);
        assert_eq!(entry.property_types.len(), 1);
        assert!(entry.property_types.contains(&PropertyType::Fill));
    }

    #[test]
    fn test_vectors_are_filtered_but_descended() {
        let mut doc = MemoryDocument::new();
        doc.add_root(
            MemoryNode::new("bool", "Union", NodeType::BooleanOperation)
                .with_fill(red())
                .with_child(
                    MemoryNode::new("rect", "Rect", NodeType::Rectangle)
                        .with_fill(Paint::solid(Rgba::opaque(0.0, 0.0, 1.0))),
                ),
        )
        .unwrap();

        let mut scanner = ColorScanner::default();
        let report = scanner.scan(&doc, &doc, &mut NoopControl).unwrap();
        assert!(report.inventory.get("FF0000FF").is_none());
        assert!(report.inventory.get("0000FFFF").is_some());
        assert!(report.inventory.contains_node(&NodeId::from("bool")));

        scanner.set_include_vectors(true);
        let report = scanner.scan(&doc, &doc, &mut NoopControl).unwrap();
        assert!(report.inventory.get("FF0000FF").is_some());
    }

    #[test]
    fn test_bad_node_is_skipped() {
        let mut broken = red();
        broken.color = None;
        let mut doc = grid(2);
        doc.insert(
            &NodeId::from("frame"),
            MemoryNode::new("bad", "Bad", NodeType::Rectangle)
                .with_fill(Paint::solid(Rgba::opaque(0.0, 1.0, 0.0)))
                .with_fill(broken),
        )
        .unwrap();

        let report = ColorScanner::default()
            .scan(&doc, &doc, &mut NoopControl)
            .unwrap();
        assert_eq!(report.inventory.get("FF0000FF").unwrap().usage_count, 2);
        assert!(report.inventory.get("00FF00FF").is_none());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::ExtractionFailed);
    }

    #[test]
    fn test_cancellation_at_checkpoint() {
        let doc = grid(20);
        let config = ScanConfig::builder().yield_interval(5u64).build().unwrap();
        let scanner = ColorScanner::new(config);

        // One check for the root, one for the first checkpoint.
        let mut control = CancelAfter {
            checks: 2,
            progress: Vec::new(),
        };
        let err = scanner.scan(&doc, &doc, &mut control).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(control.progress, vec![5, 10]);
    }

    #[test]
    fn test_progress_broadcast() {
        let doc = grid(9);
        let config = ScanConfig::builder().yield_interval(5u64).build().unwrap();
        let scanner = ColorScanner::new(config);
        let mut rx = scanner.subscribe();

        scanner.scan(&doc, &doc, &mut NoopControl).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.nodes_scanned, 5);
        assert_eq!(first.total_nodes, 10);
        let last = rx.try_recv().unwrap();
        assert_eq!(last.nodes_scanned, 10);
        assert_eq!(last.colors_found, 1);
    }

    #[test]
    fn test_large_document_notice() {
        let doc = grid(3);
        let config = ScanConfig::builder()
            .large_document_threshold(2u64)
            .build()
            .unwrap();
        let report = ColorScanner::new(config)
            .scan(&doc, &doc, &mut NoopControl)
            .unwrap();
        assert_eq!(report.notices, vec![LARGE_DOCUMENT_NOTICE.to_string()]);
    }

    #[test]
    fn test_rescan_missing_subtree_fails() {
        let doc = grid(1);
        let err = ColorScanner::default()
            .rescan_subtree(&doc, &doc, &NodeId::from("gone"))
            .unwrap_err();
        assert!(matches!(err, ScanError::Document(DocumentError::NodeNotFound { .. })));
    }
}

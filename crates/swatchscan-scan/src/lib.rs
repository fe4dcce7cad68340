//! Color scanning engine for swatchscan.
//!
//! This crate turns a document tree into a deduplicated [`ColorInventory`].
//!
//! # Overview
//!
//! - **Tree walking** over visible nodes with an explicit stack, reporting a
//!   checkpoint every `yield_interval` nodes
//! - **Token resolution** of variable and legacy style bindings
//! - **Progress updates** via broadcast channels
//! - **Cooperative cancellation** through [`ScanControl`]
//!
//! # Example
//!
//! ```rust,no_run
//! use swatchscan_scan::{ColorScanner, MemoryDocument, NoopControl, ScanConfig};
//!
//! let doc = MemoryDocument::load("page.json").unwrap();
//! let scanner = ColorScanner::new(ScanConfig::default());
//! let report = scanner.scan(&doc, &doc, &mut NoopControl).unwrap();
//!
//! for entry in report.inventory.entries() {
//!     println!("{} used {} times", entry.dedup_key, entry.usage_count);
//! }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use swatchscan_scan::ColorScanner;
//!
//! let scanner = ColorScanner::default();
//! let mut progress_rx = scanner.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {}/{}", progress.nodes_scanned, progress.total_nodes);
//!     }
//! });
//! ```

mod extract;
mod progress;
mod resolver;
mod scanner;
mod walker;

pub use extract::extract_node;
pub use progress::ScanProgress;
pub use resolver::{STYLES_COLLECTION, TokenResolver, UNKNOWN_COLLECTION};
pub use scanner::{ColorScanner, LARGE_DOCUMENT_NOTICE, NoopControl, ScanControl, ScanReport};
pub use walker::{TreeWalker, WalkStep, count_visible};

// Re-export core types for convenience
pub use swatchscan_core::{
    ColorEntry, ColorInventory, MemoryDocument, NodeId, ScanConfig, ScanContext, ScanError,
    ScanWarning, WarningKind,
};

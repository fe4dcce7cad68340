//! Scan progress reporting.

use std::time::{Duration, Instant};

/// Progress information during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanProgress {
    /// Number of visible nodes visited so far.
    pub nodes_scanned: u64,
    /// Visible nodes under the scan roots, from the counting pre-pass.
    pub total_nodes: u64,
    /// Number of distinct colors found so far.
    pub colors_found: usize,
    /// Number of nodes skipped because extraction failed.
    pub errors_count: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new(total_nodes: u64) -> Self {
        Self {
            nodes_scanned: 0,
            total_nodes,
            colors_found: 0,
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Fraction of the scan completed, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_nodes == 0 {
            return 1.0;
        }
        (self.nodes_scanned as f64 / self.total_nodes as f64).min(1.0)
    }

    /// Calculate scan rate in nodes per second.
    pub fn nodes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.nodes_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    total_nodes: u64,
    nodes_scanned: u64,
    errors_count: u64,
}

impl ProgressTracker {
    pub fn new(total_nodes: u64) -> Self {
        Self {
            start_time: Instant::now(),
            total_nodes,
            nodes_scanned: 0,
            errors_count: 0,
        }
    }

    pub fn set_scanned(&mut self, nodes_scanned: u64) {
        self.nodes_scanned = nodes_scanned;
    }

    pub fn record_error(&mut self) {
        self.errors_count += 1;
    }

    pub fn snapshot(&self, colors_found: usize) -> ScanProgress {
        ScanProgress {
            nodes_scanned: self.nodes_scanned,
            total_nodes: self.total_nodes,
            colors_found,
            errors_count: self.errors_count,
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Final snapshot, reported as complete.
    pub fn finish(&self, colors_found: usize) -> ScanProgress {
        ScanProgress {
            nodes_scanned: self.total_nodes,
            ..self.snapshot(colors_found)
        }
    }
}

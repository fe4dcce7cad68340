//! Scan configuration types.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for scanning and live tracking.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Extract colors from pure vector/shape nodes.
    #[builder(default = "false")]
    #[serde(default)]
    pub include_vectors: bool,

    /// Visited nodes between progress checkpoints.
    #[builder(default = "500")]
    #[serde(default = "default_yield_interval")]
    pub yield_interval: u64,

    /// Node count above which the scan advises scoping to a selection.
    #[builder(default = "50_000")]
    #[serde(default = "default_large_document_threshold")]
    pub large_document_threshold: u64,

    /// Quiet period before a selection change is acted on.
    #[builder(default = "400")]
    #[serde(default = "default_selection_debounce_ms")]
    pub selection_debounce_ms: u64,

    /// Quiet period before a batch of document changes is classified.
    #[builder(default = "300")]
    #[serde(default = "default_change_debounce_ms")]
    pub change_debounce_ms: u64,
}

fn default_yield_interval() -> u64 {
    500
}

fn default_large_document_threshold() -> u64 {
    50_000
}

fn default_selection_debounce_ms() -> u64 {
    400
}

fn default_change_debounce_ms() -> u64 {
    300
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.yield_interval == Some(0) {
            return Err("Yield interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config with default settings.
    pub fn new() -> Self {
        Self {
            include_vectors: false,
            yield_interval: default_yield_interval(),
            large_document_threshold: default_large_document_threshold(),
            selection_debounce_ms: default_selection_debounce_ms(),
            change_debounce_ms: default_change_debounce_ms(),
        }
    }

    /// Check values a deserialized config may carry.
    pub fn validate(&self) -> Result<(), String> {
        if self.yield_interval == 0 {
            return Err("Yield interval must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn selection_debounce(&self) -> Duration {
        Duration::from_millis(self.selection_debounce_ms)
    }

    pub fn change_debounce(&self) -> Duration {
        Duration::from_millis(self.change_debounce_ms)
    }

    /// Whether a document of `total_nodes` warrants the scoping advice.
    pub fn is_large_document(&self, total_nodes: u64) -> bool {
        total_nodes > self.large_document_threshold
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

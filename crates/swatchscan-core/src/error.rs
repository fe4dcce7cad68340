//! Error types for document queries and scanning operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::NodeId;

/// Errors raised by the host document.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DocumentError {
    /// The node id no longer resolves (deleted or stale).
    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// Paint data could not be interpreted.
    #[error("Malformed paint on {id}: {message}")]
    MalformedPaint { id: NodeId, message: String },

    /// The host could not answer the query.
    #[error("Document unavailable: {message}")]
    Unavailable { message: String },
}

impl DocumentError {
    /// Create a not-found error.
    pub fn not_found(id: &NodeId) -> Self {
        Self::NodeNotFound { id: id.clone() }
    }

    /// Create a malformed paint error.
    pub fn malformed(id: &NodeId, message: impl Into<String>) -> Self {
        Self::MalformedPaint {
            id: id.clone(),
            message: message.into(),
        }
    }
}

/// Errors raised by the design token store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TokenStoreError {
    /// The store could not be queried.
    #[error("Token store unavailable: {message}")]
    Unavailable { message: String },

    /// A remote library could not be reached.
    #[error("Library lookup failed: {message}")]
    LibraryLookup { message: String },
}

/// Errors that can occur during scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A newer scan superseded this one. Not a failure.
    #[error("Scan cancelled")]
    Cancelled,

    /// The document could not be queried.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Check whether this is the cancellation sentinel.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Color extraction failed; the node was skipped.
    ExtractionFailed,
    /// Children could not be listed; the subtree was skipped.
    ChildrenUnavailable,
    /// A node id did not resolve during traversal.
    StaleNode,
}

/// Non-fatal warning encountered during scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Node where the warning occurred.
    pub node_id: NodeId,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(node_id: NodeId, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            node_id,
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for a node whose colors could not be extracted.
    pub fn extraction_failed(node_id: NodeId, error: &DocumentError) -> Self {
        Self {
            message: format!("Skipped node: {error}"),
            node_id,
            kind: WarningKind::ExtractionFailed,
        }
    }
}

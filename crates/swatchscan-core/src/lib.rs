//! Core types and traits for swatchscan.
//!
//! This crate provides the fundamental data structures used throughout
//! the swatchscan ecosystem: colors and their dedup keys, inventory rows,
//! the scan context, configuration, and the query interfaces onto the host
//! document and its token store.

mod color;
mod config;
mod document;
mod entry;
mod error;
mod inventory;
pub mod memory;
mod node;
mod paint;
mod token;

pub use color::{
    GradientData, GradientStop, GradientType, Rgba, Transform, display_hex, gradient_fingerprint,
    hex_key, hex_string,
};
pub use config::{ScanConfig, ScanConfigBuilder};
pub use document::{
    ChangeKind, DocumentChange, DocumentTree, SelectionHost, TokenStore, is_effectively_visible,
    is_within_scope, layer_path,
};
pub use entry::{ColorEntry, ColorKind, solid_dedup_key};
pub use error::{DocumentError, ScanError, ScanWarning, TokenStoreError, WarningKind};
pub use inventory::{ColorInventory, ScanContext, ScanMode};
pub use memory::{DocumentSnapshot, MemoryDocument, MemoryNode, SharedDocument};
pub use node::{NodeId, NodeRef, NodeSummary, NodeType, PropertyType};
pub use paint::{
    AliasKind, BoundVariable, CollectionId, Paint, PaintKind, PaintProperty, StyleId, TextSegment,
    VariableAlias, VariableId,
};
pub use token::{LibraryCollection, Style, TokenInfo, Variable, VariableCollection};

//! Inventory rows: one deduplicated color and every place it is used.

use std::collections::{BTreeSet, HashSet};
use std::mem;

use serde::{Deserialize, Serialize};

use crate::color::{GradientData, Rgba, hex_key, hex_string};
use crate::node::{NodeId, NodeRef, PropertyType};
use crate::paint::StyleId;
use crate::token::TokenInfo;

/// Whether an entry is a solid color or a gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorKind {
    Solid,
    Gradient,
}

/// Dedup key for a solid color, optionally bound to a token.
///
/// Hex-identical colors bound to different tokens get different keys so that
/// a wrong token on the right color stays visible.
pub fn solid_dedup_key(rgba: Rgba, token: Option<&TokenInfo>) -> String {
    let hex = hex_key(rgba);
    match token {
        Some(token) => format!("{hex}|{}", token.token_name),
        None => hex,
    }
}

/// A canonical inventory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorEntry {
    #[serde(rename = "type")]
    pub kind: ColorKind,
    pub hex: Option<String>,
    pub rgba: Option<Rgba>,
    pub gradient: Option<GradientData>,
    pub dedup_key: String,
    pub token_name: Option<String>,
    pub token_collection: Option<String>,
    pub library_name: Option<String>,
    pub is_library_variable: bool,
    pub style_name: Option<String>,
    pub style_id: Option<StyleId>,
    pub property_types: BTreeSet<PropertyType>,
    pub nodes: Vec<NodeRef>,
    pub usage_count: usize,
    pub is_token_bound: bool,
    /// Binding of each node reference, aligned with `nodes`.
    #[serde(skip)]
    node_tokens: Vec<Option<TokenInfo>>,
}

impl ColorEntry {
    /// A solid color used once.
    pub fn solid(rgba: Rgba, token: Option<TokenInfo>, node: NodeRef) -> Self {
        let dedup_key = solid_dedup_key(rgba, token.as_ref());
        let mut entry = Self {
            kind: ColorKind::Solid,
            hex: Some(hex_string(rgba)),
            rgba: Some(rgba),
            gradient: None,
            dedup_key,
            token_name: None,
            token_collection: None,
            library_name: None,
            is_library_variable: false,
            style_name: None,
            style_id: None,
            property_types: BTreeSet::from([node.property_type]),
            nodes: vec![node],
            usage_count: 1,
            is_token_bound: false,
            node_tokens: vec![token.clone()],
        };
        if let Some(token) = token {
            entry.adopt_token(&token);
        }
        entry
    }

    /// A gradient used once. Gradients never carry token metadata.
    pub fn gradient(gradient: GradientData, node: NodeRef) -> Self {
        Self {
            kind: ColorKind::Gradient,
            hex: None,
            rgba: None,
            dedup_key: gradient.fingerprint(),
            gradient: Some(gradient),
            token_name: None,
            token_collection: None,
            library_name: None,
            is_library_variable: false,
            style_name: None,
            style_id: None,
            property_types: BTreeSet::from([node.property_type]),
            nodes: vec![node],
            usage_count: 1,
            is_token_bound: false,
            node_tokens: vec![None],
        }
    }

    /// Copy token provenance onto this entry and mark it bound.
    fn adopt_token(&mut self, token: &TokenInfo) {
        self.token_name = Some(token.token_name.clone());
        self.token_collection = Some(token.token_collection.clone());
        self.library_name = token.library_name.clone();
        self.is_library_variable = token.is_library_variable;
        self.style_name = token.style_name.clone();
        self.style_id = token.style_id.clone();
        self.is_token_bound = true;
    }

    fn clear_token(&mut self) {
        self.token_name = None;
        self.token_collection = None;
        self.library_name = None;
        self.is_library_variable = false;
        self.style_name = None;
        self.style_id = None;
        self.is_token_bound = false;
    }

    /// Give every node a binding slot. Entries read back from JSON carry
    /// none, so their nodes inherit the entry's own binding.
    fn align_tokens(&mut self) {
        if self.node_tokens.len() != self.nodes.len() {
            self.node_tokens = vec![self.token(); self.nodes.len()];
        }
    }

    /// Re-derive token metadata: the first bound node, in list order, wins.
    fn sync_token(&mut self) {
        if self.kind != ColorKind::Solid {
            return;
        }
        match self.node_tokens.iter().flatten().next().cloned() {
            Some(token) => self.adopt_token(&token),
            None => self.clear_token(),
        }
    }

    /// Token provenance of this entry, if bound.
    pub fn token(&self) -> Option<TokenInfo> {
        if !self.is_token_bound {
            return None;
        }
        Some(TokenInfo {
            token_name: self.token_name.clone()?,
            token_collection: self.token_collection.clone().unwrap_or_default(),
            library_name: self.library_name.clone(),
            is_library_variable: self.is_library_variable,
            style_name: self.style_name.clone(),
            style_id: self.style_id.clone(),
        })
    }

    /// Merge another entry with the same dedup key into this one.
    ///
    /// Node lists are concatenated and property types unioned. An unbound
    /// solid entry adopts the first binding it meets; once bound, its token
    /// metadata is never overwritten.
    pub fn absorb(&mut self, mut other: ColorEntry) {
        debug_assert_eq!(self.dedup_key, other.dedup_key);
        self.align_tokens();
        other.align_tokens();
        if self.kind == ColorKind::Solid && !self.is_token_bound && other.is_token_bound {
            if let Some(token) = other.token() {
                self.adopt_token(&token);
            }
        }
        self.property_types.extend(other.property_types);
        self.nodes.extend(other.nodes);
        self.node_tokens.extend(other.node_tokens);
        self.usage_count = self.nodes.len();
    }

    /// Drop every reference to the given nodes. Returns whether any was removed.
    ///
    /// Token metadata is re-derived from the references that remain.
    pub fn remove_nodes(&mut self, ids: &HashSet<NodeId>) -> bool {
        if !self.nodes.iter().any(|node| ids.contains(&node.node_id)) {
            return false;
        }
        self.align_tokens();
        let (nodes, tokens): (Vec<_>, Vec<_>) = mem::take(&mut self.nodes)
            .into_iter()
            .zip(mem::take(&mut self.node_tokens))
            .filter(|(node, _)| !ids.contains(&node.node_id))
            .unzip();
        self.nodes = nodes;
        self.node_tokens = tokens;
        self.recount();
        self.sync_token();
        true
    }

    /// Whether the references carry more than one distinct binding, making
    /// the entry's metadata depend on reference order.
    pub fn has_mixed_tokens(&self) -> bool {
        let mut bound = self.node_tokens.iter().flatten();
        match bound.next() {
            Some(first) => bound.any(|token| token != first),
            None => false,
        }
    }

    /// Stable-sort the references by `key`, then re-derive token metadata.
    pub fn sort_nodes_by_key<K: Ord>(&mut self, mut key: impl FnMut(&NodeRef) -> K) {
        self.align_tokens();
        let mut pairs: Vec<_> = mem::take(&mut self.nodes)
            .into_iter()
            .zip(mem::take(&mut self.node_tokens))
            .collect();
        pairs.sort_by_key(|(node, _)| key(node));
        (self.nodes, self.node_tokens) = pairs.into_iter().unzip();
        self.sync_token();
    }

    /// Recompute `usage_count` and `property_types` from the node list.
    pub fn recount(&mut self) {
        self.usage_count = self.nodes.len();
        self.property_types = self.nodes.iter().map(|node| node.property_type).collect();
    }

    /// Check the structural invariants of a row.
    pub fn is_consistent(&self) -> bool {
        let types: BTreeSet<PropertyType> =
            self.nodes.iter().map(|node| node.property_type).collect();
        let payload_matches = match self.kind {
            ColorKind::Solid => {
                self.hex.is_some() && self.rgba.is_some() && self.gradient.is_none()
            }
            ColorKind::Gradient => {
                self.hex.is_none() && self.rgba.is_none() && self.gradient.is_some()
            }
        };
        self.usage_count == self.nodes.len() && self.property_types == types && payload_matches
    }
}

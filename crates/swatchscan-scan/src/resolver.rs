//! Resolution of paint bindings to token provenance.
//!
//! Every lookup here is allowed to fail: a missing variable, an offline
//! store or a disabled library degrades to `None` fields and never surfaces
//! as an error.

use std::cell::OnceCell;

use tracing::warn;

use swatchscan_core::{
    AliasKind, BoundVariable, DocumentTree, LibraryCollection, NodeId, PaintProperty, StyleId,
    TokenInfo, TokenStore, VariableCollection,
};

/// Collection name used when a variable's collection cannot be found.
pub const UNKNOWN_COLLECTION: &str = "Unknown Collection";

/// Collection name reported for legacy styles.
pub const STYLES_COLLECTION: &str = "Styles";

/// Resolves variable and style bindings against a token store.
///
/// The remote library listing is fetched at most once per resolver, so a
/// resolver should live for a single scan.
pub struct TokenResolver<'a> {
    store: &'a dyn TokenStore,
    libraries: OnceCell<Option<Vec<LibraryCollection>>>,
}

impl<'a> TokenResolver<'a> {
    /// Create a resolver over a token store.
    pub fn new(store: &'a dyn TokenStore) -> Self {
        Self {
            store,
            libraries: OnceCell::new(),
        }
    }

    /// Token source of a paint slot: its bound variable, else the legacy
    /// style of the paint list.
    pub fn resolve_slot(
        &self,
        doc: &dyn DocumentTree,
        node: &NodeId,
        property: PaintProperty,
        index: usize,
    ) -> Option<TokenInfo> {
        if let Some(binding) = doc.bound_variable_for(node, property, index) {
            if let Some(token) = self.resolve_variable_binding(&binding) {
                return Some(token);
            }
        }
        let style_id = doc.legacy_style_ref_for(node, property)?;
        self.resolve_style_binding(&style_id)
    }

    /// Resolve a variable binding. Only the first alias of a chain is used.
    pub fn resolve_variable_binding(&self, binding: &BoundVariable) -> Option<TokenInfo> {
        let alias = binding.primary()?;
        if alias.kind != AliasKind::VariableAlias {
            return None;
        }

        let variable = match self.store.variable_by_id(&alias.id) {
            Ok(Some(variable)) => variable,
            Ok(None) => return None,
            Err(err) => {
                warn!(variable = %alias.id, error = %err, "Failed to resolve variable");
                return None;
            }
        };

        let collection = match self.store.collection_by_id(&variable.variable_collection_id) {
            Ok(collection) => collection,
            Err(err) => {
                warn!(
                    collection = %variable.variable_collection_id,
                    error = %err,
                    "Failed to resolve variable collection"
                );
                None
            }
        };

        let collection_name = collection
            .as_ref()
            .map(|collection| collection.name.clone())
            .unwrap_or_else(|| UNKNOWN_COLLECTION.to_string());
        let token = TokenInfo::variable(variable.name, collection_name);

        let is_remote = variable.remote || collection.as_ref().is_some_and(|c| c.remote);
        if !is_remote {
            return Some(token);
        }

        let library_name = collection
            .as_ref()
            .and_then(|collection| self.library_name_for(collection));
        Some(token.with_library(library_name))
    }

    /// Resolve a legacy style reference.
    pub fn resolve_style_binding(&self, style_id: &StyleId) -> Option<TokenInfo> {
        let style = match self.store.style_by_id(style_id) {
            Ok(Some(style)) => style,
            Ok(None) => return None,
            Err(err) => {
                warn!(style = %style_id, error = %err, "Failed to resolve style");
                return None;
            }
        };

        Some(TokenInfo {
            token_name: style.name.clone(),
            token_collection: STYLES_COLLECTION.to_string(),
            library_name: None,
            is_library_variable: style.remote,
            style_name: Some(style.name),
            style_id: Some(style.id),
        })
    }

    /// Name of the library that publishes a remote collection.
    ///
    /// Matched by collection key first, then by collection name, since the
    /// host may key the same published collection differently.
    fn library_name_for(&self, collection: &VariableCollection) -> Option<String> {
        let libraries = self.libraries().as_ref()?;
        libraries
            .iter()
            .find(|library| !collection.key.is_empty() && library.key == collection.key)
            .or_else(|| libraries.iter().find(|library| library.name == collection.name))
            .map(|library| library.library_name.clone())
    }

    fn libraries(&self) -> &Option<Vec<LibraryCollection>> {
        self.libraries
            .get_or_init(|| match self.store.available_library_collections() {
                Ok(libraries) => Some(libraries),
                Err(err) => {
                    warn!(error = %err, "Library collections unavailable");
                    None
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swatchscan_core::{
        LibraryCollection, MemoryDocument, MemoryNode, NodeType, Paint, Rgba, Style, Variable,
        VariableAlias,
    };

    fn store() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_variable(Variable {
            id: "v-local".into(),
            name: "brand/red".into(),
            variable_collection_id: "c-local".into(),
            remote: false,
        });
        doc.add_variable(Variable {
            id: "v-remote".into(),
            name: "core/blue".into(),
            variable_collection_id: "c-remote".into(),
            remote: true,
        });
        doc.add_variable(Variable {
            id: "v-orphan".into(),
            name: "orphan".into(),
            variable_collection_id: "c-missing".into(),
            remote: false,
        });
        doc.add_collection(VariableCollection {
            id: "c-local".into(),
            name: "Brand".into(),
            key: "k-local".into(),
            remote: false,
        });
        doc.add_collection(VariableCollection {
            id: "c-remote".into(),
            name: "Core Palette".into(),
            key: "k-remote".into(),
            remote: true,
        });
        doc.add_style(Style {
            id: "s1".into(),
            name: "Surface/Default".into(),
            remote: false,
        });
        doc
    }

    #[test]
    fn test_local_variable() {
        let doc = store();
        let resolver = TokenResolver::new(&doc);
        let token = resolver
            .resolve_variable_binding(&VariableAlias::new("v-local").into())
            .unwrap();
        assert_eq!(token.token_name, "brand/red");
        assert_eq!(token.token_collection, "Brand");
        assert!(!token.is_library_variable);
        assert!(token.library_name.is_none());
    }

    #[test]
    fn test_only_first_alias_is_resolved() {
        let doc = store();
        let resolver = TokenResolver::new(&doc);
        let chain = BoundVariable::Chain(vec![
            VariableAlias::new("missing"),
            VariableAlias::new("v-local"),
        ]);
        assert!(resolver.resolve_variable_binding(&chain).is_none());
    }

    #[test]
    fn test_missing_collection_is_unknown() {
        let doc = store();
        let resolver = TokenResolver::new(&doc);
        let token = resolver
            .resolve_variable_binding(&VariableAlias::new("v-orphan").into())
            .unwrap();
        assert_eq!(token.token_collection, UNKNOWN_COLLECTION);
    }

    #[test]
    fn test_remote_library_by_key_then_name() {
        let mut doc = store();
        doc.add_library_collection(LibraryCollection {
            key: "other-key".into(),
            name: "Core Palette".into(),
            library_name: "By Name".into(),
        });
        doc.add_library_collection(LibraryCollection {
            key: "k-remote".into(),
            name: "Renamed".into(),
            library_name: "By Key".into(),
        });
        let resolver = TokenResolver::new(&doc);
        let token = resolver
            .resolve_variable_binding(&VariableAlias::new("v-remote").into())
            .unwrap();
        assert!(token.is_library_variable);
        assert_eq!(token.library_name.as_deref(), Some("By Key"));

        let mut by_name = store();
        by_name.add_library_collection(LibraryCollection {
            key: "republished".into(),
            name: "Core Palette".into(),
            library_name: "Design System".into(),
        });
        let resolver = TokenResolver::new(&by_name);
        let token = resolver
            .resolve_variable_binding(&VariableAlias::new("v-remote").into())
            .unwrap();
        assert_eq!(token.library_name.as_deref(), Some("Design System"));
    }

    #[test]
    fn test_library_failure_degrades_to_none() {
        let mut doc = store();
        doc.set_libraries_online(false);
        let resolver = TokenResolver::new(&doc);
        let token = resolver
            .resolve_variable_binding(&VariableAlias::new("v-remote").into())
            .unwrap();
        assert!(token.is_library_variable);
        assert!(token.library_name.is_none());
    }

    #[test]
    fn test_store_offline_returns_none() {
        let mut doc = store();
        doc.set_token_store_online(false);
        let resolver = TokenResolver::new(&doc);
        assert!(
            resolver
                .resolve_variable_binding(&VariableAlias::new("v-local").into())
                .is_none()
        );
        assert!(resolver.resolve_style_binding(&"s1".into()).is_none());
    }

    #[test]
    fn test_slot_falls_back_to_style() {
        let mut doc = store();
        doc.add_root(
            MemoryNode::new("n", "Card", NodeType::Rectangle)
                .with_fill(Paint::solid(Rgba::opaque(1.0, 1.0, 1.0)))
                .with_fill(Paint::solid(Rgba::opaque(0.0, 0.0, 0.0)))
                .with_bound_variable(PaintProperty::Fills, 1, VariableAlias::new("v-local"))
                .with_style(PaintProperty::Fills, "s1"),
        )
        .unwrap();
        let resolver = TokenResolver::new(&doc);
        let node = NodeId::from("n");

        let styled = resolver
            .resolve_slot(&doc, &node, PaintProperty::Fills, 0)
            .unwrap();
        assert_eq!(styled.token_collection, STYLES_COLLECTION);
        assert_eq!(styled.style_name.as_deref(), Some("Surface/Default"));
        assert_eq!(styled.style_id.as_deref(), Some("s1"));

        let bound = resolver
            .resolve_slot(&doc, &node, PaintProperty::Fills, 1)
            .unwrap();
        assert_eq!(bound.token_name, "brand/red");

        assert!(
            resolver
                .resolve_slot(&doc, &node, PaintProperty::Strokes, 0)
                .is_none()
        );
    }
}

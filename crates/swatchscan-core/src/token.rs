//! Design token records and resolved token provenance.

use serde::{Deserialize, Serialize};

use crate::paint::{CollectionId, StyleId, VariableId};

/// A design variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub variable_collection_id: CollectionId,
    /// Defined in a shared library rather than this document.
    #[serde(default)]
    pub remote: bool,
}

/// A collection grouping variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableCollection {
    pub id: CollectionId,
    pub name: String,
    /// Publishing key, shared with the library's collection listing.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub remote: bool,
}

/// A collection published by an enabled remote library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryCollection {
    pub key: String,
    pub name: String,
    pub library_name: String,
}

/// A legacy paint style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub id: StyleId,
    pub name: String,
    #[serde(default)]
    pub remote: bool,
}

/// Provenance of a token-bound color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub token_name: String,
    pub token_collection: String,
    pub library_name: Option<String>,
    pub is_library_variable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<StyleId>,
}

impl TokenInfo {
    /// Token info for a variable binding.
    pub fn variable(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            token_name: name.into(),
            token_collection: collection.into(),
            library_name: None,
            is_library_variable: false,
            style_name: None,
            style_id: None,
        }
    }

    /// Mark the token as coming from a shared library.
    pub fn with_library(mut self, library_name: Option<String>) -> Self {
        self.is_library_variable = true;
        self.library_name = library_name;
        self
    }
}

//! Scripted edit sequences for `swatchscan replay`.

use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Deserialize;

use swatchscan_core::{
    BoundVariable, DocumentError, MemoryNode, NodeId, Paint, PaintProperty, SharedDocument,
};
use swatchscan_live::{Command, HostEvent, SessionInput};

/// One step of a replay script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    Select {
        ids: Vec<NodeId>,
    },
    SetFills {
        id: NodeId,
        fills: Vec<Paint>,
    },
    SetStrokes {
        id: NodeId,
        strokes: Vec<Paint>,
    },
    SetVisible {
        id: NodeId,
        visible: bool,
    },
    Rename {
        id: NodeId,
        name: String,
    },
    /// Insert under `parent`, or at the top of the page without one.
    Insert {
        #[serde(default)]
        parent: Option<NodeId>,
        node: MemoryNode,
    },
    Remove {
        id: NodeId,
    },
    BindVariable {
        id: NodeId,
        property: PaintProperty,
        index: usize,
        #[serde(default)]
        binding: Option<BoundVariable>,
    },
    Rescan,
    ClearScope,
    IncludeVectors {
        enabled: bool,
    },
}

impl Step {
    /// Apply the step to the document and return the input the session
    /// should see for it.
    pub fn apply(self, doc: &SharedDocument) -> Result<SessionInput, DocumentError> {
        let changes = match self {
            Step::Select { ids } => {
                doc.edit(|doc| doc.set_selection(ids));
                return Ok(HostEvent::SelectionChanged.into());
            }
            Step::SetFills { id, fills } => vec![doc.edit(|doc| doc.set_fills(&id, fills))?],
            Step::SetStrokes { id, strokes } => {
                vec![doc.edit(|doc| doc.set_strokes(&id, strokes))?]
            }
            Step::SetVisible { id, visible } => {
                vec![doc.edit(|doc| doc.set_visible(&id, visible))?]
            }
            Step::Rename { id, name } => vec![doc.edit(|doc| doc.rename(&id, name))?],
            Step::Insert {
                parent: Some(parent),
                node,
            } => doc.edit(|doc| doc.insert(&parent, node))?,
            Step::Insert { parent: None, node } => doc.edit(|doc| doc.add_root(node))?,
            Step::Remove { id } => doc.edit(|doc| doc.remove(&id))?,
            Step::BindVariable {
                id,
                property,
                index,
                binding,
            } => vec![doc.edit(|doc| doc.bind_variable(&id, property, index, binding))?],
            Step::Rescan => return Ok(Command::RequestRescan.into()),
            Step::ClearScope => return Ok(Command::ClearScope.into()),
            Step::IncludeVectors { enabled } => {
                return Ok(Command::SetIncludeVectors(enabled).into());
            }
        };
        Ok(HostEvent::DocumentChanged(changes).into())
    }
}

/// Load a script: a JSON array of steps.
pub fn load_script(path: &Path) -> Result<Vec<Step>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid script {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swatchscan_core::{MemoryDocument, NodeType};

    #[test]
    fn test_parse_script() {
        let steps: Vec<Step> = serde_json::from_str(
            r#"[
                {"op": "select", "ids": ["1:2"]},
                {"op": "set-visible", "id": "1:2", "visible": false},
                {"op": "include-vectors", "enabled": true},
                {"op": "rescan"}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 4);
        assert!(matches!(&steps[1], Step::SetVisible { visible: false, .. }));
        assert!(matches!(steps[3], Step::Rescan));
    }

    #[test]
    fn test_apply_reports_changes() {
        let mut doc = MemoryDocument::new();
        doc.add_root(MemoryNode::new("1:1", "Frame", NodeType::Frame))
            .unwrap();
        let doc = SharedDocument::new(doc);

        let input = Step::Insert {
            parent: Some("1:1".into()),
            node: MemoryNode::new("1:2", "Box", NodeType::Rectangle),
        }
        .apply(&doc)
        .unwrap();
        assert!(matches!(
            input,
            SessionInput::Host(HostEvent::DocumentChanged(ref changes)) if changes.len() == 1
        ));

        let missing = Step::Remove { id: "9:9".into() }.apply(&doc);
        assert!(missing.is_err());
    }
}

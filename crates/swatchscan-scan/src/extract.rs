//! Per-node color extraction.

use swatchscan_core::{
    ColorEntry, DocumentError, DocumentTree, NodeRef, NodeSummary, Paint, PaintKind,
    PaintProperty, PropertyType, layer_path,
};

use crate::resolver::TokenResolver;

/// Extract every color reference of a single node.
///
/// Entries come back in slot order: fills, then strokes, then text runs.
/// Any failure rejects the whole node, so a caller never folds a partial
/// extraction.
pub fn extract_node(
    doc: &dyn DocumentTree,
    resolver: &TokenResolver<'_>,
    node: &NodeSummary,
) -> Result<Vec<ColorEntry>, DocumentError> {
    let path = layer_path(doc, node)?;
    let mut entries = Vec::new();

    let fills = doc.fills_of(&node.id)?;
    extract_paints(doc, resolver, node, &path, PaintProperty::Fills, &fills, &mut entries)?;

    let strokes = doc.strokes_of(&node.id)?;
    extract_paints(doc, resolver, node, &path, PaintProperty::Strokes, &strokes, &mut entries)?;

    if node.node_type.is_text() {
        for segment in doc.text_segments_of(&node.id)? {
            for paint in segment.fills.iter().filter(|paint| paint.visible) {
                if paint.kind != PaintKind::Solid {
                    continue;
                }
                let rgba = paint.solid_rgba(&node.id)?;
                let node_ref = NodeRef::new(node, path.as_str(), PropertyType::Text, segment.start);
                entries.push(ColorEntry::solid(rgba, None, node_ref));
            }
        }
    }

    Ok(entries)
}

fn extract_paints(
    doc: &dyn DocumentTree,
    resolver: &TokenResolver<'_>,
    node: &NodeSummary,
    path: &str,
    property: PaintProperty,
    paints: &[Paint],
    entries: &mut Vec<ColorEntry>,
) -> Result<(), DocumentError> {
    let property_type = match property {
        PaintProperty::Fills => PropertyType::Fill,
        PaintProperty::Strokes => PropertyType::Stroke,
    };

    for (index, paint) in paints.iter().enumerate() {
        if !paint.visible {
            continue;
        }
        let node_ref = NodeRef::new(node, path, property_type, index);

        if paint.kind == PaintKind::Solid {
            let rgba = paint.solid_rgba(&node.id)?;
            let token = resolver.resolve_slot(doc, &node.id, property, index);
            entries.push(ColorEntry::solid(rgba, token, node_ref));
        } else if let Some(gradient) = paint.gradient_data(&node.id)? {
            entries.push(ColorEntry::gradient(gradient, node_ref));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swatchscan_core::{
        ColorKind, GradientStop, MemoryDocument, MemoryNode, NodeId, NodeType, Rgba, TextSegment,
        Variable, VariableAlias, VariableCollection,
    };

    fn summary(doc: &MemoryDocument, id: &str) -> NodeSummary {
        doc.resolve_node(&NodeId::from(id)).unwrap()
    }

    #[test]
    fn test_fills_strokes_and_gradients() {
        let mut doc = MemoryDocument::new();
        doc.add_variable(Variable {
            id: "v1".into(),
            name: "brand/red".into(),
            variable_collection_id: "c1".into(),
            remote: false,
        });
        doc.add_collection(VariableCollection {
            id: "c1".into(),
            name: "Brand".into(),
            key: String::new(),
            remote: false,
        });
        doc.add_root(
            MemoryNode::new("frame", "Frame", NodeType::Frame).with_child(
                MemoryNode::new("rect", "Rect", NodeType::Rectangle)
                    .with_fill(Paint::solid(Rgba::opaque(1.0, 0.0, 0.0)))
                    .with_fill(Paint::solid(Rgba::opaque(0.0, 1.0, 0.0)).hidden())
                    .with_fill(Paint::gradient(
                        PaintKind::GradientLinear,
                        vec![
                            GradientStop::new(Rgba::opaque(1.0, 1.0, 1.0), 0.0),
                            GradientStop::new(Rgba::opaque(0.0, 0.0, 0.0), 1.0),
                        ],
                    ))
                    .with_stroke(Paint::solid(Rgba::opaque(0.0, 0.0, 1.0)))
                    .with_bound_variable(PaintProperty::Strokes, 0, VariableAlias::new("v1")),
            ),
        )
        .unwrap();

        let resolver = TokenResolver::new(&doc);
        let entries = extract_node(&doc, &resolver, &summary(&doc, "rect")).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].dedup_key, "FF0000FF");
        assert_eq!(entries[0].nodes[0].layer_path, "Frame > Rect");
        assert_eq!(entries[1].kind, ColorKind::Gradient);
        assert_eq!(entries[1].nodes[0].property_index, 2);
        assert_eq!(entries[2].dedup_key, "0000FFFF|brand/red");
        assert_eq!(entries[2].nodes[0].property_type, PropertyType::Stroke);
    }

    #[test]
    fn test_text_runs_use_start_offset() {
        let mut doc = MemoryDocument::new();
        doc.add_root(
            MemoryNode::new("t", "Label", NodeType::Text)
                .with_text_segment(TextSegment {
                    start: 0,
                    end: 5,
                    fills: vec![Paint::solid(Rgba::opaque(1.0, 0.0, 0.0))],
                })
                .with_text_segment(TextSegment {
                    start: 5,
                    end: 9,
                    fills: vec![Paint::solid(Rgba::opaque(0.0, 0.0, 1.0))],
                }),
        )
        .unwrap();

        let resolver = TokenResolver::new(&doc);
        let entries = extract_node(&doc, &resolver, &summary(&doc, "t")).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.nodes[0].property_type == PropertyType::Text));
        assert_eq!(entries[1].nodes[0].property_index, 5);
        assert!(entries.iter().all(|e| !e.is_token_bound));
    }

    #[test]
    fn test_malformed_paint_rejects_node() {
        let mut broken = Paint::solid(Rgba::opaque(1.0, 0.0, 0.0));
        broken.color = None;

        let mut doc = MemoryDocument::new();
        doc.add_root(
            MemoryNode::new("n", "N", NodeType::Rectangle)
                .with_fill(Paint::solid(Rgba::opaque(0.0, 0.0, 0.0)))
                .with_stroke(broken),
        )
        .unwrap();

        let resolver = TokenResolver::new(&doc);
        let err = extract_node(&doc, &resolver, &summary(&doc, "n")).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedPaint { .. }));
    }
}

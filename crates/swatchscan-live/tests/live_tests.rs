use std::mem;
use std::time::Duration;

use swatchscan_core::{
    ColorInventory, DocumentTree, MemoryDocument, MemoryNode, NodeId, NodeType, Paint,
    PaintProperty, Rgba, ScanConfig, SharedDocument, Variable, VariableAlias, VariableCollection,
};
use swatchscan_live::{
    Command, HostEvent, LiveSession, Notification, SCOPE_DELETED_NOTICE, Scope, SessionInput,
};
use swatchscan_scan::{ColorScanner, NoopControl};
use tokio::sync::mpsc;
use tokio::time::advance;

type Session = LiveSession<SharedDocument, Vec<Notification>>;

fn paint(r: f64, g: f64, b: f64) -> Paint {
    Paint::solid(Rgba::opaque(r, g, b))
}

/// Two frames of rectangles plus a loose vector on the page.
fn document() -> SharedDocument {
    let mut doc = MemoryDocument::new();
    // Same variable name in two collections.
    for (variable, collection, name) in [("v-red", "c-brand", "Brand"), ("v-alt", "c-alt", "Alt")] {
        doc.add_variable(Variable {
            id: variable.into(),
            name: "brand/red".into(),
            variable_collection_id: collection.into(),
            remote: false,
        });
        doc.add_collection(VariableCollection {
            id: collection.into(),
            name: name.into(),
            key: name.to_lowercase(),
            remote: false,
        });
    }

    let mut cards = MemoryNode::new("cards", "Cards", NodeType::Frame);
    for i in 0..3 {
        cards = cards.with_child(
            MemoryNode::new(format!("card{i}"), format!("Card {i}"), NodeType::Rectangle)
                .with_fill(paint(1.0, 0.0, 0.0))
                .with_stroke(paint(0.0, 0.0, 0.0)),
        );
    }
    doc.add_root(cards).unwrap();
    doc.add_root(
        MemoryNode::new("footer", "Footer", NodeType::Frame)
            .with_child(
                MemoryNode::new("link", "Link", NodeType::Rectangle)
                    .with_fill(paint(0.0, 0.0, 1.0)),
            ),
    )
    .unwrap();
    doc.add_root(
        MemoryNode::new("icon", "Icon", NodeType::Vector).with_fill(paint(0.0, 1.0, 0.0)),
    )
    .unwrap();
    SharedDocument::new(doc)
}

fn start(doc: &SharedDocument, config: ScanConfig) -> Session {
    let mut session = LiveSession::new(doc.clone(), Vec::new(), config);
    session.start();
    session
}

fn take(session: &mut Session) -> Vec<Notification> {
    mem::take(session.publisher_mut())
}

fn completions(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.is_scan_complete()).count()
}

fn select(doc: &SharedDocument, ids: &[&str]) {
    doc.edit(|doc| doc.set_selection(ids.iter().map(|id| NodeId::from(*id)).collect()));
}

type NodeRow = (String, String, String, usize);
type TokenRow = [Option<String>; 4];

/// Inventory content with node references sorted, for order-insensitive
/// comparison.
fn shape(inventory: &ColorInventory) -> Vec<(String, usize, TokenRow, Vec<NodeRow>)> {
    let mut rows: Vec<_> = inventory
        .entries()
        .map(|entry| {
            let mut nodes: Vec<_> = entry
                .nodes
                .iter()
                .map(|node| {
                    (
                        node.node_id.to_string(),
                        node.layer_path.clone(),
                        node.property_type.to_string(),
                        node.property_index,
                    )
                })
                .collect();
            nodes.sort();
            let token = [
                entry.token_name.clone(),
                entry.token_collection.clone(),
                entry.library_name.clone(),
                entry.style_id.as_ref().map(|id| id.to_string()),
            ];
            (entry.dedup_key.clone(), entry.usage_count, token, nodes)
        })
        .collect();
    rows.sort();
    rows
}

fn full_scan_shape(doc: &SharedDocument) -> Vec<(String, usize, TokenRow, Vec<NodeRow>)> {
    let full = ColorScanner::default()
        .scan(doc, doc, &mut NoopControl)
        .unwrap();
    shape(&full.inventory)
}

#[test]
fn test_startup_scans_current_selection() {
    let doc = document();
    select(&doc, &["cards"]);
    let mut session = start(&doc, ScanConfig::default());
    let published = take(&mut session);

    assert_eq!(completions(&published), 1);
    assert!(matches!(
        published.last(),
        Some(Notification::ScopeChanged { context })
            if context.scope_node_name.as_deref() == Some("Cards")
    ));
    assert_eq!(session.scope(), &Scope::Selection(vec![NodeId::from("cards")]));

    let inventory = session.orchestrator().inventory();
    assert_eq!(inventory.get("FF0000FF").unwrap().usage_count, 3);
    assert!(inventory.get("0000FFFF").is_none());
}

#[test]
fn test_page_scan_without_selection_skips_vectors() {
    let doc = document();
    let mut session = start(&doc, ScanConfig::default());
    assert_eq!(session.scope(), &Scope::NoScope);
    assert!(session.orchestrator().inventory().get("0000FFFF").is_some());
    assert!(session.orchestrator().inventory().get("00FF00FF").is_none());

    session.handle(Command::SetIncludeVectors(true));
    assert_eq!(completions(&take(&mut session)), 2);
    assert!(session.orchestrator().inventory().get("00FF00FF").is_some());
}

#[test]
fn test_deleting_scope_root_clears_scope() {
    let doc = document();
    select(&doc, &["card1"]);
    let mut session = start(&doc, ScanConfig::default());
    take(&mut session);

    let changes = doc.edit(|doc| doc.remove(&NodeId::from("card1"))).unwrap();
    session.handle(HostEvent::DocumentChanged(changes));
    session.flush();

    let published = take(&mut session);
    assert_eq!(published.len(), 3);
    match &published[0] {
        Notification::ScanComplete { colors, context } => {
            assert!(colors.is_empty());
            assert!(!context.is_selection());
        }
        other => panic!("expected empty result, got {other:?}"),
    }
    assert!(matches!(
        &published[1],
        Notification::ScopeChanged { context } if !context.is_selection()
    ));
    assert_eq!(
        published[2],
        Notification::Notice {
            message: SCOPE_DELETED_NOTICE.to_string()
        }
    );
    assert_eq!(session.scope(), &Scope::NoScope);
    assert!(doc.read().node(&NodeId::from("card0")).is_some());
}

#[test]
fn test_incremental_updates_match_full_scan() {
    let doc = document();
    select(&doc, &["cards"]);
    let mut session = start(&doc, ScanConfig::default());
    let generation = session.orchestrator().generation().current();

    let changes = doc.edit(|doc| {
        vec![
            doc.set_fills(&NodeId::from("card0"), vec![paint(0.0, 0.0, 1.0)]).unwrap(),
            doc.bind_variable(
                &NodeId::from("card1"),
                PaintProperty::Fills,
                0,
                Some(VariableAlias::new("v-red").into()),
            )
            .unwrap(),
            doc.set_visible(&NodeId::from("card2"), false).unwrap(),
            doc.rename(&NodeId::from("cards"), "Card Grid").unwrap(),
        ]
    });
    session.handle(HostEvent::DocumentChanged(changes));
    session.flush();

    assert_eq!(completions(&take(&mut session)), 1);
    // Incremental updates never start a new generation.
    assert_eq!(session.orchestrator().generation().current(), generation);

    let live = session.orchestrator().inventory();
    assert!(live.is_consistent());
    assert_eq!(shape(live), full_scan_shape(&doc));
    assert!(live.get("FF0000FF|brand/red").unwrap().is_token_bound);
    assert_eq!(
        live.get("0000FFFF").unwrap().nodes[0].layer_path,
        "Card Grid > Card 0"
    );
}

#[test]
fn test_deleting_scope_ancestor_clears_scope() {
    let doc = document();
    select(&doc, &["card1"]);
    let mut session = start(&doc, ScanConfig::default());
    take(&mut session);

    let changes = doc.edit(|doc| doc.remove(&NodeId::from("cards"))).unwrap();
    assert_eq!(changes.len(), 1);
    session.handle(HostEvent::DocumentChanged(changes));
    session.flush();

    let published = take(&mut session);
    assert!(matches!(
        published.first(),
        Some(Notification::ScanComplete { colors, .. }) if colors.is_empty()
    ));
    assert_eq!(
        published.last(),
        Some(&Notification::Notice {
            message: SCOPE_DELETED_NOTICE.to_string()
        })
    );
    assert_eq!(session.scope(), &Scope::NoScope);
    assert!(session.orchestrator().inventory().is_empty());
}

#[test]
fn test_incremental_update_tracks_shared_token_name() {
    let doc = document();
    select(&doc, &["cards"]);
    doc.edit(|doc| {
        for (id, variable) in [("card0", "v-alt"), ("card1", "v-red")] {
            doc.bind_variable(
                &NodeId::from(id),
                PaintProperty::Fills,
                0,
                Some(VariableAlias::new(variable).into()),
            )
            .unwrap();
        }
    });
    let mut session = start(&doc, ScanConfig::default());
    let row = |session: &Session| {
        session
            .orchestrator()
            .inventory()
            .get("FF0000FF|brand/red")
            .and_then(|entry| entry.token_collection.clone())
    };
    assert_eq!(row(&session).as_deref(), Some("Alt"));

    let change = doc
        .edit(|doc| doc.set_fills(&NodeId::from("card0"), vec![paint(0.0, 0.0, 1.0)]))
        .unwrap();
    session.handle(HostEvent::DocumentChanged(vec![change]));
    session.flush();

    assert_eq!(row(&session).as_deref(), Some("Brand"));
    assert_eq!(shape(session.orchestrator().inventory()), full_scan_shape(&doc));
}

#[test]
fn test_unhiding_a_node_brings_it_back() {
    let doc = document();
    select(&doc, &["cards"]);
    let mut session = start(&doc, ScanConfig::default());

    for visible in [false, true] {
        let change = doc
            .edit(|doc| doc.set_visible(&NodeId::from("card2"), visible))
            .unwrap();
        session.handle(HostEvent::DocumentChanged(vec![change]));
        session.flush();
    }

    let inventory = session.orchestrator().inventory();
    assert_eq!(inventory.get("FF0000FF").unwrap().usage_count, 3);
    assert_eq!(inventory.get("000000FF").unwrap().usage_count, 3);
}

#[test]
fn test_structural_changes_rescan() {
    let doc = document();
    select(&doc, &["cards"]);
    let mut session = start(&doc, ScanConfig::default());
    let generation = session.orchestrator().generation().current();

    let changes = doc
        .edit(|doc| {
            doc.insert(
                &NodeId::from("cards"),
                MemoryNode::new("badge", "Badge", NodeType::Ellipse)
                    .with_fill(paint(1.0, 1.0, 0.0)),
            )
        })
        .unwrap();
    session.handle(HostEvent::DocumentChanged(changes));
    session.flush();
    assert_eq!(session.orchestrator().generation().current(), generation + 1);
    // Ellipses are vector shapes and stay filtered.
    assert!(session.orchestrator().inventory().get("FFFF00FF").is_none());

    let changes = doc.edit(|doc| doc.remove(&NodeId::from("card0"))).unwrap();
    session.handle(HostEvent::DocumentChanged(changes));
    session.flush();
    assert_eq!(session.orchestrator().generation().current(), generation + 2);
    assert_eq!(
        session.orchestrator().inventory().get("FF0000FF").unwrap().usage_count,
        2
    );
}

#[test]
fn test_changes_without_scope_are_ignored() {
    let doc = document();
    let mut session = start(&doc, ScanConfig::default());
    take(&mut session);

    let change = doc
        .edit(|doc| doc.set_fills(&NodeId::from("link"), vec![paint(1.0, 1.0, 1.0)]))
        .unwrap();
    session.handle(HostEvent::DocumentChanged(vec![change]));
    session.flush();

    assert!(take(&mut session).is_empty());
}

#[test]
fn test_clear_scope_command() {
    let doc = document();
    select(&doc, &["footer"]);
    let mut session = start(&doc, ScanConfig::default());
    take(&mut session);

    session.handle(Command::ClearScope);
    let published = take(&mut session);

    assert!(doc.current_selection().is_empty());
    assert_eq!(completions(&published), 1);
    assert!(matches!(
        published.last(),
        Some(Notification::ScopeChanged { context }) if !context.is_selection()
    ));
    assert_eq!(
        session.orchestrator().inventory().get("FF0000FF").unwrap().usage_count,
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_selection_burst_settles_once() {
    let doc = document();
    let mut session = start(&doc, ScanConfig::default());
    take(&mut session);

    select(&doc, &["cards"]);
    session.handle(HostEvent::SelectionChanged);
    advance(Duration::from_millis(200)).await;
    select(&doc, &["footer"]);
    session.handle(HostEvent::SelectionChanged);

    advance(Duration::from_millis(399)).await;
    session.poll();
    assert!(take(&mut session).is_empty());

    advance(Duration::from_millis(1)).await;
    session.poll();
    let published = take(&mut session);
    assert_eq!(completions(&published), 1);
    assert!(matches!(
        &published[0],
        Notification::ScopeChanged { context }
            if context.scope_node_name.as_deref() == Some("Footer")
    ));
    assert_eq!(session.orchestrator().inventory().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_change_batches_accumulate_within_window() {
    let doc = document();
    select(&doc, &["cards"]);
    let mut session = start(&doc, ScanConfig::default());
    take(&mut session);

    for (delay, id) in [(0, "card0"), (100, "card1")] {
        advance(Duration::from_millis(delay)).await;
        let change = doc
            .edit(|doc| doc.set_fills(&NodeId::from(id), vec![paint(0.0, 1.0, 1.0)]))
            .unwrap();
        session.handle(HostEvent::DocumentChanged(vec![change]));
    }

    advance(Duration::from_millis(299)).await;
    session.poll();
    assert!(take(&mut session).is_empty());

    advance(Duration::from_millis(1)).await;
    session.poll();
    assert_eq!(completions(&take(&mut session)), 1);
    assert_eq!(
        session.orchestrator().inventory().get("00FFFFFF").unwrap().usage_count,
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_superseded_scan_never_publishes() {
    let doc = document();
    let config = ScanConfig::builder().yield_interval(2u64).build().unwrap();
    let session: Session = LiveSession::new(doc.clone(), Vec::new(), config);

    let (tx, inbox) = mpsc::unbounded_channel::<SessionInput>();
    tx.send(Command::SetIncludeVectors(true).into()).unwrap();
    drop(tx);

    let (_, published) = session.run(inbox).await;

    assert_eq!(completions(&published), 1);
    match published.iter().find(|n| n.is_scan_complete()) {
        Some(Notification::ScanComplete { colors, .. }) => {
            assert!(colors.iter().any(|entry| entry.dedup_key == "00FF00FF"));
        }
        other => panic!("expected a completed scan, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_fires_debounced_work() {
    let doc = document();
    select(&doc, &["cards"]);
    let session: Session = LiveSession::new(doc.clone(), Vec::new(), ScanConfig::default());

    let (tx, inbox) = mpsc::unbounded_channel::<SessionInput>();
    let editor = doc.clone();
    let driver = async move {
        tokio::task::yield_now().await;
        let change = editor
            .edit(|doc| doc.set_fills(&NodeId::from("card0"), vec![paint(1.0, 1.0, 1.0)]))
            .unwrap();
        tx.send(HostEvent::DocumentChanged(vec![change]).into()).unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        drop(tx);
    };
    let ((_, published), ()) = tokio::join!(session.run(inbox), driver);

    assert_eq!(completions(&published), 2);
    match published.iter().rev().find(|n| n.is_scan_complete()) {
        Some(Notification::ScanComplete { colors, .. }) => {
            assert!(colors.iter().any(|entry| entry.dedup_key == "FFFFFFFF"));
        }
        other => panic!("expected a completed scan, got {other:?}"),
    }
}

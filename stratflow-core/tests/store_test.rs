//! Virtual position store tests through the editor path: recompute from
//! entry nodes, modification merges, and orphan tolerance.

use std::time::{Duration, Instant};
use stratflow_core::graph::{
    GraphEditor, NodeKind, NodePatch, OptionDetails, OptionPatch, OptionType, OrderType,
    PositionPatch, RawPosition, StrategyGraph,
};
use stratflow_core::positions::VirtualPositionStore;

fn editor() -> GraphEditor {
    GraphEditor::with_graph_and_quiet_period(StrategyGraph::new(), Duration::from_millis(300))
}

#[test]
fn recompute_flattens_and_defaults_entry_payloads() {
    let mut ed = editor();
    let now = Instant::now();
    let e1 = ed.add_node(NodeKind::Entry, None, now).unwrap();
    let e2 = ed.add_node(NodeKind::Entry, None, now).unwrap();
    ed.update_node_data(e1, NodePatch::positions(vec![RawPosition::buy(1)]), now)
        .unwrap();
    ed.update_node_data(e2, NodePatch::positions(vec![RawPosition::buy(2)]), now)
        .unwrap();

    let mut store = VirtualPositionStore::new();
    store.recompute(ed.graph());

    assert_eq!(store.len(), 2);
    for p in store.positions() {
        assert_eq!(p.order_type, OrderType::Market);
        assert_eq!(p.lots, 1);
    }
    assert_eq!(store.get(1).unwrap().source_node, e1);
    assert_eq!(store.get(2).unwrap().source_node, e2);
}

#[test]
fn modify_nodes_merge_into_positions_on_recompute() {
    let mut ed = editor();
    let now = Instant::now();
    let entry = ed.add_node(NodeKind::Entry, None, now).unwrap();
    let mut raw = RawPosition::buy(1);
    raw.option_details = Some(OptionDetails {
        option_type: Some(OptionType::PE),
        strike: Some("ATM".to_string()),
        expiry: Some("weekly".to_string()),
    });
    ed.update_node_data(entry, NodePatch::positions(vec![raw]), now)
        .unwrap();

    let modify = ed.add_node(NodeKind::Modify, None, now).unwrap();
    ed.record_modification(
        modify,
        1,
        PositionPatch {
            lots: Some(4),
            option_details: Some(OptionPatch {
                strike: Some("ATM+100".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        now,
    )
    .unwrap();

    let mut store = VirtualPositionStore::new();
    store.recompute(ed.graph());

    let p = store.get(1).unwrap();
    assert_eq!(p.lots, 4);
    let details = p.option_details.clone().unwrap();
    // The partial option patch replaced the strike and kept the rest.
    assert_eq!(details.strike.as_deref(), Some("ATM+100"));
    assert_eq!(details.option_type, Some(OptionType::PE));
    assert_eq!(details.expiry.as_deref(), Some("weekly"));
}

#[test]
fn repeated_modifications_merge_field_by_field_on_the_node() {
    let mut ed = editor();
    let now = Instant::now();
    let modify = ed.add_node(NodeKind::Modify, None, now).unwrap();

    ed.record_modification(
        modify,
        1,
        PositionPatch {
            lots: Some(2),
            limit_price: Some(99.5),
            ..Default::default()
        },
        now,
    )
    .unwrap();
    ed.record_modification(
        modify,
        1,
        PositionPatch {
            lots: Some(6),
            ..Default::default()
        },
        now,
    )
    .unwrap();

    let node = ed.graph().node(modify).unwrap();
    match &node.data {
        stratflow_core::graph::NodeData::Modify { modifications, .. } => {
            let patch = modifications.get(&1).unwrap();
            assert_eq!(patch.lots, Some(6));
            assert_eq!(patch.limit_price, Some(99.5));
        }
        _ => panic!("expected a modify node"),
    }
}

#[test]
fn orphaned_modifications_survive_entry_deletion() {
    let mut ed = editor();
    let now = Instant::now();
    let entry = ed.add_node(NodeKind::Entry, None, now).unwrap();
    ed.update_node_data(entry, NodePatch::positions(vec![RawPosition::buy(1)]), now)
        .unwrap();
    let modify = ed.add_node(NodeKind::Modify, None, now).unwrap();
    ed.record_modification(
        modify,
        1,
        PositionPatch {
            lots: Some(3),
            ..Default::default()
        },
        now,
    )
    .unwrap();

    // Deleting the entry node does not cascade into the modify node's map.
    ed.delete_node(entry, now).unwrap();
    let node = ed.graph().node(modify).unwrap();
    match &node.data {
        stratflow_core::graph::NodeData::Modify { modifications, .. } => {
            assert!(modifications.contains_key(&1));
        }
        _ => panic!("expected a modify node"),
    }

    // The orphaned patch is tolerated read-side: recompute just skips it.
    let mut store = VirtualPositionStore::new();
    store.recompute(ed.graph());
    assert!(store.is_empty());
}

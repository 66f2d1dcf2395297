mod common;

use common::{catalog, init};
use patchbay::graph::Graph;
use patchbay::types::{NodeId, Position, CONTROL_PIN};
use serde_json::Value;

fn graph() -> Graph {
    init();
    Graph::new(catalog())
}

/// Constant → Add.a, Constant → Add.b, Add.sum → Collect.value, plus two
/// gates sequenced into a third.
fn sample_graph() -> Graph {
    let mut g = graph();
    let c1 = g.spawn_node("Constant", None, Position(0.0, 0.0), true).unwrap();
    let c2 = g.spawn_node("Constant", None, Position(0.0, 90.0), true).unwrap();
    let add = g.spawn_node("Add", None, Position(120.0, 45.0), true).unwrap();
    let sink = g.spawn_node("Collect", None, Position(240.0, 45.0), true).unwrap();
    g.connect(c1, "value", add, "a").unwrap();
    g.connect(c2, "value", add, "b").unwrap();
    g.connect(add, "sum", sink, "value").unwrap();

    let g1 = g.spawn_node("Gate", None, Position(0.0, 200.0), true).unwrap();
    let g2 = g.spawn_node("Gate", None, Position(0.0, 260.0), true).unwrap();
    let g3 = g.spawn_node("Gate", None, Position(120.0, 230.0), true).unwrap();
    g.connect(g1, "after", g3, CONTROL_PIN).unwrap();
    g.connect(g2, "after", g3, CONTROL_PIN).unwrap();
    g
}

fn parse(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

#[test]
fn save_state_shape() {
    let g = sample_graph();
    let state = parse(&g.to_json().unwrap());
    let map = state.as_object().unwrap();
    assert_eq!(map.len(), 7);

    // Keys are stringified node IDs.
    for key in ["0", "1", "2", "3", "4", "5", "6"] {
        assert!(map.contains_key(key), "missing node key {key}");
    }

    let add = &map["2"];
    assert_eq!(add["class"], "Add");
    assert_eq!(add["position"], serde_json::json!([120.0, 45.0]));

    // Pin entries are [name, type, value] triples.
    let inputs = add["inputs"].as_array().unwrap();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0][0], "a");
    assert_eq!(inputs[0][1], "float");
    assert!(inputs[0][2].is_null());

    // Input connections name the source pin in canonical string form.
    assert_eq!(add["inputConnections"]["a"], "0:Ovalue");
    assert_eq!(add["inputConnections"]["b"], "1:Ovalue");
    assert_eq!(add["outputConnections"]["sum"], serde_json::json!(["3:Ivalue"]));

    // The Constant's default shows up as the serialized input value.
    let constant = &map["0"];
    let value_pin = constant["inputs"].as_array().unwrap();
    assert_eq!(value_pin[0][2], serde_json::json!(1.0));
}

#[test]
fn reload_into_fresh_graph_is_isomorphic() {
    let original = sample_graph();
    let state: rustc_hash::FxHashMap<String, patchbay::node::NodeRecord> =
        serde_json::from_str(&original.to_json().unwrap()).unwrap();

    let mut restored = graph();
    let id_map = restored.load_state(&state).unwrap();

    // A fresh graph re-assigns the same dense IDs in sorted order.
    assert_eq!(id_map.len(), 7);
    for (old, new) in &id_map {
        assert_eq!(old, new);
    }
    assert_eq!(
        parse(&restored.to_json().unwrap()),
        parse(&original.to_json().unwrap())
    );
}

#[test]
fn load_remaps_ids_into_occupied_graph() {
    let original = sample_graph();
    let state: rustc_hash::FxHashMap<String, patchbay::node::NodeRecord> =
        serde_json::from_str(&original.to_json().unwrap()).unwrap();

    let mut target = graph();
    let existing = target.spawn_node("Constant", None, Position::ORIGIN, true).unwrap();
    let id_map = target.load_state(&state).unwrap();

    assert_eq!(existing, NodeId(0));
    // Old IDs shift past the occupied slot, preserving relative order.
    for (old, new) in &id_map {
        assert_eq!(new.0, old.0 + 1);
    }
    assert_eq!(target.node_count(), 8);

    // Topology survived the remap: the Add node has both data inputs.
    let new_add = id_map[&NodeId(2)];
    assert_eq!(target.connections_to(new_add).unwrap().len(), 2);
    assert_eq!(target.node(new_add).unwrap().class_name(), "Add");
}

#[test]
fn control_edges_survive_reload() {
    let original = sample_graph();
    let state: rustc_hash::FxHashMap<String, patchbay::node::NodeRecord> =
        serde_json::from_str(&original.to_json().unwrap()).unwrap();

    let mut restored = graph();
    let id_map = restored.load_state(&state).unwrap();

    // Both sequencing edges into the third gate are back.
    let gate = id_map[&NodeId(6)];
    assert_eq!(restored.connections_to(gate).unwrap().len(), 2);
}

#[test]
fn save_and_load_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.patch");

    let original = sample_graph();
    original.save(&path).unwrap();

    let mut restored = graph();
    restored.load(&path).unwrap();
    assert_eq!(
        parse(&restored.to_json().unwrap()),
        parse(&original.to_json().unwrap())
    );
}

#[test]
fn malformed_save_state_is_rejected() {
    let mut g = graph();
    let state: rustc_hash::FxHashMap<String, patchbay::node::NodeRecord> =
        serde_json::from_str(r#"{"zero": {"class": "Constant", "position": [0.0, 0.0], "inputs": [], "outputs": [], "inputConnections": {}, "outputConnections": {}}}"#)
            .unwrap();
    assert!(g.load_state(&state).is_err());
}

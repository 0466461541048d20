//! Merge laws and expansion state machines for the client graph store.

use gamescape_client::GraphState;
use gamescape_common::{
    Edge, GraphMetadata, GraphResponse, Node, NodeData, NodeState, Pin, PinMetadata, PinState,
    PinSummary, Position, PropertyMap,
};

fn library_pin() -> Pin {
    let mut parameters = PropertyMap::new();
    parameters.insert("player".into(), "p-1".into());
    parameters.insert("library_source".into(), "steam".into());
    Pin::expandable(
        "library:library",
        "steam",
        "Steam Library",
        PinSummary::text("42 games").with_count(42),
        "/api/library/select",
        PinMetadata {
            target_node_type: "library".into(),
            target_node_id: None,
            origin_node_id: Some("player:p-1".into()),
            api_endpoint: None,
            parameters,
        },
    )
}

fn player_node(x: f64, y: f64) -> Node {
    Node {
        id: "player:p-1".into(),
        node_type: "default".into(),
        position: Position { x, y },
        data: NodeData {
            label: "gabe".into(),
            node_type: "player".into(),
            properties: PropertyMap::new(),
            pins: vec![library_pin()],
            state: NodeState::Loaded,
        },
    }
}

fn response(query_id: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> GraphResponse {
    GraphResponse {
        nodes,
        edges,
        metadata: GraphMetadata {
            query_type: "select-player".into(),
            query_id: query_id.into(),
            timestamp: chrono::Utc::now(),
            context: PropertyMap::new(),
        },
    }
}

// ---------------------------------------------------------------------------
// Merge laws
// ---------------------------------------------------------------------------

#[test]
fn merge_is_idempotent_on_nodes_and_edges() {
    let fragment = response(
        "q-1",
        vec![player_node(0.0, 0.0)],
        vec![Edge::connect("player:p-1", "library:l-1", "owns", "Owns Library")],
    );

    let once = GraphState::new().merge(&fragment);
    let twice = once.merge(&fragment);

    assert_eq!(once.nodes.len(), twice.nodes.len());
    assert_eq!(once.edges.len(), twice.edges.len());
    assert_eq!(once.metadata.len(), twice.metadata.len());
}

#[test]
fn merge_preserves_existing_canvas_position() {
    let state = GraphState::new().merge(&response("q-1", vec![player_node(10.0, 20.0)], vec![]));
    // The user dragged the node somewhere.
    let state = state.reposition("player:p-1", 300.0, -50.0);

    // A later fragment re-delivers the node at its server default position.
    let state = state.merge(&response("q-2", vec![player_node(0.0, 0.0)], vec![]));

    let node = state.node("player:p-1").unwrap();
    assert_eq!(node.position.x, 300.0);
    assert_eq!(node.position.y, -50.0);
}

#[test]
fn merge_replaces_non_position_fields_with_incoming() {
    let state = GraphState::new().merge(&response("q-1", vec![player_node(0.0, 0.0)], vec![]));

    let mut updated = player_node(99.0, 99.0);
    updated.data.label = "gaben".into();
    let state = state.merge(&response("q-2", vec![updated], vec![]));

    let node = state.node("player:p-1").unwrap();
    assert_eq!(node.data.label, "gaben");
    // Position kept from the existing node, not the incoming one.
    assert_eq!(node.position.x, 0.0);
}

#[test]
fn metadata_accumulates_by_query_id() {
    let state = GraphState::new()
        .merge(&response("q-1", vec![], vec![]))
        .merge(&response("q-2", vec![], vec![]))
        .merge(&response("q-2", vec![], vec![]));
    assert_eq!(state.metadata.len(), 2);
}

#[test]
fn remove_node_drops_attached_edges() {
    let fragment = response(
        "q-1",
        vec![player_node(0.0, 0.0)],
        vec![Edge::connect("player:p-1", "library:l-1", "owns", "Owns Library")],
    );
    let state = GraphState::new().merge(&fragment).remove_node("player:p-1");
    assert!(state.nodes.is_empty());
    assert!(state.edges.is_empty());
}

// ---------------------------------------------------------------------------
// Expansion state machines
// ---------------------------------------------------------------------------

#[test]
fn expansion_walks_unexpanded_loading_expanded() {
    let state = GraphState::new().merge(&response("q-1", vec![player_node(0.0, 0.0)], vec![]));
    let pin_id = "library:library:steam";

    let loading = state.begin_expansion("player:p-1", pin_id).unwrap();
    let node = loading.node("player:p-1").unwrap();
    assert_eq!(node.data.state, NodeState::Loading);
    assert_eq!(node.data.pins[0].state, PinState::Loading);

    let fragment = response("q-2", vec![], vec![]);
    let done = loading.complete_expansion("player:p-1", pin_id, &fragment);
    let node = done.node("player:p-1").unwrap();
    assert_eq!(node.data.state, NodeState::Loaded);
    assert_eq!(node.data.pins[0].state, PinState::Expanded);
}

#[test]
fn loading_pin_ignores_further_expand_requests() {
    let state = GraphState::new().merge(&response("q-1", vec![player_node(0.0, 0.0)], vec![]));
    let pin_id = "library:library:steam";

    let loading = state.begin_expansion("player:p-1", pin_id).unwrap();
    assert!(
        loading.begin_expansion("player:p-1", pin_id).is_none(),
        "expansion of one (node, pin) must be serialized"
    );
}

#[test]
fn failed_expansion_is_retryable() {
    let state = GraphState::new().merge(&response("q-1", vec![player_node(0.0, 0.0)], vec![]));
    let pin_id = "library:library:steam";

    let loading = state.begin_expansion("player:p-1", pin_id).unwrap();
    let failed = loading.fail_expansion("player:p-1", pin_id);

    let node = failed.node("player:p-1").unwrap();
    assert_eq!(node.data.state, NodeState::Error);
    assert_eq!(node.data.pins[0].state, PinState::Unexpanded);

    // A new expansion attempt is allowed after the failure.
    assert!(failed.begin_expansion("player:p-1", pin_id).is_some());
}

#[test]
fn unknown_pins_cannot_begin_expansion() {
    let state = GraphState::new().merge(&response("q-1", vec![player_node(0.0, 0.0)], vec![]));
    assert!(state.begin_expansion("player:p-1", "nope").is_none());
    assert!(state.begin_expansion("nobody", "nope").is_none());
}

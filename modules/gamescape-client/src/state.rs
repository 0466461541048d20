//! Accumulated graph state and its pure transitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gamescape_common::{
    Edge, GraphMetadata, GraphResponse, Node, NodeState, Pin, PinBehavior, PinState,
};

/// The whole client-side graph. Every transition returns a fresh value;
/// nothing here is mutated in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub metadata: BTreeMap<String, GraphMetadata>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    fn pin<'a>(&'a self, node_id: &str, pin_id: &str) -> Option<&'a Pin> {
        self.node(node_id)?.data.pins.iter().find(|p| p.id == pin_id)
    }

    /// Merge one server fragment. Nodes union by id: an incoming node
    /// replaces everything about an existing one except its canvas
    /// position, which the user may have arranged. Edges union by id,
    /// replaced on conflict. Metadata is keyed by query id, last write
    /// wins. Merging the same fragment twice is a no-op apart from the
    /// timestamp.
    pub fn merge(&self, response: &GraphResponse) -> Self {
        let mut nodes = self.nodes.clone();
        for incoming in &response.nodes {
            match nodes.iter_mut().find(|n| n.id == incoming.id) {
                Some(existing) => {
                    let position = existing.position;
                    *existing = incoming.clone();
                    existing.position = position;
                }
                None => nodes.push(incoming.clone()),
            }
        }

        let mut edges = self.edges.clone();
        for incoming in &response.edges {
            match edges.iter_mut().find(|e| e.id == incoming.id) {
                Some(existing) => *existing = incoming.clone(),
                None => edges.push(incoming.clone()),
            }
        }

        let mut metadata = self.metadata.clone();
        metadata.insert(response.metadata.query_id.clone(), response.metadata.clone());

        Self {
            nodes,
            edges,
            metadata,
            last_updated: Some(Utc::now()),
        }
    }

    /// Move a node on the canvas.
    pub fn reposition(&self, node_id: &str, x: f64, y: f64) -> Self {
        let mut next = self.clone();
        if let Some(node) = next.nodes.iter_mut().find(|n| n.id == node_id) {
            node.position.x = x;
            node.position.y = y;
        }
        next.last_updated = Some(Utc::now());
        next
    }

    /// Drop a node and every edge touching it.
    pub fn remove_node(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        next.nodes.retain(|n| n.id != node_id);
        next.edges
            .retain(|e| e.source != node_id && e.target != node_id);
        next.last_updated = Some(Utc::now());
        next
    }

    // --- Expansion state machines ---

    /// Unexpanded → Loading, and the owning node to Loading. Returns None
    /// when the pin is missing, not expandable, or already mid-flight;
    /// expansion of one (node, pin) is serialized by this guard.
    pub fn begin_expansion(&self, node_id: &str, pin_id: &str) -> Option<Self> {
        let pin = self.pin(node_id, pin_id)?;
        if pin.behavior != PinBehavior::Expandable || pin.state == PinState::Loading {
            return None;
        }
        Some(self.with_pin_state(node_id, pin_id, PinState::Loading, NodeState::Loading))
    }

    /// Successful expansion: merge the fragment, then mark the pin
    /// Expanded and its node Loaded.
    pub fn complete_expansion(
        &self,
        node_id: &str,
        pin_id: &str,
        response: &GraphResponse,
    ) -> Self {
        self.merge(response)
            .with_pin_state(node_id, pin_id, PinState::Expanded, NodeState::Loaded)
    }

    /// Failed expansion: the pin returns to Unexpanded (retryable), the
    /// node goes to Error until a new expansion is attempted.
    pub fn fail_expansion(&self, node_id: &str, pin_id: &str) -> Self {
        self.with_pin_state(node_id, pin_id, PinState::Unexpanded, NodeState::Error)
    }

    fn with_pin_state(
        &self,
        node_id: &str,
        pin_id: &str,
        pin_state: PinState,
        node_state: NodeState,
    ) -> Self {
        let mut next = self.clone();
        if let Some(node) = next.nodes.iter_mut().find(|n| n.id == node_id) {
            node.data.state = node_state;
            if let Some(pin) = node.data.pins.iter_mut().find(|p| p.id == pin_id) {
                pin.state = pin_state;
            }
        }
        next.last_updated = Some(Utc::now());
        next
    }
}

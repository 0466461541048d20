//! Graph wire model shared by the assembler, the HTTP surface, and the
//! explorer client store. Everything here serializes camelCase with
//! lowercase string enums, matching the explorer client contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{EntityKind, PropertyMap};

/// Deterministic node address: repeated resolution of the same canonical
/// entity always yields the same node id.
pub fn node_id(kind: EntityKind, internal_id: Uuid) -> String {
    format!("{}:{internal_id}", kind.node_type())
}

/// Deterministic edge address derived from its endpoints.
pub fn edge_id(source: &str, target: &str) -> String {
    format!("{source}-{target}")
}

// --- Node ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub label: String,
    pub node_type: String,
    pub properties: PropertyMap,
    pub pins: Vec<Pin>,
    pub state: NodeState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Renderer node type; the canvas only knows "default".
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data: NodeData,
}

impl Node {
    /// Materialize the node describing one resolved entity.
    pub fn for_entity(
        kind: EntityKind,
        internal_id: Uuid,
        label: String,
        properties: PropertyMap,
        pins: Vec<Pin>,
        position: Position,
    ) -> Self {
        Self {
            id: node_id(kind, internal_id),
            node_type: "default".to_string(),
            position,
            data: NodeData {
                label,
                node_type: kind.node_type().to_string(),
                properties,
                pins,
                state: NodeState::Loaded,
            },
        }
    }
}

// --- Pin ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinState {
    Unexpanded,
    Loading,
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinBehavior {
    Expandable,
    Informational,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinSummary {
    pub display_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preview: PropertyMap,
}

impl PinSummary {
    pub fn text(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            count: None,
            icon: None,
            source: None,
            preview: PropertyMap::new(),
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_preview(mut self, preview: PropertyMap) -> Self {
        self.preview = preview;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinMetadata {
    pub target_node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: PropertyMap,
}

/// A typed descriptor attached to a node: either a static fact
/// (informational) or a lazily-fetchable relation (expandable).
///
/// Constructed only through [`Pin::informational`] and [`Pin::expandable`],
/// which keep the behavior/metadata pairing consistent: a pin is expandable
/// exactly when it carries metadata with an api endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub pin_type: String,
    pub state: PinState,
    pub behavior: PinBehavior,
    pub summary: PinSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PinMetadata>,
}

impl Pin {
    /// A static fact pin. Any supplied metadata is kept for display
    /// context but never carries an endpoint.
    pub fn informational(
        pin_type: &str,
        disambiguator: &str,
        label: impl Into<String>,
        summary: PinSummary,
        metadata: Option<PinMetadata>,
    ) -> Self {
        let metadata = metadata.map(|mut m| {
            m.api_endpoint = None;
            m
        });
        Self {
            id: pin_id(pin_type, disambiguator),
            label: label.into(),
            pin_type: pin_type.to_string(),
            state: PinState::Unexpanded,
            behavior: PinBehavior::Informational,
            summary,
            metadata,
        }
    }

    /// A lazily-fetchable relation pin. The endpoint is mandatory.
    pub fn expandable(
        pin_type: &str,
        disambiguator: &str,
        label: impl Into<String>,
        summary: PinSummary,
        endpoint: impl Into<String>,
        mut metadata: PinMetadata,
    ) -> Self {
        metadata.api_endpoint = Some(endpoint.into());
        Self {
            id: pin_id(pin_type, disambiguator),
            label: label.into(),
            pin_type: pin_type.to_string(),
            state: PinState::Unexpanded,
            behavior: PinBehavior::Expandable,
            summary,
            metadata: Some(metadata),
        }
    }

    /// Expandable if and only if the pin carries metadata with an endpoint.
    /// Holds for every pin built through the constructors; checked again in
    /// tests on merged output.
    pub fn behavior_consistent(&self) -> bool {
        let has_endpoint = self
            .metadata
            .as_ref()
            .and_then(|m| m.api_endpoint.as_ref())
            .is_some();
        match self.behavior {
            PinBehavior::Expandable => has_endpoint,
            PinBehavior::Informational => !has_endpoint,
        }
    }
}

/// Pin ids are unique within their owning node: the pin type plus a
/// within-node disambiguator, never the node id itself.
pub fn pin_id(pin_type: &str, disambiguator: &str) -> String {
    format!("{pin_type}:{disambiguator}")
}

/// Context handed to pin extraction functions: where the pin will live and
/// how its target can be reached.
#[derive(Debug, Clone)]
pub struct PinContext {
    pub input_node_id: String,
    pub input_node_type: String,
    pub target_node_type: String,
    pub api_endpoint: Option<String>,
    pub api_parameters: PropertyMap,
}

// --- Edge ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    pub label: String,
    pub edge_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub data: EdgeData,
}

impl Edge {
    pub fn connect(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: &str,
        label: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: edge_id(&source, &target),
            source,
            target,
            edge_type: "default".to_string(),
            data: EdgeData {
                label: label.into(),
                edge_type: edge_type.to_string(),
                properties: PropertyMap::new(),
            },
        }
    }
}

// --- Response envelope ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub query_type: String,
    pub query_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: PropertyMap,
}

/// One self-contained, mergeable graph fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphResponse {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub metadata: GraphMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyValue;

    #[test]
    fn node_id_is_deterministic() {
        let id = Uuid::parse_str("9f3c1a2e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            node_id(EntityKind::Player, id),
            node_id(EntityKind::Player, id)
        );
        assert_eq!(
            node_id(EntityKind::LibraryList, id),
            format!("library-list:{id}")
        );
    }

    #[test]
    fn expandable_pin_always_carries_endpoint() {
        let pin = Pin::expandable(
            "library:library",
            "steam",
            "Steam Library",
            PinSummary::text("120 games").with_count(120),
            "/api/library/select",
            PinMetadata {
                target_node_type: "library".into(),
                target_node_id: None,
                origin_node_id: Some("player:abc".into()),
                api_endpoint: None,
                parameters: PropertyMap::new(),
            },
        );
        assert!(pin.behavior_consistent());
        assert_eq!(pin.id, "library:library:steam");
    }

    #[test]
    fn informational_pin_strips_endpoint() {
        let pin = Pin::informational(
            "player-info:display-name",
            "steam",
            "Display Name",
            PinSummary::text("gabe"),
            Some(PinMetadata {
                target_node_type: "player".into(),
                target_node_id: None,
                origin_node_id: None,
                api_endpoint: Some("/api/should-be-dropped".into()),
                parameters: PropertyMap::new(),
            }),
        );
        assert!(pin.behavior_consistent());
        assert!(pin.metadata.unwrap().api_endpoint.is_none());
    }

    #[test]
    fn property_value_roundtrips_untagged() {
        let mut bag = PropertyMap::new();
        bag.insert("count".into(), PropertyValue::Number(3.0));
        bag.insert("name".into(), "portal".into());
        bag.insert("installed".into(), true.into());

        let json = serde_json::to_string(&bag).unwrap();
        let back: PropertyMap = serde_json::from_str(&json).unwrap();
        assert_eq!(bag, back);
    }
}

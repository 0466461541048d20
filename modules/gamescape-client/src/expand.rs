//! Turning an expandable pin into the select request its endpoint expects.

use serde_json::{json, Map, Value};

use gamescape_common::{Pin, PinBehavior, PropertyValue};

/// A ready-to-send expansion call: the pin's own endpoint plus the select
/// body assembled from its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionRequest {
    pub endpoint: String,
    pub body: Value,
}

/// Build the request an expandable pin describes. Parameter keys that name
/// identifier namespaces become the `identifiers` bag; the reserved
/// `internalId` key maps to the body's `internalId`; the pin's origin node
/// rides along for edge synthesis. Informational pins have nothing to
/// expand.
pub fn expansion_request(pin: &Pin) -> Option<ExpansionRequest> {
    if pin.behavior != PinBehavior::Expandable {
        return None;
    }
    let metadata = pin.metadata.as_ref()?;
    let endpoint = metadata.api_endpoint.clone()?;

    let mut identifiers = Map::new();
    let mut internal_id: Option<String> = None;
    for (key, value) in &metadata.parameters {
        let text = match value {
            PropertyValue::Text(s) => s.clone(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::Flag(b) => b.to_string(),
            PropertyValue::Timestamp(t) => t.to_rfc3339(),
        };
        if key == "internalId" {
            internal_id = Some(text);
        } else {
            identifiers.insert(key.clone(), Value::String(text));
        }
    }

    let mut body = Map::new();
    body.insert("identifiers".into(), Value::Object(identifiers));
    if let Some(internal_id) = internal_id {
        body.insert("internalId".into(), json!(internal_id));
    }
    if let Some(origin) = &metadata.origin_node_id {
        body.insert("originNodeId".into(), json!(origin));
    }

    Some(ExpansionRequest {
        endpoint,
        body: Value::Object(body),
    })
}

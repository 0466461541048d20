//! Inbound request shapes for entity selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gamescape_common::{EntityKind, GamescapeError, IdentifierMap, Namespace, Result};

/// Body of `POST /api/{domain}/select`. Identifier keys are namespace
/// strings ("steam", "player", "library_source", ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectRequest {
    pub identifiers: BTreeMap<String, String>,
    pub internal_id: Option<Uuid>,
    pub origin_node_id: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl SelectRequest {
    pub fn by_internal_id(internal_id: Uuid) -> Self {
        Self {
            internal_id: Some(internal_id),
            ..Self::default()
        }
    }

    /// Parse and validate the identifier bag against the target domain's
    /// recognized namespaces. Runs before any domain work.
    pub fn validated_identifiers(&self, kind: EntityKind) -> Result<IdentifierMap> {
        let mut identifiers = IdentifierMap::new();
        for (key, value) in &self.identifiers {
            let namespace = key
                .parse::<Namespace>()
                .map_err(GamescapeError::Validation)?;
            if !kind.recognized_namespaces().contains(&namespace) {
                return Err(GamescapeError::Validation(format!(
                    "{namespace} identifiers are not recognized for the {kind} domain"
                )));
            }
            if value.trim().is_empty() {
                return Err(GamescapeError::Validation(format!(
                    "empty value for {namespace} identifier"
                )));
            }
            identifiers.insert(namespace, value.clone());
        }

        if identifiers.is_empty() && self.internal_id.is_none() {
            return Err(GamescapeError::Validation(format!(
                "a {kind} request needs identifiers or an internal id"
            )));
        }
        Ok(identifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_namespaces() {
        let mut request = SelectRequest::default();
        request
            .identifiers
            .insert("myspace".into(), "someone".into());
        assert!(request.validated_identifiers(EntityKind::Player).is_err());
    }

    #[test]
    fn rejects_namespaces_foreign_to_the_domain() {
        let mut request = SelectRequest::default();
        request
            .identifiers
            .insert("library_source".into(), "steam".into());
        // library_source is a library routing namespace, not a player one.
        assert!(request.validated_identifiers(EntityKind::Player).is_err());
        assert!(request.validated_identifiers(EntityKind::Library).is_ok());
    }

    #[test]
    fn rejects_empty_requests() {
        let request = SelectRequest::default();
        assert!(request.validated_identifiers(EntityKind::Game).is_err());
        assert!(SelectRequest::by_internal_id(Uuid::new_v4())
            .validated_identifiers(EntityKind::Game)
            .is_ok());
    }
}

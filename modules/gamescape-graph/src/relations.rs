//! Static origin → target relation table for synthesized edges.

use gamescape_common::EntityKind;

/// Edge type and label for an expansion from `origin_type` into a node of
/// `target` kind. Unlisted pairs fall back to the generic expansion
/// relation.
pub fn relation_for(origin_type: &str, target: EntityKind) -> (&'static str, &'static str) {
    match (origin_type, target) {
        ("player", EntityKind::Library) => ("owns", "Owns Library"),
        ("player", EntityKind::LibraryList) => ("owns", "Owns Libraries"),
        ("library", EntityKind::Game) => ("contains", "Contains"),
        ("library-list", EntityKind::Library) => ("contains", "Contains"),
        _ => ("expands_to", "Expands To"),
    }
}

/// Node type prefix of a deterministic node id ("player:uuid" → "player").
pub fn origin_node_type(node_id: &str) -> &str {
    node_id.split(':').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_relations() {
        assert_eq!(
            relation_for("player", EntityKind::Library),
            ("owns", "Owns Library")
        );
        assert_eq!(
            relation_for("library", EntityKind::Game),
            ("contains", "Contains")
        );
        assert_eq!(
            relation_for("game", EntityKind::Player),
            ("expands_to", "Expands To")
        );
    }

    #[test]
    fn origin_type_is_the_id_prefix() {
        assert_eq!(
            origin_node_type("library-list:0000-0000"),
            "library-list"
        );
        assert_eq!(origin_node_type(""), "");
    }
}

//! Pure pin extraction for library-list descriptions. No I/O here.

use gamescape_common::{
    node_id, EntityKind, LibraryEntity, LibraryListEntity, Pin, PinContext, PinMetadata,
    PinSummary, PropertyMap,
};

pub const MEMBER: &str = "library-list:library";
pub const SUMMARY: &str = "library-list:summary";
pub const ALL_LIBRARIES: &str = "library-list:all-libraries";

/// One expandable pin per member library. When the member record already
/// exists its node is addressed directly; otherwise expansion creates it.
pub fn member_library_pin(
    source: &str,
    member: Option<&LibraryEntity>,
    context: &PinContext,
) -> Pin {
    let target_node_id = member
        .and_then(|m| m.internal_id)
        .map(|id| node_id(EntityKind::Library, id));
    let count = member.and_then(|m| m.game_count);

    let display = match count {
        Some(count) => format!("{count} games on {source}"),
        None => format!("Library on {source}"),
    };
    let mut summary = PinSummary::text(display).with_icon(source).with_source(source);
    if let Some(count) = count {
        summary = summary.with_count(count);
    }

    let endpoint = context
        .api_endpoint
        .clone()
        .unwrap_or_else(|| crate::library::SELECT_ENDPOINT.to_string());
    Pin::expandable(
        MEMBER,
        source,
        format!("{source} Library"),
        summary,
        endpoint,
        PinMetadata {
            target_node_type: context.target_node_type.clone(),
            target_node_id,
            origin_node_id: Some(context.input_node_id.clone()),
            api_endpoint: None,
            parameters: context.api_parameters.clone(),
        },
    )
}

/// Informational pin summarizing the collection itself.
pub fn list_summary_pin(list: &LibraryListEntity, list_node_id: &str) -> Option<Pin> {
    if list.libraries.is_empty() {
        return None;
    }
    let count = list.libraries.len() as u32;
    let plural = if count == 1 { "library" } else { "libraries" };

    let mut preview = PropertyMap::new();
    for (source, member_id) in &list.libraries {
        preview.insert(
            source.clone(),
            node_id(EntityKind::Library, *member_id).into(),
        );
    }

    Some(Pin::informational(
        SUMMARY,
        "all",
        "Collection",
        PinSummary::text(format!("{count} {plural} linked"))
            .with_count(count)
            .with_preview(preview),
        Some(PinMetadata {
            target_node_type: EntityKind::LibraryList.node_type().to_string(),
            target_node_id: None,
            origin_node_id: Some(list_node_id.to_string()),
            api_endpoint: None,
            parameters: PropertyMap::new(),
        }),
    ))
}

/// The single "all libraries" pin a player node carries.
pub fn all_libraries_pin(sources: &[&str], context: &PinContext) -> Pin {
    let count = sources.len() as u32;
    let plural = if count == 1 { "platform" } else { "platforms" };

    let mut preview = PropertyMap::new();
    for (i, source) in sources.iter().enumerate() {
        preview.insert(format!("source{i}"), (*source).into());
    }

    let endpoint = context
        .api_endpoint
        .clone()
        .unwrap_or_else(|| super::SELECT_ENDPOINT.to_string());
    Pin::expandable(
        ALL_LIBRARIES,
        "all",
        "All Libraries",
        PinSummary::text(format!("Libraries on {count} {plural}"))
            .with_count(count)
            .with_icon("libraries")
            .with_preview(preview),
        endpoint,
        PinMetadata {
            target_node_type: context.target_node_type.clone(),
            target_node_id: None,
            origin_node_id: Some(context.input_node_id.clone()),
            api_endpoint: None,
            parameters: context.api_parameters.clone(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamescape_common::PinBehavior;

    fn context() -> PinContext {
        PinContext {
            input_node_id: "library-list:00000000-0000-4000-8000-00000000000a".into(),
            input_node_type: "library-list".into(),
            target_node_type: "library".into(),
            api_endpoint: Some("/api/library/select".into()),
            api_parameters: PropertyMap::new(),
        }
    }

    #[test]
    fn member_pin_without_record_still_expands() {
        let pin = member_library_pin("steam", None, &context());
        assert_eq!(pin.behavior, PinBehavior::Expandable);
        assert!(pin.behavior_consistent());
        assert!(pin.metadata.as_ref().unwrap().target_node_id.is_none());
    }

    #[test]
    fn member_pin_addresses_known_record() {
        use gamescape_common::DomainEntity;
        let mut member = LibraryEntity::from_identifiers(Default::default());
        member.internal_id = Some(uuid::Uuid::nil());
        member.game_count = Some(7);
        let pin = member_library_pin("steam", Some(&member), &context());
        assert_eq!(
            pin.metadata.as_ref().unwrap().target_node_id.as_deref(),
            Some("library:00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(pin.summary.count, Some(7));
    }
}

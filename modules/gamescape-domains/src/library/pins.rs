//! Pure pin extraction for library descriptions. No I/O here.

use std::collections::BTreeMap;

use gamescape_common::{Pin, PinContext, PinMetadata, PinSummary, PropertyMap};
use steam_client::OwnedGames;

pub const LIBRARY: &str = "library:library";
pub const ROLLUP: &str = "library:all-sources";
pub const INFO: &str = "library:info";
pub const TOP_PLAYED: &str = "library:top-played";

fn metadata_from(context: &PinContext) -> PinMetadata {
    PinMetadata {
        target_node_type: context.target_node_type.clone(),
        target_node_id: None,
        origin_node_id: Some(context.input_node_id.clone()),
        api_endpoint: None,
        parameters: context.api_parameters.clone(),
    }
}

/// One expandable pin for a single platform's library, attached to a
/// player node.
pub fn platform_library_pin(source: &str, game_count: u32, context: &PinContext) -> Pin {
    let endpoint = context
        .api_endpoint
        .clone()
        .unwrap_or_else(|| super::SELECT_ENDPOINT.to_string());
    Pin::expandable(
        LIBRARY,
        source,
        format!("{source} Library"),
        PinSummary::text(format!("{game_count} games on {source}"))
            .with_count(game_count)
            .with_icon(source)
            .with_source(source),
        endpoint,
        metadata_from(context),
    )
}

/// Roll-up over every platform's count. When present it sits at index 0 of
/// the merged pin list.
pub fn rollup_pin(per_source: &BTreeMap<String, u32>, context: &PinContext) -> Pin {
    let total: u32 = per_source.values().sum();
    let platforms = per_source.len();
    let plural = if platforms == 1 { "platform" } else { "platforms" };

    let mut preview = PropertyMap::new();
    for (source, count) in per_source {
        preview.insert(source.clone(), (*count).into());
    }
    preview.insert("platformCount".into(), (platforms as u32).into());

    let endpoint = context
        .api_endpoint
        .clone()
        .unwrap_or_else(|| crate::library_list::SELECT_ENDPOINT.to_string());
    Pin::expandable(
        ROLLUP,
        "all",
        format!("Libraries ({total} games)"),
        PinSummary::text(format!("{total} games across {platforms} {plural}"))
            .with_count(total)
            .with_icon("libraries")
            .with_preview(preview),
        endpoint,
        metadata_from(context),
    )
}

/// Informational pins describing a library node itself.
pub fn library_info_pins(owned: &OwnedGames, source: &str, context: &PinContext) -> Vec<Pin> {
    let mut pins = vec![Pin::informational(
        INFO,
        source,
        format!("{source} Library"),
        PinSummary::text(format!("{} games on {source}", owned.game_count))
            .with_count(owned.game_count)
            .with_icon(source)
            .with_source(source),
        Some(metadata_from(context)),
    )];

    // Top three titles by lifetime playtime, ties broken by app id so the
    // output is stable.
    let mut ranked: Vec<_> = owned.games.iter().collect();
    ranked.sort_by(|a, b| {
        b.playtime_forever
            .cmp(&a.playtime_forever)
            .then(a.appid.cmp(&b.appid))
    });
    let top: Vec<_> = ranked
        .into_iter()
        .take(3)
        .filter(|g| g.playtime_forever > 0)
        .collect();
    if !top.is_empty() {
        let mut preview = PropertyMap::new();
        for game in &top {
            let name = game.name.clone().unwrap_or_else(|| game.appid.to_string());
            preview.insert(name, (game.playtime_forever / 60).into());
        }
        pins.push(Pin::informational(
            TOP_PLAYED,
            source,
            "Most Played",
            PinSummary::text(format!("Top {} by hours played", top.len()))
                .with_source(source)
                .with_preview(preview),
            Some(metadata_from(context)),
        ));
    }

    pins
}

//! Pure pin extraction from Steam game responses. No I/O here.

use gamescape_common::{Pin, PinContext, PinMetadata, PinSummary, PropertyMap};
use steam_client::{AppDetails, OwnedGame, OwnedGames, RecentlyPlayed};

pub const GAME: &str = "game:game";
pub const RELEASE_DATE: &str = "game:release-date";
pub const PUBLISHER: &str = "game:publisher";
pub const DEVELOPER: &str = "game:developer";
pub const GENRE: &str = "game:genre";
pub const DESCRIPTION: &str = "game:description-short";
pub const WEBSITE: &str = "game:website";

const SOURCE: &str = "steam";

fn fact_metadata(context: &PinContext) -> PinMetadata {
    PinMetadata {
        target_node_type: context.target_node_type.clone(),
        target_node_id: None,
        origin_node_id: Some(context.input_node_id.clone()),
        api_endpoint: None,
        parameters: PropertyMap::new(),
    }
}

/// Store-page fact pins for one game.
pub fn game_info_pins(details: &AppDetails, context: &PinContext) -> Vec<Pin> {
    let mut pins = Vec::new();

    if let Some(release) = details.release_date.as_ref().filter(|r| !r.date.is_empty()) {
        let text = if release.coming_soon {
            format!("Coming {}", release.date)
        } else {
            format!("Released {}", release.date)
        };
        pins.push(Pin::informational(
            RELEASE_DATE,
            SOURCE,
            "Release Date",
            PinSummary::text(text).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    for (index, publisher) in details.publishers.iter().enumerate() {
        pins.push(Pin::informational(
            PUBLISHER,
            &index.to_string(),
            "Publisher",
            PinSummary::text(publisher.clone()).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    for (index, developer) in details.developers.iter().enumerate() {
        pins.push(Pin::informational(
            DEVELOPER,
            &index.to_string(),
            "Developer",
            PinSummary::text(developer.clone()).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    if !details.genres.is_empty() {
        let genres: Vec<&str> = details.genres.iter().map(|g| g.description.as_str()).collect();
        pins.push(Pin::informational(
            GENRE,
            SOURCE,
            "Genres",
            PinSummary::text(genres.join(", ")).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    if let Some(description) = details
        .short_description
        .as_ref()
        .filter(|d| !d.is_empty())
    {
        pins.push(Pin::informational(
            DESCRIPTION,
            SOURCE,
            "About",
            PinSummary::text(description.clone()).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    if let Some(website) = details.website.as_ref().filter(|w| !w.is_empty()) {
        pins.push(Pin::informational(
            WEBSITE,
            SOURCE,
            "Website",
            PinSummary::text(website.clone()).with_source(SOURCE).with_icon("link"),
            Some(fact_metadata(context)),
        ));
    }

    pins
}

/// One expandable reference pin per game, addressed by steam app id.
fn game_reference_pin(game: &OwnedGame, display: String, context: &PinContext) -> Pin {
    let app_id = game.appid.to_string();
    let mut parameters = PropertyMap::new();
    parameters.insert("steam".into(), app_id.as_str().into());

    let endpoint = context
        .api_endpoint
        .clone()
        .unwrap_or_else(|| super::SELECT_ENDPOINT.to_string());
    Pin::expandable(
        GAME,
        &app_id,
        game.name.clone().unwrap_or_else(|| format!("App {app_id}")),
        PinSummary::text(display).with_source(SOURCE),
        endpoint,
        PinMetadata {
            target_node_type: context.target_node_type.clone(),
            target_node_id: None,
            origin_node_id: Some(context.input_node_id.clone()),
            api_endpoint: None,
            parameters,
        },
    )
}

/// Reference pins for a player's recently played games, most-played-first
/// over the last two weeks.
pub fn recent_game_pins(recent: &RecentlyPlayed, cap: usize, context: &PinContext) -> Vec<Pin> {
    let mut ranked: Vec<&OwnedGame> = recent.games.iter().collect();
    ranked.sort_by(|a, b| {
        b.playtime_2weeks
            .unwrap_or(0)
            .cmp(&a.playtime_2weeks.unwrap_or(0))
            .then(a.appid.cmp(&b.appid))
    });

    ranked
        .into_iter()
        .take(cap)
        .map(|game| {
            let hours = game.playtime_2weeks.unwrap_or(0) / 60;
            game_reference_pin(game, format!("{hours}h in the last two weeks"), context)
        })
        .collect()
}

/// Reference pins for a library's owned games, most-played-first.
pub fn owned_game_pins(owned: &OwnedGames, cap: usize, context: &PinContext) -> Vec<Pin> {
    let mut ranked: Vec<&OwnedGame> = owned.games.iter().collect();
    ranked.sort_by(|a, b| {
        b.playtime_forever
            .cmp(&a.playtime_forever)
            .then(a.appid.cmp(&b.appid))
    });

    ranked
        .into_iter()
        .take(cap)
        .map(|game| {
            let hours = game.playtime_forever / 60;
            game_reference_pin(game, format!("{hours}h played"), context)
        })
        .collect()
}

//! Pure pin extraction from Steam player responses. No I/O here.

use chrono::DateTime;

use gamescape_common::{Pin, PinContext, PinMetadata, PinSummary, PropertyMap};
use steam_client::{Friend, PlayerSummary};

pub const DISPLAY_NAME: &str = "player-info:display-name";
pub const REAL_NAME: &str = "player-info:real-name";
pub const PROFILE_URL: &str = "player-info:profile-url";
pub const ONLINE_STATUS: &str = "player-info:online-status";
pub const LAST_ONLINE: &str = "player-info:last-online";
pub const CREATED_ON: &str = "player-info:created-on";
pub const FRIENDS: &str = "player:friends";

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

/// Profile fact pins for one player summary. Deterministic: the same
/// summary and context always produce the same pins in the same order.
pub fn profile_pins(summary: &PlayerSummary, context: &PinContext) -> Vec<Pin> {
    let mut pins = Vec::new();

    if let Some(name) = &summary.personaname {
        pins.push(Pin::informational(
            DISPLAY_NAME,
            SOURCE,
            "Display Name",
            PinSummary::text(name.clone()).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    if let Some(name) = &summary.realname {
        pins.push(Pin::informational(
            REAL_NAME,
            SOURCE,
            "Real Name",
            PinSummary::text(name.clone()).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    if let Some(url) = &summary.profileurl {
        pins.push(Pin::informational(
            PROFILE_URL,
            SOURCE,
            "Profile",
            PinSummary::text(url.clone()).with_source(SOURCE).with_icon("link"),
            Some(fact_metadata(context)),
        ));
    }

    pins.push(Pin::informational(
        ONLINE_STATUS,
        SOURCE,
        "Status",
        PinSummary::text(summary.persona_state_label())
            .with_source(SOURCE)
            .with_icon("presence"),
        Some(fact_metadata(context)),
    ));

    if let Some(ts) = summary.lastlogoff.and_then(|t| DateTime::from_timestamp(t, 0)) {
        pins.push(Pin::informational(
            LAST_ONLINE,
            SOURCE,
            "Last Online",
            PinSummary::text(ts.format("%Y-%m-%d %H:%M UTC").to_string()).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    if let Some(ts) = summary.timecreated.and_then(|t| DateTime::from_timestamp(t, 0)) {
        pins.push(Pin::informational(
            CREATED_ON,
            SOURCE,
            "Account Created",
            PinSummary::text(ts.format("%Y-%m-%d").to_string()).with_source(SOURCE),
            Some(fact_metadata(context)),
        ));
    }

    pins
}

/// Expandable pin for the player's friend list; expansion resolves each
/// friend into its own player node.
pub fn friends_pin(friends: &[Friend], context: &PinContext) -> Option<Pin> {
    if friends.is_empty() {
        return None;
    }
    let count = friends.len() as u32;
    let endpoint = context
        .api_endpoint
        .clone()
        .unwrap_or_else(|| super::FRIENDS_ENDPOINT.to_string());
    Some(Pin::expandable(
        FRIENDS,
        SOURCE,
        "Friends",
        PinSummary::text(format!("{count} friends on Steam"))
            .with_count(count)
            .with_source(SOURCE)
            .with_icon("people"),
        endpoint,
        PinMetadata {
            target_node_type: context.target_node_type.clone(),
            target_node_id: None,
            origin_node_id: Some(context.input_node_id.clone()),
            api_endpoint: None,
            parameters: context.api_parameters.clone(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamescape_common::PinBehavior;

    fn context() -> PinContext {
        PinContext {
            input_node_id: "player:00000000-0000-4000-8000-000000000001".into(),
            input_node_type: "player".into(),
            target_node_type: "player".into(),
            api_endpoint: Some("/api/player/select".into()),
            api_parameters: PropertyMap::new(),
        }
    }

    fn summary() -> PlayerSummary {
        serde_json::from_value(serde_json::json!({
            "steamid": "76561197995791208",
            "personaname": "gabe",
            "profileurl": "https://steamcommunity.com/id/gabe",
            "personastate": 1,
            "timecreated": 1100000000i64
        }))
        .unwrap()
    }

    #[test]
    fn profile_pins_are_deterministic() {
        let a = profile_pins(&summary(), &context());
        let b = profile_pins(&summary(), &context());
        let a_json = serde_json::to_string(&a).unwrap();
        let b_json = serde_json::to_string(&b).unwrap();
        assert_eq!(a_json, b_json);
    }

    #[test]
    fn profile_pins_are_informational_facts() {
        for pin in profile_pins(&summary(), &context()) {
            assert_eq!(pin.behavior, PinBehavior::Informational);
            assert!(pin.behavior_consistent(), "pin {} broke the invariant", pin.id);
            assert!(pin.id.starts_with("player"), "unexpected id {}", pin.id);
        }
    }

    #[test]
    fn friends_pin_skipped_when_list_is_empty() {
        assert!(friends_pin(&[], &context()).is_none());
    }

    #[test]
    fn friends_pin_expands_through_the_friends_endpoint() {
        let friend: Friend = serde_json::from_value(serde_json::json!({
            "steamid": "76561197960287930",
            "relationship": "friend"
        }))
        .unwrap();
        let mut ctx = context();
        ctx.api_endpoint = Some("/api/player/friends".into());
        ctx.api_parameters
            .insert("steam".into(), "76561197995791208".into());

        let pin = friends_pin(&[friend], &ctx).unwrap();
        assert_eq!(pin.behavior, PinBehavior::Expandable);
        assert!(pin.behavior_consistent());
        let metadata = pin.metadata.as_ref().unwrap();
        assert_eq!(metadata.api_endpoint.as_deref(), Some("/api/player/friends"));
        assert_eq!(metadata.target_node_type, "player");
        assert!(metadata.parameters.contains_key("steam"));
    }
}

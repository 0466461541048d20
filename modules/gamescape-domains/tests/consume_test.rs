//! Integration tests for the Consume protocol with a fake Steam API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use gamescape_common::{
    DomainEntity, EntityKind, EntityRef, IdentifierMap, Namespace, Pin, PlayerEntity,
};
use gamescape_domains::{
    DomainRegistry, DomainService, GameService, LibraryListService, LibraryService, PlayerService,
};
use gamescape_identity::{MemoryStorage, Storage};
use steam_client::{
    AppDetails, Friend, OwnedGames, PlayerSummary, RecentlyPlayed, SteamApi, SteamError,
};

// ---------------------------------------------------------------------------
// Fake Steam API
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeSteam {
    fail_owned_games: AtomicBool,
}

impl FakeSteam {
    fn failing_owned_games() -> Self {
        let fake = Self::default();
        fake.fail_owned_games.store(true, Ordering::SeqCst);
        fake
    }
}

#[async_trait]
impl SteamApi for FakeSteam {
    async fn player_summary(
        &self,
        steam_id: &str,
    ) -> std::result::Result<Option<PlayerSummary>, SteamError> {
        Ok(Some(
            serde_json::from_value(serde_json::json!({
                "steamid": steam_id,
                "personaname": "gabe",
                "avatarfull": "https://avatars.example/gabe.jpg",
                "personastate": 1
            }))
            .unwrap(),
        ))
    }

    async fn owned_games(
        &self,
        _steam_id: &str,
    ) -> std::result::Result<OwnedGames, SteamError> {
        if self.fail_owned_games.load(Ordering::SeqCst) {
            return Err(SteamError::Api {
                status: 503,
                message: "steam is down".into(),
            });
        }
        Ok(serde_json::from_value(serde_json::json!({
            "game_count": 2,
            "games": [
                {"appid": 570, "name": "Dota 2", "playtime_forever": 6000},
                {"appid": 400, "name": "Portal", "playtime_forever": 300}
            ]
        }))
        .unwrap())
    }

    async fn recently_played(
        &self,
        _steam_id: &str,
    ) -> std::result::Result<RecentlyPlayed, SteamError> {
        Ok(serde_json::from_value(serde_json::json!({
            "total_count": 1,
            "games": [
                {"appid": 570, "name": "Dota 2", "playtime_forever": 6000, "playtime_2weeks": 240}
            ]
        }))
        .unwrap())
    }

    async fn friend_list(
        &self,
        _steam_id: &str,
    ) -> std::result::Result<Vec<Friend>, SteamError> {
        Ok(vec![serde_json::from_value(serde_json::json!({
            "steamid": "76561197960287930",
            "relationship": "friend"
        }))
        .unwrap()])
    }

    async fn app_details(
        &self,
        _app_id: u32,
    ) -> std::result::Result<Option<AppDetails>, SteamError> {
        Ok(Some(
            serde_json::from_value(serde_json::json!({
                "steam_appid": 570,
                "name": "Dota 2",
                "publishers": ["Valve"],
                "genres": [{"description": "MOBA"}]
            }))
            .unwrap(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn registry(storage: Arc<MemoryStorage>, steam: Arc<dyn SteamApi>) -> DomainRegistry {
    let storage: Arc<dyn Storage> = storage;
    DomainRegistry::new()
        .with(Arc::new(PlayerService::new(storage.clone(), steam.clone())))
        .with(Arc::new(LibraryService::new(storage.clone(), steam.clone())))
        .with(Arc::new(LibraryListService::new(storage.clone())))
        .with(Arc::new(GameService::new(storage, steam)))
}

fn steam_player_partial(steam_id: &str) -> EntityRef {
    let mut identifiers = IdentifierMap::new();
    identifiers.insert(Namespace::Steam, steam_id.to_string());
    EntityRef::Player(PlayerEntity::from_identifiers(identifiers))
}

fn assert_invariant(pins: &[Pin]) {
    for pin in pins {
        assert!(
            pin.behavior_consistent(),
            "pin {} violates the behavior/metadata invariant",
            pin.id
        );
    }
}

// ---------------------------------------------------------------------------
// Self-domain consumption
// ---------------------------------------------------------------------------

#[tokio::test]
async fn player_consume_resolves_and_enriches() {
    let storage = Arc::new(MemoryStorage::new());
    let registry = registry(storage.clone(), Arc::new(FakeSteam::default()));

    let (pins, resolved) = registry
        .consume_own(steam_player_partial("76561197995791208"))
        .await
        .unwrap();

    let EntityRef::Player(player) = resolved else {
        panic!("resolved entity changed domains");
    };
    assert!(player.internal_id.is_some());
    assert_eq!(player.display_name.as_deref(), Some("gabe"));
    assert!(pins.iter().any(|p| p.pin_type == "player-info:display-name"));
    assert!(pins.iter().any(|p| p.pin_type == "player:friends"));
    assert_invariant(&pins);
}

#[tokio::test]
async fn consume_own_routes_by_entity_kind() {
    let storage = Arc::new(MemoryStorage::new());
    let registry = registry(storage.clone(), Arc::new(FakeSteam::default()));

    // Two resolutions of the same account agree on one record.
    let (_, first) = registry
        .consume_own(steam_player_partial("76561197995791208"))
        .await
        .unwrap();
    let (_, second) = registry
        .consume_own(steam_player_partial("76561197995791208"))
        .await
        .unwrap();
    assert_eq!(first.internal_id(), second.internal_id());
}

#[tokio::test]
async fn friends_of_resolves_each_friend_to_a_canonical_record() {
    let storage = Arc::new(MemoryStorage::new());
    let steam: Arc<dyn SteamApi> = Arc::new(FakeSteam::default());
    let players = PlayerService::new(storage.clone() as Arc<dyn Storage>, steam);

    let mut identifiers = IdentifierMap::new();
    identifiers.insert(Namespace::Steam, "76561197995791208".to_string());
    let (origin, friends) = players
        .friends_of(PlayerEntity::from_identifiers(identifiers))
        .await
        .unwrap();

    assert!(origin.internal_id.is_some());
    assert_eq!(friends.len(), 1);
    let friend = &friends[0];
    assert!(friend.internal_id.is_some());
    assert_ne!(friend.internal_id, origin.internal_id);
    // Friend display fields were enriched and persisted on first sight.
    assert_eq!(friend.display_name.as_deref(), Some("gabe"));

    // Re-running addresses the same canonical friend records.
    let mut identifiers = IdentifierMap::new();
    identifiers.insert(Namespace::Steam, "76561197995791208".to_string());
    let (_, again) = players
        .friends_of(PlayerEntity::from_identifiers(identifiers))
        .await
        .unwrap();
    assert_eq!(again[0].internal_id, friend.internal_id);
}

// ---------------------------------------------------------------------------
// Foreign-domain fan-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fan_out_merges_other_domains_pins() {
    let storage = Arc::new(MemoryStorage::new());
    let registry = registry(storage.clone(), Arc::new(FakeSteam::default()));

    let (_, resolved) = registry
        .consume_own(steam_player_partial("76561197995791208"))
        .await
        .unwrap();
    let pins = registry.fan_out(&resolved).await;

    // Library domain: roll-up + steam library; library-list: all-libraries;
    // game domain: recently played references.
    assert!(pins.iter().any(|p| p.pin_type == "library:library"));
    assert!(pins.iter().any(|p| p.pin_type == "library-list:all-libraries"));
    assert!(pins.iter().any(|p| p.pin_type == "game:game"));
    assert_invariant(&pins);
}

#[tokio::test]
async fn rollup_pin_leads_the_library_contribution() {
    let storage = Arc::new(MemoryStorage::new());
    let steam: Arc<dyn SteamApi> = Arc::new(FakeSteam::default());
    let library = LibraryService::new(storage.clone() as Arc<dyn Storage>, steam.clone());
    let registry = registry(storage.clone(), steam);

    let (_, resolved) = registry
        .consume_own(steam_player_partial("76561197995791208"))
        .await
        .unwrap();

    let pins = library.consume_foreign(&resolved).await.unwrap();
    assert!(!pins.is_empty());
    assert_eq!(pins[0].pin_type, "library:all-sources");
    assert_eq!(pins[0].summary.count, Some(2));
}

#[tokio::test]
async fn degraded_provider_costs_only_its_own_pins() {
    let storage = Arc::new(MemoryStorage::new());
    // Profile and recently-played calls work; owned-games calls fail, which
    // degrades the library domain's foreign contribution.
    let registry = registry(storage.clone(), Arc::new(FakeSteam::failing_owned_games()));

    let (_, resolved) = registry
        .consume_own(steam_player_partial("76561197995791208"))
        .await
        .unwrap();
    let pins = registry.fan_out(&resolved).await;

    assert!(!pins.iter().any(|p| p.pin_type == "library:library"));
    // The other domains still contributed.
    assert!(pins.iter().any(|p| p.pin_type == "library-list:all-libraries"));
    assert!(pins.iter().any(|p| p.pin_type == "game:game"));
}

#[tokio::test]
async fn foreign_consumption_is_read_only() {
    let storage = Arc::new(MemoryStorage::new());
    let registry = registry(storage.clone(), Arc::new(FakeSteam::default()));

    let (_, resolved) = registry
        .consume_own(steam_player_partial("76561197995791208"))
        .await
        .unwrap();

    let keys_before = storage.len();
    let _ = registry.fan_out(&resolved).await;
    assert_eq!(
        storage.len(),
        keys_before,
        "foreign-domain consumption must not create or update records"
    );
}

// ---------------------------------------------------------------------------
// Relation table introspection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn relation_table_matches_the_domain_design() {
    let storage = Arc::new(MemoryStorage::new());
    let registry = registry(storage, Arc::new(FakeSteam::default()));

    let mut relations = registry.relations();
    relations.sort_by_key(|(a, b)| (a.node_type(), b.node_type()));
    assert_eq!(
        relations,
        vec![
            (EntityKind::Game, EntityKind::Library),
            (EntityKind::Game, EntityKind::Player),
            (EntityKind::Library, EntityKind::Player),
            (EntityKind::LibraryList, EntityKind::Player),
        ]
    );
}

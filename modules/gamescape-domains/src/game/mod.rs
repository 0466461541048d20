//! Game domain: resolves game titles and describes the games reachable
//! from players (recently played) and libraries (owned).

pub mod pins;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use gamescape_common::{
    node_id, EntityKind, EntityRef, GameEntity, GamescapeError, Namespace, Pin, PinContext,
    PropertyMap, Result,
};
use gamescape_identity::{IdentityStore, Storage};
use steam_client::SteamApi;

use crate::dispatch::{resolve_partial, DomainService};

pub const SELECT_ENDPOINT: &str = "/api/game/select";

/// Owned-game pins are capped so a two-thousand-title library does not
/// flood one node; the count on the library pin carries the full total.
const OWNED_GAME_PIN_CAP: usize = 25;
const RECENT_GAME_PIN_CAP: usize = 10;

pub struct GameService {
    store: IdentityStore<GameEntity>,
    steam: Arc<dyn SteamApi>,
}

impl GameService {
    pub fn new(storage: Arc<dyn Storage>, steam: Arc<dyn SteamApi>) -> Self {
        Self {
            store: IdentityStore::new(storage),
            steam,
        }
    }

    fn own_context(&self, game: &GameEntity) -> PinContext {
        let internal_id = game
            .internal_id
            .expect("pin context is built after resolution");
        let mut parameters = PropertyMap::new();
        parameters.insert("internalId".into(), internal_id.to_string().into());
        PinContext {
            input_node_id: node_id(EntityKind::Game, internal_id),
            input_node_type: EntityKind::Game.node_type().to_string(),
            target_node_type: EntityKind::Game.node_type().to_string(),
            api_endpoint: None,
            api_parameters: parameters,
        }
    }

    fn foreign_context(&self, origin_node_id: &str, origin_type: EntityKind) -> PinContext {
        PinContext {
            input_node_id: origin_node_id.to_string(),
            input_node_type: origin_type.node_type().to_string(),
            target_node_type: EntityKind::Game.node_type().to_string(),
            api_endpoint: Some(SELECT_ENDPOINT.to_string()),
            api_parameters: PropertyMap::new(),
        }
    }
}

#[async_trait]
impl DomainService for GameService {
    fn kind(&self) -> EntityKind {
        EntityKind::Game
    }

    async fn consume_own(&self, partial: EntityRef) -> Result<(Vec<Pin>, EntityRef)> {
        let requested = partial.kind();
        let EntityRef::Game(partial) = partial else {
            return Err(GamescapeError::Validation(format!(
                "game domain cannot resolve a {requested} entity"
            )));
        };

        let mut resolved =
            resolve_partial(&self.store, partial.internal_id, partial.identifiers).await?;
        let context = self.own_context(&resolved);
        let mut pins = Vec::new();

        let app_id = resolved
            .identifiers
            .get(&Namespace::Steam)
            .and_then(|v| v.parse::<u32>().ok());
        if let Some(app_id) = app_id {
            match self.steam.app_details(app_id).await {
                Ok(Some(details)) => {
                    let mut dirty = false;
                    if resolved.name.is_none() {
                        resolved.name = details.name.clone();
                        dirty = true;
                    }
                    if resolved.header_image_url.is_none() {
                        resolved.header_image_url = details.header_image.clone();
                        dirty = true;
                    }
                    if dirty {
                        self.store.update(&mut resolved).await?;
                    }
                    pins.extend(pins::game_info_pins(&details, &context));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(app_id, error = %e, "Store details unavailable, skipping game pins");
                }
            }
        }

        Ok((pins, EntityRef::Game(resolved)))
    }

    fn foreign_kinds(&self) -> &'static [EntityKind] {
        &[EntityKind::Player, EntityKind::Library]
    }

    async fn consume_foreign(&self, entity: &EntityRef) -> Result<Vec<Pin>> {
        match entity {
            EntityRef::Player(player) => {
                let (Some(player_id), Some(steam_id)) =
                    (player.internal_id, player.identifiers.get(&Namespace::Steam))
                else {
                    return Ok(Vec::new());
                };
                let origin = node_id(EntityKind::Player, player_id);
                let context = self.foreign_context(&origin, EntityKind::Player);

                match self.steam.recently_played(steam_id).await {
                    Ok(recent) => Ok(pins::recent_game_pins(&recent, RECENT_GAME_PIN_CAP, &context)),
                    Err(e) => {
                        warn!(error = %e, "Recently played unavailable for player description");
                        Ok(Vec::new())
                    }
                }
            }
            EntityRef::Library(library) => {
                let (Some(library_id), Some(steam_id)) = (
                    library.internal_id,
                    library.identifiers.get(&Namespace::Steam),
                ) else {
                    return Ok(Vec::new());
                };
                if library.source.as_deref() != Some("steam") {
                    return Ok(Vec::new());
                }
                let origin = node_id(EntityKind::Library, library_id);
                let context = self.foreign_context(&origin, EntityKind::Library);

                match self.steam.owned_games(steam_id).await {
                    Ok(owned) => Ok(pins::owned_game_pins(&owned, OWNED_GAME_PIN_CAP, &context)),
                    Err(e) => {
                        warn!(error = %e, "Owned games unavailable for library description");
                        Ok(Vec::new())
                    }
                }
            }
            _ => Ok(Vec::new()),
        }
    }
}

//! Player domain: resolves player accounts across platforms and describes
//! them with profile pins sourced from the platform APIs.

pub mod pins;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use gamescape_common::{
    node_id, EntityKind, EntityRef, GamescapeError, IdentifierMap, Namespace, Pin, PinContext,
    PlayerEntity, PropertyMap, Result,
};
use gamescape_identity::{IdentityStore, Storage};
use steam_client::SteamApi;

use crate::dispatch::{resolve_partial, DomainService};

pub const SELECT_ENDPOINT: &str = "/api/player/select";
pub const FRIENDS_ENDPOINT: &str = "/api/player/friends";

/// Friend expansion resolves one canonical record per friend; the cap keeps
/// a thousand-friend account from flooding one request. The friends pin
/// carries the full count.
const FRIEND_NODE_CAP: usize = 25;

pub struct PlayerService {
    store: IdentityStore<PlayerEntity>,
    steam: Arc<dyn SteamApi>,
}

impl PlayerService {
    pub fn new(storage: Arc<dyn Storage>, steam: Arc<dyn SteamApi>) -> Self {
        Self {
            store: IdentityStore::new(storage),
            steam,
        }
    }

    /// Resolve the requesting player, then resolve each of their Steam
    /// friends into its own canonical player record. Friend display names
    /// are enriched from the provider where the record has none yet.
    pub async fn friends_of(
        &self,
        partial: PlayerEntity,
    ) -> Result<(PlayerEntity, Vec<PlayerEntity>)> {
        let origin =
            resolve_partial(&self.store, partial.internal_id, partial.identifiers).await?;
        let Some(steam_id) = origin.identifiers.get(&Namespace::Steam).cloned() else {
            return Err(GamescapeError::Validation(
                "player has no steam account to list friends from".to_string(),
            ));
        };

        let friends = self
            .steam
            .friend_list(&steam_id)
            .await
            .map_err(|e| GamescapeError::Upstream(e.to_string()))?;

        let mut resolved = Vec::new();
        for friend in friends.iter().take(FRIEND_NODE_CAP) {
            let mut identifiers = IdentifierMap::new();
            identifiers.insert(Namespace::Steam, friend.steamid.clone());
            let mut entity = self.store.resolve(identifiers).await?;

            if entity.display_name.is_none() {
                match self.steam.player_summary(&friend.steamid).await {
                    Ok(Some(summary)) => {
                        entity.display_name = summary.personaname.clone();
                        entity.avatar_url = summary.avatarfull.clone();
                        self.store.update(&mut entity).await?;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            friend = %friend.steamid,
                            error = %e,
                            "Friend profile unavailable, keeping bare record"
                        );
                    }
                }
            }
            resolved.push(entity);
        }

        Ok((origin, resolved))
    }

    fn pin_context(&self, player: &PlayerEntity) -> PinContext {
        let internal_id = player
            .internal_id
            .expect("pin context is built after resolution");
        let mut parameters = PropertyMap::new();
        parameters.insert("internalId".into(), internal_id.to_string().into());
        PinContext {
            input_node_id: node_id(EntityKind::Player, internal_id),
            input_node_type: EntityKind::Player.node_type().to_string(),
            target_node_type: EntityKind::Player.node_type().to_string(),
            api_endpoint: Some(SELECT_ENDPOINT.to_string()),
            api_parameters: parameters,
        }
    }

    fn friends_context(&self, player: &PlayerEntity, steam_id: &str) -> PinContext {
        let internal_id = player
            .internal_id
            .expect("pin context is built after resolution");
        let mut parameters = PropertyMap::new();
        parameters.insert("steam".into(), steam_id.into());
        PinContext {
            input_node_id: node_id(EntityKind::Player, internal_id),
            input_node_type: EntityKind::Player.node_type().to_string(),
            target_node_type: EntityKind::Player.node_type().to_string(),
            api_endpoint: Some(FRIENDS_ENDPOINT.to_string()),
            api_parameters: parameters,
        }
    }
}

#[async_trait]
impl DomainService for PlayerService {
    fn kind(&self) -> EntityKind {
        EntityKind::Player
    }

    async fn consume_own(&self, partial: EntityRef) -> Result<(Vec<Pin>, EntityRef)> {
        let requested = partial.kind();
        let EntityRef::Player(partial) = partial else {
            return Err(GamescapeError::Validation(format!(
                "player domain cannot resolve a {requested} entity"
            )));
        };

        let mut resolved =
            resolve_partial(&self.store, partial.internal_id, partial.identifiers).await?;
        let context = self.pin_context(&resolved);
        let mut pins = Vec::new();

        if let Some(steam_id) = resolved.identifiers.get(&Namespace::Steam).cloned() {
            match self.steam.player_summary(&steam_id).await {
                Ok(Some(summary)) => {
                    if resolved.display_name.is_none() {
                        resolved.display_name = summary.personaname.clone();
                        resolved.avatar_url = summary.avatarfull.clone();
                        self.store.update(&mut resolved).await?;
                    }
                    pins.extend(pins::profile_pins(&summary, &context));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Steam profile unavailable, skipping profile pins");
                }
            }

            match self.steam.friend_list(&steam_id).await {
                Ok(friends) => {
                    let friends_context = self.friends_context(&resolved, &steam_id);
                    pins.extend(pins::friends_pin(&friends, &friends_context));
                }
                Err(e) => {
                    warn!(error = %e, "Steam friend list unavailable, skipping friends pin");
                }
            }
        }

        Ok((pins, EntityRef::Player(resolved)))
    }

    // The player domain has nothing to say about other domains' entities.
}

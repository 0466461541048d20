//! Library domain: one record per (player, platform) game library.
//!
//! Identity is keyed by the platform account identifier, the only value
//! that is unique to a single library. The owning player and the source
//! name travel as plain fields and as routing hints in requests.

pub mod pins;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use gamescape_common::{
    node_id, EntityKind, EntityRef, GamescapeError, IdentifierMap, LibraryEntity, Namespace, Pin,
    PinContext, PlayerEntity, PropertyMap, Result,
};
use gamescape_identity::{IdentityStore, Storage};
use steam_client::SteamApi;

use crate::dispatch::{resolve_partial, DomainService};
use crate::library_list;

pub const SELECT_ENDPOINT: &str = "/api/library/select";

pub struct LibraryService {
    store: IdentityStore<LibraryEntity>,
    players: IdentityStore<PlayerEntity>,
    steam: Arc<dyn SteamApi>,
}

impl LibraryService {
    pub fn new(storage: Arc<dyn Storage>, steam: Arc<dyn SteamApi>) -> Self {
        Self {
            store: IdentityStore::new(storage.clone()),
            players: IdentityStore::new(storage),
            steam,
        }
    }

    /// Determine the platform-account identity of the requested library,
    /// deriving it from the owning player record when the request only
    /// carries (player, librarySource) routing hints.
    async fn library_identity(
        &self,
        partial: &LibraryEntity,
        source: Option<&str>,
        player_id: Option<Uuid>,
    ) -> Result<IdentifierMap> {
        let mut identity: IdentifierMap = partial
            .identifiers
            .iter()
            .filter(|(ns, _)| Namespace::platforms().contains(*ns))
            .map(|(ns, v)| (*ns, v.clone()))
            .collect();
        if !identity.is_empty() || partial.internal_id.is_some() {
            return Ok(identity);
        }

        let (Some(player_id), Some(source)) = (player_id, source) else {
            return Err(GamescapeError::Validation(
                "a library request needs a platform account, an internal id, \
                 or player + librarySource"
                    .to_string(),
            ));
        };
        let namespace = Namespace::platform_from_source(source).ok_or_else(|| {
            GamescapeError::Validation(format!("unrecognized library source: {source}"))
        })?;
        let player = self
            .players
            .get(player_id)
            .await?
            .ok_or(GamescapeError::NotFound {
                kind: EntityKind::Player,
                id: player_id,
            })?;
        let account = player.identifiers.get(&namespace).cloned().ok_or_else(|| {
            GamescapeError::Validation(format!("player {player_id} has no {source} account"))
        })?;
        identity.insert(namespace, account);
        Ok(identity)
    }

    fn own_context(&self, library: &LibraryEntity) -> PinContext {
        let internal_id = library
            .internal_id
            .expect("pin context is built after resolution");
        let mut parameters = PropertyMap::new();
        parameters.insert("internalId".into(), internal_id.to_string().into());
        PinContext {
            input_node_id: node_id(EntityKind::Library, internal_id),
            input_node_type: EntityKind::Library.node_type().to_string(),
            target_node_type: EntityKind::Library.node_type().to_string(),
            api_endpoint: None,
            api_parameters: parameters,
        }
    }

    fn foreign_context(&self, origin_node_id: &str, player_id: Uuid, source: &str) -> PinContext {
        let mut parameters = PropertyMap::new();
        parameters.insert("player".into(), player_id.to_string().into());
        parameters.insert("library_source".into(), source.into());
        PinContext {
            input_node_id: origin_node_id.to_string(),
            input_node_type: EntityKind::Player.node_type().to_string(),
            target_node_type: EntityKind::Library.node_type().to_string(),
            api_endpoint: Some(SELECT_ENDPOINT.to_string()),
            api_parameters: parameters,
        }
    }

    fn rollup_context(&self, origin_node_id: &str, player_id: Uuid) -> PinContext {
        let mut parameters = PropertyMap::new();
        parameters.insert("player".into(), player_id.to_string().into());
        PinContext {
            input_node_id: origin_node_id.to_string(),
            input_node_type: EntityKind::Player.node_type().to_string(),
            target_node_type: EntityKind::LibraryList.node_type().to_string(),
            api_endpoint: Some(library_list::SELECT_ENDPOINT.to_string()),
            api_parameters: parameters,
        }
    }
}

#[async_trait]
impl DomainService for LibraryService {
    fn kind(&self) -> EntityKind {
        EntityKind::Library
    }

    async fn consume_own(&self, partial: EntityRef) -> Result<(Vec<Pin>, EntityRef)> {
        let requested = partial.kind();
        let EntityRef::Library(partial) = partial else {
            return Err(GamescapeError::Validation(format!(
                "library domain cannot resolve a {requested} entity"
            )));
        };

        let source = partial
            .source
            .clone()
            .or_else(|| partial.identifiers.get(&Namespace::LibrarySource).cloned());
        let player_id = partial.player_id.or_else(|| {
            partial
                .identifiers
                .get(&Namespace::Player)
                .and_then(|v| Uuid::parse_str(v).ok())
        });

        let identity = self
            .library_identity(&partial, source.as_deref(), player_id)
            .await?;
        let mut resolved = resolve_partial(&self.store, partial.internal_id, identity).await?;

        let mut dirty = false;
        if resolved.source.is_none() && source.is_some() {
            resolved.source = source;
            dirty = true;
        }
        if resolved.player_id.is_none() && player_id.is_some() {
            resolved.player_id = player_id;
            dirty = true;
        }

        let context = self.own_context(&resolved);
        let mut pins = Vec::new();

        if resolved.source.as_deref() == Some("steam") {
            if let Some(account) = resolved.identifiers.get(&Namespace::Steam).cloned() {
                match self.steam.owned_games(&account).await {
                    Ok(owned) => {
                        if resolved.game_count != Some(owned.game_count) {
                            resolved.game_count = Some(owned.game_count);
                            dirty = true;
                        }
                        pins.extend(pins::library_info_pins(&owned, "steam", &context));
                    }
                    Err(e) => {
                        warn!(error = %e, "Steam library unavailable, skipping library pins");
                    }
                }
            }
        }

        if dirty {
            self.store.update(&mut resolved).await?;
        }
        Ok((pins, EntityRef::Library(resolved)))
    }

    fn foreign_kinds(&self) -> &'static [EntityKind] {
        &[EntityKind::Player]
    }

    async fn consume_foreign(&self, entity: &EntityRef) -> Result<Vec<Pin>> {
        let EntityRef::Player(player) = entity else {
            return Ok(Vec::new());
        };
        let Some(player_id) = player.internal_id else {
            return Ok(Vec::new());
        };
        let origin = node_id(EntityKind::Player, player_id);

        let mut pins = Vec::new();
        let mut per_source: BTreeMap<String, u32> = BTreeMap::new();

        for namespace in Namespace::platforms() {
            let Some(account) = player.identifiers.get(namespace) else {
                continue;
            };
            match namespace {
                Namespace::Steam => match self.steam.owned_games(account).await {
                    Ok(owned) => {
                        per_source.insert("steam".to_string(), owned.game_count);
                        let context = self.foreign_context(&origin, player_id, "steam");
                        pins.push(pins::platform_library_pin("steam", owned.game_count, &context));
                    }
                    Err(e) => {
                        warn!(error = %e, "Steam library unavailable for player description");
                    }
                },
                other => {
                    debug!(source = %other, "No provider client for platform, skipping");
                }
            }
        }

        // Cross-provider roll-up always leads the merged list.
        if !per_source.is_empty() {
            let context = self.rollup_context(&origin, player_id);
            pins.insert(0, pins::rollup_pin(&per_source, &context));
        }

        Ok(pins)
    }
}

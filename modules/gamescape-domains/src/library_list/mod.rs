//! Library-list domain: the collection of all libraries owned by one
//! player, keyed by the player's internal id.

pub mod pins;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use gamescape_common::{
    node_id, EntityKind, EntityRef, GamescapeError, IdentifierMap, LibraryEntity,
    LibraryListEntity, Namespace, Pin, PinContext, PlayerEntity, PropertyMap, Result,
};
use gamescape_identity::{IdentityStore, Storage};

use crate::dispatch::{resolve_partial, DomainService};
use crate::library;

pub const SELECT_ENDPOINT: &str = "/api/library-list/select";

pub struct LibraryListService {
    store: IdentityStore<LibraryListEntity>,
    players: IdentityStore<PlayerEntity>,
    libraries: IdentityStore<LibraryEntity>,
}

impl LibraryListService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            store: IdentityStore::new(storage.clone()),
            players: IdentityStore::new(storage.clone()),
            libraries: IdentityStore::new(storage),
        }
    }

    fn member_context(&self, list_node_id: &str, player_id: Uuid, source: &str) -> PinContext {
        let mut parameters = PropertyMap::new();
        parameters.insert("player".into(), player_id.to_string().into());
        parameters.insert("library_source".into(), source.into());
        PinContext {
            input_node_id: list_node_id.to_string(),
            input_node_type: EntityKind::LibraryList.node_type().to_string(),
            target_node_type: EntityKind::Library.node_type().to_string(),
            api_endpoint: Some(library::SELECT_ENDPOINT.to_string()),
            api_parameters: parameters,
        }
    }
}

#[async_trait]
impl DomainService for LibraryListService {
    fn kind(&self) -> EntityKind {
        EntityKind::LibraryList
    }

    async fn consume_own(&self, partial: EntityRef) -> Result<(Vec<Pin>, EntityRef)> {
        let requested = partial.kind();
        let EntityRef::LibraryList(partial) = partial else {
            return Err(GamescapeError::Validation(format!(
                "library-list domain cannot resolve a {requested} entity"
            )));
        };

        let mut resolved =
            resolve_partial(&self.store, partial.internal_id, partial.identifiers).await?;
        let list_node_id = node_id(
            EntityKind::LibraryList,
            resolved
                .internal_id
                .expect("resolution assigns an internal id"),
        );

        let player_id = resolved
            .identifiers
            .get(&Namespace::Player)
            .and_then(|v| Uuid::parse_str(v).ok());

        let mut pins = Vec::new();
        let mut dirty = false;

        if let Some(player_id) = player_id {
            if let Some(player) = self.players.get(player_id).await? {
                for namespace in Namespace::platforms() {
                    let Some(account) = player.identifiers.get(namespace) else {
                        continue;
                    };
                    let source = namespace.as_str();

                    // Read-only membership probe: the member record exists
                    // once the library domain has resolved it. Until then
                    // the pin still describes it and defers creation to
                    // expansion.
                    let mut member_identity = IdentifierMap::new();
                    member_identity.insert(*namespace, account.clone());
                    let member = self.libraries.lookup(&member_identity).await?;

                    if let Some(member_id) = member.as_ref().and_then(|m| m.internal_id) {
                        if resolved.libraries.get(source) != Some(&member_id) {
                            resolved.libraries.insert(source.to_string(), member_id);
                            dirty = true;
                        }
                    }

                    let context = self.member_context(&list_node_id, player_id, source);
                    pins.push(pins::member_library_pin(source, member.as_ref(), &context));
                }
            }
        }

        pins.extend(pins::list_summary_pin(&resolved, &list_node_id));

        if dirty {
            self.store.update(&mut resolved).await?;
        }
        Ok((pins, EntityRef::LibraryList(resolved)))
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

        let sources: Vec<&'static str> = Namespace::platforms()
            .iter()
            .filter(|ns| player.identifiers.contains_key(*ns))
            .map(|ns| ns.as_str())
            .collect();
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let origin = node_id(EntityKind::Player, player_id);
        let mut parameters = PropertyMap::new();
        parameters.insert("player".into(), player_id.to_string().into());
        let context = PinContext {
            input_node_id: origin,
            input_node_type: EntityKind::Player.node_type().to_string(),
            target_node_type: EntityKind::LibraryList.node_type().to_string(),
            api_endpoint: Some(SELECT_ENDPOINT.to_string()),
            api_parameters: parameters,
        };
        Ok(vec![pins::all_libraries_pin(&sources, &context)])
    }
}

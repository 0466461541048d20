//! One inbound select/expand request → one graph fragment.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use gamescape_common::{
    node_id, DomainEntity, Edge, EntityKind, EntityRef, GameEntity, GamescapeError,
    GraphMetadata, GraphResponse, IdentifierMap, LibraryEntity, LibraryListEntity, Node,
    PlayerEntity, Position, PropertyMap, Result,
};
use gamescape_domains::{DomainRegistry, PlayerService};

use crate::relations::{origin_node_type, relation_for};
use crate::request::SelectRequest;

pub struct GraphAssembler {
    registry: DomainRegistry,
    players: Arc<PlayerService>,
}

impl GraphAssembler {
    pub fn new(registry: DomainRegistry, players: Arc<PlayerService>) -> Self {
        Self { registry, players }
    }

    /// Resolve the requested entity, gather its own pins plus every other
    /// domain's description of it, and materialize exactly one node (and
    /// one origin edge when the expansion came from somewhere).
    pub async fn select(&self, kind: EntityKind, request: SelectRequest) -> Result<GraphResponse> {
        let identifiers = request.validated_identifiers(kind)?;
        let partial = build_partial(kind, identifiers, request.internal_id);

        let (own_pins, resolved) = self.registry.consume_own(partial).await?;
        let foreign_pins = self.registry.fan_out(&resolved).await;

        let mut pins = own_pins;
        pins.extend(foreign_pins);

        let internal_id = resolved.internal_id().ok_or_else(|| {
            GamescapeError::Storage(format!("{kind} resolution returned no internal id"))
        })?;
        let position = Position {
            x: request.x.unwrap_or_default(),
            y: request.y.unwrap_or_default(),
        };
        let node = Node::for_entity(
            kind,
            internal_id,
            resolved.label(),
            resolved.properties(),
            pins,
            position,
        );

        let mut edges = Vec::new();
        if let Some(origin) = request.origin_node_id.as_deref() {
            let (edge_type, label) = relation_for(origin_node_type(origin), kind);
            edges.push(Edge::connect(origin, node.id.clone(), edge_type, label));
        }

        let mut context = PropertyMap::new();
        context.insert("domain".into(), kind.node_type().into());
        context.insert("internalId".into(), internal_id.to_string().into());
        if let Some(origin) = &request.origin_node_id {
            context.insert("originNodeId".into(), origin.as_str().into());
        }

        info!(
            domain = %kind,
            internal_id = %internal_id,
            pins = node.data.pins.len(),
            edges = edges.len(),
            "Assembled graph fragment"
        );

        Ok(GraphResponse {
            nodes: vec![node],
            edges,
            metadata: GraphMetadata {
                query_type: format!("select-{kind}"),
                query_id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                context,
            },
        })
    }

    /// Convenience form of `select` for `GET .../selectByInternalId`.
    pub async fn select_by_internal_id(
        &self,
        kind: EntityKind,
        internal_id: Uuid,
    ) -> Result<GraphResponse> {
        self.select(kind, SelectRequest::by_internal_id(internal_id))
            .await
    }

    /// Expand a player's friend list: one player node per friend, each
    /// resolved to its canonical record, plus a friend edge from the
    /// requesting player. The one request shape that fans out to many
    /// nodes instead of one.
    pub async fn expand_friends(&self, request: SelectRequest) -> Result<GraphResponse> {
        let identifiers = request.validated_identifiers(EntityKind::Player)?;
        let mut partial = PlayerEntity::from_identifiers(identifiers);
        if let Some(id) = request.internal_id {
            partial.set_internal_id(id);
        }

        let (origin, friends) = self.players.friends_of(partial).await?;
        let origin_internal = origin.internal_id.ok_or_else(|| {
            GamescapeError::Storage("player resolution returned no internal id".to_string())
        })?;
        let origin_node_id = request
            .origin_node_id
            .clone()
            .unwrap_or_else(|| node_id(EntityKind::Player, origin_internal));

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for friend in &friends {
            let Some(friend_internal) = friend.internal_id else {
                continue;
            };
            let node = Node::for_entity(
                EntityKind::Player,
                friend_internal,
                friend.label(),
                friend.properties(),
                Vec::new(),
                Position::default(),
            );
            edges.push(Edge::connect(
                origin_node_id.clone(),
                node.id.clone(),
                "friend_of",
                "Friend",
            ));
            nodes.push(node);
        }

        let mut context = PropertyMap::new();
        context.insert("domain".into(), EntityKind::Player.node_type().into());
        context.insert("internalId".into(), origin_internal.to_string().into());
        context.insert("relation".into(), "friends".into());
        context.insert("friendCount".into(), (nodes.len() as u32).into());

        info!(
            internal_id = %origin_internal,
            friends = nodes.len(),
            "Assembled friends expansion"
        );

        Ok(GraphResponse {
            nodes,
            edges,
            metadata: GraphMetadata {
                query_type: "expand-player-friends".to_string(),
                query_id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                context,
            },
        })
    }
}

fn build_partial(
    kind: EntityKind,
    identifiers: IdentifierMap,
    internal_id: Option<Uuid>,
) -> EntityRef {
    fn with_id<E: DomainEntity>(identifiers: IdentifierMap, internal_id: Option<Uuid>) -> E {
        let mut entity = E::from_identifiers(identifiers);
        if let Some(id) = internal_id {
            entity.set_internal_id(id);
        }
        entity
    }

    match kind {
        EntityKind::Player => {
            EntityRef::Player(with_id::<PlayerEntity>(identifiers, internal_id))
        }
        EntityKind::Library => {
            EntityRef::Library(with_id::<LibraryEntity>(identifiers, internal_id))
        }
        EntityKind::LibraryList => {
            EntityRef::LibraryList(with_id::<LibraryListEntity>(identifiers, internal_id))
        }
        EntityKind::Game => EntityRef::Game(with_id::<GameEntity>(identifiers, internal_id)),
    }
}

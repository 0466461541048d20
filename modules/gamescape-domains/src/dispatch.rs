//! Consume dispatch: domain registration, fan-out, and partial resolution.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use gamescape_common::{
    DomainEntity, EntityKind, EntityRef, GamescapeError, IdentifierMap, Namespace, Pin, Result,
};
use gamescape_identity::IdentityStore;

/// One entity category's implementation of the Consume protocol.
#[async_trait]
pub trait DomainService: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Self-domain consumption: resolve the partial entity through this
    /// domain's identity store, then describe the resolved entity with this
    /// domain's own pins. The only place canonical records are created or
    /// updated. Identity store failures propagate and abort the request.
    async fn consume_own(&self, partial: EntityRef) -> Result<(Vec<Pin>, EntityRef)>;

    /// Foreign entity kinds this domain can describe. A domain with no
    /// relation to a kind simply leaves it out.
    fn foreign_kinds(&self) -> &'static [EntityKind] {
        &[]
    }

    /// Foreign-domain consumption: describe another domain's already-resolved
    /// entity in terms of this domain's data. Strictly read-only: no
    /// canonical record is created or updated here.
    async fn consume_foreign(&self, _entity: &EntityRef) -> Result<Vec<Pin>> {
        Ok(Vec::new())
    }
}

/// Dispatch table over the registered domains. The relation graph is data,
/// not overload resolution: it can be listed and tested.
#[derive(Clone, Default)]
pub struct DomainRegistry {
    services: Vec<Arc<dyn DomainService>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: Arc<dyn DomainService>) -> Self {
        self.services.push(service);
        self
    }

    pub fn service(&self, kind: EntityKind) -> Option<Arc<dyn DomainService>> {
        self.services.iter().find(|s| s.kind() == kind).cloned()
    }

    /// Every (domain, described foreign kind) pair in the table.
    pub fn relations(&self) -> Vec<(EntityKind, EntityKind)> {
        self.services
            .iter()
            .flat_map(|s| {
                s.foreign_kinds()
                    .iter()
                    .map(move |foreign| (s.kind(), *foreign))
            })
            .collect()
    }

    /// Route a partial entity to its own domain for resolution.
    pub async fn consume_own(&self, partial: EntityRef) -> Result<(Vec<Pin>, EntityRef)> {
        let kind = partial.kind();
        let service = self.service(kind).ok_or_else(|| {
            GamescapeError::Validation(format!("no domain registered for {kind}"))
        })?;
        service.consume_own(partial).await
    }

    /// Ask every other domain that knows this entity kind to describe the
    /// resolved entity. Calls run concurrently against the same read-only
    /// entity; each has its own error boundary, so one degraded domain
    /// costs only its own pins, never the request.
    pub async fn fan_out(&self, resolved: &EntityRef) -> Vec<Pin> {
        let kind = resolved.kind();
        let calls = self
            .services
            .iter()
            .filter(|s| s.kind() != kind && s.foreign_kinds().contains(&kind))
            .map(|service| {
                let service = service.clone();
                async move {
                    match service.consume_foreign(resolved).await {
                        Ok(pins) => pins,
                        Err(e) => {
                            warn!(
                                domain = %service.kind(),
                                entity = %kind,
                                error = %e,
                                "Foreign-domain consume degraded to empty pin set"
                            );
                            Vec::new()
                        }
                    }
                }
            });

        join_all(calls).await.into_iter().flatten().collect()
    }
}

/// Resolve a partial entity: external identifiers win and are unioned as
/// usual; a bare internal id is a plain load that must hit an existing
/// record. Supplying both with a disagreeing outcome is a conflict.
pub(crate) async fn resolve_partial<E: DomainEntity>(
    store: &IdentityStore<E>,
    internal_id: Option<uuid::Uuid>,
    identifiers: IdentifierMap,
) -> Result<E> {
    let has_external = identifiers.keys().any(|ns| *ns != Namespace::Internal);

    if has_external {
        let resolved = store.resolve(identifiers).await?;
        if let (Some(requested), Some(actual)) = (internal_id, resolved.internal_id()) {
            if requested != actual {
                return Err(GamescapeError::IdentityConflict {
                    kind: E::KIND,
                    first: requested,
                    second: actual,
                });
            }
        }
        return Ok(resolved);
    }

    let internal_id = internal_id.ok_or_else(|| {
        GamescapeError::Validation(format!(
            "a {} request needs identifiers or an internal id",
            E::KIND
        ))
    })?;
    store
        .get(internal_id)
        .await?
        .ok_or(GamescapeError::NotFound {
            kind: E::KIND,
            id: internal_id,
        })
}

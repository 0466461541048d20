//! Per-domain identity store: external identifiers → canonical records.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use gamescape_common::{
    DomainEntity, GamescapeError, IdentifierMap, Namespace, Result,
};

use crate::storage::Storage;

const RECORD_VISIBILITY_RETRIES: usize = 10;
const RECORD_VISIBILITY_DELAY: Duration = Duration::from_millis(20);

/// Resolves, creates, and updates one domain's canonical entity records.
///
/// Layout in the substrate:
/// - `{kind}:internal:{uuid}` → JSON-encoded record
/// - `{kind}:{namespace}:{value}` → uuid string (reverse index)
///
/// Every (namespace, value) pair maps to at most one internal id, and an
/// internal id never changes or disappears once minted.
pub struct IdentityStore<E: DomainEntity> {
    storage: Arc<dyn Storage>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: DomainEntity> IdentityStore<E> {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            _entity: PhantomData,
        }
    }

    /// Resolve a record by any of the supplied identifiers, creating one if
    /// nothing matches. New identifiers are unioned into an existing record.
    /// Resolving twice with identical input changes nothing but LastUpdated.
    pub async fn resolve(&self, identifiers: IdentifierMap) -> Result<E> {
        let lookup: IdentifierMap = identifiers
            .iter()
            .filter(|(ns, _)| **ns != Namespace::Internal)
            .map(|(ns, v)| (*ns, v.clone()))
            .collect();
        if lookup.is_empty() {
            return Err(GamescapeError::Validation(format!(
                "at least one external identifier is required to resolve a {}",
                E::KIND
            )));
        }

        // Check every supplied identifier, not just the first hit: lookups
        // that disagree mean the identifiers span two canonical records.
        let mut winner: Option<Uuid> = None;
        for (namespace, value) in &lookup {
            let Some(bytes) = self.storage_get(&index_key::<E>(*namespace, value)).await? else {
                continue;
            };
            let id = parse_internal_id(&bytes)?;
            match winner {
                None => winner = Some(id),
                Some(first) if first != id => {
                    return Err(GamescapeError::IdentityConflict {
                        kind: E::KIND,
                        first,
                        second: id,
                    });
                }
                Some(_) => {}
            }
        }

        match winner {
            Some(id) => self.union_into(id, lookup).await,
            None => self.create(lookup).await,
        }
    }

    /// Read-only resolution: find an existing record by any of the supplied
    /// identifiers without ever creating or updating one.
    pub async fn lookup(&self, identifiers: &IdentifierMap) -> Result<Option<E>> {
        let mut winner: Option<Uuid> = None;
        for (namespace, value) in identifiers {
            if *namespace == Namespace::Internal {
                continue;
            }
            let Some(bytes) = self.storage_get(&index_key::<E>(*namespace, value)).await? else {
                continue;
            };
            let id = parse_internal_id(&bytes)?;
            match winner {
                None => winner = Some(id),
                Some(first) if first != id => {
                    return Err(GamescapeError::IdentityConflict {
                        kind: E::KIND,
                        first,
                        second: id,
                    });
                }
                Some(_) => {}
            }
        }
        match winner {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    /// Rewrite an already-resolved record, e.g. after refreshing display
    /// fields. Identifier changes go through `resolve`/`add_identifiers`,
    /// never through here.
    pub async fn update(&self, entity: &mut E) -> Result<()> {
        let internal_id = entity.internal_id().ok_or_else(|| {
            GamescapeError::Validation(format!("cannot update an unresolved {}", E::KIND))
        })?;
        entity.touch();
        self.storage
            .put_many(vec![(record_key::<E>(internal_id), encode(entity)?)])
            .await
            .map_err(|e| GamescapeError::Storage(e.to_string()))
    }

    /// Load a record by its internal id.
    pub async fn get(&self, internal_id: Uuid) -> Result<Option<E>> {
        let Some(bytes) = self.storage_get(&record_key::<E>(internal_id)).await? else {
            return Ok(None);
        };
        let entity: E = serde_json::from_slice(&bytes)
            .map_err(|e| GamescapeError::Storage(format!("corrupt {} record: {e}", E::KIND)))?;
        Ok(Some(entity))
    }

    /// Extend an already-resolved record's identifier set, e.g. when a
    /// foreign-domain consumer later discovers a correlation.
    pub async fn add_identifiers(
        &self,
        internal_id: Uuid,
        identifiers: IdentifierMap,
    ) -> Result<E> {
        // Reject identifiers already claimed by a different record.
        for (namespace, value) in &identifiers {
            if *namespace == Namespace::Internal {
                continue;
            }
            if let Some(bytes) = self.storage_get(&index_key::<E>(*namespace, value)).await? {
                let owner = parse_internal_id(&bytes)?;
                if owner != internal_id {
                    return Err(GamescapeError::IdentityConflict {
                        kind: E::KIND,
                        first: internal_id,
                        second: owner,
                    });
                }
            }
        }
        self.union_into(internal_id, identifiers).await
    }

    // --- internals ---

    /// Load the record behind `internal_id`, union any new identifiers into
    /// it, and persist record + new index entries as one batch.
    async fn union_into(&self, internal_id: Uuid, identifiers: IdentifierMap) -> Result<E> {
        // A concurrent creator claims its first index key before the record
        // batch lands; wait briefly for the record to become visible. An
        // index entry whose record never appears means a batch write was
        // torn. Surface that, don't paper over it.
        let mut entity = None;
        for attempt in 0..RECORD_VISIBILITY_RETRIES {
            if let Some(found) = self.get(internal_id).await? {
                entity = Some(found);
                break;
            }
            if attempt + 1 < RECORD_VISIBILITY_RETRIES {
                tokio::time::sleep(RECORD_VISIBILITY_DELAY).await;
            }
        }
        let mut entity = entity.ok_or_else(|| {
            GamescapeError::Storage(format!(
                "reverse index points at missing {} record {internal_id}",
                E::KIND
            ))
        })?;

        let mut new_indexes: Vec<(String, Vec<u8>)> = Vec::new();
        for (namespace, value) in identifiers {
            if namespace == Namespace::Internal {
                continue;
            }
            if !entity.identifiers().contains_key(&namespace) {
                new_indexes.push((
                    index_key::<E>(namespace, &value),
                    internal_id.to_string().into_bytes(),
                ));
                entity.identifiers_mut().insert(namespace, value);
            }
        }
        entity.touch();

        let mut batch = vec![(record_key::<E>(internal_id), encode(&entity)?)];
        let added = new_indexes.len();
        batch.extend(new_indexes);
        self.storage
            .put_many(batch)
            .await
            .map_err(|e| GamescapeError::Storage(e.to_string()))?;

        if added > 0 {
            debug!(
                kind = %E::KIND,
                internal_id = %internal_id,
                added,
                "Unioned new identifiers into record"
            );
        }
        Ok(entity)
    }

    /// Mint a new record. The first reverse-index key (namespace precedence
    /// order) is claimed with a compare-and-set; losing that race means
    /// someone else minted the record first, so merge into theirs.
    async fn create(&self, identifiers: IdentifierMap) -> Result<E> {
        let internal_id = Uuid::new_v4();
        let (first_ns, first_value) = identifiers
            .iter()
            .next()
            .map(|(ns, v)| (*ns, v.clone()))
            .expect("resolve() rejects empty identifier sets");

        let claim_key = index_key::<E>(first_ns, &first_value);
        let claimed = self
            .storage
            .put_if_absent(&claim_key, internal_id.to_string().into_bytes())
            .await
            .map_err(|e| GamescapeError::Storage(e.to_string()))?;

        if !claimed {
            let bytes = self.storage_get(&claim_key).await?.ok_or_else(|| {
                GamescapeError::Storage(format!("lost claim on {claim_key} but key is empty"))
            })?;
            let winner = parse_internal_id(&bytes)?;
            debug!(
                kind = %E::KIND,
                winner = %winner,
                "Lost creation race, merging into existing record"
            );
            return self.union_into(winner, identifiers).await;
        }

        let mut entity = E::from_identifiers(identifiers.clone());
        entity.set_internal_id(internal_id);
        entity
            .identifiers_mut()
            .insert(Namespace::Internal, internal_id.to_string());
        entity.touch();

        let mut batch = vec![(record_key::<E>(internal_id), encode(&entity)?)];
        for (namespace, value) in &identifiers {
            if *namespace == first_ns || *namespace == Namespace::Internal {
                continue;
            }
            batch.push((
                index_key::<E>(*namespace, value),
                internal_id.to_string().into_bytes(),
            ));
        }
        self.storage
            .put_many(batch)
            .await
            .map_err(|e| GamescapeError::Storage(e.to_string()))?;

        info!(
            kind = %E::KIND,
            internal_id = %internal_id,
            identifiers = identifiers.len(),
            "Created canonical record"
        );
        Ok(entity)
    }

    async fn storage_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.storage
            .get(key)
            .await
            .map_err(|e| GamescapeError::Storage(e.to_string()))
    }
}

fn record_key<E: DomainEntity>(internal_id: Uuid) -> String {
    format!("{}:internal:{internal_id}", E::KIND)
}

fn index_key<E: DomainEntity>(namespace: Namespace, value: &str) -> String {
    format!("{}:{namespace}:{value}", E::KIND)
}

fn encode<E: DomainEntity>(entity: &E) -> Result<Vec<u8>> {
    serde_json::to_vec(entity)
        .map_err(|e| GamescapeError::Storage(format!("record encoding failed: {e}")))
}

fn parse_internal_id(bytes: &[u8]) -> Result<Uuid> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| GamescapeError::Storage("non-utf8 reverse index entry".into()))?;
    Uuid::parse_str(text)
        .map_err(|_| GamescapeError::Storage(format!("malformed reverse index entry: {text}")))
}

//! Integration tests for IdentityStore against the in-memory substrate.

use std::sync::Arc;

use gamescape_common::{DomainEntity, GamescapeError, IdentifierMap, Namespace, PlayerEntity};
use gamescape_identity::{IdentityStore, MemoryStorage, Storage};

fn ids(pairs: &[(Namespace, &str)]) -> IdentifierMap {
    pairs
        .iter()
        .map(|(ns, v)| (*ns, v.to_string()))
        .collect()
}

fn store_on(storage: Arc<MemoryStorage>) -> IdentityStore<PlayerEntity> {
    IdentityStore::new(storage)
}

// ---------------------------------------------------------------------------
// Resolution basics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolve_mints_internal_id_on_first_sight() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    let player = store
        .resolve(ids(&[(Namespace::Steam, "76561197995791208")]))
        .await
        .unwrap();

    let internal_id = player.internal_id.expect("internal id assigned");
    assert_eq!(
        player.identifiers.get(&Namespace::Steam).unwrap(),
        "76561197995791208"
    );
    assert_eq!(
        player.identifiers.get(&Namespace::Internal).unwrap(),
        &internal_id.to_string()
    );

    // Record + one reverse-index entry.
    assert_eq!(storage.keys_with_prefix("player:internal:").len(), 1);
    assert_eq!(storage.keys_with_prefix("player:steam:").len(), 1);
}

#[tokio::test]
async fn resolve_is_idempotent() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    let first = store
        .resolve(ids(&[(Namespace::Steam, "76561197995791208")]))
        .await
        .unwrap();
    let keys_after_first = storage.len();

    let second = store
        .resolve(ids(&[(Namespace::Steam, "76561197995791208")]))
        .await
        .unwrap();

    assert_eq!(first.internal_id, second.internal_id);
    assert_eq!(first.identifiers, second.identifiers);
    // No duplicate reverse-index entries.
    assert_eq!(storage.len(), keys_after_first);
    assert!(second.last_updated >= first.last_updated);
}

#[tokio::test]
async fn resolve_unions_new_identifiers_into_existing_record() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    let first = store
        .resolve(ids(&[(Namespace::Steam, "76561197995791208")]))
        .await
        .unwrap();
    let second = store
        .resolve(ids(&[
            (Namespace::Steam, "76561197995791208"),
            (Namespace::Epic, "epic123"),
        ]))
        .await
        .unwrap();

    assert_eq!(first.internal_id, second.internal_id);
    assert_eq!(second.identifiers.get(&Namespace::Steam).unwrap(), "76561197995791208");
    assert_eq!(second.identifiers.get(&Namespace::Epic).unwrap(), "epic123");

    // The epic identifier is now indexed to the same record.
    let third = store
        .resolve(ids(&[(Namespace::Epic, "epic123")]))
        .await
        .unwrap();
    assert_eq!(third.internal_id, first.internal_id);
}

#[tokio::test]
async fn resolve_rejects_empty_identifier_sets() {
    let store = store_on(Arc::new(MemoryStorage::new()));
    let err = store.resolve(IdentifierMap::new()).await.unwrap_err();
    assert!(matches!(err, GamescapeError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disagreeing_identifiers_are_a_conflict_not_a_merge() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    let a = store
        .resolve(ids(&[(Namespace::Steam, "steam-a")]))
        .await
        .unwrap();
    let b = store
        .resolve(ids(&[(Namespace::Epic, "epic-b")]))
        .await
        .unwrap();
    assert_ne!(a.internal_id, b.internal_id);

    let err = store
        .resolve(ids(&[
            (Namespace::Steam, "steam-a"),
            (Namespace::Epic, "epic-b"),
        ]))
        .await
        .unwrap_err();
    assert!(matches!(err, GamescapeError::IdentityConflict { .. }));
}

#[tokio::test]
async fn add_identifiers_refuses_values_claimed_elsewhere() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    let a = store
        .resolve(ids(&[(Namespace::Steam, "steam-a")]))
        .await
        .unwrap();
    let b = store
        .resolve(ids(&[(Namespace::Steam, "steam-b")]))
        .await
        .unwrap();

    let err = store
        .add_identifiers(b.internal_id.unwrap(), ids(&[(Namespace::Steam, "steam-a")]))
        .await
        .unwrap_err();
    match err {
        GamescapeError::IdentityConflict { first, second, .. } => {
            assert_eq!(first, b.internal_id.unwrap());
            assert_eq!(second, a.internal_id.unwrap());
        }
        other => panic!("expected IdentityConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn add_identifiers_extends_resolved_record() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    let player = store
        .resolve(ids(&[(Namespace::Steam, "steam-a")]))
        .await
        .unwrap();
    let updated = store
        .add_identifiers(
            player.internal_id.unwrap(),
            ids(&[(Namespace::Discord, "disc#1234")]),
        )
        .await
        .unwrap();

    assert_eq!(updated.internal_id, player.internal_id);
    assert_eq!(updated.identifiers.get(&Namespace::Discord).unwrap(), "disc#1234");

    let via_discord = store
        .resolve(ids(&[(Namespace::Discord, "disc#1234")]))
        .await
        .unwrap();
    assert_eq!(via_discord.internal_id, player.internal_id);
}

#[tokio::test]
async fn torn_write_surfaces_as_storage_error() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    // A reverse-index entry with no record behind it: the atomic batch
    // contract was violated. This must abort, not silently re-create.
    storage
        .put_if_absent(
            "player:steam:orphaned",
            uuid::Uuid::new_v4().to_string().into_bytes(),
        )
        .await
        .unwrap();

    let err = store
        .resolve(ids(&[(Namespace::Steam, "orphaned")]))
        .await
        .unwrap_err();
    assert!(matches!(err, GamescapeError::Storage(_)));
}

// ---------------------------------------------------------------------------
// Concurrent creation race
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lost_creation_race_merges_into_winner() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_on(storage.clone());

    // Simulate a concurrent resolver that claimed the reverse-index key
    // between this resolver's lookup (miss) and its create.
    let winner_id = uuid::Uuid::new_v4();
    storage
        .put_if_absent(
            "player:steam:raced",
            winner_id.to_string().into_bytes(),
        )
        .await
        .unwrap();
    // The winner's record exists too, as its own batch would have written.
    let mut winner = PlayerEntity::from_identifiers(ids(&[(Namespace::Steam, "raced")]));
    winner.internal_id = Some(winner_id);
    storage
        .put_many(vec![(
            format!("player:internal:{winner_id}"),
            serde_json::to_vec(&winner).unwrap(),
        )])
        .await
        .unwrap();

    let resolved = store
        .resolve(ids(&[(Namespace::Steam, "raced"), (Namespace::Epic, "late")]))
        .await
        .unwrap();

    // No duplicate record was minted; the extra identifier landed on the winner.
    assert_eq!(resolved.internal_id, Some(winner_id));
    assert_eq!(storage.keys_with_prefix("player:internal:").len(), 1);
    assert_eq!(resolved.identifiers.get(&Namespace::Epic).unwrap(), "late");
}

#[tokio::test]
async fn concurrent_resolves_converge_on_one_record() {
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(store_on(storage.clone()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .resolve(ids(&[(Namespace::Steam, "contended")]))
                .await
                .unwrap()
        }));
    }

    let mut internal_ids = Vec::new();
    for handle in handles {
        internal_ids.push(handle.await.unwrap().internal_id.unwrap());
    }
    internal_ids.sort();
    internal_ids.dedup();
    assert_eq!(internal_ids.len(), 1, "all resolvers must agree on one record");
    assert_eq!(storage.keys_with_prefix("player:internal:").len(), 1);
}

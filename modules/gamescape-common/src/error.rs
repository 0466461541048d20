use thiserror::Error;
use uuid::Uuid;

use crate::types::EntityKind;

#[derive(Error, Debug)]
pub enum GamescapeError {
    /// The persistence substrate is unreachable or failed mid-write.
    /// Never swallowed: aborts the enclosing request.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Supplied identifiers resolve to two different canonical records.
    #[error("Identity conflict in {kind} domain: {first} vs {second}")]
    IdentityConflict {
        kind: EntityKind,
        first: Uuid,
        second: Uuid,
    },

    #[error("No {kind} record for internal id {id}")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("Validation error: {0}")]
    Validation(String),

    /// An upstream provider failed or timed out. Caught at the pin
    /// generation boundary and degraded to an empty pin set.
    #[error("Upstream provider unavailable: {0}")]
    Upstream(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GamescapeError>;

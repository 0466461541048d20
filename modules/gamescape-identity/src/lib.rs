//! Identity resolution over a key-value substrate.
//!
//! Each domain gets an [`IdentityStore`] mapping external identifiers to
//! canonical records. Records and their reverse-index entries are written
//! as one atomic batch; concurrent first-time resolution is serialized by
//! a compare-and-set claim on the first reverse-index key.

pub mod storage;
pub mod store;

pub use storage::{MemoryStorage, PgStorage, Storage};
pub use store::IdentityStore;

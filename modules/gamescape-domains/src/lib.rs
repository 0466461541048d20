//! The Consume protocol: domain services describe their own entities
//! (resolve + enrich) and each other's entities (read-only pins), linked
//! through an explicit dispatch table instead of a static graph schema.

pub mod dispatch;
pub mod game;
pub mod library;
pub mod library_list;
pub mod player;

pub use dispatch::{DomainRegistry, DomainService};
pub use game::GameService;
pub use library::LibraryService;
pub use library_list::LibraryListService;
pub use player::PlayerService;

pub mod config;
pub mod error;
pub mod graph;
pub mod types;

pub use config::Config;
pub use error::{GamescapeError, Result};
pub use graph::*;
pub use types::*;

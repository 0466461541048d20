//! Explorer-client graph store: accumulated nodes/edges/metadata as one
//! immutable value, replaced wholesale on every transition. The merge laws
//! here are what make repeated server fragments safe to apply in any order.

pub mod expand;
pub mod state;

pub use expand::{expansion_request, ExpansionRequest};
pub use state::GraphState;

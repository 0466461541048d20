//! Request-time graph assembly: one resolved entity in, one self-contained
//! mergeable graph fragment out.

pub mod assembler;
pub mod relations;
pub mod request;

pub use assembler::GraphAssembler;
pub use request::SelectRequest;

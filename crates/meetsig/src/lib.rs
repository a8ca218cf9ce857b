//! Top-level facade crate for meetsig.
//!
//! Re-exports the envelope/error primitives and the signaling gateway so
//! embedders can depend on a single crate.

pub mod core {
    pub use meetsig_core::*;
}

pub mod gateway {
    pub use meetsig_gateway::*;
}

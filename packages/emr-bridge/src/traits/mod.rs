//! Collaborator traits.
//!
//! Every network-facing dependency of the core sits behind one of these so the
//! pipeline, broker and executor can be driven by in-process mocks.

pub mod clock;
pub mod fetcher;
pub mod generator;
pub mod searcher;
pub mod store;
pub mod transport;

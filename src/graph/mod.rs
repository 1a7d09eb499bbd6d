//! Graph data structures and operations.
//!
//! This module provides the particle graph of a route map: one node and one
//! label particle per location and a chain of edge segment particles per
//! connection, stored in a petgraph StableGraph whose directed edges record
//! which particle is attracted to which.

mod chain;
mod edit;
mod engine;
mod key;
mod persist;

pub use engine::ParticleGraph;
pub use key::{ConnectionKey, EdgeKey, GraphExtent, Location, Path};
pub use persist::{GraphDocument, GraphRecord, KindRecord, ParticleRecord};

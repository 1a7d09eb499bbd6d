//! Spatial indexing for O(log n) hit testing.
//!
//! This module provides an R-tree based spatial index for picking particles
//! by point or rectangle. The simulation itself never uses it: interactions
//! are evaluated exhaustively.

mod rtree;

pub use rtree::{ParticleBox, SpatialIndex};

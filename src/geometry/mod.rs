//! Planar geometry for the particle simulation.
//!
//! Particles are oriented rectangles. Repulsion is driven by the overlap
//! polygon of two rectangles, and every force is split into a translational
//! part and a torque around the particle's center.

mod forces;
mod polygon;

pub use forces::{Force, SplitForce, attraction_from_distance, split_force, unit_towards};
pub use polygon::{Overlap, clip_convex, oriented_corners, overlap, polygon_overlap};

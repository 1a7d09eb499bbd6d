//! R-tree based spatial index using the rstar crate.
//!
//! Particles are indexed by the axis-aligned envelope of their oriented
//! bounding box. Provides O(log n) queries for:
//! - Particles under a point (exact oriented-box test after the envelope hit)
//! - Rectangle intersection

use glam::DVec2;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::particle::{Particle, ParticleId};

/// A particle footprint in the spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleBox {
    /// The particle identifier.
    pub id: ParticleId,
    /// Center of the particle.
    pub center: DVec2,
    /// Oriented bounding-box corners, counter-clockwise.
    pub corners: [DVec2; 4],
}

impl ParticleBox {
    /// Create a box from a particle's current state.
    pub fn of(particle: &Particle) -> Self {
        Self {
            id: particle.id(),
            center: particle.position(),
            corners: *particle.body().corners(),
        }
    }

    /// Whether `point` lies inside the oriented box (boundary included).
    pub fn contains(&self, point: DVec2) -> bool {
        (0..4).all(|i| {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            (b - a).perp_dot(point - a) >= 0.0
        })
    }
}

impl RTreeObject for ParticleBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let points: Vec<[f64; 2]> = self.corners.iter().map(|c| [c.x, c.y]).collect();
        AABB::from_points(points.iter())
    }
}

impl PointDistance for ParticleBox {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.center.distance_squared(DVec2::new(point[0], point[1]))
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.contains(DVec2::new(point[0], point[1]))
    }
}

/// Spatial index over particle bounding boxes.
///
/// Uses an R*-tree for efficient spatial queries.
pub struct SpatialIndex {
    tree: RTree<ParticleBox>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Particle under `point`, preferring the one whose center is closest.
    pub fn at_point(&self, x: f64, y: f64) -> Option<ParticleId> {
        let point = [x, y];
        self.tree
            .locate_all_at_point(&point)
            .min_by(|a, b| a.distance_2(&point).total_cmp(&b.distance_2(&point)))
            .map(|particle| particle.id)
    }

    /// All particles whose envelope intersects the rectangle.
    pub fn in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<ParticleId> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|particle| particle.id)
            .collect()
    }

    /// Replace the index contents with `particles`, bulk loaded.
    pub fn rebuild<'a>(&mut self, particles: impl IntoIterator<Item = &'a Particle>) {
        let boxes: Vec<_> = particles.into_iter().map(ParticleBox::of).collect();
        self.tree = RTree::bulk_load(boxes);
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{EdgeParticle, NodeParticle, ParticleParameters};
    use std::f64::consts::FRAC_PI_4;

    fn node(id: u32, x: f64, y: f64) -> Particle {
        NodeParticle::particle(ParticleId(id), "A", DVec2::new(x, y), &ParticleParameters::default())
    }

    fn index_of(particles: &[Particle]) -> SpatialIndex {
        let mut index = SpatialIndex::new();
        index.rebuild(particles);
        index
    }

    #[test]
    fn test_at_point() {
        let index = index_of(&[node(0, 0.0, 0.0), node(1, 10.0, 10.0), node(2, 5.0, 5.0)]);

        assert_eq!(index.at_point(0.2, -0.3), Some(ParticleId(0)));
        assert_eq!(index.at_point(5.4, 5.4), Some(ParticleId(2)));
        assert_eq!(index.at_point(3.0, 3.0), None);
    }

    #[test]
    fn test_rotated_box_is_tested_exactly() {
        let params = ParticleParameters::default();
        let edge = EdgeParticle::new("red", "A", "B", 0, 0, &params).into_particle(
            ParticleId(7),
            DVec2::ZERO,
            FRAC_PI_4,
            &params,
        );
        let index = index_of(&[edge]);

        // Along the slab diagonal: inside.
        assert_eq!(index.at_point(1.0, 1.0), Some(ParticleId(7)));
        // Inside the envelope but off the slab.
        assert_eq!(index.at_point(1.0, -1.0), None);
    }

    #[test]
    fn test_overlapping_boxes_prefer_nearest_center() {
        let index = index_of(&[node(0, 0.0, 0.0), node(1, 0.6, 0.0)]);
        assert_eq!(index.at_point(0.45, 0.0), Some(ParticleId(1)));
        assert_eq!(index.at_point(0.15, 0.0), Some(ParticleId(0)));
    }

    #[test]
    fn test_in_rect() {
        let index = index_of(&[node(0, 0.0, 0.0), node(1, 5.0, 5.0), node(2, 10.0, 10.0)]);

        let in_rect = index.in_rect(-1.0, -1.0, 6.0, 6.0);
        assert_eq!(in_rect.len(), 2);
        assert!(in_rect.contains(&ParticleId(0)));
        assert!(in_rect.contains(&ParticleId(1)));
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = index_of(&[node(0, 0.0, 0.0)]);
        index.rebuild(&[node(1, 1.0, 1.0), node(2, 2.0, 2.0), node(3, 3.0, 3.0)]);
        assert_eq!(index.at_point(0.0, 0.0), None);
        assert_eq!(index.at_point(1.0, 1.0), Some(ParticleId(1)));
        assert_eq!(index.in_rect(-5.0, -5.0, 5.0, 5.0).len(), 3);
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::default();
        assert_eq!(index.at_point(0.0, 0.0), None);
        assert!(index.in_rect(-1.0, -1.0, 1.0, 1.0).is_empty());
    }
}

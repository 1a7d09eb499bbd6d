//! Edge segment particle and related structures.
//!
//! A path between two locations is realized as a chain of fixed-size
//! slabs. Each segment has:
//! - The two location names of its path, sorted alphabetically
//! - Its position in the chain (`path_index`)
//! - A `connection_index` telling parallel chains apart
//!
//! Segments dock end to end: attraction acts between the midpoints of the
//! short sides of neighboring slabs rather than between their centers.

use glam::DVec2;

use super::{Behavior, BodyParams, Particle, ParticleId, ParticleKind, ParticleParameters, ParticleType, RigidBody};
use crate::error::GraphError;
use crate::geometry::{self, Force};

/// Default bounding box of an edge segment (length, thickness).
pub const DEFAULT_EDGE_SIZE: DVec2 = DVec2::new(3.2, 0.8);

/// Default segment border color.
pub const DEFAULT_BORDER_COLOR: &str = "#555555";

/// Side lengths within this of the short dimension count as short sides.
const SHORT_SIDE_TOLERANCE: f64 = 1e-8;

/// One segment of a path between two locations.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeParticle {
    /// Fill color; also the color of the path.
    pub color: String,
    /// Border color.
    pub border_color: String,
    /// Alphabetically first location of the path.
    pub location_1: String,
    /// Alphabetically second location of the path.
    pub location_2: String,
    /// Position of this segment in its chain, counting from 0.
    pub path_index: u32,
    /// Index of the chain among parallel chains between the same locations.
    pub connection_index: u32,
    /// Strength of the pull towards a neighboring node.
    pub node_attraction: f64,
    /// Strength of the pull towards a neighboring segment.
    pub edge_attraction: f64,
    /// Image drawn instead of a flat rectangle, if in image mode.
    pub image_file_path: Option<String>,
    /// Image taking priority over `image_file_path`.
    pub image_override_path: Option<String>,
}

impl EdgeParticle {
    /// Create segment data. Location names are stored sorted.
    pub fn new(
        color: impl Into<String>,
        location_1: impl Into<String>,
        location_2: impl Into<String>,
        path_index: u32,
        connection_index: u32,
        params: &ParticleParameters,
    ) -> Self {
        let (location_1, location_2) = sorted_pair(location_1.into(), location_2.into());
        Self {
            color: color.into(),
            border_color: DEFAULT_BORDER_COLOR.to_string(),
            location_1,
            location_2,
            path_index,
            connection_index,
            node_attraction: params.edge_node,
            edge_attraction: params.edge_edge,
            image_file_path: None,
            image_override_path: None,
        }
    }

    /// Wrap segment data into a particle at `position` with `rotation`.
    pub fn into_particle(
        self,
        id: ParticleId,
        position: DVec2,
        rotation: f64,
        params: &ParticleParameters,
    ) -> Particle {
        let body_params = BodyParams {
            mass: params.edge_mass,
            interaction_radius: params.interaction_radius,
            velocity_decay: params.velocity_decay,
            angular_velocity_decay: params.velocity_decay,
            repulsion_strength: params.repulsion_strength,
        };
        let body = RigidBody::new(position, rotation, DEFAULT_EDGE_SIZE, body_params);
        Particle::new(id, body, ParticleKind::Edge(self))
    }

    /// Image to draw, preferring the override.
    pub fn image(&self) -> Option<&str> {
        self.image_override_path
            .as_deref()
            .or(self.image_file_path.as_deref())
    }

    fn edge_attraction_force(&self, body: &RigidBody, other: &RigidBody) -> Force {
        let own = docking_points(body);
        let theirs = docking_points(other);

        let mut closest = (own[0], theirs[0]);
        let mut min_distance = f64::INFINITY;
        for &p in &own {
            for &q in &theirs {
                let distance = p.distance(q);
                if distance < min_distance {
                    min_distance = distance;
                    closest = (p, q);
                }
            }
        }

        self.pull(closest.0, closest.1, self.edge_attraction)
    }

    fn node_attraction_force(&self, body: &RigidBody, node: &RigidBody) -> Force {
        let target = node.position();
        let [a, b] = docking_points(body);
        let anchor = if a.distance(target) <= b.distance(target) { a } else { b };
        self.pull(anchor, target, self.node_attraction)
    }

    fn pull(&self, anchor: DVec2, target: DVec2, strength: f64) -> Force {
        match geometry::unit_towards(anchor, target) {
            Some((direction, distance)) => Force::new(
                direction * strength * geometry::attraction_from_distance(distance),
                anchor,
            ),
            None => Force::zero(anchor),
        }
    }
}

impl Behavior for EdgeParticle {
    fn attraction_to(&self, body: &RigidBody, target: &Particle) -> Result<Force, GraphError> {
        match target.kind() {
            ParticleKind::Edge(_) => Ok(self.edge_attraction_force(body, target.body())),
            ParticleKind::Node(_) => Ok(self.node_attraction_force(body, target.body())),
            ParticleKind::Label(_) => Err(GraphError::TypeKind {
                id: target.id(),
                expected: "node or edge",
                found: ParticleType::Label,
            }),
        }
    }

    fn apply_parameters(&mut self, body: &mut RigidBody, params: &ParticleParameters) {
        self.node_attraction = params.edge_node;
        self.edge_attraction = params.edge_edge;
        let body_params = body.params_mut();
        body_params.mass = params.edge_mass;
        body_params.interaction_radius = params.interaction_radius;
        body_params.velocity_decay = params.velocity_decay;
        body_params.angular_velocity_decay = params.velocity_decay;
        body_params.repulsion_strength = params.repulsion_strength;
    }

    fn color(&self) -> &str {
        &self.color
    }
}

/// Midpoints of the two short sides of a body's bounding box.
///
/// Opposite sides are taken as a pair, so a square body still yields two
/// points on opposite ends.
pub fn docking_points(body: &RigidBody) -> [DVec2; 2] {
    let corners = body.corners();
    let short = body.size().min_element();
    let midpoint = |i: usize| (corners[i] + corners[(i + 1) % 4]) * 0.5;

    if (corners[0].distance(corners[1]) - short).abs() < SHORT_SIDE_TOLERANCE {
        [midpoint(0), midpoint(2)]
    } else {
        [midpoint(1), midpoint(3)]
    }
}

/// Sort two location names alphabetically.
pub fn sorted_pair(a: String, b: String) -> (String, String) {
    if a > b { (b, a) } else { (a, b) }
}

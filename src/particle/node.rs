//! Node particle and related structures.
//!
//! Nodes are the named locations of the graph. Each node has:
//! - A unique location name (shared with its label)
//! - A display color and optional override image
//! - An optional target position it relaxes towards
//!
//! Nodes are never pulled towards other particles. Labels and edge segments
//! chase nodes, not the other way round.

use glam::DVec2;

use super::{Behavior, BodyParams, Particle, ParticleId, ParticleKind, ParticleParameters, RigidBody};
use crate::error::GraphError;
use crate::geometry::Force;

/// Default bounding-box edge length of a node.
pub const DEFAULT_NODE_SIZE: f64 = 1.0;

/// Default node fill color.
pub const DEFAULT_NODE_COLOR: &str = "#222222";

/// Location particle.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeParticle {
    /// Location name.
    pub label: String,
    /// Fill color.
    pub color: String,
    /// Image drawn instead of the plain node, if any.
    pub image_path: Option<String>,
}

impl NodeParticle {
    /// Create node data with the default color.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: DEFAULT_NODE_COLOR.to_string(),
            image_path: None,
        }
    }

    /// Create a complete node particle at `position` using `params`.
    pub fn particle(
        id: ParticleId,
        label: impl Into<String>,
        position: DVec2,
        params: &ParticleParameters,
    ) -> Particle {
        let body_params = BodyParams {
            mass: params.node_mass,
            interaction_radius: params.interaction_radius,
            velocity_decay: params.velocity_decay,
            angular_velocity_decay: params.velocity_decay,
            repulsion_strength: params.repulsion_strength,
        };
        let mut body = RigidBody::new(
            position,
            0.0,
            DVec2::splat(DEFAULT_NODE_SIZE),
            body_params,
        );
        body.set_target_attraction(params.node_target);
        Particle::new(id, body, ParticleKind::Node(Self::new(label)))
    }
}

impl Behavior for NodeParticle {
    fn attraction_to(&self, body: &RigidBody, _target: &Particle) -> Result<Force, GraphError> {
        Ok(Force::zero(body.position()))
    }

    fn apply_parameters(&mut self, body: &mut RigidBody, params: &ParticleParameters) {
        let body_params = body.params_mut();
        body_params.mass = params.node_mass;
        body_params.interaction_radius = params.interaction_radius;
        body_params.velocity_decay = params.velocity_decay;
        body_params.repulsion_strength = params.repulsion_strength;
        body.set_target_attraction(params.node_target);
    }

    fn color(&self) -> &str {
        &self.color
    }
}

//! Particles of the layout simulation.
//!
//! Every particle is a [`RigidBody`] plus one of three behaviors:
//! - **Node**: a named location, pulled only towards its target position
//! - **Label**: a location's text, pulled towards its node
//! - **Edge**: one segment of a path, docked to its chain neighbors
//!
//! Which particles attract which is stored by the graph, not here; the
//! particle only answers how strongly it is pulled towards a given target.

mod body;
mod edge;
mod label;
mod node;
mod params;
pub mod text;

use std::fmt;

use glam::DVec2;

pub use body::{BodyParams, DEFAULT_TARGET_ATTRACTION, Interaction, RigidBody};
pub use edge::{DEFAULT_BORDER_COLOR, DEFAULT_EDGE_SIZE, EdgeParticle, docking_points, sorted_pair};
pub use label::{DEFAULT_FONT_SIZE, DEFAULT_LABEL_COLOR, LabelParticle};
pub use node::{DEFAULT_NODE_COLOR, DEFAULT_NODE_SIZE, NodeParticle};
pub use params::ParticleParameters;

use crate::error::GraphError;
use crate::geometry::Force;

/// Stable particle identifier.
///
/// Ids are unique for the lifetime of a graph and are what the persisted
/// document uses to express links between particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleId(pub u32);

impl ParticleId {
    /// Create a new ParticleId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Particle({})", self.0)
    }
}

impl From<u32> for ParticleId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ParticleId> for u32 {
    #[inline]
    fn from(id: ParticleId) -> Self {
        id.0
    }
}

/// Kind tag of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleType {
    Node,
    Label,
    Edge,
}

impl fmt::Display for ParticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticleType::Node => f.write_str("node"),
            ParticleType::Label => f.write_str("label"),
            ParticleType::Edge => f.write_str("edge"),
        }
    }
}

/// The parts of particle behavior that differ between kinds.
pub trait Behavior {
    /// Attraction force this particle feels towards `target`, which is one
    /// of its attraction targets. `body` is this particle's own body.
    fn attraction_to(&self, body: &RigidBody, target: &Particle) -> Result<Force, GraphError>;

    /// Apply the subset of `params` this kind uses.
    fn apply_parameters(&mut self, body: &mut RigidBody, params: &ParticleParameters);

    /// Fill color used when drawing.
    fn color(&self) -> &str;
}

/// Kind-specific particle data.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleKind {
    Node(NodeParticle),
    Label(LabelParticle),
    Edge(EdgeParticle),
}

impl ParticleKind {
    fn behavior(&self) -> &dyn Behavior {
        match self {
            ParticleKind::Node(node) => node,
            ParticleKind::Label(label) => label,
            ParticleKind::Edge(edge) => edge,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn Behavior {
        match self {
            ParticleKind::Node(node) => node,
            ParticleKind::Label(label) => label,
            ParticleKind::Edge(edge) => edge,
        }
    }
}

/// A particle: identity, rigid body and kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    id: ParticleId,
    body: RigidBody,
    kind: ParticleKind,
}

impl Particle {
    /// Create a particle from its parts.
    pub fn new(id: ParticleId, body: RigidBody, kind: ParticleKind) -> Self {
        Self { id, body, kind }
    }

    #[inline]
    pub fn id(&self) -> ParticleId {
        self.id
    }

    #[inline]
    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut RigidBody {
        &mut self.body
    }

    #[inline]
    pub fn kind(&self) -> &ParticleKind {
        &self.kind
    }

    #[inline]
    pub fn kind_mut(&mut self) -> &mut ParticleKind {
        &mut self.kind
    }

    /// Body and kind borrowed mutably at once.
    pub fn parts_mut(&mut self) -> (&mut RigidBody, &mut ParticleKind) {
        (&mut self.body, &mut self.kind)
    }

    #[inline]
    pub fn position(&self) -> DVec2 {
        self.body.position()
    }

    #[inline]
    pub fn rotation(&self) -> f64 {
        self.body.rotation()
    }

    /// Kind tag of this particle.
    pub fn particle_type(&self) -> ParticleType {
        match self.kind {
            ParticleKind::Node(_) => ParticleType::Node,
            ParticleKind::Label(_) => ParticleType::Label,
            ParticleKind::Edge(_) => ParticleType::Edge,
        }
    }

    pub fn as_node(&self) -> Option<&NodeParticle> {
        match &self.kind {
            ParticleKind::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut NodeParticle> {
        match &mut self.kind {
            ParticleKind::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&LabelParticle> {
        match &self.kind {
            ParticleKind::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn as_label_mut(&mut self) -> Option<&mut LabelParticle> {
        match &mut self.kind {
            ParticleKind::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeParticle> {
        match &self.kind {
            ParticleKind::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_edge_mut(&mut self) -> Option<&mut EdgeParticle> {
        match &mut self.kind {
            ParticleKind::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    /// Fill color used when drawing.
    pub fn color(&self) -> &str {
        self.kind.behavior().color()
    }

    /// Zero the accumulated accelerations.
    pub fn reset_acceleration(&mut self) {
        self.body.reset_acceleration();
    }

    /// Acceleration this particle receives from `other`.
    ///
    /// Zero if `other` is outside this particle's interaction radius.
    /// Otherwise overlap repulsion always applies, and attraction applies
    /// when `attracted` says `other` is one of this particle's attraction
    /// targets. The relation is asymmetric: each ordered pair must be
    /// evaluated separately.
    pub fn interaction(&self, other: &Particle, attracted: bool) -> Result<Interaction, GraphError> {
        if !self.body.in_range(&other.body) {
            return Ok(Interaction::default());
        }

        let repulsion = self.body.repulsion_from(&other.body);
        let attraction = if attracted {
            self.kind.behavior().attraction_to(&self.body, other)?
        } else {
            Force::zero(self.body.position())
        };

        Ok(self.body.respond(repulsion, attraction))
    }

    /// Accumulate the interaction with `other` into this particle's
    /// accelerations.
    pub fn interact(&mut self, other: &Particle, attracted: bool) -> Result<(), GraphError> {
        let interaction = self.interaction(other, attracted)?;
        self.body.accelerate(interaction);
        Ok(())
    }

    /// Integrate one time step; returns the distance moved.
    pub fn update(&mut self, dt: f64) -> f64 {
        self.body.update(dt)
    }

    /// Apply the parameters relevant to this particle's kind.
    pub fn apply_parameters(&mut self, params: &ParticleParameters) {
        let (body, kind) = (&mut self.body, &mut self.kind);
        kind.behavior_mut().apply_parameters(body, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32, x: f64, y: f64) -> Particle {
        NodeParticle::particle(ParticleId(id), "A", DVec2::new(x, y), &ParticleParameters::default())
    }

    #[test]
    fn test_particle_id() {
        let id = ParticleId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "Particle(42)");
        let raw: u32 = ParticleId::from(7).into();
        assert_eq!(raw, 7);
    }

    #[test]
    fn test_out_of_radius_is_zero() {
        let mut a = node(1, 0.0, 0.0);
        let b = node(2, 100.0, 0.0);
        a.interact(&b, true).unwrap();
        assert_eq!(a.body().acceleration(), DVec2::ZERO);
        assert_eq!(a.body().angular_acceleration(), 0.0);
    }

    #[test]
    fn test_overlapping_nodes_push_apart() {
        let mut a = node(1, 0.0, 0.0);
        let mut b = node(2, 0.5, 0.0);
        let a_snapshot = a.clone();
        a.interact(&b, false).unwrap();
        b.interact(&a_snapshot, false).unwrap();
        assert!(a.body().acceleration().x < 0.0);
        assert!(b.body().acceleration().x > 0.0);
    }

    #[test]
    fn test_apply_parameters_dispatches_by_kind() {
        let mut a = node(1, 0.0, 0.0);
        let params = ParticleParameters {
            node_mass: 4.0,
            node_target: 0.5,
            ..ParticleParameters::default()
        };
        a.apply_parameters(&params);
        assert_eq!(a.body().mass(), 4.0);
        assert_eq!(a.body().target_attraction(), 0.5);
    }
}

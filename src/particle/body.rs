//! Rigid-body state shared by every particle kind.
//!
//! A body is an oriented rectangle with position, rotation, linear and
//! angular velocity. Forces accumulate into the acceleration terms between
//! [`RigidBody::reset_acceleration`] and [`RigidBody::update`].

use std::ops::AddAssign;

use glam::DVec2;

use crate::geometry::{self, Force};

/// Default pull strength towards a body's target position.
pub const DEFAULT_TARGET_ATTRACTION: f64 = 0.001;

/// Simulation parameters a body carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyParams {
    /// Mass of the body.
    pub mass: f64,
    /// Maximum center distance at which this body reacts to another.
    pub interaction_radius: f64,
    /// Factor applied to the velocity after each update (scaled by `dt`).
    pub velocity_decay: f64,
    /// Factor applied to the angular velocity after each update (scaled by `dt`).
    pub angular_velocity_decay: f64,
    /// Scale of the overlap repulsion.
    pub repulsion_strength: f64,
}

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            interaction_radius: 5.0,
            velocity_decay: 0.9999,
            angular_velocity_decay: 0.9999,
            repulsion_strength: 1.0,
        }
    }
}

/// Acceleration contributed by one interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Interaction {
    /// Linear acceleration.
    pub acceleration: DVec2,
    /// Angular acceleration.
    pub angular_acceleration: f64,
}

impl Interaction {
    /// True if this interaction contributes nothing.
    pub fn is_zero(&self) -> bool {
        self.acceleration == DVec2::ZERO && self.angular_acceleration == 0.0
    }
}

impl AddAssign for Interaction {
    fn add_assign(&mut self, other: Self) {
        self.acceleration += other.acceleration;
        self.angular_acceleration += other.angular_acceleration;
    }
}

/// An oriented-rectangle rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    position: DVec2,
    rotation: f64,
    velocity: DVec2,
    angular_velocity: f64,
    acceleration: DVec2,
    angular_acceleration: f64,
    size: DVec2,
    params: BodyParams,
    target_position: Option<DVec2>,
    target_attraction: f64,
    corners: [DVec2; 4],
}

impl RigidBody {
    /// Create a body at rest.
    pub fn new(position: DVec2, rotation: f64, size: DVec2, params: BodyParams) -> Self {
        Self {
            position,
            rotation,
            velocity: DVec2::ZERO,
            angular_velocity: 0.0,
            acceleration: DVec2::ZERO,
            angular_acceleration: 0.0,
            size,
            params,
            target_position: None,
            target_attraction: DEFAULT_TARGET_ATTRACTION,
            corners: geometry::oriented_corners(position, size, rotation),
        }
    }

    #[inline]
    pub fn position(&self) -> DVec2 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    #[inline]
    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    #[inline]
    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    #[inline]
    pub fn acceleration(&self) -> DVec2 {
        self.acceleration
    }

    #[inline]
    pub fn angular_acceleration(&self) -> f64 {
        self.angular_acceleration
    }

    /// Bounding-box width and height.
    #[inline]
    pub fn size(&self) -> DVec2 {
        self.size
    }

    /// Bounding-box corners in counter-clockwise order.
    #[inline]
    pub fn corners(&self) -> &[DVec2; 4] {
        &self.corners
    }

    #[inline]
    pub fn params(&self) -> &BodyParams {
        &self.params
    }

    /// Mutable access to the simulation parameters. None of them affect the
    /// bounding box, so no recomputation is needed.
    #[inline]
    pub fn params_mut(&mut self) -> &mut BodyParams {
        &mut self.params
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.params.mass
    }

    /// Moment of inertia of a uniform rectangle with this mass and size.
    pub fn inertia(&self) -> f64 {
        self.params.mass * (self.size.x * self.size.x + self.size.y * self.size.y) / 12.0
    }

    #[inline]
    pub fn target_position(&self) -> Option<DVec2> {
        self.target_position
    }

    #[inline]
    pub fn target_attraction(&self) -> f64 {
        self.target_attraction
    }

    pub fn set_target_position(&mut self, target: Option<DVec2>) {
        self.target_position = target;
    }

    pub fn set_target_attraction(&mut self, strength: f64) {
        self.target_attraction = strength;
    }

    /// Move the body, keeping its bounding box in sync.
    pub fn set_position(&mut self, position: DVec2) {
        self.position = position;
        self.update_bounding_box();
    }

    /// Rotate the body, keeping its bounding box in sync.
    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
        self.update_bounding_box();
    }

    /// Resize the body, keeping its bounding box in sync.
    pub fn set_size(&mut self, size: DVec2) {
        self.size = size;
        self.update_bounding_box();
    }

    /// Overwrite the velocities, e.g. when restoring a saved state.
    pub fn set_velocity(&mut self, velocity: DVec2, angular_velocity: f64) {
        self.velocity = velocity;
        self.angular_velocity = angular_velocity;
    }

    /// Stop all motion.
    pub fn halt(&mut self) {
        self.velocity = DVec2::ZERO;
        self.angular_velocity = 0.0;
        self.reset_acceleration();
    }

    fn update_bounding_box(&mut self) {
        self.corners = geometry::oriented_corners(self.position, self.size, self.rotation);
    }

    /// Zero the accumulated accelerations. Called once per tick before any
    /// interaction.
    pub fn reset_acceleration(&mut self) {
        self.acceleration = DVec2::ZERO;
        self.angular_acceleration = 0.0;
    }

    /// Add an interaction to the accumulated accelerations.
    pub fn accelerate(&mut self, interaction: Interaction) {
        self.acceleration += interaction.acceleration;
        self.angular_acceleration += interaction.angular_acceleration;
    }

    /// Whether `other` is close enough for this body to react to it.
    #[inline]
    pub fn in_range(&self, other: &RigidBody) -> bool {
        self.position.distance(other.position) <= self.params.interaction_radius
    }

    /// Repulsion from `other`, proportional to the area the two boxes share
    /// and pointing from the overlap centroid back towards this body.
    pub fn repulsion_from(&self, other: &RigidBody) -> Force {
        match geometry::overlap(&self.corners, &other.corners) {
            Some(shared) => Force::new(
                -(shared.centroid - self.position) * shared.area,
                shared.centroid,
            ),
            None => Force::zero(self.position),
        }
    }

    /// Acceleration caused by `repulsion` and `attraction` acting on this
    /// body.
    pub fn respond(&self, repulsion: Force, attraction: Force) -> Interaction {
        let repulsion = geometry::split_force(repulsion.vector, repulsion.anchor, self.position);
        let attraction = geometry::split_force(attraction.vector, attraction.anchor, self.position);

        let strength = self.params.repulsion_strength;
        let linear = strength * repulsion.radial + attraction.radial;
        let torque = strength * repulsion.torque + attraction.torque;

        let inertia = self.inertia();
        Interaction {
            acceleration: linear / self.params.mass,
            angular_acceleration: if inertia > 0.0 { torque / inertia } else { 0.0 },
        }
    }

    /// True if the body is at rest with nothing pushing it.
    pub fn is_asleep(&self) -> bool {
        self.velocity == DVec2::ZERO
            && self.acceleration == DVec2::ZERO
            && self.angular_velocity == 0.0
            && self.angular_acceleration == 0.0
    }

    /// Integrate one time step and return the distance moved.
    ///
    /// Sleeping bodies are skipped entirely. Decay factors are multiplied by
    /// `dt`, so damping strength depends on the step size.
    pub fn update(&mut self, dt: f64) -> f64 {
        if self.is_asleep() {
            return 0.0;
        }

        if let Some(target) = self.target_position {
            if let Some((direction, _)) = geometry::unit_towards(self.position, target) {
                self.acceleration += direction * self.target_attraction / self.params.mass;
            }
        }

        self.velocity += self.acceleration * dt;
        self.angular_velocity += self.angular_acceleration * dt;
        let step = self.velocity * dt;
        self.position += step;
        self.rotation += self.angular_velocity * dt;
        self.update_bounding_box();

        self.velocity *= self.params.velocity_decay * dt;
        self.angular_velocity *= self.params.angular_velocity_decay * dt;

        step.length()
    }
}

//! Label particle: the rendered text of one location.

use glam::DVec2;

use super::text::{self, TextMeasure};
use super::{Behavior, BodyParams, Particle, ParticleId, ParticleKind, ParticleParameters, RigidBody};
use crate::error::GraphError;
use crate::geometry::Force;

/// Default label font size in points.
pub const DEFAULT_FONT_SIZE: u32 = 250;

/// Default label text color.
pub const DEFAULT_LABEL_COLOR: &str = "#eeeeee";

/// Labels are never pushed by overlaps; they only follow their node.
/// Other particles still feel the label's box.
pub const LABEL_REPULSION_STRENGTH: f64 = 0.0;

/// Text label attached to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelParticle {
    /// Displayed text; may contain line breaks.
    pub text: String,
    /// Text color.
    pub color: String,
    /// Font the box was measured with.
    pub font_name: String,
    /// Font size the box was measured with.
    pub font_size: u32,
    /// Shared per-font normalization factor.
    pub height_scale: f64,
    /// Strength of the pull towards the node.
    pub node_attraction: f64,
}

impl LabelParticle {
    /// Create a label particle whose box is measured from `text`.
    ///
    /// `height_scale` should come from [`text::label_height_scale`] for the
    /// same font and size, computed once for all labels.
    pub fn particle(
        id: ParticleId,
        label: impl Into<String>,
        position: DVec2,
        font: &dyn TextMeasure,
        font_size: u32,
        height_scale: f64,
        params: &ParticleParameters,
    ) -> Particle {
        let label = Self {
            text: label.into(),
            color: DEFAULT_LABEL_COLOR.to_string(),
            font_name: font.font_name().to_string(),
            font_size,
            height_scale,
            node_attraction: params.node_label,
        };
        let size = text::label_box_size(font, &label.text, font_size, height_scale);
        let body_params = BodyParams {
            mass: params.label_mass,
            interaction_radius: params.interaction_radius,
            velocity_decay: params.velocity_decay,
            angular_velocity_decay: params.velocity_decay,
            repulsion_strength: LABEL_REPULSION_STRENGTH,
        };
        let body = RigidBody::new(position, 0.0, size, body_params);
        Particle::new(id, body, ParticleKind::Label(label))
    }

    /// Bounding-box size of this label measured with `font`.
    pub fn measure(&self, font: &dyn TextMeasure) -> DVec2 {
        text::label_box_size(font, &self.text, self.font_size, self.height_scale)
    }
}

impl Behavior for LabelParticle {
    /// Linear pull towards the node, applied at the label's own center so
    /// that it never rotates the label.
    fn attraction_to(&self, body: &RigidBody, target: &Particle) -> Result<Force, GraphError> {
        let position = body.position();
        if target.as_node().is_none() {
            return Ok(Force::zero(position));
        }
        Ok(Force::new(
            (target.position() - position) * self.node_attraction,
            position,
        ))
    }

    fn apply_parameters(&mut self, body: &mut RigidBody, params: &ParticleParameters) {
        self.node_attraction = params.node_label;
        let body_params = body.params_mut();
        body_params.mass = params.label_mass;
        body_params.interaction_radius = params.interaction_radius;
        body_params.velocity_decay = params.velocity_decay;
        body_params.angular_velocity_decay = params.velocity_decay;
        body_params.repulsion_strength = LABEL_REPULSION_STRENGTH;
    }

    fn color(&self) -> &str {
        &self.color
    }
}

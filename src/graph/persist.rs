//! JSON persistence of a particle graph.
//!
//! The document lists every particle with its full body state and the ids
//! of the particles it is attracted to. Loading runs in two passes: all
//! particles are created first, then the links are resolved by id.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::engine::ParticleGraph;
use super::key::{EdgeKey, GraphExtent};
use crate::error::GraphError;
use crate::particle::text::{self, FontMetrics, TextMeasure};
use crate::particle::{
    BodyParams, DEFAULT_FONT_SIZE, DEFAULT_TARGET_ATTRACTION, EdgeParticle, LabelParticle, NodeParticle, Particle,
    ParticleId, ParticleKind, ParticleParameters, RigidBody,
};

/// Top level of a saved graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub particle_graph: GraphRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub particles: Vec<ParticleRecord>,
    #[serde(default)]
    pub particle_parameters: ParticleParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_extent: Option<GraphExtent>,
}

fn default_target_attraction() -> f64 {
    DEFAULT_TARGET_ATTRACTION
}

/// One saved particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub id: u32,
    pub position: [f64; 2],
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub velocity: [f64; 2],
    #[serde(default)]
    pub angular_velocity: f64,
    pub mass: f64,
    pub bounding_box_size: [f64; 2],
    pub velocity_decay: f64,
    pub angular_velocity_decay: f64,
    pub interaction_radius: f64,
    pub repulsion_strength: f64,
    /// Ids of the particles this one is attracted to.
    #[serde(default)]
    pub connected_particles: Vec<u32>,
    #[serde(default)]
    pub target_position: Option<[f64; 2]>,
    #[serde(default = "default_target_attraction")]
    pub target_attraction: f64,
    #[serde(flatten)]
    pub kind: KindRecord,
}

/// Kind-specific part of a saved particle, tagged by `particle_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "particle_type")]
pub enum KindRecord {
    #[serde(rename = "Particle_Node")]
    Node {
        label: String,
        color: String,
        #[serde(default)]
        image_file_path: Option<String>,
    },
    #[serde(rename = "Particle_Label")]
    Label {
        label: String,
        color: String,
        fontsize: u32,
        font_name: String,
        height_scale_factor: f64,
        node_attraction: f64,
    },
    #[serde(rename = "Particle_Edge")]
    Edge {
        color: String,
        border_color: String,
        location_1_name: String,
        location_2_name: String,
        path_index: u32,
        connection_index: u32,
        node_attraction: f64,
        edge_attraction: f64,
        #[serde(default)]
        image_file_path: Option<String>,
        #[serde(default)]
        image_override_filepath: Option<String>,
    },
}

impl KindRecord {
    fn of(kind: &ParticleKind) -> Self {
        match kind {
            ParticleKind::Node(node) => KindRecord::Node {
                label: node.label.clone(),
                color: node.color.clone(),
                image_file_path: node.image_path.clone(),
            },
            ParticleKind::Label(label) => KindRecord::Label {
                label: label.text.clone(),
                color: label.color.clone(),
                fontsize: label.font_size,
                font_name: label.font_name.clone(),
                height_scale_factor: label.height_scale,
                node_attraction: label.node_attraction,
            },
            ParticleKind::Edge(edge) => KindRecord::Edge {
                color: edge.color.clone(),
                border_color: edge.border_color.clone(),
                location_1_name: edge.location_1.clone(),
                location_2_name: edge.location_2.clone(),
                path_index: edge.path_index,
                connection_index: edge.connection_index,
                node_attraction: edge.node_attraction,
                edge_attraction: edge.edge_attraction,
                image_file_path: edge.image_file_path.clone(),
                image_override_filepath: edge.image_override_path.clone(),
            },
        }
    }

    fn into_kind(self) -> ParticleKind {
        match self {
            KindRecord::Node {
                label,
                color,
                image_file_path,
            } => ParticleKind::Node(NodeParticle {
                label,
                color,
                image_path: image_file_path,
            }),
            KindRecord::Label {
                label,
                color,
                fontsize,
                font_name,
                height_scale_factor,
                node_attraction,
            } => ParticleKind::Label(LabelParticle {
                text: label,
                color,
                font_name,
                font_size: fontsize,
                height_scale: height_scale_factor,
                node_attraction,
            }),
            KindRecord::Edge {
                color,
                border_color,
                location_1_name,
                location_2_name,
                path_index,
                connection_index,
                node_attraction,
                edge_attraction,
                image_file_path,
                image_override_filepath,
            } => ParticleKind::Edge(EdgeParticle {
                color,
                border_color,
                location_1: location_1_name,
                location_2: location_2_name,
                path_index,
                connection_index,
                node_attraction,
                edge_attraction,
                image_file_path,
                image_override_path: image_override_filepath,
            }),
        }
    }
}

impl ParticleRecord {
    fn of(particle: &Particle, connected: Vec<ParticleId>) -> Self {
        let body = particle.body();
        let params = body.params();
        Self {
            id: particle.id().raw(),
            position: body.position().to_array(),
            rotation: body.rotation(),
            velocity: body.velocity().to_array(),
            angular_velocity: body.angular_velocity(),
            mass: params.mass,
            bounding_box_size: body.size().to_array(),
            velocity_decay: params.velocity_decay,
            angular_velocity_decay: params.angular_velocity_decay,
            interaction_radius: params.interaction_radius,
            repulsion_strength: params.repulsion_strength,
            connected_particles: connected.into_iter().map(ParticleId::raw).collect(),
            target_position: body.target_position().map(|target| target.to_array()),
            target_attraction: body.target_attraction(),
            kind: KindRecord::of(particle.kind()),
        }
    }

    fn to_particle(&self) -> Particle {
        let params = BodyParams {
            mass: self.mass,
            interaction_radius: self.interaction_radius,
            velocity_decay: self.velocity_decay,
            angular_velocity_decay: self.angular_velocity_decay,
            repulsion_strength: self.repulsion_strength,
        };
        let mut body = RigidBody::new(
            DVec2::from(self.position),
            self.rotation,
            DVec2::from(self.bounding_box_size),
            params,
        );
        body.set_velocity(DVec2::from(self.velocity), self.angular_velocity);
        body.set_target_position(self.target_position.map(DVec2::from));
        body.set_target_attraction(self.target_attraction);
        Particle::new(ParticleId(self.id), body, self.kind.clone().into_kind())
    }
}

impl ParticleGraph {
    /// Snapshot of the whole graph as a document.
    pub fn to_document(&self) -> GraphDocument {
        let particles = self
            .particles()
            .map(|particle| ParticleRecord::of(particle, self.attraction_targets(particle.id())))
            .collect();
        GraphDocument {
            particle_graph: GraphRecord {
                particles,
                particle_parameters: self.params,
                graph_extent: self.extent,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Rebuild a graph from a document, measuring later label edits with
    /// the built-in font metrics.
    pub fn from_document(document: GraphDocument) -> Result<Self, GraphError> {
        Self::from_document_with_font(document, Box::new(FontMetrics::default()))
    }

    /// Rebuild a graph from a document, measuring later label edits with
    /// `font`.
    ///
    /// Particle ids must be unique and every linked id must exist. Edge
    /// segments whose key is already taken are moved to the next free
    /// connection index. Saved label boxes are kept as they are.
    pub fn from_document_with_font(
        document: GraphDocument,
        font: Box<dyn TextMeasure>,
    ) -> Result<Self, GraphError> {
        let record = document.particle_graph;
        let mut graph = Self::with_font(record.particle_parameters, font, DEFAULT_FONT_SIZE);
        graph.extent = record.graph_extent;

        let font_size = record.particles.iter().find_map(|p| match &p.kind {
            KindRecord::Label { fontsize, .. } => Some(*fontsize),
            _ => None,
        });
        if let Some(font_size) = font_size {
            graph.font_size = font_size;
            graph.height_scale = text::label_height_scale(graph.font.as_ref(), font_size);
        }

        for particle_record in &record.particles {
            let mut particle = particle_record.to_particle();
            let id = particle.id();
            if graph.id_to_index.contains_key(&id) {
                return Err(GraphError::DuplicateParticle(id));
            }

            match particle.kind_mut() {
                ParticleKind::Node(node) => {
                    if graph.nodes.contains_key(&node.label) {
                        return Err(GraphError::DuplicateLocation(node.label.clone()));
                    }
                    graph.nodes.insert(node.label.clone(), id);
                }
                ParticleKind::Label(label) => {
                    if label.font_name != graph.font.font_name() {
                        log::warn!(
                            "label '{}' was measured with font '{}', relabelling will use '{}'",
                            label.text,
                            label.font_name,
                            graph.font.font_name()
                        );
                    }
                    if graph.labels.insert(label.text.clone(), id).is_some() {
                        log::warn!("more than one label for location '{}', keeping {}", label.text, id);
                    }
                }
                ParticleKind::Edge(edge) => {
                    let mut key = EdgeKey::of(edge);
                    if graph.edges.contains_key(&key) {
                        let taken = key.connection_index;
                        while graph.edges.contains_key(&key) {
                            key.connection_index += 1;
                        }
                        log::warn!(
                            "edge segment {} duplicates the key of another segment, moved from connection {} to {}",
                            id,
                            taken,
                            key.connection_index
                        );
                        edge.connection_index = key.connection_index;
                    }
                    graph.edges.insert(key, id);
                }
            }
            graph.insert_particle(particle)?;
        }

        for particle_record in &record.particles {
            for &target in &particle_record.connected_particles {
                graph.link(ParticleId(particle_record.id), ParticleId(target))?;
            }
        }

        log::info!(
            "loaded particle graph: {} locations, {} edge segments, {} particles",
            graph.node_count(),
            graph.edge_count(),
            graph.particle_count()
        );
        Ok(graph)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let document: GraphDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }
}

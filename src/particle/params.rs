//! Simulation parameters shared by all particles of a graph.

use serde::{Deserialize, Serialize};

/// Parameters pushed to every particle by `set_parameters`.
///
/// Each particle kind reads only the subset that applies to it. Field names
/// in the persisted document follow the hyphenated force names
/// (`"edge-edge"`, `"node-label"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleParameters {
    /// Velocity decay factor for all particles (default: 0.99).
    pub velocity_decay: f64,
    /// Attraction between chained edge segments (default: 0.01).
    #[serde(rename = "edge-edge")]
    pub edge_edge: f64,
    /// Attraction between an end segment and its node (default: 0.01).
    #[serde(rename = "edge-node")]
    pub edge_node: f64,
    /// Attraction between a label and its node (default: 0.001).
    #[serde(rename = "node-label")]
    pub node_label: f64,
    /// Pull of a node towards its target position (default: 0.001).
    #[serde(rename = "node-target")]
    pub node_target: f64,
    /// Mass of node particles (default: 1.0).
    pub node_mass: f64,
    /// Mass of edge particles (default: 1.0).
    pub edge_mass: f64,
    /// Mass of label particles (default: 0.2).
    pub label_mass: f64,
    /// Maximum center distance for particles to interact (default: 15.0).
    pub interaction_radius: f64,
    /// Overlap repulsion scale (default: 2.0).
    pub repulsion_strength: f64,
}

impl Default for ParticleParameters {
    fn default() -> Self {
        Self {
            velocity_decay: 0.99,
            edge_edge: 0.01,
            edge_node: 0.01,
            node_label: 0.001,
            node_target: 0.001,
            node_mass: 1.0,
            edge_mass: 1.0,
            label_mass: 0.2,
            interaction_radius: 15.0,
            repulsion_strength: 2.0,
        }
    }
}

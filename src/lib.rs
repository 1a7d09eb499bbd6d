//! Route Map - WASM Module
//!
//! This module provides the particle layout core of the Route Map editor:
//! a rigid-body simulation that untangles a labeled route graph. It is
//! compiled to WebAssembly and exposes a JavaScript-friendly API via
//! wasm-bindgen.
//!
//! # Architecture
//!
//! - `particle`: rigid bodies and the node, label and edge segment behaviors
//! - `geometry`: oriented boxes, polygon overlap and force decomposition
//! - `graph`: the particle graph, structural edits and JSON persistence
//! - `spatial`: R-tree spatial indexing for O(log n) hit testing

use std::collections::HashMap;

use glam::DVec2;
use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod geometry;
pub mod graph;
pub mod particle;
pub mod spatial;

use error::GraphError;
use graph::{ConnectionKey, ParticleGraph};
use particle::{ParticleId, ParticleParameters, ParticleType};

/// Number of values per particle in [`RouteMapWasm::get_render_data`].
pub const RENDER_STRIDE: usize = 7;

/// Initialize the WASM module: browser console logging and panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

fn js_error(err: GraphError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn type_code(particle_type: ParticleType) -> f64 {
    match particle_type {
        ParticleType::Node => 0.0,
        ParticleType::Label => 1.0,
        ParticleType::Edge => 2.0,
    }
}

/// Main entry point for the layout engine.
///
/// This struct wraps the internal ParticleGraph and provides the public API
/// exposed to JavaScript.
#[wasm_bindgen]
pub struct RouteMapWasm {
    graph: ParticleGraph,
}

#[wasm_bindgen]
impl RouteMapWasm {
    /// Create an empty graph with default parameters.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            graph: ParticleGraph::new(ParticleParameters::default()),
        }
    }

    /// Load a graph from its JSON document.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str) -> Result<RouteMapWasm, JsValue> {
        let graph = ParticleGraph::from_json(json).map_err(js_error)?;
        Ok(Self { graph })
    }

    /// Save the graph as a JSON document.
    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.graph.to_json().map_err(js_error)
    }

    // =========================================================================
    // Structural Edits
    // =========================================================================

    /// Add a location at (x, y). Returns the id of its node.
    #[wasm_bindgen(js_name = addLocation)]
    pub fn add_location(&mut self, name: &str, x: f64, y: f64) -> Result<u32, JsValue> {
        self.graph
            .add_location(name, DVec2::new(x, y))
            .map(ParticleId::raw)
            .map_err(js_error)
    }

    /// Connect two locations with a chain of `length` segments.
    ///
    /// Returns the connection index of the new chain.
    #[wasm_bindgen(js_name = addConnection)]
    pub fn add_connection(
        &mut self,
        location_1: &str,
        location_2: &str,
        length: u32,
        color: &str,
    ) -> Result<u32, JsValue> {
        self.graph
            .add_connection(location_1, location_2, length, color)
            .map(|connection| connection.connection_index)
            .map_err(js_error)
    }

    /// Delete a location with its label and connections.
    ///
    /// Returns the ids of all removed particles.
    #[wasm_bindgen(js_name = deleteNode)]
    pub fn delete_node(&mut self, location: &str) -> Result<Vec<u32>, JsValue> {
        self.graph
            .delete_node(location)
            .map(|ids| ids.into_iter().map(ParticleId::raw).collect())
            .map_err(js_error)
    }

    /// Delete one edge segment by particle id.
    #[wasm_bindgen(js_name = deleteEdge)]
    pub fn delete_edge(&mut self, particle_id: u32) -> Result<bool, JsValue> {
        self.graph
            .delete_edge_particle(ParticleId(particle_id))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = renameNode)]
    pub fn rename_node(&mut self, old_name: &str, new_name: &str) -> Result<(), JsValue> {
        self.graph.rename_node(old_name, new_name).map_err(js_error)
    }

    #[wasm_bindgen(js_name = recolorConnection)]
    pub fn recolor_connection(
        &mut self,
        location_1: &str,
        location_2: &str,
        connection_index: u32,
        color: &str,
    ) -> Result<u32, JsValue> {
        let connection = ConnectionKey::new(location_1, location_2, connection_index);
        self.graph
            .recolor_connection(&connection, color)
            .map(|count| count as u32)
            .map_err(js_error)
    }

    /// Relink every chain from the edge keys.
    #[wasm_bindgen(js_name = repairConnections)]
    pub fn repair_connections(&mut self) -> Result<(), JsValue> {
        self.graph.repair_connections().map_err(js_error)
    }

    #[wasm_bindgen(js_name = straightenConnections)]
    pub fn straighten_connections(&mut self, x_periodic: bool, y_periodic: bool) -> Result<(), JsValue> {
        self.graph
            .straighten_connections(x_periodic, y_periodic)
            .map_err(js_error)
    }

    // =========================================================================
    // Parameters and Appearance
    // =========================================================================

    /// Set simulation parameters from a plain object with the persisted
    /// key names (`"edge-edge"`, `node_mass`, ...). Missing keys use their
    /// defaults.
    #[wasm_bindgen(js_name = setParameters)]
    pub fn set_parameters(&mut self, params: JsValue) -> Result<(), JsValue> {
        let params: ParticleParameters = serde_wasm_bindgen::from_value(params)?;
        self.graph.set_parameters(params);
        Ok(())
    }

    #[wasm_bindgen(js_name = getParameters)]
    pub fn get_parameters(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(self.graph.parameters())?)
    }

    /// Draw edges as images; `images` maps every edge color to an image path.
    #[wasm_bindgen(js_name = setEdgeImages)]
    pub fn set_edge_images(&mut self, images: JsValue) -> Result<(), JsValue> {
        let images: HashMap<String, String> = serde_wasm_bindgen::from_value(images)?;
        self.graph.set_edge_images(&images).map_err(js_error)
    }

    /// Replace edge colors; `colors` maps old colors to new ones.
    #[wasm_bindgen(js_name = setEdgeColors)]
    pub fn set_edge_colors(&mut self, colors: JsValue) -> Result<(), JsValue> {
        let colors: HashMap<String, String> = serde_wasm_bindgen::from_value(colors)?;
        self.graph.set_edge_colors(&colors);
        Ok(())
    }

    /// Set the rectangle straightened connections wrap into.
    #[wasm_bindgen(js_name = setGraphExtent)]
    pub fn set_graph_extent(&mut self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
        self.graph
            .set_graph_extent(Some(graph::GraphExtent::new(x_min, x_max, y_min, y_max)));
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Run `iterations` ticks of length `dt`.
    ///
    /// Returns the total distance moved during the last tick.
    #[wasm_bindgen(js_name = optimizeLayout)]
    pub fn optimize_layout(&mut self, iterations: u32, dt: f64) -> Result<f64, JsValue> {
        self.graph
            .optimize_layout(iterations as usize, dt)
            .map_err(js_error)
    }

    /// Move (and optionally rotate) a particle, e.g. after a drag.
    #[wasm_bindgen(js_name = setParticlePose)]
    pub fn set_particle_pose(
        &mut self,
        particle_id: u32,
        x: f64,
        y: f64,
        rotation: Option<f64>,
    ) -> Result<(), JsValue> {
        self.graph
            .set_particle_pose(ParticleId(particle_id), DVec2::new(x, y), rotation)
            .map_err(js_error)
    }

    // =========================================================================
    // Rendering Queries
    // =========================================================================

    #[wasm_bindgen(js_name = particleCount)]
    pub fn particle_count(&self) -> u32 {
        self.graph.particle_count() as u32
    }

    /// Ids of all particles: nodes, then labels, then edge segments.
    #[wasm_bindgen(js_name = getParticleIds)]
    pub fn get_particle_ids(&self) -> Vec<u32> {
        self.graph
            .particle_ids()
            .into_iter()
            .map(ParticleId::raw)
            .collect()
    }

    /// Per-particle drawing data, [`RENDER_STRIDE`] values each:
    /// `[id, type, x, y, rotation, width, height]` with type 0 = node,
    /// 1 = label, 2 = edge segment. Same order as `getParticleIds`.
    #[wasm_bindgen(js_name = getRenderData)]
    pub fn get_render_data(&self) -> Float64Array {
        Float64Array::from(&render_data(&self.graph)[..])
    }

    #[wasm_bindgen(js_name = getParticleColor)]
    pub fn get_particle_color(&self, particle_id: u32) -> Option<String> {
        self.graph
            .particle(ParticleId(particle_id))
            .map(|p| p.color().to_string())
    }

    /// Rotation at which to draw an edge segment's image.
    #[wasm_bindgen(js_name = getEdgeImageRotation)]
    pub fn get_edge_image_rotation(&self, particle_id: u32) -> Result<f64, JsValue> {
        self.graph
            .edge_image_rotation(ParticleId(particle_id))
            .map_err(js_error)
    }

    /// All paths as `{location_1, location_2, length, color}` objects.
    #[wasm_bindgen(js_name = getPaths)]
    pub fn get_paths(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.graph.paths())?)
    }

    #[wasm_bindgen(js_name = getLocations)]
    pub fn get_locations(&self) -> Vec<String> {
        self.graph.locations()
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Particle under the point, if any.
    #[wasm_bindgen(js_name = findParticleAt)]
    pub fn find_particle_at(&self, x: f64, y: f64) -> Option<u32> {
        self.graph.particle_at(x, y).map(ParticleId::raw)
    }

    /// Particles touching a rectangular region.
    #[wasm_bindgen(js_name = findParticlesInRect)]
    pub fn find_particles_in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<u32> {
        self.graph
            .particles_in_rect(DVec2::new(min_x, min_y), DVec2::new(max_x, max_y))
            .into_iter()
            .map(ParticleId::raw)
            .collect()
    }
}

impl Default for RouteMapWasm {
    fn default() -> Self {
        Self::new()
    }
}

fn render_data(graph: &ParticleGraph) -> Vec<f64> {
    let mut data = Vec::with_capacity(graph.particle_count() * RENDER_STRIDE);
    for particle in graph.particles() {
        let size = particle.body().size();
        data.extend_from_slice(&[
            particle.id().raw() as f64,
            type_code(particle.particle_type()),
            particle.position().x,
            particle.position().y,
            particle.rotation(),
            size.x,
            size.y,
        ]);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph::{GraphExtent, Location, Path};
    use std::collections::HashSet;

    fn route_map() -> ParticleGraph {
        ParticleGraph::build(
            &[
                Location::at("A", DVec2::new(0.0, 0.0)),
                Location::at("B", DVec2::new(10.0, 0.0)),
                Location::at("C", DVec2::new(5.0, 8.0)),
                Location::at("D", DVec2::new(-4.0, 6.0)),
            ],
            &[
                Path::new("A", "B", 3, "red"),
                Path::new("B", "C", 2, "blue"),
                Path::new("C", "A", 2, "blue"),
                Path::new("D", "C", 4, "green"),
                Path::new("A", "B", 2, "yellow"),
            ],
            ParticleParameters::default(),
        )
        .unwrap()
    }

    /// Walk from `start` over the attraction links of a chain until a node
    /// is reached, returning the path indices seen and the node.
    fn walk_chain(graph: &ParticleGraph, start: ParticleId, from: ParticleId) -> (Vec<u32>, ParticleId) {
        let mut visited = HashSet::from([from, start]);
        let mut indices = Vec::new();
        let mut current = start;
        loop {
            let particle = graph.particle(current).unwrap();
            match particle.as_edge() {
                Some(edge) => indices.push(edge.path_index),
                None => return (indices, current),
            }
            let next = graph
                .attraction_targets(current)
                .into_iter()
                .find(|id| !visited.contains(id))
                .expect("chain continues");
            visited.insert(next);
            current = next;
        }
    }

    #[test]
    fn test_chain_walk_reaches_other_node_once() {
        let graph = route_map();
        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        let chain = graph.chain(&ConnectionKey::new("A", "B", 0));
        assert!(graph.is_attracted(chain[0], a));

        let (indices, end) = walk_chain(&graph, chain[0], a);
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(end, b);
    }

    #[test]
    fn test_zero_iterations_leave_layout_unchanged() {
        let mut graph = route_map();
        let before = render_data(&graph);
        graph.optimize_layout(0, 0.1).unwrap();
        assert_eq!(render_data(&graph), before);
    }

    #[test]
    fn test_delete_node_cascades_exactly() {
        let mut graph = route_map();
        let before: HashSet<_> = graph.particle_ids().into_iter().collect();
        let removed: HashSet<_> = graph.delete_node("C").unwrap().into_iter().collect();

        // Node, label, and the B-C, C-A and D-C chains.
        assert_eq!(removed.len(), 2 + 2 + 2 + 4);
        let after: HashSet<_> = graph.particle_ids().into_iter().collect();
        assert_eq!(after, before.difference(&removed).copied().collect());
        assert!(graph.node_id("C").is_none());
        assert!(graph.edge_keys().all(|key| !key.touches("C")));
        assert_eq!(graph.paths().len(), 2);
        assert!(graph.label_id("D").is_some());
    }

    #[test]
    fn test_simulation_then_json_round_trip() {
        let mut graph = route_map();
        graph.set_graph_extent(Some(GraphExtent::new(-20.0, 20.0, -20.0, 20.0)));
        let moved = graph.optimize_layout(20, 0.1).unwrap();
        assert!(moved.is_finite());

        let json = graph.to_json().unwrap();
        let loaded = ParticleGraph::from_json(&json).unwrap();

        for location in graph.locations() {
            let original = graph.node(&location).unwrap();
            let copy = loaded.node(&location).unwrap();
            assert!((original.position() - copy.position()).length() < 1e-9);
        }
        for connection in graph.connections() {
            let original = graph.chain(&connection);
            let copy = loaded.chain(&connection);
            assert_eq!(original, copy);
            for &id in &original {
                assert_eq!(loaded.particle(id).unwrap().color(), graph.particle(id).unwrap().color());
                let neighbors = |g: &ParticleGraph| -> Vec<String> {
                    g.attraction_targets(id)
                        .into_iter()
                        .map(|t| {
                            let p = g.particle(t).unwrap();
                            match (p.as_node(), p.as_edge()) {
                                (Some(node), _) => node.label.clone(),
                                (_, Some(edge)) => format!("{}", edge.path_index),
                                _ => String::new(),
                            }
                        })
                        .collect()
                };
                assert_eq!(neighbors(&loaded), neighbors(&graph));
            }
        }
        assert_eq!(render_data(&loaded), render_data(&graph));
    }

    #[test]
    fn test_edit_session() {
        let mut graph = route_map();
        let parallel = graph.add_connection("B", "A", 2, "white").unwrap();
        assert_eq!(parallel.connection_index, 2);
        assert_eq!(graph.connection_count("A", "B"), 3);

        let middle = graph.chain(&ConnectionKey::new("A", "B", 0))[1];
        assert!(graph.delete_edge_particle(middle).unwrap());
        graph.rename_node("D", "Brethil").unwrap();
        graph.repair_connections().unwrap();
        graph.straighten_connections(false, false).unwrap();

        for connection in graph.connections() {
            let chain = graph.chain(&connection);
            let (first, second) = graph.chain_endpoints(chain[0]).unwrap();
            let mut ends = vec![first, second];
            ends.sort();
            let mut expected = vec![
                graph.node_id(&connection.location_1).unwrap(),
                graph.node_id(&connection.location_2).unwrap(),
            ];
            expected.sort();
            assert_eq!(ends, expected);
        }
        assert!(graph.paths().contains(&Path::new("A", "B", 2, "red")));
        assert!(graph.paths().contains(&Path::new("Brethil", "C", 4, "green")));
    }

    #[test]
    fn test_render_data_layout() {
        let graph = route_map();
        let data = render_data(&graph);
        assert_eq!(data.len(), graph.particle_count() * RENDER_STRIDE);

        let a = graph.node("A").unwrap();
        assert_eq!(data[0], a.id().raw() as f64);
        assert_eq!(data[1], 0.0);
        assert_eq!(&data[2..7], &[0.0, 0.0, 0.0, 1.0, 1.0]);

        let edges = data
            .chunks(RENDER_STRIDE)
            .filter(|chunk| chunk[1] == 2.0)
            .count();
        assert_eq!(edges, graph.edge_count());
    }
}

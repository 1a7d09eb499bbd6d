//! ParticleGraph - the particle system of a labeled route graph.
//!
//! The ParticleGraph stores every particle in a petgraph StableGraph arena.
//! A directed arena edge `a -> b` means that particle `a` is attracted to
//! particle `b`; the relation is asymmetric. Named lookup tables map
//! locations to their node and label particles and edge keys to segments.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::DVec2;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};

use super::key::{ConnectionKey, EdgeKey, GraphExtent, Location, Path};
use crate::error::GraphError;
use crate::particle::text::{self, FontMetrics, TextMeasure};
use crate::particle::{
    DEFAULT_FONT_SIZE, Interaction, LabelParticle, NodeParticle, Particle, ParticleId,
    ParticleParameters, ParticleType,
};
use crate::spatial::SpatialIndex;

/// Horizontal spacing of locations created without a position.
const DEFAULT_LOCATION_SPACING: f64 = 3.0;

/// Gap between a node and the near side of its label.
const LABEL_GAP: f64 = 1.0;

/// The particle system of a labeled route graph.
///
/// This struct manages:
/// - Particle storage and attraction links via petgraph
/// - Lookup of nodes and labels by location name
/// - Lookup of edge segments by [`EdgeKey`]
/// - The font used to measure labels
/// - Spatial index for hit testing
///
/// Editing calls take `&mut self` and a simulation run is a single
/// `&mut self` call, so edits can never interleave with a tick.
pub struct ParticleGraph {
    /// Particle arena. Edge `a -> b`: `a` is attracted to `b`.
    pub(super) graph: StableGraph<Particle, (), Directed>,

    /// Map from stable ParticleId to petgraph NodeIndex
    pub(super) id_to_index: HashMap<ParticleId, NodeIndex>,

    /// Node particle of each location
    pub(super) nodes: BTreeMap<String, ParticleId>,

    /// Label particle of each location
    pub(super) labels: BTreeMap<String, ParticleId>,

    /// Edge segments by key
    pub(super) edges: BTreeMap<EdgeKey, ParticleId>,

    pub(super) params: ParticleParameters,

    pub(super) font: Box<dyn TextMeasure>,

    pub(super) font_size: u32,

    /// Label height scale for `font` at `font_size`
    pub(super) height_scale: f64,

    /// Next particle ID to assign
    pub(super) next_id: u32,

    pub(super) extent: Option<GraphExtent>,

    /// Spatial index for hit testing, rebuilt lazily
    spatial: RefCell<SpatialIndex>,

    /// Whether the spatial index needs rebuilding
    pub(super) spatial_dirty: Cell<bool>,
}

impl ParticleGraph {
    /// Create an empty graph measuring labels with the built-in font metrics.
    pub fn new(params: ParticleParameters) -> Self {
        Self::with_font(params, Box::new(FontMetrics::default()), DEFAULT_FONT_SIZE)
    }

    /// Create an empty graph measuring labels with `font` at `font_size`.
    pub fn with_font(params: ParticleParameters, font: Box<dyn TextMeasure>, font_size: u32) -> Self {
        let height_scale = text::label_height_scale(font.as_ref(), font_size);
        Self {
            graph: StableGraph::new(),
            id_to_index: HashMap::new(),
            nodes: BTreeMap::new(),
            labels: BTreeMap::new(),
            edges: BTreeMap::new(),
            params,
            font,
            font_size,
            height_scale,
            next_id: 0,
            extent: None,
            spatial: RefCell::new(SpatialIndex::new()),
            spatial_dirty: Cell::new(false),
        }
    }

    /// Build the particle system for `locations` joined by `paths`.
    ///
    /// Each location gets a node (at its given position, or spread out along
    /// the x axis) and a label just to its right. Each path becomes a chain
    /// of `length` edge segments between the two nodes.
    pub fn build(
        locations: &[Location],
        paths: &[Path],
        params: ParticleParameters,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new(params);
        for (i, location) in locations.iter().enumerate() {
            let position = location
                .position
                .unwrap_or(DVec2::new(DEFAULT_LOCATION_SPACING * i as f64, 0.0));
            graph.add_location(&location.name, position)?;
        }
        for path in paths {
            graph.add_connection(&path.location_1, &path.location_2, path.length, &path.color)?;
        }
        log::info!(
            "built particle graph: {} locations, {} paths, {} particles",
            graph.nodes.len(),
            paths.len(),
            graph.particle_count()
        );
        Ok(graph)
    }

    // =========================================================================
    // Particle Storage
    // =========================================================================

    pub(super) fn allocate_id(&mut self) -> Result<ParticleId, GraphError> {
        let id = ParticleId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(GraphError::IdsExhausted)?;
        Ok(id)
    }

    /// Store a particle in the arena. The caller registers it in the lookup
    /// tables.
    pub(super) fn insert_particle(&mut self, particle: Particle) -> Result<(), GraphError> {
        let id = particle.id();
        if self.id_to_index.contains_key(&id) {
            return Err(GraphError::DuplicateParticle(id));
        }
        let after = id.raw().checked_add(1).ok_or(GraphError::IdsExhausted)?;
        self.next_id = self.next_id.max(after);
        let index = self.graph.add_node(particle);
        self.id_to_index.insert(id, index);
        self.spatial_dirty.set(true);
        Ok(())
    }

    /// Remove a particle and every link from or to it.
    pub(super) fn remove_particle(&mut self, id: ParticleId) -> Option<Particle> {
        let index = self.id_to_index.remove(&id)?;
        self.spatial_dirty.set(true);
        self.graph.remove_node(index)
    }

    pub(super) fn index_of(&self, id: ParticleId) -> Result<NodeIndex, GraphError> {
        self.id_to_index
            .get(&id)
            .copied()
            .ok_or(GraphError::UnknownParticle(id))
    }

    pub(super) fn position_of(&self, id: ParticleId) -> Result<DVec2, GraphError> {
        self.particle(id)
            .map(Particle::position)
            .ok_or(GraphError::UnknownParticle(id))
    }

    /// Mutable access to a particle; invalidates the spatial index.
    pub(super) fn particle_mut(&mut self, id: ParticleId) -> Result<&mut Particle, GraphError> {
        let index = self.index_of(id)?;
        self.spatial_dirty.set(true);
        Ok(&mut self.graph[index])
    }

    /// Every particle, invalidating the spatial index.
    pub(super) fn particles_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.spatial_dirty.set(true);
        self.graph.node_weights_mut()
    }

    pub(super) fn require_node(&self, location: &str) -> Result<ParticleId, GraphError> {
        self.nodes
            .get(location)
            .copied()
            .ok_or_else(|| GraphError::UnknownLocation(location.to_string()))
    }

    // =========================================================================
    // Attraction Links
    // =========================================================================

    /// Make `from` attracted to `to`.
    pub(super) fn link(&mut self, from: ParticleId, to: ParticleId) -> Result<(), GraphError> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        if !self.graph.contains_edge(a, b) {
            self.graph.add_edge(a, b, ());
        }
        Ok(())
    }

    /// Remove every attraction target of `id`.
    pub(super) fn clear_links(&mut self, id: ParticleId) {
        if let Some(&index) = self.id_to_index.get(&id) {
            let links: Vec<_> = self
                .graph
                .edges_directed(index, Direction::Outgoing)
                .map(|e| e.id())
                .collect();
            for link in links {
                self.graph.remove_edge(link);
            }
        }
    }

    /// Particles `id` is attracted to, sorted by id.
    pub fn attraction_targets(&self, id: ParticleId) -> Vec<ParticleId> {
        let Some(&index) = self.id_to_index.get(&id) else {
            return Vec::new();
        };
        let mut targets: Vec<_> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .map(|n| self.graph[n].id())
            .collect();
        targets.sort();
        targets
    }

    /// Whether `from` is attracted to `to`.
    pub fn is_attracted(&self, from: ParticleId, to: ParticleId) -> bool {
        match (self.id_to_index.get(&from), self.id_to_index.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn parameters(&self) -> &ParticleParameters {
        &self.params
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn height_scale(&self) -> f64 {
        self.height_scale
    }

    pub fn graph_extent(&self) -> Option<GraphExtent> {
        self.extent
    }

    /// Set the extent used to wrap straightened connections.
    pub fn set_graph_extent(&mut self, extent: Option<GraphExtent>) {
        self.extent = extent;
    }

    pub fn particle_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.id_to_index.get(&id).map(|&index| &self.graph[index])
    }

    /// All particles: nodes, then labels, then edge segments.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.simulation_order()
            .into_iter()
            .map(move |index| &self.graph[index])
    }

    /// Ids of all particles in the order of [`ParticleGraph::particles`].
    pub fn particle_ids(&self) -> Vec<ParticleId> {
        self.particles().map(Particle::id).collect()
    }

    pub fn node_id(&self, location: &str) -> Option<ParticleId> {
        self.nodes.get(location).copied()
    }

    pub fn label_id(&self, location: &str) -> Option<ParticleId> {
        self.labels.get(location).copied()
    }

    pub fn edge_id(&self, key: &EdgeKey) -> Option<ParticleId> {
        self.edges.get(key).copied()
    }

    pub fn node(&self, location: &str) -> Option<&Particle> {
        self.node_id(location).and_then(|id| self.particle(id))
    }

    pub fn label(&self, location: &str) -> Option<&Particle> {
        self.label_id(location).and_then(|id| self.particle(id))
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&Particle> {
        self.edge_id(key).and_then(|id| self.particle(id))
    }

    /// Key of the edge segment `id`, if it is one.
    pub fn edge_key_of(&self, id: ParticleId) -> Option<EdgeKey> {
        self.particle(id)?.as_edge().map(EdgeKey::of)
    }

    /// Location names, sorted.
    pub fn locations(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Keys of all edge segments, sorted.
    pub fn edge_keys(&self) -> impl Iterator<Item = &EdgeKey> {
        self.edges.keys()
    }

    /// All connections, sorted.
    pub fn connections(&self) -> Vec<ConnectionKey> {
        let unique: BTreeSet<_> = self.edges.keys().map(EdgeKey::connection).collect();
        unique.into_iter().collect()
    }

    /// Segments of one connection ordered by `path_index`.
    pub fn chain(&self, connection: &ConnectionKey) -> Vec<ParticleId> {
        let start = connection.segment(0);
        let end = connection.segment(u32::MAX);
        self.edges.range(start..=end).map(|(_, &id)| id).collect()
    }

    /// Number of parallel connections between two locations.
    pub fn connection_count(&self, location_1: &str, location_2: &str) -> usize {
        let pair = ConnectionKey::new(location_1, location_2, 0);
        self.connections()
            .iter()
            .filter(|c| c.same_locations(&pair))
            .count()
    }

    /// One path per connection, derived from the edge segments.
    pub fn paths(&self) -> Vec<Path> {
        self.connections()
            .into_iter()
            .map(|connection| {
                let chain = self.chain(&connection);
                let color = chain
                    .first()
                    .and_then(|&id| self.particle(id))
                    .map(|p| p.color().to_string())
                    .unwrap_or_default();
                Path::new(
                    connection.location_1,
                    connection.location_2,
                    chain.len() as u32,
                    color,
                )
            })
            .collect()
    }

    /// Distinct edge colors, sorted.
    pub fn edge_colors(&self) -> Vec<String> {
        let colors: BTreeSet<_> = self
            .edges
            .values()
            .filter_map(|&id| self.particle(id))
            .map(|p| p.color().to_string())
            .collect();
        colors.into_iter().collect()
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Create the node and label particles of a new location.
    ///
    /// Returns the node's id.
    pub fn add_location(&mut self, name: &str, position: DVec2) -> Result<ParticleId, GraphError> {
        if self.nodes.contains_key(name) {
            return Err(GraphError::DuplicateLocation(name.to_string()));
        }

        let node_id = self.allocate_id()?;
        let label_id = self.allocate_id()?;
        let node = NodeParticle::particle(node_id, name, position, &self.params);
        self.insert_particle(node)?;
        self.nodes.insert(name.to_string(), node_id);

        let mut label = LabelParticle::particle(
            label_id,
            name,
            position,
            self.font.as_ref(),
            self.font_size,
            self.height_scale,
            &self.params,
        );
        let offset = DVec2::new(label.body().size().x / 2.0 + LABEL_GAP, 0.0);
        label.body_mut().set_position(position + offset);
        self.insert_particle(label)?;
        self.labels.insert(name.to_string(), label_id);
        self.link(label_id, node_id)?;

        log::debug!("added location '{}' as {} with label {}", name, node_id, label_id);
        Ok(node_id)
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    fn simulation_order(&self) -> Vec<NodeIndex> {
        self.nodes
            .values()
            .chain(self.labels.values())
            .chain(self.edges.values())
            .filter_map(|id| self.id_to_index.get(id).copied())
            .collect()
    }

    /// Advance the simulation by `iterations` ticks of length `dt`.
    ///
    /// Each tick resets all accelerations, evaluates every ordered pair of
    /// distinct particles, then integrates every particle. Returns the total
    /// distance moved by all particles during the last tick (zero if no
    /// tick ran), usable as a convergence measure.
    pub fn optimize_layout(&mut self, iterations: usize, dt: f64) -> Result<f64, GraphError> {
        let order = self.simulation_order();
        let mut moved = 0.0;

        for _ in 0..iterations {
            for &index in &order {
                self.graph[index].reset_acceleration();
            }

            let mut accumulated = vec![Interaction::default(); order.len()];
            for (slot, &a) in order.iter().enumerate() {
                let particle = &self.graph[a];
                for &b in &order {
                    if a == b {
                        continue;
                    }
                    let attracted = self.graph.contains_edge(a, b);
                    accumulated[slot] += particle.interaction(&self.graph[b], attracted)?;
                }
            }

            moved = 0.0;
            for (&index, interaction) in order.iter().zip(accumulated) {
                let particle = &mut self.graph[index];
                particle.body_mut().accelerate(interaction);
                moved += particle.update(dt);
            }
        }

        if iterations > 0 {
            self.spatial_dirty.set(true);
        }
        log::debug!(
            "optimized layout: {} iterations of {} particles, last tick moved {:.6}",
            iterations,
            order.len(),
            moved
        );
        Ok(moved)
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Particle whose bounding box contains the point.
    pub fn particle_at(&self, x: f64, y: f64) -> Option<ParticleId> {
        self.ensure_spatial_index_up_to_date();
        self.spatial.borrow().at_point(x, y)
    }

    /// Particles whose bounding box touches the rectangle.
    pub fn particles_in_rect(&self, min: DVec2, max: DVec2) -> Vec<ParticleId> {
        self.ensure_spatial_index_up_to_date();
        let mut ids = self.spatial.borrow().in_rect(min.x, min.y, max.x, max.y);
        ids.sort();
        ids
    }

    /// Particles of one kind whose bounding box touches the rectangle.
    pub fn particles_of_type_in_rect(
        &self,
        particle_type: ParticleType,
        min: DVec2,
        max: DVec2,
    ) -> Vec<ParticleId> {
        self.particles_in_rect(min, max)
            .into_iter()
            .filter(|&id| {
                self.particle(id)
                    .is_some_and(|p| p.particle_type() == particle_type)
            })
            .collect()
    }

    fn ensure_spatial_index_up_to_date(&self) {
        if self.spatial_dirty.get() {
            let particles = self.graph.node_indices().map(|index| &self.graph[index]);
            self.spatial.borrow_mut().rebuild(particles);
            self.spatial_dirty.set(false);
        }
    }
}

impl Default for ParticleGraph {
    fn default() -> Self {
        Self::new(ParticleParameters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_locations() -> ParticleGraph {
        ParticleGraph::build(
            &[
                Location::at("A", DVec2::new(0.0, 0.0)),
                Location::at("B", DVec2::new(10.0, 0.0)),
            ],
            &[Path::new("A", "B", 3, "red")],
            ParticleParameters::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_creates_nodes_labels_and_chain() {
        let graph = two_locations();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.labels.len(), 2);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.particle_count(), 7);
        assert_eq!(graph.locations(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_chain_positions_and_links() {
        let graph = two_locations();
        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        let chain = graph.chain(&ConnectionKey::new("A", "B", 0));
        assert_eq!(chain.len(), 3);

        for (i, expected_x) in [2.5, 5.0, 7.5].into_iter().enumerate() {
            let segment = graph.particle(chain[i]).unwrap();
            assert!((segment.position() - DVec2::new(expected_x, 0.0)).length() < 1e-12);
            assert!(segment.rotation().abs() < 1e-12);
            assert_eq!(segment.as_edge().unwrap().path_index, i as u32);
        }

        assert!(graph.is_attracted(chain[0], a));
        assert!(graph.is_attracted(chain[0], chain[1]));
        assert!(graph.is_attracted(chain[1], chain[0]));
        assert!(graph.is_attracted(chain[1], chain[2]));
        assert!(graph.is_attracted(chain[2], chain[1]));
        assert!(graph.is_attracted(chain[2], b));
        assert!(graph.attraction_targets(a).is_empty());
        assert!(graph.attraction_targets(b).is_empty());
    }

    #[test]
    fn test_label_sits_right_of_node() {
        let graph = two_locations();
        let label = graph.label("A").unwrap();
        let node = graph.node("A").unwrap();
        let expected_x = label.body().size().x / 2.0 + LABEL_GAP;
        assert!((label.position().x - expected_x).abs() < 1e-12);
        assert_eq!(graph.attraction_targets(label.id()), vec![node.id()]);
    }

    #[test]
    fn test_default_positions_spread_along_x() {
        let graph = ParticleGraph::build(
            &[Location::new("A"), Location::new("B"), Location::new("C")],
            &[],
            ParticleParameters::default(),
        )
        .unwrap();
        assert_eq!(graph.node("C").unwrap().position(), DVec2::new(6.0, 0.0));
    }

    #[test]
    fn test_duplicate_location_rejected() {
        let result = ParticleGraph::build(
            &[Location::new("A"), Location::new("A")],
            &[],
            ParticleParameters::default(),
        );
        assert!(matches!(result, Err(GraphError::DuplicateLocation(name)) if name == "A"));
    }

    #[test]
    fn test_zero_iterations_change_nothing() {
        let mut graph = two_locations();
        let before: Vec<_> = graph.particles().map(|p| (p.position(), p.rotation())).collect();
        let moved = graph.optimize_layout(0, 0.1).unwrap();
        let after: Vec<_> = graph.particles().map(|p| (p.position(), p.rotation())).collect();
        assert_eq!(moved, 0.0);
        assert_eq!(before, after);
    }

    #[test]
    fn test_optimize_separates_overlapping_nodes() {
        let mut graph = ParticleGraph::build(
            &[
                Location::at("A", DVec2::new(0.0, 0.0)),
                Location::at("B", DVec2::new(0.5, 0.0)),
            ],
            &[],
            ParticleParameters::default(),
        )
        .unwrap();
        let moved = graph.optimize_layout(10, 0.1).unwrap();
        assert!(moved > 0.0);
        assert!(graph.node("A").unwrap().position().x < 0.0);
        assert!(graph.node("B").unwrap().position().x > 0.5);
    }

    #[test]
    fn test_paths_derived_from_segments() {
        let graph = two_locations();
        assert_eq!(graph.paths(), vec![Path::new("A", "B", 3, "red")]);
        assert_eq!(graph.edge_colors(), vec!["red".to_string()]);
        assert_eq!(graph.connection_count("B", "A"), 1);
    }

    #[test]
    fn test_particle_at_follows_simulation() {
        let mut graph = two_locations();
        let a = graph.node_id("A").unwrap();
        assert_eq!(graph.particle_at(0.0, 0.0), Some(a));

        graph.particle_mut(a).unwrap().body_mut().set_position(DVec2::new(0.0, 20.0));
        assert_eq!(graph.particle_at(0.0, 20.0), Some(a));
        assert_eq!(graph.particle_at(0.0, 0.0), None);
    }

    #[test]
    fn test_particles_in_rect_by_type() {
        let graph = two_locations();
        let edges = graph.particles_of_type_in_rect(
            ParticleType::Edge,
            DVec2::new(1.0, -1.0),
            DVec2::new(9.0, 1.0),
        );
        assert_eq!(edges.len(), 3);
    }
}

//! Operations on whole edge chains: walking, repairing and straightening.

use std::collections::HashSet;
use std::f64::consts::PI;

use glam::DVec2;

use super::engine::ParticleGraph;
use super::key::ConnectionKey;
use crate::error::GraphError;
use crate::particle::{ParticleId, ParticleType};

impl ParticleGraph {
    // =========================================================================
    // Walking
    // =========================================================================

    /// The two nodes at the ends of the chain containing edge segment `id`.
    ///
    /// Walks the attraction links from `id` in both directions, always taking
    /// the first target not visited yet, until a node is reached. A chain
    /// that starts and ends at the same location yields that node twice.
    pub fn chain_endpoints(&self, id: ParticleId) -> Result<(ParticleId, ParticleId), GraphError> {
        let particle = self.particle(id).ok_or(GraphError::UnknownParticle(id))?;
        if particle.particle_type() != ParticleType::Edge {
            return Err(GraphError::TypeKind {
                id,
                expected: "edge",
                found: particle.particle_type(),
            });
        }

        let mut visited = HashSet::from([id]);
        let first = self.walk_to_node(id, &mut visited)?;
        let second = self.walk_to_node(id, &mut visited)?;
        Ok((first, second))
    }

    fn walk_to_node(&self, start: ParticleId, visited: &mut HashSet<ParticleId>) -> Result<ParticleId, GraphError> {
        let mut current = start;
        loop {
            let targets = self.attraction_targets(current);
            let Some(next) = targets.iter().copied().find(|t| !visited.contains(t)) else {
                // Both ends of a loop chain share one node.
                return targets
                    .into_iter()
                    .find(|&t| self.particle(t).is_some_and(|p| p.particle_type() == ParticleType::Node))
                    .ok_or(GraphError::BrokenChain { id: current });
            };
            visited.insert(next);

            let found = self
                .particle(next)
                .ok_or(GraphError::UnknownParticle(next))?
                .particle_type();
            match found {
                ParticleType::Node => return Ok(next),
                ParticleType::Edge => current = next,
                ParticleType::Label => {
                    return Err(GraphError::TypeKind {
                        id: next,
                        expected: "node or edge",
                        found,
                    });
                }
            }
        }
    }

    /// Rotation at which to draw the image of edge segment `id`.
    ///
    /// Images are flipped by half a turn where needed so that they always
    /// face the upper side of the line between the chain's two nodes.
    pub fn edge_image_rotation(&self, id: ParticleId) -> Result<f64, GraphError> {
        let (node_1, node_2) = self.chain_endpoints(id)?;
        let rotation = self.particle(id).ok_or(GraphError::UnknownParticle(id))?.rotation();

        let Some(direction) = (self.position_of(node_2)? - self.position_of(node_1)?).try_normalize()
        else {
            log::warn!("chain of edge segment {} has coincident end nodes, keeping its rotation", id);
            return Ok(rotation);
        };
        let mut normal = direction.perp();
        if normal.y < 0.0 {
            normal = -normal;
        }
        if normal.perp_dot(DVec2::from_angle(rotation)) > 0.0 {
            Ok(rotation + PI)
        } else {
            Ok(rotation)
        }
    }

    // =========================================================================
    // Repair
    // =========================================================================

    /// Rebuild every attraction link from the lookup tables.
    ///
    /// Nodes are attracted to nothing, each label to its own node, and each
    /// connection is relinked with [`ParticleGraph::repair_connection`].
    pub fn repair_connections(&mut self) -> Result<(), GraphError> {
        let nodes: Vec<_> = self.nodes.values().copied().collect();
        for node in nodes {
            self.clear_links(node);
        }

        let labels: Vec<_> = self
            .labels
            .iter()
            .map(|(name, &label)| (name.clone(), label))
            .collect();
        for (name, label) in labels {
            self.clear_links(label);
            let node = self.require_node(&name)?;
            self.link(label, node)?;
        }

        let connections = self.connections();
        for connection in &connections {
            self.repair_connection(connection)?;
        }
        log::info!("repaired links of {} connections", connections.len());
        Ok(())
    }

    /// Rebuild the links of one chain in `path_index` order.
    ///
    /// The chain is attached to the two nodes so that its first segment
    /// hangs off whichever node it is currently closer to.
    pub fn repair_connection(&mut self, connection: &ConnectionKey) -> Result<(), GraphError> {
        let mut chain = self.chain(connection);
        let Some(&first) = chain.first() else {
            log::warn!(
                "no connection {} between '{}' and '{}' to repair",
                connection.connection_index,
                connection.location_1,
                connection.location_2
            );
            return Ok(());
        };
        let node_1 = self.require_node(&connection.location_1)?;
        let node_2 = self.require_node(&connection.location_2)?;

        let start = self.position_of(first)?;
        if start.distance(self.position_of(node_1)?) > start.distance(self.position_of(node_2)?) {
            chain.reverse();
        }

        for &segment in &chain {
            self.clear_links(segment);
        }
        for (i, &segment) in chain.iter().enumerate() {
            let previous = if i == 0 { node_1 } else { chain[i - 1] };
            let next = chain.get(i + 1).copied().unwrap_or(node_2);
            self.link(segment, previous)?;
            self.link(segment, next)?;
        }
        Ok(())
    }

    // =========================================================================
    // Straightening
    // =========================================================================

    /// Lay every connection out on the straight line between its nodes.
    pub fn straighten_connections(&mut self, x_periodic: bool, y_periodic: bool) -> Result<(), GraphError> {
        for connection in self.connections() {
            self.straighten_connection(&connection, x_periodic, y_periodic)?;
        }
        Ok(())
    }

    /// Lay one connection out evenly on the straight line between its
    /// nodes, oriented along it.
    ///
    /// Parallel connections between the same locations are shifted
    /// sideways by one segment width each so they do not overlap. With a
    /// graph extent set, periodic axes take the shorter way around and
    /// positions are wrapped back into the extent.
    pub fn straighten_connection(
        &mut self,
        connection: &ConnectionKey,
        x_periodic: bool,
        y_periodic: bool,
    ) -> Result<(), GraphError> {
        let chain = self.chain(connection);
        let Some(&first) = chain.first() else {
            return Ok(());
        };
        let max_connection_index = self
            .connections()
            .iter()
            .filter(|other| other.same_locations(connection))
            .map(|other| other.connection_index)
            .max()
            .unwrap_or(connection.connection_index);

        let mut node_1 = self.require_node(&connection.location_1)?;
        let mut node_2 = self.require_node(&connection.location_2)?;
        if self.is_attracted(first, node_2) && !self.is_attracted(first, node_1) {
            std::mem::swap(&mut node_1, &mut node_2);
        }

        let start = self.position_of(node_1)?;
        let mut delta = self.position_of(node_2)? - start;
        if let Some(extent) = self.extent {
            delta = extent.shortest_delta(delta, x_periodic, y_periodic);
        }
        let rotation = delta.y.atan2(delta.x);

        let width = self
            .particle(first)
            .map(|p| p.body().size().min_element())
            .unwrap_or_default();
        let shift = connection.connection_index as f64 - max_connection_index as f64 / 2.0;
        let offset = delta.perp().normalize_or_zero() * width * shift;

        let length = chain.len() as f64;
        for (i, &segment) in chain.iter().enumerate() {
            let mut position = start + delta * (i as f64 + 1.0) / (length + 1.0);
            if let Some(extent) = self.extent {
                position = extent.wrap(position);
            }
            let body = self.particle_mut(segment)?.body_mut();
            body.set_position(position + offset);
            body.set_rotation(rotation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphExtent, Location, Path};
    use crate::particle::ParticleParameters;

    fn graph() -> ParticleGraph {
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

    fn ab() -> ConnectionKey {
        ConnectionKey::new("A", "B", 0)
    }

    fn assert_chain_links(graph: &ParticleGraph, chain: &[ParticleId], start: ParticleId, end: ParticleId) {
        for (i, &segment) in chain.iter().enumerate() {
            let previous = if i == 0 { start } else { chain[i - 1] };
            let next = chain.get(i + 1).copied().unwrap_or(end);
            let mut expected = vec![previous, next];
            expected.sort();
            assert_eq!(graph.attraction_targets(segment), expected);
        }
    }

    #[test]
    fn test_chain_endpoints_from_middle() {
        let graph = graph();
        let chain = graph.chain(&ab());
        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        assert_eq!(graph.chain_endpoints(chain[1]).unwrap(), (a, b));
    }

    #[test]
    fn test_chain_endpoints_of_loop() {
        let mut graph = graph();
        let looped = graph.add_connection("A", "A", 2, "grey").unwrap();
        let a = graph.node_id("A").unwrap();
        let chain = graph.chain(&looped);
        assert_eq!(graph.chain_endpoints(chain[0]).unwrap(), (a, a));
    }

    #[test]
    fn test_chain_endpoints_rejects_label_in_chain() {
        let mut graph = graph();
        let chain = graph.chain(&ab());
        let label = graph.label_id("A").unwrap();
        graph.clear_links(chain[0]);
        graph.link(chain[0], label).unwrap();
        graph.link(chain[0], chain[1]).unwrap();

        let err = graph.chain_endpoints(chain[1]).unwrap_err();
        assert!(matches!(err, GraphError::TypeKind { id, found: ParticleType::Label, .. } if id == label));
    }

    #[test]
    fn test_chain_endpoints_reports_dead_end() {
        let mut graph = graph();
        let chain = graph.chain(&ab());
        graph.clear_links(chain[0]);
        let err = graph.chain_endpoints(chain[1]).unwrap_err();
        assert!(matches!(err, GraphError::BrokenChain { id } if id == chain[0]));
    }

    #[test]
    fn test_chain_endpoints_needs_edge() {
        let graph = graph();
        let a = graph.node_id("A").unwrap();
        assert!(matches!(
            graph.chain_endpoints(a),
            Err(GraphError::TypeKind { found: ParticleType::Node, .. })
        ));
    }

    #[test]
    fn test_repair_restores_links() {
        let mut graph = graph();
        let chain = graph.chain(&ab());
        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        let label = graph.label_id("A").unwrap();
        for &segment in &chain {
            graph.clear_links(segment);
        }
        graph.link(a, b).unwrap();
        graph.clear_links(label);

        graph.repair_connections().unwrap();

        assert!(graph.attraction_targets(a).is_empty());
        assert_eq!(graph.attraction_targets(label), vec![a]);
        assert_chain_links(&graph, &chain, a, b);
    }

    #[test]
    fn test_repair_orients_by_proximity() {
        let mut graph = graph();
        let chain = graph.chain(&ab());
        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        graph.set_particle_pose(chain[0], DVec2::new(9.0, 0.0), None).unwrap();
        graph.set_particle_pose(chain[2], DVec2::new(1.0, 0.0), None).unwrap();

        graph.repair_connection(&ab()).unwrap();

        let reversed: Vec<_> = chain.iter().rev().copied().collect();
        assert_chain_links(&graph, &reversed, a, b);
    }

    #[test]
    fn test_repair_single_segment() {
        let mut graph = graph();
        let single = graph.add_connection("B", "A", 1, "green").unwrap();
        let segment = graph.chain(&single)[0];
        graph.clear_links(segment);
        graph.repair_connection(&single).unwrap();
        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        assert_eq!(graph.attraction_targets(segment), vec![a, b]);
    }

    #[test]
    fn test_straighten_lays_out_evenly() {
        let mut graph = graph();
        let chain = graph.chain(&ab());
        graph.set_particle_pose(chain[1], DVec2::new(4.0, 3.0), Some(1.0)).unwrap();

        graph.straighten_connections(false, false).unwrap();

        for (i, expected_x) in [2.5, 5.0, 7.5].into_iter().enumerate() {
            let segment = graph.particle(chain[i]).unwrap();
            assert!((segment.position() - DVec2::new(expected_x, 0.0)).length() < 1e-12);
            assert!(segment.rotation().abs() < 1e-12);
        }
    }

    #[test]
    fn test_straighten_offsets_parallel_connections() {
        let mut graph = graph();
        let second = graph.add_connection("A", "B", 3, "blue").unwrap();
        graph.straighten_connections(false, false).unwrap();

        let first_middle = graph.particle(graph.chain(&ab())[1]).unwrap().position();
        let second_middle = graph.particle(graph.chain(&second)[1]).unwrap().position();
        assert!((first_middle - DVec2::new(5.0, -0.4)).length() < 1e-12);
        assert!((second_middle - DVec2::new(5.0, 0.4)).length() < 1e-12);
    }

    #[test]
    fn test_straighten_across_periodic_boundary() {
        let mut graph = ParticleGraph::build(
            &[
                Location::at("A", DVec2::new(1.0, 0.0)),
                Location::at("B", DVec2::new(19.0, 0.0)),
            ],
            &[Path::new("A", "B", 3, "red")],
            ParticleParameters::default(),
        )
        .unwrap();
        graph.set_graph_extent(Some(GraphExtent::new(0.0, 20.0, -10.0, 10.0)));
        graph.straighten_connections(true, false).unwrap();

        let chain = graph.chain(&ab());
        for (i, expected_x) in [0.5, 0.0, 19.5].into_iter().enumerate() {
            let segment = graph.particle(chain[i]).unwrap();
            assert!((segment.position().x - expected_x).abs() < 1e-12);
            assert!((segment.rotation() - PI).abs() < 1e-12);
        }
    }

    #[test]
    fn test_edge_image_rotation_faces_up() {
        let mut graph = graph();
        let segment = graph.chain(&ab())[1];
        assert_eq!(graph.edge_image_rotation(segment).unwrap(), 0.0);

        graph.set_particle_pose(segment, DVec2::new(5.0, 0.0), Some(PI)).unwrap();
        assert!((graph.edge_image_rotation(segment).unwrap() - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_edge_image_rotation_with_coincident_nodes() {
        let mut graph = graph();
        let segment = graph.chain(&ab())[0];
        graph.set_node_position("B", DVec2::ZERO).unwrap();
        graph.set_particle_pose(segment, DVec2::ZERO, Some(0.3)).unwrap();
        assert_eq!(graph.edge_image_rotation(segment).unwrap(), 0.3);
    }
}

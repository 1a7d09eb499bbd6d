//! Structural edits and bulk property changes.
//!
//! All edits keep the edge lookup keys canonical and every chain contiguous:
//! segment `path_index` values of a connection always run from 0 without
//! gaps, and the attraction links walk from one endpoint node to the other.

use std::collections::HashMap;

use glam::DVec2;

use super::engine::ParticleGraph;
use super::key::{ConnectionKey, EdgeKey};
use crate::error::GraphError;
use crate::particle::text::{self, TextMeasure};
use crate::particle::{EdgeParticle, ParticleId, ParticleParameters};

impl ParticleGraph {
    // =========================================================================
    // Connections
    // =========================================================================

    fn has_connection(&self, connection: &ConnectionKey) -> bool {
        self.edges
            .range(connection.segment(0)..=connection.segment(u32::MAX))
            .next()
            .is_some()
    }

    /// Add a chain of `length` edge segments between two locations.
    ///
    /// Segments are spaced evenly on the straight line from `location_1` to
    /// `location_2` and oriented along it. Segment 0 is attracted to
    /// `location_1`'s node, the last one to `location_2`'s, and neighbors
    /// attract each other. If the locations are already connected, the new
    /// chain gets the lowest unused connection index.
    pub fn add_connection(
        &mut self,
        location_1: &str,
        location_2: &str,
        length: u32,
        color: &str,
    ) -> Result<ConnectionKey, GraphError> {
        let node_1 = self.require_node(location_1)?;
        let node_2 = self.require_node(location_2)?;
        if length == 0 {
            return Err(GraphError::InvalidLength);
        }

        let mut connection = ConnectionKey::new(location_1, location_2, 0);
        while self.has_connection(&connection) {
            connection.connection_index += 1;
        }

        let start = self.position_of(node_1)?;
        let delta = self.position_of(node_2)? - start;
        let rotation = delta.y.atan2(delta.x);

        let ids = (0..length)
            .map(|_| self.allocate_id())
            .collect::<Result<Vec<_>, _>>()?;

        let mut previous = node_1;
        for (path_index, id) in (0..length).zip(ids) {
            let position = start + delta * (path_index + 1) as f64 / (length + 1) as f64;
            let edge = EdgeParticle::new(
                color,
                location_1,
                location_2,
                path_index,
                connection.connection_index,
                &self.params,
            )
            .into_particle(id, position, rotation, &self.params);
            self.insert_particle(edge)?;
            self.edges.insert(connection.segment(path_index), id);

            self.link(id, previous)?;
            if path_index > 0 {
                self.link(previous, id)?;
            }
            previous = id;
        }
        self.link(previous, node_2)?;

        log::info!(
            "added connection {} between '{}' and '{}' with {} segments",
            connection.connection_index,
            location_1,
            location_2,
            length
        );
        Ok(connection)
    }

    /// Set the color of every segment of a connection.
    ///
    /// Returns the number of recolored segments.
    pub fn recolor_connection(&mut self, connection: &ConnectionKey, color: &str) -> Result<usize, GraphError> {
        let chain = self.chain(connection);
        if chain.is_empty() {
            log::warn!(
                "no connection {} between '{}' and '{}' to recolor",
                connection.connection_index,
                connection.location_1,
                connection.location_2
            );
        }
        for &id in &chain {
            if let Some(edge) = self.particle_mut(id)?.as_edge_mut() {
                edge.color = color.to_string();
            }
        }
        Ok(chain.len())
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Delete a location: its node, its label and every edge segment of
    /// every connection that ends there.
    ///
    /// Returns the ids of all removed particles.
    pub fn delete_node(&mut self, location: &str) -> Result<Vec<ParticleId>, GraphError> {
        let node_id = self.require_node(location)?;

        let keys: Vec<EdgeKey> = self
            .edges
            .keys()
            .filter(|key| key.touches(location))
            .cloned()
            .collect();
        let mut removed = Vec::with_capacity(keys.len() + 2);
        for key in &keys {
            if let Some(id) = self.edges.remove(key) {
                self.remove_particle(id);
                removed.push(id);
            }
        }

        if let Some(label_id) = self.labels.remove(location) {
            self.remove_particle(label_id);
            removed.push(label_id);
        }
        self.nodes.remove(location);
        self.remove_particle(node_id);
        removed.push(node_id);

        log::info!(
            "deleted location '{}' and {} edge segments",
            location,
            keys.len()
        );
        Ok(removed)
    }

    /// Delete one edge segment.
    ///
    /// Chain neighbors that were attracted to the removed segment are
    /// attracted to its other neighbor instead, and later segments of the
    /// connection move down one `path_index`. Removing the only segment
    /// removes the connection. An unknown key is logged and ignored.
    ///
    /// Returns whether a segment was removed.
    pub fn delete_edge(&mut self, key: &EdgeKey) -> Result<bool, GraphError> {
        let Some(id) = self.edges.remove(key) else {
            log::warn!(
                "could not find edge segment to remove: {} -> {} ({}, connection {})",
                key.location_1,
                key.location_2,
                key.path_index,
                key.connection_index
            );
            return Ok(false);
        };

        let neighbors = self.attraction_targets(id);
        for &neighbor in &neighbors {
            if self.is_attracted(neighbor, id) {
                for &other in neighbors.iter().filter(|&&other| other != neighbor) {
                    self.link(neighbor, other)?;
                }
            }
        }
        self.remove_particle(id);

        let connection = key.connection();
        let later: Vec<(EdgeKey, ParticleId)> = self
            .edges
            .range(connection.segment(key.path_index.saturating_add(1))..=connection.segment(u32::MAX))
            .map(|(k, &id)| (k.clone(), id))
            .collect();
        for (old_key, segment) in later {
            self.edges.remove(&old_key);
            let path_index = old_key.path_index - 1;
            if let Some(edge) = self.particle_mut(segment)?.as_edge_mut() {
                edge.path_index = path_index;
            }
            self.edges.insert(connection.segment(path_index), segment);
        }

        log::info!(
            "deleted edge segment {} of connection {} between '{}' and '{}'",
            key.path_index,
            key.connection_index,
            key.location_1,
            key.location_2
        );
        Ok(true)
    }

    /// Delete the edge segment particle `id`.
    pub fn delete_edge_particle(&mut self, id: ParticleId) -> Result<bool, GraphError> {
        let particle = self.particle(id).ok_or(GraphError::UnknownParticle(id))?;
        let edge = particle.as_edge().ok_or(GraphError::TypeKind {
            id,
            expected: "edge",
            found: particle.particle_type(),
        })?;
        let key = EdgeKey::of(edge);
        if self.edge_id(&key) != Some(id) {
            log::warn!("edge segment {} is not registered under its own key", id);
            return Ok(false);
        }
        self.delete_edge(&key)
    }

    // =========================================================================
    // Renaming
    // =========================================================================

    /// Rename a location in its node, its label and every edge key.
    ///
    /// The label box is measured again for the new text.
    pub fn rename_node(&mut self, old_name: &str, new_name: &str) -> Result<(), GraphError> {
        if old_name == new_name {
            return Ok(());
        }
        let node_id = self.require_node(old_name)?;
        if self.nodes.contains_key(new_name) {
            return Err(GraphError::DuplicateLocation(new_name.to_string()));
        }

        self.nodes.remove(old_name);
        self.nodes.insert(new_name.to_string(), node_id);
        if let Some(node) = self.particle_mut(node_id)?.as_node_mut() {
            node.label = new_name.to_string();
        }

        if let Some(label_id) = self.labels.remove(old_name) {
            self.labels.insert(new_name.to_string(), label_id);
            let renamed = self
                .particle(label_id)
                .and_then(|p| p.as_label())
                .cloned()
                .map(|mut label| {
                    label.text = new_name.to_string();
                    let size = label.measure(self.font.as_ref());
                    (label, size)
                });
            if let Some((label, size)) = renamed {
                let particle = self.particle_mut(label_id)?;
                particle.body_mut().set_size(size);
                if let Some(current) = particle.as_label_mut() {
                    *current = label;
                }
            }
        }

        let rename = |name: &str| {
            if name == old_name {
                new_name.to_string()
            } else {
                name.to_string()
            }
        };
        let keys: Vec<EdgeKey> = self
            .edges
            .keys()
            .filter(|key| key.touches(old_name))
            .cloned()
            .collect();
        for key in keys {
            let Some(id) = self.edges.remove(&key) else {
                continue;
            };
            let new_key = EdgeKey::new(
                rename(&key.location_1),
                rename(&key.location_2),
                key.path_index,
                key.connection_index,
            );
            if let Some(edge) = self.particle_mut(id)?.as_edge_mut() {
                edge.location_1 = new_key.location_1.clone();
                edge.location_2 = new_key.location_2.clone();
            }
            self.edges.insert(new_key, id);
        }

        log::info!("renamed location '{}' to '{}'", old_name, new_name);
        Ok(())
    }

    // =========================================================================
    // Parameters and Appearance
    // =========================================================================

    /// Push `params` to every particle; each kind takes the subset it uses.
    pub fn set_parameters(&mut self, params: ParticleParameters) {
        self.params = params;
        for particle in self.particles_mut() {
            particle.apply_parameters(&params);
        }
        log::info!("updated particle parameters: {:?}", params);
    }

    /// Replace edge colors according to `color_map` (old color to new
    /// color). Recolored segments leave image mode.
    pub fn set_edge_colors(&mut self, color_map: &HashMap<String, String>) {
        for particle in self.particles_mut() {
            if let Some(edge) = particle.as_edge_mut() {
                if let Some(color) = color_map.get(&edge.color) {
                    edge.color = color.clone();
                    edge.image_file_path = None;
                }
            }
        }
    }

    /// Draw edges as images, one image per edge color.
    ///
    /// Fails without changing anything if a color present in the graph has
    /// no image in `image_map`.
    pub fn set_edge_images(&mut self, image_map: &HashMap<String, String>) -> Result<(), GraphError> {
        if let Some(color) = self
            .edge_colors()
            .into_iter()
            .find(|color| !image_map.contains_key(color))
        {
            return Err(GraphError::MissingMapping { color });
        }
        for particle in self.particles_mut() {
            if let Some(edge) = particle.as_edge_mut() {
                edge.image_file_path = image_map.get(&edge.color).cloned();
            }
        }
        Ok(())
    }

    /// Set every node to a square of edge length `size`.
    pub fn set_node_size(&mut self, size: f64) {
        let ids: Vec<_> = self.nodes.values().copied().collect();
        for id in ids {
            if let Ok(particle) = self.particle_mut(id) {
                particle.body_mut().set_size(DVec2::splat(size));
            }
        }
    }

    /// Set node sizes individually, in the order of
    /// [`ParticleGraph::locations`].
    pub fn set_node_sizes(&mut self, sizes: &[f64]) -> Result<(), GraphError> {
        if sizes.len() != self.nodes.len() {
            return Err(GraphError::SizeMismatch {
                expected: self.nodes.len(),
                found: sizes.len(),
            });
        }
        let ids: Vec<_> = self.nodes.values().copied().collect();
        for (id, &size) in ids.into_iter().zip(sizes) {
            self.particle_mut(id)?.body_mut().set_size(DVec2::splat(size));
        }
        Ok(())
    }

    pub fn set_node_color(&mut self, location: &str, color: &str) -> Result<(), GraphError> {
        let id = self.require_node(location)?;
        if let Some(node) = self.particle_mut(id)?.as_node_mut() {
            node.color = color.to_string();
        }
        Ok(())
    }

    pub fn set_node_image(&mut self, location: &str, image_path: Option<String>) -> Result<(), GraphError> {
        let id = self.require_node(location)?;
        if let Some(node) = self.particle_mut(id)?.as_node_mut() {
            node.image_path = image_path;
        }
        Ok(())
    }

    /// Measure all labels with a new font and size.
    pub fn set_label_font(&mut self, font: Box<dyn TextMeasure>, font_size: u32) {
        self.height_scale = text::label_height_scale(font.as_ref(), font_size);
        self.font = font;
        self.font_size = font_size;

        for &id in self.labels.values() {
            let Some(&index) = self.id_to_index.get(&id) else {
                continue;
            };
            let (body, kind) = self.graph[index].parts_mut();
            if let crate::particle::ParticleKind::Label(label) = kind {
                label.font_name = self.font.font_name().to_string();
                label.font_size = font_size;
                label.height_scale = self.height_scale;
                body.set_size(label.measure(self.font.as_ref()));
            }
        }
        self.spatial_dirty.set(true);
        log::info!(
            "measured labels with font '{}' at size {}",
            self.font.font_name(),
            font_size
        );
    }

    // =========================================================================
    // Positions
    // =========================================================================

    /// Place every label at its node plus `offset`.
    pub fn move_labels_to_nodes(&mut self, offset: DVec2) {
        let placements: Vec<(ParticleId, DVec2)> = self
            .labels
            .iter()
            .filter_map(|(name, &label)| self.node(name).map(|node| (label, node.position())))
            .collect();
        for (label, position) in placements {
            if let Ok(particle) = self.particle_mut(label) {
                particle.body_mut().set_position(position + offset);
            }
        }
    }

    /// Multiply every particle position by `factor`.
    pub fn scale_positions(&mut self, factor: f64) {
        for particle in self.particles_mut() {
            let position = particle.position();
            particle.body_mut().set_position(position * factor);
        }
    }

    pub fn set_node_position(&mut self, location: &str, position: DVec2) -> Result<(), GraphError> {
        let id = self.require_node(location)?;
        self.particle_mut(id)?.body_mut().set_position(position);
        Ok(())
    }

    /// Set or clear the position a node relaxes towards.
    pub fn set_node_target(&mut self, location: &str, target: Option<DVec2>) -> Result<(), GraphError> {
        let id = self.require_node(location)?;
        self.particle_mut(id)?.body_mut().set_target_position(target);
        Ok(())
    }

    /// Move and optionally rotate any particle, e.g. after a drag. The
    /// particle comes to rest where it is put.
    pub fn set_particle_pose(
        &mut self,
        id: ParticleId,
        position: DVec2,
        rotation: Option<f64>,
    ) -> Result<(), GraphError> {
        let body = self.particle_mut(id)?.body_mut();
        body.halt();
        body.set_position(position);
        if let Some(rotation) = rotation {
            body.set_rotation(rotation);
        }
        Ok(())
    }
}

//! Keys and plain-data descriptions of graph content.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::particle::{EdgeParticle, sorted_pair};

/// Lookup key of one edge segment.
///
/// Location names are always stored in alphabetical order. Fields are
/// ordered so that all segments of one connection sort together by
/// `path_index`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub location_1: String,
    pub location_2: String,
    pub connection_index: u32,
    pub path_index: u32,
}

impl EdgeKey {
    /// Create a key, sorting the two location names.
    pub fn new(
        location_a: impl Into<String>,
        location_b: impl Into<String>,
        path_index: u32,
        connection_index: u32,
    ) -> Self {
        let connection = ConnectionKey::new(location_a, location_b, connection_index);
        connection.segment(path_index)
    }

    /// Key of the segment described by `edge`.
    pub fn of(edge: &EdgeParticle) -> Self {
        Self::new(
            edge.location_1.as_str(),
            edge.location_2.as_str(),
            edge.path_index,
            edge.connection_index,
        )
    }

    /// Key of the connection this segment belongs to.
    pub fn connection(&self) -> ConnectionKey {
        ConnectionKey {
            location_1: self.location_1.clone(),
            location_2: self.location_2.clone(),
            connection_index: self.connection_index,
        }
    }

    /// Whether `location` is one of the two endpoints.
    pub fn touches(&self, location: &str) -> bool {
        self.location_1 == location || self.location_2 == location
    }
}

/// Identifies one chain of edge segments between two locations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub location_1: String,
    pub location_2: String,
    pub connection_index: u32,
}

impl ConnectionKey {
    /// Create a key, sorting the two location names.
    pub fn new(
        location_a: impl Into<String>,
        location_b: impl Into<String>,
        connection_index: u32,
    ) -> Self {
        let (location_1, location_2) = sorted_pair(location_a.into(), location_b.into());
        Self {
            location_1,
            location_2,
            connection_index,
        }
    }

    /// Key of the segment at `path_index` in this connection.
    pub fn segment(&self, path_index: u32) -> EdgeKey {
        EdgeKey {
            location_1: self.location_1.clone(),
            location_2: self.location_2.clone(),
            connection_index: self.connection_index,
            path_index,
        }
    }

    /// Whether both keys join the same pair of locations.
    pub fn same_locations(&self, other: &ConnectionKey) -> bool {
        self.location_1 == other.location_1 && self.location_2 == other.location_2
    }
}

/// A path between two locations, as used to build a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub location_1: String,
    pub location_2: String,
    /// Number of edge segments.
    pub length: u32,
    pub color: String,
}

impl Path {
    pub fn new(
        location_1: impl Into<String>,
        location_2: impl Into<String>,
        length: u32,
        color: impl Into<String>,
    ) -> Self {
        Self {
            location_1: location_1.into(),
            location_2: location_2.into(),
            length,
            color: color.into(),
        }
    }
}

/// A named location with an optional initial position.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub position: Option<DVec2>,
}

impl Location {
    /// Location placed at the default position for its index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: None,
        }
    }

    /// Location placed at `position`.
    pub fn at(name: impl Into<String>, position: DVec2) -> Self {
        Self {
            name: name.into(),
            position: Some(position),
        }
    }
}

/// Rectangle the graph is drawn in, usually the background image extent.
///
/// Serialized as `[x_min, x_max, y_min, y_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct GraphExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl GraphExtent {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    #[inline]
    pub fn min(&self) -> DVec2 {
        DVec2::new(self.x_min, self.y_min)
    }

    #[inline]
    pub fn size(&self) -> DVec2 {
        DVec2::new(self.x_max - self.x_min, self.y_max - self.y_min)
    }

    /// Map `point` back into the extent, treating both axes as periodic.
    /// Degenerate axes are left untouched.
    pub fn wrap(&self, point: DVec2) -> DVec2 {
        let size = self.size();
        let min = self.min();
        let wrap_axis = |value: f64, min: f64, size: f64| {
            if size > 0.0 {
                (value - min).rem_euclid(size) + min
            } else {
                value
            }
        };
        DVec2::new(wrap_axis(point.x, min.x, size.x), wrap_axis(point.y, min.y, size.y))
    }

    /// Shortest version of `delta` when the given axes wrap around.
    pub fn shortest_delta(&self, mut delta: DVec2, x_periodic: bool, y_periodic: bool) -> DVec2 {
        let size = self.size();
        if x_periodic && delta.x.abs() > size.x / 2.0 {
            delta.x -= delta.x.signum() * size.x;
        }
        if y_periodic && delta.y.abs() > size.y / 2.0 {
            delta.y -= delta.y.signum() * size.y;
        }
        delta
    }
}

impl From<[f64; 4]> for GraphExtent {
    fn from(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }
}

impl From<GraphExtent> for [f64; 4] {
    fn from(extent: GraphExtent) -> Self {
        [extent.x_min, extent.x_max, extent.y_min, extent.y_max]
    }
}

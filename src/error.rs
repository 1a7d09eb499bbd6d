//! Error types for the particle graph.
//!
//! Structural edits are tolerant where they can be (absent edge segments are
//! logged and skipped). The variants here cover the cases that mean the graph
//! is inconsistent or the caller asked for something impossible.

use std::fmt;

use crate::particle::{ParticleId, ParticleType};

/// Errors raised by graph construction, editing, simulation and persistence.
#[derive(Debug)]
pub enum GraphError {
    /// A particle of an unexpected kind was found while walking a chain or
    /// computing an attraction force.
    TypeKind {
        /// The offending particle.
        id: ParticleId,
        /// What the caller expected to find there.
        expected: &'static str,
        /// What was actually found.
        found: ParticleType,
    },
    /// An edge color has no entry in a color-to-image mapping.
    MissingMapping {
        /// The color without an image.
        color: String,
    },
    /// No node exists for this location name.
    UnknownLocation(String),
    /// A node already exists for this location name.
    DuplicateLocation(String),
    /// No particle exists with this id.
    UnknownParticle(ParticleId),
    /// Two particles share one id.
    DuplicateParticle(ParticleId),
    /// A connection must consist of at least one edge segment.
    InvalidLength,
    /// A chain ends without reaching a node.
    BrokenChain {
        /// The segment where the walk got stuck.
        id: ParticleId,
    },
    /// A per-node value list does not match the number of nodes.
    SizeMismatch {
        /// Number of nodes in the graph.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// Every particle id up to `u32::MAX` is taken.
    IdsExhausted,
    /// The persisted document could not be read or written.
    Json(serde_json::Error),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::TypeKind { id, expected, found } => {
                write!(f, "{} is a {} particle, expected {}", id, found, expected)
            }
            GraphError::MissingMapping { color } => {
                write!(f, "no image file path specified for edge color '{}'", color)
            }
            GraphError::UnknownLocation(name) => write!(f, "unknown location '{}'", name),
            GraphError::DuplicateLocation(name) => {
                write!(f, "location '{}' already exists", name)
            }
            GraphError::UnknownParticle(id) => write!(f, "unknown particle {}", id),
            GraphError::DuplicateParticle(id) => write!(f, "duplicate particle id {}", id),
            GraphError::InvalidLength => {
                write!(f, "a connection needs at least one edge segment")
            }
            GraphError::BrokenChain { id } => write!(
                f,
                "chain through {} does not reach a node. Ensure that the graph is connected properly.",
                id
            ),
            GraphError::SizeMismatch { expected, found } => write!(
                f,
                "mismatch between number of nodes ({}) and number of values ({})",
                expected, found
            ),
            GraphError::IdsExhausted => write!(f, "no particle ids left to allocate"),
            GraphError::Json(e) => write!(f, "invalid particle graph document: {}", e),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mapping_names_color() {
        let err = GraphError::MissingMapping {
            color: "red".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no image file path specified for edge color 'red'"
        );
    }

    #[test]
    fn test_type_kind_message() {
        let err = GraphError::TypeKind {
            id: ParticleId(7),
            expected: "node or edge",
            found: ParticleType::Label,
        };
        assert_eq!(
            err.to_string(),
            "Particle(7) is a label particle, expected node or edge"
        );
    }

    #[test]
    fn test_json_error_has_source() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = GraphError::from(json_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}

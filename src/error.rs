//! Error types for editmesh.
//!
//! Operators validate their input before mutating anything, and roll back if
//! a later step fails, so an `Err` always means the mesh is unchanged.
//! Having nothing to do is not an error: see
//! [`OpReport::is_noop`](crate::ops::OpReport::is_noop).

use thiserror::Error;

use crate::mesh::VertexId;

/// Result type alias using [`EditError`].
pub type Result<T> = std::result::Result<T, EditError>;

/// Errors that can occur during mesh editing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// The selection has the wrong element kind or count for the operator.
    #[error("invalid selection: {reason}")]
    InvalidSelection {
        /// What the operator expected.
        reason: String,
    },

    /// The edit would produce faces with fewer than 3 corners, zero-length
    /// edges, or another result that cannot be repaired.
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// What would have become degenerate.
        reason: String,
    },

    /// An edge already joins the two vertices.
    #[error("edge ({v0:?}, {v1:?}) already exists")]
    DuplicateEdge {
        /// The first vertex.
        v0: VertexId,
        /// The second vertex.
        v1: VertexId,
    },

    /// The builder was given no polygons.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A polygon references a vertex index out of range.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The polygon index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl EditError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        EditError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an invalid selection error.
    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        EditError::InvalidSelection {
            reason: reason.into(),
        }
    }

    /// Create a degenerate geometry error.
    pub fn degenerate(reason: impl Into<String>) -> Self {
        EditError::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EditError::invalid_param("cuts", 0, "must be at least 1");
        assert_eq!(err.to_string(), "invalid parameter: cuts = 0 (must be at least 1)");
        let err = EditError::invalid_selection("select exactly one edge");
        assert_eq!(err.to_string(), "invalid selection: select exactly one edge");
    }
}

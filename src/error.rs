//! Error types for geospline.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh and curve operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The mesh has non-manifold topology.
    #[error("mesh has non-manifold topology: {details}")]
    NonManifold {
        /// Description of the non-manifold condition.
        details: String,
    },

    /// An edge has more than two incident faces, or two faces with the same winding.
    #[error("edge ({v0}, {v1}) has more than two incident faces")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// An edge has a single incident face. The intrinsic engine needs closed meshes.
    #[error("edge ({v0}, {v1}) lies on the mesh boundary")]
    BoundaryEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// Fewer faces than required are reachable from face 0.
    #[error("mesh is not connected enough, connection = {connection:.6} < {threshold:.6}")]
    Disconnected {
        /// Fraction of faces reached by the flood fill.
        connection: f64,
        /// Required fraction.
        threshold: f64,
    },

    /// A surface point references a face that does not exist.
    #[error("surface point references face {face}, mesh has {num_faces} faces")]
    InvalidSurfacePoint {
        /// The referenced face.
        face: usize,
        /// Number of faces in the mesh.
        num_faces: usize,
    },

    /// A control polygon does not describe a sequence of cubic segments.
    #[error("control polygon has {count} points, expected 3k+1 with k >= 1")]
    InvalidControlPolygon {
        /// Number of points supplied.
        count: usize,
    },

    /// A vertex requested by the caller does not exist.
    #[error("vertex {vertex} not found (mesh has {num_vertices} vertices)")]
    VertexNotFound {
        /// The requested vertex.
        vertex: usize,
        /// Number of vertices available.
        num_vertices: usize,
    },

    /// No path connects the two requested elements.
    #[error("no path from {from} to {to}")]
    Unreachable {
        /// Source element index.
        from: usize,
        /// Target element index.
        to: usize,
    },

    /// The intrinsic triangulation rejected an operation.
    #[error("flip network failure: {0}")]
    Topology(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Algorithm failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
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

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a topology error for the flip network.
    pub(crate) fn topology(message: impl Into<String>) -> Self {
        MeshError::Topology(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_message() {
        let err = MeshError::Disconnected {
            connection: 0.5,
            threshold: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "mesh is not connected enough, connection = 0.500000 < 1.000000"
        );
    }

    #[test]
    fn test_invalid_param() {
        let err = MeshError::invalid_param("subdivisions", 12, "must be in [1, 10]");
        assert_eq!(
            err.to_string(),
            "invalid parameter: subdivisions = 12 (must be in [1, 10])"
        );
    }
}

//! Pre-flight checks run before any path query.

use log::debug;

use super::trimesh::TriMesh;
use crate::error::{MeshError, Result};

/// Fraction of faces reachable from face 0 through face adjacency.
pub fn connected_ratio(mesh: &TriMesh) -> f64 {
    if mesh.num_faces() == 0 {
        return 0.0;
    }

    let mut visited = vec![false; mesh.num_faces()];
    let mut num_visited = 0usize;
    let mut stack = vec![0usize];

    while let Some(face) = stack.pop() {
        if visited[face] {
            continue;
        }
        visited[face] = true;
        num_visited += 1;
        for neighbor in mesh.adjacencies()[face] {
            if neighbor.is_valid() && !visited[neighbor.index()] {
                stack.push(neighbor.index());
            }
        }
    }

    num_visited as f64 / mesh.num_faces() as f64
}

/// Fail if fewer than `connection_threshold` of the faces are connected to
/// face 0.
///
/// The dual search never reaches a face in another component, so callers
/// run this before computing curves on an unknown mesh.
///
/// # Example
/// ```
/// use geospline::mesh::{shapes, validate_mesh};
///
/// assert!(validate_mesh(&shapes::icosphere(1), 1.0).is_ok());
/// assert!(validate_mesh(&shapes::disjoint_triangles(), 1.0).is_err());
/// ```
pub fn validate_mesh(mesh: &TriMesh, connection_threshold: f64) -> Result<()> {
    if mesh.num_faces() == 0 {
        return Err(MeshError::EmptyMesh);
    }

    let connection = connected_ratio(mesh);
    debug!(
        "mesh connectivity: {:.6} of {} faces reachable",
        connection,
        mesh.num_faces()
    );

    if connection < connection_threshold {
        return Err(MeshError::Disconnected {
            connection,
            threshold: connection_threshold,
        });
    }
    Ok(())
}

//! Connectivity construction.
//!
//! Builds the closed half-edge arena used by the intrinsic flip network from
//! the face-vertex lists of a [`TriMesh`](super::TriMesh).

use std::collections::HashMap;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh, Vertex};
use super::index::{FaceId, HalfEdgeId, VertexId};
use crate::error::{MeshError, Result};

/// Build a closed half-edge mesh from triangle faces.
///
/// Face `f` of the result is triangle `f` of the input. The second return
/// value maps each input triangle corner `k` to the half-edge going from
/// `t[k]` to `t[(k + 1) % 3]`.
///
/// Fails on boundary edges, on edges shared by more than two faces or with
/// inconsistent winding, and on vertices whose faces do not form a single
/// fan.
///
/// # Example
/// ```
/// use geospline::mesh::{build_connectivity, shapes};
///
/// let mesh = shapes::octahedron();
/// let (he, corners) = build_connectivity(mesh.triangles(), mesh.num_vertices()).unwrap();
/// assert_eq!(he.num_edges(), 12);
/// assert_eq!(corners.len(), 8);
/// ```
pub fn build_connectivity(
    triangles: &[[usize; 3]],
    num_vertices: usize,
) -> Result<(HalfEdgeMesh, Vec<[HalfEdgeId; 3]>)> {
    if triangles.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, t) in triangles.iter().enumerate() {
        for &vi in t {
            if vi >= num_vertices {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(num_vertices, triangles.len());
    mesh.vertices = vec![Vertex::default(); num_vertices];

    // Undirected edge -> half-edge pair. The first face to see an edge gets
    // the even slot.
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId> =
        HashMap::with_capacity(triangles.len() * 2);
    let mut corners = Vec::with_capacity(triangles.len());

    for (fi, t) in triangles.iter().enumerate() {
        let mut hes = [HalfEdgeId::invalid(); 3];
        for k in 0..3 {
            let a = t[k];
            let b = t[(k + 1) % 3];
            let key = (a.min(b), a.max(b));

            let he = match edge_map.get(&key) {
                Some(&first) => {
                    // The first side must run the other way
                    if mesh.halfedges[first.index()].origin.index() != b {
                        return Err(MeshError::NonManifoldEdge { v0: a, v1: b });
                    }
                    first.twin()
                }
                None => {
                    let he = HalfEdgeId::new(mesh.halfedges.len());
                    mesh.halfedges.push(HalfEdge::default());
                    mesh.halfedges.push(HalfEdge::default());
                    edge_map.insert(key, he);
                    he
                }
            };

            let rec = &mut mesh.halfedges[he.index()];
            if rec.face.is_valid() {
                return Err(MeshError::NonManifoldEdge { v0: a, v1: b });
            }
            rec.origin = VertexId::new(a);
            rec.face = FaceId::new(fi);
            hes[k] = he;
        }

        for k in 0..3 {
            mesh.halfedges[hes[k].index()].next = hes[(k + 1) % 3];
            mesh.vertices[t[k]].halfedge = hes[k];
        }
        mesh.faces.push(Face { halfedge: hes[0] });
        corners.push(hes);
    }

    for (&(v0, v1), &he) in &edge_map {
        if !mesh.halfedges[he.twin().index()].face.is_valid() {
            return Err(MeshError::BoundaryEdge { v0, v1 });
        }
    }

    check_vertex_fans(&mesh)?;

    Ok((mesh, corners))
}

/// Every vertex must be used and its faces must form one closed fan.
fn check_vertex_fans(mesh: &HalfEdgeMesh) -> Result<()> {
    let mut outgoing = vec![0usize; mesh.num_vertices()];
    for he in &mesh.halfedges {
        outgoing[he.origin.index()] += 1;
    }

    for v in mesh.vertex_ids() {
        if !mesh.vertex_halfedge(v).is_valid() {
            return Err(MeshError::NonManifold {
                details: format!("vertex {} is not used by any face", v.index()),
            });
        }
        let fan = mesh.vertex_halfedges(v).count();
        if fan != outgoing[v.index()] {
            return Err(MeshError::NonManifold {
                details: format!(
                    "vertex {} has {} incident edges but its fan covers {}",
                    v.index(),
                    outgoing[v.index()],
                    fan
                ),
            });
        }
    }
    Ok(())
}

//! Dual graph of a triangle mesh and corridor search over it.
//!
//! Nodes are faces; each face is linked to its (up to three) neighbors with
//! a weight equal to the distance between the two face centroids measured
//! after unfolding the pair into the plane. Strips are found with A* over
//! this graph using the straight-line distance between centroids as the
//! heuristic, which never overestimates the unfolded distance.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, info};
use nalgebra::Point3;

use super::unfold::unfold_face;
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, SurfacePoint, TriMesh};

/// Options for building a [`DualGeodesicSolver`].
#[derive(Debug, Clone)]
pub struct DualSolverOptions {
    /// Dual edges longer than this fraction of the bounding-box diagonal are
    /// reported as coarse.
    pub max_relative_edge_length: f64,
}

impl Default for DualSolverOptions {
    fn default() -> Self {
        Self {
            max_relative_edge_length: 0.05,
        }
    }
}

impl DualSolverOptions {
    /// Set the coarse-edge threshold, relative to the bounding-box diagonal.
    pub fn with_max_relative_edge_length(mut self, value: f64) -> Self {
        self.max_relative_edge_length = value;
        self
    }
}

/// A weighted link between two adjacent faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualEdge {
    /// The neighboring face, invalid on a boundary.
    pub node: FaceId,
    /// Unfolded centroid-to-centroid distance.
    pub length: f64,
}

impl Default for DualEdge {
    fn default() -> Self {
        Self {
            node: FaceId::invalid(),
            length: f64::INFINITY,
        }
    }
}

/// Dual graph over the faces of a [`TriMesh`].
///
/// Built once per mesh; read-only afterwards, so one solver can be shared
/// between threads.
#[derive(Debug, Clone)]
pub struct DualGeodesicSolver {
    graph: Vec<[DualEdge; 3]>,
    centroids: Vec<Point3<f64>>,
    max_edge_length: f64,
    num_coarse_edges: usize,
}

/// Entry in the A* priority queue.
#[derive(Debug, Clone)]
struct SearchEntry {
    face: usize,
    /// Distance from the start plus heuristic.
    priority: f64,
}

impl PartialEq for SearchEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchEntry {}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on priority, ties resolved towards the lower face index.
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.face.cmp(&self.face))
    }
}

impl DualGeodesicSolver {
    /// Build the dual graph of `mesh`.
    pub fn build(mesh: &TriMesh, options: &DualSolverOptions) -> Result<Self> {
        let diagonal = mesh
            .bounding_box()
            .map(|(min, max)| (max - min).norm())
            .ok_or(MeshError::EmptyMesh)?;
        let max_edge_length = options.max_relative_edge_length * diagonal;

        let centroids: Vec<Point3<f64>> = mesh
            .face_ids()
            .map(|f| {
                let [p0, p1, p2] = mesh.face_positions(f);
                Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
            })
            .collect();

        let mut graph = vec![[DualEdge::default(); 3]; mesh.num_faces()];
        let mut num_coarse_edges = 0;

        for f in mesh.face_ids() {
            let tr = mesh.triangle_coordinates(f);
            let c0 = (tr[0].coords + tr[1].coords + tr[2].coords) / 3.0;
            for k in 0..3 {
                let g = mesh.neighbor(f, k);
                if !g.is_valid() {
                    continue;
                }
                let unfolded = unfold_face(mesh, &tr, f, g)?;
                let c1 = (unfolded[0].coords + unfolded[1].coords + unfolded[2].coords) / 3.0;
                let length = (c1 - c0).norm();
                if length > max_edge_length {
                    num_coarse_edges += 1;
                }
                graph[f.index()][k] = DualEdge { node: g, length };
            }
        }

        info!(
            "built dual graph: {} nodes, {} coarse edges (threshold {:.6})",
            graph.len(),
            num_coarse_edges / 2,
            max_edge_length
        );

        Ok(Self {
            graph,
            centroids,
            max_edge_length,
            num_coarse_edges: num_coarse_edges / 2,
        })
    }

    /// Number of nodes (faces).
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.graph.len()
    }

    /// The three links of a face.
    #[inline]
    pub fn edges(&self, f: FaceId) -> &[DualEdge; 3] {
        &self.graph[f.index()]
    }

    /// Weight of the link between two faces, if they are adjacent.
    pub fn edge_length(&self, f: FaceId, g: FaceId) -> Option<f64> {
        self.graph[f.index()]
            .iter()
            .find(|e| e.node == g)
            .map(|e| e.length)
    }

    /// Absolute coarse-edge threshold.
    #[inline]
    pub fn max_edge_length(&self) -> f64 {
        self.max_edge_length
    }

    /// Number of dual edges longer than [`max_edge_length`](Self::max_edge_length).
    #[inline]
    pub fn num_coarse_edges(&self) -> usize {
        self.num_coarse_edges
    }

    /// Sum of link weights along a strip.
    pub fn strip_length(&self, strip: &[FaceId]) -> f64 {
        strip
            .windows(2)
            .map(|w| self.edge_length(w[0], w[1]).unwrap_or(f64::INFINITY))
            .sum()
    }

    /// Find a corridor of adjacent faces from the face of `start` to the face
    /// of `end`.
    ///
    /// The strip starts with `start.face` and ends with `end.face`. Fails with
    /// [`MeshError::Unreachable`] when the faces lie in different components.
    pub fn compute_strip(&self, start: &SurfacePoint, end: &SurfacePoint) -> Result<Vec<FaceId>> {
        let n = self.graph.len();
        for p in [start, end] {
            if !p.face.is_valid() || p.face.index() >= n {
                return Err(MeshError::InvalidSurfacePoint {
                    face: p.face.index(),
                    num_faces: n,
                });
            }
        }

        let source = start.face.index();
        let target = end.face.index();
        if source == target {
            return Ok(vec![start.face]);
        }

        let goal = self.centroids[target];
        let heuristic = |f: usize| (self.centroids[f] - goal).norm();

        let mut distances = vec![f64::INFINITY; n];
        let mut predecessors: Vec<Option<usize>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut heap = BinaryHeap::new();

        distances[source] = 0.0;
        heap.push(SearchEntry {
            face: source,
            priority: heuristic(source),
        });

        let mut visited = 0usize;
        while let Some(SearchEntry { face, .. }) = heap.pop() {
            if closed[face] {
                continue;
            }
            closed[face] = true;
            visited += 1;

            if face == target {
                break;
            }

            for edge in &self.graph[face] {
                if !edge.node.is_valid() {
                    continue;
                }
                let next = edge.node.index();
                if closed[next] {
                    continue;
                }
                let new_dist = distances[face] + edge.length;
                if new_dist < distances[next] {
                    distances[next] = new_dist;
                    predecessors[next] = Some(face);
                    heap.push(SearchEntry {
                        face: next,
                        priority: new_dist + heuristic(next),
                    });
                }
            }
        }

        if !closed[target] {
            return Err(MeshError::Unreachable {
                from: source,
                to: target,
            });
        }

        let mut strip = Vec::new();
        let mut current = target;
        loop {
            strip.push(FaceId::new(current));
            match predecessors[current] {
                Some(pred) => current = pred,
                None => break,
            }
            if strip.len() > n {
                return Err(MeshError::topology("cycle in dual search predecessors"));
            }
        }
        strip.reverse();

        debug!(
            "dual strip {} -> {}: {} faces, {} nodes visited",
            source,
            target,
            strip.len(),
            visited
        );
        Ok(strip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_dual_graph_is_symmetric() {
        let mesh = shapes::icosphere(1);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        for f in mesh.face_ids() {
            for e in solver.edges(f) {
                let back = solver.edge_length(e.node, f).unwrap();
                assert_relative_eq!(back, e.length, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_strip_is_connected_corridor() {
        let mesh = shapes::grid(6);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let start = SurfacePoint::new(FaceId::new(0), 0.3, 0.3);
        let end = SurfacePoint::new(FaceId::new(mesh.num_faces() - 1), 0.3, 0.3);
        let strip = solver.compute_strip(&start, &end).unwrap();

        assert_eq!(strip.first(), Some(&start.face));
        assert_eq!(strip.last(), Some(&end.face));
        for w in strip.windows(2) {
            assert!(mesh.shared_edge(w[0], w[1]).is_some());
        }
    }

    #[test]
    fn test_same_face() {
        let mesh = shapes::quad();
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let p = SurfacePoint::new(FaceId::new(1), 0.2, 0.2);
        let strip = solver.compute_strip(&p, &p).unwrap();
        assert_eq!(strip, vec![FaceId::new(1)]);
    }

    #[test]
    fn test_unreachable() {
        let mesh = shapes::disjoint_triangles();
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let a = SurfacePoint::new(FaceId::new(0), 0.2, 0.2);
        let b = SurfacePoint::new(FaceId::new(1), 0.2, 0.2);
        let err = solver.compute_strip(&a, &b).unwrap_err();
        assert!(matches!(err, MeshError::Unreachable { from: 0, to: 1 }));
    }

    #[test]
    fn test_coarse_edges_counted() {
        let mesh = shapes::octahedron();
        let fine = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        assert_eq!(fine.num_coarse_edges(), 12);
        let loose = DualGeodesicSolver::build(
            &mesh,
            &DualSolverOptions::default().with_max_relative_edge_length(10.0),
        )
        .unwrap();
        assert_eq!(loose.num_coarse_edges(), 0);
    }
}

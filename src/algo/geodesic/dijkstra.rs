//! Dijkstra's algorithm on the edge graph of a half-edge mesh.
//!
//! Distances are measured along edges using an explicit per-edge length
//! table, so the same search runs on the input connectivity and on any
//! intrinsic triangulation layered over it. The flip engine uses it to build
//! the initial edge path it then straightens.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::mesh::{HalfEdgeId, HalfEdgeMesh, VertexId};

/// Options for Dijkstra's algorithm.
#[derive(Debug, Clone, Default)]
pub struct DijkstraOptions {
    /// Whether to store predecessor information for path reconstruction.
    pub store_predecessors: bool,

    /// Target vertex for early termination.
    pub target: Option<VertexId>,
}

impl DijkstraOptions {
    /// Enable predecessor storage for path reconstruction.
    pub fn with_predecessors(mut self, store: bool) -> Self {
        self.store_predecessors = store;
        self
    }

    /// Set target vertex for early termination.
    pub fn with_target(mut self, target: VertexId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Distances from a source vertex along mesh edges.
#[derive(Debug, Clone)]
pub struct EdgeDistances {
    distances: Vec<f64>,
    /// Half-edge through which each vertex was reached.
    predecessors: Option<Vec<Option<HalfEdgeId>>>,
}

impl EdgeDistances {
    /// Distance to a vertex, `f64::INFINITY` if unreachable.
    #[inline]
    pub fn distance(&self, v: VertexId) -> f64 {
        self.distances[v.index()]
    }

    /// Check if a vertex was reached.
    #[inline]
    pub fn is_reachable(&self, v: VertexId) -> bool {
        self.distances[v.index()].is_finite()
    }

    /// Half-edges from the source to `target`, in walking order.
    ///
    /// Returns `None` if predecessors weren't stored or `target` is
    /// unreachable; an empty path if `target` is the source.
    pub fn path_to(&self, mesh: &HalfEdgeMesh, target: VertexId) -> Option<Vec<HalfEdgeId>> {
        let predecessors = self.predecessors.as_ref()?;
        if !self.is_reachable(target) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = target;
        while let Some(he) = predecessors[current.index()] {
            path.push(he);
            current = mesh.origin(he);
            if path.len() > self.distances.len() {
                return None;
            }
        }

        path.reverse();
        Some(path)
    }
}

/// Entry in Dijkstra's priority queue.
#[derive(Debug, Clone)]
struct DijkstraEntry {
    vertex: usize,
    distance: f64,
}

impl PartialEq for DijkstraEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for DijkstraEntry {}

impl PartialOrd for DijkstraEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DijkstraEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Shortest edge-graph distances from `source`.
///
/// `edge_lengths` is indexed by [`EdgeId`](crate::mesh::EdgeId).
pub fn dijkstra(
    mesh: &HalfEdgeMesh,
    edge_lengths: &[f64],
    source: VertexId,
    options: &DijkstraOptions,
) -> EdgeDistances {
    let n = mesh.num_vertices();
    let mut distances = vec![f64::INFINITY; n];
    let mut predecessors: Option<Vec<Option<HalfEdgeId>>> = if options.store_predecessors {
        Some(vec![None; n])
    } else {
        None
    };

    if source.index() >= n {
        return EdgeDistances {
            distances,
            predecessors,
        };
    }

    let mut heap = BinaryHeap::new();
    distances[source.index()] = 0.0;
    heap.push(DijkstraEntry {
        vertex: source.index(),
        distance: 0.0,
    });

    while let Some(entry) = heap.pop() {
        let u = entry.vertex;
        let dist_u = entry.distance;

        // Stale entry
        if dist_u > distances[u] {
            continue;
        }

        if options.target.map(|t| t.index()) == Some(u) {
            break;
        }

        for he in mesh.vertex_halfedges(VertexId::new(u)) {
            let v = mesh.dest(he).index();
            let new_dist = dist_u + edge_lengths[he.edge().index()];
            if new_dist < distances[v] {
                distances[v] = new_dist;
                if let Some(ref mut preds) = predecessors {
                    preds[v] = Some(he);
                }
                heap.push(DijkstraEntry {
                    vertex: v,
                    distance: new_dist,
                });
            }
        }
    }

    EdgeDistances {
        distances,
        predecessors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_connectivity, shapes, EdgeId};
    use approx::assert_relative_eq;

    fn octahedron() -> (HalfEdgeMesh, Vec<f64>) {
        let tri = shapes::octahedron();
        let (mesh, _) = build_connectivity(tri.triangles(), tri.num_vertices()).unwrap();
        let lengths = (0..mesh.num_edges())
            .map(|e| {
                let he = EdgeId::new(e).halfedge();
                let a = tri.positions()[mesh.origin(he).index()];
                let b = tri.positions()[mesh.dest(he).index()];
                (b - a).norm()
            })
            .collect();
        (mesh, lengths)
    }

    #[test]
    fn test_opposite_vertex_needs_two_edges() {
        let (mesh, lengths) = octahedron();
        let result = dijkstra(&mesh, &lengths, VertexId::new(0), &DijkstraOptions::default());
        assert_relative_eq!(result.distance(VertexId::new(0)), 0.0);
        assert_relative_eq!(result.distance(VertexId::new(2)), 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            result.distance(VertexId::new(1)),
            2.0 * 2.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_path_reconstruction() {
        let (mesh, lengths) = octahedron();
        let options = DijkstraOptions::default().with_predecessors(true);
        let result = dijkstra(&mesh, &lengths, VertexId::new(0), &options);

        assert_eq!(result.path_to(&mesh, VertexId::new(0)), Some(vec![]));

        let path = result.path_to(&mesh, VertexId::new(1)).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(mesh.origin(path[0]), VertexId::new(0));
        assert_eq!(mesh.dest(path[0]), mesh.origin(path[1]));
        assert_eq!(mesh.dest(path[1]), VertexId::new(1));
    }

    #[test]
    fn test_target_stops_early() {
        let (mesh, lengths) = octahedron();
        let options = DijkstraOptions::default().with_target(VertexId::new(4));
        let result = dijkstra(&mesh, &lengths, VertexId::new(0), &options);
        assert!(result.is_reachable(VertexId::new(4)));
    }

    #[test]
    fn test_triangle_inequality() {
        let (mesh, lengths) = octahedron();
        let result = dijkstra(&mesh, &lengths, VertexId::new(3), &DijkstraOptions::default());
        for v in mesh.vertex_ids() {
            for he in mesh.vertex_halfedges(v) {
                let u = mesh.dest(he);
                let edge_len = lengths[he.edge().index()];
                assert!((result.distance(v) - result.distance(u)).abs() <= edge_len + 1e-10);
            }
        }
    }
}

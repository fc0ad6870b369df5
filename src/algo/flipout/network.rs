//! Paths made of intrinsic edges.

use nalgebra::Point3;

use super::intrinsic::{FlipMesh, IntrinsicTriangulation};
use crate::algo::geodesic::{dijkstra, DijkstraOptions};
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeSplit, HalfEdgeId, VertexId};

/// A path along edges of the intrinsic triangulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipPath {
    pub(crate) start: VertexId,
    pub(crate) halfedges: Vec<HalfEdgeId>,
    pub(crate) closed: bool,
}

impl FlipPath {
    /// First vertex.
    #[inline]
    pub fn start(&self) -> VertexId {
        self.start
    }

    /// Half-edges walked, in order.
    #[inline]
    pub fn halfedges(&self) -> &[HalfEdgeId] {
        &self.halfedges
    }

    /// Whether the path returns to its start.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A set of paths in an intrinsic triangulation of their own.
///
/// Edges used by a path are never flipped, so paths stay valid while other
/// paths are straightened.
#[derive(Debug, Clone)]
pub struct FlipNetwork<'a> {
    pub(crate) tri: IntrinsicTriangulation<'a>,
    pub(crate) paths: Vec<FlipPath>,
    pub(crate) marked: Vec<bool>,
    pub(crate) edge_use: Vec<u32>,
}

impl<'a> FlipNetwork<'a> {
    /// An empty network over the input triangulation.
    pub fn new(base: &'a FlipMesh<'a>) -> Self {
        let tri = IntrinsicTriangulation::new(base);
        let marked = vec![false; tri.mesh().num_vertices()];
        let edge_use = vec![0; tri.mesh().num_edges()];
        Self {
            tri,
            paths: Vec::new(),
            marked,
            edge_use,
        }
    }

    /// The intrinsic triangulation.
    #[inline]
    pub fn triangulation(&self) -> &IntrinsicTriangulation<'a> {
        &self.tri
    }

    /// All paths.
    #[inline]
    pub fn paths(&self) -> &[FlipPath] {
        &self.paths
    }

    /// Whether a vertex is marked.
    #[inline]
    pub fn is_marked(&self, v: VertexId) -> bool {
        self.marked.get(v.index()).copied().unwrap_or(false)
    }

    /// Mark a vertex. Marked vertices are kept on their paths unless
    /// straightening at marked vertices is enabled.
    pub fn mark_vertex(&mut self, v: VertexId) {
        if let Some(m) = self.marked.get_mut(v.index()) {
            *m = true;
        }
    }

    fn check_vertex(&self, v: VertexId) -> Result<()> {
        let n = self.tri.mesh().num_vertices();
        if v.index() >= n {
            return Err(MeshError::VertexNotFound {
                vertex: v.index(),
                num_vertices: n,
            });
        }
        Ok(())
    }

    /// Shortest edge path from `a` to `b` in the current triangulation.
    pub fn edge_path(&self, a: VertexId, b: VertexId) -> Result<Vec<HalfEdgeId>> {
        self.check_vertex(a)?;
        self.check_vertex(b)?;
        let options = DijkstraOptions::default()
            .with_predecessors(true)
            .with_target(b);
        let distances = dijkstra(self.tri.mesh(), self.tri.edge_lengths(), a, &options);
        distances
            .path_to(self.tri.mesh(), b)
            .ok_or(MeshError::Unreachable {
                from: a.index(),
                to: b.index(),
            })
    }

    /// Add a path starting at `start`. Consecutive half-edges must be chained.
    pub fn add_path(
        &mut self,
        start: VertexId,
        halfedges: Vec<HalfEdgeId>,
        closed: bool,
    ) -> Result<usize> {
        self.check_vertex(start)?;
        let mesh = self.tri.mesh();
        let mut at = start;
        for &h in &halfedges {
            if mesh.origin(h) != at {
                return Err(MeshError::topology(format!(
                    "path is broken at {:?}: {:?} does not leave {:?}",
                    h, h, at
                )));
            }
            at = mesh.dest(h);
        }
        if closed && at != start {
            return Err(MeshError::topology("closed path does not return to its start"));
        }

        for h in &halfedges {
            self.edge_use[h.edge().index()] += 1;
        }
        self.paths.push(FlipPath {
            start,
            halfedges,
            closed,
        });
        Ok(self.paths.len() - 1)
    }

    /// Remove and return a path.
    pub fn remove_path(&mut self, index: usize) -> FlipPath {
        let path = self.paths.remove(index);
        for h in &path.halfedges {
            self.edge_use[h.edge().index()] -= 1;
        }
        path
    }

    /// Remove every path.
    pub fn clear_paths(&mut self) {
        self.paths.clear();
        self.edge_use.iter_mut().for_each(|u| *u = 0);
    }

    /// Whether some path runs along the edge of `h`.
    #[inline]
    pub(crate) fn is_path_edge(&self, h: HalfEdgeId) -> bool {
        self.edge_use[h.edge().index()] > 0
    }

    pub(crate) fn recount_edge_use(&mut self) {
        self.edge_use.iter_mut().for_each(|u| *u = 0);
        for path in &self.paths {
            for h in &path.halfedges {
                self.edge_use[h.edge().index()] += 1;
            }
        }
    }

    /// Vertices visited by a path, start and end included.
    pub fn path_vertices(&self, index: usize) -> Vec<VertexId> {
        let path = &self.paths[index];
        let mut vertices = Vec::with_capacity(path.halfedges.len() + 1);
        vertices.push(path.start);
        vertices.extend(path.halfedges.iter().map(|&h| self.tri.mesh().dest(h)));
        vertices
    }

    /// Last vertex of a path.
    pub fn path_end(&self, index: usize) -> VertexId {
        let path = &self.paths[index];
        path.halfedges
            .last()
            .map_or(path.start, |&h| self.tri.mesh().dest(h))
    }

    /// Intrinsic length of a path.
    pub fn path_length(&self, index: usize) -> f64 {
        self.paths[index]
            .halfedges
            .iter()
            .map(|&h| self.tri.length(h))
            .sum()
    }

    /// Sum of the lengths of all paths.
    pub fn total_length(&self) -> f64 {
        (0..self.paths.len()).map(|i| self.path_length(i)).sum()
    }

    /// Insert a vertex on the edge of `h` at fraction `t` from its origin,
    /// keeping every path that uses the edge on it.
    pub fn split_halfedge(&mut self, h: HalfEdgeId, t: f64) -> Result<EdgeSplit> {
        let split = self.tri.split(h, t)?;
        let tw = h.twin();
        // h is now origin -> m; its twin is m -> origin.
        for path in &mut self.paths {
            let mut halfedges = Vec::with_capacity(path.halfedges.len() + 2);
            for &g in &path.halfedges {
                if g == h {
                    halfedges.extend([h, split.second]);
                } else if g == tw {
                    halfedges.extend([split.second.twin(), tw]);
                } else {
                    halfedges.push(g);
                }
            }
            path.halfedges = halfedges;
        }
        self.marked.push(false);
        self.edge_use.resize(self.tri.mesh().num_edges(), 0);
        self.recount_edge_use();
        Ok(split)
    }

    /// 3D polyline of one path.
    pub fn path_positions(&self, index: usize) -> Result<Vec<Point3<f64>>> {
        let path = &self.paths[index];
        let mut positions = vec![self.tri.vertex_position(path.start)];
        for &h in &path.halfedges {
            let edge = self.tri.halfedge_positions(h)?;
            positions.extend(edge.into_iter().skip(1));
        }
        Ok(positions)
    }

    /// 3D polylines of all paths joined end to end.
    pub fn positions(&self) -> Result<Vec<Point3<f64>>> {
        let mut positions: Vec<Point3<f64>> = Vec::new();
        for i in 0..self.paths.len() {
            let part = self.path_positions(i)?;
            let skip = match (positions.last(), part.first()) {
                (Some(a), Some(b)) if (a - b).norm() <= 1e-12 => 1,
                _ => 0,
            };
            positions.extend(part.into_iter().skip(skip));
        }
        Ok(positions)
    }
}

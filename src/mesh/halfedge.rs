//! Half-edge connectivity for closed manifold triangulations.
//!
//! This is the combinatorial layer of the intrinsic flip network. It stores
//! no positions: geometry lives on top of it as per-edge lengths.
//!
//! # Structure
//!
//! - Each edge is split into two **half-edges** allocated in adjacent slots,
//!   so the twin of half-edge `h` is always `h ^ 1` and its edge is `h >> 1`
//! - Each half-edge knows its **origin vertex**, the **next** half-edge
//!   around its face (counter-clockwise) and its **face**
//! - Each vertex stores one outgoing half-edge, each face one half-edge
//!
//! Faces are triangles, so `prev(h) == next(next(h))`. The mesh is closed:
//! every half-edge has a face. Two faces may share more than one edge and an
//! edge may connect a vertex to itself after flips, as is usual for intrinsic
//! triangulations.

use super::index::{EdgeId, FaceId, HalfEdgeId, VertexId};
use crate::error::{MeshError, Result};

/// A vertex record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vertex {
    /// One outgoing half-edge.
    pub halfedge: HalfEdgeId,
}

/// A half-edge record.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalfEdge {
    /// The vertex this half-edge originates from.
    pub origin: VertexId,
    /// The next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId,
    /// The face this half-edge belongs to.
    pub face: FaceId,
}

/// A face record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Face {
    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId,
}

/// Half-edges touched by [`HalfEdgeMesh::split_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSplit {
    /// The inserted vertex.
    pub vertex: VertexId,
    /// The first part of the split edge, from the old origin to the new vertex.
    pub first: HalfEdgeId,
    /// The second part of the split edge, from the new vertex to the old destination.
    pub second: HalfEdgeId,
    /// New edge from the inserted vertex to the apex on the left of the split edge.
    pub left: HalfEdgeId,
    /// New edge from the inserted vertex to the apex on the right of the split edge.
    pub right: HalfEdgeId,
}

/// A closed triangle mesh in half-edge form.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) halfedges: Vec<HalfEdge>,
    pub(crate) faces: Vec<Face>,
}

impl HalfEdgeMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed mesh: E = 3F/2, so HE = 3F
        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_faces * 3),
            faces: Vec::with_capacity(num_faces),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.halfedges[id.index()]
    }

    #[inline]
    fn halfedge_mut(&mut self, id: HalfEdgeId) -> &mut HalfEdge {
        &mut self.halfedges[id.index()]
    }

    /// One outgoing half-edge of a vertex.
    #[inline]
    pub fn vertex_halfedge(&self, v: VertexId) -> HalfEdgeId {
        self.vertices[v.index()].halfedge
    }

    /// One half-edge of a face.
    #[inline]
    pub fn face_halfedge(&self, f: FaceId) -> HalfEdgeId {
        self.faces[f.index()].halfedge
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId) -> HalfEdgeId {
        he.twin()
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.next(self.next(he))
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId) -> VertexId {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId) -> VertexId {
        self.origin(he.twin())
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId) -> FaceId {
        self.halfedge(he).face
    }

    /// Next outgoing half-edge counter-clockwise around the origin.
    #[inline]
    pub fn ccw(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.prev(he).twin()
    }

    /// Next outgoing half-edge clockwise around the origin.
    #[inline]
    pub fn cw(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.next(he.twin())
    }

    /// The three half-edges of a face, starting at its stored half-edge.
    pub fn face_halfedges(&self, f: FaceId) -> [HalfEdgeId; 3] {
        let h0 = self.face_halfedge(f);
        let h1 = self.next(h0);
        [h0, h1, self.next(h1)]
    }

    /// The three vertices of a face.
    pub fn face_triangle(&self, f: FaceId) -> [VertexId; 3] {
        self.face_halfedges(f).map(|h| self.origin(h))
    }

    /// Outgoing half-edges of a vertex in counter-clockwise order.
    pub fn vertex_halfedges(&self, v: VertexId) -> VertexHalfEdgeIter<'_> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Number of edges incident to a vertex.
    pub fn valence(&self, v: VertexId) -> usize {
        self.vertex_halfedges(v).count()
    }

    /// Find a half-edge going from `a` to `b`.
    pub fn find_halfedge(&self, a: VertexId, b: VertexId) -> Option<HalfEdgeId> {
        self.vertex_halfedges(a).find(|&h| self.dest(h) == b)
    }

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.num_edges()).map(EdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    // ==================== Editing ====================

    /// Replace the diagonal of the two triangles sharing `he`.
    ///
    /// With `he = a -> b` in face `(a, b, c)` and its twin in face
    /// `(b, a, d)`, the edge becomes `d -> c` (and its twin `c -> d`). The
    /// faces become `(c, a, d)` and `(d, b, c)`; `he` and its twin keep their
    /// slots so the edge ID is stable.
    pub fn flip(&mut self, he: HalfEdgeId) -> Result<()> {
        let tw = he.twin();
        let f1 = self.face_of(he);
        let f2 = self.face_of(tw);
        if f1 == f2 {
            return Err(MeshError::topology(format!(
                "cannot flip {:?}: both sides belong to {:?}",
                he.edge(),
                f1
            )));
        }

        let h_n = self.next(he);
        let h_p = self.next(h_n);
        let t_n = self.next(tw);
        let t_p = self.next(t_n);

        let a = self.origin(he);
        let b = self.origin(tw);
        let c = self.origin(h_p);
        let d = self.origin(t_p);

        if self.valence(a) < 3 || self.valence(b) < 3 {
            return Err(MeshError::topology(format!(
                "cannot flip {:?}: endpoint of valence below 3",
                he.edge()
            )));
        }

        // Face (c, a, d)
        self.halfedge_mut(he).origin = d;
        self.halfedge_mut(h_p).next = t_n;
        self.halfedge_mut(t_n).next = he;
        self.halfedge_mut(he).next = h_p;
        self.halfedge_mut(t_n).face = f1;
        self.faces[f1.index()].halfedge = he;

        // Face (d, b, c)
        self.halfedge_mut(tw).origin = c;
        self.halfedge_mut(t_p).next = h_n;
        self.halfedge_mut(h_n).next = tw;
        self.halfedge_mut(tw).next = t_p;
        self.halfedge_mut(h_n).face = f2;
        self.faces[f2.index()].halfedge = tw;

        if self.vertices[a.index()].halfedge == he {
            self.vertices[a.index()].halfedge = t_n;
        }
        if self.vertices[b.index()].halfedge == tw {
            self.vertices[b.index()].halfedge = h_n;
        }

        Ok(())
    }

    /// Insert a vertex in the middle of the edge of `he`.
    ///
    /// `he = a -> b` becomes `a -> m` and a new half-edge `m -> b` is
    /// created; `m` is connected to the apexes of both adjacent triangles.
    pub fn split_edge(&mut self, he: HalfEdgeId) -> EdgeSplit {
        let tw = he.twin();
        let f1 = self.face_of(he);
        let f2 = self.face_of(tw);

        let h_n = self.next(he);
        let h_p = self.next(h_n);
        let t_n = self.next(tw);
        let t_p = self.next(t_n);

        let b = self.origin(tw);
        let c = self.origin(h_p);
        let d = self.origin(t_p);

        let m = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex { halfedge: tw });

        // Three new edges: (m, b), (m, c), (m, d)
        let mb = HalfEdgeId::new(self.halfedges.len());
        let mc = HalfEdgeId::new(self.halfedges.len() + 2);
        let md = HalfEdgeId::new(self.halfedges.len() + 4);
        self.halfedges
            .resize(self.halfedges.len() + 6, HalfEdge::default());

        let f3 = FaceId::new(self.faces.len());
        let f4 = FaceId::new(self.faces.len() + 1);
        self.faces.push(Face { halfedge: mb });
        self.faces.push(Face { halfedge: mb.twin() });

        // (a, m, c) keeps f1
        self.halfedges[mc.index()] = HalfEdge {
            origin: m,
            next: h_p,
            face: f1,
        };
        self.halfedge_mut(he).next = mc;

        // (m, b, c) is new
        self.halfedges[mb.index()] = HalfEdge {
            origin: m,
            next: h_n,
            face: f3,
        };
        self.halfedges[mc.twin().index()] = HalfEdge {
            origin: c,
            next: mb,
            face: f3,
        };
        self.halfedge_mut(h_n).next = mc.twin();
        self.halfedge_mut(h_n).face = f3;

        // (m, a, d) keeps f2
        self.halfedge_mut(tw).origin = m;
        self.halfedges[md.twin().index()] = HalfEdge {
            origin: d,
            next: tw,
            face: f2,
        };
        self.halfedge_mut(t_n).next = md.twin();

        // (b, m, d) is new
        self.halfedges[mb.twin().index()] = HalfEdge {
            origin: b,
            next: md,
            face: f4,
        };
        self.halfedges[md.index()] = HalfEdge {
            origin: m,
            next: t_p,
            face: f4,
        };
        self.halfedge_mut(t_p).next = mb.twin();
        self.halfedge_mut(t_p).face = f4;

        self.faces[f1.index()].halfedge = he;
        self.faces[f2.index()].halfedge = tw;
        if self.vertices[b.index()].halfedge == tw {
            self.vertices[b.index()].halfedge = mb.twin();
        }

        EdgeSplit {
            vertex: m,
            first: he,
            second: mb,
            left: mc,
            right: md,
        }
    }

    // ==================== Validation ====================

    /// Check that all connectivity is consistent.
    pub fn is_valid(&self) -> bool {
        if self.halfedges.len() % 2 != 0 {
            return false;
        }

        for (i, v) in self.vertices.iter().enumerate() {
            if !v.halfedge.is_valid() || self.origin(v.halfedge).index() != i {
                return false;
            }
        }

        for i in 0..self.halfedges.len() {
            let he = HalfEdgeId::new(i);
            let rec = self.halfedge(he);
            if !rec.face.is_valid() || !rec.next.is_valid() {
                return false;
            }
            // Triangles only
            if self.next(self.next(rec.next)) != he {
                return false;
            }
            if self.face_of(rec.next) != rec.face {
                return false;
            }
            if self.origin(rec.next) != self.dest(he) {
                return false;
            }
        }

        self.faces
            .iter()
            .enumerate()
            .all(|(i, f)| f.halfedge.is_valid() && self.face_of(f.halfedge).index() == i)
    }
}

/// Iterator over the outgoing half-edges of a vertex, counter-clockwise.
pub struct VertexHalfEdgeIter<'a> {
    mesh: &'a HalfEdgeMesh,
    start: HalfEdgeId,
    current: HalfEdgeId,
    done: bool,
}

impl<'a> VertexHalfEdgeIter<'a> {
    fn new(mesh: &'a HalfEdgeMesh, v: VertexId) -> Self {
        let start = mesh.vertex_halfedge(v);
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl Iterator for VertexHalfEdgeIter<'_> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.mesh.ccw(self.current);

        // Guards against corrupted connectivity as well as the normal wrap-around.
        if self.current == self.start || self.current == result {
            self.done = true;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_connectivity;
    use crate::mesh::shapes;

    fn octahedron() -> HalfEdgeMesh {
        let mesh = shapes::octahedron();
        build_connectivity(mesh.triangles(), mesh.num_vertices())
            .unwrap()
            .0
    }

    #[test]
    fn test_octahedron_counts() {
        let he = octahedron();
        assert_eq!(he.num_vertices(), 6);
        assert_eq!(he.num_edges(), 12);
        assert_eq!(he.num_faces(), 8);
        assert!(he.is_valid());
        for v in he.vertex_ids() {
            assert_eq!(he.valence(v), 4);
        }
    }

    #[test]
    fn test_ccw_and_cw_are_inverse() {
        let he = octahedron();
        for i in 0..he.num_halfedges() {
            let h = HalfEdgeId::new(i);
            assert_eq!(he.cw(he.ccw(h)), h);
            assert_eq!(he.origin(he.ccw(h)), he.origin(h));
        }
    }

    #[test]
    fn test_flip_rewires_diagonal() {
        let mut he = octahedron();
        let h = HalfEdgeId::new(0);
        let c = he.origin(he.prev(h));
        let d = he.origin(he.prev(h.twin()));
        let a = he.origin(h);
        let b = he.dest(h);

        he.flip(h).unwrap();

        assert!(he.is_valid());
        assert_eq!(he.origin(h), d);
        assert_eq!(he.dest(h), c);
        assert_eq!(he.valence(a), 3);
        assert_eq!(he.valence(b), 3);
        assert_eq!(he.valence(c), 5);
        assert_eq!(he.valence(d), 5);
    }

    #[test]
    fn test_flip_twice_restores_valences() {
        let mut he = octahedron();
        let h = HalfEdgeId::new(4);
        he.flip(h).unwrap();
        he.flip(h).unwrap();
        assert!(he.is_valid());
        for v in he.vertex_ids() {
            assert_eq!(he.valence(v), 4);
        }
    }

    #[test]
    fn test_split_edge() {
        let mut he = octahedron();
        let h = HalfEdgeId::new(2);
        let a = he.origin(h);
        let b = he.dest(h);

        let split = he.split_edge(h);

        assert!(he.is_valid());
        assert_eq!(he.num_vertices(), 7);
        assert_eq!(he.num_faces(), 10);
        assert_eq!(he.num_edges(), 15);
        assert_eq!(he.valence(split.vertex), 4);
        assert_eq!(he.origin(split.first), a);
        assert_eq!(he.dest(split.first), split.vertex);
        assert_eq!(he.origin(split.second), split.vertex);
        assert_eq!(he.dest(split.second), b);
        assert_eq!(he.valence(a), 4);
        assert_eq!(he.valence(b), 4);
    }
}

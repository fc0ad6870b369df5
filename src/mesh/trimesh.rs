//! Indexed triangle mesh with face adjacency.
//!
//! [`TriMesh`] is the read-only surface every path query runs against: an
//! ordered list of triangles, an ordered list of vertex positions and, for
//! each triangle, the neighbor across each of its three edges. Edge `k` of a
//! triangle joins its vertices `k` and `(k + 1) % 3`.
//!
//! Points on the surface are addressed with [`SurfacePoint`]: a face plus a
//! 2D coordinate `uv` such that the position is
//! `p0 * (1 - u - v) + p1 * u + p2 * v`.

use std::collections::HashMap;

use nalgebra::{Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::index::{FaceId, VertexId};
use crate::error::{MeshError, Result};

/// A location on the surface: a face and a coordinate inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    /// The face containing the point.
    pub face: FaceId,
    /// Coordinates relative to the face's second and third vertex.
    pub uv: Vector2<f64>,
}

impl SurfacePoint {
    /// Create a surface point from a face and its `uv` coordinates.
    pub fn new(face: FaceId, u: f64, v: f64) -> Self {
        Self {
            face,
            uv: Vector2::new(u, v),
        }
    }

    /// The three barycentric weights of this point.
    #[inline]
    pub fn barycentric(&self) -> [f64; 3] {
        [1.0 - self.uv.x - self.uv.y, self.uv.x, self.uv.y]
    }

    /// `uv` coordinates of the face corner `k`.
    #[inline]
    pub fn corner_uv(k: usize) -> Vector2<f64> {
        match k % 3 {
            0 => Vector2::new(0.0, 0.0),
            1 => Vector2::new(1.0, 0.0),
            _ => Vector2::new(0.0, 1.0),
        }
    }
}

/// Compute the face adjacency of a triangle list.
///
/// Slot `k` of a face holds the neighbor sharing edge `(t[k], t[k+1])`, or an
/// invalid [`FaceId`] on the boundary.
pub fn face_adjacencies(triangles: &[[usize; 3]]) -> Vec<[FaceId; 3]> {
    let mut edge_map: HashMap<(usize, usize), (usize, usize)> =
        HashMap::with_capacity(triangles.len() * 3);
    let mut adjacencies = vec![[FaceId::invalid(); 3]; triangles.len()];

    for (face, t) in triangles.iter().enumerate() {
        for k in 0..3 {
            let a = t[k];
            let b = t[(k + 1) % 3];
            if let Some(&(other, ok)) = edge_map.get(&(b, a)) {
                adjacencies[face][k] = FaceId::new(other);
                adjacencies[other][ok] = FaceId::new(face);
            } else {
                edge_map.insert((a, b), (face, k));
            }
        }
    }

    adjacencies
}

/// An immutable triangle mesh with precomputed face adjacency.
#[derive(Debug, Clone)]
pub struct TriMesh {
    triangles: Vec<[usize; 3]>,
    positions: Vec<Point3<f64>>,
    adjacencies: Vec<[FaceId; 3]>,
}

impl TriMesh {
    /// Build a mesh from positions and triangles.
    ///
    /// # Example
    /// ```
    /// use geospline::mesh::TriMesh;
    /// use nalgebra::Point3;
    ///
    /// let positions = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ];
    /// let mesh = TriMesh::new(positions, vec![[0, 1, 2], [0, 2, 3]]).unwrap();
    /// assert_eq!(mesh.num_faces(), 2);
    /// ```
    pub fn new(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        if triangles.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        for (fi, t) in triangles.iter().enumerate() {
            for &vi in t {
                if vi >= positions.len() {
                    return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
                return Err(MeshError::DegenerateFace { face: fi });
            }
        }

        let adjacencies = face_adjacencies(&triangles);
        Ok(Self {
            triangles,
            positions,
            adjacencies,
        })
    }

    /// Build a mesh from inputs known to be valid.
    pub(crate) fn new_unchecked(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Self {
        let adjacencies = face_adjacencies(&triangles);
        Self {
            triangles,
            positions,
            adjacencies,
        }
    }

    // ==================== Accessors ====================

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// All triangles.
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// All vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// All face adjacencies.
    #[inline]
    pub fn adjacencies(&self) -> &[[FaceId; 3]] {
        &self.adjacencies
    }

    /// Vertex indices of a face.
    #[inline]
    pub fn triangle(&self, f: FaceId) -> [usize; 3] {
        self.triangles[f.index()]
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.positions[v.index()]
    }

    /// Neighbor of `f` across its edge `k`.
    #[inline]
    pub fn neighbor(&self, f: FaceId, k: usize) -> FaceId {
        self.adjacencies[f.index()][k]
    }

    /// Index of the edge of `f` shared with `g`, if they are adjacent.
    #[inline]
    pub fn shared_edge(&self, f: FaceId, g: FaceId) -> Option<usize> {
        self.adjacencies[f.index()].iter().position(|&n| n == g)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.triangles.len()).map(FaceId::new)
    }

    // ==================== Geometry ====================

    /// Positions of the three vertices of a face.
    pub fn face_positions(&self, f: FaceId) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangle(f);
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Length of edge `k` of face `f`.
    pub fn edge_length(&self, f: FaceId, k: usize) -> f64 {
        let t = self.triangle(f);
        (self.positions[t[(k + 1) % 3]] - self.positions[t[k]]).norm()
    }

    /// Lay a face out in the plane: vertex 0 at the origin, vertex 1 on the
    /// positive x axis, vertex 2 in the upper half plane.
    pub fn triangle_coordinates(&self, f: FaceId) -> [Point2<f64>; 3] {
        let [p0, p1, p2] = self.face_positions(f);
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let l1 = e1.norm();
        if l1 <= f64::EPSILON {
            return [Point2::origin(), Point2::origin(), Point2::new(0.0, e2.norm())];
        }
        let x = e2.dot(&e1) / l1;
        let y = (e2.norm_squared() - x * x).max(0.0).sqrt();
        [Point2::origin(), Point2::new(l1, 0.0), Point2::new(x, y)]
    }

    /// Unit normal of a face.
    pub fn face_normal(&self, f: FaceId) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0)).normalize()
    }

    /// Area of a face.
    pub fn face_area(&self, f: FaceId) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// 3D position of a surface point.
    pub fn eval_position(&self, p: &SurfacePoint) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(p.face);
        let [w0, w1, w2] = p.barycentric();
        Point3::from(p0.coords * w0 + p1.coords * w1 + p2.coords * w2)
    }

    /// Normal at a surface point (the face normal).
    pub fn eval_normal(&self, p: &SurfacePoint) -> Vector3<f64> {
        self.face_normal(p.face)
    }

    /// Check that a surface point addresses an existing face.
    pub fn check_point(&self, p: &SurfacePoint) -> Result<()> {
        if !p.face.is_valid() || p.face.index() >= self.num_faces() {
            return Err(MeshError::InvalidSurfacePoint {
                face: p.face.index(),
                num_faces: self.num_faces(),
            });
        }
        Ok(())
    }

    /// A surface point located exactly at vertex `v`.
    pub fn vertex_point(&self, v: VertexId) -> Option<SurfacePoint> {
        self.triangles.iter().enumerate().find_map(|(fi, t)| {
            t.iter().position(|&x| x == v.index()).map(|k| {
                let uv = SurfacePoint::corner_uv(k);
                SurfacePoint::new(FaceId::new(fi), uv.x, uv.y)
            })
        })
    }

    /// Axis-aligned bounding box.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }

    /// Length of the longest edge.
    pub fn max_edge_length(&self) -> f64 {
        self.face_ids()
            .flat_map(|f| (0..3).map(move |k| (f, k)))
            .map(|(f, k)| self.edge_length(f, k))
            .fold(0.0, f64::max)
    }

    /// Recenter the mesh at the origin and scale its largest extent to 1.
    pub fn normalize(&mut self) {
        let Some((min, max)) = self.bounding_box() else {
            return;
        };
        let center = Point3::from((min.coords + max.coords) * 0.5);
        let size = (max - min).max();
        if size <= 0.0 {
            return;
        }
        for p in &mut self.positions {
            *p = Point3::from((*p - center) / size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> TriMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        TriMesh::new(positions, vec![[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let mesh = quad();
        let f0 = FaceId::new(0);
        let f1 = FaceId::new(1);
        assert_eq!(mesh.neighbor(f0, 2), f1);
        assert_eq!(mesh.neighbor(f1, 0), f0);
        assert!(!mesh.neighbor(f0, 0).is_valid());
        assert_eq!(mesh.shared_edge(f1, f0), Some(0));
    }

    #[test]
    fn test_invalid_index() {
        let positions = vec![Point3::origin(); 3];
        let err = TriMesh::new(positions, vec![[0, 1, 5]]).unwrap_err();
        assert!(matches!(err, MeshError::InvalidVertexIndex { face: 0, vertex: 5 }));
    }

    #[test]
    fn test_degenerate_face() {
        let positions = vec![Point3::origin(); 3];
        let err = TriMesh::new(positions, vec![[0, 1, 1]]).unwrap_err();
        assert!(matches!(err, MeshError::DegenerateFace { face: 0 }));
    }

    #[test]
    fn test_eval_position() {
        let mesh = quad();
        let p = SurfacePoint::new(FaceId::new(0), 0.5, 0.25);
        let pos = mesh.eval_position(&p);
        assert_relative_eq!(pos, Point3::new(0.75, 0.25, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_coordinates_preserve_lengths() {
        let mesh = quad();
        let f = FaceId::new(0);
        let tr = mesh.triangle_coordinates(f);
        for k in 0..3 {
            let l2 = (tr[(k + 1) % 3] - tr[k]).norm();
            assert_relative_eq!(l2, mesh.edge_length(f, k), epsilon = 1e-12);
        }
        assert!(tr[2].y >= 0.0);
    }

    #[test]
    fn test_normalize() {
        let mut mesh = quad();
        mesh.normalize();
        let (min, max) = mesh.bounding_box().unwrap();
        assert_relative_eq!(min, Point3::new(-0.5, -0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(max, Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_vertex_point() {
        let mesh = quad();
        let p = mesh.vertex_point(VertexId::new(2)).unwrap();
        assert_relative_eq!(
            mesh.eval_position(&p),
            Point3::new(1.0, 1.0, 0.0),
            epsilon = 1e-12
        );
    }
}

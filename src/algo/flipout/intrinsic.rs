//! Intrinsic triangulations.
//!
//! An intrinsic triangulation shares its vertices with the input mesh (plus
//! any inserted ones) but its edges are arbitrary straight lines on the
//! surface. It is stored as half-edge connectivity with:
//!
//! - a length per edge, which is all the geometry the flip algorithms need,
//! - a **signpost** angle per half-edge: the direction of the half-edge at
//!   its origin, measured counter-clockwise in `[0, Θ)` where `Θ` is the
//!   angle sum around the origin vertex.
//!
//! Signposts tie the intrinsic edges back to the input surface so they can
//! be traced into 3D polylines.

use std::f64::consts::{PI, TAU};

use log::info;
use nalgebra::{Point2, Point3, Vector2};

use super::trace::{rotate, trace_straight, Trace};
use crate::algo::geodesic::unfold::{cross2, intersect_circles};
use crate::error::{MeshError, Result};
use crate::mesh::{
    build_connectivity, EdgeSplit, HalfEdgeId, HalfEdgeMesh, SurfacePoint, TriMesh, VertexId,
};

/// Interior angle opposite `opposite` in a triangle with sides `a`, `b`, `opposite`.
pub(crate) fn corner_angle(a: f64, b: f64, opposite: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return 0.0;
    }
    ((a * a + b * b - opposite * opposite) / (2.0 * a * b))
        .clamp(-1.0, 1.0)
        .acos()
}

#[inline]
fn wrap_angle(angle: f64, sum: f64) -> f64 {
    if sum > 0.0 {
        angle.rem_euclid(sum)
    } else {
        0.0
    }
}

/// The input mesh prepared for intrinsic editing.
///
/// Built once per mesh and shared by every [`FlipNetwork`](super::FlipNetwork)
/// created on it.
#[derive(Debug, Clone)]
pub struct FlipMesh<'m> {
    input: &'m TriMesh,
    connectivity: HalfEdgeMesh,
    lengths: Vec<f64>,
    angles: Vec<f64>,
    corners: Vec<f64>,
    angle_sums: Vec<f64>,
}

impl<'m> FlipMesh<'m> {
    /// Build connectivity and geometry. The mesh must be a closed,
    /// consistently oriented manifold.
    pub fn new(input: &'m TriMesh) -> Result<Self> {
        if input.num_faces() == 0 {
            return Err(MeshError::EmptyMesh);
        }
        let (connectivity, _) = build_connectivity(input.triangles(), input.num_vertices())?;
        let positions = input.positions();

        let lengths: Vec<f64> = connectivity
            .edge_ids()
            .map(|e| {
                let he = e.halfedge();
                let a = positions[connectivity.origin(he).index()];
                let b = positions[connectivity.dest(he).index()];
                (b - a).norm()
            })
            .collect();

        let mut corners = vec![0.0; connectivity.num_halfedges()];
        for (i, corner) in corners.iter_mut().enumerate() {
            let h = HalfEdgeId::new(i);
            let v = positions[connectivity.origin(h).index()];
            let w = positions[connectivity.dest(h).index()];
            let x = positions[connectivity.origin(connectivity.prev(h)).index()];
            let (a, b) = (w - v, x - v);
            *corner = if a.norm() > 0.0 && b.norm() > 0.0 {
                a.angle(&b)
            } else {
                0.0
            };
        }

        let mut angles = vec![0.0; connectivity.num_halfedges()];
        let mut angle_sums = vec![0.0; connectivity.num_vertices()];
        for v in connectivity.vertex_ids() {
            let mut sum = 0.0;
            for h in connectivity.vertex_halfedges(v) {
                angles[h.index()] = sum;
                sum += corners[h.index()];
            }
            angle_sums[v.index()] = sum;
        }

        info!(
            "flip mesh: {} vertices, {} edges",
            connectivity.num_vertices(),
            connectivity.num_edges()
        );

        Ok(Self {
            input,
            connectivity,
            lengths,
            angles,
            corners,
            angle_sums,
        })
    }

    /// The input mesh.
    #[inline]
    pub fn input(&self) -> &'m TriMesh {
        self.input
    }

    /// Connectivity of the input mesh.
    #[inline]
    pub fn connectivity(&self) -> &HalfEdgeMesh {
        &self.connectivity
    }

    /// Angle sum around an input vertex.
    #[inline]
    pub fn angle_sum(&self, v: VertexId) -> f64 {
        self.angle_sums[v.index()]
    }

    /// Point and planar direction leaving input vertex `v` at signpost `angle`.
    fn input_direction(&self, v: VertexId, angle: f64) -> Result<(SurfacePoint, Vector2<f64>)> {
        let mut chosen = None;
        for h in self.connectivity.vertex_halfedges(v) {
            let start = self.angles[h.index()];
            let corner = self.corners[h.index()];
            if angle >= start - 1e-12 && angle <= start + corner + 1e-12 {
                chosen = Some((h, (angle - start).clamp(0.0, corner)));
                break;
            }
        }
        let (h, delta) = chosen
            .or_else(|| {
                let first = self.connectivity.vertex_halfedge(v);
                first.is_valid().then_some((first, 0.0))
            })
            .ok_or(MeshError::VertexNotFound {
                vertex: v.index(),
                num_vertices: self.connectivity.num_vertices(),
            })?;

        let face = self.connectivity.face_of(h);
        let t = self.input.triangle(face);
        let kv = t.iter().position(|&x| x == v.index());
        let kw = t
            .iter()
            .position(|&x| x == self.connectivity.dest(h).index());
        let (Some(kv), Some(kw)) = (kv, kw) else {
            return Err(MeshError::topology(format!(
                "half-edge {:?} does not match {:?}",
                h, face
            )));
        };

        let tr = self.input.triangle_coordinates(face);
        let along = tr[kw] - tr[kv];
        let along = if along.norm() > 0.0 {
            along.normalize()
        } else {
            Vector2::new(1.0, 0.0)
        };
        let point = SurfacePoint {
            face,
            uv: SurfacePoint::corner_uv(kv),
        };
        Ok((point, rotate(&along, delta)))
    }
}

/// Where a vertex of the intrinsic triangulation lies on the input surface.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    /// A vertex of the input mesh.
    Input,
    /// An inserted vertex; `reference` is the direction of signpost zero in
    /// the frame of `point.face`.
    Inserted {
        point: SurfacePoint,
        reference: Vector2<f64>,
    },
}

/// A mutable intrinsic triangulation over a [`FlipMesh`].
#[derive(Debug, Clone)]
pub struct IntrinsicTriangulation<'a> {
    base: &'a FlipMesh<'a>,
    mesh: HalfEdgeMesh,
    lengths: Vec<f64>,
    angles: Vec<f64>,
    angle_sums: Vec<f64>,
    anchors: Vec<Anchor>,
}

impl<'a> IntrinsicTriangulation<'a> {
    /// Start from the input triangulation.
    pub fn new(base: &'a FlipMesh<'a>) -> Self {
        Self {
            base,
            mesh: base.connectivity.clone(),
            lengths: base.lengths.clone(),
            angles: base.angles.clone(),
            angle_sums: base.angle_sums.clone(),
            anchors: vec![Anchor::Input; base.connectivity.num_vertices()],
        }
    }

    /// Current connectivity.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    /// The input mesh.
    #[inline]
    pub fn input(&self) -> &TriMesh {
        self.base.input
    }

    /// Edge lengths, indexed by edge.
    #[inline]
    pub fn edge_lengths(&self) -> &[f64] {
        &self.lengths
    }

    /// Length of the edge of a half-edge.
    #[inline]
    pub fn length(&self, h: HalfEdgeId) -> f64 {
        self.lengths[h.edge().index()]
    }

    /// Signpost angle of a half-edge.
    #[inline]
    pub fn signpost(&self, h: HalfEdgeId) -> f64 {
        self.angles[h.index()]
    }

    /// Angle sum around a vertex.
    #[inline]
    pub fn angle_sum(&self, v: VertexId) -> f64 {
        self.angle_sums[v.index()]
    }

    /// Whether `v` was inserted rather than taken from the input mesh.
    pub fn is_inserted(&self, v: VertexId) -> bool {
        matches!(self.anchors[v.index()], Anchor::Inserted { .. })
    }

    /// Interior angle at the origin of `h` in its face.
    pub fn corner(&self, h: HalfEdgeId) -> f64 {
        let next = self.mesh.next(h);
        let prev = self.mesh.next(next);
        corner_angle(self.length(h), self.length(prev), self.length(next))
    }

    /// Planar layout of the two faces around `h = a -> b`: `a` at the
    /// origin, `b` on the positive x axis, the apex `c` of the face of `h`
    /// above and the apex `d` of the twin face below.
    fn layout_diamond(&self, h: HalfEdgeId) -> [Point2<f64>; 4] {
        let tw = h.twin();
        let h_n = self.mesh.next(h);
        let h_p = self.mesh.next(h_n);
        let t_n = self.mesh.next(tw);
        let t_p = self.mesh.next(t_n);

        let a = Point2::origin();
        let b = Point2::new(self.length(h), 0.0);
        let c = intersect_circles(&a, self.length(h_p), &b, self.length(h_n), true);
        let d = intersect_circles(&a, self.length(t_n), &b, self.length(t_p), false);
        [a, b, c, d]
    }

    /// Flip the edge of `h`.
    ///
    /// Returns `Ok(false)` and leaves the triangulation unchanged when the
    /// two faces around the edge do not form a convex quadrilateral.
    pub fn flip(&mut self, h: HalfEdgeId) -> Result<bool> {
        let tw = h.twin();
        if self.mesh.face_of(h) == self.mesh.face_of(tw) {
            return Ok(false);
        }

        let h_n = self.mesh.next(h);
        let h_p = self.mesh.next(h_n);
        let t_n = self.mesh.next(tw);
        let t_p = self.mesh.next(t_n);
        let c = self.mesh.origin(h_p);
        let d = self.mesh.origin(t_p);

        let [pa, pb, pc, pd] = self.layout_diamond(h);
        let scale = self.length(h).max(f64::EPSILON);
        let eps = 1e-10 * scale * scale;
        if cross2(&(pa - pc), &(pd - pc)) <= eps || cross2(&(pb - pd), &(pc - pd)) <= eps {
            return Ok(false);
        }

        let new_length = (pc - pd).norm();
        let (l_bc, l_ca) = (self.length(h_n), self.length(h_p));
        let (l_ad, l_db) = (self.length(t_n), self.length(t_p));

        self.mesh.flip(h)?;

        self.lengths[h.edge().index()] = new_length;
        // h is now d -> c and its twin c -> d.
        self.angles[h.index()] = wrap_angle(
            self.angles[t_p.index()] + corner_angle(l_db, new_length, l_bc),
            self.angle_sum(d),
        );
        self.angles[tw.index()] = wrap_angle(
            self.angles[h_p.index()] + corner_angle(l_ca, new_length, l_ad),
            self.angle_sum(c),
        );
        Ok(true)
    }

    /// Insert a vertex on the edge of `h = a -> b`, at fraction `t` from `a`.
    pub fn split(&mut self, h: HalfEdgeId, t: f64) -> Result<EdgeSplit> {
        let tw = h.twin();
        if self.mesh.face_of(h) == self.mesh.face_of(tw) {
            return Err(MeshError::topology(format!(
                "cannot split {:?}: both sides belong to one face",
                h.edge()
            )));
        }
        let t = t.clamp(0.0, 1.0);

        let h_n = self.mesh.next(h);
        let h_p = self.mesh.next(h_n);
        let t_n = self.mesh.next(tw);
        let t_p = self.mesh.next(t_n);
        let c = self.mesh.origin(h_p);
        let d = self.mesh.origin(t_p);

        let [_, _, pc, pd] = self.layout_diamond(h);
        let l_ab = self.length(h);
        let pm = Point2::new(t * l_ab, 0.0);
        let (l_am, l_mb) = (t * l_ab, (1.0 - t) * l_ab);
        let (l_mc, l_md) = ((pc - pm).norm(), (pd - pm).norm());
        let (l_bc, l_ca) = (self.length(h_n), self.length(h_p));
        let (l_ad, l_db) = (self.length(t_n), self.length(t_p));

        let trace = self.trace(h, l_am)?;
        let b_angle = self.angles[tw.index()];

        let split = self.mesh.split_edge(h);
        let (mb, mc, md) = (split.second, split.left, split.right);

        self.lengths[h.edge().index()] = l_am;
        self.lengths.extend([l_mb, l_mc, l_md]);
        self.angles.resize(self.mesh.num_halfedges(), 0.0);
        self.angle_sums.push(TAU);
        self.anchors.push(Anchor::Inserted {
            point: trace.end,
            reference: trace.direction,
        });

        // Around the new vertex: m -> b is the reference direction.
        self.angles[mb.index()] = 0.0;
        self.angles[mc.index()] = corner_angle(l_mb, l_mc, l_bc);
        self.angles[tw.index()] = PI;
        self.angles[md.index()] = PI + corner_angle(l_am, l_md, l_ad);

        // b -> m keeps the direction b -> a had.
        self.angles[mb.twin().index()] = b_angle;
        self.angles[mc.twin().index()] = wrap_angle(
            self.angles[h_p.index()] + corner_angle(l_ca, l_mc, l_am),
            self.angle_sum(c),
        );
        self.angles[md.twin().index()] = wrap_angle(
            self.angles[t_p.index()] + corner_angle(l_db, l_md, l_mb),
            self.angle_sum(d),
        );

        Ok(split)
    }

    /// Trace `distance` along `h` from its origin over the input surface.
    pub(crate) fn trace(&self, h: HalfEdgeId, distance: f64) -> Result<Trace> {
        let v = self.mesh.origin(h);
        let angle = self.signpost(h);
        let (start, direction) = match self.anchors[v.index()] {
            Anchor::Input => self.base.input_direction(v, angle)?,
            Anchor::Inserted { point, reference } => (point, rotate(&reference, angle)),
        };
        trace_straight(self.base.input, start, direction, distance)
    }

    /// Position of a vertex on the input surface.
    pub fn vertex_position(&self, v: VertexId) -> Point3<f64> {
        match self.anchors[v.index()] {
            Anchor::Input => self.base.input.positions()[v.index()],
            Anchor::Inserted { point, .. } => self.base.input.eval_position(&point),
        }
    }

    /// Surface point of a vertex.
    pub fn vertex_point(&self, v: VertexId) -> Option<SurfacePoint> {
        match self.anchors[v.index()] {
            Anchor::Input => self.base.input.vertex_point(v),
            Anchor::Inserted { point, .. } => Some(point),
        }
    }

    /// The edge of `h` as a 3D polyline from its origin to its destination.
    pub fn halfedge_positions(&self, h: HalfEdgeId) -> Result<Vec<Point3<f64>>> {
        let mut points = self.trace(h, self.length(h))?.points;
        if let Some(first) = points.first_mut() {
            *first = self.vertex_position(self.mesh.origin(h));
        }
        let end = self.vertex_position(self.mesh.dest(h));
        let n = points.len();
        match points.last_mut() {
            Some(last) if n > 1 => *last = end,
            _ => points.push(end),
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_octahedron_angle_sums() {
        let mesh = shapes::octahedron();
        let base = FlipMesh::new(&mesh).unwrap();
        for v in base.connectivity().vertex_ids() {
            assert_relative_eq!(base.angle_sum(v), 4.0 * PI / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_open_mesh_rejected() {
        let mesh = shapes::quad();
        assert!(FlipMesh::new(&mesh).is_err());
    }

    #[test]
    fn test_flip_computes_other_diagonal() {
        let mesh = shapes::octahedron();
        let base = FlipMesh::new(&mesh).unwrap();
        let mut tri = IntrinsicTriangulation::new(&base);
        let h = tri.mesh().find_halfedge(VertexId::new(2), VertexId::new(4)).unwrap();

        assert!(tri.flip(h).unwrap());
        assert!(tri.mesh().is_valid());
        // Two equilateral triangles of side sqrt(2): the other diagonal is sqrt(6).
        assert_relative_eq!(tri.length(h), 6.0_f64.sqrt(), epsilon = 1e-12);

        // Corners around every vertex still add up to its angle sum.
        for v in tri.mesh().vertex_ids() {
            let sum: f64 = tri.mesh().vertex_halfedges(v).map(|h| tri.corner(h)).sum();
            assert_relative_eq!(sum, tri.angle_sum(v), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_flipped_edge_traces_to_its_end() {
        let mesh = shapes::octahedron();
        let base = FlipMesh::new(&mesh).unwrap();
        let mut tri = IntrinsicTriangulation::new(&base);
        let h = tri.mesh().find_halfedge(VertexId::new(2), VertexId::new(4)).unwrap();
        tri.flip(h).unwrap();

        let a = tri.mesh().origin(h);
        let b = tri.mesh().dest(h);
        let trace = tri.trace(h, tri.length(h)).unwrap();
        let end = mesh.eval_position(&trace.end);
        assert_relative_eq!(end, tri.vertex_position(b), epsilon = 1e-9);
        assert_relative_eq!(trace.points[0], tri.vertex_position(a), epsilon = 1e-12);
    }

    #[test]
    fn test_halfedge_positions_end_on_vertices() {
        let mesh = shapes::octahedron();
        let base = FlipMesh::new(&mesh).unwrap();
        let mut tri = IntrinsicTriangulation::new(&base);
        let h = tri.mesh().find_halfedge(VertexId::new(2), VertexId::new(4)).unwrap();

        let polyline = |points: &[Point3<f64>]| -> f64 {
            points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
        };

        let points = tri.halfedge_positions(h).unwrap();
        assert_relative_eq!(points[0], tri.vertex_position(VertexId::new(2)));
        assert_relative_eq!(
            *points.last().unwrap(),
            tri.vertex_position(VertexId::new(4))
        );
        assert_relative_eq!(polyline(&points), 2.0_f64.sqrt(), epsilon = 1e-9);

        // A flipped edge crosses an input edge on its way.
        tri.flip(h).unwrap();
        let points = tri.halfedge_positions(h).unwrap();
        assert!(points.len() > 2);
        assert_relative_eq!(points[0], tri.vertex_position(tri.mesh().origin(h)));
        assert_relative_eq!(
            *points.last().unwrap(),
            tri.vertex_position(tri.mesh().dest(h))
        );
        assert_relative_eq!(polyline(&points), 6.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_split_inserts_flat_vertex() {
        let mesh = shapes::icosphere(1);
        let base = FlipMesh::new(&mesh).unwrap();
        let mut tri = IntrinsicTriangulation::new(&base);
        let h = HalfEdgeId::new(0);
        let length = tri.length(h);
        let (a, b) = (tri.mesh().origin(h), tri.mesh().dest(h));

        let split = tri.split(h, 0.25).unwrap();
        assert!(tri.mesh().is_valid());
        assert!(tri.is_inserted(split.vertex));
        assert_relative_eq!(tri.angle_sum(split.vertex), TAU);
        assert_relative_eq!(tri.length(h) + tri.length(split.second), length, epsilon = 1e-12);

        let sum: f64 = tri
            .mesh()
            .vertex_halfedges(split.vertex)
            .map(|h| tri.corner(h))
            .sum();
        assert_relative_eq!(sum, TAU, epsilon = 1e-9);

        // The new vertex lies on the input edge a quarter of the way along.
        let pa = tri.vertex_position(a);
        let pb = tri.vertex_position(b);
        assert_relative_eq!(
            tri.vertex_position(split.vertex),
            pa + (pb - pa) * 0.25,
            epsilon = 1e-9
        );
    }
}

//! Planar unfolding of face sequences.

use nalgebra::{Point2, Vector2};

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, SurfacePoint, TriMesh};

/// 2D cross product (z component of the 3D cross product).
#[inline]
pub(crate) fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Point at `uv` in a planar triangle.
#[inline]
pub(crate) fn interpolate_triangle(tr: &[Point2<f64>; 3], uv: &Vector2<f64>) -> Point2<f64> {
    Point2::from(tr[0].coords * (1.0 - uv.x - uv.y) + tr[1].coords * uv.x + tr[2].coords * uv.y)
}

/// `uv` coordinates of the point at `x` along edge `k` of a face.
#[inline]
pub(crate) fn edge_uv(k: usize, x: f64) -> Vector2<f64> {
    SurfacePoint::corner_uv(k) * (1.0 - x) + SurfacePoint::corner_uv(k + 1) * x
}

/// Intersect the circle of radius `r0` around `p0` with the circle of
/// radius `r1` around `p1`, returning the solution on the left of `p0 -> p1`
/// (or on the right when `left` is false).
pub(crate) fn intersect_circles(
    p0: &Point2<f64>,
    r0: f64,
    p1: &Point2<f64>,
    r1: f64,
    left: bool,
) -> Point2<f64> {
    let axis = p1 - p0;
    let d = axis.norm();
    if d <= f64::EPSILON {
        return *p0;
    }
    let a = (r0 * r0 - r1 * r1 + d * d) / (2.0 * d);
    let h = (r0 * r0 - a * a).max(0.0).sqrt();
    let dir = axis / d;
    let normal = Vector2::new(-dir.y, dir.x);
    let side = if left { h } else { -h };
    p0 + dir * a + normal * side
}

/// Where the portal between two adjacent faces lands in the second face.
///
/// Returns the index of the shared edge in `to` and the parameter along it
/// of the point at `x` on the shared edge of `from`.
pub(crate) fn transfer_lerp(mesh: &TriMesh, from: FaceId, to: FaceId, x: f64) -> Result<(usize, f64)> {
    let k = shared_edge(mesh, from, to)?;
    let kk = shared_edge(mesh, to, from)?;
    let a = mesh.triangle(from)[k];
    let b = mesh.triangle(to)[kk];
    // Consistently oriented neighbors traverse the shared edge backwards.
    let xx = if a == b { x } else { 1.0 - x };
    Ok((kk, xx))
}

/// Index of the edge of `f` shared with `g`.
pub(crate) fn shared_edge(mesh: &TriMesh, f: FaceId, g: FaceId) -> Result<usize> {
    mesh.shared_edge(f, g).ok_or_else(|| {
        MeshError::topology(format!("faces {:?} and {:?} are not adjacent", f, g))
    })
}

/// Lay out `to` in the plane next to `from`, whose layout is `tr`.
///
/// The returned coordinates follow the vertex order of `to`. The vertex not
/// on the shared edge is placed on the opposite side of the shared edge from
/// the third vertex of `from`.
pub(crate) fn unfold_face(
    mesh: &TriMesh,
    tr: &[Point2<f64>; 3],
    from: FaceId,
    to: FaceId,
) -> Result<[Point2<f64>; 3]> {
    let k = shared_edge(mesh, from, to)?;
    let kk = shared_edge(mesh, to, from)?;
    let tf = mesh.triangle(from);
    let tt = mesh.triangle(to);

    let mut result = [Point2::origin(); 3];
    // Shared vertices keep their planar position.
    for j in 0..3 {
        if let Some(i) = tf.iter().position(|&v| v == tt[j]) {
            result[j] = tr[i];
        }
    }

    let a = tt[kk];
    let b = tt[(kk + 1) % 3];
    let c = tt[(kk + 2) % 3];
    let pa = result[kk];
    let pb = result[(kk + 1) % 3];
    let pc = mesh.positions()[c];
    let ra = (pc - mesh.positions()[a]).norm();
    let rb = (pc - mesh.positions()[b]).norm();

    let opposite = tr[(k + 2) % 3];
    let opposite_left = cross2(&(pb - pa), &(opposite - pa)) > 0.0;
    result[(kk + 2) % 3] = intersect_circles(&pa, ra, &pb, rb, !opposite_left);
    Ok(result)
}

/// Planar layout of every face of a strip in the frame of the first one.
pub(crate) fn unfold_strip(mesh: &TriMesh, strip: &[FaceId]) -> Result<Vec<[Point2<f64>; 3]>> {
    let mut coords = Vec::with_capacity(strip.len());
    let Some(&first) = strip.first() else {
        return Ok(coords);
    };
    coords.push(mesh.triangle_coordinates(first));
    for w in strip.windows(2) {
        let prev = coords[coords.len() - 1];
        coords.push(unfold_face(mesh, &prev, w[0], w[1])?);
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_unfold_flat_quad_matches_plane() {
        let mesh = shapes::quad();
        let coords = unfold_strip(&mesh, &[FaceId::new(0), FaceId::new(1)]).unwrap();
        // The quad already lies in the plane with vertex 0 at the origin and
        // edge 0 along x, so the unfolding reproduces it exactly.
        let expected = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        for j in 0..3 {
            assert_relative_eq!(coords[1][j], expected[j], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unfold_preserves_edge_lengths() {
        let mesh = shapes::octahedron();
        let f = FaceId::new(0);
        let tr = mesh.triangle_coordinates(f);
        for k in 0..3 {
            let g = mesh.neighbor(f, k);
            let unfolded = unfold_face(&mesh, &tr, f, g).unwrap();
            for j in 0..3 {
                let l2 = (unfolded[(j + 1) % 3] - unfolded[j]).norm();
                assert_relative_eq!(l2, mesh.edge_length(g, j), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_transfer_lerp_reverses_parameter() {
        let mesh = shapes::quad();
        let (k, x) = transfer_lerp(&mesh, FaceId::new(0), FaceId::new(1), 0.25).unwrap();
        assert_eq!(k, 0);
        assert_relative_eq!(x, 0.75);
    }

    #[test]
    fn test_intersect_circles_sides() {
        let p0 = Point2::new(0.0, 0.0);
        let p1 = Point2::new(2.0, 0.0);
        let r = 2.0_f64.sqrt();
        assert_relative_eq!(intersect_circles(&p0, r, &p1, r, true), Point2::new(1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(intersect_circles(&p0, r, &p1, r, false), Point2::new(1.0, -1.0), epsilon = 1e-12);
    }
}

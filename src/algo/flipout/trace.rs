//! Tracing straight lines over the input surface.
//!
//! An intrinsic edge is a straight line on the surface: starting at a point
//! with a direction in the plane of its face, walk in that direction,
//! unfolding each face crossed into the plane of the previous one, until the
//! edge length is used up.

use nalgebra::{Point2, Point3, Vector2};

use crate::algo::geodesic::unfold::{cross2, interpolate_triangle, transfer_lerp};
use crate::error::{MeshError, Result};
use crate::mesh::{SurfacePoint, TriMesh};

/// Result of a trace.
#[derive(Debug, Clone)]
pub(crate) struct Trace {
    /// Start, every edge crossing and end, in 3D.
    pub points: Vec<Point3<f64>>,
    /// Where the trace ended.
    pub end: SurfacePoint,
    /// Unit direction of travel at the end, in the frame of `end.face`.
    pub direction: Vector2<f64>,
}

/// `uv` of a planar point in a planar triangle, clamped into the triangle.
pub(crate) fn triangle_uv(tr: &[Point2<f64>; 3], p: &Point2<f64>) -> Vector2<f64> {
    let e1 = tr[1] - tr[0];
    let e2 = tr[2] - tr[0];
    let area = cross2(&e1, &e2);
    if area.abs() <= f64::EPSILON {
        return Vector2::zeros();
    }
    let r = p - tr[0];
    let u = (cross2(&r, &e2) / area).max(0.0);
    let v = (cross2(&e1, &r) / area).max(0.0);
    let sum = u + v;
    if sum > 1.0 {
        Vector2::new(u / sum, v / sum)
    } else {
        Vector2::new(u, v)
    }
}

/// Rotate a 2D vector counter-clockwise.
#[inline]
pub(crate) fn rotate(v: &Vector2<f64>, angle: f64) -> Vector2<f64> {
    let (s, c) = angle.sin_cos();
    Vector2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

#[inline]
fn left_normal(e: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-e.y, e.x)
}

/// Walk `length` from `start` in `direction` (in the frame of `start.face`).
pub(crate) fn trace_straight(
    mesh: &TriMesh,
    start: SurfacePoint,
    direction: Vector2<f64>,
    length: f64,
) -> Result<Trace> {
    let mut face = start.face;
    let mut tr = mesh.triangle_coordinates(face);
    let mut p = interpolate_triangle(&tr, &start.uv);
    let mut points = vec![mesh.eval_position(&start)];

    let norm = direction.norm();
    if norm <= f64::EPSILON || length <= 0.0 {
        return Ok(Trace {
            points,
            end: start,
            direction: if norm > f64::EPSILON {
                direction / norm
            } else {
                Vector2::new(1.0, 0.0)
            },
        });
    }

    let mut d = direction / norm;
    let mut remaining = length;
    let mut entry: Option<usize> = None;
    let max_steps = 4 * mesh.num_faces() + 16;
    let tolerance = 1e-12 * length.max(1.0);

    for _ in 0..max_steps {
        // Leave through the exiting edge hit first.
        let mut exit: Option<(usize, f64, f64)> = None;
        for k in 0..3 {
            if entry == Some(k) {
                continue;
            }
            let a = tr[k];
            let e = tr[(k + 1) % 3] - a;
            let denom = cross2(&e, &d);
            if denom >= -1e-14 * e.norm() {
                continue;
            }
            let s = cross2(&(a - p), &e) / -denom;
            let x = cross2(&(p - a), &d) / denom;
            if exit.map_or(true, |(_, best, _)| s < best) {
                exit = Some((k, s.max(0.0), x));
            }
        }

        // Crossings within rounding of the end are not taken: the trace
        // would otherwise circle a vertex it ends on.
        let Some((k, s, x)) = exit.filter(|&(_, s, _)| s < remaining - tolerance) else {
            let end_point = p + d * remaining;
            let end = SurfacePoint {
                face,
                uv: triangle_uv(&tr, &end_point),
            };
            points.push(mesh.eval_position(&end));
            return Ok(Trace {
                points,
                end,
                direction: d,
            });
        };

        let next = mesh.neighbor(face, k);
        if !next.is_valid() {
            return Err(MeshError::topology(format!(
                "trace left the surface through edge {} of {:?}",
                k, face
            )));
        }
        let x = x.clamp(0.0, 1.0);
        let t = mesh.triangle(face);
        let pa = mesh.positions()[t[k]];
        let pb = mesh.positions()[t[(k + 1) % 3]];
        points.push(pa + (pb - pa) * x);

        let (kk, xx) = transfer_lerp(mesh, face, next, x)?;
        let next_tr = mesh.triangle_coordinates(next);

        // The shared edge runs backwards in the next face, and crossing it
        // turns "out of this face" into "into the next one".
        let e = (tr[(k + 1) % 3] - tr[k]).normalize();
        let along = d.dot(&e);
        let across = d.dot(&left_normal(&e));
        let e2 = next_tr[(kk + 1) % 3] - next_tr[kk];
        let e2_len = e2.norm();
        let e2 = if e2_len > f64::EPSILON {
            e2 / e2_len
        } else {
            -e
        };
        d = (e2 * -along + left_normal(&e2) * -across).normalize();

        p = next_tr[kk] + (next_tr[(kk + 1) % 3] - next_tr[kk]) * xx;
        remaining -= s;
        face = next;
        tr = next_tr;
        entry = Some(kk);
    }

    Err(MeshError::ConvergenceFailed {
        iterations: max_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, FaceId};
    use approx::assert_relative_eq;

    #[test]
    fn test_trace_across_quad_diagonal() {
        let mesh = shapes::quad();
        // From (0.75, 0.25) heading to (0.25, 0.75).
        let start = SurfacePoint::new(FaceId::new(0), 0.5, 0.25);
        let tr = mesh.triangle_coordinates(FaceId::new(0));
        let from = interpolate_triangle(&tr, &start.uv);
        // Face 0 is laid out with its first edge on the x axis.
        let target = Point2::new(0.25, 0.75);
        let dir = target - from;
        let trace = trace_straight(&mesh, start, dir, dir.norm()).unwrap();

        assert_eq!(trace.end.face, FaceId::new(1));
        assert_eq!(trace.points.len(), 3);
        assert_relative_eq!(trace.points[1], Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            *trace.points.last().unwrap(),
            Point3::new(0.25, 0.75, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_trace_over_octahedron_keeps_length() {
        let mesh = shapes::octahedron();
        let start = SurfacePoint::new(FaceId::new(0), 1.0 / 3.0, 1.0 / 3.0);
        let trace = trace_straight(&mesh, start, Vector2::new(1.0, 0.2), 2.0).unwrap();
        let walked: f64 = trace.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        assert_relative_eq!(walked, 2.0, epsilon = 1e-9);
        assert!(trace.points.len() > 2);
    }

    #[test]
    fn test_trace_leaving_open_surface_fails() {
        let mesh = shapes::quad();
        let start = SurfacePoint::new(FaceId::new(0), 0.5, 0.25);
        assert!(trace_straight(&mesh, start, Vector2::new(1.0, 0.0), 5.0).is_err());
    }

    #[test]
    fn test_triangle_uv_round_trip() {
        let tr = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(0.5, 1.0)];
        let uv = Vector2::new(0.2, 0.3);
        let p = interpolate_triangle(&tr, &uv);
        assert_relative_eq!(triangle_uv(&tr, &p), uv, epsilon = 1e-12);
    }
}

//! De Casteljau subdivision with geodesic midpoints.

use log::trace;

use super::{path_joint_bend, SplineParams};
use crate::algo::geodesic::{compute_shortest_path, geodesic_midpoint, DualGeodesicSolver};
use crate::error::Result;
use crate::mesh::{SurfacePoint, TriMesh};

type Segment = [SurfacePoint; 4];

fn midpoint(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    a: &SurfacePoint,
    b: &SurfacePoint,
) -> Result<SurfacePoint> {
    if a == b {
        return Ok(*a);
    }
    let path = compute_shortest_path(mesh, solver, a, b)?;
    geodesic_midpoint(mesh, &path)
}

/// Split a cubic segment at `t = 1/2`.
pub(crate) fn split(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    segment: &Segment,
) -> Result<(Segment, Segment)> {
    let [p0, p1, p2, p3] = segment;
    let q0 = midpoint(mesh, solver, p0, p1)?;
    let q1 = midpoint(mesh, solver, p1, p2)?;
    let q2 = midpoint(mesh, solver, p2, p3)?;
    let r0 = midpoint(mesh, solver, &q0, &q1)?;
    let r1 = midpoint(mesh, solver, &q1, &q2)?;
    let s = midpoint(mesh, solver, &r0, &r1)?;
    Ok(([*p0, q0, r0, s], [s, r1, q2, *p3]))
}

/// Control points of consecutive segments, without repeating shared ends.
fn flatten(segments: &[Segment]) -> Vec<SurfacePoint> {
    let mut points = Vec::with_capacity(segments.len() * 3 + 1);
    for s in segments {
        points.extend_from_slice(&s[..3]);
    }
    if let Some(last) = segments.last() {
        points.push(last[3]);
    }
    points
}

/// Split every segment `subdivisions` times: `3 * 2^subdivisions + 1` points.
pub(crate) fn uniform(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    segment: &Segment,
    subdivisions: usize,
) -> Result<Vec<SurfacePoint>> {
    let mut segments = vec![*segment];
    for _ in 0..subdivisions {
        let mut next = Vec::with_capacity(segments.len() * 2);
        for s in &segments {
            let (left, right) = split(mesh, solver, s)?;
            next.push(left);
            next.push(right);
        }
        segments = next;
    }
    Ok(flatten(&segments))
}

/// Whether a segment can be kept as is.
fn is_straight_enough(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    segment: &Segment,
    params: &SplineParams,
) -> Result<bool> {
    let positions = segment.map(|p| mesh.eval_position(&p));
    let polygon: f64 = positions.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    // Near an apex the tangents may never agree, so short segments are kept.
    if polygon < params.min_curve_size {
        return Ok(true);
    }

    let a = compute_shortest_path(mesh, solver, &segment[0], &segment[1])?;
    let b = compute_shortest_path(mesh, solver, &segment[1], &segment[2])?;
    if path_joint_bend(mesh, &a, &b)? > params.precision {
        return Ok(false);
    }
    let c = compute_shortest_path(mesh, solver, &segment[2], &segment[3])?;
    Ok(path_joint_bend(mesh, &b, &c)? <= params.precision)
}

/// Split segments until each one is straight enough, short enough or at
/// `max_depth`.
pub(crate) fn adaptive(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    segment: &Segment,
    params: &SplineParams,
) -> Result<Vec<SurfacePoint>> {
    let mut accepted: Vec<Segment> = Vec::new();
    let mut stack: Vec<(Segment, usize)> = vec![(*segment, 0)];
    let mut deepest = 0;

    while let Some((current, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        if depth >= params.max_depth || is_straight_enough(mesh, solver, &current, params)? {
            accepted.push(current);
            continue;
        }
        let (left, right) = split(mesh, solver, &current)?;
        // Right first so that the left half is handled next.
        stack.push((right, depth + 1));
        stack.push((left, depth + 1));
    }

    trace!(
        "adaptive de Casteljau: {} segments, depth {}",
        accepted.len(),
        deepest
    );
    Ok(flatten(&accepted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::geodesic::DualSolverOptions;
    use crate::mesh::{shapes, FaceId};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_split_on_plane_matches_affine_split() {
        let mesh = shapes::grid(4);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let segment = [
            SurfacePoint::new(FaceId::new(0), 0.5, 0.25),
            SurfacePoint::new(FaceId::new(13), 0.5, 0.25),
            SurfacePoint::new(FaceId::new(22), 0.5, 0.25),
            SurfacePoint::new(FaceId::new(31), 0.5, 0.25),
        ];
        let p = segment.map(|s| mesh.eval_position(&s).coords);
        let (left, right) = split(&mesh, &solver, &segment).unwrap();

        let s = (p[0] + 3.0 * p[1] + 3.0 * p[2] + p[3]) / 8.0;
        assert_relative_eq!(mesh.eval_position(&left[3]).coords, s, epsilon = 1e-9);
        assert_eq!(left[3], right[0]);
        assert_relative_eq!(
            mesh.eval_position(&left[1]).coords,
            (p[0] + p[1]) / 2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_coincident_points_do_not_recurse_forever() {
        let mesh = shapes::quad();
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let p = SurfacePoint::new(FaceId::new(0), 0.3, 0.3);
        let params = SplineParams::default().with_precision(0.0).with_min_curve_size(0.0);
        let points = adaptive(&mesh, &solver, &[p; 4], &params).unwrap();
        assert_eq!(points.len(), 4);
        for q in &points {
            assert_relative_eq!(
                mesh.eval_position(q),
                Point3::new(0.6, 0.3, 0.0),
                epsilon = 1e-12
            );
        }
    }
}

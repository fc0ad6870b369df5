//! Midpoint refinement with geodesic averages.
//!
//! Each round doubles the polygon and smooths it:
//!
//! - refine: keep every point and insert the midpoint of each leg,
//! - smooth: move every kept interior point to the midpoint between itself
//!   and the midpoint of its two new neighbors.
//!
//! End points never move, so a polygon of `n` points becomes one of
//! `2n - 1` points and the curve still joins the first and last control
//! points.

use log::trace;

use super::{path_joint_bend, SplineParams};
use crate::algo::geodesic::{
    compute_shortest_path, geodesic_midpoint, path_length, DualGeodesicSolver, GeodesicPath,
};
use crate::error::Result;
use crate::mesh::{SurfacePoint, TriMesh};

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

/// Shortest paths along every leg of the polygon.
fn leg_paths(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    points: &[SurfacePoint],
) -> Result<Vec<GeodesicPath>> {
    points
        .windows(2)
        .map(|w| compute_shortest_path(mesh, solver, &w[0], &w[1]))
        .collect()
}

/// One refine-and-smooth round, given the paths of the current legs.
fn refine_and_smooth(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    points: &[SurfacePoint],
    legs: &[GeodesicPath],
) -> Result<Vec<SurfacePoint>> {
    let mut refined = Vec::with_capacity(2 * points.len() - 1);
    for (p, leg) in points.iter().zip(legs) {
        refined.push(*p);
        refined.push(geodesic_midpoint(mesh, leg)?);
    }
    if let Some(last) = points.last() {
        refined.push(*last);
    }

    let mut smoothed = refined.clone();
    for i in (2..refined.len().saturating_sub(1)).step_by(2) {
        let between = midpoint(mesh, solver, &refined[i - 1], &refined[i + 1])?;
        smoothed[i] = midpoint(mesh, solver, &between, &refined[i])?;
    }
    Ok(smoothed)
}

/// Run `subdivisions` rounds: `3 * 2^subdivisions + 1` points.
pub(crate) fn uniform(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    segment: &[SurfacePoint; 4],
    subdivisions: usize,
) -> Result<Vec<SurfacePoint>> {
    let mut points = segment.to_vec();
    for _ in 0..subdivisions {
        let legs = leg_paths(mesh, solver, &points)?;
        points = refine_and_smooth(mesh, solver, &points, &legs)?;
    }
    Ok(points)
}

/// Run rounds until every joint is straight enough, every leg is shorter
/// than `min_curve_size`, or `max_depth` rounds have been made.
pub(crate) fn adaptive(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    segment: &[SurfacePoint; 4],
    params: &SplineParams,
) -> Result<Vec<SurfacePoint>> {
    let mut points = segment.to_vec();
    let mut rounds = 0;
    while rounds < params.max_depth {
        let legs = leg_paths(mesh, solver, &points)?;

        let mut longest: f64 = 0.0;
        for leg in &legs {
            longest = longest.max(path_length(mesh, leg)?);
        }
        if longest < params.min_curve_size {
            break;
        }

        let mut bend: f64 = 0.0;
        for pair in legs.windows(2) {
            bend = bend.max(path_joint_bend(mesh, &pair[0], &pair[1])?);
        }
        if bend <= params.precision {
            break;
        }

        points = refine_and_smooth(mesh, solver, &points, &legs)?;
        rounds += 1;
    }

    trace!("adaptive midpoint: {} rounds, {} points", rounds, points.len());
    Ok(points)
}

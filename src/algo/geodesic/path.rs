//! Queries on [`GeodesicPath`]s.
//!
//! A path with strip `s` (length `m`) visits `m + 1` points: its start, one
//! crossing per portal and its end. Segment `i` runs from point `i` to point
//! `i + 1` inside face `s[i]`.

use nalgebra::{Point3, Vector2};

use super::dual::DualGeodesicSolver;
use super::exact::compute_shortest_path;
use super::unfold::{edge_uv, interpolate_triangle, shared_edge, transfer_lerp, unfold_face};
use super::GeodesicPath;
use crate::error::Result;
use crate::mesh::{SurfacePoint, TriMesh};

/// Lengths below this are treated as zero.
const DEGENERATE_LENGTH: f64 = 1e-12;

impl GeodesicPath {
    /// The same path walked from `end` to `start`.
    pub fn reversed(&self, mesh: &TriMesh) -> Result<GeodesicPath> {
        let m = self.strip.len();
        let mut lerps = Vec::with_capacity(self.lerps.len());
        for j in 0..self.lerps.len() {
            let i = m - 2 - j;
            let (_, x) = transfer_lerp(mesh, self.strip[i], self.strip[i + 1], self.lerps[i])?;
            lerps.push(x);
        }
        Ok(GeodesicPath {
            start: self.end,
            end: self.start,
            strip: self.strip.iter().rev().copied().collect(),
            lerps,
        })
    }

    /// Whether the path has no portal crossings.
    #[inline]
    pub fn is_single_face(&self) -> bool {
        self.lerps.is_empty()
    }
}

/// All points of the path, each expressed in the face its outgoing segment
/// lies in (the end point in the last face).
pub fn path_surface_points(mesh: &TriMesh, path: &GeodesicPath) -> Result<Vec<SurfacePoint>> {
    let mut points = Vec::with_capacity(path.lerps.len() + 2);
    points.push(path.start);
    for (i, &x) in path.lerps.iter().enumerate() {
        let (k, xx) = transfer_lerp(mesh, path.strip[i], path.strip[i + 1], x)?;
        let uv = edge_uv(k, xx);
        points.push(SurfacePoint {
            face: path.strip[i + 1],
            uv,
        });
    }
    points.push(path.end);
    Ok(points)
}

/// 3D positions of all points of the path.
pub fn path_positions(mesh: &TriMesh, path: &GeodesicPath) -> Result<Vec<Point3<f64>>> {
    Ok(path_surface_points(mesh, path)?
        .iter()
        .map(|p| mesh.eval_position(p))
        .collect())
}

/// Length of the path.
pub fn path_length(mesh: &TriMesh, path: &GeodesicPath) -> Result<f64> {
    Ok(polyline_length(&path_positions(mesh, path)?))
}

fn polyline_length(positions: &[Point3<f64>]) -> f64 {
    positions.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// `uv` coordinates, in face `strip[i]`, of the two ends of segment `i`.
fn segment_uvs(mesh: &TriMesh, path: &GeodesicPath, i: usize) -> Result<(Vector2<f64>, Vector2<f64>)> {
    let m = path.strip.len();
    let from = if i == 0 {
        path.start.uv
    } else {
        let (k, x) = transfer_lerp(mesh, path.strip[i - 1], path.strip[i], path.lerps[i - 1])?;
        edge_uv(k, x)
    };
    let to = if i + 1 == m {
        path.end.uv
    } else {
        let k = shared_edge(mesh, path.strip[i], path.strip[i + 1])?;
        edge_uv(k, path.lerps[i])
    };
    Ok((from, to))
}

/// The point at arc-length fraction `t` along the path.
///
/// `t` is clamped to `[0, 1]`; a zero-length path returns its start.
pub fn eval_path_point(mesh: &TriMesh, path: &GeodesicPath, t: f64) -> Result<SurfacePoint> {
    let t = t.clamp(0.0, 1.0);
    if t == 0.0 {
        return Ok(path.start);
    }
    if t == 1.0 {
        return Ok(path.end);
    }

    let positions = path_positions(mesh, path)?;
    let total = polyline_length(&positions);
    if total <= DEGENERATE_LENGTH {
        return Ok(path.start);
    }

    let target = t * total;
    let mut walked = 0.0;
    let last = positions.len() - 2;
    for i in 0..=last {
        let len = (positions[i + 1] - positions[i]).norm();
        if walked + len >= target || i == last {
            let s = if len > DEGENERATE_LENGTH {
                ((target - walked) / len).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (from, to) = segment_uvs(mesh, path, i)?;
            let uv = from * (1.0 - s) + to * s;
            return Ok(SurfacePoint {
                face: path.strip[i],
                uv,
            });
        }
        walked += len;
    }

    Ok(path.end)
}

/// The point halfway along the path: the surface analogue of `(p + q) / 2`.
pub fn geodesic_midpoint(mesh: &TriMesh, path: &GeodesicPath) -> Result<SurfacePoint> {
    eval_path_point(mesh, path, 0.5)
}

/// Unit direction in which the path leaves its start (or its end, walking
/// backwards), in the planar frame of that point's face.
///
/// Returns `None` for paths of zero length.
pub fn tangent_path_direction(
    mesh: &TriMesh,
    path: &GeodesicPath,
    at_start: bool,
) -> Result<Option<Vector2<f64>>> {
    if !at_start {
        return tangent_path_direction(mesh, &path.reversed(mesh)?, true);
    }

    let mut tr = mesh.triangle_coordinates(path.start.face);
    let origin = interpolate_triangle(&tr, &path.start.uv);
    let scale = (0..3)
        .map(|k| mesh.edge_length(path.start.face, k))
        .fold(1.0, f64::max);

    for (i, &x) in path.lerps.iter().enumerate() {
        let k = shared_edge(mesh, path.strip[i], path.strip[i + 1])?;
        let crossing = tr[k] + (tr[(k + 1) % 3] - tr[k]) * x;
        let d = crossing - origin;
        if d.norm() > DEGENERATE_LENGTH * scale {
            return Ok(Some(d.normalize()));
        }
        tr = unfold_face(mesh, &tr, path.strip[i], path.strip[i + 1])?;
    }

    let d = interpolate_triangle(&tr, &path.end.uv) - origin;
    if d.norm() > DEGENERATE_LENGTH * scale {
        Ok(Some(d.normalize()))
    } else {
        Ok(None)
    }
}

/// Connect consecutive points with shortest paths and return the positions
/// of the resulting polyline, without repeating shared joints.
pub fn polyline_positions(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    points: &[SurfacePoint],
) -> Result<Vec<Point3<f64>>> {
    let mut positions = Vec::new();
    for (i, w) in points.windows(2).enumerate() {
        let path = compute_shortest_path(mesh, solver, &w[0], &w[1])?;
        let segment = path_positions(mesh, &path)?;
        let skip = usize::from(i > 0);
        positions.extend(segment.into_iter().skip(skip));
    }
    if positions.is_empty() {
        positions.extend(points.iter().map(|p| mesh.eval_position(p)));
    }
    Ok(positions)
}

/// Largest turning measure `|1 - cos(theta)|` between consecutive legs of a
/// polyline. Zero-length legs are skipped.
pub fn max_tangent_space_angle(positions: &[Point3<f64>]) -> f64 {
    let mut max_angle: f64 = 0.0;
    for w in positions.windows(3) {
        let a = w[1] - w[0];
        let b = w[2] - w[1];
        if a.norm() <= DEGENERATE_LENGTH || b.norm() <= DEGENERATE_LENGTH {
            continue;
        }
        let angle = (1.0 - a.normalize().dot(&b.normalize())).abs();
        max_angle = max_angle.max(angle);
    }
    max_angle
}

/// Length of the longest leg of a polyline.
pub fn max_segment_length(positions: &[Point3<f64>]) -> f64 {
    positions
        .windows(2)
        .map(|w| (w[1] - w[0]).norm())
        .fold(0.0, f64::max)
}

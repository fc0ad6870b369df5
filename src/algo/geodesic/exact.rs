//! Shortest paths inside a strip.
//!
//! The strip is unfolded into the plane of its first face; the shortest path
//! confined to the corridor is then the taut string through the sequence of
//! shared edges ("portals"), found with the funnel algorithm. Each portal
//! crossing is recorded as a parameter along the shared edge.
//!
//! A corridor found on the dual graph is not always wide enough to contain
//! the geodesic: the taut string then wraps around a vertex on the corridor
//! wall. [`compute_shortest_path`] detects such corners and reroutes the
//! strip through the other side of the vertex while that makes the path
//! shorter.

use std::collections::HashSet;

use log::{debug, trace};
use nalgebra::{Point2, Vector2};

use super::dual::DualGeodesicSolver;
use super::path::path_length;
use super::strip::reduce_strip;
use super::unfold::{cross2, interpolate_triangle, shared_edge, unfold_strip};
use super::GeodesicPath;
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, SurfacePoint, TriMesh};

/// Bound on corner reroutes per query.
const MAX_REROUTES: usize = 256;

/// A portal as seen when walking the strip forward.
#[derive(Debug, Clone, Copy)]
struct Portal {
    left: Point2<f64>,
    right: Point2<f64>,
    left_vertex: Option<usize>,
    right_vertex: Option<usize>,
}

/// A vertex of the taut string.
#[derive(Debug, Clone, Copy)]
struct Corner {
    point: Point2<f64>,
    /// Funnel index: 0 is the start, `n + 1` the end, `i` the portal `i - 1`.
    index: usize,
    /// Mesh vertex the corner sits on, for interior corners.
    vertex: Option<usize>,
}

/// Portal endpoints `(a, b)` such that the crossing at `x` is `a + x (b - a)`,
/// plus the left/right split used by the funnel.
fn portals(
    mesh: &TriMesh,
    strip: &[FaceId],
    coords: &[[Point2<f64>; 3]],
) -> Result<(Vec<(Point2<f64>, Point2<f64>)>, Vec<Portal>)> {
    let mut edges = Vec::with_capacity(strip.len().saturating_sub(1));
    let mut funnel = Vec::with_capacity(strip.len().saturating_sub(1));
    for i in 0..strip.len().saturating_sub(1) {
        let k = shared_edge(mesh, strip[i], strip[i + 1])?;
        let t = mesh.triangle(strip[i]);
        let tr = &coords[i];
        let (a, b, c) = (tr[k], tr[(k + 1) % 3], tr[(k + 2) % 3]);
        let (va, vb) = (t[k], t[(k + 1) % 3]);
        edges.push((a, b));
        // Walking out of the face, its third vertex is behind us.
        if cross2(&(b - a), &(c - a)) >= 0.0 {
            funnel.push(Portal {
                left: b,
                right: a,
                left_vertex: Some(vb),
                right_vertex: Some(va),
            });
        } else {
            funnel.push(Portal {
                left: a,
                right: b,
                left_vertex: Some(va),
                right_vertex: Some(vb),
            });
        }
    }
    Ok((edges, funnel))
}

/// Sine tolerance under which two funnel directions count as collinear.
const COLLINEAR: f64 = 1e-9;

/// Relative distance under which an endpoint counts as lying on a portal.
const ON_PORTAL: f64 = 1e-9;

/// Sine of the angle turning from `a` to `b`, zero when either vanishes.
fn turn(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let norms = a.norm() * b.norm();
    if norms > 0.0 {
        cross2(a, b) / norms
    } else {
        0.0
    }
}

/// Whether `p` lies on the portal segment.
fn on_portal(portal: &Portal, p: &Point2<f64>) -> bool {
    let edge = portal.right - portal.left;
    let len2 = edge.norm_squared();
    let closest = if len2 > 0.0 {
        let x = ((p - portal.left).dot(&edge) / len2).clamp(0.0, 1.0);
        portal.left + edge * x
    } else {
        portal.left
    };
    (p - closest).norm() <= ON_PORTAL * len2.sqrt().max(f64::MIN_POSITIVE)
}

/// Leading and trailing portals that already contain the start or the end.
///
/// The string leaves an endpoint on a portal without crossing that portal,
/// so these portals must not constrain the funnel.
fn endpoint_portals(
    start: &Point2<f64>,
    end: &Point2<f64>,
    portals: &[Portal],
) -> (usize, usize) {
    let lead = portals.iter().take_while(|p| on_portal(p, start)).count();
    let trail = portals[lead..]
        .iter()
        .rev()
        .take_while(|p| on_portal(p, end))
        .count();
    (lead, trail)
}

/// Corners of the taut string through the portals, start and end included.
fn string_pull(start: Point2<f64>, end: Point2<f64>, portals: &[Portal]) -> Vec<Corner> {
    let endpoint = |p: Point2<f64>| Portal {
        left: p,
        right: p,
        left_vertex: None,
        right_vertex: None,
    };
    let mut funnel = Vec::with_capacity(portals.len() + 2);
    funnel.push(endpoint(start));
    funnel.extend_from_slice(portals);
    funnel.push(endpoint(end));

    let mut corners = vec![Corner {
        point: start,
        index: 0,
        vertex: None,
    }];
    let mut apex = start;
    let mut left = start;
    let mut right = start;
    let (mut left_index, mut right_index) = (0usize, 0usize);

    let mut i = 1;
    while i < funnel.len() {
        let p = funnel[i];

        // Tighten the right side.
        let to_right = p.right - apex;
        if turn(&(right - apex), &to_right) >= -COLLINEAR {
            if right == apex || turn(&to_right, &(left - apex)) > -COLLINEAR {
                right = p.right;
                right_index = i;
            } else {
                // Right crossed over left: left becomes a corner.
                let apex_index = left_index;
                apex = left;
                corners.push(Corner {
                    point: apex,
                    index: apex_index,
                    vertex: funnel[apex_index].left_vertex,
                });
                left = apex;
                right = apex;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        // Tighten the left side.
        let to_left = p.left - apex;
        if turn(&(left - apex), &to_left) <= COLLINEAR {
            if left == apex || turn(&(right - apex), &to_left) > -COLLINEAR {
                left = p.left;
                left_index = i;
            } else {
                let apex_index = right_index;
                apex = right;
                corners.push(Corner {
                    point: apex,
                    index: apex_index,
                    vertex: funnel[apex_index].right_vertex,
                });
                left = apex;
                right = apex;
                left_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        i += 1;
    }

    corners.push(Corner {
        point: end,
        index: funnel.len() - 1,
        vertex: None,
    });
    corners
}

/// Parameter along `a -> b` where the segment `p -> q` crosses it.
fn crossing(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>, q: &Point2<f64>) -> f64 {
    let edge = b - a;
    let segment: Vector2<f64> = q - p;
    let denom = cross2(&edge, &segment);
    let x = if denom.abs() > f64::EPSILON * edge.norm().max(1.0) * segment.norm().max(1.0) {
        cross2(&(p - a), &segment) / denom
    } else {
        // Parallel or degenerate: project the segment start on the edge.
        let len2 = edge.norm_squared();
        if len2 > 0.0 {
            (p - a).dot(&edge) / len2
        } else {
            0.5
        }
    };
    x.clamp(0.0, 1.0)
}

/// Funnel solve returning the path and its interior corners.
fn funnel_path(
    mesh: &TriMesh,
    start: &SurfacePoint,
    end: &SurfacePoint,
    strip: &[FaceId],
) -> Result<(GeodesicPath, Vec<Corner>)> {
    mesh.check_point(start)?;
    mesh.check_point(end)?;
    if strip.first() != Some(&start.face) || strip.last() != Some(&end.face) {
        return Err(MeshError::topology(format!(
            "strip does not connect {:?} to {:?}",
            start.face, end.face
        )));
    }

    if strip.len() == 1 {
        let path = GeodesicPath {
            start: *start,
            end: *end,
            strip: strip.to_vec(),
            lerps: Vec::new(),
        };
        return Ok((path, Vec::new()));
    }

    let coords = unfold_strip(mesh, strip)?;
    let (edges, funnel) = portals(mesh, strip, &coords)?;

    let p_start = interpolate_triangle(&coords[0], &start.uv);
    let p_end = interpolate_triangle(&coords[coords.len() - 1], &end.uv);
    let (lead, trail) = endpoint_portals(&p_start, &p_end, &funnel);
    let inner = &funnel[lead..funnel.len() - trail];
    let mut corners = string_pull(p_start, p_end, inner);
    // Back to funnel indices of the whole strip.
    let last = corners.len() - 1;
    for corner in &mut corners[1..last] {
        corner.index += lead;
    }
    corners[last].index = funnel.len() + 1;

    let mut lerps = Vec::with_capacity(edges.len());
    let mut segment = 0;
    for (j, (a, b)) in edges.iter().enumerate() {
        let index = j + 1;
        while segment + 2 < corners.len() && corners[segment + 1].index < index {
            segment += 1;
        }
        let p = corners[segment].point;
        let q = corners[segment + 1].point;
        lerps.push(crossing(a, b, &p, &q));
    }

    trace!(
        "funnel through {} faces with {} corners",
        strip.len(),
        corners.len() - 2
    );

    let path = GeodesicPath {
        start: *start,
        end: *end,
        strip: strip.to_vec(),
        lerps,
    };
    let interior = corners[1..corners.len() - 1].to_vec();
    Ok((path, interior))
}

/// Exact shortest path from `start` to `end` confined to `strip`.
///
/// `strip` must begin with `start.face`, end with `end.face` and list
/// adjacent faces. Degenerate crossings are clamped to the shared edge
/// instead of failing.
///
/// # Example
/// ```
/// use geospline::algo::geodesic::shortest_path;
/// use geospline::mesh::{shapes, FaceId, SurfacePoint};
///
/// let mesh = shapes::quad();
/// let start = SurfacePoint::new(FaceId::new(0), 0.5, 0.1);
/// let end = SurfacePoint::new(FaceId::new(1), 0.1, 0.5);
/// let path = shortest_path(&mesh, &start, &end, &[FaceId::new(0), FaceId::new(1)]).unwrap();
/// assert_eq!(path.lerps.len(), 1);
/// ```
pub fn shortest_path(
    mesh: &TriMesh,
    start: &SurfacePoint,
    end: &SurfacePoint,
    strip: &[FaceId],
) -> Result<GeodesicPath> {
    Ok(funnel_path(mesh, start, end, strip)?.0)
}

/// Face around `v` next to `f`, counter-clockwise or clockwise.
fn fan_step(mesh: &TriMesh, f: FaceId, v: usize, ccw: bool) -> Option<FaceId> {
    let k = mesh.triangle(f).iter().position(|&x| x == v)?;
    let edge = if ccw { (k + 2) % 3 } else { k };
    let next = mesh.neighbor(f, edge);
    next.is_valid().then_some(next)
}

/// The strip with its run of faces around `v` replaced by the faces on the
/// other side of `v`, or `None` when that is not possible.
fn reroute_around(mesh: &TriMesh, strip: &[FaceId], corner: &Corner) -> Option<Vec<FaceId>> {
    let v = corner.vertex?;
    let contains = |f: FaceId| mesh.triangle(f).contains(&v);

    // The corner sits on portal `index - 1`, between strip[index - 1] and strip[index].
    let mut a = corner.index.checked_sub(1)?;
    let mut b = corner.index;
    if b >= strip.len() || !contains(strip[a]) || !contains(strip[b]) {
        return None;
    }
    while a > 0 && contains(strip[a - 1]) {
        a -= 1;
    }
    while b + 1 < strip.len() && contains(strip[b + 1]) {
        b += 1;
    }

    // Walk the other way around the fan.
    let forward_ccw = fan_step(mesh, strip[a], v, true) == Some(strip[a + 1]);
    let mut detour = Vec::new();
    let mut current = strip[a];
    loop {
        current = fan_step(mesh, current, v, !forward_ccw)?;
        if current == strip[b] {
            break;
        }
        if current == strip[a] || detour.len() > 64 {
            return None;
        }
        detour.push(current);
    }

    let mut result = Vec::with_capacity(strip.len() + detour.len());
    result.extend_from_slice(&strip[..=a]);
    result.extend_from_slice(&detour);
    result.extend_from_slice(&strip[b..]);

    let mut seen = HashSet::with_capacity(result.len());
    if !result.iter().all(|f| seen.insert(*f)) {
        return None;
    }
    Some(result)
}

/// Strip, reduce, then straighten: the full shortest path query.
///
/// # Example
/// ```
/// use geospline::algo::geodesic::{compute_shortest_path, DualGeodesicSolver, DualSolverOptions};
/// use geospline::mesh::{shapes, FaceId, SurfacePoint};
///
/// let mesh = shapes::icosphere(2);
/// let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
/// let a = SurfacePoint::new(FaceId::new(0), 0.3, 0.3);
/// let b = SurfacePoint::new(FaceId::new(100), 0.3, 0.3);
/// let path = compute_shortest_path(&mesh, &solver, &a, &b).unwrap();
/// assert_eq!(path.lerps.len(), path.strip.len() - 1);
/// ```
pub fn compute_shortest_path(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    start: &SurfacePoint,
    end: &SurfacePoint,
) -> Result<GeodesicPath> {
    let strip = solver.compute_strip(start, end)?;
    let strip = reduce_strip(solver, &strip);
    let (mut path, mut corners) = funnel_path(mesh, start, end, &strip)?;
    let mut length = path_length(mesh, &path)?;

    let mut reroutes = 0;
    'outer: while reroutes < MAX_REROUTES {
        for corner in &corners {
            let Some(candidate_strip) = reroute_around(mesh, &path.strip, corner) else {
                continue;
            };
            let (candidate, candidate_corners) = funnel_path(mesh, start, end, &candidate_strip)?;
            let candidate_length = path_length(mesh, &candidate)?;
            if candidate_length < length * (1.0 - 1e-12) {
                path = candidate;
                corners = candidate_corners;
                length = candidate_length;
                reroutes += 1;
                continue 'outer;
            }
        }
        break;
    }

    if reroutes > 0 {
        debug!(
            "straightened path around {} vertices, {} faces",
            reroutes,
            path.strip.len()
        );
    }
    Ok(path)
}

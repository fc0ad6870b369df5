//! Strip reduction.
//!
//! A corridor found on the dual graph may wander: it can visit the same face
//! twice or walk around a vertex fan where a direct step between two faces
//! of the fan is available. [`reduce_strip`] removes both kinds of detour
//! until the corridor is locally minimal.

use std::collections::HashMap;

use log::debug;

use super::dual::DualGeodesicSolver;
use crate::mesh::FaceId;

/// Cut every loop so that each face appears at most once.
fn remove_loops(strip: &[FaceId]) -> Vec<FaceId> {
    let mut last: HashMap<FaceId, usize> = HashMap::with_capacity(strip.len());
    for (i, &f) in strip.iter().enumerate() {
        last.insert(f, i);
    }

    let mut result = Vec::with_capacity(strip.len());
    let mut i = 0;
    while i < strip.len() {
        let f = strip[i];
        result.push(f);
        i = last[&f] + 1;
    }
    result
}

/// Replace one walk `strip[i..=j]` by the direct link `strip[i] -> strip[j]`
/// when the two faces are adjacent and the link is shorter. Returns whether
/// a shortcut was applied.
fn shortcut_once(solver: &DualGeodesicSolver, strip: &mut Vec<FaceId>) -> bool {
    let position: HashMap<FaceId, usize> =
        strip.iter().enumerate().map(|(i, &f)| (f, i)).collect();

    for i in 0..strip.len() {
        // Prefer the farthest reachable neighbor along the strip.
        let mut best: Option<(usize, f64)> = None;
        for edge in solver.edges(strip[i]) {
            let Some(&j) = position.get(&edge.node) else {
                continue;
            };
            if j <= i + 1 {
                continue;
            }
            if best.map_or(true, |(bj, _)| j > bj) {
                best = Some((j, edge.length));
            }
        }

        if let Some((j, direct)) = best {
            let walk = solver.strip_length(&strip[i..=j]);
            if direct < walk {
                strip.drain(i + 1..j);
                return true;
            }
        }
    }
    false
}

/// Shrink a strip to a locally minimal corridor with the same endpoints.
///
/// The output never has more faces than the input, keeps its first and last
/// face, and contains no face twice (so in particular `strip[i] !=
/// strip[i + 2]`).
pub fn reduce_strip(solver: &DualGeodesicSolver, strip: &[FaceId]) -> Vec<FaceId> {
    let mut result = remove_loops(strip);
    let mut shortcuts = 0usize;
    while shortcut_once(solver, &mut result) {
        shortcuts += 1;
    }

    if result.len() != strip.len() {
        debug!(
            "reduced strip from {} to {} faces ({} shortcuts)",
            strip.len(),
            result.len(),
            shortcuts
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::geodesic::DualSolverOptions;
    use crate::mesh::{shapes, TriMesh};

    /// Faces around vertex `v`, in fan order.
    fn fan(mesh: &TriMesh, v: usize) -> Vec<FaceId> {
        let start = mesh
            .face_ids()
            .find(|&f| mesh.triangle(f).contains(&v))
            .unwrap();
        let mut result = vec![start];
        let mut current = start;
        loop {
            let t = mesh.triangle(current);
            let k = t.iter().position(|&x| x == v).unwrap();
            // Edge entering v: (k + 2) -> k
            let next = mesh.neighbor(current, (k + 2) % 3);
            if next == start {
                break;
            }
            result.push(next);
            current = next;
        }
        result
    }

    #[test]
    fn test_loop_removed() {
        let a = FaceId::new(0);
        let b = FaceId::new(1);
        let c = FaceId::new(2);
        let d = FaceId::new(3);
        assert_eq!(remove_loops(&[a, b, c, b, d]), vec![a, b, d]);
        assert_eq!(remove_loops(&[a, b, a]), vec![a]);
    }

    #[test]
    fn test_fan_detour_shortened() {
        let mesh = shapes::icosphere(1);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        // Walking the long way around a valence-6 fan reaches the last face
        // of the fan, which is adjacent to the first.
        let detour = fan(&mesh, 20);
        assert_eq!(detour.len(), 6);
        let reduced = reduce_strip(&solver, &detour);
        assert_eq!(reduced, vec![detour[0], detour[5]]);
    }

    #[test]
    fn test_reduce_keeps_endpoints() {
        let mesh = shapes::grid(5);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let start = crate::mesh::SurfacePoint::new(FaceId::new(3), 0.2, 0.3);
        let end = crate::mesh::SurfacePoint::new(FaceId::new(44), 0.4, 0.1);
        let strip = solver.compute_strip(&start, &end).unwrap();
        let reduced = reduce_strip(&solver, &strip);
        assert!(reduced.len() <= strip.len());
        assert_eq!(reduced.first(), strip.first());
        assert_eq!(reduced.last(), strip.last());
    }
}

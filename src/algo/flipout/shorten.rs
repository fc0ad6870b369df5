//! Straightening paths by edge flips.
//!
//! A joint where a path turns by more than the tolerance is straightened on
//! the side where its wedge angle is below `PI`: spokes of the wedge are
//! flipped away while the angle they leave at the outer vertex is below
//! `PI`, then the two path edges at the joint are replaced by the outer
//! boundary of the wedge. Each replacement shortens the path, so the loop
//! terminates once no joint is bent.

use std::collections::HashSet;
use std::f64::consts::PI;

use log::{debug, warn};

use super::network::FlipNetwork;
use super::FlipOptions;
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeId, VertexId};

/// A bent joint of a path.
#[derive(Debug, Clone, Copy)]
struct Joint {
    path: usize,
    /// Index of the outgoing half-edge in the path.
    position: usize,
    incoming: HalfEdgeId,
    outgoing: HalfEdgeId,
    angle: f64,
    ccw: bool,
}

/// Counters from one call to [`shorten`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortenReport {
    /// Edge flips performed.
    pub flips: usize,
    /// Joints replaced by a shorter chain.
    pub straightened: usize,
    /// Joints left bent because no shortening was possible.
    pub stuck: usize,
}

impl FlipNetwork<'_> {
    /// Outgoing half-edges of the vertex between `incoming` and `outgoing`,
    /// walking from `outgoing` to the reverse of `incoming`. Both ends included.
    fn wedge(&self, incoming: HalfEdgeId, outgoing: HalfEdgeId, ccw: bool) -> Option<Vec<HalfEdgeId>> {
        let mesh = self.tri.mesh();
        let back = incoming.twin();
        let mut spokes = vec![outgoing];
        let mut g = outgoing;
        for _ in 0..mesh.num_halfedges() {
            if g == back {
                return Some(spokes);
            }
            g = if ccw { mesh.ccw(g) } else { mesh.cw(g) };
            spokes.push(g);
        }
        None
    }

    /// Angle of a wedge, summed over its faces.
    fn wedge_angle(&self, spokes: &[HalfEdgeId], ccw: bool) -> f64 {
        spokes
            .windows(2)
            .map(|s| self.tri.corner(if ccw { s[0] } else { s[1] }))
            .sum()
    }

    /// Angle at the outer end of an interior spoke, inside the wedge.
    fn outer_angle(&self, spoke: HalfEdgeId) -> f64 {
        let mesh = self.tri.mesh();
        self.tri.corner(mesh.next(spoke)) + self.tri.corner(spoke.twin())
    }

    fn is_pinned(&self, v: VertexId, options: &FlipOptions) -> bool {
        self.is_marked(v) && !options.straighten_at_marked
    }

    /// Drop immediate reversals `h, twin(h)` at unpinned vertices.
    fn cancel_reversals(&mut self, options: &FlipOptions) -> bool {
        let mut changed = false;
        for p in 0..self.paths.len() {
            let mut i = 1;
            while i < self.paths[p].halfedges.len() {
                let (a, b) = (self.paths[p].halfedges[i - 1], self.paths[p].halfedges[i]);
                let v = self.tri.mesh().dest(a);
                if b == a.twin() && !self.is_pinned(v, options) {
                    self.paths[p].halfedges.drain(i - 1..=i);
                    changed = true;
                    i = i.saturating_sub(1).max(1);
                } else {
                    i += 1;
                }
            }
        }
        if changed {
            self.recount_edge_use();
        }
        changed
    }

    /// The most bent joint that is not pinned or known to be stuck.
    fn most_bent_joint(
        &self,
        options: &FlipOptions,
        stuck: &HashSet<(usize, HalfEdgeId, HalfEdgeId)>,
    ) -> Option<Joint> {
        let mesh = self.tri.mesh();
        let mut best: Option<Joint> = None;
        for (p, path) in self.paths.iter().enumerate() {
            let n = path.halfedges.len();
            let first = if path.closed { 0 } else { 1 };
            for position in first..n {
                let incoming = path.halfedges[(position + n - 1) % n];
                let outgoing = path.halfedges[position];
                if n < 2 || stuck.contains(&(p, incoming, outgoing)) {
                    continue;
                }
                let v = mesh.dest(incoming);
                if self.is_pinned(v, options) {
                    continue;
                }
                let (Some(left), Some(right)) = (
                    self.wedge(incoming, outgoing, true),
                    self.wedge(incoming, outgoing, false),
                ) else {
                    continue;
                };
                let ccw_angle = self.wedge_angle(&left, true);
                let cw_angle = self.wedge_angle(&right, false);
                let (angle, ccw) = if ccw_angle <= cw_angle {
                    (ccw_angle, true)
                } else {
                    (cw_angle, false)
                };
                if angle >= PI - options.angle_tolerance {
                    continue;
                }
                if best.map_or(true, |b| angle < b.angle) {
                    best = Some(Joint {
                        path: p,
                        position,
                        incoming,
                        outgoing,
                        angle,
                        ccw,
                    });
                }
            }
        }
        best
    }

    /// Flip wedge spokes away, then swap the joint for the outer chain.
    ///
    /// Returns the number of flips and whether the joint was replaced.
    fn straighten_joint(&mut self, joint: &Joint, budget: usize) -> Result<(usize, bool)> {
        let mut flips = 0;
        let spokes = loop {
            let spokes = self
                .wedge(joint.incoming, joint.outgoing, joint.ccw)
                .ok_or_else(|| MeshError::topology("joint wedge is not closed"))?;
            if spokes.len() < 2 || flips >= budget {
                return Ok((flips, false));
            }

            let mut flipped = false;
            for &spoke in &spokes[1..spokes.len() - 1] {
                if self.is_path_edge(spoke) || self.outer_angle(spoke) >= PI {
                    continue;
                }
                if self.tri.flip(spoke)? {
                    flips += 1;
                    flipped = true;
                    break;
                }
            }
            if !flipped {
                break spokes;
            }
        };

        let mesh = self.tri.mesh();
        let v = mesh.dest(joint.incoming);
        let k = spokes.len() - 1;
        let chain: Vec<HalfEdgeId> = if joint.ccw {
            (0..k).rev().map(|i| mesh.next(spokes[i]).twin()).collect()
        } else {
            (0..k).rev().map(|i| mesh.next(spokes[i + 1])).collect()
        };

        if chain.is_empty() || chain.iter().any(|&h| mesh.dest(h) == v) {
            return Ok((flips, false));
        }
        let old = self.tri.length(joint.incoming) + self.tri.length(joint.outgoing);
        let new: f64 = chain.iter().map(|&h| self.tri.length(h)).sum();
        if new >= old * (1.0 - 1e-12) {
            return Ok((flips, false));
        }

        let path = &mut self.paths[joint.path];
        let mut position = joint.position;
        if position == 0 {
            // Joint at the start of a closed path: move it inside.
            path.halfedges.rotate_right(1);
            position = 1;
        }
        path.halfedges.splice(position - 1..=position, chain);
        if path.closed {
            if let Some(&h) = path.halfedges.first() {
                path.start = self.tri.mesh().origin(h);
            }
        }
        self.recount_edge_use();
        Ok((flips, true))
    }
}

/// Straighten every path of the network into a geodesic.
///
/// Joints at marked vertices are left alone when
/// [`FlipOptions::straighten_at_marked`] is off. Fails with
/// [`MeshError::ConvergenceFailed`] after `options.max_iterations` edits.
pub fn shorten(network: &mut FlipNetwork<'_>, options: &FlipOptions) -> Result<ShortenReport> {
    let mut report = ShortenReport::default();
    let mut stuck: HashSet<(usize, HalfEdgeId, HalfEdgeId)> = HashSet::new();
    let mut iterations = 0;

    network.cancel_reversals(options);
    while let Some(joint) = network.most_bent_joint(options, &stuck) {
        if iterations >= options.max_iterations {
            warn!(
                "path shortening stopped after {} iterations, {} joints still bent",
                iterations,
                stuck.len() + 1
            );
            return Err(MeshError::ConvergenceFailed { iterations });
        }

        let (flips, replaced) =
            network.straighten_joint(&joint, options.max_iterations - iterations)?;
        report.flips += flips;
        iterations += flips + 1;

        if replaced {
            report.straightened += 1;
            stuck.clear();
            network.cancel_reversals(options);
        } else {
            stuck.insert((joint.path, joint.incoming, joint.outgoing));
        }
    }

    report.stuck = stuck.len();
    if report.stuck > 0 {
        warn!("{} joints could not be straightened", report.stuck);
    }
    debug!(
        "shortened {} paths: {} flips, {} joints straightened, length {:.6}",
        network.paths.len(),
        report.flips,
        report.straightened,
        network.total_length()
    );
    Ok(report)
}

//! Geodesic paths and curves by intrinsic edge flips.
//!
//! A path is first found as a chain of mesh edges with Dijkstra's
//! algorithm, then straightened by flipping edges of an intrinsic
//! triangulation of the surface until no joint of the path turns by more
//! than the angle tolerance. The result is a geodesic made of intrinsic
//! edges, traced back onto the input mesh for output.
//!
//! The triangulation is only ever rewritten with flips and edge splits, so
//! it always describes the same surface; edges carrying a path are never
//! flipped.
//!
//! # Example
//!
//! ```
//! use geospline::algo::flipout::{create_path_from_points, FlipMesh, FlipOptions};
//! use geospline::mesh::{shapes, VertexId};
//!
//! let mesh = shapes::octahedron();
//! let base = FlipMesh::new(&mesh).unwrap();
//! let (network, _stats) =
//!     create_path_from_points(&base, VertexId::new(0), VertexId::new(1), &FlipOptions::default())
//!         .unwrap();
//! assert!((network.total_length() - 6.0_f64.sqrt()).abs() < 1e-9);
//! ```

mod bezier;
mod intrinsic;
mod network;
mod shorten;
mod trace;

use std::time::Instant;

use nalgebra::Point3;

pub use bezier::subdivide_bezier;
pub use intrinsic::{FlipMesh, IntrinsicTriangulation};
pub use network::{FlipNetwork, FlipPath};
pub use shorten::{shorten, ShortenReport};

use crate::algo::spline::PathStats;
use crate::error::{MeshError, Result};
use crate::mesh::{SurfacePoint, TriMesh, VertexId};

/// Options for path straightening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlipOptions {
    /// A joint whose smaller wedge angle is within this of `PI` is straight.
    pub angle_tolerance: f64,
    /// Straighten joints at marked vertices too.
    pub straighten_at_marked: bool,
    /// Upper bound on flips plus joint replacements per call.
    pub max_iterations: usize,
}

impl Default for FlipOptions {
    fn default() -> Self {
        Self {
            angle_tolerance: 1e-5,
            straighten_at_marked: true,
            max_iterations: 50_000,
        }
    }
}

impl FlipOptions {
    /// Set the angle tolerance.
    pub fn with_angle_tolerance(mut self, tolerance: f64) -> Self {
        self.angle_tolerance = tolerance;
        self
    }

    /// Set whether marked vertices may be straightened away.
    pub fn with_straighten_at_marked(mut self, straighten: bool) -> Self {
        self.straighten_at_marked = straighten;
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Mesh vertex standing in for a surface point: the first corner of its face.
pub fn snap_to_vertex(mesh: &TriMesh, point: &SurfacePoint) -> Result<VertexId> {
    mesh.check_point(point)?;
    Ok(VertexId::new(mesh.triangle(point.face)[0]))
}

/// A network holding the shortest geodesic from `start` to `end`.
///
/// The returned stats time the Dijkstra initial guess and the shortening
/// separately.
pub fn create_path_from_points<'a>(
    base: &'a FlipMesh<'a>,
    start: VertexId,
    end: VertexId,
    options: &FlipOptions,
) -> Result<(FlipNetwork<'a>, PathStats)> {
    let timer = Instant::now();
    let mut network = FlipNetwork::new(base);
    let halfedges = network.edge_path(start, end)?;
    network.add_path(start, halfedges, false)?;
    let initial_guess = timer.elapsed().as_secs_f64();

    let timer = Instant::now();
    shorten(&mut network, options)?;
    let shortening = timer.elapsed().as_secs_f64();

    Ok((
        network,
        PathStats {
            initial_guess,
            shortening,
        },
    ))
}

/// A network with one edge path per leg of the polyline through `vertices`.
///
/// A closed polyline gets a last leg back to the first vertex. With
/// `mark_interior`, every vertex joining two legs is marked.
pub fn make_polyline<'a>(
    base: &'a FlipMesh<'a>,
    vertices: &[VertexId],
    closed: bool,
    mark_interior: bool,
) -> Result<FlipNetwork<'a>> {
    if vertices.len() < 2 {
        return Err(MeshError::invalid_param(
            "vertices",
            vertices.len(),
            "a polyline needs at least two vertices",
        ));
    }

    let mut network = FlipNetwork::new(base);
    let mut legs: Vec<(VertexId, VertexId)> = vertices.windows(2).map(|w| (w[0], w[1])).collect();
    if closed {
        legs.push((vertices[vertices.len() - 1], vertices[0]));
    }
    for (a, b) in legs {
        let halfedges = network.edge_path(a, b)?;
        network.add_path(a, halfedges, false)?;
    }

    if mark_interior {
        let interior = if closed {
            vertices
        } else {
            &vertices[1..vertices.len() - 1]
        };
        for &v in interior {
            network.mark_vertex(v);
        }
    }
    Ok(network)
}

/// Shorten every path of a network into a geodesic.
pub fn shorten_path(network: &mut FlipNetwork<'_>, options: &FlipOptions) -> Result<ShortenReport> {
    shorten(network, options)
}

/// 3D positions along all paths of a network, joined end to end.
pub fn path_positions(network: &FlipNetwork<'_>) -> Result<Vec<Point3<f64>>> {
    network.positions()
}

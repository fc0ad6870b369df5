//! Geodesic paths on triangle meshes.
//!
//! Shortest paths between two [`SurfacePoint`]s are computed in three steps:
//!
//! 1. [`DualGeodesicSolver::compute_strip`] searches the dual graph for a
//!    corridor of adjacent faces joining the two points,
//! 2. [`reduce_strip`] removes detours from the corridor,
//! 3. [`shortest_path`] unfolds the corridor into the plane and pulls a taut
//!    string through it.
//!
//! [`compute_shortest_path`] chains the three. The result is a
//! [`GeodesicPath`]: the strip plus, for each edge shared by consecutive
//! faces, the parameter at which the path crosses it.
//!
//! [`dijkstra`] measures distances along edges of a half-edge mesh and is
//! used by the flip engine for its initial edge paths.
//!
//! # Example
//!
//! ```
//! use geospline::algo::geodesic::{
//!     compute_shortest_path, geodesic_midpoint, path_length, DualGeodesicSolver,
//!     DualSolverOptions,
//! };
//! use geospline::mesh::{shapes, FaceId, SurfacePoint};
//!
//! let mesh = shapes::icosphere(2);
//! let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
//!
//! let a = SurfacePoint::new(FaceId::new(0), 0.25, 0.25);
//! let b = SurfacePoint::new(FaceId::new(150), 0.25, 0.25);
//! let path = compute_shortest_path(&mesh, &solver, &a, &b).unwrap();
//!
//! println!("length: {}", path_length(&mesh, &path).unwrap());
//! let mid = geodesic_midpoint(&mesh, &path).unwrap();
//! assert!(mid.face.index() < mesh.num_faces());
//! ```

mod dijkstra;
mod dual;
mod exact;
mod path;
mod strip;
pub(crate) mod unfold;

use serde::{Deserialize, Serialize};

pub use dijkstra::{dijkstra, DijkstraOptions, EdgeDistances};
pub use dual::{DualEdge, DualGeodesicSolver, DualSolverOptions};
pub use exact::{compute_shortest_path, shortest_path};
pub use path::{
    eval_path_point, geodesic_midpoint, max_segment_length, max_tangent_space_angle,
    path_length, path_positions, path_surface_points, polyline_positions,
    tangent_path_direction,
};
pub use strip::reduce_strip;

use crate::mesh::{FaceId, SurfacePoint};

/// A shortest path confined to a strip of faces.
///
/// `lerps[i]` locates the crossing of the edge shared by `strip[i]` and
/// `strip[i + 1]`: the point `lerp(v_k, v_k+1, lerps[i])` where `k` is the
/// index of that edge in `strip[i]`. Always `lerps.len() == strip.len() - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeodesicPath {
    /// Where the path starts; lies in `strip[0]`.
    pub start: SurfacePoint,
    /// Where the path ends; lies in the last face of `strip`.
    pub end: SurfacePoint,
    /// Faces traversed, in order.
    pub strip: Vec<FaceId>,
    /// Crossing parameters, one per shared edge.
    pub lerps: Vec<f64>,
}

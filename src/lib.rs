//! # Geospline
//!
//! Bezier splines on triangle meshes, built from geodesic distances.
//!
//! Planar curve constructions that only need midpoints (de Casteljau and
//! Lane-Riesenfeld subdivision) carry over to a surface once "midpoint" means
//! the middle of the shortest path between two points. Geospline provides two
//! engines for those shortest paths:
//!
//! - **Dual graph**: an A* search over face centroids finds a strip of
//!   faces, the strip is unfolded into the plane and the exact shortest path
//!   through it is found with a funnel algorithm.
//! - **Edge flips**: a chain of mesh edges is straightened by flipping edges
//!   of an intrinsic triangulation until it is a geodesic.
//!
//! ## Features
//!
//! - **Indexed meshes**: [`mesh::TriMesh`] with face adjacency and
//!   [`mesh::SurfacePoint`] locations
//! - **Exact paths**: strip search, strip reduction and funnel solve
//! - **Curves**: uniform and adaptive de Casteljau and midpoint subdivision
//! - **Intrinsic triangulations**: edge flips, edge splits, path shortening
//! - **File formats**: PLY and STL meshes, JSON control points
//!
//! ## Quick Start
//!
//! ```
//! use geospline::prelude::*;
//!
//! let mesh = shapes::icosphere(2);
//! validate_mesh(&mesh, 1.0).unwrap();
//!
//! let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
//! let control = [0, 10, 20, 30].map(|f| SurfacePoint::new(FaceId::new(f), 0.3, 0.3));
//! let params = SplineParams::default().with_subdivisions(2);
//!
//! let curve = CurveEngine::dual(&mesh, &solver)
//!     .compute_curve(&control, &params)
//!     .unwrap();
//! assert!(curve.len() >= 13);
//! ```
//!
//! ## Loading Meshes
//!
//! ```no_run
//! use geospline::prelude::*;
//!
//! let mut mesh = geospline::io::load("bunny.ply").unwrap();
//! mesh.normalize();
//! println!("Faces: {}", mesh.num_faces());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;
pub mod sampling;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use geospline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::flipout::{FlipMesh, FlipOptions};
    pub use crate::algo::geodesic::{
        compute_shortest_path, DualGeodesicSolver, DualSolverOptions, GeodesicPath,
    };
    pub use crate::algo::progress::Progress;
    pub use crate::algo::spline::{
        compute_bezier_path, CurveEngine, SplineAlgorithm, SplineParams,
    };
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        shapes, validate_mesh, FaceId, HalfEdgeId, HalfEdgeMesh, SurfacePoint, TriMesh, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

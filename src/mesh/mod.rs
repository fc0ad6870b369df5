//! Core mesh data structures.
//!
//! # Overview
//!
//! Two representations are used:
//!
//! - [`TriMesh`]: the immutable input surface. Triangles, positions and face
//!   adjacency. All dual-graph path queries and all [`SurfacePoint`]s refer
//!   to it.
//! - [`HalfEdgeMesh`]: a closed, mutable half-edge arena supporting edge
//!   flips and edge splits. It carries the connectivity of the intrinsic
//!   triangulation used by the flip engine.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe 32-bit index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge
//!
//! # Construction
//!
//! ```
//! use geospline::mesh::{build_connectivity, TriMesh};
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh = TriMesh::new(positions, vec![[0, 1, 2]]).unwrap();
//! assert_eq!(mesh.num_faces(), 1);
//!
//! // A single triangle has boundary edges, so it has no closed connectivity.
//! assert!(build_connectivity(mesh.triangles(), mesh.num_vertices()).is_err());
//! ```

mod builder;
mod halfedge;
mod index;
pub mod shapes;
mod trimesh;
mod validate;

pub use builder::build_connectivity;
pub use halfedge::{EdgeSplit, Face, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter};
pub use index::{EdgeId, FaceId, HalfEdgeId, VertexId};
pub use trimesh::{face_adjacencies, SurfacePoint, TriMesh};
pub use validate::{connected_ratio, validate_mesh};

//! Geodesic algorithms on triangle meshes.
//!
//! - **Geodesics** ([`geodesic`]): dual graph strips, strip reduction, exact
//!   shortest paths by unfolding, Dijkstra on edges
//! - **Splines** ([`spline`]): Bezier curves on surfaces by geodesic de
//!   Casteljau or midpoint subdivision, uniform or adaptive
//! - **Flip networks** ([`flipout`]): paths and curves straightened by edge
//!   flips in an intrinsic triangulation

pub mod flipout;
pub mod geodesic;
pub mod progress;
pub mod spline;

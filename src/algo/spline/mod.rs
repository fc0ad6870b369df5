//! Bezier curves on surfaces.
//!
//! A cubic Bezier curve on a mesh is defined by four [`SurfacePoint`]s. The
//! planar constructions that only use affine midpoints carry over to the
//! surface by replacing `(p + q) / 2` with the midpoint of the shortest path
//! from `p` to `q`:
//!
//! - **de Casteljau** ([`SplineAlgorithm::UniformDeCasteljau`],
//!   [`SplineAlgorithm::AdaptiveDeCasteljau`]): split the control polygon at
//!   `t = 1/2` into two halves, recursively.
//! - **midpoint / Lane-Riesenfeld** ([`SplineAlgorithm::UniformMidpoint`],
//!   [`SplineAlgorithm::AdaptiveMidpoint`]): refine the whole polygon by
//!   inserting midpoints, then smooth each original vertex with its two new
//!   neighbors.
//!
//! Uniform variants subdivide exactly `subdivisions` times; adaptive ones
//! stop where the curve is straight enough (tangents at joints agree within
//! `precision`) or short enough (`min_curve_size`).
//!
//! Longer control polygons with `3k + 1` points are treated as `k` cubic
//! segments sharing endpoints.
//!
//! # Example
//!
//! ```
//! use geospline::algo::geodesic::{DualGeodesicSolver, DualSolverOptions};
//! use geospline::algo::spline::{compute_bezier_path, SplineAlgorithm, SplineParams};
//! use geospline::mesh::{shapes, FaceId, SurfacePoint};
//!
//! let mesh = shapes::icosphere(2);
//! let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
//! let control = [0, 10, 20, 30].map(|f| SurfacePoint::new(FaceId::new(f), 0.3, 0.3));
//!
//! let params = SplineParams::default()
//!     .with_algorithm(SplineAlgorithm::UniformDeCasteljau)
//!     .with_subdivisions(3);
//! let points = compute_bezier_path(&mesh, &solver, &control, &params).unwrap();
//! assert_eq!(points.len(), 25);
//! ```

mod de_casteljau;
mod engine;
mod midpoint;
mod stats;

use std::fmt;
use std::str::FromStr;

use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub use engine::CurveEngine;
pub use stats::{test_bezier_curve, test_control_polygon, test_shortest_path, BezierStats, PathStats};

use crate::algo::geodesic::{tangent_path_direction, DualGeodesicSolver, GeodesicPath};
use crate::error::{MeshError, Result};
use crate::mesh::{SurfacePoint, TriMesh};

/// Curve construction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplineAlgorithm {
    /// Recursive de Casteljau splitting, fixed depth.
    #[default]
    UniformDeCasteljau,
    /// Lane-Riesenfeld midpoint refinement, fixed number of rounds.
    UniformMidpoint,
    /// Recursive de Casteljau splitting until straight or short enough.
    AdaptiveDeCasteljau,
    /// Lane-Riesenfeld rounds until straight or short enough.
    AdaptiveMidpoint,
    /// Subdivision inside an intrinsic triangulation straightened by edge flips.
    Flipout,
}

impl SplineAlgorithm {
    /// All algorithms, in declaration order.
    pub const ALL: [SplineAlgorithm; 5] = [
        SplineAlgorithm::UniformDeCasteljau,
        SplineAlgorithm::UniformMidpoint,
        SplineAlgorithm::AdaptiveDeCasteljau,
        SplineAlgorithm::AdaptiveMidpoint,
        SplineAlgorithm::Flipout,
    ];

    /// Kebab-case name, as used on the command line and in JSON.
    pub fn name(self) -> &'static str {
        match self {
            SplineAlgorithm::UniformDeCasteljau => "uniform-de-casteljau",
            SplineAlgorithm::UniformMidpoint => "uniform-midpoint",
            SplineAlgorithm::AdaptiveDeCasteljau => "adaptive-de-casteljau",
            SplineAlgorithm::AdaptiveMidpoint => "adaptive-midpoint",
            SplineAlgorithm::Flipout => "flipout",
        }
    }

    /// Whether the algorithm stops on a straightness test.
    pub fn is_adaptive(self) -> bool {
        matches!(
            self,
            SplineAlgorithm::AdaptiveDeCasteljau | SplineAlgorithm::AdaptiveMidpoint
        )
    }
}

impl fmt::Display for SplineAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SplineAlgorithm {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        SplineAlgorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| MeshError::invalid_param("algorithm", s, "unknown algorithm"))
    }
}

/// Parameters of curve construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplineParams {
    /// Construction algorithm.
    pub algorithm: SplineAlgorithm,
    /// Adaptive straightness threshold on the joint bend.
    pub precision: f64,
    /// Uniform subdivision depth, in `[1, 10]`.
    pub subdivisions: usize,
    /// Adaptive segments with a shorter control polygon are accepted.
    pub min_curve_size: f64,
    /// Bound on adaptive recursion depth.
    pub max_depth: usize,
}

impl Default for SplineParams {
    fn default() -> Self {
        Self {
            algorithm: SplineAlgorithm::default(),
            precision: 0.1,
            subdivisions: 4,
            min_curve_size: 0.001,
            max_depth: 10,
        }
    }
}

impl SplineParams {
    /// Set the algorithm.
    pub fn with_algorithm(mut self, algorithm: SplineAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the adaptive straightness threshold.
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Set the uniform subdivision depth.
    pub fn with_subdivisions(mut self, subdivisions: usize) -> Self {
        self.subdivisions = subdivisions;
        self
    }

    /// Set the adaptive length floor.
    pub fn with_min_curve_size(mut self, min_curve_size: f64) -> Self {
        self.min_curve_size = min_curve_size;
        self
    }

    /// Set the adaptive recursion bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.subdivisions) {
            return Err(MeshError::invalid_param(
                "subdivisions",
                self.subdivisions,
                "must be in [1, 10]",
            ));
        }
        if !(self.precision.is_finite() && self.precision >= 0.0) {
            return Err(MeshError::invalid_param(
                "precision",
                self.precision,
                "must be finite and non-negative",
            ));
        }
        if !(self.min_curve_size.is_finite() && self.min_curve_size >= 0.0) {
            return Err(MeshError::invalid_param(
                "min_curve_size",
                self.min_curve_size,
                "must be finite and non-negative",
            ));
        }
        if self.max_depth > 20 {
            return Err(MeshError::invalid_param(
                "max_depth",
                self.max_depth,
                "must be at most 20",
            ));
        }
        Ok(())
    }
}

/// Number of cubic segments in a control polygon of `3k + 1` points.
pub fn num_segments(count: usize) -> Result<usize> {
    if count < 4 || (count - 1) % 3 != 0 {
        return Err(MeshError::InvalidControlPolygon { count });
    }
    Ok((count - 1) / 3)
}

/// Points produced per cubic segment by the uniform algorithms.
pub fn uniform_point_count(subdivisions: usize) -> usize {
    3 * (1 << subdivisions) + 1
}

/// Bend between the directions leaving a joint backwards and forwards.
///
/// Zero when the two directions are exactly opposite, `|sin|` of the turn
/// while the turn is below 90 degrees, and 1 beyond. A missing direction (a
/// zero-length leg) counts as straight.
pub(crate) fn joint_bend(back: Option<Vector2<f64>>, forward: Option<Vector2<f64>>) -> f64 {
    match (back, forward) {
        (Some(b), Some(f)) => {
            if b.dot(&f) < 0.0 {
                (b.x * f.y - b.y * f.x).abs()
            } else {
                1.0
            }
        }
        _ => 0.0,
    }
}

/// Bend at the point where `incoming` ends and `outgoing` starts.
pub(crate) fn path_joint_bend(
    mesh: &TriMesh,
    incoming: &GeodesicPath,
    outgoing: &GeodesicPath,
) -> Result<f64> {
    let back = tangent_path_direction(mesh, incoming, false)?;
    let forward = tangent_path_direction(mesh, outgoing, true)?;
    Ok(joint_bend(back, forward))
}

/// Build a Bezier curve on the surface with the dual-graph engine.
///
/// Returns the points of the refined control polygon. The first and last
/// points are the first and last control points.
pub fn compute_bezier_path(
    mesh: &TriMesh,
    solver: &DualGeodesicSolver,
    control_points: &[SurfacePoint],
    params: &SplineParams,
) -> Result<Vec<SurfacePoint>> {
    params.validate()?;
    let segments = num_segments(control_points.len())?;
    for p in control_points {
        mesh.check_point(p)?;
    }

    let mut result: Vec<SurfacePoint> = Vec::new();
    for s in 0..segments {
        let segment = [
            control_points[3 * s],
            control_points[3 * s + 1],
            control_points[3 * s + 2],
            control_points[3 * s + 3],
        ];
        let points = match params.algorithm {
            SplineAlgorithm::UniformDeCasteljau => {
                de_casteljau::uniform(mesh, solver, &segment, params.subdivisions)?
            }
            SplineAlgorithm::AdaptiveDeCasteljau => {
                de_casteljau::adaptive(mesh, solver, &segment, params)?
            }
            SplineAlgorithm::UniformMidpoint => {
                midpoint::uniform(mesh, solver, &segment, params.subdivisions)?
            }
            SplineAlgorithm::AdaptiveMidpoint => midpoint::adaptive(mesh, solver, &segment, params)?,
            SplineAlgorithm::Flipout => {
                return Err(MeshError::invalid_param(
                    "algorithm",
                    params.algorithm,
                    "flipout curves are built by the flip engine",
                ))
            }
        };
        let skip = usize::from(s > 0);
        result.extend(points.into_iter().skip(skip));
    }

    debug!(
        "{} curve: {} control points -> {} points",
        params.algorithm,
        control_points.len(),
        result.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_round_trip() {
        for a in SplineAlgorithm::ALL {
            assert_eq!(a.name().parse::<SplineAlgorithm>().unwrap(), a);
        }
        assert!("bogus".parse::<SplineAlgorithm>().is_err());
    }

    #[test]
    fn test_algorithm_serializes_kebab_case() {
        let json = serde_json::to_string(&SplineAlgorithm::AdaptiveMidpoint).unwrap();
        assert_eq!(json, "\"adaptive-midpoint\"");
    }

    #[test]
    fn test_params_validation() {
        assert!(SplineParams::default().validate().is_ok());
        assert!(SplineParams::default().with_subdivisions(0).validate().is_err());
        assert!(SplineParams::default().with_subdivisions(11).validate().is_err());
        assert!(SplineParams::default().with_precision(-1.0).validate().is_err());
    }

    #[test]
    fn test_params_missing_fields_use_defaults() {
        let params: SplineParams = serde_json::from_str(r#"{"subdivisions": 2}"#).unwrap();
        assert_eq!(params.subdivisions, 2);
        assert_eq!(params.precision, 0.1);
    }

    #[test]
    fn test_num_segments() {
        assert_eq!(num_segments(4).unwrap(), 1);
        assert_eq!(num_segments(7).unwrap(), 2);
        assert!(matches!(
            num_segments(3),
            Err(MeshError::InvalidControlPolygon { count: 3 })
        ));
        assert!(num_segments(5).is_err());
    }

    #[test]
    fn test_joint_bend() {
        let x = Vector2::new(1.0, 0.0);
        assert_eq!(joint_bend(Some(-x), Some(x)), 0.0);
        assert_eq!(joint_bend(Some(x), Some(x)), 1.0);
        assert_eq!(joint_bend(None, Some(x)), 0.0);
        let d = Vector2::new(1.0, 1.0).normalize();
        assert!((joint_bend(Some(-x), Some(d)) - d.y).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_point_count() {
        assert_eq!(uniform_point_count(3), 25);
        assert_eq!(uniform_point_count(1), 7);
    }
}

//! Timing and quality measurements for curves and paths.

use std::ops::AddAssign;
use std::time::Instant;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::{num_segments, CurveEngine, SplineParams};
use crate::algo::flipout::{create_path_from_points, snap_to_vertex};
use crate::algo::geodesic::{max_segment_length, max_tangent_space_angle, reduce_strip, shortest_path};
use crate::error::Result;
use crate::mesh::SurfacePoint;

/// Time spent on a shortest path query, in seconds.
///
/// For the dual engine `initial_guess` covers the strip search and
/// reduction and `shortening` the exact solve; for the flip engine they
/// cover the Dijkstra edge path and its straightening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PathStats {
    /// Seconds to find a first path.
    pub initial_guess: f64,
    /// Seconds to straighten it.
    pub shortening: f64,
}

impl PathStats {
    /// Total seconds.
    pub fn total(&self) -> f64 {
        self.initial_guess + self.shortening
    }
}

impl AddAssign for PathStats {
    fn add_assign(&mut self, other: Self) {
        self.initial_guess += other.initial_guess;
        self.shortening += other.shortening;
    }
}

/// A curve with the time it took and a few shape measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BezierStats {
    /// The curve as a 3D polyline.
    pub positions: Vec<Point3<f64>>,
    /// Seconds to build the curve.
    pub seconds: f64,
    /// Seconds per cubic segment.
    pub seconds_avg: f64,
    /// See [`max_tangent_space_angle`].
    pub max_angle: f64,
    /// Longest leg of the polyline.
    pub max_segment_length: f64,
    /// Length of the control polygon.
    pub num_control_points: usize,
}

/// Build a curve with `engine` and measure it.
pub fn test_bezier_curve(
    engine: &CurveEngine<'_>,
    control_points: &[SurfacePoint],
    params: &SplineParams,
) -> Result<BezierStats> {
    let segments = num_segments(control_points.len())?;
    let timer = Instant::now();
    let positions = engine.compute_curve(control_points, params)?;
    let seconds = timer.elapsed().as_secs_f64();

    Ok(BezierStats {
        max_angle: max_tangent_space_angle(&positions),
        max_segment_length: max_segment_length(&positions),
        positions,
        seconds,
        seconds_avg: seconds / segments as f64,
        num_control_points: control_points.len(),
    })
}

/// Time a single shortest path query between two points.
pub fn test_shortest_path(
    engine: &CurveEngine<'_>,
    start: &SurfacePoint,
    end: &SurfacePoint,
) -> Result<PathStats> {
    match engine {
        CurveEngine::Dual { mesh, solver } => {
            let timer = Instant::now();
            let strip = solver.compute_strip(start, end)?;
            let strip = reduce_strip(solver, &strip);
            let initial_guess = timer.elapsed().as_secs_f64();

            let timer = Instant::now();
            shortest_path(mesh, start, end, &strip)?;
            let shortening = timer.elapsed().as_secs_f64();
            Ok(PathStats {
                initial_guess,
                shortening,
            })
        }
        CurveEngine::FlipOut { base, options } => {
            let mesh = base.input();
            let a = snap_to_vertex(mesh, start)?;
            let b = snap_to_vertex(mesh, end)?;
            let (_, stats) = create_path_from_points(base, a, b, options)?;
            Ok(stats)
        }
    }
}

/// Time shortest path queries along every leg of a control polygon.
pub fn test_control_polygon(engine: &CurveEngine<'_>, points: &[SurfacePoint]) -> Result<PathStats> {
    let mut stats = PathStats::default();
    for leg in points.windows(2) {
        stats += test_shortest_path(engine, &leg[0], &leg[1])?;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::flipout::{FlipMesh, FlipOptions};
    use crate::algo::geodesic::{DualGeodesicSolver, DualSolverOptions};
    use crate::algo::spline::uniform_point_count;
    use crate::error::MeshError;
    use crate::mesh::{shapes, FaceId};
    use approx::assert_relative_eq;

    fn control() -> [SurfacePoint; 4] {
        [0, 10, 20, 30].map(|f| SurfacePoint::new(FaceId::new(f), 0.3, 0.3))
    }

    #[test]
    fn test_bezier_stats_dual() {
        let mesh = shapes::icosphere(2);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let engine = CurveEngine::dual(&mesh, &solver);
        let params = SplineParams::default().with_subdivisions(2);

        let stats = test_bezier_curve(&engine, &control(), &params).unwrap();
        assert_eq!(stats.num_control_points, 4);
        assert!(stats.positions.len() >= uniform_point_count(2));
        assert_relative_eq!(stats.seconds_avg, stats.seconds);
        assert!(stats.max_segment_length > 0.0);
        assert!(stats.max_angle >= 0.0 && stats.max_angle <= 2.0);
    }

    #[test]
    fn test_bezier_stats_reject_bad_polygon() {
        let mesh = shapes::icosphere(1);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let engine = CurveEngine::dual(&mesh, &solver);
        let points = &control()[..3];
        assert!(matches!(
            test_bezier_curve(&engine, points, &SplineParams::default()),
            Err(MeshError::InvalidControlPolygon { count: 3 })
        ));
    }

    #[test]
    fn test_path_stats_both_engines() {
        let mesh = shapes::icosphere(2);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let base = FlipMesh::new(&mesh).unwrap();
        let points = control();

        for engine in [
            CurveEngine::dual(&mesh, &solver),
            CurveEngine::flipout(&base, FlipOptions::default()),
        ] {
            let single = test_shortest_path(&engine, &points[0], &points[1]).unwrap();
            assert!(single.initial_guess >= 0.0 && single.shortening >= 0.0);
            let polygon = test_control_polygon(&engine, &points).unwrap();
            assert!(polygon.total() >= 0.0);
        }
    }

    #[test]
    fn test_path_stats_add() {
        let mut a = PathStats {
            initial_guess: 1.0,
            shortening: 2.0,
        };
        a += PathStats {
            initial_guess: 0.5,
            shortening: 0.25,
        };
        assert_relative_eq!(a.total(), 3.75);
    }
}

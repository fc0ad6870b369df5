//! The two curve engines behind one interface.

use log::debug;
use nalgebra::Point3;

use super::{compute_bezier_path, num_segments, SplineParams};
use crate::algo::flipout::{make_polyline, snap_to_vertex, subdivide_bezier, FlipMesh, FlipOptions};
use crate::algo::geodesic::{polyline_positions, DualGeodesicSolver};
use crate::error::Result;
use crate::mesh::{SurfacePoint, TriMesh};

/// A way of building Bezier curves on a mesh.
///
/// The dual engine works on surface points with shortest paths through
/// face strips. The flip engine snaps control points to mesh vertices and
/// subdivides inside an intrinsic triangulation; it builds a fresh
/// triangulation per curve, so one engine can serve many threads.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub enum CurveEngine<'a> {
    /// Shortest paths through dual graph strips.
    Dual {
        mesh: &'a TriMesh,
        solver: &'a DualGeodesicSolver,
    },
    /// Subdivision inside an intrinsic triangulation.
    FlipOut {
        base: &'a FlipMesh<'a>,
        options: FlipOptions,
    },
}

impl<'a> CurveEngine<'a> {
    /// Dual graph engine.
    pub fn dual(mesh: &'a TriMesh, solver: &'a DualGeodesicSolver) -> Self {
        CurveEngine::Dual { mesh, solver }
    }

    /// Edge flip engine.
    pub fn flipout(base: &'a FlipMesh<'a>, options: FlipOptions) -> Self {
        CurveEngine::FlipOut { base, options }
    }

    /// The mesh curves are built on.
    pub fn mesh(&self) -> &'a TriMesh {
        match *self {
            CurveEngine::Dual { mesh, .. } => mesh,
            CurveEngine::FlipOut { base, .. } => base.input(),
        }
    }

    /// Build the curve of a control polygon with `3k + 1` points as a 3D
    /// polyline.
    ///
    /// The flip engine ignores the algorithm choice and always runs
    /// `params.subdivisions` rounds of de Casteljau splitting.
    pub fn compute_curve(
        &self,
        control_points: &[SurfacePoint],
        params: &SplineParams,
    ) -> Result<Vec<Point3<f64>>> {
        match *self {
            CurveEngine::Dual { mesh, solver } => {
                let points = compute_bezier_path(mesh, solver, control_points, params)?;
                polyline_positions(mesh, solver, &points)
            }
            CurveEngine::FlipOut { base, ref options } => {
                params.validate()?;
                let segments = num_segments(control_points.len())?;
                let mesh = base.input();

                let mut positions: Vec<Point3<f64>> = Vec::new();
                for s in 0..segments {
                    let vertices = control_points[3 * s..3 * s + 4]
                        .iter()
                        .map(|p| snap_to_vertex(mesh, p))
                        .collect::<Result<Vec<_>>>()?;
                    let mut network = make_polyline(base, &vertices, false, true)?;
                    subdivide_bezier(&mut network, params.subdivisions, options)?;
                    let part = network.positions()?;
                    let skip = usize::from(s > 0 && !positions.is_empty());
                    positions.extend(part.into_iter().skip(skip));
                }
                debug!(
                    "flip curve: {} segments -> {} positions",
                    segments,
                    positions.len()
                );
                Ok(positions)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::geodesic::DualSolverOptions;
    use crate::algo::spline::SplineAlgorithm;
    use crate::mesh::{shapes, FaceId};
    use approx::assert_relative_eq;

    #[test]
    fn test_engines_share_endpoints() {
        let mesh = shapes::icosphere(1);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let base = FlipMesh::new(&mesh).unwrap();
        let control = [0, 20, 40, 60].map(|f| SurfacePoint::new(FaceId::new(f), 0.0, 0.0));
        let params = SplineParams::default().with_subdivisions(1);

        let dual = CurveEngine::dual(&mesh, &solver)
            .compute_curve(&control, &params)
            .unwrap();
        let flip = CurveEngine::flipout(&base, FlipOptions::default())
            .compute_curve(&control, &params.with_algorithm(SplineAlgorithm::Flipout))
            .unwrap();

        // uv (0, 0) is the first corner, where the flip engine snaps to.
        for curve in [&dual, &flip] {
            assert_relative_eq!(curve[0], mesh.eval_position(&control[0]), epsilon = 1e-9);
            assert_relative_eq!(
                *curve.last().unwrap(),
                mesh.eval_position(&control[3]),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_dual_engine_rejects_flipout() {
        let mesh = shapes::icosphere(1);
        let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
        let control = [0, 20, 40, 60].map(|f| SurfacePoint::new(FaceId::new(f), 0.3, 0.3));
        let params = SplineParams::default().with_algorithm(SplineAlgorithm::Flipout);
        assert!(CurveEngine::dual(&mesh, &solver)
            .compute_curve(&control, &params)
            .is_err());
    }
}

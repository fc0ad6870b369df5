//! JSON files for control points, curve parameters and spline tests.
//!
//! A parameter file stores one control polygon with the parameters used to
//! build its curve:
//!
//! ```json
//! {
//!   "points": [{"face": 12, "uv": [0.25, 0.5]}, ...],
//!   "params": {"algorithm": "uniform-de-casteljau", "subdivisions": 4, "precision": 0.1}
//! }
//! ```
//!
//! A spline test file lists splines and optionally the camera the control
//! points were picked with; only the first spline is used.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algo::spline::SplineParams;
use crate::error::{MeshError, Result};
use crate::mesh::SurfacePoint;
use crate::sampling::Camera;

#[derive(Serialize, Deserialize)]
struct BezierParamsFile {
    points: Vec<SurfacePoint>,
    #[serde(default)]
    params: SplineParams,
}

#[derive(Deserialize)]
struct SplineEntry {
    control_points: Vec<SurfacePoint>,
}

#[derive(Deserialize)]
struct SplineTestFile {
    #[serde(default)]
    splines: Vec<SplineEntry>,
    camera: Option<Camera>,
}

/// Control points to test with, and where they were seen from.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineTest {
    /// Control polygon of the first spline.
    pub control_points: Vec<SurfacePoint>,
    /// Camera used to pick the points, if recorded.
    pub camera: Option<Camera>,
}

/// Write a control polygon and its parameters.
pub fn save_bezier_params<P: AsRef<Path>>(
    path: P,
    points: &[SurfacePoint],
    params: &SplineParams,
) -> Result<()> {
    let file = BezierParamsFile {
        points: points.to_vec(),
        params: params.clone(),
    };
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, &file)?;
    Ok(())
}

/// Read a control polygon and its parameters.
///
/// Missing parameters take their defaults.
pub fn load_bezier_params<P: AsRef<Path>>(path: P) -> Result<(Vec<SurfacePoint>, SplineParams)> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let file: BezierParamsFile = serde_json::from_reader(reader)?;
    Ok((file.points, file.params))
}

/// Parse a spline test from JSON text.
pub fn parse_test(text: &str) -> std::result::Result<SplineTest, String> {
    let file: SplineTestFile = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let first = file
        .splines
        .into_iter()
        .next()
        .ok_or_else(|| "file lists no splines".to_string())?;
    Ok(SplineTest {
        control_points: first.control_points,
        camera: file.camera,
    })
}

/// Read a spline test file.
pub fn load_test<P: AsRef<Path>>(path: P) -> Result<SplineTest> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse_test(&text).map_err(|message| MeshError::LoadError {
        path: path.to_path_buf(),
        message,
    })
}

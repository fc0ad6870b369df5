//! Geospline CLI - timing and stress tests for surface Bezier curves.
//!
//! Usage: geospline <COMMAND> [OPTIONS] <MESH>
//!
//! Run `geospline --help` for available commands.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::{info, warn};
use rayon::prelude::*;

use geospline::algo::flipout::{FlipMesh, FlipOptions};
use geospline::algo::geodesic::{DualGeodesicSolver, DualSolverOptions};
use geospline::algo::progress::Progress;
use geospline::algo::spline::{test_bezier_curve, CurveEngine, SplineAlgorithm, SplineParams};
use geospline::io;
use geospline::io::params::{load_bezier_params, load_test, save_bezier_params};
use geospline::mesh::{connected_ratio, validate_mesh, SurfacePoint, TriMesh};
use geospline::nalgebra::{Point3, Vector3};
use geospline::sampling::{sample_points, Camera, TriangleIntersector, DEFAULT_RAY_TRIALS};

const TRIALS_HEADER: &str = "model,triangles,trial,num_points,seconds,error";
const TIME_HEADER: &str =
    "model,triangles,num_points,bezier_tot(s),bezier_avg(s),num_control_points,max_angle(rad)";

#[derive(Parser)]
#[command(name = "geospline")]
#[command(author, version, about = "Bezier curves on triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CurveArgs {
    /// Curve algorithm
    #[arg(short, long, default_value = "uniform-de-casteljau", value_parser = parse_algorithm)]
    algorithm: SplineAlgorithm,

    /// Subdivision rounds for uniform algorithms
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u64).range(1..=10))]
    subdivisions: u64,

    /// Straightness threshold for adaptive algorithms
    #[arg(short, long, default_value = "0.1")]
    precision: f64,

    /// Coarse dual edge threshold, relative to the bounding box diagonal
    #[arg(long, default_value = "0.05")]
    max_edge_length: f64,
}

impl CurveArgs {
    fn params(&self) -> SplineParams {
        SplineParams::default()
            .with_algorithm(self.algorithm)
            .with_subdivisions(self.subdivisions as usize)
            .with_precision(self.precision)
    }
}

#[derive(clap::Args)]
struct TimingArgs {
    /// Write timings to this CSV file
    #[arg(long)]
    timings: Option<PathBuf>,

    /// Append rows to an existing timings file instead of starting a new one
    #[arg(long)]
    append_timings: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build curves through sampled control points
    Trials {
        /// Input mesh file
        mesh: PathBuf,

        #[command(flatten)]
        curve: CurveArgs,

        #[command(flatten)]
        timing: TimingArgs,

        /// Number of trials
        #[arg(short, long, default_value = "100")]
        trials: usize,

        /// Run only this trial
        #[arg(long)]
        selected_trial: Option<usize>,

        /// Check connectivity before running
        #[arg(long)]
        validate: bool,

        /// Fraction of faces that must be reachable when validating
        #[arg(long, default_value = "1.0")]
        connection: f64,

        /// Save the control points of the first successful trial
        #[arg(long)]
        save_params: Option<PathBuf>,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Time one curve from a spline test or parameter file
    Time {
        /// Input mesh file
        mesh: PathBuf,

        /// Spline test file
        #[arg(long, conflicts_with = "params", required_unless_present = "params")]
        test: Option<PathBuf>,

        /// Parameter file with control points; its parameters override the flags
        #[arg(long)]
        params: Option<PathBuf>,

        #[command(flatten)]
        curve: CurveArgs,

        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Display mesh information
    Info {
        /// Input mesh file
        mesh: PathBuf,
    },
}

fn parse_algorithm(s: &str) -> Result<SplineAlgorithm, String> {
    s.parse::<SplineAlgorithm>().map_err(|e| e.to_string())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Trials {
            mesh,
            curve,
            timing,
            trials,
            selected_trial,
            validate,
            connection,
            save_params,
            sequential,
        } => {
            let validation = validate.then_some(connection);
            cmd_trials(
                &mesh,
                &curve,
                &timing,
                trials,
                selected_trial,
                validation,
                save_params.as_deref(),
                sequential,
            )?;
        }

        Commands::Time {
            mesh,
            test,
            params,
            curve,
            timing,
        } => {
            cmd_time(&mesh, test.as_deref(), params.as_deref(), &curve, &timing)?;
        }

        Commands::Info { mesh } => {
            cmd_info(&mesh)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Trials finish out of order when run in parallel
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (raw_percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, raw_percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

/// Load a mesh and scale it into the unit box around the origin.
fn load_mesh(path: &Path, validation: Option<f64>) -> Result<TriMesh, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut mesh = io::load(path)?;
    info!(
        "loaded {}: {} vertices, {} faces ({:.2?})",
        path.display(),
        mesh.num_vertices(),
        mesh.num_faces(),
        start.elapsed()
    );

    if let Some(threshold) = validation {
        validate_mesh(&mesh, threshold).map_err(|e| format!("validation error: {}", e))?;
    }
    mesh.normalize();
    Ok(mesh)
}

/// Seed offset taken from a leading number in the mesh file name.
fn model_hash(path: &Path) -> u64 {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Camera on the +z axis looking at the origin, with the mesh's aspect.
fn default_camera(mesh: &TriMesh) -> Camera {
    let aspect = mesh
        .bounding_box()
        .map(|(min, max)| max - min)
        .filter(|size| size.y > 0.0)
        .map_or(1.0, |size| size.x / size.y);
    Camera::look_at(
        Point3::new(0.0, 0.0, 3.0),
        Point3::origin(),
        Vector3::y(),
        0.1,
        aspect,
    )
}

/// Open a CSV file, writing the header unless appending, and add rows.
fn write_csv(
    path: &Path,
    header: &str,
    rows: &[String],
    append: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !append {
        std::fs::write(path, format!("{}\n", header))?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for row in rows {
        writeln!(file, "{}", row)?;
    }
    Ok(())
}

struct TrialRow {
    trial: usize,
    points: Vec<SurfacePoint>,
    curve_length: usize,
    seconds: f64,
    error: Option<String>,
}

#[allow(clippy::too_many_arguments)]
fn cmd_trials(
    path: &Path,
    curve: &CurveArgs,
    timing: &TimingArgs,
    trials: usize,
    selected_trial: Option<usize>,
    validation: Option<f64>,
    save_params: Option<&Path>,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = curve.params();
    params.validate()?;
    let mesh = load_mesh(path, validation)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let start = Instant::now();
    let solver = DualGeodesicSolver::build(
        &mesh,
        &DualSolverOptions::default().with_max_relative_edge_length(curve.max_edge_length),
    )?;
    let flip_base = match params.algorithm {
        SplineAlgorithm::Flipout => Some(FlipMesh::new(&mesh)?),
        _ => None,
    };
    let engine = match &flip_base {
        Some(base) => CurveEngine::flipout(base, FlipOptions::default()),
        None => CurveEngine::dual(&mesh, &solver),
    };
    println!("Built solver ({:.2?})", start.elapsed());

    let camera = default_camera(&mesh);
    let intersector = TriangleIntersector::new(&mesh);
    let hash = model_hash(path);
    let selected: Vec<usize> = match selected_trial {
        Some(t) => vec![t],
        None => (0..trials).collect(),
    };

    let mode = if sequential { "sequential" } else { "parallel" };
    println!("Running {} trials of {} ({})...", selected.len(), params.algorithm, mode);
    let progress = create_progress();
    let done = AtomicUsize::new(0);

    let run_trial = |&trial: &usize| -> TrialRow {
        let mut row = TrialRow {
            trial,
            points: Vec::new(),
            curve_length: 0,
            seconds: 0.0,
            error: None,
        };
        let result = sample_points(
            &mesh,
            &camera,
            &intersector,
            (trial as u64).wrapping_add(hash),
            4,
            DEFAULT_RAY_TRIALS,
        )
        .and_then(|points| {
            row.points = points;
            test_bezier_curve(&engine, &row.points, &params)
        });
        match result {
            Ok(stats) => {
                row.curve_length = stats.positions.len();
                row.seconds = stats.seconds;
            }
            Err(e) => {
                warn!("trial {}: {}", trial, e);
                row.error = Some(e.to_string());
            }
        }
        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        progress.report(finished, selected.len(), "running trials");
        row
    };

    let start = Instant::now();
    let rows: Vec<TrialRow> = if sequential {
        selected.iter().map(run_trial).collect()
    } else {
        selected.par_iter().map(run_trial).collect()
    };
    let elapsed = start.elapsed();

    let passed: Vec<&TrialRow> = rows.iter().filter(|r| r.error.is_none()).collect();
    println!("Passed: {} of {} ({:.2?})", passed.len(), rows.len(), elapsed);
    if !passed.is_empty() {
        let seconds: Vec<f64> = passed.iter().map(|r| r.seconds).collect();
        let min = seconds.iter().copied().fold(f64::INFINITY, f64::min);
        let max = seconds.iter().copied().fold(0.0_f64, f64::max);
        let avg = seconds.iter().sum::<f64>() / seconds.len() as f64;
        println!("Curve seconds: min={:.6}, max={:.6}, avg={:.6}", min, max, avg);
    }

    if let (Some(out), Some(first)) = (save_params, passed.first()) {
        save_bezier_params(out, &first.points, &params)?;
        println!("Saved trial {} control points: {}", first.trial, out.display());
    }

    if let Some(csv) = &timing.timings {
        let model = path.display().to_string();
        let lines: Vec<String> = rows
            .iter()
            .map(|r| {
                let error = r.error.as_deref().unwrap_or("").replace(',', ";");
                format!(
                    "{},{},{},{},{:.15},{}",
                    model,
                    mesh.num_faces(),
                    r.trial,
                    r.curve_length,
                    r.seconds,
                    error
                )
            })
            .collect();
        write_csv(csv, TRIALS_HEADER, &lines, timing.append_timings)?;
        println!("Timings: {}", csv.display());
    }

    Ok(())
}

fn cmd_time(
    path: &Path,
    test: Option<&Path>,
    params_file: Option<&Path>,
    curve: &CurveArgs,
    timing: &TimingArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (control_points, params) = match (test, params_file) {
        (_, Some(file)) => load_bezier_params(file)?,
        (Some(file), None) => (load_test(file)?.control_points, curve.params()),
        (None, None) => return Err("either --test or --params is required".into()),
    };
    params.validate()?;

    let mesh = load_mesh(path, None)?;
    let solver = DualGeodesicSolver::build(
        &mesh,
        &DualSolverOptions::default().with_max_relative_edge_length(curve.max_edge_length),
    )?;
    let flip_base = match params.algorithm {
        SplineAlgorithm::Flipout => Some(FlipMesh::new(&mesh)?),
        _ => None,
    };
    let engine = match &flip_base {
        Some(base) => CurveEngine::flipout(base, FlipOptions::default()),
        None => CurveEngine::dual(&mesh, &solver),
    };

    let stats = test_bezier_curve(&engine, &control_points, &params)?;
    println!("seconds: {:.6}, max_angle: {:.6}", stats.seconds, stats.max_angle);

    if let Some(csv) = &timing.timings {
        let line = format!(
            "{},{},{},{:.15},{:.15},{},{:.6}",
            path.display(),
            mesh.num_faces(),
            stats.positions.len(),
            stats.seconds,
            stats.seconds_avg,
            stats.num_control_points,
            stats.max_angle
        );
        write_csv(csv, TIME_HEADER, &[line], timing.append_timings)?;
        println!("Timings: {}", csv.display());
    }

    Ok(())
}

fn cmd_info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(path)?;

    println!("File: {}", path.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());

    let mut min_area = f64::MAX;
    let mut max_area = 0.0_f64;
    for f in mesh.face_ids() {
        let area = mesh.face_area(f);
        min_area = min_area.min(area);
        max_area = max_area.max(area);
    }
    println!("Surface area: {:.6}", mesh.surface_area());
    println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }
    println!("Max edge length: {:.6}", mesh.max_edge_length());

    let boundary_slots = mesh
        .adjacencies()
        .iter()
        .flatten()
        .filter(|f| !f.is_valid())
        .count();
    if boundary_slots == 0 {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary edges)", boundary_slots);
    }
    println!("Connected: {:.6} of faces reachable", connected_ratio(&mesh));

    match FlipMesh::new(&mesh) {
        Ok(_) => println!("Flip engine: supported"),
        Err(e) => println!("Flip engine: unsupported ({})", e),
    }

    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default())?;
    println!(
        "Dual graph: {} nodes, {} coarse edges",
        solver.num_nodes(),
        solver.num_coarse_edges()
    );

    Ok(())
}

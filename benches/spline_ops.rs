//! Benchmarks for path and curve construction.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use geospline::algo::flipout::create_path_from_points;
use geospline::algo::geodesic::{reduce_strip, shortest_path};
use geospline::prelude::*;

fn control_points(mesh: &TriMesh) -> [SurfacePoint; 4] {
    let n = mesh.num_faces();
    [0, n / 7, n / 3, n / 2].map(|f| SurfacePoint::new(FaceId::new(f), 0.3, 0.3))
}

fn bench_solver_construction(c: &mut Criterion) {
    let mesh = shapes::icosphere(4);

    c.bench_function("dual_solver_icosphere4", |b| {
        b.iter(|| DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap());
    });

    c.bench_function("flip_mesh_icosphere4", |b| {
        b.iter(|| FlipMesh::new(&mesh).unwrap().input().num_faces());
    });
}

fn bench_shortest_path(c: &mut Criterion) {
    let mesh = shapes::icosphere(4);
    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
    let start = SurfacePoint::new(FaceId::new(0), 0.3, 0.3);
    let end = SurfacePoint::new(FaceId::new(mesh.num_faces() / 2), 0.3, 0.3);

    c.bench_function("strip_icosphere4", |b| {
        b.iter(|| solver.compute_strip(&start, &end).unwrap());
    });

    let strip = reduce_strip(&solver, &solver.compute_strip(&start, &end).unwrap());
    c.bench_function("funnel_icosphere4", |b| {
        b.iter(|| shortest_path(&mesh, &start, &end, &strip).unwrap());
    });

    c.bench_function("compute_shortest_path_icosphere4", |b| {
        b.iter(|| compute_shortest_path(&mesh, &solver, &start, &end).unwrap());
    });

    let base = FlipMesh::new(&mesh).unwrap();
    c.bench_function("flipout_path_icosphere4", |b| {
        b.iter(|| {
            let a = VertexId::new(0);
            let z = VertexId::new(mesh.num_vertices() / 2);
            create_path_from_points(&base, a, z, &FlipOptions::default())
                .unwrap()
                .0
                .total_length()
        });
    });
}

fn bench_bezier(c: &mut Criterion) {
    let mesh = shapes::icosphere(4);
    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
    let control = control_points(&mesh);

    let mut group = c.benchmark_group("bezier_icosphere4");
    for algorithm in [
        SplineAlgorithm::UniformDeCasteljau,
        SplineAlgorithm::UniformMidpoint,
        SplineAlgorithm::AdaptiveDeCasteljau,
        SplineAlgorithm::AdaptiveMidpoint,
    ] {
        let params = SplineParams::default()
            .with_algorithm(algorithm)
            .with_subdivisions(4);
        group.bench_with_input(BenchmarkId::from_parameter(algorithm), &params, |b, params| {
            b.iter(|| compute_bezier_path(&mesh, &solver, &control, params).unwrap());
        });
    }

    let base = FlipMesh::new(&mesh).unwrap();
    let params = SplineParams::default()
        .with_algorithm(SplineAlgorithm::Flipout)
        .with_subdivisions(3);
    group.bench_function("flipout", |b| {
        let engine = CurveEngine::flipout(&base, FlipOptions::default());
        b.iter(|| engine.compute_curve(&control, &params).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_solver_construction,
    bench_shortest_path,
    bench_bezier
);
criterion_main!(benches);

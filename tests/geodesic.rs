//! End to end properties of dual graph shortest paths.

use approx::assert_relative_eq;
use geospline::algo::geodesic::{
    dijkstra, path_length, path_positions, polyline_positions, DijkstraOptions,
};
use geospline::mesh::{build_connectivity, EdgeId};
use geospline::prelude::*;

fn point(f: usize) -> SurfacePoint {
    SurfacePoint::new(FaceId::new(f), 0.25, 0.35)
}

/// Vertices of `mesh` paired with the vertex whose chord distance is closest to `distance`.
fn vertex_pairs(mesh: &TriMesh, from: &[usize], distance: f64) -> Vec<(usize, usize)> {
    let positions = mesh.positions();
    from.iter()
        .map(|&a| {
            let b = (0..positions.len())
                .min_by(|&i, &j| {
                    let di = ((positions[i] - positions[a]).norm() - distance).abs();
                    let dj = ((positions[j] - positions[a]).norm() - distance).abs();
                    di.total_cmp(&dj)
                })
                .unwrap();
            (a, b)
        })
        .collect()
}

fn vertex(mesh: &TriMesh, v: usize) -> SurfacePoint {
    mesh.vertex_point(VertexId::new(v)).unwrap()
}

#[test]
fn test_paths_are_symmetric_on_sphere() {
    let mesh = shapes::icosphere(3);
    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
    let n = mesh.num_faces();

    let mut pairs: Vec<(SurfacePoint, SurfacePoint)> = [(0, n / 3), (7, n / 2), (11, n - 1)]
        .into_iter()
        .map(|(a, b)| (point(a), point(b)))
        .collect();
    // Vertex endpoints make every portal around them pass through the endpoint.
    pairs.extend(
        vertex_pairs(&mesh, &[0, 100, 321], 0.6)
            .into_iter()
            .map(|(a, b)| (vertex(&mesh, a), vertex(&mesh, b))),
    );

    for (a, b) in &pairs {
        let forward = compute_shortest_path(&mesh, &solver, a, b).unwrap();
        let backward = compute_shortest_path(&mesh, &solver, b, a).unwrap();
        let lf = path_length(&mesh, &forward).unwrap();
        let lb = path_length(&mesh, &backward).unwrap();
        assert_relative_eq!(lf, lb, max_relative = 1e-3);
    }
}

#[test]
fn test_vertex_endpoints_beat_edge_paths() {
    let mesh = shapes::icosphere(3);
    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
    let (connectivity, _) = build_connectivity(mesh.triangles(), mesh.num_vertices()).unwrap();
    let lengths: Vec<f64> = (0..connectivity.num_edges())
        .map(|e| {
            let h = EdgeId::new(e).halfedge();
            let a = mesh.positions()[connectivity.origin(h).index()];
            let b = mesh.positions()[connectivity.dest(h).index()];
            (b - a).norm()
        })
        .collect();

    for (a, b) in vertex_pairs(&mesh, &[5, 42, 400], 0.5) {
        let (start, end) = (vertex(&mesh, a), vertex(&mesh, b));
        let path = compute_shortest_path(&mesh, &solver, &start, &end).unwrap();
        let positions = path_positions(&mesh, &path).unwrap();
        assert_relative_eq!(positions[0], mesh.positions()[a], epsilon = 1e-12);
        assert_relative_eq!(*positions.last().unwrap(), mesh.positions()[b], epsilon = 1e-12);

        let length = path_length(&mesh, &path).unwrap();
        let chord = (mesh.positions()[b] - mesh.positions()[a]).norm();
        let options = DijkstraOptions::default();
        let edges = dijkstra(&connectivity, &lengths, VertexId::new(a), &options)
            .distance(VertexId::new(b));
        assert!(length >= chord - 1e-12);
        assert!(length <= edges + 1e-9, "{length} > {edges} from {a} to {b}");
    }
}

#[test]
fn test_path_is_at_least_the_chord() {
    let mesh = shapes::icosphere(3);
    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
    let (a, b) = (point(3), point(500));
    let path = compute_shortest_path(&mesh, &solver, &a, &b).unwrap();

    assert_eq!(path.lerps.len(), path.strip.len() - 1);
    assert!(path.lerps.iter().all(|&t| (0.0..=1.0).contains(&t)));

    let chord = (mesh.eval_position(&b) - mesh.eval_position(&a)).norm();
    let length = path_length(&mesh, &path).unwrap();
    assert!(length >= chord - 1e-12);

    let positions = path_positions(&mesh, &path).unwrap();
    assert_relative_eq!(positions[0], mesh.eval_position(&a), epsilon = 1e-12);
    assert_relative_eq!(*positions.last().unwrap(), mesh.eval_position(&b), epsilon = 1e-12);
}

#[test]
fn test_flat_polyline_is_straight_between_points() {
    let mesh = shapes::grid(6);
    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
    let points = [point(0), point(30), point(71)];
    let positions = polyline_positions(&mesh, &solver, &points).unwrap();

    let polyline: f64 = positions.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    let legs: f64 = points
        .windows(2)
        .map(|w| (mesh.eval_position(&w[1]) - mesh.eval_position(&w[0])).norm())
        .sum();
    assert_relative_eq!(polyline, legs, epsilon = 1e-9);
}

#[test]
fn test_invalid_points_are_rejected() {
    let mesh = shapes::icosphere(1);
    let solver = DualGeodesicSolver::build(&mesh, &DualSolverOptions::default()).unwrap();
    let bad = SurfacePoint::new(FaceId::new(mesh.num_faces()), 0.2, 0.2);
    assert!(matches!(
        compute_shortest_path(&mesh, &solver, &point(0), &bad),
        Err(MeshError::InvalidSurfacePoint { .. })
    ));
}

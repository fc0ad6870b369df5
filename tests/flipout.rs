//! End to end edge flip paths and curves.

use approx::assert_relative_eq;
use geospline::algo::flipout::{
    create_path_from_points, make_polyline, shorten_path, subdivide_bezier,
};
use geospline::prelude::*;

#[test]
fn test_shortening_is_idempotent() {
    let mesh = shapes::icosphere(2);
    let base = FlipMesh::new(&mesh).unwrap();
    let options = FlipOptions::default();
    let (mut network, _) =
        create_path_from_points(&base, VertexId::new(0), VertexId::new(40), &options).unwrap();
    let length = network.total_length();

    let report = shorten_path(&mut network, &options).unwrap();
    assert_eq!(report.straightened, 0);
    assert_relative_eq!(network.total_length(), length, epsilon = 1e-12);
}

#[test]
fn test_flip_path_is_not_longer_than_edge_path() {
    let mesh = shapes::icosphere(2);
    let base = FlipMesh::new(&mesh).unwrap();
    let (a, b) = (VertexId::new(3), VertexId::new(100));

    let edges = make_polyline(&base, &[a, b], false, false).unwrap();
    let (network, _) = create_path_from_points(&base, a, b, &FlipOptions::default()).unwrap();
    assert!(network.total_length() <= edges.total_length() + 1e-12);

    let chord = (mesh.positions()[b.index()] - mesh.positions()[a.index()]).norm();
    assert!(network.total_length() >= chord - 1e-12);
}

#[test]
fn test_subdivided_curve_keeps_endpoints() {
    let mesh = shapes::icosphere(2);
    let base = FlipMesh::new(&mesh).unwrap();
    let control = [0, 30, 70, 110].map(VertexId::new);

    let mut network = make_polyline(&base, &control, false, true).unwrap();
    subdivide_bezier(&mut network, 2, &FlipOptions::default()).unwrap();
    let positions = network.positions().unwrap();

    assert_relative_eq!(positions[0], mesh.positions()[0], epsilon = 1e-9);
    assert_relative_eq!(*positions.last().unwrap(), mesh.positions()[110], epsilon = 1e-9);
    let (min, max) = mesh.bounding_box().unwrap();
    for p in &positions {
        for k in 0..3 {
            assert!(p[k] >= min[k] - 1e-9 && p[k] <= max[k] + 1e-9);
        }
    }
}

#[test]
fn test_open_meshes_are_rejected() {
    let mesh = shapes::grid(3);
    assert!(FlipMesh::new(&mesh).is_err());
}

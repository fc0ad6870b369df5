//! De Casteljau subdivision inside a flip network.
//!
//! Midpoints are taken on straightened network paths and inserted as
//! vertices of the intrinsic triangulation, so every level of the
//! construction lives in the same triangulation.

use log::debug;

use super::network::FlipNetwork;
use super::shorten::shorten;
use super::FlipOptions;
use crate::error::{MeshError, Result};
use crate::mesh::VertexId;

/// Snap distances below this fraction of the path length to a vertex.
const SNAP_FRACTION: f64 = 1e-6;

/// Vertex at the middle of the geodesic between `a` and `b`, inserting one
/// when the middle falls inside an edge.
pub(crate) fn network_midpoint(
    network: &mut FlipNetwork<'_>,
    a: VertexId,
    b: VertexId,
    options: &FlipOptions,
) -> Result<VertexId> {
    if a == b {
        return Ok(a);
    }
    let halfedges = network.edge_path(a, b)?;
    let index = network.add_path(a, halfedges, false)?;
    shorten(network, options)?;

    let total = network.path_length(index);
    let half = total / 2.0;
    let snap = SNAP_FRACTION * total;
    let mut walked = 0.0;
    let mut middle = None;
    for &h in network.paths()[index].halfedges() {
        let length = network.triangulation().length(h);
        if walked + length >= half {
            let into = half - walked;
            let mesh = network.triangulation().mesh();
            middle = if into <= snap {
                Some(Ok(mesh.origin(h)))
            } else if length - into <= snap {
                Some(Ok(mesh.dest(h)))
            } else {
                Some(Err((h, into / length)))
            };
            break;
        }
        walked += length;
    }

    let vertex = match middle {
        Some(Ok(v)) => v,
        Some(Err((h, t))) => network.split_halfedge(h, t)?.vertex,
        None => network.path_end(index),
    };
    network.remove_path(index);
    Ok(vertex)
}

/// One de Casteljau split of the cubic `[p0, p1, p2, p3]` at `t = 1/2`.
fn split_segment(
    network: &mut FlipNetwork<'_>,
    segment: &[VertexId],
    options: &FlipOptions,
) -> Result<[VertexId; 7]> {
    let [p0, p1, p2, p3] = [segment[0], segment[1], segment[2], segment[3]];
    let q0 = network_midpoint(network, p0, p1, options)?;
    let q1 = network_midpoint(network, p1, p2, options)?;
    let q2 = network_midpoint(network, p2, p3, options)?;
    let r0 = network_midpoint(network, q0, q1, options)?;
    let r1 = network_midpoint(network, q1, q2, options)?;
    let s = network_midpoint(network, r0, r1, options)?;
    Ok([p0, q0, r0, s, r1, q2, p3])
}

/// Control vertices of a network holding a cubic control polygon: the
/// start of the first path and the end of every path.
fn control_vertices(network: &FlipNetwork<'_>) -> Vec<VertexId> {
    let mut vertices = Vec::with_capacity(network.paths().len() + 1);
    if let Some(first) = network.paths().first() {
        vertices.push(first.start());
    }
    vertices.extend((0..network.paths().len()).map(|i| network.path_end(i)));
    vertices
}

/// Replace the cubic control polygon held by `network` with the curve
/// after `subdivisions` rounds of de Casteljau splitting.
///
/// The network must hold exactly three chained paths (four control
/// vertices). On return it holds one straightened path per leg of the
/// refined polygon.
pub fn subdivide_bezier(
    network: &mut FlipNetwork<'_>,
    subdivisions: usize,
    options: &FlipOptions,
) -> Result<()> {
    let control = control_vertices(network);
    if control.len() != 4 {
        return Err(MeshError::InvalidControlPolygon {
            count: control.len(),
        });
    }
    network.clear_paths();

    let mut polygon = control;
    for _ in 0..subdivisions {
        let mut refined = vec![polygon[0]];
        for segment in polygon.windows(4).step_by(3) {
            let split = split_segment(network, segment, options)?;
            refined.extend_from_slice(&split[1..]);
        }
        polygon = refined;
    }

    for leg in polygon.windows(2) {
        if leg[0] == leg[1] {
            continue;
        }
        let halfedges = network.edge_path(leg[0], leg[1])?;
        network.add_path(leg[0], halfedges, false)?;
    }
    for &v in &polygon[1..polygon.len() - 1] {
        network.mark_vertex(v);
    }
    shorten(network, options)?;

    debug!(
        "flip bezier: {} subdivisions, {} polygon vertices, {} vertices in triangulation",
        subdivisions,
        polygon.len(),
        network.triangulation().mesh().num_vertices()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::flipout::{make_polyline, FlipMesh};
    use crate::mesh::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_midpoint_of_octahedron_diameter() {
        let mesh = shapes::octahedron();
        let base = FlipMesh::new(&mesh).unwrap();
        let mut network = FlipNetwork::new(&base);
        let m = network_midpoint(&mut network, VertexId::new(0), VertexId::new(1), &FlipOptions::default())
            .unwrap();

        assert!(network.triangulation().is_inserted(m));
        assert!(network.paths().is_empty());
        // The geodesic crosses the middle of an equatorial edge.
        let p = network.triangulation().vertex_position(m);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.coords.norm(), 0.5_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_wrong_control_count() {
        let mesh = shapes::octahedron();
        let base = FlipMesh::new(&mesh).unwrap();
        let vertices = [0, 2, 1].map(VertexId::new);
        let mut network = make_polyline(&base, &vertices, false, true).unwrap();
        assert!(matches!(
            subdivide_bezier(&mut network, 1, &FlipOptions::default()),
            Err(MeshError::InvalidControlPolygon { count: 3 })
        ));
    }

    #[test]
    fn test_bezier_on_sphere() {
        let mesh = shapes::icosphere(1);
        let base = FlipMesh::new(&mesh).unwrap();
        let vertices = [0, 11, 5, 7].map(VertexId::new);
        let mut network = make_polyline(&base, &vertices, false, true).unwrap();
        subdivide_bezier(&mut network, 1, &FlipOptions::default()).unwrap();

        let positions = network.positions().unwrap();
        assert!(positions.len() >= 7);
        assert_relative_eq!(positions[0], mesh.positions()[0], epsilon = 1e-9);
        assert_relative_eq!(*positions.last().unwrap(), mesh.positions()[7], epsilon = 1e-9);
        for p in &positions {
            assert!(p.coords.norm() <= 1.0 + 1e-9);
        }
    }
}

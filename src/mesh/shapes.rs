//! Procedural meshes.
//!
//! Small closed and open shapes used by tests, benchmarks and the `info`
//! command of the binary.

use std::collections::HashMap;

use nalgebra::Point3;

use super::trimesh::TriMesh;

fn from_parts(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> TriMesh {
    TriMesh::new_unchecked(positions, triangles)
}

/// Unit square in the XY plane made of two triangles.
pub fn quad() -> TriMesh {
    from_parts(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

/// Regular `n x n` grid of unit squares in the XY plane spanning `[0, 1]^2`.
pub fn grid(n: usize) -> TriMesh {
    let n = n.max(1);
    let step = 1.0 / n as f64;
    let mut positions = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            positions.push(Point3::new(i as f64 * step, j as f64 * step, 0.0));
        }
    }

    let idx = |i: usize, j: usize| j * (n + 1) + i;
    let mut triangles = Vec::with_capacity(2 * n * n);
    for j in 0..n {
        for i in 0..n {
            triangles.push([idx(i, j), idx(i + 1, j), idx(i + 1, j + 1)]);
            triangles.push([idx(i, j), idx(i + 1, j + 1), idx(i, j + 1)]);
        }
    }

    from_parts(positions, triangles)
}

/// Regular octahedron inscribed in the unit sphere.
pub fn octahedron() -> TriMesh {
    from_parts(
        vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ],
        vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ],
    )
}

/// Unit icosphere: an icosahedron subdivided `level` times, projected on
/// the unit sphere.
pub fn icosphere(level: usize) -> TriMesh {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let mut positions: Vec<Point3<f64>> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|p| Point3::from(Point3::new(p[0], p[1], p[2]).coords.normalize()))
    .collect();

    let mut triangles: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..level {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut next = Vec::with_capacity(triangles.len() * 4);
        let mut midpoint = |a: usize, b: usize, positions: &mut Vec<Point3<f64>>| {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                let m = (positions[a].coords + positions[b].coords).normalize();
                positions.push(Point3::from(m));
                positions.len() - 1
            })
        };
        for &[a, b, c] in &triangles {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            next.push([a, ab, ca]);
            next.push([b, bc, ab]);
            next.push([c, ca, bc]);
            next.push([ab, bc, ca]);
        }
        triangles = next;
    }

    from_parts(positions, triangles)
}

/// Two triangles that share no vertex.
pub fn disjoint_triangles() -> TriMesh {
    from_parts(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(3.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [3, 4, 5]],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_counts() {
        let mesh = grid(4);
        assert_eq!(mesh.num_vertices(), 25);
        assert_eq!(mesh.num_faces(), 32);
        assert_relative_eq!(mesh.surface_area(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_icosphere_counts() {
        let mesh = icosphere(2);
        assert_eq!(mesh.num_faces(), 20 * 16);
        assert_eq!(mesh.num_vertices(), 162);
        for p in mesh.positions() {
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_closed_shapes_have_no_boundary() {
        for mesh in [octahedron(), icosphere(1)] {
            assert!(mesh.adjacencies().iter().flatten().all(|f| f.is_valid()));
        }
    }

    #[test]
    fn test_outward_orientation() {
        let mesh = octahedron();
        for f in mesh.face_ids() {
            let [p0, p1, p2] = mesh.face_positions(f);
            let center = (p0.coords + p1.coords + p2.coords) / 3.0;
            assert!(mesh.face_normal(f).dot(&center) > 0.0);
        }
    }
}

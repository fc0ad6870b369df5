//! STL (stereolithography) format support.
//!
//! STL stores every triangle with its own corners, so coincident corners
//! are welded into shared vertices on load.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::TriMesh;

/// Load a mesh from an STL file. Binary and ASCII are detected
/// automatically. Triangles that collapse after welding are dropped.
///
/// # Example
///
/// ```no_run
/// use geospline::io::stl;
///
/// let mesh = stl::load("bunny.stl").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // Corners are welded on their exact single-precision coordinates.
    let mut welded: HashMap<[u32; 3], usize> = HashMap::new();
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut weld = |v: &stl_io::Vertex| -> usize {
        let key = [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()];
        *welded.entry(key).or_insert_with(|| {
            positions.push(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64));
            positions.len() - 1
        })
    };

    let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(stl.faces.len());
    for tri in &stl.faces {
        let [i0, i1, i2] = tri.vertices.map(|i| weld(&stl.vertices[i]));
        if i0 != i1 && i1 != i2 && i0 != i2 {
            triangles.push([i0, i1, i2]);
        }
    }

    if triangles.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "STL file contains no valid triangles".to_string(),
        });
    }

    TriMesh::new(positions, triangles)
}

/// Save a mesh to a binary STL file.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = mesh
        .face_ids()
        .map(|f| {
            let [p0, p1, p2] = mesh.face_positions(f);
            let n = mesh.face_normal(f);
            let vertex = |p: Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(p0), vertex(p1), vertex(p2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn test_save_then_load_welds_vertices() {
        let mesh = shapes::octahedron();
        let path = std::env::temp_dir().join(format!("geospline-stl-{}.stl", std::process::id()));
        save(&mesh, &path).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.num_faces(), 8);
        assert_eq!(loaded.num_vertices(), 6);
        assert!(loaded.adjacencies().iter().flatten().all(|f| f.is_valid()));
    }
}

//! STL (stereolithography) format support.
//!
//! STL stores every triangle with its own corners. Loading welds corners at
//! identical positions back into shared vertices; saving triangulates
//! polygons.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use nalgebra::Point3;

use super::weld;
use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh, PolygonSoup};
use crate::ops::triangulate_polygon;

/// Load a mesh from an STL file.
///
/// Automatically detects binary vs ASCII format.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<PolyMesh<I>> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let corners = stl.faces.iter().flat_map(|tri| tri.vertices).map(|i| {
        let v = &stl.vertices[i];
        Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)
    });
    let (vertices, map) = weld(corners);

    let faces: Vec<Vec<usize>> = map
        .chunks_exact(3)
        .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
        .map(|t| t.to_vec())
        .collect();
    let degenerate = stl.faces.len() - faces.len();
    if degenerate > 0 {
        log::warn!("{}: dropped {} degenerate triangles", path.display(), degenerate);
    }

    if faces.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "STL file contains no valid triangles".to_string(),
        });
    }

    PolygonSoup::new(vertices, faces).build()
}

/// Save a mesh to a binary STL file.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &PolyMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let vertex = |p: &Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
    let mut triangles: Vec<stl_io::Triangle> = Vec::with_capacity(mesh.num_faces() * 2);
    for f in mesh.face_ids() {
        let corners: Vec<Point3<f64>> = mesh.face_vertices(f).map(|v| *mesh.position(v)).collect();
        let n = mesh.face_normal(f);
        for [a, b, c] in triangulate_polygon(&corners) {
            triangles.push(stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(&corners[a]), vertex(&corners[b]), vertex(&corners[c])],
            });
        }
    }

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn test_triangulated_and_welded() {
        let path = std::env::temp_dir().join(format!("polymesh-stl-{}.stl", std::process::id()));
        let mesh: PolyMesh = shapes::polygon(6, 1.0);
        save(&mesh, &path).unwrap();
        let back: PolyMesh = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(back.num_faces(), 4);
        assert_eq!(back.num_vertices(), 6);
        assert!(back.is_triangle_mesh());
        assert_eq!(back.boundary_loops().len(), 1);
        let area: f64 = back.surface_area();
        assert!((area - mesh.surface_area()).abs() < 1e-5);
    }
}

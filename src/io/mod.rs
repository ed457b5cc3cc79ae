//! Mesh file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | PolyMesh | `.pmesh` | ✓ | ✓ | Lossless: topology, smoothness, seams and settings |
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Smoothing groups and normals become sharp edges |
//! | PLY | `.ply` | ✓ | ✓ | Polygons, ASCII on save |
//! | STL | `.stl` | ✓ | ✓ | Triangles, binary on save |
//!
//! Importers of polygon soups weld vertices with identical positions before
//! edges are built, so faces that touch in space are connected in the mesh.
//!
//! ```no_run
//! use polymesh::io::{load, save};
//! use polymesh::mesh::PolyMesh;
//!
//! let mesh: PolyMesh = load("model.obj").unwrap();
//! save(&mesh, "model.pmesh").unwrap();
//! ```

pub mod binary;
pub mod obj;
pub mod ply;
pub mod stl;

use std::collections::HashMap;
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Native binary format.
    PolyMesh,
    /// Wavefront OBJ format.
    Obj,
    /// STL (stereolithography) format.
    Stl,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "pmesh" => Some(Format::PolyMesh),
            "obj" => Some(Format::Obj),
            "stl" => Some(Format::Stl),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    /// Whether the format keeps smoothness, seams and editor settings.
    pub fn is_lossless(self) -> bool {
        self == Format::PolyMesh
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<PolyMesh<I>> {
    let path = path.as_ref();
    let mesh = match detect(path)? {
        Format::PolyMesh => binary::load(path),
        Format::Obj => obj::load(path),
        Format::Stl => stl::load(path),
        Format::Ply => ply::load(path),
    }?;
    log::info!(
        "loaded {}: {} vertices, {} faces",
        path.display(),
        mesh.num_vertices(),
        mesh.num_faces()
    );
    Ok(mesh)
}

/// Save a mesh to a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &PolyMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = detect(path)?;
    if !format.is_lossless() {
        log::debug!("{:?} does not store smoothness or seams", format);
    }
    match format {
        Format::PolyMesh => binary::save(mesh, path),
        Format::Obj => obj::save(mesh, path),
        Format::Stl => stl::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }
}

/// Merge points with identical coordinates.
///
/// Returns the distinct points in first-seen order and, for every input
/// point, its index among them. `-0.0` and `0.0` are the same coordinate.
pub(crate) fn weld(points: impl IntoIterator<Item = Point3<f64>>) -> (Vec<Point3<f64>>, Vec<usize>) {
    let key = |p: &Point3<f64>| [p.x, p.y, p.z].map(|c| (c + 0.0).to_bits());
    let mut index: HashMap<_, usize> = HashMap::new();
    let mut unique = Vec::new();
    let mut map = Vec::new();
    for p in points {
        let i = *index.entry(key(&p)).or_insert_with(|| {
            unique.push(p);
            unique.len() - 1
        });
        map.push(i);
    }
    (unique, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b.PMESH"), Some(Format::PolyMesh));
        assert_eq!(Format::from_path("model.obj"), Some(Format::Obj));
        assert_eq!(Format::from_extension("ply"), Some(Format::Ply));
        assert_eq!(Format::from_path("model.gltf"), None);
        assert!(Format::PolyMesh.is_lossless());
        assert!(!Format::Stl.is_lossless());
    }

    #[test]
    fn test_unsupported_extension() {
        let mesh: PolyMesh = shapes::cube(1.0);
        let err = save(&mesh, "out.fbx").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { ref extension } if extension == "fbx"));
        assert!(matches!(load::<_, u32>("noext").unwrap_err(), MeshError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_weld() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let (unique, map) = weld(points);
        assert_eq!(unique.len(), 2);
        assert_eq!(map, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_save_and_load_each_format() {
        let dir = std::env::temp_dir().join(format!("polymesh-io-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mesh: PolyMesh = shapes::cube(2.0);
        for ext in ["pmesh", "obj", "ply", "stl"] {
            let path = dir.join(format!("cube.{}", ext));
            save(&mesh, &path).unwrap();
            let back: PolyMesh = load(&path).unwrap();
            assert_eq!(back.num_vertices(), 8, "{}", ext);
            assert!(back.is_valid(), "{}", ext);
            let expected_faces = if ext == "stl" { 12 } else { 6 };
            assert_eq!(back.num_faces(), expected_faces, "{}", ext);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

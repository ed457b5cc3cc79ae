//! Primitive meshes for tests, benches and the command line.

use std::f64::consts::TAU;

use nalgebra::Point3;

use super::builder::build_from_polygons;
use super::halfedge::PolyMesh;
use super::index::MeshIndex;

fn build<I: MeshIndex>(positions: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> PolyMesh<I> {
    match build_from_polygons(&positions, &faces) {
        Ok(mesh) => mesh,
        Err(e) => unreachable!("primitive is malformed: {}", e),
    }
}

/// Axis-aligned cube of edge length `size` centred on the origin.
///
/// Vertices 0..4 form the bottom (`z = -size/2`) counter-clockwise from
/// `(-,-)`, vertices 4..8 the top. Faces are quads in the order bottom, top,
/// front (`-y`), back, left (`-x`), right.
pub fn cube<I: MeshIndex>(size: f64) -> PolyMesh<I> {
    let h = size * 0.5;
    let positions = vec![
        Point3::new(-h, -h, -h),
        Point3::new(h, -h, -h),
        Point3::new(h, h, -h),
        Point3::new(-h, h, -h),
        Point3::new(-h, -h, h),
        Point3::new(h, -h, h),
        Point3::new(h, h, h),
        Point3::new(-h, h, h),
    ];
    let faces = vec![
        vec![0, 3, 2, 1],
        vec![4, 5, 6, 7],
        vec![0, 1, 5, 4],
        vec![2, 3, 7, 6],
        vec![0, 4, 7, 3],
        vec![1, 2, 6, 5],
    ];
    build(positions, faces)
}

/// Flat `nx` by `ny` grid of unit-`spacing` quads in the XY plane, facing +z.
///
/// Vertex `(i, j)` has index `j * (nx + 1) + i`.
pub fn grid<I: MeshIndex>(nx: usize, ny: usize, spacing: f64) -> PolyMesh<I> {
    let (nx, ny) = (nx.max(1), ny.max(1));
    let mut positions = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            positions.push(Point3::new(i as f64 * spacing, j as f64 * spacing, 0.0));
        }
    }
    let row = nx + 1;
    let mut faces = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v = j * row + i;
            faces.push(vec![v, v + 1, v + row + 1, v + row]);
        }
    }
    build(positions, faces)
}

/// Regular octahedron with vertices on the unit axes.
pub fn octahedron<I: MeshIndex>() -> PolyMesh<I> {
    let positions = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let mut faces = Vec::with_capacity(8);
    for i in 0..4 {
        let j = (i + 1) % 4;
        faces.push(vec![i, j, 4]);
        faces.push(vec![j, i, 5]);
    }
    build(positions, faces)
}

/// Cylinder around the z axis from `z = 0` to `z = height`.
///
/// Without caps the result is an open tube with two boundary loops of
/// `segments` edges each.
pub fn cylinder<I: MeshIndex>(segments: usize, radius: f64, height: f64, capped: bool) -> PolyMesh<I> {
    let n = segments.max(3);
    let mut positions = Vec::with_capacity(2 * n);
    for z in [0.0, height] {
        for i in 0..n {
            let t = TAU * i as f64 / n as f64;
            positions.push(Point3::new(radius * t.cos(), radius * t.sin(), z));
        }
    }
    let mut faces: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            vec![i, j, n + j, n + i]
        })
        .collect();
    if capped {
        faces.push((n..2 * n).collect());
        faces.push((0..n).rev().collect());
    }
    build(positions, faces)
}

/// Single regular polygon in the XY plane, facing +z.
pub fn polygon<I: MeshIndex>(sides: usize, radius: f64) -> PolyMesh<I> {
    let n = sides.max(3);
    let positions = (0..n)
        .map(|i| {
            let t = TAU * i as f64 / n as f64;
            Point3::new(radius * t.cos(), radius * t.sin(), 0.0)
        })
        .collect();
    build(positions, vec![(0..n).collect()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FaceId;

    #[test]
    fn test_cube_is_closed_and_outward() {
        let mesh: PolyMesh = cube(2.0);
        assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (8, 12, 6));
        assert!(mesh.is_valid());
        for f in mesh.face_ids() {
            let c = mesh.face_centroid(f).coords;
            assert!(mesh.face_normal(f).dot(&c) > 0.0);
        }
        assert!((mesh.surface_area() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_counts() {
        let mesh: PolyMesh = grid(3, 2, 1.0);
        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.num_faces(), 6);
        assert_eq!(mesh.num_edges(), 17);
        assert!(mesh.face_normal(FaceId::new(0)).z > 0.99);
    }

    #[test]
    fn test_octahedron_outward() {
        let mesh: PolyMesh = octahedron();
        assert!(mesh.is_valid());
        assert!(mesh.is_triangle_mesh());
        for f in mesh.face_ids() {
            assert!(mesh.face_normal(f).dot(&mesh.face_centroid(f).coords) > 0.0);
        }
    }

    #[test]
    fn test_open_cylinder_has_two_holes() {
        let mesh: PolyMesh = cylinder(8, 1.0, 2.0, false);
        assert_eq!(mesh.boundary_loops().len(), 2);
        let closed: PolyMesh = cylinder(8, 1.0, 2.0, true);
        assert!(closed.boundary_loops().is_empty());
        assert!(closed.is_valid());
    }

    #[test]
    fn test_polygon() {
        let mesh: PolyMesh = polygon(6, 1.0);
        assert_eq!(mesh.face_degree(FaceId::new(0)), 6);
        assert_eq!(mesh.boundary_loops()[0].len(), 6);
    }
}

//! Hole capping and bridging.

use super::{check_selection, face_mask, rebuild};
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeId, MeshIndex, PolyMesh, VertexId};

/// Cap every hole that touches a selected edge with a single face.
///
/// Returns the caps as a face selection.
pub fn close_boundary<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    let caps: Vec<Vec<usize>> = mesh
        .boundary_loops()
        .into_iter()
        .filter(|ring| ring.iter().any(|&he| selection[mesh.edge_of(he).index()]))
        .map(|ring| ring.iter().map(|&he| mesh.target(he).index()).collect())
        .collect();
    if caps.is_empty() {
        return Ok(vec![false; mesh.num_faces()]);
    }

    let mut soup = mesh.to_soup();
    let first = soup.faces.len();
    let count = caps.len();
    soup.faces.extend(caps);
    rebuild(mesh, &soup, "close boundary")?;
    Ok(face_mask(mesh.num_faces(), first..first + count))
}

/// The hole `v` lies on, rotated to start at the hole edge leaving `v`.
fn hole_from<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    loops: &[Vec<HalfEdgeId<I>>],
    v: VertexId<I>,
) -> Result<(usize, Vec<usize>)> {
    for (li, ring) in loops.iter().enumerate() {
        if let Some(start) = ring.iter().position(|&he| mesh.origin(he) == v) {
            let n = ring.len();
            let verts = (0..n).map(|i| mesh.origin(ring[(start + i) % n]).index()).collect();
            return Ok((li, verts));
        }
    }
    Err(MeshError::NotOnBoundary(v.index()))
}

/// Bridge the holes through `first` and `second` with a ring of quads.
///
/// The two holes must have the same number of edges. The vertices are
/// paired in loop order starting from the two given vertices. Returns the
/// bridge as a face selection.
pub fn join_boundaries<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    first: VertexId<I>,
    second: VertexId<I>,
) -> Result<Vec<bool>> {
    let loops = mesh.boundary_loops();
    let (l1, x) = hole_from(mesh, &loops, first)?;
    let (l2, y) = hole_from(mesh, &loops, second)?;
    if l1 == l2 {
        return Err(MeshError::SameBoundary(first.index(), second.index()));
    }
    if x.len() != y.len() {
        return Err(MeshError::IncompatibleBoundaries {
            first: x.len(),
            second: y.len(),
        });
    }

    let n = x.len();
    let mut soup = mesh.to_soup();
    let start = soup.faces.len();
    for i in 0..n {
        soup.faces.push(vec![x[i], x[(i + 1) % n], y[(2 * n - i - 1) % n], y[(n - i) % n]]);
    }
    rebuild(mesh, &soup, "join boundaries")?;
    Ok(face_mask(mesh.num_faces(), start..start + n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, shapes};
    use nalgebra::Point3;

    #[test]
    fn test_close_open_cube() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let mut sel = vec![false; 6];
        sel[1] = true;
        crate::ops::delete_faces(&mut mesh, &sel).unwrap();
        let hole_edge = mesh.boundary_loops()[0][0];
        let mut edges = vec![false; mesh.num_edges()];
        edges[mesh.edge_of(hole_edge).index()] = true;
        let caps = close_boundary(&mut mesh, &edges).unwrap();
        assert_eq!(mesh.num_faces(), 6);
        assert!(mesh.boundary_loops().is_empty());
        assert_eq!(caps.iter().filter(|&&s| s).count(), 1);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_close_without_hole_selection() {
        let mut mesh: PolyMesh = shapes::grid(2, 2, 1.0);
        let before = mesh.duplicate();
        let none = vec![false; mesh.num_edges()];
        let out = close_boundary(&mut mesh, &none).unwrap();
        assert!(mesh.structurally_eq(&before));
        assert!(out.iter().all(|&s| !s));
    }

    #[test]
    fn test_join_tube_ends() {
        let mut mesh: PolyMesh = shapes::cylinder(4, 1.0, 1.0, false);
        let bridge = join_boundaries(&mut mesh, VertexId::new(0), VertexId::new(4)).unwrap();
        assert_eq!(mesh.num_faces(), 8);
        assert!(mesh.boundary_loops().is_empty());
        assert_eq!(mesh.check_report().euler_characteristic(), 0);
        assert_eq!(bridge.iter().filter(|&&s| s).count(), 4);
    }

    #[test]
    fn test_join_errors() {
        let mut grid: PolyMesh = shapes::grid(2, 2, 1.0);
        let err = join_boundaries(&mut grid, VertexId::new(4), VertexId::new(0)).unwrap_err();
        assert!(matches!(err, MeshError::NotOnBoundary(4)));
        let err = join_boundaries(&mut grid, VertexId::new(0), VertexId::new(2)).unwrap_err();
        assert!(matches!(err, MeshError::SameBoundary(0, 2)));

        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
            Point3::new(3.0, 1.0, 0.0),
        ];
        let mut pair: PolyMesh = build_from_polygons(&pts, &[vec![0, 1, 2], vec![3, 4, 5, 6]]).unwrap();
        let before = pair.duplicate();
        let err = join_boundaries(&mut pair, VertexId::new(0), VertexId::new(3)).unwrap_err();
        assert!(matches!(err, MeshError::IncompatibleBoundaries { first: 3, second: 4 }));
        assert!(err.is_topological());
        assert!(pair.structurally_eq(&before));
    }
}

//! Cutting the mesh into flattenable pieces.

use std::collections::HashMap;

use super::mapping::UnfoldedPiece;
use crate::error::{Result, UnfoldFailure};
use crate::mesh::{FaceId, HalfEdgeId, MeshIndex, PolyMesh};
use crate::ops::{triangulate_polygon, DisjointSet};

/// Split `mesh` into pieces along its seams and triangulate them.
///
/// Faces sharing a non-seam edge end up in the same piece. Each face corner
/// is identified by the half-edge ending at it; corners meeting across a
/// non-seam edge become the same local vertex, so a seam that cuts into a
/// piece opens up. Every piece must be a topological disk.
pub(crate) fn find_islands<I: MeshIndex>(mesh: &PolyMesh<I>) -> Result<Vec<UnfoldedPiece>> {
    if mesh.num_faces() == 0 {
        return Err(UnfoldFailure::Empty.into());
    }

    let mut faces = DisjointSet::new(mesh.num_faces());
    let mut corners = DisjointSet::new(mesh.num_halfedges());
    for e in mesh.edge_ids() {
        if mesh.is_seam(e) || mesh.is_boundary_edge(e) {
            continue;
        }
        let h = mesh.edge_halfedge(e);
        let t = mesh.twin(h);
        faces.union(mesh.face_of(h).index(), mesh.face_of(t).index());
        corners.union(h.index(), mesh.prev(t).index());
        corners.union(mesh.prev(h).index(), t.index());
    }

    let mut island_of_root: HashMap<usize, usize> = HashMap::new();
    let mut pieces: Vec<UnfoldedPiece> = Vec::new();
    let mut locals: Vec<HashMap<usize, usize>> = Vec::new();

    for f in mesh.face_ids() {
        let root = faces.find(f.index());
        let island = *island_of_root.entry(root).or_insert_with(|| {
            pieces.push(UnfoldedPiece {
                vertices: Vec::new(),
                positions: Vec::new(),
                triangles: Vec::new(),
                faces: Vec::new(),
            });
            locals.push(HashMap::new());
            pieces.len() - 1
        });
        let piece = &mut pieces[island];
        let local = &mut locals[island];

        let ring: Vec<HalfEdgeId<I>> = mesh.face_halfedges(f).collect();
        let ids: Vec<usize> = ring
            .iter()
            .map(|&h| {
                let key = corners.find(h.index());
                *local.entry(key).or_insert_with(|| {
                    let v = mesh.target(h);
                    piece.vertices.push(v.index());
                    piece.positions.push(*mesh.position(v));
                    piece.vertices.len() - 1
                })
            })
            .collect();
        add_face_triangles(mesh, f, &ring, &ids, piece);
    }

    for (island, piece) in pieces.iter().enumerate() {
        let euler = piece.euler_characteristic();
        let open = piece.edges().iter().any(|&(_, uses)| uses == 1);
        if euler != 1 || !open {
            return Err(UnfoldFailure::NonDiskIsland { island, euler }.into());
        }
    }
    log::debug!("found {} islands", pieces.len());
    Ok(pieces)
}

fn add_face_triangles<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    f: FaceId<I>,
    ring: &[HalfEdgeId<I>],
    ids: &[usize],
    piece: &mut UnfoldedPiece,
) {
    let points: Vec<_> = ring.iter().map(|&h| *mesh.position(mesh.target(h))).collect();
    for [a, b, c] in triangulate_polygon(&points) {
        piece.triangles.push([ids[a], ids[b], ids[c]]);
        piece.faces.push(f.index());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeshError;
    use crate::mesh::{shapes, EdgeId, VertexId};

    #[test]
    fn test_grid_is_one_piece() {
        let mesh: PolyMesh = shapes::grid(3, 2, 1.0);
        let pieces = find_islands(&mesh).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].num_vertices(), 12);
        assert_eq!(pieces[0].triangles.len(), 12);
        assert_eq!(pieces[0].euler_characteristic(), 1);
    }

    #[test]
    fn test_closed_cube_needs_seams() {
        let mesh: PolyMesh = shapes::cube(1.0);
        let err = find_islands(&mesh).unwrap_err();
        assert!(matches!(
            err,
            MeshError::Unfold(UnfoldFailure::NonDiskIsland { island: 0, euler: 2 })
        ));
    }

    #[test]
    fn test_tube_with_one_seam() {
        let mut mesh: PolyMesh = shapes::cylinder(6, 1.0, 1.0, false);
        assert!(find_islands(&mesh).is_err());
        let e = mesh.find_edge(VertexId::new(0), VertexId::new(6)).unwrap();
        mesh.set_seam(e, true);
        let pieces = find_islands(&mesh).unwrap();
        assert_eq!(pieces.len(), 1);
        // The seam vertices are split in two.
        assert_eq!(pieces[0].num_vertices(), 14);
        assert_eq!(pieces[0].vertices.iter().filter(|&&v| v == 0).count(), 2);
    }

    #[test]
    fn test_all_seams_give_one_piece_per_face() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        for e in 0..mesh.num_edges() {
            mesh.set_seam(EdgeId::new(e), true);
        }
        let pieces = find_islands(&mesh).unwrap();
        assert_eq!(pieces.len(), 6);
        for (f, piece) in pieces.iter().enumerate() {
            assert_eq!(piece.num_vertices(), 4);
            assert_eq!(piece.faces, vec![f, f]);
        }
    }
}

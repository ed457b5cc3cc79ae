//! Face merging.

use std::collections::HashSet;

use super::collapse::trace_single_loop;
use super::{check_selection, face_components, face_mask, rebuild, selected, selected_edge_keys, DisjointSet};
use crate::error::{MeshError, Result};
use crate::mesh::{edge_key, EdgeId, MeshIndex, PolyMesh, PolygonSoup};

/// Replace each face group by one polygon, dissolving the shared edges that
/// `dissolve` accepts. Returns the final indices of the merged faces.
fn merge_groups(
    soup: &mut PolygonSoup,
    groups: &[Vec<usize>],
    dissolve: impl Fn(usize, usize) -> bool,
    operation: &'static str,
) -> Result<Vec<usize>> {
    let mut faces: Vec<Option<Vec<usize>>> = std::mem::take(&mut soup.faces).into_iter().map(Some).collect();
    let mut keepers = Vec::new();
    for group in groups.iter().filter(|g| g.len() > 1) {
        let mut directed = HashSet::new();
        for &f in group {
            if let Some(face) = &faces[f] {
                let k = face.len();
                for i in 0..k {
                    directed.insert((face[i], face[(i + 1) % k]));
                }
            }
        }
        let mut outline: Vec<(usize, usize)> = directed
            .iter()
            .filter(|&&(a, b)| !(directed.contains(&(b, a)) && dissolve(a, b)))
            .copied()
            .collect();
        outline.sort_unstable();
        let merged = trace_single_loop(&outline, operation)?;
        if merged.len() < 3 {
            return Err(MeshError::illegal(operation, "merged outline has fewer than three corners"));
        }
        for &f in group {
            faces[f] = None;
        }
        faces[group[0]] = Some(merged);
        keepers.push(group[0]);
    }

    let mut index = Vec::with_capacity(faces.len());
    let mut next = 0;
    for face in &faces {
        index.push(next);
        if face.is_some() {
            next += 1;
        }
    }
    soup.faces = faces.into_iter().flatten().collect();
    Ok(keepers.into_iter().map(|f| index[f]).collect())
}

/// Merge each connected group of selected faces into a single polygon.
///
/// Groups whose outline pinches or has holes are rejected. Returns the
/// merged faces as a face selection.
pub fn merge_faces<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    let groups = face_components(mesh, selection);
    if groups.iter().all(|g| g.len() < 2) {
        return Ok(selection.to_vec());
    }
    let mut soup = mesh.to_soup();
    let merged = merge_groups(&mut soup, &groups, |_, _| true, "merge faces")?;
    rebuild(mesh, &soup, "merge faces")?;
    Ok(face_mask(mesh.num_faces(), merged))
}

/// Remove the selected edges, merging the faces on either side of each.
///
/// Edges on a hole have only one face and are skipped. Returns the merged
/// faces as a face selection.
pub fn merge_edges<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    let mut sets = DisjointSet::new(mesh.num_faces());
    let mut members = Vec::new();
    for e in selected(selection) {
        let he = mesh.edge_halfedge(EdgeId::new(e));
        let (f0, f1) = (mesh.face_of(he), mesh.face_of(mesh.twin(he)));
        if !f0.is_valid() || !f1.is_valid() {
            log::debug!("merge edges: skipping boundary edge {}", e);
            continue;
        }
        sets.union(f0.index(), f1.index());
        members.extend([f0.index(), f1.index()]);
    }
    if members.is_empty() {
        return Ok(vec![false; mesh.num_faces()]);
    }
    members.sort_unstable();
    members.dedup();
    let groups = sets.groups(members);
    let keys = selected_edge_keys(mesh, selection);

    let mut soup = mesh.to_soup();
    let merged = merge_groups(&mut soup, &groups, |a, b| keys.contains(&edge_key(a, b)), "merge edges")?;
    rebuild(mesh, &soup, "merge edges")?;
    Ok(face_mask(mesh.num_faces(), merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, FaceId, VertexId};

    #[test]
    fn test_merge_two_quads() {
        let mut mesh: PolyMesh = shapes::grid(2, 1, 1.0);
        let out = merge_faces(&mut mesh, &[true, true]).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.face_degree(FaceId::new(0)), 6);
        assert_eq!(out, vec![true]);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_merge_drops_inner_vertex() {
        let mut mesh: PolyMesh = shapes::grid(2, 2, 1.0);
        merge_faces(&mut mesh, &[true; 4]).unwrap();
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.face_degree(FaceId::new(0)), 8);
    }

    #[test]
    fn test_merge_ring_is_illegal() {
        let mut mesh: PolyMesh = shapes::grid(3, 3, 1.0);
        let before = mesh.duplicate();
        let mut sel = vec![true; 9];
        sel[4] = false;
        let err = merge_faces(&mut mesh, &sel).unwrap_err();
        assert!(err.is_illegal_operation());
        assert!(mesh.structurally_eq(&before));
    }

    #[test]
    fn test_merge_edge() {
        let mut mesh: PolyMesh = shapes::grid(2, 1, 1.0);
        let e = mesh.find_edge(VertexId::new(1), VertexId::new(4)).unwrap();
        let mut sel = vec![false; mesh.num_edges()];
        sel[e.index()] = true;
        let out = merge_edges(&mut mesh, &sel).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(out, vec![true]);
    }

    #[test]
    fn test_merge_boundary_edge_skipped() {
        let mut mesh: PolyMesh = shapes::grid(2, 1, 1.0);
        let e = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        let mut sel = vec![false; mesh.num_edges()];
        sel[e.index()] = true;
        let out = merge_edges(&mut mesh, &sel).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(out, vec![false, false]);
    }
}

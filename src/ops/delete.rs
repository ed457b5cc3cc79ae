//! Element deletion.

use super::{check_selection, rebuild, selected};
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, FaceId, MeshIndex, PolyMesh, VertexId};

/// Rebuild without the faces in `doomed`, refusing to leave an empty mesh.
fn remove_faces<I: MeshIndex>(mesh: &mut PolyMesh<I>, doomed: &[bool], operation: &'static str) -> Result<()> {
    let mut soup = mesh.to_soup();
    let faces = std::mem::take(&mut soup.faces);
    soup.faces = faces
        .into_iter()
        .enumerate()
        .filter(|(f, _)| !doomed[*f])
        .map(|(_, face)| face)
        .collect();
    if soup.faces.is_empty() {
        return Err(MeshError::illegal(operation, "no faces would remain"));
    }
    rebuild(mesh, &soup, operation)?;
    Ok(())
}

/// Remove the selected faces. Vertices left without faces go too.
pub fn delete_faces<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    if selection.iter().any(|&s| s) {
        remove_faces(mesh, selection, "delete faces")?;
    }
    Ok(vec![false; mesh.num_faces()])
}

/// Remove the selected edges together with the faces they border.
pub fn delete_edges<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    const OP: &str = "delete edges";
    check_selection(selection, mesh.num_edges())?;
    let count = selected(selection).count();
    if count == 0 {
        return Ok(selection.to_vec());
    }
    if mesh.num_edges() - count < 3 {
        return Err(MeshError::illegal(OP, "fewer than three edges would remain"));
    }
    let mut doomed = vec![false; mesh.num_faces()];
    for e in selected(selection) {
        let he = mesh.edge_halfedge(EdgeId::new(e));
        for f in [mesh.face_of(he), mesh.face_of(mesh.twin(he))] {
            if f.is_valid() {
                doomed[f.index()] = true;
            }
        }
    }
    remove_faces(mesh, &doomed, OP)?;
    Ok(vec![false; mesh.num_edges()])
}

/// Remove the selected vertices together with every face touching them.
pub fn delete_vertices<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    const OP: &str = "delete vertices";
    check_selection(selection, mesh.num_vertices())?;
    let count = selected(selection).count();
    if count == 0 {
        return Ok(selection.to_vec());
    }
    if mesh.num_vertices() - count < 3 {
        return Err(MeshError::illegal(OP, "fewer than three vertices would remain"));
    }
    let doomed: Vec<bool> = (0..mesh.num_faces())
        .map(|f| mesh.face_vertices(FaceId::new(f)).any(|v: VertexId<I>| selection[v.index()]))
        .collect();
    remove_faces(mesh, &doomed, OP)?;
    Ok(vec![false; mesh.num_vertices()])
}

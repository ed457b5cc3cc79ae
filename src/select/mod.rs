//! Selection algorithms.
//!
//! Selections are `bool` masks indexed by the entity numbers of one
//! [`SelectionMode`]. This module converts masks between modes and derives
//! new selections from old ones: falloff distances for soft dragging, edge
//! loops and rings, whole holes and similar-looking faces or edges.

mod loops;
mod similar;
mod tension;

pub use loops::{boundary_selection, find_edge_loops, find_edge_strips};
pub use similar::{find_similar_edges, find_similar_faces, EdgeSimilarity, FaceSimilarity, SimilarityOptions};
pub use tension::{adjust_deltas, selection_distance, tension_weight, TensionOptions};

use crate::error::Result;
use crate::mesh::{EdgeId, FaceId, MeshIndex, PolyMesh};
use crate::ops::check_selection;

/// Entity kind a selection mask refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionMode {
    /// Vertices.
    #[default]
    Point,
    /// Edges (half-edge pairs).
    Edge,
    /// Faces.
    Face,
}

impl SelectionMode {
    /// Mask length for this mode on `mesh`.
    pub fn len<I: MeshIndex>(self, mesh: &PolyMesh<I>) -> usize {
        match self {
            SelectionMode::Point => mesh.num_vertices(),
            SelectionMode::Edge => mesh.num_edges(),
            SelectionMode::Face => mesh.num_faces(),
        }
    }
}

/// Re-express a selection in another mode.
///
/// A tolerant conversion selects an entity when any of its incident source
/// entities is selected; a strict one requires all of them.
pub fn convert_selection<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    selection: &[bool],
    from: SelectionMode,
    to: SelectionMode,
    tolerant: bool,
) -> Result<Vec<bool>> {
    check_selection(selection, from.len(mesh))?;
    if from == to {
        return Ok(selection.to_vec());
    }
    let pick = |items: &mut dyn Iterator<Item = usize>| incident_pick(selection, items, tolerant);

    use SelectionMode::*;
    let out = match (from, to) {
        (Point, Edge) => mesh
            .edge_ids()
            .map(|e| pick(&mut mesh.edge_vertices(e).into_iter().map(|v| v.index())))
            .collect(),
        (Point, Face) => mesh
            .face_ids()
            .map(|f| pick(&mut mesh.face_vertices(f).map(|v| v.index())))
            .collect(),
        (Edge, Point) => mesh
            .vertex_ids()
            .map(|v| pick(&mut mesh.vertex_halfedges(v).map(|he| mesh.edge_of(he).index())))
            .collect(),
        (Edge, Face) => mesh
            .face_ids()
            .map(|f| pick(&mut mesh.face_edges(f).map(|e| e.index())))
            .collect(),
        (Face, Point) => mesh
            .vertex_ids()
            .map(|v| pick(&mut mesh.vertex_faces(v).map(|f| f.index())))
            .collect(),
        (Face, Edge) => mesh
            .edge_ids()
            .map(|e| pick(&mut edge_faces(mesh, e).into_iter().map(|f| f.index())))
            .collect(),
        _ => unreachable!("same-mode conversion returned early"),
    };
    Ok(out)
}

/// Any (tolerant) or all (strict, and at least one) of `items` selected.
fn incident_pick(selection: &[bool], items: &mut dyn Iterator<Item = usize>, tolerant: bool) -> bool {
    let mut any = false;
    for i in items {
        if selection[i] == tolerant {
            return tolerant;
        }
        any = true;
    }
    any && !tolerant
}

/// Faces on either side of an edge, skipping holes.
pub(crate) fn edge_faces<I: MeshIndex>(mesh: &PolyMesh<I>, e: EdgeId<I>) -> Vec<FaceId<I>> {
    let he = mesh.edge_halfedge(e);
    [mesh.face_of(he), mesh.face_of(mesh.twin(he))]
        .into_iter()
        .filter(|f| f.is_valid())
        .collect()
}

/// Add every entity that shares a vertex with the selection.
pub fn grow_selection<I: MeshIndex>(mesh: &PolyMesh<I>, selection: &[bool], mode: SelectionMode) -> Result<Vec<bool>> {
    check_selection(selection, mode.len(mesh))?;
    let points = match mode {
        SelectionMode::Point => {
            let mut grown = selection.to_vec();
            for v in mesh.vertex_ids().filter(|v| selection[v.index()]) {
                for n in mesh.vertex_neighbors(v) {
                    grown[n.index()] = true;
                }
            }
            return Ok(grown);
        }
        _ => convert_selection(mesh, selection, mode, SelectionMode::Point, true)?,
    };
    convert_selection(mesh, &points, SelectionMode::Point, mode, true)
}

/// Drop every entity that shares a vertex with something unselected.
pub fn shrink_selection<I: MeshIndex>(mesh: &PolyMesh<I>, selection: &[bool], mode: SelectionMode) -> Result<Vec<bool>> {
    let inverse: Vec<bool> = selection.iter().map(|&s| !s).collect();
    let grown = grow_selection(mesh, &inverse, mode)?;
    Ok(grown.into_iter().map(|s| !s).collect())
}

/// Number of set entries.
pub fn count_selected(selection: &[bool]) -> usize {
    selection.iter().filter(|&&s| s).count()
}

//! Topology operators.
//!
//! Every operator takes a `bool` selection mask sized to the entity count of
//! its mode (vertices, edges or faces), validates it, then edits a
//! [`PolygonSoup`] copy of the mesh and rebuilds. The receiver is replaced
//! only when the rebuild succeeds, so an operator that returns an error
//! leaves the mesh exactly as it was.
//!
//! Each operator returns a new selection mask sized to the entity count of
//! the rebuilt mesh; see [`Operation::output_mode`] for which mode.
//!
//! # Example
//!
//! ```
//! use polymesh::mesh::{shapes, PolyMesh};
//! use polymesh::ops::{extrude_faces, ExtrudeOptions};
//!
//! let mut mesh: PolyMesh = shapes::cube(1.0);
//! let mut sel = vec![false; mesh.num_faces()];
//! sel[1] = true;
//! let caps = extrude_faces(&mut mesh, &sel, &ExtrudeOptions::default().with_distance(0.5)).unwrap();
//! assert_eq!(mesh.num_faces(), 10);
//! assert_eq!(caps.iter().filter(|&&s| s).count(), 1);
//! ```

mod bevel;
mod boundary;
mod collapse;
mod delete;
mod divide;
mod extrude;
mod merge;
mod mirror;
mod quads;
mod stitch;
mod triangulate;

use std::collections::HashSet;

pub use bevel::{bevel_edges, bevel_vertices, BEVEL_LIMIT};
pub use boundary::{close_boundary, join_boundaries};
pub use collapse::{collapse_edges, collapse_faces, collapse_vertices, facet_vertices, MergePoint};
pub use delete::{delete_edges, delete_faces, delete_vertices};
pub use divide::{connect_vertices, divide_edges};
pub use extrude::{
    extrude_along_path, extrude_edge_region, extrude_edges, extrude_faces, extrude_region, ExtrudeOptions,
};
pub use merge::{merge_edges, merge_faces};
pub use mirror::{invert_normals, mirror_whole_mesh, MirrorOptions};
pub use quads::{quads_from_triangles, QuadOptions, QuadPairing};
pub use triangulate::{triangulate_faces, triangulate_polygon};

use crate::error::{MeshError, Result};
use nalgebra::Point3;

use crate::mesh::{edge_key, MeshIndex, PolyMesh, PolygonSoup, VertexId};
use crate::select::SelectionMode;

/// A topology edit with its parameters.
///
/// Interactive tools hold one of these and call [`Operation::apply`] on a
/// working copy each time the user drags.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Extrude each selected face on its own.
    ExtrudeFaces(ExtrudeOptions),
    /// Extrude connected selected faces as regions.
    ExtrudeRegion(ExtrudeOptions),
    /// Extrude each selected boundary edge on its own.
    ExtrudeEdges(ExtrudeOptions),
    /// Extrude chains of selected boundary edges together.
    ExtrudeEdgeRegion(ExtrudeOptions),
    /// Extrude selected regions through a series of points.
    ExtrudeAlongPath {
        /// Points the caps pass through, in order.
        path: Vec<Point3<f64>>,
        /// Shrink the caps to a point at the end of the path.
        taper: bool,
    },
    /// Cut selected vertices off.
    BevelVertices {
        /// Distance along each edge.
        width: f64,
    },
    /// Replace selected edges by strips.
    BevelEdges {
        /// Distance along each side edge.
        width: f64,
    },
    /// Dissolve selected vertices into their surrounding faces.
    CollapseVertices,
    /// Merge each connected group of selected edges into one vertex.
    CollapseEdges(MergePoint),
    /// Merge each connected group of selected faces into one vertex.
    CollapseFaces,
    /// Replace selected vertices by a face spanning their neighbours.
    FacetVertices,
    /// Split selected edges into equal segments.
    DivideEdges {
        /// Number of segments per edge.
        segments: usize,
    },
    /// Split faces between selected vertices.
    ConnectVertices,
    /// Remove selected edges, merging the faces on both sides.
    MergeEdges,
    /// Merge each connected group of selected faces into one polygon.
    MergeFaces,
    /// Split selected faces into triangles.
    TriangulateFaces,
    /// Merge pairs of selected triangles into quads.
    QuadsFromTriangles(QuadOptions),
    /// Remove selected vertices and their faces.
    DeleteVertices,
    /// Remove selected edges and their faces.
    DeleteEdges,
    /// Remove selected faces.
    DeleteFaces,
    /// Reflect the whole mesh and weld along the plane.
    MirrorWhole(MirrorOptions),
    /// Flip every face.
    InvertNormals,
    /// Cap holes touching selected edges.
    CloseBoundary,
    /// Bridge the holes of the two selected vertices.
    JoinBoundaries,
}

impl Operation {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ExtrudeFaces(_) => "extrude faces",
            Operation::ExtrudeRegion(_) => "extrude region",
            Operation::ExtrudeEdges(_) => "extrude edges",
            Operation::ExtrudeEdgeRegion(_) => "extrude edge region",
            Operation::ExtrudeAlongPath { .. } => "extrude along path",
            Operation::BevelVertices { .. } => "bevel vertices",
            Operation::BevelEdges { .. } => "bevel edges",
            Operation::CollapseVertices => "collapse vertices",
            Operation::CollapseEdges(_) => "collapse edges",
            Operation::CollapseFaces => "collapse faces",
            Operation::FacetVertices => "facet vertices",
            Operation::DivideEdges { .. } => "divide edges",
            Operation::ConnectVertices => "connect vertices",
            Operation::MergeEdges => "merge edges",
            Operation::MergeFaces => "merge faces",
            Operation::TriangulateFaces => "triangulate faces",
            Operation::QuadsFromTriangles(_) => "quads from triangles",
            Operation::DeleteVertices => "delete vertices",
            Operation::DeleteEdges => "delete edges",
            Operation::DeleteFaces => "delete faces",
            Operation::MirrorWhole(_) => "mirror",
            Operation::InvertNormals => "invert normals",
            Operation::CloseBoundary => "close boundary",
            Operation::JoinBoundaries => "join boundaries",
        }
    }

    /// Mode of the selection mask `apply` expects.
    pub fn input_mode(&self) -> SelectionMode {
        match self {
            Operation::BevelVertices { .. }
            | Operation::CollapseVertices
            | Operation::FacetVertices
            | Operation::ConnectVertices
            | Operation::DeleteVertices
            | Operation::JoinBoundaries => SelectionMode::Point,
            Operation::ExtrudeEdges(_)
            | Operation::ExtrudeEdgeRegion(_)
            | Operation::BevelEdges { .. }
            | Operation::CollapseEdges(_)
            | Operation::DivideEdges { .. }
            | Operation::MergeEdges
            | Operation::DeleteEdges
            | Operation::CloseBoundary => SelectionMode::Edge,
            Operation::ExtrudeFaces(_)
            | Operation::ExtrudeRegion(_)
            | Operation::ExtrudeAlongPath { .. }
            | Operation::CollapseFaces
            | Operation::MergeFaces
            | Operation::TriangulateFaces
            | Operation::QuadsFromTriangles(_)
            | Operation::DeleteFaces
            | Operation::MirrorWhole(_)
            | Operation::InvertNormals => SelectionMode::Face,
        }
    }

    /// Mode of the selection mask `apply` returns.
    pub fn output_mode(&self) -> SelectionMode {
        match self {
            Operation::ExtrudeEdges(_)
            | Operation::ExtrudeEdgeRegion(_)
            | Operation::ConnectVertices
            | Operation::CollapseEdges(_)
            | Operation::DeleteEdges => SelectionMode::Edge,
            Operation::DivideEdges { .. } | Operation::CollapseVertices | Operation::DeleteVertices => {
                SelectionMode::Point
            }
            _ => SelectionMode::Face,
        }
    }

    /// Run the operation on `mesh` with a selection in [`input_mode`](Self::input_mode).
    ///
    /// On error the mesh is unchanged.
    pub fn apply<I: MeshIndex>(&self, mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
        log::debug!("applying {}", self.name());
        match self {
            Operation::ExtrudeFaces(o) => extrude_faces(mesh, selection, o),
            Operation::ExtrudeRegion(o) => extrude_region(mesh, selection, o),
            Operation::ExtrudeEdges(o) => extrude_edges(mesh, selection, o),
            Operation::ExtrudeEdgeRegion(o) => extrude_edge_region(mesh, selection, o),
            Operation::ExtrudeAlongPath { path, taper } => extrude_along_path(mesh, selection, path, *taper),
            Operation::BevelVertices { width } => bevel_vertices(mesh, selection, *width),
            Operation::BevelEdges { width } => bevel_edges(mesh, selection, *width),
            Operation::CollapseVertices => collapse_vertices(mesh, selection),
            Operation::CollapseEdges(point) => collapse_edges(mesh, selection, *point),
            Operation::CollapseFaces => collapse_faces(mesh, selection),
            Operation::FacetVertices => facet_vertices(mesh, selection),
            Operation::DivideEdges { segments } => divide_edges(mesh, selection, *segments),
            Operation::ConnectVertices => connect_vertices(mesh, selection),
            Operation::MergeEdges => merge_edges(mesh, selection),
            Operation::MergeFaces => merge_faces(mesh, selection),
            Operation::TriangulateFaces => triangulate_faces(mesh, selection),
            Operation::QuadsFromTriangles(o) => quads_from_triangles(mesh, selection, o),
            Operation::DeleteVertices => delete_vertices(mesh, selection),
            Operation::DeleteEdges => delete_edges(mesh, selection),
            Operation::DeleteFaces => delete_faces(mesh, selection),
            Operation::MirrorWhole(o) => {
                check_selection(selection, mesh.num_faces())?;
                mirror_whole_mesh(mesh, o)?;
                Ok(vec![false; mesh.num_faces()])
            }
            Operation::InvertNormals => {
                check_selection(selection, mesh.num_faces())?;
                invert_normals(mesh)?;
                Ok(selection.to_vec())
            }
            Operation::CloseBoundary => close_boundary(mesh, selection),
            Operation::JoinBoundaries => {
                check_selection(selection, mesh.num_vertices())?;
                let picked: Vec<usize> = selected(selection).collect();
                if picked.len() != 2 {
                    return Err(MeshError::illegal(
                        "join boundaries",
                        format!("select exactly two vertices, got {}", picked.len()),
                    ));
                }
                join_boundaries(mesh, VertexId::new(picked[0]), VertexId::new(picked[1]))
            }
        }
    }
}

// ==================== Shared helpers ====================

/// Fail with `SelectionSize` unless the mask has `expected` entries.
pub(crate) fn check_selection(selection: &[bool], expected: usize) -> Result<()> {
    if selection.len() != expected {
        return Err(MeshError::SelectionSize {
            expected,
            actual: selection.len(),
        });
    }
    Ok(())
}

/// Indices of the set entries of a mask.
pub(crate) fn selected(selection: &[bool]) -> impl Iterator<Item = usize> + '_ {
    selection.iter().enumerate().filter(|(_, &s)| s).map(|(i, _)| i)
}

/// Build `soup` and swap it into `mesh`, returning the soup-to-mesh vertex map.
///
/// Builder rejections are reported as illegal operations: the edit would have
/// produced invalid topology.
pub(crate) fn rebuild<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    soup: &PolygonSoup,
    operation: &'static str,
) -> Result<Vec<Option<usize>>> {
    let (rebuilt, remap) = soup
        .build_with_map::<I>()
        .map_err(|e| MeshError::illegal(operation, e.to_string()))?;
    log::debug!(
        "{}: {} vertices, {} edges, {} faces",
        operation,
        rebuilt.num_vertices(),
        rebuilt.num_edges(),
        rebuilt.num_faces()
    );
    mesh.replace_topology(rebuilt);
    Ok(remap)
}

/// Remove consecutive repeats from a face loop, including across the seam.
pub(crate) fn dedupe_loop(face: &mut Vec<usize>) {
    face.dedup();
    while face.len() > 1 && face.first() == face.last() {
        face.pop();
    }
}

/// Undirected vertex-pair keys of the selected edges.
pub(crate) fn selected_edge_keys<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    selection: &[bool],
) -> HashSet<(usize, usize)> {
    selected(selection)
        .map(|e| {
            let [a, b] = mesh.edge_vertices(crate::mesh::EdgeId::new(e));
            edge_key(a.index(), b.index())
        })
        .collect()
}

/// Edge mask of the rebuilt mesh with the given soup edges set.
pub(crate) fn edge_mask<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    remap: &[Option<usize>],
    keys: impl IntoIterator<Item = (usize, usize)>,
) -> Vec<bool> {
    let mut mask = vec![false; mesh.num_edges()];
    for (a, b) in keys {
        if let (Some(Some(a)), Some(Some(b))) = (remap.get(a), remap.get(b)) {
            if let Some(e) = mesh.find_edge(VertexId::new(*a), VertexId::new(*b)) {
                mask[e.index()] = true;
            }
        }
    }
    mask
}

/// Vertex mask of the rebuilt mesh with the given soup vertices set.
pub(crate) fn vertex_mask(
    num_vertices: usize,
    remap: &[Option<usize>],
    vertices: impl IntoIterator<Item = usize>,
) -> Vec<bool> {
    let mut mask = vec![false; num_vertices];
    for v in vertices {
        if let Some(Some(v)) = remap.get(v) {
            mask[*v] = true;
        }
    }
    mask
}

/// Face mask of length `num_faces` with the given faces set.
pub(crate) fn face_mask(num_faces: usize, faces: impl IntoIterator<Item = usize>) -> Vec<bool> {
    let mut mask = vec![false; num_faces];
    for f in faces {
        mask[f] = true;
    }
    mask
}

/// Groups of selected faces connected through shared edges, each sorted.
pub(crate) fn face_components<I: MeshIndex>(mesh: &PolyMesh<I>, selection: &[bool]) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(mesh.num_faces());
    for e in mesh.edge_ids() {
        let he = mesh.edge_halfedge(e);
        let (f0, f1) = (mesh.face_of(he), mesh.face_of(mesh.twin(he)));
        if f0.is_valid() && f1.is_valid() && selection[f0.index()] && selection[f1.index()] {
            sets.union(f0.index(), f1.index());
        }
    }
    sets.groups(selected(selection))
}

/// Unit normal of a soup polygon.
pub(crate) fn soup_normal(soup: &PolygonSoup, face: &[usize]) -> nalgebra::Vector3<f64> {
    let pts: Vec<_> = face.iter().map(|&v| soup.positions[v]).collect();
    crate::mesh::newell_normal(&pts)
        .try_normalize(1e-15)
        .unwrap_or_else(nalgebra::Vector3::zeros)
}

/// Union-find over `0..n` with path compression and union by rank.
#[derive(Debug, Clone)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub(crate) fn union(&mut self, x: usize, y: usize) {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }

    /// Partition `members` by set, groups ordered by their smallest member.
    pub(crate) fn groups(&mut self, members: impl IntoIterator<Item = usize>) -> Vec<Vec<usize>> {
        let mut by_root: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
        let mut order = Vec::new();
        for m in members {
            let root = self.find(m);
            let group = by_root.entry(root).or_default();
            if group.is_empty() {
                order.push(root);
            }
            group.push(m);
        }
        let mut groups: Vec<Vec<usize>> = order
            .into_iter()
            .filter_map(|r| by_root.remove(&r))
            .collect();
        for g in &mut groups {
            g.sort_unstable();
        }
        groups.sort_by_key(|g| g[0]);
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn test_dedupe_loop() {
        let mut face = vec![1, 1, 2, 3, 3, 1];
        dedupe_loop(&mut face);
        assert_eq!(face, vec![1, 2, 3]);
    }

    #[test]
    fn test_disjoint_set_groups() {
        let mut sets = DisjointSet::new(6);
        sets.union(4, 1);
        sets.union(2, 5);
        sets.union(5, 4);
        assert_eq!(sets.groups(0..6), vec![vec![0], vec![1, 2, 4, 5], vec![3]]);
    }

    #[test]
    fn test_operation_rejects_wrong_mask() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let before = mesh.duplicate();
        let op = Operation::DeleteFaces;
        let err = op.apply(&mut mesh, &[true; 3]).unwrap_err();
        assert!(matches!(err, MeshError::SelectionSize { expected: 6, actual: 3 }));
        assert!(mesh.structurally_eq(&before));
    }

    #[test]
    fn test_operation_modes() {
        let op = Operation::DivideEdges { segments: 2 };
        assert_eq!(op.input_mode(), SelectionMode::Edge);
        assert_eq!(op.output_mode(), SelectionMode::Point);
        assert_eq!(Operation::TriangulateFaces.output_mode(), SelectionMode::Face);
    }

    #[test]
    fn test_triangulate_then_pair_round_trip() {
        let mut mesh: PolyMesh = shapes::grid(2, 2, 1.0);
        let all = vec![true; 4];
        let tris = Operation::TriangulateFaces.apply(&mut mesh, &all).unwrap();
        assert_eq!(mesh.num_faces(), 8);
        let op = Operation::QuadsFromTriangles(QuadOptions::default());
        assert_eq!(op.input_mode(), SelectionMode::Face);
        let quads = op.apply(&mut mesh, &tris).unwrap();
        assert_eq!(quads, vec![true; 4]);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_join_requires_two_vertices() {
        let mut mesh: PolyMesh = shapes::cylinder(4, 1.0, 1.0, false);
        let sel = vec![false; mesh.num_vertices()];
        let err = Operation::JoinBoundaries.apply(&mut mesh, &sel).unwrap_err();
        assert!(err.is_illegal_operation());
    }

    #[test]
    fn test_face_components() {
        let mesh: PolyMesh = shapes::grid(3, 1, 1.0);
        let groups = face_components(&mesh, &[true, false, true]);
        assert_eq!(groups, vec![vec![0], vec![2]]);
        let groups = face_components(&mesh, &[true, true, false]);
        assert_eq!(groups, vec![vec![0, 1]]);
    }
}

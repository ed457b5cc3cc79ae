//! Collapsing and facetting.

use std::collections::{HashMap, HashSet};

use nalgebra::Point3;

use super::stitch::{find_patches, unmatched_edges};
use super::{check_selection, dedupe_loop, face_components, face_mask, rebuild, selected, DisjointSet};
use crate::error::{MeshError, Result};
use crate::mesh::{edge_key, EdgeAttrs, EdgeId, MeshIndex, PolyMesh, PolygonSoup, VertexId};

/// Where a collapsed group of vertices ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePoint {
    /// Average of the group.
    #[default]
    Center,
    /// Position of the lowest-numbered vertex.
    First,
    /// Position of the highest-numbered vertex.
    Last,
}

/// Apply a vertex map to every face, dropping faces that fall below three
/// corners, and carry edge attributes over to the mapped edges.
fn remap_faces(soup: &mut PolygonSoup, map: &[usize]) {
    let faces = std::mem::take(&mut soup.faces);
    soup.faces = faces
        .into_iter()
        .filter_map(|face| {
            let mut face: Vec<usize> = face.into_iter().map(|v| map[v]).collect();
            dedupe_loop(&mut face);
            (face.len() >= 3).then_some(face)
        })
        .collect();

    let edges: HashMap<(usize, usize), EdgeAttrs> = std::mem::take(&mut soup.edges);
    let mut sorted: Vec<_> = edges.into_iter().collect();
    sorted.sort_unstable_by_key(|(k, _)| *k);
    for ((a, b), attrs) in sorted {
        let (a, b) = (map[a], map[b]);
        if a != b {
            soup.edges.entry(edge_key(a, b)).or_insert(attrs);
        }
    }
}

fn centroid(soup: &PolygonSoup, group: &[usize]) -> Point3<f64> {
    let sum = group.iter().fold(nalgebra::Vector3::zeros(), |acc, &v| acc + soup.positions[v].coords);
    Point3::from(sum / group.len() as f64)
}

/// Merge each connected group of selected edges into a single vertex.
///
/// The group keeps its lowest-numbered vertex, placed according to `point`.
/// Faces reduced below three corners disappear.
pub fn collapse_edges<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool], point: MergePoint) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    if !selection.iter().any(|&s| s) {
        return Ok(vec![false; mesh.num_edges()]);
    }

    let mut soup = mesh.to_soup();
    let mut sets = DisjointSet::new(soup.num_vertices());
    let mut members = Vec::new();
    for e in selected(selection) {
        let [a, b] = mesh.edge_vertices(EdgeId::new(e));
        sets.union(a.index(), b.index());
        members.extend([a.index(), b.index()]);
    }
    members.sort_unstable();
    members.dedup();

    let mut map: Vec<usize> = (0..soup.num_vertices()).collect();
    for group in sets.groups(members) {
        let rep = group[0];
        soup.positions[rep] = match point {
            MergePoint::Center => centroid(&soup, &group),
            MergePoint::First => soup.positions[rep],
            MergePoint::Last => soup.positions[group[group.len() - 1]],
        };
        for &v in &group {
            map[v] = rep;
        }
    }
    remap_faces(&mut soup, &map);

    rebuild(mesh, &soup, "collapse edges")?;
    Ok(vec![false; mesh.num_edges()])
}

/// Merge each connected group of selected faces into a single vertex at the
/// group's centroid. The selected faces themselves are removed.
pub fn collapse_faces<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    if !selection.iter().any(|&s| s) {
        return Ok(vec![false; mesh.num_faces()]);
    }
    if selection.iter().all(|&s| s) {
        return Err(MeshError::illegal("collapse faces", "every face is selected"));
    }

    let groups = face_components(mesh, selection);
    let mut soup = mesh.to_soup();
    let mut map: Vec<usize> = (0..soup.num_vertices()).collect();
    for group in &groups {
        let mut verts: Vec<usize> = group.iter().flat_map(|&f| soup.faces[f].iter().copied()).collect();
        verts.sort_unstable();
        verts.dedup();
        let rep = verts[0];
        soup.positions[rep] = centroid(&soup, &verts);
        for &v in &verts {
            map[v] = rep;
        }
    }
    let faces = std::mem::take(&mut soup.faces);
    soup.faces = faces
        .into_iter()
        .enumerate()
        .filter(|(f, _)| !selection[*f])
        .map(|(_, face)| face)
        .collect();
    remap_faces(&mut soup, &map);

    rebuild(mesh, &soup, "collapse faces")?;
    Ok(vec![false; mesh.num_faces()])
}

/// Remove each selected vertex, merging the faces around it into one.
///
/// A vertex on a hole has its fan replaced by a face that closes across the
/// gap it leaves. Fans that would merge into more than one loop are rejected.
pub fn collapse_vertices<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    const OP: &str = "collapse vertices";
    check_selection(selection, mesh.num_vertices())?;
    if !selection.iter().any(|&s| s) {
        return Ok(vec![false; mesh.num_vertices()]);
    }

    let mut soup = mesh.to_soup();
    let mut faces: Vec<Option<Vec<usize>>> = std::mem::take(&mut soup.faces).into_iter().map(Some).collect();

    for v in selected(selection) {
        let around: Vec<usize> = faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.as_ref().is_some_and(|f| f.contains(&v)))
            .map(|(i, _)| i)
            .collect();
        let Some(&first) = around.first() else {
            continue;
        };

        let mut edges = HashSet::new();
        for &f in &around {
            if let Some(face) = &faces[f] {
                let k = face.len();
                for i in 0..k {
                    let (a, b) = (face[i], face[(i + 1) % k]);
                    if a != v && b != v {
                        edges.insert((a, b));
                    }
                }
            }
        }
        let outline: Vec<(usize, usize)> = edges.iter().filter(|&&(a, b)| !edges.contains(&(b, a))).copied().collect();
        let merged = trace_single_loop(&outline, OP)?;

        for &f in &around {
            faces[f] = None;
        }
        if merged.len() >= 3 {
            faces[first] = Some(merged);
        } else {
            log::debug!("{}: vertex {} left no face behind", OP, v);
        }
    }
    soup.faces = faces.into_iter().flatten().collect();

    rebuild(mesh, &soup, OP)?;
    Ok(vec![false; mesh.num_vertices()])
}

/// Follow directed edges through one loop or one open chain.
pub(crate) fn trace_single_loop(edges: &[(usize, usize)], operation: &'static str) -> Result<Vec<usize>> {
    let mut succ: HashMap<usize, usize> = HashMap::new();
    let mut has_pred = HashSet::new();
    for &(a, b) in edges {
        if succ.insert(a, b).is_some() {
            return Err(MeshError::illegal(operation, format!("outline pinches at vertex {}", a)));
        }
        has_pred.insert(b);
    }
    let Some(&lowest) = succ.keys().min() else {
        return Ok(Vec::new());
    };
    let mut starts: Vec<usize> = succ.keys().copied().filter(|v| !has_pred.contains(v)).collect();
    starts.sort_unstable();
    if starts.len() > 1 {
        return Err(MeshError::illegal(operation, "outline splits into several pieces"));
    }
    let start = starts.first().copied().unwrap_or(lowest);

    let mut out = vec![start];
    let mut cur = start;
    while let Some(&next) = succ.get(&cur) {
        if next == start {
            break;
        }
        if out.contains(&next) {
            return Err(MeshError::illegal(operation, format!("outline loops back at vertex {}", next)));
        }
        out.push(next);
        cur = next;
    }
    if out.len() < edges.len() {
        return Err(MeshError::illegal(operation, "outline splits into several loops"));
    }
    Ok(out)
}

/// Replace each selected vertex by a face spanning its neighbours.
///
/// Returns the new faces as a face selection.
pub fn facet_vertices<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    const OP: &str = "facet vertices";
    check_selection(selection, mesh.num_vertices())?;
    if !selection.iter().any(|&s| s) {
        return Ok(vec![false; mesh.num_faces()]);
    }

    let mut neighbours: HashMap<usize, HashSet<usize>> = HashMap::new();
    for v in selected(selection) {
        let ring = mesh.vertex_neighbors(VertexId::new(v)).map(|n| n.index()).collect();
        neighbours.insert(v, ring);
    }

    let mut soup = mesh.to_soup();
    let holes = unmatched_edges(&soup.faces);
    let faces = std::mem::take(&mut soup.faces);
    soup.faces = faces
        .into_iter()
        .filter_map(|face| {
            let mut face: Vec<usize> = face.into_iter().filter(|&v| !selection[v]).collect();
            dedupe_loop(&mut face);
            (face.len() >= 3).then_some(face)
        })
        .collect();

    let patches = find_patches(
        &soup.faces,
        |a, b| {
            !holes.contains(&(a, b)) && neighbours.values().any(|ring| ring.contains(&a) && ring.contains(&b))
        },
        OP,
    )?;
    let first = soup.faces.len();
    soup.faces.extend(patches.closed);
    soup.faces.extend(patches.open.into_iter().filter(|c| c.len() >= 3));
    let count = soup.faces.len() - first;

    rebuild(mesh, &soup, OP)?;
    Ok(face_mask(mesh.num_faces(), first..first + count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, FaceId};

    fn edge_mask_for(mesh: &PolyMesh, pairs: &[(usize, usize)]) -> Vec<bool> {
        let mut sel = vec![false; mesh.num_edges()];
        for &(a, b) in pairs {
            let e = mesh.find_edge(VertexId::new(a), VertexId::new(b)).unwrap();
            sel[e.index()] = true;
        }
        sel
    }

    #[test]
    fn test_collapse_cube_edge() {
        let mut mesh: PolyMesh = shapes::cube(2.0);
        let sel = edge_mask_for(&mesh, &[(0, 1)]);
        collapse_edges(&mut mesh, &sel, MergePoint::Center).unwrap();
        assert_eq!(mesh.num_vertices(), 7);
        assert_eq!(mesh.num_faces(), 6);
        assert!(mesh.is_valid());
        let p = mesh.position(VertexId::new(0));
        assert!(p.x.abs() < 1e-12);
    }

    #[test]
    fn test_collapse_merge_point() {
        let base: PolyMesh = shapes::cube(2.0);
        let sel = edge_mask_for(&base, &[(0, 1)]);

        let mut first = base.duplicate();
        collapse_edges(&mut first, &sel, MergePoint::First).unwrap();
        assert_eq!(first.position(VertexId::new(0)), base.position(VertexId::new(0)));

        let mut last = base.duplicate();
        collapse_edges(&mut last, &sel, MergePoint::Last).unwrap();
        assert_eq!(last.position(VertexId::new(0)), base.position(VertexId::new(1)));
    }

    #[test]
    fn test_collapse_top_face_makes_pyramid() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let mut sel = vec![false; 6];
        sel[1] = true;
        collapse_faces(&mut mesh, &sel).unwrap();
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 5);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_collapse_all_faces_is_illegal() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let before = mesh.duplicate();
        let err = collapse_faces(&mut mesh, &[true; 6]).unwrap_err();
        assert!(err.is_illegal_operation());
        assert!(mesh.structurally_eq(&before));
    }

    #[test]
    fn test_collapse_interior_vertex() {
        let mut mesh: PolyMesh = shapes::grid(2, 2, 1.0);
        let mut sel = vec![false; 9];
        sel[4] = true;
        collapse_vertices(&mut mesh, &sel).unwrap();
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.face_degree(FaceId::new(0)), 8);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_collapse_boundary_vertex() {
        let mut mesh: PolyMesh = shapes::grid(2, 1, 1.0);
        let mut sel = vec![false; 6];
        sel[1] = true;
        collapse_vertices(&mut mesh, &sel).unwrap();
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 1);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_facet_cube_corner() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let mut sel = vec![false; 8];
        sel[0] = true;
        let caps = facet_vertices(&mut mesh, &sel).unwrap();
        assert_eq!(mesh.num_vertices(), 7);
        assert_eq!(mesh.num_faces(), 7);
        assert!(mesh.is_valid());
        let cap = caps.iter().position(|&s| s).unwrap();
        assert_eq!(mesh.face_degree(FaceId::new(cap)), 3);
    }

    #[test]
    fn test_trace_single_loop() {
        assert_eq!(trace_single_loop(&[(1, 2), (2, 3), (3, 1)], "t").unwrap().len(), 3);
        assert_eq!(trace_single_loop(&[(2, 5), (5, 4)], "t").unwrap(), vec![2, 5, 4]);
        assert!(trace_single_loop(&[(1, 2), (2, 1), (3, 4), (4, 3)], "t").is_err());
    }
}

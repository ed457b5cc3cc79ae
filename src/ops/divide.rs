//! Edge division and face splitting.

use std::collections::HashMap;

use super::{check_selection, edge_mask, rebuild, selected, vertex_mask};
use crate::error::{MeshError, Result};
use crate::mesh::{edge_key, EdgeId, MeshIndex, PolyMesh, VertexAttrs};

/// Split each selected edge into `segments` equal pieces.
///
/// Both faces of an edge receive the new vertices, and each piece inherits
/// the smoothness and seam flag of the edge it came from. Returns the new
/// vertices as a vertex selection.
pub fn divide_edges<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool], segments: usize) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    if segments == 0 {
        return Err(MeshError::invalid_param("segments", "0", "must be at least 1"));
    }
    if segments == 1 || !selection.iter().any(|&s| s) {
        return Ok(vec![false; mesh.num_vertices()]);
    }

    let mut soup = mesh.to_soup();
    // Inner points of each divided edge, running from the lower vertex index.
    let mut inner: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for e in selected(selection) {
        let [a, b] = mesh.edge_vertices(EdgeId::new(e));
        let (lo, hi) = edge_key(a.index(), b.index());
        let attrs = soup.edge_attrs(lo, hi);
        let (p, q) = (soup.positions[lo], soup.positions[hi]);
        let points: Vec<usize> = (1..segments)
            .map(|k| soup.add_vertex(p + (q - p) * (k as f64 / segments as f64), VertexAttrs::default()))
            .collect();

        soup.edges.remove(&(lo, hi));
        let chain: Vec<usize> = std::iter::once(lo).chain(points.iter().copied()).chain(std::iter::once(hi)).collect();
        for pair in chain.windows(2) {
            soup.set_edge_attrs(pair[0], pair[1], attrs);
        }
        inner.insert((lo, hi), points);
    }

    for face in &mut soup.faces {
        let k = face.len();
        let mut out = Vec::with_capacity(k + inner.len() * (segments - 1));
        for i in 0..k {
            let (a, b) = (face[i], face[(i + 1) % k]);
            out.push(a);
            if let Some(points) = inner.get(&edge_key(a, b)) {
                if a < b {
                    out.extend(points.iter().copied());
                } else {
                    out.extend(points.iter().rev().copied());
                }
            }
        }
        *face = out;
    }

    let added: Vec<usize> = inner.values().flatten().copied().collect();
    let remap = rebuild(mesh, &soup, "divide edges")?;
    Ok(vertex_mask(mesh.num_vertices(), &remap, added))
}

/// Split faces along new edges between their selected vertices.
///
/// Two selected corners of a face that are not already neighbours split it
/// in two. Three or more selected corners cut an inner polygon through them,
/// leaving pieces between consecutive corners around the outside. Returns the
/// new edges as an edge selection.
pub fn connect_vertices<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_vertices())?;
    let mut soup = mesh.to_soup();
    let mut new_edges = Vec::new();
    let mut appended = Vec::new();

    for face in &mut soup.faces {
        let k = face.len();
        let corners: Vec<usize> = (0..k).filter(|&i| selection[face[i]]).collect();
        if corners.len() < 2 {
            continue;
        }
        let adjacent = |i: usize, j: usize| (i + 1) % k == j || (j + 1) % k == i;
        let walk = |from: usize, to: usize| -> Vec<usize> {
            let mut piece = vec![face[from]];
            let mut i = from;
            while i != to {
                i = (i + 1) % k;
                piece.push(face[i]);
            }
            piece
        };

        if corners.len() == 2 {
            let (i, j) = (corners[0], corners[1]);
            if adjacent(i, j) {
                continue;
            }
            let first = walk(i, j);
            let second = walk(j, i);
            new_edges.push((face[i], face[j]));
            *face = first;
            appended.push(second);
            continue;
        }

        let m = corners.len();
        let mut pieces = Vec::new();
        for t in 0..m {
            let (i, j) = (corners[t], corners[(t + 1) % m]);
            if !adjacent(i, j) {
                new_edges.push((face[i], face[j]));
                pieces.push(walk(i, j));
            }
        }
        if pieces.is_empty() {
            continue;
        }
        let inner: Vec<usize> = corners.iter().map(|&i| face[i]).collect();
        *face = inner;
        appended.extend(pieces);
    }
    soup.faces.extend(appended);

    if new_edges.is_empty() {
        return Ok(vec![false; mesh.num_edges()]);
    }
    let remap = rebuild(mesh, &soup, "connect vertices")?;
    Ok(edge_mask(mesh, &remap, new_edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, FaceId, VertexId};

    fn select_edge(mesh: &PolyMesh, a: usize, b: usize) -> Vec<bool> {
        let mut sel = vec![false; mesh.num_edges()];
        sel[mesh.find_edge(VertexId::new(a), VertexId::new(b)).unwrap().index()] = true;
        sel
    }

    #[test]
    fn test_divide_edge_in_two() {
        let mut mesh: PolyMesh = shapes::grid(1, 1, 2.0);
        let sel = select_edge(&mesh, 0, 1);
        let out = divide_edges(&mut mesh, &sel, 2).unwrap();
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.face_degree(FaceId::new(0)), 5);
        assert_eq!(out, vec![false, false, false, false, true]);
        let mid = mesh.position(VertexId::new(4));
        assert!((mid.x - 1.0).abs() < 1e-12 && mid.y.abs() < 1e-12);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_divide_shared_edge() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let sel = select_edge(&mesh, 0, 1);
        let e = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        mesh.set_smoothness(e, 0.25);
        divide_edges(&mut mesh, &sel, 3).unwrap();
        assert_eq!(mesh.num_vertices(), 10);
        assert_eq!(mesh.num_edges(), 14);
        assert!(mesh.is_valid());
        let piece = mesh.find_edge(VertexId::new(0), VertexId::new(8)).unwrap();
        assert_eq!(mesh.smoothness(mesh.edge_halfedge(piece)), 0.25);
    }

    #[test]
    fn test_divide_segment_count() {
        let mut mesh: PolyMesh = shapes::grid(1, 1, 1.0);
        let sel = select_edge(&mesh, 0, 1);
        assert!(divide_edges(&mut mesh, &sel, 0).is_err());
        let before = mesh.duplicate();
        divide_edges(&mut mesh, &sel, 1).unwrap();
        assert!(mesh.structurally_eq(&before));
    }

    #[test]
    fn test_connect_diagonal() {
        let mut mesh: PolyMesh = shapes::grid(1, 1, 1.0);
        let out = connect_vertices(&mut mesh, &[true, false, true, false]).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.is_triangle_mesh());
        assert_eq!(out.iter().filter(|&&s| s).count(), 1);
        let diagonal = mesh.find_edge(VertexId::new(0), VertexId::new(2)).unwrap();
        assert!(out[diagonal.index()]);
    }

    #[test]
    fn test_connect_neighbours_is_noop() {
        let mut mesh: PolyMesh = shapes::grid(1, 1, 1.0);
        let before = mesh.duplicate();
        let out = connect_vertices(&mut mesh, &[true, true, false, false]).unwrap();
        assert!(mesh.structurally_eq(&before));
        assert!(out.iter().all(|&s| !s));
    }

    #[test]
    fn test_connect_inner_polygon() {
        let mut mesh: PolyMesh = shapes::polygon(8, 1.0);
        let sel: Vec<bool> = (0..8).map(|i| i % 2 == 0).collect();
        let out = connect_vertices(&mut mesh, &sel).unwrap();
        assert_eq!(mesh.num_faces(), 5);
        assert_eq!(mesh.face_degree(FaceId::new(0)), 4);
        assert_eq!(out.iter().filter(|&&s| s).count(), 4);
        assert!(mesh.is_valid());
    }
}

//! Edge loops, edge rings and hole outlines.

use std::collections::HashSet;

use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, MeshIndex, PolyMesh};
use crate::ops::check_selection;

/// Extend each selected edge into its edge loop.
///
/// The walk passes straight through interior vertices with exactly four
/// edges, leaving by the edge opposite the one it arrived on, and stops at
/// holes, at vertices of any other valence and when the loop closes.
pub fn find_edge_loops<I: MeshIndex>(mesh: &PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    let mut out = selection.to_vec();
    let seeds: Vec<usize> = (0..selection.len()).filter(|&e| selection[e]).collect();
    for e in seeds {
        let he = mesh.edge_halfedge(EdgeId::new(e));
        for start in [he, mesh.twin(he)] {
            let mut h = start;
            loop {
                let v = mesh.target(h);
                if mesh.is_boundary_vertex(v) {
                    break;
                }
                let fan: Vec<_> = mesh.vertex_halfedges(v).take(5).collect();
                if fan.len() != 4 {
                    break;
                }
                let back = mesh.twin(h);
                let Some(k) = fan.iter().position(|&f| f == back) else {
                    break;
                };
                let ahead = fan[(k + 2) % 4];
                let edge = mesh.edge_of(ahead).index();
                if out[edge] {
                    break;
                }
                out[edge] = true;
                h = ahead;
            }
        }
    }
    Ok(out)
}

/// Extend each selected edge into its edge ring, keeping every `width`-th
/// edge.
///
/// The ring crosses quads to the opposite edge on both sides of the seed and
/// stops at holes and at faces that are not quads.
pub fn find_edge_strips<I: MeshIndex>(mesh: &PolyMesh<I>, selection: &[bool], width: usize) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    if width == 0 {
        return Err(MeshError::invalid_param("width", width, "must be at least 1"));
    }
    let mut out = selection.to_vec();
    for e in (0..selection.len()).filter(|&e| selection[e]) {
        let he = mesh.edge_halfedge(EdgeId::new(e));
        for side in [he, mesh.twin(he)] {
            let mut visited = HashSet::from([e]);
            let mut h = side;
            let mut step = 0;
            loop {
                let f = mesh.face_of(h);
                if !f.is_valid() || mesh.face_degree(f) != 4 {
                    break;
                }
                let opposite = mesh.next(mesh.next(h));
                let edge = mesh.edge_of(opposite).index();
                if !visited.insert(edge) {
                    break;
                }
                step += 1;
                if step % width == 0 {
                    out[edge] = true;
                }
                h = mesh.twin(opposite);
            }
        }
    }
    Ok(out)
}

/// Select whole holes.
///
/// Every hole touched by a selected edge, or by an endpoint of one, is
/// selected completely. With nothing selected, every hole edge is selected.
pub fn boundary_selection<I: MeshIndex>(mesh: &PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    let mut out = vec![false; mesh.num_edges()];
    let any = selection.iter().any(|&s| s);
    let mut touched = HashSet::new();
    for e in (0..selection.len()).filter(|&e| selection[e]) {
        touched.extend(mesh.edge_vertices(EdgeId::new(e)));
    }
    for ring in mesh.boundary_loops() {
        let hit = !any
            || ring
                .iter()
                .any(|&he| selection[mesh.edge_of(he).index()] || touched.contains(&mesh.origin(he)));
        if hit {
            for he in ring {
                out[mesh.edge_of(he).index()] = true;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, VertexId};
    use crate::select::count_selected;

    fn pick(mesh: &PolyMesh, a: usize, b: usize) -> Vec<bool> {
        let mut sel = vec![false; mesh.num_edges()];
        sel[mesh.find_edge(VertexId::new(a), VertexId::new(b)).unwrap().index()] = true;
        sel
    }

    #[test]
    fn test_edge_loop_across_grid() {
        let mesh: PolyMesh = shapes::grid(3, 3, 1.0);
        let out = find_edge_loops(&mesh, &pick(&mesh, 5, 6)).unwrap();
        assert_eq!(count_selected(&out), 3);
        let e = mesh.find_edge(VertexId::new(4), VertexId::new(5)).unwrap();
        assert!(out[e.index()]);
        let e = mesh.find_edge(VertexId::new(6), VertexId::new(7)).unwrap();
        assert!(out[e.index()]);
    }

    #[test]
    fn test_edge_loop_stops_at_valence_three() {
        let mesh: PolyMesh = shapes::cube(1.0);
        let out = find_edge_loops(&mesh, &pick(&mesh, 0, 1)).unwrap();
        assert_eq!(count_selected(&out), 1);
    }

    #[test]
    fn test_edge_loop_closes_on_cylinder() {
        let mesh: PolyMesh = shapes::cylinder(6, 1.0, 1.0, true);
        let extruded = {
            let mut m = mesh.duplicate();
            let mut caps = vec![false; m.num_faces()];
            caps[6] = true;
            crate::ops::extrude_faces(&mut m, &caps, &crate::ops::ExtrudeOptions::default()).unwrap();
            m
        };
        // Ring edges between the original top ring and the extruded one have
        // valence-four ends all the way round.
        let out = find_edge_loops(&extruded, &pick(&extruded, 6, 7)).unwrap();
        assert_eq!(count_selected(&out), 6);
    }

    #[test]
    fn test_long_loop_on_dense_grid() {
        let n = 60;
        let mesh: PolyMesh = shapes::grid(n, n, 1.0);
        // Horizontal edge on the middle row of vertices.
        let row = n / 2 * (n + 1);
        let out = find_edge_loops(&mesh, &pick(&mesh, row + 10, row + 11)).unwrap();
        assert_eq!(count_selected(&out), n);
        for i in 0..n {
            let e = mesh.find_edge(VertexId::new(row + i), VertexId::new(row + i + 1)).unwrap();
            assert!(out[e.index()]);
        }
    }

    #[test]
    fn test_edge_strip_width() {
        let mesh: PolyMesh = shapes::grid(3, 1, 1.0);
        let out = find_edge_strips(&mesh, &pick(&mesh, 1, 5), 1).unwrap();
        assert_eq!(count_selected(&out), 4);
        let out = find_edge_strips(&mesh, &pick(&mesh, 1, 5), 2).unwrap();
        assert_eq!(count_selected(&out), 2);
        let e = mesh.find_edge(VertexId::new(3), VertexId::new(7)).unwrap();
        assert!(out[e.index()]);
        assert!(find_edge_strips(&mesh, &pick(&mesh, 1, 5), 0).is_err());
    }

    #[test]
    fn test_boundary_selection() {
        let mesh: PolyMesh = shapes::cylinder(5, 1.0, 1.0, false);
        let all = boundary_selection(&mesh, &vec![false; mesh.num_edges()]).unwrap();
        assert_eq!(count_selected(&all), 10);
        let bottom = boundary_selection(&mesh, &pick(&mesh, 0, 1)).unwrap();
        assert_eq!(count_selected(&bottom), 5);
        // A wall edge touches both holes through its endpoints.
        let both = boundary_selection(&mesh, &pick(&mesh, 0, 5)).unwrap();
        assert_eq!(count_selected(&both), 10);
    }
}

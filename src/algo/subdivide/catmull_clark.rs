//! One refinement step of the smoothness-aware Catmull-Clark scheme.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::error::Result;
use crate::mesh::{
    EdgeAttrs, EdgeId, FaceId, MeshIndex, PolyMesh, PolygonSoup, VertexAttrs, VertexId, VertexKind,
};

/// Result of a single refinement step.
pub(crate) struct Refinement<I: MeshIndex> {
    pub mesh: PolyMesh<I>,
    /// Control face each child quad was cut from.
    pub face_parent: Vec<usize>,
}

/// Split every face of `mesh` into quads, one per corner.
///
/// The child mesh lays out its vertices as original vertices first, then one
/// face point per face, then one edge point per edge. Child quad `k` of face
/// `f` is the corner at the `k`-th vertex of `f`.
///
/// # Vertex Rules
///
/// - **Face point**: centroid of the face.
/// - **Edge point**: `s * (a + b + F1 + F2) / 4 + (1 - s) * (a + b) / 2` for
///   an edge of smoothness `s`; hole edges use the midpoint.
/// - **Vertex point**: corners stay put. Hole vertices with two hole edges
///   use `3/4 v + 1/8 (l + r)`. Interior vertices blend the smooth rule
///   `(Q + 2R + (n-3)v) / n` with the crease rule (two creased edges) or a
///   fixed point (three or more), weighted by the mean sharpness `1 - s` of
///   their creased edges.
///
/// With `interpolate` set, original vertices keep their positions and only
/// the inserted points are smoothed.
pub(crate) fn refine_once<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    interpolate: bool,
    parallel: bool,
) -> Result<Refinement<I>> {
    let nv = mesh.num_vertices();
    let nf = mesh.num_faces();
    let ne = mesh.num_edges();

    let face_points: Vec<Point3<f64>> = if parallel {
        (0..nf).into_par_iter().map(|f| mesh.face_centroid(FaceId::new(f))).collect()
    } else {
        (0..nf).map(|f| mesh.face_centroid(FaceId::new(f))).collect()
    };

    let edge_points: Vec<Point3<f64>> = if parallel {
        (0..ne)
            .into_par_iter()
            .map(|e| edge_point(mesh, EdgeId::new(e), &face_points))
            .collect()
    } else {
        (0..ne).map(|e| edge_point(mesh, EdgeId::new(e), &face_points)).collect()
    };

    let vertex_points: Vec<Point3<f64>> = if parallel {
        (0..nv)
            .into_par_iter()
            .map(|v| vertex_point(mesh, VertexId::new(v), &face_points, interpolate))
            .collect()
    } else {
        (0..nv)
            .map(|v| vertex_point(mesh, VertexId::new(v), &face_points, interpolate))
            .collect()
    };

    let mut soup = PolygonSoup::default();
    for v in mesh.vertex_ids() {
        let vertex = mesh.vertex(v);
        soup.add_vertex(
            vertex_points[v.index()],
            VertexAttrs {
                kind: vertex.kind,
                skin: vertex.skin,
            },
        );
    }
    for p in face_points {
        soup.add_vertex(p, VertexAttrs::default());
    }
    for p in edge_points {
        soup.add_vertex(p, VertexAttrs::default());
    }
    let face_vertex = |f: usize| nv + f;
    let edge_vertex = |e: EdgeId<I>| nv + nf + e.index();

    // Halves of a control edge keep its smoothness and seam.
    for e in mesh.edge_ids() {
        let attrs = EdgeAttrs {
            smoothness: mesh.smoothness(mesh.edge_halfedge(e)),
            seam: mesh.is_seam(e),
        };
        let mid = edge_vertex(e);
        for v in mesh.edge_vertices(e) {
            soup.set_edge_attrs(v.index(), mid, attrs);
        }
    }

    let mut face_parent = Vec::with_capacity(mesh.num_halfedges());
    for f in mesh.face_ids() {
        let fp = face_vertex(f.index());
        for h in mesh.face_halfedges(f) {
            let hn = mesh.next(h);
            soup.faces.push(vec![
                mesh.target(h).index(),
                edge_vertex(mesh.edge_of(hn)),
                fp,
                edge_vertex(mesh.edge_of(h)),
            ]);
            face_parent.push(f.index());
        }
    }

    Ok(Refinement {
        mesh: soup.build()?,
        face_parent,
    })
}

fn edge_point<I: MeshIndex>(mesh: &PolyMesh<I>, e: EdgeId<I>, face_points: &[Point3<f64>]) -> Point3<f64> {
    let he = mesh.edge_halfedge(e);
    let mid = mesh.edge_midpoint(he);
    let (f0, f1) = (mesh.face_of(he), mesh.face_of(mesh.twin(he)));
    if !f0.is_valid() || !f1.is_valid() {
        return mid;
    }
    let [a, b] = mesh.edge_vertices(e);
    let smooth = (mesh.position(a).coords
        + mesh.position(b).coords
        + face_points[f0.index()].coords
        + face_points[f1.index()].coords)
        / 4.0;
    let s = mesh.smoothness(he) as f64;
    Point3::from(smooth * s + mid.coords * (1.0 - s))
}

fn vertex_point<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    v: VertexId<I>,
    face_points: &[Point3<f64>],
    interpolate: bool,
) -> Point3<f64> {
    let p = *mesh.position(v);
    if interpolate || mesh.vertex(v).kind == VertexKind::Corner {
        return p;
    }

    let fan: Vec<_> = mesh.vertex_halfedges(v).collect();
    if mesh.is_boundary_vertex(v) {
        let rim: Vec<Point3<f64>> = fan
            .iter()
            .filter(|&&he| mesh.is_boundary_edge(mesh.edge_of(he)))
            .map(|&he| *mesh.position(mesh.target(he)))
            .collect();
        return match rim.as_slice() {
            [l, r] => Point3::from(p.coords * 0.75 + (l.coords + r.coords) * 0.125),
            _ => p,
        };
    }

    let n = fan.len();
    if n < 3 {
        return p;
    }
    let mut q = Vector3::zeros();
    let mut r = Vector3::zeros();
    let mut creases = Vec::new();
    for &he in &fan {
        q += face_points[mesh.face_of(he).index()].coords;
        r += mesh.edge_midpoint(he).coords;
        let s = mesh.smoothness(he);
        if s < 1.0 {
            creases.push((mesh.target(he), 1.0 - s as f64));
        }
    }
    let nf = n as f64;
    let smooth = (q / nf + r / nf * 2.0 + p.coords * (nf - 3.0)) / nf;

    let sharp = match creases.as_slice() {
        [] | [_] => return Point3::from(smooth),
        [(a, _), (b, _)] => p.coords * 0.75 + (mesh.position(*a).coords + mesh.position(*b).coords) * 0.125,
        _ => p.coords,
    };
    let sigma = creases.iter().map(|(_, w)| w).sum::<f64>() / creases.len() as f64;
    Point3::from(smooth * (1.0 - sigma) + sharp * sigma)
}

//! Mesh construction.
//!
//! All topology changes go through a [`PolygonSoup`]: a face-vertex list with
//! per-vertex and per-edge attributes. Operators convert a mesh to a soup,
//! edit the plain lists, and build a fresh [`PolyMesh`] from the result. A
//! failed build leaves nothing behind, so the caller's mesh is only replaced
//! once the new topology is known to be sound.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{Face, HalfEdge, PolyMesh, SkinWeight, Vertex, VertexKind};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Per-vertex attributes carried through a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexAttrs {
    /// Corner flag.
    pub kind: VertexKind,
    /// Skeleton binding.
    pub skin: Option<SkinWeight>,
}

/// Per-edge attributes carried through a rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeAttrs {
    /// Crease control in `[0, 1]`.
    pub smoothness: f32,
    /// Unfold seam flag.
    pub seam: bool,
}

impl Default for EdgeAttrs {
    fn default() -> Self {
        Self {
            smoothness: 1.0,
            seam: false,
        }
    }
}

/// Undirected key for an edge between two vertex indices.
#[inline]
pub fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Face-vertex description of a mesh.
#[derive(Debug, Clone, Default)]
pub struct PolygonSoup {
    /// Vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// Vertex attributes, parallel to `positions`.
    pub attrs: Vec<VertexAttrs>,
    /// Faces as vertex index loops, counter-clockwise seen from outside.
    pub faces: Vec<Vec<usize>>,
    /// Edge attributes keyed by [`edge_key`]. Missing edges use the default.
    pub edges: HashMap<(usize, usize), EdgeAttrs>,
}

impl PolygonSoup {
    /// Create a soup from positions and faces with default attributes.
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> Self {
        let attrs = vec![VertexAttrs::default(); positions.len()];
        Self {
            positions,
            attrs,
            faces,
            edges: HashMap::new(),
        }
    }

    /// Append a vertex and return its index.
    pub fn add_vertex(&mut self, position: Point3<f64>, attrs: VertexAttrs) -> usize {
        self.positions.push(position);
        self.attrs.push(attrs);
        self.positions.len() - 1
    }

    /// Attributes of the edge between `a` and `b`.
    pub fn edge_attrs(&self, a: usize, b: usize) -> EdgeAttrs {
        self.edges.get(&edge_key(a, b)).copied().unwrap_or_default()
    }

    /// Set the attributes of the edge between `a` and `b`.
    pub fn set_edge_attrs(&mut self, a: usize, b: usize, attrs: EdgeAttrs) {
        self.edges.insert(edge_key(a, b), attrs);
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Build a mesh, dropping vertices no face references.
    pub fn build<I: MeshIndex>(&self) -> Result<PolyMesh<I>> {
        self.build_with_map().map(|(mesh, _)| mesh)
    }

    /// Build a mesh and report where each soup vertex ended up.
    ///
    /// The returned map holds, for every soup vertex, its index in the new
    /// mesh or `None` if it was dropped as unreferenced. Surviving vertices
    /// keep their relative order.
    pub fn build_with_map<I: MeshIndex>(&self) -> Result<(PolyMesh<I>, Vec<Option<usize>>)> {
        if self.faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        let n = self.positions.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(MeshError::DegenerateFace { face: fi });
            }
            for (i, &v) in face.iter().enumerate() {
                if v >= n {
                    return Err(MeshError::InvalidVertexIndex { face: fi, vertex: v });
                }
                if face[..i].contains(&v) {
                    return Err(MeshError::DegenerateFace { face: fi });
                }
            }
        }

        // Compact
        let mut remap = vec![None; n];
        let mut used = vec![false; n];
        for face in &self.faces {
            for &v in face {
                used[v] = true;
            }
        }
        let mut mesh = PolyMesh::<I>::new();
        let mut source = Vec::new();
        for (old, &keep) in used.iter().enumerate() {
            if keep {
                remap[old] = Some(mesh.vertices.len());
                source.push(old);
                let mut vertex = Vertex::new(self.positions[old]);
                let attrs = self.attrs.get(old).copied().unwrap_or_default();
                vertex.kind = attrs.kind;
                vertex.skin = attrs.skin;
                mesh.vertices.push(vertex);
            }
        }
        let faces: Vec<Vec<usize>> = self
            .faces
            .iter()
            .map(|face| face.iter().filter_map(|&v| remap[v]).collect())
            .collect();

        // Directed edges, each used at most once.
        let mut directed: HashMap<(usize, usize), usize> = HashMap::new();
        for (fi, face) in faces.iter().enumerate() {
            let k = face.len();
            for i in 0..k {
                let key = (face[i], face[(i + 1) % k]);
                if directed.insert(key, fi).is_some() {
                    return Err(MeshError::NonManifold {
                        details: format!(
                            "edge ({}, {}) is used twice in the same direction",
                            key.0, key.1
                        ),
                    });
                }
            }
        }

        // Assign edge pairs in face order.
        let mut pair_of: HashMap<(usize, usize), usize> = HashMap::new();
        let mut first_dir: Vec<(usize, usize)> = Vec::new();
        for face in &faces {
            let k = face.len();
            for i in 0..k {
                let (a, b) = (face[i], face[(i + 1) % k]);
                if let Entry::Vacant(slot) = pair_of.entry(edge_key(a, b)) {
                    slot.insert(first_dir.len());
                    first_dir.push((a, b));
                }
            }
        }
        let ne = first_dir.len();
        mesh.halfedges = vec![HalfEdge::new(); 2 * ne];
        mesh.seams = vec![false; ne];

        // Half-edge index of directed edge (a, b).
        let directed_he = |a: usize, b: usize| -> usize {
            let pair = pair_of[&edge_key(a, b)];
            if first_dir[pair] == (a, b) {
                pair
            } else {
                pair + ne
            }
        };

        for (k, &(a, b)) in first_dir.iter().enumerate() {
            let attrs = self.edge_attrs(source[a], source[b]);
            let s = attrs.smoothness.clamp(0.0, 1.0);
            mesh.seams[k] = attrs.seam;
            let (fwd, back) = (k, k + ne);
            mesh.halfedges[fwd].vertex = VertexId::new(b);
            mesh.halfedges[fwd].twin = HalfEdgeId::new(back);
            mesh.halfedges[fwd].smoothness = s;
            mesh.halfedges[back].vertex = VertexId::new(a);
            mesh.halfedges[back].twin = HalfEdgeId::new(fwd);
            mesh.halfedges[back].smoothness = s;
            if let Some(&f) = directed.get(&(b, a)) {
                mesh.halfedges[back].face = FaceId::new(f);
            }
            mesh.halfedges[fwd].face = FaceId::new(directed[&(a, b)]);
        }

        // Face loops
        for face in &faces {
            let k = face.len();
            let loop_he: Vec<usize> = (0..k).map(|i| directed_he(face[i], face[(i + 1) % k])).collect();
            for i in 0..k {
                mesh.halfedges[loop_he[i]].next = HalfEdgeId::new(loop_he[(i + 1) % k]);
            }
            mesh.faces.push(Face::new(HalfEdgeId::new(loop_he[k - 1])));
        }

        // Hole loops: a boundary half-edge continues with the boundary
        // half-edge leaving its target.
        let mut boundary_out: Vec<Option<usize>> = vec![None; mesh.vertices.len()];
        for he in 0..2 * ne {
            if mesh.halfedges[he].is_boundary() {
                let origin = mesh.halfedges[mesh.halfedges[he].twin.index()].vertex.index();
                if boundary_out[origin].replace(he).is_some() {
                    return Err(MeshError::NonManifold {
                        details: format!("vertex {} touches more than one hole corner", origin),
                    });
                }
            }
        }
        for he in 0..2 * ne {
            if mesh.halfedges[he].is_boundary() {
                let target = mesh.halfedges[he].vertex.index();
                let Some(out) = boundary_out[target] else {
                    return Err(MeshError::NonManifold {
                        details: format!("hole at vertex {} does not continue", target),
                    });
                };
                mesh.halfedges[he].next = HalfEdgeId::new(out);
            }
        }

        // Reference edges, boundary first.
        for he in 0..2 * ne {
            let origin = mesh.halfedges[mesh.halfedges[he].twin.index()].vertex.index();
            if !mesh.vertices[origin].edge.is_valid() {
                mesh.vertices[origin].edge = HalfEdgeId::new(he);
            }
        }
        for (v, out) in boundary_out.iter().enumerate() {
            if let Some(he) = out {
                mesh.vertices[v].edge = HalfEdgeId::new(*he);
            }
        }

        // Every outgoing edge must be reachable from the fan walk.
        let mut outgoing = vec![0usize; mesh.vertices.len()];
        for he in &mesh.halfedges {
            outgoing[he.vertex.index()] += 1;
        }
        for v in 0..mesh.vertices.len() {
            let fan = mesh.vertex_halfedges(VertexId::new(v)).take(2 * ne + 1).count();
            if fan != outgoing[v] {
                return Err(MeshError::NonManifold {
                    details: format!("faces around vertex {} do not form a single fan", v),
                });
            }
        }

        Ok((mesh, remap))
    }
}

impl<I: MeshIndex> PolyMesh<I> {
    /// Face-vertex copy of this mesh with all vertex and edge attributes.
    pub fn to_soup(&self) -> PolygonSoup {
        let positions = self.positions();
        let attrs = self
            .vertices
            .iter()
            .map(|v| VertexAttrs {
                kind: v.kind,
                skin: v.skin,
            })
            .collect();
        let faces = self
            .face_ids()
            .map(|f| self.face_vertices(f).map(|v| v.index()).collect())
            .collect();
        let mut edges = HashMap::with_capacity(self.num_edges());
        for e in self.edge_ids() {
            let [a, b] = self.edge_vertices(e);
            edges.insert(
                edge_key(a.index(), b.index()),
                EdgeAttrs {
                    smoothness: self.smoothness(self.edge_halfedge(e)),
                    seam: self.is_seam(e),
                },
            );
        }
        PolygonSoup {
            positions,
            attrs,
            faces,
            edges,
        }
    }
}

/// Build a mesh from vertex positions and polygon faces.
///
/// # Example
/// ```
/// use polymesh::mesh::{build_from_polygons, PolyMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh: PolyMesh = build_from_polygons(&vertices, &[vec![0, 1, 2, 3]]).unwrap();
/// assert_eq!(mesh.num_faces(), 1);
/// assert_eq!(mesh.num_edges(), 4);
/// ```
pub fn build_from_polygons<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[Vec<usize>],
) -> Result<PolyMesh<I>> {
    PolygonSoup::new(vertices.to_vec(), faces.to_vec()).build()
}

/// Build a mesh from vertices and triangle faces.
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<PolyMesh<I>> {
    let faces: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    build_from_polygons(vertices, &faces)
}

/// Build a mesh from vertices and quad faces.
pub fn build_from_quads<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 4]],
) -> Result<PolyMesh<I>> {
    let faces: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    build_from_polygons(vertices, &faces)
}

/// Extract vertex positions and polygon faces from a mesh.
pub fn to_face_vertex<I: MeshIndex>(mesh: &PolyMesh<I>) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let soup = mesh.to_soup();
    (soup.positions, soup.faces)
}

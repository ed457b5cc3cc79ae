//! Pairing triangles into quads.
//!
//! Triangle meshes coming from other tools are easier to model with once
//! neighbouring triangles are merged back into quads. Candidate pairs are
//! the selected triangles sharing an edge whose union is a convex, nearly
//! flat quad; they are taken greedily, best score first, and every triangle
//! joins at most one quad.

use nalgebra::{Point3, Vector3};

use super::{check_selection, face_mask, rebuild};
use crate::error::Result;
use crate::mesh::{FaceId, MeshIndex, PolyMesh, VertexId};

/// How candidate triangle pairs are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuadPairing {
    /// Remove the longest shared edges first, relative to the quad's sides.
    #[default]
    Distance,
    /// Prefer quads whose corners are closest to right angles.
    Angular,
}

/// Parameters for [`quads_from_triangles`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuadOptions {
    /// Ranking of candidate pairs.
    pub pairing: QuadPairing,
    /// Largest angle between the two triangle normals, in radians.
    pub max_fold: f64,
}

impl Default for QuadOptions {
    fn default() -> Self {
        Self {
            pairing: QuadPairing::Distance,
            max_fold: std::f64::consts::FRAC_PI_6,
        }
    }
}

impl QuadOptions {
    /// Rank candidates by corner angles.
    pub fn angular(mut self) -> Self {
        self.pairing = QuadPairing::Angular;
        self
    }

    /// Set the fold limit.
    pub fn with_max_fold(mut self, max_fold: f64) -> Self {
        self.max_fold = max_fold;
        self
    }
}

struct Candidate {
    keep: usize,
    drop: usize,
    quad: [usize; 4],
    score: f64,
}

/// Merge pairs of selected triangles into quads.
///
/// Faces that are not triangles are ignored. Returns the new quads as a face
/// selection.
pub fn quads_from_triangles<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    selection: &[bool],
    options: &QuadOptions,
) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    let triangle = |f: FaceId<I>| f.is_valid() && selection[f.index()] && mesh.face_degree(f) == 3;
    let min_cos = options.max_fold.cos();

    let mut candidates = Vec::new();
    for e in mesh.edge_ids() {
        let he = mesh.edge_halfedge(e);
        let twin = mesh.twin(he);
        let (f0, f1) = (mesh.face_of(he), mesh.face_of(twin));
        if !triangle(f0) || !triangle(f1) || mesh.face_normal(f0).dot(&mesh.face_normal(f1)) < min_cos {
            continue;
        }
        let (u, v) = (mesh.origin(he), mesh.target(he));
        let (w0, w1) = (mesh.target(mesh.next(he)), mesh.target(mesh.next(twin)));
        if w0 == w1 {
            continue;
        }
        let quad = [u.index(), w1.index(), v.index(), w0.index()];
        let corners = quad.map(|i| *mesh.position(VertexId::new(i)));
        let normal = mesh.face_normal(f0) + mesh.face_normal(f1);
        if !is_convex(&corners, &normal) {
            continue;
        }
        candidates.push(Candidate {
            keep: f0.index().min(f1.index()),
            drop: f0.index().max(f1.index()),
            quad,
            score: score(&corners, options.pairing),
        });
    }
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut soup = mesh.to_soup();
    let mut used = vec![false; soup.faces.len()];
    let mut removed = vec![false; soup.faces.len()];
    let mut merged = Vec::new();
    for c in candidates {
        if used[c.keep] || used[c.drop] {
            continue;
        }
        used[c.keep] = true;
        used[c.drop] = true;
        removed[c.drop] = true;
        soup.faces[c.keep] = c.quad.to_vec();
        merged.push(c.keep);
    }
    if merged.is_empty() {
        return Ok(vec![false; mesh.num_faces()]);
    }

    let mut new_index = vec![usize::MAX; soup.faces.len()];
    let faces: Vec<Vec<usize>> = soup
        .faces
        .drain(..)
        .enumerate()
        .filter(|(f, _)| !removed[*f])
        .enumerate()
        .map(|(i, (f, face))| {
            new_index[f] = i;
            face
        })
        .collect();
    soup.faces = faces;

    rebuild(mesh, &soup, "quads from triangles")?;
    log::debug!("paired {} triangle pairs into quads", merged.len());
    Ok(face_mask(mesh.num_faces(), merged.into_iter().map(|f| new_index[f])))
}

/// Every corner turns the same way about `normal`.
fn is_convex(corners: &[Point3<f64>; 4], normal: &Vector3<f64>) -> bool {
    (0..4).all(|k| {
        let a = corners[(k + 1) % 4] - corners[k];
        let b = corners[(k + 2) % 4] - corners[(k + 1) % 4];
        a.cross(&b).dot(normal) > 1e-12
    })
}

/// Higher is better.
fn score(corners: &[Point3<f64>; 4], pairing: QuadPairing) -> f64 {
    match pairing {
        QuadPairing::Distance => {
            // The removed edge is the diagonal from corner 0 to corner 2.
            let diagonal = (corners[2] - corners[0]).norm();
            let longest_side = (0..4)
                .map(|k| (corners[(k + 1) % 4] - corners[k]).norm())
                .fold(0.0, f64::max);
            if longest_side > 0.0 {
                diagonal / longest_side
            } else {
                0.0
            }
        }
        QuadPairing::Angular => {
            let deviation: f64 = (0..4)
                .map(|k| {
                    let a = corners[(k + 3) % 4] - corners[k];
                    let b = corners[(k + 1) % 4] - corners[k];
                    (a.angle(&b) - std::f64::consts::FRAC_PI_2).abs()
                })
                .sum();
            -deviation
        }
    }
}

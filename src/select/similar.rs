//! Similarity search.
//!
//! Faces and edges are compared with the mean metric of an origin selection.
//! Each criterion has its own tolerance and is skipped when set to `None`;
//! enabled criteria must all match.

use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::error::Result;
use crate::mesh::{EdgeId, FaceId, MeshIndex, PolyMesh};
use crate::ops::check_selection;

/// Face criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSimilarity {
    /// Largest `1 - cos` between a face normal and the mean normal.
    pub normal: Option<f64>,
    /// Largest deviation of the sorted edge-length profile.
    pub loose_shape: Option<f64>,
    /// Largest deviation of the ordered edge-length and angle sequence.
    pub strict_shape: Option<f64>,
}

impl Default for FaceSimilarity {
    fn default() -> Self {
        Self {
            normal: Some(0.01),
            loose_shape: None,
            strict_shape: None,
        }
    }
}

/// Edge criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSimilarity {
    /// Largest length difference, relative to the mean length.
    pub length: Option<f64>,
    /// Largest smoothness difference.
    pub smoothness: Option<f64>,
    /// Largest dihedral angle difference in degrees. Hole edges never match.
    pub dihedral: Option<f64>,
}

impl Default for EdgeSimilarity {
    fn default() -> Self {
        Self {
            length: Some(0.05),
            smoothness: None,
            dihedral: None,
        }
    }
}

/// Tolerances for [`find_similar_faces`] and [`find_similar_edges`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimilarityOptions {
    /// Face criteria.
    pub faces: FaceSimilarity,
    /// Edge criteria.
    pub edges: EdgeSimilarity,
}

impl SimilarityOptions {
    /// Compare face normals within `tolerance`, or not at all.
    pub fn with_normal(mut self, tolerance: Option<f64>) -> Self {
        self.faces.normal = tolerance;
        self
    }

    /// Compare loose face shapes within `tolerance`, or not at all.
    pub fn with_loose_shape(mut self, tolerance: Option<f64>) -> Self {
        self.faces.loose_shape = tolerance;
        self
    }

    /// Compare strict face shapes within `tolerance`, or not at all.
    pub fn with_strict_shape(mut self, tolerance: Option<f64>) -> Self {
        self.faces.strict_shape = tolerance;
        self
    }

    /// Compare edge lengths within `tolerance`, or not at all.
    pub fn with_edge_length(mut self, tolerance: Option<f64>) -> Self {
        self.edges.length = tolerance;
        self
    }

    /// Compare edge smoothness within `tolerance`, or not at all.
    pub fn with_edge_smoothness(mut self, tolerance: Option<f64>) -> Self {
        self.edges.smoothness = tolerance;
        self
    }

    /// Compare dihedral angles within `tolerance` degrees, or not at all.
    pub fn with_dihedral(mut self, tolerance: Option<f64>) -> Self {
        self.edges.dihedral = tolerance;
        self
    }
}

/// Shape description of one face.
struct FaceShape {
    normal: Vector3<f64>,
    /// Edge lengths over the perimeter, ascending.
    loose: Vec<f64>,
    /// Per corner: edge length over perimeter, then interior angle over pi.
    strict: Vec<f64>,
}

fn face_shape<I: MeshIndex>(mesh: &PolyMesh<I>, f: FaceId<I>) -> FaceShape {
    let pts: Vec<_> = mesh.face_vertices(f).map(|v| *mesh.position(v)).collect();
    let k = pts.len();
    let lengths: Vec<f64> = (0..k).map(|i| (pts[(i + 1) % k] - pts[i]).norm()).collect();
    let perimeter: f64 = lengths.iter().sum::<f64>().max(f64::MIN_POSITIVE);

    let mut loose: Vec<f64> = lengths.iter().map(|l| l / perimeter).collect();
    loose.sort_by(f64::total_cmp);

    let mut strict = Vec::with_capacity(2 * k);
    for i in 0..k {
        let a = pts[(i + k - 1) % k] - pts[i];
        let b = pts[(i + 1) % k] - pts[i];
        strict.push(lengths[i] / perimeter);
        strict.push(a.angle(&b) / PI);
    }
    FaceShape {
        normal: mesh.face_normal(f),
        loose,
        strict,
    }
}

fn max_deviation(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

/// Deviation of a strict sequence from `reference` at its best rotation,
/// with that rotation.
fn best_rotation(seq: &[f64], reference: &[f64]) -> (f64, usize) {
    let corners = seq.len() / 2;
    (0..corners.max(1))
        .map(|r| {
            let rotated: Vec<f64> = seq[2 * r..].iter().chain(&seq[..2 * r]).copied().collect();
            (max_deviation(&rotated, reference), r)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .unwrap_or((f64::INFINITY, 0))
}

/// Mean shape of the origin faces with degree `k`, if any.
struct MeanShape {
    degree: usize,
    loose: Vec<f64>,
    strict: Vec<f64>,
}

/// Select every face similar to the mean of the selected faces.
///
/// The origin faces are always part of the result. Shape criteria only
/// match faces whose degree appears among the origin faces.
pub fn find_similar_faces<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    selection: &[bool],
    options: &SimilarityOptions,
) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    let criteria = options.faces;
    let shapes: Vec<FaceShape> = mesh.face_ids().map(|f| face_shape(mesh, f)).collect();
    let origin: Vec<usize> = (0..selection.len()).filter(|&f| selection[f]).collect();
    if origin.is_empty() {
        return Ok(selection.to_vec());
    }

    let normal = origin
        .iter()
        .fold(Vector3::zeros(), |acc, &f| acc + shapes[f].normal)
        .try_normalize(1e-12);

    let mut means: Vec<MeanShape> = Vec::new();
    for &f in &origin {
        let s = &shapes[f];
        let degree = s.loose.len();
        if means.iter().any(|m| m.degree == degree) {
            continue;
        }
        let group: Vec<usize> = origin.iter().copied().filter(|&g| shapes[g].loose.len() == degree).collect();
        let reference = &s.strict;
        let mut loose = vec![0.0; degree];
        let mut strict = vec![0.0; 2 * degree];
        for &g in &group {
            let (_, r) = best_rotation(&shapes[g].strict, reference);
            let seq = &shapes[g].strict;
            for (i, x) in seq[2 * r..].iter().chain(&seq[..2 * r]).enumerate() {
                strict[i] += x / group.len() as f64;
            }
            for (i, x) in shapes[g].loose.iter().enumerate() {
                loose[i] += x / group.len() as f64;
            }
        }
        means.push(MeanShape { degree, loose, strict });
    }

    let out = (0..mesh.num_faces())
        .map(|f| {
            if selection[f] {
                return true;
            }
            let s = &shapes[f];
            if let Some(tol) = criteria.normal {
                let Some(n) = normal else {
                    return false;
                };
                if 1.0 - s.normal.dot(&n) > tol {
                    return false;
                }
            }
            if criteria.loose_shape.is_none() && criteria.strict_shape.is_none() {
                return true;
            }
            let Some(mean) = means.iter().find(|m| m.degree == s.loose.len()) else {
                return false;
            };
            if let Some(tol) = criteria.loose_shape {
                if max_deviation(&s.loose, &mean.loose) > tol {
                    return false;
                }
            }
            if let Some(tol) = criteria.strict_shape {
                if best_rotation(&s.strict, &mean.strict).0 > tol {
                    return false;
                }
            }
            true
        })
        .collect();
    Ok(out)
}

/// Select every edge similar to the mean of the selected edges.
///
/// The origin edges are always part of the result.
pub fn find_similar_edges<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    selection: &[bool],
    options: &SimilarityOptions,
) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    let criteria = options.edges;
    let origin: Vec<EdgeId<I>> = mesh.edge_ids().filter(|e| selection[e.index()]).collect();
    if origin.is_empty() {
        return Ok(selection.to_vec());
    }
    let length = |e: EdgeId<I>| mesh.edge_length(mesh.edge_halfedge(e));
    let smoothness = |e: EdgeId<I>| mesh.smoothness(mesh.edge_halfedge(e)) as f64;
    let mean = |f: &dyn Fn(EdgeId<I>) -> f64| origin.iter().map(|&e| f(e)).sum::<f64>() / origin.len() as f64;

    let mean_length = mean(&length);
    let mean_smoothness = mean(&smoothness);
    let angles: Vec<f64> = origin.iter().filter_map(|&e| mesh.dihedral_angle(e)).collect();
    let mean_angle = (!angles.is_empty()).then(|| angles.iter().sum::<f64>() / angles.len() as f64);

    let out = mesh
        .edge_ids()
        .map(|e| {
            if selection[e.index()] {
                return true;
            }
            if let Some(tol) = criteria.length {
                if (length(e) - mean_length).abs() > tol * mean_length.max(f64::MIN_POSITIVE) {
                    return false;
                }
            }
            if let Some(tol) = criteria.smoothness {
                if (smoothness(e) - mean_smoothness).abs() > tol {
                    return false;
                }
            }
            if let Some(tol) = criteria.dihedral {
                match (mesh.dihedral_angle(e), mean_angle) {
                    (Some(a), Some(m)) if (a - m).abs() <= tol => {}
                    _ => return false,
                }
            }
            true
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, shapes, VertexId};
    use crate::select::count_selected;
    use nalgebra::Point3;

    #[test]
    fn test_similar_normals_on_cube() {
        let mesh: PolyMesh = shapes::cube(1.0);
        let mut sel = vec![false; 6];
        sel[1] = true;
        let out = find_similar_faces(&mesh, &sel, &SimilarityOptions::default()).unwrap();
        assert_eq!(out, sel);
        let loose = SimilarityOptions::default().with_normal(Some(1.5));
        let out = find_similar_faces(&mesh, &sel, &loose).unwrap();
        // Every face but the opposite one is within 90 degrees.
        assert_eq!(count_selected(&out), 5);
    }

    #[test]
    fn test_similar_shape() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
        ];
        let faces = vec![vec![0, 1, 5, 4], vec![1, 2, 6, 5], vec![2, 3, 7, 6]];
        let mesh: PolyMesh = build_from_polygons(&pts, &faces).unwrap();
        let opts = SimilarityOptions::default().with_normal(None).with_strict_shape(Some(0.01));
        let out = find_similar_faces(&mesh, &[true, false, false], &opts).unwrap();
        assert_eq!(out, vec![true, true, false]);
        let opts = SimilarityOptions::default().with_normal(None).with_loose_shape(Some(0.01));
        let out = find_similar_faces(&mesh, &[false, false, true], &opts).unwrap();
        assert_eq!(out, vec![false, false, true]);
    }

    #[test]
    fn test_similar_is_reflexive() {
        let mesh: PolyMesh = shapes::octahedron();
        let sel = vec![true, false, true, false, false, true, false, false];
        let opts = SimilarityOptions::default()
            .with_normal(Some(0.0))
            .with_loose_shape(Some(0.0))
            .with_strict_shape(Some(0.0));
        let out = find_similar_faces(&mesh, &sel, &opts).unwrap();
        assert!(sel.iter().zip(&out).all(|(&s, &o)| !s || o));
    }

    #[test]
    fn test_similar_edges_by_length() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let mesh: PolyMesh = build_from_polygons(&pts, &[vec![0, 1, 2, 3]]).unwrap();
        let mut sel = vec![false; 4];
        sel[mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap().index()] = true;
        let out = find_similar_edges(&mesh, &sel, &SimilarityOptions::default()).unwrap();
        assert_eq!(count_selected(&out), 2);
        let e = mesh.find_edge(VertexId::new(2), VertexId::new(3)).unwrap();
        assert!(out[e.index()]);
    }
}

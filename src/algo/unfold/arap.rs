//! As-rigid-as-possible relaxation of a flattened piece.
//!
//! The relaxation alternates between:
//! 1. **Local step**: the rotation that best maps each rest triangle onto its
//!    current flat image
//! 2. **Global step**: the flat positions that best fit all rotated rest
//!    triangles at once, a cotangent Laplacian solve per axis
//!
//! Pinned vertices are removed from the unknowns, so they stay exactly where
//! they are. A piece without pins keeps its first vertex in place.
//!
//! # References
//!
//! - Liu, L., Zhang, L., Xu, Y., Gotsman, C., & Gortler, S. J. (2008).
//!   "A Local/Global Approach to Mesh Parameterization." SGP 2008.

use nalgebra::{DVector, Matrix2, Point2, Point3, Vector2};
use rayon::prelude::*;

use super::mapping::UnfoldedPiece;
use super::UnfoldOptions;
use crate::algo::progress::{CancelToken, Progress};
use crate::algo::sparse::{conjugate_gradient, CsrMatrix};
use crate::error::Result;

/// Outcome of relaxing one piece.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Relaxation {
    pub iterations: usize,
    /// Remaining distortion energy relative to the rest edge lengths.
    pub residual: f64,
}

/// Per-triangle rest data: edge vectors in the triangle's own plane and the
/// half-cotangent weight of each edge.
struct RestTriangle {
    corners: [usize; 3],
    edges: [Vector2<f64>; 3],
    weights: [f64; 3],
}

/// Relax `uv` in place.
///
/// `uv` and `pinned` are indexed by the piece's local vertices. The piece
/// index and count only feed progress reporting.
pub(crate) fn relax_piece(
    piece: &UnfoldedPiece,
    uv: &mut [Point2<f64>],
    pinned: &[bool],
    options: &UnfoldOptions,
    progress: &Progress,
    cancel: &CancelToken,
    (index, count): (usize, usize),
) -> Result<Relaxation> {
    let n = piece.num_vertices();
    let rest: Vec<RestTriangle> = piece
        .triangles
        .iter()
        .map(|&t| rest_triangle(&piece.positions, t))
        .collect();

    let mut fixed = pinned.to_vec();
    if !fixed.iter().any(|&p| p) && n > 0 {
        fixed[0] = true;
    }
    let mut slot = vec![usize::MAX; n];
    let free: Vec<usize> = (0..n).filter(|&v| !fixed[v]).collect();
    for (i, &v) in free.iter().enumerate() {
        slot[v] = i;
    }
    if free.is_empty() {
        return Ok(Relaxation {
            iterations: 0,
            residual: energy(&rest, uv, &local_step(&rest, uv, options.parallel)),
        });
    }

    let system = system_matrix(&rest, &slot, free.len());
    let mut residual = energy(&rest, uv, &local_step(&rest, uv, options.parallel));
    let mut iterations = 0;

    for iter in 0..options.max_iterations {
        cancel.check()?;
        progress.report_sub(iter, options.max_iterations, index, count, "relaxing");

        let rotations = local_step(&rest, uv, options.parallel);
        let (bu, bv) = right_hand_side(&rest, &rotations, uv, &slot, free.len());

        let warm_u = DVector::from_iterator(free.len(), free.iter().map(|&v| uv[v].x));
        let warm_v = DVector::from_iterator(free.len(), free.iter().map(|&v| uv[v].y));
        let u = conjugate_gradient(&system, &bu, Some(&warm_u), options.cg_iterations, options.cg_tolerance)?;
        let v = conjugate_gradient(&system, &bv, Some(&warm_v), options.cg_iterations, options.cg_tolerance)?;
        for (i, &vert) in free.iter().enumerate() {
            uv[vert] = Point2::new(u.x[i], v.x[i]);
        }

        iterations = iter + 1;
        let previous = residual;
        residual = energy(&rest, uv, &rotations);
        if (previous - residual).abs() <= options.tolerance * previous.max(1e-12) || residual < options.tolerance {
            break;
        }
    }

    Ok(Relaxation { iterations, residual })
}

fn rest_triangle(positions: &[Point3<f64>], corners: [usize; 3]) -> RestTriangle {
    let [p0, p1, p2] = corners.map(|c| positions[c]);
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let normal = e1.cross(&e2);
    let len = e1.norm();

    let (q1, q2) = if len < 1e-15 || normal.norm() < 1e-15 {
        (Vector2::zeros(), Vector2::zeros())
    } else {
        let x_axis = e1 / len;
        let y_axis = normal.cross(&e1).normalize();
        (Vector2::new(len, 0.0), Vector2::new(e2.dot(&x_axis), e2.dot(&y_axis)))
    };
    let q = [Vector2::zeros(), q1, q2];

    // Edge k runs from corner k to corner k + 1; its weight is half the
    // cotangent of the angle at the remaining corner.
    let mut edges = [Vector2::zeros(); 3];
    let mut weights = [0.0; 3];
    for k in 0..3 {
        let (a, b, c) = (k, (k + 1) % 3, (k + 2) % 3);
        edges[k] = q[b] - q[a];
        weights[k] = (0.5 * cotangent(q[c], q[a], q[b])).max(1e-6);
    }
    RestTriangle { corners, edges, weights }
}

/// Cotangent of the angle at `apex` in the triangle `(apex, a, b)`.
fn cotangent(apex: Vector2<f64>, a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    let u = a - apex;
    let v = b - apex;
    let cross = u.perp(&v).abs();
    if cross < 1e-12 {
        0.0
    } else {
        u.dot(&v) / cross
    }
}

fn local_step(rest: &[RestTriangle], uv: &[Point2<f64>], parallel: bool) -> Vec<Matrix2<f64>> {
    let fit = |t: &RestTriangle| {
        let mut s = Matrix2::zeros();
        for k in 0..3 {
            let current = uv[t.corners[(k + 1) % 3]] - uv[t.corners[k]];
            s += t.weights[k] * current * t.edges[k].transpose();
        }
        closest_rotation(&s)
    };
    if parallel {
        rest.par_iter().map(fit).collect()
    } else {
        rest.iter().map(fit).collect()
    }
}

/// The rotation nearest to `m` in the Frobenius norm.
fn closest_rotation(m: &Matrix2<f64>) -> Matrix2<f64> {
    let svd = m.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Matrix2::identity();
    };
    let r = u * v_t;
    if r.determinant() >= 0.0 {
        return r;
    }
    let mut flipped = u;
    flipped[(0, 1)] = -flipped[(0, 1)];
    flipped[(1, 1)] = -flipped[(1, 1)];
    flipped * v_t
}

fn system_matrix(rest: &[RestTriangle], slot: &[usize], n_free: usize) -> CsrMatrix {
    let mut triplets = Vec::with_capacity(rest.len() * 12);
    for t in rest {
        for k in 0..3 {
            let (i, j) = (t.corners[k], t.corners[(k + 1) % 3]);
            let w = t.weights[k];
            let (si, sj) = (slot[i], slot[j]);
            if si != usize::MAX {
                triplets.push((si, si, w));
                if sj != usize::MAX {
                    triplets.push((si, sj, -w));
                }
            }
            if sj != usize::MAX {
                triplets.push((sj, sj, w));
                if si != usize::MAX {
                    triplets.push((sj, si, -w));
                }
            }
        }
    }
    CsrMatrix::from_triplets(n_free, n_free, triplets)
}

/// Rotated rest edges pulled onto the free vertices, with the fixed
/// neighbours moved to the right-hand side.
fn right_hand_side(
    rest: &[RestTriangle],
    rotations: &[Matrix2<f64>],
    uv: &[Point2<f64>],
    slot: &[usize],
    n_free: usize,
) -> (DVector<f64>, DVector<f64>) {
    let mut bu = DVector::zeros(n_free);
    let mut bv = DVector::zeros(n_free);
    for (t, r) in rest.iter().zip(rotations) {
        for k in 0..3 {
            let (i, j) = (t.corners[k], t.corners[(k + 1) % 3]);
            let w = t.weights[k];
            let target = r * t.edges[k] * w;
            let (si, sj) = (slot[i], slot[j]);
            if si != usize::MAX {
                bu[si] -= target.x;
                bv[si] -= target.y;
                if sj == usize::MAX {
                    bu[si] += w * uv[j].x;
                    bv[si] += w * uv[j].y;
                }
            }
            if sj != usize::MAX {
                bu[sj] += target.x;
                bv[sj] += target.y;
                if si == usize::MAX {
                    bu[sj] += w * uv[i].x;
                    bv[sj] += w * uv[i].y;
                }
            }
        }
    }
    (bu, bv)
}

fn energy(rest: &[RestTriangle], uv: &[Point2<f64>], rotations: &[Matrix2<f64>]) -> f64 {
    let mut misfit = 0.0;
    let mut scale = 0.0;
    for (t, r) in rest.iter().zip(rotations) {
        for k in 0..3 {
            let current = uv[t.corners[(k + 1) % 3]] - uv[t.corners[k]];
            misfit += t.weights[k] * (current - r * t.edges[k]).norm_squared();
            scale += t.weights[k] * t.edges[k].norm_squared();
        }
    }
    if scale > 0.0 {
        misfit / scale
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::unfold::layout::initial_layout;

    fn options() -> UnfoldOptions {
        UnfoldOptions::default().sequential()
    }

    fn quad_piece(positions: Vec<Point3<f64>>) -> UnfoldedPiece {
        UnfoldedPiece {
            vertices: (0..positions.len()).collect(),
            positions,
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            faces: vec![0, 0],
        }
    }

    #[test]
    fn test_closest_rotation() {
        let r = closest_rotation(&Matrix2::identity());
        assert!((r - Matrix2::identity()).norm() < 1e-10);

        let angle: f64 = 0.5;
        let rot = Matrix2::new(angle.cos(), -angle.sin(), angle.sin(), angle.cos());
        let r = closest_rotation(&(2.0 * rot));
        assert!((r - rot).norm() < 1e-10);

        // A reflection maps to a proper rotation.
        let r = closest_rotation(&Matrix2::new(1.0, 0.0, 0.0, -1.0));
        assert!((r.determinant() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_flat_piece_is_already_relaxed() {
        let piece = quad_piece(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        let mut uv = initial_layout(&piece);
        let out = relax_piece(&piece, &mut uv, &[false; 4], &options(), &Progress::none(), &CancelToken::new(), (0, 1))
            .unwrap();
        assert!(out.residual < 1e-10);
        assert!((uv[2] - Point2::new(1.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_relax_fixes_distorted_layout() {
        let piece = quad_piece(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.3),
            Point3::new(0.0, 1.0, 0.3),
        ]);
        let mut uv = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.5, 0.4),
            Point2::new(0.1, 0.5),
        ];
        let before = energy(
            &piece.triangles.iter().map(|&t| rest_triangle(&piece.positions, t)).collect::<Vec<_>>(),
            &uv,
            &[Matrix2::identity(); 2],
        );
        let out = relax_piece(&piece, &mut uv, &[false; 4], &options(), &Progress::none(), &CancelToken::new(), (0, 1))
            .unwrap();
        assert!(out.residual < before);
        assert!(out.residual < 1e-4);
        assert!(out.iterations >= 1);
        // The first vertex anchors the piece.
        assert_eq!(uv[0], Point2::new(0.0, 0.0));
        let side = (uv[1] - uv[0]).norm();
        assert!((side - 1.0).abs() < 1e-2);
    }

    /// A 3x3 patch of a sphere; it cannot flatten without distortion.
    fn dome_piece() -> UnfoldedPiece {
        let mut positions = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                let (x, y) = (i as f64 / 3.0 - 0.5, j as f64 / 3.0 - 0.5);
                positions.push(Point3::new(x, y, (1.0 - x * x - y * y).sqrt()));
            }
        }
        let mut triangles = Vec::new();
        let mut faces = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                let v = j * 4 + i;
                triangles.push([v, v + 1, v + 5]);
                triangles.push([v, v + 5, v + 4]);
                faces.extend([j * 3 + i; 2]);
            }
        }
        UnfoldedPiece { vertices: (0..16).collect(), positions, triangles, faces }
    }

    #[test]
    fn test_relaxation_iterates_to_lower_energy() {
        let piece = dome_piece();
        let mut uv: Vec<Point2<f64>> = piece.positions.iter().map(|p| Point2::new(p.x * 1.6, p.y * 0.7)).collect();
        let rest: Vec<RestTriangle> = piece.triangles.iter().map(|&t| rest_triangle(&piece.positions, t)).collect();
        let before = energy(&rest, &uv, &local_step(&rest, &uv, false));

        let out = relax_piece(&piece, &mut uv, &[false; 16], &options(), &Progress::none(), &CancelToken::new(), (0, 1))
            .unwrap();
        assert!(out.iterations > 1);
        assert!(out.residual < before);

        // Running on to a tighter tolerance never raises the energy.
        let mut again = uv.clone();
        let tight = options().with_tolerance(0.0).with_max_iterations(20);
        let more = relax_piece(&piece, &mut again, &[false; 16], &tight, &Progress::none(), &CancelToken::new(), (0, 1))
            .unwrap();
        assert!(more.residual <= out.residual + 1e-9);
    }

    #[test]
    fn test_zero_iterations_reports_layout_energy() {
        let piece = dome_piece();
        let mut uv: Vec<Point2<f64>> = piece.positions.iter().map(|p| Point2::new(p.x * 1.6, p.y * 0.7)).collect();
        let start = uv.clone();
        let rest: Vec<RestTriangle> = piece.triangles.iter().map(|&t| rest_triangle(&piece.positions, t)).collect();
        let expected = energy(&rest, &uv, &local_step(&rest, &uv, false));

        let none = options().with_max_iterations(0);
        let out = relax_piece(&piece, &mut uv, &[false; 16], &none, &Progress::none(), &CancelToken::new(), (0, 1))
            .unwrap();
        assert_eq!(out.iterations, 0);
        assert!(out.residual.is_finite());
        assert!((out.residual - expected).abs() < 1e-12);
        assert_eq!(uv, start);
    }

    #[test]
    fn test_pins_hold() {
        let piece = quad_piece(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        let mut uv = initial_layout(&piece);
        uv[2] = Point2::new(3.0, 3.0);
        let pins = [true, false, true, false];
        relax_piece(&piece, &mut uv, &pins, &options(), &Progress::none(), &CancelToken::new(), (0, 1)).unwrap();
        assert_eq!(uv[0], Point2::new(0.0, 0.0));
        assert_eq!(uv[2], Point2::new(3.0, 3.0));
    }

    #[test]
    fn test_cancel_stops_relaxation() {
        let piece = quad_piece(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        let mut uv = initial_layout(&piece);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = relax_piece(&piece, &mut uv, &[false; 4], &options(), &Progress::none(), &cancel, (0, 1))
            .unwrap_err();
        assert!(matches!(err, crate::error::MeshError::Cancelled));
    }
}

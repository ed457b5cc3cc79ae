//! Compressed sparse rows and a conjugate gradient solver.
//!
//! Just enough linear algebra for the unfold relaxation, whose global step
//! solves a cotangent Laplacian once per axis and iteration.

use nalgebra::DVector;

use crate::error::{MeshError, Result};

/// Square or rectangular matrix in CSR layout.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` indexes the entries of row `i`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble a matrix from `(row, col, value)` triplets.
    ///
    /// Entries at the same position are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, value) in triplets {
            if last == Some((row, col)) {
                if let Some(acc) = values.last_mut() {
                    *acc += value;
                }
                continue;
            }
            col_idx.push(col);
            values.push(value);
            row_ptr[row + 1] += 1;
            last = Some((row, col));
        }
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `A * x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` does not have `ncols()` entries.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "vector length does not match matrix columns");
        DVector::from_iterator(
            self.rows,
            (0..self.rows).map(|i| {
                (self.row_ptr[i]..self.row_ptr[i + 1])
                    .map(|k| self.values[k] * x[self.col_idx[k]])
                    .sum::<f64>()
            }),
        )
    }
}

/// Solution of a conjugate gradient run.
#[derive(Debug, Clone)]
pub struct CgSolution {
    /// The solution vector.
    pub x: DVector<f64>,
    /// Iterations spent.
    pub iterations: usize,
}

/// Solve `A x = b` for a symmetric positive definite `A`.
///
/// Starts from `x0` when given. Stops once the residual norm relative to
/// `|b|` drops below `tolerance`, and fails with
/// [`MeshError::ConvergenceFailed`] after `max_iter` iterations.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<CgSolution> {
    let n = b.len();
    assert!(a.nrows() == n && a.ncols() == n, "system must be square and match b");

    let mut x = x0.cloned().unwrap_or_else(|| DVector::zeros(n));
    let b_norm = b.norm();
    if b_norm < 1e-15 {
        return Ok(CgSolution {
            x: DVector::zeros(n),
            iterations: 0,
        });
    }

    let mut r = b - a.mul_vec(&x);
    let mut rr = r.dot(&r);
    if rr.sqrt() / b_norm < tolerance {
        return Ok(CgSolution { x, iterations: 0 });
    }
    let mut p = r.clone();

    for iter in 1..=max_iter {
        let ap = a.mul_vec(&p);
        let pap = p.dot(&ap);
        if pap.abs() < 1e-300 {
            break;
        }
        let alpha = rr / pap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        let rr_next = r.dot(&r);
        if rr_next.sqrt() / b_norm < tolerance {
            return Ok(CgSolution { x, iterations: iter });
        }
        p = &r + (rr_next / rr) * &p;
        rr = rr_next;
    }

    Err(MeshError::ConvergenceFailed { iterations: max_iter })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spd_2x2() -> CsrMatrix {
        CsrMatrix::from_triplets(2, 2, vec![(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)])
    }

    #[test]
    fn test_triplets_sum_duplicates() {
        let a = CsrMatrix::from_triplets(3, 3, vec![(2, 2, 1.0), (0, 0, 2.0), (0, 0, 2.0), (0, 1, 1.0)]);
        assert_eq!(a.nnz(), 3);
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0, 1.0]));
        assert_eq!(y.as_slice(), &[5.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mul_vec() {
        let y = spd_2x2().mul_vec(&DVector::from_vec(vec![1.0, 1.0]));
        assert_eq!(y.as_slice(), &[5.0, 4.0]);
    }

    #[test]
    fn test_cg_solves() {
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let sol = conjugate_gradient(&a, &b, None, 100, 1e-12).unwrap();
        assert!((sol.x[0] - 1.0 / 11.0).abs() < 1e-9);
        assert!((sol.x[1] - 7.0 / 11.0).abs() < 1e-9);
        assert!(sol.iterations <= 2);
    }

    #[test]
    fn test_cg_warm_start_is_free() {
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let exact = DVector::from_vec(vec![1.0 / 11.0, 7.0 / 11.0]);
        let sol = conjugate_gradient(&a, &b, Some(&exact), 100, 1e-9).unwrap();
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn test_cg_gives_up() {
        let triplets = (0..50)
            .flat_map(|i| {
                let mut row = vec![(i, i, 2.0 + i as f64)];
                if i > 0 {
                    row.push((i, i - 1, -1.0));
                    row.push((i - 1, i, -1.0));
                }
                row
            })
            .collect();
        let a = CsrMatrix::from_triplets(50, 50, triplets);
        let b = DVector::from_element(50, 1.0);
        let err = conjugate_gradient(&a, &b, None, 1, 1e-14).unwrap_err();
        assert!(matches!(err, MeshError::ConvergenceFailed { iterations: 1 }));
    }
}

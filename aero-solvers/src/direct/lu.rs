//! LU decomposition with partial pivoting
//!
//! Pure-Rust factorization for the small dense systems where a direct
//! solve beats Krylov iteration. The factorization is reusable, so one
//! decomposition serves the repeated solves of a stability-derivative
//! sweep.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors that can occur during LU factorization
#[derive(Error, Debug)]
pub enum LuError {
    /// Pivot fell below the singularity threshold
    #[error("matrix is singular or nearly singular")]
    SingularMatrix,
    /// Right-hand side length does not match the factorization
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Provided length
        got: usize,
    },
}

const PIVOT_EPS: f64 = 1e-30;

/// LU factorization result
///
/// L is unit lower triangular and stored below the diagonal of `lu`;
/// U occupies the diagonal and above.
#[derive(Debug, Clone)]
pub struct LuFactorization {
    /// Combined L and U factors
    pub lu: Array2<f64>,
    /// Row pivot indices
    pub pivots: Vec<usize>,
    /// Matrix dimension
    pub n: usize,
}

/// Factor a square matrix with partial pivoting.
pub fn lu_factor(a: &Array2<f64>) -> Result<LuFactorization, LuError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let mut lu = a.clone();
    let mut pivots = vec![0usize; n];

    for k in 0..n {
        // Find the pivot row
        let mut pivot_row = k;
        let mut pivot_val = lu[[k, k]].abs();
        for i in (k + 1)..n {
            let v = lu[[i, k]].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = i;
            }
        }
        if pivot_val < PIVOT_EPS {
            return Err(LuError::SingularMatrix);
        }
        pivots[k] = pivot_row;

        if pivot_row != k {
            for j in 0..n {
                let tmp = lu[[k, j]];
                lu[[k, j]] = lu[[pivot_row, j]];
                lu[[pivot_row, j]] = tmp;
            }
        }

        let diag = lu[[k, k]];
        for i in (k + 1)..n {
            let factor = lu[[i, k]] / diag;
            lu[[i, k]] = factor;
            for j in (k + 1)..n {
                lu[[i, j]] -= factor * lu[[k, j]];
            }
        }
    }

    Ok(LuFactorization { lu, pivots, n })
}

impl LuFactorization {
    /// Solve `Ax = b` with the pre-computed factorization.
    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let mut x = b.clone();

        // Apply row permutations
        for i in 0..self.n {
            let pivot = self.pivots[i];
            if pivot != i {
                x.swap(i, pivot);
            }
        }

        // Forward substitution: Ly = Pb
        for i in 0..self.n {
            for j in 0..i {
                let l_ij = self.lu[[i, j]];
                x[i] -= l_ij * x[j];
            }
        }

        // Backward substitution: Ux = y
        for i in (0..self.n).rev() {
            for j in (i + 1)..self.n {
                let u_ij = self.lu[[i, j]];
                x[i] -= u_ij * x[j];
            }
            let u_ii = self.lu[[i, i]];
            if u_ii.abs() < PIVOT_EPS {
                return Err(LuError::SingularMatrix);
            }
            x[i] /= u_ii;
        }

        Ok(x)
    }
}

//! Dense linear solvers for panel-method influence systems
//!
//! The influence-coefficient matrix of a low-order panel method is dense,
//! square, non-symmetric and real. This crate provides the two solvers the
//! aerodynamic core needs behind one narrow contract:
//!
//! - **BiCGSTAB**: Krylov iteration for the per-step doublet solve
//! - **LU**: direct factorization with partial pivoting for small cases
//!
//! # Example
//!
//! ```ignore
//! use aero_solvers::{solve, DenseSolver};
//!
//! let report = solve(DenseSolver::BiCgstab, &a, &rhs, 1e-10)?;
//! if !report.converged {
//!     log::warn!("residual {:.3e} after {} iterations", report.residual, report.iterations);
//! }
//! ```

#![warn(clippy::all)]

pub mod direct;
pub mod iterative;
pub mod traits;

pub use direct::{lu_factor, LuError, LuFactorization};
pub use iterative::{bicgstab, BiCgstabConfig, BiCgstabSolution};
pub use traits::{DenseOperator, LinearOperator};

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Which dense solver to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenseSolver {
    /// Bi-conjugate gradient stabilized iteration
    BiCgstab,
    /// Direct LU factorization with partial pivoting
    Lu,
}

/// Errors from the solver front end
#[derive(Error, Debug)]
pub enum SolverError {
    /// Matrix and right-hand side dimensions do not agree
    #[error("dimension mismatch: matrix is {rows}x{cols}, rhs has length {rhs}")]
    DimensionMismatch {
        /// Matrix rows
        rows: usize,
        /// Matrix columns
        cols: usize,
        /// Right-hand side length
        rhs: usize,
    },
    /// LU factorization failed
    #[error(transparent)]
    Lu(#[from] LuError),
}

/// Outcome of a dense solve
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Solution vector
    pub x: Array1<f64>,
    /// Final relative residual ||Ax - b|| / ||b||
    pub residual: f64,
    /// Iterations taken (0 for the direct solver)
    pub iterations: usize,
    /// Whether the residual met the tolerance
    pub converged: bool,
}

/// Solve the dense system `A x = b`.
///
/// The iterative path caps iterations at `max(1000, 2n)`; the direct path
/// reports its true residual so callers can apply the same acceptance
/// threshold to either solver.
pub fn solve(
    kind: DenseSolver,
    a: &Array2<f64>,
    b: &Array1<f64>,
    tolerance: f64,
) -> Result<SolveReport, SolverError> {
    if a.nrows() != b.len() || a.nrows() != a.ncols() {
        return Err(SolverError::DimensionMismatch {
            rows: a.nrows(),
            cols: a.ncols(),
            rhs: b.len(),
        });
    }

    match kind {
        DenseSolver::BiCgstab => {
            let op = DenseOperator::new(a);
            let config = BiCgstabConfig {
                max_iterations: 1000.max(2 * a.nrows()),
                tolerance,
                print_interval: 0,
            };
            let sol = bicgstab(&op, b, &config);
            Ok(SolveReport {
                x: sol.x,
                residual: sol.residual,
                iterations: sol.iterations,
                converged: sol.converged,
            })
        }
        DenseSolver::Lu => {
            let factors = lu_factor(a)?;
            let x = factors.solve(b)?;
            let residual = relative_residual(a, &x, b);
            Ok(SolveReport {
                x,
                residual,
                iterations: 0,
                converged: residual <= tolerance,
            })
        }
    }
}

fn relative_residual(a: &Array2<f64>, x: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let r = b - &a.dot(x);
    let b_norm = b.dot(b).sqrt();
    if b_norm == 0.0 {
        r.dot(&r).sqrt()
    } else {
        r.dot(&r).sqrt() / b_norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_both_solvers_agree() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, -0.2], [0.1, -0.4, 2.0]];
        let b = array![1.0, 2.0, -1.0];

        let it = solve(DenseSolver::BiCgstab, &a, &b, 1e-12).unwrap();
        let lu = solve(DenseSolver::Lu, &a, &b, 1e-12).unwrap();

        assert!(it.converged);
        assert!(lu.converged);
        for i in 0..3 {
            assert_relative_eq!(it.x[i], lu.x[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Array2::<f64>::zeros((3, 3));
        let b = Array1::<f64>::zeros(2);
        assert!(solve(DenseSolver::Lu, &a, &b, 1e-10).is_err());
    }
}

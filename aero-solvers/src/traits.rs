//! The linear-operator contract shared by the solvers
//!
//! Solvers see the system matrix only through [`LinearOperator`], so a
//! matrix-free operator (for example an octree-accelerated far field) can
//! be substituted for the dense matrix without touching the iteration.

use ndarray::{Array1, Array2};

/// A real linear operator that can perform matrix-vector products.
pub trait LinearOperator: Send + Sync {
    /// Number of rows
    fn num_rows(&self) -> usize;

    /// Number of columns
    fn num_cols(&self) -> usize;

    /// Apply the operator: `y = A * x`
    fn apply(&self, x: &Array1<f64>) -> Array1<f64>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

/// Borrowed dense matrix viewed as a [`LinearOperator`]
#[derive(Debug, Clone, Copy)]
pub struct DenseOperator<'a> {
    matrix: &'a Array2<f64>,
}

impl<'a> DenseOperator<'a> {
    /// Wrap a dense matrix
    pub fn new(matrix: &'a Array2<f64>) -> Self {
        Self { matrix }
    }
}

impl LinearOperator for DenseOperator<'_> {
    fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }

    fn num_cols(&self) -> usize {
        self.matrix.ncols()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        self.matrix.dot(x)
    }
}

/// Euclidean norm of a vector
pub(crate) fn vector_norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

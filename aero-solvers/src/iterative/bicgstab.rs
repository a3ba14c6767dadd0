//! BiCGSTAB (Bi-Conjugate Gradient Stabilized) solver
//!
//! The doublet influence matrix is dense and non-symmetric; BiCGSTAB
//! handles it without the restart bookkeeping GMRES would need.

use crate::traits::{vector_norm, LinearOperator};
use ndarray::Array1;

/// BiCGSTAB solver configuration
#[derive(Debug, Clone)]
pub struct BiCgstabConfig {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Relative tolerance for convergence
    pub tolerance: f64,
    /// Print progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl Default for BiCgstabConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            print_interval: 0,
        }
    }
}

/// BiCGSTAB solver result
#[derive(Debug)]
pub struct BiCgstabSolution {
    /// Solution vector
    pub x: Array1<f64>,
    /// Number of iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether convergence was achieved
    pub converged: bool,
}

const BREAKDOWN: f64 = 1e-30;

/// Solve `Ax = b` with the BiCGSTAB method.
pub fn bicgstab<A: LinearOperator>(
    operator: &A,
    b: &Array1<f64>,
    config: &BiCgstabConfig,
) -> BiCgstabSolution {
    let n = b.len();
    let mut x = Array1::<f64>::zeros(n);

    let b_norm = vector_norm(b);
    if b_norm < 1e-15 {
        return BiCgstabSolution {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    // Initial residual with x = 0, plus the shadow residual
    let mut r = b.clone();
    let r0 = r.clone();

    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;

    let mut p = Array1::<f64>::zeros(n);
    let mut v = Array1::<f64>::zeros(n);

    for iter in 0..config.max_iterations {
        let rho_new = r0.dot(&r);
        if rho_new.abs() < BREAKDOWN {
            return BiCgstabSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }

        let beta = (rho_new / rho) * (alpha / omega);
        rho = rho_new;

        // p = r + beta * (p - omega * v)
        p = &r + &(&p - &v.mapv(|vi| vi * omega)).mapv(|pi| pi * beta);

        v = operator.apply(&p);

        let r0v = r0.dot(&v);
        if r0v.abs() < BREAKDOWN {
            return BiCgstabSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }
        alpha = rho / r0v;

        // s = r - alpha * v
        let s = &r - &v.mapv(|vi| vi * alpha);

        let s_norm = vector_norm(&s);
        if s_norm / b_norm < config.tolerance {
            x = &x + &p.mapv(|pi| pi * alpha);
            return BiCgstabSolution {
                x,
                iterations: iter + 1,
                residual: s_norm / b_norm,
                converged: true,
            };
        }

        let t = operator.apply(&s);

        let tt = t.dot(&t);
        if tt.abs() < BREAKDOWN {
            return BiCgstabSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }
        omega = t.dot(&s) / tt;

        // x = x + alpha * p + omega * s
        x = &x + &p.mapv(|pi| pi * alpha) + &s.mapv(|si| si * omega);

        // r = s - omega * t
        r = &s - &t.mapv(|ti| ti * omega);

        let rel_residual = vector_norm(&r) / b_norm;

        if config.print_interval > 0 && (iter + 1) % config.print_interval == 0 {
            log::info!(
                "BiCGSTAB iteration {}: relative residual = {:.6e}",
                iter + 1,
                rel_residual
            );
        }

        if rel_residual < config.tolerance {
            return BiCgstabSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: true,
            };
        }

        if omega.abs() < BREAKDOWN {
            return BiCgstabSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: false,
            };
        }
    }

    let rel_residual = vector_norm(&r) / b_norm;
    BiCgstabSolution {
        x,
        iterations: config.max_iterations,
        residual: rel_residual,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DenseOperator;
    use ndarray::array;

    #[test]
    fn test_bicgstab_simple() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];

        let op = DenseOperator::new(&a);
        let config = BiCgstabConfig {
            max_iterations: 100,
            tolerance: 1e-12,
            print_interval: 0,
        };

        let solution = bicgstab(&op, &b, &config);
        assert!(solution.converged, "BiCGSTAB should converge");

        let ax = a.dot(&solution.x);
        let error = (&ax - &b).mapv(|e| e * e).sum().sqrt();
        assert!(error < 1e-8, "solution should satisfy Ax = b");
    }

    #[test]
    fn test_bicgstab_nonsymmetric() {
        // Diagonally dominant but non-symmetric, like a panel influence matrix
        let a = array![
            [5.0, 0.7, -0.3, 0.1],
            [-0.2, 4.0, 0.5, -0.6],
            [0.9, -0.1, 6.0, 0.2],
            [0.3, 0.4, -0.8, 5.5]
        ];
        let b = array![1.0, -2.0, 0.5, 3.0];

        let op = DenseOperator::new(&a);
        let solution = bicgstab(&op, &b, &BiCgstabConfig::default());
        assert!(solution.converged);
        assert!(solution.residual < 1e-10);
    }

    #[test]
    fn test_bicgstab_zero_rhs() {
        let a = array![[2.0, 0.0], [0.0, 2.0]];
        let b = array![0.0, 0.0];
        let op = DenseOperator::new(&a);
        let solution = bicgstab(&op, &b, &BiCgstabConfig::default());
        assert!(solution.converged);
        assert_eq!(solution.iterations, 0);
    }
}

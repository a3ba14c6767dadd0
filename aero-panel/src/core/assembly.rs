//! Dense influence-coefficient assembly
//!
//! A[i,j] is the doublet potential at body panel i's centroid per unit
//! μ on body panel j, with the Kutta wake closure folded in: every wake
//! panel's doublet is μ_upper − μ_lower, so its influence is added to
//! the upper parent's column and subtracted from the lower parent's.
//! B[i,j] is the source potential per unit σ. Rows are independent and
//! are assembled in parallel.

use crate::core::mesh::Graph;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Assemble the doublet (A) and source (B) influence matrices.
pub fn assemble(graph: &Graph) -> (Array2<f64>, Array2<f64>) {
    let n = graph.n_body();
    let mut a = Array2::<f64>::zeros((n, n));
    let mut b = Array2::<f64>::zeros((n, n));

    let rows: Vec<(Array1<f64>, Array1<f64>)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let poi = graph.body_panels[i].base.centroid;
            let mut a_row = Array1::<f64>::zeros(n);
            let mut b_row = Array1::<f64>::zeros(n);

            for (j, bp) in graph.body_panels.iter().enumerate() {
                if i == j {
                    // Inner-limit self influence of the doublet sheet
                    a_row[j] = -2.0 * PI;
                    let infl = bp.base.potential_influence(poi);
                    b_row[j] = infl.source;
                } else {
                    let infl = bp.base.potential_influence(poi);
                    a_row[j] = infl.doublet;
                    b_row[j] = infl.source;
                }
            }

            for wp in &graph.wake_panels {
                let (Some(u), Some(l)) = (wp.upper_parent, wp.lower_parent) else {
                    continue;
                };
                let phi_w = wp.base.potential_influence(poi).doublet;
                a_row[u] += phi_w;
                a_row[l] -= phi_w;
            }

            (a_row, b_row)
        })
        .collect();

    for (i, (a_row, b_row)) in rows.into_iter().enumerate() {
        a.row_mut(i).assign(&a_row);
        b.row_mut(i).assign(&b_row);
    }

    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::generators::sphere_mesh;
    use crate::core::mesh::GraphOptions;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_assembly_diagonal() {
        let mesh = sphere_mesh(1.0, 6, 8);
        let graph = Graph::build(&mesh, GraphOptions::default()).unwrap();
        let (a, b) = assemble(&graph);

        let n = graph.n_body();
        assert_eq!(a.dim(), (n, n));

        for i in 0..n {
            assert_relative_eq!(a[[i, i]], -2.0 * PI, epsilon = 1e-12);
            // Source self influence -∬dS/r is finite and negative
            assert!(b[[i, i]] < 0.0);
            assert!(b[[i, i]].is_finite());
        }
    }

    #[test]
    fn test_closed_body_row_sum() {
        // For a closed surface the doublet influences of all panels at
        // an interior point sum to the full solid angle: Σ_j D_ij = -4π
        // (the -2π self term plus -2π from the rest of the surface).
        let mesh = sphere_mesh(1.0, 8, 12);
        let graph = Graph::build(&mesh, GraphOptions::default()).unwrap();
        let (a, _) = assemble(&graph);

        let n = graph.n_body();
        for i in (0..n).step_by(17) {
            let row_sum: f64 = a.row(i).sum();
            assert_relative_eq!(row_sum, -4.0 * PI, max_relative = 2e-2);
        }
    }
}

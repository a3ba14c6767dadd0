//! Steady validation against the analytic sphere solution
//!
//! A sphere in uniform flow has Cp = 1 - (9/4)sin²θ; the same case
//! also checks mass conservation of the source distribution and
//! linearity of the solve in the freestream speed.

use aero_panel::core::io::config::CaseConfig;
use aero_panel::core::mesh::generators::sphere_mesh;
use aero_panel::core::mesh::{Graph, GraphOptions};
use aero_panel::AeroCase;

fn sphere_graph() -> Graph {
    let mesh = sphere_mesh(1.0, 16, 32);
    Graph::build(&mesh, GraphOptions::default()).unwrap()
}

fn quiet_config() -> CaseConfig {
    let mut cfg = CaseConfig::for_geometry("sphere.tri");
    cfg.write_vtu = false;
    cfg
}

#[test]
fn sphere_source_mass_conservation() {
    let mut graph = sphere_graph();
    let cfg = quiet_config();
    let mut case = AeroCase::new(&mut graph, &cfg, 1.0);
    case.run().unwrap();

    // Σ σ·area vanishes on a closed body in uniform flow: σ = -n·V∞
    // and the area-weighted normals of a watertight surface sum to zero.
    let net_flux: f64 = graph
        .body_panels
        .iter()
        .map(|p| p.base.sigma * p.base.area)
        .sum();
    let scale: f64 = graph
        .body_panels
        .iter()
        .map(|p| p.base.sigma.abs() * p.base.area)
        .sum();
    assert!(
        net_flux.abs() < 1e-10 * scale.max(1.0),
        "net source flux {} should vanish",
        net_flux
    );
}

#[test]
fn sphere_solve_linear_in_freestream() {
    let mut graph = sphere_graph();
    let cfg = quiet_config();

    let mut case = AeroCase::new(&mut graph, &cfg, 1.0);
    case.run().unwrap();
    let mu_1: Vec<f64> = graph.body_panels.iter().map(|p| p.base.mu).collect();
    let sigma_1: Vec<f64> = graph.body_panels.iter().map(|p| p.base.sigma).collect();

    let mut case = AeroCase::new(&mut graph, &cfg, 2.0);
    case.run().unwrap();

    for (i, p) in graph.body_panels.iter().enumerate() {
        assert!(
            (p.base.sigma - 2.0 * sigma_1[i]).abs() < 1e-10,
            "sigma not linear at panel {}",
            i
        );
        assert!(
            (p.base.mu - 2.0 * mu_1[i]).abs() < 1e-6 * (1.0 + mu_1[i].abs()),
            "mu not linear at panel {}: {} vs {}",
            i,
            p.base.mu,
            2.0 * mu_1[i]
        );
    }
}

#[test]
fn sphere_pressure_matches_analytic() {
    let mut graph = sphere_graph();
    let cfg = quiet_config();
    let mut case = AeroCase::new(&mut graph, &cfg, 1.0);
    case.run().unwrap();

    // Compare Cp = 1 - (9/4)sin²θ away from the poles, where the
    // least-squares cluster is well conditioned.
    let mut abs_err_sum = 0.0;
    let mut abs_err_max: f64 = 0.0;
    let mut count = 0usize;
    for p in &graph.body_panels {
        let c = p.base.centroid;
        if c.z.abs() > 0.85 {
            continue;
        }
        let r = c.norm();
        let sin_sq = 1.0 - (c.x / r) * (c.x / r);
        let cp_exact = 1.0 - 2.25 * sin_sq;
        let err = (p.cp - cp_exact).abs();
        abs_err_sum += err;
        abs_err_max = abs_err_max.max(err);
        count += 1;
    }

    assert!(count > 100);
    let mean_err = abs_err_sum / count as f64;
    assert!(mean_err < 0.04, "mean |Cp error| = {}", mean_err);
    assert!(abs_err_max < 0.15, "max |Cp error| = {}", abs_err_max);
}

#[test]
fn sphere_forces_vanish() {
    // A closed symmetric body in potential flow carries no net force
    let mut graph = sphere_graph();
    let cfg = quiet_config();
    let mut case = AeroCase::new(&mut graph, &cfg, 1.0);
    let summary = case.run().unwrap();

    assert!(summary.converged);
    assert!(
        summary.f_body.norm() < 0.05,
        "net force {:?} should be near zero",
        summary.f_body
    );
}

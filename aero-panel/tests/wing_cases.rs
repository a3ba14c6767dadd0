//! Steady lifting cases on a rectangular NACA 0012 wing, AR = 4
//!
//! Lifting-line theory gives CL ≈ 2πα/(1 + 2/AR) ≈ 0.365 at α = 5°;
//! the Trefftz-plane lift and the finite-differenced lift slope are
//! checked against it.

use aero_panel::core::io::config::CaseConfig;
use aero_panel::core::mesh::generators::{wing_mesh, WingParams};
use aero_panel::core::mesh::{Graph, GraphOptions};
use aero_panel::{AeroCase, CaseSummary};

fn wing_graph(n_span: usize, n_chord: usize) -> Graph {
    let mesh = wing_mesh(&WingParams {
        n_span,
        n_chord,
        ..WingParams::default()
    });
    Graph::build(&mesh, GraphOptions::default()).unwrap()
}

fn wing_config(alpha: f64) -> CaseConfig {
    let mut cfg = CaseConfig::for_geometry("wing.tri");
    cfg.alpha = alpha;
    cfg.sref = 1.0;
    cfg.bref = 2.0;
    cfg.cref = 0.5;
    cfg.write_vtu = false;
    cfg
}

fn run_steady(graph: &mut Graph, cfg: &CaseConfig) -> CaseSummary {
    let mut case = AeroCase::new(graph, cfg, 1.0);
    case.run().unwrap()
}

#[test]
fn wing_zero_alpha_carries_no_lift() {
    let mut graph = wing_graph(10, 8);
    let summary = run_steady(&mut graph, &wing_config(0.0));

    assert!(summary.converged);
    assert!(
        summary.cl_trefftz.abs() < 1e-3,
        "CL at zero alpha = {}",
        summary.cl_trefftz
    );
    assert!(
        summary.cd_trefftz.abs() < 1e-4,
        "CDi at zero alpha = {}",
        summary.cd_trefftz
    );
}

#[test]
fn wing_five_degrees_matches_lifting_line() {
    let mut graph = wing_graph(10, 8);
    let summary = run_steady(&mut graph, &wing_config(5.0));

    // 2π·α/(1 + 2/AR) with AR = 4; the 12% band leaves room for the
    // thickness effect on the section lift slope and for mesh error
    let cl_ll = 2.0 * std::f64::consts::PI * 5.0f64.to_radians() / 1.5;
    assert!(
        (summary.cl_trefftz - cl_ll).abs() < 0.12 * cl_ll,
        "CL = {} vs lifting line {}",
        summary.cl_trefftz,
        cl_ll
    );

    // Induced drag is positive and of the order CL²/(π AR)
    assert!(summary.cd_trefftz > 0.0, "CDi = {}", summary.cd_trefftz);
    assert!(summary.cd_trefftz < 0.03, "CDi = {}", summary.cd_trefftz);

    // Force integration agrees with the far-field lift to panel accuracy
    assert!(
        (summary.f_wind.z - summary.cl_trefftz).abs() < 0.2 * cl_ll,
        "near-field CL {} vs Trefftz CL {}",
        summary.f_wind.z,
        summary.cl_trefftz
    );
}

#[test]
fn wing_lift_slope_from_stability_run() {
    let mut graph = wing_graph(10, 8);
    let mut cfg = wing_config(5.0);
    cfg.stab_deriv_flag = true;
    let summary = run_steady(&mut graph, &cfg);

    let stab = summary.stability.expect("stability derivatives requested");
    let slope_ll = 2.0 * std::f64::consts::PI / 1.5;
    assert!(
        (stab.df_dalpha.z - slope_ll).abs() < 0.15 * slope_ll,
        "dCL/dalpha = {} vs lifting line {}",
        stab.df_dalpha.z,
        slope_ll
    );

    // Symmetric wing: sideslip does not change lift to first order
    assert!(
        stab.df_dbeta.z.abs() < 0.2 * slope_ll,
        "dCL/dbeta = {}",
        stab.df_dbeta.z
    );
}

#[test]
fn kutta_condition_holds_exactly() {
    let mut graph = wing_graph(10, 8);
    run_steady(&mut graph, &wing_config(5.0));

    // μ_wake = μ_upper - μ_lower, exactly, for every wake panel
    for wp in &graph.wake_panels {
        let u = wp.upper_parent.unwrap();
        let l = wp.lower_parent.unwrap();
        let expected = graph.body_panels[u].base.mu - graph.body_panels[l].base.mu;
        assert_eq!(wp.base.mu, expected);
    }

    // Wake carries positive circulation for positive lift
    let mid = graph
        .wakes[0]
        .te_panels
        .iter()
        .map(|&w| &graph.wake_panels[w])
        .min_by(|a, b| {
            a.base
                .centroid
                .y
                .abs()
                .partial_cmp(&b.base.centroid.y.abs())
                .unwrap()
        })
        .unwrap();
    assert!(mid.base.mu > 0.0, "midspan wake doublet = {}", mid.base.mu);
}

#[test]
fn sharp_trailing_edge_seeds_streamlines() {
    // A wing without a shed wake sheet: the trailing edge dihedral
    // exceeds the sharp-edge threshold and seeds streamline tracing
    let mesh = wing_mesh(&WingParams {
        n_span: 6,
        n_chord: 6,
        n_wake: 0,
        ..WingParams::default()
    });
    let mut graph = Graph::build(&mesh, GraphOptions::default()).unwrap();
    assert!(graph.wake_panels.is_empty());
    assert!(
        graph.body_panels.iter().any(|bp| bp.sharp_te),
        "trailing edge should be flagged sharp"
    );

    let mut cfg = wing_config(5.0);
    cfg.surf_stream_flag = true;
    let summary = run_steady(&mut graph, &cfg);
    assert!(summary.converged);
    assert!(
        graph.body_panels.iter().any(|bp| bp.stream_crossed),
        "streamlines should cross surface panels"
    );
}

#[test]
fn single_strip_wake_carries_no_trefftz_load() {
    // One spanwise strip means one wake line and no circulation
    // gradient to integrate
    let mut graph = wing_graph(1, 2);
    let summary = run_steady(&mut graph, &wing_config(5.0));
    assert_eq!(summary.cl_trefftz, 0.0);
    assert_eq!(summary.cd_trefftz, 0.0);
}

#[test]
fn coarse_seed_wing_smoke() {
    // The 32-panel seed mesh stays solvable and lifts the right way
    let mut graph = wing_graph(4, 2);
    let summary = run_steady(&mut graph, &wing_config(5.0));
    assert!(summary.converged);
    assert!(summary.cl_trefftz > 0.05);
    assert!(summary.cl_trefftz < 0.8);
    assert!(summary.f_wind.z > 0.0);
}

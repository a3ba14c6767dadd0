//! Unsteady vortex-particle wake evolution
//!
//! The starting-wake transient grows the lift monotonically toward the
//! steady value, and the Barnes–Hut accelerated runs stay consistent
//! with direct particle summation.

use aero_panel::core::io::config::CaseConfig;
use aero_panel::core::mesh::generators::{wing_mesh, WingParams};
use aero_panel::core::mesh::{Graph, GraphOptions};
use aero_panel::{AeroCase, CaseSummary};

fn wing_params() -> WingParams {
    WingParams {
        n_span: 6,
        n_chord: 4,
        ..WingParams::default()
    }
}

fn unsteady_config(alpha: f64, num_steps: usize) -> CaseConfig {
    let mut cfg = CaseConfig::for_geometry("wing.tri");
    cfg.alpha = alpha;
    cfg.sref = 1.0;
    cfg.bref = 2.0;
    cfg.cref = 0.5;
    cfg.vortex_particles = true;
    cfg.time_step = 0.1;
    cfg.num_steps = num_steps;
    cfg.write_vtu = false;
    cfg
}

fn run_unsteady(cfg: &CaseConfig) -> CaseSummary {
    let mesh = wing_mesh(&wing_params());
    let mut graph = Graph::build(
        &mesh,
        GraphOptions {
            vortex_particles: true,
            dt: cfg.time_step,
            input_v: 1.0,
            ..GraphOptions::default()
        },
    )
    .unwrap();
    let mut case = AeroCase::new(&mut graph, cfg, 1.0);
    case.run().unwrap()
}

#[test]
fn starting_wake_lift_grows_toward_steady() {
    let unsteady = run_unsteady(&unsteady_config(5.0, 20));

    // Steady reference on the same wing with the classical wake sheet
    let mesh = wing_mesh(&wing_params());
    let mut graph = Graph::build(&mesh, GraphOptions::default()).unwrap();
    let mut steady_cfg = unsteady_config(5.0, 0);
    steady_cfg.vortex_particles = false;
    let mut case = AeroCase::new(&mut graph, &steady_cfg, 1.0);
    let steady = case.run().unwrap();
    let cl_steady = steady.f_wind.z;

    let cl = &unsteady.cl_history;
    assert!(cl.len() >= 21, "one CL entry per force integration");

    // The transient rises: later lift exceeds the impulsive start
    let cl_first = cl[0];
    let cl_last = *cl.last().unwrap();
    assert!(cl_first > 0.0);
    assert!(
        cl_last > cl_first,
        "lift should grow from {} to above it, got {}",
        cl_first,
        cl_last
    );

    // Near-monotone growth (no oscillation beyond integration noise)
    for pair in cl.windows(2) {
        assert!(
            pair[1] > pair[0] - 0.02 * cl_steady.abs(),
            "CL series dipped: {} -> {}",
            pair[0],
            pair[1]
        );
    }

    // Approaches the steady value from below
    assert!(
        cl_last < 1.05 * cl_steady,
        "transient CL {} overshot steady {}",
        cl_last,
        cl_steady
    );
    assert!(
        cl_last > 0.75 * cl_steady,
        "transient CL {} too far below steady {}",
        cl_last,
        cl_steady
    );
}

#[test]
fn particles_shed_and_convect_downstream() {
    let mesh = wing_mesh(&wing_params());
    let mut graph = Graph::build(
        &mesh,
        GraphOptions {
            vortex_particles: true,
            dt: 0.1,
            input_v: 1.0,
            ..GraphOptions::default()
        },
    )
    .unwrap();
    let cfg = unsteady_config(5.0, 6);
    let mut case = AeroCase::new(&mut graph, &cfg, 1.0);
    case.run().unwrap();

    let particles = case.particles();
    assert!(!particles.is_empty());

    // Rows shed earlier have been convected further downstream
    let te_x = 0.5; // trailing edge of the unit-Sref wing
    for p in particles {
        assert!(p.pos.x > te_x, "particle at {:?} upstream of the TE", p.pos);
        assert!(p.strength.norm().is_finite());
    }
    let first = &particles[0];
    let last = &particles[particles.len() - 1];
    assert!(
        first.pos.x > last.pos.x,
        "earliest particle should be furthest downstream"
    );
    assert!(first.shed_step < last.shed_step);
}

#[test]
fn accelerated_and_direct_runs_agree() {
    let mut cfg_direct = unsteady_config(5.0, 5);
    cfg_direct.accelerate = false;

    let mut cfg_tree = unsteady_config(5.0, 5);
    cfg_tree.accelerate = true;
    cfg_tree.opening_angle = 0.2;

    let direct = run_unsteady(&cfg_direct);
    let tree = run_unsteady(&cfg_tree);

    assert_eq!(direct.num_particles, tree.num_particles);

    for (a, b) in direct.cl_history.iter().zip(tree.cl_history.iter()) {
        assert!(
            (a - b).abs() < 1e-3 * a.abs().max(1e-3),
            "CL history diverged: {} vs {}",
            a,
            b
        );
    }
}

#[test]
fn strength_update_keeps_particles_bounded() {
    use aero_panel::core::io::config::StrengthUpdate;

    let mut cfg = unsteady_config(5.0, 5);
    cfg.strength_update = StrengthUpdate::Gaussian;

    let summary = run_unsteady(&cfg);
    assert!(summary.converged);
    assert!(summary.cl_history.iter().all(|cl| cl.is_finite()));
}

#[test]
fn runge_kutta_integrator_runs() {
    use aero_panel::core::io::config::Integrator;

    let mut cfg = unsteady_config(5.0, 3);
    cfg.integrator = Integrator::RungeKutta4;

    let summary = run_unsteady(&cfg);
    assert!(summary.converged);
    assert!(summary.num_particles > 0);
}

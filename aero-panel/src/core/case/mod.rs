//! Case orchestrator
//!
//! Drives one aerodynamic case: source assembly, the dense doublet
//! solve, force integration, wake shedding and particle convection,
//! looped over time. Within a step the sequence wake collapse →
//! source strengths → doublet solve → strength update → convection is
//! strict; between steps every quantity is fully materialized before
//! the next step begins.

mod output;

use crate::core::error::AeroError;
use crate::core::io::config::{CaseConfig, Integrator, SolverChoice, StrengthUpdate};
use crate::core::mesh::{trefftz_plane, Graph, Panel, TrefftzResult};
use crate::core::octree::ParticleOctree;
use crate::core::particles::{Particle, VortexFilament};
use crate::core::streamline::{trace_surface_streamlines, Streamline};
use crate::core::types::{FlowConditions, ReferenceQuantities, Vec3};
use aero_solvers::DenseSolver;
use ndarray::Array1;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Residual above which a solve is declared non-convergent
pub const SOLVER_TOLERANCE: f64 = 1e-10;

/// Stability derivatives from finite-differenced shadow cases
#[derive(Debug, Clone, Copy)]
pub struct StabilityDerivatives {
    /// d(CD, CY, CL)/dα, per radian
    pub df_dalpha: Vec3,
    /// d(CD, CY, CL)/dβ, per radian
    pub df_dbeta: Vec3,
    /// d(roll, pitch, yaw)/dα, per radian
    pub dm_dalpha: Vec3,
    /// d(roll, pitch, yaw)/dβ, per radian
    pub dm_dbeta: Vec3,
}

/// Results of one case
#[derive(Debug, Clone)]
pub struct CaseSummary {
    /// Freestream speed
    pub v_mag: f64,
    /// Angle of attack, degrees
    pub alpha: f64,
    /// Sideslip, degrees
    pub beta: f64,
    /// Trefftz-plane lift coefficient
    pub cl_trefftz: f64,
    /// Trefftz-plane induced-drag coefficient
    pub cd_trefftz: f64,
    /// Body-frame force coefficients
    pub f_body: Vec3,
    /// Wind-frame force coefficients
    pub f_wind: Vec3,
    /// Moment coefficients (roll, pitch, yaw)
    pub cm: Vec3,
    /// Lift-coefficient time series, one entry per force integration
    pub cl_history: Vec<f64>,
    /// Every linear solve met the residual tolerance
    pub converged: bool,
    /// Particles alive at the end of the case
    pub num_particles: usize,
    /// Stability derivatives when requested
    pub stability: Option<StabilityDerivatives>,
}

/// One aerodynamic case over a geometry graph
pub struct AeroCase<'g> {
    geom: &'g mut Graph,
    config: CaseConfig,
    flow: FlowConditions,
    refs: ReferenceQuantities,
    output_root: PathBuf,
    time_step: usize,
    particles: Vec<Particle>,
    filaments: Vec<VortexFilament>,
    octree: Option<ParticleOctree>,
    sigmas: Array1<f64>,
    any_not_converged: bool,
    cl_history: Vec<f64>,
    cl_trefftz: f64,
    cd_trefftz: f64,
    f_body: Vec3,
    f_wind: Vec3,
    cm: Vec3,
    trefftz_results: Vec<TrefftzResult>,
    streamlines: Vec<Streamline>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'g> AeroCase<'g> {
    /// Set up a case for one entry of the velocity sweep.
    pub fn new(geom: &'g mut Graph, config: &CaseConfig, v_mag: f64) -> Self {
        let flow = FlowConditions::new(v_mag, config.alpha, config.beta, config.mach);
        let refs = ReferenceQuantities {
            sref: config.sref,
            bref: config.bref,
            cref: config.cref,
            cg: Vec3::from(config.cg),
        };
        let n = geom.n_body();
        Self {
            geom,
            config: config.clone(),
            flow,
            refs,
            output_root: PathBuf::from("."),
            time_step: 0,
            particles: Vec::new(),
            filaments: Vec::new(),
            octree: None,
            sigmas: Array1::zeros(n),
            any_not_converged: false,
            cl_history: Vec::new(),
            cl_trefftz: 0.0,
            cd_trefftz: 0.0,
            f_body: Vec3::zero(),
            f_wind: Vec3::zero(),
            cm: Vec3::zero(),
            trefftz_results: Vec::new(),
            streamlines: Vec::new(),
            cancel: None,
        }
    }

    /// Root directory for per-case output (default: working directory).
    pub fn set_output_root<P: Into<PathBuf>>(&mut self, root: P) {
        self.output_root = root.into();
    }

    /// Cooperative cancellation flag, checked at step boundaries.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    /// Particles currently alive (diagnostics)
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Run the case to completion.
    pub fn run(&mut self) -> Result<CaseSummary, AeroError> {
        self.geom.ensure_influence(None, false)?;

        // Steady bootstrap
        self.set_source_strengths();
        self.solve_system(false)?;

        if self.config.vortex_particles {
            self.comp_velocity();
            self.write_files()?;
            self.time_step = 1;

            for _ in 0..self.config.num_steps {
                log::info!(
                    "time step {}/{}, flow time {:.4}, {} particles",
                    self.time_step,
                    self.config.num_steps,
                    self.time_step as f64 * self.config.time_step,
                    self.particles.len()
                );

                self.collapse_wake_for_each_edge();
                self.rebuild_octree();
                self.set_source_strengths();
                self.solve_system(true)?;
                self.apply_strength_update();
                self.comp_velocity();
                self.write_files()?;
                self.time_step += 1;
                self.convect_particles();

                if self.cancelled() {
                    log::warn!("case cancelled at step {}", self.time_step);
                    break;
                }
            }
        }

        self.comp_velocity();
        self.trefftz_analysis();

        if self.config.surf_stream_flag {
            self.streamlines = trace_surface_streamlines(self.geom);
        }

        if !self.config.vortex_particles {
            self.write_files()?;
        } else {
            self.write_final_spanwise()?;
            if self.config.surf_stream_flag {
                self.write_streamlines()?;
            }
        }

        let stability = if self.config.stab_deriv_flag {
            Some(self.stability_derivatives()?)
        } else {
            None
        };

        if self.any_not_converged {
            log::warn!("*** Warning : Solution did not converge ***");
        }

        Ok(CaseSummary {
            v_mag: self.flow.v_mag,
            alpha: self.flow.alpha,
            beta: self.flow.beta,
            cl_trefftz: self.cl_trefftz,
            cd_trefftz: self.cd_trefftz,
            f_body: self.f_body,
            f_wind: self.f_wind,
            cm: self.cm,
            cl_history: self.cl_history.clone(),
            converged: !self.any_not_converged,
            num_particles: self.particles.len(),
            stability,
        })
    }

    /// Velocity induced by the particle cloud at a point, through the
    /// octree when acceleration is on.
    fn particle_velocity(&self, poi: Vec3) -> Vec3 {
        if self.particles.is_empty() {
            return Vec3::zero();
        }
        match (&self.octree, self.config.accelerate) {
            (Some(tree), true) => tree.barnes_hut(
                &self.particles,
                poi,
                self.config.opening_angle,
                self.config.core_overlap,
            ),
            _ => {
                let mut v = Vec3::zero();
                for p in &self.particles {
                    v += p.induced_velocity(poi, self.config.core_overlap);
                }
                v
            }
        }
    }

    /// σ := -n·(V∞ + V_filaments + V_particles) at every body panel.
    fn set_source_strengths(&mut self) {
        let this = &*self;
        let v_inf = this.flow.v_inf;
        let sums: Vec<Vec3> = this
            .geom
            .body_panels
            .par_iter()
            .map(|bp| {
                let c = bp.base.centroid;
                let mut v = Vec3::zero();
                for f in &this.filaments {
                    v += f.induced_velocity(c);
                }
                v + this.particle_velocity(c)
            })
            .collect();

        if self.sigmas.len() != self.geom.n_body() {
            self.sigmas = Array1::zeros(self.geom.n_body());
        }
        for (i, sum) in sums.into_iter().enumerate() {
            self.geom.body_panels[i].set_sigma(v_inf + sum, 0.0);
            self.sigmas[i] = self.geom.body_panels[i].base.sigma;
        }
    }

    /// Solve A μ = -B σ, propagate μ to the panels and enforce the
    /// Kutta condition on the wake.
    fn solve_system(&mut self, save_wake_prev: bool) -> Result<bool, AeroError> {
        let a = self.geom.a.as_ref().expect("influence matrices assembled");
        let b = self.geom.b.as_ref().expect("influence matrices assembled");
        let rhs = -b.dot(&self.sigmas);

        let kind = match self.config.solver {
            SolverChoice::BiCgstab => DenseSolver::BiCgstab,
            SolverChoice::Lu => DenseSolver::Lu,
        };
        let report = aero_solvers::solve(kind, a, &rhs, SOLVER_TOLERANCE)?;
        if !report.converged {
            self.any_not_converged = true;
        }

        let v_inf = self.flow.v_inf;
        for (i, bp) in self.geom.body_panels.iter_mut().enumerate() {
            bp.set_mu(report.x[i]);
            bp.set_potential(v_inf);
        }
        self.geom.set_wake_mu_from_parents(save_wake_prev, v_inf);
        Ok(report.converged)
    }

    /// Surface velocities, Cp and the force/moment integration.
    fn comp_velocity(&mut self) {
        let this = &*self;
        let extras: Vec<Vec3> = this
            .geom
            .body_panels
            .par_iter()
            .map(|bp| {
                // Particle influence on the surface is summed directly
                let mut v = Vec3::zero();
                for p in &this.particles {
                    v += p.induced_velocity(bp.base.centroid, this.config.core_overlap);
                }
                v
            })
            .collect();

        let velocities: Vec<Vec3> = (0..this.geom.n_body())
            .into_par_iter()
            .map(|i| this.geom.surface_velocity(i, this.flow.pg, this.flow.v_inf, extras[i]))
            .collect();

        self.f_body = Vec3::zero();
        self.cm = Vec3::zero();
        let (sref, bref, cref, cg) = (self.refs.sref, self.refs.bref, self.refs.cref, self.refs.cg);
        let v_mag = self.flow.v_mag;
        for (i, v) in velocities.into_iter().enumerate() {
            let bp = &mut self.geom.body_panels[i];
            bp.velocity = v;
            bp.compute_cp(v_mag);
            self.f_body += bp.base.bez_normal * (-bp.cp * bp.base.area / sref);
            let moment = bp.compute_moments(cg);
            self.cm.x += moment.x / (sref * bref);
            self.cm.y += moment.y / (sref * cref);
            self.cm.z += moment.z / (sref * bref);
        }
        self.f_wind = self.flow.body_to_wind(self.f_body);
        self.cl_history.push(self.f_wind.z);
    }

    /// Per-wake induced drag and lift on the Trefftz plane.
    fn trefftz_analysis(&mut self) {
        self.trefftz_results.clear();
        self.cl_trefftz = 0.0;
        self.cd_trefftz = 0.0;
        let pg = self.flow.pg;
        for w in 0..self.geom.wakes.len() {
            let r = trefftz_plane(self.geom, w, self.flow.v_mag, self.refs.sref);
            self.cl_trefftz += r.cl_total / pg;
            self.cd_trefftz += r.cd_total / (pg * pg);
            self.trefftz_results.push(r);
        }
    }

    /// Collapse the near-wake row into free particles, one per
    /// previously unused panel edge, and keep the bound filaments in
    /// step with the wake doublet strengths.
    fn collapse_wake_for_each_edge(&mut self) {
        let mut used_edges: HashSet<usize> = HashSet::new();
        let v_mag = self.flow.v_mag;
        let dt = self.config.time_step;

        for w in 0..self.geom.wake_panels.len() {
            if self.geom.wake_panels[w].edges.len() < 4 {
                continue;
            }
            for edge_num in 1..4 {
                let e = self.geom.wake_panels[w].edges[edge_num];
                if !used_edges.insert(e) {
                    continue;
                }
                let pos = self.seed_pos(w, edge_num);
                let strength = self.edge_strength(w, e, edge_num);
                let radius = self.geom.wake_panels[w].part_radius(v_mag, dt);
                self.particles
                    .push(Particle::new(pos, strength, radius, self.time_step, Some(w)));
            }
        }

        if self.time_step == 1 {
            // The filament is the upstream edge of the shed row, which
            // is oriented opposite to the downstream edge; hence the
            // negative strength.
            for w in 0..self.geom.wake_panels.len() {
                let wp = &self.geom.wake_panels[w];
                if wp.base.verts.len() < 4 {
                    continue;
                }
                let pio = wp.points_in_order();
                let p1 = self.geom.nodes[pio[2]].pnt;
                let p2 = self.geom.nodes[pio[3]].pnt;
                let gamma = if self.config.starting_wake {
                    -wp.base.mu
                } else {
                    0.0
                };
                let idx = self.filaments.len();
                self.filaments.push(VortexFilament::new(p1, p2, gamma, w));
                self.geom.wake_panels[w].filament = Some(idx);
            }
        } else {
            for fil in &mut self.filaments {
                fil.set_strength(-self.geom.wake_panels[fil.parent_panel].base.mu);
            }
        }
    }

    /// Particle seed position for one collapsed edge: the midpoint of
    /// two forward node projections.
    fn seed_pos(&self, w: usize, edge_num: usize) -> Vec3 {
        let dt = self.config.time_step;
        let v_inf = self.flow.v_inf;
        let pio = self.geom.wake_panels[w].points_in_order();
        let n0 = &self.geom.nodes[pio[0]];
        let n1 = &self.geom.nodes[pio[1]];
        match edge_num {
            0 => (n0.first_proj(dt, v_inf) + n1.first_proj(dt, v_inf)) * 0.5,
            1 => (n1.first_proj(dt, v_inf) + n1.sec_proj(dt, v_inf)) * 0.5,
            2 => (n0.sec_proj(dt, v_inf) + n1.sec_proj(dt, v_inf)) * 0.5,
            _ => (n0.first_proj(dt, v_inf) + n0.sec_proj(dt, v_inf)) * 0.5,
        }
    }

    /// Strength vector of a collapsed edge.
    ///
    /// A constant-doublet panel is the vortex ring of circulation μ
    /// traversed clockwise about its normal, so each edge's particle
    /// carries the ring segment in that sense. The far edge carries
    /// circulation only during the starting-wake transient; side edges
    /// carry the difference against the adjacent wake panel, or the
    /// full doublet at a free boundary.
    fn edge_strength(&self, w: usize, edge: usize, edge_num: usize) -> Vec3 {
        let wp = &self.geom.wake_panels[w];
        let pio = wp.points_in_order();
        let pnt = |i: usize| self.geom.nodes[pio[i]].pnt;

        match edge_num {
            2 => {
                let r = pnt(2) - pnt(3);
                if self.config.starting_wake {
                    r * (wp.base.mu - wp.base.prev_mu)
                } else {
                    Vec3::zero()
                }
            }
            1 => {
                let r = pnt(1) - pnt(2);
                match self.geom.edges[edge].other_wake_panel(w) {
                    Some(q) => r * (wp.base.mu - self.geom.wake_panels[q].base.mu),
                    None => r * wp.base.mu,
                }
            }
            _ => {
                let r = pnt(3) - pnt(0);
                match self.geom.edges[edge].other_wake_panel(w) {
                    Some(q) => r * (wp.base.mu - self.geom.wake_panels[q].base.mu),
                    None => r * wp.base.mu,
                }
            }
        }
    }

    fn rebuild_octree(&mut self) {
        self.octree = if self.config.accelerate && !self.particles.is_empty() {
            Some(ParticleOctree::build(
                &self.particles,
                self.config.max_tree_members,
            ))
        } else {
            None
        };
    }

    /// Total velocity at a point: freestream, body panels, wake panels,
    /// particles and filaments.
    pub fn velocity_from_everything(&self, poi: Vec3) -> Vec3 {
        let mut v = self.flow.v_inf;
        v += self.geom.body_velocity_at(poi);
        v += self.geom.wake_velocity_at(poi);
        v += self.particle_velocity(poi);
        for f in &self.filaments {
            v += f.induced_velocity(poi);
        }
        v
    }

    /// Integrate particle positions with RK4 or two-step
    /// Adams–Bashforth (falling back to forward Euler on a particle's
    /// first step). All velocities are evaluated against the frozen
    /// state; positions are written back in a second pass.
    fn convect_particles(&mut self) {
        let dt = self.config.time_step;
        let integrator = self.config.integrator;
        let this = &*self;

        let moves: Vec<(Vec3, Vec3)> = this
            .particles
            .par_iter()
            .map(|p| match integrator {
                Integrator::RungeKutta4 => {
                    let k1 = this.velocity_from_everything(p.pos);
                    let k2 = this.velocity_from_everything(p.pos + k1 * (dt / 2.0));
                    let k3 = this.velocity_from_everything(p.pos + k2 * (dt / 2.0));
                    let k4 = this.velocity_from_everything(p.pos + k3 * dt);
                    let new_pos =
                        p.pos + (k1 * (1.0 / 6.0) + k2 * (1.0 / 3.0) + k3 * (1.0 / 3.0) + k4 * (1.0 / 6.0)) * dt;
                    (new_pos, p.prev_vel_infl)
                }
                Integrator::AdamsBashforth => {
                    let v = this.velocity_from_everything(p.pos);
                    let new_pos = if p.prev_vel_infl.is_zero() {
                        p.pos + v * dt
                    } else {
                        p.pos + (v * 1.5 - p.prev_vel_infl * 0.5) * dt
                    };
                    (new_pos, v)
                }
            })
            .collect();

        for (p, (pos, vel)) in self.particles.iter_mut().zip(moves) {
            p.pos = pos;
            if integrator == Integrator::AdamsBashforth {
                p.prev_vel_infl = vel;
            }
        }
    }

    /// Apply the selected stretching/diffusion operator with two-step
    /// Adams–Bashforth, then refresh the octree surrogates.
    fn apply_strength_update(&mut self) {
        if self.config.strength_update == StrengthUpdate::None || self.particles.is_empty() {
            return;
        }

        let mode = self.config.strength_update;
        let co = self.config.core_overlap;
        let nu = self.config.viscosity;
        let dt = self.config.time_step;
        let parts = &self.particles;

        let updates: Vec<Vec3> = parts
            .par_iter()
            .enumerate()
            .map(|(i, p)| {
                let mut d_alpha = Vec3::zero();
                for (j, q) in parts.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    d_alpha += match mode {
                        StrengthUpdate::Gaussian => {
                            p.stretching_from(q, co) + p.diffusion_from(q, co, nu)
                        }
                        StrengthUpdate::Transpose => p.transpose_update_from(q, co, nu),
                        StrengthUpdate::None => Vec3::zero(),
                    };
                }
                d_alpha
            })
            .collect();

        for (p, du) in self.particles.iter_mut().zip(updates) {
            let new_strength = if p.prev_strength_update.is_zero() {
                p.strength + du * dt
            } else {
                p.strength + (du * 1.5 - p.prev_strength_update * 0.5) * dt
            };
            p.prev_strength_update = du;
            p.strength = new_strength;
        }

        self.rebuild_octree();
    }

    /// Shadow cases at α+δ and β+δ (δ = 0.5°), steady, without output;
    /// forces and moments are finite-differenced against the baseline.
    fn stability_derivatives(&mut self) -> Result<StabilityDerivatives, AeroError> {
        let delta: f64 = 0.5;
        let d_rad = delta.to_radians();

        let mut base_f = self.f_wind;
        base_f.z = self.cl_trefftz;
        base_f.x = self.cd_trefftz;
        let base_m = self.cm;

        let (fa, ma) = self.run_shadow(self.flow.alpha + delta, self.flow.beta)?;
        let (fb, mb) = self.run_shadow(self.flow.alpha, self.flow.beta + delta)?;

        Ok(StabilityDerivatives {
            df_dalpha: (fa - base_f) / d_rad,
            df_dbeta: (fb - base_f) / d_rad,
            dm_dalpha: (ma - base_m) / d_rad,
            dm_dbeta: (mb - base_m) / d_rad,
        })
    }

    fn run_shadow(&mut self, alpha: f64, beta: f64) -> Result<(Vec3, Vec3), AeroError> {
        let mut cfg = self.config.clone();
        cfg.alpha = alpha;
        cfg.beta = beta;
        cfg.vortex_particles = false;
        cfg.surf_stream_flag = false;
        cfg.stab_deriv_flag = false;
        cfg.write_vtu = false;

        let mut shadow = AeroCase::new(&mut *self.geom, &cfg, self.flow.v_mag);
        let summary = shadow.run()?;

        let mut f = summary.f_wind;
        f.z = summary.cl_trefftz;
        f.x = summary.cd_trefftz;
        Ok((f, summary.cm))
    }
}

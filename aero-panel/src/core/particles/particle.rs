//! Vortex particle with Gaussian-regularized kernels
//!
//! Pair interactions use a Gaussian smoothing of characteristic length
//! σ_ij = sqrt((c·r_i)² + (c·r_j)²)/√2 where c is the core overlap
//! factor. The strength-update operators come in two selectable forms:
//! separate He–Zhao stretching plus Ploumhans particle-strength-exchange
//! diffusion (the default), or the fused Winckelmans transpose scheme
//! with high algebraic smoothing.

use crate::core::types::Vec3;
use spec_math::cephes64::erf;
use std::f64::consts::PI;

/// Default core overlap factor c; must exceed 1 for a consistent
/// regularized vortex method.
pub const DEFAULT_CORE_OVERLAP: f64 = 1.3;

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// A free vortex particle
#[derive(Debug, Clone)]
pub struct Particle {
    /// Position
    pub pos: Vec3,
    /// Vector strength α (circulation × segment vector)
    pub strength: Vec3,
    /// Core radius
    pub radius: f64,
    /// Induced velocity at the previous step (Adams–Bashforth history)
    pub prev_vel_infl: Vec3,
    /// Strength update at the previous step (Adams–Bashforth history)
    pub prev_strength_update: Vec3,
    /// Time step at which the particle was shed
    pub shed_step: usize,
    /// Wake panel that seeded this particle (diagnostics only)
    pub parent_panel: Option<usize>,
}

impl Particle {
    /// Create a particle with zeroed integrator history.
    pub fn new(
        pos: Vec3,
        strength: Vec3,
        radius: f64,
        shed_step: usize,
        parent_panel: Option<usize>,
    ) -> Self {
        Self {
            pos,
            strength,
            radius,
            prev_vel_infl: Vec3::zero(),
            prev_strength_update: Vec3::zero(),
            shed_step,
            parent_panel,
        }
    }

    /// Velocity induced by this particle at an arbitrary point.
    ///
    /// The smoothing radius is not symmetrized since the target carries
    /// no core of its own.
    pub fn induced_velocity(&self, poi: Vec3, core_overlap: f64) -> Vec3 {
        gaussian_velocity(self.pos, self.strength, core_overlap * self.radius, poi)
    }

    /// Velocity induced by this particle on another particle, with the
    /// symmetrized smoothing radius σ_ij.
    pub fn induced_velocity_sym(&self, target: &Particle, core_overlap: f64) -> Vec3 {
        let sigma = symmetrized_sigma(self.radius, target.radius, core_overlap);
        gaussian_velocity(self.pos, self.strength, sigma, target.pos)
    }

    /// Vortex stretching rate ∂α/∂t of *this* particle due to `other`
    /// (He–Zhao form). Contributions beyond 5 core radii are cut off.
    pub fn stretching_from(&self, other: &Particle, core_overlap: f64) -> Vec3 {
        let d = self.pos - other.pos;
        let dist = d.norm();
        if dist < 1e-12 || dist > 5.0 * self.radius {
            return Vec3::zero();
        }

        let sigma = symmetrized_sigma(self.radius, other.radius, core_overlap);
        let rho = dist / sigma;

        let g = erf(rho / SQRT_2) / (4.0 * PI * rho);
        let xi = (-0.5 * rho * rho).exp() / (2.0 * PI).powf(1.5);
        let k = (g - xi) / (rho * rho);
        let f = (3.0 * k - xi) / (rho * rho);

        // M α_i with M_kl = K δ_kl - F/σ² d_k d_l, then α_j × (M α_i)
        let m_alpha = self.strength * k - d * (f / (sigma * sigma) * d.dot(&self.strength));
        other.strength.cross(&m_alpha) * (1.0 / (sigma * sigma * sigma))
    }

    /// Viscous diffusion rate of *this* particle due to `other` by
    /// particle-strength exchange (Ploumhans).
    pub fn diffusion_from(&self, other: &Particle, core_overlap: f64, nu: f64) -> Vec3 {
        let d = self.pos - other.pos;
        let dist = d.norm();
        if dist < 1e-12 {
            return Vec3::zero();
        }

        let sigma = symmetrized_sigma(self.radius, other.radius, core_overlap);
        let rho = dist / sigma;

        let vol_i = 4.0 * PI / 3.0 * self.radius.powi(3);
        let vol_j = 4.0 * PI / 3.0 * other.radius.powi(3);

        let xi = (-0.5 * rho * rho).exp() / ((2.0 * PI).powf(1.5) * rho.powi(3));

        (other.strength * vol_i - self.strength * vol_j) * (2.0 * nu / (sigma * sigma) * xi)
    }

    /// Fused stretching + diffusion rate of *this* particle due to
    /// `other`: the Winckelmans transpose scheme with high algebraic
    /// smoothing.
    pub fn transpose_update_from(&self, other: &Particle, core_overlap: f64, nu: f64) -> Vec3 {
        let sigma = core_overlap * self.radius;
        let d = other.pos - self.pos;
        let d2 = d.norm_sq();
        let s2 = sigma * sigma;

        let vol_i = 4.0 * PI / 3.0 * self.radius.powi(3);
        let vol_j = 4.0 * PI / 3.0 * other.radius.powi(3);

        let first = self.strength.cross(&other.strength) * ((d2 + 2.5 * s2) / (d2 + s2).powf(2.5));
        let second = d * (3.0 * (d2 + 3.5 * s2) / (d2 + s2).powf(3.5)
            * self.strength.dot(&d.cross(&other.strength)));
        let third = (other.strength * vol_i - self.strength * vol_j)
            * (105.0 * nu * s2 * s2 / (d2 + s2).powf(4.5));

        -(first + second + third) * (1.0 / (4.0 * PI))
    }

    /// Velocity at a point with the high-algebraic-smoothing kernel, the
    /// cheaper companion of the transpose strength update.
    pub fn induced_velocity_algebraic(&self, poi: Vec3, core_overlap: f64) -> Vec3 {
        let sigma = core_overlap * self.radius;
        let d = poi - self.pos;
        let d2 = d.norm_sq();
        let s2 = sigma * sigma;
        d.cross(&self.strength) * (-(d2 + 2.5 * s2) / (4.0 * PI * (d2 + s2).powf(2.5)))
    }
}

/// Gaussian-regularized velocity of a vortex element of strength α and
/// smoothing length σ located at `pos`, evaluated at `poi`.
pub fn gaussian_velocity(pos: Vec3, strength: Vec3, sigma: f64, poi: Vec3) -> Vec3 {
    let d = poi - pos;
    let dist = d.norm();
    if dist < 1e-12 || sigma < 1e-12 {
        return Vec3::zero();
    }
    let rho = dist / sigma;
    let k = (erf(rho / SQRT_2) / (4.0 * PI * rho) - (-0.5 * rho * rho).exp() / (2.0 * PI).powf(1.5))
        / (rho * rho);
    d.cross(&strength) * (-k / (sigma * sigma * sigma))
}

fn symmetrized_sigma(r_i: f64, r_j: f64, core_overlap: f64) -> f64 {
    ((core_overlap * r_i).powi(2) + (core_overlap * r_j).powi(2)).sqrt() / SQRT_2
}

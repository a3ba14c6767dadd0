//! JSON case configuration
//!
//! One configuration drives a sweep of cases: every entry in
//! `velocities` runs over the same geometry with the same angles,
//! reusing the cached influence matrices.

use crate::core::error::AeroError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Particle convection integrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Integrator {
    /// Two-step Adams–Bashforth with a forward-Euler first step
    #[serde(rename = "adamsBashforth")]
    #[default]
    AdamsBashforth,
    /// Classical four-stage Runge–Kutta
    #[serde(rename = "rungeKutta4")]
    RungeKutta4,
}

/// Particle strength-update operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrengthUpdate {
    /// No stretching or diffusion
    #[serde(rename = "none")]
    #[default]
    None,
    /// He–Zhao stretching plus Ploumhans PSE diffusion
    #[serde(rename = "gaussian")]
    Gaussian,
    /// Fused Winckelmans transpose scheme
    #[serde(rename = "transpose")]
    Transpose,
}

/// Dense linear solver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverChoice {
    /// BiCGSTAB iteration
    #[serde(rename = "biCgstab")]
    #[default]
    BiCgstab,
    /// Direct LU factorization
    #[serde(rename = "lu")]
    Lu,
}

/// One aerodynamic case configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseConfig {
    /// Path to the `.tri` geometry file
    pub geom_file: PathBuf,

    /// Freestream speeds; each runs one case
    pub velocities: Vec<f64>,

    /// Angle of attack, degrees
    #[serde(default)]
    pub alpha: f64,

    /// Sideslip angle, degrees
    #[serde(default)]
    pub beta: f64,

    /// Freestream Mach number, in [0, 1)
    #[serde(default)]
    pub mach: f64,

    /// Reference area
    #[serde(default = "default_one")]
    pub sref: f64,

    /// Reference span
    #[serde(default = "default_one")]
    pub bref: f64,

    /// Reference chord
    #[serde(default = "default_one")]
    pub cref: f64,

    /// Moment reference point
    #[serde(default)]
    pub cg: [f64; 3],

    /// Shed the wake as free vortex particles
    #[serde(default)]
    pub vortex_particles: bool,

    /// Time step, seconds
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Number of unsteady steps
    #[serde(default = "default_num_steps")]
    pub num_steps: usize,

    /// Trace surface streamlines
    #[serde(default)]
    pub surf_stream_flag: bool,

    /// Finite-difference stability derivatives
    #[serde(default)]
    pub stab_deriv_flag: bool,

    /// Rewrite the influence-coefficient cache
    #[serde(default = "default_true")]
    pub write_coeff_flag: bool,

    /// Use vertex-averaged smoothed normals for force integration
    #[serde(default = "default_true")]
    pub norm_flag: bool,

    /// Accelerate particle interactions with the Barnes–Hut octree
    #[serde(default = "default_true")]
    pub accelerate: bool,

    /// Maximum particles per octree leaf
    #[serde(default = "default_max_tree_members")]
    pub max_tree_members: usize,

    /// Barnes–Hut opening angle
    #[serde(default = "default_opening_angle")]
    pub opening_angle: f64,

    /// Kinematic viscosity for the diffusion operators
    #[serde(default = "default_viscosity")]
    pub viscosity: f64,

    /// Particle core overlap factor
    #[serde(default = "default_core_overlap")]
    pub core_overlap: f64,

    /// Particle convection integrator
    #[serde(default)]
    pub integrator: Integrator,

    /// Particle strength-update operator
    #[serde(default)]
    pub strength_update: StrengthUpdate,

    /// Starting-wake transient: far-edge particles carry (μ - μ_prev)
    #[serde(default = "default_true")]
    pub starting_wake: bool,

    /// Dense solver
    #[serde(default)]
    pub solver: SolverChoice,

    /// Write VTU/CSV output files
    #[serde(default = "default_true")]
    pub write_vtu: bool,
}

fn default_one() -> f64 {
    1.0
}
fn default_time_step() -> f64 {
    0.1
}
fn default_num_steps() -> usize {
    20
}
fn default_true() -> bool {
    true
}
fn default_max_tree_members() -> usize {
    10
}
fn default_opening_angle() -> f64 {
    0.5
}
fn default_viscosity() -> f64 {
    1.983e-5
}
fn default_core_overlap() -> f64 {
    1.3
}

impl CaseConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AeroError> {
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|e| AeroError::MalformedInput {
            reason: format!("bad case configuration: {}", e),
        })
    }

    /// Path of the influence-coefficient cache for this geometry.
    pub fn inf_coeff_path(&self) -> PathBuf {
        let mut name = self.geom_file.as_os_str().to_os_string();
        name.push(".infCoeff");
        PathBuf::from(name)
    }

    /// Minimal configuration for a geometry, used by tests and demos.
    pub fn for_geometry<P: Into<PathBuf>>(geom_file: P) -> Self {
        let path: PathBuf = geom_file.into();
        serde_json::from_value(serde_json::json!({
            "geomFile": path,
            "velocities": [1.0],
        }))
        .expect("defaults are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CaseConfig::for_geometry("wing.tri");
        assert_eq!(cfg.velocities, vec![1.0]);
        assert_eq!(cfg.alpha, 0.0);
        assert_eq!(cfg.num_steps, 20);
        assert!((cfg.viscosity - 1.983e-5).abs() < 1e-20);
        assert!((cfg.core_overlap - 1.3).abs() < 1e-12);
        assert_eq!(cfg.integrator, Integrator::AdamsBashforth);
        assert_eq!(cfg.strength_update, StrengthUpdate::None);
        assert_eq!(cfg.solver, SolverChoice::BiCgstab);
        assert!(cfg.starting_wake);
        assert!(cfg.accelerate);
    }

    #[test]
    fn test_parse_full() {
        let json = r#"{
            "geomFile": "wing.tri",
            "velocities": [1.0, 2.0],
            "alpha": 5.0,
            "beta": 0.0,
            "mach": 0.2,
            "sref": 1.0, "bref": 2.0, "cref": 0.5,
            "cg": [0.125, 0.0, 0.0],
            "vortexParticles": true,
            "timeStep": 0.05,
            "numSteps": 40,
            "surfStreamFlag": true,
            "stabDerivFlag": true,
            "writeCoeffFlag": false,
            "normFlag": false,
            "integrator": "rungeKutta4",
            "strengthUpdate": "gaussian",
            "solver": "lu"
        }"#;
        let cfg: CaseConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.vortex_particles);
        assert_eq!(cfg.num_steps, 40);
        assert_eq!(cfg.integrator, Integrator::RungeKutta4);
        assert_eq!(cfg.strength_update, StrengthUpdate::Gaussian);
        assert_eq!(cfg.solver, SolverChoice::Lu);
        assert!(!cfg.write_coeff_flag);
        assert_eq!(cfg.inf_coeff_path(), PathBuf::from("wing.tri.infCoeff"));
    }

    #[test]
    fn test_missing_geometry_rejected() {
        // geomFile has no default
        assert!(serde_json::from_str::<CaseConfig>("{\"velocities\": [1.0]}").is_err());
    }
}

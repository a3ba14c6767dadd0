//! Vortex particle and filament library
//!
//! Free vorticity shed from the wake is carried by Gaussian-regularized
//! vortex particles; the most recently shed row stays attached to the
//! wake through straight vortex filaments.

pub mod filament;
pub mod particle;

pub use filament::VortexFilament;
pub use particle::{gaussian_velocity, Particle, DEFAULT_CORE_OVERLAP};

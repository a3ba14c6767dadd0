//! # Unsteady panel / vortex-particle aerodynamic solver
//!
//! Potential-flow solver for arbitrary three-dimensional geometries
//! discretized as triangular surface panels. A constant-source /
//! constant-doublet boundary-element method supplies the body solution;
//! the wake is shed as free vortex particles that are convected,
//! stretched and diffused in time, with particle self-interaction
//! accelerated by a Barnes–Hut octree.
//!
//! ## Features
//!
//! - Dense influence-coefficient assembly with the Kutta wake closure
//!   folded into the doublet matrix, persisted to a per-geometry cache
//! - Gaussian-regularized vortex particles with selectable strength
//!   update (He–Zhao stretching + Ploumhans diffusion, or the fused
//!   Winckelmans transpose scheme)
//! - Trefftz-plane induced drag and spanwise load distributions
//! - Parallel assembly and particle convection with Rayon
//!
//! The `aeropanel` binary drives one or more cases from a JSON
//! configuration; see [`core::io::config::CaseConfig`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // Scientific code often has many parameters

pub mod core;

pub use crate::core::case::{AeroCase, CaseSummary};
pub use crate::core::error::AeroError;
pub use crate::core::io::config::CaseConfig;
pub use crate::core::mesh::Graph;
pub use crate::core::types::{FlowConditions, ReferenceQuantities, Vec3};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

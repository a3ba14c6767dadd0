//! Solver error types
//!
//! A non-converged linear solve is deliberately *not* represented here:
//! it is reported as a warning banner and the case continues. Errors are
//! reserved for conditions where no meaningful result can be produced.

use crate::core::types::Vec3;
use thiserror::Error;

/// Errors produced by geometry ingest, assembly and case execution
#[derive(Error, Debug)]
pub enum AeroError {
    /// Input file could not be interpreted (bad header, index out of range)
    #[error("malformed input: {reason}")]
    MalformedInput {
        /// What was wrong
        reason: String,
    },

    /// Geometry is numerically unusable (zero-area panel, zero-length edge)
    #[error("degenerate geometry: {what} at ({:.6}, {:.6}, {:.6})", location.x, location.y, location.z)]
    DegenerateGeometry {
        /// What degenerated
        what: String,
        /// Where it happened
        location: Vec3,
    },

    /// Linear solver failure (dimension mismatch, singular direct solve)
    #[error(transparent)]
    Solver(#[from] aero_solvers::SolverError),

    /// Filesystem failure (output directory, cache file)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

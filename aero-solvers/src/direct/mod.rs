//! Direct dense solvers

pub mod lu;

pub use lu::{lu_factor, LuError, LuFactorization};

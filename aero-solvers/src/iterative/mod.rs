//! Iterative Krylov solvers

pub mod bicgstab;

pub use bicgstab::{bicgstab, BiCgstabConfig, BiCgstabSolution};

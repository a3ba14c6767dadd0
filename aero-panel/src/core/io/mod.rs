//! File ingest, configuration and output formats

pub mod cache;
pub mod config;
pub mod tri;
pub mod vtu;

pub use config::CaseConfig;
pub use tri::TriMesh;

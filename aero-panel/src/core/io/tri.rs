//! Cart3D-style `.tri` surface mesh reader
//!
//! Format: a header line with the node count N and triangle count M,
//! N lines of `x y z`, M lines of 1-based connectivity `i1 i2 i3`, and
//! M surface ids. Surface ids at or above 10000 designate wake sheets
//! shed from the lifting surface `id - 10000`.

use crate::core::error::AeroError;
use crate::core::types::Vec3;
use std::fs;
use std::path::Path;

/// A triangulated surface mesh
#[derive(Debug, Clone)]
pub struct TriMesh {
    /// Node coordinates
    pub nodes: Vec<Vec3>,
    /// Triangle connectivity, zero-based
    pub tris: Vec<[usize; 3]>,
    /// Per-triangle surface id
    pub surface_ids: Vec<i64>,
}

impl TriMesh {
    /// Read a mesh from a `.tri` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AeroError> {
        let contents = fs::read_to_string(&path)?;
        Self::parse(&contents)
    }

    /// Parse mesh contents.
    pub fn parse(contents: &str) -> Result<Self, AeroError> {
        let mut tokens = contents.split_whitespace();
        let mut next_f64 = |what: &str| -> Result<f64, AeroError> {
            tokens
                .next()
                .ok_or_else(|| AeroError::MalformedInput {
                    reason: format!("unexpected end of file while reading {}", what),
                })?
                .parse::<f64>()
                .map_err(|e| AeroError::MalformedInput {
                    reason: format!("bad {} value: {}", what, e),
                })
        };

        let n_nodes = next_f64("node count")? as usize;
        let n_tris = next_f64("triangle count")? as usize;
        if n_nodes == 0 || n_tris == 0 {
            return Err(AeroError::MalformedInput {
                reason: format!("empty mesh: {} nodes, {} triangles", n_nodes, n_tris),
            });
        }

        let mut nodes = Vec::with_capacity(n_nodes);
        for _ in 0..n_nodes {
            let x = next_f64("node x")?;
            let y = next_f64("node y")?;
            let z = next_f64("node z")?;
            nodes.push(Vec3::new(x, y, z));
        }

        let mut tris = Vec::with_capacity(n_tris);
        for t in 0..n_tris {
            let mut tri = [0usize; 3];
            for v in &mut tri {
                let idx = next_f64("connectivity index")? as i64;
                if idx < 1 || idx as usize > n_nodes {
                    return Err(AeroError::MalformedInput {
                        reason: format!(
                            "triangle {} references node {} outside 1..={}",
                            t + 1,
                            idx,
                            n_nodes
                        ),
                    });
                }
                *v = (idx - 1) as usize;
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(AeroError::MalformedInput {
                    reason: format!("triangle {} repeats a node", t + 1),
                });
            }
            tris.push(tri);
        }

        let mut surface_ids = Vec::with_capacity(n_tris);
        for _ in 0..n_tris {
            surface_ids.push(next_f64("surface id")? as i64);
        }

        Ok(Self {
            nodes,
            tris,
            surface_ids,
        })
    }

    /// Number of body (non-wake) triangles
    pub fn n_body_tris(&self) -> usize {
        self.surface_ids.iter().filter(|&&id| id < 10000).count()
    }
}

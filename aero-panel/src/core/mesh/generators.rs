//! Analytic test geometries
//!
//! Surface meshes for validation cases: a UV sphere (uniform-flow Cp
//! has the closed form 1 - (9/4)sin²θ) and a rectangular NACA 0012
//! wing with an attached wake sheet for lifting-line comparisons.

use crate::core::io::tri::TriMesh;
use crate::core::types::Vec3;
use std::f64::consts::PI;

/// Generate a UV-sphere mesh with outward-oriented triangles.
///
/// `n_theta` divisions run pole to pole, `n_phi` around the equator.
pub fn sphere_mesh(radius: f64, n_theta: usize, n_phi: usize) -> TriMesh {
    let mut nodes = Vec::new();
    let mut tris: Vec<[usize; 3]> = Vec::new();

    // North pole
    nodes.push(Vec3::new(0.0, 0.0, radius));

    for i in 1..n_theta {
        let theta = PI * i as f64 / n_theta as f64;
        for j in 0..n_phi {
            let phi = 2.0 * PI * j as f64 / n_phi as f64;
            nodes.push(Vec3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ));
        }
    }

    // South pole
    nodes.push(Vec3::new(0.0, 0.0, -radius));
    let south = nodes.len() - 1;

    // Polar caps
    for j in 0..n_phi {
        let j_next = (j + 1) % n_phi;
        tris.push([0, 1 + j, 1 + j_next]);
    }

    // Latitude bands, two triangles per quad
    for i in 0..(n_theta - 2) {
        let row = 1 + i * n_phi;
        let next_row = 1 + (i + 1) * n_phi;
        for j in 0..n_phi {
            let j_next = (j + 1) % n_phi;
            tris.push([row + j, next_row + j, row + j_next]);
            tris.push([row + j_next, next_row + j, next_row + j_next]);
        }
    }

    let last_row = 1 + (n_theta - 2) * n_phi;
    for j in 0..n_phi {
        let j_next = (j + 1) % n_phi;
        tris.push([last_row + j, south, last_row + j_next]);
    }

    let surface_ids = vec![1; tris.len()];
    TriMesh {
        nodes,
        tris,
        surface_ids,
    }
}

/// Parameters of the rectangular wing generator
#[derive(Debug, Clone)]
pub struct WingParams {
    /// Full span
    pub span: f64,
    /// Chord
    pub chord: f64,
    /// Spanwise strips
    pub n_span: usize,
    /// Chordwise panels per surface
    pub n_chord: usize,
    /// Thickness ratio (0.12 for a NACA 0012)
    pub thickness: f64,
    /// Wake sheet length in chords
    pub wake_length_chords: f64,
    /// Streamwise wake rows
    pub n_wake: usize,
    /// Body surface id (the wake sheet gets id + 10000)
    pub surf_id: i64,
}

impl Default for WingParams {
    fn default() -> Self {
        // AR = 4 with Sref = 1
        Self {
            span: 2.0,
            chord: 0.5,
            n_span: 10,
            n_chord: 8,
            thickness: 0.12,
            wake_length_chords: 10.0,
            n_wake: 4,
            surf_id: 1,
        }
    }
}

/// Closed-trailing-edge NACA 00xx half thickness at chord fraction x̄.
fn naca_half_thickness(x_bar: f64, thickness: f64) -> f64 {
    5.0 * thickness
        * (0.2969 * x_bar.sqrt() - 0.1260 * x_bar - 0.3516 * x_bar.powi(2)
            + 0.2843 * x_bar.powi(3)
            - 0.1036 * x_bar.powi(4))
}

/// Generate a closed rectangular NACA 00xx wing with tip caps and a
/// flat wake sheet shed from the trailing edge.
pub fn wing_mesh(params: &WingParams) -> TriMesh {
    let ns = params.n_span;
    let nc = params.n_chord;
    let chord = params.chord;

    // Cosine chordwise spacing, LE and TE shared between surfaces
    let x: Vec<f64> = (0..=nc)
        .map(|i| 0.5 * chord * (1.0 - (PI * i as f64 / nc as f64).cos()))
        .collect();
    let t: Vec<f64> = x
        .iter()
        .map(|&xi| chord * naca_half_thickness(xi / chord, params.thickness))
        .collect();
    let y: Vec<f64> = (0..=ns)
        .map(|j| -0.5 * params.span + params.span * j as f64 / ns as f64)
        .collect();

    let per_station = 2 * nc; // (nc+1) upper + (nc-1) interior lower
    let mut nodes = Vec::with_capacity((ns + 1) * per_station + params.n_wake * (ns + 1));
    for &yj in &y {
        for i in 0..=nc {
            nodes.push(Vec3::new(x[i], yj, t[i]));
        }
        for i in 1..nc {
            nodes.push(Vec3::new(x[i], yj, -t[i]));
        }
    }

    let upper = |j: usize, i: usize| j * per_station + i;
    let lower = |j: usize, i: usize| -> usize {
        if i == 0 || i == nc {
            upper(j, i)
        } else {
            j * per_station + (nc + 1) + (i - 1)
        }
    };

    let mut tris: Vec<[usize; 3]> = Vec::new();

    // Upper surface, outward +z
    for j in 0..ns {
        for i in 0..nc {
            let (a, b, c, d) = (upper(j, i), upper(j, i + 1), upper(j + 1, i + 1), upper(j + 1, i));
            tris.push([a, b, c]);
            tris.push([a, c, d]);
        }
    }

    // Lower surface, outward -z
    for j in 0..ns {
        for i in 0..nc {
            let (a, b, c, d) = (lower(j, i), lower(j, i + 1), lower(j + 1, i + 1), lower(j + 1, i));
            tris.push([a, c, b]);
            tris.push([a, d, c]);
        }
    }

    // Tip caps; LE and TE corners collapse to single triangles
    for (j, positive_y) in [(0usize, false), (ns, true)] {
        for i in 0..nc {
            let (u0, u1) = (upper(j, i), upper(j, i + 1));
            let (l0, l1) = (lower(j, i), lower(j, i + 1));
            if i == 0 {
                if positive_y {
                    tris.push([u0, u1, l1]);
                } else {
                    tris.push([u0, l1, u1]);
                }
            } else if i == nc - 1 {
                if positive_y {
                    tris.push([u0, u1, l0]);
                } else {
                    tris.push([u0, l0, u1]);
                }
            } else if positive_y {
                tris.push([u0, u1, l1]);
                tris.push([u0, l1, l0]);
            } else {
                tris.push([u0, l1, u1]);
                tris.push([u0, l0, l1]);
            }
        }
    }

    let n_body = tris.len();

    // Wake sheet off the trailing edge
    let wake_len = params.wake_length_chords * chord;
    let wake_base = nodes.len();
    for k in 1..=params.n_wake {
        let xw = chord + wake_len * k as f64 / params.n_wake as f64;
        for &yj in &y {
            nodes.push(Vec3::new(xw, yj, 0.0));
        }
    }
    let wake_node = |k: usize, j: usize| -> usize {
        if k == 0 {
            upper(j, nc) // trailing-edge node
        } else {
            wake_base + (k - 1) * (ns + 1) + j
        }
    };
    for k in 0..params.n_wake {
        for j in 0..ns {
            let (a, b, c, d) = (
                wake_node(k, j),
                wake_node(k + 1, j),
                wake_node(k + 1, j + 1),
                wake_node(k, j + 1),
            );
            tris.push([a, b, c]);
            tris.push([a, c, d]);
        }
    }

    let mut surface_ids = vec![params.surf_id; n_body];
    surface_ids.resize(tris.len(), params.surf_id + 10000);

    TriMesh {
        nodes,
        tris,
        surface_ids,
    }
}

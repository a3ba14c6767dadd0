//! Wake container and Trefftz-plane analysis
//!
//! A wake is the set of wake panels sharing one continuous trailing
//! edge. It keeps a bounding box and a y-sorted list of wake lines (one
//! per spanwise strip) from which spanwise circulation is interpolated
//! for the far-field induced-drag integration.

use crate::core::mesh::Graph;
use crate::core::types::Vec3;

/// One spanwise strip of the trailing edge
#[derive(Debug, Clone)]
pub struct WakeLine {
    /// First trailing-edge node (smaller y)
    pub p1: Vec3,
    /// Second trailing-edge node
    pub p2: Vec3,
    /// Wake panel whose doublet strength this line carries
    pub panel: usize,
}

impl WakeLine {
    /// Spanwise station of the line
    pub fn y(&self) -> f64 {
        0.5 * (self.p1.y + self.p2.y)
    }
}

/// A connected wake sheet
#[derive(Debug, Clone, Default)]
pub struct Wake {
    /// Member wake panels
    pub panels: Vec<usize>,
    /// Panels attached directly to the trailing edge
    pub te_panels: Vec<usize>,
    /// Wake lines sorted by y
    pub lines: Vec<WakeLine>,
    /// Upstream x of the bounding box
    pub x0: f64,
    /// Downstream x of the bounding box
    pub xf: f64,
    /// Minimum spanwise extent
    pub y_min: f64,
    /// Maximum spanwise extent
    pub y_max: f64,
    /// Minimum z of the bounding box
    pub z0: f64,
    /// Maximum z of the bounding box
    pub zf: f64,
    /// Representative sheet normal
    pub normal: Vec3,
}

impl Wake {
    /// Grow the bounding box to include a point.
    pub fn expand(&mut self, p: Vec3) {
        self.x0 = self.x0.min(p.x);
        self.xf = self.xf.max(p.x);
        self.y_min = self.y_min.min(p.y);
        self.y_max = self.y_max.max(p.y);
        self.z0 = self.z0.min(p.z);
        self.zf = self.zf.max(p.z);
    }

    /// Seed the bounding box from a first point.
    pub fn seed(&mut self, p: Vec3) {
        self.x0 = p.x;
        self.xf = p.x;
        self.y_min = p.y;
        self.y_max = p.y;
        self.z0 = p.z;
        self.zf = p.z;
    }

    /// Near-duplicate test: same x0, z0, xf, zf within ε = 10⁻².
    pub fn is_same_wake(&self, other: &Wake) -> bool {
        let eps = 1e-2;
        (self.x0 - other.x0).abs() < eps
            && (self.z0 - other.z0).abs() < eps
            && (self.xf - other.xf).abs() < eps
            && (self.zf - other.zf).abs() < eps
    }
}

/// Spanwise loads and integrated coefficients from one wake
#[derive(Debug, Clone, Default)]
pub struct TrefftzResult {
    /// Spanwise stations
    pub span_loc: Vec<f64>,
    /// Sectional lift coefficient
    pub cl: Vec<f64>,
    /// Sectional induced-drag coefficient
    pub cd: Vec<f64>,
    /// Integrated lift coefficient
    pub cl_total: f64,
    /// Integrated induced-drag coefficient
    pub cd_total: f64,
}

/// Trefftz-plane integration for one wake.
///
/// Probes circulation and radial velocity on a plane two thirds of the
/// way down the wake extent and integrates the sectional loads with
/// Simpson's rule. A wake with fewer than two spanwise strips carries
/// no circulation gradient and returns zero coefficients.
pub fn trefftz_plane(graph: &Graph, wake_idx: usize, v_mag: f64, sref: f64) -> TrefftzResult {
    let wake = &graph.wakes[wake_idx];
    if wake.lines.len() < 2 {
        return TrefftzResult::default();
    }

    let n_pnts = 164; // even, for Simpson integration
    let step = (wake.y_max - wake.y_min) / n_pnts as f64;
    let x_trefftz = wake.x0 + 2.0 * (wake.xf - wake.x0) / 3.0;

    let mut span_loc = vec![0.0; n_pnts + 1];
    let mut cl = vec![0.0; n_pnts + 1];
    let mut cd = vec![0.0; n_pnts + 1];
    span_loc[0] = wake.y_min;
    span_loc[n_pnts] = wake.y_max;

    for i in 1..n_pnts {
        let y = wake.y_min + i as f64 * step;
        span_loc[i] = y;
        let p_wake = pnt_in_wake(graph, wake, x_trefftz, y);
        let w = v_radial(graph, wake, p_wake);
        // The wake doublet is the potential jump from the lower to the
        // upper side, which is the spanwise circulation itself.
        let d_phi = wake_strength(graph, wake, y);
        cl[i] = 2.0 * d_phi / (v_mag * sref);
        cd[i] = d_phi * w / (v_mag * v_mag * sref);
    }

    let mut cl_total = 0.0;
    let mut cd_total = 0.0;
    let mut i = 0;
    while i < n_pnts - 1 {
        cl_total += step / 3.0 * (cl[i] + 4.0 * cl[i + 1] + cl[i + 2]);
        cd_total += step / 3.0 * (cd[i] + 4.0 * cd[i + 1] + cd[i + 2]);
        i += 2;
    }

    TrefftzResult {
        span_loc,
        cl,
        cd,
        cl_total,
        cd_total,
    }
}

/// Interpolated wake doublet strength at a spanwise station, with
/// linear extrapolation beyond the outermost line centers.
pub fn wake_strength(graph: &Graph, wake: &Wake, y: f64) -> f64 {
    let lines = &wake.lines;
    let strength = |line: &WakeLine| graph.wake_panels[line.panel].base.mu;

    let (l1, l2) = if y < lines[1].y() {
        (&lines[0], &lines[1])
    } else if y >= lines[lines.len() - 1].y() {
        (&lines[lines.len() - 2], &lines[lines.len() - 1])
    } else {
        let mut pair = (&lines[0], &lines[1]);
        for i in 1..lines.len() - 1 {
            if lines[i].y() <= y && lines[i + 1].y() > y {
                pair = (&lines[i], &lines[i + 1]);
            }
        }
        pair
    };

    let interp = (y - l1.y()) / (l2.y() - l1.y());
    strength(l1) + interp * (strength(l2) - strength(l1))
}

/// Project a Trefftz-plane station onto the wake sheet: find the
/// trailing edge spanning y and slide downstream to x.
fn pnt_in_wake(graph: &Graph, wake: &Wake, x: f64, y: f64) -> Vec3 {
    let y_dir = Vec3::unit_y();
    for &wp_idx in &wake.te_panels {
        let wp = &graph.wake_panels[wp_idx];
        let Some(te_edge) = wp.te_edge else { continue };
        let edge = &graph.edges[te_edge];
        let p1 = graph.nodes[edge.n1].pnt;
        let p2 = graph.nodes[edge.n2].pnt;
        if (p1.y <= y && p2.y >= y) || (p1.y >= y && p2.y <= y) {
            if (p2.y - p1.y).abs() < 1e-12 {
                continue;
            }
            let t = (y - p1.y) / (p2.y - p1.y);
            let pnt = p1 + (p2 - p1) * t;
            let mut out = -wp.base.normal.cross(&y_dir);
            if out.x < 0.0 {
                out = -out;
            }
            if out.x.abs() < 1e-12 {
                return Vec3::new(x, y, pnt.z);
            }
            let scale = (x - pnt.x) / out.x;
            return pnt + out * scale;
        }
    }
    Vec3::new(x, y, 0.0)
}

/// Radial velocity probe near a point on the wake sheet.
///
/// The probe point is pulled toward the nearer wake tip and lifted off
/// the sheet so the potential gradient is taken away from the doublet
/// jump; the in-plane components are then central differences of the
/// wake potential.
fn v_radial(graph: &Graph, wake: &Wake, p_wake: Vec3) -> f64 {
    let mut theta: f64 = std::f64::consts::FRAC_PI_4;
    let d_z_max = 0.3;

    let r = if p_wake.y >= 0.0 {
        wake.y_max - p_wake.y
    } else {
        p_wake.y - wake.y_min
    };

    let mut del_z = r * theta.sin();
    if del_z > d_z_max {
        del_z = d_z_max;
        theta = (d_z_max / r).asin();
    }

    let mut poi = Vec3::new(p_wake.x, 0.0, p_wake.z + r * theta.sin());
    poi.y = if p_wake.y >= 0.0 {
        wake.y_max - r * theta.cos()
    } else {
        wake.y_min + r * theta.cos()
    };

    let h = (0.25 * del_z).max(1e-4);
    let phi = |p: Vec3| graph.wake_potential(p);
    let v = (phi(poi + Vec3::unit_y() * h) - phi(poi - Vec3::unit_y() * h)) / (2.0 * h);
    let w = (phi(poi + Vec3::unit_z() * h) - phi(poi - Vec3::unit_z() * h)) / (2.0 * h);

    (v * v + w * w).sqrt()
}

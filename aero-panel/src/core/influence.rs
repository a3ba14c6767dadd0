//! Singularity influence kernels for flat panels
//!
//! Closed-form potential and velocity influence of a constant-strength
//! source or doublet distributed over a flat triangular (or planar
//! quadrilateral) panel, evaluated at an arbitrary point. The edge sums
//! follow the classical Hess–Smith construction in a panel-local frame;
//! the doublet potential is the signed solid angle subtended by the
//! panel, accumulated per edge-fan triangle with the Van Oosterom–
//! Strackee formula so that vertical edges need no special casing.
//!
//! ## Conventions
//!
//! Influences are returned *unnormalized*: the physical contribution of
//! a panel with strengths (σ, μ) at a point is
//!
//! ```text
//! φ = (σ · φ_src + μ · φ_dub) / 4π
//! v = (σ · v_src + μ · v_dub) / 4π
//! ```
//!
//! With the panel's vertices ordered counterclockwise about its outward
//! normal, the doublet potential influence tends to +2π as the point
//! approaches the panel interior from the outer (normal) side and −2π
//! from the inner side. The inner limit is what the Dirichlet system
//! diagonal uses. Velocity influences are the exact gradients of the
//! potential influences; the doublet velocity is evaluated as the
//! equivalent vortex ring of circulation −μ along the panel perimeter.
//!
//! Evaluation points that fall on a panel edge are short-circuited to a
//! zero edge contribution rather than treated as errors.

use crate::core::types::Vec3;

/// Distance (in panel characteristic lengths) beyond which a panel is
/// replaced by an equivalent point singularity.
pub const FAR_FIELD_FACTOR: f64 = 5.0;

const EDGE_EPS: f64 = 1e-12;

/// Potential influence per unit strength, unnormalized (×4π)
#[derive(Debug, Clone, Copy, Default)]
pub struct PotentialInfluence {
    /// Source contribution per unit σ
    pub source: f64,
    /// Doublet contribution per unit μ
    pub doublet: f64,
}

/// Velocity influence per unit strength, unnormalized (×4π)
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityInfluence {
    /// Source contribution per unit σ
    pub source: Vec3,
    /// Doublet contribution per unit μ
    pub doublet: Vec3,
}

/// Panel-local orthonormal frame (l, m, n)
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    /// First in-plane direction (along the first edge)
    pub l: Vec3,
    /// Second in-plane direction (n × l)
    pub m: Vec3,
    /// Panel normal
    pub n: Vec3,
    /// Frame origin (panel centroid)
    pub origin: Vec3,
}

impl LocalFrame {
    /// Build the local frame of a panel from its vertices and normal.
    pub fn new(pts: &[Vec3], centroid: Vec3, normal: Vec3) -> Self {
        let edge = pts[1] - pts[0];
        let l = (edge - normal * edge.dot(&normal))
            .normalized()
            .unwrap_or(Vec3::unit_x());
        let m = normal.cross(&l);
        Self {
            l,
            m,
            n: normal,
            origin: centroid,
        }
    }

    /// Transform a global point into local coordinates.
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        let d = p - self.origin;
        Vec3::new(d.dot(&self.l), d.dot(&self.m), d.dot(&self.n))
    }

    /// Rotate a local vector back to the global frame.
    pub fn to_global(&self, v: Vec3) -> Vec3 {
        self.l * v.x + self.m * v.y + self.n * v.z
    }
}

/// Potential influence of a panel at `poi`.
///
/// `char_len` is the panel's longest edge; past `FAR_FIELD_FACTOR`
/// characteristic lengths the panel collapses to a point singularity.
pub fn potential_influence(
    pts: &[Vec3],
    centroid: Vec3,
    normal: Vec3,
    area: f64,
    char_len: f64,
    poi: Vec3,
) -> PotentialInfluence {
    let d = poi - centroid;
    let rho = d.norm();

    if rho > FAR_FIELD_FACTOR * char_len {
        let r3 = rho * rho * rho;
        return PotentialInfluence {
            source: -area / rho,
            doublet: area * normal.dot(&d) / r3,
        };
    }

    let frame = LocalFrame::new(pts, centroid, normal);
    let local: Vec<Vec3> = pts.iter().map(|&p| frame.to_local(p)).collect();
    let p = frame.to_local(poi);

    let plane_eps = 1e-10 * char_len.max(1.0);
    let solid = if p.z.abs() < plane_eps {
        // Coplanar evaluation: the only interior case in practice is a
        // panel's own centroid, where the inner limit -2π applies.
        if point_in_polygon(&local, p.x, p.y) {
            -2.0 * std::f64::consts::PI
        } else {
            0.0
        }
    } else {
        solid_angle(pts, poi, normal)
    };

    let mut s = -p.z * solid;
    for k in 0..local.len() {
        let a = local[k];
        let b = local[(k + 1) % local.len()];
        let (h, q) = edge_terms(a, b, p);
        s -= h * q;
    }

    PotentialInfluence {
        source: -s,
        doublet: solid,
    }
}

/// Velocity influence of a panel at `poi`.
pub fn velocity_influence(
    pts: &[Vec3],
    centroid: Vec3,
    normal: Vec3,
    area: f64,
    char_len: f64,
    poi: Vec3,
) -> VelocityInfluence {
    let d = poi - centroid;
    let rho = d.norm();

    if rho > FAR_FIELD_FACTOR * char_len {
        let r3 = rho * rho * rho;
        let r5 = r3 * rho * rho;
        return VelocityInfluence {
            source: d * (area / r3),
            doublet: normal * (area / r3) - d * (3.0 * area * normal.dot(&d) / r5),
        };
    }

    let frame = LocalFrame::new(pts, centroid, normal);
    let local: Vec<Vec3> = pts.iter().map(|&p| frame.to_local(p)).collect();
    let p = frame.to_local(poi);

    let plane_eps = 1e-10 * char_len.max(1.0);
    let solid = if p.z.abs() < plane_eps {
        // Principal value on the surface: the normal jump is symmetric.
        0.0
    } else {
        solid_angle(pts, poi, normal)
    };

    // Source: v_src = ∇(-S) = n·D - Σ (n × ê_k) Q_k in the local frame
    let mut u = 0.0;
    let mut v = 0.0;
    for k in 0..local.len() {
        let a = local[k];
        let b = local[(k + 1) % local.len()];
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len < EDGE_EPS {
            continue;
        }
        let (_, q) = edge_terms(a, b, p);
        u += dy / len * q;
        v -= dx / len * q;
    }
    let v_source = frame.to_global(Vec3::new(u, v, solid));

    // Doublet: vortex ring of circulation -μ along the perimeter
    let mut ring = Vec3::zero();
    for k in 0..pts.len() {
        ring += biot_savart_segment(pts[k], pts[(k + 1) % pts.len()], poi);
    }

    VelocityInfluence {
        source: v_source,
        doublet: -ring,
    }
}

/// Unnormalized induced velocity of a straight vortex segment of unit
/// circulation from `a` to `b` at `poi` (physical velocity is Γ/4π of
/// this). Returns zero within the core cutoff of the segment.
pub fn biot_savart_segment(a: Vec3, b: Vec3, poi: Vec3) -> Vec3 {
    let r1 = poi - a;
    let r2 = poi - b;
    let r1n = r1.norm();
    let r2n = r2.norm();
    if r1n < EDGE_EPS || r2n < EDGE_EPS {
        return Vec3::zero();
    }
    let denom = r1n * r2n * (r1n * r2n + r1.dot(&r2));
    if denom.abs() < EDGE_EPS {
        return Vec3::zero();
    }
    r1.cross(&r2) * ((r1n + r2n) / denom)
}

/// Signed solid angle subtended by the panel at `poi`.
///
/// Positive on the side the outward normal points to; tends to ±2π as
/// the point approaches the panel face. Accumulated over a fan of
/// triangles with the Van Oosterom–Strackee formula.
fn solid_angle(pts: &[Vec3], poi: Vec3, _normal: Vec3) -> f64 {
    let mut omega = 0.0;
    for k in 1..(pts.len() - 1) {
        omega += triangle_solid_angle(pts[0], pts[k], pts[k + 1], poi);
    }
    -omega
}

fn triangle_solid_angle(v0: Vec3, v1: Vec3, v2: Vec3, poi: Vec3) -> f64 {
    let a = v0 - poi;
    let b = v1 - poi;
    let c = v2 - poi;
    let an = a.norm();
    let bn = b.norm();
    let cn = c.norm();
    if an < EDGE_EPS || bn < EDGE_EPS || cn < EDGE_EPS {
        return 0.0;
    }
    let numerator = a.dot(&b.cross(&c));
    let denominator = an * bn * cn + a.dot(&b) * cn + a.dot(&c) * bn + b.dot(&c) * an;
    2.0 * numerator.atan2(denominator)
}

/// Per-edge terms of the Hess–Smith sums in local coordinates:
/// the signed in-plane distance h to the edge line and the edge
/// integral Q = ln((r1+r2+d)/(r1+r2-d)).
fn edge_terms(a: Vec3, b: Vec3, p: Vec3) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d = (dx * dx + dy * dy).sqrt();
    if d < EDGE_EPS {
        return (0.0, 0.0);
    }
    let r1 = ((p.x - a.x).powi(2) + (p.y - a.y).powi(2) + p.z * p.z).sqrt();
    let r2 = ((p.x - b.x).powi(2) + (p.y - b.y).powi(2) + p.z * p.z).sqrt();
    let rnum = r1 + r2 - d;
    if rnum < EDGE_EPS {
        // Point on the edge segment: singular edge contribution is
        // short-circuited to zero.
        return (0.0, 0.0);
    }
    let h = ((p.x - a.x) * dy - (p.y - a.y) * dx) / d;
    let q = ((r1 + r2 + d) / rnum).ln();
    (h, q)
}

/// 2D point-in-polygon test (crossing number) in local coordinates.
fn point_in_polygon(local: &[Vec3], x: f64, y: f64) -> bool {
    let mut inside = false;
    let n = local.len();
    for i in 0..n {
        let a = local[i];
        let b = local[(i + 1) % n];
        if ((a.y > y) != (b.y > y))
            && (x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x)
        {
            inside = !inside;
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn unit_triangle() -> (Vec<Vec3>, Vec3, Vec3, f64, f64) {
        let pts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let centroid = Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0);
        let normal = Vec3::unit_z();
        (pts, centroid, normal, 0.5, 2.0f64.sqrt())
    }

    #[test]
    fn test_doublet_self_influence() {
        let (pts, c, n, area, len) = unit_triangle();
        let infl = potential_influence(&pts, c, n, area, len, c);
        assert_relative_eq!(infl.doublet, -2.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_doublet_approaches_two_pi() {
        let (pts, c, n, area, len) = unit_triangle();
        let above = potential_influence(&pts, c, n, area, len, c + Vec3::new(0.0, 0.0, 1e-5));
        let below = potential_influence(&pts, c, n, area, len, c - Vec3::new(0.0, 0.0, 1e-5));
        assert_relative_eq!(above.doublet, 2.0 * PI, epsilon = 1e-3);
        assert_relative_eq!(below.doublet, -2.0 * PI, epsilon = 1e-3);
    }

    #[test]
    fn test_source_potential_negative() {
        // φ_src (per unit σ, ×4π) is -∬dS/r, strictly negative.
        let (pts, c, n, area, len) = unit_triangle();
        for poi in [
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-1.0, 0.2, -0.3),
            Vec3::new(2.0, 2.0, 0.0),
        ] {
            let infl = potential_influence(&pts, c, n, area, len, poi);
            assert!(infl.source < 0.0, "source influence at {:?}", poi);
        }
    }

    #[test]
    fn test_near_far_consistency() {
        // Just inside and just outside the far-field switch the two
        // formulations must agree to leading order.
        let (pts, c, n, area, len) = unit_triangle();
        let dir = Vec3::new(0.6, 0.5, 0.63).normalized().unwrap();
        let near_pt = c + dir * (FAR_FIELD_FACTOR * len * 0.999);
        let far_pt = c + dir * (FAR_FIELD_FACTOR * len * 1.001);
        let near = potential_influence(&pts, c, n, area, len, near_pt);
        let far = potential_influence(&pts, c, n, area, len, far_pt);
        assert_relative_eq!(near.source, far.source, max_relative = 1e-2);
        assert_relative_eq!(near.doublet, far.doublet, max_relative = 2e-2);

        let vn = velocity_influence(&pts, c, n, area, len, near_pt);
        let vf = velocity_influence(&pts, c, n, area, len, far_pt);
        assert_relative_eq!(vn.source.norm(), vf.source.norm(), max_relative = 2e-2);
        assert_relative_eq!(vn.doublet.norm(), vf.doublet.norm(), max_relative = 5e-2);
    }

    /// Velocity influences are the gradients of the potential influences;
    /// verify against central differences at generic points.
    #[test]
    fn test_velocity_is_potential_gradient() {
        let (pts, c, n, area, len) = unit_triangle();
        let h = 1e-6;
        for poi in [
            Vec3::new(0.4, 0.2, 0.7),
            Vec3::new(-0.5, 0.8, -0.4),
            Vec3::new(1.5, -0.3, 0.2),
        ] {
            let vel = velocity_influence(&pts, c, n, area, len, poi);
            for (axis, (vs, vd)) in [
                (Vec3::unit_x(), (vel.source.x, vel.doublet.x)),
                (Vec3::unit_y(), (vel.source.y, vel.doublet.y)),
                (Vec3::unit_z(), (vel.source.z, vel.doublet.z)),
            ] {
                let plus = potential_influence(&pts, c, n, area, len, poi + axis * h);
                let minus = potential_influence(&pts, c, n, area, len, poi - axis * h);
                let grad_src = (plus.source - minus.source) / (2.0 * h);
                let grad_dub = (plus.doublet - minus.doublet) / (2.0 * h);
                assert_relative_eq!(vs, grad_src, max_relative = 1e-4, epsilon = 1e-6);
                assert_relative_eq!(vd, grad_dub, max_relative = 1e-4, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_source_pushes_outward() {
        let (pts, c, n, area, len) = unit_triangle();
        let above = velocity_influence(&pts, c, n, area, len, c + Vec3::new(0.0, 0.0, 0.2));
        let below = velocity_influence(&pts, c, n, area, len, c - Vec3::new(0.0, 0.0, 0.2));
        assert!(above.source.z > 0.0);
        assert!(below.source.z < 0.0);
    }

    #[test]
    fn test_quad_panel_supported() {
        let pts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let c = Vec3::new(0.5, 0.5, 0.0);
        let infl = potential_influence(&pts, c, Vec3::unit_z(), 1.0, 1.0, c);
        assert_relative_eq!(infl.doublet, -2.0 * PI, epsilon = 1e-12);

        // Symmetric above/below points see equal-magnitude source potential
        let up = potential_influence(&pts, c, Vec3::unit_z(), 1.0, 1.0, c + Vec3::unit_z());
        let dn = potential_influence(&pts, c, Vec3::unit_z(), 1.0, 1.0, c - Vec3::unit_z());
        assert_relative_eq!(up.source, dn.source, epsilon = 1e-12);
    }

    #[test]
    fn test_biot_savart_center_of_ring() {
        // Square ring, CCW about +z, unit circulation: velocity at the
        // center points along +z (right-hand rule).
        let pts = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        let mut v = Vec3::zero();
        for k in 0..4 {
            v += biot_savart_segment(pts[k], pts[(k + 1) % 4], Vec3::zero());
        }
        assert!(v.z > 0.0);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_edge_point_short_circuits() {
        let (pts, c, n, area, len) = unit_triangle();
        // Midpoint of the first edge: singular edge term must be dropped,
        // not propagated as inf/NaN.
        let poi = Vec3::new(0.5, 0.0, 0.0);
        let infl = potential_influence(&pts, c, n, area, len, poi);
        assert!(infl.source.is_finite());
        assert!(infl.doublet.is_finite());
    }
}

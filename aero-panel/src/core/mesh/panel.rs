//! Body and wake panels
//!
//! Both panel kinds share a [`PanelBase`] payload (geometry plus
//! singularity state) and expose the common capability set through the
//! [`Panel`] trait; the specialized fields live in the two concrete
//! types. Collections are kept as two typed arrays on the graph, never
//! as one heterogeneous vector.

use crate::core::error::AeroError;
use crate::core::influence::{
    potential_influence, velocity_influence, PotentialInfluence, VelocityInfluence,
};
use crate::core::types::Vec3;
use std::f64::consts::PI;

/// Shared geometric and singularity state of a panel
#[derive(Debug, Clone)]
pub struct PanelBase {
    /// Node indices (3 for triangles, 4 for quad wake panels)
    pub verts: Vec<usize>,
    /// Cached vertex coordinates in vertex order
    pub pts: Vec<Vec3>,
    /// Centroid
    pub centroid: Vec3,
    /// Outward unit normal
    pub normal: Vec3,
    /// Smoothed (vertex-averaged) normal used for force integration
    pub bez_normal: Vec3,
    /// Area
    pub area: f64,
    /// Characteristic length (longest edge)
    pub char_len: f64,
    /// Surface id from the mesh file
    pub surf_id: i64,
    /// Source strength σ
    pub sigma: f64,
    /// Doublet strength μ
    pub mu: f64,
    /// Doublet strength at the previous time step
    pub prev_mu: f64,
    /// Velocity potential at the centroid
    pub potential: f64,
}

impl PanelBase {
    /// Build a panel from ordered vertices.
    ///
    /// Fails hard on degenerate geometry (zero-length edge or vanishing
    /// area), reporting the offending location.
    pub fn new(verts: Vec<usize>, pts: Vec<Vec3>, surf_id: i64) -> Result<Self, AeroError> {
        let n = pts.len();
        let mut centroid = Vec3::zero();
        for p in &pts {
            centroid += *p;
        }
        centroid = centroid / n as f64;

        let mut char_len: f64 = 0.0;
        for k in 0..n {
            let e = (pts[(k + 1) % n] - pts[k]).norm();
            if e < 1e-12 {
                return Err(AeroError::DegenerateGeometry {
                    what: "zero-length panel edge".into(),
                    location: pts[k],
                });
            }
            char_len = char_len.max(e);
        }

        // Fan triangulation gives area and normal for both shapes
        let mut normal_sum = Vec3::zero();
        for k in 1..(n - 1) {
            normal_sum += (pts[k] - pts[0]).cross(&(pts[k + 1] - pts[0]));
        }
        let area = 0.5 * normal_sum.norm();
        let normal = normal_sum.normalized().ok_or(AeroError::DegenerateGeometry {
            what: "zero-area panel".into(),
            location: centroid,
        })?;
        if area < 1e-12 {
            return Err(AeroError::DegenerateGeometry {
                what: "zero-area panel".into(),
                location: centroid,
            });
        }

        Ok(Self {
            verts,
            pts,
            centroid,
            normal,
            bez_normal: normal,
            area,
            char_len,
            surf_id,
            sigma: 0.0,
            mu: 0.0,
            prev_mu: 0.0,
            potential: 0.0,
        })
    }

    /// Potential influence (per unit σ and μ, ×4π) at a point.
    pub fn potential_influence(&self, poi: Vec3) -> PotentialInfluence {
        potential_influence(
            &self.pts,
            self.centroid,
            self.normal,
            self.area,
            self.char_len,
            poi,
        )
    }

    /// Velocity influence (per unit σ and μ, ×4π) at a point.
    pub fn velocity_influence(&self, poi: Vec3) -> VelocityInfluence {
        velocity_influence(
            &self.pts,
            self.centroid,
            self.normal,
            self.area,
            self.char_len,
            poi,
        )
    }

    /// Physical induced velocity from the panel's current strengths.
    pub fn velocity_at(&self, poi: Vec3) -> Vec3 {
        let infl = self.velocity_influence(poi);
        (infl.source * self.sigma + infl.doublet * self.mu) * (1.0 / (4.0 * PI))
    }

    /// Physical induced potential from the panel's current strengths.
    pub fn potential_at(&self, poi: Vec3) -> f64 {
        let infl = self.potential_influence(poi);
        (infl.source * self.sigma + infl.doublet * self.mu) / (4.0 * PI)
    }
}

/// Common capability set of body and wake panels
pub trait Panel {
    /// Shared payload
    fn base(&self) -> &PanelBase;
    /// Shared payload, mutable
    fn base_mut(&mut self) -> &mut PanelBase;

    /// Panel centroid
    fn centroid(&self) -> Vec3 {
        self.base().centroid
    }

    /// Outward normal
    fn normal(&self) -> Vec3 {
        self.base().normal
    }

    /// Panel area
    fn area(&self) -> f64 {
        self.base().area
    }

    /// Doublet strength
    fn mu(&self) -> f64 {
        self.base().mu
    }

    /// Set the doublet strength
    fn set_mu(&mut self, mu: f64) {
        self.base_mut().mu = mu;
    }

    /// Source strength
    fn sigma(&self) -> f64 {
        self.base().sigma
    }

    /// Store the total velocity potential for the current freestream.
    fn set_potential(&mut self, v_inf: Vec3) {
        let b = self.base_mut();
        b.potential = v_inf.dot(&b.centroid) + b.mu;
    }
}

/// A triangular panel on the body surface
#[derive(Debug, Clone)]
pub struct BodyPanel {
    /// Shared payload
    pub base: PanelBase,
    /// Edge indices
    pub edges: Vec<usize>,
    /// Edge-adjacent body panels
    pub neighbors: Vec<usize>,
    /// Least-squares cluster (neighbors of neighbors, cone-filtered)
    pub cluster: Vec<usize>,
    /// Upper side of a trailing edge
    pub upper: bool,
    /// Lower side of a trailing edge
    pub lower: bool,
    /// Belongs to a wake-shedding (lifting) surface
    pub lifting: bool,
    /// Wing-tip panel
    pub tip: bool,
    /// Borders a sharp trailing edge without a shed wake
    pub sharp_te: bool,
    /// A surface streamline crosses this panel
    pub stream_crossed: bool,
    /// Computed surface velocity
    pub velocity: Vec3,
    /// Pressure coefficient
    pub cp: f64,
    /// Row index in the dense system
    pub index: usize,
}

impl BodyPanel {
    /// Wrap a base payload.
    pub fn new(base: PanelBase, lifting: bool, index: usize) -> Self {
        Self {
            base,
            edges: Vec::new(),
            neighbors: Vec::new(),
            cluster: Vec::new(),
            upper: false,
            lower: false,
            lifting,
            tip: false,
            sharp_te: false,
            stream_crossed: false,
            velocity: Vec3::zero(),
            cp: 0.0,
            index,
        }
    }

    /// σ := -n·V_total - V_normal_prescribed
    pub fn set_sigma(&mut self, v_total: Vec3, v_normal_prescribed: f64) {
        self.base.sigma = -self.base.normal.dot(&v_total) - v_normal_prescribed;
    }

    /// Cp = 1 - |V|²/Vmag²
    pub fn compute_cp(&mut self, v_mag: f64) {
        self.cp = 1.0 - self.velocity.norm_sq() / (v_mag * v_mag);
    }

    /// Moment contribution -Cp·area·(r - cg) × n_bez (reference-area
    /// scaling is applied by the caller per axis).
    pub fn compute_moments(&self, cg: Vec3) -> Vec3 {
        (self.base.centroid - cg).cross(&self.base.bez_normal) * (-self.cp * self.base.area)
    }
}

impl Panel for BodyPanel {
    fn base(&self) -> &PanelBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut PanelBase {
        &mut self.base
    }
}

/// A wake panel: quadrilateral in particle mode, triangular in the
/// classical wake
#[derive(Debug, Clone)]
pub struct WakePanel {
    /// Shared payload
    pub base: PanelBase,
    /// Edge indices in traversal order; for buffer quads edge 0 is the
    /// trailing edge and edge 2 the far (downstream) edge
    pub edges: Vec<usize>,
    /// Upper parent body panel
    pub upper_parent: Option<usize>,
    /// Lower parent body panel
    pub lower_parent: Option<usize>,
    /// Owning wake
    pub parent_wake: usize,
    /// Trailing edge this panel is attached to
    pub te_edge: Option<usize>,
    /// Attached vortex filament
    pub filament: Option<usize>,
    /// Part of the trailing-edge-attached row
    pub te_panel: bool,
}

impl WakePanel {
    /// Wrap a base payload.
    pub fn new(base: PanelBase) -> Self {
        Self {
            base,
            edges: Vec::new(),
            upper_parent: None,
            lower_parent: None,
            parent_wake: 0,
            te_edge: None,
            filament: None,
            te_panel: false,
        }
    }

    /// Node indices in traversal order. For buffer quads this is
    /// [te0, te1, far(te1), far(te0)].
    pub fn points_in_order(&self) -> &[usize] {
        &self.base.verts
    }

    /// Seed radius for particles collapsed from this panel: half the
    /// particle spacing along the convection direction.
    pub fn part_radius(&self, v_mag: f64, dt: f64) -> f64 {
        0.5 * v_mag * dt
    }
}

impl Panel for WakePanel {
    fn base(&self) -> &PanelBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut PanelBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tri_base() -> PanelBase {
        PanelBase::new(
            vec![0, 1, 2],
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_base_geometry() {
        let base = tri_base();
        assert_relative_eq!(base.area, 0.5);
        assert_relative_eq!(base.normal.z, 1.0);
        assert_relative_eq!(base.char_len, 2.0f64.sqrt());
        assert_relative_eq!(base.centroid.x, 1.0 / 3.0);
    }

    #[test]
    fn test_degenerate_panel_rejected() {
        let r = PanelBase::new(
            vec![0, 1, 2],
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0), // collinear
            ],
            1,
        );
        assert!(matches!(r, Err(AeroError::DegenerateGeometry { .. })));

        let r = PanelBase::new(
            vec![0, 1, 2],
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0), // coincident nodes
                Vec3::new(0.0, 1.0, 0.0),
            ],
            1,
        );
        assert!(matches!(r, Err(AeroError::DegenerateGeometry { .. })));
    }

    #[test]
    fn test_set_sigma() {
        let mut p = BodyPanel::new(tri_base(), false, 0);
        p.set_sigma(Vec3::new(0.0, 0.0, 2.0), 0.0);
        // Normal is +z, so σ = -n·V = -2
        assert_relative_eq!(p.base.sigma, -2.0);
        assert_relative_eq!(p.sigma(), -2.0);
    }

    #[test]
    fn test_compute_cp_stagnation() {
        let mut p = BodyPanel::new(tri_base(), false, 0);
        p.velocity = Vec3::zero();
        p.compute_cp(1.0);
        assert_relative_eq!(p.cp, 1.0);

        p.velocity = Vec3::new(1.5, 0.0, 0.0);
        p.compute_cp(1.0);
        assert_relative_eq!(p.cp, 1.0 - 2.25);
    }

    #[test]
    fn test_quad_wake_panel_area() {
        let base = PanelBase::new(
            vec![0, 1, 2, 3],
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.5, 1.0, 0.0),
                Vec3::new(0.5, 0.0, 0.0),
            ],
            10001,
        )
        .unwrap();
        assert_relative_eq!(base.area, 0.5);
        let wp = WakePanel::new(base);
        assert_relative_eq!(wp.part_radius(1.0, 0.1), 0.05);
    }
}

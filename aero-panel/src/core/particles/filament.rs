//! Straight vortex filament
//!
//! The upstream edge of the most recently shed particle row stays bound
//! to its wake panel as a straight filament whose circulation is updated
//! in place each step.

use crate::core::influence::biot_savart_segment;
use crate::core::types::Vec3;
use std::f64::consts::PI;

/// A straight vortex filament between two points
#[derive(Debug, Clone)]
pub struct VortexFilament {
    /// First endpoint
    pub p1: Vec3,
    /// Second endpoint
    pub p2: Vec3,
    /// Circulation Γ
    pub strength: f64,
    /// Wake panel this filament was emitted from
    pub parent_panel: usize,
}

impl VortexFilament {
    /// Create a filament.
    pub fn new(p1: Vec3, p2: Vec3, strength: f64, parent_panel: usize) -> Self {
        Self {
            p1,
            p2,
            strength,
            parent_panel,
        }
    }

    /// Replace the circulation.
    pub fn set_strength(&mut self, strength: f64) {
        self.strength = strength;
    }

    /// Biot–Savart induced velocity at a point.
    pub fn induced_velocity(&self, poi: Vec3) -> Vec3 {
        biot_savart_segment(self.p1, self.p2, poi) * (self.strength / (4.0 * PI))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_filament_infinite_line_limit() {
        // A long filament approaches the 2D vortex: |v| = Γ / (2π h)
        let fil = VortexFilament::new(
            Vec3::new(-500.0, 0.0, 0.0),
            Vec3::new(500.0, 0.0, 0.0),
            2.0,
            0,
        );
        let h = 0.7;
        let v = fil.induced_velocity(Vec3::new(0.0, h, 0.0));
        assert_relative_eq!(v.norm(), 2.0 / (2.0 * PI * h), max_relative = 1e-4);
        // Right-hand rule: Γ along +x, point at +y, velocity along +z
        assert!(v.z > 0.0);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_filament_zero_on_axis() {
        let fil = VortexFilament::new(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), 1.0, 0);
        let v = fil.induced_velocity(Vec3::new(2.0, 0.0, 0.0));
        assert!(v.norm() < 1e-12);
    }
}

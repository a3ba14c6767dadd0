//! Particle octree and Barnes–Hut evaluation
//!
//! Axis-aligned cubic cells over the particle cloud. Every cell carries
//! a multipole surrogate: one virtual particle at the strength-weighted
//! centroid of its descendants, with the vector sum of their strengths
//! and the root-mean-square of their radii (conservative smoothing).
//! Queries descend the tree and use a cell's surrogate whenever
//! extent / distance falls below the opening angle.
//!
//! The tree is rebuilt from scratch after every convection step;
//! particles move too far for incremental updates to pay off.

use crate::core::particles::{gaussian_velocity, Particle};
use crate::core::types::Vec3;

/// Default maximum number of particles per leaf
pub const DEFAULT_MAX_MEMBERS: usize = 10;

/// Default Barnes–Hut opening angle
pub const DEFAULT_OPENING_ANGLE: f64 = 0.5;

const MAX_DEPTH: usize = 24;

/// Axis-aligned cubic bounding box
#[derive(Debug, Clone, Copy)]
struct Cube {
    center: Vec3,
    half: f64,
}

impl Cube {
    fn child_index(&self, p: Vec3) -> usize {
        let mut idx = 0;
        if p.x >= self.center.x {
            idx |= 1;
        }
        if p.y >= self.center.y {
            idx |= 2;
        }
        if p.z >= self.center.z {
            idx |= 4;
        }
        idx
    }

    fn child(&self, idx: usize) -> Cube {
        let h = self.half / 2.0;
        let offset = Vec3::new(
            if idx & 1 != 0 { h } else { -h },
            if idx & 2 != 0 { h } else { -h },
            if idx & 4 != 0 { h } else { -h },
        );
        Cube {
            center: self.center + offset,
            half: h,
        }
    }
}

/// Multipole surrogate of a cell
#[derive(Debug, Clone, Copy, Default)]
pub struct Surrogate {
    /// Strength-weighted centroid of descendant particles
    pub pos: Vec3,
    /// Vector sum of descendant strengths
    pub strength: Vec3,
    /// Root-mean-square of descendant radii
    pub radius: f64,
    weight: f64,
    count: usize,
    radius_sq_sum: f64,
}

/// One octree cell
#[derive(Debug, Clone)]
struct Cell {
    cube: Cube,
    children: Option<[usize; 8]>,
    members: Vec<usize>,
    surrogate: Surrogate,
    level: usize,
}

/// Octree over a particle set
#[derive(Debug, Clone)]
pub struct ParticleOctree {
    cells: Vec<Cell>,
    max_members: usize,
}

impl ParticleOctree {
    /// Build the tree and its multipole surrogates.
    pub fn build(particles: &[Particle], max_members: usize) -> Self {
        let mut tree = Self {
            cells: Vec::new(),
            max_members: max_members.max(1),
        };
        if particles.is_empty() {
            return tree;
        }

        // Cubic root cell with a little padding
        let mut min = particles[0].pos;
        let mut max = particles[0].pos;
        for p in particles {
            min.x = min.x.min(p.pos.x);
            min.y = min.y.min(p.pos.y);
            min.z = min.z.min(p.pos.z);
            max.x = max.x.max(p.pos.x);
            max.y = max.y.max(p.pos.y);
            max.z = max.z.max(p.pos.z);
        }
        let center = (min + max) * 0.5;
        let extent = (max.x - min.x).max(max.y - min.y).max(max.z - min.z);
        let half = (extent * 0.5 * 1.01).max(1e-6);

        tree.cells.push(Cell {
            cube: Cube { center, half },
            children: None,
            members: (0..particles.len()).collect(),
            surrogate: Surrogate::default(),
            level: 0,
        });
        tree.subdivide(0, particles);
        tree.compute_surrogate(0, particles);
        tree
    }

    fn subdivide(&mut self, cell_idx: usize, particles: &[Particle]) {
        if self.cells[cell_idx].members.len() <= self.max_members
            || self.cells[cell_idx].level >= MAX_DEPTH
        {
            return;
        }

        let cube = self.cells[cell_idx].cube;
        let level = self.cells[cell_idx].level;
        let members = std::mem::take(&mut self.cells[cell_idx].members);

        let first_child = self.cells.len();
        let mut child_indices = [0usize; 8];
        for (i, ci) in child_indices.iter_mut().enumerate() {
            self.cells.push(Cell {
                cube: cube.child(i),
                children: None,
                members: Vec::new(),
                surrogate: Surrogate::default(),
                level: level + 1,
            });
            *ci = first_child + i;
        }

        for m in members {
            let octant = cube.child_index(particles[m].pos);
            self.cells[child_indices[octant]].members.push(m);
        }
        self.cells[cell_idx].children = Some(child_indices);

        for &ci in &child_indices {
            if !self.cells[ci].members.is_empty() {
                self.subdivide(ci, particles);
            }
        }
    }

    fn compute_surrogate(&mut self, cell_idx: usize, particles: &[Particle]) {
        let mut s = Surrogate::default();
        let mut weighted_pos = Vec3::zero();
        let mut plain_pos = Vec3::zero();

        if let Some(children) = self.cells[cell_idx].children {
            for ci in children {
                self.compute_surrogate(ci, particles);
                let c = self.cells[ci].surrogate;
                if c.count == 0 {
                    continue;
                }
                weighted_pos += c.pos * c.weight;
                plain_pos += c.pos * c.count as f64;
                s.strength += c.strength;
                s.weight += c.weight;
                s.count += c.count;
                s.radius_sq_sum += c.radius_sq_sum;
            }
        } else {
            for &m in &self.cells[cell_idx].members {
                let p = &particles[m];
                let w = p.strength.norm();
                weighted_pos += p.pos * w;
                plain_pos += p.pos;
                s.strength += p.strength;
                s.weight += w;
                s.count += 1;
                s.radius_sq_sum += p.radius * p.radius;
            }
        }

        if s.count > 0 {
            s.pos = if s.weight > 1e-14 {
                weighted_pos / s.weight
            } else {
                plain_pos / s.count as f64
            };
            s.radius = (s.radius_sq_sum / s.count as f64).sqrt();
        }
        self.cells[cell_idx].surrogate = s;
    }

    /// Approximate velocity induced by the whole particle set at `poi`.
    ///
    /// `theta` is the opening angle: a cell is used as its surrogate
    /// when extent / distance < theta, otherwise its children are
    /// visited. Leaves always evaluate their members directly.
    pub fn barnes_hut(
        &self,
        particles: &[Particle],
        poi: Vec3,
        theta: f64,
        core_overlap: f64,
    ) -> Vec3 {
        if self.cells.is_empty() {
            return Vec3::zero();
        }
        self.eval_cell(0, particles, poi, theta, core_overlap)
    }

    fn eval_cell(
        &self,
        cell_idx: usize,
        particles: &[Particle],
        poi: Vec3,
        theta: f64,
        core_overlap: f64,
    ) -> Vec3 {
        let cell = &self.cells[cell_idx];
        match cell.children {
            None => {
                let mut v = Vec3::zero();
                for &m in &cell.members {
                    v += particles[m].induced_velocity(poi, core_overlap);
                }
                v
            }
            Some(children) => {
                let s = &cell.surrogate;
                let dist = poi.distance_to(&s.pos);
                let extent = 2.0 * cell.cube.half;
                if dist > 1e-12 && extent / dist < theta {
                    gaussian_velocity(s.pos, s.strength, core_overlap * s.radius, poi)
                } else {
                    let mut v = Vec3::zero();
                    for ci in children {
                        if self.cells[ci].surrogate.count > 0 {
                            v += self.eval_cell(ci, particles, poi, theta, core_overlap);
                        }
                    }
                    v
                }
            }
        }
    }

    /// Number of cells in the tree
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Total particles accounted for by the root surrogate
    pub fn num_particles(&self) -> usize {
        self.cells.first().map_or(0, |c| c.surrogate.count)
    }
}

//! Geometry graph: nodes, edges, panels and wakes
//!
//! The graph owns every node, edge and panel for the duration of a
//! case. All relations are indices into arena vectors, which keeps the
//! structure trivially copyable and serializable and removes any
//! cyclic-ownership ambiguity.
//!
//! Trailing-edge invariant: an edge is marked TE iff (a) it borders
//! exactly two body panels and one wake panel, or (b) the dihedral
//! between its two body panels exceeds 4.7π/6 and both carry the same
//! surface id (a sharp trailing edge without a shed wake, used to seed
//! streamline tracing). In case (a) the wake panel's upper and lower
//! parents are picked by comparing the angles between the body-panel
//! centroid vectors and the wake normal.

pub mod generators;
pub mod panel;
pub mod wake;

pub use panel::{BodyPanel, Panel, PanelBase, WakePanel};
pub use wake::{trefftz_plane, TrefftzResult, Wake, WakeLine};

use crate::core::assembly;
use crate::core::error::AeroError;
use crate::core::influence::LocalFrame;
use crate::core::io::cache;
use crate::core::io::tri::TriMesh;
use crate::core::types::Vec3;
use ndarray::Array2;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Surface ids at or above this value designate wake sheets; the parent
/// lifting surface is `id - WAKE_ID_OFFSET`.
pub const WAKE_ID_OFFSET: i64 = 10000;

/// Dihedral threshold for a sharp trailing edge without a shed wake
pub const SHARP_TE_ANGLE: f64 = 4.7 * std::f64::consts::PI / 6.0;

/// A mesh node
#[derive(Debug, Clone)]
pub struct Node {
    /// Position
    pub pnt: Vec3,
    /// Lies on a trailing edge
    pub te: bool,
    /// Incident edges
    pub edges: Vec<usize>,
    /// Area-averaged normal of incident body panels
    pub normal: Vec3,
}

impl Node {
    /// First forward projection of the node along the freestream.
    pub fn first_proj(&self, dt: f64, v_inf: Vec3) -> Vec3 {
        self.pnt + v_inf * dt
    }

    /// Second forward projection of the node along the freestream.
    pub fn sec_proj(&self, dt: f64, v_inf: Vec3) -> Vec3 {
        self.pnt + v_inf * (2.0 * dt)
    }
}

/// An unordered pair of nodes with panel adjacency
#[derive(Debug, Clone)]
pub struct Edge {
    /// First node
    pub n1: usize,
    /// Second node
    pub n2: usize,
    /// Adjacent body panels (at most two)
    pub body_panels: Vec<usize>,
    /// Adjacent wake panels (at most two)
    pub wake_panels: Vec<usize>,
    /// Trailing-edge flag
    pub te: bool,
}

impl Edge {
    /// The wake panel across the edge from `current`, if any.
    pub fn other_wake_panel(&self, current: usize) -> Option<usize> {
        self.wake_panels.iter().copied().find(|&w| w != current)
    }

    /// The body panel across the edge from `current`, if any.
    pub fn other_body_panel(&self, current: usize) -> Option<usize> {
        self.body_panels.iter().copied().find(|&b| b != current)
    }
}

/// Graph construction options
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Replace the file wake sheet with a quad buffer row for vortex
    /// particle shedding
    pub vortex_particles: bool,
    /// Time step (sets the buffer-row depth)
    pub dt: f64,
    /// Nominal freestream speed used for the buffer-row depth
    pub input_v: f64,
    /// Use vertex-averaged smoothed normals for force integration
    pub norm_flag: bool,
    /// Minimum panels in a least-squares neighbor cluster
    pub cluster_size: usize,
    /// Cone-angle filter for cluster growth, degrees
    pub cone_angle_deg: f64,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            vortex_particles: false,
            dt: 0.1,
            input_v: 1.0,
            norm_flag: true,
            cluster_size: 5,
            cone_angle_deg: 45.0,
        }
    }
}

/// The geometry graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Nodes
    pub nodes: Vec<Node>,
    /// Edges
    pub edges: Vec<Edge>,
    /// Body panels
    pub body_panels: Vec<BodyPanel>,
    /// Wake panels
    pub wake_panels: Vec<WakePanel>,
    /// Discovered wakes
    pub wakes: Vec<Wake>,
    /// Doublet influence matrix (with the Kutta closure folded in)
    pub a: Option<Array2<f64>>,
    /// Source influence matrix
    pub b: Option<Array2<f64>>,
    /// Options the graph was built with
    pub options: GraphOptions,
}

/// Cramer solve of the 3x3 gradient normal equations; falls back to a
/// gradient-only 2x2 fit for degenerate clusters, then to zero.
fn solve_3x3_gradient(m: &[[f64; 3]; 3], rhs: &[f64; 3]) -> (f64, f64) {
    let det3 = |a: &[[f64; 3]; 3]| -> f64 {
        a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
            - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
            + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
    };

    let det = det3(m);
    if det.abs() > 1e-14 {
        let mut ml = *m;
        let mut mm = *m;
        for r in 0..3 {
            ml[r][1] = rhs[r];
            mm[r][2] = rhs[r];
        }
        return (det3(&ml) / det, det3(&mm) / det);
    }

    let det2 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    if det2.abs() > 1e-14 {
        return (
            (rhs[1] * m[2][2] - rhs[2] * m[1][2]) / det2,
            (rhs[2] * m[1][1] - rhs[1] * m[2][1]) / det2,
        );
    }
    (0.0, 0.0)
}

fn edge_between(
    edges: &mut Vec<Edge>,
    nodes: &mut [Node],
    map: &mut HashMap<(usize, usize), usize>,
    n1: usize,
    n2: usize,
) -> usize {
    let key = (n1.min(n2), n1.max(n2));
    *map.entry(key).or_insert_with(|| {
        let idx = edges.len();
        edges.push(Edge {
            n1,
            n2,
            body_panels: Vec::new(),
            wake_panels: Vec::new(),
            te: false,
        });
        nodes[n1].edges.push(idx);
        nodes[n2].edges.push(idx);
        idx
    })
}

impl Graph {
    /// Build the graph from a triangulated mesh.
    pub fn build(mesh: &TriMesh, options: GraphOptions) -> Result<Self, AeroError> {
        let mut graph = Self {
            nodes: mesh
                .nodes
                .iter()
                .map(|&pnt| Node {
                    pnt,
                    te: false,
                    edges: Vec::new(),
                    normal: Vec3::zero(),
                })
                .collect(),
            edges: Vec::new(),
            body_panels: Vec::new(),
            wake_panels: Vec::new(),
            wakes: Vec::new(),
            a: None,
            b: None,
            options,
        };

        let wake_ids: HashSet<i64> = mesh
            .surface_ids
            .iter()
            .copied()
            .filter(|&id| id >= WAKE_ID_OFFSET)
            .collect();

        let mut edge_map: HashMap<(usize, usize), usize> = HashMap::new();

        // Body panels and their edges
        for (t, tri) in mesh.tris.iter().enumerate() {
            let id = mesh.surface_ids[t];
            if id >= WAKE_ID_OFFSET {
                continue;
            }
            let pts: Vec<Vec3> = tri.iter().map(|&v| graph.nodes[v].pnt).collect();
            let base = PanelBase::new(tri.to_vec(), pts, id)?;
            let lifting = wake_ids.contains(&(id + WAKE_ID_OFFSET));
            let idx = graph.body_panels.len();
            let mut bp = BodyPanel::new(base, lifting, idx);
            for k in 0..3 {
                let e = edge_between(
                    &mut graph.edges,
                    &mut graph.nodes,
                    &mut edge_map,
                    tri[k],
                    tri[(k + 1) % 3],
                );
                graph.edges[e].body_panels.push(idx);
                bp.edges.push(e);
            }
            graph.body_panels.push(bp);
        }

        if graph.options.vortex_particles {
            graph.build_buffer_wake(mesh, &mut edge_map)?;
        } else {
            // Classical mode keeps the file wake sheet
            for (t, tri) in mesh.tris.iter().enumerate() {
                let id = mesh.surface_ids[t];
                if id < WAKE_ID_OFFSET {
                    continue;
                }
                let pts: Vec<Vec3> = tri.iter().map(|&v| graph.nodes[v].pnt).collect();
                let base = PanelBase::new(tri.to_vec(), pts, id)?;
                let idx = graph.wake_panels.len();
                let mut wp = WakePanel::new(base);
                for k in 0..3 {
                    let e = edge_between(
                        &mut graph.edges,
                        &mut graph.nodes,
                        &mut edge_map,
                        tri[k],
                        tri[(k + 1) % 3],
                    );
                    graph.edges[e].wake_panels.push(idx);
                    wp.edges.push(e);
                }
                graph.wake_panels.push(wp);
            }
        }

        graph.classify_trailing_edges();
        if !graph.options.vortex_particles {
            graph.propagate_wake_parents();
        }
        graph.set_neighbors();
        graph.discover_wakes();
        graph.smooth_normals();
        graph.build_clusters();

        log::info!(
            "graph: {} nodes, {} edges, {} body panels, {} wake panels, {} wakes",
            graph.nodes.len(),
            graph.edges.len(),
            graph.body_panels.len(),
            graph.wake_panels.len(),
            graph.wakes.len()
        );

        Ok(graph)
    }

    /// In particle mode the file's wake sheet is replaced by one quad
    /// buffer panel per trailing edge, projected one convection step
    /// downstream.
    fn build_buffer_wake(
        &mut self,
        mesh: &TriMesh,
        edge_map: &mut HashMap<(usize, usize), usize>,
    ) -> Result<(), AeroError> {
        // Which body edges does the file wake sheet touch, and with
        // which wake surface id?
        let mut touched: HashMap<usize, i64> = HashMap::new();
        for (t, tri) in mesh.tris.iter().enumerate() {
            let id = mesh.surface_ids[t];
            if id < WAKE_ID_OFFSET {
                continue;
            }
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let key = (a.min(b), a.max(b));
                if let Some(&e) = edge_map.get(&key) {
                    touched.entry(e).or_insert(id);
                }
            }
        }

        let step = Vec3::unit_x() * (self.options.input_v * self.options.dt);
        let mut proj_of: HashMap<usize, usize> = HashMap::new();

        let mut te_edges: Vec<(usize, i64)> = touched
            .iter()
            .filter(|(&e, _)| self.edges[e].body_panels.len() == 2)
            .map(|(&e, &id)| (e, id))
            .collect();
        te_edges.sort_unstable();

        for (e, wake_id) in te_edges {
            let (n1, n2) = (self.edges[e].n1, self.edges[e].n2);
            for n in [n1, n2] {
                if !proj_of.contains_key(&n) {
                    let idx = self.nodes.len();
                    self.nodes.push(Node {
                        pnt: self.nodes[n].pnt + step,
                        te: false,
                        edges: Vec::new(),
                        normal: Vec3::zero(),
                    });
                    proj_of.insert(n, idx);
                }
            }
            let (p1, p2) = (proj_of[&n1], proj_of[&n2]);

            // Order [te0, te1, far(te1), far(te0)], oriented so the
            // sheet normal prefers +z (tiebreak +y); the angle-based
            // parent test then matches geometric upper/lower.
            let mut verts = vec![n1, n2, p2, p1];
            let pts: Vec<Vec3> = verts.iter().map(|&v| self.nodes[v].pnt).collect();
            let n = (pts[1] - pts[0]).cross(&(pts[2] - pts[0]));
            if n.z < -1e-9 || (n.z.abs() <= 1e-9 && n.y < 0.0) {
                verts = vec![n2, n1, p1, p2];
            }
            let pts: Vec<Vec3> = verts.iter().map(|&v| self.nodes[v].pnt).collect();

            let base = PanelBase::new(verts.clone(), pts, wake_id)?;
            let idx = self.wake_panels.len();
            let mut wp = WakePanel::new(base);
            wp.te_panel = true;
            wp.te_edge = Some(e);
            for k in 0..4 {
                let ek = edge_between(
                    &mut self.edges,
                    &mut self.nodes,
                    edge_map,
                    verts[k],
                    verts[(k + 1) % 4],
                );
                self.edges[ek].wake_panels.push(idx);
                wp.edges.push(ek);
            }
            self.wake_panels.push(wp);
        }
        Ok(())
    }

    fn classify_trailing_edges(&mut self) {
        for e in 0..self.edges.len() {
            if self.edges[e].body_panels.len() != 2 {
                continue;
            }
            let b0 = self.edges[e].body_panels[0];
            let b1 = self.edges[e].body_panels[1];

            if self.edges[e].wake_panels.len() == 1 {
                // Case (a): shed trailing edge
                self.edges[e].te = true;
                let w = self.edges[e].wake_panels[0];
                let wp_normal = self.wake_panels[w].base.normal;
                let wp_center = self.wake_panels[w].base.centroid;

                let angle_to = |b: usize| -> f64 {
                    let v = self.body_panels[b].base.centroid - wp_center;
                    let c = v.dot(&wp_normal) / (v.norm() * wp_normal.norm());
                    c.clamp(-1.0, 1.0).acos()
                };
                let (upper, lower) = if angle_to(b0) < angle_to(b1) {
                    (b0, b1)
                } else {
                    (b1, b0)
                };
                self.wake_panels[w].upper_parent = Some(upper);
                self.wake_panels[w].lower_parent = Some(lower);
                self.wake_panels[w].te_edge = Some(e);
                self.wake_panels[w].te_panel = true;
                self.body_panels[upper].upper = true;
                self.body_panels[lower].lower = true;
                let (n1, n2) = (self.edges[e].n1, self.edges[e].n2);
                self.nodes[n1].te = true;
                self.nodes[n2].te = true;
            } else if self.edges[e].wake_panels.is_empty() {
                // Case (b): sharp edge without a shed wake, seeds
                // streamline tracing
                let cosang = self.body_panels[b0]
                    .base
                    .normal
                    .dot(&self.body_panels[b1].base.normal)
                    .clamp(-1.0, 1.0);
                let angle = cosang.acos();
                if angle > SHARP_TE_ANGLE
                    && self.body_panels[b0].base.surf_id == self.body_panels[b1].base.surf_id
                {
                    self.edges[e].te = true;
                    self.body_panels[b0].sharp_te = true;
                    self.body_panels[b1].sharp_te = true;
                    let (n1, n2) = (self.edges[e].n1, self.edges[e].n2);
                    self.nodes[n1].te = true;
                    self.nodes[n2].te = true;
                }
            }
        }
    }

    /// Classical wake sheets: panels further downstream inherit the
    /// parents of the trailing-edge panel of their spanwise strip.
    fn propagate_wake_parents(&mut self) {
        let te_info: Vec<(f64, f64, i64, Option<usize>, Option<usize>)> = self
            .wake_panels
            .iter()
            .filter(|wp| wp.te_panel)
            .map(|wp| {
                let e = &self.edges[wp.te_edge.unwrap()];
                let y1 = self.nodes[e.n1].pnt.y;
                let y2 = self.nodes[e.n2].pnt.y;
                (
                    y1.min(y2),
                    y1.max(y2),
                    wp.base.surf_id,
                    wp.upper_parent,
                    wp.lower_parent,
                )
            })
            .collect();
        if te_info.is_empty() {
            return;
        }

        for wp in &mut self.wake_panels {
            if wp.upper_parent.is_some() {
                continue;
            }
            let y = wp.base.centroid.y;
            let eps = 1e-9;
            let hit = te_info
                .iter()
                .find(|&&(lo, hi, id, _, _)| id == wp.base.surf_id && y >= lo - eps && y <= hi + eps)
                .or_else(|| {
                    // Fall back to the nearest strip of the same sheet
                    te_info
                        .iter()
                        .filter(|&&(_, _, id, _, _)| id == wp.base.surf_id)
                        .min_by(|a, b| {
                            let da = (0.5 * (a.0 + a.1) - y).abs();
                            let db = (0.5 * (b.0 + b.1) - y).abs();
                            da.partial_cmp(&db).unwrap()
                        })
                });
            if let Some(&(_, _, _, up, lo)) = hit {
                wp.upper_parent = up;
                wp.lower_parent = lo;
            }
        }
    }

    fn set_neighbors(&mut self) {
        for e in 0..self.edges.len() {
            if self.edges[e].body_panels.len() == 2 {
                let b0 = self.edges[e].body_panels[0];
                let b1 = self.edges[e].body_panels[1];
                self.body_panels[b0].neighbors.push(b1);
                self.body_panels[b1].neighbors.push(b0);
            }
        }
    }

    /// Group wake panels into connected components, then merge
    /// near-duplicate wakes (same bounding corners within ε = 10⁻²).
    fn discover_wakes(&mut self) {
        let n = self.wake_panels.len();
        if n == 0 {
            return;
        }

        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut Vec<usize>, i: usize) -> usize {
            if parent[i] != i {
                let root = find(parent, parent[i]);
                parent[i] = root;
            }
            parent[i]
        }
        for e in &self.edges {
            if e.wake_panels.len() >= 2 {
                let a = find(&mut parent, e.wake_panels[0]);
                for &w in &e.wake_panels[1..] {
                    let b = find(&mut parent, w);
                    parent[b] = a;
                }
            }
        }

        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..n {
            let root = find(&mut parent, i);
            groups.entry(root).or_default().push(i);
        }

        let mut wakes: Vec<Wake> = Vec::new();
        let mut roots: Vec<usize> = groups.keys().copied().collect();
        roots.sort_unstable();
        for root in roots {
            let members = &groups[&root];
            let mut wake = Wake {
                normal: self.wake_panels[members[0]].base.normal,
                ..Wake::default()
            };
            wake.seed(self.wake_panels[members[0]].base.pts[0]);
            for &m in members {
                for p in &self.wake_panels[m].base.pts {
                    wake.expand(*p);
                }
                wake.panels.push(m);
                if self.wake_panels[m].te_panel {
                    wake.te_panels.push(m);
                }
            }
            wakes.push(wake);
        }

        // Merge near-duplicates
        let mut merged: Vec<Wake> = Vec::new();
        for wake in wakes {
            if let Some(existing) = merged.iter_mut().find(|w| w.is_same_wake(&wake)) {
                existing.panels.extend_from_slice(&wake.panels);
                existing.te_panels.extend_from_slice(&wake.te_panels);
                existing.y_min = existing.y_min.min(wake.y_min);
                existing.y_max = existing.y_max.max(wake.y_max);
                existing.x0 = existing.x0.min(wake.x0);
                existing.xf = existing.xf.max(wake.xf);
                existing.z0 = existing.z0.min(wake.z0);
                existing.zf = existing.zf.max(wake.zf);
            } else {
                merged.push(wake);
            }
        }

        for (w, wake) in merged.iter().enumerate() {
            for &m in &wake.panels {
                self.wake_panels[m].parent_wake = w;
            }
        }

        // One wake line per trailing-edge strip, sorted spanwise
        for wake in &mut merged {
            for &m in &wake.te_panels {
                let e = &self.edges[self.wake_panels[m].te_edge.unwrap()];
                let mut p1 = self.nodes[e.n1].pnt;
                let mut p2 = self.nodes[e.n2].pnt;
                if p1.y > p2.y {
                    std::mem::swap(&mut p1, &mut p2);
                }
                wake.lines.push(WakeLine { p1, p2, panel: m });
            }
            wake.lines
                .sort_by(|a, b| a.y().partial_cmp(&b.y()).unwrap());
        }

        self.wakes = merged;
    }

    fn smooth_normals(&mut self) {
        for bp in &self.body_panels {
            let w = bp.base.normal * bp.base.area;
            for &v in &bp.base.verts {
                self.nodes[v].normal += w;
            }
        }
        for node in &mut self.nodes {
            if let Some(n) = node.normal.normalized() {
                node.normal = n;
            }
        }
        if !self.options.norm_flag {
            return;
        }
        for bp in &mut self.body_panels {
            let mut sum = Vec3::zero();
            for &v in &bp.base.verts {
                sum += self.nodes[v].normal;
            }
            bp.base.bez_normal = sum.normalized().unwrap_or(bp.base.normal);
        }
    }

    /// Grow the least-squares cluster of each body panel breadth-first
    /// from its edge neighbors, with a cone-angle filter and respect
    /// for upper/lower classification at trailing edges. Tip panels
    /// skip the cone filter so the cluster can extend laterally.
    fn build_clusters(&mut self) {
        let min_cos = self.options.cone_angle_deg.to_radians().cos();
        let target = self.options.cluster_size;

        // Lateral panels of lifting surfaces extend their cluster
        // sideways instead of crossing the tip
        for bp in &mut self.body_panels {
            bp.tip = bp.lifting && bp.base.normal.y.abs() > 0.75;
        }

        for i in 0..self.body_panels.len() {
            let seed_normal = self.body_panels[i].base.normal;
            let seed_upper = self.body_panels[i].upper;
            let seed_lower = self.body_panels[i].lower;
            let seed_tip = self.body_panels[i].tip;

            let mut cluster: Vec<usize> = Vec::new();
            let mut visited: HashSet<usize> = HashSet::new();
            visited.insert(i);
            let mut frontier: Vec<usize> = self.body_panels[i].neighbors.clone();

            while cluster.len() < target.max(1) * 3 && !frontier.is_empty() {
                let mut next: Vec<usize> = Vec::new();
                for &cand in &frontier {
                    if !visited.insert(cand) {
                        continue;
                    }
                    let c = &self.body_panels[cand];
                    if (seed_upper && c.lower) || (seed_lower && c.upper) {
                        continue;
                    }
                    if !seed_tip && c.base.normal.dot(&seed_normal) < min_cos {
                        continue;
                    }
                    cluster.push(cand);
                    next.extend_from_slice(&c.neighbors);
                }
                if cluster.len() >= target {
                    break;
                }
                frontier = next;
            }
            self.body_panels[i].cluster = cluster;
        }
    }

    /// Number of body panels (the dense system size)
    pub fn n_body(&self) -> usize {
        self.body_panels.len()
    }

    /// Number of wake panels
    pub fn n_wake(&self) -> usize {
        self.wake_panels.len()
    }

    /// Assemble or load the influence-coefficient matrices.
    ///
    /// The cache file is keyed by the geometry file name; an
    /// incompatible cache is treated as a miss and recomputed.
    pub fn ensure_influence(
        &mut self,
        cache_path: Option<&Path>,
        write_flag: bool,
    ) -> Result<(), AeroError> {
        if self.a.is_some() {
            return Ok(());
        }

        if let Some(path) = cache_path {
            if let Some((a, b)) = cache::load(path, self.n_body(), self.n_wake()) {
                log::info!("loaded influence coefficients from {}", path.display());
                self.a = Some(a);
                self.b = Some(b);
                return Ok(());
            }
        }

        let (a, b) = assembly::assemble(self);
        if write_flag {
            if let Some(path) = cache_path {
                cache::save(path, &a, &b, self.n_wake())?;
                log::info!("wrote influence coefficients to {}", path.display());
            }
        }
        self.a = Some(a);
        self.b = Some(b);
        Ok(())
    }

    /// Velocity induced by all body panels at a point.
    pub fn body_velocity_at(&self, poi: Vec3) -> Vec3 {
        let mut v = Vec3::zero();
        for bp in &self.body_panels {
            v += bp.base.velocity_at(poi);
        }
        v
    }

    /// Velocity induced by all wake panels at a point.
    pub fn wake_velocity_at(&self, poi: Vec3) -> Vec3 {
        let mut v = Vec3::zero();
        for wp in &self.wake_panels {
            v += wp.base.velocity_at(poi);
        }
        v
    }

    /// Perturbation potential of the wake sheet at a point.
    pub fn wake_potential(&self, poi: Vec3) -> f64 {
        let mut phi = 0.0;
        for wp in &self.wake_panels {
            phi += wp.base.potential_at(poi);
        }
        phi
    }

    /// Surface velocity of a body panel: weighted least-squares in-plane
    /// gradient of μ over the neighbor cluster, plus the source normal
    /// component, freestream and any additional induced velocity. The
    /// perturbation is scaled by the Prandtl–Glauert factor.
    ///
    /// The fit carries an intercept so the out-of-plane offset of a
    /// curved cluster cannot bias the gradient.
    pub fn surface_velocity(&self, i: usize, pg: f64, v_inf: Vec3, extra: Vec3) -> Vec3 {
        let bp = &self.body_panels[i];
        let frame = LocalFrame::new(&bp.base.pts, bp.base.centroid, bp.base.normal);

        // Normal equations of dμ ≈ c + g_l·dl + g_m·dm
        let mut m = [[0.0f64; 3]; 3];
        let mut rhs = [0.0f64; 3];
        for &k in &bp.cluster {
            let other = &self.body_panels[k];
            let d = other.base.centroid - bp.base.centroid;
            let dl = d.dot(&frame.l);
            let dm = d.dot(&frame.m);
            let dmu = other.base.mu - bp.base.mu;
            let w = 1.0 / (dl * dl + dm * dm + 1e-12);
            let row = [1.0, dl, dm];
            for r in 0..3 {
                for c in 0..3 {
                    m[r][c] += w * row[r] * row[c];
                }
                rhs[r] += w * row[r] * dmu;
            }
        }

        let (gl, gm) = solve_3x3_gradient(&m, &rhs);
        let v_tangent = frame.l * gl + frame.m * gm;
        let perturbation = v_tangent + bp.base.normal * bp.base.sigma;
        v_inf + perturbation * (1.0 / pg) + extra
    }

    /// Enforce the Kutta condition on every wake panel:
    /// μ_wake = μ(upper parent) − μ(lower parent).
    pub fn set_wake_mu_from_parents(&mut self, save_prev: bool, v_inf: Vec3) {
        for w in 0..self.wake_panels.len() {
            let (Some(u), Some(l)) = (
                self.wake_panels[w].upper_parent,
                self.wake_panels[w].lower_parent,
            ) else {
                continue;
            };
            let mu = self.body_panels[u].base.mu - self.body_panels[l].base.mu;
            let wp = &mut self.wake_panels[w];
            if save_prev {
                wp.base.prev_mu = wp.base.mu;
            }
            wp.base.mu = mu;
            wp.set_potential(v_inf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::generators::{sphere_mesh, wing_mesh, WingParams};

    #[test]
    fn test_sphere_graph_closed() {
        let mesh = sphere_mesh(1.0, 8, 12);
        let graph = Graph::build(&mesh, GraphOptions::default()).unwrap();

        assert!(graph.wake_panels.is_empty());
        assert!(graph.wakes.is_empty());

        // Closed surface: every edge borders exactly two body panels
        for e in &graph.edges {
            assert_eq!(e.body_panels.len(), 2);
            assert!(!e.te);
        }

        // Outward normals: n·(c - origin) > 0 everywhere on a sphere
        for bp in &graph.body_panels {
            assert!(bp.base.normal.dot(&bp.base.centroid) > 0.0);
        }

        // Total area approaches 4π from below
        let area: f64 = graph.body_panels.iter().map(|p| p.base.area).sum();
        assert!(area > 0.85 * 4.0 * std::f64::consts::PI);
        assert!(area < 4.0 * std::f64::consts::PI);
    }

    #[test]
    fn test_sphere_clusters() {
        let mesh = sphere_mesh(1.0, 8, 12);
        let graph = Graph::build(&mesh, GraphOptions::default()).unwrap();
        for bp in &graph.body_panels {
            assert!(
                bp.cluster.len() >= graph.options.cluster_size,
                "cluster of panel {} has only {} members",
                bp.index,
                bp.cluster.len()
            );
        }
    }

    #[test]
    fn test_wing_te_classification() {
        let mesh = wing_mesh(&WingParams::default());
        let graph = Graph::build(&mesh, GraphOptions::default()).unwrap();

        assert!(!graph.wake_panels.is_empty());
        assert_eq!(graph.wakes.len(), 1);

        let te_edges: Vec<_> = graph.edges.iter().filter(|e| e.te).collect();
        assert!(!te_edges.is_empty());

        // Every shed TE edge has two body panels and one wake panel, and
        // the wake panel knows an upper and a lower parent
        for e in te_edges.iter().filter(|e| !e.wake_panels.is_empty()) {
            assert_eq!(e.body_panels.len(), 2);
            assert_eq!(e.wake_panels.len(), 1);
            let wp = &graph.wake_panels[e.wake_panels[0]];
            let u = wp.upper_parent.unwrap();
            let l = wp.lower_parent.unwrap();
            // Upper parent sits above the lower parent on this wing
            assert!(
                graph.body_panels[u].base.centroid.z > graph.body_panels[l].base.centroid.z,
                "upper/lower parent assignment flipped"
            );
        }

        // All wake panels inherit parents (propagated downstream)
        for wp in &graph.wake_panels {
            assert!(wp.upper_parent.is_some());
            assert!(wp.lower_parent.is_some());
        }
    }

    #[test]
    fn test_wing_buffer_wake() {
        let mut opts = GraphOptions {
            vortex_particles: true,
            ..GraphOptions::default()
        };
        opts.input_v = 1.0;
        opts.dt = 0.1;
        let mesh = wing_mesh(&WingParams::default());
        let graph = Graph::build(&mesh, opts).unwrap();

        // One buffer quad per spanwise strip
        assert!(!graph.wake_panels.is_empty());
        for wp in &graph.wake_panels {
            assert_eq!(wp.base.verts.len(), 4);
            assert!(wp.te_panel);
            assert!(wp.upper_parent.is_some());
            // Buffer sheet normal prefers +z
            assert!(wp.base.normal.z > 0.0);
            // Far edge sits one convection step downstream of the TE
            let te0 = graph.nodes[wp.base.verts[0]].pnt;
            let far0 = graph.nodes[wp.base.verts[3]].pnt;
            approx::assert_relative_eq!(far0.x - te0.x, 0.1, epsilon = 1e-12);
        }

        // Wake lines sorted spanwise
        let wake = &graph.wakes[0];
        assert!(wake.lines.len() >= 2);
        for pair in wake.lines.windows(2) {
            assert!(pair[0].y() <= pair[1].y());
        }
    }

    #[test]
    fn test_wake_merge_epsilon() {
        let mut a = Wake::default();
        a.seed(Vec3::new(0.5, -1.0, 0.0));
        a.expand(Vec3::new(10.0, 1.0, 0.0));
        let mut b = Wake::default();
        b.seed(Vec3::new(0.505, 1.0, 0.003));
        b.expand(Vec3::new(10.004, 2.0, 0.0));
        assert!(a.is_same_wake(&b));

        let mut c = Wake::default();
        c.seed(Vec3::new(0.6, -1.0, 0.0));
        c.expand(Vec3::new(10.0, 1.0, 0.0));
        assert!(!a.is_same_wake(&c));
    }
}

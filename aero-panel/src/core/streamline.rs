//! Surface streamline tracing
//!
//! Streamlines are seeded at sharp trailing edges (the dihedral rule of
//! the edge classification) and marched upstream along the computed
//! surface velocity field, projecting each step back onto the nearest
//! panel. Traversed panels are flagged so downstream consumers know
//! which cells a streamline crossed.

use crate::core::mesh::Graph;
use crate::core::types::Vec3;

const MAX_STEPS: usize = 150;

/// A traced surface streamline
#[derive(Debug, Clone)]
pub struct Streamline {
    /// Polyline points, ordered downstream
    pub points: Vec<Vec3>,
    /// Surface velocity at each point
    pub velocities: Vec<Vec3>,
}

/// Trace one streamline per sharp-trailing-edge panel.
///
/// Requires surface velocities to be computed first.
pub fn trace_surface_streamlines(graph: &mut Graph) -> Vec<Streamline> {
    let seeds: Vec<usize> = graph
        .body_panels
        .iter()
        .filter(|bp| bp.sharp_te)
        .map(|bp| bp.index)
        .collect();

    let mut lines = Vec::new();
    for seed in seeds {
        if let Some(line) = trace_one(graph, seed) {
            lines.push(line);
        }
    }
    log::info!("traced {} surface streamlines", lines.len());
    lines
}

fn nearest_panel(graph: &Graph, p: Vec3) -> (usize, f64) {
    let mut best = (0usize, f64::MAX);
    for (i, bp) in graph.body_panels.iter().enumerate() {
        let d = bp.base.centroid.distance_to(&p);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn trace_one(graph: &mut Graph, seed: usize) -> Option<Streamline> {
    let step = 0.5 * graph.body_panels[seed].base.char_len;
    let leave_dist = 2.0 * graph.body_panels[seed].base.char_len;

    let mut points = Vec::new();
    let mut velocities = Vec::new();
    let mut pos = graph.body_panels[seed].base.centroid;
    let mut current = seed;

    for _ in 0..MAX_STEPS {
        let v = graph.body_panels[current].velocity;
        let Some(dir) = v.normalized() else { break };
        graph.body_panels[current].stream_crossed = true;
        points.push(pos);
        velocities.push(v);

        // March upstream and re-attach to the surface
        pos -= dir * step;
        let (next, dist) = nearest_panel(graph, pos);
        if dist > leave_dist {
            break;
        }
        let base = &graph.body_panels[next].base;
        pos -= base.normal * base.normal.dot(&(pos - base.centroid));
        current = next;
    }

    if points.len() < 2 {
        return None;
    }
    // Store the polyline running downstream
    points.reverse();
    velocities.reverse();
    Some(Streamline { points, velocities })
}

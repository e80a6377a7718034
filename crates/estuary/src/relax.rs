//! Relaxation Engine: iterative smoothing of breadth positions followed by collision repair.

use crate::breadth::Gaps;
use crate::graph::Graph;
use crate::links::{f64_cmp, sort_node_links};

/// Geometry shared by every sweep of one relaxation run.
struct Sweep<'a> {
    gaps: &'a Gaps,
    /// Link spacing used when predicting where a band meets the opposite node.
    py: f64,
    extent: f64,
    /// Re-sort columns by position after each sweep; off when the caller fixed the order.
    resort: bool,
}

/// Where a link leaving `source` should arrive at the top of `target`.
fn target_top(g: &Graph, py: f64, source: usize, target: usize) -> f64 {
    let count = g.nodes[source].source_links.len() as f64;
    let mut y = g.nodes[source].y0 - (count - 1.0) * py / 2.0;
    for &li in &g.nodes[source].source_links {
        if g.links[li].target_index == target {
            break;
        }
        y += g.links[li].thickness + py;
    }
    for &li in &g.nodes[target].target_links {
        if g.links[li].source_index == source {
            break;
        }
        y -= g.links[li].thickness;
    }
    y
}

fn source_top(g: &Graph, py: f64, source: usize, target: usize) -> f64 {
    let count = g.nodes[target].target_links.len() as f64;
    let mut y = g.nodes[target].y0 - (count - 1.0) * py / 2.0;
    for &li in &g.nodes[target].target_links {
        if g.links[li].source_index == source {
            break;
        }
        y += g.links[li].thickness + py;
    }
    for &li in &g.nodes[source].source_links {
        if g.links[li].target_index == target {
            break;
        }
        y -= g.links[li].thickness;
    }
    y
}

/// After moving `ni`, its neighbours' link lists may be out of order.
fn reorder_neighbour_links(g: &mut Graph, ni: usize) {
    let sources: Vec<usize> = g.nodes[ni]
        .target_links
        .iter()
        .map(|&li| g.links[li].source_index)
        .collect();
    let targets: Vec<usize> = g.nodes[ni]
        .source_links
        .iter()
        .map(|&li| g.links[li].target_index)
        .collect();
    for other in sources.into_iter().chain(targets) {
        sort_node_links(g, other);
    }
}

fn push_down(
    g: &mut Graph,
    gaps: &Gaps,
    layer: usize,
    column: &[usize],
    mut y: f64,
    from: usize,
    beta: f64,
) {
    for i in from..column.len() {
        let ni = column[i];
        let dy = (y - g.nodes[ni].y0) * beta;
        if dy > 1e-6 {
            g.nodes[ni].shift_y(dy);
        }
        if let Some(&next) = column.get(i + 1) {
            y = g.nodes[ni].y1 + gaps.between(layer, ni, next);
        }
    }
}

fn push_up(
    g: &mut Graph,
    gaps: &Gaps,
    layer: usize,
    column: &[usize],
    mut y: f64,
    through: usize,
    beta: f64,
) {
    for i in (0..=through).rev() {
        let ni = column[i];
        let dy = (g.nodes[ni].y1 - y) * beta;
        if dy > 1e-6 {
            g.nodes[ni].shift_y(-dy);
        }
        if i > 0 {
            y = g.nodes[ni].y0 - gaps.between(layer, column[i - 1], ni);
        }
    }
}

/// Separate overlapping nodes outward from the column's median node, then pull the column back
/// inside `0..extent`. With `beta == 1` the column ends up gap-separated and contained.
fn resolve_collisions(
    g: &mut Graph,
    sweep: &Sweep<'_>,
    layer: usize,
    column: &[usize],
    beta: f64,
) {
    if column.is_empty() {
        return;
    }
    let gaps = sweep.gaps;
    let i = column.len() / 2;
    let subject = column[i];
    if i > 0 {
        let y = g.nodes[subject].y0 - gaps.between(layer, column[i - 1], subject);
        push_up(g, gaps, layer, column, y, i - 1, beta);
    }
    if i + 1 < column.len() {
        let y = g.nodes[subject].y1 + gaps.between(layer, subject, column[i + 1]);
        push_down(g, gaps, layer, column, y, i + 1, beta);
    }
    push_up(g, gaps, layer, column, sweep.extent, column.len() - 1, beta);
    push_down(g, gaps, layer, column, 0.0, 0, beta);
}

fn finish_column(
    g: &mut Graph,
    sweep: &Sweep<'_>,
    layer: usize,
    column: &mut [usize],
    beta: f64,
) {
    if sweep.resort {
        column
            .sort_by(|&a, &b| f64_cmp(g.nodes[a].y0, g.nodes[b].y0).then_with(|| a.cmp(&b)));
    }
    resolve_collisions(g, sweep, layer, column, beta);
}

fn relax_left_to_right(
    g: &mut Graph,
    sweep: &Sweep<'_>,
    columns: &mut [Vec<usize>],
    alpha: f64,
    beta: f64,
) {
    for layer in 1..columns.len() {
        for &target in &columns[layer] {
            let mut y = 0.0;
            let mut w = 0.0;
            for &li in &g.nodes[target].target_links {
                let source = g.links[li].source_index;
                let v = g.links[li].value
                    * (g.nodes[target].layer as f64 - g.nodes[source].layer as f64);
                y += target_top(g, sweep.py, source, target) * v;
                w += v;
            }
            if w <= 0.0 {
                continue;
            }
            let dy = (y / w - g.nodes[target].y0) * alpha;
            g.nodes[target].shift_y(dy);
            reorder_neighbour_links(g, target);
        }
        finish_column(g, sweep, layer, &mut columns[layer], beta);
    }
}

fn relax_right_to_left(
    g: &mut Graph,
    sweep: &Sweep<'_>,
    columns: &mut [Vec<usize>],
    alpha: f64,
    beta: f64,
) {
    for layer in (0..columns.len().saturating_sub(1)).rev() {
        for &source in &columns[layer] {
            let mut y = 0.0;
            let mut w = 0.0;
            for &li in &g.nodes[source].source_links {
                let target = g.links[li].target_index;
                let v = g.links[li].value
                    * (g.nodes[target].layer as f64 - g.nodes[source].layer as f64);
                y += source_top(g, sweep.py, source, target) * v;
                w += v;
            }
            if w <= 0.0 {
                continue;
            }
            let dy = (y / w - g.nodes[source].y0) * alpha;
            g.nodes[source].shift_y(dy);
            reorder_neighbour_links(g, source);
        }
        finish_column(g, sweep, layer, &mut columns[layer], beta);
    }
}

/// Run `iterations` rounds of a left-to-right then a right-to-left sweep. Each sweep moves
/// nodes toward the value-weighted position of their neighbours by a decaying `alpha`; collision
/// repair strength `beta` grows to 1 on the final round.
pub(crate) fn relax(
    g: &mut Graph,
    columns: &mut [Vec<usize>],
    gaps: &Gaps,
    iterations: usize,
    extent: f64,
    resort: bool,
) {
    let sweep = Sweep {
        gaps,
        py: gaps.fixed.unwrap_or(0.0),
        extent,
        resort,
    };
    for i in 0..iterations {
        let alpha = 0.99_f64.powi(i as i32);
        let beta = (1.0 - alpha).max((i as f64 + 1.0) / iterations as f64);
        relax_left_to_right(g, &sweep, columns, alpha, beta);
        relax_right_to_left(g, &sweep, columns, alpha, beta);
    }
    tracing::debug!(iterations, columns = columns.len(), "relaxation finished");
}

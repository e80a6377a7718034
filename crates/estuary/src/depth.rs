//! Depth Assigner: forward (`depth`) and backward (`end_depth`) levels.

use crate::graph::Graph;
use crate::model::{DepthPass, LayoutWarning};
use crate::options::NodeFn;

/// Level every node breadth-first, starting from all nodes at once so that a node ends up one
/// past its deepest predecessor. Returns `false` when the pass was cut short by a cycle.
fn level_nodes(g: &Graph, pass: DepthPass, levels: &mut [usize]) -> bool {
    let n = g.nodes.len();
    let mut current: Vec<usize> = (0..n).collect();
    let mut next: Vec<usize> = Vec::new();
    let mut next_seen = vec![false; n];
    let mut x: usize = 0;
    while !current.is_empty() {
        for &ni in &current {
            levels[ni] = x;
            let node = &g.nodes[ni];
            let incident = match pass {
                DepthPass::Forward => &node.source_links,
                DepthPass::Backward => &node.target_links,
            };
            for &li in incident {
                let link = &g.links[li];
                let other = match pass {
                    DepthPass::Forward => link.target_index,
                    DepthPass::Backward => link.source_index,
                };
                if !next_seen[other] {
                    next_seen[other] = true;
                    next.push(other);
                }
            }
        }
        x += 1;
        if x > n {
            return false;
        }
        current = std::mem::take(&mut next);
        next_seen.fill(false);
    }
    true
}

fn run_pass(g: &mut Graph, pass: DepthPass, warnings: &mut Vec<LayoutWarning>) {
    let mut levels = vec![0usize; g.nodes.len()];
    if !level_nodes(g, pass, &mut levels) {
        tracing::warn!(?pass, "there is a circular link");
        warnings.push(LayoutWarning::CircularLink { pass });
    }
    for (node, level) in g.nodes.iter_mut().zip(levels) {
        match pass {
            DepthPass::Forward => node.depth = level,
            DepthPass::Backward => node.end_depth = level,
        }
    }
}

pub(crate) fn compute_depths(g: &mut Graph, warnings: &mut Vec<LayoutWarning>) {
    run_pass(g, DepthPass::Forward, warnings);
}

pub(crate) fn compute_end_depths(g: &mut Graph, warnings: &mut Vec<LayoutWarning>) {
    run_pass(g, DepthPass::Backward, warnings);
}

/// Take depths from a caller-supplied layer function. A graph of `n` nodes never needs more
/// than `n` columns, so larger layers are clamped to `n - 1`. Links that do not advance to a
/// later layer are reported, not corrected.
pub(crate) fn apply_layer_override(
    g: &mut Graph,
    set_layer: &NodeFn<usize>,
    warnings: &mut Vec<LayoutWarning>,
) {
    let last = g.nodes.len().saturating_sub(1);
    for node in &mut g.nodes {
        let requested = set_layer(&*node);
        node.depth = requested.min(last);
        if requested > last {
            tracing::warn!(key = %node.key, requested, clamped = last, "node layer out of range");
            warnings.push(LayoutWarning::LayerOutOfRange {
                key: node.key.clone(),
                requested,
                clamped: last,
            });
        }
    }
    for link in &g.links {
        if g.nodes[link.target_index].depth <= g.nodes[link.source_index].depth {
            tracing::warn!(
                source = %link.source,
                target = %link.target,
                "link does not move to a later layer"
            );
            warnings.push(LayoutWarning::InconsistentLayer {
                source: link.source.clone(),
                target: link.target.clone(),
            });
        }
    }
}

/// Number of columns implied by the assigned depths; `0` for an empty graph.
pub(crate) fn max_depth(g: &Graph) -> usize {
    g.nodes.iter().map(|n| n.depth + 1).max().unwrap_or(0)
}

//! Value Propagator.

use crate::graph::Graph;

/// Give links without a value an equal share of what their node declares beyond the known
/// sibling links. Outgoing links are resolved from their source first, the remainder from
/// their target. Links touching only undeclared nodes stay unresolved.
pub(crate) fn divide_node_value_to_links(g: &mut Graph) {
    for outgoing in [true, false] {
        for ni in 0..g.nodes.len() {
            let Some(declared) = g.declared[ni] else {
                continue;
            };
            let node = &g.nodes[ni];
            let incident = if outgoing {
                &node.source_links
            } else {
                &node.target_links
            };
            let mut known = 0.0;
            let mut unknown = Vec::new();
            for &li in incident {
                match g.link_values[li] {
                    Some(v) => known += v,
                    None => unknown.push(li),
                }
            }
            if unknown.is_empty() {
                continue;
            }
            let share = ((declared - known) / unknown.len() as f64).max(0.0);
            for li in unknown {
                g.link_values[li] = Some(share);
            }
        }
    }
}

/// `value = max(declared, Σ incoming, Σ outgoing)`; must run after every link is attached.
pub(crate) fn compute_node_values(g: &mut Graph) {
    for (link, value) in g.links.iter_mut().zip(&g.link_values) {
        link.value = value.unwrap_or(0.0).max(0.0);
    }
    for (node, declared) in g.nodes.iter_mut().zip(&g.declared) {
        let out_sum: f64 = node.source_links.iter().map(|&li| g.links[li].value).sum();
        let in_sum: f64 = node.target_links.iter().map(|&li| g.links[li].value).sum();
        node.value = declared.unwrap_or(0.0).max(out_sum).max(in_sum);
    }
}

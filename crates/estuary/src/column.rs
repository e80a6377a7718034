//! Layer/Column Mapper: column assignment and x extents along the depth axis.

use crate::graph::Graph;
use crate::model::SankeyNode;
use crate::options::{LinkWidth, NodeAlign, NodeWidth, SankeyOptions};

fn align_layer(align: &NodeAlign, g: &Graph, node: &SankeyNode, max_depth: usize) -> f64 {
    match align {
        NodeAlign::Left => node.depth as f64,
        NodeAlign::Right => max_depth as f64 - 1.0 - node.end_depth as f64,
        NodeAlign::Justify => {
            if node.source_links.is_empty() {
                max_depth as f64 - 1.0
            } else {
                node.depth as f64
            }
        }
        NodeAlign::Center => {
            if !node.target_links.is_empty() {
                node.depth as f64
            } else if !node.source_links.is_empty() {
                let min_target_depth = node
                    .source_links
                    .iter()
                    .map(|&li| g.nodes[g.links[li].target_index].depth)
                    .min()
                    .unwrap_or(0);
                min_target_depth as f64 - 1.0
            } else {
                0.0
            }
        }
        NodeAlign::Custom(f) => f(node, max_depth),
    }
}

/// Assign `layer`/`is_last_layer` and group nodes into columns.
///
/// Hierarchies and `setNodeLayer` graphs already encode their order, so their depth is the
/// column. Everything else goes through the alignment policy, floored and clamped.
pub(crate) fn assign_layers(
    g: &mut Graph,
    max_depth: usize,
    opts: &SankeyOptions,
) -> Vec<Vec<usize>> {
    let last = max_depth.saturating_sub(1);
    let authoritative = g.hierarchical || opts.set_node_layer.is_some();
    let layers: Vec<usize> = g
        .nodes
        .iter()
        .map(|node| {
            if authoritative {
                return node.depth.min(last);
            }
            let raw = align_layer(&opts.node_align, g, node, max_depth).floor();
            if raw.is_finite() {
                raw.clamp(0.0, last as f64) as usize
            } else {
                0
            }
        })
        .collect();

    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); max_depth];
    for (node, layer) in g.nodes.iter_mut().zip(layers) {
        node.layer = layer;
        node.is_last_layer = layer == last;
        columns[layer].push(node.index);
    }
    if let Some(cmp) = &opts.node_sort_by {
        for column in &mut columns {
            column.sort_by(|&a, &b| cmp(&g.nodes[a], &g.nodes[b]));
        }
    }
    columns
}

/// Place columns along the depth axis (`0..extent`).
///
/// Each column is as wide as its widest node plus the link span that follows it; the link span
/// is either configured or shares out whatever width the nodes leave free.
pub(crate) fn assign_x_extents(
    g: &mut Graph,
    columns: &[Vec<usize>],
    opts: &SankeyOptions,
    extent: f64,
) {
    let n = columns.len();
    if n == 0 {
        return;
    }

    let (constant_width, link_width) = match &opts.node_width {
        NodeWidth::Fixed(w) => (Some(w.max(0.0)), opts.link_width.clone()),
        NodeWidth::Percent(p) => {
            let step = extent / (n as f64 - 1.0 + p);
            (Some(p * step), Some(LinkWidth::Fixed((1.0 - p) * step)))
        }
        NodeWidth::Custom(_) => (None, opts.link_width.clone()),
    };
    let node_width = |node: &SankeyNode| match (&opts.node_width, constant_width) {
        (NodeWidth::Custom(f), _) => f(node).max(0.0),
        (_, Some(w)) => w,
        _ => 0.0,
    };

    let col_node_w: Vec<f64> = columns
        .iter()
        .map(|column| {
            column
                .iter()
                .map(|&ni| node_width(&g.nodes[ni]))
                .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))))
                .unwrap_or(constant_width.unwrap_or(0.0))
        })
        .collect();

    let col_link_w: Vec<f64> = match &link_width {
        Some(LinkWidth::Fixed(w)) => vec![w.max(0.0); n],
        Some(LinkWidth::Custom(f)) => columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .map(|&ni| f(&g.nodes[ni]).max(0.0))
                    .fold(0.0, f64::max)
            })
            .collect(),
        None => {
            let free = if n > 1 {
                ((extent - col_node_w.iter().sum::<f64>()) / (n as f64 - 1.0)).max(0.0)
            } else {
                0.0
            };
            vec![free; n]
        }
    };

    let mut col_x = vec![0.0; n];
    for c in 1..n {
        let step = (col_node_w[c - 1] + col_link_w[c - 1]).max(opts.min_step_width);
        col_x[c] = col_x[c - 1] + step;
    }

    for node in &mut g.nodes {
        let w = node_width(&*node);
        node.x0 = col_x[node.layer];
        node.x1 = node.x0 + w;
    }
}

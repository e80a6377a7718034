//! Breadth Initializer: node heights, gaps, initial stacking and link thickness.

use crate::graph::Graph;
use crate::options::{CrossNodeAlign, GapPosition, LinkHeight, NodeGap, NodeHeight, SankeyOptions};

/// Resolved gap policy, shared with the relaxation pass.
#[derive(Debug, Clone)]
pub(crate) struct Gaps {
    per_node: Vec<f64>,
    position: GapPosition,
    /// Per-column factor; below 1 when an overfull column had its gaps squeezed.
    scale: Vec<f64>,
    /// The fitted constant gap, when gaps are not per-node.
    pub fixed: Option<f64>,
}

impl Gaps {
    fn resolve(g: &Graph, columns: &[Vec<usize>], opts: &SankeyOptions, extent: f64) -> Self {
        let max_rows = columns.iter().map(Vec::len).max().unwrap_or(0);
        let (per_node, fixed) = match &opts.node_gap {
            NodeGap::Fixed(gap) => {
                let mut py = gap.max(0.0);
                if max_rows > 1 {
                    py = py.min(extent / (max_rows as f64 - 1.0));
                }
                (vec![py; g.nodes.len()], Some(py))
            }
            NodeGap::Custom(f) => (g.nodes.iter().map(|n| f(n).max(0.0)).collect(), None),
        };
        Self {
            per_node,
            position: opts.gap_position,
            scale: vec![1.0; columns.len()],
            fixed,
        }
    }

    /// Gap between two vertically adjacent nodes of column `layer`.
    pub fn between(&self, layer: usize, upper: usize, lower: usize) -> f64 {
        let raw = match self.position {
            GapPosition::Start => self.per_node[lower],
            GapPosition::End => self.per_node[upper],
            GapPosition::Middle => (self.per_node[upper] + self.per_node[lower]) / 2.0,
        };
        raw * self.scale[layer]
    }

    fn column_total(&self, layer: usize, column: &[usize]) -> f64 {
        column
            .windows(2)
            .map(|w| self.between(layer, w[0], w[1]))
            .sum()
    }
}

fn node_heights(
    g: &Graph,
    columns: &[Vec<usize>],
    gaps: &Gaps,
    opts: &SankeyOptions,
    extent: f64,
) -> Vec<f64> {
    let raw: Vec<f64> = if opts.equal_node_height {
        let max_rows = columns.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let h = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !column.is_empty())
            .map(|(layer, column)| (extent - gaps.column_total(layer, column)) / max_rows as f64)
            .fold(f64::INFINITY, f64::min);
        let h = if h.is_finite() { h.max(0.0) } else { 0.0 };
        vec![h; g.nodes.len()]
    } else {
        match &opts.node_height {
            Some(NodeHeight::Fixed(h)) => vec![*h; g.nodes.len()],
            Some(NodeHeight::Custom(f)) => g.nodes.iter().map(|n| f(n)).collect(),
            None => {
                let mut ky = f64::INFINITY;
                for (layer, column) in columns.iter().enumerate() {
                    let sum_values: f64 = column.iter().map(|&ni| g.nodes[ni].value).sum();
                    if sum_values <= 0.0 {
                        continue;
                    }
                    ky = ky.min((extent - gaps.column_total(layer, column)) / sum_values);
                }
                let ky = if ky.is_finite() { ky.max(0.0) } else { 0.0 };
                g.nodes.iter().map(|n| n.value * ky).collect()
            }
        }
    };
    raw.into_iter()
        .map(|h| {
            let h = if h.is_finite() { h } else { 0.0 };
            h.max(opts.min_node_height).min(opts.max_node_height).max(0.0)
        })
        .collect()
}

fn stack_column(
    g: &mut Graph,
    gaps: &Gaps,
    layer: usize,
    column: &[usize],
    heights: &[f64],
) -> f64 {
    let mut y = 0.0;
    for (i, &ni) in column.iter().enumerate() {
        if i > 0 {
            y += gaps.between(layer, column[i - 1], ni);
        }
        g.nodes[ni].y0 = y;
        g.nodes[ni].y1 = y + heights[ni];
        y = g.nodes[ni].y1;
    }
    y
}

/// Offset of the column's dominant upstream node: the source of the heaviest incoming link of
/// the column's heaviest node.
fn parent_offset(g: &Graph, column: &[usize]) -> Option<f64> {
    let heaviest = column
        .iter()
        .copied()
        .reduce(|a, b| if g.nodes[b].value > g.nodes[a].value { b } else { a })?;
    let link = g.nodes[heaviest]
        .target_links
        .iter()
        .map(|&li| &g.links[li])
        .reduce(|a, b| if b.value > a.value { b } else { a })?;
    Some(g.nodes[link.source_index].y0)
}

/// Compute node breadths and their initial top-to-bottom placement inside `0..extent`, then
/// the thickness of every link. Columns are processed left to right so that `parent` alignment
/// sees its upstream column already placed.
pub(crate) fn initialize_breadths(
    g: &mut Graph,
    columns: &[Vec<usize>],
    opts: &SankeyOptions,
    extent: f64,
) -> Gaps {
    let mut gaps = Gaps::resolve(g, columns, opts, extent);
    let mut heights = node_heights(g, columns, &gaps, opts, extent);

    for (layer, column) in columns.iter().enumerate() {
        if column.is_empty() {
            continue;
        }
        let mut used = stack_column(g, &gaps, layer, column, &heights);
        let mut delta_y = extent - used;

        if delta_y < 0.0 {
            // Overfull: squeeze the gaps first, then the nodes themselves.
            let gap_total = gaps.column_total(layer, column);
            let node_total = used - gap_total;
            if gap_total > 0.0 {
                gaps.scale[layer] = ((gap_total + delta_y) / gap_total).max(0.0);
            }
            if node_total > extent && node_total > 0.0 {
                let k = extent / node_total;
                for &ni in column {
                    heights[ni] *= k;
                }
            }
            used = stack_column(g, &gaps, layer, column, &heights);
            delta_y = (extent - used).max(0.0);
        }

        match opts.cross_node_align {
            CrossNodeAlign::Start => {}
            CrossNodeAlign::End => {
                for &ni in column {
                    g.nodes[ni].shift_y(delta_y);
                }
            }
            CrossNodeAlign::Parent => {
                let dy = parent_offset(g, column).unwrap_or(0.0).clamp(0.0, delta_y);
                for &ni in column {
                    g.nodes[ni].shift_y(dy);
                }
            }
            CrossNodeAlign::Middle => {
                let offset = delta_y / (column.len() as f64 + 1.0);
                for (i, &ni) in column.iter().enumerate() {
                    g.nodes[ni].shift_y(offset * (i as f64 + 1.0));
                }
            }
        }
    }

    compute_link_thickness(g, opts);
    gaps
}

fn compute_link_thickness(g: &mut Graph, opts: &SankeyOptions) {
    for link in &mut g.links {
        let t = match &opts.link_height {
            Some(LinkHeight::Fixed(t)) => *t,
            Some(LinkHeight::Custom(f)) => f(&*link),
            None => {
                let source = &g.nodes[link.source_index];
                let ratio = if source.value > 0.0 {
                    (link.value / source.value).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                source.breadth() * ratio
            }
        };
        let t = if t.is_finite() { t } else { 0.0 };
        link.thickness = t
            .max(opts.min_link_height)
            .min(opts.max_link_height)
            .max(0.0);
    }
}

//! The layout instance and the pipeline that drives every phase.

use crate::breadth::initialize_breadths;
use crate::column::{assign_layers, assign_x_extents};
use crate::depth::{apply_layer_override, compute_depths, compute_end_depths, max_depth};
use crate::graph::{Graph, build};
use crate::links::{compute_link_breadths, sort_all_links};
use crate::model::{LayoutOutcome, SankeyGraph, SankeyInput, Viewport};
use crate::options::{NodeGap, SankeyOptions};
use crate::orient::Orientation;
use crate::relax::relax;
use crate::value::{compute_node_values, divide_node_value_to_links};

/// A configured Sankey layout.
///
/// The instance only holds options; every [`Sankey::layout`] call builds its own graph, so a
/// single instance can be shared across threads and reused for any number of inputs.
#[derive(Debug, Clone, Default)]
pub struct Sankey {
    options: SankeyOptions,
}

impl Sankey {
    pub fn new(options: SankeyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SankeyOptions {
        &self.options
    }

    pub fn layout(&self, input: &SankeyInput, viewport: Viewport) -> LayoutOutcome {
        let opts = &self.options;
        let mut warnings = Vec::new();
        let mut g = build(input, opts, &mut warnings);

        if opts.divide_node_value_to_link {
            divide_node_value_to_links(&mut g);
        }
        compute_node_values(&mut g);

        match &opts.set_node_layer {
            Some(set_layer) => apply_layer_override(&mut g, set_layer, &mut warnings),
            // Tree depth is already the column.
            None if g.hierarchical => {}
            None => {
                compute_depths(&mut g, &mut warnings);
                if opts.node_align.needs_end_depth() {
                    compute_end_depths(&mut g, &mut warnings);
                }
            }
        }

        let max_depth = max_depth(&g);
        if max_depth == 0 {
            tracing::debug!("nothing to lay out");
            return LayoutOutcome {
                result: None,
                warnings,
            };
        }

        let orientation = Orientation {
            direction: opts.direction,
            inverse: opts.inverse,
            viewport,
        };
        let breadth_extent = orientation.breadth_extent().max(0.0);

        let mut columns = assign_layers(&mut g, max_depth, opts);
        assign_x_extents(&mut g, &columns, opts, orientation.depth_extent().max(0.0));
        let gaps = initialize_breadths(&mut g, &columns, opts, breadth_extent);
        sort_all_links(&mut g);

        if relaxation_applies(&g, &columns, opts) {
            relax(
                &mut g,
                &mut columns,
                &gaps,
                opts.iterations,
                breadth_extent,
                opts.node_sort_by.is_none(),
            );
            sort_all_links(&mut g);
        }

        compute_link_breadths(&mut g, opts.link_overlap);
        orientation.apply(&mut g);

        LayoutOutcome {
            result: Some(SankeyGraph {
                nodes: g.nodes,
                links: g.links,
                columns,
                max_depth,
            }),
            warnings,
        }
    }
}

fn relaxation_applies(g: &Graph, columns: &[Vec<usize>], opts: &SankeyOptions) -> bool {
    let reason = if g.hierarchical {
        "hierarchy input"
    } else if opts.set_node_layer.is_some() {
        "explicit node layers"
    } else if matches!(opts.node_gap, NodeGap::Custom(_)) {
        "per-node gaps"
    } else if columns.len() < 2 {
        "single column"
    } else {
        return true;
    };
    tracing::debug!(reason, "skipping relaxation");
    false
}

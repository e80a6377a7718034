use estuary::{
    Error, LayoutWarning, LinkDatum, LinkOverlap, LinkWidth, NodeAlign, NodeDatum, NodeGap,
    NodeWidth, Rect, SankeyGraph, SankeyInput, SankeyNode, SankeyOptions, Viewport,
};
use serde_json::json;
use std::sync::Arc;

const EPS: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

fn three_columns() -> SankeyInput {
    SankeyInput::links(vec![
        LinkDatum::new("a", "b", 5.0),
        LinkDatum::new("b", "c", 5.0),
        LinkDatum::new("x", "c", 2.0),
    ])
}

fn run(input: &SankeyInput, opts: &SankeyOptions) -> SankeyGraph {
    estuary::layout(input, Viewport::sized(240.0, 100.0), opts)
        .result
        .expect("layout")
}

fn x_extent(g: &SankeyGraph, key: &str) -> (f64, f64) {
    let n = g.node(key).unwrap_or_else(|| panic!("missing node {key}"));
    (n.x0, n.x1)
}

#[test]
fn percent_node_width_splits_a_uniform_step() {
    let opts = SankeyOptions {
        node_width: NodeWidth::Percent(0.2),
        node_align: NodeAlign::Left,
        ..Default::default()
    };
    let g = run(&three_columns(), &opts);
    // step = 240 / (2 + 0.2)
    let step = 240.0 / 2.2;
    let (x0, x1) = x_extent(&g, "b");
    assert!(approx_eq(x0, step));
    assert!(approx_eq(x1 - x0, 0.2 * step));
    let (_, last) = x_extent(&g, "c");
    assert!(approx_eq(last, 240.0));
}

#[test]
fn fixed_link_width_and_min_step_width() {
    let opts = SankeyOptions {
        node_width: NodeWidth::Fixed(10.0),
        link_width: Some(LinkWidth::Fixed(30.0)),
        ..Default::default()
    };
    let g = run(&three_columns(), &opts);
    assert_eq!(x_extent(&g, "b"), (40.0, 50.0));
    assert_eq!(x_extent(&g, "c"), (80.0, 90.0));

    let opts = SankeyOptions {
        min_step_width: 60.0,
        ..opts
    };
    let g = run(&three_columns(), &opts);
    assert_eq!(x_extent(&g, "c"), (120.0, 130.0));
}

#[test]
fn free_width_is_shared_between_link_spans() {
    let g = run(&three_columns(), &SankeyOptions::default());
    // (240 - 3 * 24) / 2 = 84 per link span.
    assert_eq!(x_extent(&g, "b"), (108.0, 132.0));
    assert_eq!(x_extent(&g, "c"), (216.0, 240.0));
}

#[test]
fn custom_node_width_takes_the_widest_node_per_column() {
    let opts = SankeyOptions {
        node_width: NodeWidth::Custom(Arc::new(|n: &SankeyNode| {
            if n.key == "x" { 40.0 } else { 10.0 }
        })),
        link_width: Some(LinkWidth::Fixed(20.0)),
        ..Default::default()
    };
    let g = run(&three_columns(), &opts);
    assert_eq!(x_extent(&g, "a"), (0.0, 10.0));
    assert_eq!(x_extent(&g, "x").1, 40.0);
    // Column 0 is 40 wide plus a 20 link span.
    assert_eq!(x_extent(&g, "b").0, 60.0);
}

#[test]
fn custom_alignment_is_floored_and_clamped() {
    let opts = SankeyOptions {
        node_align: NodeAlign::Custom(Arc::new(|n: &SankeyNode, max_depth: usize| {
            if n.key == "x" { max_depth as f64 + 3.0 } else { n.depth as f64 + 0.9 }
        })),
        ..Default::default()
    };
    let g = run(&three_columns(), &opts);
    assert_eq!(g.node("a").map(|n| n.layer), Some(0));
    assert_eq!(g.node("b").map(|n| n.layer), Some(1));
    assert_eq!(g.node("x").map(|n| n.layer), Some(2));
}

#[test]
fn explicit_layers_override_depths_and_report_backward_links() {
    let opts = SankeyOptions {
        set_node_layer: Some(Arc::new(|n: &SankeyNode| match n.key.as_str() {
            "a" | "x" => 0,
            "c" => 1,
            _ => 3,
        })),
        ..Default::default()
    };
    let outcome = estuary::layout(&three_columns(), Viewport::sized(240.0, 100.0), &opts);
    assert_eq!(
        outcome.warnings,
        vec![LayoutWarning::InconsistentLayer {
            source: "b".to_string(),
            target: "c".to_string(),
        }]
    );
    let g = outcome.result.expect("layout");
    assert_eq!(g.max_depth, 4);
    assert_eq!(g.node("b").map(|n| n.layer), Some(3));
    assert!(g.columns[2].is_empty());
}

#[test]
fn out_of_range_layers_are_clamped_with_a_warning() {
    let input = SankeyInput::links(vec![LinkDatum::new("a", "b", 1.0)]);
    let opts = SankeyOptions {
        set_node_layer: Some(Arc::new(|n: &SankeyNode| {
            if n.key == "b" { usize::MAX } else { 0 }
        })),
        ..Default::default()
    };
    let outcome = estuary::layout(&input, Viewport::sized(240.0, 100.0), &opts);
    assert_eq!(
        outcome.warnings,
        vec![LayoutWarning::LayerOutOfRange {
            key: "b".to_string(),
            requested: usize::MAX,
            clamped: 1,
        }]
    );
    let g = outcome.result.expect("layout");
    assert_eq!(g.max_depth, 2);
    assert_eq!(g.node("b").map(|n| n.layer), Some(1));
    assert_eq!(g.columns.len(), 2);
}

#[test]
fn node_sort_fixes_the_order_within_columns() {
    let input = SankeyInput::links(vec![
        LinkDatum::new("small", "sink", 1.0),
        LinkDatum::new("big", "sink", 9.0),
    ]);
    let opts = SankeyOptions {
        node_sort_by: Some(Arc::new(|a: &SankeyNode, b: &SankeyNode| b.key.cmp(&a.key))),
        ..Default::default()
    };
    let g = run(&input, &opts);
    let order: Vec<&str> = g.columns[0].iter().map(|&i| g.nodes[i].key.as_str()).collect();
    assert_eq!(order, ["small", "big"]);
    let (small, big) = (g.node("small").expect("small"), g.node("big").expect("big"));
    assert!(small.y1 <= big.y0);
}

#[test]
fn per_node_gaps_keep_the_initial_placement() {
    let input = three_columns();
    let opts = SankeyOptions {
        node_gap: NodeGap::Custom(Arc::new(|_: &SankeyNode| 10.0)),
        iterations: 32,
        ..Default::default()
    };
    let relaxed_away = SankeyOptions {
        iterations: 0,
        ..opts.clone()
    };
    assert_eq!(run(&input, &opts), run(&input, &relaxed_away));
}

#[test]
fn overlapping_links_share_the_node_midline() {
    let input = SankeyInput::links(vec![
        LinkDatum::new("s", "p", 3.0),
        LinkDatum::new("s", "q", 1.0),
    ]);
    let opts = SankeyOptions {
        link_overlap: Some(LinkOverlap::Middle),
        ..Default::default()
    };
    let g = run(&input, &opts);
    let s = g.node("s").expect("s");
    let mid = (s.y0 + s.y1) / 2.0;
    assert!(g.links.iter().all(|l| approx_eq(l.y0, mid)));
}

#[test]
fn isolated_nodes_can_be_kept() {
    let input = SankeyInput::with_nodes(
        vec![
            NodeDatum::keyed("a"),
            NodeDatum::keyed("b"),
            NodeDatum::keyed("alone").with_value(3.0),
        ],
        vec![LinkDatum::new("a", "b", 1.0)],
    );
    let opts = SankeyOptions {
        drop_isolated_node: false,
        ..Default::default()
    };
    let g = run(&input, &opts);
    let alone = g.node("alone").expect("kept");
    assert_eq!(alone.value, 3.0);
    assert!(alone.source_links.is_empty() && alone.target_links.is_empty());
    assert!(alone.y1 > alone.y0);
}

#[test]
fn options_read_from_json() {
    let opts = SankeyOptions::from_json(&json!({
        "iterations": 12,
        "nodeAlign": "start",
        "direction": "vertical",
        "inverse": true,
        "nodeWidth": "25%",
        "nodeGap": 4,
        "gapPosition": "end",
        "crossNodeAlign": "parent",
        "linkOverlap": "bottom",
        "minLinkHeight": "2",
        "dropIsolatedNode": false,
        "nodeKey": "id",
        "somethingElse": [1, 2, 3]
    }))
    .expect("options");
    assert_eq!(opts.iterations, 12);
    assert!(matches!(opts.node_align, NodeAlign::Left));
    assert!(opts.inverse);
    assert!(matches!(opts.node_width, NodeWidth::Percent(p) if approx_eq(p, 0.25)));
    assert!(matches!(opts.node_gap, NodeGap::Fixed(g) if g == 4.0));
    assert_eq!(opts.link_overlap, Some(LinkOverlap::End));
    assert_eq!(opts.min_link_height, 2.0);
    assert!(!opts.drop_isolated_node);
}

#[test]
fn invalid_json_options_are_rejected() {
    for (cfg, name) in [
        (json!({ "nodeAlign": "diagonal" }), "nodeAlign"),
        (json!({ "nodeWidth": "150%" }), "nodeWidth"),
        (json!({ "inverse": "yes" }), "inverse"),
        (json!({ "iterations": -1 }), "iterations"),
    ] {
        match SankeyOptions::from_json(&cfg) {
            Err(Error::InvalidOption { name: got, .. }) => assert_eq!(got, name),
            other => panic!("{cfg}: unexpected {other:?}"),
        }
    }
}

#[test]
fn input_and_viewport_deserialize_from_json() {
    let input: SankeyInput = serde_json::from_value(json!({
        "nodes": [{ "id": 1, "name": "in" }, { "id": 2, "name": "out" }],
        "links": [{ "source": 1, "target": 2, "value": "7.5" }]
    }))
    .expect("input");
    let viewport: Viewport =
        serde_json::from_value(json!({ "width": 50, "height": 40 })).expect("viewport");
    assert_eq!(viewport, Rect::sized(50.0, 40.0));

    let opts = SankeyOptions::from_json(&json!({ "nodeKey": "id" })).expect("options");
    let g = estuary::layout(&input, viewport, &opts).result.expect("layout");
    let link = g.link("1", "2").expect("link");
    assert_eq!(link.value, 7.5);
    assert_eq!(g.node("2").map(|n| n.data[0]["name"].clone()), Some(json!("out")));

    let err = serde_json::from_value::<SankeyInput>(json!({ "links": [{ "source": 1 }] }));
    assert!(err.is_err());
    assert!(matches!(SankeyInput::from_json(json!([])), Err(Error::InvalidInput { .. })));
}

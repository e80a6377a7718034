use estuary::{
    LinkDatum, LinkOverlap, NodeAlign, Rect, Sankey, SankeyGraph, SankeyInput, SankeyOptions,
};

const EPS: f64 = 1e-6;

fn energy_flows() -> SankeyInput {
    SankeyInput::links(vec![
        LinkDatum::new("coal", "power", 30.0),
        LinkDatum::new("gas", "power", 20.0),
        LinkDatum::new("gas", "heat", 15.0),
        LinkDatum::new("oil", "transport", 25.0),
        LinkDatum::new("oil", "heat", 5.0),
        LinkDatum::new("power", "homes", 20.0),
        LinkDatum::new("power", "industry", 25.0),
        LinkDatum::new("power", "losses", 5.0),
        LinkDatum::new("heat", "homes", 12.0),
        LinkDatum::new("heat", "industry", 8.0),
        LinkDatum::new("transport", "industry", 5.0),
        LinkDatum::new("transport", "losses", 20.0),
    ])
}

fn viewport() -> Rect {
    Rect {
        x0: 10.0,
        x1: 610.0,
        y0: 20.0,
        y1: 420.0,
    }
}

fn run(opts: SankeyOptions) -> SankeyGraph {
    Sankey::new(opts)
        .layout(&energy_flows(), viewport())
        .result
        .expect("layout")
}

#[test]
fn node_values_cover_both_faces() {
    let g = run(SankeyOptions::default());
    for n in &g.nodes {
        let incoming: f64 = n.target_links.iter().map(|&li| g.links[li].value).sum();
        let outgoing: f64 = n.source_links.iter().map(|&li| g.links[li].value).sum();
        assert!(n.value + EPS >= incoming, "{}", n.key);
        assert!(n.value + EPS >= outgoing, "{}", n.key);
    }
}

#[test]
fn links_always_move_to_a_later_column() {
    for align in [NodeAlign::Left, NodeAlign::Justify, NodeAlign::Right, NodeAlign::Center] {
        let g = run(SankeyOptions {
            node_align: align.clone(),
            ..Default::default()
        });
        for l in &g.links {
            let (s, t) = (&g.nodes[l.source_index], &g.nodes[l.target_index]);
            assert!(s.layer < t.layer, "{align:?}: {} -> {}", s.key, t.key);
        }
    }
}

#[test]
fn each_alignment_places_nodes_in_its_own_columns() {
    let input = SankeyInput::links(vec![
        LinkDatum::new("a", "b", 1.0),
        LinkDatum::new("b", "c", 1.0),
        LinkDatum::new("x", "c", 1.0),
        LinkDatum::new("a", "y", 1.0),
    ]);
    for (align, expected) in [
        (NodeAlign::Left, [0usize, 1, 2, 0, 1]),
        (NodeAlign::Right, [0, 1, 2, 1, 2]),
        (NodeAlign::Center, [0, 1, 2, 1, 1]),
        (NodeAlign::Justify, [0, 1, 2, 0, 2]),
    ] {
        let opts = SankeyOptions {
            node_align: align.clone(),
            ..Default::default()
        };
        let g = Sankey::new(opts)
            .layout(&input, viewport())
            .result
            .expect("layout");
        let layers: Vec<usize> = ["a", "b", "c", "x", "y"]
            .iter()
            .map(|key| g.node(key).map_or(usize::MAX, |n| n.layer))
            .collect();
        assert_eq!(layers, expected, "{align:?}");
        assert_eq!(g.max_depth, 3);
    }
}

#[test]
fn justify_sends_sinks_to_the_last_column() {
    let g = run(SankeyOptions::default());
    assert_eq!(g.max_depth, 3);
    for n in g.nodes.iter().filter(|n| n.source_links.is_empty()) {
        assert_eq!(n.layer, 2, "{}", n.key);
        assert!(n.is_last_layer);
    }
}

#[test]
fn columns_are_gap_separated_and_inside_the_viewport() {
    let vp = viewport();
    for iterations in [0, 1, 6, 32] {
        let g = run(SankeyOptions {
            iterations,
            ..Default::default()
        });
        for column in &g.columns {
            for pair in column.windows(2) {
                let (upper, lower) = (&g.nodes[pair[0]], &g.nodes[pair[1]]);
                assert!(
                    upper.y1 + 8.0 <= lower.y0 + EPS,
                    "iterations {iterations}: {} overlaps {}",
                    upper.key,
                    lower.key
                );
            }
        }
        for n in &g.nodes {
            assert!(n.y0 >= vp.y0 - EPS && n.y1 <= vp.y1 + EPS, "{}", n.key);
            assert!(n.x0 >= vp.x0 - EPS && n.x1 <= vp.x1 + EPS, "{}", n.key);
        }
    }
}

#[test]
fn bands_stay_within_their_nodes() {
    let g = run(SankeyOptions::default());
    for l in &g.links {
        let (s, t) = (&g.nodes[l.source_index], &g.nodes[l.target_index]);
        assert!(l.thickness >= 0.0);
        assert!(l.y0 - l.thickness / 2.0 >= s.y0 - EPS, "{}", l.key);
        assert!(l.y0 + l.thickness / 2.0 <= s.y1 + EPS, "{}", l.key);
        assert!(l.y1 - l.thickness / 2.0 >= t.y0 - EPS, "{}", l.key);
        assert!(l.y1 + l.thickness / 2.0 <= t.y1 + EPS, "{}", l.key);
    }
}

#[test]
fn outgoing_bands_are_stacked_in_target_order() {
    let g = run(SankeyOptions::default());
    for n in &g.nodes {
        let centres: Vec<f64> = n.source_links.iter().map(|&li| g.links[li].y0).collect();
        assert!(centres.windows(2).all(|w| w[0] <= w[1] + EPS), "{}", n.key);
        let targets: Vec<f64> = n
            .source_links
            .iter()
            .map(|&li| g.nodes[g.links[li].target_index].y0)
            .collect();
        assert!(targets.windows(2).all(|w| w[0] <= w[1] + EPS), "{}", n.key);
    }
}

#[test]
fn thickness_is_non_negative_under_every_overlap_policy() {
    for overlap in [
        None,
        Some(LinkOverlap::Start),
        Some(LinkOverlap::Middle),
        Some(LinkOverlap::End),
    ] {
        let g = run(SankeyOptions {
            link_overlap: overlap,
            min_link_height: 1.0,
            ..Default::default()
        });
        for l in &g.links {
            assert!(l.thickness >= 1.0, "{overlap:?}: {}", l.key);
        }
    }
}

#[test]
fn repeated_layouts_are_identical() {
    let sankey = Sankey::new(SankeyOptions::default());
    let input = energy_flows();
    let first = sankey.layout(&input, viewport());
    let second = sankey.layout(&input, viewport());
    assert_eq!(first, second);
    let (a, b) = (first.result.expect("layout"), second.result.expect("layout"));
    for (x, y) in a.nodes.iter().zip(&b.nodes) {
        assert_eq!(x.rect().x0.to_bits(), y.rect().x0.to_bits());
        assert_eq!(x.rect().y0.to_bits(), y.rect().y0.to_bits());
    }
}

//! Link Breadth Resolver: where each band meets its two nodes.

use crate::graph::Graph;
use crate::options::LinkOverlap;
use std::cmp::Ordering;

pub(crate) fn f64_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Order a node's outgoing links by their target's `y0` and its incoming links by their
/// source's `y0`, ties broken by link index.
pub(crate) fn sort_node_links(g: &mut Graph, ni: usize) {
    let mut outgoing = std::mem::take(&mut g.nodes[ni].source_links);
    outgoing.sort_by(|&a, &b| {
        let ta = g.nodes[g.links[a].target_index].y0;
        let tb = g.nodes[g.links[b].target_index].y0;
        f64_cmp(ta, tb).then_with(|| a.cmp(&b))
    });
    g.nodes[ni].source_links = outgoing;

    let mut incoming = std::mem::take(&mut g.nodes[ni].target_links);
    incoming.sort_by(|&a, &b| {
        let sa = g.nodes[g.links[a].source_index].y0;
        let sb = g.nodes[g.links[b].source_index].y0;
        f64_cmp(sa, sb).then_with(|| a.cmp(&b))
    });
    g.nodes[ni].target_links = incoming;
}

pub(crate) fn sort_all_links(g: &mut Graph) {
    for ni in 0..g.nodes.len() {
        sort_node_links(g, ni);
    }
}

/// Set every link's band centre at its source (`y0`) and target (`y1`) faces, and the
/// depth-axis endpoints `x0 = source.x1`, `x1 = target.x0`.
pub(crate) fn compute_link_breadths(g: &mut Graph, overlap: Option<LinkOverlap>) {
    for link in &mut g.links {
        link.x0 = g.nodes[link.source_index].x1;
        link.x1 = g.nodes[link.target_index].x0;
    }
    match overlap {
        None => stack_links(g),
        Some(policy) => overlap_links(g, policy),
    }
}

/// Bands stack top to bottom from `node.y0`; once a band would run past `node.y1`, it and
/// every later band sit flush with the bottom edge.
fn stack_links(g: &mut Graph) {
    for node in &g.nodes {
        for (links, outgoing) in [(&node.source_links, true), (&node.target_links, false)] {
            let mut y = node.y0;
            let mut reach_bottom = false;
            for &li in links {
                let link = &mut g.links[li];
                let t = link.thickness;
                if !reach_bottom && y + t > node.y1 + 1e-9 {
                    reach_bottom = true;
                }
                let centre = if reach_bottom {
                    node.y1 - t / 2.0
                } else {
                    let c = y + t / 2.0;
                    y += t;
                    c
                };
                if outgoing {
                    link.y0 = centre;
                } else {
                    link.y1 = centre;
                }
            }
        }
    }
}

fn overlap_links(g: &mut Graph, policy: LinkOverlap) {
    let anchor = |y0: f64, y1: f64, t: f64| match policy {
        LinkOverlap::Start => y0 + t / 2.0,
        LinkOverlap::Middle => (y0 + y1) / 2.0,
        LinkOverlap::End => y1 - t / 2.0,
    };
    for link in &mut g.links {
        let s = &g.nodes[link.source_index];
        let t = &g.nodes[link.target_index];
        link.y0 = anchor(s.y0, s.y1, link.thickness);
        link.y1 = anchor(t.y0, t.y1, link.thickness);
    }
}

//! Graph Builder: turns either input shape into a node/link arena with back-references.
//!
//! The arena is a pair of `Vec`s plus a key -> index map; later phases take the arena by
//! `&mut` and never hold references into it across phases.

use crate::model::{
    LayoutWarning, LinkDatum, NodeDatum, Rect, SankeyInput, SankeyLink, SankeyNode, TreeDatum,
};
use crate::options::SankeyOptions;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub(crate) struct Graph {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
    pub node_map: FxHashMap<String, usize>,
    /// Values declared on the node records (summed when records merge).
    pub declared: Vec<Option<f64>>,
    /// Link values before propagation; `None` until resolved.
    pub link_values: Vec<Option<f64>>,
    pub hierarchical: bool,
}

#[derive(Debug, Clone)]
struct NodeDraft {
    data: Vec<Value>,
    declared: Option<f64>,
    depth: Option<usize>,
}

impl NodeDraft {
    fn new(datum: Value, declared: Option<f64>, depth: Option<usize>) -> Self {
        Self {
            data: vec![datum],
            declared,
            depth,
        }
    }

    fn synthesized(key: &str) -> Self {
        Self::new(json!({ "key": key }), None, None)
    }

    fn absorb(&mut self, other: NodeDraft) {
        self.data.extend(other.data);
        self.declared = add_opt(self.declared, other.declared);
        self.depth = match (self.depth, other.depth) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }
}

#[derive(Debug, Clone)]
struct LinkDraft {
    key: String,
    source: String,
    target: String,
    value: Option<f64>,
    data: Vec<Value>,
}

fn add_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    }
}

fn insert_node(nodes: &mut IndexMap<String, NodeDraft>, key: String, draft: NodeDraft) {
    match nodes.get_mut(&key) {
        Some(existing) => existing.absorb(draft),
        None => {
            nodes.insert(key, draft);
        }
    }
}

pub(crate) fn build(
    input: &SankeyInput,
    opts: &SankeyOptions,
    warnings: &mut Vec<LayoutWarning>,
) -> Graph {
    let (nodes, links, hierarchical) = match input {
        SankeyInput::Flow { nodes, links } => {
            let (n, l) = build_flow(nodes.as_deref(), links, opts, warnings);
            (n, l, false)
        }
        SankeyInput::Hierarchy { roots } => {
            let (n, l) = build_hierarchy(roots, opts, warnings);
            (n, l, true)
        }
    };
    assemble(nodes, links, opts.drop_isolated_node, hierarchical)
}

fn build_flow(
    node_data: Option<&[NodeDatum]>,
    link_data: &[LinkDatum],
    opts: &SankeyOptions,
    warnings: &mut Vec<LayoutWarning>,
) -> (IndexMap<String, NodeDraft>, Vec<LinkDraft>) {
    let mut nodes: IndexMap<String, NodeDraft> = IndexMap::new();
    let explicit = node_data.is_some();
    for (i, n) in node_data.unwrap_or_default().iter().enumerate() {
        let key = opts
            .node_key
            .resolve(&n.datum, i)
            .unwrap_or_else(|| i.to_string());
        insert_node(&mut nodes, key, NodeDraft::new(n.datum.clone(), n.value, None));
    }

    let mut ordered: Vec<&LinkDatum> = link_data.iter().collect();
    if let Some(cmp) = &opts.link_sort_by {
        ordered.sort_by(|a, b| cmp(*a, *b));
    }

    let mut used_keys: FxHashSet<String> = FxHashSet::default();
    let mut links = Vec::with_capacity(ordered.len());
    for (i, l) in ordered.into_iter().enumerate() {
        if explicit {
            if !nodes.contains_key(&l.source) || !nodes.contains_key(&l.target) {
                tracing::debug!(
                    source = %l.source,
                    target = %l.target,
                    "dropping link with a missing endpoint"
                );
                continue;
            }
        } else {
            for key in [&l.source, &l.target] {
                if !nodes.contains_key(key) {
                    nodes.insert(key.clone(), NodeDraft::synthesized(key));
                }
            }
        }
        if l.source == l.target {
            tracing::warn!(key = %l.source, "dropping self-referential link");
            warnings.push(LayoutWarning::SelfLoop {
                key: l.source.clone(),
            });
            continue;
        }

        let mut key = format!("{}->{}", l.source, l.target);
        if used_keys.contains(&key) {
            key = format!("{key}#{i}");
        }
        used_keys.insert(key.clone());
        links.push(LinkDraft {
            key,
            source: l.source.clone(),
            target: l.target.clone(),
            value: l.value,
            data: vec![l.datum.clone()],
        });
    }
    (nodes, links)
}

struct Frame<'a> {
    tree: &'a TreeDatum,
    depth: usize,
    index: usize,
    parent: Option<usize>,
    parents: Vec<String>,
}

struct FlatNode<'a> {
    tree: &'a TreeDatum,
    key: String,
    depth: usize,
    parent: Option<usize>,
    parents: Vec<String>,
}

fn build_hierarchy(
    roots: &[TreeDatum],
    opts: &SankeyOptions,
    warnings: &mut Vec<LayoutWarning>,
) -> (IndexMap<String, NodeDraft>, Vec<LinkDraft>) {
    // Pre-order over an explicit stack; every frame owns its ancestor key chain.
    let mut flat: Vec<FlatNode<'_>> = Vec::new();
    let mut stack: Vec<Frame<'_>> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(index, tree)| Frame {
            tree,
            depth: 0,
            index,
            parent: None,
            parents: Vec::new(),
        })
        .collect();

    while let Some(frame) = stack.pop() {
        let key = opts
            .node_key
            .resolve(&frame.tree.datum, frame.index)
            .unwrap_or_else(|| match frame.parents.last() {
                Some(parent) => format!("{parent}-{}", frame.index),
                None => format!("{}-{}", frame.depth, frame.index),
            });
        let flat_index = flat.len();
        let mut chain = frame.parents.clone();
        chain.push(key.clone());
        for (index, child) in frame.tree.children.iter().enumerate().rev() {
            stack.push(Frame {
                tree: child,
                depth: frame.depth + 1,
                index,
                parent: Some(flat_index),
                parents: chain.clone(),
            });
        }
        flat.push(FlatNode {
            tree: frame.tree,
            key,
            depth: frame.depth,
            parent: frame.parent,
            parents: frame.parents,
        });
    }

    // Children follow their parent in pre-order, so a reverse sweep sees every subtree first.
    let mut child_total: Vec<Option<f64>> = vec![None; flat.len()];
    let mut subtree: Vec<Option<f64>> = vec![None; flat.len()];
    for i in (0..flat.len()).rev() {
        let own = flat[i].tree.value.or(child_total[i]);
        subtree[i] = own;
        if let Some(p) = flat[i].parent {
            child_total[p] = add_opt(child_total[p], own);
        }
    }

    let mut nodes: IndexMap<String, NodeDraft> = IndexMap::new();
    let mut links: IndexMap<String, LinkDraft> = IndexMap::new();
    for (i, f) in flat.iter().enumerate() {
        insert_node(
            &mut nodes,
            f.key.clone(),
            NodeDraft::new(f.tree.datum.clone(), f.tree.value, Some(f.depth)),
        );
        let Some(source) = f.parents.last() else {
            continue;
        };
        if *source == f.key {
            tracing::warn!(key = %f.key, "dropping self-referential link");
            warnings.push(LayoutWarning::SelfLoop { key: f.key.clone() });
            continue;
        }
        let chain_key = format!("{}->{}", f.parents.join("->"), f.key);
        let link = links.entry(chain_key.clone()).or_insert_with(|| LinkDraft {
            key: chain_key,
            source: source.clone(),
            target: f.key.clone(),
            value: None,
            data: Vec::new(),
        });
        link.value = add_opt(link.value, subtree[i]);
        link.data.push(f.tree.datum.clone());
    }
    (nodes, links.into_values().collect())
}

fn assemble(
    drafts: IndexMap<String, NodeDraft>,
    link_drafts: Vec<LinkDraft>,
    drop_isolated: bool,
    hierarchical: bool,
) -> Graph {
    let mut degree: FxHashMap<&str, usize> = FxHashMap::default();
    for l in &link_drafts {
        *degree.entry(l.source.as_str()).or_default() += 1;
        *degree.entry(l.target.as_str()).or_default() += 1;
    }
    let keep: Vec<bool> = drafts
        .keys()
        .map(|k| !drop_isolated || degree.get(k.as_str()).copied().unwrap_or(0) > 0)
        .collect();

    let mut nodes = Vec::with_capacity(drafts.len());
    let mut declared = Vec::with_capacity(drafts.len());
    let mut node_map = FxHashMap::default();
    for ((key, draft), keep) in drafts.into_iter().zip(keep) {
        if !keep {
            continue;
        }
        let index = nodes.len();
        node_map.insert(key.clone(), index);
        declared.push(draft.declared);
        nodes.push(SankeyNode {
            key,
            index,
            depth: draft.depth.unwrap_or(0),
            end_depth: 0,
            layer: 0,
            value: 0.0,
            data: draft.data,
            x0: 0.0,
            x1: 0.0,
            y0: 0.0,
            y1: 0.0,
            source_links: Vec::new(),
            target_links: Vec::new(),
            is_last_layer: false,
        });
    }

    let mut links = Vec::with_capacity(link_drafts.len());
    let mut link_values = Vec::with_capacity(link_drafts.len());
    for draft in link_drafts {
        let (Some(&source_index), Some(&target_index)) =
            (node_map.get(&draft.source), node_map.get(&draft.target))
        else {
            continue;
        };
        let index = links.len();
        nodes[source_index].source_links.push(index);
        nodes[target_index].target_links.push(index);
        link_values.push(draft.value);
        links.push(SankeyLink {
            index,
            key: draft.key,
            source: draft.source,
            target: draft.target,
            source_index,
            target_index,
            value: 0.0,
            thickness: 0.0,
            x0: 0.0,
            y0: 0.0,
            x1: 0.0,
            y1: 0.0,
            source_rect: Rect::default(),
            target_rect: Rect::default(),
            data: draft.data,
        });
    }

    Graph {
        nodes,
        links,
        node_map,
        declared,
        link_values,
        hierarchical,
    }
}

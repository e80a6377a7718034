//! Input datums, output elements and layout diagnostics.
//!
//! Everything here is plain data: the layout pipeline builds its own arena from a
//! [`SankeyInput`] on every call and hands back a fresh [`SankeyGraph`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Coerce a JSON scalar into a finite number.
///
/// Numeric strings are accepted because tabular sources (CSV/TSV) hand values over as text.
pub fn number_of(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Render a JSON scalar as a node key. Integers print without a fractional part so that
/// `0` and `"0"` address the same node.
pub fn key_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| f.to_string())
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDatum {
    pub value: Option<f64>,
    pub datum: Value,
}

impl NodeDatum {
    pub fn from_value(datum: Value) -> Self {
        let value = datum.get("value").and_then(number_of);
        Self { value, datum }
    }

    /// A node record carrying only a `key` field.
    pub fn keyed(key: &str) -> Self {
        Self::from_value(json!({ "key": key }))
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value).filter(|v| v.is_finite());
        if let Value::Object(map) = &mut self.datum {
            if let Some(n) = serde_json::Number::from_f64(value) {
                map.insert("value".to_string(), Value::Number(n));
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkDatum {
    pub source: String,
    pub target: String,
    pub value: Option<f64>,
    pub datum: Value,
}

impl LinkDatum {
    pub fn new(source: &str, target: &str, value: impl Into<Option<f64>>) -> Self {
        let value = value.into().filter(|v| v.is_finite());
        let mut map = Map::new();
        map.insert("source".to_string(), Value::String(source.to_string()));
        map.insert("target".to_string(), Value::String(target.to_string()));
        if let Some(n) = value.and_then(serde_json::Number::from_f64) {
            map.insert("value".to_string(), Value::Number(n));
        }
        Self {
            source: source.to_string(),
            target: target.to_string(),
            value,
            datum: Value::Object(map),
        }
    }

    pub fn from_value(datum: Value) -> Result<Self> {
        let endpoint = |field: &str| {
            datum
                .get(field)
                .and_then(key_of)
                .ok_or_else(|| Error::invalid_input(format!("link is missing `{field}`: {datum}")))
        };
        let source = endpoint("source")?;
        let target = endpoint("target")?;
        let value = datum.get("value").and_then(number_of);
        Ok(Self {
            source,
            target,
            value,
            datum,
        })
    }
}

/// One node of a parent/child input tree. `datum` holds the record without its `children`.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDatum {
    pub value: Option<f64>,
    pub children: Vec<TreeDatum>,
    pub datum: Value,
}

impl TreeDatum {
    pub fn new(datum: Value, children: Vec<TreeDatum>) -> Self {
        let value = datum.get("value").and_then(number_of);
        Self {
            value,
            children,
            datum,
        }
    }

    pub fn leaf(datum: Value) -> Self {
        Self::new(datum, Vec::new())
    }

    pub fn from_value(mut datum: Value) -> Result<Self> {
        let children = match datum.as_object_mut().and_then(|m| m.remove("children")) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(TreeDatum::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(Error::invalid_input(format!(
                    "`children` must be an array, got {other}"
                )));
            }
        };
        Ok(Self::new(datum, children))
    }
}

/// The two accepted input shapes. JSON input is classified by the presence of `links`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum SankeyInput {
    Flow {
        nodes: Option<Vec<NodeDatum>>,
        links: Vec<LinkDatum>,
    },
    Hierarchy {
        roots: Vec<TreeDatum>,
    },
}

impl SankeyInput {
    pub fn links(links: Vec<LinkDatum>) -> Self {
        Self::Flow { nodes: None, links }
    }

    pub fn with_nodes(nodes: Vec<NodeDatum>, links: Vec<LinkDatum>) -> Self {
        Self::Flow {
            nodes: Some(nodes),
            links,
        }
    }

    pub fn hierarchy(roots: Vec<TreeDatum>) -> Self {
        Self::Hierarchy { roots }
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(Error::invalid_input("expected an object with `links` or `nodes`"));
        };
        let items = |v: Value, field: &str| match v {
            Value::Array(items) => Ok(items),
            other => Err(Error::invalid_input(format!(
                "`{field}` must be an array, got {other}"
            ))),
        };

        match obj.remove("links") {
            Some(links) => {
                let links = items(links, "links")?
                    .into_iter()
                    .map(LinkDatum::from_value)
                    .collect::<Result<Vec<_>>>()?;
                let nodes = match obj.remove("nodes") {
                    None | Some(Value::Null) => None,
                    Some(nodes) => Some(
                        items(nodes, "nodes")?
                            .into_iter()
                            .map(NodeDatum::from_value)
                            .collect(),
                    ),
                };
                Ok(Self::Flow { nodes, links })
            }
            None => {
                let roots = match obj.remove("nodes") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(nodes) => items(nodes, "nodes")?
                        .into_iter()
                        .map(TreeDatum::from_value)
                        .collect::<Result<Vec<_>>>()?,
                };
                Ok(Self::Hierarchy { roots })
            }
        }
    }
}

impl TryFrom<Value> for SankeyInput {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(value)
    }
}

/// Axis-aligned rectangle. Also used as the layout viewport.
///
/// Deserializes from either `{x0, x1, y0, y1}` or `{width, height}` (anchored at the origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RectRepr")]
pub struct Rect {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

pub type Viewport = Rect;

#[derive(Deserialize)]
#[serde(untagged)]
enum RectRepr {
    Edges { x0: f64, x1: f64, y0: f64, y1: f64 },
    Size { width: f64, height: f64 },
}

impl From<RectRepr> for Rect {
    fn from(r: RectRepr) -> Self {
        match r {
            RectRepr::Edges { x0, x1, y0, y1 } => Self { x0, x1, y0, y1 },
            RectRepr::Size { width, height } => Self::sized(width, height),
        }
    }
}

impl Rect {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            x0: 0.0,
            x1: width,
            y0: 0.0,
            y1: height,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyNode {
    pub key: String,
    pub index: usize,
    /// Forward BFS level (or the `setNodeLayer` override).
    pub depth: usize,
    /// Backward BFS level from the sinks; only computed for right-leaning alignments.
    pub end_depth: usize,
    /// Column index.
    pub layer: usize,
    pub value: f64,
    /// The source record(s) this node was built from.
    pub data: Vec<Value>,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    /// Indices into [`SankeyGraph::links`] of outgoing links, ordered top to bottom.
    pub source_links: Vec<usize>,
    /// Indices into [`SankeyGraph::links`] of incoming links, ordered top to bottom.
    pub target_links: Vec<usize>,
    pub is_last_layer: bool,
}

impl SankeyNode {
    pub fn rect(&self) -> Rect {
        Rect {
            x0: self.x0,
            x1: self.x1,
            y0: self.y0,
            y1: self.y1,
        }
    }

    pub(crate) fn shift_y(&mut self, dy: f64) {
        self.y0 += dy;
        self.y1 += dy;
    }

    pub(crate) fn breadth(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyLink {
    pub index: usize,
    pub key: String,
    /// Source node key.
    pub source: String,
    /// Target node key.
    pub target: String,
    pub source_index: usize,
    pub target_index: usize,
    pub value: f64,
    pub thickness: f64,
    /// Band centre at the source face.
    pub x0: f64,
    pub y0: f64,
    /// Band centre at the target face.
    pub x1: f64,
    pub y1: f64,
    pub source_rect: Rect,
    pub target_rect: Rect,
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyGraph {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
    /// Node indices per column, top to bottom.
    pub columns: Vec<Vec<usize>>,
    pub max_depth: usize,
}

impl SankeyGraph {
    pub fn node(&self, key: &str) -> Option<&SankeyNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn link(&self, source: &str, target: &str) -> Option<&SankeyLink> {
        self.links
            .iter()
            .find(|l| l.source == source && l.target == target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthPass {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutWarning {
    /// A depth pass ran more levels than there are nodes and was cut short.
    CircularLink { pass: DepthPass },
    /// A link from a node to itself was dropped.
    SelfLoop { key: String },
    /// A `setNodeLayer` override places a link's target at or before its source.
    InconsistentLayer { source: String, target: String },
    /// A `setNodeLayer` override asked for a column past the last possible one.
    LayerOutOfRange {
        key: String,
        requested: usize,
        clamped: usize,
    },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircularLink { pass } => {
                let pass = match pass {
                    DepthPass::Forward => "depth",
                    DepthPass::Backward => "end depth",
                };
                write!(f, "there is a circular link ({pass} assignment truncated)")
            }
            Self::SelfLoop { key } => write!(f, "dropped self-referential link on `{key}`"),
            Self::InconsistentLayer { source, target } => write!(
                f,
                "link `{source}` -> `{target}` does not move to a later layer"
            ),
            Self::LayerOutOfRange {
                key,
                requested,
                clamped,
            } => write!(
                f,
                "layer {requested} of `{key}` is out of range, clamped to {clamped}"
            ),
        }
    }
}

/// Result of one layout call: the graph (absent for empty input) plus collected warnings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutOutcome {
    pub result: Option<SankeyGraph>,
    pub warnings: Vec<LayoutWarning>,
}

impl LayoutOutcome {
    pub fn is_empty(&self) -> bool {
        self.result.is_none()
    }
}

//! Layout configuration.
//!
//! Each policy axis is an enum whose variants are a constant, a relative measure or a callback.
//! The callbacks are `Arc`-wrapped so that options stay `Clone + Send + Sync` and can be shared
//! by every `layout()` call of a [`crate::Sankey`] instance.

use crate::error::{Error, Result};
use crate::model::{LinkDatum, SankeyLink, SankeyNode, key_of, number_of};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub type NodeFn<T> = Arc<dyn Fn(&SankeyNode) -> T + Send + Sync>;
pub type LinkFn<T> = Arc<dyn Fn(&SankeyLink) -> T + Send + Sync>;
pub type AlignFn = Arc<dyn Fn(&SankeyNode, usize) -> f64 + Send + Sync>;
pub type KeyFn = Arc<dyn Fn(&Value, usize) -> Option<String> + Send + Sync>;
pub type NodeOrder = Arc<dyn Fn(&SankeyNode, &SankeyNode) -> Ordering + Send + Sync>;
pub type LinkOrder = Arc<dyn Fn(&LinkDatum, &LinkDatum) -> Ordering + Send + Sync>;

/// Column assignment policy. `start`/`end` are accepted as aliases of `left`/`right`.
#[derive(Clone, Default)]
pub enum NodeAlign {
    Left,
    Right,
    #[default]
    Justify,
    Center,
    /// Receives the node and the column count; the result is floored and clamped.
    Custom(AlignFn),
}

impl NodeAlign {
    /// Whether the policy needs backward (`end_depth`) levels.
    pub(crate) fn needs_end_depth(&self) -> bool {
        matches!(self, Self::Right | Self::Justify)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Clone)]
pub enum NodeWidth {
    Fixed(f64),
    /// Fraction of a uniform column step (`"20%"` is stored as `0.2`).
    Percent(f64),
    Custom(NodeFn<f64>),
}

impl Default for NodeWidth {
    fn default() -> Self {
        Self::Fixed(24.0)
    }
}

/// Horizontal span reserved for links after a node.
#[derive(Clone)]
pub enum LinkWidth {
    Fixed(f64),
    Custom(NodeFn<f64>),
}

#[derive(Clone)]
pub enum NodeGap {
    Fixed(f64),
    Custom(NodeFn<f64>),
}

impl Default for NodeGap {
    fn default() -> Self {
        Self::Fixed(8.0)
    }
}

#[derive(Clone)]
pub enum NodeHeight {
    Fixed(f64),
    Custom(NodeFn<f64>),
}

#[derive(Clone)]
pub enum LinkHeight {
    Fixed(f64),
    Custom(LinkFn<f64>),
}

/// How a column's leftover breadth is distributed after the initial stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossNodeAlign {
    Start,
    End,
    Parent,
    #[default]
    Middle,
}

/// Which node of a neighbouring pair contributes the gap between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPosition {
    Start,
    #[default]
    Middle,
    End,
}

/// Reference line for overlapping link bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOverlap {
    Start,
    Middle,
    End,
}

/// How node records are turned into node keys.
#[derive(Clone, Default)]
pub enum NodeKey {
    /// The record's `key` field when present, else the positional key.
    #[default]
    Auto,
    /// Always the positional key (array index, or the synthesized hierarchy key).
    Index,
    Field(String),
    /// Returning `None` falls back to the positional key.
    Custom(KeyFn),
}

impl NodeKey {
    pub(crate) fn resolve(&self, datum: &Value, index: usize) -> Option<String> {
        match self {
            Self::Auto => datum.get("key").and_then(key_of),
            Self::Index => None,
            Self::Field(field) => datum.get(field).and_then(key_of),
            Self::Custom(f) => f(datum, index),
        }
    }
}

#[derive(Clone)]
pub struct SankeyOptions {
    pub iterations: usize,
    pub node_align: NodeAlign,
    pub direction: Direction,
    pub inverse: bool,
    pub node_width: NodeWidth,
    pub link_width: Option<LinkWidth>,
    pub min_step_width: f64,
    pub node_gap: NodeGap,
    pub gap_position: GapPosition,
    pub node_height: Option<NodeHeight>,
    pub min_node_height: f64,
    pub max_node_height: f64,
    pub equal_node_height: bool,
    pub link_height: Option<LinkHeight>,
    pub min_link_height: f64,
    pub max_link_height: f64,
    pub cross_node_align: CrossNodeAlign,
    pub drop_isolated_node: bool,
    pub divide_node_value_to_link: bool,
    /// `None` stacks link bands without overlap.
    pub link_overlap: Option<LinkOverlap>,
    pub node_key: NodeKey,
    /// Authoritative per-node column; disables alignment and relaxation.
    pub set_node_layer: Option<NodeFn<usize>>,
    /// Fixed in-column order; disables the re-sort by `y0` during relaxation.
    pub node_sort_by: Option<NodeOrder>,
    pub link_sort_by: Option<LinkOrder>,
}

impl Default for SankeyOptions {
    fn default() -> Self {
        Self {
            iterations: 6,
            node_align: NodeAlign::default(),
            direction: Direction::default(),
            inverse: false,
            node_width: NodeWidth::default(),
            link_width: None,
            min_step_width: 0.0,
            node_gap: NodeGap::default(),
            gap_position: GapPosition::default(),
            node_height: None,
            min_node_height: 0.0,
            max_node_height: f64::INFINITY,
            equal_node_height: false,
            link_height: None,
            min_link_height: 0.0,
            max_link_height: f64::INFINITY,
            cross_node_align: CrossNodeAlign::default(),
            drop_isolated_node: true,
            divide_node_value_to_link: false,
            link_overlap: None,
            node_key: NodeKey::default(),
            set_node_layer: None,
            node_sort_by: None,
            link_sort_by: None,
        }
    }
}

impl SankeyOptions {
    /// Read the JSON-expressible options (camelCase keys, as a chart config carries them).
    ///
    /// Unknown keys are ignored; callback options can only be set from Rust.
    pub fn from_json(cfg: &Value) -> Result<Self> {
        if !cfg.is_object() {
            return Err(Error::invalid_option("<root>", "expected an object"));
        }
        let mut out = Self::default();

        if let Some(v) = cfg.get("iterations") {
            let n = v.as_u64().ok_or_else(|| {
                Error::invalid_option("iterations", "expected a non-negative integer")
            })?;
            out.iterations = n as usize;
        }
        if let Some(s) = config_string(cfg, "nodeAlign")? {
            out.node_align = match s.as_str() {
                "left" | "start" => NodeAlign::Left,
                "right" | "end" => NodeAlign::Right,
                "justify" => NodeAlign::Justify,
                "center" => NodeAlign::Center,
                other => return Err(unknown_variant("nodeAlign", other)),
            };
        }
        if let Some(s) = config_string(cfg, "direction")? {
            out.direction = match s.as_str() {
                "horizontal" => Direction::Horizontal,
                "vertical" => Direction::Vertical,
                other => return Err(unknown_variant("direction", other)),
            };
        }
        if let Some(b) = config_bool(cfg, "inverse")? {
            out.inverse = b;
        }
        if let Some(v) = cfg.get("nodeWidth") {
            out.node_width = match v {
                Value::String(s) if s.trim_end().ends_with('%') => parse_percent(s)
                    .map(NodeWidth::Percent)
                    .ok_or_else(|| {
                        Error::invalid_option("nodeWidth", format!("bad percentage `{s}`"))
                    })?,
                other => NodeWidth::Fixed(number_of(other).ok_or_else(|| {
                    Error::invalid_option("nodeWidth", "expected a number or percentage")
                })?),
            };
        }
        if let Some(n) = config_f64(cfg, "linkWidth")? {
            out.link_width = Some(LinkWidth::Fixed(n));
        }
        if let Some(n) = config_f64(cfg, "minStepWidth")? {
            out.min_step_width = n;
        }
        if let Some(n) = config_f64(cfg, "nodeGap")? {
            out.node_gap = NodeGap::Fixed(n);
        }
        if let Some(s) = config_string(cfg, "gapPosition")? {
            out.gap_position = match s.as_str() {
                "start" => GapPosition::Start,
                "middle" => GapPosition::Middle,
                "end" => GapPosition::End,
                other => return Err(unknown_variant("gapPosition", other)),
            };
        }
        if let Some(n) = config_f64(cfg, "nodeHeight")? {
            out.node_height = Some(NodeHeight::Fixed(n));
        }
        if let Some(n) = config_f64(cfg, "minNodeHeight")? {
            out.min_node_height = n;
        }
        if let Some(n) = config_f64(cfg, "maxNodeHeight")? {
            out.max_node_height = n;
        }
        if let Some(b) = config_bool(cfg, "equalNodeHeight")? {
            out.equal_node_height = b;
        }
        if let Some(n) = config_f64(cfg, "linkHeight")? {
            out.link_height = Some(LinkHeight::Fixed(n));
        }
        if let Some(n) = config_f64(cfg, "minLinkHeight")? {
            out.min_link_height = n;
        }
        if let Some(n) = config_f64(cfg, "maxLinkHeight")? {
            out.max_link_height = n;
        }
        if let Some(s) = config_string(cfg, "crossNodeAlign")? {
            out.cross_node_align = match s.as_str() {
                "start" => CrossNodeAlign::Start,
                "end" => CrossNodeAlign::End,
                "parent" => CrossNodeAlign::Parent,
                "middle" => CrossNodeAlign::Middle,
                other => return Err(unknown_variant("crossNodeAlign", other)),
            };
        }
        if let Some(b) = config_bool(cfg, "dropIsolatedNode")? {
            out.drop_isolated_node = b;
        }
        if let Some(b) = config_bool(cfg, "divideNodeValueToLink")? {
            out.divide_node_value_to_link = b;
        }
        if let Some(v) = cfg.get("linkOverlap") {
            out.link_overlap = match v {
                Value::Null | Value::Bool(false) => None,
                Value::Bool(true) => Some(LinkOverlap::Middle),
                Value::String(s) => Some(match s.as_str() {
                    "start" | "top" | "y0" => LinkOverlap::Start,
                    "middle" | "center" => LinkOverlap::Middle,
                    "end" | "bottom" | "y1" => LinkOverlap::End,
                    other => return Err(unknown_variant("linkOverlap", other)),
                }),
                _ => {
                    return Err(Error::invalid_option(
                        "linkOverlap",
                        "expected a boolean or a string",
                    ));
                }
            };
        }
        if let Some(s) = config_string(cfg, "nodeKey")? {
            out.node_key = NodeKey::Field(s);
        }
        Ok(out)
    }
}

fn config_f64(cfg: &Value, key: &str) -> Result<Option<f64>> {
    match cfg.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => number_of(v).map(Some).ok_or_else(|| {
            Error::invalid_option(key, format!("expected a finite number, got {v}"))
        }),
    }
}

fn config_bool(cfg: &Value, key: &str) -> Result<Option<bool>> {
    match cfg.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(v) => Err(Error::invalid_option(key, format!("expected a boolean, got {v}"))),
    }
}

fn config_string(cfg: &Value, key: &str) -> Result<Option<String>> {
    match cfg.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v) => Err(Error::invalid_option(key, format!("expected a string, got {v}"))),
    }
}

fn unknown_variant(key: &str, value: &str) -> Error {
    Error::invalid_option(key, format!("unknown value `{value}`"))
}

/// `"12.5%"` -> `0.125`. Values outside `(0, 100]` are rejected.
pub(crate) fn parse_percent(s: &str) -> Option<f64> {
    let n = s.trim().strip_suffix('%')?.trim().parse::<f64>().ok()?;
    (n.is_finite() && n > 0.0 && n <= 100.0).then_some(n / 100.0)
}

impl fmt::Debug for NodeAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
            Self::Justify => f.write_str("Justify"),
            Self::Center => f.write_str("Center"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for NodeWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Percent(p) => f.debug_tuple("Percent").field(p).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for LinkWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for NodeGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for NodeHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for LinkHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::Index => f.write_str("Index"),
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for SankeyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SankeyOptions")
            .field("iterations", &self.iterations)
            .field("node_align", &self.node_align)
            .field("direction", &self.direction)
            .field("inverse", &self.inverse)
            .field("node_width", &self.node_width)
            .field("link_width", &self.link_width)
            .field("min_step_width", &self.min_step_width)
            .field("node_gap", &self.node_gap)
            .field("gap_position", &self.gap_position)
            .field("node_height", &self.node_height)
            .field("min_node_height", &self.min_node_height)
            .field("max_node_height", &self.max_node_height)
            .field("equal_node_height", &self.equal_node_height)
            .field("link_height", &self.link_height)
            .field("min_link_height", &self.min_link_height)
            .field("max_link_height", &self.max_link_height)
            .field("cross_node_align", &self.cross_node_align)
            .field("drop_isolated_node", &self.drop_isolated_node)
            .field("divide_node_value_to_link", &self.divide_node_value_to_link)
            .field("link_overlap", &self.link_overlap)
            .field("node_key", &self.node_key)
            .field("set_node_layer", &self.set_node_layer.is_some())
            .field("node_sort_by", &self.node_sort_by.is_some())
            .field("link_sort_by", &self.link_sort_by.is_some())
            .finish()
    }
}

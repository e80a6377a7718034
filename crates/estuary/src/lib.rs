#![forbid(unsafe_code)]

//! Headless Sankey diagram layout.
//!
//! `estuary` turns a weighted flow graph (`{nodes?, links}`) or a parent/child hierarchy into
//! node rectangles and link band endpoints inside a viewport. Rendering (paths, labels,
//! colours) is left to the caller: links carry their band centres at both faces plus the
//! rectangles of both endpoint nodes, which is all a curve generator needs.
//!
//! ```
//! use estuary::{LinkDatum, SankeyInput, SankeyOptions, Viewport};
//!
//! let input = SankeyInput::links(vec![
//!     LinkDatum::new("coal", "power", 30.0),
//!     LinkDatum::new("gas", "power", 10.0),
//! ]);
//! let outcome = estuary::layout(&input, Viewport::sized(400.0, 200.0), &SankeyOptions::default());
//! let graph = outcome.result.expect("non-empty input");
//! assert_eq!(graph.max_depth, 2);
//! ```

pub mod error;
pub mod model;
pub mod options;

mod breadth;
mod column;
mod depth;
mod graph;
mod links;
mod orient;
mod relax;
mod sankey;
mod value;

pub use error::{Error, Result};
pub use model::{
    DepthPass, LayoutOutcome, LayoutWarning, LinkDatum, NodeDatum, Rect, SankeyGraph, SankeyInput,
    SankeyLink, SankeyNode, TreeDatum, Viewport,
};
pub use options::{
    CrossNodeAlign, Direction, GapPosition, LinkHeight, LinkOverlap, LinkWidth, NodeAlign,
    NodeGap, NodeHeight, NodeKey, NodeWidth, SankeyOptions,
};
pub use sankey::Sankey;

/// One-shot layout with the given options.
pub fn layout(input: &SankeyInput, viewport: Viewport, options: &SankeyOptions) -> LayoutOutcome {
    Sankey::new(options.clone()).layout(input, viewport)
}

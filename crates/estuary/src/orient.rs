//! Orientation Transformer: maps depth/breadth coordinates onto the viewport.
//!
//! Layout runs in a frame where `x` is the depth axis and `y` the breadth axis, both starting
//! at zero. This module is the only place that knows about direction, inversion and the
//! viewport origin.

use crate::graph::Graph;
use crate::model::{Rect, Viewport};
use crate::options::Direction;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Orientation {
    pub direction: Direction,
    pub inverse: bool,
    pub viewport: Viewport,
}

impl Orientation {
    /// Length of the depth axis inside the viewport.
    pub fn depth_extent(&self) -> f64 {
        match self.direction {
            Direction::Horizontal => self.viewport.width(),
            Direction::Vertical => self.viewport.height(),
        }
    }

    pub fn breadth_extent(&self) -> f64 {
        match self.direction {
            Direction::Horizontal => self.viewport.height(),
            Direction::Vertical => self.viewport.width(),
        }
    }

    fn point(&self, depth: f64, breadth: f64) -> (f64, f64) {
        let vp = &self.viewport;
        let depth = if self.inverse {
            self.depth_extent() - depth
        } else {
            depth
        };
        match self.direction {
            Direction::Horizontal => (vp.x0 + depth, vp.y0 + breadth),
            Direction::Vertical => (vp.x0 + breadth, vp.y0 + depth),
        }
    }

    fn rect(&self, r: Rect) -> Rect {
        let (ax, ay) = self.point(r.x0, r.y0);
        let (bx, by) = self.point(r.x1, r.y1);
        Rect {
            x0: ax.min(bx),
            x1: ax.max(bx),
            y0: ay.min(by),
            y1: ay.max(by),
        }
    }

    /// Rewrite every node and link coordinate in place, then snapshot the endpoint rectangles.
    pub fn apply(&self, g: &mut Graph) {
        for node in &mut g.nodes {
            let r = self.rect(node.rect());
            node.x0 = r.x0;
            node.x1 = r.x1;
            node.y0 = r.y0;
            node.y1 = r.y1;
        }
        for link in &mut g.links {
            (link.x0, link.y0) = self.point(link.x0, link.y0);
            (link.x1, link.y1) = self.point(link.x1, link.y1);
            link.source_rect = g.nodes[link.source_index].rect();
            link.target_rect = g.nodes[link.target_index].rect();
        }
    }
}

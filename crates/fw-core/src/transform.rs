//! Per-node position + size record.
//!
//! `position` is the node's top-centre anchor, relative to its parent's
//! absolute position (top-level nodes are relative to the world origin).

use kurbo::{Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub position: Point,
    pub size: Size,
}

impl NodeTransform {
    pub fn new(position: Point, size: Size) -> Self {
        Self { position, size }
    }

    /// Bounds of a node whose anchor sits at `absolute`.
    pub fn bounds_at(&self, absolute: Point) -> Rect {
        let half_w = self.size.width / 2.0;
        Rect::new(
            absolute.x - half_w,
            absolute.y,
            absolute.x + half_w,
            absolute.y + self.size.height,
        )
    }
}

/// Inclusive point-in-rect test (kurbo's `contains` excludes the far edges).
pub fn rect_contains(rect: &Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// AABB overlap test.
pub fn rects_intersect(a: &Rect, b: &Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

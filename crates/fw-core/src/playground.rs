//! Viewport state: zoom, scroll and the canvas element's client rectangle.
//!
//! World coordinates are the coordinates nodes are positioned in; client
//! coordinates are the pointer coordinates reported by the host.

use kurbo::{Point, Rect, Size, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playground {
    pub zoom: f64,
    /// World point shown at the viewport's top-left corner.
    pub scroll: Vec2,
    /// Client position of the canvas element's top-left corner.
    pub client_origin: Point,
    /// Size of the canvas element in client pixels.
    pub viewport_size: Size,
    pub readonly: bool,
}

impl Default for Playground {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            scroll: Vec2::ZERO,
            client_origin: Point::ZERO,
            viewport_size: Size::new(1280.0, 800.0),
            readonly: false,
        }
    }
}

impl Playground {
    /// Convert a pointer position to world coordinates.
    pub fn pos_from_client(&self, client: Point) -> Point {
        let local = client - self.client_origin;
        Point::new(
            local.x / self.zoom + self.scroll.x,
            local.y / self.zoom + self.scroll.y,
        )
    }

    pub fn client_from_pos(&self, world: Point) -> Point {
        Point::new(
            (world.x - self.scroll.x) * self.zoom,
            (world.y - self.scroll.y) * self.zoom,
        ) + self.client_origin.to_vec2()
    }

    /// The canvas element in client coordinates.
    pub fn client_rect(&self) -> Rect {
        Rect::from_origin_size(self.client_origin, self.viewport_size)
    }

    /// The visible area in world coordinates.
    pub fn viewport_world_rect(&self) -> Rect {
        let origin = Point::new(self.scroll.x, self.scroll.y);
        Rect::from_origin_size(
            origin,
            Size::new(
                self.viewport_size.width / self.zoom,
                self.viewport_size.height / self.zoom,
            ),
        )
    }

    pub fn viewport_center(&self) -> Point {
        self.viewport_world_rect().center()
    }
}

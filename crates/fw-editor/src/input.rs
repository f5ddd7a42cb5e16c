//! Pointer events as delivered by the host.
//!
//! Positions are client coordinates; the playground converts them to world
//! coordinates. Every event carries its timestamp so drag thresholds do not
//! depend on a wall clock.

use kurbo::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { client: Point, timestamp_ms: u64 },
    Move { client: Point, timestamp_ms: u64 },
    Up { client: Point, timestamp_ms: u64 },
}

impl PointerEvent {
    pub fn down(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::Down {
            client: Point::new(x, y),
            timestamp_ms,
        }
    }

    pub fn move_to(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::Move {
            client: Point::new(x, y),
            timestamp_ms,
        }
    }

    pub fn up(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::Up {
            client: Point::new(x, y),
            timestamp_ms,
        }
    }

    pub fn client(&self) -> Point {
        match self {
            Self::Down { client, .. } | Self::Move { client, .. } | Self::Up { client, .. } => {
                *client
            }
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Down { timestamp_ms, .. }
            | Self::Move { timestamp_ms, .. }
            | Self::Up { timestamp_ms, .. } => *timestamp_ms,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Self::Move { .. })
    }

    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up { .. })
    }
}

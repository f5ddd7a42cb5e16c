//! The drag session shared by every gesture: threshold tracking from the
//! pointer-down, and the driver that feeds a pointer stream to a gesture.

use crate::input::PointerEvent;
use fw_core::EditorConfig;
use futures::{Stream, StreamExt};
use kurbo::{Point, Vec2};

/// Tracks one pointer-down → pointer-up sequence.
///
/// The drag succeeds once the pointer has been held longer than
/// `drag_timeout_ms` or has moved more than `drag_min_delta` on either axis.
/// Success is sticky.
#[derive(Debug, Clone)]
pub struct DragSession {
    start: Point,
    start_ms: u64,
    last: Point,
    last_ms: u64,
    success: bool,
    timeout_ms: f64,
    min_delta: f64,
}

impl DragSession {
    pub fn new(start: &PointerEvent, config: &EditorConfig) -> Self {
        Self {
            start: start.client(),
            start_ms: start.timestamp_ms(),
            last: start.client(),
            last_ms: start.timestamp_ms(),
            success: false,
            timeout_ms: config.drag_timeout_ms,
            min_delta: config.drag_min_delta,
        }
    }

    /// Record a pointer position. Returns whether the drag has succeeded.
    pub fn update(&mut self, event: &PointerEvent) -> bool {
        self.last = event.client();
        self.last_ms = event.timestamp_ms();
        if !self.success {
            let delta = self.last - self.start;
            let elapsed = self.last_ms.saturating_sub(self.start_ms) as f64;
            self.success = elapsed > self.timeout_ms
                || delta.x.abs() > self.min_delta
                || delta.y.abs() > self.min_delta;
        }
        self.success
    }

    pub fn mark_success(&mut self) {
        self.success = true;
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn start(&self) -> Point {
        self.start
    }

    /// Client-space displacement since the pointer-down.
    pub fn delta(&self) -> Vec2 {
        self.last - self.start
    }

    /// A pointer-up at the last recorded position, for streams that end
    /// without one.
    pub fn last_up(&self) -> PointerEvent {
        PointerEvent::Up {
            client: self.last,
            timestamp_ms: self.last_ms,
        }
    }
}

/// Feed every move of `events` to `on_move` until the first pointer-up,
/// which is returned. `None` if the stream ends first.
pub async fn pump<S>(events: S, mut on_move: impl FnMut(&PointerEvent)) -> Option<PointerEvent>
where
    S: Stream<Item = PointerEvent>,
{
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        match event {
            PointerEvent::Up { .. } => return Some(event),
            PointerEvent::Move { .. } => on_move(&event),
            PointerEvent::Down { .. } => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream;

    #[test]
    fn small_quick_moves_do_not_succeed() {
        let config = EditorConfig::default();
        let mut session = DragSession::new(&PointerEvent::down(0.0, 0.0, 0), &config);
        assert!(!session.update(&PointerEvent::move_to(3.0, -4.0, 50)));
        assert!(session.update(&PointerEvent::move_to(3.0, -6.0, 60)));
        // Sticky once reached.
        assert!(session.update(&PointerEvent::move_to(0.0, 0.0, 70)));
    }

    #[test]
    fn holding_past_the_timeout_succeeds() {
        let config = EditorConfig::default();
        let mut session = DragSession::new(&PointerEvent::down(0.0, 0.0, 1000), &config);
        assert!(!session.update(&PointerEvent::move_to(1.0, 1.0, 1100)));
        assert!(session.update(&PointerEvent::move_to(1.0, 1.0, 1101)));
    }

    #[test]
    fn pump_stops_at_first_up() {
        let events = stream::iter(vec![
            PointerEvent::move_to(1.0, 0.0, 1),
            PointerEvent::move_to(2.0, 0.0, 2),
            PointerEvent::up(3.0, 0.0, 3),
            PointerEvent::move_to(4.0, 0.0, 4),
        ]);
        let mut seen = Vec::new();
        let up = block_on(pump(events, |e| seen.push(e.client().x)));
        assert_eq!(seen, vec![1.0, 2.0]);
        assert_eq!(up, Some(PointerEvent::up(3.0, 0.0, 3)));
    }

    #[test]
    fn pump_without_up_returns_none() {
        let events = stream::iter(vec![PointerEvent::move_to(1.0, 0.0, 1)]);
        assert_eq!(block_on(pump(events, |_| {})), None);
    }
}

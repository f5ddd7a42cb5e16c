//! Line drawing: drag from an output port (or an existing line's end) to
//! an input port.
//!
//! Nothing is drawn while the gesture is armed. The temporary drawing line
//! appears on the first successful move and follows the pointer, snapping
//! onto a hovered port when the connection would be legal and turning the
//! error color when it would not. Release runs the veto chain and settles
//! on either a new line or no change.

use crate::input::PointerEvent;
use crate::service::{DragLineEndEvent, DragService};
use crate::session::{DragSession, pump};
use futures::Stream;
use futures::future::join_all;
use fw_core::{EntityRef, LineId, LineInfo, PortId, WorkflowDocument};
use kurbo::Point;

/// Outcome of a line drag. Vetoes and refusals are outcomes, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineDrawResult {
    pub drag_success: bool,
    pub new_line: Option<LineId>,
}

impl LineDrawResult {
    pub fn refused() -> Self {
        Self::default()
    }

    fn settled(new_line: Option<LineId>) -> Self {
        Self {
            drag_success: true,
            new_line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDrawState {
    /// Pointer is down, no line drawn yet.
    Armed,
    /// The temporary line follows the pointer.
    Drawing,
}

pub struct LineDrawGesture<'a> {
    service: &'a DragService,
    doc: &'a mut WorkflowDocument,
    from_port: PortId,
    origin_line: Option<LineId>,
    session: DragSession,
    state: LineDrawState,
    line: Option<LineId>,
    to_port: Option<PortId>,
    needs_reset: bool,
}

impl<'a> LineDrawGesture<'a> {
    pub(crate) fn start(
        service: &'a DragService,
        doc: &'a mut WorkflowDocument,
        from_port: PortId,
        start: &PointerEvent,
        origin_line: Option<LineId>,
    ) -> Option<Self> {
        if doc.store.playground.readonly || doc.store.port_disabled(from_port) {
            log::debug!("line drag refused: {from_port:?} is disabled");
            return None;
        }
        if let Some(origin) = origin_line
            && doc.lines.get(origin).is_none_or(|l| l.disabled)
        {
            log::debug!("line drag refused: origin line {origin:?} is disabled");
            return None;
        }
        doc.selection.clear();
        let session = DragSession::new(start, doc.config());
        Some(Self {
            service,
            doc,
            from_port,
            origin_line,
            session,
            state: LineDrawState::Armed,
            line: None,
            to_port: None,
            needs_reset: false,
        })
    }

    /// The document under the gesture, for rendering mid-drag.
    pub fn document(&self) -> &WorkflowDocument {
        self.doc
    }

    pub fn state(&self) -> LineDrawState {
        self.state
    }

    /// The temporary drawing line, once one exists.
    pub fn drawing_line(&self) -> Option<LineId> {
        self.line
    }

    /// The port currently under the pointer.
    pub fn hovered_port(&self) -> Option<PortId> {
        self.to_port
    }

    /// True while the hovered port would reject the connection.
    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    pub fn on_move(&mut self, event: &PointerEvent) {
        // A fresh drag from a port draws on its first move; re-drawing an
        // existing line waits for the threshold so a plain click selects
        // the line.
        if self.origin_line.is_some() {
            if !self.session.update(event) {
                return;
            }
        } else if event.is_move() {
            self.session.update(event);
            self.session.mark_success();
        } else if self.session.is_success() {
            self.session.update(event);
        } else {
            return;
        }

        let world = self.doc.store.playground.pos_from_client(event.client());
        let Some(line) = self.ensure_line(world) else {
            return;
        };

        let target = self.port_under(world);
        self.to_port = target;
        self.needs_reset = false;
        let mut drawing_to = world;
        let mut highlight = None;
        if let Some(target) = target {
            if self.doc.lines.can_add_line(&self.doc.store, self.from_port, target, true) {
                drawing_to = self.doc.store.port_point(target).unwrap_or(world);
            } else {
                highlight = Some(self.doc.config().line_colors.error.clone());
                self.needs_reset = true;
            }
        }
        self.doc.lines.set_drawing_to(line, drawing_to);
        self.doc.lines.set_highlight(line, highlight);
        self.doc.hover.set_hovered(target.map(EntityRef::Port));
        log::trace!("line drag at {world:?}, target {target:?}");
    }

    /// Materialize the temporary line on the first successful move.
    fn ensure_line(&mut self, world: Point) -> Option<LineId> {
        if let Some(line) = self.line {
            return Some(line);
        }
        let from = self.doc.store.port(self.from_port)?;
        let info = LineInfo::drawing(from.node, from.key.clone(), world);
        let line = self.doc.create_line(info)?;
        if let Some(origin) = self.origin_line {
            let hidden = self.doc.config().line_colors.hidden.clone();
            self.doc.lines.set_highlight(origin, Some(hidden));
        }
        self.line = Some(line);
        self.state = LineDrawState::Drawing;
        Some(line)
    }

    /// The exact port under the pointer, else the sole input port of the
    /// node under it.
    fn port_under(&self, world: Point) -> Option<PortId> {
        let store = &self.doc.store;
        if let Some(port) = self.doc.lines.get_port_from_mouse_pos(store, world)
            && port != self.from_port
        {
            return Some(port);
        }
        let from_node = store.port(self.from_port)?.node;
        let selected = self.doc.selection.selected_nodes();
        let node = self.doc.lines.get_node_from_mouse_pos(store, world, &selected)?;
        if node == from_node {
            return None;
        }
        match store.input_ports(node).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Release the pointer and settle the gesture.
    pub async fn finish(mut self, up: &PointerEvent) -> LineDrawResult {
        self.on_move(up);

        let event = DragLineEndEvent {
            from_port: self.from_port,
            to_port: self.to_port,
            origin_line: self.origin_line,
            drag_success: self.session.is_success(),
            client: up.client(),
        };
        let callbacks = self.service.line_end_callbacks.snapshot();
        join_all(callbacks.iter().map(|cb| cb(event.clone()))).await;

        if let Some(line) = self.line.take() {
            self.doc.dispose_line(line);
        }
        self.doc.hover.clear();
        if !self.session.is_success() {
            self.restore_origin();
            return LineDrawResult::refused();
        }
        self.settle()
    }

    fn settle(&mut self) -> LineDrawResult {
        let origin = self.origin_line.and_then(|id| self.doc.lines.get(id)).cloned();

        // Dropped back where it started.
        if let Some(origin) = &origin
            && origin.to_port_id() == self.to_port
        {
            return self.noop();
        }
        let target = self.to_port.and_then(|p| self.doc.store.port(p)).cloned();
        if let Some(target) = &target
            && !target.is_input()
        {
            return self.noop();
        }
        let Some(from) = self.doc.store.port(self.from_port).cloned() else {
            return self.noop();
        };
        let new_info = target.as_ref().map(|t| LineInfo {
            from: from.node,
            from_port: from.key.clone(),
            to: Some(t.node),
            to_port: t.key.clone(),
            drawing_to: None,
        });

        if let Some(origin) = &origin {
            if let Some(info) = &new_info
                && !self.doc.lines.can_reset_line(origin.id, info)
            {
                return self.noop();
            }
            // An illegal target snaps the origin line back instead of
            // removing it.
            if self.needs_reset
                || !self.doc.lines.can_remove_line(origin.id, new_info.as_ref(), false)
            {
                return self.noop();
            }
            self.doc.dispose_line(origin.id);
        }

        let (Some(target), Some(info)) = (target, new_info) else {
            return LineDrawResult::settled(None);
        };
        if !self.doc.lines.can_add_line(&self.doc.store, from.id, target.id, false) {
            return LineDrawResult::settled(None);
        }
        let new_line = self.doc.create_line(info);
        log::debug!("line drag settled on {new_line:?}");
        LineDrawResult::settled(new_line)
    }

    fn noop(&mut self) -> LineDrawResult {
        self.restore_origin();
        LineDrawResult::settled(None)
    }

    fn restore_origin(&mut self) {
        if let Some(origin) = self.origin_line {
            self.doc.lines.set_highlight(origin, None);
        }
    }

    /// Drive the gesture from a pointer stream up to the first release.
    pub async fn run<S>(mut self, events: S) -> LineDrawResult
    where
        S: Stream<Item = PointerEvent>,
    {
        let up = pump(events, |event| self.on_move(event)).await;
        let up = up.unwrap_or_else(|| self.session.last_up());
        self.finish(&up).await
    }
}

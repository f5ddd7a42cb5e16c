//! The drag service: host hooks and events shared by the three gestures,
//! and the entry points that start them.
//!
//! Gesture state lives in the gesture value returned by each `start_*`
//! call, never on the service. A gesture borrows the document mutably for
//! its whole life, so two gestures cannot run against one document at once.

use crate::card_drop::CardDragGesture;
use crate::input::PointerEvent;
use crate::line_draw::{LineDrawGesture, LineDrawResult};
use crate::node_drag::{NodeDragGesture, NodeDragResult};
use futures::Stream;
use futures::future::LocalBoxFuture;
use fw_core::{
    Emitter, EntityStore, LineId, NodeId, NodeType, PortId, Subscription, WorkflowDocument,
};
use kurbo::Point;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

// ─── Hook lists ──────────────────────────────────────────────────────────

type Slots<F> = RefCell<Vec<(u64, F)>>;

/// Ordered list of host callbacks that can be unregistered through a
/// [`Subscription`].
pub struct HookList<F> {
    slots: Rc<Slots<F>>,
    next_id: Cell<u64>,
}

impl<F: Clone + 'static> HookList<F> {
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    pub fn add(&self, hook: F) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.slots.borrow_mut().push((id, hook));
        let weak: Weak<Slots<F>> = Rc::downgrade(&self.slots);
        Subscription::new(move || {
            if let Some(slots) = weak.upgrade() {
                slots.borrow_mut().retain(|(hid, _)| *hid != id);
            }
        })
    }

    /// The registered hooks, in registration order.
    pub fn snapshot(&self) -> Vec<F> {
        self.slots.borrow().iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl<F: Clone + 'static> Default for HookList<F> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Events & hook types ─────────────────────────────────────────────────

/// Passed to drag-line-end callbacks before the drawn line settles.
#[derive(Debug, Clone, PartialEq)]
pub struct DragLineEndEvent {
    pub from_port: PortId,
    /// The port under the pointer at release, legal or not.
    pub to_port: Option<PortId>,
    pub origin_line: Option<LineId>,
    pub drag_success: bool,
    pub client: Point,
}

pub type DragLineEndCallback = Rc<dyn Fn(DragLineEndEvent) -> LocalBoxFuture<'static, ()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodesDragKind {
    Start,
    Drag,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodesDragEvent {
    pub kind: NodesDragKind,
    pub nodes: Vec<NodeId>,
    /// World position of the dragged group's bounding-box origin.
    pub origin: Point,
}

/// What a position adjuster sees about the drag in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustContext {
    pub nodes: Vec<NodeId>,
    /// Bounding-box origin when the drag started.
    pub start_origin: Point,
    /// Last applied origin.
    pub current_origin: Point,
}

/// Clamps or vetoes the next group origin. Returning `None` keeps the
/// nodes where they are for this move. Adjusters run in registration order,
/// each receiving the previous one's output.
pub type PositionAdjuster = Rc<dyn Fn(&AdjustContext, Point) -> Option<Point>>;

/// Host veto on palette drops into a container.
pub trait CardDropPolicy {
    fn can_drop_to_node(
        &self,
        _store: &EntityStore,
        _node_type: &NodeType,
        _target: NodeId,
    ) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllDrops;

impl CardDropPolicy for AcceptAllDrops {}

// ─── Service ─────────────────────────────────────────────────────────────

pub struct DragService {
    pub(crate) line_end_callbacks: HookList<DragLineEndCallback>,
    pub(crate) position_adjusters: HookList<PositionAdjuster>,
    pub(crate) drop_policy: Box<dyn CardDropPolicy>,
    pub(crate) nodes_drag: Emitter<NodesDragEvent>,
}

impl Default for DragService {
    fn default() -> Self {
        Self::new()
    }
}

impl DragService {
    pub fn new() -> Self {
        Self {
            line_end_callbacks: HookList::new(),
            position_adjusters: HookList::new(),
            drop_policy: Box::new(AcceptAllDrops),
            nodes_drag: Emitter::new(),
        }
    }

    pub fn set_drop_policy(&mut self, policy: Box<dyn CardDropPolicy>) {
        self.drop_policy = policy;
    }

    /// Awaited, all in parallel, when a line drag ends and before the
    /// drawn line is settled.
    pub fn on_drag_line_end<F>(&self, callback: F) -> Subscription
    where
        F: Fn(DragLineEndEvent) -> LocalBoxFuture<'static, ()> + 'static,
    {
        self.line_end_callbacks.add(Rc::new(callback))
    }

    pub fn add_position_adjuster<F>(&self, adjuster: F) -> Subscription
    where
        F: Fn(&AdjustContext, Point) -> Option<Point> + 'static,
    {
        self.position_adjusters.add(Rc::new(adjuster))
    }

    pub fn on_nodes_drag(&self, listener: impl Fn(&NodesDragEvent) + 'static) -> Subscription {
        self.nodes_drag.on(listener)
    }

    // ─── Line drawing ────────────────────────────────────────────────────

    /// Arm a line drag from `from_port`. `origin_line` is the line being
    /// re-drawn when the drag started on an existing line's end. `None` if
    /// the port or origin line is disabled or the canvas is read-only.
    pub fn start_drawing_line<'a>(
        &'a self,
        doc: &'a mut WorkflowDocument,
        from_port: PortId,
        start: &PointerEvent,
        origin_line: Option<LineId>,
    ) -> Option<LineDrawGesture<'a>> {
        LineDrawGesture::start(self, doc, from_port, start, origin_line)
    }

    /// Run a whole line drag against a pointer stream.
    pub async fn draw_line<S>(
        &self,
        doc: &mut WorkflowDocument,
        from_port: PortId,
        start: &PointerEvent,
        origin_line: Option<LineId>,
        events: S,
    ) -> LineDrawResult
    where
        S: Stream<Item = PointerEvent>,
    {
        match self.start_drawing_line(doc, from_port, start, origin_line) {
            Some(gesture) => gesture.run(events).await,
            None => LineDrawResult::refused(),
        }
    }

    // ─── Node dragging ───────────────────────────────────────────────────

    /// Start dragging the selected nodes. `None` if nothing is selected or
    /// the canvas is read-only.
    pub fn start_drag_selected_nodes<'a>(
        &'a self,
        doc: &'a mut WorkflowDocument,
        trigger: &PointerEvent,
    ) -> Option<NodeDragGesture<'a>> {
        NodeDragGesture::start(self, doc, trigger)
    }

    pub async fn drag_selected_nodes<S>(
        &self,
        doc: &mut WorkflowDocument,
        trigger: &PointerEvent,
        events: S,
    ) -> NodeDragResult
    where
        S: Stream<Item = PointerEvent>,
    {
        match self.start_drag_selected_nodes(doc, trigger) {
            Some(gesture) => gesture.run(events).await,
            None => NodeDragResult::default(),
        }
    }

    // ─── Card drop ───────────────────────────────────────────────────────

    /// Start dragging a palette card for `node_type`. `card_origin` is the
    /// client position of the card element, where a rejected drop returns.
    pub fn start_drag_card<'a>(
        &'a self,
        doc: &'a mut WorkflowDocument,
        node_type: impl Into<NodeType>,
        start: &PointerEvent,
        card_origin: Point,
    ) -> CardDragGesture<'a> {
        CardDragGesture::start(self, doc, node_type.into(), start, card_origin)
    }

    /// Run a whole card drag; resolves to the created node.
    pub async fn drag_card<S>(
        &self,
        doc: &mut WorkflowDocument,
        node_type: impl Into<NodeType>,
        start: &PointerEvent,
        card_origin: Point,
        events: S,
    ) -> Option<NodeId>
    where
        S: Stream<Item = PointerEvent>,
    {
        self.start_drag_card(doc, node_type, start, card_origin)
            .run(events)
            .await
    }
}

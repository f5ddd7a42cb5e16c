//! Dragging the selected nodes as one group.
//!
//! The group keeps its shape: every node retains its offset from the
//! group's bounding-box origin, and only the origin follows the pointer
//! (through the registered position adjusters).

use crate::input::PointerEvent;
use crate::service::{AdjustContext, DragService, NodesDragEvent, NodesDragKind};
use crate::session::{DragSession, pump};
use futures::Stream;
use fw_core::{NodeId, WorkflowDocument};
use kurbo::{Point, Vec2};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeDragResult {
    /// The pointer crossed the drag threshold; a release without it is a
    /// plain click.
    pub drag_success: bool,
    /// Nodes that were moved, after promotion to their parent.
    pub moved: Vec<NodeId>,
}

pub struct NodeDragGesture<'a> {
    service: &'a DragService,
    doc: &'a mut WorkflowDocument,
    session: DragSession,
    nodes: Vec<NodeId>,
    offsets: Vec<Vec2>,
    start_origin: Point,
    current_origin: Point,
}

impl<'a> NodeDragGesture<'a> {
    pub(crate) fn start(
        service: &'a DragService,
        doc: &'a mut WorkflowDocument,
        trigger: &PointerEvent,
    ) -> Option<Self> {
        if doc.store.playground.readonly {
            log::debug!("node drag refused: canvas is read-only");
            return None;
        }
        let selected: Vec<NodeId> = doc
            .selection
            .selected_nodes()
            .into_iter()
            .filter(|id| doc.store.has_node(*id))
            .collect();
        if selected.is_empty() {
            return None;
        }
        let nodes = promote_to_parent(doc, selected);

        let mut origin: Option<Point> = None;
        for id in &nodes {
            if let Some(bounds) = doc.store.node_bounds(*id) {
                origin = Some(match origin {
                    Some(o) => Point::new(o.x.min(bounds.x0), o.y.min(bounds.y0)),
                    None => bounds.origin(),
                });
            }
        }
        let start_origin = origin?;
        let offsets = nodes
            .iter()
            .map(|id| doc.store.absolute_position(*id).unwrap_or(start_origin) - start_origin)
            .collect();

        let session = DragSession::new(trigger, doc.config());
        let gesture = Self {
            service,
            doc,
            session,
            nodes,
            offsets,
            start_origin,
            current_origin: start_origin,
        };
        gesture.emit(NodesDragKind::Start);
        log::debug!("node drag started for {:?}", gesture.nodes);
        Some(gesture)
    }

    /// The document under the gesture, for rendering mid-drag.
    pub fn document(&self) -> &WorkflowDocument {
        self.doc
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Current world position of the group's bounding-box origin.
    pub fn origin(&self) -> Point {
        self.current_origin
    }

    pub fn on_move(&mut self, event: &PointerEvent) {
        self.session.update(event);
        let zoom = self.doc.store.playground.zoom;
        let delta = self.session.delta() / zoom;

        let mut target = self.start_origin + delta;
        let ctx = AdjustContext {
            nodes: self.nodes.clone(),
            start_origin: self.start_origin,
            current_origin: self.current_origin,
        };
        for adjuster in self.service.position_adjusters.snapshot() {
            match adjuster(&ctx, target) {
                Some(adjusted) => target = adjusted,
                None => {
                    log::trace!("node drag move vetoed at {target:?}");
                    return;
                }
            }
        }
        if target == self.current_origin {
            return;
        }

        for (id, offset) in self.nodes.iter().zip(&self.offsets) {
            if let Err(err) = self.doc.set_node_absolute_position(*id, target + *offset) {
                log::warn!("node drag lost {id:?}: {err}");
            }
        }
        self.current_origin = target;
        log::trace!("node drag origin {target:?}");
        self.emit(NodesDragKind::Drag);
    }

    /// Release the pointer. Moves already applied stay applied.
    pub fn finish(mut self, up: &PointerEvent) -> NodeDragResult {
        self.on_move(up);
        self.emit(NodesDragKind::End);
        NodeDragResult {
            drag_success: self.session.is_success(),
            moved: self.nodes,
        }
    }

    fn emit(&self, kind: NodesDragKind) {
        self.service.nodes_drag.fire(&NodesDragEvent {
            kind,
            nodes: self.nodes.clone(),
            origin: self.current_origin,
        });
    }

    pub async fn run<S>(mut self, events: S) -> NodeDragResult
    where
        S: Stream<Item = PointerEvent>,
    {
        let up = pump(events, |event| self.on_move(event)).await;
        let up = up.unwrap_or_else(|| self.session.last_up());
        self.finish(&up)
    }
}

/// When the selection is exactly the children of one container, drag the
/// container instead.
fn promote_to_parent(doc: &WorkflowDocument, selected: Vec<NodeId>) -> Vec<NodeId> {
    let tree = &doc.store.tree;
    let Some(parent) = tree.parent(selected[0]) else {
        return selected;
    };
    if selected.iter().any(|id| tree.parent(*id) != Some(parent)) {
        return selected;
    }
    let children = tree.children(Some(parent));
    if children.len() == selected.len() && children.iter().all(|c| selected.contains(c)) {
        vec![parent]
    } else {
        selected
    }
}
